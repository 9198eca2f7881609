// Discord adapters for guild settings: cache snapshots, events and prefixes.

pub mod events;
pub mod guild_snapshot;
pub mod prefix_stripper;
