// Tibia game worlds a guild can track.

use super::settings_errors::ValidationError;

const DEFAULT_WORLDS: &[&str] = &[
    "Amera", "Antica", "Astera", "Belluma", "Belobra", "Bona", "Calmera", "Carnera", "Celebra",
    "Celesta", "Concorda", "Cosera", "Dibra", "Duna", "Epoca", "Estela", "Faluna", "Ferobra",
    "Firmera", "Funera", "Furia", "Garnera", "Gentebra", "Gladera", "Harmonia", "Helera",
    "Honbra", "Impera", "Inabra", "Javibra", "Jonera", "Kalibra", "Kenora", "Lobera",
    "Luminera", "Lutabra", "Macabra", "Menera", "Mitigera", "Monza", "Nefera", "Noctera",
    "Nossobra", "Olera", "Ombra", "Pacembra", "Pacera", "Peloria", "Premia", "Pyra", "Quelibra",
    "Quintera", "Refugia", "Relania", "Relembra", "Secura", "Serdebra", "Serenebra", "Solidera",
    "Talera", "Torpera", "Tortura", "Venebra", "Vita", "Vunira", "Wintera", "Xandebra",
    "Xylona", "Yonabra", "Ystera", "Zanera", "Zunera",
];

#[derive(Debug, Clone)]
pub struct WorldCatalog {
    worlds: Vec<String>,
}

impl WorldCatalog {
    /// Build a catalog from an explicit list. Names are stored capitalized.
    pub fn new<I, S>(worlds: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut worlds: Vec<String> = worlds
            .into_iter()
            .map(|w| capitalize(w.as_ref().trim()))
            .filter(|w| !w.is_empty())
            .collect();
        worlds.sort();
        worlds.dedup();
        Self { worlds }
    }

    pub fn len(&self) -> usize {
        self.worlds.len()
    }

    /// Normalize a user supplied name and check it exists.
    pub fn validate(&self, raw: &str) -> Result<String, ValidationError> {
        let world = capitalize(raw.trim());
        if self.worlds.binary_search(&world).is_ok() {
            Ok(world)
        } else {
            Err(ValidationError::UnknownWorld(raw.trim().to_string()))
        }
    }
}

impl Default for WorldCatalog {
    fn default() -> Self {
        Self::new(DEFAULT_WORLDS)
    }
}

/// First character uppercased, the rest lowercased.
fn capitalize(raw: &str) -> String {
    let mut chars = raw.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(|c| c.to_lowercase()))
            .collect(),
        None => String::new(),
    }
}
