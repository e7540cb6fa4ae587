use crate::error::{Result, RosterError};
use crate::types::{Coordinate, PlaceKey};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

const BUILTIN_GAZETTEER: &str = include_str!("../data/gazetteer.toml");

#[derive(Debug, Deserialize)]
struct GazetteerFile {
    places: BTreeMap<String, Coordinate>,
}

/// Read-only table of canonical place keys to coordinates.
#[derive(Debug, Clone, Default)]
pub struct Gazetteer {
    entries: HashMap<PlaceKey, Coordinate>,
}

impl Gazetteer {
    /// The table shipped with the crate.
    pub fn builtin() -> Result<Self> {
        Self::from_toml_str(BUILTIN_GAZETTEER)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            RosterError::Config(format!(
                "Failed to read gazetteer file '{}': {}",
                path.display(),
                e
            ))
        })?;
        let gazetteer = Self::from_toml_str(&content)?;
        info!(
            "Loaded gazetteer with {} places from {}",
            gazetteer.len(),
            path.display()
        );
        Ok(gazetteer)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let file: GazetteerFile = toml::from_str(content)?;
        for (name, coordinate) in &file.places {
            if !coordinate.is_valid() {
                return Err(RosterError::Config(format!(
                    "Gazetteer entry '{}' has out-of-range coordinate {:?}",
                    name, coordinate
                )));
            }
        }
        Ok(Self::from_entries(file.places))
    }

    /// Builds a table from raw names; names are normalized and the first entry per key wins.
    pub fn from_entries<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, Coordinate)>,
        S: AsRef<str>,
    {
        let mut map = HashMap::new();
        for (name, coordinate) in entries {
            let key = PlaceKey::from_name(name.as_ref());
            if key.is_empty() {
                warn!("Skipping gazetteer entry with empty name");
                continue;
            }
            if map.contains_key(&key) {
                warn!(
                    "Duplicate gazetteer entry '{}' normalizes to existing key {}",
                    name.as_ref(),
                    key
                );
                continue;
            }
            map.insert(key, coordinate);
        }
        Self { entries: map }
    }

    /// Absence is an expected outcome, reported at debug level only.
    pub fn lookup(&self, key: &PlaceKey) -> Option<Coordinate> {
        let found = self.entries.get(key).copied();
        if found.is_none() {
            debug!("No coordinates for place key {}", key);
        }
        found
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
