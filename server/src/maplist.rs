//! Server rotation of maps.
//!
//! Every mutation bumps a version stamp. A map vote remembers the stamp it was
//! called against and is cancelled if the list changes under it, since the
//! index it captured may no longer point at the same entry.

use crate::error::MaplistError;
use rand::Rng;
use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MaplistEntry {
    pub map: String,
    #[serde(default)]
    pub wads: String,
}

impl MaplistEntry {
    pub fn new(map: &str, wads: &str) -> Self {
        Self {
            map: map.to_string(),
            wads: wads.to_string(),
        }
    }

    /// "wads map", or "- map" when the entry has no wads.
    pub fn describe(&self) -> String {
        if self.wads.is_empty() {
            format!("- {}", self.map)
        } else {
            format!("{} {}", self.wads, self.map)
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Maplist {
    entries: Vec<MaplistEntry>,
    current: Option<usize>,
    next: usize,
    version: u64,
}

impl Maplist {
    pub fn new(entries: Vec<MaplistEntry>) -> Self {
        let current = if entries.is_empty() { None } else { Some(0) };
        let next = if entries.len() > 1 { 1 } else { 0 };
        Self {
            entries,
            current,
            next,
            version: 0,
        }
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&MaplistEntry> {
        self.entries.get(index)
    }

    pub fn add(&mut self, entry: MaplistEntry) {
        // We're wrapping back to the start, the new entry is next instead.
        if self.next == 0 && self.current.is_some() {
            self.next = self.entries.len();
        }
        self.entries.push(entry);
        self.version += 1;
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.current = None;
        self.next = 0;
        self.version += 1;
    }

    /// Maplist positions matching the given arguments.
    ///
    /// A single numeric argument is a 1-based maplist position. Otherwise each
    /// argument is a case-insensitive substring that must match the map name
    /// or the wad list; every argument narrows the previous matches.
    pub fn expand(&self, arguments: &[String]) -> Vec<usize> {
        if self.entries.is_empty() || arguments.is_empty() {
            return Vec::new();
        }

        if let [single] = arguments {
            if let Ok(position) = single.parse::<usize>() {
                if position > 0 && position <= self.entries.len() {
                    return vec![position - 1];
                }
                return Vec::new();
            }
        }

        let patterns: Vec<String> = arguments.iter().map(|a| a.to_ascii_lowercase()).collect();
        (0..self.entries.len())
            .filter(|&i| {
                let entry = &self.entries[i];
                let map = entry.map.to_ascii_lowercase();
                let wads = entry.wads.to_ascii_lowercase();
                patterns
                    .iter()
                    .all(|p| map.contains(p.as_str()) || wads.contains(p.as_str()))
            })
            .collect()
    }

    /// Resolves arguments to exactly one maplist index.
    pub fn gotomap_check(&self, arguments: &[String]) -> Result<usize, MaplistError> {
        if self.entries.is_empty() {
            return Err(MaplistError::Empty);
        }

        match self.expand(arguments).as_slice() {
            [] => Err(MaplistError::NotFound),
            [index] => Ok(*index),
            _ => Err(MaplistError::Ambiguous),
        }
    }

    pub fn randmap_check(&self) -> Result<(), MaplistError> {
        if self.entries.is_empty() {
            return Err(MaplistError::Empty);
        }
        Ok(())
    }

    /// Selects `index` as the current map and returns its entry.
    pub fn goto(&mut self, index: usize) -> Option<MaplistEntry> {
        let entry = self.entries.get(index)?.clone();
        self.current = Some(index);
        self.next = (index + 1) % self.entries.len();
        Some(entry)
    }

    pub fn random_index<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<usize> {
        if self.entries.is_empty() {
            return None;
        }
        Some(rng.gen_range(0..self.entries.len()))
    }

    /// Advances the rotation.
    pub fn advance(&mut self) -> Option<MaplistEntry> {
        if self.entries.is_empty() {
            return None;
        }
        self.goto(self.next % self.entries.len())
    }

    /// One line per entry, with the current map marked.
    pub fn lines(&self) -> Vec<String> {
        if self.entries.is_empty() {
            return vec![MaplistError::Empty.to_string()];
        }

        let mut lines = vec![" MAPLIST:".to_string()];
        for (i, entry) in self.entries.iter().enumerate() {
            let marker = if Some(i) == self.current { "> " } else { "  " };
            lines.push(format!("{}{}. {}", marker, i + 1, entry.describe()));
        }
        lines
    }
}
