use std::fmt;

use serde::{Deserialize, Serialize};

/// A tradable instrument as listed by the broker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instrument {
    pub segment: String,
    pub name: String,
    pub instrument_key: String,
}

impl fmt::Display for Instrument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} | {} | {}", self.segment, self.name, self.instrument_key)
    }
}

/// Read-only lookup table of instruments.
///
/// Built once by the caller and passed where needed.
#[derive(Debug, Clone, Default)]
pub struct InstrumentDirectory {
    instruments: Vec<Instrument>,
}

impl InstrumentDirectory {
    /// Entries missing a segment, name or key are dropped.
    pub fn new(instruments: impl IntoIterator<Item = Instrument>) -> Self {
        Self {
            instruments: instruments
                .into_iter()
                .filter(|i| {
                    !i.segment.trim().is_empty()
                        && !i.name.trim().is_empty()
                        && !i.instrument_key.trim().is_empty()
                })
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.instruments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instruments.is_empty()
    }

    /// Case-insensitive substring match on the instrument name, in directory order.
    pub fn search(&self, query: &str) -> Vec<&Instrument> {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return Vec::new();
        }
        self.instruments
            .iter()
            .filter(|i| i.name.to_lowercase().contains(&query))
            .collect()
    }

    pub fn get(&self, instrument_key: &str) -> Option<&Instrument> {
        self.instruments
            .iter()
            .find(|i| i.instrument_key == instrument_key)
    }
}
