use std::fmt;

use serde::{Deserialize, Serialize};

/// The three independent fixed-period schedules run for every entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Cadence {
    Raw,
    Rollup,
    Profile,
}

impl Cadence {
    pub const ALL: [Cadence; 3] = [Cadence::Raw, Cadence::Rollup, Cadence::Profile];

    pub fn as_str(&self) -> &'static str {
        match self {
            Cadence::Raw => "raw",
            Cadence::Rollup => "rollup",
            Cadence::Profile => "profile",
        }
    }

    /// Whether ticks of this cadence call the external fetcher.
    pub fn fetches(&self) -> bool {
        !matches!(self, Cadence::Rollup)
    }
}

impl fmt::Display for Cadence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
