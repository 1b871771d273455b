//! Worker hardware tier, used as a routing bias and a clamp boundary.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Ordinal grouping over workers: draft < standard < quality < premium.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Draft,
    Standard,
    Quality,
    Premium,
}

impl Tier {
    /// Rank used by the router's tier bonus term: draft=0 .. premium=3.
    pub fn rank(&self) -> u8 {
        match self {
            Tier::Draft => 0,
            Tier::Standard => 1,
            Tier::Quality => 2,
            Tier::Premium => 3,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Draft => "draft",
            Tier::Standard => "standard",
            Tier::Quality => "quality",
            Tier::Premium => "premium",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
