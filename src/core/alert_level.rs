//! Alert severity shared by every node of the monitoring tree.
//!
//! Levels form a closed, totally ordered set. Containers carry the maximum of
//! their children, so the ordering here is what decides which problem wins.

use colored::{ColoredString, Colorize};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::FleetError;

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum AlertLevel {
    /// Nothing to report, also the level of a container without children
    #[default]
    None,
    Low,
    Medium,
    High,
    Critical,
    /// The check could not produce a result. Ranks above `Critical`.
    Unknown,
}

impl AlertLevel {
    pub const ALL: [AlertLevel; 6] = [
        AlertLevel::None,
        AlertLevel::Low,
        AlertLevel::Medium,
        AlertLevel::High,
        AlertLevel::Critical,
        AlertLevel::Unknown,
    ];

    /// Reduce a sequence of levels to its maximum; an empty sequence is `None`.
    pub fn max_of<I>(levels: I) -> AlertLevel
    where
        I: IntoIterator<Item = AlertLevel>,
    {
        levels.into_iter().fold(AlertLevel::None, AlertLevel::max)
    }

    /// Whether this level should be brought to a human's attention.
    pub fn meets(self, threshold: AlertLevel) -> bool {
        self >= threshold
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AlertLevel::None => "none",
            AlertLevel::Low => "low",
            AlertLevel::Medium => "medium",
            AlertLevel::High => "high",
            AlertLevel::Critical => "critical",
            AlertLevel::Unknown => "unknown",
        }
    }

    /// Terminal label colored by severity
    pub fn colorize(&self) -> ColoredString {
        let label = self.as_str().to_uppercase();
        match self {
            AlertLevel::None => label.green(),
            AlertLevel::Low => label.cyan(),
            AlertLevel::Medium => label.yellow(),
            AlertLevel::High => label.red(),
            AlertLevel::Critical => label.red().bold(),
            AlertLevel::Unknown => label.magenta().bold(),
        }
    }
}

impl fmt::Display for AlertLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AlertLevel {
    type Err = FleetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_ascii_lowercase();
        AlertLevel::ALL
            .into_iter()
            .find(|level| level.as_str() == needle)
            .ok_or_else(|| FleetError::config(format!("Unknown alert level: {}", s)))
    }
}
