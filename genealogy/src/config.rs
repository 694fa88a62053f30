//! Engine configuration
//!
//! Bounds and thresholds used by the query functions. Everything has a
//! default, so an empty JSON object is a valid configuration.

use serde::{Deserialize, Serialize};

use crate::error::{GenealogyError, Result};

/// Tunables for kinship search, events, statistics and tree building
///
/// # Examples
///
/// ```
/// use genealogy::EngineConfig;
///
/// let config = EngineConfig::from_json(r#"{"max_kinship_depth": 8}"#).unwrap();
/// assert_eq!(config.max_kinship_depth, 8);
/// assert_eq!(config.longest_lived_top_n, 10);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Generations searched upward from each person when resolving kinship
    pub max_kinship_depth: u32,

    /// Size of the longest-lived list in population statistics
    pub longest_lived_top_n: usize,

    /// Minimum age to appear in the longest-lived list
    pub longest_lived_min_age: u32,

    /// Default look-ahead for upcoming events, in days
    pub event_window_days: u32,

    /// Default depth for materialized subtrees
    pub tree_max_depth: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_kinship_depth: 12,
            longest_lived_top_n: 10,
            longest_lived_min_age: 90,
            event_window_days: 30,
            tree_max_depth: 4,
        }
    }
}

impl EngineConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_kinship_depth == 0 {
            return Err(GenealogyError::Config(
                "max_kinship_depth must be at least 1".into(),
            ));
        }
        if self.event_window_days > 366 {
            return Err(GenealogyError::Config(format!(
                "event_window_days {} exceeds one year",
                self.event_window_days
            )));
        }
        Ok(())
    }
}
