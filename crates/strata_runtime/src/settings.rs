//! Runtime settings

use std::path::Path;

use serde::{Deserialize, Serialize};

/// Demo runtime settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub world: WorldSettings,
    pub simulation: SimulationSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorldSettings {
    pub max_entities: usize,
    pub max_components: usize,
    pub max_systems: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationSettings {
    pub entity_count: usize,
    pub ticks: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            world: WorldSettings {
                max_entities: 4096,
                max_components: 64,
                max_systems: 16,
            },
            simulation: SimulationSettings {
                entity_count: 1024,
                ticks: 60,
            },
        }
    }
}

impl Settings {
    /// Load settings from a JSON file, or fall back to defaults when no
    /// path is given.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(path) => {
                let text = std::fs::read_to_string(path)?;
                Ok(serde_json::from_str(&text)?)
            }
            None => Ok(Self::default()),
        }
    }
}
