//! Game tuning and campaign definitions
//!
//! Both are plain serde structs loaded from JSON. Anything missing from the
//! file falls back to the defaults in [`crate::consts`].

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::error::ConfigError;

/// Tuning values for building and crossing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // === Building ===
    /// Distance between consecutive segments
    pub segment_spacing: f32,
    /// Segment cost for structures that don't carry their own
    pub default_segment_cost: u32,

    // === Crossing ===
    /// Vehicle speed (units per second)
    pub vehicle_speed: f32,
    /// Arrival tolerance on the ground plane
    pub finish_epsilon: f32,
    /// Give up on a crossing after this long (None = never)
    pub max_traversal_secs: Option<f32>,
    /// Vehicle falls when it drives past the end of the built segments
    pub require_support: bool,

    // === Flow ===
    /// Delay after a completed level before the next one is set up
    pub level_transition_delay: f32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            segment_spacing: SEGMENT_SPACING,
            default_segment_cost: DEFAULT_SEGMENT_COST,

            vehicle_speed: VEHICLE_SPEED,
            finish_epsilon: FINISH_EPSILON,
            max_traversal_secs: Some(MAX_TRAVERSAL_SECS),
            require_support: true,

            level_transition_delay: LEVEL_TRANSITION_DELAY,
        }
    }
}

impl Settings {
    /// Parse settings from a JSON document and validate them
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let settings: Settings = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        let settings = Self::from_json(&json)?;
        log::info!("Loaded settings");
        Ok(settings)
    }

    /// Reject values that would stall or break the simulation
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.segment_spacing > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "segment_spacing must be positive, got {}",
                self.segment_spacing
            )));
        }
        if !(self.vehicle_speed > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "vehicle_speed must be positive, got {}",
                self.vehicle_speed
            )));
        }
        if !(self.finish_epsilon > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "finish_epsilon must be positive, got {}",
                self.finish_epsilon
            )));
        }
        if let Some(max) = self.max_traversal_secs {
            if !(max > 0.0) {
                return Err(ConfigError::Invalid(format!(
                    "max_traversal_secs must be positive, got {max}"
                )));
            }
        }
        if !(self.level_transition_delay >= 0.0) {
            return Err(ConfigError::Invalid(format!(
                "level_transition_delay can't be negative, got {}",
                self.level_transition_delay
            )));
        }
        Ok(())
    }
}

/// Static configuration for one level
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelDefinition {
    pub name: String,
    pub starting_budget: u32,
}

impl LevelDefinition {
    pub fn new(name: impl Into<String>, starting_budget: u32) -> Self {
        Self {
            name: name.into(),
            starting_budget,
        }
    }
}

/// Ordered list of levels played in sequence
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Campaign {
    pub levels: Vec<LevelDefinition>,
}

impl Default for Campaign {
    fn default() -> Self {
        Self {
            levels: vec![
                LevelDefinition::new("Creek", 20),
                LevelDefinition::new("Ravine", 28),
                LevelDefinition::new("Canyon", 40),
            ],
        }
    }
}

impl Campaign {
    pub fn new(levels: Vec<LevelDefinition>) -> Self {
        Self { levels }
    }

    /// Parse a campaign from JSON, either `{"levels": [...]}` or a bare array
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Doc {
            Wrapped(Campaign),
            Bare(Vec<LevelDefinition>),
        }

        let campaign = match serde_json::from_str::<Doc>(json)? {
            Doc::Wrapped(c) => c,
            Doc::Bare(levels) => Campaign::new(levels),
        };
        if campaign.is_empty() {
            return Err(ConfigError::Invalid("campaign has no levels".to_string()));
        }
        Ok(campaign)
    }

    /// Load a campaign from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        let campaign = Self::from_json(&json)?;
        log::info!("Loaded campaign with {} levels", campaign.len());
        Ok(campaign)
    }

    pub fn get(&self, index: usize) -> Option<&LevelDefinition> {
        self.levels.get(index)
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }
}
