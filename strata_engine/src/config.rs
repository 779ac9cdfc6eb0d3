// Copyright 2025 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Engine configuration.
//!
//! Every field has a default, so partial JSON loads over the defaults.

use serde::{Deserialize, Serialize};
use strata_index::{IndexStrategy, StrategyThresholds};

use crate::error::ConfigError;

/// Millisecond timestamp or duration.
pub type Millis = i64;

/// Spatial index strategy as it appears in configuration.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyConfig {
    /// Switch by item count.
    #[default]
    Auto,
    /// Always scan.
    Linear,
    /// Always use the R-tree.
    Tree,
}

impl From<StrategyConfig> for IndexStrategy {
    fn from(s: StrategyConfig) -> Self {
        match s {
            StrategyConfig::Auto => Self::Auto,
            StrategyConfig::Linear => Self::ForceLinear,
            StrategyConfig::Tree => Self::ForceTree,
        }
    }
}

/// Per-layer spatial index settings.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Requested strategy.
    pub strategy: StrategyConfig,
    /// Item count at which the tree switches on.
    pub tree_on: usize,
    /// Item count below which the tree switches off.
    pub tree_off: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        let t = StrategyThresholds::default();
        Self {
            strategy: StrategyConfig::Auto,
            tree_on: t.tree_on,
            tree_off: t.tree_off,
        }
    }
}

impl IndexConfig {
    /// Thresholds for the adaptive backend.
    pub fn thresholds(&self) -> StrategyThresholds {
        StrategyThresholds {
            tree_on: self.tree_on,
            tree_off: self.tree_off,
        }
    }
}

/// Tunables for validation, snapping, and exact-result scheduling. Lengths are millimetres.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Scene width.
    pub scene_width: f64,
    /// Scene height.
    pub scene_height: f64,
    /// Minimum piece width and height.
    pub min_size: f64,
    /// Gaps below this produce a spacing warning.
    pub warn_gap: f64,
    /// Grid pitch.
    pub grid_size: f64,
    /// Whether grid snapping is applied.
    pub grid_enabled: bool,
    /// Facing edges closer than this are pulled flush.
    pub collage_threshold: f64,
    /// Maximum offset at which an alignment guide is reported.
    pub guide_tolerance: f64,
    /// How long an exact result stays authoritative.
    pub freshness_window_ms: Millis,
    /// Quiet time before dependent pieces are rechecked.
    pub idle_debounce_ms: Millis,
    /// Spatial index settings.
    pub index: IndexConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            scene_width: 1000.0,
            scene_height: 1000.0,
            min_size: 5.0,
            warn_gap: 3.0,
            grid_size: 10.0,
            grid_enabled: false,
            collage_threshold: 1.0,
            guide_tolerance: 0.5,
            freshness_window_ms: 5000,
            idle_debounce_ms: 300,
            index: IndexConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Parse JSON over the defaults and validate the result.
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(s).map_err(|e| ConfigError::Json(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject inconsistent values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("scene_width", self.scene_width),
            ("scene_height", self.scene_height),
            ("min_size", self.min_size),
            ("warn_gap", self.warn_gap),
            ("grid_size", self.grid_size),
            ("collage_threshold", self.collage_threshold),
            ("guide_tolerance", self.guide_tolerance),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::NotPositive { field, value });
            }
        }
        #[allow(
            clippy::cast_precision_loss,
            reason = "Durations are small; the value is only echoed in the error."
        )]
        for (field, value) in [
            ("freshness_window_ms", self.freshness_window_ms),
            ("idle_debounce_ms", self.idle_debounce_ms),
        ] {
            if value <= 0 {
                return Err(ConfigError::NotPositive {
                    field,
                    value: value as f64,
                });
            }
        }
        if self.index.tree_off > self.index.tree_on {
            return Err(ConfigError::ThresholdOrder {
                tree_on: self.index.tree_on,
                tree_off: self.index.tree_off,
            });
        }
        Ok(())
    }
}
