//! Editor configuration.
//!
//! Every field has a default, so a partial JSON document only overrides what it names.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EditorConfig {
	pub thresholds: Thresholds,
	pub animation: AnimationConfig,
	pub simulation: SimulationConfig,
	pub bundling: BundlingConfig,
	pub hierarchical: HierarchicalConfig,
	pub interaction: InteractionConfig,
}

impl EditorConfig {
	pub fn from_json(json: &str) -> Result<Self, ConfigError> {
		let config: EditorConfig = serde_json::from_str(json)?;
		config.validate()?;
		Ok(config)
	}

	pub fn validate(&self) -> Result<(), ConfigError> {
		if self.thresholds.animate_below > self.thresholds.debounce_above {
			return Err(ConfigError::Invalid(
				"animateBelow must not exceed debounceAbove".into(),
			));
		}
		if self.bundling.cycles == 0 || self.bundling.iterations == 0 {
			return Err(ConfigError::Invalid(
				"bundling needs at least one cycle and one iteration".into(),
			));
		}
		if !(0.0..1.0).contains(&self.simulation.alpha_min) {
			return Err(ConfigError::Invalid("alphaMin must be in [0, 1)".into()));
		}
		Ok(())
	}
}

/// Graph-size heuristics, measured in `order + size` (nodes plus edges).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Thresholds {
	pub animate_below: usize,
	pub debounce_above: usize,
	pub debounce_ms: f64,
	pub discrete_max_values: usize,
}

impl Default for Thresholds {
	fn default() -> Self {
		Self {
			animate_below: 400,
			debounce_above: 2500,
			debounce_ms: 150.0,
			discrete_max_values: 10,
		}
	}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AnimationConfig {
	pub duration_ms: f64,
}

impl Default for AnimationConfig {
	fn default() -> Self {
		Self {
			duration_ms: 1000.0,
		}
	}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SimulationConfig {
	pub force_charge: f32,
	pub force_spring: f32,
	pub force_max: f32,
	pub node_speed: f32,
	pub damping_factor: f32,
	pub node_mass: f32,
	pub center_strength: f32,
	pub alpha_min: f64,
	pub alpha_decay: f64,
	pub drag_alpha_target: f64,
	pub resume_alpha: f64,
	pub resize_alpha: f64,
	/// Seconds of simulated time per tick.
	pub tick_dt: f32,
}

impl Default for SimulationConfig {
	fn default() -> Self {
		Self {
			force_charge: 150.0,
			force_spring: 0.05,
			force_max: 100.0,
			node_speed: 3000.0,
			damping_factor: 0.9,
			node_mass: 10.0,
			center_strength: 0.1,
			alpha_min: 0.001,
			alpha_decay: 1.0 - 0.001_f64.powf(1.0 / 300.0),
			drag_alpha_target: 0.3,
			resume_alpha: 0.5,
			resize_alpha: 0.3,
			tick_dt: 0.016,
		}
	}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BundlingConfig {
	pub iterations: usize,
	pub cycles: usize,
	pub stiffness: f64,
	pub step_size: f64,
	pub iterations_rate: f64,
	pub subdivision_seed: usize,
	pub subdivision_rate: usize,
	pub compatibility_threshold: f64,
}

impl Default for BundlingConfig {
	fn default() -> Self {
		Self {
			iterations: 100,
			cycles: 6,
			stiffness: 0.1,
			step_size: 0.1,
			iterations_rate: 0.7,
			subdivision_seed: 1,
			subdivision_rate: 2,
			compatibility_threshold: 0.6,
		}
	}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HierarchicalConfig {
	pub node_size: f64,
	pub node_spacing: f64,
	pub layer_spacing: f64,
	pub random_seed: u64,
	/// Iterations of the offline spring embedder behind `force` and `disco`.
	pub embedding_iterations: usize,
	pub stress_iterations: usize,
	/// Passes of pairwise overlap removal for the spore layouts.
	pub overlap_passes: usize,
}

impl Default for HierarchicalConfig {
	fn default() -> Self {
		Self {
			node_size: 30.0,
			node_spacing: 20.0,
			layer_spacing: 60.0,
			random_seed: 1,
			embedding_iterations: 300,
			stress_iterations: 60,
			overlap_passes: 50,
		}
	}
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct InteractionConfig {
	/// Keep a dragged node pinned where it was dropped.
	pub sticky: bool,
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn partial_json_keeps_defaults() {
		let config =
			EditorConfig::from_json(r#"{"thresholds": {"animateBelow": 100}}"#).unwrap();
		assert_eq!(config.thresholds.animate_below, 100);
		assert_eq!(config.thresholds.debounce_above, 2500);
		assert_eq!(config.bundling.iterations, 100);
	}

	#[test]
	fn rejects_inverted_thresholds() {
		let err = EditorConfig::from_json(
			r#"{"thresholds": {"animateBelow": 5000, "debounceAbove": 10}}"#,
		)
		.unwrap_err();
		assert!(matches!(err, ConfigError::Invalid(_)));
	}
}
