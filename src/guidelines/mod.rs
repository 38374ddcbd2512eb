//! Guidelines: scored recommendations for layout and styling.

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::error::GuidelineError;
use crate::graph::characteristics::GraphCharacteristics;
use crate::layout::{EdgeLayout, LayoutType};
use crate::settings::{AttributeBinding, GraphSettings, LabelRequest};
use crate::style::{EdgeSettings, NodeSettings, SelectSetting};

mod apply;
pub mod condition;
mod status;

pub use apply::apply_guideline;
pub use condition::{Condition, ConditionKind, WeightedCondition};
pub use status::{Applied, Conflict, ConflictKind, GuidelineStatus, compute_status};

const DEFAULT_GUIDELINES: &str = include_str!("defaults.json");

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutRecommendation {
	#[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
	pub layout: Option<SelectSetting<LayoutType>>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub edge_type: Option<SelectSetting<EdgeLayout>>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AttributeRecommendation {
	/// One rule per value of a discrete node attribute.
	#[serde(default)]
	pub discrete: bool,
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub bind: Vec<AttributeBinding>,
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub labels: Vec<LabelRequest>,
}

/// Entry 0 of each settings list is merged into the live defaults; later entries are
/// appended as conditional overlays.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendations {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub layout: Option<LayoutRecommendation>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub node_settings: Option<Vec<NodeSettings>>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub edge_settings: Option<Vec<EdgeSettings>>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub attributes: Option<AttributeRecommendation>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Guideline {
	#[serde(default)]
	pub id: u64,
	pub name: String,
	#[serde(default)]
	pub description: String,
	/// DOIs.
	#[serde(default)]
	pub literature: Vec<String>,
	pub root_condition: WeightedCondition,
	#[serde(default)]
	pub recommendations: Recommendations,
	#[serde(skip)]
	pub score: f64,
	#[serde(skip)]
	pub status: GuidelineStatus,
}

impl Guideline {
	pub fn evaluate(&self, characteristics: &GraphCharacteristics) -> Result<f64, GuidelineError> {
		self.root_condition.condition.evaluate(characteristics)
	}

	/// Stamps this guideline's name as the source of every recommended property.
	pub fn tag_sources(&mut self) {
		let name = self.name.clone();
		if let Some(layout) = &mut self.recommendations.layout {
			if let Some(setting) = &mut layout.layout {
				setting.source = Some(name.clone());
			}
			if let Some(setting) = &mut layout.edge_type {
				setting.source = Some(name.clone());
			}
		}
		for entry in self.recommendations.node_settings.iter_mut().flatten() {
			entry.source = Some(name.clone());
			entry.properties.tag_source(&name);
		}
		for entry in self.recommendations.edge_settings.iter_mut().flatten() {
			entry.source = Some(name.clone());
			entry.properties.tag_source(&name);
		}
	}

	fn assign_ids(&mut self, settings: &mut GraphSettings) {
		self.id = settings.new_gui_id();
		let mut next_id = || settings.new_gui_id();
		self.root_condition.assign_gui_ids(&mut next_id);
		for entry in self.recommendations.node_settings.iter_mut().flatten() {
			entry.id = next_id();
			if let Some(rule) = &mut entry.rule {
				rule.assign_ids(&mut next_id);
			}
		}
		for entry in self.recommendations.edge_settings.iter_mut().flatten() {
			entry.id = next_id();
			if let Some(rule) = &mut entry.rule {
				rule.assign_ids(&mut next_id);
			}
		}
	}
}

/// Parses a guideline file, assigning GUI ids from `settings` and tagging sources.
pub fn load_guidelines(
	json: &str,
	settings: &mut GraphSettings,
) -> Result<Vec<Guideline>, GuidelineError> {
	let mut guidelines: Vec<Guideline> = serde_json::from_str(json)?;
	for guideline in &mut guidelines {
		guideline.assign_ids(settings);
		guideline.tag_sources();
	}
	info!("loaded {} guidelines", guidelines.len());
	Ok(guidelines)
}

/// The built-in guideline set.
pub fn default_guidelines(settings: &mut GraphSettings) -> Result<Vec<Guideline>, GuidelineError> {
	load_guidelines(DEFAULT_GUIDELINES, settings)
}

/// The static form: everything except scores and statuses.
pub fn export_guidelines(guidelines: &[Guideline]) -> Result<String, GuidelineError> {
	Ok(serde_json::to_string_pretty(guidelines)?)
}

/// Scores every guideline and sorts descending. A guideline whose conditions cannot be
/// evaluated scores 0.
pub fn sort_guidelines(guidelines: &mut [Guideline], characteristics: &GraphCharacteristics) {
	for guideline in guidelines.iter_mut() {
		guideline.score = guideline.evaluate(characteristics).unwrap_or_else(|err| {
			warn!("guideline {}: {}", guideline.name, err);
			0.0
		});
	}
	guidelines.sort_by(|a, b| b.score.total_cmp(&a.score));
}

/// Refreshes the status of every guideline against the live settings.
pub fn compute_statuses(guidelines: &mut [Guideline], settings: &GraphSettings) {
	for guideline in guidelines.iter_mut() {
		guideline.status = compute_status(guideline, settings);
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::graph::Graph;
	use crate::graph::attributes::AttributeCatalog;
	use crate::graph::sample::generate_sample_data;

	#[test]
	fn default_guidelines_load_with_fresh_ids_and_sources() {
		let mut settings = GraphSettings::default();
		let guidelines = default_guidelines(&mut settings).unwrap();
		assert!(!guidelines.is_empty());
		let mut ids: Vec<u64> = guidelines.iter().map(|g| g.id).collect();
		ids.dedup();
		assert_eq!(ids.len(), guidelines.len());
		assert!(ids.iter().all(|&id| id >= 3 && id < settings.gui_id));
		for guideline in &guidelines {
			assert!(guideline.root_condition.gui_id.is_some());
			for entry in guideline.recommendations.node_settings.iter().flatten() {
				assert_eq!(entry.source.as_deref(), Some(guideline.name.as_str()));
			}
		}
	}

	#[test]
	fn default_guidelines_score_on_a_sample_graph() {
		let graph = Graph::from_data(generate_sample_data(30, 40)).unwrap();
		let catalog = AttributeCatalog::scan(&graph);
		let characteristics = GraphCharacteristics::compute(&graph, &catalog, 10);
		let mut guidelines = default_guidelines(&mut GraphSettings::default()).unwrap();
		sort_guidelines(&mut guidelines, &characteristics);
		assert!(guidelines.windows(2).all(|w| w[0].score >= w[1].score));
		assert!(guidelines.iter().all(|g| (0.0..=1.0).contains(&g.score)));
	}

	#[test]
	fn export_keeps_the_static_form() {
		let mut settings = GraphSettings::default();
		let guidelines = default_guidelines(&mut settings).unwrap();
		let json = export_guidelines(&guidelines).unwrap();
		assert!(!json.contains("\"score\""));
		let reloaded = load_guidelines(&json, &mut settings).unwrap();
		assert_eq!(reloaded.len(), guidelines.len());
		assert_eq!(reloaded[0].name, guidelines[0].name);
	}
}
