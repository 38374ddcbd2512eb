use log::debug;
use serde::{Deserialize, Serialize};

use super::Guideline;
use crate::rules::rules_equal;
use crate::settings::GraphSettings;
use crate::style::{PropertyCheck, RuleGuarded, Sourced};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Applied {
	Fully,
	Partially,
	#[default]
	NotApplied,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConflictKind {
	Layout,
	NodeSetting,
	EdgeSetting,
}

/// A recommended property that another guideline currently owns.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conflict {
	#[serde(rename = "type")]
	pub kind: ConflictKind,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub property: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub index: Option<usize>,
	pub conflicting_guideline_name: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GuidelineStatus {
	pub applied: Applied,
	pub conflicts: Vec<Conflict>,
}

#[derive(Default)]
struct Tally {
	applied: usize,
	total: usize,
	conflicts: Vec<Conflict>,
}

impl Tally {
	fn setting<S: Sourced>(&mut self, recommended: &Option<S>, live: &S, name: &str) {
		let Some(recommended) = recommended else {
			return;
		};
		self.total += 1;
		if live.source() == Some(name) && live.same_value(recommended) {
			self.applied += 1;
		} else if let Some(other) = live.source().filter(|s| *s != name) {
			self.conflicts.push(Conflict {
				kind: ConflictKind::Layout,
				property: None,
				index: None,
				conflicting_guideline_name: other.to_string(),
			});
		}
	}

	fn properties(&mut self, checks: Vec<PropertyCheck>, kind: ConflictKind) {
		for check in checks {
			self.total += 1;
			if check.applied {
				self.applied += 1;
			} else if let Some(other) = check.other_source {
				self.conflicts.push(Conflict {
					kind,
					property: Some(check.key.to_string()),
					index: Some(0),
					conflicting_guideline_name: other,
				});
			}
		}
	}

	/// Conditional entries are matched by rule structure and count once each.
	fn conditional<S>(&mut self, recommended: &[S], live: &[S], name: &str, kind: ConflictKind)
	where
		S: RuleGuarded + HasSource,
	{
		for (index, entry) in recommended.iter().enumerate().skip(1) {
			self.total += 1;
			let Some(current) = live.iter().find(|l| rules_equal(l.rule(), entry.rule())) else {
				continue;
			};
			match current.entry_source() {
				Some(source) if source == name => self.applied += 1,
				Some(other) => self.conflicts.push(Conflict {
					kind,
					property: None,
					index: Some(index),
					conflicting_guideline_name: other.to_string(),
				}),
				None => {}
			}
		}
	}
}

trait HasSource {
	fn entry_source(&self) -> Option<&str>;
}

impl HasSource for crate::style::NodeSettings {
	fn entry_source(&self) -> Option<&str> {
		self.source.as_deref()
	}
}

impl HasSource for crate::style::EdgeSettings {
	fn entry_source(&self) -> Option<&str> {
		self.source.as_deref()
	}
}

/// `Fully` when every recommended property is live and owned by this guideline,
/// `Partially` when some are, otherwise `NotApplied`.
pub fn compute_status(guideline: &Guideline, settings: &GraphSettings) -> GuidelineStatus {
	let name = guideline.name.as_str();
	let recommendations = &guideline.recommendations;
	let mut tally = Tally::default();

	if let Some(layout) = &recommendations.layout {
		tally.setting(&layout.layout, &settings.layout.layout, name);
		tally.setting(&layout.edge_type, &settings.layout.edge_type, name);
	}
	if let Some(recommended) = &recommendations.node_settings {
		if let (Some(first), Some(live)) = (recommended.first(), settings.node_settings.first()) {
			tally.properties(
				first.properties.check_against(&live.properties, name),
				ConflictKind::NodeSetting,
			);
		}
		tally.conditional(recommended, &settings.node_settings, name, ConflictKind::NodeSetting);
	}
	if let Some(recommended) = &recommendations.edge_settings {
		if let (Some(first), Some(live)) = (recommended.first(), settings.edge_settings.first()) {
			tally.properties(
				first.properties.check_against(&live.properties, name),
				ConflictKind::EdgeSetting,
			);
		}
		tally.conditional(recommended, &settings.edge_settings, name, ConflictKind::EdgeSetting);
	}

	let applied = match tally.applied {
		0 => Applied::NotApplied,
		n if n == tally.total => Applied::Fully,
		_ => Applied::Partially,
	};
	if !tally.conflicts.is_empty() {
		debug!("guideline {name}: {} conflicts", tally.conflicts.len());
	}
	GuidelineStatus {
		applied,
		conflicts: tally.conflicts,
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::graph::Graph;
	use crate::graph::attributes::AttributeCatalog;
	use crate::guidelines::{Recommendations, WeightedCondition, apply_guideline};
	use crate::guidelines::condition::{Condition, ConditionKind};
	use crate::layout::EdgeLayout;
	use crate::settings::FirstChoice;
	use crate::style::{NodeProperties, NodeSettings, NumericSetting, SelectSetting};

	fn guideline(name: &str) -> Guideline {
		let mut guideline = Guideline {
			id: 0,
			name: name.into(),
			description: String::new(),
			literature: vec![],
			root_condition: WeightedCondition {
				weight: 1.0,
				condition: Condition::new(ConditionKind::Boolean {
					property: "isDAG".into(),
					value: true,
				}),
				gui_id: None,
			},
			recommendations: Recommendations {
				layout: Some(crate::guidelines::LayoutRecommendation {
					layout: None,
					edge_type: Some(SelectSetting::new(EdgeLayout::Orthogonal)),
				}),
				node_settings: Some(vec![NodeSettings {
					id: 0,
					priority: 0,
					rule: None,
					source: None,
					properties: NodeProperties {
						size: Some(NumericSetting::new(8.0, 1.0, 10.0)),
						stroke_width: Some(NumericSetting::new(2.0, 0.0, 10.0)),
						..Default::default()
					},
				}]),
				..Default::default()
			},
			score: 0.0,
			status: GuidelineStatus::default(),
		};
		guideline.tag_sources();
		guideline
	}

	fn applied(guideline: &Guideline) -> GraphSettings {
		let graph = Graph::from_json(r#"{"nodes": [{"key": "a"}], "edges": []}"#).unwrap();
		let catalog = AttributeCatalog::scan(&graph);
		let mut settings = GraphSettings::default();
		apply_guideline(guideline, &mut settings, &catalog, 10, &mut FirstChoice).unwrap();
		settings
	}

	#[test]
	fn untouched_settings_are_not_applied() {
		let status = compute_status(&guideline("compact"), &GraphSettings::default());
		assert_eq!(status.applied, Applied::NotApplied);
		assert!(status.conflicts.is_empty());
	}

	#[test]
	fn overriding_one_property_downgrades_to_partially() {
		let ours = guideline("compact");
		let mut settings = applied(&ours);
		let status = compute_status(&ours, &settings);
		assert_eq!(status.applied, Applied::Fully);
		assert!(status.conflicts.is_empty());

		let size = settings.node_settings[0].properties.size.as_mut().unwrap();
		size.source = Some("readable".into());
		let status = compute_status(&ours, &settings);
		assert_eq!(status.applied, Applied::Partially);
		assert_eq!(status.conflicts.len(), 1);
		assert_eq!(status.conflicts[0].conflicting_guideline_name, "readable");
		assert_eq!(status.conflicts[0].property.as_deref(), Some("size"));
	}

	#[test]
	fn another_guideline_owning_the_layout_conflicts() {
		let ours = guideline("compact");
		let theirs = guideline("readable");
		let settings = applied(&theirs);
		let status = compute_status(&ours, &settings);
		assert_eq!(status.applied, Applied::NotApplied);
		assert_eq!(status.conflicts.len(), 3);
		assert!(status.conflicts.iter().any(|c| c.kind == ConflictKind::Layout));
	}
}
