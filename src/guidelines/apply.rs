use log::{info, warn};

use super::Guideline;
use crate::error::GuidelineError;
use crate::graph::attributes::{AttributeCatalog, Owner};
use crate::settings::{AttributePicker, GraphSettings, select_attribute};
use crate::style::{EdgeSettings, NodeSettings};

/// Writes a guideline's recommendations into the live settings.
///
/// Index-0 properties overwrite the live defaults, labels are appended, conditional
/// entries are appended with fresh ids. Attribute requests (discrete styling, bindings,
/// labels) run last so they survive the merge. On error `settings` is left untouched.
pub fn apply_guideline(
	guideline: &Guideline,
	settings: &mut GraphSettings,
	catalog: &AttributeCatalog,
	discrete_max_values: usize,
	picker: &mut dyn AttributePicker,
) -> Result<(), GuidelineError> {
	info!("applying guideline {}", guideline.name);
	let mut staged = settings.clone();
	merge_into(guideline, &mut staged, catalog, discrete_max_values, picker)?;
	*settings = staged;
	Ok(())
}

fn merge_into(
	guideline: &Guideline,
	settings: &mut GraphSettings,
	catalog: &AttributeCatalog,
	discrete_max_values: usize,
	picker: &mut dyn AttributePicker,
) -> Result<(), GuidelineError> {
	let mut recommendations = guideline.clone();
	recommendations.tag_sources();
	let recommendations = recommendations.recommendations;

	if let Some(layout) = &recommendations.layout {
		if let Some(setting) = &layout.layout {
			settings.layout.layout = setting.clone();
		}
		if let Some(setting) = &layout.edge_type {
			settings.layout.edge_type = setting.clone();
		}
	}

	if let Some(node_settings) = &recommendations.node_settings {
		if let Some(first) = node_settings.first() {
			settings
				.default_node_settings()
				.properties
				.merge(&first.properties);
			for label in first.properties.labels.iter().flatten() {
				let mut label = label.clone();
				if label.attribute.is_none() {
					match select_attribute(catalog, |a| a.owner == Owner::Node, picker) {
						Ok(attribute) => label.attribute = Some(attribute),
						Err(err) => {
							warn!("guideline {}: label skipped, {}", guideline.name, err);
							continue;
						}
					}
				}
				label.id = settings.new_gui_id();
				settings
					.default_node_settings()
					.properties
					.labels
					.get_or_insert_with(Vec::new)
					.push(label);
			}
		}
		for entry in node_settings.iter().skip(1) {
			let entry = NodeSettings {
				id: settings.new_gui_id(),
				rule: fresh_rule(entry.rule.as_ref(), settings),
				..entry.clone()
			};
			settings.node_settings.push(entry);
		}
	}

	if let Some(edge_settings) = &recommendations.edge_settings {
		if let Some(first) = edge_settings.first() {
			settings
				.default_edge_settings()
				.properties
				.merge(&first.properties);
			for label in first.properties.labels.iter().flatten() {
				let mut label = label.clone();
				label.id = settings.new_gui_id();
				settings
					.default_edge_settings()
					.properties
					.labels
					.get_or_insert_with(Vec::new)
					.push(label);
			}
		}
		for entry in edge_settings.iter().skip(1) {
			let entry = EdgeSettings {
				id: settings.new_gui_id(),
				rule: fresh_rule(entry.rule.as_ref(), settings),
				..entry.clone()
			};
			settings.edge_settings.push(entry);
		}
	}

	if let Some(attributes) = &recommendations.attributes {
		if attributes.discrete {
			let first_new = settings.node_settings.len();
			settings.style_discrete_attribute(catalog, discrete_max_values, picker)?;
			for entry in &mut settings.node_settings[first_new..] {
				entry.source = Some(guideline.name.clone());
				entry.properties.tag_source(&guideline.name);
			}
		}
		for binding in &attributes.bind {
			settings.bind_attribute(binding, catalog, picker)?;
		}
		settings.add_labels(&attributes.labels, catalog, picker)?;
	}
	Ok(())
}

fn fresh_rule(
	rule: Option<&crate::rules::Rule>,
	settings: &mut GraphSettings,
) -> Option<crate::rules::Rule> {
	let mut rule = rule?.clone();
	rule.assign_ids(&mut || settings.new_gui_id());
	Some(rule)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::graph::Graph;
	use crate::guidelines::{Applied, compute_status, default_guidelines};
	use crate::settings::FirstChoice;

	fn catalog() -> AttributeCatalog {
		let graph = Graph::from_json(
			r#"{
			"nodes": [
				{"key": "a", "attributes": {"group": "x", "stars": 1}},
				{"key": "b", "attributes": {"group": "y", "stars": 5}}
			],
			"edges": [{"source": "a", "target": "b"}]
		}"#,
		)
		.unwrap();
		AttributeCatalog::scan(&graph)
	}

	#[test]
	fn every_default_guideline_applies_fully() {
		let catalog = catalog();
		let mut settings = GraphSettings::default();
		let guidelines = default_guidelines(&mut settings).unwrap();
		for guideline in &guidelines {
			let mut live = settings.clone();
			apply_guideline(guideline, &mut live, &catalog, 10, &mut FirstChoice).unwrap();
			let status = compute_status(guideline, &live);
			assert_eq!(status.applied, Applied::Fully, "{}", guideline.name);
		}
	}

	#[test]
	fn conditional_entries_get_fresh_ids() {
		let catalog = catalog();
		let mut settings = GraphSettings::default();
		let guidelines = default_guidelines(&mut settings).unwrap();
		let conditional = guidelines
			.iter()
			.find(|g| g.recommendations.edge_settings.as_ref().is_some_and(|s| s.len() > 1))
			.expect("a guideline with conditional edge settings");
		let before = settings.gui_id;
		apply_guideline(conditional, &mut settings, &catalog, 10, &mut FirstChoice).unwrap();
		apply_guideline(conditional, &mut settings, &catalog, 10, &mut FirstChoice).unwrap();
		let ids: Vec<u64> = settings.edge_settings.iter().skip(1).map(|s| s.id).collect();
		assert!(ids.len() >= 2);
		assert!(ids.iter().all(|&id| id >= before));
		assert_ne!(ids[0], ids[ids.len() / 2]);
	}

	#[test]
	fn a_failed_attribute_request_leaves_the_settings_untouched() {
		let bare = Graph::from_json(
			r#"{"nodes": [{"key": "a"}, {"key": "b"}], "edges": [{"source": "a", "target": "b"}]}"#,
		)
		.unwrap();
		let catalog = AttributeCatalog::scan(&bare);
		let mut settings = GraphSettings::default();
		let guidelines = default_guidelines(&mut settings).unwrap();
		let discrete = guidelines
			.iter()
			.find(|g| g.recommendations.attributes.as_ref().is_some_and(|a| a.discrete))
			.expect("a guideline with discrete styling");
		let before = settings.clone();

		let result = apply_guideline(discrete, &mut settings, &catalog, 10, &mut FirstChoice);
		assert!(result.is_err());
		assert_eq!(settings, before);
	}

	#[test]
	fn discrete_entries_are_tagged_with_the_guideline() {
		let catalog = catalog();
		let mut settings = GraphSettings::default();
		let guidelines = default_guidelines(&mut settings).unwrap();
		let discrete = guidelines
			.iter()
			.find(|g| g.recommendations.attributes.as_ref().is_some_and(|a| a.discrete))
			.expect("a guideline with discrete styling");
		let defaults = settings.node_settings.len();
		apply_guideline(discrete, &mut settings, &catalog, 10, &mut FirstChoice).unwrap();

		let added = &settings.node_settings[defaults..];
		assert_eq!(added.len(), 2);
		for entry in added {
			assert_eq!(entry.source.as_deref(), Some(discrete.name.as_str()));
			let color = entry.properties.color.as_ref().unwrap();
			assert_eq!(color.source.as_deref(), Some(discrete.name.as_str()));
		}
	}
}
