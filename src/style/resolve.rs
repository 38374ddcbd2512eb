//! Style resolution: ordered, rule-guarded settings to the concrete style of one entity.
//!
//! Every property is resolved on its own. The matching entries are searched from the
//! highest priority down and the first entry that defines the property *and* can be
//! realised wins. A bound attribute that cannot be read on this entity hands the
//! property to the next lower matching entry instead of failing the whole style.

use std::collections::{HashMap, HashSet};

use log::debug;

use super::scale::scale_linear;
use super::{
	ColorSetting, EdgeLabel, EdgeSettings, EdgeStyle, Gradient, NodeLabel, NodeSettings,
	NodeStyle, NumericSetting, RuleGuarded,
};
use crate::error::AttributeError;
use crate::graph::Graph;
use crate::graph::attributes::{Attribute, attribute_value, numeric_attribute_value};

/// Entries whose rule is absent or evaluates true on `id`, in priority order.
fn matching<'a, S: RuleGuarded>(graph: &Graph, id: &str, settings: &'a [S]) -> Vec<&'a S> {
	settings
		.iter()
		.filter(|entry| entry.rule().is_none_or(|rule| rule.evaluate(graph, id)))
		.collect()
}

/// Last writer wins, skipping writers whose value cannot be realised.
fn resolve<'a, S, P: 'a, V>(
	matched: &[&'a S],
	property: impl Fn(&'a S) -> Option<&'a P>,
	realise: impl Fn(&P) -> Result<V, AttributeError>,
) -> Option<V> {
	matched.iter().rev().filter_map(|&s| property(s)).find_map(|p| {
		realise(p)
			.inspect_err(|err| debug!("{err}, falling back to a lower priority setting"))
			.ok()
	})
}

fn numeric(graph: &Graph, id: &str, setting: &NumericSetting) -> Result<f64, AttributeError> {
	let Some(attribute) = &setting.attribute else {
		return Ok(setting.value);
	};
	let value = numeric_attribute_value(graph, id, attribute)?;
	let domain = setting
		.domain_range
		.or(attribute.range)
		.unwrap_or([value, value]);
	let range = setting.selected_range.unwrap_or([setting.min, setting.max]);
	Ok(scale_linear(domain, range, value))
}

fn color(graph: &Graph, id: &str, setting: &ColorSetting) -> Result<Gradient, AttributeError> {
	let Some(attribute) = &setting.attribute else {
		return Ok(setting.value.clone());
	};
	let value = numeric_attribute_value(graph, id, attribute)?;
	let domain = setting
		.domain_range
		.or(attribute.range)
		.unwrap_or([value, value]);
	let position = scale_linear(domain, [0.0, 1.0], value);
	Ok(Gradient::solid(setting.value.sample(position)))
}

/// Labels bound to an attribute show its value; unreadable ones keep their static text.
fn label_text(
	graph: &Graph,
	id: &str,
	text: &str,
	attribute: Option<&Attribute>,
) -> String {
	match attribute.map(|a| attribute_value(graph, id, a)) {
		Some(Ok(value)) => value.to_string(),
		Some(Err(err)) => {
			debug!("label on {id}: {err}");
			text.to_string()
		}
		None => text.to_string(),
	}
}

fn node_labels(graph: &Graph, id: &str, labels: &[NodeLabel]) -> Vec<NodeLabel> {
	labels
		.iter()
		.map(|label| NodeLabel {
			text: label_text(graph, id, &label.text, label.attribute.as_ref()),
			..label.clone()
		})
		.collect()
}

fn edge_labels(graph: &Graph, id: &str, labels: &[EdgeLabel]) -> Vec<EdgeLabel> {
	labels
		.iter()
		.map(|label| EdgeLabel {
			text: label_text(graph, id, &label.text, label.attribute.as_ref()),
			..label.clone()
		})
		.collect()
}

pub fn compute_node_style(graph: &Graph, id: &str, settings: &[NodeSettings]) -> NodeStyle {
	let matched = matching(graph, id, settings);
	let fallback = NodeStyle::default();
	let num = |s: &NumericSetting| numeric(graph, id, s);
	let col = |s: &ColorSetting| color(graph, id, s);

	NodeStyle {
		shape: resolve(&matched, |s| s.properties.shape.as_ref(), |s| Ok(s.value))
			.unwrap_or(fallback.shape),
		size: resolve(&matched, |s| s.properties.size.as_ref(), num).unwrap_or(fallback.size),
		color: resolve(&matched, |s| s.properties.color.as_ref(), col).unwrap_or(fallback.color),
		stroke_width: resolve(&matched, |s| s.properties.stroke_width.as_ref(), num)
			.unwrap_or(fallback.stroke_width),
		stroke_color: resolve(&matched, |s| s.properties.stroke_color.as_ref(), col)
			.unwrap_or(fallback.stroke_color),
		labels: resolve(
			&matched,
			|s| s.properties.labels.as_ref(),
			|labels| Ok(node_labels(graph, id, labels)),
		)
		.unwrap_or_default(),
		shadow: false,
	}
}

pub fn compute_edge_style(graph: &Graph, id: &str, settings: &[EdgeSettings]) -> EdgeStyle {
	let matched = matching(graph, id, settings);
	let fallback = EdgeStyle::default();
	let num = |s: &NumericSetting| numeric(graph, id, s);

	EdgeStyle {
		kind: resolve(&matched, |s| s.properties.kind.as_ref(), |s| Ok(s.value))
			.unwrap_or(fallback.kind),
		width: resolve(&matched, |s| s.properties.width.as_ref(), num).unwrap_or(fallback.width),
		color: resolve(
			&matched,
			|s| s.properties.color.as_ref(),
			|s| color(graph, id, s),
		)
		.unwrap_or(fallback.color),
		partial_start: resolve(&matched, |s| s.properties.partial_start.as_ref(), num)
			.unwrap_or(fallback.partial_start),
		partial_end: resolve(&matched, |s| s.properties.partial_end.as_ref(), num)
			.unwrap_or(fallback.partial_end),
		decorators: resolve(
			&matched,
			|s| s.properties.decorators.as_ref(),
			|s| Ok(s.value.clone()),
		)
		.unwrap_or_default(),
		labels: resolve(
			&matched,
			|s| s.properties.labels.as_ref(),
			|labels| Ok(edge_labels(graph, id, labels)),
		)
		.unwrap_or_default(),
	}
}

pub fn compute_node_styles(graph: &Graph, settings: &[NodeSettings]) -> HashMap<String, NodeStyle> {
	graph
		.nodes()
		.iter()
		.map(|node| (node.id.clone(), compute_node_style(graph, &node.id, settings)))
		.collect()
}

pub fn compute_edge_styles(graph: &Graph, settings: &[EdgeSettings]) -> HashMap<String, EdgeStyle> {
	graph
		.links()
		.iter()
		.map(|link| (link.id.clone(), compute_edge_style(graph, &link.id, settings)))
		.collect()
}

/// Transient UI state layered over resolved styles; the rule engine never sees it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct InteractionState {
	pub hovered: Option<String>,
	pub selected: HashSet<String>,
}

impl InteractionState {
	pub fn highlights(&self, id: &str) -> bool {
		self.hovered.as_deref() == Some(id) || self.selected.contains(id)
	}
}

/// Sets `shadow` on hovered and selected nodes, clears it everywhere else.
pub fn apply_interaction_overrides(
	styles: &mut HashMap<String, NodeStyle>,
	interaction: &InteractionState,
) {
	for (id, style) in styles.iter_mut() {
		style.shadow = interaction.highlights(id);
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::graph::attributes::{AttributeCatalog, Owner};
	use crate::rules::{AtomicRule, ComparisonOperator, LogicalOperator, Rule, RuleNode, RuleTarget};
	use crate::style::{NodeProperties, EdgeProperties, Rgba, SelectSetting, EdgeType};

	fn graph() -> Graph {
		Graph::from_json(
			r#"{
			"nodes": [
				{"key": "a", "attributes": {"stars": 10, "name": "alpha"}},
				{"key": "b", "attributes": {"stars": 80, "name": "beta"}},
				{"key": "c", "attributes": {"stars": 45}}
			],
			"edges": [
				{"key": "ab", "source": "a", "target": "b"},
				{"key": "bc", "source": "b", "target": "c"}
			]
		}"#,
		)
		.unwrap()
	}

	fn stars_rule(op: ComparisonOperator, value: f64, target: RuleTarget) -> Rule {
		Rule::new(
			LogicalOperator::And,
			vec![RuleNode::Atomic(AtomicRule::new(
				op,
				target,
				Attribute::node_number("stars"),
				value,
			))],
		)
	}

	fn node_entry(id: u64, rule: Option<Rule>, properties: NodeProperties) -> NodeSettings {
		NodeSettings {
			id,
			priority: id as i32,
			rule,
			source: None,
			properties,
		}
	}

	const RED: Rgba = Rgba::rgb(255, 0, 0);

	#[test]
	fn properties_resolve_independently_last_match_wins() {
		let graph = graph();
		let defaults = NodeProperties::defaults();
		let settings = vec![
			node_entry(0, None, defaults.clone()),
			node_entry(
				1,
				Some(stars_rule(ComparisonOperator::Greater, 0.0, RuleTarget::Node)),
				NodeProperties {
					color: Some(ColorSetting::new(Gradient::solid(RED))),
					..Default::default()
				},
			),
			node_entry(
				2,
				Some(stars_rule(ComparisonOperator::Greater, 50.0, RuleTarget::Node)),
				NodeProperties {
					size: Some(NumericSetting::new(9.0, 1.0, 10.0)),
					..Default::default()
				},
			),
		];

		let style = compute_node_style(&graph, "b", &settings);
		assert_eq!(style.stroke_color, defaults.stroke_color.unwrap().value);
		assert_eq!(style.color, Gradient::solid(RED));
		assert_eq!(style.size, 9.0);

		// entry 3 does not match "a", so size comes from the defaults
		let style = compute_node_style(&graph, "a", &settings);
		assert_eq!(style.color, Gradient::solid(RED));
		assert_eq!(style.size, 5.0);
	}

	#[test]
	fn bound_numeric_setting_scales_the_attribute() {
		let graph = graph();
		let catalog = AttributeCatalog::scan(&graph);
		let mut size = NumericSetting::new(5.0, 1.0, 10.0);
		size.bind(catalog.find("stars", Owner::Node).unwrap().clone());
		assert_eq!(size.domain_range, Some([10.0, 80.0]));
		assert_eq!(size.selected_range, Some([1.0, 10.0]));
		let settings = vec![node_entry(
			0,
			None,
			NodeProperties {
				size: Some(size),
				..NodeProperties::defaults()
			},
		)];
		assert_eq!(compute_node_style(&graph, "a", &settings).size, 1.0);
		assert_eq!(compute_node_style(&graph, "b", &settings).size, 10.0);
	}

	#[test]
	fn bound_color_samples_the_gradient() {
		let graph = graph();
		let catalog = AttributeCatalog::scan(&graph);
		let (from, to) = (Rgba::rgb(0, 40, 200), Rgba::rgb(200, 100, 0));
		let mut color = ColorSetting::new(Gradient::two_stop(from, to));
		color.bind(catalog.find("stars", Owner::Node).unwrap().clone());
		let settings = vec![node_entry(
			0,
			None,
			NodeProperties {
				color: Some(color),
				..NodeProperties::defaults()
			},
		)];
		assert_eq!(
			compute_node_style(&graph, "c", &settings).color,
			Gradient::solid(Rgba::rgb(100, 70, 100))
		);
	}

	#[test]
	fn unreadable_attribute_falls_back_to_lower_priority() {
		let graph = graph();
		let mut size = NumericSetting::new(5.0, 1.0, 10.0);
		size.bind(Attribute {
			range: Some([0.0, 1.0]),
			..Attribute::node_number("missing")
		});
		let settings = vec![
			node_entry(0, None, NodeProperties::defaults()),
			node_entry(
				1,
				None,
				NodeProperties {
					size: Some(size),
					..Default::default()
				},
			),
		];
		assert_eq!(compute_node_style(&graph, "a", &settings).size, 5.0);
	}

	#[test]
	fn labels_are_a_snapshot_with_attribute_text() {
		let graph = graph();
		let name = Attribute {
			kind: crate::graph::attributes::AttributeType::String,
			..Attribute::node_number("name")
		};
		let labels = vec![
			NodeLabel {
				text: "static".into(),
				..Default::default()
			},
			NodeLabel {
				text: "unknown".into(),
				attribute: Some(name),
				..Default::default()
			},
		];
		let settings = vec![
			node_entry(
				0,
				None,
				NodeProperties {
					labels: Some(vec![NodeLabel::default()]),
					..NodeProperties::defaults()
				},
			),
			node_entry(
				1,
				None,
				NodeProperties {
					labels: Some(labels),
					..Default::default()
				},
			),
		];
		let texts = |id| -> Vec<String> {
			compute_node_style(&graph, id, &settings)
				.labels
				.into_iter()
				.map(|l| l.text)
				.collect()
		};
		assert_eq!(texts("a"), ["static", "alpha"]);
		assert_eq!(texts("c"), ["static", "unknown"]);
	}

	#[test]
	fn edge_rules_can_test_endpoints() {
		let graph = graph();
		let settings = vec![
			EdgeSettings {
				id: 0,
				priority: 0,
				rule: None,
				source: None,
				properties: EdgeProperties::defaults(),
			},
			EdgeSettings {
				id: 1,
				priority: 1,
				rule: Some(stars_rule(ComparisonOperator::Less, 50.0, RuleTarget::Source)),
				source: None,
				properties: EdgeProperties {
					kind: Some(SelectSetting::new(EdgeType::Conical)),
					width: Some(NumericSetting::new(4.0, 0.0, 5.0)),
					..Default::default()
				},
			},
		];
		let styles = compute_edge_styles(&graph, &settings);
		assert_eq!(styles["ab"].kind, EdgeType::Conical);
		assert_eq!(styles["ab"].width, 4.0);
		assert_eq!(styles["bc"].kind, EdgeType::Straight);
		assert_eq!(styles["bc"].width, 1.0);
		assert_eq!(styles["bc"].partial_end, 1.0);
	}

	#[test]
	fn hover_sets_shadow_after_resolution() {
		let graph = graph();
		let settings = vec![node_entry(0, None, NodeProperties::defaults())];
		let mut styles = compute_node_styles(&graph, &settings);
		let interaction = InteractionState {
			hovered: Some("b".into()),
			..Default::default()
		};
		apply_interaction_overrides(&mut styles, &interaction);
		assert!(styles["b"].shadow);
		assert!(!styles["a"].shadow);

		apply_interaction_overrides(&mut styles, &InteractionState::default());
		assert!(!styles["b"].shadow);
	}
}
