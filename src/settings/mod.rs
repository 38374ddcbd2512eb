//! Live settings: layout selection plus the ordered node and edge settings lists.

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::error::SettingsError;
use crate::graph::attributes::{Attribute, AttributeCatalog, Owner, discrete_attribute_filter};
use crate::layout::{EdgeLayout, LayoutType};
use crate::rules::{AtomicRule, ComparisonOperator, LogicalOperator, Rule, RuleNode, RuleTarget};
use crate::style::color::qualitative_color_scheme;
use crate::style::{
	ColorSetting, EdgeLabel, EdgeProperties, EdgeSettings, Gradient, NodeLabel, NodeProperties,
	NodeSettings, NumericSetting, SelectSetting,
};

mod history;

pub use history::History;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutSettings {
	#[serde(rename = "type")]
	pub layout: SelectSetting<LayoutType>,
	pub edge_type: SelectSetting<EdgeLayout>,
}

impl Default for LayoutSettings {
	fn default() -> Self {
		Self {
			layout: SelectSetting::new(LayoutType::ForceGraph),
			edge_type: SelectSetting::new(EdgeLayout::Straight),
		}
	}
}

/// Request to drive a numeric or color setting of the default entry from an attribute.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AttributeBinding {
	pub target: Owner,
	pub setting: String,
	/// When absent an [`AttributePicker`] chooses among the numeric candidates.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub name: Option<String>,
}

/// Request for an attribute label whose attribute is left to the picker.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LabelRequest {
	pub target: Owner,
}

/// The modal prompt collaborator: asks the user to pick one of `choices`.
pub trait AttributePicker {
	fn pick(&mut self, prompt: &str, choices: &[String]) -> Option<String>;
}

/// Picks the first candidate without asking.
#[derive(Clone, Copy, Debug, Default)]
pub struct FirstChoice;

impl AttributePicker for FirstChoice {
	fn pick(&mut self, _prompt: &str, choices: &[String]) -> Option<String> {
		choices.first().cloned()
	}
}

/// Everything needed to reconstruct styling and layout mode. Entry 0 of each list is
/// the unconditional default.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphSettings {
	#[serde(rename = "guiID")]
	pub gui_id: u64,
	pub layout: LayoutSettings,
	pub node_settings: Vec<NodeSettings>,
	pub edge_settings: Vec<EdgeSettings>,
}

impl Default for GraphSettings {
	fn default() -> Self {
		Self {
			gui_id: 3,
			layout: LayoutSettings::default(),
			node_settings: vec![NodeSettings {
				id: 1,
				priority: 0,
				rule: None,
				source: None,
				properties: NodeProperties::defaults(),
			}],
			edge_settings: vec![EdgeSettings {
				id: 2,
				priority: 0,
				rule: None,
				source: None,
				properties: EdgeProperties::defaults(),
			}],
		}
	}
}

impl GraphSettings {
	pub fn new_gui_id(&mut self) -> u64 {
		let id = self.gui_id;
		self.gui_id += 1;
		id
	}

	/// Free dragging only makes sense while edges are drawn straight.
	pub fn draggable(&self) -> bool {
		self.layout.edge_type.value == EdgeLayout::Straight
	}

	pub fn export_json(&self) -> Result<String, SettingsError> {
		Ok(serde_json::to_string_pretty(self)?)
	}

	/// Replaces the whole state; a malformed document leaves `self` untouched.
	pub fn import_json(&mut self, json: &str) -> Result<(), SettingsError> {
		*self = serde_json::from_str(json)?;
		Ok(())
	}

	pub fn default_node_settings(&mut self) -> &mut NodeSettings {
		if self.node_settings.is_empty() {
			self.node_settings.push(GraphSettings::default().node_settings.remove(0));
		}
		&mut self.node_settings[0]
	}

	pub fn default_edge_settings(&mut self) -> &mut EdgeSettings {
		if self.edge_settings.is_empty() {
			self.edge_settings.push(GraphSettings::default().edge_settings.remove(0));
		}
		&mut self.edge_settings[0]
	}

	/// Drops every attribute binding and every rule on a data attribute. Run on import,
	/// when previously bound attributes may not exist any more.
	pub fn unbind_attributes(&mut self) {
		for entry in &mut self.node_settings {
			let p = &mut entry.properties;
			for numeric in [&mut p.size, &mut p.stroke_width].into_iter().flatten() {
				numeric.attribute = None;
			}
			for color in [&mut p.color, &mut p.stroke_color].into_iter().flatten() {
				color.attribute = None;
			}
			if let Some(rule) = &mut entry.rule {
				rule.strip_attribute_based_rules();
			}
		}
		for entry in &mut self.edge_settings {
			let p = &mut entry.properties;
			for numeric in [&mut p.width, &mut p.partial_start, &mut p.partial_end]
				.into_iter()
				.flatten()
			{
				numeric.attribute = None;
			}
			if let Some(color) = &mut p.color {
				color.attribute = None;
			}
			if let Some(rule) = &mut entry.rule {
				rule.strip_attribute_based_rules();
			}
		}
		debug!("attribute bindings cleared");
	}

	pub fn bind_attribute(
		&mut self,
		binding: &AttributeBinding,
		catalog: &AttributeCatalog,
		picker: &mut dyn AttributePicker,
	) -> Result<(), SettingsError> {
		let attribute = match &binding.name {
			Some(name) => catalog
				.find(name, binding.target)
				.cloned()
				.ok_or_else(|| SettingsError::UnknownAttribute(name.clone()))?,
			None => select_attribute(
				catalog,
				|a| a.is_numeric() && a.owner == binding.target,
				picker,
			)?,
		};
		info!(
			"binding {:?}.{} to {}",
			binding.target, binding.setting, attribute.name
		);
		match self.bindable(binding)? {
			Bindable::Numeric(setting) => setting.bind(attribute),
			Bindable::Color(setting) => setting.bind(attribute),
		}
		Ok(())
	}

	fn bindable(&mut self, binding: &AttributeBinding) -> Result<Bindable<'_>, SettingsError> {
		let not_found = || SettingsError::SettingNotFound {
			target: format!("{:?}", binding.target).to_lowercase(),
			setting: binding.setting.clone(),
		};
		let found = match binding.target {
			Owner::Node => {
				let p = &mut self.default_node_settings().properties;
				match binding.setting.as_str() {
					"size" => p.size.as_mut().map(Bindable::Numeric),
					"strokeWidth" => p.stroke_width.as_mut().map(Bindable::Numeric),
					"color" => p.color.as_mut().map(Bindable::Color),
					"strokeColor" => p.stroke_color.as_mut().map(Bindable::Color),
					_ => None,
				}
			}
			Owner::Edge => {
				let p = &mut self.default_edge_settings().properties;
				match binding.setting.as_str() {
					"width" => p.width.as_mut().map(Bindable::Numeric),
					"partialStart" => p.partial_start.as_mut().map(Bindable::Numeric),
					"partialEnd" => p.partial_end.as_mut().map(Bindable::Numeric),
					"color" => p.color.as_mut().map(Bindable::Color),
					_ => None,
				}
			}
		};
		found.ok_or_else(not_found)
	}

	/// Appends one conditional node entry per distinct value of `attribute`, colored
	/// from an evenly spaced hue wheel.
	pub fn make_rules_for_discrete_attribute(&mut self, attribute: &Attribute) {
		let values = attribute.values.clone().unwrap_or_default();
		let colors = qualitative_color_scheme(values.len());
		for (value, color) in values.into_iter().zip(colors) {
			let mut rule = Rule::new(
				LogicalOperator::And,
				vec![RuleNode::Atomic(AtomicRule {
					kind: crate::graph::attributes::AttributeType::String,
					..AtomicRule::new(
						ComparisonOperator::Equal,
						RuleTarget::Node,
						attribute.clone(),
						value.as_str(),
					)
				})],
			);
			rule.assign_ids(&mut || self.new_gui_id());
			let id = self.new_gui_id();
			self.node_settings.push(NodeSettings {
				id,
				priority: 1,
				rule: Some(rule),
				source: None,
				properties: NodeProperties {
					color: Some(ColorSetting::new(Gradient::solid(color))),
					..Default::default()
				},
			});
		}
		info!(
			"added {} rules for discrete attribute {}",
			attribute.distinct_values(),
			attribute.name
		);
	}

	/// Picks a discrete attribute and styles it with [`Self::make_rules_for_discrete_attribute`].
	pub fn style_discrete_attribute(
		&mut self,
		catalog: &AttributeCatalog,
		max_distinct_values: usize,
		picker: &mut dyn AttributePicker,
	) -> Result<(), SettingsError> {
		let attribute = select_attribute(
			catalog,
			|a| a.owner == Owner::Node && discrete_attribute_filter(a, max_distinct_values),
			picker,
		)?;
		self.make_rules_for_discrete_attribute(&attribute);
		Ok(())
	}

	/// Adds one attribute label per request to the default entries.
	pub fn add_labels(
		&mut self,
		requests: &[LabelRequest],
		catalog: &AttributeCatalog,
		picker: &mut dyn AttributePicker,
	) -> Result<(), SettingsError> {
		for request in requests {
			let attribute = select_attribute(catalog, |a| a.owner == request.target, picker)?;
			let id = self.new_gui_id();
			match request.target {
				Owner::Node => self
					.default_node_settings()
					.properties
					.labels
					.get_or_insert_with(Vec::new)
					.push(NodeLabel {
						id,
						text: attribute.name.clone(),
						attribute: Some(attribute),
						..Default::default()
					}),
				Owner::Edge => self
					.default_edge_settings()
					.properties
					.labels
					.get_or_insert_with(Vec::new)
					.push(EdgeLabel {
						id,
						text: attribute.name.clone(),
						attribute: Some(attribute),
						..Default::default()
					}),
			}
		}
		Ok(())
	}
}

enum Bindable<'a> {
	Numeric(&'a mut NumericSetting),
	Color(&'a mut ColorSetting),
}

/// The only candidate, or the picker's choice among several.
pub fn select_attribute(
	catalog: &AttributeCatalog,
	filter: impl Fn(&Attribute) -> bool,
	picker: &mut dyn AttributePicker,
) -> Result<Attribute, SettingsError> {
	let candidates: Vec<&Attribute> = catalog.all().iter().filter(|a| filter(a)).collect();
	match candidates.as_slice() {
		[] => Err(SettingsError::NoAttribute),
		[only] => Ok((*only).clone()),
		_ => {
			let names: Vec<String> = candidates.iter().map(|a| a.name.clone()).collect();
			let chosen = picker
				.pick("Select attribute to visualize", &names)
				.ok_or(SettingsError::NoAttribute)?;
			candidates
				.into_iter()
				.find(|a| a.name == chosen)
				.cloned()
				.ok_or(SettingsError::UnknownAttribute(chosen))
		}
	}
}
