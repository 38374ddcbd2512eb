//! Visual settings, the rule-guarded bundles that carry them, and resolved styles.

use serde::{Deserialize, Serialize};

use crate::graph::attributes::Attribute;
use crate::rules::Rule;

pub mod color;
pub mod resolve;
pub mod scale;

pub use color::{ColorStop, Gradient, Rgba};
pub use resolve::{
	InteractionState, apply_interaction_overrides, compute_edge_style, compute_edge_styles,
	compute_node_style, compute_node_styles,
};

/// Guideline name that last wrote a setting; bookkeeping only, never evaluated.
pub type Source = Option<String>;

/// A number in `[min, max]`, optionally bound to a numeric attribute.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NumericSetting {
	pub value: f64,
	pub min: f64,
	pub max: f64,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub increment: Option<f64>,
	/// When bound, `value` is ignored and the attribute is scaled instead.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub attribute: Option<Attribute>,
	/// Observed range of the bound attribute.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub domain_range: Option<[f64; 2]>,
	/// Output range the attribute is mapped onto.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub selected_range: Option<[f64; 2]>,
	#[serde(default)]
	pub source: Source,
}

impl NumericSetting {
	/// An unbound, untagged setting.
	pub fn new(value: f64, min: f64, max: f64) -> Self {
		Self {
			value,
			min,
			max,
			increment: None,
			attribute: None,
			domain_range: None,
			selected_range: None,
			source: None,
		}
	}

	/// Slider step.
	pub fn with_increment(self, increment: f64) -> Self {
		Self {
			increment: Some(increment),
			..self
		}
	}

	/// Scales `attribute` onto the selected range, which defaults to `[min, max]`.
	pub fn bind(&mut self, attribute: Attribute) {
		self.domain_range = attribute.range;
		self.selected_range.get_or_insert([self.min, self.max]);
		self.attribute = Some(attribute);
	}
}

/// A color or gradient. Bound to an attribute, the gradient is sampled at the
/// attribute's position within its domain.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColorSetting {
	pub value: Gradient,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub attribute: Option<Attribute>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub domain_range: Option<[f64; 2]>,
	#[serde(default)]
	pub source: Source,
}

impl ColorSetting {
	/// An unbound, untagged setting.
	pub fn new(value: Gradient) -> Self {
		Self {
			value,
			attribute: None,
			domain_range: None,
			source: None,
		}
	}

	/// Binds a numeric attribute.
	pub fn bind(&mut self, attribute: Attribute) {
		self.domain_range = attribute.range;
		self.attribute = Some(attribute);
	}
}

/// One choice out of an enum, such as a node shape.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SelectSetting<T> {
	pub value: T,
	#[serde(default)]
	pub source: Source,
}

impl<T> SelectSetting<T> {
	/// An untagged setting.
	pub fn new(value: T) -> Self {
		Self {
			value,
			source: None,
		}
	}
}

/// Outline drawn for a node.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeShape {
	#[default]
	Circle,
	Square,
	Triangle,
}

/// Straight edges have constant width; conical edges taper from source to target.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeType {
	#[default]
	Straight,
	Conical,
}

/// Marker shape drawn along an edge.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecoratorType {
	Triangle,
	Circle,
	Square,
}

/// A marker placed along an edge.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Decorator {
	#[serde(default)]
	pub id: u64,
	#[serde(rename = "type")]
	pub kind: DecoratorType,
	/// Relative position along the edge, in `[0, 1]`.
	pub position: f64,
	/// Falls back to the edge color when unset.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub color: Option<Rgba>,
}

/// The edge decorators, as one setting.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DecoratorSetting {
	pub value: Vec<Decorator>,
	#[serde(default)]
	pub source: Source,
}

/// Label placement relative to its anchor.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LabelPosition {
	#[default]
	Below,
	Above,
	Left,
	Right,
	Center,
}

/// A text label drawn next to a node.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NodeLabel {
	pub id: u64,
	pub text: String,
	pub color: Rgba,
	pub size: f64,
	/// Replaces `text` with the attribute value at resolution time.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub attribute: Option<Attribute>,
	pub source: Source,
	pub position: LabelPosition,
}

impl Default for NodeLabel {
	fn default() -> Self {
		Self {
			id: 0,
			text: String::new(),
			color: Rgba::BLACK,
			size: 12.0,
			attribute: None,
			source: None,
			position: LabelPosition::Below,
		}
	}
}

/// A text label anchored at `relative_position` along an edge, optionally rotated
/// to follow it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EdgeLabel {
	pub id: u64,
	pub text: String,
	pub color: Rgba,
	pub size: f64,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub attribute: Option<Attribute>,
	pub source: Source,
	pub relative_position: f64,
	pub position: LabelPosition,
	pub rotate: bool,
}

impl Default for EdgeLabel {
	fn default() -> Self {
		Self {
			id: 0,
			text: String::new(),
			color: Rgba::BLACK,
			size: 10.0,
			attribute: None,
			source: None,
			relative_position: 0.5,
			position: LabelPosition::Center,
			rotate: true,
		}
	}
}

/// Node settings. An unset property defers to lower-priority entries.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeProperties {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub shape: Option<SelectSetting<NodeShape>>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub size: Option<NumericSetting>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub color: Option<ColorSetting>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub stroke_width: Option<NumericSetting>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub stroke_color: Option<ColorSetting>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub labels: Option<Vec<NodeLabel>>,
}

impl NodeProperties {
	/// Every property set; used for the unconditional entry.
	pub fn defaults() -> Self {
		let teal = Rgba::rgb(80, 220, 180);
		Self {
			shape: Some(SelectSetting::new(NodeShape::Circle)),
			size: Some(NumericSetting::new(5.0, 1.0, 10.0)),
			color: Some(ColorSetting::new(Gradient::solid(teal))),
			stroke_width: Some(NumericSetting::new(1.0, 0.0, 10.0)),
			stroke_color: Some(ColorSetting::new(Gradient::solid(teal))),
			labels: Some(Vec::new()),
		}
	}
}

/// Edge settings. An unset property defers to lower-priority entries.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeProperties {
	#[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
	pub kind: Option<SelectSetting<EdgeType>>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub width: Option<NumericSetting>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub color: Option<ColorSetting>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub partial_start: Option<NumericSetting>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub partial_end: Option<NumericSetting>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub decorators: Option<DecoratorSetting>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub labels: Option<Vec<EdgeLabel>>,
}

impl EdgeProperties {
	/// Every property set; used for the unconditional entry.
	pub fn defaults() -> Self {
		Self {
			kind: Some(SelectSetting::new(EdgeType::Straight)),
			width: Some(NumericSetting::new(1.0, 0.0, 5.0).with_increment(0.5)),
			color: Some(ColorSetting::new(Gradient::two_stop(
				Rgba::rgb(115, 80, 214),
				Rgba::rgb(80, 220, 180),
			))),
			partial_start: Some(NumericSetting::new(0.0, 0.0, 1.0).with_increment(0.05)),
			partial_end: Some(NumericSetting::new(1.0, 0.0, 1.0).with_increment(0.05)),
			decorators: Some(DecoratorSetting::default()),
			labels: Some(Vec::new()),
		}
	}
}

/// Lets the resolver walk node and edge settings with one algorithm.
pub trait RuleGuarded {
	/// `None` matches everything.
	fn rule(&self) -> Option<&Rule>;
}

/// A rule-guarded bundle of node settings. Index 0 of a settings list is the
/// unconditional default; later entries are overlays in increasing priority.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NodeSettings {
	#[serde(default)]
	pub id: u64,
	#[serde(default)]
	pub priority: i32,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub rule: Option<Rule>,
	#[serde(default)]
	pub source: Source,
	#[serde(flatten)]
	pub properties: NodeProperties,
}

/// The edge counterpart of [`NodeSettings`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EdgeSettings {
	#[serde(default)]
	pub id: u64,
	#[serde(default)]
	pub priority: i32,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub rule: Option<Rule>,
	#[serde(default)]
	pub source: Source,
	#[serde(flatten)]
	pub properties: EdgeProperties,
}

impl RuleGuarded for NodeSettings {
	fn rule(&self) -> Option<&Rule> {
		self.rule.as_ref()
	}
}

impl RuleGuarded for EdgeSettings {
	fn rule(&self) -> Option<&Rule> {
		self.rule.as_ref()
	}
}

/// What the renderer draws for one node.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeStyle {
	pub shape: NodeShape,
	pub size: f64,
	pub color: Gradient,
	pub stroke_width: f64,
	pub stroke_color: Gradient,
	pub labels: Vec<NodeLabel>,
	pub shadow: bool,
}

impl Default for NodeStyle {
	fn default() -> Self {
		let defaults = NodeProperties::defaults();
		Self {
			shape: NodeShape::Circle,
			size: defaults.size.map_or(5.0, |s| s.value),
			color: defaults.color.map(|c| c.value).unwrap_or_default(),
			stroke_width: defaults.stroke_width.map_or(1.0, |s| s.value),
			stroke_color: defaults.stroke_color.map(|c| c.value).unwrap_or_default(),
			labels: Vec::new(),
			shadow: false,
		}
	}
}

/// What the renderer draws for one edge.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeStyle {
	#[serde(rename = "type")]
	pub kind: EdgeType,
	pub width: f64,
	pub color: Gradient,
	pub partial_start: f64,
	pub partial_end: f64,
	pub decorators: Vec<Decorator>,
	pub labels: Vec<EdgeLabel>,
}

impl Default for EdgeStyle {
	fn default() -> Self {
		let defaults = EdgeProperties::defaults();
		Self {
			kind: EdgeType::Straight,
			width: defaults.width.map_or(1.0, |s| s.value),
			color: defaults.color.map(|c| c.value).unwrap_or_default(),
			partial_start: 0.0,
			partial_end: 1.0,
			decorators: Vec::new(),
			labels: Vec::new(),
		}
	}
}

/// A setting that remembers which guideline wrote it.
pub trait Sourced {
	/// Name of the guideline that wrote the setting.
	fn source(&self) -> Option<&str>;
	/// Overwrites the provenance.
	fn set_source(&mut self, source: Source);
	/// Equality of the rendered value, ignoring provenance and attribute bindings.
	fn same_value(&self, other: &Self) -> bool;
}

impl Sourced for NumericSetting {
	fn source(&self) -> Option<&str> {
		self.source.as_deref()
	}

	fn set_source(&mut self, source: Source) {
		self.source = source;
	}

	fn same_value(&self, other: &Self) -> bool {
		self.value == other.value
	}
}

impl Sourced for ColorSetting {
	fn source(&self) -> Option<&str> {
		self.source.as_deref()
	}

	fn set_source(&mut self, source: Source) {
		self.source = source;
	}

	fn same_value(&self, other: &Self) -> bool {
		self.value == other.value
	}
}

impl<T: PartialEq> Sourced for SelectSetting<T> {
	fn source(&self) -> Option<&str> {
		self.source.as_deref()
	}

	fn set_source(&mut self, source: Source) {
		self.source = source;
	}

	fn same_value(&self, other: &Self) -> bool {
		self.value == other.value
	}
}

impl Sourced for DecoratorSetting {
	fn source(&self) -> Option<&str> {
		self.source.as_deref()
	}

	fn set_source(&mut self, source: Source) {
		self.source = source;
	}

	fn same_value(&self, other: &Self) -> bool {
		self.value.len() == other.value.len()
			&& self.value.iter().zip(&other.value).all(|(a, b)| {
				a.kind == b.kind && a.position == b.position && a.color == b.color
			})
	}
}

/// How one recommended property compares with the live one.
#[derive(Clone, Debug, PartialEq)]
pub struct PropertyCheck {
	pub key: &'static str,
	pub applied: bool,
	/// Provenance of the live property when it was written by someone else.
	pub other_source: Option<String>,
}

fn check<S: Sourced>(
	key: &'static str,
	recommended: &Option<S>,
	live: &Option<S>,
	source: &str,
	checks: &mut Vec<PropertyCheck>,
) {
	let Some(recommended) = recommended else {
		return;
	};
	let live = live.as_ref();
	let applied = live.is_some_and(|l| l.source() == Some(source) && l.same_value(recommended));
	let other_source = live
		.and_then(|l| l.source())
		.filter(|s| *s != source)
		.map(str::to_string);
	checks.push(PropertyCheck {
		key,
		applied,
		other_source,
	});
}

fn check_labels(
	recommended: &Option<Vec<impl LabelSource>>,
	live: &Option<Vec<impl LabelSource>>,
	source: &str,
	checks: &mut Vec<PropertyCheck>,
) {
	if recommended.is_none() {
		return;
	}
	let applied = live
		.iter()
		.flatten()
		.any(|label| label.label_source() == Some(source));
	checks.push(PropertyCheck {
		key: "labels",
		applied,
		other_source: None,
	});
}

fn tag<S: Sourced>(setting: &mut Option<S>, source: &str) {
	if let Some(setting) = setting {
		setting.set_source(Some(source.to_string()));
	}
}

fn overwrite<S: Clone>(live: &mut Option<S>, recommended: &Option<S>) {
	if let Some(recommended) = recommended {
		*live = Some(recommended.clone());
	}
}

trait LabelSource {
	fn label_source(&self) -> Option<&str>;
}

impl LabelSource for NodeLabel {
	fn label_source(&self) -> Option<&str> {
		self.source.as_deref()
	}
}

impl LabelSource for EdgeLabel {
	fn label_source(&self) -> Option<&str> {
		self.source.as_deref()
	}
}

impl NodeProperties {
	/// Marks every set property and label as written by guideline `source`.
	pub fn tag_source(&mut self, source: &str) {
		tag(&mut self.shape, source);
		tag(&mut self.size, source);
		tag(&mut self.color, source);
		tag(&mut self.stroke_width, source);
		tag(&mut self.stroke_color, source);
		for label in self.labels.iter_mut().flatten() {
			label.source = Some(source.to_string());
		}
	}

	/// Overwrites every property `recommended` defines. Labels are left to the caller.
	pub fn merge(&mut self, recommended: &NodeProperties) {
		overwrite(&mut self.shape, &recommended.shape);
		overwrite(&mut self.size, &recommended.size);
		overwrite(&mut self.color, &recommended.color);
		overwrite(&mut self.stroke_width, &recommended.stroke_width);
		overwrite(&mut self.stroke_color, &recommended.stroke_color);
	}

	/// One check per property this recommendation sets.
	pub fn check_against(&self, live: &NodeProperties, source: &str) -> Vec<PropertyCheck> {
		let mut checks = Vec::new();
		check("shape", &self.shape, &live.shape, source, &mut checks);
		check("size", &self.size, &live.size, source, &mut checks);
		check("color", &self.color, &live.color, source, &mut checks);
		check("strokeWidth", &self.stroke_width, &live.stroke_width, source, &mut checks);
		check("strokeColor", &self.stroke_color, &live.stroke_color, source, &mut checks);
		check_labels(&self.labels, &live.labels, source, &mut checks);
		checks
	}
}

impl EdgeProperties {
	/// Marks every set property and label as written by guideline `source`.
	pub fn tag_source(&mut self, source: &str) {
		tag(&mut self.kind, source);
		tag(&mut self.width, source);
		tag(&mut self.color, source);
		tag(&mut self.partial_start, source);
		tag(&mut self.partial_end, source);
		tag(&mut self.decorators, source);
		for label in self.labels.iter_mut().flatten() {
			label.source = Some(source.to_string());
		}
	}

	/// Overwrites every property `recommended` defines. Labels are left to the caller.
	pub fn merge(&mut self, recommended: &EdgeProperties) {
		overwrite(&mut self.kind, &recommended.kind);
		overwrite(&mut self.width, &recommended.width);
		overwrite(&mut self.color, &recommended.color);
		overwrite(&mut self.partial_start, &recommended.partial_start);
		overwrite(&mut self.partial_end, &recommended.partial_end);
		overwrite(&mut self.decorators, &recommended.decorators);
	}

	/// One check per property this recommendation sets.
	pub fn check_against(&self, live: &EdgeProperties, source: &str) -> Vec<PropertyCheck> {
		let mut checks = Vec::new();
		check("type", &self.kind, &live.kind, source, &mut checks);
		check("width", &self.width, &live.width, source, &mut checks);
		check("color", &self.color, &live.color, source, &mut checks);
		check("partialStart", &self.partial_start, &live.partial_start, source, &mut checks);
		check("partialEnd", &self.partial_end, &live.partial_end, source, &mut checks);
		check("decorators", &self.decorators, &live.decorators, source, &mut checks);
		check_labels(&self.labels, &live.labels, source, &mut checks);
		checks
	}
}
