use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// A stored attribute value. Anything that is not a JSON number is kept as text.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AttributeValue {
	Number(f64),
	Text(String),
}

impl AttributeValue {
	/// Numeric view of the value; numeric strings coerce, everything else fails.
	pub fn as_number(&self) -> Option<f64> {
		match self {
			AttributeValue::Number(n) => Some(*n),
			AttributeValue::Text(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
		}
	}
}

impl fmt::Display for AttributeValue {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			AttributeValue::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => {
				write!(f, "{}", *n as i64)
			}
			AttributeValue::Number(n) => write!(f, "{n}"),
			AttributeValue::Text(s) => f.write_str(s),
		}
	}
}

impl From<serde_json::Value> for AttributeValue {
	fn from(value: serde_json::Value) -> Self {
		match value {
			serde_json::Value::Number(n) => n
				.as_f64()
				.map(AttributeValue::Number)
				.unwrap_or_else(|| AttributeValue::Text(n.to_string())),
			serde_json::Value::String(s) => AttributeValue::Text(s),
			other => AttributeValue::Text(other.to_string()),
		}
	}
}

impl From<f64> for AttributeValue {
	fn from(value: f64) -> Self {
		AttributeValue::Number(value)
	}
}

impl From<&str> for AttributeValue {
	fn from(value: &str) -> Self {
		AttributeValue::Text(value.to_string())
	}
}

impl<'de> Deserialize<'de> for AttributeValue {
	fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
		Ok(serde_json::Value::deserialize(deserializer)?.into())
	}
}

pub type Attributes = BTreeMap<String, AttributeValue>;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
	#[serde(rename = "key")]
	pub id: String,
	#[serde(default)]
	pub attributes: Attributes,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GraphLink {
	/// Edge key; documents without keys get `e{index}` on import.
	#[serde(rename = "key", default)]
	pub id: String,
	pub source: String,
	pub target: String,
	#[serde(default)]
	pub attributes: Attributes,
	#[serde(default, skip_serializing_if = "std::ops::Not::not")]
	pub undirected: bool,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GraphType {
	#[default]
	Directed,
	Undirected,
	Mixed,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphOptions {
	#[serde(rename = "type", default)]
	pub kind: GraphType,
	#[serde(default)]
	pub multi: bool,
	#[serde(default = "default_allow_self_loops")]
	pub allow_self_loops: bool,
}

impl Default for GraphOptions {
	fn default() -> Self {
		Self {
			kind: GraphType::Directed,
			multi: false,
			allow_self_loops: true,
		}
	}
}

fn default_allow_self_loops() -> bool {
	true
}

/// Serialized graph document: `{attributes, options, nodes, edges}`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphData {
	#[serde(default)]
	pub attributes: Attributes,
	#[serde(default)]
	pub options: GraphOptions,
	#[serde(default)]
	pub nodes: Vec<GraphNode>,
	#[serde(rename = "edges", default)]
	pub links: Vec<GraphLink>,
}
