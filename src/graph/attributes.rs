//! Attribute catalog: every attribute found on the graph, classified once per import.

use std::collections::{BTreeMap, HashSet};

use log::debug;
use serde::{Deserialize, Serialize};

use super::{AttributeValue, Graph};
use crate::error::AttributeError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttributeType {
	Number,
	String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Owner {
	Node,
	Edge,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
	pub name: String,
	#[serde(rename = "type")]
	pub kind: AttributeType,
	pub owner: Owner,
	/// Derived from topology (`degree`, `inDegree`, `outDegree`, `id`), never stored.
	#[serde(default)]
	pub general: bool,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub range: Option<[f64; 2]>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub values: Option<Vec<String>>,
}

impl Attribute {
	pub fn node_number(name: &str) -> Self {
		Self {
			name: name.to_string(),
			kind: AttributeType::Number,
			owner: Owner::Node,
			general: false,
			range: None,
			values: None,
		}
	}

	pub fn is_numeric(&self) -> bool {
		self.kind == AttributeType::Number
	}

	pub fn distinct_values(&self) -> usize {
		self.values.as_ref().map_or(0, Vec::len)
	}
}

const GENERAL_NUMERIC: [&str; 3] = ["degree", "inDegree", "outDegree"];

/// The four attributes every node has, with ranges taken from `graph`.
pub fn general_attributes(graph: &Graph) -> Vec<Attribute> {
	let mut attributes: Vec<Attribute> = GENERAL_NUMERIC
		.iter()
		.map(|&name| {
			let range = graph
				.nodes()
				.iter()
				.filter_map(|n| general_node_value(graph, &n.id, name))
				.filter_map(|v| v.as_number())
				.fold(None, extend_range);
			Attribute {
				general: true,
				range,
				..Attribute::node_number(name)
			}
		})
		.collect();
	attributes.push(Attribute {
		name: "id".into(),
		kind: AttributeType::String,
		owner: Owner::Node,
		general: true,
		range: None,
		values: None,
	});
	attributes
}

fn extend_range(range: Option<[f64; 2]>, value: f64) -> Option<[f64; 2]> {
	Some(match range {
		Some([lo, hi]) => [lo.min(value), hi.max(value)],
		None => [value, value],
	})
}

fn general_node_value(graph: &Graph, id: &str, name: &str) -> Option<AttributeValue> {
	let count = match name {
		"degree" => graph.degree(id)?,
		"inDegree" => graph.in_degree(id)?,
		"outDegree" => graph.out_degree(id)?,
		"id" => return graph.node(id).map(|n| AttributeValue::Text(n.id.clone())),
		_ => return None,
	};
	Some(AttributeValue::Number(count as f64))
}

/// Looks up `attribute` on the node or edge `id`, dispatching on the attribute's owner.
pub fn attribute_value(
	graph: &Graph,
	id: &str,
	attribute: &Attribute,
) -> Result<AttributeValue, AttributeError> {
	let not_found = || AttributeError::NotFound {
		id: id.to_string(),
		name: attribute.name.clone(),
	};
	match attribute.owner {
		Owner::Node => general_node_value(graph, id, &attribute.name)
			.or_else(|| graph.node_attribute(id, &attribute.name).cloned())
			.ok_or_else(not_found),
		Owner::Edge => graph
			.link_attribute(id, &attribute.name)
			.cloned()
			.ok_or_else(not_found),
	}
}

/// Numeric variant of [`attribute_value`].
pub fn numeric_attribute_value(
	graph: &Graph,
	id: &str,
	attribute: &Attribute,
) -> Result<f64, AttributeError> {
	attribute_value(graph, id, attribute)?
		.as_number()
		.ok_or_else(|| AttributeError::NotNumeric {
			id: id.to_string(),
			name: attribute.name.clone(),
		})
}

/// True when the attribute has few enough distinct values for one-rule-per-value styling.
pub fn discrete_attribute_filter(attribute: &Attribute, max_distinct_values: usize) -> bool {
	let count = attribute.distinct_values();
	count > 0 && count < max_distinct_values
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AttributeCatalog {
	attributes: Vec<Attribute>,
}

impl AttributeCatalog {
	/// Scans every node and edge once. Results go stale if the graph changes.
	pub fn scan(graph: &Graph) -> Self {
		let mut attributes = scan_owner(
			Owner::Node,
			graph.nodes().iter().map(|n| &n.attributes),
		);
		attributes.extend(scan_owner(
			Owner::Edge,
			graph.links().iter().map(|l| &l.attributes),
		));
		attributes.extend(general_attributes(graph));
		debug!("attribute catalog: {} attributes", attributes.len());
		Self { attributes }
	}

	pub fn all(&self) -> &[Attribute] {
		&self.attributes
	}

	pub fn find(&self, name: &str, owner: Owner) -> Option<&Attribute> {
		self.attributes
			.iter()
			.find(|a| a.name == name && a.owner == owner)
	}

	pub fn by_name(&self, name: &str) -> Option<&Attribute> {
		self.attributes.iter().find(|a| a.name == name)
	}

	pub fn filter<'a>(
		&'a self,
		predicate: impl Fn(&Attribute) -> bool + 'a,
	) -> impl Iterator<Item = &'a Attribute> + 'a {
		self.attributes.iter().filter(move |a| predicate(a))
	}

	pub fn discrete(&self, max_distinct_values: usize) -> impl Iterator<Item = &Attribute> {
		self.filter(move |a| discrete_attribute_filter(a, max_distinct_values))
	}
}

fn scan_owner<'a>(
	owner: Owner,
	entities: impl Iterator<Item = &'a BTreeMap<String, AttributeValue>>,
) -> Vec<Attribute> {
	let mut observed: BTreeMap<&str, Vec<&AttributeValue>> = BTreeMap::new();
	for attributes in entities {
		for (name, value) in attributes {
			observed.entry(name.as_str()).or_default().push(value);
		}
	}

	observed
		.into_iter()
		.map(|(name, values)| {
			let mut seen = HashSet::new();
			let distinct: Vec<String> = values
				.iter()
				.map(|v| v.to_string())
				.filter(|s| seen.insert(s.clone()))
				.collect();
			let numbers: Option<Vec<f64>> = values.iter().map(|v| v.as_number()).collect();
			let (kind, range) = match numbers {
				Some(numbers) => (
					AttributeType::Number,
					numbers.into_iter().fold(None, extend_range),
				),
				None => (AttributeType::String, None),
			};
			Attribute {
				name: name.to_string(),
				kind,
				owner,
				general: false,
				range,
				values: Some(distinct),
			}
		})
		.collect()
}
