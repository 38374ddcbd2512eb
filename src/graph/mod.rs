//! Graph model: the imported document plus the indices the rule engine needs.

use std::collections::HashMap;

use log::info;

use crate::error::GraphError;

pub mod attributes;
pub mod characteristics;
pub mod sample;
mod types;

pub use types::{
	AttributeValue, Attributes, GraphData, GraphLink, GraphNode, GraphOptions, GraphType,
};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
struct Degrees {
	in_degree: usize,
	out_degree: usize,
	undirected: usize,
}

/// An immutable, indexed graph. Mutations go through a fresh import.
#[derive(Clone, Debug, Default)]
pub struct Graph {
	data: GraphData,
	node_index: HashMap<String, usize>,
	edge_index: HashMap<String, usize>,
	degrees: Vec<Degrees>,
}

impl Graph {
	pub fn from_data(mut data: GraphData) -> Result<Self, GraphError> {
		let mut node_index = HashMap::with_capacity(data.nodes.len());
		for (i, node) in data.nodes.iter().enumerate() {
			if node_index.insert(node.id.clone(), i).is_some() {
				return Err(GraphError::DuplicateNode {
					id: node.id.clone(),
				});
			}
		}

		let undirected_graph = data.options.kind == GraphType::Undirected;
		let mut degrees = vec![Degrees::default(); data.nodes.len()];
		let mut edge_index = HashMap::with_capacity(data.links.len());
		for (i, link) in data.links.iter_mut().enumerate() {
			if link.id.is_empty() {
				link.id = format!("e{i}");
			}
			if undirected_graph {
				link.undirected = true;
			}
			let endpoint = |node_id: &str| {
				node_index
					.get(node_id)
					.copied()
					.ok_or_else(|| GraphError::MissingEndpoint {
						edge_id: link.id.clone(),
						node_id: node_id.to_string(),
					})
			};
			let (src, tgt) = (endpoint(&link.source)?, endpoint(&link.target)?);
			if link.undirected {
				degrees[src].undirected += 1;
				degrees[tgt].undirected += 1;
			} else {
				degrees[src].out_degree += 1;
				degrees[tgt].in_degree += 1;
			}
			edge_index.insert(link.id.clone(), i);
		}

		info!(
			"graph loaded: {} nodes, {} edges",
			data.nodes.len(),
			data.links.len()
		);
		Ok(Self {
			data,
			node_index,
			edge_index,
			degrees,
		})
	}

	pub fn from_json(json: &str) -> Result<Self, GraphError> {
		Self::from_data(serde_json::from_str(json)?)
	}

	pub fn to_json(&self) -> Result<String, GraphError> {
		Ok(serde_json::to_string_pretty(&self.data)?)
	}

	pub fn data(&self) -> &GraphData {
		&self.data
	}

	pub fn nodes(&self) -> &[GraphNode] {
		&self.data.nodes
	}

	pub fn links(&self) -> &[GraphLink] {
		&self.data.links
	}

	pub fn node(&self, id: &str) -> Option<&GraphNode> {
		self.node_index.get(id).map(|&i| &self.data.nodes[i])
	}

	pub fn link(&self, id: &str) -> Option<&GraphLink> {
		self.edge_index.get(id).map(|&i| &self.data.links[i])
	}

	pub fn node_position(&self, id: &str) -> Option<usize> {
		self.node_index.get(id).copied()
	}

	/// Number of nodes.
	pub fn order(&self) -> usize {
		self.data.nodes.len()
	}

	/// Number of edges.
	pub fn size(&self) -> usize {
		self.data.links.len()
	}

	pub fn is_directed(&self) -> bool {
		self.data.options.kind != GraphType::Undirected
	}

	/// Directed plus undirected edges; `None` for an unknown node.
	pub fn degree(&self, id: &str) -> Option<usize> {
		self.degrees_of(id)
			.map(|d| d.in_degree + d.out_degree + d.undirected)
	}

	/// Directed edges only.
	pub fn in_degree(&self, id: &str) -> Option<usize> {
		self.degrees_of(id).map(|d| d.in_degree)
	}

	/// Directed edges only.
	pub fn out_degree(&self, id: &str) -> Option<usize> {
		self.degrees_of(id).map(|d| d.out_degree)
	}

	fn degrees_of(&self, id: &str) -> Option<&Degrees> {
		self.node_index.get(id).map(|&i| &self.degrees[i])
	}

	pub fn node_attribute(&self, id: &str, name: &str) -> Option<&AttributeValue> {
		self.node(id).and_then(|n| n.attributes.get(name))
	}

	pub fn link_attribute(&self, id: &str, name: &str) -> Option<&AttributeValue> {
		self.link(id).and_then(|l| l.attributes.get(name))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	const DOC: &str = r#"{
		"options": {"type": "mixed", "multi": false, "allowSelfLoops": true},
		"nodes": [
			{"key": "a", "attributes": {"stars": 10, "lang": "Rust"}},
			{"key": "b", "attributes": {"stars": "40"}},
			{"key": "c"}
		],
		"edges": [
			{"source": "a", "target": "b", "attributes": {"weight": 2}},
			{"key": "bc", "source": "b", "target": "c", "undirected": true}
		]
	}"#;

	#[test]
	fn import_assigns_missing_edge_keys_and_degrees() {
		let graph = Graph::from_json(DOC).unwrap();
		assert_eq!(graph.order(), 3);
		assert_eq!(graph.size(), 2);
		assert_eq!(graph.links()[0].id, "e0");
		assert_eq!(graph.degree("b"), Some(2));
		assert_eq!(graph.in_degree("b"), Some(1));
		assert_eq!(graph.out_degree("b"), Some(0));
		assert_eq!(graph.degree("c"), Some(1));
		assert_eq!(graph.in_degree("c"), Some(0));
		assert_eq!(graph.out_degree("c"), Some(0));
		assert_eq!(graph.degree("zzz"), None);
	}

	#[test]
	fn attribute_values_keep_their_json_kind() {
		let graph = Graph::from_json(DOC).unwrap();
		assert_eq!(
			graph.node_attribute("a", "stars"),
			Some(&AttributeValue::Number(10.0))
		);
		assert_eq!(
			graph.node_attribute("b", "stars").and_then(|v| v.as_number()),
			Some(40.0)
		);
		assert_eq!(graph.node_attribute("a", "lang").unwrap().to_string(), "Rust");
	}

	#[test]
	fn rejects_dangling_edges() {
		let err = Graph::from_json(r#"{"nodes": [{"key": "a"}], "edges": [{"source": "a", "target": "x"}]}"#)
			.unwrap_err();
		assert!(matches!(err, GraphError::MissingEndpoint { ref node_id, .. } if node_id == "x"));
	}

	#[test]
	fn export_round_trips_through_import() {
		let graph = Graph::from_json(DOC).unwrap();
		let again = Graph::from_json(&graph.to_json().unwrap()).unwrap();
		assert_eq!(graph.data(), again.data());
	}
}
