//! Graph-level characteristics, computed once per import and read by guideline conditions.

use std::collections::{BTreeMap, VecDeque};

use log::debug;
use petgraph::algo::{connected_components, dijkstra, is_cyclic_directed};
use petgraph::graph::{DiGraph, NodeIndex, UnGraph};
use serde::{Deserialize, Serialize};

use super::Graph;
use super::attributes::{AttributeCatalog, Owner, discrete_attribute_filter};

/// Graphs above this order get a double-sweep diameter estimate instead of all-pairs BFS.
const EXACT_DIAMETER_LIMIT: usize = 2000;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CharacteristicValue {
	Bool(bool),
	Number(f64),
	Text(String),
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphCharacteristics {
	values: BTreeMap<String, CharacteristicValue>,
}

impl GraphCharacteristics {
	pub fn compute(graph: &Graph, catalog: &AttributeCatalog, discrete_max: usize) -> Self {
		let (n, m) = (graph.order(), graph.size());
		let undirected = undirected_view(graph);
		let components = connected_components(&undirected);
		let max_degree = graph
			.nodes()
			.iter()
			.filter_map(|node| graph.degree(&node.id))
			.max()
			.unwrap_or(0);
		let pairs = n as f64 * (n as f64 - 1.0);
		let density = if n < 2 {
			0.0
		} else if graph.is_directed() {
			m as f64 / pairs
		} else {
			2.0 * m as f64 / pairs
		};
		let has_self_loops = graph.links().iter().any(|l| l.source == l.target);
		let data_attribute =
			|owner: Owner| catalog.all().iter().any(|a| a.owner == owner && !a.general);

		let mut values = BTreeMap::new();
		let mut set = |name: &str, value: CharacteristicValue| {
			values.insert(name.to_string(), value);
		};
		set("nodeCount", CharacteristicValue::Number(n as f64));
		set("edgeCount", CharacteristicValue::Number(m as f64));
		set("density", CharacteristicValue::Number(density));
		set(
			"averageDegree",
			CharacteristicValue::Number(if n == 0 { 0.0 } else { 2.0 * m as f64 / n as f64 }),
		);
		set("maxDegree", CharacteristicValue::Number(max_degree as f64));
		set("diameter", CharacteristicValue::Number(diameter(&undirected) as f64));
		set(
			"connectedComponents",
			CharacteristicValue::Number(components as f64),
		);
		set("isConnected", CharacteristicValue::Bool(n > 0 && components == 1));
		set("isBipartite", CharacteristicValue::Bool(is_bipartite(&undirected)));
		set("isDAG", CharacteristicValue::Bool(is_dag(graph)));
		set("isDirected", CharacteristicValue::Bool(graph.is_directed()));
		set(
			"isTree",
			CharacteristicValue::Bool(n > 0 && components == 1 && m + 1 == n && !has_self_loops),
		);
		set("hasSelfLoops", CharacteristicValue::Bool(has_self_loops));
		set(
			"hasNodeAttributes",
			CharacteristicValue::Bool(data_attribute(Owner::Node)),
		);
		set(
			"hasEdgeAttributes",
			CharacteristicValue::Bool(data_attribute(Owner::Edge)),
		);
		set(
			"hasNumericNodeAttribute",
			CharacteristicValue::Bool(
				catalog
					.all()
					.iter()
					.any(|a| a.owner == Owner::Node && !a.general && a.is_numeric()),
			),
		);
		set(
			"hasDiscreteNodeAttribute",
			CharacteristicValue::Bool(catalog.all().iter().any(|a| {
				a.owner == Owner::Node && !a.general && discrete_attribute_filter(a, discrete_max)
			})),
		);
		debug!("graph characteristics: {values:?}");
		Self { values }
	}

	pub fn get(&self, name: &str) -> Option<&CharacteristicValue> {
		self.values.get(name)
	}

	pub fn number(&self, name: &str) -> Option<f64> {
		match self.get(name)? {
			CharacteristicValue::Number(n) => Some(*n),
			CharacteristicValue::Bool(b) => Some(f64::from(u8::from(*b))),
			CharacteristicValue::Text(_) => None,
		}
	}

	/// Overrides a value; used for characteristics supplied from outside the editor.
	pub fn insert(&mut self, name: &str, value: CharacteristicValue) {
		self.values.insert(name.to_string(), value);
	}
}

fn undirected_view(graph: &Graph) -> UnGraph<(), ()> {
	let mut view = UnGraph::with_capacity(graph.order(), graph.size());
	let indices: Vec<NodeIndex> = graph.nodes().iter().map(|_| view.add_node(())).collect();
	for link in graph.links() {
		if let (Some(s), Some(t)) = (
			graph.node_position(&link.source),
			graph.node_position(&link.target),
		) {
			view.add_edge(indices[s], indices[t], ());
		}
	}
	view
}

fn is_dag(graph: &Graph) -> bool {
	if graph.links().iter().any(|l| l.undirected) {
		return false;
	}
	let mut view = DiGraph::<(), ()>::with_capacity(graph.order(), graph.size());
	let indices: Vec<NodeIndex> = graph.nodes().iter().map(|_| view.add_node(())).collect();
	for link in graph.links() {
		if let (Some(s), Some(t)) = (
			graph.node_position(&link.source),
			graph.node_position(&link.target),
		) {
			view.add_edge(indices[s], indices[t], ());
		}
	}
	!is_cyclic_directed(&view)
}

fn is_bipartite(view: &UnGraph<(), ()>) -> bool {
	let mut side: Vec<Option<bool>> = vec![None; view.node_count()];
	for start in view.node_indices() {
		if side[start.index()].is_some() {
			continue;
		}
		side[start.index()] = Some(false);
		let mut queue = VecDeque::from([start]);
		while let Some(node) = queue.pop_front() {
			let colour = side[node.index()] == Some(true);
			for next in view.neighbors(node) {
				match side[next.index()] {
					None => {
						side[next.index()] = Some(!colour);
						queue.push_back(next);
					}
					Some(other) if other == colour => return false,
					Some(_) => {}
				}
			}
		}
	}
	true
}

/// Longest finite shortest path, ignoring direction.
fn diameter(view: &UnGraph<(), ()>) -> usize {
	let eccentricity = |start: NodeIndex| {
		dijkstra(view, start, None, |_| 1usize)
			.into_iter()
			.max_by_key(|&(_, d)| d)
			.unwrap_or((start, 0))
	};
	if view.node_count() <= EXACT_DIAMETER_LIMIT {
		return view
			.node_indices()
			.map(|n| eccentricity(n).1)
			.max()
			.unwrap_or(0);
	}
	view.node_indices()
		.next()
		.map(|first| {
			let (far, _) = eccentricity(first);
			eccentricity(far).1
		})
		.unwrap_or(0)
}
