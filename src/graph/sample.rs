//! Deterministic sample graphs with numeric and categorical attributes.

use std::collections::HashSet;

use super::{AttributeValue, Attributes, GraphData, GraphLink, GraphNode, GraphOptions};

const FIELDS: &[&str] = &[
	"AI",
	"Bioinformatics",
	"Physics",
	"Sociology",
	"Mathematics",
	"Neuroscience",
];
const DEPENDENCY_TYPES: &[&str] = &["direct", "dev"];

/// Simple pseudo-random number generator (deterministic for consistency).
pub fn rand_simple(seed: usize) -> f64 {
	let x = ((seed + 1) * 9301 + 49297) % 233280;
	(x as f64) / 233280.0
}

/// A random tree over `node_count` nodes, topped up with extra edges until the graph
/// holds `edge_count` edges (or no further simple edge exists).
pub fn generate_sample_data(node_count: usize, edge_count: usize) -> GraphData {
	let nodes: Vec<GraphNode> = (0..node_count)
		.map(|i| {
			let mut attributes = Attributes::new();
			attributes.insert(
				"label".into(),
				AttributeValue::Text(format!("Node {}", i)),
			);
			attributes.insert(
				"field".into(),
				FIELDS[i % FIELDS.len()].into(),
			);
			attributes.insert(
				"stars".into(),
				AttributeValue::Number((10.0 + rand_simple(i * 7) * 70.0).round()),
			);
			attributes.insert(
				"commits".into(),
				AttributeValue::Number((100.0 + rand_simple(i * 13) * 4900.0).round()),
			);
			GraphNode {
				id: i.to_string(),
				attributes,
			}
		})
		.collect();

	let mut seen = HashSet::new();
	let mut pairs = Vec::new();
	for i in 1..node_count {
		let target = (rand_simple(i) * (i as f64)) as usize;
		seen.insert((i.min(target), i.max(target)));
		pairs.push((i, target));
	}
	let max_edges = node_count * node_count.saturating_sub(1) / 2;
	let mut seed = node_count;
	while pairs.len() < edge_count.min(max_edges) && seed < node_count + 100_000 {
		seed += 1;
		let a = (rand_simple(seed * 31) * node_count as f64) as usize % node_count;
		let b = (rand_simple(seed * 17 + 5) * node_count as f64) as usize % node_count;
		if a != b && seen.insert((a.min(b), a.max(b))) {
			pairs.push((a, b));
		}
	}

	let links = pairs
		.into_iter()
		.enumerate()
		.map(|(i, (source, target))| {
			let mut attributes = Attributes::new();
			attributes.insert(
				"type".into(),
				DEPENDENCY_TYPES[i % DEPENDENCY_TYPES.len()].into(),
			);
			attributes.insert(
				"weight".into(),
				AttributeValue::Number(1.0 + (rand_simple(i * 3) * 9.0).round()),
			);
			GraphLink {
				id: format!("e{i}"),
				source: source.to_string(),
				target: target.to_string(),
				attributes,
				undirected: false,
			}
		})
		.collect();

	GraphData {
		attributes: Attributes::new(),
		options: GraphOptions::default(),
		nodes,
		links,
	}
}
