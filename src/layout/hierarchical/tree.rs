use std::collections::VecDeque;
use std::f64::consts::TAU;

use petgraph::Direction;
use petgraph::graph::NodeIndex;

use super::{Topology, pack_components};
use crate::config::HierarchicalConfig;
use crate::layout::Point;

/// Breadth-first spanning forest, ignoring edge direction. Roots are nodes without
/// incoming edges, then whatever is still unreached.
fn spanning_forest(topology: &Topology, roots: &[usize]) -> (Vec<usize>, Vec<Vec<usize>>, Vec<usize>) {
	let n = topology.len();
	let mut depth = vec![usize::MAX; n];
	let mut children = vec![Vec::new(); n];
	let mut forest_roots = Vec::new();
	for root in roots.iter().copied().chain(0..n) {
		if depth[root] != usize::MAX {
			continue;
		}
		forest_roots.push(root);
		depth[root] = 0;
		let mut queue = VecDeque::from([root]);
		while let Some(i) = queue.pop_front() {
			for child in topology.neighbors(i) {
				if depth[child] == usize::MAX {
					depth[child] = depth[i] + 1;
					children[i].push(child);
					queue.push_back(child);
				}
			}
		}
	}
	(forest_roots, children, depth)
}

fn sources(topology: &Topology) -> Vec<usize> {
	(0..topology.len())
		.filter(|&i| {
			topology
				.graph
				.neighbors_directed(NodeIndex::new(i), Direction::Incoming)
				.all(|n| n.index() == i)
		})
		.collect()
}

/// Leaves take consecutive slots in depth-first order, parents sit midway between
/// their first and last child.
pub(super) fn mrtree(topology: &Topology, config: &HierarchicalConfig) -> Vec<Point> {
	let n = topology.len();
	let (roots, children, depth) = spanning_forest(topology, &sources(topology));

	let mut preorder = Vec::with_capacity(n);
	let mut stack: Vec<usize> = roots.iter().rev().copied().collect();
	while let Some(i) = stack.pop() {
		preorder.push(i);
		stack.extend(children[i].iter().rev());
	}

	let mut slot = vec![0.0_f64; n];
	let mut next_leaf = 0.0;
	for &i in &preorder {
		if children[i].is_empty() {
			slot[i] = next_leaf;
			next_leaf += 1.0;
		}
	}
	for &i in preorder.iter().rev() {
		if let (Some(&first), Some(&last)) = (children[i].first(), children[i].last()) {
			slot[i] = (slot[first] + slot[last]) / 2.0;
		}
	}

	let step_x = config.node_size + config.node_spacing;
	let step_y = config.node_size + config.layer_spacing;
	(0..n)
		.map(|i| Point::new(slot[i] * step_x, depth[i] as f64 * step_y))
		.collect()
}

/// Concentric rings around the best-connected node of each component.
pub(super) fn radial(topology: &Topology, config: &HierarchicalConfig) -> Vec<Point> {
	let ring = config.node_size + config.layer_spacing;
	let parts = topology
		.components()
		.into_iter()
		.map(|members| {
			let root = members
				.iter()
				.copied()
				.max_by_key(|&i| (topology.degree(i), std::cmp::Reverse(i)))
				.unwrap_or(members[0]);
			let (_, children, depth) = spanning_forest(topology, &[root]);

			// Breadth-first order keeps siblings adjacent on their ring.
			let mut rings: Vec<Vec<usize>> = Vec::new();
			let mut queue = VecDeque::from([root]);
			while let Some(i) = queue.pop_front() {
				let d = depth[i];
				if rings.len() <= d {
					rings.resize_with(d + 1, Vec::new);
				}
				rings[d].push(i);
				queue.extend(children[i].iter().copied());
			}

			let mut points = vec![Point::default(); members.len()];
			let local = |i: usize| members.binary_search(&i).unwrap_or(0);
			for (d, nodes) in rings.iter().enumerate() {
				let radius = d as f64 * ring;
				for (k, &i) in nodes.iter().enumerate() {
					let angle = TAU * k as f64 / nodes.len() as f64;
					points[local(i)] = Point::new(radius * angle.cos(), radius * angle.sin());
				}
			}
			(members, points)
		})
		.collect();
	pack_components(parts, topology.len(), config.layer_spacing)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::layout::{LayoutEdge, NodePosition};

	fn topology(n: usize, edges: &[(usize, usize)]) -> Topology {
		let nodes: Vec<NodePosition> = (0..n).map(|i| NodePosition::new(i.to_string(), 0.0, 0.0)).collect();
		let edges: Vec<LayoutEdge> = edges
			.iter()
			.map(|(s, t)| LayoutEdge::new(format!("{s}-{t}"), s.to_string(), t.to_string()))
			.collect();
		Topology::new(&nodes, &edges)
	}

	#[test]
	fn tree_parents_sit_above_and_between_children() {
		let t = topology(4, &[(0, 1), (0, 2), (2, 3)]);
		let points = mrtree(&t, &HierarchicalConfig::default());
		assert!(points[0].y < points[1].y);
		assert_eq!(points[1].y, points[2].y);
		assert!(points[2].y < points[3].y);
		assert_eq!(points[0].x, (points[1].x + points[2].x) / 2.0);
		assert_eq!(points[2].x, points[3].x);
	}

	#[test]
	fn tree_roots_prefer_sources() {
		let t = topology(3, &[(2, 1), (1, 0)]);
		let points = mrtree(&t, &HierarchicalConfig::default());
		assert!(points[2].y < points[1].y && points[1].y < points[0].y);
	}

	#[test]
	fn radial_rings_grow_with_hop_distance() {
		let t = topology(5, &[(0, 1), (0, 2), (0, 3), (3, 4)]);
		let points = radial(&t, &HierarchicalConfig::default());
		let r = |i: usize| points[i].distance(points[0]);
		assert!((r(1) - r(2)).abs() < 1e-9);
		assert!(r(4) > r(3));
	}
}
