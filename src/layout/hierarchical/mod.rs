//! One-shot layouts: every algorithm except the live force simulation.
//!
//! Each algorithm places node centres in its own coordinate frame; the engine then moves
//! the result (bend points included) onto the canvas midpoint.

use std::collections::HashMap;

use log::{debug, warn};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::unionfind::UnionFind;

use super::{
	BendPoints, EdgeRouting, LayoutEdge, LayoutType, NodePosition, Point, center_on_canvas,
};
use crate::config::{HierarchicalConfig, SimulationConfig};
use crate::error::LayoutError;

mod embedding;
mod grid;
mod layered;
mod tree;

#[derive(Clone, Debug, PartialEq)]
pub struct LayoutRequest {
	pub algorithm: LayoutType,
	pub routing: EdgeRouting,
	pub width: f64,
	pub height: f64,
	/// Every node with its current position; overlap removal starts from these.
	pub nodes: Vec<NodePosition>,
	pub edges: Vec<LayoutEdge>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct LayoutResult {
	pub positions: Vec<NodePosition>,
	/// Only filled by algorithms that route edges.
	pub bends: BendPoints,
}

/// Computes a full placement for a request. Results are already centred on the canvas.
pub trait LayoutProvider {
	fn layout(&self, request: &LayoutRequest) -> Result<LayoutResult, LayoutError>;
}

/// The built-in provider.
#[derive(Clone, Debug, Default)]
pub struct HierarchicalEngine {
	config: HierarchicalConfig,
	simulation: SimulationConfig,
}

impl HierarchicalEngine {
	pub fn new(config: HierarchicalConfig, simulation: SimulationConfig) -> Self {
		Self { config, simulation }
	}
}

impl LayoutProvider for HierarchicalEngine {
	fn layout(&self, request: &LayoutRequest) -> Result<LayoutResult, LayoutError> {
		if request.nodes.is_empty() {
			return Err(LayoutError::EmptyGraph);
		}
		let topology = Topology::new(&request.nodes, &request.edges);
		let c = &self.config;
		let (points, mut bends) = match request.algorithm {
			LayoutType::ForceGraph => {
				return Err(LayoutError::NotHierarchical(request.algorithm.to_string()));
			}
			LayoutType::Layered => layered::layout(&topology, c, request.routing),
			LayoutType::MrTree => (tree::mrtree(&topology, c), BendPoints::new()),
			LayoutType::Radial => (tree::radial(&topology, c), BendPoints::new()),
			LayoutType::Force => (
				embedding::force(&topology, c, &self.simulation, request.width, request.height),
				BendPoints::new(),
			),
			LayoutType::Stress => (embedding::stress(&topology, c), BendPoints::new()),
			LayoutType::Disco => (embedding::disco(&topology, c, &self.simulation), BendPoints::new()),
			LayoutType::Circo => (embedding::circo(&topology, c), BendPoints::new()),
			LayoutType::Random => (embedding::random(&topology, c), BendPoints::new()),
			LayoutType::Box => (grid::boxed(&topology, c), BendPoints::new()),
			LayoutType::RectPacking => (
				grid::rect_packing(&topology, c, request.width / request.height.max(1.0)),
				BendPoints::new(),
			),
			LayoutType::SporeOverlap => (
				grid::spore_overlap(&request.nodes, c, request.width, request.height),
				BendPoints::new(),
			),
			LayoutType::SporeCompaction => (
				grid::spore_compaction(&request.nodes, c, request.width, request.height),
				BendPoints::new(),
			),
		};

		let mut positions: Vec<NodePosition> = topology
			.ids
			.iter()
			.zip(points)
			.map(|(id, p)| NodePosition::new(id.clone(), p.x, p.y))
			.collect();
		center_on_canvas(&mut positions, &mut bends, request.width, request.height);
		debug!(
			"{} laid out {} nodes, {} routed edges",
			request.algorithm,
			positions.len(),
			bends.len()
		);
		Ok(LayoutResult { positions, bends })
	}
}

/// Index-based view of the request graph. Node `i` is `NodeIndex::new(i)`.
pub(crate) struct Topology {
	ids: Vec<String>,
	graph: DiGraph<(), String>,
}

impl Topology {
	pub(crate) fn new(nodes: &[NodePosition], edges: &[LayoutEdge]) -> Self {
		let mut graph = DiGraph::with_capacity(nodes.len(), edges.len());
		let mut index = HashMap::with_capacity(nodes.len());
		for node in nodes {
			index.insert(node.id.as_str(), graph.add_node(()));
		}
		for edge in edges {
			match (index.get(edge.source.as_str()), index.get(edge.target.as_str())) {
				(Some(&s), Some(&t)) => {
					graph.add_edge(s, t, edge.id.clone());
				}
				_ => warn!("edge {} has an endpoint outside the layout", edge.id),
			}
		}
		Self {
			ids: nodes.iter().map(|n| n.id.clone()).collect(),
			graph,
		}
	}

	pub(crate) fn len(&self) -> usize {
		self.ids.len()
	}

	/// Distinct neighbours ignoring direction, self excluded.
	pub(crate) fn neighbors(&self, i: usize) -> Vec<usize> {
		let mut out: Vec<usize> = self
			.graph
			.neighbors_undirected(NodeIndex::new(i))
			.map(|n| n.index())
			.filter(|&n| n != i)
			.collect();
		out.sort_unstable();
		out.dedup();
		out
	}

	pub(crate) fn degree(&self, i: usize) -> usize {
		self.neighbors(i).len()
	}

	/// Connected components, each listing node indices in ascending order.
	pub(crate) fn components(&self) -> Vec<Vec<usize>> {
		let mut sets = UnionFind::new(self.len());
		for edge in self.graph.raw_edges() {
			sets.union(edge.source().index(), edge.target().index());
		}
		let mut by_root: HashMap<usize, usize> = HashMap::new();
		let mut components: Vec<Vec<usize>> = Vec::new();
		for i in 0..self.len() {
			let root = sets.find(i);
			let slot = *by_root.entry(root).or_insert_with(|| {
				components.push(Vec::new());
				components.len() - 1
			});
			components[slot].push(i);
		}
		components
	}

	/// Hop distances from `start`, `None` for unreachable nodes.
	pub(crate) fn bfs_distances(&self, start: usize) -> Vec<Option<usize>> {
		let mut distance = vec![None; self.len()];
		let mut queue = std::collections::VecDeque::from([start]);
		distance[start] = Some(0);
		while let Some(i) = queue.pop_front() {
			let d = distance[i].unwrap_or(0);
			for n in self.neighbors(i) {
				if distance[n].is_none() {
					distance[n] = Some(d + 1);
					queue.push_back(n);
				}
			}
		}
		distance
	}
}

/// Places laid-out components side by side in rows whose width approaches the square
/// root of the total area. Each component's points are given in its own frame.
pub(crate) fn pack_components(
	parts: Vec<(Vec<usize>, Vec<Point>)>,
	total: usize,
	gap: f64,
) -> Vec<Point> {
	let mut out = vec![Point::default(); total];
	let boxes: Vec<(Point, Point)> = parts
		.iter()
		.map(|(_, points)| bounds(points))
		.collect();
	let area: f64 = boxes
		.iter()
		.map(|(min, max)| (max.x - min.x + gap) * (max.y - min.y + gap))
		.sum();
	let row_width = area.sqrt().max(gap);

	let (mut cursor, mut row_height) = (Point::default(), 0.0_f64);
	for ((members, points), (min, max)) in parts.into_iter().zip(boxes) {
		let size = max - min;
		if cursor.x > 0.0 && cursor.x + size.x > row_width {
			cursor = Point::new(0.0, cursor.y + row_height + gap);
			row_height = 0.0;
		}
		for (i, p) in members.into_iter().zip(points) {
			out[i] = p - min + cursor;
		}
		cursor.x += size.x + gap;
		row_height = row_height.max(size.y);
	}
	out
}

pub(crate) fn bounds(points: &[Point]) -> (Point, Point) {
	let Some(&first) = points.first() else {
		return (Point::default(), Point::default());
	};
	points.iter().fold((first, first), |(min, max), p| {
		(
			Point::new(min.x.min(p.x), min.y.min(p.y)),
			Point::new(max.x.max(p.x), max.y.max(p.y)),
		)
	})
}

#[cfg(test)]
mod tests {
	use super::*;

	fn request(algorithm: LayoutType, nodes: &[&str], edges: &[(&str, &str)]) -> LayoutRequest {
		LayoutRequest {
			algorithm,
			routing: EdgeRouting::Polyline,
			width: 800.0,
			height: 600.0,
			nodes: nodes.iter().map(|id| NodePosition::new(*id, 0.0, 0.0)).collect(),
			edges: edges
				.iter()
				.enumerate()
				.map(|(i, (s, t))| LayoutEdge::new(format!("e{i}"), *s, *t))
				.collect(),
		}
	}

	fn center(positions: &[NodePosition]) -> Point {
		let points: Vec<Point> = positions.iter().map(NodePosition::point).collect();
		let (min, max) = bounds(&points);
		(min + max) * 0.5
	}

	#[test]
	fn every_algorithm_centres_its_result() {
		let engine = HierarchicalEngine::default();
		let nodes = ["a", "b", "c", "d", "e", "f"];
		let edges = [("a", "b"), ("a", "c"), ("b", "d"), ("c", "d"), ("e", "f")];
		for algorithm in LayoutType::ALL.into_iter().filter(|l| l.is_hierarchical()) {
			let result = engine.layout(&request(algorithm, &nodes, &edges)).unwrap();
			assert_eq!(result.positions.len(), nodes.len(), "{algorithm}");
			let c = center(&result.positions);
			assert!((c.x - 400.0).abs() < 1e-6 && (c.y - 300.0).abs() < 1e-6, "{algorithm}: {c:?}");
			assert!(
				result.positions.iter().all(|p| p.x.is_finite() && p.y.is_finite()),
				"{algorithm}"
			);
		}
	}

	#[test]
	fn force_graph_and_empty_graphs_are_rejected() {
		let engine = HierarchicalEngine::default();
		assert_eq!(
			engine.layout(&request(LayoutType::ForceGraph, &["a"], &[])),
			Err(LayoutError::NotHierarchical("force-graph".into()))
		);
		assert_eq!(
			engine.layout(&request(LayoutType::Layered, &[], &[])),
			Err(LayoutError::EmptyGraph)
		);
	}

	#[test]
	fn components_follow_edges_in_either_direction() {
		let req = request(LayoutType::Disco, &["a", "b", "c", "d"], &[("b", "a"), ("c", "d")]);
		let topology = Topology::new(&req.nodes, &req.edges);
		assert_eq!(topology.components(), vec![vec![0, 1], vec![2, 3]]);
		assert_eq!(topology.bfs_distances(0), vec![Some(0), Some(1), None, None]);
	}
}
