use std::collections::{HashMap, HashSet, VecDeque};
use std::f64::consts::TAU;

use petgraph::visit::EdgeRef;

use super::{Topology, pack_components};
use crate::config::{HierarchicalConfig, SimulationConfig};
use crate::layout::simulation::{SimulationCommand, SimulationWorker, seed_positions};
use crate::layout::{LayoutEdge, NodePosition, Point};

/// Runs the physics simulation offline over a subset of the nodes.
fn spring_embedding(
	topology: &Topology,
	members: &[usize],
	simulation: &SimulationConfig,
	iterations: usize,
	center: Point,
) -> Vec<Point> {
	let nodes: Vec<NodePosition> = members
		.iter()
		.map(|&i| NodePosition::new(topology.ids[i].clone(), 0.0, 0.0))
		.collect();
	let inside: HashSet<usize> = members.iter().copied().collect();
	let links: Vec<LayoutEdge> = topology
		.graph
		.edge_references()
		.filter(|e| inside.contains(&e.source().index()) && inside.contains(&e.target().index()))
		.map(|e| {
			LayoutEdge::new(
				e.weight().clone(),
				topology.ids[e.source().index()].clone(),
				topology.ids[e.target().index()].clone(),
			)
		})
		.collect();

	let mut worker = SimulationWorker::new(simulation.clone());
	worker.handle(SimulationCommand::StartSimulation {
		nodes,
		links,
		width: center.x * 2.0,
		height: center.y * 2.0,
	});
	for _ in 0..iterations {
		if worker.step().is_none() {
			break;
		}
	}
	let placed: HashMap<String, Point> = worker
		.positions()
		.into_iter()
		.map(|p| (p.id.clone(), p.point()))
		.collect();
	members
		.iter()
		.map(|&i| placed.get(&topology.ids[i]).copied().unwrap_or_default())
		.collect()
}

pub(super) fn force(
	topology: &Topology,
	config: &HierarchicalConfig,
	simulation: &SimulationConfig,
	width: f64,
	height: f64,
) -> Vec<Point> {
	let members: Vec<usize> = (0..topology.len()).collect();
	spring_embedding(
		topology,
		&members,
		simulation,
		config.embedding_iterations,
		Point::new(width / 2.0, height / 2.0),
	)
}

/// Each connected component embedded on its own, then packed.
pub(super) fn disco(
	topology: &Topology,
	config: &HierarchicalConfig,
	simulation: &SimulationConfig,
) -> Vec<Point> {
	let parts = topology
		.components()
		.into_iter()
		.map(|members| {
			let points = spring_embedding(
				topology,
				&members,
				simulation,
				config.embedding_iterations,
				Point::default(),
			);
			(members, points)
		})
		.collect();
	pack_components(parts, topology.len(), config.layer_spacing)
}

/// Stress majorization over hop distances, one component at a time.
pub(super) fn stress(topology: &Topology, config: &HierarchicalConfig) -> Vec<Point> {
	let ideal = config.node_size + config.layer_spacing;
	let parts = topology
		.components()
		.into_iter()
		.map(|members| {
			let m = members.len();
			let distances: Vec<Vec<f64>> = members
				.iter()
				.map(|&i| {
					let hops = topology.bfs_distances(i);
					members
						.iter()
						.map(|&j| hops[j].unwrap_or(0) as f64 * ideal)
						.collect()
				})
				.collect();

			let scale = ideal / 10.0;
			let mut points: Vec<Point> = seed_positions(m, 0.0, 0.0)
				.into_iter()
				.map(|p| p * scale)
				.collect();
			for _ in 0..config.stress_iterations {
				for i in 0..m {
					let (mut sum, mut weights) = (Point::default(), 0.0);
					for j in (0..m).filter(|&j| j != i) {
						let d = distances[i][j];
						if d <= 0.0 {
							continue;
						}
						let w = 1.0 / (d * d);
						let delta = points[i] - points[j];
						let length = delta.x.hypot(delta.y);
						let target = if length > 0.0 {
							points[j] + delta * (d / length)
						} else {
							points[j]
						};
						sum = sum + target * w;
						weights += w;
					}
					if weights > 0.0 {
						points[i] = sum * (1.0 / weights);
					}
				}
			}
			(members, points)
		})
		.collect();
	pack_components(parts, topology.len(), config.layer_spacing)
}

/// Every component on a circle sized to fit its nodes, in breadth-first order.
pub(super) fn circo(topology: &Topology, config: &HierarchicalConfig) -> Vec<Point> {
	let step = config.node_size + config.node_spacing;
	let parts = topology
		.components()
		.into_iter()
		.map(|members| {
			let m = members.len();
			let mut order = Vec::with_capacity(m);
			let mut seen = HashSet::from([members[0]]);
			let mut queue = VecDeque::from([members[0]]);
			while let Some(i) = queue.pop_front() {
				order.push(i);
				for n in topology.neighbors(i) {
					if seen.insert(n) {
						queue.push_back(n);
					}
				}
			}
			let radius = if m > 1 { (m as f64 * step / TAU).max(step / 2.0) } else { 0.0 };
			let mut points = vec![Point::default(); m];
			for (k, i) in order.into_iter().enumerate() {
				let angle = TAU * k as f64 / m as f64;
				if let Ok(local) = members.binary_search(&i) {
					points[local] = Point::new(radius * angle.cos(), radius * angle.sin());
				}
			}
			(members, points)
		})
		.collect();
	pack_components(parts, topology.len(), config.layer_spacing)
}

/// splitmix64, enough for reproducible scatter.
struct Scatter(u64);

impl Scatter {
	fn next(&mut self) -> f64 {
		self.0 = self.0.wrapping_add(0x9E37_79B9_7F4A_7C15);
		let mut z = self.0;
		z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
		z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
		z ^= z >> 31;
		(z >> 11) as f64 / (1u64 << 53) as f64
	}
}

pub(super) fn random(topology: &Topology, config: &HierarchicalConfig) -> Vec<Point> {
	let side = (topology.len() as f64).sqrt() * (config.node_size + config.node_spacing) * 2.0;
	let mut scatter = Scatter(config.random_seed);
	(0..topology.len())
		.map(|_| Point::new(scatter.next() * side, scatter.next() * side))
		.collect()
}

#[cfg(test)]
mod tests {
	use super::*;

	fn topology(n: usize, edges: &[(usize, usize)]) -> Topology {
		let nodes: Vec<NodePosition> = (0..n).map(|i| NodePosition::new(i.to_string(), 0.0, 0.0)).collect();
		let edges: Vec<LayoutEdge> = edges
			.iter()
			.map(|(s, t)| LayoutEdge::new(format!("{s}-{t}"), s.to_string(), t.to_string()))
			.collect();
		Topology::new(&nodes, &edges)
	}

	#[test]
	fn stress_places_a_path_by_hop_distance() {
		let t = topology(3, &[(0, 1), (1, 2)]);
		let config = HierarchicalConfig::default();
		let points = stress(&t, &config);
		let ideal = config.node_size + config.layer_spacing;
		let near = points[0].distance(points[1]);
		let far = points[0].distance(points[2]);
		assert!((near - ideal).abs() < ideal * 0.1, "{near}");
		assert!(far > near * 1.5, "{far}");
	}

	#[test]
	fn circo_spaces_nodes_evenly() {
		let t = topology(4, &[(0, 1), (1, 2), (2, 3), (3, 0)]);
		let points = circo(&t, &HierarchicalConfig::default());
		let center = points.iter().fold(Point::default(), |acc, p| acc + *p) * 0.25;
		let radii: Vec<f64> = points.iter().map(|p| p.distance(center)).collect();
		assert!(radii[0] > 0.0);
		assert!(radii.windows(2).all(|w| (w[0] - w[1]).abs() < 1e-9));
	}

	#[test]
	fn random_is_reproducible_for_a_seed() {
		let t = topology(10, &[]);
		let config = HierarchicalConfig::default();
		assert_eq!(random(&t, &config), random(&t, &config));
		let other = HierarchicalConfig {
			random_seed: 7,
			..HierarchicalConfig::default()
		};
		assert_ne!(random(&t, &config), random(&t, &other));
	}

	#[test]
	fn disco_keeps_components_apart() {
		let t = topology(4, &[(0, 1), (2, 3)]);
		let points = disco(&t, &HierarchicalConfig::default(), &SimulationConfig::default());
		assert!(points.iter().all(|p| p.x.is_finite() && p.y.is_finite()));
		let (min_a, max_a) = super::super::bounds(&points[0..2]);
		let (min_b, _) = super::super::bounds(&points[2..4]);
		assert!(min_b.x > max_a.x || min_b.y > max_a.y, "{min_a:?} {max_a:?} {min_b:?}");
	}
}
