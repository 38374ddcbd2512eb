use super::Topology;
use crate::config::HierarchicalConfig;
use crate::layout::simulation::seed_positions;
use crate::layout::{NodePosition, Point};

fn rows(count: usize, columns: usize, step: f64) -> Vec<Point> {
	let columns = columns.max(1);
	(0..count)
		.map(|i| Point::new((i % columns) as f64 * step, (i / columns) as f64 * step))
		.collect()
}

/// Square grid in document order.
pub(super) fn boxed(topology: &Topology, config: &HierarchicalConfig) -> Vec<Point> {
	let columns = (topology.len() as f64).sqrt().ceil() as usize;
	rows(topology.len(), columns, config.node_size + config.node_spacing)
}

/// Rows filled up to the canvas aspect ratio, best-connected nodes first.
pub(super) fn rect_packing(
	topology: &Topology,
	config: &HierarchicalConfig,
	aspect_ratio: f64,
) -> Vec<Point> {
	let n = topology.len();
	let columns = (n as f64 * aspect_ratio.max(0.1)).sqrt().ceil() as usize;
	let mut order: Vec<usize> = (0..n).collect();
	order.sort_by_key(|&i| std::cmp::Reverse(topology.degree(i)));
	let slots = rows(n, columns, config.node_size + config.node_spacing);
	let mut points = vec![Point::default(); n];
	for (slot, i) in slots.into_iter().zip(order) {
		points[i] = slot;
	}
	points
}

/// Current positions, or seeds when the caller has none yet.
fn starting_points(nodes: &[NodePosition], width: f64, height: f64) -> Vec<Point> {
	if nodes.iter().all(|p| p.x == 0.0 && p.y == 0.0) {
		return seed_positions(nodes.len(), width, height);
	}
	nodes.iter().map(NodePosition::point).collect()
}

/// Pushes overlapping pairs apart until every centre is at least one node plus one gap
/// from every other, or the pass budget runs out.
fn remove_overlaps(points: &mut [Point], min_distance: f64, passes: usize) {
	for pass in 0..passes {
		let mut moved = false;
		for i in 0..points.len() {
			for j in i + 1..points.len() {
				let delta = points[j] - points[i];
				let length = delta.x.hypot(delta.y);
				if length >= min_distance {
					continue;
				}
				let direction = if length > 1e-9 {
					delta * (1.0 / length)
				} else {
					// Coincident nodes: fan out deterministically.
					let angle = (i * 31 + j * 17 + pass) as f64;
					Point::new(angle.cos(), angle.sin())
				};
				let push = direction * ((min_distance - length) / 2.0);
				points[i] = points[i] - push;
				points[j] = points[j] + push;
				moved = true;
			}
		}
		if !moved {
			break;
		}
	}
}

pub(super) fn spore_overlap(
	nodes: &[NodePosition],
	config: &HierarchicalConfig,
	width: f64,
	height: f64,
) -> Vec<Point> {
	let mut points = starting_points(nodes, width, height);
	remove_overlaps(&mut points, config.node_size + config.node_spacing, config.overlap_passes);
	points
}

/// Overlap removal, then a uniform shrink towards the centroid until the closest pair
/// touches the minimum spacing.
pub(super) fn spore_compaction(
	nodes: &[NodePosition],
	config: &HierarchicalConfig,
	width: f64,
	height: f64,
) -> Vec<Point> {
	let min_distance = config.node_size + config.node_spacing;
	let mut points = spore_overlap(nodes, config, width, height);
	let mut closest = f64::INFINITY;
	for i in 0..points.len() {
		for j in i + 1..points.len() {
			closest = closest.min(points[i].distance(points[j]));
		}
	}
	if !closest.is_finite() || closest <= min_distance {
		return points;
	}
	let factor = min_distance / closest;
	let centroid = points.iter().fold(Point::default(), |acc, p| acc + *p) * (1.0 / points.len() as f64);
	for p in points.iter_mut() {
		*p = centroid + (*p - centroid) * factor;
	}
	points
}

#[cfg(test)]
mod tests {
	use super::*;

	fn closest_pair(points: &[Point]) -> f64 {
		let mut closest = f64::INFINITY;
		for i in 0..points.len() {
			for j in i + 1..points.len() {
				closest = closest.min(points[i].distance(points[j]));
			}
		}
		closest
	}

	#[test]
	fn overlap_removal_separates_stacked_nodes() {
		let config = HierarchicalConfig::default();
		let nodes: Vec<NodePosition> = (0..4).map(|i| NodePosition::new(i.to_string(), 100.0, 100.0)).collect();
		let points = spore_overlap(&nodes, &config, 400.0, 300.0);
		assert!(closest_pair(&points) >= (config.node_size + config.node_spacing) * 0.9);
	}

	#[test]
	fn compaction_pulls_a_sparse_layout_together() {
		let config = HierarchicalConfig::default();
		let nodes = vec![
			NodePosition::new("a", 0.0, 0.0),
			NodePosition::new("b", 1000.0, 0.0),
			NodePosition::new("c", 0.0, 1000.0),
		];
		let points = spore_compaction(&nodes, &config, 400.0, 300.0);
		let min_distance = config.node_size + config.node_spacing;
		assert!((closest_pair(&points) - min_distance).abs() < 1e-6);
	}

	#[test]
	fn box_fills_a_square_grid() {
		let nodes: Vec<NodePosition> = (0..5).map(|i| NodePosition::new(i.to_string(), 0.0, 0.0)).collect();
		let topology = Topology::new(&nodes, &[]);
		let points = boxed(&topology, &HierarchicalConfig::default());
		assert_eq!(points[2].y, points[0].y);
		assert_eq!(points[3].y, points[0].y + 50.0);
		assert_eq!(points[4].x, points[1].x);
	}
}
