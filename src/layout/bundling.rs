//! Force-directed edge bundling (Holten and van Wijk, 2009).
//!
//! Every edge is subdivided into a polyline whose interior points are attracted to the
//! matching points of compatible edges. Positions are assumed static for the whole run.

use std::collections::HashMap;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use super::{BendPoints, LayoutEdge, NodePosition, Point};
use crate::config::BundlingConfig;
use crate::error::LayoutError;

const EPSILON: f64 = 1e-6;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BundlingRequest {
	pub nodes: Vec<NodePosition>,
	pub links: Vec<LayoutEdge>,
}

#[derive(Clone, Copy, Debug)]
struct Segment {
	source: Point,
	target: Point,
}

impl Segment {
	fn vector(&self) -> Point {
		self.target - self.source
	}

	fn length(&self) -> f64 {
		self.source.distance(self.target)
	}

	fn midpoint(&self) -> Point {
		(self.source + self.target) * 0.5
	}

	fn project(&self, p: Point) -> Point {
		let v = self.vector();
		let l2 = v.x * v.x + v.y * v.y;
		let t = ((p.x - self.source.x) * v.x + (p.y - self.source.y) * v.y) / l2;
		self.source + v * t
	}
}

fn dot(a: Point, b: Point) -> f64 {
	a.x * b.x + a.y * b.y
}

fn angle_compatibility(p: &Segment, q: &Segment) -> f64 {
	(dot(p.vector(), q.vector()) / (p.length() * q.length())).abs()
}

fn scale_compatibility(p: &Segment, q: &Segment) -> f64 {
	let (lp, lq) = (p.length(), q.length());
	let avg = (lp + lq) / 2.0;
	2.0 / (avg / lp.min(lq) + lp.max(lq) / avg)
}

fn position_compatibility(p: &Segment, q: &Segment) -> f64 {
	let avg = (p.length() + q.length()) / 2.0;
	avg / (avg + p.midpoint().distance(q.midpoint()))
}

fn edge_visibility(p: &Segment, q: &Segment) -> f64 {
	let i0 = p.project(q.source);
	let i1 = p.project(q.target);
	let span = i0.distance(i1);
	if span < EPSILON {
		return 0.0;
	}
	let mid = (i0 + i1) * 0.5;
	(1.0 - 2.0 * p.midpoint().distance(mid) / span).max(0.0)
}

fn visibility_compatibility(p: &Segment, q: &Segment) -> f64 {
	edge_visibility(p, q).min(edge_visibility(q, p))
}

fn compatibility(p: &Segment, q: &Segment) -> f64 {
	angle_compatibility(p, q)
		* scale_compatibility(p, q)
		* position_compatibility(p, q)
		* visibility_compatibility(p, q)
}

/// Resamples a polyline (endpoints included) to `count` evenly spaced interior points.
fn subdivide(polyline: &[Point], count: usize) -> Vec<Point> {
	let (Some(&first), Some(&last)) = (polyline.first(), polyline.last()) else {
		return Vec::new();
	};
	let total: f64 = polyline.windows(2).map(|w| w[0].distance(w[1])).sum();
	let spacing = total / (count + 1) as f64;

	let mut out = Vec::with_capacity(count + 2);
	out.push(first);
	let mut remaining = spacing;
	for w in polyline.windows(2) {
		let (mut a, b) = (w[0], w[1]);
		let mut length = a.distance(b);
		while length >= remaining && out.len() < count + 1 && spacing > 0.0 {
			let p = a + (b - a) * (remaining / length);
			out.push(p);
			length -= remaining;
			a = p;
			remaining = spacing;
		}
		remaining -= length;
	}
	// Rounding can leave the last interior point out.
	while out.len() < count + 1 {
		out.push(last);
	}
	out.push(last);
	out
}

struct Bundler<'a> {
	config: &'a BundlingConfig,
	segments: Vec<Option<Segment>>,
	compatible: Vec<Vec<usize>>,
	/// Full polylines, endpoints included.
	points: Vec<Vec<Point>>,
}

impl<'a> Bundler<'a> {
	fn new(config: &'a BundlingConfig, segments: Vec<Option<Segment>>) -> Self {
		let m = segments.len();
		let mut compatible = vec![Vec::new(); m];
		for i in 0..m {
			let Some(p) = &segments[i] else { continue };
			for j in i + 1..m {
				let Some(q) = &segments[j] else { continue };
				if compatibility(p, q) >= config.compatibility_threshold {
					compatible[i].push(j);
					compatible[j].push(i);
				}
			}
		}
		let points = segments
			.iter()
			.map(|s| match s {
				Some(s) => subdivide(&[s.source, s.target], config.subdivision_seed),
				None => Vec::new(),
			})
			.collect();
		Self {
			config,
			segments,
			compatible,
			points,
		}
	}

	fn run(mut self) -> Vec<Vec<Point>> {
		let c = self.config;
		let mut step = c.step_size;
		let mut iterations = c.iterations;
		let mut subdivisions = c.subdivision_seed;
		for cycle in 0..c.cycles {
			for _ in 0..iterations {
				self.apply_forces(step, subdivisions);
			}
			debug!("bundling cycle {cycle}: {iterations} iterations over {subdivisions} points");
			step /= 2.0;
			subdivisions *= c.subdivision_rate;
			iterations = (iterations as f64 * c.iterations_rate).round() as usize;
			for polyline in self.points.iter_mut().filter(|p| !p.is_empty()) {
				*polyline = subdivide(polyline, subdivisions);
			}
		}
		self.points
			.into_iter()
			.map(|p| if p.len() > 2 { p[1..p.len() - 1].to_vec() } else { Vec::new() })
			.collect()
	}

	fn apply_forces(&mut self, step: f64, subdivisions: usize) {
		let mut next = self.points.clone();
		for (e, segment) in self.segments.iter().enumerate() {
			let Some(segment) = segment else { continue };
			let spring = self.config.stiffness / (segment.length() * (subdivisions + 1) as f64);
			let polyline = &self.points[e];
			for i in 1..polyline.len() - 1 {
				let p = polyline[i];
				let pull = (polyline[i - 1] - p) + (polyline[i + 1] - p);
				let mut force = pull * spring;
				for &other in &self.compatible[e] {
					let Some(&q) = self.points[other].get(i) else { continue };
					let toward = q - p;
					let distance = toward.x.hypot(toward.y);
					if distance > EPSILON {
						force = force + toward * (1.0 / distance);
					}
				}
				next[e][i] = p + force * step;
			}
		}
		self.points = next;
	}
}

/// Interior bend points for every link, aligned by link index. Links whose endpoints are
/// missing or coincide stay straight.
pub fn bundle_edges(
	request: &BundlingRequest,
	config: &BundlingConfig,
) -> Result<Vec<Vec<Point>>, LayoutError> {
	let mut positions = HashMap::with_capacity(request.nodes.len());
	for node in &request.nodes {
		if !(node.x.is_finite() && node.y.is_finite()) {
			return Err(LayoutError::Bundling(format!(
				"node {} has no finite position",
				node.id
			)));
		}
		positions.insert(node.id.as_str(), node.point());
	}

	let segments: Vec<Option<Segment>> = request
		.links
		.iter()
		.map(|link| {
			match (positions.get(link.source.as_str()), positions.get(link.target.as_str())) {
				(Some(&source), Some(&target)) if source.distance(target) > EPSILON => {
					Some(Segment { source, target })
				}
				(Some(_), Some(_)) => None,
				_ => {
					warn!("bundling skips edge {} with an unknown endpoint", link.id);
					None
				}
			}
		})
		.collect();
	Ok(Bundler::new(config, segments).run())
}

/// Keys index-aligned bundling output by edge id.
pub fn bend_points_by_id(links: &[LayoutEdge], bundled: Vec<Vec<Point>>) -> BendPoints {
	links
		.iter()
		.zip(bundled)
		.map(|(link, points)| (link.id.clone(), points))
		.collect()
}

#[cfg(test)]
mod tests {
	use super::*;

	fn config() -> BundlingConfig {
		BundlingConfig {
			iterations: 20,
			cycles: 3,
			..BundlingConfig::default()
		}
	}

	fn request(edges: &[((f64, f64), (f64, f64))]) -> BundlingRequest {
		let mut nodes = Vec::new();
		let mut links = Vec::new();
		for (i, (s, t)) in edges.iter().enumerate() {
			nodes.push(NodePosition::new(format!("s{i}"), s.0, s.1));
			nodes.push(NodePosition::new(format!("t{i}"), t.0, t.1));
			links.push(LayoutEdge::new(format!("e{i}"), format!("s{i}"), format!("t{i}")));
		}
		BundlingRequest { nodes, links }
	}

	#[test]
	fn subdivision_is_evenly_spaced() {
		let points = subdivide(&[Point::new(0.0, 0.0), Point::new(30.0, 0.0)], 2);
		assert_eq!(points.len(), 4);
		assert!((points[1].x - 10.0).abs() < 1e-9);
		assert!((points[2].x - 20.0).abs() < 1e-9);
		assert_eq!(points[3], Point::new(30.0, 0.0));
	}

	#[test]
	fn parallel_edges_are_fully_compatible_and_crossing_ones_are_not() {
		let a = Segment {
			source: Point::new(0.0, 0.0),
			target: Point::new(100.0, 0.0),
		};
		let b = Segment {
			source: Point::new(0.0, 10.0),
			target: Point::new(100.0, 10.0),
		};
		let c = Segment {
			source: Point::new(50.0, -50.0),
			target: Point::new(50.0, 50.0),
		};
		assert!(compatibility(&a, &b) > 0.9);
		assert!(compatibility(&a, &c) < 1e-9);
	}

	#[test]
	fn parallel_edges_are_drawn_together() {
		let req = request(&[((0.0, 0.0), (200.0, 0.0)), ((0.0, 40.0), (200.0, 40.0))]);
		let bundled = bundle_edges(&req, &config()).unwrap();
		assert_eq!(bundled.len(), 2);
		let expected = config().subdivision_seed * config().subdivision_rate.pow(3);
		assert_eq!(bundled[0].len(), expected);
		let middle = bundled[0].len() / 2;
		let gap = bundled[1][middle].y - bundled[0][middle].y;
		assert!(gap < 40.0, "gap {gap}");
	}

	#[test]
	fn degenerate_links_stay_straight() {
		let mut req = request(&[((0.0, 0.0), (0.0, 0.0)), ((0.0, 0.0), (100.0, 0.0))]);
		req.links.push(LayoutEdge::new("dangling", "s0", "nowhere"));
		let bundled = bundle_edges(&req, &config()).unwrap();
		assert!(bundled[0].is_empty());
		assert!(!bundled[1].is_empty());
		assert!(bundled[2].is_empty());
		let by_id = bend_points_by_id(&req.links, bundled);
		assert!(by_id["dangling"].is_empty());
	}

	#[test]
	fn non_finite_positions_fail() {
		let mut req = request(&[((0.0, 0.0), (10.0, 0.0))]);
		req.nodes[0].x = f64::NAN;
		assert!(matches!(bundle_edges(&req, &config()), Err(LayoutError::Bundling(_))));
	}
}
