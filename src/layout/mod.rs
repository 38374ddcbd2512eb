//! Node placement and edge routing: the coordinator plus the workers it drives.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::LayoutError;

pub mod bundling;
pub mod coordinator;
pub mod hierarchical;
pub mod simulation;
pub mod tween;
pub mod workers;

pub use coordinator::{LayoutCoordinator, LayoutPhase, RoutingPhase};
pub use workers::{LocalWorkers, WorkerEvent, Workers};

/// Node placement algorithm. `ForceGraph` is the live physics simulation, every other
/// variant is a one-shot hierarchical layout.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "&'static str")]
pub enum LayoutType {
	ForceGraph,
	Layered,
	Stress,
	Disco,
	Force,
	Radial,
	MrTree,
	SporeCompaction,
	Random,
	SporeOverlap,
	Box,
	RectPacking,
	Circo,
}

impl LayoutType {
	pub const ALL: [LayoutType; 13] = [
		LayoutType::ForceGraph,
		LayoutType::Layered,
		LayoutType::Stress,
		LayoutType::Disco,
		LayoutType::Force,
		LayoutType::Radial,
		LayoutType::MrTree,
		LayoutType::SporeCompaction,
		LayoutType::Random,
		LayoutType::SporeOverlap,
		LayoutType::Box,
		LayoutType::RectPacking,
		LayoutType::Circo,
	];

	pub fn name(self) -> &'static str {
		match self {
			LayoutType::ForceGraph => "force-graph",
			LayoutType::Layered => "layered",
			LayoutType::Stress => "stress",
			LayoutType::Disco => "disco",
			LayoutType::Force => "force",
			LayoutType::Radial => "radial",
			LayoutType::MrTree => "mrtree",
			LayoutType::SporeCompaction => "sporeCompaction",
			LayoutType::Random => "random",
			LayoutType::SporeOverlap => "sporeOverlap",
			LayoutType::Box => "box",
			LayoutType::RectPacking => "rectpacking",
			LayoutType::Circo => "org.eclipse.elk.graphviz.circo",
		}
	}

	pub fn is_hierarchical(self) -> bool {
		self != LayoutType::ForceGraph
	}
}

impl fmt::Display for LayoutType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.name())
	}
}

impl FromStr for LayoutType {
	type Err = LayoutError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		LayoutType::ALL
			.into_iter()
			.find(|layout| layout.name() == s)
			.ok_or_else(|| LayoutError::UnknownAlgorithm(s.to_string()))
	}
}

impl TryFrom<String> for LayoutType {
	type Error = LayoutError;

	fn try_from(value: String) -> Result<Self, Self::Error> {
		value.parse()
	}
}

impl From<LayoutType> for &'static str {
	fn from(layout: LayoutType) -> Self {
		layout.name()
	}
}

/// How edges are drawn between placed nodes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeLayout {
	#[default]
	Straight,
	Orthogonal,
	Bundled,
}

impl FromStr for EdgeLayout {
	type Err = LayoutError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"straight" => Ok(EdgeLayout::Straight),
			"orthogonal" => Ok(EdgeLayout::Orthogonal),
			"bundled" => Ok(EdgeLayout::Bundled),
			other => Err(LayoutError::UnknownEdgeLayout(other.to_string())),
		}
	}
}

impl fmt::Display for EdgeLayout {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(match self {
			EdgeLayout::Straight => "straight",
			EdgeLayout::Orthogonal => "orthogonal",
			EdgeLayout::Bundled => "bundled",
		})
	}
}

/// Edge routing requested from the hierarchical engine.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EdgeRouting {
	#[default]
	Polyline,
	Orthogonal,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
	pub x: f64,
	pub y: f64,
}

impl Point {
	pub const fn new(x: f64, y: f64) -> Self {
		Self { x, y }
	}

	pub fn distance(self, other: Point) -> f64 {
		(self.x - other.x).hypot(self.y - other.y)
	}
}

impl std::ops::Add for Point {
	type Output = Point;

	fn add(self, rhs: Point) -> Point {
		Point::new(self.x + rhs.x, self.y + rhs.y)
	}
}

impl std::ops::Sub for Point {
	type Output = Point;

	fn sub(self, rhs: Point) -> Point {
		Point::new(self.x - rhs.x, self.y - rhs.y)
	}
}

impl std::ops::Mul<f64> for Point {
	type Output = Point;

	fn mul(self, rhs: f64) -> Point {
		Point::new(self.x * rhs, self.y * rhs)
	}
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NodePosition {
	pub id: String,
	pub x: f64,
	pub y: f64,
}

impl NodePosition {
	pub fn new(id: impl Into<String>, x: f64, y: f64) -> Self {
		Self {
			id: id.into(),
			x,
			y,
		}
	}

	pub fn point(&self) -> Point {
		Point::new(self.x, self.y)
	}
}

/// The part of an edge the layout workers need.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutEdge {
	pub id: String,
	pub source: String,
	pub target: String,
}

impl LayoutEdge {
	pub fn new(id: impl Into<String>, source: impl Into<String>, target: impl Into<String>) -> Self {
		Self {
			id: id.into(),
			source: source.into(),
			target: target.into(),
		}
	}
}

/// Routed polyline interior points, keyed by edge id.
pub type BendPoints = HashMap<String, Vec<Point>>;

/// Shifts every position and bend point by `delta`.
pub fn translate(positions: &mut [NodePosition], bends: &mut BendPoints, delta: Point) {
	for p in positions.iter_mut() {
		p.x += delta.x;
		p.y += delta.y;
	}
	for point in bends.values_mut().flatten() {
		*point = *point + delta;
	}
}

/// Moves the bounding-box centre of `positions` onto the canvas midpoint; bend points
/// follow the nodes.
pub fn center_on_canvas(
	positions: &mut [NodePosition],
	bends: &mut BendPoints,
	width: f64,
	height: f64,
) {
	let Some(first) = positions.first() else {
		return;
	};
	let (mut min, mut max) = (first.point(), first.point());
	for p in positions.iter() {
		min = Point::new(min.x.min(p.x), min.y.min(p.y));
		max = Point::new(max.x.max(p.x), max.y.max(p.y));
	}
	let center = (min + max) * 0.5;
	translate(positions, bends, Point::new(width / 2.0, height / 2.0) - center);
}
