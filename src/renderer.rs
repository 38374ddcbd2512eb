//! The drawing surface the coordinator drives, plus a headless scene.
//!
//! [`Scene`] keeps everything the renderer was told and can serialize itself as SVG.
//! The canvas component wraps a scene and paints it every frame.

use std::collections::HashMap;
use std::fmt::Write as _;

use log::debug;

use crate::layout::{BendPoints, EdgeLayout, LayoutEdge, NodePosition, Point};
use crate::style::{
	DecoratorType, EdgeStyle, EdgeType, Gradient, LabelPosition, NodeShape, NodeStyle,
};

pub const MIN_ZOOM: f64 = 0.1;
pub const MAX_ZOOM: f64 = 10.0;

/// Pan and zoom: screen = graph * k + (x, y).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewTransform {
	pub x: f64,
	pub y: f64,
	pub k: f64,
}

impl Default for ViewTransform {
	fn default() -> Self {
		Self {
			x: 0.0,
			y: 0.0,
			k: 1.0,
		}
	}
}

impl ViewTransform {
	pub fn invert(&self, screen: Point) -> Point {
		Point::new((screen.x - self.x) / self.k, (screen.y - self.y) / self.k)
	}

	pub fn apply(&self, graph: Point) -> Point {
		Point::new(graph.x * self.k + self.x, graph.y * self.k + self.y)
	}

	/// Zooms by `factor` keeping the graph point under `anchor` (screen space) fixed.
	pub fn zoom_at(&self, anchor: Point, factor: f64) -> ViewTransform {
		let k = (self.k * factor).clamp(MIN_ZOOM, MAX_ZOOM);
		let graph = self.invert(anchor);
		ViewTransform {
			x: anchor.x - graph.x * k,
			y: anchor.y - graph.y * k,
			k,
		}
	}
}

pub trait Renderer {
	fn initialize(
		&mut self,
		nodes: &[NodePosition],
		edges: &[LayoutEdge],
		node_styles: &HashMap<String, NodeStyle>,
		edge_styles: &HashMap<String, EdgeStyle>,
		edge_layout: EdgeLayout,
	);
	/// `origin_offset` shifts every position before it is stored.
	fn update_positions(&mut self, positions: &[NodePosition], origin_offset: Option<Point>);
	fn update_node_style(&mut self, id: &str, style: &NodeStyle);
	fn update_edge_style(&mut self, id: &str, style: &EdgeStyle);
	fn update_node_styles(&mut self, styles: &HashMap<String, NodeStyle>) {
		for (id, style) in styles {
			self.update_node_style(id, style);
		}
	}
	fn update_edge_styles(&mut self, styles: &HashMap<String, EdgeStyle>) {
		for (id, style) in styles {
			self.update_edge_style(id, style);
		}
	}
	/// Switches edge geometry. Bend points are ignored for `Straight`.
	fn update_edge_layout(&mut self, edge_layout: EdgeLayout, bends: &BendPoints);
	fn zoom(&mut self, transform: ViewTransform);
	fn resize(&mut self, width: f64, height: f64);
	fn export_static_image(&self) -> String;
	fn reset_zoom(&mut self);
}

/// Retained drawing state.
#[derive(Clone, Debug, Default)]
pub struct Scene {
	pub width: f64,
	pub height: f64,
	pub transform: ViewTransform,
	nodes: Vec<NodePosition>,
	index: HashMap<String, usize>,
	edges: Vec<LayoutEdge>,
	node_styles: HashMap<String, NodeStyle>,
	edge_styles: HashMap<String, EdgeStyle>,
	edge_layout: EdgeLayout,
	bends: BendPoints,
}

impl Scene {
	pub fn new(width: f64, height: f64) -> Self {
		Self {
			width,
			height,
			..Self::default()
		}
	}

	pub fn nodes(&self) -> &[NodePosition] {
		&self.nodes
	}

	pub fn edges(&self) -> &[LayoutEdge] {
		&self.edges
	}

	pub fn edge_layout(&self) -> EdgeLayout {
		self.edge_layout
	}

	pub fn bends(&self) -> &BendPoints {
		&self.bends
	}

	pub fn position(&self, id: &str) -> Option<Point> {
		self.index.get(id).map(|&i| self.nodes[i].point())
	}

	pub fn node_style(&self, id: &str) -> Option<&NodeStyle> {
		self.node_styles.get(id)
	}

	pub fn edge_style(&self, id: &str) -> Option<&EdgeStyle> {
		self.edge_styles.get(id)
	}

	/// Source, bends (when routed) and target.
	pub fn edge_path(&self, edge: &LayoutEdge) -> Option<Vec<Point>> {
		let source = self.position(&edge.source)?;
		let target = self.position(&edge.target)?;
		let mut path = vec![source];
		if self.edge_layout != EdgeLayout::Straight {
			path.extend(self.bends.get(&edge.id).into_iter().flatten().copied());
		}
		path.push(target);
		Some(path)
	}

	/// Topmost node whose drawn shape contains `graph`.
	pub fn node_at(&self, graph: Point, slack: f64) -> Option<&str> {
		self.nodes
			.iter()
			.rev()
			.find(|n| {
				let size = self.node_styles.get(&n.id).map_or(5.0, |s| s.size);
				n.point().distance(graph) <= size + slack
			})
			.map(|n| n.id.as_str())
	}

	pub fn to_svg(&self) -> String {
		let mut svg = String::new();
		let _ = write!(
			svg,
			r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
			w = self.width,
			h = self.height
		);
		svg.push_str(r#"<rect width="100%" height="100%" fill="white"/>"#);
		let _ = write!(
			svg,
			r#"<g transform="translate({} {}) scale({})">"#,
			self.transform.x, self.transform.y, self.transform.k
		);
		for edge in &self.edges {
			self.edge_svg(edge, &mut svg);
		}
		for node in &self.nodes {
			self.node_svg(node, &mut svg);
		}
		svg.push_str("</g></svg>");
		svg
	}

	fn edge_svg(&self, edge: &LayoutEdge, svg: &mut String) {
		let Some(path) = self.edge_path(edge) else {
			return;
		};
		let style = self.edge_styles.get(&edge.id).cloned().unwrap_or_default();
		let visible = sub_path(&path, style.partial_start, style.partial_end);
		if visible.len() < 2 {
			return;
		}
		let color = style.color.primary();
		let paint = paint(svg, &format!("edge-{}", edge.id), &style.color, path[0], path[path.len() - 1]);
		match style.kind {
			EdgeType::Straight => {
				let _ = write!(
					svg,
					r#"<polyline points="{}" fill="none" stroke="{}" stroke-width="{}"/>"#,
					points_attr(&visible),
					paint,
					style.width
				);
			}
			EdgeType::Conical => {
				let _ = write!(
					svg,
					r#"<polygon points="{}" fill="{}"/>"#,
					points_attr(&conical_outline(&visible, style.width * 2.0)),
					paint
				);
			}
		}
		for decorator in &style.decorators {
			let Some((at, direction)) = point_along(&path, decorator.position) else {
				continue;
			};
			let fill = decorator.color.unwrap_or(color);
			let size = 3.0 + style.width * 2.0;
			match decorator.kind {
				DecoratorType::Triangle => {
					let _ = write!(
						svg,
						r#"<polygon points="{}" fill="{}"/>"#,
						points_attr(&arrow_head(at, direction, size)),
						fill
					);
				}
				DecoratorType::Circle => {
					let _ = write!(
						svg,
						r#"<circle cx="{}" cy="{}" r="{}" fill="{}"/>"#,
						at.x,
						at.y,
						size / 2.0,
						fill
					);
				}
				DecoratorType::Square => {
					let _ = write!(
						svg,
						r#"<rect x="{}" y="{}" width="{s}" height="{s}" fill="{}"/>"#,
						at.x - size / 2.0,
						at.y - size / 2.0,
						fill,
						s = size
					);
				}
			}
		}
		for label in &style.labels {
			if let Some((at, _)) = point_along(&path, label.relative_position) {
				text_svg(svg, at, &label.text, label.size, &label.color.to_string());
			}
		}
	}

	fn node_svg(&self, node: &NodePosition, svg: &mut String) {
		let style = self.node_styles.get(&node.id).cloned().unwrap_or_default();
		let (x, y, r) = (node.x, node.y, style.size);
		let fill = paint(
			svg,
			&format!("node-{}", node.id),
			&style.color,
			Point::new(x - r, y),
			Point::new(x + r, y),
		);
		let stroke = style.stroke_color.primary();
		let outline = format!(r#"fill="{fill}" stroke="{stroke}" stroke-width="{}""#, style.stroke_width);
		match style.shape {
			NodeShape::Circle => {
				let _ = write!(svg, r#"<circle cx="{x}" cy="{y}" r="{r}" {outline}/>"#);
			}
			NodeShape::Square => {
				let _ = write!(
					svg,
					r#"<rect x="{}" y="{}" width="{s}" height="{s}" {outline}/>"#,
					x - r,
					y - r,
					s = r * 2.0
				);
			}
			NodeShape::Triangle => {
				let _ = write!(
					svg,
					r#"<polygon points="{}" {outline}/>"#,
					points_attr(&triangle(Point::new(x, y), r))
				);
			}
		}
		for label in &style.labels {
			let offset = label_offset(label.position, r + label.size);
			text_svg(svg, Point::new(x, y) + offset, &label.text, label.size, &label.color.to_string());
		}
	}
}

impl Renderer for Scene {
	fn initialize(
		&mut self,
		nodes: &[NodePosition],
		edges: &[LayoutEdge],
		node_styles: &HashMap<String, NodeStyle>,
		edge_styles: &HashMap<String, EdgeStyle>,
		edge_layout: EdgeLayout,
	) {
		self.nodes = nodes.to_vec();
		self.index = nodes.iter().enumerate().map(|(i, n)| (n.id.clone(), i)).collect();
		self.edges = edges.to_vec();
		self.node_styles = node_styles.clone();
		self.edge_styles = edge_styles.clone();
		self.edge_layout = edge_layout;
		self.bends.clear();
		debug!("scene initialized: {} nodes, {} edges", nodes.len(), edges.len());
	}

	fn update_positions(&mut self, positions: &[NodePosition], origin_offset: Option<Point>) {
		let offset = origin_offset.unwrap_or_default();
		for p in positions {
			if let Some(&i) = self.index.get(&p.id) {
				self.nodes[i].x = p.x + offset.x;
				self.nodes[i].y = p.y + offset.y;
			}
		}
	}

	fn update_node_style(&mut self, id: &str, style: &NodeStyle) {
		self.node_styles.insert(id.to_string(), style.clone());
	}

	fn update_edge_style(&mut self, id: &str, style: &EdgeStyle) {
		self.edge_styles.insert(id.to_string(), style.clone());
	}

	fn update_edge_layout(&mut self, edge_layout: EdgeLayout, bends: &BendPoints) {
		self.edge_layout = edge_layout;
		self.bends = match edge_layout {
			EdgeLayout::Straight => BendPoints::new(),
			_ => bends.clone(),
		};
	}

	fn zoom(&mut self, transform: ViewTransform) {
		self.transform = ViewTransform {
			k: transform.k.clamp(MIN_ZOOM, MAX_ZOOM),
			..transform
		};
	}

	fn resize(&mut self, width: f64, height: f64) {
		self.width = width;
		self.height = height;
	}

	fn export_static_image(&self) -> String {
		self.to_svg()
	}

	fn reset_zoom(&mut self) {
		self.transform = ViewTransform::default();
	}
}

fn points_attr(points: &[Point]) -> String {
	points
		.iter()
		.map(|p| format!("{},{}", p.x, p.y))
		.collect::<Vec<_>>()
		.join(" ")
}

/// A plain color, or a reference to a `linearGradient` written in place from `from` to `to`.
fn paint(svg: &mut String, id: &str, gradient: &Gradient, from: Point, to: Point) -> String {
	if gradient.stops().len() < 2 {
		return gradient.primary().to_string();
	}
	let id = format!("g-{}", escape_id(id));
	let _ = write!(
		svg,
		r#"<defs><linearGradient id="{id}" gradientUnits="userSpaceOnUse" x1="{}" y1="{}" x2="{}" y2="{}">"#,
		from.x, from.y, to.x, to.y
	);
	for stop in gradient.stops() {
		let _ = write!(
			svg,
			r#"<stop offset="{}" stop-color="{}"/>"#,
			stop.1.clamp(0.0, 1.0),
			stop.0
		);
	}
	svg.push_str("</linearGradient></defs>");
	format!("url(#{id})")
}

fn escape_id(id: &str) -> String {
	id.chars()
		.map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
		.collect()
}

fn text_svg(svg: &mut String, at: Point, text: &str, size: f64, color: &str) {
	if text.is_empty() {
		return;
	}
	let _ = write!(
		svg,
		r#"<text x="{}" y="{}" font-size="{}" fill="{}" text-anchor="middle">{}</text>"#,
		at.x,
		at.y,
		size,
		color,
		escape_xml(text)
	);
}

fn escape_xml(text: &str) -> String {
	let mut out = String::with_capacity(text.len());
	for c in text.chars() {
		match c {
			'&' => out.push_str("&amp;"),
			'<' => out.push_str("&lt;"),
			'>' => out.push_str("&gt;"),
			'"' => out.push_str("&quot;"),
			c => out.push(c),
		}
	}
	out
}

pub fn label_offset(position: LabelPosition, distance: f64) -> Point {
	match position {
		LabelPosition::Below => Point::new(0.0, distance),
		LabelPosition::Above => Point::new(0.0, -distance),
		LabelPosition::Left => Point::new(-distance, 0.0),
		LabelPosition::Right => Point::new(distance, 0.0),
		LabelPosition::Center => Point::default(),
	}
}

pub fn triangle(center: Point, radius: f64) -> [Point; 3] {
	let h = radius * 3.0_f64.sqrt() / 2.0;
	[
		Point::new(center.x, center.y - radius),
		Point::new(center.x + h, center.y + radius / 2.0),
		Point::new(center.x - h, center.y + radius / 2.0),
	]
}

pub fn arrow_head(tip: Point, direction: Point, size: f64) -> [Point; 3] {
	let back = tip - direction * size;
	let side = Point::new(-direction.y, direction.x) * (size / 2.0);
	[tip, back + side, back - side]
}

fn path_length(path: &[Point]) -> f64 {
	path.windows(2).map(|w| w[0].distance(w[1])).sum()
}

/// The point at relative arc length `t` and the unit direction of travel there.
pub fn point_along(path: &[Point], t: f64) -> Option<(Point, Point)> {
	let total = path_length(path);
	if total <= 0.0 {
		return None;
	}
	let mut remaining = t.clamp(0.0, 1.0) * total;
	for w in path.windows(2) {
		let length = w[0].distance(w[1]);
		if length <= 0.0 {
			continue;
		}
		let direction = (w[1] - w[0]) * (1.0 / length);
		if remaining <= length {
			return Some((w[0] + direction * remaining, direction));
		}
		remaining -= length;
	}
	let w = &path[path.len() - 2..];
	let length = w[0].distance(w[1]).max(f64::EPSILON);
	Some((w[1], (w[1] - w[0]) * (1.0 / length)))
}

/// The part of `path` between relative arc lengths `from` and `to`.
pub fn sub_path(path: &[Point], from: f64, to: f64) -> Vec<Point> {
	let total = path_length(path);
	let (from, to) = (from.clamp(0.0, 1.0) * total, to.clamp(0.0, 1.0) * total);
	if total <= 0.0 || to <= from {
		return Vec::new();
	}
	let mut out = Vec::new();
	let mut travelled = 0.0;
	for w in path.windows(2) {
		let length = w[0].distance(w[1]);
		let (start, end) = (travelled, travelled + length);
		travelled = end;
		if end < from || start > to || length <= 0.0 {
			continue;
		}
		let at = |d: f64| w[0] + (w[1] - w[0]) * ((d - start) / length);
		if out.is_empty() {
			out.push(at(from.max(start)));
		}
		out.push(at(to.min(end)));
	}
	out
}

/// A wedge narrowing from `width` at the start of the path to a point at its end.
pub fn conical_outline(path: &[Point], width: f64) -> Vec<Point> {
	let total = path_length(path).max(f64::EPSILON);
	let mut left = Vec::with_capacity(path.len());
	let mut right = Vec::with_capacity(path.len());
	let mut travelled = 0.0;
	for (i, &p) in path.iter().enumerate() {
		if i > 0 {
			travelled += path[i - 1].distance(p);
		}
		let (a, b) = if i + 1 < path.len() { (p, path[i + 1]) } else { (path[i - 1], p) };
		let length = a.distance(b).max(f64::EPSILON);
		let normal = Point::new(-(b.y - a.y) / length, (b.x - a.x) / length);
		let half = width / 2.0 * (1.0 - travelled / total);
		left.push(p + normal * half);
		right.push(p - normal * half);
	}
	right.reverse();
	left.extend(right);
	left
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::style::Rgba;

	fn scene() -> Scene {
		let mut scene = Scene::new(200.0, 100.0);
		let nodes = vec![NodePosition::new("a", 0.0, 0.0), NodePosition::new("b", 100.0, 0.0)];
		let edges = vec![LayoutEdge::new("ab", "a", "b")];
		scene.initialize(&nodes, &edges, &HashMap::new(), &HashMap::new(), EdgeLayout::Straight);
		scene
	}

	#[test]
	fn zoom_keeps_the_anchor_fixed_and_clamps() {
		let t = ViewTransform::default().zoom_at(Point::new(50.0, 50.0), 2.0);
		assert_eq!(t.apply(Point::new(50.0, 50.0)), Point::new(50.0, 50.0));
		assert_eq!(t.k, 2.0);
		let far = ViewTransform::default().zoom_at(Point::default(), 1000.0);
		assert_eq!(far.k, MAX_ZOOM);
	}

	#[test]
	fn sub_path_trims_by_arc_length() {
		let path = [Point::new(0.0, 0.0), Point::new(10.0, 0.0), Point::new(10.0, 10.0)];
		assert_eq!(
			sub_path(&path, 0.0, 0.25),
			vec![Point::new(0.0, 0.0), Point::new(5.0, 0.0)]
		);
		assert_eq!(
			sub_path(&path, 0.25, 0.75),
			vec![Point::new(5.0, 0.0), Point::new(10.0, 0.0), Point::new(10.0, 5.0)]
		);
		assert!(sub_path(&path, 0.5, 0.5).is_empty());
	}

	#[test]
	fn straight_layout_ignores_bends() {
		let mut scene = scene();
		let bends = BendPoints::from([("ab".to_string(), vec![Point::new(50.0, 40.0)])]);
		scene.update_edge_layout(EdgeLayout::Bundled, &bends);
		assert_eq!(scene.edge_path(&scene.edges()[0].clone()).unwrap().len(), 3);
		scene.update_edge_layout(EdgeLayout::Straight, &bends);
		assert_eq!(scene.edge_path(&scene.edges()[0].clone()).unwrap().len(), 2);
	}

	#[test]
	fn positions_apply_the_origin_offset() {
		let mut scene = scene();
		scene.update_positions(&[NodePosition::new("a", 1.0, 2.0)], Some(Point::new(10.0, 10.0)));
		assert_eq!(scene.position("a"), Some(Point::new(11.0, 12.0)));
		assert_eq!(scene.node_at(Point::new(12.0, 12.0), 0.0), Some("a"));
	}

	#[test]
	fn svg_export_draws_every_element() {
		let mut scene = scene();
		let mut style = NodeStyle::default();
		style.color = Gradient::solid(Rgba::rgb(255, 0, 0));
		style.labels.push(crate::style::NodeLabel {
			text: "a & b".into(),
			..Default::default()
		});
		scene.update_node_style("a", &style);
		let svg = scene.export_static_image();
		assert!(svg.starts_with("<svg"));
		assert!(svg.ends_with("</svg>"));
		assert_eq!(svg.matches("<circle").count(), 2);
		assert_eq!(svg.matches("<polyline").count(), 1);
		assert!(svg.contains("rgba(255, 0, 0, 1)"));
		assert!(svg.contains("a &amp; b"));
		// Default edge color has two stops.
		assert!(svg.contains(r#"<linearGradient id="g-edge-ab""#));
		assert!(svg.contains(r#"stroke="url(#g-edge-ab)""#));
	}
}
