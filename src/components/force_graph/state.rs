use std::collections::{HashMap, HashSet};

use crate::layout::{BendPoints, EdgeLayout, LayoutEdge, NodePosition, Point};
use crate::renderer::{Renderer, Scene, ViewTransform};
use crate::style::{EdgeStyle, NodeStyle};

/// Screen-space slack around a node's drawn radius that still counts as a hit.
pub const HIT_SLACK: f64 = 4.0;

#[derive(Clone, Debug, Default)]
pub struct DragState {
	pub active: bool,
	pub node_id: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct PanState {
	pub active: bool,
	pub start_x: f64,
	pub start_y: f64,
	pub transform_start_x: f64,
	pub transform_start_y: f64,
}

#[derive(Clone, Debug, Default)]
pub struct HoverState {
	pub node: Option<String>,
	pub neighbors: HashSet<String>,
	pub highlight_t: f64,
	pub prev_node: Option<String>,
	pub prev_neighbors: HashSet<String>,
	delay_t: f64,
}

/// The renderer behind the canvas: a retained scene plus view interaction state.
pub struct CanvasRenderer {
	pub scene: Scene,
	pub drag: DragState,
	pub pan: PanState,
	pub hover: HoverState,
}

impl CanvasRenderer {
	pub fn new(width: f64, height: f64) -> Self {
		Self {
			scene: Scene::new(width, height),
			drag: DragState::default(),
			pan: PanState::default(),
			hover: HoverState::default(),
		}
	}

	pub fn transform(&self) -> ViewTransform {
		self.scene.transform
	}

	pub fn screen_to_graph(&self, sx: f64, sy: f64) -> Point {
		self.scene.transform.invert(Point::new(sx, sy))
	}

	pub fn node_at_position(&self, sx: f64, sy: f64) -> Option<String> {
		let slack = HIT_SLACK / self.scene.transform.k;
		self.scene
			.node_at(self.screen_to_graph(sx, sy), slack)
			.map(str::to_string)
	}

	pub fn set_hover(&mut self, node: Option<String>) {
		if self.hover.node == node {
			return;
		}
		let was_hovering = self.hover.node.is_some();

		// Keep the old highlight around while it fades out.
		if was_hovering && node.is_none() {
			self.hover.prev_node = self.hover.node.take();
			self.hover.prev_neighbors = std::mem::take(&mut self.hover.neighbors);
		} else {
			self.hover.prev_node = None;
			self.hover.prev_neighbors.clear();
		}

		self.hover.neighbors.clear();
		if let Some(id) = &node {
			if !was_hovering {
				self.hover.delay_t = 0.0;
			}
			for edge in self.scene.edges() {
				if &edge.source == id {
					self.hover.neighbors.insert(edge.target.clone());
				} else if &edge.target == id {
					self.hover.neighbors.insert(edge.source.clone());
				}
			}
		}
		self.hover.node = node;
	}

	pub fn is_highlighted(&self, id: &str) -> bool {
		self.is_hovered(id)
			|| self.hover.neighbors.contains(id)
			|| self.hover.prev_neighbors.contains(id)
	}

	pub fn is_hovered(&self, id: &str) -> bool {
		self.hover.node.as_deref() == Some(id) || self.hover.prev_node.as_deref() == Some(id)
	}

	pub fn has_active_highlight(&self) -> bool {
		self.hover.node.is_some() || self.hover.prev_node.is_some()
	}

	/// Advances the hover highlight animation by `dt` seconds.
	pub fn tick(&mut self, dt: f64) {
		let (target, delay, speed) = if self.hover.node.is_some() {
			(1.0, 0.08, 1.8)
		} else {
			(0.0, 0.0, 1.26)
		};

		if self.hover.node.is_some() {
			self.hover.delay_t = (self.hover.delay_t + dt).min(delay);
			if self.hover.delay_t >= delay {
				self.hover.highlight_t += (target - self.hover.highlight_t) * speed * dt;
			}
		} else {
			self.hover.highlight_t += (target - self.hover.highlight_t) * speed * dt;
			if self.hover.highlight_t < 0.01 {
				self.hover.highlight_t = 0.0;
				self.hover.prev_node = None;
				self.hover.prev_neighbors.clear();
			}
		}
	}

	pub fn start_pan(&mut self, x: f64, y: f64) {
		let t = self.scene.transform;
		self.pan = PanState {
			active: true,
			start_x: x,
			start_y: y,
			transform_start_x: t.x,
			transform_start_y: t.y,
		};
	}

	pub fn pan_to(&mut self, x: f64, y: f64) {
		if !self.pan.active {
			return;
		}
		self.scene.transform.x = self.pan.transform_start_x + (x - self.pan.start_x);
		self.scene.transform.y = self.pan.transform_start_y + (y - self.pan.start_y);
	}

	pub fn release(&mut self) {
		self.drag = DragState::default();
		self.pan.active = false;
	}
}

impl Renderer for CanvasRenderer {
	fn initialize(
		&mut self,
		nodes: &[NodePosition],
		edges: &[LayoutEdge],
		node_styles: &HashMap<String, NodeStyle>,
		edge_styles: &HashMap<String, EdgeStyle>,
		edge_layout: EdgeLayout,
	) {
		self.release();
		self.hover = HoverState::default();
		self.scene
			.initialize(nodes, edges, node_styles, edge_styles, edge_layout);
	}

	fn update_positions(&mut self, positions: &[NodePosition], origin_offset: Option<Point>) {
		self.scene.update_positions(positions, origin_offset);
	}

	fn update_node_style(&mut self, id: &str, style: &NodeStyle) {
		self.scene.update_node_style(id, style);
	}

	fn update_edge_style(&mut self, id: &str, style: &EdgeStyle) {
		self.scene.update_edge_style(id, style);
	}

	fn update_edge_layout(&mut self, edge_layout: EdgeLayout, bends: &BendPoints) {
		self.scene.update_edge_layout(edge_layout, bends);
	}

	fn zoom(&mut self, transform: ViewTransform) {
		self.scene.zoom(transform);
	}

	fn resize(&mut self, width: f64, height: f64) {
		self.scene.resize(width, height);
	}

	fn export_static_image(&self) -> String {
		self.scene.export_static_image()
	}

	fn reset_zoom(&mut self) {
		self.scene.reset_zoom();
	}
}
