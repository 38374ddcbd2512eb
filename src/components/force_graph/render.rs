use std::f64::consts::PI;

use web_sys::{CanvasGradient, CanvasRenderingContext2d};

use super::state::CanvasRenderer;
use crate::layout::{LayoutEdge, NodePosition, Point};
use crate::renderer::{arrow_head, conical_outline, label_offset, point_along, sub_path, triangle};
use crate::style::{DecoratorType, EdgeStyle, EdgeType, Gradient, NodeShape, NodeStyle};

fn ease_out_cubic(t: f64) -> f64 {
	1.0 - (1.0 - t).powi(3)
}

enum Paint {
	Color(String),
	Gradient(CanvasGradient),
}

impl Paint {
	/// Solid gradients stay plain colors; others run from `from` to `to`.
	fn new(ctx: &CanvasRenderingContext2d, gradient: &Gradient, from: Point, to: Point) -> Paint {
		if gradient.stops().len() < 2 {
			return Paint::Color(gradient.primary().to_string());
		}
		let canvas_gradient = ctx.create_linear_gradient(from.x, from.y, to.x, to.y);
		for stop in gradient.stops() {
			let _ = canvas_gradient.add_color_stop(stop.1.clamp(0.0, 1.0) as f32, &stop.0.to_string());
		}
		Paint::Gradient(canvas_gradient)
	}

	#[allow(deprecated)]
	fn fill(&self, ctx: &CanvasRenderingContext2d) {
		match self {
			Paint::Color(color) => ctx.set_fill_style_str(color),
			Paint::Gradient(gradient) => ctx.set_fill_style(gradient),
		}
	}

	#[allow(deprecated)]
	fn stroke(&self, ctx: &CanvasRenderingContext2d) {
		match self {
			Paint::Color(color) => ctx.set_stroke_style_str(color),
			Paint::Gradient(gradient) => ctx.set_stroke_style(gradient),
		}
	}
}

pub fn render(renderer: &CanvasRenderer, ctx: &CanvasRenderingContext2d) {
	let scene = &renderer.scene;
	ctx.set_fill_style_str("#ffffff");
	ctx.fill_rect(0.0, 0.0, scene.width, scene.height);
	ctx.save();
	let t = scene.transform;
	let _ = ctx.translate(t.x, t.y);
	let _ = ctx.scale(t.k, t.k);
	for edge in scene.edges() {
		draw_edge(renderer, ctx, edge);
	}
	for node in scene.nodes() {
		draw_node(renderer, ctx, node);
	}
	ctx.restore();
}

/// Alpha for an element under the current hover highlight.
fn dimmed(renderer: &CanvasRenderer, highlighted: bool) -> f64 {
	if !renderer.has_active_highlight() || highlighted {
		return 1.0;
	}
	1.0 - 0.7 * ease_out_cubic(renderer.hover.highlight_t)
}

fn trace(ctx: &CanvasRenderingContext2d, points: &[Point]) {
	ctx.begin_path();
	for (i, p) in points.iter().enumerate() {
		if i == 0 {
			ctx.move_to(p.x, p.y);
		} else {
			ctx.line_to(p.x, p.y);
		}
	}
}

fn draw_edge(renderer: &CanvasRenderer, ctx: &CanvasRenderingContext2d, edge: &LayoutEdge) {
	let scene = &renderer.scene;
	let Some(path) = scene.edge_path(edge) else {
		return;
	};
	let fallback = EdgeStyle::default();
	let style = scene.edge_style(&edge.id).unwrap_or(&fallback);
	let visible = sub_path(&path, style.partial_start, style.partial_end);
	if visible.len() < 2 {
		return;
	}
	let highlighted = renderer.is_highlighted(&edge.source) && renderer.is_highlighted(&edge.target);
	ctx.set_global_alpha(dimmed(renderer, highlighted));

	let paint = Paint::new(ctx, &style.color, path[0], path[path.len() - 1]);
	match style.kind {
		EdgeType::Straight => {
			paint.stroke(ctx);
			ctx.set_line_width(style.width);
			trace(ctx, &visible);
			ctx.stroke();
		}
		EdgeType::Conical => {
			paint.fill(ctx);
			trace(ctx, &conical_outline(&visible, style.width * 2.0));
			ctx.close_path();
			ctx.fill();
		}
	}

	let size = 3.0 + style.width * 2.0;
	for decorator in &style.decorators {
		let Some((at, direction)) = point_along(&path, decorator.position) else {
			continue;
		};
		match decorator.color {
			Some(color) => ctx.set_fill_style_str(&color.to_string()),
			None => paint.fill(ctx),
		}
		match decorator.kind {
			DecoratorType::Triangle => {
				trace(ctx, &arrow_head(at, direction, size));
				ctx.close_path();
			}
			DecoratorType::Circle => {
				ctx.begin_path();
				let _ = ctx.arc(at.x, at.y, size / 2.0, 0.0, 2.0 * PI);
			}
			DecoratorType::Square => {
				ctx.begin_path();
				ctx.rect(at.x - size / 2.0, at.y - size / 2.0, size, size);
			}
		}
		ctx.fill();
	}

	for label in style.labels.iter().filter(|l| !l.text.is_empty()) {
		let Some((at, direction)) = point_along(&path, label.relative_position) else {
			continue;
		};
		let at = at + label_offset(label.position, label.size);
		ctx.save();
		let _ = ctx.translate(at.x, at.y);
		if label.rotate {
			let mut angle = direction.y.atan2(direction.x);
			// Keep text upright.
			if angle.abs() > PI / 2.0 {
				angle += PI;
			}
			let _ = ctx.rotate(angle);
		}
		ctx.set_fill_style_str(&label.color.to_string());
		ctx.set_font(&format!("{}px sans-serif", label.size));
		ctx.set_text_align("center");
		let _ = ctx.fill_text(&label.text, 0.0, 0.0);
		ctx.restore();
	}
	ctx.set_global_alpha(1.0);
}

fn shape_path(ctx: &CanvasRenderingContext2d, shape: NodeShape, center: Point, radius: f64) {
	match shape {
		NodeShape::Circle => {
			ctx.begin_path();
			let _ = ctx.arc(center.x, center.y, radius, 0.0, 2.0 * PI);
		}
		NodeShape::Square => {
			ctx.begin_path();
			ctx.rect(center.x - radius, center.y - radius, radius * 2.0, radius * 2.0);
		}
		NodeShape::Triangle => {
			trace(ctx, &triangle(center, radius));
			ctx.close_path();
		}
	}
}

fn draw_glow(ctx: &CanvasRenderingContext2d, center: Point, radius: f64, strength: f64) {
	let glow_radius = radius * (1.8 + 1.2 * strength);
	let Ok(gradient) =
		ctx.create_radial_gradient(center.x, center.y, radius * 0.3, center.x, center.y, glow_radius)
	else {
		return;
	};
	let alpha = 0.35 * strength;
	let _ = gradient.add_color_stop(0.0, &format!("rgba(40, 40, 60, {})", alpha));
	let _ = gradient.add_color_stop(0.6, &format!("rgba(40, 40, 60, {})", alpha * 0.3));
	let _ = gradient.add_color_stop(1.0, "rgba(40, 40, 60, 0)");
	ctx.begin_path();
	let _ = ctx.arc(center.x, center.y, glow_radius, 0.0, 2.0 * PI);
	#[allow(deprecated)]
	ctx.set_fill_style(&gradient);
	ctx.fill();
}

fn draw_node(renderer: &CanvasRenderer, ctx: &CanvasRenderingContext2d, node: &NodePosition) {
	let fallback = NodeStyle::default();
	let style = renderer.scene.node_style(&node.id).unwrap_or(&fallback);
	let center = node.point();
	let t = ease_out_cubic(renderer.hover.highlight_t);
	let hovered = renderer.is_hovered(&node.id);
	let radius = if hovered { style.size * (1.0 + 0.35 * t) } else { style.size };

	ctx.set_global_alpha(dimmed(renderer, renderer.is_highlighted(&node.id)));
	if style.shadow {
		draw_glow(ctx, center, radius, if hovered { t.max(0.3) } else { 1.0 });
	}

	shape_path(ctx, style.shape, center, radius);
	Paint::new(
		ctx,
		&style.color,
		Point::new(center.x - radius, center.y),
		Point::new(center.x + radius, center.y),
	)
	.fill(ctx);
	ctx.fill();
	if style.stroke_width > 0.0 {
		Paint::new(
			ctx,
			&style.stroke_color,
			Point::new(center.x - radius, center.y),
			Point::new(center.x + radius, center.y),
		)
		.stroke(ctx);
		ctx.set_line_width(style.stroke_width);
		ctx.stroke();
	}

	let k = renderer.scene.transform.k;
	for label in style.labels.iter().filter(|l| !l.text.is_empty()) {
		let at = center + label_offset(label.position, radius + label.size);
		ctx.set_fill_style_str(&label.color.to_string());
		ctx.set_font(&format!("{}px sans-serif", label.size / k.max(0.5)));
		ctx.set_text_align("center");
		let _ = ctx.fill_text(&label.text, at.x, at.y);
	}
	ctx.set_global_alpha(1.0);
}
