use std::collections::HashMap;

use super::{NodePosition, Point};

/// d3's `easeCubicInOut`.
pub fn ease_cubic_in_out(t: f64) -> f64 {
	let t = t.clamp(0.0, 1.0) * 2.0;
	if t <= 1.0 {
		t * t * t / 2.0
	} else {
		let t = t - 2.0;
		(t * t * t + 2.0) / 2.0
	}
}

/// Interpolates every node from where it was to where the layout put it.
#[derive(Clone, Debug)]
pub struct Tween {
	from: HashMap<String, Point>,
	to: Vec<NodePosition>,
	elapsed_ms: f64,
	duration_ms: f64,
}

impl Tween {
	pub fn new(from: &[NodePosition], to: Vec<NodePosition>, duration_ms: f64) -> Self {
		Self {
			from: from.iter().map(|p| (p.id.clone(), p.point())).collect(),
			to,
			elapsed_ms: 0.0,
			duration_ms,
		}
	}

	pub fn is_finished(&self) -> bool {
		self.elapsed_ms >= self.duration_ms
	}

	pub fn target(&self) -> &[NodePosition] {
		&self.to
	}

	/// Advances by `dt_ms` and returns the interpolated frame.
	pub fn advance(&mut self, dt_ms: f64) -> Vec<NodePosition> {
		self.elapsed_ms = (self.elapsed_ms + dt_ms).min(self.duration_ms);
		let t = if self.duration_ms > 0.0 {
			ease_cubic_in_out(self.elapsed_ms / self.duration_ms)
		} else {
			1.0
		};
		self.to
			.iter()
			.map(|end| {
				let start = self.from.get(&end.id).copied().unwrap_or(end.point());
				let p = start + (end.point() - start) * t;
				NodePosition::new(end.id.clone(), p.x, p.y)
			})
			.collect()
	}
}
