use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Rgba {
	pub r: u8,
	pub g: u8,
	pub b: u8,
	#[serde(default = "opaque")]
	pub a: f64,
}

fn opaque() -> f64 {
	1.0
}

impl Rgba {
	pub const BLACK: Rgba = Rgba::rgb(0, 0, 0);
	pub const WHITE: Rgba = Rgba::rgb(255, 255, 255);

	pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
		Self { r, g, b, a: 1.0 }
	}

	/// Linear per-channel mix; `t = 0` is `self`, `t = 1` is `other`.
	pub fn mix(&self, other: &Rgba, t: f64) -> Rgba {
		let t = t.clamp(0.0, 1.0);
		let channel = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * t).round() as u8;
		Rgba {
			r: channel(self.r, other.r),
			g: channel(self.g, other.g),
			b: channel(self.b, other.b),
			a: self.a + (other.a - self.a) * t,
		}
	}

	pub fn with_alpha(self, a: f64) -> Rgba {
		Rgba { a, ..self }
	}

	/// `h` in degrees, `s` and `l` in percent.
	pub fn from_hsl(h: f64, s: f64, l: f64) -> Rgba {
		let (s, l) = (s / 100.0, l / 100.0);
		let c = (1.0 - (2.0 * l - 1.0).abs()) * s;
		let x = c * (1.0 - ((h / 60.0) % 2.0 - 1.0).abs());
		let m = l - c / 2.0;
		let (r, g, b) = match h {
			h if h < 60.0 => (c, x, 0.0),
			h if h < 120.0 => (x, c, 0.0),
			h if h < 180.0 => (0.0, c, x),
			h if h < 240.0 => (0.0, x, c),
			h if h < 300.0 => (x, 0.0, c),
			_ => (c, 0.0, x),
		};
		let to_byte = |v: f64| ((v + m) * 255.0).round() as u8;
		Rgba::rgb(to_byte(r), to_byte(g), to_byte(b))
	}
}

impl fmt::Display for Rgba {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "rgba({}, {}, {}, {})", self.r, self.g, self.b, self.a)
	}
}

/// `count` colors evenly spaced around the hue wheel.
pub fn qualitative_color_scheme(count: usize) -> Vec<Rgba> {
	let step = 360.0 / count.max(1) as f64;
	(0..count)
		.map(|i| Rgba::from_hsl(i as f64 * step, 70.0, 50.0))
		.collect()
}

/// A color at a position in `[0, 1]`. Serialized as `[color, position]`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ColorStop(pub Rgba, pub f64);

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Gradient(pub Vec<ColorStop>);

impl Gradient {
	pub fn solid(color: Rgba) -> Self {
		Gradient(vec![ColorStop(color, 1.0)])
	}

	pub fn two_stop(from: Rgba, to: Rgba) -> Self {
		Gradient(vec![ColorStop(from, 0.0), ColorStop(to, 1.0)])
	}

	pub fn stops(&self) -> &[ColorStop] {
		&self.0
	}

	/// The color drawn for solid fills: the first stop.
	pub fn primary(&self) -> Rgba {
		self.0.first().map_or(Rgba::BLACK, |s| s.0)
	}

	/// Samples the gradient at `position`, clamped to `[0, 1]`.
	///
	/// Stops are sorted by position and extended so that stops exist at 0 and 1; the
	/// two stops bracketing `position` are mixed linearly.
	pub fn sample(&self, position: f64) -> Rgba {
		let mut stops = self.0.clone();
		if stops.is_empty() {
			return Rgba::BLACK;
		}
		stops.sort_by(|a, b| a.1.total_cmp(&b.1));
		if let Some(&ColorStop(color, pos)) = stops.last() {
			if pos < 1.0 {
				stops.push(ColorStop(color, 1.0));
			}
		}
		if stops[0].1 > 0.0 {
			stops.insert(0, ColorStop(stops[0].0, 0.0));
		}

		let position = if position.is_nan() {
			0.0
		} else {
			position.clamp(0.0, 1.0)
		};
		let (mut lower, mut upper) = (ColorStop(Rgba::BLACK, 0.0), ColorStop(Rgba::WHITE, 1.0));
		for &stop in &stops {
			if stop.1 <= position {
				lower = stop;
			} else {
				upper = stop;
				break;
			}
		}
		if lower.1 == upper.1 || upper.1 <= position {
			return lower.0;
		}
		let t = (position - lower.1) / (upper.1 - lower.1);
		lower.0.mix(&upper.0, t)
	}
}
