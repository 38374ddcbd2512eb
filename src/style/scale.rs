/// Maps `value` from `domain` onto `range` with an affine transform.
///
/// A zero-width domain maps everything onto `range[0]`.
pub fn scale_linear(domain: [f64; 2], range: [f64; 2], value: f64) -> f64 {
	let [d0, d1] = domain;
	let [r0, r1] = range;
	if d1 == d0 {
		return r0;
	}
	let factor = (r1 - r0) / (d1 - d0);
	r0 + (value - d0) * factor
}
