//! Applicability conditions over the graph characteristics cache, scored in `[0, 1]`.

use serde::{Deserialize, Serialize};

use crate::error::GuidelineError;
use crate::graph::characteristics::{CharacteristicValue, GraphCharacteristics};

/// Weight of an ultimate child: it gates its composite instead of contributing to it.
pub const ULTIMATE: f64 = -1.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogicalOperator {
	And,
	Or,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ConditionKind {
	Numeric {
		property: String,
		#[serde(default, skip_serializing_if = "Option::is_none")]
		min: Option<f64>,
		#[serde(default, skip_serializing_if = "Option::is_none")]
		max: Option<f64>,
		#[serde(default, skip_serializing_if = "Option::is_none")]
		ideal: Option<f64>,
		#[serde(default, skip_serializing_if = "Option::is_none")]
		tolerance: Option<f64>,
	},
	Boolean {
		property: String,
		value: bool,
	},
	String {
		property: String,
		value: String,
	},
	Range {
		property: String,
		#[serde(default, skip_serializing_if = "Option::is_none")]
		min: Option<f64>,
		#[serde(default, skip_serializing_if = "Option::is_none")]
		max: Option<f64>,
	},
	Logical {
		operator: LogicalOperator,
		conditions: Vec<Condition>,
	},
	Composite {
		conditions: Vec<WeightedCondition>,
	},
}

/// A condition plus an optional logical guard whose 0/1 result multiplies its score.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Condition {
	#[serde(flatten)]
	pub kind: ConditionKind,
	#[serde(
		rename = "logicalCondition",
		default,
		skip_serializing_if = "Option::is_none"
	)]
	pub logical_condition: Option<Box<Condition>>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WeightedCondition {
	pub weight: f64,
	pub condition: Condition,
	#[serde(rename = "GUIID", default, skip_serializing_if = "Option::is_none")]
	pub gui_id: Option<u64>,
}

impl WeightedCondition {
	pub fn is_ultimate(&self) -> bool {
		self.weight == ULTIMATE
	}

	/// Gives this condition and every nested weighted condition a fresh GUI id.
	pub fn assign_gui_ids(&mut self, next_id: &mut impl FnMut() -> u64) {
		self.gui_id = Some(next_id());
		self.condition.assign_gui_ids(next_id);
	}
}

impl Condition {
	pub fn new(kind: ConditionKind) -> Self {
		Self {
			kind,
			logical_condition: None,
		}
	}

	pub fn guarded_by(self, guard: Condition) -> Self {
		Self {
			logical_condition: Some(Box::new(guard)),
			..self
		}
	}

	pub fn evaluate(&self, characteristics: &GraphCharacteristics) -> Result<f64, GuidelineError> {
		let guard = match &self.logical_condition {
			Some(guard) => guard.evaluate(characteristics)?,
			None => 1.0,
		};
		let score = match &self.kind {
			ConditionKind::Numeric {
				property,
				min,
				max,
				ideal,
				tolerance,
			} => numeric(
				number(characteristics, property)?,
				property,
				*min,
				*max,
				*ideal,
				*tolerance,
			)?,
			ConditionKind::Boolean { property, value } => {
				indicator(lookup(characteristics, property)? == &CharacteristicValue::Bool(*value))
			}
			ConditionKind::String { property, value } => indicator(matches!(
				lookup(characteristics, property)?,
				CharacteristicValue::Text(text) if text == value
			)),
			ConditionKind::Range { property, min, max } => {
				let value = number(characteristics, property)?;
				indicator(min.is_none_or(|m| value >= m) && max.is_none_or(|m| value <= m))
			}
			ConditionKind::Logical {
				operator,
				conditions,
			} => {
				let results = conditions
					.iter()
					.map(|c| c.evaluate(characteristics))
					.collect::<Result<Vec<_>, _>>()?;
				indicator(match operator {
					LogicalOperator::And => results.iter().all(|&r| r == 1.0),
					LogicalOperator::Or => results.iter().any(|&r| r == 1.0),
				})
			}
			ConditionKind::Composite { conditions } => composite(conditions, characteristics)?,
		};
		Ok(score * guard)
	}

	fn assign_gui_ids(&mut self, next_id: &mut impl FnMut() -> u64) {
		match &mut self.kind {
			ConditionKind::Composite { conditions } => {
				for child in conditions {
					child.assign_gui_ids(&mut *next_id);
				}
			}
			ConditionKind::Logical { conditions, .. } => {
				for child in conditions {
					child.assign_gui_ids(&mut *next_id);
				}
			}
			_ => {}
		}
		if let Some(guard) = &mut self.logical_condition {
			guard.assign_gui_ids(next_id);
		}
	}
}

fn indicator(holds: bool) -> f64 {
	if holds { 1.0 } else { 0.0 }
}

fn lookup<'a>(
	characteristics: &'a GraphCharacteristics,
	property: &str,
) -> Result<&'a CharacteristicValue, GuidelineError> {
	characteristics
		.get(property)
		.ok_or_else(|| GuidelineError::MissingCharacteristic(property.to_string()))
}

fn number(characteristics: &GraphCharacteristics, property: &str) -> Result<f64, GuidelineError> {
	lookup(characteristics, property)?;
	characteristics
		.number(property)
		.ok_or_else(|| GuidelineError::NotNumeric(property.to_string()))
}

/// Out of `[min, max]` scores 0. With ideal and tolerance the score falls off linearly
/// with the distance to the ideal; with a full range it falls off with the normalised
/// distance to the ideal (the midpoint by default); a one-sided bound is a plain test.
fn numeric(
	value: f64,
	property: &str,
	min: Option<f64>,
	max: Option<f64>,
	ideal: Option<f64>,
	tolerance: Option<f64>,
) -> Result<f64, GuidelineError> {
	if min.is_some_and(|m| value < m) || max.is_some_and(|m| value > m) {
		return Ok(0.0);
	}
	if let (Some(ideal), Some(tolerance)) = (ideal, tolerance) {
		if tolerance <= 0.0 {
			return Ok(indicator(value == ideal));
		}
		return Ok((1.0 - (value - ideal).abs() / tolerance).max(0.0));
	}
	match (min, max) {
		(Some(min), Some(max)) => {
			let range = max - min;
			if range == 0.0 {
				return Ok(1.0);
			}
			let ideal = ideal.unwrap_or(min + range / 2.0);
			Ok(1.0 - ((value - min) / range - (ideal - min) / range).abs())
		}
		(Some(_), None) | (None, Some(_)) => Ok(1.0),
		(None, None) => Err(GuidelineError::InvalidNumericCondition(property.to_string())),
	}
}

/// Ultimate children gate the composite; the rest are combined with weights normalised
/// to sum to one.
fn composite(
	conditions: &[WeightedCondition],
	characteristics: &GraphCharacteristics,
) -> Result<f64, GuidelineError> {
	for ultimate in conditions.iter().filter(|c| c.is_ultimate()) {
		if ultimate.condition.evaluate(characteristics)? == 0.0 {
			return Ok(0.0);
		}
	}
	let weighted = || conditions.iter().filter(|c| !c.is_ultimate());
	let total: f64 = weighted().map(|c| c.weight).sum();
	if total == 0.0 {
		return Ok(0.0);
	}
	weighted().try_fold(0.0, |sum, c| {
		Ok(sum + c.condition.evaluate(characteristics)? * c.weight / total)
	})
}
