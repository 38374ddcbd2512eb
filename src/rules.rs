//! Rule engine: boolean predicate trees over node and edge attributes.
//!
//! Evaluation never fails. An atomic rule that cannot be evaluated (missing property,
//! missing attribute, failed numeric coercion) is replaced by the identity of the
//! enclosing operator: `true` under `AND`, `false` under `OR`.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::RuleError;
use crate::graph::attributes::{Attribute, AttributeType, attribute_value};
use crate::graph::{AttributeValue, Graph};

/// Numeric comparison; string rules only test equality.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ComparisonOperator {
	#[serde(rename = ">")]
	Greater,
	#[serde(rename = "<")]
	Less,
	#[serde(rename = "=")]
	Equal,
	#[serde(rename = "≥", alias = ">=")]
	GreaterOrEqual,
	#[serde(rename = "≤", alias = "<=")]
	LessOrEqual,
}

impl ComparisonOperator {
	/// `lhs <op> rhs`.
	pub fn compare(self, lhs: f64, rhs: f64) -> bool {
		match self {
			ComparisonOperator::Greater => lhs > rhs,
			ComparisonOperator::Less => lhs < rhs,
			ComparisonOperator::Equal => lhs == rhs,
			ComparisonOperator::GreaterOrEqual => lhs >= rhs,
			ComparisonOperator::LessOrEqual => lhs <= rhs,
		}
	}
}

/// How a compound rule combines its children.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogicalOperator {
	#[serde(rename = "AND")]
	And,
	#[serde(rename = "OR")]
	Or,
}

/// Which entity the attribute is read from. `Source`/`Target` resolve an edge id to
/// its endpoint node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleTarget {
	Node,
	Edge,
	Source,
	Target,
}

/// A single comparison between an attribute and a constant.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AtomicRule {
	#[serde(default)]
	pub id: u64,
	/// The property is always the left-hand side.
	pub operator: ComparisonOperator,
	#[serde(rename = "type")]
	pub kind: AttributeType,
	pub target: RuleTarget,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub property: Option<Attribute>,
	pub value: AttributeValue,
}

/// A compound rule. The root rule of a settings entry decides which elements it styles.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Rule {
	#[serde(default)]
	pub id: u64,
	pub operator: LogicalOperator,
	#[serde(default)]
	pub rules: Vec<RuleNode>,
}

/// A child of a compound rule.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RuleNode {
	Atomic(AtomicRule),
	Compound(Rule),
}

impl RuleNode {
	/// True for a leaf comparison.
	pub fn is_atomic(&self) -> bool {
		matches!(self, RuleNode::Atomic(_))
	}
}

impl AtomicRule {
	/// A rule with id 0, typed after `property`.
	pub fn new(
		operator: ComparisonOperator,
		target: RuleTarget,
		property: Attribute,
		value: impl Into<AttributeValue>,
	) -> Self {
		Self {
			id: 0,
			operator,
			kind: property.kind,
			target,
			property: Some(property),
			value: value.into(),
		}
	}

	/// Evaluates the rule against node or edge `id`.
	///
	/// Fails when the property is unset, `id` is not an edge under a `source`/`target`
	/// rule, or a numeric comparison meets a non-numeric value. Callers decide the fallback.
	pub fn evaluate(&self, graph: &Graph, id: &str) -> Result<bool, RuleError> {
		let property = self
			.property
			.as_ref()
			.ok_or(RuleError::MissingProperty(self.id))?;
		let subject = match self.target {
			RuleTarget::Node | RuleTarget::Edge => id,
			RuleTarget::Source | RuleTarget::Target => {
				let link = graph.link(id).ok_or_else(|| RuleError::NotAnEdge {
					rule: self.id,
					id: id.to_string(),
				})?;
				if self.target == RuleTarget::Source {
					link.source.as_str()
				} else {
					link.target.as_str()
				}
			}
		};
		let lhs = attribute_value(graph, subject, property)?;

		match self.kind {
			AttributeType::String => Ok(lhs.to_string() == self.value.to_string()),
			AttributeType::Number => {
				let lhs = lhs
					.as_number()
					.ok_or_else(|| crate::error::AttributeError::NotNumeric {
						id: subject.to_string(),
						name: property.name.clone(),
					})?;
				let rhs = self
					.value
					.as_number()
					.ok_or(RuleError::NonNumericValue(self.id))?;
				Ok(self.operator.compare(lhs, rhs))
			}
		}
	}

	fn is_attribute_based(&self) -> bool {
		self.property.as_ref().is_some_and(|p| !p.general)
	}
}

impl Rule {
	/// A compound rule with id 0; see [`assign_ids`](Self::assign_ids).
	pub fn new(operator: LogicalOperator, rules: Vec<RuleNode>) -> Self {
		Self {
			id: 0,
			operator,
			rules,
		}
	}

	/// `AND` over no rules is true, `OR` over no rules is false.
	pub fn evaluate(&self, graph: &Graph, id: &str) -> bool {
		let fallback = self.operator == LogicalOperator::And;
		let mut results = self.rules.iter().map(|rule| match rule {
			RuleNode::Compound(rule) => rule.evaluate(graph, id),
			RuleNode::Atomic(atomic) => atomic.evaluate(graph, id).unwrap_or_else(|err| {
				debug!("rule {} on {}: {}, using {}", atomic.id, id, err, fallback);
				fallback
			}),
		});
		match self.operator {
			LogicalOperator::And => results.all(|r| r),
			LogicalOperator::Or => results.any(|r| r),
		}
	}

	/// Removes atomic rules bound to data attributes, keeping general ones and keeping
	/// compound rules even when they end up empty.
	pub fn strip_attribute_based_rules(&mut self) {
		self.rules.retain_mut(|rule| match rule {
			RuleNode::Atomic(atomic) => !atomic.is_attribute_based(),
			RuleNode::Compound(compound) => {
				compound.strip_attribute_based_rules();
				true
			}
		});
	}

	/// Gives this rule and every nested rule a fresh id.
	pub fn assign_ids(&mut self, next_id: &mut impl FnMut() -> u64) {
		self.id = next_id();
		for rule in &mut self.rules {
			match rule {
				RuleNode::Atomic(atomic) => atomic.id = next_id(),
				RuleNode::Compound(compound) => compound.assign_ids(&mut *next_id),
			}
		}
	}

	/// Structural equality, ignoring ids.
	pub fn same_as(&self, other: &Rule) -> bool {
		self.operator == other.operator
			&& self.rules.len() == other.rules.len()
			&& self
				.rules
				.iter()
				.zip(&other.rules)
				.all(|pair| match pair {
					(RuleNode::Atomic(a), RuleNode::Atomic(b)) => {
						a.operator == b.operator
							&& a.kind == b.kind
							&& a.target == b.target
							&& a.value == b.value
							&& match (&a.property, &b.property) {
								(Some(pa), Some(pb)) => pa.name == pb.name && pa.owner == pb.owner,
								(None, None) => true,
								_ => false,
							}
					}
					(RuleNode::Compound(a), RuleNode::Compound(b)) => a.same_as(b),
					_ => false,
				})
	}
}

/// [`Rule::same_as`] lifted over optional rules.
pub fn rules_equal(a: Option<&Rule>, b: Option<&Rule>) -> bool {
	match (a, b) {
		(Some(a), Some(b)) => a.same_as(b),
		(None, None) => true,
		_ => false,
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::graph::attributes::Owner;

	fn graph() -> Graph {
		Graph::from_json(
			r#"{
			"nodes": [
				{"key": "a", "attributes": {"stars": 10, "field": "AI"}},
				{"key": "b", "attributes": {"stars": 80, "field": "Physics"}},
				{"key": "c", "attributes": {"stars": "oops"}}
			],
			"edges": [
				{"key": "ab", "source": "a", "target": "b", "attributes": {"weight": 3}},
				{"key": "bc", "source": "b", "target": "c"}
			]
		}"#,
		)
		.unwrap()
	}

	fn stars(op: ComparisonOperator, value: f64) -> RuleNode {
		RuleNode::Atomic(AtomicRule::new(
			op,
			RuleTarget::Node,
			Attribute::node_number("stars"),
			value,
		))
	}

	fn field() -> Attribute {
		Attribute {
			kind: AttributeType::String,
			..Attribute::node_number("field")
		}
	}

	#[test]
	fn numeric_operators_match_direct_comparison() {
		use ComparisonOperator::*;
		let graph = graph();
		let cases = [
			(Greater, 10.0, false),
			(Greater, 9.0, true),
			(Less, 11.0, true),
			(Equal, 10.0, true),
			(GreaterOrEqual, 10.0, true),
			(LessOrEqual, 10.0, true),
			(LessOrEqual, 9.5, false),
		];
		for (op, value, expected) in cases {
			let rule = Rule::new(LogicalOperator::And, vec![stars(op, value)]);
			assert_eq!(rule.evaluate(&graph, "a"), expected, "{op:?} {value}");
		}
	}

	#[test]
	fn string_rules_use_exact_equality() {
		let graph = graph();
		let rule = Rule::new(
			LogicalOperator::And,
			vec![RuleNode::Atomic(AtomicRule::new(
				ComparisonOperator::Equal,
				RuleTarget::Node,
				field(),
				"AI",
			))],
		);
		assert!(rule.evaluate(&graph, "a"));
		assert!(!rule.evaluate(&graph, "b"));
	}

	#[test]
	fn endpoint_targets_read_the_edge_nodes() {
		let graph = graph();
		let source_rule = Rule::new(
			LogicalOperator::And,
			vec![RuleNode::Atomic(AtomicRule::new(
				ComparisonOperator::Less,
				RuleTarget::Source,
				Attribute::node_number("stars"),
				50.0,
			))],
		);
		let target_rule = Rule::new(
			LogicalOperator::And,
			vec![RuleNode::Atomic(AtomicRule::new(
				ComparisonOperator::Greater,
				RuleTarget::Target,
				Attribute::node_number("stars"),
				50.0,
			))],
		);
		assert!(source_rule.evaluate(&graph, "ab"));
		assert!(target_rule.evaluate(&graph, "ab"));

		let weight = Attribute {
			owner: Owner::Edge,
			..Attribute::node_number("weight")
		};
		let edge_rule = Rule::new(
			LogicalOperator::Or,
			vec![RuleNode::Atomic(AtomicRule::new(
				ComparisonOperator::Equal,
				RuleTarget::Edge,
				weight,
				3.0,
			))],
		);
		assert!(edge_rule.evaluate(&graph, "ab"));
		assert!(!edge_rule.evaluate(&graph, "bc"));
	}

	#[test]
	fn empty_rule_lists() {
		let graph = graph();
		assert!(Rule::new(LogicalOperator::And, vec![]).evaluate(&graph, "a"));
		assert!(!Rule::new(LogicalOperator::Or, vec![]).evaluate(&graph, "a"));
	}

	#[test]
	fn failed_atomic_rules_fall_back_per_enclosing_operator() {
		let graph = graph();
		// "c" has a non-numeric stars value.
		let broken = stars(ComparisonOperator::Greater, 0.0);
		assert!(Rule::new(LogicalOperator::And, vec![broken.clone()]).evaluate(&graph, "c"));
		assert!(!Rule::new(LogicalOperator::Or, vec![broken.clone()]).evaluate(&graph, "c"));
		let or = Rule::new(
			LogicalOperator::Or,
			vec![broken, stars(ComparisonOperator::Greater, 50.0)],
		);
		assert!(or.evaluate(&graph, "b"));
		assert!(!or.evaluate(&graph, "c"));

		let no_property = RuleNode::Atomic(AtomicRule {
			property: None,
			..AtomicRule::new(
				ComparisonOperator::Equal,
				RuleTarget::Node,
				Attribute::node_number("stars"),
				1.0,
			)
		});
		assert!(Rule::new(LogicalOperator::And, vec![no_property.clone()]).evaluate(&graph, "a"));
		assert!(!Rule::new(LogicalOperator::Or, vec![no_property]).evaluate(&graph, "a"));
	}

	#[test]
	fn nested_trees() {
		let graph = graph();
		let rule = Rule::new(
			LogicalOperator::Or,
			vec![
				RuleNode::Compound(Rule::new(
					LogicalOperator::And,
					vec![
						stars(ComparisonOperator::Greater, 50.0),
						stars(ComparisonOperator::Less, 100.0),
					],
				)),
				stars(ComparisonOperator::Equal, 10.0),
			],
		);
		assert!(rule.evaluate(&graph, "a"));
		assert!(rule.evaluate(&graph, "b"));
	}

	#[test]
	fn stripping_is_idempotent_and_keeps_general_rules() {
		let degree = Attribute {
			general: true,
			..Attribute::node_number("degree")
		};
		let mut rule = Rule::new(
			LogicalOperator::And,
			vec![
				stars(ComparisonOperator::Greater, 1.0),
				RuleNode::Atomic(AtomicRule::new(
					ComparisonOperator::Greater,
					RuleTarget::Node,
					degree,
					1.0,
				)),
				RuleNode::Compound(Rule::new(
					LogicalOperator::Or,
					vec![stars(ComparisonOperator::Less, 3.0)],
				)),
			],
		);
		rule.strip_attribute_based_rules();
		let once = rule.clone();
		rule.strip_attribute_based_rules();
		assert_eq!(rule, once);
		assert_eq!(rule.rules.len(), 2);
		assert!(matches!(&rule.rules[0], RuleNode::Atomic(a) if a.property.as_ref().unwrap().general));
		assert!(matches!(&rule.rules[1], RuleNode::Compound(c) if c.rules.is_empty()));
	}

	#[test]
	fn ids_do_not_affect_structural_equality() {
		let mut a = Rule::new(LogicalOperator::And, vec![stars(ComparisonOperator::Less, 3.0)]);
		let b = a.clone();
		let mut counter = 100;
		a.assign_ids(&mut || {
			counter += 1;
			counter
		});
		assert_eq!(a.id, 101);
		assert_ne!(a, b);
		assert!(a.same_as(&b));
		assert!(rules_equal(Some(&a), Some(&b)));
		assert!(!rules_equal(Some(&a), None));
	}

	#[test]
	fn parses_operator_symbols() {
		let rule: Rule = serde_json::from_str(
			r#"{"id": 1, "operator": "OR", "rules": [
				{"id": 2, "operator": "≥", "type": "number", "target": "node",
				 "property": {"name": "stars", "type": "number", "owner": "node", "general": false},
				 "value": 50},
				{"id": 3, "operator": "AND", "rules": []}
			]}"#,
		)
		.unwrap();
		assert!(rule.rules[0].is_atomic());
		assert!(!rule.rules[1].is_atomic());
		assert!(rule.evaluate(&graph(), "b"));
		assert!(serde_json::from_str::<Rule>(r#"{"operator": "XOR", "rules": []}"#).is_err());
	}
}
