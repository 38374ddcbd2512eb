//! Error types shared across the editor core.

/// Failures while importing or building a graph.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
	#[error("malformed graph document: {0}")]
	Malformed(#[from] serde_json::Error),
	#[error("duplicate node id: {id}")]
	DuplicateNode { id: String },
	#[error("edge {edge_id} references missing node {node_id}")]
	MissingEndpoint { edge_id: String, node_id: String },
}

/// Failures while reading an attribute value off a node or an edge.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AttributeError {
	#[error("property not found: {name} on {id}")]
	NotFound { id: String, name: String },
	#[error("property {name} on {id} is not numeric")]
	NotNumeric { id: String, name: String },
}

/// Failures of the off-thread layout and bundling computations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LayoutError {
	#[error("unknown layout algorithm: {0}")]
	UnknownAlgorithm(String),
	#[error("unknown edge layout: {0}")]
	UnknownEdgeLayout(String),
	#[error("{0} is not computed by the hierarchical layout engine")]
	NotHierarchical(String),
	#[error("graph has no nodes to lay out")]
	EmptyGraph,
	#[error("worker channel disconnected: {0}")]
	Disconnected(&'static str),
	#[error("edge bundling failed: {0}")]
	Bundling(String),
}

/// Failures while editing the live settings.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
	#[error("malformed settings document: {0}")]
	Malformed(#[from] serde_json::Error),
	#[error("setting not found: {target}.{setting}")]
	SettingNotFound { target: String, setting: String },
	#[error("attribute not found: {0}")]
	UnknownAttribute(String),
	#[error("no suitable attribute found")]
	NoAttribute,
}

/// Failures while evaluating or applying guidelines.
#[derive(Debug, thiserror::Error)]
pub enum GuidelineError {
	#[error("graph characteristic not available: {0}")]
	MissingCharacteristic(String),
	#[error("characteristic {0} is not numeric")]
	NotNumeric(String),
	#[error("numeric condition on {0} has no min, max, ideal or tolerance")]
	InvalidNumericCondition(String),
	#[error("malformed guideline document: {0}")]
	Malformed(#[from] serde_json::Error),
	#[error(transparent)]
	Settings(#[from] SettingsError),
}

/// Failures while loading the editor configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
	#[error("malformed configuration: {0}")]
	Malformed(#[from] serde_json::Error),
	#[error("invalid configuration: {0}")]
	Invalid(String),
}

/// Why a single atomic rule could not be evaluated. Never escapes the rule engine.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RuleError {
	#[error("rule {0} has no property")]
	MissingProperty(u64),
	#[error("rule {rule} targets an edge endpoint but {id} is not an edge")]
	NotAnEdge { rule: u64, id: String },
	#[error("rule {0} compares numerically against a non-numeric value")]
	NonNumericValue(u64),
	#[error(transparent)]
	Attribute(#[from] AttributeError),
}

/// Anything the editor surface can fail with.
#[derive(Debug, thiserror::Error)]
pub enum EditorError {
	#[error(transparent)]
	Graph(#[from] GraphError),
	#[error(transparent)]
	Settings(#[from] SettingsError),
	#[error(transparent)]
	Guideline(#[from] GuidelineError),
	#[error("no guideline at index {0}")]
	NoSuchGuideline(usize),
}
