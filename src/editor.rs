//! The editor: one graph, its live settings, the guideline list and the layout
//! coordinator, kept consistent through every import and edit.

use std::collections::HashMap;

use log::{debug, info};

use crate::config::EditorConfig;
use crate::error::EditorError;
use crate::graph::attributes::AttributeCatalog;
use crate::graph::characteristics::GraphCharacteristics;
use crate::graph::sample::generate_sample_data;
use crate::graph::{Graph, GraphData};
use crate::guidelines::{self, Guideline};
use crate::layout::{EdgeLayout, LayoutCoordinator, LayoutEdge, LayoutType, NodePosition, Workers};
use crate::renderer::Renderer;
use crate::settings::{AttributeBinding, AttributePicker, GraphSettings, History, LabelRequest};
use crate::style::{
	EdgeStyle, InteractionState, NodeStyle, apply_interaction_overrides, compute_edge_styles,
	compute_node_styles,
};

const HISTORY_CAPACITY: usize = 50;

pub struct Editor<R: Renderer, W: Workers> {
	config: EditorConfig,
	graph: Graph,
	catalog: AttributeCatalog,
	characteristics: GraphCharacteristics,
	settings: GraphSettings,
	guidelines: Vec<Guideline>,
	history: History<GraphSettings>,
	interaction: InteractionState,
	node_styles: HashMap<String, NodeStyle>,
	edge_styles: HashMap<String, EdgeStyle>,
	coordinator: LayoutCoordinator<R, W>,
	/// Time left before a debounced restyle runs.
	restyle_in_ms: Option<f64>,
}

impl<R: Renderer, W: Workers> Editor<R, W> {
	/// An editor over an empty graph with the built-in guidelines loaded.
	pub fn new(
		renderer: R,
		workers: W,
		config: EditorConfig,
		width: f64,
		height: f64,
	) -> Result<Self, EditorError> {
		let mut settings = GraphSettings::default();
		let guidelines = guidelines::default_guidelines(&mut settings)?;
		let coordinator = LayoutCoordinator::new(renderer, workers, config.clone(), width, height);
		Ok(Self {
			config,
			graph: Graph::default(),
			catalog: AttributeCatalog::default(),
			characteristics: GraphCharacteristics::default(),
			settings,
			guidelines,
			history: History::new(HISTORY_CAPACITY),
			interaction: InteractionState::default(),
			node_styles: HashMap::new(),
			edge_styles: HashMap::new(),
			coordinator,
			restyle_in_ms: None,
		})
	}

	pub fn graph(&self) -> &Graph {
		&self.graph
	}

	pub fn catalog(&self) -> &AttributeCatalog {
		&self.catalog
	}

	pub fn characteristics(&self) -> &GraphCharacteristics {
		&self.characteristics
	}

	pub fn settings(&self) -> &GraphSettings {
		&self.settings
	}

	/// Sorted by score, best first.
	pub fn guidelines(&self) -> &[Guideline] {
		&self.guidelines
	}

	pub fn node_styles(&self) -> &HashMap<String, NodeStyle> {
		&self.node_styles
	}

	pub fn edge_styles(&self) -> &HashMap<String, EdgeStyle> {
		&self.edge_styles
	}

	pub fn coordinator(&self) -> &LayoutCoordinator<R, W> {
		&self.coordinator
	}

	pub fn coordinator_mut(&mut self) -> &mut LayoutCoordinator<R, W> {
		&mut self.coordinator
	}

	pub fn is_restyle_pending(&self) -> bool {
		self.restyle_in_ms.is_some()
	}

	pub fn import_json(&mut self, json: &str) -> Result<(), EditorError> {
		self.import_graph(Graph::from_json(json)?);
		Ok(())
	}

	pub fn import_data(&mut self, data: GraphData) -> Result<(), EditorError> {
		self.import_graph(Graph::from_data(data)?);
		Ok(())
	}

	pub fn generate_sample(&mut self, node_count: usize, edge_count: usize) -> Result<(), EditorError> {
		self.import_data(generate_sample_data(node_count, edge_count))
	}

	pub fn export_graph(&self) -> Result<String, EditorError> {
		Ok(self.graph.to_json()?)
	}

	/// Catalog, characteristics, bindings stripped, guidelines re-scored, styles
	/// recomputed, layout restarted.
	fn import_graph(&mut self, graph: Graph) {
		self.graph = graph;
		self.catalog = AttributeCatalog::scan(&self.graph);
		self.characteristics = GraphCharacteristics::compute(
			&self.graph,
			&self.catalog,
			self.config.thresholds.discrete_max_values,
		);
		self.settings.unbind_attributes();
		guidelines::sort_guidelines(&mut self.guidelines, &self.characteristics);
		guidelines::compute_statuses(&mut self.guidelines, &self.settings);
		self.history.clear();
		self.history.save(self.settings.clone());
		self.interaction = InteractionState::default();
		self.resolve_styles();
		self.restyle_in_ms = None;

		let nodes = self
			.graph
			.nodes()
			.iter()
			.map(|node| {
				let coordinate = |name: &str| {
					node.attributes
						.get(name)
						.and_then(|v| v.as_number())
						.unwrap_or(0.0)
				};
				NodePosition::new(node.id.clone(), coordinate("x"), coordinate("y"))
			})
			.collect();
		let edges = self
			.graph
			.links()
			.iter()
			.map(|link| LayoutEdge::new(link.id.clone(), link.source.clone(), link.target.clone()))
			.collect();
		let (layout, edge_layout) = self.layout_settings();
		self.coordinator.start(
			nodes,
			edges,
			&self.node_styles,
			&self.edge_styles,
			layout,
			edge_layout,
		);
	}

	/// Applies guideline `index` as one undoable step. A failed attribute request
	/// leaves settings, styles and history as they were.
	pub fn apply_guideline(
		&mut self,
		index: usize,
		picker: &mut dyn AttributePicker,
	) -> Result<(), EditorError> {
		let guideline = self
			.guidelines
			.get(index)
			.cloned()
			.ok_or(EditorError::NoSuchGuideline(index))?;
		guidelines::apply_guideline(
			&guideline,
			&mut self.settings,
			&self.catalog,
			self.config.thresholds.discrete_max_values,
			picker,
		)?;
		self.settings_changed(true);
		Ok(())
	}

	/// Replaces the guideline set with the guidelines in `json`.
	pub fn load_guidelines(&mut self, json: &str) -> Result<(), EditorError> {
		let mut loaded = guidelines::load_guidelines(json, &mut self.settings)?;
		guidelines::sort_guidelines(&mut loaded, &self.characteristics);
		guidelines::compute_statuses(&mut loaded, &self.settings);
		self.guidelines = loaded;
		Ok(())
	}

	pub fn set_layout(&mut self, layout: LayoutType, edge_layout: EdgeLayout) {
		self.edit_settings(|settings| {
			settings.layout.layout.value = layout;
			settings.layout.layout.source = None;
			settings.layout.edge_type.value = edge_layout;
			settings.layout.edge_type.source = None;
		});
	}

	pub fn bind_attribute(
		&mut self,
		binding: &AttributeBinding,
		picker: &mut dyn AttributePicker,
	) -> Result<(), EditorError> {
		self.settings.bind_attribute(binding, &self.catalog, picker)?;
		self.settings_changed(true);
		Ok(())
	}

	pub fn style_discrete_attribute(
		&mut self,
		picker: &mut dyn AttributePicker,
	) -> Result<(), EditorError> {
		self.settings.style_discrete_attribute(
			&self.catalog,
			self.config.thresholds.discrete_max_values,
			picker,
		)?;
		self.settings_changed(true);
		Ok(())
	}

	pub fn add_labels(
		&mut self,
		requests: &[LabelRequest],
		picker: &mut dyn AttributePicker,
	) -> Result<(), EditorError> {
		self.settings.add_labels(requests, &self.catalog, picker)?;
		self.settings_changed(true);
		Ok(())
	}

	/// Any other edit of the live settings.
	pub fn edit_settings(&mut self, edit: impl FnOnce(&mut GraphSettings)) {
		edit(&mut self.settings);
		self.settings_changed(true);
	}

	pub fn export_settings(&self) -> Result<String, EditorError> {
		Ok(self.settings.export_json()?)
	}

	pub fn import_settings(&mut self, json: &str) -> Result<(), EditorError> {
		self.settings.import_json(json)?;
		self.settings_changed(true);
		Ok(())
	}

	pub fn undo(&mut self) -> bool {
		match self.history.undo() {
			Some(snapshot) => {
				self.settings = snapshot;
				self.settings_changed(false);
				true
			}
			None => false,
		}
	}

	pub fn redo(&mut self) -> bool {
		match self.history.redo() {
			Some(snapshot) => {
				self.settings = snapshot;
				self.settings_changed(false);
				true
			}
			None => false,
		}
	}

	pub fn can_undo(&self) -> bool {
		self.history.can_undo()
	}

	pub fn can_redo(&self) -> bool {
		self.history.can_redo()
	}

	/// Hover only touches the styles of the nodes it enters and leaves.
	pub fn hover(&mut self, id: Option<String>) {
		if self.interaction.hovered == id {
			return;
		}
		let previous = std::mem::replace(&mut self.interaction.hovered, id.clone());
		for changed in [previous, id].into_iter().flatten() {
			if let Some(style) = self.node_styles.get_mut(&changed) {
				style.shadow = self.interaction.highlights(&changed);
				self.coordinator
					.renderer_mut()
					.update_node_style(&changed, style);
			}
		}
	}

	pub fn export_image(&self) -> String {
		self.coordinator.renderer().export_static_image()
	}

	pub fn resize(&mut self, width: f64, height: f64) {
		self.coordinator.resize(width, height);
	}

	/// One frame: a due debounced restyle, then the coordinator.
	pub fn pump(&mut self, dt_ms: f64) {
		if let Some(remaining) = self.restyle_in_ms.as_mut() {
			*remaining -= dt_ms;
			if *remaining <= 0.0 {
				self.restyle_in_ms = None;
				self.restyle();
			}
		}
		self.coordinator.step(dt_ms);
	}

	fn layout_settings(&self) -> (LayoutType, EdgeLayout) {
		(
			self.settings.layout.layout.value,
			self.settings.layout.edge_type.value,
		)
	}

	fn settings_changed(&mut self, record: bool) {
		if record {
			self.history.save(self.settings.clone());
		}
		guidelines::compute_statuses(&mut self.guidelines, &self.settings);

		let (layout, edge_layout) = self.layout_settings();
		if layout != self.coordinator.layout() || edge_layout != self.coordinator.edge_layout() {
			self.coordinator.change_layout(layout, edge_layout, false);
		}

		let size = self.graph.order() + self.graph.size();
		if size > self.config.thresholds.debounce_above {
			debug!("restyle of {size} elements deferred");
			self.restyle_in_ms = Some(self.config.thresholds.debounce_ms);
		} else {
			self.restyle();
		}
	}

	fn resolve_styles(&mut self) {
		self.node_styles = compute_node_styles(&self.graph, &self.settings.node_settings);
		self.edge_styles = compute_edge_styles(&self.graph, &self.settings.edge_settings);
		apply_interaction_overrides(&mut self.node_styles, &self.interaction);
	}

	fn restyle(&mut self) {
		self.resolve_styles();
		info!(
			"restyled {} nodes and {} edges",
			self.node_styles.len(),
			self.edge_styles.len()
		);
		let renderer = self.coordinator.renderer_mut();
		renderer.update_node_styles(&self.node_styles);
		renderer.update_edge_styles(&self.edge_styles);
	}
}
