//! The layout state machine.
//!
//! Node layout and edge routing are decided independently. The coordinator owns the
//! authoritative node positions; workers only ever receive copies and report back.

use std::collections::HashMap;

use log::{debug, info};

use super::bundling::{BundlingRequest, bend_points_by_id};
use super::hierarchical::{LayoutRequest, LayoutResult};
use super::simulation::{SimulationCommand, SimulationEvent, seed_positions};
use super::tween::Tween;
use super::workers::{Ticket, WorkerEvent, Workers, report_failure};
use super::{BendPoints, EdgeLayout, EdgeRouting, LayoutEdge, LayoutType, NodePosition, Point, translate};
use crate::config::EditorConfig;
use crate::error::LayoutError;
use crate::renderer::Renderer;
use crate::style::{EdgeStyle, NodeStyle};

/// Where node placement stands.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LayoutPhase {
	#[default]
	Idle,
	ForceRunning,
	ForcePaused,
	HierarchicalComputing,
	HierarchicalSettled,
}

/// Where edge routing stands; `*Pending` means a worker owes us routes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RoutingPhase {
	#[default]
	Straight,
	OrthogonalPending,
	OrthogonalSettled,
	BundledPending,
	BundledSettled,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Simulation {
	Absent,
	Running,
	Paused,
}

/// What to restore when a request fails.
#[derive(Clone, Copy, Debug)]
struct Snapshot {
	layout: LayoutType,
	edge_layout: EdgeLayout,
	phase: LayoutPhase,
	routing: RoutingPhase,
	simulation_was_running: bool,
}

#[derive(Clone, Copy, Debug)]
struct Pending {
	ticket: Ticket,
	before: Snapshot,
}

#[derive(Clone, Debug)]
struct OrthogonalCache {
	positions: Vec<NodePosition>,
	bends: BendPoints,
}

/// Drives the simulation and the layout workers, and pushes the results to a renderer.
pub struct LayoutCoordinator<R: Renderer, W: Workers> {
	renderer: R,
	workers: W,
	config: EditorConfig,
	width: f64,
	height: f64,
	nodes: Vec<NodePosition>,
	edges: Vec<LayoutEdge>,
	layout: LayoutType,
	edge_layout: EdgeLayout,
	phase: LayoutPhase,
	routing: RoutingPhase,
	simulation: Simulation,
	/// The simulation still holds the graph from before the last `start`.
	simulation_stale: bool,
	next_ticket: Ticket,
	pending_layout: Option<Pending>,
	pending_bundling: Option<Pending>,
	orthogonal: Option<OrthogonalCache>,
	bundled: BendPoints,
	tween: Option<Tween>,
	dragging: Option<String>,
}

impl<R: Renderer, W: Workers> LayoutCoordinator<R, W> {
	/// An idle coordinator for a `width` x `height` viewport. Nothing runs until [`start`](Self::start).
	pub fn new(renderer: R, workers: W, config: EditorConfig, width: f64, height: f64) -> Self {
		Self {
			renderer,
			workers,
			config,
			width,
			height,
			nodes: Vec::new(),
			edges: Vec::new(),
			layout: LayoutType::ForceGraph,
			edge_layout: EdgeLayout::Straight,
			phase: LayoutPhase::Idle,
			routing: RoutingPhase::Straight,
			simulation: Simulation::Absent,
			simulation_stale: false,
			next_ticket: 0,
			pending_layout: None,
			pending_bundling: None,
			orthogonal: None,
			bundled: BendPoints::new(),
			tween: None,
			dragging: None,
		}
	}

	/// The renderer receiving positions, styles and routes.
	pub fn renderer(&self) -> &R {
		&self.renderer
	}

	/// Mutable access for view-only changes such as zoom and pan.
	pub fn renderer_mut(&mut self) -> &mut R {
		&mut self.renderer
	}

	/// The worker backend.
	pub fn workers(&self) -> &W {
		&self.workers
	}

	/// The worker backend.
	pub fn workers_mut(&mut self) -> &mut W {
		&mut self.workers
	}

	/// Authoritative node positions in graph coordinates.
	pub fn nodes(&self) -> &[NodePosition] {
		&self.nodes
	}

	/// The active node layout.
	pub fn layout(&self) -> LayoutType {
		self.layout
	}

	/// The requested edge layout; see [`routing`](Self::routing) for whether it has landed.
	pub fn edge_layout(&self) -> EdgeLayout {
		self.edge_layout
	}

	/// Current layout phase.
	pub fn phase(&self) -> LayoutPhase {
		self.phase
	}

	/// Current routing phase.
	pub fn routing(&self) -> RoutingPhase {
		self.routing
	}

	/// A layout request is in flight.
	pub fn is_layout_loading(&self) -> bool {
		self.pending_layout.is_some()
	}

	/// A bundling request is in flight.
	pub fn is_bundling_loading(&self) -> bool {
		self.pending_bundling.is_some()
	}

	/// Nodes are tweening towards a finished layout.
	pub fn is_animating(&self) -> bool {
		self.tween.is_some()
	}

	/// Orthogonal and bundled routes are not recomputed while nodes move.
	pub fn draggable(&self) -> bool {
		self.edge_layout == EdgeLayout::Straight
	}

	/// Sum of nodes and edges, the unit of every size heuristic.
	pub fn graph_size(&self) -> usize {
		self.nodes.len() + self.edges.len()
	}

	/// Replaces the graph and lays it out from scratch.
	///
	/// Nodes at the origin or at non-finite positions are seeded first. All caches and
	/// in-flight requests are discarded; a simulation left over from the previous graph
	/// is rebuilt the next time the force layout runs.
	pub fn start(
		&mut self,
		nodes: Vec<NodePosition>,
		edges: Vec<LayoutEdge>,
		node_styles: &HashMap<String, NodeStyle>,
		edge_styles: &HashMap<String, EdgeStyle>,
		layout: LayoutType,
		edge_layout: EdgeLayout,
	) {
		self.nodes = nodes;
		self.edges = edges;
		self.seed_unplaced();
		self.orthogonal = None;
		self.bundled.clear();
		self.tween = None;
		self.dragging = None;
		self.pending_layout = None;
		self.pending_bundling = None;
		self.simulation_stale = self.simulation != Simulation::Absent;
		self.routing = RoutingPhase::Straight;
		self.renderer
			.initialize(&self.nodes, &self.edges, node_styles, edge_styles, EdgeLayout::Straight);
		info!(
			"layout start: {} nodes, {} edges, {} / {}",
			self.nodes.len(),
			self.edges.len(),
			layout,
			edge_layout
		);
		// Straight until the routing decision below says otherwise.
		self.edge_layout = EdgeLayout::Straight;
		self.change_layout(layout, edge_layout, true);
	}

	/// Switches node layout and edge routing. Layout and routing changes are decided
	/// separately; `force_restart` recomputes the layout even when it is unchanged.
	pub fn change_layout(&mut self, layout: LayoutType, edge_layout: EdgeLayout, force_restart: bool) {
		let before = self.snapshot();
		let layout_changed = layout != self.layout || force_restart;
		let routing_changed = edge_layout != self.edge_layout;
		self.layout = layout;
		self.edge_layout = edge_layout;
		info!(
			"change layout: {} / {}{}",
			layout,
			edge_layout,
			if force_restart { " (restart)" } else { "" }
		);

		let mut requested = false;
		if layout_changed {
			if !layout.is_hierarchical() {
				self.drop_pending_layout();
			}
			if layout.is_hierarchical() {
				self.pause_simulation();
				let routing = match edge_layout {
					EdgeLayout::Orthogonal => EdgeRouting::Orthogonal,
					_ => EdgeRouting::Polyline,
				};
				self.request_layout(layout, routing, before);
				self.phase = LayoutPhase::HierarchicalComputing;
				requested = true;
			} else if edge_layout == EdgeLayout::Straight {
				self.run_simulation(force_restart);
			} else {
				self.pause_simulation();
				self.phase = LayoutPhase::ForcePaused;
			}
		}

		if !(routing_changed || layout_changed) {
			return;
		}
		match edge_layout {
			EdgeLayout::Straight => {
				self.routing = RoutingPhase::Straight;
				self.renderer
					.update_edge_layout(EdgeLayout::Straight, &BendPoints::new());
				if self.layout == LayoutType::ForceGraph && !layout_changed {
					self.run_simulation(false);
				}
			}
			EdgeLayout::Orthogonal => {
				if requested {
					self.routing = RoutingPhase::OrthogonalPending;
				} else if let Some(cache) = self.orthogonal.as_ref().filter(|c| c.positions == self.nodes) {
					debug!("orthogonal routing reuses {} cached routes", cache.bends.len());
					let bends = cache.bends.clone();
					self.pause_simulation();
					self.renderer.update_edge_layout(EdgeLayout::Orthogonal, &bends);
					self.routing = RoutingPhase::OrthogonalSettled;
				} else {
					self.pause_simulation();
					let algorithm = if self.layout.is_hierarchical() {
						self.layout
					} else {
						LayoutType::Layered
					};
					self.request_layout(algorithm, EdgeRouting::Orthogonal, before);
					if self.layout.is_hierarchical() {
						self.phase = LayoutPhase::HierarchicalComputing;
					} else {
						self.phase = LayoutPhase::ForcePaused;
					}
					self.routing = RoutingPhase::OrthogonalPending;
				}
			}
			EdgeLayout::Bundled => {
				self.pause_simulation();
				if self.layout == LayoutType::ForceGraph {
					self.phase = LayoutPhase::ForcePaused;
				}
				self.routing = RoutingPhase::BundledPending;
				// A pending layout requests bundling once its positions land.
				if self.pending_layout.is_none() {
					self.request_bundling(before);
				}
			}
		}
	}

	/// New viewport size. Hierarchical layouts are shifted to stay centred.
	pub fn resize(&mut self, width: f64, height: f64) {
		let delta = Point::new((width - self.width) / 2.0, (height - self.height) / 2.0);
		self.width = width;
		self.height = height;
		self.renderer.resize(width, height);
		if let Some(tween) = self.tween.take() {
			self.nodes = tween.target().to_vec();
		}

		if let Some(cache) = self.orthogonal.as_mut() {
			translate(&mut cache.positions, &mut cache.bends, delta);
		}
		translate(&mut [], &mut self.bundled, delta);

		if self.layout.is_hierarchical() {
			translate(&mut self.nodes, &mut BendPoints::new(), delta);
			self.renderer.update_positions(&self.nodes, None);
		} else if self.simulation != Simulation::Absent {
			self.workers
				.post_simulation(SimulationCommand::Resize { width, height });
		}
		self.refresh_routes();
	}

	/// Returns false when dragging is not allowed.
	pub fn drag_start(&mut self, node_id: &str) -> bool {
		if !self.draggable() || self.tween.is_some() {
			return false;
		}
		self.dragging = Some(node_id.to_string());
		if self.layout == LayoutType::ForceGraph && self.simulation != Simulation::Absent {
			self.workers.post_simulation(SimulationCommand::DragStarted);
		}
		true
	}

	/// Moves the dragged node to `position`, in graph coordinates.
	pub fn drag_move(&mut self, position: Point) {
		let Some(node_id) = self.dragging.clone() else {
			return;
		};
		if self.layout == LayoutType::ForceGraph && self.simulation != Simulation::Absent {
			self.workers
				.post_simulation(SimulationCommand::Dragged { node_id, position });
		} else if let Some(node) = self.nodes.iter_mut().find(|n| n.id == node_id) {
			node.x = position.x;
			node.y = position.y;
			let moved = [node.clone()];
			self.renderer.update_positions(&moved, None);
		}
	}

	/// Releases the dragged node.
	pub fn drag_end(&mut self) {
		let Some(node_id) = self.dragging.take() else {
			return;
		};
		if self.layout == LayoutType::ForceGraph && self.simulation != Simulation::Absent {
			self.workers.post_simulation(SimulationCommand::DragEnded {
				node_id,
				zero_alpha_target: true,
				reset_fixed_position: !self.config.interaction.sticky,
			});
		}
	}

	/// One frame: advance any tween, then drain the workers.
	pub fn step(&mut self, dt_ms: f64) {
		if let Some(tween) = self.tween.as_mut() {
			let frame = tween.advance(dt_ms);
			self.renderer.update_positions(&frame, None);
			if tween.is_finished() {
				self.tween = None;
			}
		}
		for event in self.workers.poll(dt_ms) {
			self.handle(event);
		}
	}

	/// Applies one worker event; stale responses are dropped.
	pub fn handle(&mut self, event: WorkerEvent) {
		match event {
			WorkerEvent::Simulation(SimulationEvent::Tick { nodes }) => self.on_tick(nodes),
			WorkerEvent::Simulation(SimulationEvent::Log { message }) => {
				debug!("simulation: {message}");
			}
			WorkerEvent::LayoutDone { ticket, result } => self.on_layout(ticket, result),
			WorkerEvent::BundlingDone { ticket, result } => self.on_bundling(ticket, result),
		}
	}

	fn on_tick(&mut self, nodes: Vec<NodePosition>) {
		if self.layout != LayoutType::ForceGraph || self.tween.is_some() {
			return;
		}
		let index: HashMap<&str, usize> = self
			.nodes
			.iter()
			.enumerate()
			.map(|(i, n)| (n.id.as_str(), i))
			.collect();
		let updates: Vec<(usize, Point)> = nodes
			.iter()
			.filter_map(|n| index.get(n.id.as_str()).map(|&i| (i, n.point())))
			.collect();
		for (i, p) in updates {
			self.nodes[i].x = p.x;
			self.nodes[i].y = p.y;
		}
		self.renderer.update_positions(&nodes, None);
	}

	fn on_layout(&mut self, ticket: Ticket, result: Result<LayoutResult, LayoutError>) {
		let Some(pending) = self.pending_layout.filter(|p| p.ticket == ticket) else {
			debug!("dropping stale layout response {ticket}");
			return;
		};
		self.pending_layout = None;
		let result = match result {
			Ok(result) => result,
			Err(err) => {
				report_failure("layout", ticket, &err);
				self.restore(pending.before);
				return;
			}
		};
		info!("layout {ticket} placed {} nodes", result.positions.len());

		self.phase = if self.layout.is_hierarchical() {
			LayoutPhase::HierarchicalSettled
		} else {
			LayoutPhase::ForcePaused
		};
		let positions = self.merge_positions(&result.positions);
		if self.graph_size() < self.config.thresholds.animate_below {
			self.tween = Some(Tween::new(
				&self.nodes,
				positions.clone(),
				self.config.animation.duration_ms,
			));
		} else {
			self.tween = None;
			self.renderer.update_positions(&positions, None);
		}
		self.nodes = positions;
		if self.layout == LayoutType::ForceGraph
			&& self.simulation != Simulation::Absent
			&& !self.simulation_stale
		{
			self.workers.post_simulation(SimulationCommand::ChangePositions {
				nodes: self.nodes.clone(),
			});
		}

		if !result.bends.is_empty() || self.edge_layout == EdgeLayout::Orthogonal {
			self.orthogonal = Some(OrthogonalCache {
				positions: self.nodes.clone(),
				bends: result.bends,
			});
		}
		match self.edge_layout {
			EdgeLayout::Straight => {}
			EdgeLayout::Orthogonal => {
				let bends = self.orthogonal.as_ref().map(|c| c.bends.clone()).unwrap_or_default();
				self.renderer.update_edge_layout(EdgeLayout::Orthogonal, &bends);
				self.routing = RoutingPhase::OrthogonalSettled;
			}
			// Bundles computed on the old positions no longer fit. A failure keeps the
			// new layout and falls back to straight edges.
			EdgeLayout::Bundled => {
				let fallback = Snapshot {
					edge_layout: EdgeLayout::Straight,
					routing: RoutingPhase::Straight,
					simulation_was_running: self.layout == LayoutType::ForceGraph,
					..self.snapshot()
				};
				self.routing = RoutingPhase::BundledPending;
				self.request_bundling(fallback);
			}
		}
	}

	fn on_bundling(&mut self, ticket: Ticket, result: Result<Vec<Vec<Point>>, LayoutError>) {
		let Some(pending) = self.pending_bundling.filter(|p| p.ticket == ticket) else {
			debug!("dropping stale bundling response {ticket}");
			return;
		};
		self.pending_bundling = None;
		match result {
			Ok(bundled) => {
				self.bundled = bend_points_by_id(&self.edges, bundled);
				info!("bundling {ticket} routed {} edges", self.bundled.len());
				if self.edge_layout == EdgeLayout::Bundled {
					self.renderer.update_edge_layout(EdgeLayout::Bundled, &self.bundled);
					self.routing = RoutingPhase::BundledSettled;
				}
			}
			Err(err) => {
				report_failure("bundling", ticket, &err);
				self.restore(pending.before);
			}
		}
	}

	fn snapshot(&self) -> Snapshot {
		Snapshot {
			layout: self.layout,
			edge_layout: self.edge_layout,
			phase: self.phase,
			routing: self.routing,
			simulation_was_running: self.simulation == Simulation::Running,
		}
	}

	fn restore(&mut self, before: Snapshot) {
		info!("restoring {} / {} after a failed request", before.layout, before.edge_layout);
		self.layout = before.layout;
		self.edge_layout = before.edge_layout;
		self.phase = before.phase;
		self.routing = before.routing;
		if before.simulation_was_running {
			self.run_simulation(false);
		}
		self.refresh_routes();
	}

	/// Re-sends the routes for the current edge layout.
	fn refresh_routes(&mut self) {
		match self.routing {
			RoutingPhase::OrthogonalSettled => {
				if let Some(cache) = &self.orthogonal {
					self.renderer.update_edge_layout(EdgeLayout::Orthogonal, &cache.bends);
				}
			}
			RoutingPhase::BundledSettled => {
				self.renderer.update_edge_layout(EdgeLayout::Bundled, &self.bundled);
			}
			RoutingPhase::Straight => {
				self.renderer
					.update_edge_layout(EdgeLayout::Straight, &BendPoints::new());
			}
			RoutingPhase::OrthogonalPending | RoutingPhase::BundledPending => {}
		}
	}

	fn run_simulation(&mut self, force_restart: bool) {
		self.drop_pending_layout();
		let nodes = self.nodes.clone();
		let (width, height) = (self.width, self.height);
		let command = match self.simulation {
			Simulation::Absent => SimulationCommand::StartSimulation {
				nodes,
				links: self.edges.clone(),
				width,
				height,
			},
			_ if force_restart || self.simulation_stale => SimulationCommand::NewGraph {
				nodes,
				links: self.edges.clone(),
				width,
				height,
			},
			Simulation::Running => return,
			Simulation::Paused => SimulationCommand::Resume {
				nodes,
				width,
				height,
			},
		};
		debug!(
			"simulation {}",
			match command {
				SimulationCommand::StartSimulation { .. } => "start",
				SimulationCommand::NewGraph { .. } => "new graph",
				_ => "resume",
			}
		);
		self.workers.post_simulation(command);
		self.simulation = Simulation::Running;
		self.simulation_stale = false;
		self.phase = LayoutPhase::ForceRunning;
	}

	fn pause_simulation(&mut self) {
		if self.simulation == Simulation::Running {
			self.workers.post_simulation(SimulationCommand::Pause);
			self.simulation = Simulation::Paused;
			if self.phase == LayoutPhase::ForceRunning {
				self.phase = LayoutPhase::ForcePaused;
			}
		}
	}

	fn request_layout(&mut self, algorithm: LayoutType, routing: EdgeRouting, before: Snapshot) {
		let ticket = self.ticket();
		info!("requesting {algorithm} layout {ticket} ({routing:?} routing)");
		// Bundles for the old positions are re-requested once this layout lands.
		if let Some(stale) = self.pending_bundling.take() {
			debug!("dropping in-flight bundling {}", stale.ticket);
		}
		self.pending_layout = Some(Pending { ticket, before });
		self.workers.request_layout(
			ticket,
			LayoutRequest {
				algorithm,
				routing,
				width: self.width,
				height: self.height,
				nodes: self.nodes.clone(),
				edges: self.edges.clone(),
			},
		);
	}

	fn request_bundling(&mut self, before: Snapshot) {
		let ticket = self.ticket();
		info!("requesting edge bundling {ticket}");
		self.pending_bundling = Some(Pending { ticket, before });
		self.workers.request_bundling(
			ticket,
			BundlingRequest {
				nodes: self.nodes.clone(),
				links: self.edges.clone(),
			},
		);
	}

	/// The simulation owns the positions from here on.
	fn drop_pending_layout(&mut self) {
		if let Some(stale) = self.pending_layout.take() {
			debug!("dropping in-flight layout {}", stale.ticket);
		}
	}

	fn ticket(&mut self) -> Ticket {
		self.next_ticket += 1;
		self.next_ticket
	}

	/// Layout output in our node order; nodes the provider left out keep their place.
	fn merge_positions(&self, placed: &[NodePosition]) -> Vec<NodePosition> {
		let by_id: HashMap<&str, &NodePosition> = placed.iter().map(|p| (p.id.as_str(), p)).collect();
		self.nodes
			.iter()
			.map(|n| by_id.get(n.id.as_str()).map_or_else(|| n.clone(), |p| (*p).clone()))
			.collect()
	}

	fn seed_unplaced(&mut self) {
		let seeds = seed_positions(self.nodes.len(), self.width, self.height);
		for (node, seed) in self.nodes.iter_mut().zip(seeds) {
			let unplaced = (node.x == 0.0 && node.y == 0.0) || !(node.x.is_finite() && node.y.is_finite());
			if unplaced {
				node.x = seed.x;
				node.y = seed.y;
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::renderer::{Scene, ViewTransform};

	#[derive(Default)]
	struct RecordingWorkers {
		simulation: Vec<SimulationCommand>,
		layouts: Vec<(Ticket, LayoutRequest)>,
		bundles: Vec<(Ticket, BundlingRequest)>,
		inbox: Vec<WorkerEvent>,
	}

	impl RecordingWorkers {
		fn pauses(&self) -> usize {
			self.simulation
				.iter()
				.filter(|c| matches!(c, SimulationCommand::Pause))
				.count()
		}

		fn resumes(&self) -> usize {
			self.simulation
				.iter()
				.filter(|c| matches!(c, SimulationCommand::Resume { .. }))
				.count()
		}
	}

	impl Workers for RecordingWorkers {
		fn post_simulation(&mut self, command: SimulationCommand) {
			self.simulation.push(command);
		}

		fn request_layout(&mut self, ticket: Ticket, request: LayoutRequest) {
			self.layouts.push((ticket, request));
		}

		fn request_bundling(&mut self, ticket: Ticket, request: BundlingRequest) {
			self.bundles.push((ticket, request));
		}

		fn poll(&mut self, _dt_ms: f64) -> Vec<WorkerEvent> {
			std::mem::take(&mut self.inbox)
		}
	}

	/// Records edge layout switches on top of a scene.
	#[derive(Default)]
	struct RecordingRenderer {
		scene: Scene,
		edge_layouts: Vec<EdgeLayout>,
		position_updates: usize,
	}

	impl Renderer for RecordingRenderer {
		fn initialize(
			&mut self,
			nodes: &[NodePosition],
			edges: &[LayoutEdge],
			node_styles: &HashMap<String, NodeStyle>,
			edge_styles: &HashMap<String, EdgeStyle>,
			edge_layout: EdgeLayout,
		) {
			self.scene
				.initialize(nodes, edges, node_styles, edge_styles, edge_layout);
		}

		fn update_positions(&mut self, positions: &[NodePosition], origin_offset: Option<Point>) {
			self.position_updates += 1;
			self.scene.update_positions(positions, origin_offset);
		}

		fn update_node_style(&mut self, id: &str, style: &NodeStyle) {
			self.scene.update_node_style(id, style);
		}

		fn update_edge_style(&mut self, id: &str, style: &EdgeStyle) {
			self.scene.update_edge_style(id, style);
		}

		fn update_edge_layout(&mut self, edge_layout: EdgeLayout, bends: &BendPoints) {
			self.edge_layouts.push(edge_layout);
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

	type Coordinator = LayoutCoordinator<RecordingRenderer, RecordingWorkers>;

	fn coordinator(node_count: usize) -> Coordinator {
		let mut c = LayoutCoordinator::new(
			RecordingRenderer::default(),
			RecordingWorkers::default(),
			EditorConfig::default(),
			800.0,
			600.0,
		);
		restart(&mut c, node_count, LayoutType::ForceGraph, EdgeLayout::Straight);
		c
	}

	/// Imports a fresh chain of `node_count` nodes.
	fn restart(c: &mut Coordinator, node_count: usize, layout: LayoutType, edge_layout: EdgeLayout) {
		let nodes = (0..node_count)
			.map(|i| NodePosition::new(format!("n{i}"), 10.0 * i as f64 + 1.0, 5.0))
			.collect();
		let edges = (1..node_count)
			.map(|i| LayoutEdge::new(format!("e{i}"), format!("n{}", i - 1), format!("n{i}")))
			.collect();
		c.start(nodes, edges, &HashMap::new(), &HashMap::new(), layout, edge_layout);
	}

	fn posted_positions(c: &Coordinator) -> usize {
		c.workers()
			.simulation
			.iter()
			.filter(|cmd| matches!(cmd, SimulationCommand::ChangePositions { .. }))
			.count()
	}

	fn layout_done(c: &mut Coordinator, ticket: Ticket, shift: f64) {
		let positions = c
			.nodes()
			.iter()
			.map(|n| NodePosition::new(n.id.clone(), n.x + shift, n.y + shift))
			.collect();
		let bends = BendPoints::from([("e1".to_string(), vec![Point::new(1.0, 2.0)])]);
		c.handle(WorkerEvent::LayoutDone {
			ticket,
			result: Ok(LayoutResult { positions, bends }),
		});
	}

	#[test]
	fn start_spawns_the_simulation_once() {
		let c = coordinator(3);
		assert_eq!(c.workers().simulation.len(), 1);
		assert!(matches!(
			c.workers().simulation[0],
			SimulationCommand::StartSimulation { .. }
		));
		assert_eq!(c.phase(), LayoutPhase::ForceRunning);
		assert!(c.draggable());
	}

	#[test]
	fn orthogonal_pauses_once_and_straight_resumes_without_relayout() {
		let mut c = coordinator(3);
		c.change_layout(LayoutType::ForceGraph, EdgeLayout::Orthogonal, false);
		assert_eq!(c.workers().pauses(), 1);
		assert_eq!(c.workers().layouts.len(), 1);
		let (ticket, request) = &c.workers().layouts[0];
		assert_eq!(request.routing, EdgeRouting::Orthogonal);
		assert_eq!(c.routing(), RoutingPhase::OrthogonalPending);
		assert!(!c.draggable());

		let ticket = *ticket;
		layout_done(&mut c, ticket, 3.0);
		assert_eq!(c.routing(), RoutingPhase::OrthogonalSettled);

		c.change_layout(LayoutType::ForceGraph, EdgeLayout::Straight, false);
		assert_eq!(c.workers().layouts.len(), 1);
		assert_eq!(c.workers().pauses(), 1);
		assert_eq!(c.workers().resumes(), 1);
		assert_eq!(c.phase(), LayoutPhase::ForceRunning);
		assert_eq!(c.renderer().edge_layouts.last(), Some(&EdgeLayout::Straight));
	}

	#[test]
	fn cached_orthogonal_routes_are_reused_while_positions_hold() {
		let mut c = coordinator(3);
		c.change_layout(LayoutType::Layered, EdgeLayout::Orthogonal, false);
		let ticket = c.workers().layouts[0].0;
		layout_done(&mut c, ticket, 0.0);
		c.change_layout(LayoutType::Layered, EdgeLayout::Straight, false);
		c.change_layout(LayoutType::Layered, EdgeLayout::Orthogonal, false);
		assert_eq!(c.workers().layouts.len(), 1);
		assert_eq!(c.routing(), RoutingPhase::OrthogonalSettled);
		assert_eq!(c.renderer().scene.bends()["e1"], vec![Point::new(1.0, 2.0)]);
	}

	#[test]
	fn stale_layout_responses_are_dropped() {
		let mut c = coordinator(3);
		c.change_layout(LayoutType::Circo, EdgeLayout::Straight, false);
		c.change_layout(LayoutType::Radial, EdgeLayout::Straight, false);
		let first = c.workers().layouts[0].0;
		layout_done(&mut c, first, 50.0);
		assert!(c.is_layout_loading());
		assert_eq!(c.phase(), LayoutPhase::HierarchicalComputing);
		let second = c.workers().layouts[1].0;
		layout_done(&mut c, second, 50.0);
		assert!(!c.is_layout_loading());
		assert_eq!(c.phase(), LayoutPhase::HierarchicalSettled);
	}

	#[test]
	fn failed_layout_clears_loading_and_restores_the_previous_state() {
		let mut c = coordinator(3);
		let before = c.nodes().to_vec();
		c.change_layout(LayoutType::Stress, EdgeLayout::Straight, false);
		assert!(c.is_layout_loading());
		let ticket = c.workers().layouts[0].0;
		c.handle(WorkerEvent::LayoutDone {
			ticket,
			result: Err(LayoutError::EmptyGraph),
		});
		assert!(!c.is_layout_loading());
		assert_eq!(c.layout(), LayoutType::ForceGraph);
		assert_eq!(c.phase(), LayoutPhase::ForceRunning);
		assert_eq!(c.nodes(), before.as_slice());
		assert_eq!(c.workers().resumes(), 1);
	}

	#[test]
	fn bundling_pauses_the_simulation_before_it_is_requested() {
		let mut c = coordinator(3);
		c.change_layout(LayoutType::ForceGraph, EdgeLayout::Bundled, false);
		assert!(matches!(c.workers().simulation.last(), Some(SimulationCommand::Pause)));
		assert_eq!(c.workers().bundles.len(), 1);
		assert!(c.is_bundling_loading());

		let ticket = c.workers().bundles[0].0;
		c.handle(WorkerEvent::BundlingDone {
			ticket,
			result: Ok(vec![vec![Point::new(5.0, 5.0)], vec![]]),
		});
		assert!(!c.is_bundling_loading());
		assert_eq!(c.routing(), RoutingPhase::BundledSettled);
		assert_eq!(c.renderer().scene.bends()["e1"], vec![Point::new(5.0, 5.0)]);
	}

	#[test]
	fn failed_bundling_falls_back_to_straight() {
		let mut c = coordinator(3);
		c.change_layout(LayoutType::ForceGraph, EdgeLayout::Bundled, false);
		let ticket = c.workers().bundles[0].0;
		c.handle(WorkerEvent::BundlingDone {
			ticket,
			result: Err(LayoutError::Bundling("no".into())),
		});
		assert!(!c.is_bundling_loading());
		assert_eq!(c.edge_layout(), EdgeLayout::Straight);
		assert_eq!(c.routing(), RoutingPhase::Straight);
		assert_eq!(c.workers().resumes(), 1);
	}

	#[test]
	fn bundling_waits_for_a_pending_layout() {
		let mut c = coordinator(3);
		c.change_layout(LayoutType::Circo, EdgeLayout::Bundled, false);
		assert!(c.workers().bundles.is_empty());
		let ticket = c.workers().layouts[0].0;
		layout_done(&mut c, ticket, 10.0);
		assert_eq!(c.workers().bundles.len(), 1);
		assert_eq!(c.workers().bundles[0].1.nodes, c.nodes());
	}

	#[test]
	fn small_graphs_animate_and_large_graphs_snap() {
		let mut small = coordinator(3);
		small.change_layout(LayoutType::Circo, EdgeLayout::Straight, false);
		let ticket = small.workers().layouts[0].0;
		layout_done(&mut small, ticket, 100.0);
		assert!(small.is_animating());
		for _ in 0..100 {
			small.step(16.0);
		}
		assert!(!small.is_animating());
		assert_eq!(small.renderer().scene.position("n0"), Some(Point::new(101.0, 105.0)));

		let mut large = coordinator(250);
		large.change_layout(LayoutType::Circo, EdgeLayout::Straight, false);
		let ticket = large.workers().layouts[0].0;
		layout_done(&mut large, ticket, 100.0);
		assert!(!large.is_animating());
		assert_eq!(large.renderer().scene.position("n0"), Some(Point::new(101.0, 105.0)));
	}

	#[test]
	fn resize_recentres_hierarchical_layouts_and_forwards_to_the_simulation() {
		let mut c = coordinator(2);
		c.resize(1000.0, 800.0);
		assert!(matches!(
			c.workers().simulation.last(),
			Some(SimulationCommand::Resize { width, height }) if *width == 1000.0 && *height == 800.0
		));

		c.change_layout(LayoutType::Box, EdgeLayout::Straight, false);
		let ticket = c.workers().layouts[0].0;
		layout_done(&mut c, ticket, 0.0);
		let before = c.nodes()[0].point();
		c.resize(1200.0, 1000.0);
		assert_eq!(c.nodes()[0].point(), before + Point::new(100.0, 100.0));
	}

	#[test]
	fn drags_are_refused_on_routed_edges() {
		let mut c = coordinator(2);
		assert!(c.drag_start("n0"));
		c.drag_move(Point::new(3.0, 4.0));
		c.drag_end();
		assert!(matches!(
			c.workers().simulation.last(),
			Some(SimulationCommand::DragEnded { reset_fixed_position: true, .. })
		));

		c.change_layout(LayoutType::ForceGraph, EdgeLayout::Bundled, false);
		assert!(!c.drag_start("n0"));
	}

	#[test]
	fn ticks_only_move_nodes_under_the_simulation() {
		let mut c = coordinator(2);
		c.handle(WorkerEvent::Simulation(SimulationEvent::Tick {
			nodes: vec![NodePosition::new("n0", 42.0, 43.0)],
		}));
		assert_eq!(c.nodes()[0].point(), Point::new(42.0, 43.0));

		c.change_layout(LayoutType::Box, EdgeLayout::Straight, false);
		c.handle(WorkerEvent::Simulation(SimulationEvent::Tick {
			nodes: vec![NodePosition::new("n0", 0.0, 0.0)],
		}));
		assert_eq!(c.nodes()[0].point(), Point::new(42.0, 43.0));
	}

	#[test]
	fn returning_to_force_after_an_import_rebuilds_the_simulation() {
		let mut c = coordinator(3);
		c.change_layout(LayoutType::Layered, EdgeLayout::Straight, false);
		restart(&mut c, 5, LayoutType::Layered, EdgeLayout::Straight);
		let ticket = c.workers().layouts[1].0;
		layout_done(&mut c, ticket, 0.0);

		c.change_layout(LayoutType::ForceGraph, EdgeLayout::Straight, false);
		assert_eq!(c.workers().resumes(), 0);
		match c.workers().simulation.last() {
			Some(SimulationCommand::NewGraph { nodes, links, .. }) => {
				assert_eq!(nodes.len(), 5);
				assert_eq!(links.len(), 4);
			}
			other => panic!("expected a new graph, got {other:?}"),
		}
		assert_eq!(c.phase(), LayoutPhase::ForceRunning);
	}

	#[test]
	fn routed_positions_are_not_sent_to_a_simulation_holding_the_old_graph() {
		let mut c = coordinator(3);
		c.change_layout(LayoutType::Layered, EdgeLayout::Straight, false);
		restart(&mut c, 4, LayoutType::ForceGraph, EdgeLayout::Orthogonal);
		let ticket = c.workers().layouts.last().map(|(t, _)| *t).unwrap();
		layout_done(&mut c, ticket, 2.0);
		assert_eq!(c.routing(), RoutingPhase::OrthogonalSettled);
		assert_eq!(posted_positions(&c), 0);

		c.change_layout(LayoutType::ForceGraph, EdgeLayout::Straight, false);
		assert!(matches!(
			c.workers().simulation.last(),
			Some(SimulationCommand::NewGraph { nodes, .. }) if nodes.len() == 4
		));
	}

	#[test]
	fn a_late_hierarchical_result_does_not_override_the_simulation() {
		let mut c = coordinator(3);
		c.change_layout(LayoutType::Circo, EdgeLayout::Straight, false);
		let ticket = c.workers().layouts[0].0;
		c.change_layout(LayoutType::ForceGraph, EdgeLayout::Straight, false);
		assert!(!c.is_layout_loading());
		assert_eq!(c.workers().resumes(), 1);
		let before = c.nodes().to_vec();

		layout_done(&mut c, ticket, 50.0);
		assert_eq!(c.phase(), LayoutPhase::ForceRunning);
		assert_eq!(c.nodes(), before.as_slice());
		assert_eq!(posted_positions(&c), 0);
	}

	#[test]
	fn bundling_under_force_does_not_wait_for_an_abandoned_layout() {
		let mut c = coordinator(3);
		c.change_layout(LayoutType::Circo, EdgeLayout::Straight, false);
		c.change_layout(LayoutType::ForceGraph, EdgeLayout::Bundled, false);
		assert!(!c.is_layout_loading());
		assert_eq!(c.workers().bundles.len(), 1);
		assert_eq!(c.routing(), RoutingPhase::BundledPending);
	}

	#[test]
	fn failed_bundling_after_a_layout_keeps_the_layout_with_straight_edges() {
		let mut c = coordinator(3);
		c.change_layout(LayoutType::Circo, EdgeLayout::Bundled, false);
		let ticket = c.workers().layouts[0].0;
		layout_done(&mut c, ticket, 10.0);
		let placed = c.nodes().to_vec();
		let ticket = c.workers().bundles[0].0;
		c.handle(WorkerEvent::BundlingDone {
			ticket,
			result: Err(LayoutError::Bundling("no".into())),
		});

		assert_eq!(c.layout(), LayoutType::Circo);
		assert_eq!(c.edge_layout(), EdgeLayout::Straight);
		assert_eq!(c.routing(), RoutingPhase::Straight);
		assert_eq!(c.phase(), LayoutPhase::HierarchicalSettled);
		assert_eq!(c.nodes(), placed.as_slice());
		assert_eq!(c.workers().resumes(), 0);
		assert_eq!(c.renderer().edge_layouts.last(), Some(&EdgeLayout::Straight));
	}

	#[test]
	fn a_new_layout_drops_bundles_for_the_old_positions() {
		let mut c = coordinator(3);
		c.change_layout(LayoutType::ForceGraph, EdgeLayout::Bundled, false);
		let stale = c.workers().bundles[0].0;
		c.change_layout(LayoutType::Radial, EdgeLayout::Bundled, false);
		assert!(!c.is_bundling_loading());
		c.handle(WorkerEvent::BundlingDone {
			ticket: stale,
			result: Err(LayoutError::Bundling("no".into())),
		});
		assert_eq!(c.layout(), LayoutType::Radial);
		assert!(c.is_layout_loading());
	}
}
