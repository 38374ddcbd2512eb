//! The physics worker: a `force_graph` simulation driven purely by commands.
//!
//! The worker owns its positions. The coordinator only sends [`SimulationCommand`]s and
//! receives [`SimulationEvent`]s, so nothing is shared between the two sides.

use std::collections::HashMap;
use std::f64::consts::PI;

use force_graph::{DefaultNodeIdx, EdgeData, ForceGraph, NodeData, SimulationParameters};
use log::debug;
use serde::{Deserialize, Serialize};

use super::{LayoutEdge, NodePosition, Point};
use crate::config::SimulationConfig;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SimulationCommand {
	#[serde(rename_all = "camelCase")]
	StartSimulation {
		nodes: Vec<NodePosition>,
		links: Vec<LayoutEdge>,
		width: f64,
		height: f64,
	},
	/// Same payload as `StartSimulation`; throws away the running simulation first.
	#[serde(rename_all = "camelCase")]
	NewGraph {
		nodes: Vec<NodePosition>,
		links: Vec<LayoutEdge>,
		width: f64,
		height: f64,
	},
	/// Continue from the given positions. Ignored while already running.
	#[serde(rename_all = "camelCase")]
	Resume {
		nodes: Vec<NodePosition>,
		width: f64,
		height: f64,
	},
	Pause,
	DragStarted,
	#[serde(rename_all = "camelCase")]
	Dragged { node_id: String, position: Point },
	#[serde(rename_all = "camelCase")]
	DragEnded {
		node_id: String,
		zero_alpha_target: bool,
		reset_fixed_position: bool,
	},
	Resize { width: f64, height: f64 },
	ChangePositions { nodes: Vec<NodePosition> },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SimulationEvent {
	Tick { nodes: Vec<NodePosition> },
	Log { message: String },
}

/// d3-style cooling: `alpha` relaxes towards `alpha_target` every tick and the
/// simulation goes quiet once it drops below `alpha_min`.
#[derive(Clone, Copy, Debug, PartialEq)]
struct Cooling {
	alpha: f64,
	alpha_target: f64,
	/// The tick timer; stops when the simulation settles, restarts on drag or resume.
	active: bool,
}

pub struct SimulationWorker {
	config: SimulationConfig,
	graph: Option<ForceGraph<String, ()>>,
	index: HashMap<String, DefaultNodeIdx>,
	cooling: Cooling,
	/// Mirrors the coordinator's view: false between `Pause` and `Resume`.
	sim_running: bool,
	width: f64,
	height: f64,
}

impl SimulationWorker {
	pub fn new(config: SimulationConfig) -> Self {
		Self {
			config,
			graph: None,
			index: HashMap::new(),
			cooling: Cooling {
				alpha: 1.0,
				alpha_target: 0.0,
				active: false,
			},
			sim_running: false,
			width: 0.0,
			height: 0.0,
		}
	}

	pub fn is_running(&self) -> bool {
		self.sim_running
	}

	/// True while the simulation is running and has not cooled down yet.
	pub fn is_hot(&self) -> bool {
		self.sim_running && self.cooling.active
	}

	pub fn alpha(&self) -> f64 {
		self.cooling.alpha
	}

	pub fn handle(&mut self, command: SimulationCommand) -> Vec<SimulationEvent> {
		let mut events = Vec::new();
		match command {
			SimulationCommand::StartSimulation {
				nodes,
				links,
				width,
				height,
			} => {
				self.start(&nodes, &links, width, height);
				events.push(log(format!(
					"simulation started: {} nodes, {} links",
					nodes.len(),
					links.len()
				)));
			}
			SimulationCommand::NewGraph {
				nodes,
				links,
				width,
				height,
			} => {
				events.push(log(format!("{} {}", self.width, self.height)));
				events.push(log(format!("{width} {height}")));
				self.start(&nodes, &links, width, height);
			}
			SimulationCommand::DragStarted => {
				if self.sim_running {
					self.cooling.alpha_target = self.config.drag_alpha_target;
					self.cooling.active = true;
				}
			}
			SimulationCommand::Dragged { node_id, position } => {
				self.pin(&node_id, Some(position));
				// A paused simulation never ticks again on its own.
				if !self.sim_running {
					events.push(self.tick_event());
				}
			}
			SimulationCommand::DragEnded {
				node_id,
				zero_alpha_target,
				reset_fixed_position,
			} => {
				if zero_alpha_target {
					self.cooling.alpha_target = 0.0;
				}
				if reset_fixed_position {
					self.pin(&node_id, None);
				}
			}
			SimulationCommand::Pause => {
				self.cooling.active = false;
				self.sim_running = false;
			}
			SimulationCommand::ChangePositions { nodes } => self.set_positions(&nodes),
			SimulationCommand::Resume {
				nodes,
				width,
				height,
			} => {
				self.width = width;
				self.height = height;
				if !self.sim_running {
					self.set_positions(&nodes);
					self.cooling.alpha = self.config.resume_alpha;
					self.cooling.active = true;
					self.sim_running = true;
				}
			}
			SimulationCommand::Resize { width, height } => {
				let delta = Point::new((width - self.width) / 2.0, (height - self.height) / 2.0);
				self.shift(delta);
				self.width = width;
				self.height = height;
				if self.sim_running {
					self.cooling.alpha = self.config.resize_alpha;
					self.cooling.active = true;
				}
				events.push(self.tick_event());
			}
		}
		events
	}

	/// Advances one tick. Returns `None` when paused or settled.
	pub fn step(&mut self) -> Option<SimulationEvent> {
		if !self.is_hot() {
			return None;
		}
		let alpha_decay = self.config.alpha_decay;
		let cooling = &mut self.cooling;
		cooling.alpha += (cooling.alpha_target - cooling.alpha) * alpha_decay;
		let alpha = cooling.alpha;

		let graph = self.graph.as_mut()?;
		graph.update(self.config.tick_dt * alpha as f32);
		self.pull_to_center();

		if self.cooling.alpha < self.config.alpha_min {
			self.cooling.active = false;
			debug!("simulation settled");
		}
		Some(self.tick_event())
	}

	pub fn positions(&self) -> Vec<NodePosition> {
		let mut positions = Vec::with_capacity(self.index.len());
		if let Some(graph) = &self.graph {
			graph.visit_nodes(|node| {
				positions.push(NodePosition::new(
					node.data.user_data.clone(),
					node.x() as f64,
					node.y() as f64,
				));
			});
		}
		positions
	}

	fn start(&mut self, nodes: &[NodePosition], links: &[LayoutEdge], width: f64, height: f64) {
		let c = &self.config;
		let mut graph = ForceGraph::new(SimulationParameters {
			force_charge: c.force_charge,
			force_spring: c.force_spring,
			force_max: c.force_max,
			node_speed: c.node_speed,
			damping_factor: c.damping_factor,
		});
		let seeds = seed_positions(nodes.len(), width, height);
		let mut index = HashMap::with_capacity(nodes.len());
		for (node, seed) in nodes.iter().zip(seeds) {
			let placed = node.x.is_finite() && node.y.is_finite() && (node.x, node.y) != (0.0, 0.0);
			let p = if placed { node.point() } else { seed };
			let idx = graph.add_node(NodeData {
				x: p.x as f32,
				y: p.y as f32,
				mass: c.node_mass,
				is_anchor: false,
				user_data: node.id.clone(),
			});
			index.insert(node.id.clone(), idx);
		}
		for link in links {
			if let (Some(&src), Some(&tgt)) = (index.get(&link.source), index.get(&link.target)) {
				graph.add_edge(src, tgt, EdgeData::default());
			}
		}

		self.graph = Some(graph);
		self.index = index;
		self.width = width;
		self.height = height;
		self.cooling = Cooling {
			alpha: 1.0,
			alpha_target: 0.0,
			active: true,
		};
		self.sim_running = true;
	}

	/// `Some` fixes the node at `position`; `None` releases it.
	fn pin(&mut self, node_id: &str, position: Option<Point>) {
		let (Some(graph), Some(&idx)) = (self.graph.as_mut(), self.index.get(node_id)) else {
			debug!("drag on unknown node {node_id}");
			return;
		};
		graph.visit_nodes_mut(|node| {
			if node.index() == idx {
				match position {
					Some(p) => {
						node.data.x = p.x as f32;
						node.data.y = p.y as f32;
						node.data.is_anchor = true;
					}
					None => node.data.is_anchor = false,
				}
			}
		});
	}

	fn set_positions(&mut self, nodes: &[NodePosition]) {
		let Some(graph) = self.graph.as_mut() else {
			return;
		};
		let by_id: HashMap<&str, &NodePosition> = nodes.iter().map(|n| (n.id.as_str(), n)).collect();
		graph.visit_nodes_mut(|node| {
			if let Some(p) = by_id.get(node.data.user_data.as_str()) {
				node.data.x = p.x as f32;
				node.data.y = p.y as f32;
			}
		});
	}

	fn shift(&mut self, delta: Point) {
		let Some(graph) = self.graph.as_mut() else {
			return;
		};
		graph.visit_nodes_mut(|node| {
			node.data.x += delta.x as f32;
			node.data.y += delta.y as f32;
		});
	}

	/// Moves the free nodes so their mean drifts towards the canvas centre.
	fn pull_to_center(&mut self) {
		let Some(graph) = self.graph.as_mut() else {
			return;
		};
		let (mut sx, mut sy, mut n) = (0.0_f64, 0.0_f64, 0usize);
		graph.visit_nodes(|node| {
			sx += node.x() as f64;
			sy += node.y() as f64;
			n += 1;
		});
		if n == 0 {
			return;
		}
		let strength = self.config.center_strength as f64;
		let dx = ((self.width / 2.0 - sx / n as f64) * strength) as f32;
		let dy = ((self.height / 2.0 - sy / n as f64) * strength) as f32;
		graph.visit_nodes_mut(|node| {
			if !node.data.is_anchor {
				node.data.x += dx;
				node.data.y += dy;
			}
		});
	}

	fn tick_event(&self) -> SimulationEvent {
		SimulationEvent::Tick {
			nodes: self.positions(),
		}
	}
}

fn log(message: String) -> SimulationEvent {
	SimulationEvent::Log { message }
}

/// Phyllotaxis arrangement around the canvas centre, used for nodes that arrive
/// without a position.
pub fn seed_positions(count: usize, width: f64, height: f64) -> Vec<Point> {
	let angle = PI * (3.0 - 5.0_f64.sqrt());
	(0..count)
		.map(|i| {
			let radius = 10.0 * (0.5 + i as f64).sqrt();
			let a = i as f64 * angle;
			Point::new(width / 2.0 + radius * a.cos(), height / 2.0 + radius * a.sin())
		})
		.collect()
}

#[cfg(test)]
mod tests {
	use super::*;

	fn start_command(width: f64, height: f64) -> SimulationCommand {
		SimulationCommand::StartSimulation {
			nodes: vec![
				NodePosition::new("a", 0.0, 0.0),
				NodePosition::new("b", 0.0, 0.0),
				NodePosition::new("c", 0.0, 0.0),
			],
			links: vec![LayoutEdge::new("ab", "a", "b"), LayoutEdge::new("bc", "b", "c")],
			width,
			height,
		}
	}

	fn started() -> SimulationWorker {
		let mut worker = SimulationWorker::new(SimulationConfig::default());
		worker.handle(start_command(400.0, 300.0));
		worker
	}

	fn tick_nodes(event: &SimulationEvent) -> &[NodePosition] {
		match event {
			SimulationEvent::Tick { nodes } => nodes,
			other => panic!("expected a tick, got {other:?}"),
		}
	}

	#[test]
	fn start_seeds_unplaced_nodes_around_the_center() {
		let worker = started();
		assert!(worker.is_running());
		let positions = worker.positions();
		assert_eq!(positions.len(), 3);
		for p in &positions {
			assert!((p.x - 200.0).abs() < 30.0 && (p.y - 150.0).abs() < 30.0);
		}
	}

	#[test]
	fn running_simulation_ticks_until_it_settles() {
		let mut worker = started();
		assert!(worker.step().is_some());
		let mut ticks = 1;
		while worker.step().is_some() {
			ticks += 1;
			assert!(ticks < 10_000, "simulation never settled");
		}
		assert!(worker.alpha() < SimulationConfig::default().alpha_min);
		assert!(worker.positions().iter().all(|p| p.x.is_finite() && p.y.is_finite()));
	}

	#[test]
	fn pause_stops_ticks_and_drag_echoes_a_tick() {
		let mut worker = started();
		worker.handle(SimulationCommand::Pause);
		assert!(!worker.is_running());
		assert!(worker.step().is_none());

		let events = worker.handle(SimulationCommand::Dragged {
			node_id: "b".into(),
			position: Point::new(10.0, 20.0),
		});
		assert_eq!(events.len(), 1);
		let b = tick_nodes(&events[0]).iter().find(|p| p.id == "b").unwrap();
		assert_eq!((b.x, b.y), (10.0, 20.0));
	}

	#[test]
	fn drag_while_running_waits_for_the_next_tick() {
		let mut worker = started();
		worker.handle(SimulationCommand::DragStarted);
		let events = worker.handle(SimulationCommand::Dragged {
			node_id: "a".into(),
			position: Point::new(50.0, 60.0),
		});
		assert!(events.is_empty());
		let tick = worker.step().unwrap();
		let a = tick_nodes(&tick).iter().find(|p| p.id == "a").unwrap();
		assert_eq!((a.x, a.y), (50.0, 60.0));
	}

	#[test]
	fn resume_only_applies_positions_when_paused() {
		let mut worker = started();
		let moved = vec![NodePosition::new("a", 1.0, 2.0)];
		worker.handle(SimulationCommand::Resume {
			nodes: moved.clone(),
			width: 400.0,
			height: 300.0,
		});
		let a = worker.positions().into_iter().find(|p| p.id == "a").unwrap();
		assert_ne!((a.x, a.y), (1.0, 2.0));

		worker.handle(SimulationCommand::Pause);
		worker.handle(SimulationCommand::Resume {
			nodes: moved,
			width: 400.0,
			height: 300.0,
		});
		let a = worker.positions().into_iter().find(|p| p.id == "a").unwrap();
		assert_eq!((a.x, a.y), (1.0, 2.0));
		assert!(worker.is_running());
		assert_eq!(worker.alpha(), SimulationConfig::default().resume_alpha);
	}

	#[test]
	fn resize_shifts_by_half_the_delta_and_always_ticks() {
		let mut worker = started();
		worker.handle(SimulationCommand::Pause);
		let before = worker.positions();
		let events = worker.handle(SimulationCommand::Resize {
			width: 500.0,
			height: 340.0,
		});
		let after = tick_nodes(&events[0]);
		for (b, a) in before.iter().zip(after) {
			assert!((a.x - b.x - 50.0).abs() < 1e-3);
			assert!((a.y - b.y - 20.0).abs() < 1e-3);
		}
		assert!(!worker.is_running());
	}

	#[test]
	fn commands_are_read_from_message_json() {
		let command: SimulationCommand = serde_json::from_str(
			r#"{"type": "dragEnded", "nodeId": "a", "zeroAlphaTarget": true, "resetFixedPosition": false}"#,
		)
		.unwrap();
		assert_eq!(
			command,
			SimulationCommand::DragEnded {
				node_id: "a".into(),
				zero_alpha_target: true,
				reset_fixed_position: false,
			}
		);
	}
}
