//! The three off-thread computations behind one seam.
//!
//! The coordinator only posts messages and later receives [`WorkerEvent`]s; it never
//! touches worker state. [`LocalWorkers`] runs everything cooperatively on the calling
//! thread (the browser build), [`ThreadWorkers`] gives each computation its own thread.

use std::collections::VecDeque;

use log::error;

use super::bundling::{BundlingRequest, bundle_edges};
use super::hierarchical::{HierarchicalEngine, LayoutProvider, LayoutRequest, LayoutResult};
use super::simulation::{SimulationCommand, SimulationEvent, SimulationWorker};
use super::Point;
use crate::config::EditorConfig;
use crate::error::LayoutError;

/// Pairs a one-shot request with its response.
pub type Ticket = u64;

#[derive(Clone, Debug, PartialEq)]
pub enum WorkerEvent {
	Simulation(SimulationEvent),
	LayoutDone {
		ticket: Ticket,
		result: Result<LayoutResult, LayoutError>,
	},
	/// Interior bend points aligned by link index.
	BundlingDone {
		ticket: Ticket,
		result: Result<Vec<Vec<Point>>, LayoutError>,
	},
}

pub trait Workers {
	fn post_simulation(&mut self, command: SimulationCommand);
	fn request_layout(&mut self, ticket: Ticket, request: LayoutRequest);
	fn request_bundling(&mut self, ticket: Ticket, request: BundlingRequest);
	/// Everything that finished since the last call. `dt_ms` is the frame time.
	fn poll(&mut self, dt_ms: f64) -> Vec<WorkerEvent>;
}

/// Cooperative workers: commands apply immediately, the simulation advances one tick per
/// poll and at most one queued job of each kind completes per poll.
pub struct LocalWorkers {
	simulation: SimulationWorker,
	engine: Box<dyn LayoutProvider>,
	bundling: crate::config::BundlingConfig,
	layouts: VecDeque<(Ticket, LayoutRequest)>,
	bundles: VecDeque<(Ticket, BundlingRequest)>,
	outbox: Vec<WorkerEvent>,
}

impl LocalWorkers {
	pub fn new(config: &EditorConfig) -> Self {
		Self::with_provider(
			config,
			Box::new(HierarchicalEngine::new(
				config.hierarchical.clone(),
				config.simulation.clone(),
			)),
		)
	}

	pub fn with_provider(config: &EditorConfig, engine: Box<dyn LayoutProvider>) -> Self {
		Self {
			simulation: SimulationWorker::new(config.simulation.clone()),
			engine,
			bundling: config.bundling.clone(),
			layouts: VecDeque::new(),
			bundles: VecDeque::new(),
			outbox: Vec::new(),
		}
	}

	/// True while something is still queued or the simulation has not cooled down.
	pub fn is_busy(&self) -> bool {
		self.simulation.is_hot() || !self.layouts.is_empty() || !self.bundles.is_empty()
	}
}

impl Workers for LocalWorkers {
	fn post_simulation(&mut self, command: SimulationCommand) {
		let events = self.simulation.handle(command);
		self.outbox.extend(events.into_iter().map(WorkerEvent::Simulation));
	}

	fn request_layout(&mut self, ticket: Ticket, request: LayoutRequest) {
		self.layouts.push_back((ticket, request));
	}

	fn request_bundling(&mut self, ticket: Ticket, request: BundlingRequest) {
		self.bundles.push_back((ticket, request));
	}

	fn poll(&mut self, _dt_ms: f64) -> Vec<WorkerEvent> {
		if let Some(tick) = self.simulation.step() {
			self.outbox.push(WorkerEvent::Simulation(tick));
		}
		if let Some((ticket, request)) = self.layouts.pop_front() {
			let result = self.engine.layout(&request);
			self.outbox.push(WorkerEvent::LayoutDone { ticket, result });
		}
		if let Some((ticket, request)) = self.bundles.pop_front() {
			let result = bundle_edges(&request, &self.bundling);
			self.outbox.push(WorkerEvent::BundlingDone { ticket, result });
		}
		std::mem::take(&mut self.outbox)
	}
}

#[cfg(not(target_arch = "wasm32"))]
pub use threaded::ThreadWorkers;

#[cfg(not(target_arch = "wasm32"))]
mod threaded {
	use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
	use std::thread::{self, JoinHandle};
	use std::time::Duration;

	use log::{debug, error};

	use super::{Ticket, WorkerEvent, Workers};
	use crate::config::EditorConfig;
	use crate::error::LayoutError;
	use crate::layout::bundling::{BundlingRequest, bundle_edges};
	use crate::layout::hierarchical::{HierarchicalEngine, LayoutProvider, LayoutRequest};
	use crate::layout::simulation::{SimulationCommand, SimulationWorker};

	/// One thread per computation, talking over channels only.
	pub struct ThreadWorkers {
		simulation: Option<Sender<SimulationCommand>>,
		layouts: Option<Sender<(Ticket, LayoutRequest)>>,
		bundles: Option<Sender<(Ticket, BundlingRequest)>>,
		events: Receiver<WorkerEvent>,
		/// Failures to reach a worker, reported on the next poll.
		undelivered: Vec<WorkerEvent>,
		threads: Vec<JoinHandle<()>>,
	}

	impl ThreadWorkers {
		pub fn spawn(config: &EditorConfig) -> Self {
			let (event_tx, events) = mpsc::channel();
			let mut threads = Vec::with_capacity(3);

			let (simulation, commands) = mpsc::channel();
			let worker = SimulationWorker::new(config.simulation.clone());
			let tick = Duration::from_secs_f32(config.simulation.tick_dt.max(0.001));
			let tx = event_tx.clone();
			threads.push(thread::spawn(move || run_simulation(worker, commands, tx, tick)));

			let (layouts, requests) = mpsc::channel::<(Ticket, LayoutRequest)>();
			let engine = HierarchicalEngine::new(config.hierarchical.clone(), config.simulation.clone());
			let tx = event_tx.clone();
			threads.push(thread::spawn(move || {
				for (ticket, request) in requests {
					let result = engine.layout(&request);
					if tx.send(WorkerEvent::LayoutDone { ticket, result }).is_err() {
						break;
					}
				}
			}));

			let (bundles, requests) = mpsc::channel::<(Ticket, BundlingRequest)>();
			let bundling = config.bundling.clone();
			let tx = event_tx;
			threads.push(thread::spawn(move || {
				for (ticket, request) in requests {
					let result = bundle_edges(&request, &bundling);
					if tx.send(WorkerEvent::BundlingDone { ticket, result }).is_err() {
						break;
					}
				}
			}));

			Self {
				simulation: Some(simulation),
				layouts: Some(layouts),
				bundles: Some(bundles),
				events,
				undelivered: Vec::new(),
				threads,
			}
		}
	}

	fn run_simulation(
		mut worker: SimulationWorker,
		commands: Receiver<SimulationCommand>,
		events: Sender<WorkerEvent>,
		tick: Duration,
	) {
		loop {
			// Idle workers block until the next command instead of spinning.
			let wait = if worker.is_hot() { tick } else { Duration::from_secs(3600) };
			let command = match commands.recv_timeout(wait) {
				Ok(command) => Some(command),
				Err(RecvTimeoutError::Timeout) => None,
				Err(RecvTimeoutError::Disconnected) => break,
			};
			let mut outgoing = Vec::new();
			if let Some(command) = command {
				outgoing.extend(worker.handle(command));
				while let Ok(command) = commands.try_recv() {
					outgoing.extend(worker.handle(command));
				}
			}
			outgoing.extend(worker.step());
			for event in outgoing {
				if events.send(WorkerEvent::Simulation(event)).is_err() {
					return;
				}
			}
		}
		debug!("simulation worker stopped");
	}

	impl Workers for ThreadWorkers {
		fn post_simulation(&mut self, command: SimulationCommand) {
			let sent = self.simulation.as_ref().is_some_and(|tx| tx.send(command).is_ok());
			if !sent {
				error!("{}", LayoutError::Disconnected("simulation"));
			}
		}

		fn request_layout(&mut self, ticket: Ticket, request: LayoutRequest) {
			let sent = self
				.layouts
				.as_ref()
				.is_some_and(|tx| tx.send((ticket, request)).is_ok());
			if !sent {
				self.undelivered.push(WorkerEvent::LayoutDone {
					ticket,
					result: Err(LayoutError::Disconnected("layout")),
				});
			}
		}

		fn request_bundling(&mut self, ticket: Ticket, request: BundlingRequest) {
			let sent = self
				.bundles
				.as_ref()
				.is_some_and(|tx| tx.send((ticket, request)).is_ok());
			if !sent {
				self.undelivered.push(WorkerEvent::BundlingDone {
					ticket,
					result: Err(LayoutError::Disconnected("bundling")),
				});
			}
		}

		fn poll(&mut self, _dt_ms: f64) -> Vec<WorkerEvent> {
			let mut out = std::mem::take(&mut self.undelivered);
			out.extend(self.events.try_iter());
			out
		}
	}

	impl Drop for ThreadWorkers {
		fn drop(&mut self) {
			// Closing the command channels ends every worker loop.
			self.simulation.take();
			self.layouts.take();
			self.bundles.take();
			for thread in self.threads.drain(..) {
				if thread.join().is_err() {
					error!("a layout worker panicked");
				}
			}
		}
	}
}

/// Logs a failed one-shot job the way every caller reports it.
pub(crate) fn report_failure(kind: &str, ticket: Ticket, err: &LayoutError) {
	error!("{kind} request {ticket} failed: {err}");
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::layout::{EdgeRouting, LayoutEdge, LayoutType, NodePosition};

	fn nodes() -> Vec<NodePosition> {
		vec![NodePosition::new("a", 0.0, 0.0), NodePosition::new("b", 0.0, 0.0)]
	}

	fn links() -> Vec<LayoutEdge> {
		vec![LayoutEdge::new("ab", "a", "b")]
	}

	fn layout_request() -> LayoutRequest {
		LayoutRequest {
			algorithm: LayoutType::Layered,
			routing: EdgeRouting::Orthogonal,
			width: 200.0,
			height: 100.0,
			nodes: nodes(),
			edges: links(),
		}
	}

	#[test]
	fn local_workers_answer_each_ticket_once() {
		let mut workers = LocalWorkers::new(&EditorConfig::default());
		workers.request_layout(7, layout_request());
		workers.request_bundling(
			8,
			BundlingRequest {
				nodes: vec![NodePosition::new("a", 0.0, 0.0), NodePosition::new("b", 50.0, 0.0)],
				links: links(),
			},
		);
		let events = workers.poll(16.0);
		assert!(events.iter().any(|e| matches!(e, WorkerEvent::LayoutDone { ticket: 7, result: Ok(_) })));
		assert!(events.iter().any(|e| matches!(e, WorkerEvent::BundlingDone { ticket: 8, result: Ok(_) })));
		assert!(workers.poll(16.0).is_empty());
		assert!(!workers.is_busy());
	}

	#[test]
	fn local_simulation_ticks_on_poll() {
		let mut workers = LocalWorkers::new(&EditorConfig::default());
		workers.post_simulation(SimulationCommand::StartSimulation {
			nodes: nodes(),
			links: links(),
			width: 200.0,
			height: 100.0,
		});
		let events = workers.poll(16.0);
		assert!(matches!(events.first(), Some(WorkerEvent::Simulation(SimulationEvent::Log { .. }))));
		assert!(events.iter().any(|e| matches!(e, WorkerEvent::Simulation(SimulationEvent::Tick { .. }))));
		assert!(workers.is_busy());
	}

	#[cfg(not(target_arch = "wasm32"))]
	#[test]
	fn threaded_workers_deliver_over_channels() {
		let mut workers = ThreadWorkers::spawn(&EditorConfig::default());
		workers.request_layout(1, layout_request());
		let deadline = std::time::Instant::now() + std::time::Duration::from_secs(10);
		let mut done = None;
		while done.is_none() && std::time::Instant::now() < deadline {
			done = workers
				.poll(16.0)
				.into_iter()
				.find(|e| matches!(e, WorkerEvent::LayoutDone { .. }));
			std::thread::sleep(std::time::Duration::from_millis(5));
		}
		match done {
			Some(WorkerEvent::LayoutDone { ticket, result }) => {
				assert_eq!(ticket, 1);
				assert_eq!(result.unwrap().positions.len(), 2);
			}
			other => panic!("no layout response: {other:?}"),
		}
	}
}
