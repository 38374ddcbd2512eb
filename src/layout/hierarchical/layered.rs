//! Sugiyama-style layering: cycle breaking, longest-path ranks, barycentric ordering
//! and edge routing through the virtual nodes of long edges.

use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;

use super::Topology;
use crate::config::HierarchicalConfig;
use crate::layout::{BendPoints, EdgeRouting, Point};

const ORDERING_SWEEPS: usize = 4;

struct Chain {
	edge_id: String,
	/// Node indices from the upper to the lower rank, virtual nodes included.
	nodes: Vec<usize>,
	reversed: bool,
}

pub(super) fn layout(
	topology: &Topology,
	config: &HierarchicalConfig,
	routing: EdgeRouting,
) -> (Vec<Point>, BendPoints) {
	let n = topology.len();
	let edges: Vec<(usize, usize, String)> = topology
		.graph
		.edge_references()
		.filter(|e| e.source() != e.target())
		.map(|e| (e.source().index(), e.target().index(), e.weight().clone()))
		.collect();

	let reversed = back_edges(n, &edges);
	let oriented: Vec<(usize, usize)> = edges
		.iter()
		.zip(&reversed)
		.map(|(&(s, t, _), &r)| if r { (t, s) } else { (s, t) })
		.collect();
	let rank = longest_path_ranks(n, &oriented);

	// Virtual nodes for every rank a long edge skips.
	let mut node_rank = rank.clone();
	let mut chains = Vec::with_capacity(edges.len());
	for ((_, _, id), (&(u, v), &rev)) in edges.iter().zip(oriented.iter().zip(&reversed)) {
		let mut nodes = vec![u];
		for r in rank[u] + 1..rank[v] {
			node_rank.push(r);
			nodes.push(node_rank.len() - 1);
		}
		nodes.push(v);
		chains.push(Chain {
			edge_id: id.clone(),
			nodes,
			reversed: rev,
		});
	}

	let total = node_rank.len();
	let mut upper = vec![Vec::new(); total];
	let mut lower = vec![Vec::new(); total];
	for chain in &chains {
		for pair in chain.nodes.windows(2) {
			lower[pair[0]].push(pair[1]);
			upper[pair[1]].push(pair[0]);
		}
	}

	let depth = node_rank.iter().copied().max().unwrap_or(0) + 1;
	let mut layers: Vec<Vec<usize>> = vec![Vec::new(); depth];
	for (i, &r) in node_rank.iter().enumerate() {
		layers[r].push(i);
	}
	order_layers(&mut layers, &upper, &lower, total);

	let step_x = config.node_size + config.node_spacing;
	let step_y = config.node_size + config.layer_spacing;
	let mut points = vec![Point::default(); total];
	for (r, layer) in layers.iter().enumerate() {
		let offset = (layer.len() as f64 - 1.0) / 2.0;
		for (k, &i) in layer.iter().enumerate() {
			points[i] = Point::new((k as f64 - offset) * step_x, r as f64 * step_y);
		}
	}

	let mut bends = BendPoints::with_capacity(chains.len());
	for chain in chains {
		let mut route: Vec<Point> = chain.nodes.iter().map(|&i| points[i]).collect();
		if chain.reversed {
			route.reverse();
		}
		bends.insert(chain.edge_id, route_bends(&route, routing));
	}
	points.truncate(n);
	(points, bends)
}

/// Marks the edges a depth-first search finds pointing back onto its own stack.
fn back_edges(n: usize, edges: &[(usize, usize, String)]) -> Vec<bool> {
	#[derive(Clone, Copy, PartialEq)]
	enum Mark {
		New,
		Open,
		Done,
	}
	let mut out = vec![Vec::new(); n];
	for (e, (s, t, _)) in edges.iter().enumerate() {
		out[*s].push((*t, e));
	}
	let mut mark = vec![Mark::New; n];
	let mut reversed = vec![false; edges.len()];
	for root in 0..n {
		if mark[root] != Mark::New {
			continue;
		}
		let mut stack = vec![(root, 0usize)];
		mark[root] = Mark::Open;
		while let Some(top) = stack.last_mut() {
			let node = top.0;
			let next = out[node].get(top.1).copied();
			top.1 += 1;
			match next {
				Some((target, e)) => match mark[target] {
					Mark::New => {
						mark[target] = Mark::Open;
						stack.push((target, 0));
					}
					Mark::Open => reversed[e] = true,
					Mark::Done => {}
				},
				None => {
					mark[node] = Mark::Done;
					stack.pop();
				}
			}
		}
	}
	reversed
}

fn longest_path_ranks(n: usize, oriented: &[(usize, usize)]) -> Vec<usize> {
	let mut dag: DiGraph<(), ()> = DiGraph::with_capacity(n, oriented.len());
	for _ in 0..n {
		dag.add_node(());
	}
	for &(u, v) in oriented {
		dag.add_edge(NodeIndex::new(u), NodeIndex::new(v), ());
	}
	let order: Vec<usize> = match toposort(&dag, None) {
		Ok(order) => order.into_iter().map(|i| i.index()).collect(),
		Err(_) => (0..n).collect(),
	};

	let mut rank = vec![0usize; n];
	for u in order {
		for v in dag.neighbors(NodeIndex::new(u)) {
			rank[v.index()] = rank[v.index()].max(rank[u] + 1);
		}
	}
	rank
}

/// Alternating down and up sweeps, each sorting a layer by the mean position of its
/// neighbours in the layer just fixed.
fn order_layers(layers: &mut [Vec<usize>], upper: &[Vec<usize>], lower: &[Vec<usize>], total: usize) {
	let mut position = vec![0.0_f64; total];
	for layer in layers.iter() {
		record_positions(layer, &mut position);
	}
	for _ in 0..ORDERING_SWEEPS {
		for r in 1..layers.len() {
			sort_by_barycenter(&mut layers[r], upper, &mut position);
		}
		for r in (0..layers.len().saturating_sub(1)).rev() {
			sort_by_barycenter(&mut layers[r], lower, &mut position);
		}
	}
}

fn record_positions(layer: &[usize], position: &mut [f64]) {
	for (k, &i) in layer.iter().enumerate() {
		position[i] = k as f64;
	}
}

fn sort_by_barycenter(layer: &mut Vec<usize>, adjacent: &[Vec<usize>], position: &mut [f64]) {
	let mut keyed: Vec<(usize, f64)> = layer
		.iter()
		.map(|&i| {
			let neighbours = &adjacent[i];
			let key = if neighbours.is_empty() {
				position[i]
			} else {
				neighbours.iter().map(|&j| position[j]).sum::<f64>() / neighbours.len() as f64
			};
			(i, key)
		})
		.collect();
	keyed.sort_by(|a, b| a.1.total_cmp(&b.1));
	*layer = keyed.into_iter().map(|(i, _)| i).collect();
	record_positions(layer, position);
}

/// Interior points of a route. Orthogonal routes turn at the midpoint between ranks.
fn route_bends(route: &[Point], routing: EdgeRouting) -> Vec<Point> {
	match routing {
		EdgeRouting::Polyline => route[1..route.len() - 1].to_vec(),
		EdgeRouting::Orthogonal => {
			let mut bends = Vec::new();
			for (k, pair) in route.windows(2).enumerate() {
				let (a, b) = (pair[0], pair[1]);
				if a.x != b.x {
					let mid = (a.y + b.y) / 2.0;
					bends.push(Point::new(a.x, mid));
					bends.push(Point::new(b.x, mid));
				}
				if k + 2 < route.len() {
					bends.push(b);
				}
			}
			bends
		}
	}
}
