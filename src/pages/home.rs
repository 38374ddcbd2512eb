use leptos::prelude::*;

use crate::components::force_graph::ForceGraphCanvas;
use crate::graph::sample::generate_sample_data;
use crate::layout::{EdgeLayout, LayoutType};

const EDGE_LAYOUTS: [EdgeLayout; 3] = [EdgeLayout::Straight, EdgeLayout::Orthogonal, EdgeLayout::Bundled];

/// Default Home Page
#[component]
pub fn Home() -> impl IntoView {
	let (node_count, set_node_count) = signal(100usize);
	let graph_data = Signal::derive(move || {
		let n = node_count.get();
		generate_sample_data(n, n + n / 2)
	});

	let (layout, set_layout) = signal(LayoutType::ForceGraph);
	let (edge_layout, set_edge_layout) = signal(EdgeLayout::Straight);
	let (guideline, set_guideline) = signal(None::<String>);
	let (export, set_export) = signal(0usize);
	let (guidelines, set_guidelines) = signal(Vec::<String>::new());

	view! {
		<ErrorBoundary fallback=|errors| {
			view! {
				<h1>"Uh oh! Something went wrong!"</h1>

				<p>"Errors: "</p>
				<ul>
					{move || {
						errors
							.get()
							.into_iter()
							.map(|(_, e)| view! { <li>{e.to_string()}</li> })
							.collect_view()
					}}
				</ul>
			}
		}>

			<div class="fullscreen-graph">
				<ForceGraphCanvas
					data=graph_data
					layout=layout
					edge_layout=edge_layout
					guideline=guideline
					export=export
					on_guidelines=Callback::new(move |names| set_guidelines.set(names))
					fullscreen=true
				/>
				<div class="graph-overlay">
					<h1>"Graph Guidelines"</h1>
					<p class="subtitle">"Drag nodes to reposition. Scroll to zoom. Drag background to pan."</p>

					<label>
						"Nodes "
						<select on:change=move |ev| {
							if let Ok(n) = event_target_value(&ev).parse() {
								set_node_count.set(n);
							}
						}>
							{[25usize, 100, 250, 500]
								.into_iter()
								.map(|n| view! { <option value={n.to_string()} selected={n == 100}>{n}</option> })
								.collect_view()}
						</select>
					</label>

					<label>
						"Layout "
						<select on:change=move |ev| {
							if let Ok(l) = event_target_value(&ev).parse() {
								set_layout.set(l);
							}
						}>
							{LayoutType::ALL
								.into_iter()
								.map(|l| view! { <option value={l.name()}>{l.name()}</option> })
								.collect_view()}
						</select>
					</label>

					<label>
						"Edges "
						<select on:change=move |ev| {
							if let Ok(e) = event_target_value(&ev).parse() {
								set_edge_layout.set(e);
							}
						}>
							{EDGE_LAYOUTS
								.into_iter()
								.map(|e| view! { <option value={e.to_string()}>{e.to_string()}</option> })
								.collect_view()}
						</select>
					</label>

					<button on:click=move |_| set_export.update(|n| *n += 1)>"Export SVG"</button>

					<ul class="guidelines">
						<For each=move || guidelines.get() key=|name| name.clone() let:name>
							<li>
								<button on:click={
									let name = name.clone();
									move |_| set_guideline.set(Some(name.clone()))
								}>{name.clone()}</button>
							</li>
						</For>
					</ul>
				</div>
			</div>
		</ErrorBoundary>
	}
}
