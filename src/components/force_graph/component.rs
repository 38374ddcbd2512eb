use std::cell::RefCell;
use std::rc::Rc;

use leptos::prelude::*;
use log::{error, info};
use wasm_bindgen::prelude::*;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, MouseEvent, WheelEvent, Window};

use super::render;
use super::state::{CanvasRenderer, DragState};
use crate::config::EditorConfig;
use crate::editor::Editor;
use crate::graph::GraphData;
use crate::layout::{EdgeLayout, LayoutType, LocalWorkers, Point};
use crate::renderer::Renderer;
use crate::settings::FirstChoice;

type CanvasEditor = Editor<CanvasRenderer, LocalWorkers>;
type Shared<T> = Rc<RefCell<Option<T>>>;

const FRAME_MS: f64 = 16.0;

fn window_size(window: &Window) -> Option<(f64, f64)> {
	Some((
		window.inner_width().ok()?.as_f64()?,
		window.inner_height().ok()?.as_f64()?,
	))
}

/// Pointer position relative to the canvas.
fn canvas_position(canvas_ref: NodeRef<leptos::html::Canvas>, ev: &MouseEvent) -> Option<(f64, f64)> {
	let canvas: HtmlCanvasElement = canvas_ref.get()?.into();
	let rect = canvas.get_bounding_client_rect();
	Some((
		ev.client_x() as f64 - rect.left(),
		ev.client_y() as f64 - rect.top(),
	))
}

/// Opens the current scene as an SVG document in a new tab.
fn open_svg(svg: &str) {
	let Some(window) = web_sys::window() else {
		return;
	};
	let encoded = String::from(js_sys::encode_uri_component(svg));
	let url = format!("data:image/svg+xml;charset=utf-8,{encoded}");
	if window.open_with_url(&url).is_err() {
		error!("could not open the exported image");
	}
}

#[component]
pub fn ForceGraphCanvas(
	#[prop(into)] data: Signal<GraphData>,
	#[prop(into)] layout: Signal<LayoutType>,
	#[prop(into)] edge_layout: Signal<EdgeLayout>,
	/// Name of a guideline to apply; each new value applies once.
	#[prop(into, optional)]
	guideline: Signal<Option<String>>,
	/// Bumping the counter exports the scene as SVG.
	#[prop(into, optional)]
	export: Signal<usize>,
	/// Receives guideline names, best match first, after every import.
	#[prop(optional)]
	on_guidelines: Option<Callback<Vec<String>>>,
	#[prop(default = false)] fullscreen: bool,
	#[prop(default = None)] width: Option<f64>,
	#[prop(default = None)] height: Option<f64>,
) -> impl IntoView {
	let canvas_ref = NodeRef::<leptos::html::Canvas>::new();
	let editor: Shared<CanvasEditor> = Rc::new(RefCell::new(None));
	let animate: Shared<Closure<dyn FnMut()>> = Rc::new(RefCell::new(None));
	let resize_cb: Shared<Closure<dyn FnMut()>> = Rc::new(RefCell::new(None));

	let report_guidelines = move |editor: &CanvasEditor| {
		if let Some(callback) = on_guidelines {
			callback.run(editor.guidelines().iter().map(|g| g.name.clone()).collect());
		}
	};

	let (editor_init, animate_init, resize_cb_init) =
		(editor.clone(), animate.clone(), resize_cb.clone());
	Effect::new(move |_| {
		let Some(canvas) = canvas_ref.get() else {
			return;
		};
		let canvas: HtmlCanvasElement = canvas.into();
		let Some(window) = web_sys::window() else {
			return;
		};

		let (w, h) = if fullscreen {
			window_size(&window).unwrap_or((800.0, 600.0))
		} else {
			let parent = canvas.parent_element();
			(
				width.unwrap_or_else(|| parent.as_ref().map_or(800.0, |p| p.client_width() as f64)),
				height.unwrap_or_else(|| parent.as_ref().map_or(600.0, |p| p.client_height() as f64)),
			)
		};
		canvas.set_width(w as u32);
		canvas.set_height(h as u32);

		let Some(ctx) = canvas
			.get_context("2d")
			.ok()
			.flatten()
			.and_then(|ctx| ctx.dyn_into::<CanvasRenderingContext2d>().ok())
		else {
			error!("canvas has no 2d context");
			return;
		};

		let config = EditorConfig::default();
		let workers = LocalWorkers::new(&config);
		let mut created = match Editor::new(CanvasRenderer::new(w, h), workers, config, w, h) {
			Ok(editor) => editor,
			Err(err) => {
				error!("editor failed to start: {err}");
				return;
			}
		};
		if let Err(err) = created.import_data(data.get_untracked()) {
			error!("graph import failed: {err}");
		}
		let (initial_layout, initial_edges) = (layout.get_untracked(), edge_layout.get_untracked());
		let live = &created.settings().layout;
		if live.layout.value != initial_layout || live.edge_type.value != initial_edges {
			created.set_layout(initial_layout, initial_edges);
		}
		report_guidelines(&created);
		*editor_init.borrow_mut() = Some(created);

		if fullscreen {
			let (editor_resize, canvas_resize) = (editor_init.clone(), canvas.clone());
			*resize_cb_init.borrow_mut() = Some(Closure::new(move || {
				let Some((nw, nh)) = web_sys::window().as_ref().and_then(window_size) else {
					return;
				};
				canvas_resize.set_width(nw as u32);
				canvas_resize.set_height(nh as u32);
				if let Some(editor) = editor_resize.borrow_mut().as_mut() {
					editor.resize(nw, nh);
				}
			}));
			if let Some(ref cb) = *resize_cb_init.borrow() {
				let _ =
					window.add_event_listener_with_callback("resize", cb.as_ref().unchecked_ref());
			}
		}

		let (editor_anim, animate_inner) = (editor_init.clone(), animate_init.clone());
		*animate_init.borrow_mut() = Some(Closure::new(move || {
			if let Some(editor) = editor_anim.borrow_mut().as_mut() {
				editor.pump(FRAME_MS);
				let renderer = editor.coordinator_mut().renderer_mut();
				renderer.tick(FRAME_MS / 1000.0);
				render::render(renderer, &ctx);
			}
			if let (Some(window), Some(cb)) = (web_sys::window(), animate_inner.borrow().as_ref()) {
				let _ = window.request_animation_frame(cb.as_ref().unchecked_ref());
			}
		}));
		if let Some(ref cb) = *animate_init.borrow() {
			let _ = window.request_animation_frame(cb.as_ref().unchecked_ref());
		}
	});

	let editor_data = editor.clone();
	Effect::new(move |previous: Option<()>| {
		let graph = data.get();
		// The first run only subscribes; the editor imports the initial graph itself.
		if previous.is_none() {
			return;
		}
		if let Some(editor) = editor_data.borrow_mut().as_mut() {
			match editor.import_data(graph) {
				Ok(()) => report_guidelines(editor),
				Err(err) => error!("graph import failed: {err}"),
			}
		}
	});

	let editor_layout = editor.clone();
	Effect::new(move |_| {
		let (layout, edge_layout) = (layout.get(), edge_layout.get());
		if let Some(editor) = editor_layout.borrow_mut().as_mut() {
			let live = &editor.settings().layout;
			if live.layout.value != layout || live.edge_type.value != edge_layout {
				editor.set_layout(layout, edge_layout);
			}
		}
	});

	let editor_guideline = editor.clone();
	Effect::new(move |_| {
		let Some(name) = guideline.get() else {
			return;
		};
		if let Some(editor) = editor_guideline.borrow_mut().as_mut() {
			let Some(index) = editor.guidelines().iter().position(|g| g.name == name) else {
				error!("unknown guideline {name}");
				return;
			};
			match editor.apply_guideline(index, &mut FirstChoice) {
				Ok(()) => info!("applied guideline {name}"),
				Err(err) => error!("guideline {name} failed: {err}"),
			}
		}
	});

	let editor_export = editor.clone();
	Effect::new(move |_| {
		if export.get() == 0 {
			return;
		}
		if let Some(editor) = editor_export.borrow().as_ref() {
			open_svg(&editor.export_image());
		}
	});

	let editor_md = editor.clone();
	let on_mousedown = move |ev: MouseEvent| {
		let Some((x, y)) = canvas_position(canvas_ref, &ev) else {
			return;
		};
		if let Some(editor) = editor_md.borrow_mut().as_mut() {
			let hit = editor.coordinator().renderer().node_at_position(x, y);
			let coordinator = editor.coordinator_mut();
			match hit {
				Some(id) if coordinator.drag_start(&id) => {
					coordinator.renderer_mut().drag = DragState {
						active: true,
						node_id: Some(id),
					};
				}
				_ => coordinator.renderer_mut().start_pan(x, y),
			}
		}
	};

	let editor_mm = editor.clone();
	let on_mousemove = move |ev: MouseEvent| {
		let Some((x, y)) = canvas_position(canvas_ref, &ev) else {
			return;
		};
		if let Some(editor) = editor_mm.borrow_mut().as_mut() {
			if editor.coordinator().renderer().drag.active {
				let position = editor.coordinator().renderer().screen_to_graph(x, y);
				editor.coordinator_mut().drag_move(position);
				return;
			}
			let hovered = editor.coordinator().renderer().node_at_position(x, y);
			editor.hover(hovered.clone());
			let renderer = editor.coordinator_mut().renderer_mut();
			renderer.set_hover(hovered);
			renderer.pan_to(x, y);
		}
	};

	let editor_mu = editor.clone();
	let on_mouseup = move |_: MouseEvent| {
		if let Some(editor) = editor_mu.borrow_mut().as_mut() {
			if editor.coordinator().renderer().drag.active {
				editor.coordinator_mut().drag_end();
			}
			editor.coordinator_mut().renderer_mut().release();
		}
	};

	let editor_ml = editor.clone();
	let on_mouseleave = move |_: MouseEvent| {
		if let Some(editor) = editor_ml.borrow_mut().as_mut() {
			if editor.coordinator().renderer().drag.active {
				editor.coordinator_mut().drag_end();
			}
			editor.hover(None);
			let renderer = editor.coordinator_mut().renderer_mut();
			renderer.release();
			renderer.set_hover(None);
		}
	};

	let editor_wh = editor.clone();
	let on_wheel = move |ev: WheelEvent| {
		ev.prevent_default();
		let Some((x, y)) = canvas_position(canvas_ref, &ev) else {
			return;
		};
		if let Some(editor) = editor_wh.borrow_mut().as_mut() {
			let renderer = editor.coordinator_mut().renderer_mut();
			let factor = if ev.delta_y() > 0.0 { 0.9 } else { 1.1 };
			let transform = renderer.transform().zoom_at(Point::new(x, y), factor);
			renderer.zoom(transform);
		}
	};

	let editor_dc = editor.clone();
	let on_dblclick = move |_: MouseEvent| {
		if let Some(editor) = editor_dc.borrow_mut().as_mut() {
			editor.coordinator_mut().renderer_mut().reset_zoom();
		}
	};

	view! {
		<canvas
			node_ref=canvas_ref
			class="force-graph-canvas"
			on:mousedown=on_mousedown
			on:mousemove=on_mousemove
			on:mouseup=on_mouseup
			on:mouseleave=on_mouseleave
			on:wheel=on_wheel
			on:dblclick=on_dblclick
			style="display: block; cursor: grab;"
		/>
	}
}
