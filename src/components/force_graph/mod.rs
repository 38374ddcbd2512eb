//! Canvas front end: the `Renderer` that paints into a 2d context and the Leptos
//! component that drives an `Editor` from browser events.

mod component;
mod render;
mod state;

pub use component::ForceGraphCanvas;
pub use state::CanvasRenderer;
