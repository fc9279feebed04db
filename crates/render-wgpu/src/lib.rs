//! wgpu render backend for the scene graph demo.
//!
//! Three pipelines run per frame in fixed order: a depth-only shadow pass
//! from the directional light, a shaded color pass from the orbit camera
//! that samples the shadow map, and a fullscreen sky pass drawn last.
//!
//! # Invariants
//! - The renderer never mutates the scene graph; node matrices are read
//!   as the propagation pass left them.
//! - The shadow map is fully written before the color pass binds it; both
//!   passes live in one command encoder, in order.
//! - GPU resources live for the process lifetime; nothing is evicted.

mod gpu;
mod shaders;

pub use gpu::{collect_draws, DrawItem, SceneRenderer, MAX_LIGHTS};
