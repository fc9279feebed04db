//! Frame State: orbit camera, day cycle, shadow frustum, viewer config.
//!
//! # Invariants
//! - Frame state is explicit; nothing here lives in ambient globals.
//! - A [`FrameContext`] is rebuilt from scratch every frame and is the only
//!   path by which camera and sun state reach a render backend.
//! - Backends consume this crate; it knows nothing about any GPU API.

pub mod camera;
pub mod config;
pub mod daycycle;
pub mod frame;

pub use camera::{OrbitCamera, OrbitMode};
pub use config::{ConfigError, DemoConfig};
pub use daycycle::{DayCycle, SunState};
pub use frame::{light_space_matrix, FrameContext};
