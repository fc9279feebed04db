//! Developer Tooling: scene inspector and node diagnostics.
//!
//! # Invariants
//! - Tooling reads scene state; it never mutates it.

pub mod inspector;

pub use inspector::{NodeInfo, SceneInspector, SceneSummary};
