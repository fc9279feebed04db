//! Scene Graph: arena of nodes, transform propagation, light extraction.
//!
//! # Invariants
//! - Nodes form a rooted tree; every non-root node has exactly one parent.
//! - Node matrices are derived per frame; they are stale until the frame's
//!   propagation pass has run.
//! - The light list is rewritten from scratch by every propagation pass.

pub mod graph;
pub mod node;

pub use graph::{LightBuffer, LightSource, SceneGraph};
pub use node::{MeshRef, NodeKind, SceneNode};
