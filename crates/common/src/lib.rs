//! Shared Types: node ids, GPU resource handles, local transforms.
//!
//! # Invariants
//! - Handles are opaque; only the renderer that issued one may interpret it.
//! - Local-transform composition order is fixed and shared by every consumer.

pub mod types;

pub use types::{MeshHandle, NodeId, TextureHandle, Transform};
