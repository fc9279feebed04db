//! Viewer Input: high-level actions and the mouse-look filter.
//!
//! # Invariants
//! - Camera and app logic consume actions, never raw window events.
//! - Look deltas are always measured from the window center; the filter
//!   assumes the caller re-centers the cursor after every sample.

pub mod action;
pub mod mouse;

pub use action::ViewerAction;
pub use mouse::MouseLook;
