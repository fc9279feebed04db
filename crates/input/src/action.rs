/// A high-level action produced by the desktop input layer.
///
/// The camera and app logic consume actions, never raw window events, so
/// key bindings stay in one place.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ViewerAction {
    /// Filtered mouse-look delta, in degrees of camera rotation.
    Look { delta_yaw: f32, delta_pitch: f32 },
    /// Switch between manual orbit and auto-revolve.
    ToggleRevolve,
    /// Show or hide the diagnostics overlay.
    ToggleOverlay,
    /// Release the cursor from mouse-look capture.
    ReleaseCursor,
    /// Re-capture the cursor for mouse-look.
    CaptureCursor,
    /// Unbound input.
    Noop,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn look_carries_deltas() {
        let a = ViewerAction::Look {
            delta_yaw: 1.5,
            delta_pitch: -0.5,
        };
        assert!(matches!(a, ViewerAction::Look { .. }));
    }

    #[test]
    fn toggles_are_distinct() {
        assert_ne!(ViewerAction::ToggleRevolve, ViewerAction::ToggleOverlay);
        assert!(matches!(ViewerAction::Noop, ViewerAction::Noop));
    }

    #[test]
    fn cursor_actions_are_constructible() {
        assert!(matches!(ViewerAction::ReleaseCursor, ViewerAction::ReleaseCursor));
        assert!(matches!(ViewerAction::CaptureCursor, ViewerAction::CaptureCursor));
    }
}
