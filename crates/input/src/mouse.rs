use glam::Vec2;

/// Stateful mouse-look filter.
///
/// Raw cursor samples arrive in window coordinates. Each sample yields a
/// look delta measured from the last sample, scaled by sensitivity; the
/// caller then warps the cursor back to the window center, and the filter
/// records the center as the new reference. Deltas are therefore always
/// relative to center once the first sample has been consumed.
#[derive(Debug, Clone)]
pub struct MouseLook {
    sensitivity: f32,
    last_sample: Option<Vec2>,
}

impl MouseLook {
    pub fn new(sensitivity: f32) -> Self {
        Self {
            sensitivity,
            last_sample: None,
        }
    }

    /// Consume one raw cursor sample and return `(delta_yaw, delta_pitch)`
    /// in degrees. `center` is the point the caller will warp the cursor to
    /// after this call.
    pub fn sample(&mut self, position: Vec2, center: Vec2) -> (f32, f32) {
        let reference = self.last_sample.unwrap_or(center);
        let delta = position - reference;
        self.last_sample = Some(center);
        (self.sensitivity * delta.x, self.sensitivity * delta.y)
    }

    /// Forget the reference point. Called when capture is released, so a
    /// re-capture does not see a huge stale delta.
    pub fn reset(&mut self) {
        self.last_sample = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CENTER: Vec2 = Vec2::new(640.0, 360.0);

    #[test]
    fn first_sample_is_measured_from_center() {
        let mut filter = MouseLook::new(0.2);
        let (dy, dp) = filter.sample(Vec2::new(650.0, 355.0), CENTER);
        assert!((dy - 2.0).abs() < 1e-5);
        assert!((dp + 1.0).abs() < 1e-5);
    }

    #[test]
    fn recentered_cursor_keeps_deltas_relative() {
        let mut filter = MouseLook::new(0.2);
        filter.sample(Vec2::new(650.0, 360.0), CENTER);
        // Cursor was warped back to center; an identical offset produces an
        // identical delta instead of accumulating.
        let (dy, _) = filter.sample(Vec2::new(650.0, 360.0), CENTER);
        assert!((dy - 2.0).abs() < 1e-5);
    }

    #[test]
    fn motionless_cursor_yields_zero_delta() {
        let mut filter = MouseLook::new(0.2);
        filter.sample(Vec2::new(700.0, 400.0), CENTER);
        let (dy, dp) = filter.sample(CENTER, CENTER);
        assert_eq!((dy, dp), (0.0, 0.0));
    }

    #[test]
    fn reset_swallows_the_next_jump() {
        let mut filter = MouseLook::new(0.2);
        filter.sample(Vec2::new(660.0, 380.0), CENTER);
        filter.reset();
        // Cursor re-enters far from center; the first post-reset sample is
        // measured from center, same as a fresh filter.
        let (dy, dp) = filter.sample(Vec2::new(645.0, 365.0), CENTER);
        assert!((dy - 1.0).abs() < 1e-5);
        assert!((dp - 1.0).abs() < 1e-5);
    }

    #[test]
    fn sensitivity_scales_linearly() {
        let mut slow = MouseLook::new(0.1);
        let mut fast = MouseLook::new(0.4);
        let sample = Vec2::new(660.0, 360.0);
        let (slow_dy, _) = slow.sample(sample, CENTER);
        let (fast_dy, _) = fast.sample(sample, CENTER);
        assert!((fast_dy - 4.0 * slow_dy).abs() < 1e-5);
    }
}
