use glam::Vec3;

/// Radius of the circle the sun traces, before normalization.
const SUN_ORBIT_RADIUS: f32 = 3.0;
/// Constant offset of the sun's circle along Z, so the orbit plane is
/// tilted off the world axes.
const SUN_PLANE_OFFSET: f32 = 1.0;

/// Sun state derived from simulated time, rebuilt every frame.
///
/// `sun_dir` is the direction sunlight travels, so the shadow-casting
/// light sits at `-sun_dir * light_distance` and surfaces facing
/// `-sun_dir` are lit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SunState {
    pub sun_dir: Vec3,
    /// World position of the shadow-casting light.
    pub light_position: Vec3,
    /// 0 at night, 1 in full daylight, smooth across dawn and dusk.
    pub day_factor: f32,
}

/// Wall-clock driven day/night cycle.
///
/// One simulated hour passes every `seconds_per_hour` wall seconds; a full
/// day is 24 simulated hours. The constant is configuration, not a fixed
/// value.
#[derive(Debug, Clone)]
pub struct DayCycle {
    seconds_per_hour: f32,
    light_distance: f32,
    elapsed: f64,
}

impl DayCycle {
    pub fn new(seconds_per_hour: f32, light_distance: f32) -> Self {
        Self {
            seconds_per_hour,
            light_distance,
            elapsed: 0.0,
        }
    }

    /// Advance simulated time by a frame delta, in seconds.
    pub fn advance(&mut self, dt: f64) {
        self.elapsed += dt;
    }

    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    /// Length of a full simulated day in wall seconds.
    pub fn full_day(&self) -> f64 {
        24.0 * self.seconds_per_hour as f64
    }

    /// Fraction of the current day in `[0, 1)`.
    pub fn day_progress(&self) -> f32 {
        (self.elapsed.rem_euclid(self.full_day()) / self.full_day()) as f32
    }

    /// Sun direction, light position, and daylight factor for this instant.
    pub fn sun_state(&self) -> SunState {
        let theta = 2.0 * std::f32::consts::PI * self.day_progress();
        let circle = Vec3::new(
            SUN_ORBIT_RADIUS * theta.cos(),
            SUN_ORBIT_RADIUS * theta.sin(),
            SUN_PLANE_OFFSET,
        );
        let sun_dir = circle.normalize();
        // Visible sun elevation is -sun_dir.y; daylight ramps in across a
        // band around the horizon.
        let day_factor = (-sun_dir.y * 2.0 + 0.5).clamp(0.0, 1.0);
        SunState {
            sun_dir,
            light_position: -sun_dir * self.light_distance,
            day_factor,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_wraps_modulo_full_day() {
        let mut cycle = DayCycle::new(1.0, 300.0);
        assert_eq!(cycle.full_day(), 24.0);
        cycle.advance(30.0); // 1.25 days
        assert!((cycle.day_progress() - 0.25).abs() < 1e-6);
    }

    #[test]
    fn day_start_sun_lies_on_the_tilted_circle() {
        let cycle = DayCycle::new(2.0, 300.0);
        let sun = cycle.sun_state();
        let expected = Vec3::new(3.0, 0.0, 1.0).normalize();
        assert!((sun.sun_dir - expected).length() < 1e-5);
        assert!((sun.light_position - (-expected * 300.0)).length() < 1e-3);
    }

    #[test]
    fn light_sits_opposite_the_sun_direction() {
        let mut cycle = DayCycle::new(1.0, 300.0);
        cycle.advance(6.0); // quarter day
        let sun = cycle.sun_state();
        assert!((sun.light_position.normalize() + sun.sun_dir).length() < 1e-5);
        assert!((sun.light_position.length() - 300.0).abs() < 1e-2);
    }

    #[test]
    fn day_factor_peaks_when_visible_sun_is_high() {
        let mut cycle = DayCycle::new(1.0, 300.0);
        cycle.advance(18.0); // three-quarter day: sun_dir.y most negative
        let high = cycle.sun_state();
        assert_eq!(high.day_factor, 1.0);

        let mut midnight = DayCycle::new(1.0, 300.0);
        midnight.advance(6.0);
        assert_eq!(midnight.sun_state().day_factor, 0.0);
    }

    #[test]
    fn day_factor_is_smooth_near_horizon() {
        // Just past sunrise: elevation small but positive.
        let mut cycle = DayCycle::new(24.0, 300.0);
        cycle.advance(0.5 * 24.0 * 24.0 + 10.0);
        let f = cycle.sun_state().day_factor;
        assert!(f > 0.0 && f < 1.0, "expected twilight, got {f}");
    }

    #[test]
    fn sun_direction_is_unit_length() {
        let mut cycle = DayCycle::new(3.0, 300.0);
        for step in 0..48 {
            cycle.advance(1.5);
            let sun = cycle.sun_state();
            assert!(
                (sun.sun_dir.length() - 1.0).abs() < 1e-5,
                "step {step}: {:?}",
                sun.sun_dir
            );
        }
    }
}
