use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// Errors from loading a viewer config file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Viewer configuration with sensible defaults for every field.
///
/// Historically these values were hard-coded and disagreed between builds
/// (day lengths from one to five seconds per hour were all in circulation),
/// so every one of them is data here. A config file may set any subset;
/// omitted fields keep their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DemoConfig {
    pub window_title: String,
    pub window_width: u32,
    pub window_height: u32,
    /// Distance from the orbit camera to the origin.
    pub orbit_radius: f32,
    /// Degrees of camera rotation per pixel of mouse travel.
    pub mouse_sensitivity: f32,
    /// Wall-clock seconds per simulated hour of the day cycle.
    pub sim_seconds_per_hour: f32,
    /// Distance of the shadow-casting light from the origin.
    pub light_distance: f32,
    /// Slots in the per-frame light list.
    pub light_capacity: usize,
    /// Shadow map is square with this edge length, in texels.
    pub shadow_resolution: u32,
    /// Draw a small emissive marker where the light sits.
    pub show_sun_marker: bool,
    /// Yaw velocity in revolve mode, degrees per second.
    pub revolve_speed: f32,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            window_title: "gnomon".to_string(),
            window_width: 1280,
            window_height: 720,
            orbit_radius: 200.0,
            mouse_sensitivity: 0.2,
            sim_seconds_per_hour: 2.0,
            light_distance: 300.0,
            light_capacity: 3,
            shadow_resolution: 1024,
            show_sun_marker: true,
            revolve_speed: 15.0,
        }
    }
}

impl DemoConfig {
    /// Load a config file. Any field the file omits keeps its default.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&data)?;
        info!(config = %path.display(), "loaded viewer config");
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = DemoConfig::default();
        assert!(config.orbit_radius > 0.0);
        assert!(config.light_capacity >= 1);
        assert!(config.shadow_resolution.is_power_of_two());
        assert!(config.sim_seconds_per_hour > 0.0);
    }

    #[test]
    fn partial_json_keeps_defaults_for_the_rest() {
        let config: DemoConfig =
            serde_json::from_str(r#"{ "sim_seconds_per_hour": 5.0, "light_capacity": 1 }"#)
                .unwrap();
        assert_eq!(config.sim_seconds_per_hour, 5.0);
        assert_eq!(config.light_capacity, 1);
        assert_eq!(config.orbit_radius, DemoConfig::default().orbit_radius);
        assert!(config.show_sun_marker);
    }

    #[test]
    fn empty_object_is_all_defaults() {
        let config: DemoConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, DemoConfig::default());
    }

    #[test]
    fn roundtrips_through_json() {
        let config = DemoConfig {
            revolve_speed: 45.0,
            show_sun_marker: false,
            ..Default::default()
        };
        let text = serde_json::to_string(&config).unwrap();
        let back: DemoConfig = serde_json::from_str(&text).unwrap();
        assert_eq!(config, back);
    }

    #[test]
    fn malformed_json_is_an_error() {
        use std::io::Write;
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(b"{ not json").unwrap();
        tmp.flush().unwrap();
        assert!(DemoConfig::load(tmp.path()).is_err());
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(DemoConfig::load("no/such/config.json").is_err());
    }
}
