use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use glam::Vec3;
use serde::{Deserialize, Serialize};
use tracing::warn;
use vista_core::camera::Camera;
use vista_core::state::SceneConfig;
use vista_core::transition::Waypoint;

pub const SETTINGS_PATH: &str = "settings.toml";

const MIN_WINDOW_DIMENSION: u32 = 320;
const MAX_WINDOW_DIMENSION: u32 = 7680;
const MIN_TARGET_FPS: u32 = 15;
const MAX_TARGET_FPS: u32 = 240;
const MIN_FOVY: f32 = 20.0;
const MAX_FOVY: f32 = 120.0;
const MIN_MODEL_SCALE: f32 = 0.01;
const MAX_MODEL_SCALE: f32 = 1000.0;
const MIN_MOVE_SPEED: f32 = 0.01;
const MAX_MOVE_SPEED: f32 = 5.0;
const MIN_LOOK_SENSITIVITY: f32 = 0.005;
const MAX_LOOK_SENSITIVITY: f32 = 1.0;
const MIN_ZOOM_SPEED: f32 = 0.0;
const MAX_ZOOM_SPEED: f32 = 20.0;
const MIN_TRANSITION_STEPS: u32 = 1;
const MAX_TRANSITION_STEPS: u32 = 600;
const MIN_POSE_SEPARATION: f32 = 0.001;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_window_width")]
    pub window_width: u32,
    #[serde(default = "default_window_height")]
    pub window_height: u32,
    #[serde(default = "default_target_fps")]
    pub target_fps: u32,
    #[serde(default = "default_gallery_model")]
    pub gallery_model: PathBuf,
    #[serde(default = "default_island_model")]
    pub island_model: PathBuf,
    #[serde(default = "default_model_scale")]
    pub gallery_scale: f32,
    #[serde(default = "default_model_scale")]
    pub island_scale: f32,
    /// Model-space translation applied to the island before scaling.
    #[serde(default = "default_island_offset")]
    pub island_offset: [f32; 3],
    #[serde(default = "default_portal_material_index")]
    pub portal_material_index: usize,
    #[serde(default = "default_fovy")]
    pub fovy: f32,
    #[serde(default = "default_move_speed")]
    pub move_speed: f32,
    #[serde(default = "default_look_sensitivity")]
    pub look_sensitivity: f32,
    #[serde(default = "default_zoom_speed")]
    pub zoom_speed: f32,
    #[serde(default = "default_transition_steps")]
    pub transition_steps: u32,
    #[serde(default = "default_camera_position")]
    pub camera_position: [f32; 3],
    #[serde(default = "default_camera_target")]
    pub camera_target: [f32; 3],
    #[serde(default = "default_island_camera_position")]
    pub island_camera_position: [f32; 3],
    #[serde(default = "default_island_camera_target")]
    pub island_camera_target: [f32; 3],
    #[serde(default = "default_waypoint_position")]
    pub waypoint_position: [f32; 3],
    #[serde(default = "default_waypoint_target")]
    pub waypoint_target: [f32; 3],
    #[serde(default)]
    pub start_with_portal: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            window_width: default_window_width(),
            window_height: default_window_height(),
            target_fps: default_target_fps(),
            gallery_model: default_gallery_model(),
            island_model: default_island_model(),
            gallery_scale: default_model_scale(),
            island_scale: default_model_scale(),
            island_offset: default_island_offset(),
            portal_material_index: default_portal_material_index(),
            fovy: default_fovy(),
            move_speed: default_move_speed(),
            look_sensitivity: default_look_sensitivity(),
            zoom_speed: default_zoom_speed(),
            transition_steps: default_transition_steps(),
            camera_position: default_camera_position(),
            camera_target: default_camera_target(),
            island_camera_position: default_island_camera_position(),
            island_camera_target: default_island_camera_target(),
            waypoint_position: default_waypoint_position(),
            waypoint_target: default_waypoint_target(),
            start_with_portal: false,
        }
    }
}

impl Settings {
    pub fn sanitize(mut self) -> Self {
        self.window_width = self
            .window_width
            .clamp(MIN_WINDOW_DIMENSION, MAX_WINDOW_DIMENSION);
        self.window_height = self
            .window_height
            .clamp(MIN_WINDOW_DIMENSION, MAX_WINDOW_DIMENSION);
        self.target_fps = self.target_fps.clamp(MIN_TARGET_FPS, MAX_TARGET_FPS);
        self.gallery_scale = clamp_finite(
            self.gallery_scale,
            MIN_MODEL_SCALE,
            MAX_MODEL_SCALE,
            default_model_scale(),
        );
        self.island_scale = clamp_finite(
            self.island_scale,
            MIN_MODEL_SCALE,
            MAX_MODEL_SCALE,
            default_model_scale(),
        );
        self.fovy = clamp_finite(self.fovy, MIN_FOVY, MAX_FOVY, default_fovy());
        self.move_speed = clamp_finite(
            self.move_speed,
            MIN_MOVE_SPEED,
            MAX_MOVE_SPEED,
            default_move_speed(),
        );
        self.look_sensitivity = clamp_finite(
            self.look_sensitivity,
            MIN_LOOK_SENSITIVITY,
            MAX_LOOK_SENSITIVITY,
            default_look_sensitivity(),
        );
        self.zoom_speed = clamp_finite(
            self.zoom_speed,
            MIN_ZOOM_SPEED,
            MAX_ZOOM_SPEED,
            default_zoom_speed(),
        );
        self.transition_steps = self
            .transition_steps
            .clamp(MIN_TRANSITION_STEPS, MAX_TRANSITION_STEPS);

        if !self.island_offset.iter().all(|v| v.is_finite()) {
            self.island_offset = default_island_offset();
        }
        (self.camera_position, self.camera_target) = sanitize_pose(
            self.camera_position,
            self.camera_target,
            (default_camera_position(), default_camera_target()),
        );
        (self.island_camera_position, self.island_camera_target) = sanitize_pose(
            self.island_camera_position,
            self.island_camera_target,
            (default_island_camera_position(), default_island_camera_target()),
        );
        (self.waypoint_position, self.waypoint_target) = sanitize_pose(
            self.waypoint_position,
            self.waypoint_target,
            (default_waypoint_position(), default_waypoint_target()),
        );
        self
    }

    pub fn load(path: &Path) -> io::Result<Self> {
        let contents = fs::read_to_string(path)?;
        let parsed = toml::from_str::<Self>(&contents).map_err(|e| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("failed to deserialize settings: {e}"),
            )
        })?;
        Ok(parsed.sanitize())
    }

    pub fn save(&self, path: &Path) -> io::Result<()> {
        let settings = self.clone().sanitize();
        let serialized = toml::to_string_pretty(&settings).map_err(|e| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("failed to serialize settings: {e}"),
            )
        })?;
        fs::write(path, serialized)
    }

    pub fn scene_config(&self) -> SceneConfig {
        let defaults = SceneConfig::default();
        let viewer = Camera {
            fovy: self.fovy,
            ..defaults.viewer
        }
        .with_pose(
            Vec3::from_array(self.camera_position),
            Vec3::from_array(self.camera_target),
        );

        SceneConfig {
            viewer,
            portal_camera: viewer.with_pose(
                Vec3::from_array(self.island_camera_position),
                Vec3::from_array(self.island_camera_target),
            ),
            waypoint: Waypoint {
                position: Vec3::from_array(self.waypoint_position),
                target: Vec3::from_array(self.waypoint_target),
            },
            transition_steps: self.transition_steps,
            portal_enabled: self.start_with_portal,
            ..defaults
        }
    }
}

/// Like `clamp`, but NaN and infinities fall back to `default`.
fn clamp_finite(value: f32, min: f32, max: f32, default: f32) -> f32 {
    if value.is_finite() {
        value.clamp(min, max)
    } else {
        default
    }
}

/// A pose needs finite coordinates and a target apart from the position,
/// otherwise the view matrix is undefined. Both halves reset together.
fn sanitize_pose(
    position: [f32; 3],
    target: [f32; 3],
    defaults: ([f32; 3], [f32; 3]),
) -> ([f32; 3], [f32; 3]) {
    let position_v = Vec3::from_array(position);
    let target_v = Vec3::from_array(target);
    if position_v.is_finite()
        && target_v.is_finite()
        && position_v.distance(target_v) >= MIN_POSE_SEPARATION
    {
        (position, target)
    } else {
        warn!("Ignoring degenerate camera pose {position:?} -> {target:?}");
        defaults
    }
}

fn default_window_width() -> u32 {
    1500
}

fn default_window_height() -> u32 {
    800
}

fn default_target_fps() -> u32 {
    60
}

fn default_gallery_model() -> PathBuf {
    PathBuf::from("resources/gallery2.obj")
}

fn default_island_model() -> PathBuf {
    PathBuf::from("resources/island2.obj")
}

fn default_model_scale() -> f32 {
    10.0
}

fn default_island_offset() -> [f32; 3] {
    [3.0, 0.0, 0.0]
}

fn default_portal_material_index() -> usize {
    4
}

fn default_fovy() -> f32 {
    60.0
}

fn default_move_speed() -> f32 {
    0.1
}

fn default_look_sensitivity() -> f32 {
    0.05
}

fn default_zoom_speed() -> f32 {
    2.0
}

fn default_transition_steps() -> u32 {
    vista_core::state::DEFAULT_TRANSITION_STEPS
}

fn default_camera_position() -> [f32; 3] {
    [0.0, 2.0, 4.0]
}

fn default_camera_target() -> [f32; 3] {
    [0.0, 2.0, 0.0]
}

fn default_island_camera_position() -> [f32; 3] {
    [21.0, 2.0, 0.0]
}

fn default_island_camera_target() -> [f32; 3] {
    [25.0, 2.0, 0.0]
}

fn default_waypoint_position() -> [f32; 3] {
    [2.75, 2.0, -4.0]
}

fn default_waypoint_target() -> [f32; 3] {
    [6.75, 2.0, -4.0]
}

pub fn load_or_create_settings(path: &Path) -> Settings {
    match Settings::load(path) {
        Ok(settings) => settings,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            let settings = Settings::default();
            if let Err(save_err) = settings.save(path) {
                warn!(
                    "Failed to create default settings at {}: {save_err}",
                    path.display()
                );
            }
            settings
        }
        Err(err) => {
            warn!("Failed to load settings from {}: {err}", path.display());
            let settings = Settings::default();
            if let Err(save_err) = settings.save(path) {
                warn!(
                    "Failed to overwrite settings at {}: {save_err}",
                    path.display()
                );
            }
            settings
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::PathBuf;
    use std::time::{SystemTime, UNIX_EPOCH};

    use glam::Vec3;
    use vista_core::state::SceneConfig;

    use super::{load_or_create_settings, Settings};

    fn temp_settings_path(tag: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        std::env::temp_dir().join(format!(
            "vista-settings-{tag}-{}-{nanos}.toml",
            std::process::id()
        ))
    }

    #[test]
    fn defaults_reproduce_the_gallery_scene() {
        let config = Settings::default().scene_config();
        assert_eq!(config, SceneConfig::default());
    }

    #[test]
    fn settings_round_trip_through_toml() {
        let settings = Settings {
            target_fps: 30,
            transition_steps: 25,
            island_camera_position: [10.0, 4.0, -2.0],
            start_with_portal: true,
            ..Settings::default()
        };
        let text = toml::to_string_pretty(&settings).unwrap();
        let parsed: Settings = toml::from_str(&text).unwrap();
        assert_eq!(parsed, settings);

        let config = parsed.scene_config();
        assert_eq!(config.portal_camera.position, Vec3::new(10.0, 4.0, -2.0));
        assert_eq!(config.transition_steps, 25);
        assert!(config.portal_enabled);
    }

    #[test]
    fn missing_fields_take_defaults() {
        let parsed: Settings = toml::from_str("move_speed = 0.25\n").unwrap();
        assert_eq!(parsed.move_speed, 0.25);
        assert_eq!(parsed.window_width, 1500);
        assert_eq!(parsed.portal_material_index, 4);
        assert_eq!(parsed.waypoint_target, [6.75, 2.0, -4.0]);
    }

    #[test]
    fn sanitize_clamps_out_of_range_values() {
        let settings = Settings {
            window_width: 1,
            target_fps: 10_000,
            fovy: 179.0,
            transition_steps: 0,
            look_sensitivity: -1.0,
            ..Settings::default()
        }
        .sanitize();

        assert_eq!(settings.window_width, 320);
        assert_eq!(settings.target_fps, 240);
        assert_eq!(settings.fovy, 120.0);
        assert_eq!(settings.transition_steps, 1);
        assert_eq!(settings.look_sensitivity, 0.005);
    }

    #[test]
    fn sanitize_replaces_nan_and_degenerate_poses() {
        let settings = Settings {
            fovy: f32::NAN,
            move_speed: f32::INFINITY,
            gallery_scale: f32::NAN,
            island_offset: [0.0, f32::NAN, 0.0],
            camera_position: [1.0, 2.0, 3.0],
            camera_target: [1.0, 2.0, 3.0],
            island_camera_position: [f32::NAN, 2.0, 0.0],
            waypoint_target: [f32::NEG_INFINITY, 0.0, 0.0],
            ..Settings::default()
        }
        .sanitize();
        let defaults = Settings::default();

        assert_eq!(settings.fovy, defaults.fovy);
        assert_eq!(settings.move_speed, defaults.move_speed);
        assert_eq!(settings.gallery_scale, defaults.gallery_scale);
        assert_eq!(settings.island_offset, defaults.island_offset);
        assert_eq!(settings.camera_position, defaults.camera_position);
        assert_eq!(settings.camera_target, defaults.camera_target);
        assert_eq!(settings.island_camera_position, defaults.island_camera_position);
        assert_eq!(settings.island_camera_target, defaults.island_camera_target);
        assert_eq!(settings.waypoint_position, defaults.waypoint_position);
        assert_eq!(settings.waypoint_target, defaults.waypoint_target);

        let view = settings.scene_config().viewer.view_matrix();
        assert!(view.is_finite());
    }

    #[test]
    fn sanitize_keeps_valid_custom_poses() {
        let settings = Settings {
            camera_position: [5.0, 1.0, 5.0],
            camera_target: [5.0, 1.0, 4.0],
            ..Settings::default()
        }
        .sanitize();
        assert_eq!(settings.camera_position, [5.0, 1.0, 5.0]);
        assert_eq!(settings.camera_target, [5.0, 1.0, 4.0]);
    }

    #[test]
    fn nan_in_settings_file_loads_as_default() {
        let path = temp_settings_path("nan");
        fs::write(&path, "fovy = nan\ncamera_target = [0.0, 2.0, 4.0]\n").unwrap();

        let settings = Settings::load(&path).unwrap();
        assert_eq!(settings.fovy, 60.0);
        assert_eq!(settings.camera_target, [0.0, 2.0, 0.0]);
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn malformed_file_is_replaced_with_defaults() {
        let path = temp_settings_path("malformed");
        fs::write(&path, "window_width = \"wide\"").unwrap();

        let settings = load_or_create_settings(&path);
        assert_eq!(settings, Settings::default());

        let reloaded = Settings::load(&path).unwrap();
        assert_eq!(reloaded, Settings::default());
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn missing_file_is_created() {
        let path = temp_settings_path("missing");
        assert!(!path.exists());

        let settings = load_or_create_settings(&path);
        assert_eq!(settings, Settings::default());
        assert!(path.exists());
        let _ = fs::remove_file(&path);
    }
}
