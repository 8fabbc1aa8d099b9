use std::collections::HashSet;

use glam::Vec2;
use vista_core::camera::CameraMotion;
use vista_core::state::FrameInput;
use winit::keyboard::KeyCode;

use crate::settings::Settings;

const FORWARD_KEYS: [KeyCode; 2] = [KeyCode::KeyW, KeyCode::ArrowUp];
const BACK_KEYS: [KeyCode; 2] = [KeyCode::KeyS, KeyCode::ArrowDown];
const RIGHT_KEYS: [KeyCode; 2] = [KeyCode::KeyD, KeyCode::ArrowRight];
const LEFT_KEYS: [KeyCode; 2] = [KeyCode::KeyA, KeyCode::ArrowLeft];

#[derive(Debug, Default)]
pub struct InputState {
    pressed_keys: HashSet<KeyCode>,
    just_pressed: HashSet<KeyCode>,
    pub mouse_delta: Vec2,
    pub scroll: f32,
}

impl InputState {
    /// Key repeats do not count as a fresh press.
    pub fn press_key(&mut self, key: KeyCode) {
        if self.pressed_keys.insert(key) {
            self.just_pressed.insert(key);
        }
    }

    pub fn release_key(&mut self, key: KeyCode) {
        self.pressed_keys.remove(&key);
    }

    pub fn is_pressed(&self, key: KeyCode) -> bool {
        self.pressed_keys.contains(&key)
    }

    pub fn was_just_pressed(&self, key: KeyCode) -> bool {
        self.just_pressed.contains(&key)
    }

    pub fn add_mouse_delta(&mut self, delta: Vec2) {
        self.mouse_delta += delta;
    }

    pub fn add_scroll(&mut self, lines: f32) {
        self.scroll += lines;
    }

    pub fn release_all(&mut self) {
        self.pressed_keys.clear();
        self.clear_frame();
    }

    pub fn clear_frame(&mut self) {
        self.just_pressed.clear();
        self.mouse_delta = Vec2::ZERO;
        self.scroll = 0.0;
    }

    pub fn frame_input(&self, settings: &Settings) -> FrameInput {
        let forward = self.axis(&FORWARD_KEYS, &BACK_KEYS) * settings.move_speed;
        let right = self.axis(&RIGHT_KEYS, &LEFT_KEYS) * settings.move_speed;

        FrameInput {
            motion: CameraMotion {
                forward,
                right,
                yaw: self.mouse_delta.x * settings.look_sensitivity,
                pitch: self.mouse_delta.y * settings.look_sensitivity,
                zoom: self.scroll * settings.zoom_speed,
                ..CameraMotion::default()
            },
            snap_portal_camera: self.was_just_pressed(KeyCode::Space),
            toggle_portal: self.was_just_pressed(KeyCode::KeyP),
            begin_transition: self.was_just_pressed(KeyCode::KeyI),
            dump_diagnostics: self.was_just_pressed(KeyCode::KeyY),
        }
    }

    fn axis(&self, positive: &[KeyCode], negative: &[KeyCode]) -> f32 {
        let held = |keys: &[KeyCode]| keys.iter().any(|key| self.is_pressed(*key));
        match (held(positive), held(negative)) {
            (true, false) => 1.0,
            (false, true) => -1.0,
            _ => 0.0,
        }
    }
}
