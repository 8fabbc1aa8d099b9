use glam::{Vec3, Vec4};

use crate::camera::{Camera, CameraMotion};
use crate::diagnostics::{Diagnostics, DiagnosticsSink};
use crate::lighting::{Light, DEFAULT_AMBIENT};
use crate::portal::{project_portal_camera, PortalAnchor, PortalView};
use crate::transition::{CameraTransition, TransitionStep, Waypoint};

pub const DEFAULT_TRANSITION_STEPS: u32 = 10;

/// Everything the user asked for this frame.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FrameInput {
    pub motion: CameraMotion,
    pub snap_portal_camera: bool,
    pub toggle_portal: bool,
    pub begin_transition: bool,
    pub dump_diagnostics: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SceneConfig {
    pub viewer: Camera,
    pub portal_camera: Camera,
    pub waypoint: Waypoint,
    pub transition_steps: u32,
    pub light: Light,
    pub ambient: Vec4,
    pub portal_enabled: bool,
}

impl Default for SceneConfig {
    fn default() -> Self {
        let viewer = Camera::default();
        Self {
            viewer,
            portal_camera: viewer.with_pose(Vec3::new(21.0, 2.0, 0.0), Vec3::new(25.0, 2.0, 0.0)),
            waypoint: Waypoint {
                position: Vec3::new(2.75, 2.0, -4.0),
                target: Vec3::new(6.75, 2.0, -4.0),
            },
            transition_steps: DEFAULT_TRANSITION_STEPS,
            light: Light::default(),
            ambient: DEFAULT_AMBIENT,
            portal_enabled: false,
        }
    }
}

/// Result of one frame update, consumed by the renderer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameOutput {
    pub camera: Camera,
    /// Present only while the portal is enabled; the off-screen target keeps
    /// its previous contents otherwise.
    pub portal_view: Option<PortalView>,
    pub portal_enabled: bool,
    pub transition: TransitionStep,
}

#[derive(Debug, Clone)]
pub struct AppState {
    pub camera: Camera,
    pub portal_camera: Camera,
    pub anchor: PortalAnchor,
    pub portal_enabled: bool,
    pub transition: CameraTransition,
    pub light: Light,
    pub ambient: Vec4,
}

impl AppState {
    pub fn new(config: SceneConfig, anchor: PortalAnchor) -> Self {
        Self {
            camera: config.viewer,
            portal_camera: config.portal_camera,
            anchor,
            portal_enabled: config.portal_enabled,
            transition: CameraTransition::new(config.waypoint, config.transition_steps),
            light: config.light,
            ambient: config.ambient,
        }
    }

    /// Portal view rendered once before the first frame, seen from the waypoint.
    pub fn bootstrap_portal_view(&self) -> PortalView {
        let viewer = self.transition.waypoint().to_camera(&self.camera);
        project_portal_camera(&viewer, &self.portal_camera, &self.anchor)
    }

    pub fn portal_view(&self) -> PortalView {
        project_portal_camera(&self.camera, &self.portal_camera, &self.anchor)
    }

    pub fn update<S>(&mut self, input: &FrameInput, sink: &mut S) -> FrameOutput
    where
        S: DiagnosticsSink + ?Sized,
    {
        if !self.transition.is_active() {
            if !input.motion.is_still() {
                self.camera.apply_motion(&input.motion);
            }

            if input.snap_portal_camera {
                self.portal_camera = self.camera;
            }

            if input.toggle_portal {
                self.portal_enabled = !self.portal_enabled;
            }

            if input.begin_transition {
                self.transition.begin(&self.camera);
            }
        }

        let transition = self.transition.step(&mut self.camera);

        if input.dump_diagnostics {
            sink.report(&self.diagnostics());
        }

        FrameOutput {
            camera: self.camera,
            portal_view: self.portal_enabled.then(|| self.portal_view()),
            portal_enabled: self.portal_enabled,
            transition,
        }
    }

    pub fn diagnostics(&self) -> Diagnostics {
        let waypoint = self.transition.waypoint();
        Diagnostics {
            distance_to_portal: self.anchor.distance_to(self.camera.position),
            portal_position: self.anchor.position(),
            camera_position: self.camera.position,
            camera_target: self.camera.target,
            waypoint_position: waypoint.position,
            waypoint_target: waypoint.target,
            portal_camera_position: self.portal_camera.position,
            portal_camera_target: self.portal_camera.target,
        }
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::{AppState, FrameInput, SceneConfig};
    use crate::camera::CameraMotion;
    use crate::diagnostics::Diagnostics;
    use crate::portal::PortalAnchor;
    use crate::transition::TransitionStep;

    fn gallery_state() -> AppState {
        AppState::new(
            SceneConfig::default(),
            PortalAnchor::new(Vec3::new(3.0, 2.0, -5.0)),
        )
    }

    fn busy_input() -> FrameInput {
        FrameInput {
            motion: CameraMotion {
                forward: 0.1,
                right: -0.1,
                yaw: 4.0,
                pitch: -2.5,
                zoom: 2.0,
                ..CameraMotion::default()
            },
            snap_portal_camera: true,
            toggle_portal: true,
            begin_transition: true,
            dump_diagnostics: false,
        }
    }

    fn start_transition(state: &mut AppState) {
        let output = state.update(
            &FrameInput {
                begin_transition: true,
                ..FrameInput::default()
            },
            &mut Vec::<Diagnostics>::new(),
        );
        assert_eq!(output.transition, TransitionStep::Moving);
    }

    #[test]
    fn free_motion_moves_camera_when_idle() {
        let mut state = gallery_state();
        let before = state.camera;
        let input = FrameInput {
            motion: CameraMotion {
                forward: 0.1,
                ..CameraMotion::default()
            },
            ..FrameInput::default()
        };

        let output = state.update(&input, &mut Vec::<Diagnostics>::new());

        assert!((output.camera.position.z - (before.position.z - 0.1)).abs() < 1.0e-6);
        assert_eq!(output.transition, TransitionStep::Idle);
    }

    #[test]
    fn input_is_ignored_while_transitioning() {
        let mut with_input = gallery_state();
        start_transition(&mut with_input);
        let mut without_input = with_input.clone();

        let a = with_input.update(&busy_input(), &mut Vec::<Diagnostics>::new());
        let b = without_input.update(&FrameInput::default(), &mut Vec::<Diagnostics>::new());

        assert_eq!(a, b);
        assert_eq!(with_input.camera, without_input.camera);
        assert_eq!(with_input.portal_camera, without_input.portal_camera);
        assert_eq!(with_input.portal_enabled, without_input.portal_enabled);
        assert_eq!(with_input.transition.state(), without_input.transition.state());
    }

    #[test]
    fn portal_toggle_is_idempotent_and_suppressed_during_transition() {
        let mut state = gallery_state();
        let original = state.portal_enabled;
        let toggle = FrameInput {
            toggle_portal: true,
            ..FrameInput::default()
        };

        state.update(&toggle, &mut Vec::<Diagnostics>::new());
        assert_eq!(state.portal_enabled, !original);
        state.update(&toggle, &mut Vec::<Diagnostics>::new());
        assert_eq!(state.portal_enabled, original);

        start_transition(&mut state);
        state.update(&toggle, &mut Vec::<Diagnostics>::new());
        assert_eq!(state.portal_enabled, original);
    }

    #[test]
    fn transition_begins_and_steps_in_the_same_frame() {
        let mut state = gallery_state();
        let start = state.camera.position;
        start_transition(&mut state);

        let waypoint = *state.transition.waypoint();
        let expected = start + (waypoint.position - start) * (1.0 / 10.0);
        assert_eq!(state.camera.position, expected);

        let mut frames = 1;
        while state.transition.is_active() {
            state.update(&FrameInput::default(), &mut Vec::<Diagnostics>::new());
            frames += 1;
            assert!(frames <= 11);
        }
        assert_eq!(state.camera.position, waypoint.position);
    }

    #[test]
    fn snap_copies_viewer_into_portal_camera() {
        let mut state = gallery_state();
        state.update(
            &FrameInput {
                snap_portal_camera: true,
                ..FrameInput::default()
            },
            &mut Vec::<Diagnostics>::new(),
        );
        assert_eq!(state.portal_camera, state.camera);
    }

    #[test]
    fn portal_view_only_produced_when_enabled() {
        let mut state = gallery_state();
        let output = state.update(&FrameInput::default(), &mut Vec::<Diagnostics>::new());
        assert!(output.portal_view.is_none());

        let output = state.update(
            &FrameInput {
                toggle_portal: true,
                ..FrameInput::default()
            },
            &mut Vec::<Diagnostics>::new(),
        );
        let view = output.portal_view.unwrap();
        let offset = state.camera.position - state.anchor.position();
        assert_eq!(view.camera.position, state.portal_camera.position + offset);
    }

    #[test]
    fn bootstrap_view_is_seen_from_the_waypoint() {
        let state = gallery_state();
        let view = state.bootstrap_portal_view();
        let waypoint = state.transition.waypoint();
        let offset = waypoint.position - state.anchor.position();
        assert_eq!(view.camera.position, state.portal_camera.position + offset);
        assert!(
            (view.camera.target - view.camera.position)
                .distance(waypoint.target - waypoint.position)
                < 1.0e-5
        );
    }

    #[test]
    fn diagnostics_go_to_the_sink_even_mid_transition() {
        let mut state = gallery_state();
        let mut sink: Vec<Diagnostics> = Vec::new();
        let dump = FrameInput {
            dump_diagnostics: true,
            ..FrameInput::default()
        };

        state.update(&dump, &mut sink);
        start_transition(&mut state);
        state.update(&dump, &mut sink);

        assert_eq!(sink.len(), 2);
        assert_eq!(sink[0].portal_position, Vec3::new(3.0, 2.0, -5.0));
        assert_eq!(sink[1].camera_position, state.camera.position);
        assert!((sink[0].distance_to_portal - Vec3::new(3.0, 0.0, -9.0).length()).abs() < 1.0e-5);
    }
}
