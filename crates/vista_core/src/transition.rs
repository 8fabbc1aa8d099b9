use glam::Vec3;

use crate::camera::Camera;

/// Distance from the waypoint at which a transition counts as arrived.
pub const ARRIVAL_EPSILON: f32 = 0.001;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Waypoint {
    pub position: Vec3,
    pub target: Vec3,
}

impl Waypoint {
    pub fn from_camera(camera: &Camera) -> Self {
        Self {
            position: camera.position,
            target: camera.target,
        }
    }

    /// `template` with its pose replaced by this waypoint.
    pub fn to_camera(&self, template: &Camera) -> Camera {
        template.with_pose(self.position, self.target)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TransitionState {
    Idle,
    InProgress {
        start_position: Vec3,
        start_target: Vec3,
        last_distance: f32,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionStep {
    Idle,
    Moving,
    Arrived,
}

/// Moves a camera to a fixed waypoint in `total_steps` equal increments.
///
/// The increment is derived once from the start pose and added every step;
/// it is not recomputed from the remaining distance. Arrival is measured
/// against [`ARRIVAL_EPSILON`], after which the position is snapped onto the
/// waypoint. If accumulated rounding carries the camera past the waypoint
/// without ever entering the epsilon ball, the pose is snapped as soon as the
/// distance starts growing.
#[derive(Debug, Clone)]
pub struct CameraTransition {
    waypoint: Waypoint,
    total_steps: u32,
    state: TransitionState,
}

impl CameraTransition {
    pub fn new(waypoint: Waypoint, total_steps: u32) -> Self {
        Self {
            waypoint,
            total_steps: total_steps.max(1),
            state: TransitionState::Idle,
        }
    }

    pub fn waypoint(&self) -> &Waypoint {
        &self.waypoint
    }

    pub fn total_steps(&self) -> u32 {
        self.total_steps
    }

    pub fn state(&self) -> TransitionState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, TransitionState::InProgress { .. })
    }

    /// Records the start pose. Returns false if a transition is already
    /// running, in which case nothing changes.
    pub fn begin(&mut self, camera: &Camera) -> bool {
        if self.is_active() {
            return false;
        }

        self.state = TransitionState::InProgress {
            start_position: camera.position,
            start_target: camera.target,
            last_distance: camera.position.distance(self.waypoint.position),
        };
        true
    }

    pub fn step(&mut self, camera: &mut Camera) -> TransitionStep {
        let TransitionState::InProgress {
            start_position,
            start_target,
            last_distance,
        } = self.state
        else {
            return TransitionStep::Idle;
        };

        let inv_steps = 1.0 / self.total_steps as f32;
        let position_step = (self.waypoint.position - start_position) * inv_steps;
        let target_step = (self.waypoint.target - start_target) * inv_steps;
        camera.position += position_step;
        camera.target += target_step;

        let distance = camera.position.distance(self.waypoint.position);
        if distance < ARRIVAL_EPSILON {
            camera.position = self.waypoint.position;
            self.state = TransitionState::Idle;
            return TransitionStep::Arrived;
        }

        if distance > last_distance {
            camera.position = self.waypoint.position;
            camera.target = self.waypoint.target;
            self.state = TransitionState::Idle;
            return TransitionStep::Arrived;
        }

        self.state = TransitionState::InProgress {
            start_position,
            start_target,
            last_distance: distance,
        };
        TransitionStep::Moving
    }
}
