use glam::{Mat4, Quat, Vec3};

pub const NEAR_PLANE: f32 = 0.01;
pub const FAR_PLANE: f32 = 1000.0;
const PITCH_POLE_MARGIN: f32 = 0.001;
const MIN_TARGET_DISTANCE: f32 = 0.001;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Projection {
    #[default]
    Perspective,
    Orthographic,
}

/// Look-at camera. `fovy` is in degrees; for orthographic cameras it is the
/// height of the view volume instead.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub position: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    pub fovy: f32,
    pub projection: Projection,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 2.0, 4.0),
            target: Vec3::new(0.0, 2.0, 0.0),
            up: Vec3::Y,
            fovy: 60.0,
            projection: Projection::Perspective,
        }
    }
}

/// Per-frame free camera input. Distances are world units, angles degrees.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CameraMotion {
    pub forward: f32,
    pub right: f32,
    pub up: f32,
    pub yaw: f32,
    pub pitch: f32,
    pub roll: f32,
    pub zoom: f32,
}

impl CameraMotion {
    pub fn is_still(&self) -> bool {
        *self == Self::default()
    }
}

impl Camera {
    pub fn with_pose(self, position: Vec3, target: Vec3) -> Self {
        Self {
            position,
            target,
            ..self
        }
    }

    pub fn look_vector(&self) -> Vec3 {
        self.target - self.position
    }

    pub fn forward(&self) -> Vec3 {
        self.look_vector().normalize_or_zero()
    }

    pub fn up_axis(&self) -> Vec3 {
        self.up.normalize_or_zero()
    }

    pub fn right(&self) -> Vec3 {
        self.forward().cross(self.up_axis()).normalize_or_zero()
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, self.up)
    }

    pub fn projection_matrix(&self, aspect: f32) -> Mat4 {
        let aspect = aspect.max(0.0001);
        match self.projection {
            Projection::Perspective => {
                Mat4::perspective_rh(self.fovy.to_radians(), aspect, NEAR_PLANE, FAR_PLANE)
            }
            Projection::Orthographic => {
                let top = self.fovy * 0.5;
                let right = top * aspect;
                Mat4::orthographic_rh(-right, right, -top, top, NEAR_PLANE, FAR_PLANE)
            }
        }
    }

    pub fn view_projection_matrix(&self, aspect: f32) -> Mat4 {
        self.projection_matrix(aspect) * self.view_matrix()
    }

    /// Rotates the look vector around the up axis. Radians.
    pub fn yaw(&mut self, angle: f32) {
        let rotation = Quat::from_axis_angle(self.up_axis(), angle);
        self.target = self.position + rotation * self.look_vector();
    }

    /// Rotates the look vector around the right axis, stopping just short of
    /// the up and down poles. Positive angles look up. Radians.
    pub fn pitch(&mut self, angle: f32) {
        let up = self.up_axis();
        let look = self.look_vector();
        let right = self.right();
        if right == Vec3::ZERO {
            return;
        }

        let max_up = look.angle_between(up) - PITCH_POLE_MARGIN;
        let max_down = -look.angle_between(-up) + PITCH_POLE_MARGIN;
        let angle = angle.min(max_up).max(max_down);

        let rotation = Quat::from_axis_angle(right, angle);
        self.target = self.position + rotation * look;
    }

    /// Rotates the up vector around the look direction. Radians.
    pub fn roll(&mut self, angle: f32) {
        let forward = self.forward();
        if forward == Vec3::ZERO {
            return;
        }
        self.up = Quat::from_axis_angle(forward, angle) * self.up;
    }

    /// Moves along the look direction flattened onto the world XZ plane.
    pub fn move_forward(&mut self, distance: f32) {
        let mut forward = self.forward();
        forward.y = 0.0;
        let step = forward.normalize_or_zero() * distance;
        self.position += step;
        self.target += step;
    }

    pub fn move_right(&mut self, distance: f32) {
        let mut right = self.right();
        right.y = 0.0;
        let step = right.normalize_or_zero() * distance;
        self.position += step;
        self.target += step;
    }

    pub fn move_up(&mut self, distance: f32) {
        let step = self.up_axis() * distance;
        self.position += step;
        self.target += step;
    }

    /// Changes the distance between position and target by `delta`, keeping
    /// the target fixed.
    pub fn move_to_target(&mut self, delta: f32) {
        let mut distance = self.position.distance(self.target) + delta;
        if distance <= 0.0 {
            distance = MIN_TARGET_DISTANCE;
        }
        self.position = self.target - self.forward() * distance;
    }

    pub fn apply_motion(&mut self, motion: &CameraMotion) {
        self.pitch(-motion.pitch.to_radians());
        self.yaw(-motion.yaw.to_radians());
        self.roll(motion.roll.to_radians());

        self.move_forward(motion.forward);
        self.move_right(motion.right);
        self.move_up(motion.up);

        self.move_to_target(motion.zoom);
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::{Camera, CameraMotion, Projection};

    const EPS: f32 = 1.0e-5;

    fn assert_vec_close(a: Vec3, b: Vec3) {
        assert!(a.distance(b) < EPS, "{a:?} != {b:?}");
    }

    #[test]
    fn default_camera_looks_down_negative_z() {
        let camera = Camera::default();
        assert_eq!(camera.projection, Projection::Perspective);
        assert_vec_close(camera.forward(), Vec3::NEG_Z);
        assert_vec_close(camera.right(), Vec3::X);
    }

    #[test]
    fn forward_movement_stays_in_world_plane_and_keeps_look_vector() {
        let mut camera = Camera::default().with_pose(Vec3::new(0.0, 2.0, 4.0), Vec3::new(0.0, 5.0, 0.0));
        let look_before = camera.look_vector();

        camera.move_forward(1.0);

        assert_vec_close(camera.position, Vec3::new(0.0, 2.0, 3.0));
        assert_vec_close(camera.look_vector(), look_before);
    }

    #[test]
    fn strafing_moves_along_right_axis() {
        let mut camera = Camera::default();
        camera.move_right(0.5);
        assert_vec_close(camera.position, Vec3::new(0.5, 2.0, 4.0));
        assert_vec_close(camera.target, Vec3::new(0.5, 2.0, 0.0));
    }

    #[test]
    fn yaw_turns_right_for_negative_angles() {
        let mut camera = Camera::default();
        camera.yaw(-std::f32::consts::FRAC_PI_2);
        assert_vec_close(camera.forward(), Vec3::X);
        assert!((camera.look_vector().length() - 4.0).abs() < EPS);
    }

    #[test]
    fn pitch_is_clamped_short_of_the_poles() {
        let mut camera = Camera::default();
        camera.pitch(10.0);
        let up_angle = camera.look_vector().angle_between(Vec3::Y);
        assert!(up_angle > 0.0 && up_angle < 0.01);

        camera.pitch(-10.0);
        let down_angle = camera.look_vector().angle_between(Vec3::NEG_Y);
        assert!(down_angle > 0.0 && down_angle < 0.01);
        assert!(camera.right().length() > 0.99);
    }

    #[test]
    fn zoom_never_collapses_onto_target() {
        let mut camera = Camera::default();
        camera.move_to_target(-100.0);
        assert!((camera.position.distance(camera.target) - 0.001).abs() < EPS);
        assert_vec_close(camera.forward(), Vec3::NEG_Z);

        camera.move_to_target(2.0);
        assert!((camera.position.distance(camera.target) - 2.001).abs() < 1.0e-4);
    }

    #[test]
    fn still_motion_leaves_camera_unchanged() {
        let mut camera = Camera::default();
        let motion = CameraMotion::default();
        assert!(motion.is_still());

        camera.apply_motion(&motion);
        assert_vec_close(camera.position, Camera::default().position);
        assert_vec_close(camera.target, Camera::default().target);
    }

    #[test]
    fn orthographic_projection_ignores_depth() {
        let camera = Camera {
            fovy: 10.0,
            projection: Projection::Orthographic,
            ..Camera::default()
        };
        let view_proj = camera.view_projection_matrix(2.0);

        let near_corner = view_proj.project_point3(Vec3::new(10.0, 7.0, 0.0));
        let far_corner = view_proj.project_point3(Vec3::new(10.0, 7.0, -50.0));
        assert!((near_corner.x - 1.0).abs() < EPS && (near_corner.y - 1.0).abs() < EPS);
        assert!((far_corner.x - near_corner.x).abs() < EPS);
        assert!((far_corner.y - near_corner.y).abs() < EPS);
        assert!(far_corner.z > near_corner.z);

        let perspective = Camera::default().view_projection_matrix(2.0);
        let shrunk = perspective.project_point3(Vec3::new(10.0, 7.0, -50.0));
        assert!(shrunk.x < perspective.project_point3(Vec3::new(10.0, 7.0, 0.0)).x);
    }

    #[test]
    fn roll_tilts_the_up_vector_around_the_look_direction() {
        let mut camera = Camera::default();
        camera.roll(std::f32::consts::FRAC_PI_2);
        assert!(camera.up.dot(camera.forward()).abs() < EPS);
        assert!(camera.up.dot(Vec3::Y).abs() < EPS);
    }
}
