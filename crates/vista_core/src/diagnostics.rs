use glam::Vec3;
use tracing::info;

/// Snapshot of the camera rig, emitted on request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Diagnostics {
    pub distance_to_portal: f32,
    pub portal_position: Vec3,
    pub camera_position: Vec3,
    pub camera_target: Vec3,
    pub waypoint_position: Vec3,
    pub waypoint_target: Vec3,
    pub portal_camera_position: Vec3,
    pub portal_camera_target: Vec3,
}

impl Diagnostics {
    pub fn lines(&self) -> Vec<String> {
        vec![
            format!(
                "Distance of main camera to portal: {:.6}",
                self.distance_to_portal
            ),
            format!("Portal Position: {}", format_point(self.portal_position)),
            format!("Main Camera Position: {}", format_point(self.camera_position)),
            format!("Main Camera Target: {}", format_point(self.camera_target)),
            format!(
                "Portal View Camera Position: {}",
                format_point(self.waypoint_position)
            ),
            format!(
                "Portal View Camera Target: {}",
                format_point(self.waypoint_target)
            ),
            format!(
                "Island Camera Position: {}",
                format_point(self.portal_camera_position)
            ),
            format!(
                "Island Camera Target: {}",
                format_point(self.portal_camera_target)
            ),
        ]
    }
}

fn format_point(point: Vec3) -> String {
    format!("({:.6}, {:.6}, {:.6})", point.x, point.y, point.z)
}

/// Receives diagnostics snapshots. State updates report through this rather
/// than logging directly.
pub trait DiagnosticsSink {
    fn report(&mut self, diagnostics: &Diagnostics);
}

/// Writes each snapshot line as an info event.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DiagnosticsSink for TracingSink {
    fn report(&mut self, diagnostics: &Diagnostics) {
        for line in diagnostics.lines() {
            info!("{line}");
        }
    }
}

impl DiagnosticsSink for Vec<Diagnostics> {
    fn report(&mut self, diagnostics: &Diagnostics) {
        self.push(*diagnostics);
    }
}
