use glam::{Vec3, Vec4};

pub const MAX_LIGHTS: usize = 4;

pub const DEFAULT_AMBIENT: Vec4 = Vec4::new(0.8, 1.0, 1.0, 1.0);

/// Background the portal target is cleared to before the linked scene is drawn.
pub const RAYWHITE: [u8; 4] = [245, 245, 245, 255];

#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LightKind {
    #[default]
    Directional = 0,
    Point = 1,
}

impl LightKind {
    pub fn shader_value(self) -> i32 {
        self as i32
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Light {
    pub kind: LightKind,
    pub enabled: bool,
    pub position: Vec3,
    pub target: Vec3,
    pub color: [u8; 4],
}

impl Default for Light {
    fn default() -> Self {
        Self {
            kind: LightKind::Directional,
            enabled: true,
            position: Vec3::new(7.0, 10.0, 5.0),
            target: Vec3::ZERO,
            color: color_from_hex(0xFFFF_AAFF),
        }
    }
}

impl Light {
    pub fn color_normalized(&self) -> Vec4 {
        normalize_color(self.color)
    }
}

/// Unpacks `0xRRGGBBAA`.
pub fn color_from_hex(hex: u32) -> [u8; 4] {
    hex.to_be_bytes()
}

pub fn normalize_color(color: [u8; 4]) -> Vec4 {
    Vec4::new(
        color[0] as f32 / 255.0,
        color[1] as f32 / 255.0,
        color[2] as f32 / 255.0,
        color[3] as f32 / 255.0,
    )
}

#[cfg(test)]
mod tests {
    use glam::Vec4;

    use super::{color_from_hex, normalize_color, Light, LightKind, RAYWHITE};

    #[test]
    fn hex_colors_unpack_as_rgba() {
        assert_eq!(color_from_hex(0xFFFF_AAFF), [255, 255, 170, 255]);
        assert_eq!(color_from_hex(0x0000_0000), [0, 0, 0, 0]);
        assert_eq!(color_from_hex(0xF5F5_F5FF), RAYWHITE);
    }

    #[test]
    fn default_light_matches_gallery_sun() {
        let light = Light::default();
        assert!(light.enabled);
        assert_eq!(light.kind.shader_value(), 0);
        assert_eq!(LightKind::Point.shader_value(), 1);
        let color = light.color_normalized();
        assert_eq!(color.x, 1.0);
        assert!((color.z - 170.0 / 255.0).abs() < 1.0e-6);
        assert_eq!(normalize_color([0, 0, 0, 255]), Vec4::new(0.0, 0.0, 0.0, 1.0));
    }
}
