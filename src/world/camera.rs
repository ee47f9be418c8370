use glam::{Vec2, Vec3};

use crate::fixed::{Angle, Fixed, angle_from_radians, to_fixed};

/// Player view-point in world space.
///
/// * Only **yaw** (heading) is simulated – Doom never tilts up/down.
/// * `z` holds the absolute eye altitude (floor height + eye height), as
///   computed by whoever moves the player.
#[derive(Clone, Copy, Debug)]
pub struct Camera {
    pos: Vec3, // x,y in map-units; z = eye altitude
    yaw: f32,  // radians (0 = east, counter-clockwise)
}

/// Fixed-point viewpoint the rasterizer consumes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct View {
    pub x: Fixed,
    pub y: Fixed,
    pub z: Fixed,
    pub angle: Angle,
    /// Light added to every sector (muzzle flash).
    pub extralight: i32,
    /// Colormap forced on everything (light amp, invulnerability).
    pub fixed_colormap: Option<u8>,
}

impl Camera {
    pub fn new(pos: Vec3, yaw: f32) -> Self {
        Self { pos, yaw }
    }

    #[inline]
    pub fn pos(&self) -> Vec3 {
        self.pos
    }

    #[inline]
    pub fn yaw(&self) -> f32 {
        self.yaw
    }

    /// Snap to the rasterizer's fixed-point grid.
    pub fn view(&self) -> View {
        View {
            x: to_fixed(self.pos.x),
            y: to_fixed(self.pos.y),
            z: to_fixed(self.pos.z),
            angle: angle_from_radians(self.yaw),
            extralight: 0,
            fixed_colormap: None,
        }
    }

    /*──────────────────────── derived vectors ───────────────────────*/

    /// Unit vector pointing where the camera looks on the X-Y plane.
    #[inline(always)]
    pub fn forward(self) -> Vec2 {
        let (s, c) = self.yaw.sin_cos();
        Vec2::new(c, s) // 0 rad = +X (east), CCW positive
    }

    /// Unit vector pointing to the camera's right on the X-Y plane.
    #[inline(always)]
    pub fn right(self) -> Vec2 {
        let f = self.forward();
        Vec2::new(f.y, -f.x)
    }

    /*──────────────────────── movement helpers ──────────────────────*/

    /// Move by `forward` units and `side` (strafe right), keeping altitude.
    pub fn step(&mut self, forward: f32, side: f32) {
        let f = self.forward();
        let r = self.right();
        self.pos.x += f.x * forward + r.x * side;
        self.pos.y += f.y * forward + r.y * side;
    }

    /// Rotate around Z-axis (positive = turn left).
    pub fn turn(&mut self, delta_yaw: f32) {
        self.yaw = (self.yaw + delta_yaw).rem_euclid(std::f32::consts::TAU);
    }
}

impl View {
    pub fn with_extralight(mut self, extralight: i32) -> Self {
        self.extralight = extralight;
        self
    }

    pub fn with_fixed_colormap(mut self, colormap: u8) -> Self {
        self.fixed_colormap = Some(colormap);
        self
    }
}

/*====================================================================*/
/*                                Tests                                */
/*====================================================================*/
#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixed::{ANG90, FRACUNIT};
    use std::f32::consts::FRAC_PI_2;

    #[test]
    fn forward_and_right_are_orthonormal() {
        let cam = Camera::new(Vec3::ZERO, 0.3);
        let f = cam.forward();
        let r = cam.right();
        assert!((f.length() - 1.0).abs() < 1e-5);
        assert!((r.length() - 1.0).abs() < 1e-5);
        assert!((f.dot(r)).abs() < 1e-5);
        // facing east, right is south
        let r = Camera::new(Vec3::ZERO, 0.0).right();
        assert!((r - Vec2::new(0.0, -1.0)).length() < 1e-5);
    }

    #[test]
    fn view_is_fixed_point_snapshot() {
        let cam = Camera::new(Vec3::new(64.0, -32.5, 41.0), FRAC_PI_2);
        let v = cam.view();
        assert_eq!(v.x, 64 * FRACUNIT);
        assert_eq!(v.y, -32 * FRACUNIT - FRACUNIT / 2);
        assert_eq!(v.z, 41 * FRACUNIT);
        assert!(v.angle.abs_diff(ANG90) < 0x100);
        assert_eq!(v.fixed_colormap, None);
    }

    #[test]
    fn step_and_turn() {
        let mut cam = Camera::new(Vec3::new(0.0, 0.0, 41.0), 0.0);
        cam.step(10.0, 0.0);
        assert!((cam.pos().x - 10.0).abs() < 1e-5);
        cam.turn(FRAC_PI_2);
        cam.step(5.0, 0.0);
        assert!((cam.pos().y - 5.0).abs() < 1e-4);
        assert_eq!(cam.pos().z, 41.0);
    }
}
