//! 16.16 fixed-point arithmetic, binary angles and the trig tables the
//! rasterizer indexes.
//!
//! Everything in the geometry pipeline runs on integers so that a frame is
//! bit-for-bit reproducible: no float rounding sneaks into the occlusion
//! tests.  Floats only appear here, once, to fill the lookup tables.

use once_cell::sync::Lazy;
use std::f64::consts::TAU;

/// 16.16 signed fixed-point value.
pub type Fixed = i32;

/// Binary angle: the full circle is `2^32`, arithmetic wraps.
pub type Angle = u32;

pub const FRACBITS: i32 = 16;
pub const FRACUNIT: Fixed = 1 << FRACBITS;

pub const ANG45: Angle = 0x2000_0000;
pub const ANG90: Angle = 0x4000_0000;
pub const ANG180: Angle = 0x8000_0000;
pub const ANG270: Angle = 0xC000_0000;

pub const FINEANGLES: usize = 8192;
pub const FINEMASK: usize = FINEANGLES - 1;
pub const ANGLETOFINESHIFT: u32 = 19;

pub const SLOPERANGE: usize = 2048;
const SLOPEBITS: i32 = 11;
const DBITS: i32 = FRACBITS - SLOPEBITS;

/*──────────────────────────── arithmetic ────────────────────────────*/

#[inline(always)]
pub fn fixed_mul(a: Fixed, b: Fixed) -> Fixed {
    ((a as i64 * b as i64) >> FRACBITS) as Fixed
}

/// Fixed division that saturates instead of trapping when the quotient
/// would not fit in 16.16.
#[inline]
pub fn fixed_div(a: Fixed, b: Fixed) -> Fixed {
    if (a.unsigned_abs() >> 14) >= b.unsigned_abs() {
        return if (a ^ b) < 0 { i32::MIN } else { i32::MAX };
    }
    (((a as i64) << FRACBITS) / b as i64) as Fixed
}

#[inline(always)]
pub fn to_fixed(v: f32) -> Fixed {
    (v * FRACUNIT as f32) as Fixed
}

#[inline(always)]
pub fn from_fixed(v: Fixed) -> f32 {
    v as f32 / FRACUNIT as f32
}

/// Radians (0 = east, counter-clockwise) to a binary angle.
#[inline]
pub fn angle_from_radians(rad: f32) -> Angle {
    let turns = (rad as f64 / TAU).rem_euclid(1.0);
    (turns * 4_294_967_296.0) as u64 as Angle
}

#[inline(always)]
pub fn fine(angle: Angle) -> usize {
    (angle >> ANGLETOFINESHIFT) as usize
}

/*──────────────────────────── tables ────────────────────────────────*/

/// Sine over `5/4` of a circle so cosine is a quarter-turn offset into it.
pub static FINESINE: Lazy<Vec<Fixed>> = Lazy::new(|| {
    (0..5 * FINEANGLES / 4)
        .map(|i| {
            let a = (i as f64 + 0.5) * TAU / FINEANGLES as f64;
            (FRACUNIT as f64 * a.sin()) as Fixed
        })
        .collect()
});

/// Tangent over half a circle, centred on the view direction.
pub static FINETANGENT: Lazy<Vec<Fixed>> = Lazy::new(|| {
    (0..FINEANGLES / 2)
        .map(|i| {
            let a = (i as f64 - (FINEANGLES / 4) as f64 + 0.5) * TAU / FINEANGLES as f64;
            (FRACUNIT as f64 * a.tan()) as Fixed
        })
        .collect()
});

/// `atan(i / SLOPERANGE)` as a binary angle, first octant only.
pub static TANTOANGLE: Lazy<Vec<Angle>> = Lazy::new(|| {
    (0..=SLOPERANGE)
        .map(|i| {
            let f = (i as f64 / SLOPERANGE as f64).atan() / TAU;
            (4_294_967_295.0 * f) as Angle
        })
        .collect()
});

#[inline(always)]
pub fn finesine(i: usize) -> Fixed {
    FINESINE[i]
}

#[inline(always)]
pub fn finecosine(i: usize) -> Fixed {
    FINESINE[i + FINEANGLES / 4]
}

#[inline(always)]
pub fn finetangent(i: usize) -> Fixed {
    FINETANGENT[i]
}

/*──────────────────────────── geometry helpers ──────────────────────*/

pub fn slope_div(num: u32, den: u32) -> usize {
    if den < 512 {
        return SLOPERANGE;
    }
    let ans = (num << 3) / (den >> 8);
    (ans as usize).min(SLOPERANGE)
}

/// Angle of the vector `(dx, dy)`, resolved by folding into the first
/// octant and looking the slope up in [`TANTOANGLE`].
pub fn point_to_angle(dx: Fixed, dy: Fixed) -> Angle {
    if dx == 0 && dy == 0 {
        return 0;
    }
    let t = |a: Fixed, b: Fixed| TANTOANGLE[slope_div(a as u32, b as u32)];

    if dx >= 0 {
        if dy >= 0 {
            if dx > dy {
                t(dy, dx)
            } else {
                (ANG90 - 1).wrapping_sub(t(dx, dy))
            }
        } else {
            let y = dy.wrapping_neg();
            if dx > y {
                0u32.wrapping_sub(t(y, dx))
            } else {
                ANG270.wrapping_add(t(dx, y))
            }
        }
    } else {
        let x = dx.wrapping_neg();
        if dy >= 0 {
            if x > dy {
                (ANG180 - 1).wrapping_sub(t(dy, x))
            } else {
                ANG90.wrapping_add(t(x, dy))
            }
        } else {
            let y = dy.wrapping_neg();
            if x > y {
                ANG180.wrapping_add(t(y, x))
            } else {
                (ANG270 - 1).wrapping_sub(t(x, y))
            }
        }
    }
}

/// Length of `(dx, dy)` without a square root.
pub fn point_to_dist(dx: Fixed, dy: Fixed) -> Fixed {
    let mut dx = dx.wrapping_abs();
    let mut dy = dy.wrapping_abs();
    if dy > dx {
        std::mem::swap(&mut dx, &mut dy);
    }
    if dx == 0 {
        return 0;
    }
    let slope = (fixed_div(dy, dx) >> DBITS) as usize;
    let angle = TANTOANGLE[slope.min(SLOPERANGE)].wrapping_add(ANG90);
    // sine of (a + 90°) is the cosine of a
    fixed_div(dx, finesine(fine(angle)))
}

/*====================================================================*/
/*                                Tests                                */
/*====================================================================*/
