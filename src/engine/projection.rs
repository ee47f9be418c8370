//! ------------------------------------------------------------------
//! View-size dependent lookup tables.
//!
//! Rebuilt only when the view is resized.  Everything the traversal needs
//! to turn an angle into a screen column (and back), a scanline into a
//! floor distance, and a light level plus depth into a colormap.
//! ------------------------------------------------------------------

use crate::config::SCREENWIDTH;
use crate::fixed::{
    ANG90, ANGLETOFINESHIFT, Angle, FINEANGLES, FRACBITS, FRACUNIT, Fixed, finecosine, finetangent,
    fixed_div, fixed_mul,
};

/// 90° horizontal field of view, in fine angles.
pub const FIELDOFVIEW: usize = 2048;

pub const NUMCOLORMAPS: i32 = 32;
pub const LIGHTLEVELS: usize = 16;
pub const LIGHTSEGSHIFT: i32 = 4;
pub const MAXLIGHTSCALE: usize = 48;
pub const LIGHTSCALESHIFT: i32 = 12;
pub const MAXLIGHTZ: usize = 128;
pub const LIGHTZSHIFT: i32 = 20;
const DISTMAP: i32 = 2;

/// Colormap index: 0 is full bright, `NUMCOLORMAPS - 1` the darkest.
pub type Shade = u8;

#[derive(Clone, Debug)]
pub struct Projection {
    pub width: usize,
    pub height: usize,
    pub centerx: i32,
    pub centery: i32,
    pub centerxfrac: Fixed,
    pub centeryfrac: Fixed,
    /// Numerator of every wall scale.
    pub projection: Fixed,

    /// Fine angle (relative to the view, +90°) → first screen column.
    pub viewangletox: Vec<i32>,
    /// Screen column → view-relative angle, `width + 1` entries.
    pub xtoviewangle: Vec<Angle>,
    /// Half the field of view; anything wider is off screen.
    pub clipangle: Angle,

    /// Scanline → inverse vertical slope, for flat distances.
    pub yslope: Vec<Fixed>,
    /// Column → `1 / cos(view angle)`, stretches flat rows at the edges.
    pub distscale: Vec<Fixed>,

    /// Wall shade by light level and scale.
    pub scalelight: [[Shade; MAXLIGHTSCALE]; LIGHTLEVELS],
    /// Flat shade by light level and distance.
    pub zlight: [[Shade; MAXLIGHTZ]; LIGHTLEVELS],

    /// Sky column step, the same at every scale.
    pub sky_iscale: Fixed,
}

impl Projection {
    pub fn new(width: usize, height: usize) -> Self {
        let w = width as i32;
        let h = height as i32;
        let centerx = w / 2;
        let centery = h / 2;
        let centerxfrac = centerx << FRACBITS;
        let centeryfrac = centery << FRACBITS;

        let (viewangletox, xtoviewangle) = texture_mapping(w, centerxfrac);
        let clipangle = xtoviewangle[0];

        let yslope = (0..h)
            .map(|i| {
                let dy = (((i - h / 2) << FRACBITS) + FRACUNIT / 2).abs();
                fixed_div((w / 2) * FRACUNIT, dy)
            })
            .collect();

        let distscale = xtoviewangle[..width]
            .iter()
            .map(|&a| {
                let cosadj = finecosine((a >> ANGLETOFINESHIFT) as usize).abs();
                fixed_div(FRACUNIT, cosadj)
            })
            .collect();

        Self {
            width,
            height,
            centerx,
            centery,
            centerxfrac,
            centeryfrac,
            projection: centerxfrac,
            viewangletox,
            xtoviewangle,
            clipangle,
            yslope,
            distscale,
            scalelight: scale_light(w),
            zlight: z_light(),
            sky_iscale: FRACUNIT * SCREENWIDTH as i32 / w,
        }
    }

    /// Light row for a sector light level plus the view's extra light.
    #[inline]
    pub fn light_row(light: i16, extralight: i32, contrast: i32) -> usize {
        let lightnum = (light as i32 >> LIGHTSEGSHIFT) + extralight + contrast;
        lightnum.clamp(0, LIGHTLEVELS as i32 - 1) as usize
    }

    #[inline]
    pub fn wall_shade(&self, row: usize, scale: Fixed) -> Shade {
        let idx = (scale >> LIGHTSCALESHIFT).clamp(0, MAXLIGHTSCALE as i32 - 1);
        self.scalelight[row][idx as usize]
    }

    #[inline]
    pub fn flat_shade(&self, row: usize, distance: Fixed) -> Shade {
        let idx = ((distance >> LIGHTZSHIFT) as u32).min(MAXLIGHTZ as u32 - 1);
        self.zlight[row][idx as usize]
    }
}

/// Build `viewangletox` and its inverse so that [`FIELDOFVIEW`] covers
/// exactly `width` columns.
fn texture_mapping(width: i32, centerxfrac: Fixed) -> (Vec<i32>, Vec<Angle>) {
    let focallength = fixed_div(centerxfrac, finetangent(FINEANGLES / 4 + FIELDOFVIEW / 2));

    let mut viewangletox: Vec<i32> = (0..FINEANGLES / 2)
        .map(|i| {
            let tan = finetangent(i);
            if tan > FRACUNIT * 2 {
                -1
            } else if tan < -FRACUNIT * 2 {
                width + 1
            } else {
                let t = fixed_mul(tan, focallength);
                ((centerxfrac - t + FRACUNIT - 1) >> FRACBITS).clamp(-1, width + 1)
            }
        })
        .collect();

    // smallest view angle that maps to each column
    let xtoviewangle = (0..=width)
        .map(|x| {
            let i = viewangletox.iter().position(|&vx| vx <= x).unwrap_or(FINEANGLES / 2);
            ((i as u32) << ANGLETOFINESHIFT).wrapping_sub(ANG90)
        })
        .collect();

    // fencepost cases
    for vx in viewangletox.iter_mut() {
        if *vx == -1 {
            *vx = 0;
        } else if *vx == width + 1 {
            *vx = width;
        }
    }

    (viewangletox, xtoviewangle)
}

fn start_map(level: usize) -> i32 {
    ((LIGHTLEVELS - 1 - level) as i32 * 2) * NUMCOLORMAPS / LIGHTLEVELS as i32
}

fn scale_light(width: i32) -> [[Shade; MAXLIGHTSCALE]; LIGHTLEVELS] {
    let mut table = [[0; MAXLIGHTSCALE]; LIGHTLEVELS];
    for (i, row) in table.iter_mut().enumerate() {
        let startmap = start_map(i);
        for (j, cell) in row.iter_mut().enumerate() {
            let level = startmap - (j as i32 * SCREENWIDTH as i32 / width) / DISTMAP;
            *cell = level.clamp(0, NUMCOLORMAPS - 1) as Shade;
        }
    }
    table
}

fn z_light() -> [[Shade; MAXLIGHTZ]; LIGHTLEVELS] {
    let mut table = [[0; MAXLIGHTZ]; LIGHTLEVELS];
    for (i, row) in table.iter_mut().enumerate() {
        let startmap = start_map(i);
        for (j, cell) in row.iter_mut().enumerate() {
            let scale = fixed_div(
                (SCREENWIDTH as i32 / 2) * FRACUNIT,
                ((j as i32) + 1) << LIGHTZSHIFT,
            ) >> LIGHTSCALESHIFT;
            let level = startmap - scale / DISTMAP;
            *cell = level.clamp(0, NUMCOLORMAPS - 1) as Shade;
        }
    }
    table
}

/*====================================================================*/
/*                                Tests                                */
/*====================================================================*/
