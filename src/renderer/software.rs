//! ---------------------------------------------------------------------------
//! Reference software (CPU) back-end
//!
//! * Fills a `Vec<u32>` frame-buffer in **0x00RRGGBB** format.
//! * Texels are not part of the level data, so every texture and flat is
//!   drawn as a checkerboard in a colour derived from its id, darkened by
//!   the colormap index the engine picked.
//! * Masked columns leave every other checker cell transparent.
//! ---------------------------------------------------------------------------

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use crate::engine::Shade;
use crate::fixed::{FRACBITS, Fixed};
use crate::renderer::{ColumnKind, PlaneSpan, Renderer, Rgba, WallColumn};

/// Never produced by a texture: magenta shows gaps.
const CLEAR: Rgba = 0xff_00_ff;
const SKY_TOP: Rgba = 0x30_50_a0;
const SKY_BOTTOM: Rgba = 0x90_b0_e0;
/// Checker cell size in texels.
const CELL: i32 = 8;
const NUMCOLORMAPS: u32 = 32;

/// Doom-style column/span renderer into an owned buffer.
#[derive(Debug, Default)]
pub struct Software {
    width: usize,
    height: usize,
    buffer: Vec<Rgba>,
}

/*──────────────────────── Renderer trait impl ────────────────────────*/
impl Renderer for Software {
    fn begin_frame(&mut self, w: usize, h: usize) {
        // (re)allocate if resolution changed
        if w != self.width || h != self.height {
            self.width = w;
            self.height = h;
            self.buffer.resize(w * h, 0);
        }
        self.buffer.fill(CLEAR);
    }

    fn draw_column(&mut self, col: &WallColumn) {
        if col.x < 0 || col.x as usize >= self.width {
            return;
        }
        let yl = col.yl.max(0);
        let yh = col.yh.min(self.height as i32 - 1);
        let centery = (self.height / 2) as i32;
        let u = col.column as i32;

        // texture row at yl, stepping one screen row at a time
        let mut frac: Fixed = col
            .texturemid
            .wrapping_add((yl - centery).wrapping_mul(col.iscale));
        for y in yl..=yh {
            let v = frac >> FRACBITS;
            let px = match col.kind {
                ColumnKind::Sky => Some(sky_gradient(y, self.height)),
                ColumnKind::Wall => Some(checker(col.texture, u, v)),
                ColumnKind::Masked => ((u.div_euclid(CELL) + v.div_euclid(CELL)) & 1 == 0)
                    .then(|| checker(col.texture, u, v)),
            };
            if let Some(px) = px {
                self.buffer[y as usize * self.width + col.x as usize] = dim(px, col.shade);
            }
            frac = frac.wrapping_add(col.iscale);
        }
    }

    fn draw_span(&mut self, span: &PlaneSpan) {
        if span.y < 0 || span.y as usize >= self.height {
            return;
        }
        let x1 = span.x1.max(0);
        let x2 = span.x2.min(self.width as i32 - 1);
        let row = span.y as usize * self.width;
        let (mut xfrac, mut yfrac) = (span.xfrac, span.yfrac);
        for x in x1..=x2 {
            let px = checker(span.flat ^ 0x8000, xfrac >> FRACBITS, yfrac >> FRACBITS);
            self.buffer[row + x as usize] = dim(px, span.shade);
            xfrac = xfrac.wrapping_add(span.xstep);
            yfrac = yfrac.wrapping_add(span.ystep);
        }
    }
}

impl Software {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// The finished frame, row-major.
    #[inline]
    pub fn pixels(&self) -> &[Rgba] {
        &self.buffer
    }

    /// Write the frame as a binary PPM.
    pub fn write_ppm<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let mut out = BufWriter::new(File::create(path)?);
        write!(out, "P6\n{} {}\n255\n", self.width, self.height)?;
        for &px in &self.buffer {
            out.write_all(&[(px >> 16) as u8, (px >> 8) as u8, px as u8])?;
        }
        out.flush()
    }
}

/*──────────────────────── pixel helpers ──────────────────────────────*/

/// Two tones of a colour picked from `id`.
fn checker(id: u16, u: i32, v: i32) -> Rgba {
    let h = (id as u32).wrapping_mul(0x9E37_79B9);
    let base = 0x40_40_40 | (h >> 8 & 0x7f_7f_7f);
    if (u.div_euclid(CELL) + v.div_euclid(CELL)) & 1 == 0 {
        base
    } else {
        dim(base, 8)
    }
}

fn sky_gradient(y: i32, height: usize) -> Rgba {
    let t = (y.max(0) as u32 * 255) / height.max(1) as u32;
    let mix = |a: u32, b: u32| (a * (255 - t) + b * t) / 255;
    let ch = |c: Rgba, s: u32| (c >> s) & 0xff;
    (mix(ch(SKY_TOP, 16), ch(SKY_BOTTOM, 16)) << 16)
        | (mix(ch(SKY_TOP, 8), ch(SKY_BOTTOM, 8)) << 8)
        | mix(ch(SKY_TOP, 0), ch(SKY_BOTTOM, 0))
}

/// Darken by colormap index: 0 is full bright, 31 nearly black.
fn dim(px: Rgba, shade: Shade) -> Rgba {
    let keep = NUMCOLORMAPS - (shade as u32).min(NUMCOLORMAPS - 1);
    let ch = |s: u32| (((px >> s) & 0xff) * keep / NUMCOLORMAPS) << s;
    ch(16) | ch(8) | ch(0)
}

/*──────────────────────────────── Tests ───────────────────────────────*/
