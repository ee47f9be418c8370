//! Rendering abstraction layer.
//!
//! *The engine never touches a pixel buffer directly.*  It decides which
//! texture column lands on which screen rows and which flat span lands on
//! which scanline, and hands each one to a type that implements
//! [`Renderer`].
//!
//! * Walls, sky and see-through textures arrive as [`WallColumn`]s.
//! * Floors and ceilings arrive as horizontal [`PlaneSpan`]s.

use crate::engine::Shade;
use crate::fixed::Fixed;
use crate::world::{FlatId, TextureId};

/// Pixel format of the software frame-buffer (0x00RRGGBB).
pub type Rgba = u32;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ColumnKind {
    /// Solid, upper or lower wall texture.
    Wall,
    /// Sky drawn where a sky ceiling is open, always full bright.
    Sky,
    /// See-through mid texture drawn after the planes.
    Masked,
}

/// One vertical run of a texture column, already clipped to the screen.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WallColumn {
    pub x: i32,
    /// Inclusive rows.
    pub yl: i32,
    pub yh: i32,
    pub texture: TextureId,
    /// Source column, already wrapped into the texture.
    pub column: u16,
    /// Texture row (16.16) at the screen's centre row.
    pub texturemid: Fixed,
    /// Texture rows per screen row (16.16).
    pub iscale: Fixed,
    pub shade: Shade,
    pub kind: ColumnKind,
}

/// One horizontal run of a flat along scanline `y`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlaneSpan {
    pub y: i32,
    /// Inclusive columns.
    pub x1: i32,
    pub x2: i32,
    pub flat: FlatId,
    /// Flat coordinates (16.16) at `x1`, and their step per column.
    pub xfrac: Fixed,
    pub yfrac: Fixed,
    pub xstep: Fixed,
    pub ystep: Fixed,
    pub shade: Shade,
}

/// The pixel-primitive side of the rasterizer.
pub trait Renderer {
    /// Called once before anything of a frame is drawn.
    fn begin_frame(&mut self, _width: usize, _height: usize) {}

    fn draw_column(&mut self, col: &WallColumn);

    fn draw_span(&mut self, span: &PlaneSpan);
}

pub mod software;

/// Renderer that keeps every draw call, for tests.
#[cfg(test)]
#[derive(Default, Debug)]
pub(crate) struct Recorder {
    pub frames: usize,
    pub columns: Vec<WallColumn>,
    pub spans: Vec<PlaneSpan>,
}

#[cfg(test)]
impl Recorder {
    pub fn columns_of(&self, kind: ColumnKind) -> impl Iterator<Item = &WallColumn> + '_ {
        self.columns.iter().filter(move |c| c.kind == kind)
    }
}

#[cfg(test)]
impl Renderer for Recorder {
    fn begin_frame(&mut self, _width: usize, _height: usize) {
        self.frames += 1;
        self.columns.clear();
        self.spans.clear();
    }

    fn draw_column(&mut self, col: &WallColumn) {
        self.columns.push(col.clone());
    }

    fn draw_span(&mut self, span: &PlaneSpan) {
        self.spans.push(span.clone());
    }
}
