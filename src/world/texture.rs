// Name/size registry for wall textures and flats.
// The rasterizer never sees texels; it needs a texture's width to wrap
// columns and its height to peg walls. Pixel data stays with the caller.

use std::collections::HashMap;

use crate::fixed::{FRACBITS, Fixed};

/// Runtime handle for a texture or flat in a [`TextureTable`].
///
/// *Guaranteed* to remain stable for the lifetime of the table.
pub type TextureId = u16;

/// Flats live in their own table but share the handle type.
pub type FlatId = u16;

/// Id 0 is the "-" entry: a sidedef slot with nothing to draw.
pub const NO_TEXTURE: TextureId = 0;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TextureMeta {
    pub name: String,
    pub width: u16,
    pub height: u16,
}

impl TextureMeta {
    pub fn new<S: Into<String>>(name: S, width: u16, height: u16) -> Self {
        Self {
            name: name.into(),
            width,
            height,
        }
    }

    /// Height in 16.16, as used for pegging.
    #[inline]
    pub fn height_fixed(&self) -> Fixed {
        (self.height as Fixed) << FRACBITS
    }

    /// Wrap an arbitrary texture column into `0..width`.
    #[inline]
    pub fn wrap_column(&self, col: i32) -> u16 {
        col.rem_euclid(self.width.max(1) as i32) as u16
    }
}

/// Things that can go wrong when registering or querying textures.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TextureError {
    /// Attempted to insert a second texture with an existing name.
    #[error("texture name `{0}` already present in table")]
    Duplicate(String),

    /// Requested ID is outside `0 .. table.len()`.
    #[error("texture id {0} out of range")]
    BadId(TextureId),

    #[error("texture `{0}` has zero width or height")]
    Degenerate(String),
}

/// Insertion-ordered table; id **0** is always the empty "-" entry.
#[derive(Clone, Debug)]
pub struct TextureTable {
    by_name: HashMap<String, TextureId>,
    data: Vec<TextureMeta>,
}

impl Default for TextureTable {
    fn default() -> Self {
        let mut by_name = HashMap::new();
        by_name.insert("-".into(), NO_TEXTURE);
        Self {
            by_name,
            data: vec![TextureMeta::new("-", 1, 1)],
        }
    }
}

impl TextureTable {
    /// Number of entries, including the "-" one.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.len() == 1
    }

    pub fn id(&self, name: &str) -> Option<TextureId> {
        self.by_name.get(name).copied()
    }

    pub fn get(&self, id: TextureId) -> Result<&TextureMeta, TextureError> {
        self.data.get(id as usize).ok_or(TextureError::BadId(id))
    }

    /// Unchecked-by-type lookup for ids already proven valid by
    /// `Level::validate`; falls back to the "-" entry.
    #[inline]
    pub fn meta(&self, id: TextureId) -> &TextureMeta {
        self.data.get(id as usize).unwrap_or(&self.data[0])
    }

    pub fn contains(&self, id: TextureId) -> bool {
        (id as usize) < self.data.len()
    }

    pub fn insert(&mut self, meta: TextureMeta) -> Result<TextureId, TextureError> {
        if meta.width == 0 || meta.height == 0 {
            return Err(TextureError::Degenerate(meta.name));
        }
        if self.by_name.contains_key(&meta.name) {
            return Err(TextureError::Duplicate(meta.name));
        }
        let id = self.data.len() as TextureId;
        self.by_name.insert(meta.name.clone(), id);
        self.data.push(meta);
        Ok(id)
    }
}

/*======================================================================*/
/*                               Tests                                  */
/*======================================================================*/
