//! Ready-made levels: a row of axis-aligned rooms along +X, each room one
//! sector and one subsector, joined by two-sided lines and split by
//! north-pointing partition lines.

use crate::world::builder::{LevelBuilder, SideTextures};
use crate::world::geometry::{Level, LinedefFlags, LinedefId, NodeRef, SectorId};
use crate::world::texture::{NO_TEXTURE, TextureId};

pub const ROOM_LEN: i32 = 256;
pub const ROOM_WIDTH: i32 = 256;
/// Eye height above the floor of room 0.
pub const EYE_HEIGHT: i32 = 41;

/// One room of a row.
#[derive(Clone, Copy, Debug)]
pub struct RoomSpec {
    pub floor: i32,
    pub ceil: i32,
    pub floor_flat: &'static str,
    pub ceil_flat: &'static str,
    pub light: i16,
    /// Texture hung in the middle of the line towards the next room.
    pub masked_mid: Option<&'static str>,
}

impl Default for RoomSpec {
    fn default() -> Self {
        Self {
            floor: 0,
            ceil: 128,
            floor_flat: "FLOOR4_8",
            ceil_flat: "CEIL3_5",
            light: 160,
            masked_mid: None,
        }
    }
}

/// Build a row of rooms. Fails only on inconsistent input, which the
/// canned scenes never produce.
pub fn row(name: &str, rooms: &[RoomSpec]) -> Result<Level, crate::world::LevelError> {
    let mut b = LevelBuilder::new(name);
    let tex = |b: &mut LevelBuilder, n: &str, w: u16, h: u16| -> TextureId {
        b.texture(n, w, h).unwrap_or(NO_TEXTURE)
    };
    let wall = tex(&mut b, "STARTAN3", 128, 128);
    let step = tex(&mut b, "STEP6", 32, 16);
    let sky = b.flat("F_SKY1").unwrap_or_default();
    let sky_tex = tex(&mut b, "SKY1", 256, 128);
    b.sky(sky, sky_tex);

    let sectors: Vec<SectorId> = rooms
        .iter()
        .map(|r| {
            let fp = b.flat(r.floor_flat).unwrap_or_default();
            let cp = b.flat(r.ceil_flat).unwrap_or_default();
            b.sector(r.floor, r.ceil, fp, cp, r.light)
        })
        .collect();

    let n = rooms.len() as i32;
    let w = ROOM_WIDTH;
    let x_at = |k: i32| k * ROOM_LEN;

    // outer walls, each listed clockwise so the room sees their front
    let mut north = Vec::new();
    let mut south = Vec::new();
    for (k, &sector) in sectors.iter().enumerate() {
        let k = k as i32;
        let side = b.side(sector, SideTextures::solid(wall));
        let (a, c) = (b.vertex(x_at(k), w), b.vertex(x_at(k + 1), w));
        north.push(b.line(a, c, LinedefFlags::empty(), side, None));
        let side = b.side(sector, SideTextures::solid(wall));
        let (a, c) = (b.vertex(x_at(k + 1), 0), b.vertex(x_at(k), 0));
        south.push(b.line(a, c, LinedefFlags::empty(), side, None));
    }
    let west_end = {
        let side = b.side(sectors[0], SideTextures::solid(wall));
        let (a, c) = (b.vertex(0, 0), b.vertex(0, w));
        b.line(a, c, LinedefFlags::empty(), side, None)
    };
    let east_end = {
        let side = b.side(sectors[sectors.len() - 1], SideTextures::solid(wall));
        let (a, c) = (b.vertex(x_at(n), w), b.vertex(x_at(n), 0));
        b.line(a, c, LinedefFlags::empty(), side, None)
    };

    // portals: right side faces the western room
    let mut portals: Vec<LinedefId> = Vec::new();
    for k in 0..(n - 1) as usize {
        let mut west = SideTextures::portal(wall, step);
        let mut east = SideTextures::portal(wall, step);
        if let Some(mid) = rooms[k].masked_mid {
            let mid = tex(&mut b, mid, 64, 128);
            west.middle = mid;
            east.middle = mid;
        }
        let right = b.side(sectors[k], west);
        let left = b.side(sectors[k + 1], east);
        let x = x_at(k as i32 + 1);
        let (a, c) = (b.vertex(x, w), b.vertex(x, 0));
        portals.push(b.line(a, c, LinedefFlags::empty(), right, Some(left)));
    }

    let mut leaves = Vec::new();
    for k in 0..n as usize {
        let east = if k + 1 < n as usize {
            (portals[k], 0)
        } else {
            (east_end, 0)
        };
        let west = if k == 0 { (west_end, 0) } else { (portals[k - 1], 1) };
        leaves.push(b.subsector(&[(north[k], 0), east, (south[k], 0), west])?);
    }

    // chain of partitions, built east to west so children exist first
    let mut root: NodeRef = leaves[leaves.len() - 1];
    for k in (0..leaves.len() - 1).rev() {
        let x = x_at(k as i32 + 1);
        root = b.node(x, 0, 0, w, root, leaves[k]);
    }
    b.build(root)
}

fn canned(name: &str, rooms: &[RoomSpec]) -> Level {
    match row(name, rooms) {
        Ok(level) => level,
        Err(e) => unreachable!("canned scene `{name}` is malformed: {e}"),
    }
}

/// One sector, four one-sided walls, no nodes.
pub fn single_room() -> Level {
    canned("room", &[RoomSpec::default()])
}

/// Like [`single_room`] but open to the sky.
pub fn sky_room() -> Level {
    canned(
        "sky",
        &[RoomSpec {
            ceil_flat: "F_SKY1",
            ..RoomSpec::default()
        }],
    )
}

/// `rooms` rooms whose floors step down and ceilings step up, so every
/// room adds a new floor and ceiling identity.
pub fn corridor(rooms: usize) -> Level {
    let specs: Vec<RoomSpec> = (0..rooms.max(1) as i32)
        .map(|k| RoomSpec {
            floor: -8 * k,
            ceil: 128 + 8 * k,
            ..RoomSpec::default()
        })
        .collect();
    canned("corridor", &specs)
}

/// Two rooms through a window: the far room has a raised floor and a
/// lowered ceiling.
pub fn window_room() -> Level {
    canned(
        "window",
        &[
            RoomSpec::default(),
            RoomSpec {
                floor: 24,
                ceil: 96,
                ..RoomSpec::default()
            },
        ],
    )
}

/// Two identical rooms split by an untextured line.
pub fn trigger_room() -> Level {
    canned("trigger", &[RoomSpec::default(), RoomSpec::default()])
}

/// Two identical rooms split by a line carrying a see-through texture.
pub fn masked_window() -> Level {
    canned(
        "grate",
        &[
            RoomSpec {
                masked_mid: Some("MIDGRATE"),
                ..RoomSpec::default()
            },
            RoomSpec::default(),
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canned_scenes_validate() {
        for level in [
            single_room(),
            sky_room(),
            corridor(5),
            window_room(),
            trigger_room(),
            masked_window(),
        ] {
            assert_eq!(level.validate(), Ok(()), "{}", level.name);
        }
    }

    #[test]
    fn single_room_is_one_leaf() {
        let level = single_room();
        assert_eq!(level.root, NodeRef::Leaf(0));
        assert_eq!(level.segs.len(), 4);
        assert!(level.segs.iter().all(|s| s.back.is_none()));
    }

    #[test]
    fn corridor_shape() {
        let level = corridor(4);
        assert_eq!(level.subsectors.len(), 4);
        assert_eq!(level.nodes.len(), 3);
        assert_eq!(level.sectors[3].floor_h, -24 << 16);
        let portals = level.segs.iter().filter(|s| s.back.is_some()).count();
        assert_eq!(portals, 6);
    }

    #[test]
    fn masked_window_hangs_texture_on_portal() {
        let level = masked_window();
        let grate = level.textures.id("MIDGRATE").unwrap();
        let portal = level.segs.iter().find(|s| s.back.is_some()).unwrap();
        assert_eq!(level.sidedefs[portal.sidedef as usize].middle, grate);
    }
}
