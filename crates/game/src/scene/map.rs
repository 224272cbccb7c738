use std::collections::BTreeMap;

use glam::IVec2;
use serde::{Deserialize, Serialize};

/// Which edges of a cell block crossing movement.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum BarrierType {
    #[default]
    None,
    Left,
    Top,
    LeftTop,
}

impl BarrierType {
    pub fn blocks_left(self) -> bool {
        matches!(self, BarrierType::Left | BarrierType::LeftTop)
    }

    pub fn blocks_top(self) -> bool {
        matches!(self, BarrierType::Top | BarrierType::LeftTop)
    }
}

impl TryFrom<u8> for BarrierType {
    type Error = MapError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(BarrierType::None),
            1 => Ok(BarrierType::Left),
            2 => Ok(BarrierType::Top),
            3 => Ok(BarrierType::LeftTop),
            other => Err(MapError::InvalidBarrier(other)),
        }
    }
}

impl From<BarrierType> for u8 {
    fn from(value: BarrierType) -> Self {
        value as u8
    }
}

#[derive(Debug, thiserror::Error)]
pub enum MapError {
    #[error("invalid map json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unknown barrier type {0}")]
    InvalidBarrier(u8),
    #[error("{layer} has {actual} rows/columns where {expected} were declared")]
    DimensionMismatch {
        layer: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("marker `{0}` lies outside the map")]
    MarkerOutOfBounds(String),
    #[error("marker `{marker}` links to unknown marker `{link}`")]
    UnknownLink { marker: String, link: String },
}

/// Named block position; teleporters are marker pairs joined by `link`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Marker {
    pub x: i32,
    pub y: i32,
    #[serde(default)]
    pub link: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapContent {
    pub name: String,
    pub block_width: u32,
    pub block_height: u32,
    /// Index into the sprite file list, `-1` for the default floor.
    pub rows: Vec<Vec<i32>>,
    pub barrier_rows: Vec<Vec<BarrierType>>,
    #[serde(default)]
    pub markers: BTreeMap<String, Marker>,
}

impl MapContent {
    pub fn empty(name: &str, block_width: u32, block_height: u32) -> Self {
        Self {
            name: name.to_string(),
            block_width,
            block_height,
            rows: vec![vec![-1; block_width as usize]; block_height as usize],
            barrier_rows: vec![vec![BarrierType::None; block_width as usize]; block_height as usize],
            markers: BTreeMap::new(),
        }
    }

    pub fn validate(&self) -> Result<(), MapError> {
        let height = self.block_height as usize;
        let width = self.block_width as usize;
        for (layer, rows) in [("rows", self.rows.len()), ("barrierRows", self.barrier_rows.len())] {
            if rows != height {
                return Err(MapError::DimensionMismatch {
                    layer,
                    expected: height,
                    actual: rows,
                });
            }
        }
        let widths = self
            .rows
            .iter()
            .map(Vec::len)
            .map(|w| ("rows", w))
            .chain(self.barrier_rows.iter().map(|r| ("barrierRows", r.len())));
        for (layer, actual) in widths {
            if actual != width {
                return Err(MapError::DimensionMismatch {
                    layer,
                    expected: width,
                    actual,
                });
            }
        }
        for (name, marker) in &self.markers {
            let inside = marker.x >= 0
                && marker.y >= 0
                && (marker.x as u32) < self.block_width
                && (marker.y as u32) < self.block_height;
            if !inside {
                return Err(MapError::MarkerOutOfBounds(name.clone()));
            }
            if let Some(link) = &marker.link {
                if !self.markers.contains_key(link) {
                    return Err(MapError::UnknownLink {
                        marker: name.clone(),
                        link: link.clone(),
                    });
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapFile {
    pub map_content: MapContent,
    /// Sprite references; position in the list is the id used in `rows`.
    #[serde(default)]
    pub sprite_file_names: Vec<String>,
}

impl MapFile {
    pub fn from_json(text: &str) -> Result<Self, MapError> {
        let map: MapFile = serde_json::from_str(text)?;
        map.map_content.validate()?;
        Ok(map)
    }

    pub fn to_json(&self) -> Result<String, MapError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Dense grid of floor sprites and barrier edges.
#[derive(Debug, Clone, PartialEq)]
pub struct TileGrid {
    width: u32,
    height: u32,
    sprites: Vec<Option<u16>>,
    barriers: Vec<BarrierType>,
}

impl TileGrid {
    pub fn new(width: u32, height: u32) -> Self {
        let len = width as usize * height as usize;
        Self {
            width,
            height,
            sprites: vec![None; len],
            barriers: vec![BarrierType::None; len],
        }
    }

    pub fn from_map(map: &MapFile) -> Result<Self, MapError> {
        let content = &map.map_content;
        content.validate()?;
        let mut grid = Self::new(content.block_width, content.block_height);
        for (y, (sprite_row, barrier_row)) in content.rows.iter().zip(&content.barrier_rows).enumerate() {
            for (x, (sprite, barrier)) in sprite_row.iter().zip(barrier_row).enumerate() {
                let coord = IVec2::new(x as i32, y as i32);
                let sprite = u16::try_from(*sprite)
                    .ok()
                    .filter(|s| usize::from(*s) < map.sprite_file_names.len());
                grid.set_sprite(coord, sprite);
                grid.set_barrier(coord, *barrier);
            }
        }
        Ok(grid)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn is_outside(&self, coord: IVec2) -> bool {
        coord.x < 0 || coord.y < 0 || coord.x >= self.width as i32 || coord.y >= self.height as i32
    }

    fn constrain(&self, coord: IVec2) -> usize {
        let x = coord.x.clamp(0, self.width as i32 - 1) as usize;
        let y = coord.y.clamp(0, self.height as i32 - 1) as usize;
        y * self.width as usize + x
    }

    pub fn set_barrier(&mut self, coord: IVec2, barrier: BarrierType) {
        if self.barriers.is_empty() {
            return;
        }
        let index = self.constrain(coord);
        self.barriers[index] = barrier;
    }

    pub fn set_sprite(&mut self, coord: IVec2, sprite: Option<u16>) {
        if self.sprites.is_empty() {
            return;
        }
        let index = self.constrain(coord);
        self.sprites[index] = sprite;
    }

    /// Out-of-range coordinates are clamped onto the nearest edge cell.
    pub fn barrier(&self, coord: IVec2) -> BarrierType {
        if self.barriers.is_empty() {
            return BarrierType::None;
        }
        self.barriers[self.constrain(coord)]
    }

    pub fn sprite(&self, coord: IVec2) -> Option<u16> {
        if self.sprites.is_empty() {
            return None;
        }
        self.sprites[self.constrain(coord)]
    }
}

/// How world block coordinates map onto a [`TileGrid`].
#[derive(Debug, Clone, PartialEq)]
pub enum TileSampler {
    /// The grid placed once at `offset`; nothing outside it.
    Region { grid: TileGrid, offset: IVec2 },
    /// The grid repeated in every direction.
    Pattern { grid: TileGrid },
}

impl TileSampler {
    pub fn region(grid: TileGrid) -> Self {
        TileSampler::Region {
            grid,
            offset: IVec2::ZERO,
        }
    }

    pub fn pattern(grid: TileGrid) -> Self {
        TileSampler::Pattern { grid }
    }

    fn locate(&self, coord: IVec2) -> Option<(&TileGrid, IVec2)> {
        match self {
            TileSampler::Region { grid, offset } => {
                let local = coord - *offset;
                (!grid.is_outside(local)).then_some((grid, local))
            }
            TileSampler::Pattern { grid } => {
                if grid.width == 0 || grid.height == 0 {
                    return None;
                }
                let size = IVec2::new(grid.width as i32, grid.height as i32);
                Some((grid, coord.rem_euclid(size)))
            }
        }
    }

    pub fn barrier(&self, coord: IVec2) -> Option<BarrierType> {
        self.locate(coord).map(|(grid, local)| grid.barrier(local))
    }

    pub fn sprite(&self, coord: IVec2) -> Option<u16> {
        self.locate(coord).and_then(|(grid, local)| grid.sprite(local))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAP: &str = r#"{
        "mapContent": {
            "name": "duel",
            "blockWidth": 2,
            "blockHeight": 2,
            "rows": [[0, -1], [-1, 1]],
            "barrierRows": [[0, 1], [2, 3]],
            "markers": {
                "a": {"x": 0, "y": 0, "link": "b"},
                "b": {"x": 1, "y": 1, "link": "a"}
            }
        },
        "spriteFileNames": ["floor.png", "grass.png"]
    }"#;

    #[test]
    fn loads_map_json() {
        let map = MapFile::from_json(MAP).unwrap();
        let grid = TileGrid::from_map(&map).unwrap();
        assert_eq!(grid.barrier(IVec2::new(1, 0)), BarrierType::Left);
        assert_eq!(grid.barrier(IVec2::new(1, 1)), BarrierType::LeftTop);
        assert_eq!(grid.sprite(IVec2::new(0, 0)), Some(0));
        assert_eq!(grid.sprite(IVec2::new(1, 0)), None);
        assert_eq!(map.map_content.markers["a"].link.as_deref(), Some("b"));
    }

    #[test]
    fn bad_barrier_is_rejected() {
        let text = MAP.replace("[2, 3]", "[2, 9]");
        assert!(MapFile::from_json(&text).is_err());
    }

    #[test]
    fn dangling_link_is_rejected() {
        let text = MAP.replace(r#""link": "a""#, r#""link": "zzz""#);
        assert!(matches!(
            MapFile::from_json(&text),
            Err(MapError::UnknownLink { .. })
        ));
    }

    #[test]
    fn region_is_empty_outside() {
        let mut grid = TileGrid::new(2, 2);
        grid.set_barrier(IVec2::new(1, 1), BarrierType::Top);
        let sampler = TileSampler::Region {
            grid,
            offset: IVec2::new(5, 5),
        };
        assert_eq!(sampler.barrier(IVec2::new(6, 6)), Some(BarrierType::Top));
        assert_eq!(sampler.barrier(IVec2::new(0, 0)), None);
    }

    #[test]
    fn pattern_wraps_negative_coordinates() {
        let mut grid = TileGrid::new(3, 2);
        grid.set_barrier(IVec2::new(2, 1), BarrierType::Left);
        let sampler = TileSampler::pattern(grid);
        assert_eq!(sampler.barrier(IVec2::new(-1, -1)), Some(BarrierType::Left));
        assert_eq!(sampler.barrier(IVec2::new(5, 3)), Some(BarrierType::Left));
    }

    #[test]
    fn barrier_serializes_as_number() {
        assert_eq!(serde_json::to_string(&BarrierType::Top).unwrap(), "2");
    }
}
