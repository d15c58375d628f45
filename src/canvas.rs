// ============================================================================
// GRID MODEL — cell colors, dimensions, copy-on-write pixel storage
// ============================================================================
//
// A grid is a flat, row-major array of `width * height` cells. Each cell is
// either empty (transparent, no paint) or a 24-bit RGB color whose text form is
// `#rrggbb`. Storage is shared behind an `Arc`; every write goes through
// `Arc::make_mut`, so a grid held by the history log is never altered by an
// edit made to a later copy.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use image::Rgba;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Maximum grid dimension (per axis) accepted from documents, the CLI, or resize.
/// Prevents memory exhaustion from crafted project files.
pub const MAX_GRID_DIM: u32 = 1024;

/// Default grid width/height for a new session.
pub const DEFAULT_GRID_SIZE: u32 = 32;

/// Default on-screen pixels per cell.
pub const DEFAULT_CELL_SIZE: u32 = 16;

// ============================================================================
// COLORS
// ============================================================================

/// An opaque 24-bit RGB color.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Rgb(pub [u8; 3]);

impl Rgb {
    pub const BLACK: Rgb = Rgb([0, 0, 0]);
    pub const WHITE: Rgb = Rgb([255, 255, 255]);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self([r, g, b])
    }

    pub fn r(self) -> u8 {
        self.0[0]
    }

    pub fn g(self) -> u8 {
        self.0[1]
    }

    pub fn b(self) -> u8 {
        self.0[2]
    }

    /// Fully opaque RGBA pixel for rasterization.
    pub fn to_rgba(self) -> Rgba<u8> {
        Rgba([self.0[0], self.0[1], self.0[2], 255])
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.0[0], self.0[1], self.0[2])
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid color '{0}', expected #rrggbb")]
pub struct ParseColorError(pub String);

impl FromStr for Rgb {
    type Err = ParseColorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseColorError(s.to_string());
        let hex = s.strip_prefix('#').ok_or_else(err)?;
        if hex.len() != 6 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(err());
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| err());
        Ok(Rgb([channel(0)?, channel(2)?, channel(4)?]))
    }
}

impl Serialize for Rgb {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Rgb {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// One grid position: `None` is the empty (transparent) marker.
pub type Cell = Option<Rgb>;

/// Text form of a cell: `""` for empty, `#rrggbb` otherwise.
pub fn cell_to_string(cell: Cell) -> String {
    cell.map(|c| c.to_string()).unwrap_or_default()
}

/// Parse the text form of a cell.
pub fn parse_cell(s: &str) -> Result<Cell, ParseColorError> {
    if s.is_empty() {
        Ok(None)
    } else {
        s.parse().map(Some)
    }
}

// ============================================================================
// CONFIG & ERRORS
// ============================================================================

/// Grid dimensions plus the rendering hint `cell_size` (pixels per cell).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridConfig {
    pub width: u32,
    pub height: u32,
    /// Serialized as `size` in project documents.
    #[serde(rename = "size", default = "default_cell_size")]
    pub cell_size: u32,
}

fn default_cell_size() -> u32 {
    DEFAULT_CELL_SIZE
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            width: DEFAULT_GRID_SIZE,
            height: DEFAULT_GRID_SIZE,
            cell_size: DEFAULT_CELL_SIZE,
        }
    }
}

impl GridConfig {
    pub fn new(width: u32, height: u32, cell_size: u32) -> Self {
        Self { width, height, cell_size }
    }

    pub fn cell_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    pub fn validate(&self) -> Result<(), GridError> {
        check_dimensions(self.width, self.height)?;
        if self.cell_size == 0 {
            return Err(GridError::ZeroCellSize);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GridError {
    #[error("grid dimensions must be positive, got {width}x{height}")]
    ZeroDimension { width: u32, height: u32 },
    #[error("grid dimensions {width}x{height} exceed the {max}x{max} limit")]
    TooLarge { width: u32, height: u32, max: u32 },
    #[error("grid has {actual} cells but {width}x{height} needs {expected}")]
    LengthMismatch {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },
    #[error("cell size must be positive")]
    ZeroCellSize,
    #[error("cell {index}: {source}")]
    InvalidCell {
        index: usize,
        #[source]
        source: ParseColorError,
    },
}

/// Validate a pair of grid dimensions against `1..=MAX_GRID_DIM`.
pub fn check_dimensions(width: u32, height: u32) -> Result<(), GridError> {
    if width == 0 || height == 0 {
        return Err(GridError::ZeroDimension { width, height });
    }
    if width > MAX_GRID_DIM || height > MAX_GRID_DIM {
        return Err(GridError::TooLarge {
            width,
            height,
            max: MAX_GRID_DIM,
        });
    }
    Ok(())
}

/// What happens to existing artwork when the grid changes size.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ResizePolicy {
    /// Allocate a fresh all-empty grid.
    Discard,
    /// Keep the overlapping top-left region, pad new cells with empty.
    #[default]
    Preserve,
}

impl ResizePolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            ResizePolicy::Discard => "discard",
            ResizePolicy::Preserve => "preserve",
        }
    }
}

impl FromStr for ResizePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "discard" => Ok(ResizePolicy::Discard),
            "preserve" => Ok(ResizePolicy::Preserve),
            other => Err(format!("unknown resize policy '{}'", other)),
        }
    }
}

/// Row-major offset of `(x, y)`. Callers bounds-check first.
#[inline]
pub fn index(x: u32, y: u32, width: u32) -> usize {
    y as usize * width as usize + x as usize
}

// ============================================================================
// GRID
// ============================================================================

/// The artwork: `width * height` cells in row-major order.
///
/// Cloning is O(1); the buffer is only copied when a shared grid is written.
#[derive(Clone, PartialEq, Eq)]
pub struct Grid {
    width: u32,
    height: u32,
    cells: Arc<Vec<Cell>>,
}

impl fmt::Debug for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Grid")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("painted", &self.painted_count())
            .finish()
    }
}

impl Grid {
    /// All-empty grid. Dimensions must be at least 1.
    pub fn blank(width: u32, height: u32) -> Self {
        debug_assert!(width >= 1 && height >= 1, "blank grid needs positive dimensions");
        Self {
            width,
            height,
            cells: Arc::new(vec![None; width as usize * height as usize]),
        }
    }

    pub fn from_config(config: &GridConfig) -> Self {
        Self::blank(config.width, config.height)
    }

    /// Build a grid from existing cells, enforcing the length invariant.
    pub fn from_cells(width: u32, height: u32, cells: Vec<Cell>) -> Result<Self, GridError> {
        check_dimensions(width, height)?;
        let expected = width as usize * height as usize;
        if cells.len() != expected {
            return Err(GridError::LengthMismatch {
                width,
                height,
                expected,
                actual: cells.len(),
            });
        }
        Ok(Self {
            width,
            height,
            cells: Arc::new(cells),
        })
    }

    /// Parse the document form (`""` or `#rrggbb` per cell).
    pub fn from_strings<S: AsRef<str>>(width: u32, height: u32, cells: &[S]) -> Result<Self, GridError> {
        let parsed = cells
            .iter()
            .enumerate()
            .map(|(index, s)| parse_cell(s.as_ref()).map_err(|source| GridError::InvalidCell { index, source }))
            .collect::<Result<Vec<_>, _>>()?;
        Self::from_cells(width, height, parsed)
    }

    /// Document form of every cell.
    pub fn to_strings(&self) -> Vec<String> {
        self.cells.iter().map(|&c| cell_to_string(c)).collect()
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && (x as u32) < self.width && (y as u32) < self.height
    }

    fn offset(&self, x: i32, y: i32) -> Option<usize> {
        self.contains(x, y).then(|| index(x as u32, y as u32, self.width))
    }

    /// Cell at `(x, y)`, or `None` when the coordinate is off the grid.
    pub fn get(&self, x: i32, y: i32) -> Option<Cell> {
        self.offset(x, y).map(|i| self.cells[i])
    }

    /// Copy-on-write single-cell edit. Off-grid coordinates return an unchanged copy.
    pub fn with_cell(&self, x: i32, y: i32, cell: Cell) -> Grid {
        let mut next = self.clone();
        next.set(x, y, cell);
        next
    }

    /// Write one cell of an owned working copy. Returns whether anything changed.
    pub fn set(&mut self, x: i32, y: i32, cell: Cell) -> bool {
        let Some(i) = self.offset(x, y) else {
            return false;
        };
        self.set_index(i, cell)
    }

    pub(crate) fn set_index(&mut self, i: usize, cell: Cell) -> bool {
        if self.cells[i] == cell {
            return false;
        }
        Arc::make_mut(&mut self.cells)[i] = cell;
        true
    }

    /// Mutable access to the raw buffer (unshares it first).
    pub(crate) fn cells_mut(&mut self) -> &mut [Cell] {
        Arc::make_mut(&mut self.cells).as_mut_slice()
    }

    /// True when both grids point at the same buffer (no copy has happened yet).
    pub fn shares_storage(&self, other: &Grid) -> bool {
        Arc::ptr_eq(&self.cells, &other.cells)
    }

    pub fn painted_count(&self) -> usize {
        self.cells.iter().filter(|c| c.is_some()).count()
    }

    pub fn is_blank(&self) -> bool {
        self.cells.iter().all(|c| c.is_none())
    }

    /// New grid of `width x height` following `policy`.
    pub fn resized(&self, width: u32, height: u32, policy: ResizePolicy) -> Grid {
        let mut next = Grid::blank(width, height);
        if policy == ResizePolicy::Discard {
            return next;
        }
        let copy_w = self.width.min(width);
        let copy_h = self.height.min(height);
        let dst = next.cells_mut();
        for y in 0..copy_h {
            let src_row = index(0, y, self.width);
            let dst_row = index(0, y, width);
            dst[dst_row..dst_row + copy_w as usize]
                .copy_from_slice(&self.cells[src_row..src_row + copy_w as usize]);
        }
        next
    }
}

// ============================================================================
// TESTS
// ============================================================================
