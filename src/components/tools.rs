use std::fmt;
use std::str::FromStr;

use crate::canvas::{Cell, Grid, Rgb};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Tool {
    #[default]
    Pencil,
    Eraser,
    Bucket,
    Picker,
}

impl Tool {
    pub const ALL: [Tool; 4] = [Tool::Pencil, Tool::Eraser, Tool::Bucket, Tool::Picker];

    pub fn as_str(self) -> &'static str {
        match self {
            Tool::Pencil => "pencil",
            Tool::Eraser => "eraser",
            Tool::Bucket => "bucket",
            Tool::Picker => "picker",
        }
    }

    /// Label recorded in the undo history.
    pub fn label(self) -> &'static str {
        match self {
            Tool::Pencil => "Pencil",
            Tool::Eraser => "Eraser",
            Tool::Bucket => "Fill",
            Tool::Picker => "Pick Color",
        }
    }

    /// Keyboard shortcut shown next to the tool button.
    pub fn shortcut(self) -> char {
        match self {
            Tool::Pencil => 'P',
            Tool::Eraser => 'E',
            Tool::Bucket => 'G',
            Tool::Picker => 'I',
        }
    }

    /// Whether dragging with this tool paints cell by cell.
    pub fn is_stroke_tool(self) -> bool {
        matches!(self, Tool::Pencil | Tool::Eraser)
    }

    /// True for tools that write to the grid.
    pub fn modifies_grid(self) -> bool {
        !matches!(self, Tool::Picker)
    }
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tool {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pencil" => Ok(Tool::Pencil),
            "eraser" => Ok(Tool::Eraser),
            "bucket" | "fill" => Ok(Tool::Bucket),
            "picker" | "eyedropper" => Ok(Tool::Picker),
            other => Err(format!("unknown tool '{}'", other)),
        }
    }
}

// ============================================================================
// STROKE — one pointer-down .. pointer-up gesture
// ============================================================================

/// Accumulates every cell touched between pointer-down and pointer-up so the
/// whole gesture becomes one history entry.
///
/// The working grid shares storage with `base` until the first cell actually
/// changes; `finish` returns `None` if nothing ever did.
#[derive(Clone, Debug)]
pub struct Stroke {
    tool: Tool,
    paint: Cell,
    base: Grid,
    working: Grid,
    touched: usize,
}

impl Stroke {
    /// Start a stroke over `base`. Pencil paints `color`, eraser clears.
    pub fn begin(base: &Grid, tool: Tool, color: Rgb) -> Self {
        let paint = match tool {
            Tool::Eraser => None,
            _ => Some(color),
        };
        Self {
            tool,
            paint,
            base: base.clone(),
            working: base.clone(),
            touched: 0,
        }
    }

    pub fn tool(&self) -> Tool {
        self.tool
    }

    /// The in-progress grid, for display while the pointer is down.
    pub fn preview(&self) -> &Grid {
        &self.working
    }

    /// Number of cell writes that changed something.
    pub fn touched(&self) -> usize {
        self.touched
    }

    /// Paint one cell. Returns `true` if the cell changed.
    pub fn apply(&mut self, x: i32, y: i32) -> bool {
        let changed = self.working.set(x, y, self.paint);
        if changed {
            self.touched += 1;
        }
        changed
    }

    /// Close the stroke. `None` when the grid ends up identical to the base.
    pub fn finish(self) -> Option<Grid> {
        if self.touched == 0 || self.working == self.base {
            return None;
        }
        Some(self.working)
    }

    /// Drop the stroke without producing anything; returns the base grid.
    pub fn abort(self) -> Grid {
        self.base
    }
}
