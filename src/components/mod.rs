// ============================================================================
// COMPONENTS — editor state pieces that sit between the grid and the UI
// ============================================================================
//
//   colors.rs  — preset and user palettes
//   history.rs — capped linear snapshot log (undo / redo)
//   tools.rs   — tool enum and the coalesced stroke
// ============================================================================

pub mod colors;
pub mod history;
pub mod tools;

pub use colors::CustomPalette;
pub use history::HistoryManager;
pub use tools::{Stroke, Tool};
