// ============================================================================
// OPS — pure grid operations
// ============================================================================

pub mod convert;
pub mod fill;

pub use convert::{ConvertError, ConvertOptions, ImageSource, PendingConversion, Resample};
pub use fill::{fill_at, flood_fill};
