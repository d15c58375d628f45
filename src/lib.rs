//! PixelCraft: a pixel-art grid editing engine.
//!
//! The grid model and its operations (`canvas`, `ops`) are pure and
//! synchronous. `components::history` records whole-grid snapshots,
//! `app::Editor` routes pointer input to tools and keeps the preferences a
//! project carries, and `library` persists projects and the session through
//! a key-value store. Rendering belongs to the host; `io` only rasterizes for
//! export.

pub mod app;
pub mod canvas;
pub mod cli;
pub mod components;
pub mod i18n;
pub mod io;
pub mod library;
pub mod logger;
pub mod ops;
pub mod project;
pub mod settings;
pub mod theme;

pub use app::{Editor, PointerOutcome};
pub use canvas::{Cell, Grid, GridConfig, GridError, ResizePolicy, Rgb};
pub use components::history::HistoryManager;
pub use components::tools::{Stroke, Tool};
pub use project::{ProjectDocument, ProjectError};
