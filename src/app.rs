// ============================================================================
// EDITOR — application state: one grid, its history, and the UI preferences
// that travel with a project
// ============================================================================
//
// The editor is deliberately thin. Every grid change is produced by the pure
// core (canvas / ops / tools) and recorded in the HistoryManager; the editor
// only routes pointer input to the right tool and keeps the preferences the
// renderer reads back.
// ============================================================================

use crate::canvas::{Grid, GridConfig, GridError, ResizePolicy, Rgb, check_dimensions};
use crate::components::colors::CustomPalette;
use crate::components::history::{DEFAULT_MAX_HISTORY, HistoryManager};
use crate::components::tools::{Stroke, Tool};
use crate::i18n;
use crate::ops::convert::{self, ConvertError, ConvertOptions, ImageSource, PendingConversion};
use crate::ops::fill;
use crate::project::{ProjectDocument, ProjectError};
use crate::settings::AppSettings;
use crate::theme::ThemeMode;

pub const DEFAULT_BACKGROUND_OPACITY: f32 = 0.5;

/// What a pointer-down did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PointerOutcome {
    /// Off-grid, hidden drawing layer, or picker on an empty cell.
    Ignored,
    /// A pencil / eraser stroke is now open; it commits on pointer-up.
    StrokeStarted,
    /// The edit was committed to history immediately (bucket fill).
    Committed,
    /// The tool ran but nothing changed, so no history entry was made.
    Unchanged,
    /// The picker read this color and selected it.
    Picked(Rgb),
}

pub struct Editor {
    config: GridConfig,
    history: HistoryManager,
    stroke: Option<Stroke>,
    resize_policy: ResizePolicy,

    selected_color: Rgb,
    tool: Tool,
    custom_palette: CustomPalette,
    show_grid: bool,
    show_drawing_layer: bool,
    show_reference_layer: bool,
    background_image: Option<String>,
    background_opacity: f32,
    theme: ThemeMode,
    language: String,
}

impl Default for Editor {
    fn default() -> Self {
        Self::new(GridConfig::default(), DEFAULT_MAX_HISTORY)
    }
}

impl Editor {
    pub fn new(config: GridConfig, max_undo_steps: usize) -> Self {
        Self {
            config,
            history: HistoryManager::new(Grid::from_config(&config), max_undo_steps),
            stroke: None,
            resize_policy: ResizePolicy::default(),
            selected_color: Rgb::BLACK,
            tool: Tool::default(),
            custom_palette: CustomPalette::default(),
            show_grid: true,
            show_drawing_layer: true,
            show_reference_layer: true,
            background_image: None,
            background_opacity: DEFAULT_BACKGROUND_OPACITY,
            theme: ThemeMode::default(),
            language: i18n::DEFAULT_LANGUAGE.to_string(),
        }
    }

    pub fn from_settings(settings: &AppSettings) -> Self {
        let mut config = settings.grid_config();
        if let Err(e) = config.validate() {
            log::warn!("Invalid default canvas in settings ({}), using defaults", e);
            config = GridConfig::default();
        }
        let mut editor = Self::new(config, settings.max_undo_steps);
        editor.resize_policy = settings.resize_policy;
        editor.theme = settings.theme;
        editor.language = settings.effective_language();
        editor
    }

    // ------------------------------------------------------------------------
    // Read access
    // ------------------------------------------------------------------------

    /// The grid to display: the open stroke's preview, else the history head.
    pub fn grid(&self) -> &Grid {
        match &self.stroke {
            Some(stroke) => stroke.preview(),
            None => self.history.current(),
        }
    }

    pub fn config(&self) -> GridConfig {
        self.config
    }

    pub fn history(&self) -> &HistoryManager {
        &self.history
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn is_stroke_open(&self) -> bool {
        self.stroke.is_some()
    }

    pub fn selected_color(&self) -> Rgb {
        self.selected_color
    }

    pub fn tool(&self) -> Tool {
        self.tool
    }

    pub fn custom_palette(&self) -> &CustomPalette {
        &self.custom_palette
    }

    pub fn show_grid(&self) -> bool {
        self.show_grid
    }

    pub fn show_drawing_layer(&self) -> bool {
        self.show_drawing_layer
    }

    pub fn show_reference_layer(&self) -> bool {
        self.show_reference_layer
    }

    pub fn background_image(&self) -> Option<&str> {
        self.background_image.as_deref()
    }

    pub fn background_opacity(&self) -> f32 {
        self.background_opacity
    }

    pub fn theme(&self) -> ThemeMode {
        self.theme
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn resize_policy(&self) -> ResizePolicy {
        self.resize_policy
    }

    // ------------------------------------------------------------------------
    // Pointer input
    // ------------------------------------------------------------------------

    pub fn pointer_down(&mut self, x: i32, y: i32) -> PointerOutcome {
        // A missed pointer-up must not leak a stroke into the next gesture
        self.finish_stroke();

        let current = self.history.current();
        if !current.contains(x, y) {
            return PointerOutcome::Ignored;
        }
        if self.tool.modifies_grid() && !self.show_drawing_layer {
            log::debug!("Drawing layer hidden, ignoring {} at ({}, {})", self.tool, x, y);
            return PointerOutcome::Ignored;
        }

        match self.tool {
            Tool::Pencil | Tool::Eraser => {
                let mut stroke = Stroke::begin(current, self.tool, self.selected_color);
                stroke.apply(x, y);
                self.stroke = Some(stroke);
                PointerOutcome::StrokeStarted
            }
            Tool::Bucket => {
                let filled = fill::fill_at(current, x, y, Some(self.selected_color));
                if filled.shares_storage(current) {
                    return PointerOutcome::Unchanged;
                }
                self.history.commit(filled, Tool::Bucket.label());
                PointerOutcome::Committed
            }
            Tool::Picker => match current.get(x, y).flatten() {
                Some(color) => {
                    self.selected_color = color;
                    PointerOutcome::Picked(color)
                }
                None => PointerOutcome::Ignored,
            },
        }
    }

    /// Extend the open stroke. Returns whether a cell changed.
    pub fn pointer_move(&mut self, x: i32, y: i32) -> bool {
        match self.stroke.as_mut() {
            Some(stroke) => stroke.apply(x, y),
            None => false,
        }
    }

    /// Close the open stroke. Returns whether a history entry was made.
    pub fn pointer_up(&mut self) -> bool {
        self.finish_stroke()
    }

    fn finish_stroke(&mut self) -> bool {
        let Some(stroke) = self.stroke.take() else {
            return false;
        };
        let label = stroke.tool().label();
        match stroke.finish() {
            Some(grid) => {
                self.history.commit(grid, label);
                true
            }
            None => false,
        }
    }

    fn abort_stroke(&mut self) {
        if let Some(stroke) = self.stroke.take() {
            log::debug!("Aborting open {} stroke", stroke.tool());
        }
    }

    // ------------------------------------------------------------------------
    // History
    // ------------------------------------------------------------------------

    pub fn undo(&mut self) -> Option<String> {
        self.abort_stroke();
        self.history.undo()
    }

    pub fn redo(&mut self) -> Option<String> {
        self.abort_stroke();
        self.history.redo()
    }

    pub fn set_max_undo_steps(&mut self, steps: usize) {
        self.history.set_max_depth(steps);
    }

    // ------------------------------------------------------------------------
    // Whole-canvas operations
    // ------------------------------------------------------------------------

    /// Blank the grid, drop the reference image, and start history over.
    pub fn clear(&mut self) {
        self.abort_stroke();
        self.background_image = None;
        self.history.reset(Grid::from_config(&self.config), "Clear");
        log::info!("Cleared {}x{} canvas", self.config.width, self.config.height);
    }

    /// Change the grid size using the configured [`ResizePolicy`]. History restarts.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), GridError> {
        check_dimensions(width, height)?;
        self.abort_stroke();
        let next = self.history.current().resized(width, height, self.resize_policy);
        self.config.width = width;
        self.config.height = height;
        self.history.reset(next, "Resize");
        log::info!(
            "Resized canvas to {}x{} ({})",
            width,
            height,
            self.resize_policy.as_str()
        );
        Ok(())
    }

    pub fn set_resize_policy(&mut self, policy: ResizePolicy) {
        self.resize_policy = policy;
    }

    pub fn set_cell_size(&mut self, cell_size: u32) {
        if cell_size > 0 {
            self.config.cell_size = cell_size;
        }
    }

    // ------------------------------------------------------------------------
    // Image import
    // ------------------------------------------------------------------------

    /// Start converting `source` at the current grid size on a worker thread.
    pub fn start_conversion(&self, source: ImageSource, options: ConvertOptions) -> PendingConversion {
        convert::convert_in_background(source, self.config.width, self.config.height, options)
    }

    /// Commit a finished conversion as a single history entry.
    ///
    /// Edits made while the conversion ran are kept in history below it. A
    /// result sized for a grid that has since been resized is rejected.
    pub fn apply_conversion(&mut self, result: Result<Grid, ConvertError>) -> Result<(), ConvertError> {
        let grid = match result {
            Ok(grid) => grid,
            Err(e) => {
                log::warn!("Image import failed: {}", e);
                return Err(e);
            }
        };
        if grid.width() != self.config.width || grid.height() != self.config.height {
            return Err(ConvertError::DimensionMismatch {
                got_width: grid.width(),
                got_height: grid.height(),
                width: self.config.width,
                height: self.config.height,
            });
        }
        self.finish_stroke();
        self.history.commit(grid, "Import image");
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Preferences
    // ------------------------------------------------------------------------

    pub fn select_color(&mut self, color: Rgb) {
        self.selected_color = color;
    }

    /// Overwrite one custom swatch and select it.
    pub fn set_custom_color(&mut self, index: usize, color: Rgb) -> bool {
        if !self.custom_palette.set(index, color) {
            return false;
        }
        self.selected_color = color;
        true
    }

    pub fn set_tool(&mut self, tool: Tool) {
        if tool != self.tool {
            self.finish_stroke();
            self.tool = tool;
        }
    }

    pub fn set_show_grid(&mut self, show: bool) {
        self.show_grid = show;
    }

    pub fn set_show_drawing_layer(&mut self, show: bool) {
        if !show {
            self.finish_stroke();
        }
        self.show_drawing_layer = show;
    }

    pub fn set_show_reference_layer(&mut self, show: bool) {
        self.show_reference_layer = show;
    }

    pub fn toggle_grid(&mut self) {
        self.set_show_grid(!self.show_grid);
    }

    pub fn toggle_drawing_layer(&mut self) {
        self.set_show_drawing_layer(!self.show_drawing_layer);
    }

    pub fn toggle_reference_layer(&mut self) {
        self.set_show_reference_layer(!self.show_reference_layer);
    }

    /// Reference image as a data URL. `None` removes it.
    /// Setting an image also reveals the reference layer.
    pub fn set_background_image(&mut self, image: Option<String>) {
        if image.is_some() {
            self.show_reference_layer = true;
        }
        self.background_image = image;
    }

    /// Clamped to `0.0..=1.0`; non-finite values are ignored.
    pub fn set_background_opacity(&mut self, opacity: f32) {
        if opacity.is_finite() {
            self.background_opacity = opacity.clamp(0.0, 1.0);
        }
    }

    pub fn set_theme(&mut self, theme: ThemeMode) {
        self.theme = theme;
    }

    pub fn set_language(&mut self, tag: &str) {
        self.language = i18n::normalize(tag);
    }

    // ------------------------------------------------------------------------
    // Documents
    // ------------------------------------------------------------------------

    /// Snapshot everything a project file carries. An open stroke is not included.
    pub fn to_document(&self) -> ProjectDocument {
        ProjectDocument {
            grid: self.history.current().clone(),
            config: self.config,
            custom_palette: Some(self.custom_palette.colors().to_vec()),
            selected_color: Some(self.selected_color),
            background_image: Some(self.background_image.clone()),
            background_opacity: Some(self.background_opacity),
            show_drawing_layer: Some(self.show_drawing_layer),
            show_reference_layer: Some(self.show_reference_layer),
            show_grid: Some(self.show_grid),
            theme: Some(self.theme),
            language: Some(self.language.clone()),
        }
    }

    /// Replace the editor state with `doc`. Fields the document omits keep
    /// their current values. History restarts at the loaded grid.
    ///
    /// A document whose config is invalid or disagrees with its grid is
    /// rejected and the editor is left untouched.
    pub fn load_document(&mut self, doc: ProjectDocument) -> Result<(), ProjectError> {
        doc.validate()?;
        self.abort_stroke();
        self.config = doc.config;
        self.history.reset(doc.grid, "Open project");

        if let Some(colors) = doc.custom_palette {
            self.custom_palette = CustomPalette::from_colors(&colors);
        }
        if let Some(color) = doc.selected_color {
            self.selected_color = color;
        }
        if let Some(image) = doc.background_image {
            self.background_image = image;
        }
        if let Some(opacity) = doc.background_opacity {
            self.set_background_opacity(opacity);
        }
        if let Some(show) = doc.show_drawing_layer {
            self.show_drawing_layer = show;
        }
        if let Some(show) = doc.show_reference_layer {
            self.show_reference_layer = show;
        }
        if let Some(show) = doc.show_grid {
            self.show_grid = show;
        }
        if let Some(theme) = doc.theme {
            self.theme = theme;
        }
        if let Some(language) = doc.language {
            self.set_language(&language);
        }
        log::info!(
            "Loaded {}x{} project ({} painted cells)",
            self.config.width,
            self.config.height,
            self.history.current().painted_count()
        );
        Ok(())
    }
}

// ============================================================================
// TESTS
// ============================================================================
