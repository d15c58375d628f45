// ============================================================================
// PROJECT DOCUMENT — the JSON shape shared by file export, import, and the
// session autosave
// ============================================================================

use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use crate::canvas::{Grid, GridConfig, GridError, ParseColorError, Rgb};
use crate::i18n;
use crate::theme::ThemeMode;

pub const DOCUMENT_VERSION: &str = "1.0";

#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed project JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("project is missing required field '{0}'")]
    MissingField(&'static str),
    #[error("invalid project grid: {0}")]
    Grid(#[from] GridError),
    #[error("grid is {grid_width}x{grid_height} but config says {width}x{height}")]
    ConfigMismatch {
        grid_width: u32,
        grid_height: u32,
        width: u32,
        height: u32,
    },
    #[error("invalid {field}: {source}")]
    Color {
        field: &'static str,
        #[source]
        source: ParseColorError,
    },
}

/// Wire form. Every field is optional here so that validation can name what is
/// missing instead of surfacing a generic parse error.
#[derive(Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct DocumentWire {
    #[serde(default)]
    grid: Option<Vec<String>>,
    #[serde(default)]
    config: Option<GridConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    custom_palette: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    selected_color: Option<String>,
    /// Absent → keep the receiver's image; `null` → no image.
    #[serde(default, deserialize_with = "present_or_null", skip_serializing_if = "Option::is_none")]
    background_image: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    background_opacity: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    show_drawing_layer: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    show_reference_layer: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    show_grid: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    theme: Option<ThemeMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    version: Option<String>,
}

/// Distinguishes a present `null` from an absent field.
fn present_or_null<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// A validated project document.
///
/// `grid` and `config` are always present and consistent. Every other field is
/// `None` when the source document omitted it; the receiving editor keeps its
/// current value for those.
#[derive(Clone, Debug, PartialEq)]
pub struct ProjectDocument {
    pub grid: Grid,
    pub config: GridConfig,
    pub custom_palette: Option<Vec<Rgb>>,
    pub selected_color: Option<Rgb>,
    pub background_image: Option<Option<String>>,
    pub background_opacity: Option<f32>,
    pub show_drawing_layer: Option<bool>,
    pub show_reference_layer: Option<bool>,
    pub show_grid: Option<bool>,
    pub theme: Option<ThemeMode>,
    pub language: Option<String>,
}

impl ProjectDocument {
    /// Minimal document: grid and config only.
    pub fn new(grid: Grid, config: GridConfig) -> Self {
        Self {
            grid,
            config,
            custom_palette: None,
            selected_color: None,
            background_image: None,
            background_opacity: None,
            show_drawing_layer: None,
            show_reference_layer: None,
            show_grid: None,
            theme: None,
            language: None,
        }
    }

    /// Parse and validate. Either the whole document is valid or nothing is returned.
    pub fn from_json(text: &str) -> Result<Self, ProjectError> {
        let wire: DocumentWire = serde_json::from_str(text)?;
        Self::from_wire(wire)
    }

    /// Validate an already-parsed JSON value (e.g. a library entry).
    pub fn from_value(value: serde_json::Value) -> Result<Self, ProjectError> {
        let wire: DocumentWire = serde_json::from_value(value)?;
        Self::from_wire(wire)
    }

    /// Check that `config` is usable and describes `grid`. Documents built
    /// through [`ProjectDocument::from_json`] always pass.
    pub fn validate(&self) -> Result<(), ProjectError> {
        self.config.validate()?;
        if self.grid.width() != self.config.width || self.grid.height() != self.config.height {
            return Err(ProjectError::ConfigMismatch {
                grid_width: self.grid.width(),
                grid_height: self.grid.height(),
                width: self.config.width,
                height: self.config.height,
            });
        }
        Ok(())
    }

    pub fn to_json(&self) -> Result<String, ProjectError> {
        Ok(serde_json::to_string(&self.to_wire())?)
    }

    pub fn to_json_pretty(&self) -> Result<String, ProjectError> {
        Ok(serde_json::to_string_pretty(&self.to_wire())?)
    }

    fn from_wire(wire: DocumentWire) -> Result<Self, ProjectError> {
        let cells = wire.grid.ok_or(ProjectError::MissingField("grid"))?;
        let config = wire.config.ok_or(ProjectError::MissingField("config"))?;
        config.validate()?;
        let grid = Grid::from_strings(config.width, config.height, &cells)?;

        let custom_palette = wire
            .custom_palette
            .map(|colors| {
                colors
                    .iter()
                    .map(|c| c.parse::<Rgb>())
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(|source| ProjectError::Color {
                        field: "customPalette",
                        source,
                    })
            })
            .transpose()?;

        let selected_color = wire
            .selected_color
            .map(|c| c.parse::<Rgb>())
            .transpose()
            .map_err(|source| ProjectError::Color {
                field: "selectedColor",
                source,
            })?;

        if let Some(version) = wire.version.as_deref()
            && version != DOCUMENT_VERSION
        {
            log::warn!("Project document version {} (expected {}), loading anyway", version, DOCUMENT_VERSION);
        }

        Ok(Self {
            grid,
            config,
            custom_palette,
            selected_color,
            background_image: wire.background_image,
            background_opacity: wire.background_opacity.map(|o| o.clamp(0.0, 1.0)),
            show_drawing_layer: wire.show_drawing_layer,
            show_reference_layer: wire.show_reference_layer,
            show_grid: wire.show_grid,
            theme: wire.theme,
            language: wire.language.map(|l| i18n::normalize(&l)),
        })
    }

    fn to_wire(&self) -> DocumentWire {
        DocumentWire {
            grid: Some(self.grid.to_strings()),
            config: Some(self.config),
            custom_palette: self
                .custom_palette
                .as_ref()
                .map(|p| p.iter().map(|c| c.to_string()).collect()),
            selected_color: self.selected_color.map(|c| c.to_string()),
            background_image: self.background_image.clone(),
            background_opacity: self.background_opacity,
            show_drawing_layer: self.show_drawing_layer,
            show_reference_layer: self.show_reference_layer,
            show_grid: self.show_grid,
            theme: self.theme,
            language: self.language.clone(),
            version: Some(DOCUMENT_VERSION.to_string()),
        }
    }
}
