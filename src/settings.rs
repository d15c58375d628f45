use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::canvas::{DEFAULT_CELL_SIZE, DEFAULT_GRID_SIZE, GridConfig, MAX_GRID_DIM, ResizePolicy};
use crate::components::history::DEFAULT_MAX_HISTORY;
use crate::theme::ThemeMode;

const SETTINGS_FILE: &str = "pixelcraft_settings.cfg";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("no settings directory available on this platform")]
    NoSettingsDir,
    #[error("could not write settings to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Application settings that persist across sessions
#[derive(Clone, Debug, PartialEq)]
pub struct AppSettings {
    /// Maximum number of undo steps
    pub max_undo_steps: usize,
    /// Size of a new canvas
    pub default_width: u32,
    pub default_height: u32,
    /// On-screen size of one cell in pixels
    pub cell_size: u32,
    /// Pixels per cell when exporting PNG
    pub export_scale: u32,
    /// What happens to existing cells when the grid is resized
    pub resize_policy: ResizePolicy,
    pub theme: ThemeMode,
    /// Language code (e.g. "en", "zh-CN"). Empty string = auto-detect system language.
    pub language: String,
    /// Directory for the file-backed project library. `None` = platform data dir.
    pub library_dir: Option<PathBuf>,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            max_undo_steps: DEFAULT_MAX_HISTORY,
            default_width: DEFAULT_GRID_SIZE,
            default_height: DEFAULT_GRID_SIZE,
            cell_size: DEFAULT_CELL_SIZE,
            export_scale: 1,
            resize_policy: ResizePolicy::default(),
            theme: ThemeMode::default(),
            language: String::new(), // empty = auto-detect on first boot
            library_dir: None,
        }
    }
}

impl AppSettings {
    /// Path to the settings file.
    /// On Linux:   ~/.config/pixelcraft/pixelcraft_settings.cfg  (XDG_CONFIG_HOME respected)
    /// On Windows: %APPDATA%\PixelCraft\pixelcraft_settings.cfg
    /// On macOS:   ~/Library/Application Support/PixelCraft/pixelcraft_settings.cfg
    pub fn settings_path() -> Option<PathBuf> {
        #[cfg(target_os = "windows")]
        {
            let appdata = std::env::var("APPDATA").or_else(|_| std::env::var("USERPROFILE")).ok()?;
            return Some(PathBuf::from(appdata).join("PixelCraft").join(SETTINGS_FILE));
        }
        #[cfg(target_os = "macos")]
        {
            let home = std::env::var("HOME").ok()?;
            return Some(
                PathBuf::from(home)
                    .join("Library")
                    .join("Application Support")
                    .join("PixelCraft")
                    .join(SETTINGS_FILE),
            );
        }
        #[cfg(not(any(target_os = "windows", target_os = "macos")))]
        {
            let config_dir = std::env::var("XDG_CONFIG_HOME")
                .map(PathBuf::from)
                .or_else(|_| std::env::var("HOME").map(|h| PathBuf::from(h).join(".config")))
                .ok()?;
            Some(config_dir.join("pixelcraft").join(SETTINGS_FILE))
        }
    }

    /// Load settings from the platform location (defaults if missing or corrupt).
    pub fn load() -> Self {
        match Self::settings_path() {
            Some(path) => Self::load_from(&path),
            None => Self::default(),
        }
    }

    pub fn load_from(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => Self::parse(&content),
            Err(e) => {
                if e.kind() != std::io::ErrorKind::NotFound {
                    log::warn!("Could not read settings {}: {}", path.display(), e);
                }
                Self::default()
            }
        }
    }

    pub fn save(&self) -> Result<(), SettingsError> {
        let path = Self::settings_path().ok_or(SettingsError::NoSettingsDir)?;
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), SettingsError> {
        let write = || -> std::io::Result<()> {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, self.to_config_string())
        };
        write().map_err(|source| SettingsError::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Parse `key=value` lines. Unknown keys are ignored, bad values keep the default.
    pub fn parse(content: &str) -> Self {
        let defaults = Self::default();
        let mut s = defaults.clone();
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, val)) = line.split_once('=') else { continue };
            let key = key.trim();
            let val = val.trim();
            match key {
                "max_undo_steps" => {
                    s.max_undo_steps = val.parse().ok().filter(|&n| n > 0).unwrap_or(defaults.max_undo_steps);
                }
                "default_width" => {
                    s.default_width = parse_dim(val).unwrap_or(defaults.default_width);
                }
                "default_height" => {
                    s.default_height = parse_dim(val).unwrap_or(defaults.default_height);
                }
                "cell_size" => {
                    s.cell_size = val.parse().ok().filter(|&n| n > 0).unwrap_or(defaults.cell_size);
                }
                "export_scale" => {
                    s.export_scale = val.parse().ok().filter(|&n| n > 0).unwrap_or(defaults.export_scale);
                }
                "resize_policy" => {
                    s.resize_policy = val.parse().unwrap_or(defaults.resize_policy);
                }
                "theme" => {
                    s.theme = val.parse().unwrap_or(defaults.theme);
                }
                "language" => {
                    s.language = val.to_string();
                }
                "library_dir" => {
                    s.library_dir = (!val.is_empty()).then(|| PathBuf::from(val));
                }
                _ => log::debug!("Ignoring unknown setting '{}'", key),
            }
        }
        s
    }

    pub fn to_config_string(&self) -> String {
        format!(
            "max_undo_steps={}\n\
             default_width={}\n\
             default_height={}\n\
             cell_size={}\n\
             export_scale={}\n\
             resize_policy={}\n\
             theme={}\n\
             language={}\n\
             library_dir={}\n",
            self.max_undo_steps,
            self.default_width,
            self.default_height,
            self.cell_size,
            self.export_scale,
            self.resize_policy.as_str(),
            self.theme.as_str(),
            self.language,
            self.library_dir
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_default(),
        )
    }

    /// Grid configuration for a new canvas.
    pub fn grid_config(&self) -> GridConfig {
        GridConfig::new(self.default_width, self.default_height, self.cell_size)
    }

    /// Configured language, or the detected system language when unset.
    pub fn effective_language(&self) -> String {
        if self.language.is_empty() {
            crate::i18n::system_language().to_string()
        } else {
            crate::i18n::normalize(&self.language)
        }
    }
}

fn parse_dim(val: &str) -> Option<u32> {
    val.parse().ok().filter(|&n| n > 0 && n <= MAX_GRID_DIM)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let s = AppSettings::default();
        assert_eq!(s.max_undo_steps, 50);
        assert_eq!(s.grid_config(), GridConfig::new(32, 32, 16));
        assert_eq!(s.resize_policy, ResizePolicy::Preserve);
    }

    #[test]
    fn parse_reads_known_keys_and_skips_garbage() {
        let s = AppSettings::parse(
            "# comment\n\
             max_undo_steps=20\n\
             default_width = 64\n\
             default_height=0\n\
             resize_policy=discard\n\
             theme=dark\n\
             no_equals_sign\n\
             mystery=42\n\
             language=ja\n",
        );
        assert_eq!(s.max_undo_steps, 20);
        assert_eq!(s.default_width, 64);
        assert_eq!(s.default_height, 32); // 0 rejected
        assert_eq!(s.resize_policy, ResizePolicy::Discard);
        assert_eq!(s.theme, ThemeMode::Dark);
        assert_eq!(s.language, "ja");
        assert_eq!(s.library_dir, None);
    }

    #[test]
    fn oversized_dimensions_fall_back() {
        let s = AppSettings::parse("default_width=99999\n");
        assert_eq!(s.default_width, DEFAULT_GRID_SIZE);
    }

    #[test]
    fn save_then_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(SETTINGS_FILE);
        let s = AppSettings {
            max_undo_steps: 10,
            default_width: 16,
            default_height: 8,
            cell_size: 24,
            export_scale: 4,
            resize_policy: ResizePolicy::Discard,
            theme: ThemeMode::Light,
            language: "fr".to_string(),
            library_dir: Some(PathBuf::from("/tmp/pixel-library")),
        };
        s.save_to(&path).unwrap();
        assert_eq!(AppSettings::load_from(&path), s);
    }

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(AppSettings::load_from(&dir.path().join("absent.cfg")), AppSettings::default());
    }
}
