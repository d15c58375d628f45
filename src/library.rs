// ============================================================================
// LIBRARY — named projects and the session autosave, persisted through a
// small key-value seam so the same code runs against files or memory
// ============================================================================

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::app::{DEFAULT_BACKGROUND_OPACITY, Editor};
use crate::canvas::GridConfig;
use crate::io::{self, ExportError, THUMBNAIL_SIZE};
use crate::project::{ProjectDocument, ProjectError};
use crate::settings::AppSettings;

/// Key holding the JSON array of saved projects.
pub const LIBRARY_KEY: &str = "pixelCraftLibrary";
/// Key holding the autosaved editor state.
pub const SESSION_KEY: &str = "pixelCraftState";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage I/O error for '{key}': {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid storage key '{0}'")]
    InvalidKey(String),
    #[error("stored data is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("no project with id '{0}'")]
    NotFound(String),
    #[error(transparent)]
    Project(#[from] ProjectError),
    #[error("could not render thumbnail: {0}")]
    Thumbnail(#[from] ExportError),
}

// ============================================================================
// KEY-VALUE STORES
// ============================================================================

/// String-to-string persistence, the shape of browser local storage.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&mut self, key: &str) -> Result<(), StorageError>;
}

/// Volatile store, for tests and for running without a writable disk.
#[derive(Default, Debug, Clone)]
pub struct MemoryStore {
    values: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        self.values.remove(key);
        Ok(())
    }
}

/// One `<key>.json` file per key inside a directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// `<data dir>/PixelCraft/storage`
    pub fn default_location() -> PathBuf {
        crate::logger::data_dir().join("PixelCraft").join("storage")
    }

    /// Store rooted at the configured `library_dir`, else [`FileStore::default_location`].
    pub fn from_settings(settings: &AppSettings) -> Self {
        Self::new(
            settings
                .library_dir
                .clone()
                .unwrap_or_else(Self::default_location),
        )
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self.dir.join(format!("{}.json", key)))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StorageError::Io {
                key: key.to_string(),
                source,
            }),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        let io_err = |source| StorageError::Io {
            key: key.to_string(),
            source,
        };
        fs::create_dir_all(&self.dir).map_err(io_err)?;
        // Write-then-rename so a crash never leaves a half-written value
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value).map_err(io_err)?;
        fs::rename(&tmp, &path).map_err(io_err)?;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StorageError::Io {
                key: key.to_string(),
                source,
            }),
        }
    }
}

/// Log a storage failure and hand it back. Storage is never fatal to the session.
fn logged<T>(what: &str, result: Result<T, StorageError>) -> Result<T, StorageError> {
    if let Err(e) = &result {
        log::warn!("{} failed: {}", what, e);
    }
    result
}

// ============================================================================
// PROJECT LIBRARY
// ============================================================================

fn default_true() -> bool {
    true
}

fn default_opacity() -> f32 {
    DEFAULT_BACKGROUND_OPACITY
}

/// A saved project as stored in the library array.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LibraryEntry {
    pub id: String,
    pub name: String,
    /// PNG `data:` URL preview.
    pub thumbnail: String,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
    pub grid: Vec<String>,
    pub config: GridConfig,
    pub custom_palette: Vec<String>,
    pub selected_color: String,
    #[serde(default = "default_true")]
    pub show_drawing_layer: bool,
    #[serde(default = "default_true")]
    pub show_reference_layer: bool,
    #[serde(default)]
    pub background_image: Option<String>,
    #[serde(default = "default_opacity")]
    pub background_opacity: f32,
}

impl LibraryEntry {
    fn from_editor(name: String, editor: &Editor) -> Result<Self, StorageError> {
        let grid = editor.history().current();
        Ok(Self {
            id: uuid::Uuid::new_v4().to_string(),
            name,
            thumbnail: io::thumbnail_data_url(grid, THUMBNAIL_SIZE)?,
            timestamp: chrono::Utc::now().timestamp_millis(),
            grid: grid.to_strings(),
            config: editor.config(),
            custom_palette: editor.custom_palette().to_strings(),
            selected_color: editor.selected_color().to_string(),
            show_drawing_layer: editor.show_drawing_layer(),
            show_reference_layer: editor.show_reference_layer(),
            background_image: editor.background_image().map(str::to_string),
            background_opacity: editor.background_opacity(),
        })
    }

    /// Validate into a project document. Library and document share field names.
    pub fn to_document(&self) -> Result<ProjectDocument, StorageError> {
        let value = serde_json::to_value(self)?;
        Ok(ProjectDocument::from_value(value)?)
    }

    /// Local date of `timestamp`, `YYYY-MM-DD`.
    pub fn date_label(&self) -> String {
        chrono::DateTime::from_timestamp_millis(self.timestamp)
            .map(|t| t.with_timezone(&chrono::Local).format("%Y-%m-%d").to_string())
            .unwrap_or_default()
    }
}

/// Saved projects, newest first.
pub struct ProjectLibrary<S: KeyValueStore> {
    store: S,
}

impl<S: KeyValueStore> ProjectLibrary<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    pub fn list(&self) -> Result<Vec<LibraryEntry>, StorageError> {
        logged("Reading project library", self.read())
    }

    fn read(&self) -> Result<Vec<LibraryEntry>, StorageError> {
        match self.store.get(LIBRARY_KEY)? {
            Some(text) => Ok(serde_json::from_str(&text)?),
            None => Ok(Vec::new()),
        }
    }

    fn write(&mut self, entries: &[LibraryEntry]) -> Result<(), StorageError> {
        let text = serde_json::to_string(entries)?;
        self.store.set(LIBRARY_KEY, &text)
    }

    /// Save the editor's current state as a new entry at the top of the list.
    /// A blank name becomes `Untitled <date>`.
    pub fn save_current(&mut self, name: &str, editor: &Editor) -> Result<LibraryEntry, StorageError> {
        let name = match name.trim() {
            "" => format!("Untitled {}", chrono::Local::now().format("%Y-%m-%d")),
            trimmed => trimmed.to_string(),
        };
        let result = self.insert_new(name, editor);
        let entry = logged("Saving to project library", result)?;
        log::info!("Saved '{}' to library ({})", entry.name, entry.id);
        Ok(entry)
    }

    fn insert_new(&mut self, name: String, editor: &Editor) -> Result<LibraryEntry, StorageError> {
        let entry = LibraryEntry::from_editor(name, editor)?;
        let mut entries = self.read()?;
        entries.insert(0, entry.clone());
        self.write(&entries)?;
        Ok(entry)
    }

    pub fn get(&self, id: &str) -> Result<Option<LibraryEntry>, StorageError> {
        Ok(self.list()?.into_iter().find(|e| e.id == id))
    }

    fn require(&self, id: &str) -> Result<LibraryEntry, StorageError> {
        self.get(id)?.ok_or_else(|| StorageError::NotFound(id.to_string()))
    }

    /// Replace the editor state with a saved project. History restarts.
    pub fn load_into(&self, id: &str, editor: &mut Editor) -> Result<(), StorageError> {
        let result = self
            .require(id)
            .and_then(|e| e.to_document())
            .and_then(|doc| editor.load_document(doc).map_err(StorageError::from));
        logged("Loading library project", result)
    }

    /// Rename an entry. A blank name is ignored and returns `Ok(false)`.
    pub fn rename(&mut self, id: &str, name: &str) -> Result<bool, StorageError> {
        let name = name.trim();
        if name.is_empty() {
            return Ok(false);
        }
        let result = self.rename_entry(id, name);
        logged("Renaming library project", result)?;
        Ok(true)
    }

    fn rename_entry(&mut self, id: &str, name: &str) -> Result<(), StorageError> {
        let mut entries = self.read()?;
        let entry = entries
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or_else(|| StorageError::NotFound(id.to_string()))?;
        entry.name = name.to_string();
        self.write(&entries)
    }

    /// Remove an entry. Returns whether anything was deleted.
    pub fn delete(&mut self, id: &str) -> Result<bool, StorageError> {
        let result = self.remove_entry(id);
        logged("Deleting library project", result)
    }

    fn remove_entry(&mut self, id: &str) -> Result<bool, StorageError> {
        let mut entries = self.read()?;
        let before = entries.len();
        entries.retain(|e| e.id != id);
        if entries.len() == before {
            return Ok(false);
        }
        self.write(&entries)?;
        Ok(true)
    }

    /// The entry as a standalone project document, ready for `io::save_project`.
    pub fn export(&self, id: &str) -> Result<ProjectDocument, StorageError> {
        logged("Exporting library project", self.require(id).and_then(|e| e.to_document()))
    }
}

// ============================================================================
// SESSION AUTOSAVE
// ============================================================================

/// The editor state written after every change and restored at startup.
pub struct SessionStore<S: KeyValueStore> {
    store: S,
}

impl<S: KeyValueStore> SessionStore<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn save(&mut self, editor: &Editor) -> Result<(), StorageError> {
        let result = editor
            .to_document()
            .to_json()
            .map_err(StorageError::from)
            .and_then(|text| self.store.set(SESSION_KEY, &text));
        logged("Autosaving session", result)
    }

    /// Load the autosaved state into `editor`. `Ok(false)` when nothing was saved.
    /// A corrupt autosave leaves the editor untouched.
    pub fn restore(&self, editor: &mut Editor) -> Result<bool, StorageError> {
        match logged("Restoring session", self.read())? {
            Some(doc) => {
                logged("Restoring session", editor.load_document(doc).map_err(StorageError::from))?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn read(&self) -> Result<Option<ProjectDocument>, StorageError> {
        let Some(text) = self.store.get(SESSION_KEY)? else {
            return Ok(None);
        };
        Ok(Some(ProjectDocument::from_json(&text)?))
    }

    pub fn clear(&mut self) -> Result<(), StorageError> {
        logged("Clearing session", self.store.remove(SESSION_KEY))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::Rgb;

    const RED: Rgb = Rgb::new(255, 0, 0);

    fn painted_editor() -> Editor {
        let mut ed = Editor::new(GridConfig::new(4, 4, 16), 50);
        ed.select_color(RED);
        ed.pointer_down(1, 2);
        ed.pointer_up();
        ed
    }

    /// Store whose writes always fail.
    struct ReadOnlyStore;

    impl KeyValueStore for ReadOnlyStore {
        fn get(&self, _key: &str) -> Result<Option<String>, StorageError> {
            Ok(None)
        }
        fn set(&mut self, key: &str, _value: &str) -> Result<(), StorageError> {
            Err(StorageError::Io {
                key: key.to_string(),
                source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only"),
            })
        }
        fn remove(&mut self, _key: &str) -> Result<(), StorageError> {
            Ok(())
        }
    }

    #[test]
    fn empty_library_lists_nothing() {
        let lib = ProjectLibrary::new(MemoryStore::new());
        assert!(lib.list().unwrap().is_empty());
        assert!(lib.get("nope").unwrap().is_none());
    }

    #[test]
    fn save_puts_newest_first_with_thumbnail() {
        let ed = painted_editor();
        let mut lib = ProjectLibrary::new(MemoryStore::new());
        let first = lib.save_current("First", &ed).unwrap();
        let second = lib.save_current("  Second  ", &ed).unwrap();

        let list = lib.list().unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].id, second.id);
        assert_eq!(list[0].name, "Second");
        assert_eq!(list[1].id, first.id);
        assert_ne!(first.id, second.id);
        assert!(list[0].thumbnail.starts_with("data:image/png;base64,"));
        assert_eq!(list[0].grid[2 * 4 + 1], "#ff0000");
    }

    #[test]
    fn blank_name_becomes_untitled() {
        let mut lib = ProjectLibrary::new(MemoryStore::new());
        let entry = lib.save_current("   ", &Editor::default()).unwrap();
        assert!(entry.name.starts_with("Untitled "));
    }

    #[test]
    fn load_into_replaces_editor_state() {
        let ed = painted_editor();
        let mut lib = ProjectLibrary::new(MemoryStore::new());
        let id = lib.save_current("Art", &ed).unwrap().id;

        let mut other = Editor::default();
        lib.load_into(&id, &mut other).unwrap();
        assert_eq!(other.config(), GridConfig::new(4, 4, 16));
        assert_eq!(other.grid().get(1, 2), Some(Some(RED)));
        assert!(!other.can_undo());

        assert!(matches!(lib.load_into("missing", &mut other), Err(StorageError::NotFound(_))));
    }

    #[test]
    fn rename_and_delete() {
        let mut lib = ProjectLibrary::new(MemoryStore::new());
        let id = lib.save_current("Old", &Editor::default()).unwrap().id;

        assert!(!lib.rename(&id, "  ").unwrap());
        assert_eq!(lib.get(&id).unwrap().unwrap().name, "Old");
        assert!(lib.rename(&id, "New").unwrap());
        assert_eq!(lib.get(&id).unwrap().unwrap().name, "New");
        assert!(lib.rename("ghost", "x").is_err());

        assert!(lib.delete(&id).unwrap());
        assert!(!lib.delete(&id).unwrap());
        assert!(lib.list().unwrap().is_empty());
    }

    #[test]
    fn export_produces_a_valid_document() {
        let ed = painted_editor();
        let mut lib = ProjectLibrary::new(MemoryStore::new());
        let id = lib.save_current("Art", &ed).unwrap().id;
        let doc = lib.export(&id).unwrap();
        assert_eq!(doc.grid, *ed.grid());
        assert_eq!(doc.selected_color, Some(RED));
    }

    #[test]
    fn corrupt_library_is_an_error_not_a_panic() {
        let mut store = MemoryStore::new();
        store.set(LIBRARY_KEY, "{ not an array").unwrap();
        let lib = ProjectLibrary::new(store);
        assert!(matches!(lib.list(), Err(StorageError::Json(_))));
    }

    #[test]
    fn failed_write_leaves_editor_usable() {
        let ed = painted_editor();
        let mut lib = ProjectLibrary::new(ReadOnlyStore);
        assert!(matches!(lib.save_current("x", &ed), Err(StorageError::Io { .. })));

        let mut session = SessionStore::new(ReadOnlyStore);
        assert!(session.save(&ed).is_err());
        assert_eq!(ed.grid().painted_count(), 1);
    }

    #[test]
    fn session_round_trip() {
        let mut ed = painted_editor();
        ed.set_background_opacity(0.3);
        let mut session = SessionStore::new(MemoryStore::new());
        session.save(&ed).unwrap();

        let mut restored = Editor::default();
        assert!(session.restore(&mut restored).unwrap());
        assert_eq!(restored.grid(), ed.grid());
        assert_eq!(restored.background_opacity(), 0.3);

        session.clear().unwrap();
        assert!(!session.restore(&mut Editor::default()).unwrap());
    }

    #[test]
    fn corrupt_session_leaves_editor_untouched() {
        let mut store = MemoryStore::new();
        store.set(SESSION_KEY, r#"{"grid":["x"],"config":{"width":1,"height":1,"size":8}}"#).unwrap();
        let session = SessionStore::new(store);
        let mut ed = painted_editor();
        assert!(session.restore(&mut ed).is_err());
        assert_eq!(ed.config().width, 4);
        assert_eq!(ed.grid().painted_count(), 1);
    }

    #[test]
    fn file_store_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileStore::new(dir.path().join("storage"));
        assert_eq!(store.get("k").unwrap(), None);
        store.set("k", "v1").unwrap();
        store.set("k", "v2").unwrap();
        assert_eq!(FileStore::new(store.dir()).get("k").unwrap().as_deref(), Some("v2"));
        store.remove("k").unwrap();
        store.remove("k").unwrap();
        assert_eq!(store.get("k").unwrap(), None);
    }

    #[test]
    fn file_store_rejects_path_like_keys() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileStore::new(dir.path());
        assert!(matches!(store.set("../escape", "x"), Err(StorageError::InvalidKey(_))));
        assert!(matches!(store.get(""), Err(StorageError::InvalidKey(_))));
    }

    #[test]
    fn file_store_follows_configured_library_dir() {
        let dir = tempfile::tempdir().unwrap();
        let settings = AppSettings::parse(&format!("library_dir={}\n", dir.path().display()));
        assert_eq!(FileStore::from_settings(&settings).dir(), dir.path());
        assert_eq!(
            FileStore::from_settings(&AppSettings::default()).dir(),
            FileStore::default_location()
        );
    }

    #[test]
    fn library_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let mut lib = ProjectLibrary::new(FileStore::new(dir.path()));
        let id = lib.save_current("Disk", &painted_editor()).unwrap().id;

        let reopened = ProjectLibrary::new(FileStore::new(dir.path()));
        assert_eq!(reopened.get(&id).unwrap().unwrap().name, "Disk");
        assert!(dir.path().join(format!("{}.json", LIBRARY_KEY)).exists());
    }
}
