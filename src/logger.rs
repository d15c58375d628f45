//! Session logger: the `log` backend that writes everything to a single file
//! in the OS data directory.
//!
//! The file is **truncated (overwritten) at each launch**, so it only ever
//! contains output from the most-recent session. Warnings and errors are also
//! mirrored to stderr, and a panic hook copies panic messages into the file.
//!
//! Log location:
//!   Windows:  `%APPDATA%\PixelCraft\pixelcraft.log`
//!   Linux:    `~/.local/share/PixelCraft/pixelcraft.log`
//!   macOS:    `~/Library/Application Support/PixelCraft/pixelcraft.log`
//!
//! The level comes from `PIXELCRAFT_LOG` (`error`, `warn`, `info`, `debug`,
//! `trace`, `off`), default `info`.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};

use log::{LevelFilter, Log, Metadata, Record};

pub const LEVEL_ENV: &str = "PIXELCRAFT_LOG";

static LOGGER: OnceLock<SessionLogger> = OnceLock::new();

pub struct SessionLogger {
    file: Option<Mutex<File>>,
    path: Option<PathBuf>,
    level: LevelFilter,
    mirror_stderr: bool,
}

impl SessionLogger {
    /// Open (truncating) `path`. A file that cannot be opened leaves a
    /// stderr-only logger rather than failing.
    pub fn open(path: &Path, level: LevelFilter, mirror_stderr: bool) -> Self {
        if let Some(parent) = path.parent() {
            let _ = fs::create_dir_all(parent);
        }
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path);
        match file {
            Ok(f) => Self {
                file: Some(Mutex::new(f)),
                path: Some(path.to_path_buf()),
                level,
                mirror_stderr,
            },
            Err(e) => {
                // Can't open log file: not fatal, just skip
                eprintln!("[logger] Failed to open log file {:?}: {}", path, e);
                Self {
                    file: None,
                    path: None,
                    level,
                    mirror_stderr,
                }
            }
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Write a raw line. Silently ignores I/O errors so that logging never
    /// crashes the application.
    fn write_line(&self, line: &str) {
        if let Some(mutex) = &self.file
            && let Ok(mut file) = mutex.lock()
        {
            let _ = writeln!(file, "{}", line);
        }
    }
}

impl Log for SessionLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let line = format_line(&timestamp(), record.level().as_str(), &record.args().to_string());
        self.write_line(&line);
        if self.mirror_stderr && record.level() <= log::Level::Warn {
            eprintln!("{}", line);
        }
    }

    fn flush(&self) {
        if let Some(mutex) = &self.file
            && let Ok(mut file) = mutex.lock()
        {
            let _ = file.flush();
        }
    }
}

/// `[HH:MM:SS] [LEVEL] msg`
pub fn format_line(ts: &str, level: &str, msg: &str) -> String {
    format!("[{}] [{}] {}", ts, level, msg)
}

/// Level from `PIXELCRAFT_LOG`, falling back to `default`.
pub fn level_from_env(default: LevelFilter) -> LevelFilter {
    std::env::var(LEVEL_ENV)
        .ok()
        .and_then(|v| parse_level(&v))
        .unwrap_or(default)
}

pub fn parse_level(value: &str) -> Option<LevelFilter> {
    value.trim().parse().ok()
}

/// Initialise the session logger. Call once, before any logging.
///
/// * Creates (or truncates) the log file.
/// * Installs the logger as the `log` backend.
/// * Installs a panic hook that writes the panic message to the log before
///   propagating to the default handler.
///
/// `verbose` forces `debug` regardless of the environment.
pub fn init(verbose: bool) {
    let level = if verbose {
        LevelFilter::Debug
    } else {
        level_from_env(LevelFilter::Info)
    };
    let path = log_file_path();
    let logger = LOGGER.get_or_init(|| SessionLogger::open(&path, level, true));

    if log::set_logger(logger).is_err() {
        // Already installed (tests, repeated init)
        return;
    }
    log::set_max_level(level);

    // Write session header
    logger.write_line(&format!(
        "=== PixelCraft session started {} ===",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    ));
    if let Some(p) = logger.path() {
        logger.write_line(&format!("Log file: {}", p.display()));
    }
    logger.write_line("");

    // Panic hook: mirror panic info to the log, then run the previous handler
    let prev = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        if let Some(logger) = LOGGER.get() {
            logger.write_line(&format_line(&timestamp(), "PANIC", &info.to_string()));
            logger.flush();
        }
        prev(info);
    }));
}

/// Returns the path to the current session log file.
pub fn log_path() -> Option<&'static Path> {
    LOGGER.get().and_then(|l| l.path())
}

fn log_file_path() -> PathBuf {
    data_dir().join("PixelCraft").join("pixelcraft.log")
}

/// Platform data directory (without the app sub-folder).
pub fn data_dir() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        if let Ok(appdata) = std::env::var("APPDATA") {
            return PathBuf::from(appdata);
        }
    }
    #[cfg(target_os = "macos")]
    {
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home)
                .join("Library")
                .join("Application Support");
        }
    }
    // Linux / fallback
    if let Ok(xdg) = std::env::var("XDG_DATA_HOME") {
        return PathBuf::from(xdg);
    }
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".local").join("share");
    }
    // Last resort: current working directory
    PathBuf::from(".")
}

/// Local wall-clock `HH:MM:SS`.
fn timestamp() -> String {
    chrono::Local::now().format("%H:%M:%S").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use log::Level;

    fn record_at(logger: &SessionLogger, level: Level, msg: &str) {
        logger.log(
            &Record::builder()
                .level(level)
                .args(format_args!("{}", msg))
                .build(),
        );
    }

    #[test]
    fn writes_level_tagged_lines_and_truncates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("session.log");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "old session\n").unwrap();

        let logger = SessionLogger::open(&path, LevelFilter::Info, false);
        record_at(&logger, Level::Info, "hello");
        record_at(&logger, Level::Debug, "hidden");
        record_at(&logger, Level::Error, "boom");
        logger.flush();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(!text.contains("old session"));
        assert!(text.contains("[INFO] hello"));
        assert!(text.contains("[ERROR] boom"));
        assert!(!text.contains("hidden"));
    }

    #[test]
    fn line_format() {
        assert_eq!(format_line("12:00:01", "WARN", "careful"), "[12:00:01] [WARN] careful");
        assert_eq!(timestamp().len(), 8);
    }

    #[test]
    fn level_parsing() {
        assert_eq!(parse_level("debug"), Some(LevelFilter::Debug));
        assert_eq!(parse_level(" WARN "), Some(LevelFilter::Warn));
        assert_eq!(parse_level("off"), Some(LevelFilter::Off));
        assert_eq!(parse_level("loud"), None);
    }
}
