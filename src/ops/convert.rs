// ============================================================================
// IMAGE → GRID CONVERSION — decode, resample, alpha threshold, quantize
// ============================================================================

use std::collections::HashSet;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Instant;

use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};
use thiserror::Error;
use tokio::sync::oneshot;

use crate::canvas::{Cell, Grid, GridError, Rgb, check_dimensions};
use crate::io::{DataUrlError, decode_data_url};

/// Samples with alpha below this become empty cells.
pub const ALPHA_THRESHOLD: u8 = 128;

#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("failed to decode image: {0}")]
    Decode(#[from] image::ImageError),
    #[error("failed to read image: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid data URL: {0}")]
    InvalidDataUrl(#[from] DataUrlError),
    #[error("image has no pixels")]
    EmptyImage,
    #[error(transparent)]
    InvalidSize(#[from] GridError),
    #[error("image conversion was cancelled")]
    Cancelled,
    #[error("converted grid is {got_width}x{got_height} but the canvas is now {width}x{height}")]
    DimensionMismatch {
        got_width: u32,
        got_height: u32,
        width: u32,
        height: u32,
    },
}

/// Resampling filter used to shrink/grow the source to one sample per cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Resample {
    Nearest,
    #[default]
    Bilinear,
}

impl Resample {
    fn filter(self) -> FilterType {
        match self {
            Resample::Nearest => FilterType::Nearest,
            Resample::Bilinear => FilterType::Triangle,
        }
    }
}

impl FromStr for Resample {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "nearest" => Ok(Resample::Nearest),
            "bilinear" | "linear" | "triangle" => Ok(Resample::Bilinear),
            other => Err(format!("unknown resample filter '{}'", other)),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ConvertOptions {
    pub resample: Resample,
    /// Reduce the opaque cells to at most this many colors (2–256).
    pub max_colors: Option<usize>,
}

/// Where the raster comes from.
#[derive(Clone, Debug)]
pub enum ImageSource {
    Bytes(Vec<u8>),
    Path(PathBuf),
    /// `data:image/...;base64,...`
    DataUrl(String),
}

impl ImageSource {
    pub fn describe(&self) -> String {
        match self {
            ImageSource::Bytes(b) => format!("<{} bytes>", b.len()),
            ImageSource::Path(p) => p.display().to_string(),
            ImageSource::DataUrl(u) => format!("<data URL, {} chars>", u.len()),
        }
    }

    fn decode(&self) -> Result<RgbaImage, ConvertError> {
        let img = match self {
            ImageSource::Bytes(bytes) => image::load_from_memory(bytes)?,
            ImageSource::Path(path) => {
                let bytes = std::fs::read(path)?;
                image::load_from_memory(&bytes)?
            }
            ImageSource::DataUrl(url) => {
                let bytes = decode_data_url(url)?;
                image::load_from_memory(&bytes)?
            }
        };
        Ok(img.to_rgba8())
    }
}

/// Map one RGBA sample to a cell.
#[inline]
pub fn pixel_to_cell(p: &Rgba<u8>) -> Cell {
    if p[3] < ALPHA_THRESHOLD {
        None
    } else {
        Some(Rgb([p[0], p[1], p[2]]))
    }
}

/// Resample an already-decoded image to exactly `width x height` cells.
pub fn rgba_to_grid(
    image: &RgbaImage,
    width: u32,
    height: u32,
    options: &ConvertOptions,
) -> Result<Grid, ConvertError> {
    check_dimensions(width, height)?;
    if image.width() == 0 || image.height() == 0 {
        return Err(ConvertError::EmptyImage);
    }

    let sampled = if image.dimensions() == (width, height) {
        image.clone()
    } else {
        imageops::resize(image, width, height, options.resample.filter())
    };

    let mut cells: Vec<Cell> = sampled.pixels().map(pixel_to_cell).collect();
    if let Some(max_colors) = options.max_colors {
        quantize_cells(&mut cells, max_colors);
    }
    Ok(Grid::from_cells(width, height, cells)?)
}

/// Decode `source` and convert it. Blocking; see [`convert_in_background`].
pub fn image_to_grid(
    source: &ImageSource,
    width: u32,
    height: u32,
    options: &ConvertOptions,
) -> Result<Grid, ConvertError> {
    check_dimensions(width, height)?;
    let image = source.decode()?;
    rgba_to_grid(&image, width, height, options)
}

/// Reduce painted cells to at most `max_colors` colors with NeuQuant.
/// Does nothing when the cells already use few enough colors.
fn quantize_cells(cells: &mut [Cell], max_colors: usize) {
    let max_colors = max_colors.clamp(2, 256);
    let distinct: HashSet<Rgb> = cells.iter().flatten().copied().collect();
    if distinct.len() <= max_colors {
        return;
    }

    let pixels: Vec<u8> = cells
        .iter()
        .flatten()
        .flat_map(|c| [c.r(), c.g(), c.b(), 255])
        .collect();
    let nq = color_quant::NeuQuant::new(10, max_colors, &pixels);

    for cell in cells.iter_mut() {
        if let Some(c) = cell {
            let idx = nq.index_of(&[c.r(), c.g(), c.b(), 255]);
            if let Some(q) = nq.lookup(idx) {
                *cell = Some(Rgb([q[0], q[1], q[2]]));
            }
        }
    }
}

// ============================================================================
// BACKGROUND CONVERSION
// ============================================================================

/// A conversion running on a worker thread. Await [`PendingConversion::wait`],
/// or poll [`PendingConversion::try_take`] from a frame loop.
pub struct PendingConversion {
    rx: oneshot::Receiver<Result<Grid, ConvertError>>,
    cancelled: Arc<AtomicBool>,
    width: u32,
    height: u32,
    spawn_error: Option<std::io::Error>,
}

impl PendingConversion {
    fn new(
        rx: oneshot::Receiver<Result<Grid, ConvertError>>,
        cancelled: Arc<AtomicBool>,
        (width, height): (u32, u32),
        spawned: std::io::Result<()>,
    ) -> Self {
        Self {
            rx,
            cancelled,
            width,
            height,
            spawn_error: spawned.err(),
        }
    }

    pub fn target_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Request cancellation. The worker drops its result instead of delivering it.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// A worker that never started reports [`ConvertError::Io`].
    pub async fn wait(self) -> Result<Grid, ConvertError> {
        if let Some(e) = self.spawn_error {
            return Err(ConvertError::Io(e));
        }
        if self.is_cancelled() {
            return Err(ConvertError::Cancelled);
        }
        match self.rx.await {
            Ok(_) if self.cancelled.load(Ordering::SeqCst) => Err(ConvertError::Cancelled),
            Ok(result) => result,
            // Worker vanished without answering
            Err(_) => Err(ConvertError::Cancelled),
        }
    }

    /// Non-blocking poll. `None` while the worker is still running.
    pub fn try_take(&mut self) -> Option<Result<Grid, ConvertError>> {
        if let Some(e) = self.spawn_error.take() {
            return Some(Err(ConvertError::Io(e)));
        }
        if self.is_cancelled() {
            return Some(Err(ConvertError::Cancelled));
        }
        match self.rx.try_recv() {
            Ok(result) => Some(result),
            Err(oneshot::error::TryRecvError::Empty) => None,
            Err(oneshot::error::TryRecvError::Closed) => Some(Err(ConvertError::Cancelled)),
        }
    }
}

/// Start decoding + converting `source` on a dedicated worker thread.
///
/// The editor stays usable meanwhile; commit the result with
/// `Editor::apply_conversion` once it arrives.
pub fn convert_in_background(
    source: ImageSource,
    width: u32,
    height: u32,
    options: ConvertOptions,
) -> PendingConversion {
    let (tx, rx) = oneshot::channel();
    let cancelled = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&cancelled);

    let spawned = thread::Builder::new()
        .name("image-convert".to_string())
        .spawn(move || {
            if flag.load(Ordering::SeqCst) {
                return;
            }
            let start = Instant::now();
            let result = image_to_grid(&source, width, height, &options);
            match &result {
                Ok(_) => log::info!(
                    "Converted {} to {}x{} grid in {:.1?}",
                    source.describe(),
                    width,
                    height,
                    start.elapsed()
                ),
                Err(e) => log::warn!("Image conversion of {} failed: {}", source.describe(), e),
            }
            if flag.load(Ordering::SeqCst) {
                log::debug!("Discarding cancelled conversion of {}", source.describe());
                return;
            }
            let _ = tx.send(result);
        })
        .map(drop);

    if let Err(e) = &spawned {
        log::error!("Could not start image conversion worker: {}", e);
    }

    PendingConversion::new(rx, cancelled, (width, height), spawned)
}

/// Async convenience: convert on the worker and await the result.
pub async fn image_to_grid_async(
    source: ImageSource,
    width: u32,
    height: u32,
    options: ConvertOptions,
) -> Result<Grid, ConvertError> {
    convert_in_background(source, width, height, options).wait().await
}
