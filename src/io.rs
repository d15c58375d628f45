use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use image::{RgbaImage, imageops};
use rayon::prelude::*;
use thiserror::Error;

use crate::canvas::Grid;
use crate::project::{ProjectDocument, ProjectError};

/// Largest edge (in pixels) of an exported PNG. Keeps `scale` from producing
/// absurd allocations on big grids.
pub const MAX_EXPORT_DIM: u32 = 16_384;

/// Default edge length of library thumbnails.
pub const THUMBNAIL_SIZE: u32 = 128;

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("PNG encoding error: {0}")]
    Png(#[from] png::EncodingError),
    #[error("export scale must be positive")]
    ZeroScale,
    #[error("export of {width}x{height} pixels exceeds the {max}px limit")]
    TooLarge { width: u32, height: u32, max: u32 },
}

#[derive(Debug, Error)]
pub enum DataUrlError {
    #[error("missing 'data:' prefix")]
    MissingPrefix,
    #[error("only base64 data URLs are supported")]
    NotBase64,
    #[error("bad base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),
}

// ============================================================================
// DATA URLS
// ============================================================================

/// Decode the payload of a `data:<mime>;base64,<payload>` URL.
pub fn decode_data_url(url: &str) -> Result<Vec<u8>, DataUrlError> {
    let rest = url.trim().strip_prefix("data:").ok_or(DataUrlError::MissingPrefix)?;
    let (meta, payload) = rest.split_once(',').ok_or(DataUrlError::NotBase64)?;
    if !meta.ends_with(";base64") {
        return Err(DataUrlError::NotBase64);
    }
    Ok(BASE64.decode(payload.trim())?)
}

pub fn encode_data_url(mime: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", mime, BASE64.encode(bytes))
}

// ============================================================================
// RASTER EXPORT
// ============================================================================

/// Rasterize `grid` with each cell as a solid `scale x scale` square.
/// Empty cells are fully transparent; no grid lines.
pub fn render_grid(grid: &Grid, scale: u32) -> Result<RgbaImage, ExportError> {
    if scale == 0 {
        return Err(ExportError::ZeroScale);
    }
    let width = grid.width().saturating_mul(scale);
    let height = grid.height().saturating_mul(scale);
    if width > MAX_EXPORT_DIM || height > MAX_EXPORT_DIM {
        return Err(ExportError::TooLarge {
            width,
            height,
            max: MAX_EXPORT_DIM,
        });
    }

    let mut img = RgbaImage::new(width, height);
    let row_bytes = width as usize * 4;
    let cells = grid.cells();
    let grid_w = grid.width() as usize;
    let s = scale as usize;

    img.par_chunks_mut(row_bytes).enumerate().for_each(|(py, row)| {
        let gy = py / s;
        let grid_row = &cells[gy * grid_w..(gy + 1) * grid_w];
        for (gx, cell) in grid_row.iter().enumerate() {
            let Some(color) = cell else { continue };
            let px = color.to_rgba().0;
            let start = gx * s * 4;
            for chunk in row[start..start + s * 4].chunks_exact_mut(4) {
                chunk.copy_from_slice(&px);
            }
        }
    });

    Ok(img)
}

/// Encode an RGBA image as PNG bytes.
pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>, ExportError> {
    let mut out = Vec::new();
    {
        let mut encoder = png::Encoder::new(&mut out, image.width(), image.height());
        encoder.set_color(png::ColorType::Rgba);
        encoder.set_depth(png::BitDepth::Eight);
        let mut writer = encoder.write_header()?;
        writer.write_image_data(image.as_raw())?;
        writer.finish()?;
    }
    Ok(out)
}

/// Render and write `grid` as a PNG file.
pub fn export_png(grid: &Grid, scale: u32, path: &Path) -> Result<(), ExportError> {
    let img = render_grid(grid, scale)?;
    let bytes = encode_png(&img)?;
    let mut writer = BufWriter::new(File::create(path)?);
    writer.write_all(&bytes)?;
    writer.flush()?;
    log::info!(
        "Exported {}x{} grid to {} ({}x{} px)",
        grid.width(),
        grid.height(),
        path.display(),
        img.width(),
        img.height()
    );
    Ok(())
}

/// Small PNG preview as a `data:` URL, fitted inside `max_side` pixels.
/// Cells stay crisp: integer upscaling, nearest-neighbour downscaling.
pub fn thumbnail_data_url(grid: &Grid, max_side: u32) -> Result<String, ExportError> {
    let max_side = max_side.max(1);
    let longest = grid.width().max(grid.height());
    let scale = (max_side / longest).max(1);
    let mut img = render_grid(grid, scale)?;
    if img.width() > max_side || img.height() > max_side {
        let ratio = max_side as f32 / img.width().max(img.height()) as f32;
        let w = ((img.width() as f32 * ratio) as u32).max(1);
        let h = ((img.height() as f32 * ratio) as u32).max(1);
        img = imageops::resize(&img, w, h, imageops::FilterType::Nearest);
    }
    Ok(encode_data_url("image/png", &encode_png(&img)?))
}

// ============================================================================
// PROJECT FILES
// ============================================================================

/// `pixelcraft-project-YYYY-MM-DD.json` for today's local date.
pub fn default_project_filename() -> String {
    format!("pixelcraft-project-{}.json", chrono::Local::now().format("%Y-%m-%d"))
}

pub fn save_project(doc: &ProjectDocument, path: &Path) -> Result<(), ProjectError> {
    let json = doc.to_json_pretty()?;
    let mut writer = BufWriter::new(File::create(path)?);
    writer.write_all(json.as_bytes())?;
    writer.flush()?;
    log::info!("Saved project to {}", path.display());
    Ok(())
}

/// Read and validate a project document. Nothing is applied to any editor here.
pub fn load_project(path: &Path) -> Result<ProjectDocument, ProjectError> {
    let text = std::fs::read_to_string(path)?;
    let doc = ProjectDocument::from_json(&text)?;
    log::info!("Loaded project {}", path.display());
    Ok(doc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::Rgb;
    use image::Rgba;

    #[test]
    fn render_paints_solid_squares_and_leaves_empty_transparent() {
        let grid = Grid::blank(2, 1).with_cell(1, 0, Some(Rgb::new(255, 0, 0)));
        let img = render_grid(&grid, 3).unwrap();
        assert_eq!(img.dimensions(), (6, 3));
        for y in 0..3 {
            for x in 0..3 {
                assert_eq!(*img.get_pixel(x, y), Rgba([0, 0, 0, 0]));
                assert_eq!(*img.get_pixel(x + 3, y), Rgba([255, 0, 0, 255]));
            }
        }
    }

    #[test]
    fn render_rejects_zero_and_oversized_scales() {
        let grid = Grid::blank(4, 4);
        assert!(matches!(render_grid(&grid, 0), Err(ExportError::ZeroScale)));
        assert!(matches!(render_grid(&grid, MAX_EXPORT_DIM), Err(ExportError::TooLarge { .. })));
    }

    #[test]
    fn png_bytes_decode_back_to_the_same_pixels() {
        let grid = Grid::blank(2, 2).with_cell(0, 1, Some(Rgb::new(1, 2, 3)));
        let img = render_grid(&grid, 2).unwrap();
        let bytes = encode_png(&img).unwrap();
        let decoded = image::load_from_memory(&bytes).unwrap().to_rgba8();
        assert_eq!(decoded, img);
    }

    #[test]
    fn data_url_round_trip() {
        let url = encode_data_url("image/png", b"hello");
        assert!(url.starts_with("data:image/png;base64,"));
        assert_eq!(decode_data_url(&url).unwrap(), b"hello");
        assert!(matches!(decode_data_url("hello"), Err(DataUrlError::MissingPrefix)));
        assert!(matches!(decode_data_url("data:text/plain,hi"), Err(DataUrlError::NotBase64)));
        assert!(matches!(decode_data_url("data:image/png;base64,@@@"), Err(DataUrlError::Base64(_))));
    }

    #[test]
    fn thumbnail_fits_inside_the_requested_box() {
        let grid = Grid::blank(10, 5).with_cell(0, 0, Some(Rgb::WHITE));
        let url = thumbnail_data_url(&grid, 64).unwrap();
        let bytes = decode_data_url(&url).unwrap();
        let img = image::load_from_memory(&bytes).unwrap();
        assert_eq!((img.width(), img.height()), (60, 30));

        let big = Grid::blank(200, 100);
        let bytes = decode_data_url(&thumbnail_data_url(&big, 64).unwrap()).unwrap();
        let img = image::load_from_memory(&bytes).unwrap();
        assert!(img.width() <= 64 && img.height() <= 64);
    }

    #[test]
    fn default_filename_has_date_and_extension() {
        let name = default_project_filename();
        assert!(name.starts_with("pixelcraft-project-"));
        assert!(name.ends_with(".json"));
        assert_eq!(name.len(), "pixelcraft-project-2024-01-01.json".len());
    }

    #[test]
    fn project_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(default_project_filename());
        let grid = Grid::blank(3, 2).with_cell(2, 1, Some(Rgb::new(9, 8, 7)));
        let doc = ProjectDocument::new(grid, crate::canvas::GridConfig::new(3, 2, 12));
        save_project(&doc, &path).unwrap();
        assert_eq!(load_project(&path).unwrap(), doc);

        std::fs::write(&path, "{ broken").unwrap();
        assert!(matches!(load_project(&path), Err(ProjectError::Json(_))));
        assert!(matches!(load_project(&dir.path().join("missing.json")), Err(ProjectError::Io(_))));
    }
}
