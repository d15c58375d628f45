//! End-to-end editing: strokes, fills, undo/redo, resize, and image import.

use pixelcraft::ops::convert::{ConvertOptions, ImageSource, Resample};
use pixelcraft::{Editor, Grid, GridConfig, PointerOutcome, ResizePolicy, Rgb, Tool};

const RED: Rgb = Rgb::new(255, 0, 0);
const GREEN: Rgb = Rgb::new(0, 255, 0);

fn editor(w: u32, h: u32) -> Editor {
    Editor::new(GridConfig::new(w, h, 16), 50)
}

fn drag(ed: &mut Editor, points: &[(i32, i32)]) {
    let (x0, y0) = points[0];
    ed.pointer_down(x0, y0);
    for &(x, y) in &points[1..] {
        ed.pointer_move(x, y);
    }
    ed.pointer_up();
}

#[test]
fn each_stroke_is_one_undo_step() {
    let mut ed = editor(8, 8);
    ed.select_color(RED);
    drag(&mut ed, &[(0, 0), (1, 0), (2, 0), (3, 0)]);
    ed.select_color(GREEN);
    drag(&mut ed, &[(0, 1), (1, 1), (99, 99), (2, 1)]);

    assert_eq!(ed.grid().painted_count(), 7);
    assert_eq!(ed.history().undo_history(), vec!["Pencil", "Pencil"]);

    ed.undo();
    assert_eq!(ed.grid().painted_count(), 4);
    ed.undo();
    assert!(ed.grid().is_blank());
    assert_eq!(ed.undo(), None);

    ed.redo();
    ed.redo();
    assert_eq!(ed.grid().get(2, 1), Some(Some(GREEN)));
}

#[test]
fn fill_inside_an_outline() {
    let mut ed = editor(5, 5);
    ed.select_color(RED);
    // Box outline around (1,1)-(3,3)
    drag(&mut ed, &[(1, 1), (2, 1), (3, 1), (3, 2), (3, 3), (2, 3), (1, 3), (1, 2)]);

    ed.set_tool(Tool::Bucket);
    ed.select_color(GREEN);
    assert_eq!(ed.pointer_down(2, 2), PointerOutcome::Committed);
    assert_eq!(ed.grid().get(2, 2), Some(Some(GREEN)));
    assert_eq!(ed.grid().get(0, 0), Some(None));
    assert_eq!(ed.grid().get(1, 1), Some(Some(RED)));

    // Outside the box fills the 16-cell frame only
    ed.select_color(Rgb::BLACK);
    ed.pointer_down(0, 0);
    let black = ed.grid().cells().iter().filter(|c| **c == Some(Rgb::BLACK)).count();
    assert_eq!(black, 16);
}

#[test]
fn edit_after_undo_discards_redo() {
    let mut ed = editor(3, 1);
    drag(&mut ed, &[(0, 0)]);
    drag(&mut ed, &[(1, 0)]);
    ed.undo();
    drag(&mut ed, &[(2, 0)]);
    assert!(!ed.can_redo());
    assert_eq!(ed.grid().get(1, 0), Some(None));
    assert_eq!(ed.history().len(), 3);
}

#[test]
fn history_is_capped() {
    let mut ed = editor(64, 1);
    for x in 0..60 {
        drag(&mut ed, &[(x, 0)]);
    }
    assert_eq!(ed.history().len(), 50);
    let mut undone = 0;
    while ed.undo().is_some() {
        undone += 1;
    }
    assert_eq!(undone, 49);
    // Oldest surviving snapshot still has the first 10 strokes
    assert_eq!(ed.grid().painted_count(), 11);
}

#[test]
fn preserve_resize_crops_and_pads() {
    let mut ed = editor(4, 4);
    ed.select_color(RED);
    drag(&mut ed, &[(0, 0), (3, 3)]);

    ed.resize(2, 6).unwrap();
    assert_eq!(ed.grid().len(), 12);
    assert_eq!(ed.grid().get(0, 0), Some(Some(RED)));
    assert!(ed.grid().cells()[2..].iter().all(Option::is_none));

    ed.set_resize_policy(ResizePolicy::Discard);
    ed.resize(3, 3).unwrap();
    assert!(ed.grid().is_blank());
}

#[tokio::test]
async fn background_import_is_one_history_entry() {
    let mut ed = editor(2, 2);
    let mut img = image::RgbaImage::new(2, 2);
    img.put_pixel(0, 0, image::Rgba([200, 10, 10, 255]));
    img.put_pixel(1, 1, image::Rgba([10, 200, 10, 40]));
    let bytes = pixelcraft::io::encode_png(&img).unwrap();

    let pending = ed.start_conversion(
        ImageSource::Bytes(bytes),
        ConvertOptions {
            resample: Resample::Nearest,
            max_colors: None,
        },
    );
    // Editing stays possible while the worker runs
    drag(&mut ed, &[(1, 0)]);

    let result = pending.wait().await;
    ed.apply_conversion(result).unwrap();
    assert_eq!(ed.grid().get(0, 0), Some(Some(Rgb::new(200, 10, 10))));
    assert_eq!(ed.grid().get(1, 1), Some(None));
    assert_eq!(ed.undo().as_deref(), Some("Import image"));
    assert_eq!(ed.grid().get(1, 0), Some(Some(Rgb::BLACK)));
}

#[tokio::test]
async fn resized_canvas_rejects_stale_import() {
    let mut ed = editor(4, 4);
    let grid = Grid::blank(4, 4).with_cell(0, 0, Some(RED));
    ed.resize(8, 8).unwrap();
    assert!(ed.apply_conversion(Ok(grid)).is_err());
    assert!(!ed.can_undo());
}
