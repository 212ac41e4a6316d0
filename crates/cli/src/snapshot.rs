//! CPU-side PNG rendering of a flow simulation.
//!
//! The trail becomes a grayscale image normalized by its brightest pixel.
//! An optional overlay draws the active field layer on top, one short line
//! per cell.

use flowfield_core::{FieldError, Trail, Vector, VectorField};
use image::{Rgba, RgbaImage};
use std::path::Path;

use crate::error::CliError;

const OVERLAY_COLOR: Rgba<u8> = Rgba([255, 96, 64, 255]);

/// Renders the trail, optionally overlaid with the field's active layer.
///
/// Each overlay line starts at the cell origin `(row * res, col * res)` and
/// runs `res` pixels along the cell direction. An unready field draws
/// nothing. Returns `InvalidDimensions` if the trail overflows `u32`.
pub fn render(trail: &Trail, field: Option<&VectorField>) -> Result<RgbaImage, FieldError> {
    let w = u32::try_from(trail.width()).map_err(|_| FieldError::InvalidDimensions)?;
    let h = u32::try_from(trail.height()).map_err(|_| FieldError::InvalidDimensions)?;
    let density = trail.normalized();
    let width = trail.width();
    let mut img = RgbaImage::from_fn(w, h, |x, y| {
        let t = density[y as usize * width + x as usize];
        let v = (t * 255.0).round() as u8;
        Rgba([v, v, v, 255])
    });

    if let Some(field) = field {
        let res = field.resolution();
        for (col, row, cell) in field.cells() {
            let origin = Vector::new((row * res) as f64, (col * res) as f64);
            let tip = origin.add(&(cell * res as f64));
            draw_line(&mut img, origin, tip);
        }
    }
    Ok(img)
}

fn draw_line(img: &mut RgbaImage, from: Vector, to: Vector) {
    let (dx, dy) = (to.x() - from.x(), to.y() - from.y());
    let steps = dx.abs().max(dy.abs()).ceil().max(1.0) as usize;
    for i in 0..=steps {
        let t = i as f64 / steps as f64;
        let (x, y) = ((from.x() + dx * t).floor(), (from.y() + dy * t).floor());
        if x >= 0.0 && y >= 0.0 && x < f64::from(img.width()) && y < f64::from(img.height()) {
            img.put_pixel(x as u32, y as u32, OVERLAY_COLOR);
        }
    }
}

/// Writes an image as PNG.
pub fn write_png(img: &RgbaImage, path: &Path) -> Result<(), CliError> {
    img.save(path)
        .map_err(|e| CliError::Io(format!("{}: {e}", path.display())))
}
