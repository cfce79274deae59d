//! Shading pass: turns a depth image back into an RGB normal-shaded image
//! (spec.md §4.5).

use crate::eval::{PackedPoints, Renderable};
use crate::im::{Lum8Im, RgbIm};
use crate::normals::get_normals;
use crate::region::Region;
use crate::render::RenderOptions;
use std::sync::atomic::{AtomicBool, Ordering};

/// Walks a finished 8-bit depth image row by row, batching non-zero pixels
/// into `get_normals` calls and writing each component's absolute value
/// (scaled to `0..=255`) into the matching output channel.
///
/// Batches are flushed once they reach `opts.min_volume` points, at the end
/// of every row, and once more at the end of the image, so a caller can
/// reuse the same `RenderOptions` it rendered the depth pass with to bound
/// peak memory. `halt` is polled per pixel, matching the C original's inner
/// loop; `callback`, if given, fires once per row.
pub fn shaded8<T: Renderable>(
    tree: &mut T,
    region: &Region,
    depth: &Lum8Im,
    out: &mut RgbIm,
    halt: &AtomicBool,
    mut callback: Option<&mut dyn FnMut()>,
    opts: RenderOptions,
) {
    let epsilon = (region.x[1] - region.x[0]) / 10.0;
    let z0 = region.z[0];
    let z1 = region.z[region.nk];

    let mut points = PackedPoints::with_capacity(opts.min_volume.max(1));
    let mut cols: Vec<usize> = Vec::with_capacity(opts.min_volume.max(1));
    let mut rows: Vec<usize> = Vec::with_capacity(opts.min_volume.max(1));

    for row in region.jmin..region.jmin + region.nj {
        if halt.load(Ordering::Relaxed) {
            return;
        }
        if let Some(cb) = callback.as_deref_mut() {
            cb();
        }

        for col in region.imin..region.imin + region.ni {
            if halt.load(Ordering::Relaxed) {
                break;
            }
            let d = *depth.get(col, row, 0);
            if d == 0 {
                continue;
            }
            let z = z0 + (d as f64 / 255.0) * (z1 - z0);
            points.push(region.x[col - region.imin], region.y[row - region.jmin], z);
            cols.push(col);
            rows.push(row);

            if points.len() >= opts.min_volume {
                flush(tree, &mut points, &mut cols, &mut rows, epsilon, out);
            }
        }
    }

    flush(tree, &mut points, &mut cols, &mut rows, epsilon, out);
}

fn flush<T: Renderable>(
    tree: &mut T,
    points: &mut PackedPoints,
    cols: &mut Vec<usize>,
    rows: &mut Vec<usize>,
    epsilon: f64,
    out: &mut RgbIm,
) {
    if points.is_empty() {
        return;
    }
    let mut normals = vec![[0.0; 3]; points.len()];
    get_normals(tree, points, epsilon, &mut normals);

    for (k, n) in normals.iter().enumerate() {
        let col = cols[k];
        let row = rows[k];
        for ch in 0..3 {
            *out.get_mut(col, row, ch) = ((n[ch].abs() * 255.0).round() as i64).clamp(0, 255) as u8;
        }
    }

    points.clear();
    cols.clear();
    rows.clear();
}
