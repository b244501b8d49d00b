//! Cellular (Worley) noise: distance to the nearest feature point.

use super::permutation::{wrap_lattice, PermutationTable};

/// Largest F1 distance a sample can see when every cell holds one point.
const MAX_F1: f64 = std::f64::consts::SQRT_2;

/// Feature point inside cell (cx, cy), as an offset in [0, 1) on each axis.
#[inline]
fn feature_point(table: &PermutationTable, cx: i64, cy: i64) -> (f64, f64) {
    // Two chained hashes per axis give 16 bits of jitter.
    let hx = (table.hash3(cx, cy, 0) << 8) | table.hash3(cx, cy, 1);
    let hy = (table.hash3(cx, cy, 2) << 8) | table.hash3(cx, cy, 3);
    (hx as f64 / 65536.0, hy as f64 / 65536.0)
}

/// F1 cellular noise at lattice-space coordinates, in [0, 1].
pub fn worley_2d(table: &PermutationTable, x: f64, y: f64) -> f64 {
    if !(x.is_finite() && y.is_finite()) {
        return 0.0;
    }
    let x_floor = x.floor();
    let y_floor = y.floor();
    let cell_x = wrap_lattice(x_floor);
    let cell_y = wrap_lattice(y_floor);
    // Offsets are measured from the home cell so huge inputs keep precision
    let xf = x - x_floor;
    let yf = y - y_floor;

    let mut nearest = f64::MAX;
    for dy in -1..=1 {
        for dx in -1..=1 {
            let (fx, fy) = feature_point(table, cell_x + dx, cell_y + dy);
            let px = dx as f64 + fx - xf;
            let py = dy as f64 + fy - yf;
            let d = (px * px + py * py).sqrt();
            if d < nearest {
                nearest = d;
            }
        }
    }

    (nearest / MAX_F1).clamp(0.0, 1.0)
}
