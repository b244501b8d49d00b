//! Classic gradient (Perlin) noise over the lattice.
//!
//! Corners are hashed into a small fixed gradient set, dotted with the offset
//! to the sample point and blended with the quintic smootherstep, which keeps
//! both the value and its first derivative continuous across cell borders.

use super::permutation::{wrap_lattice, PermutationTable};

/// Scale bringing 3D output (edge gradients of length sqrt 2) inside [-1, 1].
const GRADIENT_3D_SCALE: f64 = 0.816_496_580_927_726;

/// Smootherstep fade curve: 6t^5 - 15t^4 + 10t^3
#[inline]
pub fn fade(t: f64) -> f64 {
    t * t * t * (t * (t * 6.0 - 15.0) + 10.0)
}

#[inline]
pub fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + t * (b - a)
}

/// Dot product with one of 8 gradient directions (4 diagonals, 4 axes).
#[inline]
fn grad2(hash: usize, x: f64, y: f64) -> f64 {
    match hash & 7 {
        0 => x + y,
        1 => -x + y,
        2 => x - y,
        3 => -x - y,
        4 => x,
        5 => -x,
        6 => y,
        _ => -y,
    }
}

/// Dot product with one of the 12 cube-edge gradients (4 repeated to fill 16).
#[inline]
fn grad3(hash: usize, x: f64, y: f64, z: f64) -> f64 {
    let h = hash & 15;
    let u = if h < 8 { x } else { y };
    let v = if h < 4 {
        y
    } else if h == 12 || h == 14 {
        x
    } else {
        z
    };
    (if h & 1 == 0 { u } else { -u }) + (if h & 2 == 0 { v } else { -v })
}

/// 2D gradient noise at lattice-space coordinates, in [-1, 1].
pub fn perlin_2d(table: &PermutationTable, x: f64, y: f64) -> f64 {
    if !(x.is_finite() && y.is_finite()) {
        return 0.0;
    }
    let x_floor = x.floor();
    let y_floor = y.floor();
    let xi = wrap_lattice(x_floor);
    let yi = wrap_lattice(y_floor);
    let xf = x - x_floor;
    let yf = y - y_floor;

    let u = fade(xf);
    let v = fade(yf);

    let aa = table.hash2(xi, yi);
    let ab = table.hash2(xi, yi + 1);
    let ba = table.hash2(xi + 1, yi);
    let bb = table.hash2(xi + 1, yi + 1);

    let x1 = lerp(grad2(aa, xf, yf), grad2(ba, xf - 1.0, yf), u);
    let x2 = lerp(grad2(ab, xf, yf - 1.0), grad2(bb, xf - 1.0, yf - 1.0), u);

    lerp(x1, x2, v).clamp(-1.0, 1.0)
}

/// 3D gradient noise at lattice-space coordinates, in [-1, 1].
pub fn perlin_3d(table: &PermutationTable, x: f64, y: f64, z: f64) -> f64 {
    if !(x.is_finite() && y.is_finite() && z.is_finite()) {
        return 0.0;
    }
    let x_floor = x.floor();
    let y_floor = y.floor();
    let z_floor = z.floor();
    let xi = wrap_lattice(x_floor);
    let yi = wrap_lattice(y_floor);
    let zi = wrap_lattice(z_floor);
    let xf = x - x_floor;
    let yf = y - y_floor;
    let zf = z - z_floor;

    let u = fade(xf);
    let v = fade(yf);
    let w = fade(zf);

    let c000 = grad3(table.hash3(xi, yi, zi), xf, yf, zf);
    let c100 = grad3(table.hash3(xi + 1, yi, zi), xf - 1.0, yf, zf);
    let c010 = grad3(table.hash3(xi, yi + 1, zi), xf, yf - 1.0, zf);
    let c110 = grad3(table.hash3(xi + 1, yi + 1, zi), xf - 1.0, yf - 1.0, zf);
    let c001 = grad3(table.hash3(xi, yi, zi + 1), xf, yf, zf - 1.0);
    let c101 = grad3(table.hash3(xi + 1, yi, zi + 1), xf - 1.0, yf, zf - 1.0);
    let c011 = grad3(table.hash3(xi, yi + 1, zi + 1), xf, yf - 1.0, zf - 1.0);
    let c111 = grad3(table.hash3(xi + 1, yi + 1, zi + 1), xf - 1.0, yf - 1.0, zf - 1.0);

    let near = lerp(lerp(c000, c100, u), lerp(c010, c110, u), v);
    let far = lerp(lerp(c001, c101, u), lerp(c011, c111, u), v);

    (lerp(near, far, w) * GRADIENT_3D_SCALE).clamp(-1.0, 1.0)
}
