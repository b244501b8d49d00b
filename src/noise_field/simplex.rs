//! Simplex noise on the skewed triangular (2D) and tetrahedral (3D) lattice.

use super::permutation::{wrap_lattice, PermutationTable};

const F2: f64 = 0.366_025_403_784_438_6; // (sqrt(3) - 1) / 2
const G2: f64 = 0.211_324_865_405_187_1; // (3 - sqrt(3)) / 6
const F3: f64 = 1.0 / 3.0;
const G3: f64 = 1.0 / 6.0;

/// Output scales that map the kernel sums into roughly [-1, 1].
const SCALE_2D: f64 = 70.0;
const SCALE_3D: f64 = 32.0;

const GRAD3: [[f64; 3]; 12] = [
    [1.0, 1.0, 0.0],
    [-1.0, 1.0, 0.0],
    [1.0, -1.0, 0.0],
    [-1.0, -1.0, 0.0],
    [1.0, 0.0, 1.0],
    [-1.0, 0.0, 1.0],
    [1.0, 0.0, -1.0],
    [-1.0, 0.0, -1.0],
    [0.0, 1.0, 1.0],
    [0.0, -1.0, 1.0],
    [0.0, 1.0, -1.0],
    [0.0, -1.0, -1.0],
];

#[inline]
fn corner_2d(hash: usize, x: f64, y: f64) -> f64 {
    let t = 0.5 - x * x - y * y;
    if t <= 0.0 {
        return 0.0;
    }
    let g = GRAD3[hash % 12];
    let t2 = t * t;
    t2 * t2 * (g[0] * x + g[1] * y)
}

#[inline]
fn corner_3d(hash: usize, x: f64, y: f64, z: f64) -> f64 {
    let t = 0.6 - x * x - y * y - z * z;
    if t <= 0.0 {
        return 0.0;
    }
    let g = GRAD3[hash % 12];
    let t2 = t * t;
    t2 * t2 * (g[0] * x + g[1] * y + g[2] * z)
}

/// Skewing near the f64 limit can overflow; such samples read as 0.
#[inline]
fn finite_clamped(v: f64) -> f64 {
    if v.is_finite() {
        v.clamp(-1.0, 1.0)
    } else {
        0.0
    }
}

/// 2D simplex noise at lattice-space coordinates, in [-1, 1].
pub fn simplex_2d(table: &PermutationTable, x: f64, y: f64) -> f64 {
    if !(x.is_finite() && y.is_finite()) {
        return 0.0;
    }
    // Skew input space to find the containing simplex cell
    let s = (x + y) * F2;
    let i = (x + s).floor();
    let j = (y + s).floor();
    let t = (i + j) * G2;
    let x0 = x - (i - t);
    let y0 = y - (j - t);

    // Upper or lower triangle
    let (i1, j1) = if x0 > y0 { (1, 0) } else { (0, 1) };

    let x1 = x0 - i1 as f64 + G2;
    let y1 = y0 - j1 as f64 + G2;
    let x2 = x0 - 1.0 + 2.0 * G2;
    let y2 = y0 - 1.0 + 2.0 * G2;

    let ii = wrap_lattice(i);
    let jj = wrap_lattice(j);

    let n0 = corner_2d(table.hash2(ii, jj), x0, y0);
    let n1 = corner_2d(table.hash2(ii + i1, jj + j1), x1, y1);
    let n2 = corner_2d(table.hash2(ii + 1, jj + 1), x2, y2);

    finite_clamped(SCALE_2D * (n0 + n1 + n2))
}

/// 3D simplex noise at lattice-space coordinates, in [-1, 1].
pub fn simplex_3d(table: &PermutationTable, x: f64, y: f64, z: f64) -> f64 {
    if !(x.is_finite() && y.is_finite() && z.is_finite()) {
        return 0.0;
    }
    let s = (x + y + z) * F3;
    let i = (x + s).floor();
    let j = (y + s).floor();
    let k = (z + s).floor();
    let t = (i + j + k) * G3;
    let x0 = x - (i - t);
    let y0 = y - (j - t);
    let z0 = z - (k - t);

    // Rank the offsets to pick which of the six tetrahedra we are in
    let (i1, j1, k1, i2, j2, k2) = if x0 >= y0 {
        if y0 >= z0 {
            (1, 0, 0, 1, 1, 0)
        } else if x0 >= z0 {
            (1, 0, 0, 1, 0, 1)
        } else {
            (0, 0, 1, 1, 0, 1)
        }
    } else if y0 < z0 {
        (0, 0, 1, 0, 1, 1)
    } else if x0 < z0 {
        (0, 1, 0, 0, 1, 1)
    } else {
        (0, 1, 0, 1, 1, 0)
    };

    let x1 = x0 - i1 as f64 + G3;
    let y1 = y0 - j1 as f64 + G3;
    let z1 = z0 - k1 as f64 + G3;
    let x2 = x0 - i2 as f64 + 2.0 * G3;
    let y2 = y0 - j2 as f64 + 2.0 * G3;
    let z2 = z0 - k2 as f64 + 2.0 * G3;
    let x3 = x0 - 1.0 + 3.0 * G3;
    let y3 = y0 - 1.0 + 3.0 * G3;
    let z3 = z0 - 1.0 + 3.0 * G3;

    let ii = wrap_lattice(i);
    let jj = wrap_lattice(j);
    let kk = wrap_lattice(k);

    let n0 = corner_3d(table.hash3(ii, jj, kk), x0, y0, z0);
    let n1 = corner_3d(table.hash3(ii + i1, jj + j1, kk + k1), x1, y1, z1);
    let n2 = corner_3d(table.hash3(ii + i2, jj + j2, kk + k2), x2, y2, z2);
    let n3 = corner_3d(table.hash3(ii + 1, jj + 1, kk + 1), x3, y3, z3);

    finite_clamped(SCALE_3D * (n0 + n1 + n2 + n3))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simplex_range_and_variation() {
        let table = PermutationTable::new(42);
        let mut min = f64::MAX;
        let mut max = f64::MIN;
        for i in 0..4000 {
            let x = (i % 63) as f64 * 0.173;
            let y = (i / 63) as f64 * 0.219;
            let v = simplex_2d(&table, x, y);
            assert!((-1.0..=1.0).contains(&v));
            min = min.min(v);
            max = max.max(v);

            let w = simplex_3d(&table, x, y, 0.5 * x - y);
            assert!((-1.0..=1.0).contains(&w));
        }
        // Not a constant field
        assert!(max - min > 0.5, "spread was {}", max - min);
    }

    #[test]
    fn test_simplex_is_continuous() {
        let table = PermutationTable::new(8);
        let eps = 1e-7;
        for i in 0..200 {
            let x = i as f64 * 0.071;
            let y = i as f64 * 0.053 + 0.2;
            let a = simplex_2d(&table, x, y);
            let b = simplex_2d(&table, x + eps, y + eps);
            assert!((a - b).abs() < 1e-4);
        }
    }

    #[test]
    fn test_simplex_huge_coordinates() {
        let table = PermutationTable::new(8);
        for x in [1e19, -1e19, 4.5e18, f64::MAX / 2.0] {
            assert!(simplex_2d(&table, x, -x).is_finite());
            assert!(simplex_3d(&table, x, 0.25, -x).is_finite());
        }
        assert_eq!(simplex_2d(&table, f64::NEG_INFINITY, 1.0), 0.0);
        assert!(simplex_2d(&table, f64::MAX, f64::MAX).is_finite());
    }
}
