//! Thermal erosion (talus relaxation).
//!
//! Material on slopes steeper than the angle of repose slides to lower
//! neighbors. Every sub-iteration reads from one buffer and writes into
//! another, so the result does not depend on cell visiting order.

use crate::erosion::params::ErosionParams;
use crate::tilemap::{Tilemap, DIR_DISTANCES};
use tracing::debug;

/// Run thermal erosion in place and return the total material moved.
/// `params` are expected to be sanitized.
pub fn simulate(heightmap: &mut Tilemap<f32>, params: &ErosionParams, cell_spacing: f32) -> f64 {
    if heightmap.is_empty() || params.thermal_is_noop() {
        return 0.0;
    }

    let spacing = if cell_spacing.is_finite() && cell_spacing > 0.0 {
        cell_spacing
    } else {
        1.0
    };
    let talus = params.talus_angle.tan() * spacing;
    let thresholds: [f32; 8] = DIR_DISTANCES.map(|d| talus * d);

    let mut next = heightmap.clone();
    let mut total_moved = 0.0f64;

    for iteration in 0..params.thermal_iterations {
        let mut moved = 0.0f64;
        for _ in 0..params.thermal_sub_iterations {
            moved += relax_step(heightmap, &mut next, &thresholds, params.thermal_rate);
            std::mem::swap(heightmap, &mut next);
        }
        total_moved += moved;

        if moved == 0.0 {
            debug!(iteration, "thermal erosion settled early");
            break;
        }
    }

    total_moved
}

/// One double-buffered relaxation sweep from `current` into `next`.
fn relax_step(current: &Tilemap<f32>, next: &mut Tilemap<f32>, thresholds: &[f32; 8], rate: f32) -> f64 {
    next.as_mut_slice().copy_from_slice(current.as_slice());

    let mut moved = 0.0f64;
    let mut excess = [0.0f32; 8];
    let mut targets = [0usize; 8];

    for y in 0..current.height {
        for x in 0..current.width {
            let h = *current.get(x, y);
            let mut count = 0;
            let mut excess_total = 0.0f32;
            let mut excess_max = 0.0f32;

            for (dir, nx, ny) in current.neighbors_8(x, y) {
                let over = h - *current.get(nx, ny) - thresholds[dir];
                if over > 0.0 {
                    excess[count] = over;
                    targets[count] = current.index(nx, ny);
                    count += 1;
                    excess_total += over;
                    excess_max = excess_max.max(over);
                }
            }

            if count == 0 || excess_total <= 0.0 {
                continue;
            }

            let amount = rate * excess_max * 0.5;
            if amount <= 0.0 {
                continue;
            }

            let cells = next.as_mut_slice();
            cells[current.index(x, y)] -= amount;
            for k in 0..count {
                cells[targets[k]] += amount * (excess[k] / excess_total);
            }
            moved += amount as f64;
        }
    }

    moved
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spike(size: usize, peak: f32) -> Tilemap<f32> {
        let mut map = Tilemap::new_with(size, size, 0.0f32);
        map.set(size / 2, size / 2, peak);
        map
    }

    #[test]
    fn test_conserves_mass() {
        let mut map = Tilemap::new_with(16, 16, 0.0f32);
        for (x, y, h) in map.iter_mut() {
            *h = ((x * 7 + y * 13) % 11) as f32 * 0.3 + if x == 8 && y == 8 { 20.0 } else { 0.0 };
        }
        let before = map.total();

        let params = ErosionParams::thermal(10, 0.3);
        let moved = simulate(&mut map, &params, 1.0);

        assert!(moved > 0.0);
        assert!((map.total() - before).abs() < 1e-3 * before.abs().max(1.0));
    }

    #[test]
    fn test_spike_slumps_without_going_negative() {
        let mut map = spike(9, 10.0);
        let params = ErosionParams::thermal(20, 0.5);
        simulate(&mut map, &params, 1.0);

        assert!(*map.get(4, 4) < 10.0);
        assert!(*map.get(4, 3) > 0.0);
        for (_, _, &h) in map.iter() {
            assert!(h >= 0.0);
        }
    }

    #[test]
    fn test_slopes_below_talus_are_stable() {
        // Rise of 0.5 per cell is under tan(45 deg) = 1.0
        let mut map = Tilemap::new_with(8, 8, 0.0f32);
        for (x, _, h) in map.iter_mut() {
            *h = x as f32 * 0.5;
        }
        let original = map.clone();

        let moved = simulate(&mut map, &ErosionParams::thermal(5, 0.785), 1.0);
        assert_eq!(moved, 0.0);
        assert_eq!(map, original);
    }

    fn mirror_x(map: &Tilemap<f32>) -> Tilemap<f32> {
        let mut out = map.clone();
        for (x, y, h) in out.iter_mut() {
            *h = *map.get(map.width - 1 - x, y);
        }
        out
    }

    #[test]
    fn test_symmetric_spike_stays_symmetric() {
        let mut map = spike(9, 10.0);
        simulate(&mut map, &ErosionParams::thermal(6, 0.4), 1.0);

        for y in 0..9 {
            for x in 0..9 {
                let h = *map.get(x, y);
                assert!((h - *map.get(8 - x, y)).abs() < 1e-4, "x mirror at ({}, {})", x, y);
                assert!((h - *map.get(x, 8 - y)).abs() < 1e-4, "y mirror at ({}, {})", x, y);
                assert!((h - *map.get(y, x)).abs() < 1e-4, "transpose at ({}, {})", x, y);
            }
        }
    }

    #[test]
    fn test_mirrored_input_gives_mirrored_output() {
        let mut map = Tilemap::new_with(12, 10, 0.0f32);
        for (x, y, h) in map.iter_mut() {
            // Off-center ridge with a lopsided peak
            let ridge = 6.0 - (x as f32 - 3.0).abs() * 1.5;
            *h = ridge.max(0.0) + if (x, y) == (2, 4) { 5.0 } else { 0.0 };
        }
        let mut mirrored = mirror_x(&map);

        let params = ErosionParams::thermal(8, 0.35);
        simulate(&mut map, &params, 1.0);
        simulate(&mut mirrored, &params, 1.0);

        let expected = mirror_x(&map);
        for (x, y, &h) in mirrored.iter() {
            assert!((h - *expected.get(x, y)).abs() < 1e-4, "mismatch at ({}, {})", x, y);
        }
    }

    #[test]
    fn test_zero_iterations_is_noop() {
        let mut map = spike(5, 3.0);
        let original = map.clone();
        assert_eq!(simulate(&mut map, &ErosionParams::thermal(0, 0.2), 1.0), 0.0);
        assert_eq!(map, original);
    }
}
