//! Hydraulic erosion using discrete raindrops on the cell grid.
//!
//! Each raindrop lands on a random cell and repeatedly:
//! 1. dissolves terrain from its cell (`solubility` times its water, never
//!    more than the drop to the next cell)
//! 2. flows to the steepest lower 8-neighbor
//! 3. evaporates, depositing part of its load
//!
//! It stops at a local minimum, once nearly all water has evaporated or after
//! `max_droplet_steps`, leaving whatever it still carries. Material is only
//! moved, never created, so total volume is preserved.
//!
//! Parallelization: `simulate_parallel` runs batches of drops on a shared
//! snapshot with rayon and settles their changes against the live grid in
//! drop order.

use crate::erosion::params::ErosionParams;
use crate::erosion::ErosionStats;
use crate::tilemap::{Tilemap, DIR_DISTANCES, DIR_OFFSETS};
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use tracing::debug;

/// Drops per parallel batch. Smaller batches see each other's changes sooner.
const BATCH_SIZE: usize = 4096;

/// A drop dies once its water falls below this fraction of the initial amount.
const MIN_WATER_FRACTION: f32 = 1e-3;

/// A raindrop moving over the grid
struct WaterDroplet {
    /// Current cell index
    cell: usize,
    /// Elevation of the current cell, including this drop's own edits
    elevation: f32,
    /// Water volume
    water: f32,
    /// Carried sediment
    sediment: f32,
}

/// Height edits and bookkeeping produced by one drop.
struct DropletTrace {
    changes: Vec<(usize, f32)>,
    /// Cell where the drop came to rest
    end: usize,
    eroded: f64,
    deposited: f64,
    max_erosion: f32,
    max_deposition: f32,
    steps: usize,
}

impl DropletTrace {
    fn new(end: usize) -> Self {
        Self {
            changes: Vec::new(),
            end,
            eroded: 0.0,
            deposited: 0.0,
            max_erosion: 0.0,
            max_deposition: 0.0,
            steps: 0,
        }
    }

    fn erode(&mut self, cell: usize, amount: f32) {
        if amount > 0.0 {
            self.changes.push((cell, -amount));
            self.eroded += amount as f64;
            self.max_erosion = self.max_erosion.max(amount);
        }
    }

    fn deposit(&mut self, cell: usize, amount: f32) {
        if amount > 0.0 {
            self.changes.push((cell, amount));
            self.deposited += amount as f64;
            self.max_deposition = self.max_deposition.max(amount);
        }
    }
}

/// Steepest strictly-lower 8-neighbor of `cell`. Ties go to the first
/// direction in N, NE, E, SE, S, SW, W, NW order.
fn steepest_descent(heights: &[f32], width: usize, height: usize, cell: usize, elevation: f32) -> Option<(usize, f32)> {
    let x = (cell % width) as i64;
    let y = (cell / width) as i64;

    let mut best: Option<(usize, f32)> = None;
    let mut best_slope = 0.0f32;

    for (dir, &(dx, dy)) in DIR_OFFSETS.iter().enumerate() {
        let nx = x + dx as i64;
        let ny = y + dy as i64;
        if nx < 0 || ny < 0 || nx >= width as i64 || ny >= height as i64 {
            continue;
        }
        let n = ny as usize * width + nx as usize;
        let hn = heights[n];
        let drop = elevation - hn;
        if drop <= 0.0 {
            continue;
        }
        let slope = drop / DIR_DISTANCES[dir];
        if slope > best_slope {
            best_slope = slope;
            best = Some((n, hn));
        }
    }

    best
}

/// Simulate one drop against `heights` and return its edits.
///
/// Cells the drop already left are always higher than where it is, so they
/// are never picked again and their stale snapshot values are never read in
/// a way that matters. Only the current cell needs tracking.
fn simulate_single_droplet(
    heights: &[f32],
    width: usize,
    height: usize,
    params: &ErosionParams,
    rng: &mut ChaCha8Rng,
) -> DropletTrace {
    let start = rng.gen_range(0..heights.len());
    let mut trace = DropletTrace::new(start);

    let mut droplet = WaterDroplet {
        cell: start,
        elevation: heights[start],
        water: params.rain_rate,
        sediment: 0.0,
    };
    let min_water = params.rain_rate * MIN_WATER_FRACTION;
    let retained = 1.0 - params.evaporation;

    for _ in 0..params.max_droplet_steps {
        let Some((next, next_elevation)) =
            steepest_descent(heights, width, height, droplet.cell, droplet.elevation)
        else {
            break;
        };
        trace.steps += 1;

        // Dissolve, but never cut below the cell we are about to enter
        let pickup = (params.solubility * droplet.water).min(droplet.elevation - next_elevation);
        trace.erode(droplet.cell, pickup);
        droplet.sediment += pickup;
        let left_behind = droplet.elevation - pickup;

        droplet.cell = next;
        droplet.elevation = next_elevation;
        droplet.water *= retained;

        // Keep the path strictly descending: fill at most halfway back up
        let deposit = (droplet.sediment * retained)
            .min((left_behind - droplet.elevation) * 0.5)
            .max(0.0);
        trace.deposit(droplet.cell, deposit);
        droplet.sediment -= deposit;
        droplet.elevation += deposit;

        if droplet.water < min_water {
            break;
        }
    }

    // Whatever is still in suspension settles where the drop ends
    trace.end = droplet.cell;
    trace.deposit(droplet.cell, droplet.sediment);
    trace
}

/// Apply a trace computed on a stale snapshot to the live grid.
///
/// Erosion never digs a cell below `floor`, and deposits never exceed what
/// the drop actually picked up, with any remainder settling at its end cell.
/// Each settled trace is zero-sum. Returns the changes as applied.
fn settle(cells: &mut [f32], trace: &DropletTrace, floor: Option<f32>) -> DropletTrace {
    let mut applied = DropletTrace::new(trace.end);
    applied.steps = trace.steps;
    let mut carried = 0.0f32;

    for &(idx, change) in &trace.changes {
        if change < 0.0 {
            let available = floor.map_or(f32::INFINITY, |f| (cells[idx] - f).max(0.0));
            let amount = (-change).min(available);
            cells[idx] -= amount;
            applied.erode(idx, amount);
            carried += amount;
        } else {
            let amount = change.min(carried);
            cells[idx] += amount;
            applied.deposit(idx, amount);
            carried -= amount;
        }
    }

    if carried > 0.0 {
        cells[trace.end] += carried;
        applied.deposit(trace.end, carried);
    }
    applied
}

fn accumulate(stats: &mut ErosionStats, trace: &DropletTrace) {
    stats.total_eroded += trace.eroded;
    stats.total_deposited += trace.deposited;
    stats.max_erosion = stats.max_erosion.max(trace.max_erosion);
    stats.max_deposition = stats.max_deposition.max(trace.max_deposition);
    stats.steps_taken += trace.steps as u64;
}

/// Run hydraulic erosion one drop at a time. Drop `i` is seeded with
/// `seed + i`, so the result only depends on the grid, the parameters and
/// `seed`. `params` are expected to be sanitized.
pub fn simulate(heightmap: &mut Tilemap<f32>, params: &ErosionParams, seed: u64) -> ErosionStats {
    let mut stats = ErosionStats {
        iterations: params.iterations,
        ..Default::default()
    };
    if heightmap.is_empty() || params.hydraulic_is_noop() {
        return stats;
    }

    let width = heightmap.width;
    let height = heightmap.height;

    for i in 0..params.iterations {
        let mut rng = ChaCha8Rng::seed_from_u64(seed.wrapping_add(i as u64));
        let trace = simulate_single_droplet(heightmap.as_slice(), width, height, params, &mut rng);

        let cells = heightmap.as_mut_slice();
        for &(idx, change) in &trace.changes {
            cells[idx] += change;
        }
        accumulate(&mut stats, &trace);
    }

    debug!(
        drops = params.iterations,
        eroded = stats.total_eroded,
        steps = stats.steps_taken,
        "hydraulic erosion finished"
    );
    stats
}

/// Run hydraulic erosion with drops simulated in parallel batches.
///
/// Every drop in a batch sees the same snapshot; their edits are settled
/// in drop order afterwards, which keeps the result deterministic. Drops in
/// the same batch can both dig into a shared cell, so when the input had no
/// negative cells each pickup is capped at what is left above zero and the
/// drop deposits only what it really removed.
pub fn simulate_parallel(heightmap: &mut Tilemap<f32>, params: &ErosionParams, seed: u64) -> ErosionStats {
    let mut stats = ErosionStats {
        iterations: params.iterations,
        ..Default::default()
    };
    if heightmap.is_empty() || params.hydraulic_is_noop() {
        return stats;
    }

    let width = heightmap.width;
    let height = heightmap.height;
    let (min_height, _) = heightmap.min_max();
    let floor = if min_height >= 0.0 { Some(0.0f32) } else { None };

    let num_batches = params.iterations.div_ceil(BATCH_SIZE);
    for batch in 0..num_batches {
        let batch_start = batch * BATCH_SIZE;
        let batch_count = BATCH_SIZE.min(params.iterations - batch_start);

        let snapshot: Vec<f32> = heightmap.as_slice().to_vec();

        let traces: Vec<DropletTrace> = (0..batch_count)
            .into_par_iter()
            .map(|i| {
                let droplet_seed = seed.wrapping_add((batch_start + i) as u64);
                let mut rng = ChaCha8Rng::seed_from_u64(droplet_seed);
                simulate_single_droplet(&snapshot, width, height, params, &mut rng)
            })
            .collect();

        let cells = heightmap.as_mut_slice();
        for trace in &traces {
            let applied = settle(cells, trace, floor);
            accumulate(&mut stats, &applied);
        }
    }

    debug!(
        drops = params.iterations,
        batches = num_batches,
        eroded = stats.total_eroded,
        "parallel hydraulic erosion finished"
    );
    stats
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bumpy(size: usize) -> Tilemap<f32> {
        let mut map = Tilemap::new_with(size, size, 0.0f32);
        for (x, y, h) in map.iter_mut() {
            let fx = x as f32 / size as f32;
            let fy = y as f32 / size as f32;
            *h = (fx * 9.0).sin().abs() * 0.4 + (fy * 7.0).cos().abs() * 0.3 + fx * 0.2;
        }
        map
    }

    fn params(iterations: usize) -> ErosionParams {
        ErosionParams::hydraulic(iterations, 0.01, 0.01, 0.5).sanitized()
    }

    #[test]
    fn test_conserves_volume() {
        let mut map = bumpy(32);
        let before = map.total();
        let stats = simulate(&mut map, &params(2000), 7);

        assert!(stats.total_eroded > 0.0);
        assert!((stats.total_eroded - stats.total_deposited).abs() < 1e-5);
        assert!((map.total() - before).abs() < 1e-3);
    }

    #[test]
    fn test_never_goes_negative() {
        let mut map = bumpy(24);
        let strong = ErosionParams::hydraulic(5000, 1.0, 10.0, 0.0).sanitized();
        simulate(&mut map, &strong, 3);
        assert!(map.all_finite());
        for (_, _, &h) in map.iter() {
            assert!(h >= 0.0, "negative cell {}", h);
        }

        let mut map = bumpy(24);
        simulate_parallel(&mut map, &strong, 3);
        for (_, _, &h) in map.iter() {
            assert!(h >= 0.0);
        }
    }

    #[test]
    fn test_parallel_conserves_volume_under_strong_erosion() {
        let strong = ErosionParams::hydraulic(20_000, 1.0, 10.0, 0.0).sanitized();
        let original = bumpy(24);
        let before = original.total();

        let mut sequential = original.clone();
        simulate(&mut sequential, &strong, 11);
        let mut parallel = original.clone();
        let stats = simulate_parallel(&mut parallel, &strong, 11);

        assert!(parallel.all_finite());
        assert!((sequential.total() - before).abs() < before * 1e-4);
        assert!(
            (parallel.total() - before).abs() < before * 1e-4,
            "before {} after {}",
            before,
            parallel.total()
        );
        assert!((stats.total_eroded - stats.total_deposited).abs() < before * 1e-4);
        for (_, _, &h) in parallel.iter() {
            assert!(h >= 0.0);
        }
    }

    #[test]
    fn test_settle_caps_stale_pickup() {
        // Two drops both planned to take 0.8 from a cell holding 1.0
        let mut cells = vec![1.0f32, 0.0, 0.0];
        let mut trace = DropletTrace::new(1);
        trace.erode(0, 0.8);
        trace.deposit(1, 0.8);

        let first = settle(&mut cells, &trace, Some(0.0));
        assert_eq!(first.eroded, first.deposited);
        let second = settle(&mut cells, &trace, Some(0.0));
        assert!((second.eroded - 0.2).abs() < 1e-6);
        assert_eq!(second.eroded, second.deposited);

        assert_eq!(cells[0], 0.0);
        let total: f32 = cells.iter().sum();
        assert!((total - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_deterministic_for_seed() {
        let mut a = bumpy(20);
        let mut b = bumpy(20);
        simulate(&mut a, &params(500), 99);
        simulate(&mut b, &params(500), 99);
        assert_eq!(a, b);

        let mut c = bumpy(20);
        let mut d = bumpy(20);
        simulate_parallel(&mut c, &params(9000), 5);
        simulate_parallel(&mut d, &params(9000), 5);
        assert_eq!(c, d);
    }

    #[test]
    fn test_degenerate_params_are_noops() {
        let original = bumpy(16);
        for p in [
            ErosionParams::hydraulic(0, 0.01, 0.01, 0.5),
            ErosionParams::hydraulic(100, 0.0, 0.01, 0.5),
            ErosionParams::hydraulic(100, 0.01, 0.0, 0.5),
            ErosionParams::hydraulic(100, f32::NAN, f32::NAN, f32::NAN),
        ] {
            let mut map = original.clone();
            simulate(&mut map, &p.sanitized(), 1);
            assert_eq!(map, original);
        }
    }

    #[test]
    fn test_drop_follows_steepest_descent() {
        // Single column draining south
        let map = Tilemap::from_vec(3, 3, vec![
            5.0, 5.0, 5.0,
            5.0, 4.0, 5.0,
            5.0, 1.0, 3.0,
        ]).unwrap();
        let next = steepest_descent(map.as_slice(), 3, 3, 4, 4.0);
        assert_eq!(next, Some((7, 1.0)));
        // Local minimum has nowhere to go
        assert_eq!(steepest_descent(map.as_slice(), 3, 3, 7, 1.0), None);
    }

    #[test]
    fn test_ties_break_by_direction_order() {
        let map = Tilemap::from_vec(3, 3, vec![
            2.0, 0.0, 2.0,
            0.0, 2.0, 0.0,
            2.0, 0.0, 2.0,
        ]).unwrap();
        // N comes first among the equally steep N, E, S, W
        assert_eq!(steepest_descent(map.as_slice(), 3, 3, 4, 2.0), Some((1, 0.0)));
    }
}
