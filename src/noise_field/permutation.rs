//! Seeded permutation table shared by every lattice noise primitive.

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Number of distinct lattice hashes.
pub const TABLE_SIZE: usize = 256;

/// Reduce a floored lattice coordinate into one table period.
///
/// Hashes only look at the low 8 bits, so this keeps the same hash while
/// leaving room for `+ 1` corner offsets at any finite magnitude.
#[inline]
pub fn wrap_lattice(v: f64) -> i64 {
    v.rem_euclid(TABLE_SIZE as f64) as i64
}

/// A shuffled permutation of `0..256`, stored twice so that
/// `perm[perm[x] + y]` never needs a wraparound branch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PermutationTable {
    perm: [u8; TABLE_SIZE * 2],
}

impl PermutationTable {
    /// Build the table deterministically from a seed.
    pub fn new(seed: u64) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut base: Vec<u8> = (0..TABLE_SIZE).map(|i| i as u8).collect();
        base.shuffle(&mut rng);

        let mut perm = [0u8; TABLE_SIZE * 2];
        for (i, slot) in perm.iter_mut().enumerate() {
            *slot = base[i % TABLE_SIZE];
        }
        Self { perm }
    }

    /// Raw table entry; `i` must be below 512.
    #[inline]
    pub fn at(&self, i: usize) -> usize {
        self.perm[i] as usize
    }

    /// Hash a 2D lattice coordinate.
    #[inline]
    pub fn hash2(&self, x: i64, y: i64) -> usize {
        let xi = (x & 255) as usize;
        let yi = (y & 255) as usize;
        self.at(self.at(xi) + yi)
    }

    /// Hash a 3D lattice coordinate.
    #[inline]
    pub fn hash3(&self, x: i64, y: i64, z: i64) -> usize {
        let zi = (z & 255) as usize;
        self.at(self.hash2(x, y) + zi)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_is_a_permutation() {
        let table = PermutationTable::new(7);
        let mut seen = [false; TABLE_SIZE];
        for i in 0..TABLE_SIZE {
            seen[table.at(i)] = true;
            // Second half mirrors the first
            assert_eq!(table.at(i), table.at(i + TABLE_SIZE));
        }
        assert!(seen.iter().all(|&s| s));
    }

    #[test]
    fn test_same_seed_same_table() {
        assert_eq!(PermutationTable::new(99), PermutationTable::new(99));
        assert_ne!(PermutationTable::new(1), PermutationTable::new(2));
    }

    #[test]
    fn test_hash_wraps_negative_coordinates() {
        let table = PermutationTable::new(3);
        assert_eq!(table.hash2(-1, 4), table.hash2(255, 4));
        assert_eq!(table.hash3(0, -256, 9), table.hash3(0, 0, 9));
    }

    #[test]
    fn test_wrap_lattice_matches_hash_period() {
        let table = PermutationTable::new(3);
        for v in [-513.0, -1.0, 0.0, 7.0, 255.0, 256.0, 1e6] {
            let w = wrap_lattice(v);
            assert!((0..TABLE_SIZE as i64).contains(&w));
            assert_eq!(table.hash2(w, 4), table.hash2(v as i64, 4));
        }
        assert!((0..TABLE_SIZE as i64).contains(&wrap_lattice(1e19)));
        assert!((0..TABLE_SIZE as i64).contains(&wrap_lattice(-1e300)));
    }
}
