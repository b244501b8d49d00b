//! Seed management for terrain synthesis
//!
//! One master seed fans out into independent seeds for each stage, so the
//! erosion pattern can be varied while keeping the base shape (or the other
//! way round).

/// Seeds for each synthesis stage.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TerrainSeeds {
    /// Master seed (used for display/reference)
    pub master: u64,
    /// Permutation table for noise-driven generation
    pub noise: u64,
    /// Offsets for diamond-square midpoint displacement
    pub displacement: u64,
    /// Raindrop placement for hydraulic erosion
    pub erosion: u64,
}

impl TerrainSeeds {
    /// Derive all stage seeds from a master seed.
    pub fn from_master(master: u64) -> Self {
        Self {
            master,
            noise: derive_seed(master, "noise"),
            displacement: derive_seed(master, "displacement"),
            erosion: derive_seed(master, "erosion"),
        }
    }
}

/// Derive a sub-seed from a master seed and a stage name.
///
/// FNV-1a over the name followed by a splitmix64 finalizer. Unlike
/// `DefaultHasher` the result is fixed across toolchains, so saved configs
/// regenerate the same terrain after an upgrade.
pub fn derive_seed(master: u64, stage: &str) -> u64 {
    let mut h: u64 = 0xcbf2_9ce4_8422_2325;
    for b in stage.bytes() {
        h ^= b as u64;
        h = h.wrapping_mul(0x0000_0100_0000_01b3);
    }
    splitmix64(master ^ h)
}

fn splitmix64(x: u64) -> u64 {
    let mut z = x.wrapping_add(0x9e37_79b9_7f4a_7c15);
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}

impl std::fmt::Display for TerrainSeeds {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "TerrainSeeds {{ master: {}, noise: {}, displacement: {}, erosion: {} }}",
            self.master, self.noise, self.displacement, self.erosion,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deterministic_derivation() {
        let seeds1 = TerrainSeeds::from_master(12345);
        let seeds2 = TerrainSeeds::from_master(12345);
        assert_eq!(seeds1, seeds2);
    }

    #[test]
    fn test_stages_get_different_seeds() {
        let seeds = TerrainSeeds::from_master(12345);
        assert_ne!(seeds.noise, seeds.displacement);
        assert_ne!(seeds.displacement, seeds.erosion);
        assert_ne!(seeds.noise, seeds.erosion);
        assert_ne!(seeds.noise, TerrainSeeds::from_master(12346).noise);
    }

    #[test]
    fn test_display_lists_every_stage() {
        let seeds = TerrainSeeds::from_master(7);
        let text = seeds.to_string();
        assert!(text.contains("master: 7"));
        assert!(text.contains(&format!("erosion: {}", seeds.erosion)));
    }
}
