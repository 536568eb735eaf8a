//! Levels module - authored level table and procedural continuation
//!
//! The first levels are hand-tuned; past the authored table, configs are
//! generated from the level index and the run's RNG, so an endless run is
//! still fully determined by its seed.

use crate::rng::TileGen;
use crate::types::{Targets, TileColor};

/// Per-level configuration: what to clear and in how many moves
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelConfig {
    pub index: u32,
    /// Required removals per color, palette order
    pub targets: Targets,
    pub move_budget: u32,
}

/// Hand-tuned opening levels, palette order [red, blue, yellow, green, purple]
const AUTHORED: [LevelConfig; 5] = [
    LevelConfig {
        index: 0,
        targets: Targets::new([10, 10, 0, 0, 0]),
        move_budget: 12,
    },
    LevelConfig {
        index: 1,
        targets: Targets::new([12, 0, 10, 8, 0]),
        move_budget: 14,
    },
    LevelConfig {
        index: 2,
        targets: Targets::new([0, 14, 0, 12, 10]),
        move_budget: 15,
    },
    LevelConfig {
        index: 3,
        targets: Targets::new([12, 12, 12, 0, 9]),
        move_budget: 16,
    },
    LevelConfig {
        index: 4,
        targets: Targets::new([12, 10, 10, 10, 8]),
        move_budget: 18,
    },
];

/// Number of authored levels before procedural generation takes over
pub fn authored_count() -> u32 {
    AUTHORED.len() as u32
}

/// Whether `index` is the last authored level (the final level in
/// non-endless runs)
pub fn is_last_authored(index: u32) -> bool {
    index + 1 == authored_count()
}

/// Config for a level index: authored table first, procedural beyond it
pub fn config_for(index: u32, gen: &mut TileGen) -> LevelConfig {
    if let Some(cfg) = AUTHORED.get(index as usize) {
        return *cfg;
    }
    procedural(index, gen)
}

/// Procedural config for indices beyond the authored table
///
/// Target totals grow linearly with depth; the color set widens every three
/// levels up to the full palette. Per-color amounts get an uneven random
/// bump, so the move budget is derived from whatever total actually landed.
fn procedural(index: u32, gen: &mut TileGen) -> LevelConfig {
    let depth = index - authored_count() + 1;
    let base_total = 20 + 5 * depth;
    let color_count = (3 + index / 3).min(5);

    let mut targets = Targets::default();
    let per_color = base_total / color_count;
    for color in gen.pick_target_colors(color_count as usize) {
        targets.set(color, (per_color + gen.next_range(5)) as u16);
    }

    let move_budget = (targets.total() / 3 + 2).max(12);
    LevelConfig {
        index,
        targets,
        move_budget,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PALETTE_SIZE;

    #[test]
    fn test_authored_lookup() {
        let mut gen = TileGen::new(1);

        let first = config_for(0, &mut gen);
        assert_eq!(first.index, 0);
        assert_eq!(first.targets.get(TileColor::Red), 10);
        assert_eq!(first.targets.get(TileColor::Blue), 10);
        assert_eq!(first.targets.get(TileColor::Yellow), 0);
        assert_eq!(first.move_budget, 12);

        let last = config_for(authored_count() - 1, &mut gen);
        assert_eq!(last.targets.counts().iter().filter(|&&c| c > 0).count(), 5);
    }

    #[test]
    fn test_authored_lookup_does_not_consume_rng() {
        let mut gen = TileGen::new(42);
        let before = gen.seed();
        for index in 0..authored_count() {
            let _ = config_for(index, &mut gen);
        }
        assert_eq!(gen.seed(), before);
    }

    #[test]
    fn test_is_last_authored() {
        assert!(!is_last_authored(0));
        assert!(is_last_authored(authored_count() - 1));
        assert!(!is_last_authored(authored_count()));
    }

    #[test]
    fn test_procedural_deterministic() {
        let mut gen1 = TileGen::new(500);
        let mut gen2 = TileGen::new(500);
        for index in authored_count()..authored_count() + 10 {
            assert_eq!(config_for(index, &mut gen1), config_for(index, &mut gen2));
        }
    }

    #[test]
    fn test_first_procedural_level_shape() {
        let mut gen = TileGen::new(7);
        let index = authored_count();
        let cfg = config_for(index, &mut gen);

        // baseTargetTotal = 25, spread over min(5, 3 + index/3) colors
        let expected_colors = (3 + index / 3).min(5) as usize;
        let nonzero = cfg.targets.counts().iter().filter(|&&c| c > 0).count();
        assert_eq!(nonzero, expected_colors);

        let per_color = 25 / expected_colors as u32;
        for &count in cfg.targets.counts().iter().filter(|&&c| c > 0) {
            let count = count as u32;
            assert!(count >= per_color && count < per_color + 5);
        }
        assert_eq!(cfg.move_budget, (cfg.targets.total() / 3 + 2).max(12));
    }

    #[test]
    fn test_procedural_widens_to_full_palette() {
        let mut gen = TileGen::new(7);
        // index/3 >= 2 forces the full palette
        let cfg = config_for(9, &mut gen);
        let nonzero = cfg.targets.counts().iter().filter(|&&c| c > 0).count();
        assert_eq!(nonzero, PALETTE_SIZE);
    }

    #[test]
    fn test_procedural_budget_floor() {
        let mut gen = TileGen::new(123);
        for index in authored_count()..authored_count() + 30 {
            let cfg = config_for(index, &mut gen);
            assert!(cfg.move_budget >= 12);
            assert!(cfg.targets.total() > 0);
        }
    }
}
