//! RNG module - deterministic tile generation
//!
//! All randomness in the engine flows through an explicit seedable LCG:
//! grid fills, refill tiles, powerup rolls, and procedural level targets.
//! Same seed, same game - which is what AI training and replay need.
//!
//! [`TileGen`] wraps the LCG together with the monotonic identity counter
//! that keys tile instances for presentation collaborators.

use arrayvec::ArrayVec;

use crate::types::{
    PowerupKind, Tile, TileColor, TileFace, PALETTE_SIZE, POWERUP_CHANCE_PCT,
};

/// Simple LCG (Linear Congruential Generator) RNG
/// Uses constants from Numerical Recipes
#[derive(Debug, Clone)]
pub struct SimpleRng {
    state: u32,
}

impl SimpleRng {
    /// Create a new RNG with the given seed
    pub fn new(seed: u32) -> Self {
        // Avoid 0 seed which would produce all zeros
        let state = if seed == 0 { 1 } else { seed };
        Self { state }
    }

    /// Generate next random u32
    pub fn next_u32(&mut self) -> u32 {
        // LCG formula: (a * state + c) mod m
        // Using Numerical Recipes constants: a=1664525, c=1013904223, m=2^32
        self.state = self.state.wrapping_mul(1664525).wrapping_add(1013904223);
        self.state
    }

    /// Generate random value in range [0, max)
    pub fn next_range(&mut self, max: u32) -> u32 {
        self.next_u32() % max
    }

    /// Shuffle a slice using Fisher-Yates
    pub fn shuffle<T>(&mut self, slice: &mut [T]) {
        for i in (1..slice.len()).rev() {
            let j = self.next_range((i + 1) as u32) as usize;
            slice.swap(i, j);
        }
    }
}

/// Deterministic tile generator
///
/// Owns the engine's RNG and the monotonic tile identity counter. Grid fills
/// and refills draw from here; procedural level config borrows the same RNG
/// so one seed fixes the entire run.
#[derive(Debug, Clone)]
pub struct TileGen {
    rng: SimpleRng,
    /// Next identity token; never reused within a generator
    next_id: u32,
}

impl TileGen {
    /// Create a new generator with the given seed
    pub fn new(seed: u32) -> Self {
        Self {
            rng: SimpleRng::new(seed),
            next_id: 1,
        }
    }

    /// Generate a fresh tile: uniform base color, 12% powerup chance
    ///
    /// Generated tiles never carry `rainbow` or `special` faces - those are
    /// placed only by the resolution engine as tier rewards.
    pub fn next_tile(&mut self) -> Tile {
        let color = TileColor::ALL[self.rng.next_range(PALETTE_SIZE as u32) as usize];
        let powerup = if self.rng.next_range(100) < POWERUP_CHANCE_PCT {
            // 33/33/34 split among the three kinds
            Some(match self.rng.next_range(100) {
                0..=32 => PowerupKind::ExtraMoves,
                33..=65 => PowerupKind::ScoreMultiplier,
                _ => PowerupKind::AreaBomb,
            })
        } else {
            None
        };
        self.mint(TileFace::Color(color), powerup)
    }

    /// Mint a tile with an explicit face and no powerup (tier rewards)
    pub fn make_tile(&mut self, face: TileFace) -> Tile {
        self.mint(face, None)
    }

    fn mint(&mut self, face: TileFace, powerup: Option<PowerupKind>) -> Tile {
        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1);
        Tile { face, powerup, id }
    }

    /// Pick `count` distinct palette colors at random
    ///
    /// Used by procedural level config. `count` is clamped to the palette
    /// size; the result preserves no particular order.
    pub fn pick_target_colors(&mut self, count: usize) -> ArrayVec<TileColor, PALETTE_SIZE> {
        let mut pool = TileColor::ALL;
        self.rng.shuffle(&mut pool);
        pool.iter().copied().take(count.min(PALETTE_SIZE)).collect()
    }

    /// Random value in [0, max), from the shared RNG
    pub fn next_range(&mut self, max: u32) -> u32 {
        self.rng.next_range(max)
    }

    /// Get the current RNG state (for restarting a run with the same sequence)
    pub fn seed(&self) -> u32 {
        self.rng.state
    }
}

impl Default for TileGen {
    fn default() -> Self {
        Self::new(1)
    }
}
