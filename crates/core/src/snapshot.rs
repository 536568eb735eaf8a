//! Snapshot module - reusable state views for observers
//!
//! [`GameSnapshot`] is a plain buffer filled by
//! [`GameState::snapshot_into`](crate::game_state::GameState::snapshot_into).
//! Callers keep one around and refill it per poll; the vectors retain their
//! capacity across fills, so steady-state observation does not allocate.

use crate::types::{GamePhase, GridPos, PALETTE_SIZE};

/// One observer-facing view of the game
///
/// `faces` and `powerups` are row-major cell codes (see the type module's
/// code tables); both always hold `rows * cols` entries after a fill.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameSnapshot {
    pub phase: GamePhase,
    pub rows: u8,
    pub cols: u8,
    /// Face codes: 0 empty, 1-5 colors, 6 rainbow, 7 special
    pub faces: Vec<u8>,
    /// Powerup codes: 0 none, 1 extraMoves, 2 scoreMultiplier, 3 areaBomb
    pub powerups: Vec<u8>,
    /// Active chain path, selection order
    pub selection: Vec<GridPos>,
    pub score: u32,
    pub level_index: u32,
    pub moves_remaining: u32,
    pub move_budget: u32,
    /// Remaining removals per color, palette order
    pub targets: [u16; PALETTE_SIZE],
    pub combo_meter: u32,
    pub combo_streak: u32,
    pub multiplier_turns: u32,
    pub episode_id: u32,
    pub commit_id: u32,
}

impl GameSnapshot {
    /// Reset scalars and empty the vectors, keeping their capacity
    pub fn clear(&mut self) {
        self.phase = GamePhase::Home;
        self.rows = 0;
        self.cols = 0;
        self.faces.clear();
        self.powerups.clear();
        self.selection.clear();
        self.score = 0;
        self.level_index = 0;
        self.moves_remaining = 0;
        self.move_budget = 0;
        self.targets = [0; PALETTE_SIZE];
        self.combo_meter = 0;
        self.combo_streak = 0;
        self.multiplier_turns = 0;
        self.episode_id = 0;
        self.commit_id = 0;
    }

    /// Whether this snapshot was taken mid-run
    pub fn playable(&self) -> bool {
        self.phase == GamePhase::Playing
    }
}

impl Default for GameSnapshot {
    fn default() -> Self {
        Self {
            phase: GamePhase::Home,
            rows: 0,
            cols: 0,
            faces: Vec::new(),
            powerups: Vec::new(),
            selection: Vec::new(),
            score: 0,
            level_index: 0,
            moves_remaining: 0,
            move_budget: 0,
            targets: [0; PALETTE_SIZE],
            combo_meter: 0,
            combo_streak: 0,
            multiplier_turns: 0,
            episode_id: 0,
            commit_id: 0,
        }
    }
}
