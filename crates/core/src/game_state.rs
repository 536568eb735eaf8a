//! Game state module - phases, commits, and the match resolution engine
//!
//! [`GameState`] owns the grid, the active selection, the level countdown,
//! and all scoring state. Every input operation is processed synchronously
//! to completion; there is no background work and no partial state between
//! operations.
//!
//! # Resolution order
//!
//! Committing a chain of at least [`MIN_MATCH`] cells runs these steps in
//! order: chain color, powerup collection (chain cells only), bomb
//! expansion, tier classification, score, combo meter, reward placement,
//! target decrement, moves update, multiplier buff update, gravity and
//! refill, then the win check followed by the loss check. Target decrements
//! read the wildcard flags of the removal set as it was when committed, so
//! a reward tile placed by a commit only counts from its next use onward.
//!
//! # Phases
//!
//! `home → playing → {levelup, won, lost}`. `advanceLevel` leaves `levelup`
//! for the next level's config; `resetRun` restarts from level 0 anywhere;
//! `goHome` returns to the title state and zeroes the run. Loss is detected
//! only when a commit resolves, never spontaneously, and the win check runs
//! first.

use crate::grid::Grid;
use crate::levels::{self, LevelConfig};
use crate::rng::TileGen;
use crate::scoring;
use crate::selection::Selection;
use crate::snapshot::GameSnapshot;
use crate::types::{
    GameOp, GamePhase, GridPos, MatchTier, PowerupKind, ResolutionResult, Targets, TileFace,
    COMBO_BREAKOUT_MOVES, COMBO_BREAKOUT_SCORE, COMBO_MAX, COMBO_MISS_PENALTY,
    DEFAULT_GRID_COLS, DEFAULT_GRID_ROWS, EXTRA_MOVES_PER_TILE, MIN_MATCH, MULTIPLIER_TURNS,
    SPECIAL_TARGET_FACTOR, SUPER_TIER_MOVE_BONUS,
};

/// Configuration fixed at construction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameOptions {
    pub rows: u8,
    pub cols: u8,
    /// Continue into procedural levels after the authored table instead of
    /// ending the run with a win
    pub endless: bool,
}

impl Default for GameOptions {
    fn default() -> Self {
        Self {
            rows: DEFAULT_GRID_ROWS,
            cols: DEFAULT_GRID_COLS,
            endless: true,
        }
    }
}

/// Complete game state
///
/// All fields are private; collaborators read through getters or
/// [`GameState::snapshot_into`] and mutate only through
/// [`GameState::apply_op`].
#[derive(Debug, Clone)]
pub struct GameState {
    options: GameOptions,
    phase: GamePhase,
    grid: Grid,
    selection: Selection,
    gen: TileGen,
    level: LevelConfig,
    /// Live countdown; `level.targets` keeps the level's starting values
    targets: Targets,
    moves_remaining: u32,
    score: u32,
    combo_meter: u32,
    combo_streak: u32,
    multiplier_turns: u32,
    /// Bumped on every `resetRun`, for observers correlating runs
    episode_id: u32,
    /// Bumped on every resolved commit
    commit_id: u32,
    last_resolution: Option<ResolutionResult>,
}

impl GameState {
    /// Create a new game at the home screen with default options
    pub fn new(seed: u32) -> Self {
        Self::with_options(seed, GameOptions::default())
    }

    /// Create a new game at the home screen
    pub fn with_options(seed: u32, options: GameOptions) -> Self {
        let mut gen = TileGen::new(seed);
        let level = levels::config_for(0, &mut gen);
        let grid = Grid::generate(options.rows, options.cols, &mut gen);
        Self {
            options,
            phase: GamePhase::Home,
            grid,
            selection: Selection::new(),
            gen,
            targets: level.targets,
            moves_remaining: level.move_budget,
            level,
            score: 0,
            combo_meter: 0,
            combo_streak: 0,
            multiplier_turns: 0,
            episode_id: 0,
            commit_id: 0,
            last_resolution: None,
        }
    }

    /// Apply an operation, returning whether it changed state
    ///
    /// Invalid inputs (wrong phase, bad coordinates, color mismatches,
    /// sub-threshold chains) are rejections, never errors.
    pub fn apply_op(&mut self, op: GameOp) -> bool {
        match op {
            GameOp::StartSelection { row, col } => {
                if self.phase != GamePhase::Playing {
                    return false;
                }
                self.selection.start(&self.grid, GridPos::new(row, col))
            }
            GameOp::ExtendSelection { row, col } => {
                if self.phase != GamePhase::Playing {
                    return false;
                }
                self.selection.extend(&self.grid, GridPos::new(row, col))
            }
            GameOp::CommitSelection => {
                if self.phase != GamePhase::Playing {
                    return false;
                }
                self.commit_selection()
            }
            GameOp::ResetRun => {
                self.reset_run();
                true
            }
            GameOp::AdvanceLevel => self.advance_level(),
            GameOp::GoHome => {
                self.go_home();
                true
            }
        }
    }

    /// Restart from level 0 with a fresh episode
    ///
    /// The generator's current state seeds the new run, so repeated resets
    /// walk one deterministic sequence.
    fn reset_run(&mut self) {
        let seed = self.gen.seed();
        let next_episode = self.episode_id.wrapping_add(1);
        let commit_id = self.commit_id;
        *self = Self::with_options(seed, self.options);
        self.episode_id = next_episode;
        self.commit_id = commit_id;
        self.phase = GamePhase::Playing;
    }

    /// Return to the home screen, zeroing the run
    fn go_home(&mut self) {
        let seed = self.gen.seed();
        let episode_id = self.episode_id;
        let commit_id = self.commit_id;
        *self = Self::with_options(seed, self.options);
        self.episode_id = episode_id;
        self.commit_id = commit_id;
    }

    /// Move from `levelup` into the next level
    fn advance_level(&mut self) -> bool {
        if self.phase != GamePhase::LevelUp {
            return false;
        }
        self.level = levels::config_for(self.level.index + 1, &mut self.gen);
        self.targets = self.level.targets;
        self.moves_remaining = self.level.move_budget;
        self.multiplier_turns = 0;
        self.grid = Grid::generate(self.options.rows, self.options.cols, &mut self.gen);
        self.selection.clear();
        self.phase = GamePhase::Playing;
        true
    }

    /// Commit the active chain
    ///
    /// A chain shorter than [`MIN_MATCH`] is discarded: the combo streak
    /// resets and the meter drops, but score, moves, targets, and grid are
    /// untouched. Rejected outright when no chain is active.
    fn commit_selection(&mut self) -> bool {
        if !self.selection.is_active() {
            return false;
        }
        let chain = self.selection.take_path();
        if chain.len() < MIN_MATCH {
            self.combo_streak = 0;
            self.combo_meter = self.combo_meter.saturating_sub(COMBO_MISS_PENALTY);
            return true;
        }
        self.resolve(chain);
        true
    }

    /// Run the resolution steps for a valid committed chain
    fn resolve(&mut self, chain: Vec<GridPos>) {
        let chain_color = chain
            .iter()
            .find_map(|&pos| self.grid.tile(pos).and_then(|t| t.face.base_color()));

        // Powerups collect over the drawn chain only, never the expansion
        let mut extra_moves = 0u32;
        let mut multiplier_activated = false;
        let mut bomb_activated = false;
        for &pos in &chain {
            match self.grid.tile(pos).and_then(|t| t.powerup) {
                Some(PowerupKind::ExtraMoves) => extra_moves += EXTRA_MOVES_PER_TILE,
                Some(PowerupKind::ScoreMultiplier) => multiplier_activated = true,
                Some(PowerupKind::AreaBomb) => bomb_activated = true,
                None => {}
            }
        }

        let mut removal = chain.clone();
        if bomb_activated {
            if let Some(color) = chain_color {
                for pos in self.grid.positions_of_color(color) {
                    if !removal.contains(&pos) {
                        removal.push(pos);
                    }
                }
            }
        }
        let removal_count = removal.len();

        // Wildcard flags are read before any mutation: a reward placed by
        // this commit must not count until its next use
        let mut has_rainbow = false;
        let mut has_special = false;
        for &pos in &removal {
            match self.grid.tile(pos).map(|t| t.face) {
                Some(TileFace::Rainbow) => has_rainbow = true,
                Some(TileFace::Special) => has_special = true,
                _ => {}
            }
        }

        let tier = scoring::tier_for(removal_count);
        let doubled = self.multiplier_turns > 0 || multiplier_activated;
        let mut score_delta = scoring::match_score(removal_count, tier, doubled);

        self.combo_streak += 1;
        self.combo_meter += scoring::combo_fill(removal_count);
        let combo_breakout = self.combo_meter >= COMBO_MAX;
        if combo_breakout {
            score_delta += COMBO_BREAKOUT_SCORE;
            self.combo_meter = 0;
        }

        for &pos in &removal {
            self.grid.clear_cell(pos);
        }
        let reward = scoring::reward_face(tier);
        if let Some(face) = reward {
            if let Some(&last) = chain.last() {
                let tile = self.gen.make_tile(face);
                self.grid.set(last, Some(tile));
            }
        }

        if has_rainbow {
            self.targets.decrement_all(removal_count as u16);
        } else if let Some(color) = chain_color {
            let factor = if has_special { SPECIAL_TARGET_FACTOR } else { 1 };
            self.targets.decrement(color, removal_count as u16 * factor);
        }

        let mut refund = extra_moves;
        if tier == MatchTier::Super {
            refund += SUPER_TIER_MOVE_BONUS;
        }
        if combo_breakout {
            refund += COMBO_BREAKOUT_MOVES;
        }
        self.moves_remaining = (self.moves_remaining + refund).saturating_sub(1);

        if multiplier_activated {
            self.multiplier_turns = MULTIPLIER_TURNS;
        } else if self.multiplier_turns > 0 {
            self.multiplier_turns -= 1;
        }

        self.grid.collapse_and_refill(&mut self.gen);

        self.score += score_delta;
        self.commit_id = self.commit_id.wrapping_add(1);
        self.last_resolution = Some(ResolutionResult {
            removal_count: removal_count as u32,
            chain_len: chain.len() as u32,
            tier,
            chain_color,
            score_delta,
            moves_delta: refund as i32 - 1,
            combo_breakout,
            extra_moves,
            multiplier_activated,
            bomb_activated,
            reward,
            cleared: removal,
        });

        // Win before loss: a commit that zeroes the targets on its last
        // move still clears the level
        if self.targets.all_met() {
            let finished_run =
                !self.options.endless && levels::is_last_authored(self.level.index);
            self.phase = if finished_run {
                GamePhase::Won
            } else {
                GamePhase::LevelUp
            };
        } else if self.moves_remaining == 0 {
            self.phase = GamePhase::Lost;
        }
    }

    /// Consume the result of the most recent resolved commit
    ///
    /// Presentation and protocol collaborators call this once per commit;
    /// the record is transient and cleared by the take.
    pub fn take_last_resolution(&mut self) -> Option<ResolutionResult> {
        self.last_resolution.take()
    }

    /// Fill a reusable snapshot buffer from the current state
    pub fn snapshot_into(&self, snapshot: &mut GameSnapshot) {
        snapshot.clear();
        snapshot.phase = self.phase;
        snapshot.rows = self.grid.rows();
        snapshot.cols = self.grid.cols();
        for row in 0..self.grid.rows() {
            for col in 0..self.grid.cols() {
                let tile = self.grid.tile(GridPos::new(row, col));
                snapshot.faces.push(tile.map_or(0, |t| t.face.code()));
                snapshot
                    .powerups
                    .push(tile.and_then(|t| t.powerup).map_or(0, |p| p.code()));
            }
        }
        snapshot.selection.extend_from_slice(self.selection.path());
        snapshot.score = self.score;
        snapshot.level_index = self.level.index;
        snapshot.moves_remaining = self.moves_remaining;
        snapshot.move_budget = self.level.move_budget;
        snapshot.targets = self.targets.counts();
        snapshot.combo_meter = self.combo_meter;
        snapshot.combo_streak = self.combo_streak;
        snapshot.multiplier_turns = self.multiplier_turns;
        snapshot.episode_id = self.episode_id;
        snapshot.commit_id = self.commit_id;
    }

    /// Allocate a fresh snapshot of the current state
    pub fn snapshot(&self) -> GameSnapshot {
        let mut snapshot = GameSnapshot::default();
        self.snapshot_into(&mut snapshot);
        snapshot
    }

    pub fn phase(&self) -> GamePhase {
        self.phase
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    /// The active chain path, empty when idle
    pub fn selection_path(&self) -> &[GridPos] {
        self.selection.path()
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn level_index(&self) -> u32 {
        self.level.index
    }

    pub fn moves_remaining(&self) -> u32 {
        self.moves_remaining
    }

    /// The current level's starting move budget
    pub fn move_budget(&self) -> u32 {
        self.level.move_budget
    }

    pub fn targets(&self) -> Targets {
        self.targets
    }

    pub fn combo_meter(&self) -> u32 {
        self.combo_meter
    }

    pub fn combo_streak(&self) -> u32 {
        self.combo_streak
    }

    pub fn multiplier_turns(&self) -> u32 {
        self.multiplier_turns
    }

    pub fn episode_id(&self) -> u32 {
        self.episode_id
    }

    pub fn commit_id(&self) -> u32 {
        self.commit_id
    }

    pub fn options(&self) -> GameOptions {
        self.options
    }
}

impl Default for GameState {
    fn default() -> Self {
        Self::new(1)
    }
}
