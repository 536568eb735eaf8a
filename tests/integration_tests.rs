//! Integration tests for the full game loop
//!
//! Everything here goes through the public `GameState` API the way the
//! runner does: apply ops, read getters, take snapshots. Board layouts are
//! whatever the seed produces, so assertions stick to phase rules and to
//! the deltas reported by the resolution record rather than to hardcoded
//! tile positions.

use chainpop::core::{GameOptions, GameSnapshot, GameState, Grid};
use chainpop::types::{GameOp, GamePhase, GridPos, TileColor, MIN_MATCH};

/// Find any king-connected path of `MIN_MATCH` same-colored tiles.
fn find_chain(state: &GameState) -> Option<Vec<GridPos>> {
    let grid = state.grid();
    for row in 0..grid.rows() {
        for col in 0..grid.cols() {
            let start = GridPos::new(row, col);
            let Some(color) = grid.tile(start).and_then(|t| t.face.base_color()) else {
                continue;
            };
            let mut path = vec![start];
            if grow_chain(grid, color, &mut path) {
                return Some(path);
            }
        }
    }
    None
}

fn grow_chain(grid: &Grid, color: TileColor, path: &mut Vec<GridPos>) -> bool {
    if path.len() >= MIN_MATCH {
        return true;
    }
    let head = *path.last().unwrap();
    for dr in -1i16..=1 {
        for dc in -1i16..=1 {
            if dr == 0 && dc == 0 {
                continue;
            }
            let row = head.row as i16 + dr;
            let col = head.col as i16 + dc;
            if row < 0 || col < 0 || row >= grid.rows() as i16 || col >= grid.cols() as i16 {
                continue;
            }
            let next = GridPos::new(row as u8, col as u8);
            if path.contains(&next) {
                continue;
            }
            if grid.tile(next).and_then(|t| t.face.base_color()) != Some(color) {
                continue;
            }
            path.push(next);
            if grow_chain(grid, color, path) {
                return true;
            }
            path.pop();
        }
    }
    false
}

/// Start a run and re-roll the board until it offers a chain.
fn playing_state_with_chain(seed: u32) -> (GameState, Vec<GridPos>) {
    let mut state = GameState::new(seed);
    assert!(state.apply_op(GameOp::ResetRun));
    for _ in 0..32 {
        if let Some(chain) = find_chain(&state) {
            return (state, chain);
        }
        assert!(state.apply_op(GameOp::ResetRun));
    }
    panic!("no chain on 32 consecutive boards");
}

fn apply_chain(state: &mut GameState, chain: &[GridPos]) {
    for (i, pos) in chain.iter().enumerate() {
        let op = if i == 0 {
            GameOp::StartSelection {
                row: pos.row,
                col: pos.col,
            }
        } else {
            GameOp::ExtendSelection {
                row: pos.row,
                col: pos.col,
            }
        };
        assert!(state.apply_op(op), "chain step {i} rejected at {pos:?}");
    }
    assert!(state.apply_op(GameOp::CommitSelection));
}

#[test]
fn test_new_game_starts_at_home() {
    let state = GameState::new(12345);

    assert_eq!(state.phase(), GamePhase::Home);
    assert_eq!(state.score(), 0);
    assert_eq!(state.episode_id(), 0);
    assert_eq!(state.commit_id(), 0);
    assert!(state.selection_path().is_empty());

    // The board is generated up front so the home screen can show it
    assert!(state.grid().is_full());
    assert_eq!(state.grid().rows(), 8);
    assert_eq!(state.grid().cols(), 5);
}

#[test]
fn test_ops_rejected_outside_their_phase() {
    let mut state = GameState::new(1);

    assert!(!state.apply_op(GameOp::StartSelection { row: 0, col: 0 }));
    assert!(!state.apply_op(GameOp::ExtendSelection { row: 0, col: 1 }));
    assert!(!state.apply_op(GameOp::CommitSelection));
    assert!(!state.apply_op(GameOp::AdvanceLevel));

    assert!(state.apply_op(GameOp::ResetRun));
    assert_eq!(state.phase(), GamePhase::Playing);

    // Still no level to advance to, and nothing selected to commit
    assert!(!state.apply_op(GameOp::AdvanceLevel));
    assert!(!state.apply_op(GameOp::CommitSelection));
}

#[test]
fn test_reset_run_starts_level_zero() {
    let mut state = GameState::new(42);
    assert!(state.apply_op(GameOp::ResetRun));

    assert_eq!(state.phase(), GamePhase::Playing);
    assert_eq!(state.episode_id(), 1);
    assert_eq!(state.level_index(), 0);
    assert_eq!(state.move_budget(), 12);
    assert_eq!(state.moves_remaining(), 12);
    assert_eq!(state.targets().get(TileColor::Red), 10);
    assert_eq!(state.targets().get(TileColor::Blue), 10);
    assert_eq!(state.targets().get(TileColor::Yellow), 0);
    assert!(state.grid().is_full());
}

#[test]
fn test_selection_adjacency_and_backtrack() {
    let (mut state, chain) = playing_state_with_chain(7);

    assert!(state.apply_op(GameOp::StartSelection {
        row: chain[0].row,
        col: chain[0].col,
    }));
    assert!(state.apply_op(GameOp::ExtendSelection {
        row: chain[1].row,
        col: chain[1].col,
    }));
    assert_eq!(state.selection_path(), &chain[..2]);

    // A cell three rows away is never king-adjacent
    let head = chain[1];
    let far_row = if head.row < 4 { head.row + 3 } else { head.row - 3 };
    assert!(!state.apply_op(GameOp::ExtendSelection {
        row: far_row,
        col: head.col,
    }));
    assert_eq!(state.selection_path(), &chain[..2]);

    // Re-entering the previous cell backtracks instead of extending
    assert!(state.apply_op(GameOp::ExtendSelection {
        row: chain[0].row,
        col: chain[0].col,
    }));
    assert_eq!(state.selection_path(), &chain[..1]);

    assert!(state.apply_op(GameOp::ExtendSelection {
        row: chain[1].row,
        col: chain[1].col,
    }));
    assert!(state.apply_op(GameOp::ExtendSelection {
        row: chain[2].row,
        col: chain[2].col,
    }));
    assert_eq!(state.selection_path(), &chain[..]);
}

#[test]
fn test_short_commit_releases_without_scoring() {
    let (mut state, chain) = playing_state_with_chain(11);
    let moves_before = state.moves_remaining();
    let targets_before = state.targets();

    assert!(state.apply_op(GameOp::StartSelection {
        row: chain[0].row,
        col: chain[0].col,
    }));
    assert!(state.apply_op(GameOp::ExtendSelection {
        row: chain[1].row,
        col: chain[1].col,
    }));

    // Two cells is below the match threshold: the chain is dropped, not
    // resolved
    assert!(state.apply_op(GameOp::CommitSelection));
    assert!(state.selection_path().is_empty());
    assert_eq!(state.score(), 0);
    assert_eq!(state.commit_id(), 0);
    assert_eq!(state.moves_remaining(), moves_before);
    assert_eq!(state.targets(), targets_before);
    assert!(state.grid().is_full());
    assert!(state.take_last_resolution().is_none());
}

#[test]
fn test_commit_scores_and_reports_resolution() {
    let (mut state, chain) = playing_state_with_chain(99);
    let score_before = state.score();
    let moves_before = state.moves_remaining();
    let targets_before = state.targets();

    apply_chain(&mut state, &chain);

    let res = state.take_last_resolution().expect("commit must resolve");
    assert_eq!(res.chain_len, MIN_MATCH as u32);
    assert!(res.removal_count >= MIN_MATCH as u32);
    assert!(res.score_delta > 0);
    assert!(chain.iter().all(|pos| res.cleared.contains(pos)));

    let color = res.chain_color.expect("colored chain");
    assert_eq!(
        state.targets().get(color),
        targets_before
            .get(color)
            .saturating_sub(res.removal_count as u16)
    );

    assert_eq!(state.score(), score_before + res.score_delta);
    assert_eq!(
        state.moves_remaining() as i64,
        moves_before as i64 + res.moves_delta as i64
    );
    assert_eq!(state.commit_id(), 1);
    assert_eq!(state.combo_streak(), 1);
    assert!(state.selection_path().is_empty());
    assert!(state.grid().is_full());

    // The record is consumed by the take
    assert!(state.take_last_resolution().is_none());
}

#[test]
fn test_run_reaches_a_phase_transition() {
    let (mut state, _) = playing_state_with_chain(77);
    let mut commits = 0u32;

    while state.phase() == GamePhase::Playing && commits < 200 {
        let Some(chain) = find_chain(&state) else {
            break;
        };
        apply_chain(&mut state, &chain);
        let res = state.take_last_resolution().expect("commit must resolve");
        assert!(res.removal_count >= MIN_MATCH as u32);
        assert!(state.grid().is_full());
        commits += 1;
        if state.phase() == GamePhase::Playing {
            assert!(state.moves_remaining() >= 1);
        }
    }

    assert!(commits > 0);
    assert_eq!(state.commit_id(), commits);

    match state.phase() {
        GamePhase::LevelUp => {
            assert!(state.targets().all_met());
            let level = state.level_index();
            assert!(state.apply_op(GameOp::AdvanceLevel));
            assert_eq!(state.phase(), GamePhase::Playing);
            assert_eq!(state.level_index(), level + 1);
            assert_eq!(state.moves_remaining(), state.move_budget());
            assert!(state.grid().is_full());
        }
        GamePhase::Lost => assert_eq!(state.moves_remaining(), 0),
        // Board ran dry or the safety cap hit first
        GamePhase::Playing => {}
        other => panic!("unexpected phase {other:?}"),
    }
}

#[test]
fn test_go_home_clears_the_run() {
    let (mut state, chain) = playing_state_with_chain(5);
    apply_chain(&mut state, &chain);
    assert!(state.score() > 0);
    let episode = state.episode_id();

    assert!(state.apply_op(GameOp::GoHome));

    assert_eq!(state.phase(), GamePhase::Home);
    assert_eq!(state.score(), 0);
    assert_eq!(state.combo_meter(), 0);
    assert_eq!(state.combo_streak(), 0);
    assert!(state.selection_path().is_empty());

    // Observer correlation ids survive the trip home
    assert_eq!(state.episode_id(), episode);
    assert_eq!(state.commit_id(), 1);
}

#[test]
fn test_reset_bumps_episode_and_keeps_commit_counter() {
    let (mut state, chain) = playing_state_with_chain(13);
    let episode = state.episode_id();
    apply_chain(&mut state, &chain);

    assert!(state.apply_op(GameOp::ResetRun));

    assert_eq!(state.phase(), GamePhase::Playing);
    assert_eq!(state.episode_id(), episode + 1);
    assert_eq!(state.commit_id(), 1);
    assert_eq!(state.score(), 0);
    assert_eq!(state.level_index(), 0);
    assert_eq!(state.moves_remaining(), 12);
}

#[test]
fn test_same_seed_replays_identically() {
    let (mut a, chain_a) = playing_state_with_chain(2024);
    let (mut b, chain_b) = playing_state_with_chain(2024);
    assert_eq!(chain_a, chain_b);

    let mut snap_a = GameSnapshot::default();
    let mut snap_b = GameSnapshot::default();
    a.snapshot_into(&mut snap_a);
    b.snapshot_into(&mut snap_b);
    assert_eq!(snap_a, snap_b);

    apply_chain(&mut a, &chain_a);
    apply_chain(&mut b, &chain_b);
    assert_eq!(a.take_last_resolution(), b.take_last_resolution());

    a.snapshot_into(&mut snap_a);
    b.snapshot_into(&mut snap_b);
    assert_eq!(snap_a, snap_b);
    assert_eq!(snap_a.commit_id, 1);
}

#[test]
fn test_custom_grid_dimensions() {
    let mut state = GameState::with_options(
        9,
        GameOptions {
            rows: 6,
            cols: 7,
            endless: false,
        },
    );
    assert!(state.apply_op(GameOp::ResetRun));

    assert_eq!(state.grid().rows(), 6);
    assert_eq!(state.grid().cols(), 7);
    assert!(state.grid().is_full());

    let snapshot = state.snapshot();
    assert_eq!(snapshot.rows, 6);
    assert_eq!(snapshot.cols, 7);
    assert_eq!(snapshot.faces.len(), 42);
    assert_eq!(snapshot.powerups.len(), 42);
}
