//! Scoring module - tier classification, score, and combo arithmetic
//!
//! Pure functions over removal-set sizes. The resolution engine in
//! [`game_state`](crate::game_state) owns sequencing and state; everything
//! here is a total function with no side effects.

use crate::types::{
    MatchTier, TileFace, BONUS_TIER_MIN, COMBO_FILL_BASE, COMBO_FILL_MAX, COMBO_FILL_STEP,
    MIN_MATCH, SUPER_TIER_MIN, TILE_SCORE,
};

/// Classify a removal-set size into its bonus tier
pub fn tier_for(removal_count: usize) -> MatchTier {
    if removal_count >= SUPER_TIER_MIN {
        MatchTier::Super
    } else if removal_count >= BONUS_TIER_MIN {
        MatchTier::Bonus
    } else {
        MatchTier::Normal
    }
}

/// Score multiplier for a tier
pub fn tier_multiplier(tier: MatchTier) -> u32 {
    match tier {
        MatchTier::Normal => 1,
        MatchTier::Bonus => 2,
        MatchTier::Super => 4,
    }
}

/// Score for a resolved match
///
/// `base = removalCount x 10`, times the tier multiplier, doubled again when
/// the score multiplier buff is active or was collected this commit.
pub fn match_score(removal_count: usize, tier: MatchTier, doubled: bool) -> u32 {
    let base = removal_count as u32 * TILE_SCORE;
    let multiplier = tier_multiplier(tier) * if doubled { 2 } else { 1 };
    base * multiplier
}

/// Combo meter fill for a resolved match
///
/// Grows with removal-set size, capped at [`COMBO_FILL_MAX`]. Valid matches
/// never remove fewer than [`MIN_MATCH`] tiles.
pub fn combo_fill(removal_count: usize) -> u32 {
    let beyond = removal_count.saturating_sub(MIN_MATCH) as u32;
    (COMBO_FILL_BASE + beyond * COMBO_FILL_STEP).min(COMBO_FILL_MAX)
}

/// Reward tile face for a tier, if the tier places one
pub fn reward_face(tier: MatchTier) -> Option<TileFace> {
    match tier {
        MatchTier::Normal => None,
        MatchTier::Bonus => Some(TileFace::Special),
        MatchTier::Super => Some(TileFace::Rainbow),
    }
}
