//! Game state management - score, streaks, win/lose conditions.
//!
//! Win: Clear all bubbles from the grid.
//! Lose: A bubble sits in the last section, or time runs out.

use bevy::log::info;
use bevy::reflect::Reflect;

use super::{bubble::BubbleColor, cluster::MatchOutcome, grid::GridModel};

/// Points awarded per bubble removed, before multipliers.
pub const POINTS_PER_BUBBLE: u64 = 50;

/// Default time budget for one game, in seconds.
pub const DEFAULT_TIME_BUDGET_SECS: u32 = 120;

/// Running statistics for the current game.
#[derive(Debug, Clone, Default, PartialEq, Reflect)]
pub struct GameStats {
    pub score: u64,
    /// Consecutive shots that removed something.
    pub streak: u32,
    /// Bubbles removed by the most recent shot.
    pub combo: usize,
    pub max_combo: usize,
    /// Color of the shot that produced `max_combo`.
    pub lucky_color: Option<BubbleColor>,
    /// Chain count of the most recent shot.
    pub chain: usize,
    pub max_chain: usize,
    pub shots_fired: u32,
    pub shots_scored: u32,
    pub bubbles_removed: u32,
}

impl GameStats {
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Count a bubble leaving the cannon.
    pub fn record_shot_fired(&mut self) {
        self.shots_fired += 1;
    }

    /// Fold one resolved shot into the stats. Returns the points it earned.
    ///
    /// `points = removed * 50 * (1 + chain/2 + streak/2)`, using the streak
    /// from before this shot.
    pub fn record_outcome(&mut self, outcome: &MatchOutcome) -> u64 {
        let removed = outcome.removed();
        let chain = outcome.chain;

        // Integer form: removed * 25 * (2 + chain + streak).
        let points = removed as u64
            * (POINTS_PER_BUBBLE / 2)
            * (2 + chain as u64 + u64::from(self.streak));
        self.score += points;

        if removed > 0 {
            self.streak += 1;
            self.shots_scored += 1;
        } else {
            self.streak = 0;
        }

        self.combo = removed;
        self.chain = chain;
        self.max_chain = self.max_chain.max(chain);
        self.bubbles_removed += removed as u32;
        if removed > self.max_combo {
            self.max_combo = removed;
            self.lucky_color = outcome.color;
        }

        if removed > 0 {
            info!(
                "Shot removed {} bubbles (chain {}, streak {}), +{} points (total: {})",
                removed, chain, self.streak, points, self.score
            );
        }

        points
    }

    /// A shot that never landed (discarded or lost off the field).
    pub fn record_miss(&mut self) {
        self.streak = 0;
        self.combo = 0;
        self.chain = 0;
    }

    /// Fraction of fired shots that removed something, 0 before any shot.
    pub fn accuracy(&self) -> f32 {
        if self.shots_fired == 0 {
            0.0
        } else {
            self.shots_scored as f32 / self.shots_fired as f32
        }
    }
}

/// Countdown in whole seconds, advanced by an external 1 Hz tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Reflect)]
pub struct TimeBudget {
    pub total_secs: u32,
    pub remaining_secs: u32,
}

impl Default for TimeBudget {
    fn default() -> Self {
        Self::new(DEFAULT_TIME_BUDGET_SECS)
    }
}

impl TimeBudget {
    pub fn new(total_secs: u32) -> Self {
        Self {
            total_secs,
            remaining_secs: total_secs,
        }
    }

    /// Take one second off. Returns the seconds left.
    pub fn tick(&mut self) -> u32 {
        self.remaining_secs = self.remaining_secs.saturating_sub(1);
        self.remaining_secs
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining_secs == 0
    }

    pub fn reset(&mut self) {
        self.remaining_secs = self.total_secs;
    }
}

/// Where the game stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Reflect)]
pub enum GameOutcome {
    #[default]
    InProgress,
    Won,
    Lost,
}

impl GameOutcome {
    pub fn is_over(self) -> bool {
        self != GameOutcome::InProgress
    }
}

/// Win/lose state machine. Once the game is over it stays over.
#[derive(Debug, Clone, Default, Reflect)]
pub struct Evaluator {
    outcome: GameOutcome,
}

impl Evaluator {
    pub fn outcome(&self) -> GameOutcome {
        self.outcome
    }

    pub fn reset(&mut self) {
        self.outcome = GameOutcome::InProgress;
    }

    /// Force a loss, e.g. when a shot lands in the last section.
    ///
    /// Returns `true` if this call ended the game.
    pub fn force_loss(&mut self) -> bool {
        if self.outcome.is_over() {
            return false;
        }
        self.outcome = GameOutcome::Lost;
        info!("GAME OVER! A bubble reached the bottom section");
        true
    }

    /// Evaluate the current position. Returns the new outcome if it changed.
    ///
    /// Order matters: a bubble in the last section loses outright; otherwise
    /// nothing is decided while bubbles are still in flight; then an empty
    /// grid wins and an exhausted clock loses.
    pub fn evaluate(
        &mut self,
        grid: &GridModel,
        flying: usize,
        time: &TimeBudget,
    ) -> Option<GameOutcome> {
        if self.outcome.is_over() {
            return None;
        }

        let last = grid.layout().last_section();
        let next = if grid.lowest_section().is_some_and(|section| section >= last) {
            GameOutcome::Lost
        } else if flying > 0 {
            GameOutcome::InProgress
        } else if grid.is_empty() {
            GameOutcome::Won
        } else if time.is_exhausted() {
            GameOutcome::Lost
        } else {
            GameOutcome::InProgress
        };

        if next == self.outcome {
            return None;
        }
        match next {
            GameOutcome::Won => info!("WIN! All bubbles cleared!"),
            GameOutcome::Lost => info!("GAME OVER!"),
            GameOutcome::InProgress => {}
        }
        self.outcome = next;
        Some(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::{
        bubble::{BubbleKind, PowerKind},
        hex::GridCoord,
    };

    fn outcome(removed: usize, chain: usize, color: BubbleColor) -> MatchOutcome {
        MatchOutcome {
            cluster_removed: removed,
            chain,
            color: Some(color),
            ..Default::default()
        }
    }

    #[test]
    fn test_score_formula_uses_chain_and_streak() {
        let mut stats = GameStats::default();

        // First shot: no streak yet. 3 * 50 * (1 + 0 + 0)
        assert_eq!(stats.record_outcome(&outcome(3, 0, BubbleColor::Red)), 150);
        // Streak 1, chain 2: 4 * 50 * (1 + 1 + 0.5)
        assert_eq!(stats.record_outcome(&outcome(4, 2, BubbleColor::Blue)), 500);
        assert_eq!(stats.score, 650);
        assert_eq!(stats.streak, 2);
    }

    #[test]
    fn test_streak_resets_on_empty_shot() {
        let mut stats = GameStats::default();
        stats.record_outcome(&outcome(3, 0, BubbleColor::Red));
        stats.record_outcome(&outcome(0, 0, BubbleColor::Red));
        assert_eq!(stats.streak, 0);
        assert_eq!(stats.combo, 0);
    }

    #[test]
    fn test_max_combo_tracks_lucky_color() {
        let mut stats = GameStats::default();
        stats.record_outcome(&outcome(3, 0, BubbleColor::Red));
        stats.record_outcome(&outcome(7, 0, BubbleColor::Green));
        stats.record_outcome(&outcome(5, 0, BubbleColor::Blue));
        assert_eq!(stats.max_combo, 7);
        assert_eq!(stats.lucky_color, Some(BubbleColor::Green));
        assert_eq!(stats.combo, 5);
    }

    #[test]
    fn test_accuracy() {
        let mut stats = GameStats::default();
        assert_eq!(stats.accuracy(), 0.0);
        for removed in [3, 0, 4, 0] {
            stats.record_shot_fired();
            stats.record_outcome(&outcome(removed, 0, BubbleColor::Orange));
        }
        assert_eq!(stats.accuracy(), 0.5);
    }

    #[test]
    fn test_time_budget_counts_down_and_stops() {
        let mut time = TimeBudget::new(2);
        assert_eq!(time.tick(), 1);
        assert_eq!(time.tick(), 0);
        assert_eq!(time.tick(), 0);
        assert!(time.is_exhausted());
        time.reset();
        assert_eq!(time.remaining_secs, 2);
    }

    #[test]
    fn test_bottom_section_loses_first() {
        let mut grid = GridModel::default();
        let last = grid.layout().last_section();
        grid.place(GridCoord::new(last, 0), BubbleKind::Power(PowerKind::Star));

        let mut evaluator = Evaluator::default();
        // Even with bubbles in flight and time left.
        assert_eq!(
            evaluator.evaluate(&grid, 2, &TimeBudget::new(60)),
            Some(GameOutcome::Lost)
        );
    }

    #[test]
    fn test_flight_defers_decision() {
        let grid = GridModel::default();
        let mut evaluator = Evaluator::default();
        assert_eq!(evaluator.evaluate(&grid, 1, &TimeBudget::new(60)), None);
        assert_eq!(evaluator.outcome(), GameOutcome::InProgress);

        assert_eq!(
            evaluator.evaluate(&grid, 0, &TimeBudget::new(60)),
            Some(GameOutcome::Won)
        );
    }

    #[test]
    fn test_time_out_loses_with_bubbles_left() {
        let mut grid = GridModel::default();
        grid.place(GridCoord::new(0, 0), BubbleKind::Colored(BubbleColor::Red));
        let mut evaluator = Evaluator::default();

        assert_eq!(evaluator.evaluate(&grid, 0, &TimeBudget::new(10)), None);
        assert_eq!(
            evaluator.evaluate(&grid, 0, &TimeBudget::new(0)),
            Some(GameOutcome::Lost)
        );
        // Signals fire once.
        assert_eq!(evaluator.evaluate(&grid, 0, &TimeBudget::new(0)), None);
        assert!(!evaluator.force_loss());
    }
}
