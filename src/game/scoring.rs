//! Score threshold ladder.
//!
//! Pure arithmetic: turning a score award into a new score and LED count.
//! Lighting the physical LEDs is left to whoever consumes the resulting
//! events.

use serde::{Deserialize, Serialize};

use crate::game::LED_COUNT;

/// How many LEDs a single award may light.
///
/// By default the ladder advances by at most one step per award even when
/// the award crosses several thresholds; later awards let the count catch
/// up. `AllCrossed` lights every crossed threshold at once.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThresholdPolicy {
    /// At most one LED per award.
    #[default]
    SingleStep,
    /// Every crossed threshold lights in the same award.
    AllCrossed,
}

/// Result of applying an award.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoreUpdate {
    /// Score after the award (capped).
    pub score: u32,
    /// LED count before the award.
    pub previous_leds: u8,
    /// LED count after the award.
    pub active_leds: u8,
}

impl ScoreUpdate {
    /// LED numbers (1-based) that this award switched on, in order.
    pub fn newly_lit(&self) -> impl Iterator<Item = u8> {
        (self.previous_leds + 1)..=self.active_leds
    }

    /// Whether the score reached the top of the ladder.
    #[must_use]
    pub fn is_maxed(&self) -> bool {
        usize::from(self.active_leds) == LED_COUNT
    }
}

/// Ordered list of thresholds, one per LED.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoreLadder {
    thresholds: [u32; LED_COUNT],
    policy: ThresholdPolicy,
}

impl ScoreLadder {
    /// Create a ladder. Thresholds are expected to be strictly increasing.
    #[must_use]
    pub const fn new(thresholds: [u32; LED_COUNT], policy: ThresholdPolicy) -> Self {
        Self { thresholds, policy }
    }

    /// The highest reachable score.
    #[must_use]
    pub const fn cap(&self) -> u32 {
        self.thresholds[LED_COUNT - 1]
    }

    /// The threshold values.
    #[must_use]
    pub const fn thresholds(&self) -> &[u32; LED_COUNT] {
        &self.thresholds
    }

    /// Number of thresholds at or below `score`.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn leds_for(&self, score: u32) -> u8 {
        self.thresholds.iter().take_while(|&&t| score >= t).count() as u8
    }

    /// Add `points` to `score` and advance the LED count.
    ///
    /// Reaching the cap clamps the score and lights every LED regardless of
    /// policy.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn apply(&self, score: u32, active_leds: u8, points: u32) -> ScoreUpdate {
        let previous_leds = active_leds;
        let score = score.saturating_add(points);

        if score >= self.cap() {
            return ScoreUpdate {
                score: self.cap(),
                previous_leds,
                active_leds: LED_COUNT as u8,
            };
        }

        let mut active = active_leds;
        match self.policy {
            ThresholdPolicy::SingleStep => {
                if usize::from(active) < LED_COUNT && score >= self.thresholds[usize::from(active)] {
                    active += 1;
                }
            }
            ThresholdPolicy::AllCrossed => {
                while usize::from(active) < LED_COUNT && score >= self.thresholds[usize::from(active)] {
                    active += 1;
                }
            }
        }

        ScoreUpdate {
            score,
            previous_leds,
            active_leds: active,
        }
    }
}

impl Default for ScoreLadder {
    fn default() -> Self {
        Self::new(
            [50, 150, 300, 500, 750, 1100, 1500, 1950],
            ThresholdPolicy::SingleStep,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_threshold_crossing() {
        let ladder = ScoreLadder::default();
        let update = ladder.apply(45, 0, 9);
        assert_eq!(update.score, 54);
        assert_eq!(update.active_leds, 1);
        assert_eq!(update.newly_lit().collect::<Vec<_>>(), vec![1]);
    }

    #[test]
    fn test_below_threshold_lights_nothing() {
        let ladder = ScoreLadder::default();
        let update = ladder.apply(0, 0, 49);
        assert_eq!(update.active_leds, 0);
        assert_eq!(update.newly_lit().count(), 0);
    }

    #[test]
    fn test_multi_threshold_jump_single_step() {
        // From below 150 to above 500 in one award: still only one more LED.
        let ladder = ScoreLadder::default();
        let update = ladder.apply(100, 1, 420);
        assert_eq!(update.score, 520);
        assert_eq!(update.active_leds, 2);

        // The lagging count catches up one step per later award.
        let next = ladder.apply(update.score, update.active_leds, 1);
        assert_eq!(next.active_leds, 3);
    }

    #[test]
    fn test_multi_threshold_jump_all_crossed() {
        let ladder = ScoreLadder::new(*ScoreLadder::default().thresholds(), ThresholdPolicy::AllCrossed);
        let update = ladder.apply(100, 1, 420);
        assert_eq!(update.active_leds, 4);
        assert_eq!(update.newly_lit().collect::<Vec<_>>(), vec![2, 3, 4]);
        assert_eq!(ladder.leds_for(update.score), update.active_leds);
    }

    #[test]
    fn test_cap_lights_everything() {
        let ladder = ScoreLadder::default();
        let update = ladder.apply(1900, 6, 64);
        assert_eq!(update.score, 1950);
        assert_eq!(update.active_leds, 8);
        assert!(update.is_maxed());
        assert_eq!(update.newly_lit().collect::<Vec<_>>(), vec![7, 8]);
    }

    #[test]
    fn test_score_is_monotonic_and_capped() {
        let ladder = ScoreLadder::default();
        let mut score = 0;
        let mut leds = 0;
        for _ in 0..300 {
            let update = ladder.apply(score, leds, 9);
            assert!(update.score >= score);
            assert!(update.score <= ladder.cap());
            assert!(update.active_leds >= leds);
            score = update.score;
            leds = update.active_leds;
        }
        assert_eq!(score, 1950);
        assert_eq!(leds, 8);
    }
}
