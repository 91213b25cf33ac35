//! Centralized balance and tuning constants for Lapboard game logic.
//!
//! Stage tables are data (see [`crate::stage`]); the values here are fixed
//! policy that every stage shares.

// Logging keys -------------------------------------------------------------
pub(crate) const LOG_PHASE_CHANGED: &str = "log.phase.changed";
pub(crate) const LOG_DICE_ROLLED: &str = "log.dice.rolled";
pub(crate) const LOG_DIE_CONSUMED: &str = "log.dice.consumed";
pub(crate) const LOG_STEPPED: &str = "log.move.step";
pub(crate) const LOG_MONEY_CREDITED: &str = "log.money.credited";
pub(crate) const LOG_MONEY_DEBITED: &str = "log.money.debited";
pub(crate) const LOG_LAP_COMPLETED: &str = "log.lap.completed";
pub(crate) const LOG_LAP_REFRESHED: &str = "log.lap.refreshed";
pub(crate) const LOG_CHOICE_OFFERED: &str = "log.choice.offered";
pub(crate) const LOG_CHOICE_RESOLVED: &str = "log.choice.resolved";
pub(crate) const LOG_DICE_BAG_FULL: &str = "log.dice.bag-full";
pub(crate) const LOG_BOSS_ENCOUNTERED: &str = "log.boss.encountered";
pub(crate) const LOG_BOSS_ROLL: &str = "log.boss.roll";
pub(crate) const LOG_BOSS_DEFEATED: &str = "log.boss.defeated";
pub(crate) const LOG_STAGE_ADVANCED: &str = "log.stage.advanced";
pub(crate) const LOG_GAME_WON: &str = "log.game.won";
pub(crate) const LOG_GAME_OVER: &str = "log.game.over";

// Dice ---------------------------------------------------------------------
pub const DICE_BAG_CAPACITY: usize = 10;
pub(crate) const NORMAL_DIE_FACES: u32 = 6;
pub(crate) const D20_FACES: u32 = 20;
pub(crate) const DEFAULT_DIE_VALUE: u8 = 1;

// Board effects ------------------------------------------------------------
pub(crate) const PENALTY_MIN: i64 = 5;
pub(crate) const PENALTY_MAX: i64 = 15;
pub(crate) const HUGE_MONEY_CHANCE: f64 = 0.15;
pub(crate) const HUGE_MONEY_PER_STAGE: i64 = 10;
pub(crate) const NORMAL_MONEY_MIN: u32 = 1;
pub(crate) const NORMAL_MONEY_MAX: u32 = 3;

// Landing ------------------------------------------------------------------
pub(crate) const CORNER_TAX: i64 = 10;

// Choice squares -----------------------------------------------------------
pub(crate) const CHOICE_MONEY_PER_STAGE: i64 = 10;
pub(crate) const OFFER_FIXED_WEIGHT: u32 = 60;
pub(crate) const OFFER_REVERSE_RANDOM_WEIGHT: u32 = 25;
pub(crate) const OFFER_D20_WEIGHT: u32 = 15;
pub(crate) const OFFER_FIXED_MIN: u8 = 2;
pub(crate) const OFFER_FIXED_MAX: u8 = 6;
pub(crate) const PICK_DIE_MIN_OPTIONS: usize = 3;
pub(crate) const PICK_DIE_MAX_OPTIONS: usize = 4;
pub(crate) const PICK_DIE_REVERSE_MAX: u8 = 6;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offer_weights_cover_whole_percent_range() {
        assert_eq!(
            OFFER_FIXED_WEIGHT + OFFER_REVERSE_RANDOM_WEIGHT + OFFER_D20_WEIGHT,
            100
        );
        assert!(PICK_DIE_MIN_OPTIONS <= PICK_DIE_MAX_OPTIONS);
        assert!(PENALTY_MIN <= PENALTY_MAX);
        assert!(NORMAL_MONEY_MIN <= NORMAL_MONEY_MAX);
    }
}
