use serde::{Deserialize, Serialize};
use std::fmt;

use crate::boss::BossState;
use crate::choice::PendingChoice;
use crate::dice::RollResult;

/// Turn engine phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum GamePhase {
    #[default]
    Rolling,
    DiceAnimation,
    Moving,
    AwaitingChoice,
    BossEncounter,
    GameWon,
    GameOver,
}

impl GamePhase {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Rolling => "rolling",
            Self::DiceAnimation => "dice_animation",
            Self::Moving => "moving",
            Self::AwaitingChoice => "awaiting_choice",
            Self::BossEncounter => "boss_encounter",
            Self::GameWon => "game_won",
            Self::GameOver => "game_over",
        }
    }

    #[must_use]
    pub const fn accepts_roll(self) -> bool {
        matches!(self, Self::Rolling)
    }

    #[must_use]
    pub const fn accepts_choice(self) -> bool {
        matches!(self, Self::AwaitingChoice)
    }

    #[must_use]
    pub const fn accepts_boss_roll(self) -> bool {
        matches!(self, Self::BossEncounter)
    }

    /// Absorbing states; only a new game leaves them.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::GameWon | Self::GameOver)
    }
}

impl fmt::Display for GamePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Direction of travel for a movement sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Forward,
    Backward,
}

/// Work still owed by the in-flight sequence while `busy` is set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "sequence", rename_all = "snake_case")]
pub enum InFlight {
    /// Dice are on screen; movement starts on the next tick.
    RevealMove { steps: i32 },
    /// Boss die is on screen; the roll is scored on the next tick.
    RevealBossRoll { value: i64 },
    Moving { remaining: u32, direction: Direction },
}

/// Player-facing state of a single game session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnState {
    pub position: usize,
    pub money: i64,
    /// 1-based, resets each stage.
    pub lap: u32,
    /// 1-based, only ever increases.
    pub stage: u32,
    pub phase: GamePhase,
    /// Single-flight lock held while a sequence is animating.
    pub busy: bool,
    /// Count of accepted roll requests, used to key events.
    pub turn: u32,
    /// Next event sequence number within `turn`.
    #[serde(default)]
    pub event_seq: u16,
    #[serde(default)]
    pub pending_choice: Option<PendingChoice>,
    #[serde(default)]
    pub boss: Option<BossState>,
    #[serde(default)]
    pub last_roll: Option<RollResult>,
    #[serde(default)]
    pub in_flight: Option<InFlight>,
}

impl Default for TurnState {
    fn default() -> Self {
        Self {
            position: 0,
            money: 0,
            lap: 1,
            stage: 1,
            phase: GamePhase::Rolling,
            busy: false,
            turn: 0,
            event_seq: 0,
            pending_choice: None,
            boss: None,
            last_roll: None,
            in_flight: None,
        }
    }
}
