//! Structured events emitted by the turn engine.
//!
//! Every engine operation returns the events it produced, in order. The
//! presentation layer decides how long to show each one; game logic never
//! waits on them.

use serde::{Deserialize, Serialize};

use crate::board::{EffectType, LapRefresh};
use crate::choice::{ChoiceKind, ChoiceReward};
use crate::constants::{
    LOG_BOSS_DEFEATED, LOG_BOSS_ENCOUNTERED, LOG_BOSS_ROLL, LOG_CHOICE_OFFERED,
    LOG_CHOICE_RESOLVED, LOG_DICE_BAG_FULL, LOG_DICE_ROLLED, LOG_DIE_CONSUMED, LOG_GAME_OVER,
    LOG_GAME_WON, LOG_LAP_COMPLETED, LOG_LAP_REFRESHED, LOG_MONEY_CREDITED, LOG_MONEY_DEBITED,
    LOG_PHASE_CHANGED, LOG_STAGE_ADVANCED, LOG_STEPPED,
};
use crate::dice::{Die, RollResult};
use crate::state::GamePhase;

/// Stable, deterministic identifier for a single event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventId {
    /// Turn counter when the event occurred.
    pub turn: u32,
    /// Per-turn sequence number (0-based).
    pub seq: u16,
}

impl EventId {
    #[must_use]
    pub const fn new(turn: u32, seq: u16) -> Self {
        Self { turn, seq }
    }
}

/// Why money moved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoneyCause {
    PassThrough,
    HugeMoney,
    LapPenalty,
    CornerTax,
    ChoiceBonus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EventKind {
    PhaseChanged {
        from: GamePhase,
        to: GamePhase,
    },
    DieConsumed {
        die: Die,
        bag_index: usize,
    },
    DiceRolled {
        roll: RollResult,
    },
    Stepped {
        from: usize,
        to: usize,
        remaining: u32,
    },
    MoneyCredited {
        amount: i64,
        square: usize,
        cause: MoneyCause,
    },
    MoneyDebited {
        amount: i64,
        square: usize,
        cause: MoneyCause,
    },
    LapCompleted {
        lap: u32,
    },
    LapEffectsRefreshed {
        stage: u32,
        lap: u32,
        placed: LapRefresh,
    },
    ChoiceOffered {
        square: usize,
        choice: ChoiceKind,
        options: usize,
    },
    ChoiceResolved {
        square: usize,
        reward: ChoiceReward,
    },
    DiceBagFull {
        discarded: Die,
        capacity: usize,
    },
    Landed {
        square: usize,
        effect: EffectType,
    },
    BossEncountered {
        stage: u32,
        target_sum: i64,
        rolls: u32,
    },
    BossRollRecorded {
        value: i64,
        sum: i64,
        rolls_remaining: u32,
    },
    BossDefeated {
        stage: u32,
    },
    StageAdvanced {
        stage: u32,
    },
    GameWon {
        money: i64,
    },
    GameOver {
        stage: u32,
        money: i64,
        shortfall: i64,
    },
}

impl EventKind {
    #[must_use]
    pub const fn ui_key(&self) -> &'static str {
        match self {
            Self::PhaseChanged { .. } => LOG_PHASE_CHANGED,
            Self::DieConsumed { .. } => LOG_DIE_CONSUMED,
            Self::DiceRolled { .. } => LOG_DICE_ROLLED,
            Self::Stepped { .. } | Self::Landed { .. } => LOG_STEPPED,
            Self::MoneyCredited { .. } => LOG_MONEY_CREDITED,
            Self::MoneyDebited { .. } => LOG_MONEY_DEBITED,
            Self::LapCompleted { .. } => LOG_LAP_COMPLETED,
            Self::LapEffectsRefreshed { .. } => LOG_LAP_REFRESHED,
            Self::ChoiceOffered { .. } => LOG_CHOICE_OFFERED,
            Self::ChoiceResolved { .. } => LOG_CHOICE_RESOLVED,
            Self::DiceBagFull { .. } => LOG_DICE_BAG_FULL,
            Self::BossEncountered { .. } => LOG_BOSS_ENCOUNTERED,
            Self::BossRollRecorded { .. } => LOG_BOSS_ROLL,
            Self::BossDefeated { .. } => LOG_BOSS_DEFEATED,
            Self::StageAdvanced { .. } => LOG_STAGE_ADVANCED,
            Self::GameWon { .. } => LOG_GAME_WON,
            Self::GameOver { .. } => LOG_GAME_OVER,
        }
    }

    const fn severity(&self) -> EventSeverity {
        match self {
            Self::DiceBagFull { .. } | Self::MoneyDebited { .. } => EventSeverity::Warning,
            Self::GameOver { .. } => EventSeverity::Critical,
            _ => EventSeverity::Info,
        }
    }

    const fn surface(&self) -> Option<UiSurfaceHint> {
        match self {
            Self::DiceBagFull { .. } => Some(UiSurfaceHint::Toast),
            Self::ChoiceOffered { .. }
            | Self::BossEncountered { .. }
            | Self::GameWon { .. }
            | Self::GameOver { .. } => Some(UiSurfaceHint::Modal),
            Self::Stepped { .. } | Self::PhaseChanged { .. } => None,
            _ => Some(UiSurfaceHint::Log),
        }
    }
}

/// Severity tier for a turn event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventSeverity {
    Info,
    Warning,
    Critical,
}

/// Hint for how the UI should surface an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UiSurfaceHint {
    Log,
    Toast,
    Modal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnEvent {
    pub id: EventId,
    #[serde(flatten)]
    pub kind: EventKind,
    pub severity: EventSeverity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ui_surface_hint: Option<UiSurfaceHint>,
    pub ui_key: String,
}

impl TurnEvent {
    #[must_use]
    pub fn new(id: EventId, kind: EventKind) -> Self {
        Self {
            id,
            severity: kind.severity(),
            ui_surface_hint: kind.surface(),
            ui_key: kind.ui_key().to_string(),
            kind,
        }
    }
}

/// Ordered event sink for a single engine operation.
#[derive(Debug, Default)]
pub(crate) struct EventLog {
    turn: u32,
    first_seq: u16,
    events: Vec<TurnEvent>,
}

impl EventLog {
    #[cfg(test)]
    pub(crate) const fn new(turn: u32) -> Self {
        Self::resume(turn, 0)
    }

    /// Continue numbering a turn whose earlier ticks already emitted events.
    pub(crate) const fn resume(turn: u32, first_seq: u16) -> Self {
        Self {
            turn,
            first_seq,
            events: Vec::new(),
        }
    }

    pub(crate) fn push(&mut self, kind: EventKind) {
        let seq = self.next_seq();
        self.events.push(TurnEvent::new(EventId::new(self.turn, seq), kind));
    }

    /// Sequence number the next pushed event will carry.
    pub(crate) fn next_seq(&self) -> u16 {
        let offset = u16::try_from(self.events.len()).unwrap_or(u16::MAX);
        self.first_seq.saturating_add(offset)
    }

    pub(crate) fn into_events(self) -> Vec<TurnEvent> {
        self.events
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bag_full_event_is_a_warning_toast() {
        let event = TurnEvent::new(
            EventId::new(4, 0),
            EventKind::DiceBagFull {
                discarded: Die::D20,
                capacity: 10,
            },
        );
        assert_eq!(event.severity, EventSeverity::Warning);
        assert_eq!(event.ui_surface_hint, Some(UiSurfaceHint::Toast));
        assert_eq!(event.ui_key, "log.dice.bag-full");
    }

    #[test]
    fn event_log_sequences_within_a_turn() {
        let mut log = EventLog::new(2);
        log.push(EventKind::LapCompleted { lap: 2 });
        log.push(EventKind::StageAdvanced { stage: 2 });
        let events = log.into_events();
        assert_eq!(events[0].id, EventId::new(2, 0));
        assert_eq!(events[1].id, EventId::new(2, 1));

        let mut resumed = EventLog::resume(2, 2);
        resumed.push(EventKind::GameWon { money: 5 });
        assert_eq!(resumed.next_seq(), 3);
        assert_eq!(resumed.into_events()[0].id, EventId::new(2, 2));
    }

    #[test]
    fn events_roundtrip_through_json() {
        let event = TurnEvent::new(
            EventId::new(7, 3),
            EventKind::MoneyCredited {
                amount: 4,
                square: 9,
                cause: MoneyCause::PassThrough,
            },
        );
        let json = serde_json::to_string(&event).expect("serialize");
        assert!(json.contains("\"kind\":\"money_credited\""));
        let restored: TurnEvent = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(restored, event);
    }
}
