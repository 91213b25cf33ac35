//! Choice squares: building offers and applying the player's pick.
use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::constants::{
    CHOICE_MONEY_PER_STAGE, OFFER_D20_WEIGHT, OFFER_FIXED_MAX, OFFER_FIXED_MIN,
    OFFER_FIXED_WEIGHT, OFFER_REVERSE_RANDOM_WEIGHT, PICK_DIE_MAX_OPTIONS, PICK_DIE_MIN_OPTIONS,
    PICK_DIE_REVERSE_MAX,
};
use crate::dice::{DiceBag, DiceBagError, Die};
use crate::numbers::stage_scale;

/// Offers never exceed the pick-die maximum, so they stay inline.
pub type ChoiceOptions = SmallVec<[ChoiceOption; 4]>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChoiceKind {
    /// Money bonus versus one pre-selected die.
    DiceOrMoney,
    /// Pick one of several distinct dice.
    PickDie,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChoiceReward {
    Money { amount: i64 },
    Die { die: Die },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceOption {
    pub id: usize,
    pub reward: ChoiceReward,
    pub label: String,
}

impl ChoiceOption {
    fn new(id: usize, reward: ChoiceReward) -> Self {
        let label = match reward {
            ChoiceReward::Money { amount } => format!("Take {amount} coins"),
            ChoiceReward::Die { die } => format!("Take a {}", die.label()),
        };
        Self { id, reward, label }
    }
}

/// Decision the engine is waiting on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingChoice {
    pub square_id: usize,
    pub kind: ChoiceKind,
    pub options: ChoiceOptions,
}

impl PendingChoice {
    #[must_use]
    pub fn option(&self, id: usize) -> Option<&ChoiceOption> {
        self.options.iter().find(|option| option.id == id)
    }
}

/// What happened when a choice was applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChoiceApplied {
    MoneyCredited(i64),
    DieAdded(Die),
    /// The bag was full; the die is gone.
    DieDiscarded { die: Die, capacity: usize },
}

/// Draw the single die offered against the money bonus.
pub fn draw_offer_die<R: Rng + ?Sized>(rng: &mut R) -> Die {
    let total = OFFER_FIXED_WEIGHT + OFFER_REVERSE_RANDOM_WEIGHT + OFFER_D20_WEIGHT;
    let pick = rng.gen_range(0..total);
    if pick < OFFER_FIXED_WEIGHT {
        Die::Fixed {
            value: rng.gen_range(OFFER_FIXED_MIN..=OFFER_FIXED_MAX),
        }
    } else if pick < OFFER_FIXED_WEIGHT + OFFER_REVERSE_RANDOM_WEIGHT {
        Die::ReverseRandom
    } else {
        Die::D20
    }
}

/// Money bonus (scaled by stage) versus one randomly chosen die.
pub fn offer_dice_or_money<R: Rng + ?Sized>(
    square_id: usize,
    stage: u32,
    rng: &mut R,
) -> PendingChoice {
    let mut options = ChoiceOptions::new();
    options.push(ChoiceOption::new(
        0,
        ChoiceReward::Money {
            amount: CHOICE_MONEY_PER_STAGE * stage_scale(stage),
        },
    ));
    options.push(ChoiceOption::new(
        1,
        ChoiceReward::Die {
            die: draw_offer_die(rng),
        },
    ));
    PendingChoice {
        square_id,
        kind: ChoiceKind::DiceOrMoney,
        options,
    }
}

fn pick_die_candidates<R: Rng + ?Sized>(rng: &mut R) -> Vec<Die> {
    let mut candidates: Vec<Die> = (1..=6).map(|value| Die::Fixed { value }).collect();
    candidates.extend([
        Die::D20,
        Die::ReverseRandom,
        Die::ReverseFixed {
            value: rng.gen_range(1..=PICK_DIE_REVERSE_MAX),
        },
        Die::Normal,
    ]);
    let mut seen = Vec::with_capacity(candidates.len());
    candidates.retain(|die| {
        let signature = die.signature();
        if seen.contains(&signature) {
            false
        } else {
            seen.push(signature);
            true
        }
    });
    candidates
}

/// Three or four distinct dice drawn from the shuffled candidate pool.
pub fn offer_pick_die<R: Rng + ?Sized>(square_id: usize, rng: &mut R) -> PendingChoice {
    let mut candidates = pick_die_candidates(rng);
    candidates.shuffle(rng);
    let count = rng
        .gen_range(PICK_DIE_MIN_OPTIONS..=PICK_DIE_MAX_OPTIONS)
        .min(candidates.len());
    let options = candidates
        .into_iter()
        .take(count)
        .enumerate()
        .map(|(id, die)| ChoiceOption::new(id, ChoiceReward::Die { die }))
        .collect();
    PendingChoice {
        square_id,
        kind: ChoiceKind::PickDie,
        options,
    }
}

/// Credit money or stash the die. A full bag discards the die.
pub fn apply_choice(option: &ChoiceOption, money: &mut i64, bag: &mut DiceBag) -> ChoiceApplied {
    match option.reward {
        ChoiceReward::Money { amount } => {
            *money = money.saturating_add(amount);
            ChoiceApplied::MoneyCredited(amount)
        }
        ChoiceReward::Die { die } => match bag.try_add(die) {
            Ok(()) => ChoiceApplied::DieAdded(die),
            Err(DiceBagError::Full { capacity }) => ChoiceApplied::DieDiscarded { die, capacity },
        },
    }
}
