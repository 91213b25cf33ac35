//! Dice kinds, roll resolution and the bounded bag of reserved dice.
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::constants::{D20_FACES, DEFAULT_DIE_VALUE, DICE_BAG_CAPACITY, NORMAL_DIE_FACES};

const fn default_die_value() -> u8 {
    DEFAULT_DIE_VALUE
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Die {
    /// Implicit default die: uniform 1..=6.
    #[default]
    Normal,
    Fixed {
        #[serde(default = "default_die_value")]
        value: u8,
    },
    D20,
    ReverseFixed {
        #[serde(default = "default_die_value")]
        value: u8,
    },
    ReverseRandom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DieKind {
    Normal,
    Fixed,
    D20,
    ReverseFixed,
    ReverseRandom,
}

impl DieKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Fixed => "fixed",
            Self::D20 => "d20",
            Self::ReverseFixed => "reverse_fixed",
            Self::ReverseRandom => "reverse_random",
        }
    }
}

impl fmt::Display for DieKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Die {
    #[must_use]
    pub const fn kind(self) -> DieKind {
        match self {
            Self::Normal => DieKind::Normal,
            Self::Fixed { .. } => DieKind::Fixed,
            Self::D20 => DieKind::D20,
            Self::ReverseFixed { .. } => DieKind::ReverseFixed,
            Self::ReverseRandom => DieKind::ReverseRandom,
        }
    }

    /// Identity used to de-duplicate offers: kind plus value where it matters.
    #[must_use]
    pub const fn signature(self) -> (DieKind, Option<u8>) {
        match self {
            Self::Fixed { value } | Self::ReverseFixed { value } => (self.kind(), Some(value)),
            _ => (self.kind(), None),
        }
    }

    /// Whether this die always moves the player backwards.
    #[must_use]
    pub const fn is_reverse(self) -> bool {
        matches!(self, Self::ReverseFixed { .. } | Self::ReverseRandom)
    }

    #[must_use]
    pub fn label(self) -> String {
        match self {
            Self::Normal => String::from("Normal die (1-6)"),
            Self::Fixed { value } => format!("Fixed die ({value})"),
            Self::D20 => String::from("D20 (1-20)"),
            Self::ReverseFixed { value } => format!("Reverse die (-{value})"),
            Self::ReverseRandom => String::from("Reverse die (-1 to -6)"),
        }
    }
}

impl fmt::Display for Die {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

/// Presentation-facing description of a roll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollDisplay {
    pub kind: DieKind,
    /// Unsigned face shown on the die.
    pub face: u32,
    /// Direction comes from the die kind, never from the numeric outcome.
    pub reverse: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollResult {
    pub die: Die,
    /// Signed step count; negative means backwards.
    pub steps: i32,
    pub display: RollDisplay,
}

/// Resolve a die into a signed step count.
pub fn roll<R: Rng + ?Sized>(die: Die, rng: &mut R) -> RollResult {
    let face = match die {
        Die::Normal | Die::ReverseRandom => rng.gen_range(1..=NORMAL_DIE_FACES),
        Die::D20 => rng.gen_range(1..=D20_FACES),
        Die::Fixed { value } | Die::ReverseFixed { value } => u32::from(value),
    };
    let reverse = die.is_reverse();
    let magnitude = i32::try_from(face).unwrap_or(i32::MAX);
    RollResult {
        die,
        steps: if reverse { -magnitude } else { magnitude },
        display: RollDisplay {
            kind: die.kind(),
            face,
            reverse,
        },
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DiceBagError {
    #[error("dice bag is full ({capacity} dice)")]
    Full { capacity: usize },
}

/// Ordered, bounded collection of reserved dice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiceBag {
    capacity: usize,
    dice: Vec<Die>,
}

impl Default for DiceBag {
    fn default() -> Self {
        Self::with_capacity(DICE_BAG_CAPACITY)
    }
}

impl DiceBag {
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            dice: Vec::with_capacity(capacity),
        }
    }

    /// Append a die, leaving the bag untouched when it is already full.
    ///
    /// # Errors
    ///
    /// Returns [`DiceBagError::Full`] when the bag is at capacity.
    pub fn try_add(&mut self, die: Die) -> Result<(), DiceBagError> {
        if self.is_full() {
            return Err(DiceBagError::Full {
                capacity: self.capacity,
            });
        }
        self.dice.push(die);
        Ok(())
    }

    /// Remove and return the die at `index`, preserving the order of the rest.
    pub fn take(&mut self, index: usize) -> Option<Die> {
        (index < self.dice.len()).then(|| self.dice.remove(index))
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<Die> {
        self.dice.get(index).copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.dice.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.dice.is_empty()
    }

    #[must_use]
    pub fn is_full(&self) -> bool {
        self.dice.len() >= self.capacity
    }

    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn iter(&self) -> impl Iterator<Item = &Die> {
        self.dice.iter()
    }

    pub fn clear(&mut self) {
        self.dice.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    #[test]
    fn random_dice_stay_in_range() {
        let mut rng = ChaCha20Rng::seed_from_u64(9);
        for _ in 0..500 {
            let normal = roll(Die::Normal, &mut rng);
            assert!((1..=6).contains(&normal.steps));
            let d20 = roll(Die::D20, &mut rng);
            assert!((1..=20).contains(&d20.steps));
            let reverse = roll(Die::ReverseRandom, &mut rng);
            assert!((-6..=-1).contains(&reverse.steps));
            assert!(reverse.display.reverse);
            assert_eq!(u32::try_from(-reverse.steps).unwrap(), reverse.display.face);
        }
    }

    #[test]
    fn fixed_dice_ignore_the_rng() {
        let mut rng = ChaCha20Rng::seed_from_u64(1);
        assert_eq!(roll(Die::Fixed { value: 3 }, &mut rng).steps, 3);
        let back = roll(Die::ReverseFixed { value: 4 }, &mut rng);
        assert_eq!(back.steps, -4);
        assert_eq!(back.display.face, 4);
        assert_eq!(back.display.kind, DieKind::ReverseFixed);
    }

    #[test]
    fn missing_fixed_value_defaults_to_one() {
        let die: Die = serde_json::from_str(r#"{ "kind": "fixed" }"#).unwrap();
        assert_eq!(die, Die::Fixed { value: 1 });
        let die: Die = serde_json::from_str(r#"{ "kind": "reverse_fixed" }"#).unwrap();
        assert_eq!(die, Die::ReverseFixed { value: 1 });
        let die: Die = serde_json::from_str(r#"{ "kind": "d20" }"#).unwrap();
        assert_eq!(die, Die::D20);
    }

    #[test]
    fn signatures_separate_values_only_where_meaningful() {
        assert_ne!(
            Die::Fixed { value: 2 }.signature(),
            Die::Fixed { value: 3 }.signature()
        );
        assert_eq!(Die::Normal.signature(), (DieKind::Normal, None));
        assert_ne!(
            Die::Fixed { value: 2 }.signature(),
            Die::ReverseFixed { value: 2 }.signature()
        );
    }

    #[test]
    fn full_bag_rejects_and_stays_unchanged() {
        let mut bag = DiceBag::default();
        for value in 0..10 {
            bag.try_add(Die::Fixed { value }).unwrap();
        }
        let before = bag.clone();
        assert_eq!(
            bag.try_add(Die::D20),
            Err(DiceBagError::Full { capacity: 10 })
        );
        assert_eq!(bag, before);
        assert_eq!(bag.len(), 10);
        assert!(bag.is_full());
    }

    #[test]
    fn take_removes_in_order() {
        let mut bag = DiceBag::with_capacity(3);
        bag.try_add(Die::D20).unwrap();
        bag.try_add(Die::Fixed { value: 5 }).unwrap();
        bag.try_add(Die::ReverseRandom).unwrap();
        assert_eq!(bag.take(1), Some(Die::Fixed { value: 5 }));
        assert_eq!(bag.take(5), None);
        assert_eq!(
            bag.iter().copied().collect::<Vec<_>>(),
            vec![Die::D20, Die::ReverseRandom]
        );
    }
}
