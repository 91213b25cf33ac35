//! Boss checkpoint: reach a target sum within a fixed number of rolls.
use serde::{Deserialize, Serialize};

use crate::numbers::count_to_usize;
use crate::stage::BossDescriptor;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BossState {
    pub rolls_remaining: u32,
    pub rolls_so_far: Vec<i64>,
    pub target_sum: i64,
}

/// Result of recording a single boss roll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BossProgress {
    /// Cumulative sum met the target; remaining rolls are forfeited.
    Defeated,
    Continue,
    /// Rolls ran out below the target.
    Failed,
}

impl BossState {
    #[must_use]
    pub fn from_descriptor(descriptor: &BossDescriptor) -> Self {
        Self {
            rolls_remaining: descriptor.required_roll_count,
            rolls_so_far: Vec::with_capacity(count_to_usize(descriptor.required_roll_count)),
            target_sum: descriptor.target_sum,
        }
    }

    #[must_use]
    pub fn sum(&self) -> i64 {
        self.rolls_so_far.iter().sum()
    }

    /// Remaining distance to the target, never negative.
    #[must_use]
    pub fn shortfall(&self) -> i64 {
        (self.target_sum - self.sum()).max(0)
    }

    /// Append a signed roll outcome and evaluate the checkpoint.
    pub fn record_roll(&mut self, value: i64) -> BossProgress {
        self.rolls_so_far.push(value);
        self.rolls_remaining = self.rolls_remaining.saturating_sub(1);
        if self.sum() >= self.target_sum {
            BossProgress::Defeated
        } else if self.rolls_remaining == 0 {
            BossProgress::Failed
        } else {
            BossProgress::Continue
        }
    }
}
