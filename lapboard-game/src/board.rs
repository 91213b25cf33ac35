//! Perimeter board geometry and per-lap effect placement.
use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::constants::{
    HUGE_MONEY_CHANCE, HUGE_MONEY_PER_STAGE, NORMAL_MONEY_MAX, NORMAL_MONEY_MIN, PENALTY_MAX,
    PENALTY_MIN,
};
use crate::numbers::{count_to_usize, floor_f64_to_i64, stage_scale};
use crate::stage::{CountRange, StageConfig};

/// Fixed role of a square, assigned once per stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BaseType {
    Start,
    CornerBl,
    CornerBr,
    CornerTr,
    Normal,
}

impl BaseType {
    #[must_use]
    pub const fn is_corner(self) -> bool {
        !matches!(self, Self::Normal)
    }
}

/// Effect category carried by a square for the current lap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectType {
    None,
    NormalMoney,
    HugeMoney,
    TempBadLap,
    ChoiceDiceMoney,
    ChoicePickDie,
}

impl EffectType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::NormalMoney => "normal_money",
            Self::HugeMoney => "huge_money",
            Self::TempBadLap => "temp_bad_lap",
            Self::ChoiceDiceMoney => "choice_dice_money",
            Self::ChoicePickDie => "choice_pick_die",
        }
    }
}

impl fmt::Display for EffectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Effect plus its payload; the payload shape follows the effect type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SquareEffect {
    #[default]
    None,
    NormalMoney {
        amount: i64,
    },
    HugeMoney {
        amount: i64,
    },
    TempBadLap {
        penalty: i64,
    },
    ChoiceDiceMoney,
    ChoicePickDie,
}

impl SquareEffect {
    #[must_use]
    pub const fn kind(self) -> EffectType {
        match self {
            Self::None => EffectType::None,
            Self::NormalMoney { .. } => EffectType::NormalMoney,
            Self::HugeMoney { .. } => EffectType::HugeMoney,
            Self::TempBadLap { .. } => EffectType::TempBadLap,
            Self::ChoiceDiceMoney => EffectType::ChoiceDiceMoney,
            Self::ChoicePickDie => EffectType::ChoicePickDie,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardSquare {
    pub id: usize,
    pub base_type: BaseType,
    pub effect: SquareEffect,
}

impl BoardSquare {
    #[must_use]
    pub const fn effect_type(&self) -> EffectType {
        self.effect.kind()
    }
}

/// Per-category counts placed by one lap refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LapRefresh {
    pub bad: usize,
    pub choice_dice_money: usize,
    pub choice_pick_die: usize,
    pub huge_money: usize,
    pub normal_money: usize,
}

/// Number of squares on the perimeter of a `rows x cols` grid.
///
/// Falls back to `rows * cols` for single-row or single-column boards.
#[must_use]
pub fn perimeter_len(rows: u32, cols: u32) -> usize {
    let (rows, cols) = (count_to_usize(rows), count_to_usize(cols));
    let total = if rows <= 1 || cols <= 1 {
        rows * cols
    } else {
        2 * rows + 2 * cols - 4
    };
    total.max(1)
}

/// Corner ids in walk order: start, bottom-left, bottom-right, top-right.
#[must_use]
pub fn corner_ids(rows: u32, cols: u32) -> [usize; 4] {
    let down = count_to_usize(rows).saturating_sub(1);
    let across = count_to_usize(cols).saturating_sub(1);
    [0, down, down + across, down + across + down]
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    squares: Vec<BoardSquare>,
    corners: [usize; 4],
}

impl Board {
    /// Build the stage layout with base types assigned and no lap effects.
    #[must_use]
    pub fn layout_for(config: &StageConfig) -> Self {
        let total = perimeter_len(config.rows, config.cols);
        let corners = corner_ids(config.rows, config.cols);
        let mut squares: Vec<BoardSquare> = (0..total)
            .map(|id| BoardSquare {
                id,
                base_type: BaseType::Normal,
                effect: SquareEffect::None,
            })
            .collect();
        // Reverse order so that start wins any collision on degenerate boards.
        let roles = [
            BaseType::Start,
            BaseType::CornerBl,
            BaseType::CornerBr,
            BaseType::CornerTr,
        ];
        for (&id, &role) in corners.iter().zip(roles.iter()).rev() {
            if let Some(square) = squares.get_mut(id) {
                square.base_type = role;
            }
        }
        Self { squares, corners }
    }

    /// Re-roll lap effects on every normal square.
    ///
    /// Candidates are shuffled once and consumed in priority order (bad,
    /// dice-or-money choice, pick-die choice); whatever is left becomes money.
    /// A category that finds the pool exhausted silently gets fewer squares.
    /// An inverted count range places its maximum.
    #[must_use]
    pub fn refresh_lap_effects<R: Rng + ?Sized>(
        &mut self,
        config: &StageConfig,
        stage: u32,
        rng: &mut R,
    ) -> LapRefresh {
        for square in &mut self.squares {
            if square.base_type == BaseType::Normal {
                square.effect = SquareEffect::None;
            }
        }

        let mut pool: Vec<usize> = self
            .squares
            .iter()
            .filter(|square| square.base_type == BaseType::Normal)
            .map(|square| square.id)
            .collect();
        pool.shuffle(rng);

        let scale = stage_scale(stage);
        let mut summary = LapRefresh::default();

        summary.bad = self.place(&mut pool, config.bad_squares, rng, |rng| {
            SquareEffect::TempBadLap {
                penalty: rng.gen_range(PENALTY_MIN..=PENALTY_MAX) * scale,
            }
        });
        summary.choice_dice_money = self.place(&mut pool, config.choice_dice_money, rng, |_| {
            SquareEffect::ChoiceDiceMoney
        });
        summary.choice_pick_die = self.place(&mut pool, config.choice_pick_die, rng, |_| {
            SquareEffect::ChoicePickDie
        });

        for id in pool {
            let effect = if rng.gen_bool(HUGE_MONEY_CHANCE) {
                summary.huge_money += 1;
                SquareEffect::HugeMoney {
                    amount: HUGE_MONEY_PER_STAGE * scale,
                }
            } else {
                summary.normal_money += 1;
                let face = rng.gen_range(NORMAL_MONEY_MIN..=NORMAL_MONEY_MAX);
                SquareEffect::NormalMoney {
                    amount: floor_f64_to_i64(f64::from(face) * config.money_multiplier),
                }
            };
            self.squares[id].effect = effect;
        }

        log::debug!(
            "lap effects refreshed for stage {stage}: {} bad, {} dice/money, {} pick-die, {} huge, {} normal",
            summary.bad,
            summary.choice_dice_money,
            summary.choice_pick_die,
            summary.huge_money,
            summary.normal_money
        );
        summary
    }

    fn place<R: Rng + ?Sized>(
        &mut self,
        pool: &mut Vec<usize>,
        range: CountRange,
        rng: &mut R,
        mut effect: impl FnMut(&mut R) -> SquareEffect,
    ) -> usize {
        let wanted = count_to_usize(rng.gen_range(range.min.min(range.max)..=range.max));
        let mut placed = 0;
        while placed < wanted {
            let Some(id) = pool.pop() else {
                break;
            };
            self.squares[id].effect = effect(rng);
            placed += 1;
        }
        placed
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.squares.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.squares.is_empty()
    }

    #[must_use]
    pub fn squares(&self) -> &[BoardSquare] {
        &self.squares
    }

    #[must_use]
    pub fn square(&self, id: usize) -> Option<&BoardSquare> {
        self.squares.get(id)
    }

    #[must_use]
    pub const fn corners(&self) -> [usize; 4] {
        self.corners
    }

    /// Overwrite a normal square's effect. Corner squares are left untouched.
    pub fn set_effect(&mut self, id: usize, effect: SquareEffect) -> bool {
        match self.squares.get_mut(id) {
            Some(square) if square.base_type == BaseType::Normal => {
                square.effect = effect;
                true
            }
            _ => false,
        }
    }

    /// Consume a single-use effect.
    pub fn clear_effect(&mut self, id: usize) {
        if let Some(square) = self.squares.get_mut(id) {
            square.effect = SquareEffect::None;
        }
    }

    #[must_use]
    pub fn count_effect(&self, kind: EffectType) -> usize {
        self.squares
            .iter()
            .filter(|square| square.effect_type() == kind)
            .count()
    }
}
