//! Stage catalog: immutable per-stage board and boss configuration.
use serde::{Deserialize, Serialize};
use thiserror::Error;

const DEFAULT_STAGE_DATA: &str = include_str!("../data/stages.json");

/// Inclusive bounds on how many squares receive a lap effect category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct CountRange {
    pub min: u32,
    pub max: u32,
}

impl CountRange {
    #[must_use]
    pub const fn new(min: u32, max: u32) -> Self {
        Self { min, max }
    }

    #[must_use]
    pub const fn contains(self, value: u32) -> bool {
        value >= self.min && value <= self.max
    }
}

/// Boss checkpoint parameters for a stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BossDescriptor {
    pub required_roll_count: u32,
    pub target_sum: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageConfig {
    pub rows: u32,
    pub cols: u32,
    pub laps_to_complete: u32,
    pub money_multiplier: f64,
    #[serde(default)]
    pub bad_squares: CountRange,
    #[serde(default)]
    pub choice_dice_money: CountRange,
    #[serde(default)]
    pub choice_pick_die: CountRange,
    pub boss: BossDescriptor,
}

/// Errors raised when a stage configuration violates its invariants.
#[derive(Debug, Error, PartialEq)]
pub enum StageConfigError {
    #[error("stage {stage}: board needs at least 2 rows and 2 cols (got {rows}x{cols})")]
    BoardTooSmall { stage: u32, rows: u32, cols: u32 },
    #[error("stage {stage}: laps_to_complete must be at least 1")]
    NoLaps { stage: u32 },
    #[error("stage {stage}: {field} minimum {min} exceeds maximum {max}")]
    InvertedRange {
        stage: u32,
        field: &'static str,
        min: u32,
        max: u32,
    },
    #[error("stage {stage}: money_multiplier must be finite and non-negative (got {value})")]
    BadMultiplier { stage: u32, value: f64 },
    #[error("stage {stage}: boss needs at least one roll")]
    BossWithoutRolls { stage: u32 },
}

/// Errors raised while loading a stage catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("stage catalog is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error(transparent)]
    Invalid(#[from] StageConfigError),
    #[error("stage catalog defines no stages")]
    Empty,
}

impl StageConfig {
    /// Check the invariants the board generator and turn engine rely on.
    ///
    /// # Errors
    ///
    /// Returns the first violated invariant, tagged with `stage`.
    pub fn validate(&self, stage: u32) -> Result<(), StageConfigError> {
        if self.rows < 2 || self.cols < 2 {
            return Err(StageConfigError::BoardTooSmall {
                stage,
                rows: self.rows,
                cols: self.cols,
            });
        }
        if self.laps_to_complete == 0 {
            return Err(StageConfigError::NoLaps { stage });
        }
        for (field, range) in [
            ("bad_squares", self.bad_squares),
            ("choice_dice_money", self.choice_dice_money),
            ("choice_pick_die", self.choice_pick_die),
        ] {
            if range.min > range.max {
                return Err(StageConfigError::InvertedRange {
                    stage,
                    field,
                    min: range.min,
                    max: range.max,
                });
            }
        }
        if !self.money_multiplier.is_finite() || self.money_multiplier < 0.0 {
            return Err(StageConfigError::BadMultiplier {
                stage,
                value: self.money_multiplier,
            });
        }
        if self.boss.required_roll_count == 0 {
            return Err(StageConfigError::BossWithoutRolls { stage });
        }
        Ok(())
    }
}

/// Ordered lookup table from stage number (1-based) to configuration.
///
/// Always holds at least one valid stage; deserialization goes through
/// [`StageCatalog::new`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawCatalog")]
pub struct StageCatalog {
    stages: Vec<StageConfig>,
}

/// Unvalidated `{ "stages": [...] }` document.
#[derive(Deserialize)]
struct RawCatalog {
    stages: Vec<StageConfig>,
}

impl TryFrom<RawCatalog> for StageCatalog {
    type Error = CatalogError;

    fn try_from(raw: RawCatalog) -> Result<Self, Self::Error> {
        Self::new(raw.stages)
    }
}

impl StageCatalog {
    /// Build a catalog from already-parsed stages.
    ///
    /// # Errors
    ///
    /// Returns an error when the list is empty or any stage is invalid.
    pub fn new(stages: Vec<StageConfig>) -> Result<Self, CatalogError> {
        if stages.is_empty() {
            return Err(CatalogError::Empty);
        }
        for (idx, stage) in stages.iter().enumerate() {
            stage.validate(u32::try_from(idx + 1).unwrap_or(u32::MAX))?;
        }
        Ok(Self { stages })
    }

    /// Load a catalog from JSON of the form `{ "stages": [...] }`.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON cannot be parsed or fails validation.
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let raw: RawCatalog = serde_json::from_str(json)?;
        Self::try_from(raw)
    }

    /// Configuration for `stage`, clamped to the last defined stage.
    #[must_use]
    pub fn config_for(&self, stage: u32) -> &StageConfig {
        let last = self.stages.len().saturating_sub(1);
        let idx = usize::try_from(stage.max(1) - 1).map_or(last, |idx| idx.min(last));
        &self.stages[idx]
    }

    #[must_use]
    pub fn stage_count(&self) -> u32 {
        u32::try_from(self.stages.len()).unwrap_or(u32::MAX)
    }

    #[must_use]
    pub fn is_final_stage(&self, stage: u32) -> bool {
        stage >= self.stage_count()
    }

    pub fn iter(&self) -> impl Iterator<Item = &StageConfig> {
        self.stages.iter()
    }

    fn builtin() -> Self {
        let stage = |(rows, cols): (u32, u32), laps, money_multiplier, ranges: [CountRange; 3], boss| {
            let [bad_squares, choice_dice_money, choice_pick_die] = ranges;
            StageConfig {
                rows,
                cols,
                laps_to_complete: laps,
                money_multiplier,
                bad_squares,
                choice_dice_money,
                choice_pick_die,
                boss,
            }
        };
        let boss = |required_roll_count, target_sum| BossDescriptor {
            required_roll_count,
            target_sum,
        };
        Self {
            stages: vec![
                stage(
                    (6, 6),
                    3,
                    1.0,
                    [CountRange::new(1, 2), CountRange::new(1, 2), CountRange::new(0, 1)],
                    boss(3, 12),
                ),
                stage(
                    (7, 7),
                    3,
                    1.5,
                    [CountRange::new(2, 3), CountRange::new(1, 2), CountRange::new(1, 1)],
                    boss(3, 14),
                ),
                stage(
                    (8, 8),
                    4,
                    2.0,
                    [CountRange::new(3, 5), CountRange::new(2, 3), CountRange::new(1, 2)],
                    boss(4, 22),
                ),
            ],
        }
    }
}

impl Default for StageCatalog {
    fn default() -> Self {
        Self::from_json(DEFAULT_STAGE_DATA).unwrap_or_else(|err| {
            log::warn!("bundled stage data rejected ({err}); using built-in stages");
            Self::builtin()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundled_catalog_parses_and_validates() {
        let catalog = StageCatalog::from_json(DEFAULT_STAGE_DATA).unwrap();
        assert_eq!(catalog.stage_count(), 5);
        let first = catalog.config_for(1);
        assert_eq!((first.rows, first.cols), (6, 6));
        assert_eq!(StageCatalog::default(), catalog);
    }

    #[test]
    fn lookups_clamp_to_defined_stages() {
        let catalog = StageCatalog::default();
        let last = catalog.config_for(catalog.stage_count()).clone();
        assert_eq!(catalog.config_for(99), &last);
        assert_eq!(catalog.config_for(0), catalog.config_for(1));
        assert!(catalog.is_final_stage(catalog.stage_count()));
        assert!(!catalog.is_final_stage(1));
    }

    #[test]
    fn builtin_table_is_valid() {
        let builtin = StageCatalog::builtin();
        let revalidated = StageCatalog::new(builtin.stages.clone()).unwrap();
        assert_eq!(revalidated.stage_count(), 3);
    }

    #[test]
    fn validation_rejects_broken_stages() {
        let mut cfg = StageCatalog::default().config_for(1).clone();
        cfg.rows = 1;
        assert_eq!(
            cfg.validate(2),
            Err(StageConfigError::BoardTooSmall {
                stage: 2,
                rows: 1,
                cols: 6
            })
        );

        let mut cfg = StageCatalog::default().config_for(1).clone();
        cfg.bad_squares = CountRange::new(4, 2);
        assert!(matches!(
            cfg.validate(1),
            Err(StageConfigError::InvertedRange {
                field: "bad_squares",
                ..
            })
        ));

        let mut cfg = StageCatalog::default().config_for(1).clone();
        cfg.money_multiplier = f64::NAN;
        assert!(matches!(
            cfg.validate(1),
            Err(StageConfigError::BadMultiplier { .. })
        ));

        let mut cfg = StageCatalog::default().config_for(1).clone();
        cfg.boss.required_roll_count = 0;
        assert_eq!(
            cfg.validate(1),
            Err(StageConfigError::BossWithoutRolls { stage: 1 })
        );
    }

    #[test]
    fn empty_or_malformed_catalogs_fail() {
        assert!(matches!(
            StageCatalog::from_json(r#"{ "stages": [] }"#),
            Err(CatalogError::Empty)
        ));
        assert!(matches!(
            StageCatalog::from_json("not json"),
            Err(CatalogError::Parse(_))
        ));
    }

    #[test]
    fn deserializing_validates_like_from_json() {
        let empty = serde_json::from_str::<StageCatalog>(r#"{ "stages": [] }"#).unwrap_err();
        assert!(empty.to_string().contains("no stages"), "{empty}");

        let mut stage = serde_json::to_value(StageCatalog::default().config_for(1)).unwrap();
        stage["bad_squares"] = serde_json::json!({ "min": 4, "max": 1 });
        let doc = serde_json::json!({ "stages": [stage] });
        let inverted = serde_json::from_value::<StageCatalog>(doc.clone()).unwrap_err();
        assert!(inverted.to_string().contains("bad_squares"), "{inverted}");
        assert!(matches!(
            StageCatalog::from_json(&doc.to_string()),
            Err(CatalogError::Invalid(StageConfigError::InvertedRange { .. }))
        ));

        let json = serde_json::to_string(&StageCatalog::default()).unwrap();
        let parsed: StageCatalog = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, StageCatalog::default());
    }

    #[test]
    fn count_range_contains_is_inclusive() {
        let range = CountRange::new(1, 3);
        assert!(range.contains(1));
        assert!(range.contains(3));
        assert!(!range.contains(0));
        assert!(!range.contains(4));
    }
}
