use std::fmt;

use lapboard_game::{ChoiceReward, DiceBag, Die, PendingChoice, TurnState};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use serde::{Deserialize, Serialize};

/// Average face of the default die, the bar a reserved die has to beat.
const DEFAULT_DIE_MEAN: f64 = 3.5;

/// Decision returned by a [`PlayerPolicy`]
#[derive(Debug, Clone)]
pub struct PolicyDecision {
    pub choice_index: usize,
    pub rationale: Option<String>,
}

impl PolicyDecision {
    #[must_use]
    pub const fn new(choice_index: usize, rationale: Option<String>) -> Self {
        Self {
            choice_index,
            rationale,
        }
    }
}

/// Policy interface for automated play strategies.
pub trait PlayerPolicy {
    /// Name used for logging/debug output.
    fn name(&self) -> &'static str;

    /// Bag index to spend on a movement roll; `None` rolls the default die.
    fn pick_move_die(&mut self, state: &TurnState, bag: &DiceBag) -> Option<usize>;

    /// Bag index to spend against the boss; `None` rolls the default die.
    fn pick_boss_die(&mut self, state: &TurnState, bag: &DiceBag) -> Option<usize>;

    /// Select an option id for the pending choice.
    fn pick_choice(
        &mut self,
        state: &TurnState,
        bag: &DiceBag,
        choice: &PendingChoice,
    ) -> PolicyDecision;
}

/// Built-in gameplay strategies for automated runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameplayStrategy {
    Greedy,
    Collector,
    Random,
}

impl GameplayStrategy {
    pub const ALL: [Self; 3] = [Self::Greedy, Self::Collector, Self::Random];

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Greedy => "Greedy",
            Self::Collector => "Collector",
            Self::Random => "Random",
        }
    }

    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Greedy => "greedy",
            Self::Collector => "collector",
            Self::Random => "random",
        }
    }

    #[must_use]
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|strategy| strategy.key().eq_ignore_ascii_case(key.trim()))
    }

    #[must_use]
    pub fn create_policy(self, seed: u64) -> Box<dyn PlayerPolicy + Send> {
        match self {
            Self::Greedy => Box::new(GreedyPolicy),
            Self::Collector => Box::new(CollectorPolicy),
            Self::Random => Box::new(RandomPolicy::new(seed)),
        }
    }
}

impl fmt::Display for GameplayStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Mean signed step count of a die.
#[must_use]
pub fn expected_steps(die: Die) -> f64 {
    match die {
        Die::Normal => DEFAULT_DIE_MEAN,
        Die::Fixed { value } => f64::from(value),
        Die::D20 => 10.5,
        Die::ReverseFixed { value } => -f64::from(value),
        Die::ReverseRandom => -DEFAULT_DIE_MEAN,
    }
}

fn best_die(bag: &DiceBag) -> Option<(usize, f64)> {
    bag.iter()
        .enumerate()
        .map(|(idx, die)| (idx, expected_steps(*die)))
        .max_by(|a, b| a.1.total_cmp(&b.1))
}

fn worst_die(bag: &DiceBag) -> Option<usize> {
    bag.iter()
        .enumerate()
        .min_by(|a, b| expected_steps(*a.1).total_cmp(&expected_steps(*b.1)))
        .map(|(idx, _)| idx)
}

/// Reserved die that beats the default die on average, if any.
fn strongest_forward_die(bag: &DiceBag) -> Option<usize> {
    best_die(bag)
        .filter(|(_, mean)| *mean > DEFAULT_DIE_MEAN)
        .map(|(idx, _)| idx)
}

fn best_die_option(choice: &PendingChoice) -> Option<(usize, f64)> {
    choice
        .options
        .iter()
        .filter_map(|option| match option.reward {
            ChoiceReward::Die { die } => Some((option.id, expected_steps(die))),
            ChoiceReward::Money { .. } => None,
        })
        .max_by(|a, b| a.1.total_cmp(&b.1))
}

/// Takes money whenever offered and spends reserved dice as soon as it has them.
struct GreedyPolicy;

/// Always takes dice and hoards them for the boss.
struct CollectorPolicy;

struct RandomPolicy {
    rng: ChaCha20Rng,
}

impl RandomPolicy {
    fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha20Rng::seed_from_u64(seed),
        }
    }
}

impl PlayerPolicy for GreedyPolicy {
    fn name(&self) -> &'static str {
        "Greedy"
    }

    fn pick_move_die(&mut self, _state: &TurnState, bag: &DiceBag) -> Option<usize> {
        (!bag.is_empty()).then_some(0)
    }

    fn pick_boss_die(&mut self, _state: &TurnState, bag: &DiceBag) -> Option<usize> {
        strongest_forward_die(bag)
    }

    fn pick_choice(
        &mut self,
        _state: &TurnState,
        _bag: &DiceBag,
        choice: &PendingChoice,
    ) -> PolicyDecision {
        let money = choice.options.iter().find_map(|option| match option.reward {
            ChoiceReward::Money { amount } => Some((option.id, amount)),
            ChoiceReward::Die { .. } => None,
        });
        if let Some((id, amount)) = money {
            return PolicyDecision::new(id, Some(format!("money {amount}")));
        }
        let (id, mean) = best_die_option(choice).unwrap_or((0, 0.0));
        PolicyDecision::new(id, Some(format!("mean {mean:.1}")))
    }
}

impl PlayerPolicy for CollectorPolicy {
    fn name(&self) -> &'static str {
        "Collector"
    }

    fn pick_move_die(&mut self, _state: &TurnState, bag: &DiceBag) -> Option<usize> {
        // Make room once full; otherwise keep everything for the boss.
        if bag.is_full() { worst_die(bag) } else { None }
    }

    fn pick_boss_die(&mut self, _state: &TurnState, bag: &DiceBag) -> Option<usize> {
        strongest_forward_die(bag)
    }

    fn pick_choice(
        &mut self,
        _state: &TurnState,
        _bag: &DiceBag,
        choice: &PendingChoice,
    ) -> PolicyDecision {
        match best_die_option(choice) {
            Some((id, mean)) => PolicyDecision::new(id, Some(format!("mean {mean:.1}"))),
            None => PolicyDecision::new(0, Some("no dice offered".to_string())),
        }
    }
}

impl PlayerPolicy for RandomPolicy {
    fn name(&self) -> &'static str {
        "Random"
    }

    fn pick_move_die(&mut self, _state: &TurnState, bag: &DiceBag) -> Option<usize> {
        if bag.is_empty() || !self.rng.gen_bool(0.3) {
            return None;
        }
        Some(self.rng.gen_range(0..bag.len()))
    }

    fn pick_boss_die(&mut self, _state: &TurnState, bag: &DiceBag) -> Option<usize> {
        if bag.is_empty() || !self.rng.gen_bool(0.5) {
            return None;
        }
        Some(self.rng.gen_range(0..bag.len()))
    }

    fn pick_choice(
        &mut self,
        _state: &TurnState,
        _bag: &DiceBag,
        choice: &PendingChoice,
    ) -> PolicyDecision {
        if choice.options.is_empty() {
            return PolicyDecision::new(0, Some("no options".to_string()));
        }
        let idx = self.rng.gen_range(0..choice.options.len());
        PolicyDecision::new(choice.options[idx].id, Some("coin flip".to_string()))
    }
}
