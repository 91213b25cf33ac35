//! Lapboard Game Engine
//!
//! Platform-agnostic turn engine for a single-player board traversal game:
//! stage catalog, perimeter board generation, dice, choice squares and boss
//! checkpoints. Rendering, input and storage live with the caller.

pub mod board;
pub mod boss;
pub mod choice;
pub mod constants;
pub mod dice;
pub mod engine;
pub mod event;
pub mod numbers;
pub mod rng;
pub mod stage;
pub mod state;

// Re-export commonly used types
pub use board::{BaseType, Board, BoardSquare, EffectType, LapRefresh, SquareEffect};
pub use boss::{BossProgress, BossState};
pub use choice::{ChoiceKind, ChoiceOption, ChoiceReward, PendingChoice};
pub use dice::{DiceBag, DiceBagError, Die, DieKind, RollDisplay, RollResult};
pub use engine::{GameSnapshot, TurnEngine};
pub use event::{EventId, EventKind, EventSeverity, MoneyCause, TurnEvent, UiSurfaceHint};
pub use rng::RngBundle;
pub use stage::{BossDescriptor, CatalogError, CountRange, StageCatalog, StageConfig};
pub use state::{GamePhase, TurnState};

/// Trait for abstracting data loading operations
/// Platform-specific implementations should provide this
pub trait DataLoader {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Load the stage catalog from the platform-specific source
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog cannot be read or fails validation.
    fn load_stage_catalog(&self) -> Result<StageCatalog, Self::Error>;
}

/// Loader serving the catalog bundled with the crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct BundledData;

impl DataLoader for BundledData {
    type Error = CatalogError;

    fn load_stage_catalog(&self) -> Result<StageCatalog, Self::Error> {
        Ok(StageCatalog::default())
    }
}

/// Trait for abstracting save/load operations
/// Platform-specific implementations should provide this
pub trait GameStorage {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Save a session snapshot
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot cannot be saved.
    fn save_game(&self, save_name: &str, snapshot: &GameSnapshot) -> Result<(), Self::Error>;

    /// Load a session snapshot
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot cannot be loaded.
    fn load_game(&self, save_name: &str) -> Result<Option<GameSnapshot>, Self::Error>;

    /// Delete a saved session
    ///
    /// # Errors
    ///
    /// Returns an error if the save cannot be deleted.
    fn delete_save(&self, save_name: &str) -> Result<(), Self::Error>;
}

/// Main game engine for managing game instances
pub struct GameEngine<L, S>
where
    L: DataLoader,
    S: GameStorage,
{
    data_loader: L,
    storage: S,
}

impl<L, S> GameEngine<L, S>
where
    L: DataLoader,
    S: GameStorage,
{
    /// Create a new game engine with the provided data loader and storage
    pub const fn new(data_loader: L, storage: S) -> Self {
        Self {
            data_loader,
            storage,
        }
    }

    /// Start a new session with the specified seed
    ///
    /// # Errors
    ///
    /// Returns an error if the stage catalog cannot be loaded.
    pub fn create_game(&self, seed: u64) -> Result<TurnEngine, L::Error> {
        let catalog = self.data_loader.load_stage_catalog()?;
        Ok(TurnEngine::new(catalog, seed))
    }

    /// Save a session
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot cannot be saved.
    pub fn save_game(&self, save_name: &str, engine: &TurnEngine) -> Result<(), S::Error> {
        self.storage.save_game(save_name, &engine.snapshot())
    }

    /// Load a session, binding it to a freshly loaded catalog
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot or the catalog cannot be loaded.
    pub fn load_game(&self, save_name: &str) -> Result<Option<TurnEngine>, anyhow::Error>
    where
        L::Error: Into<anyhow::Error>,
        S::Error: Into<anyhow::Error>,
    {
        let Some(snapshot) = self.storage.load_game(save_name).map_err(Into::into)? else {
            return Ok(None);
        };
        let catalog = self.data_loader.load_stage_catalog().map_err(Into::into)?;
        Ok(Some(TurnEngine::restore(catalog, snapshot)))
    }

    /// Delete a saved session
    ///
    /// # Errors
    ///
    /// Returns an error if the save cannot be deleted.
    pub fn delete_game(&self, save_name: &str) -> Result<(), S::Error> {
        self.storage.delete_save(save_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::convert::Infallible;
    use std::rc::Rc;

    #[derive(Clone, Default)]
    struct MemoryStorage {
        saves: Rc<RefCell<HashMap<String, GameSnapshot>>>,
    }

    impl GameStorage for MemoryStorage {
        type Error = Infallible;

        fn save_game(&self, save_name: &str, snapshot: &GameSnapshot) -> Result<(), Self::Error> {
            self.saves
                .borrow_mut()
                .insert(save_name.to_string(), snapshot.clone());
            Ok(())
        }

        fn load_game(&self, save_name: &str) -> Result<Option<GameSnapshot>, Self::Error> {
            Ok(self.saves.borrow().get(save_name).cloned())
        }

        fn delete_save(&self, save_name: &str) -> Result<(), Self::Error> {
            self.saves.borrow_mut().remove(save_name);
            Ok(())
        }
    }

    #[test]
    fn engine_creates_and_roundtrips_sessions() {
        let engine = GameEngine::new(BundledData, MemoryStorage::default());
        let mut session = engine.create_game(0xABCD).unwrap();
        session.with_state_mut(|state| {
            state.money = 250;
            state.lap = 2;
        });
        engine.save_game("slot-one", &session).unwrap();

        let loaded = engine.load_game("slot-one").unwrap().expect("save exists");
        assert_eq!(loaded.state(), session.state());
        assert_eq!(loaded.board(), session.board());
        assert_eq!(loaded.seed(), 0xABCD);

        engine.delete_game("slot-one").unwrap();
        assert!(engine.load_game("slot-one").unwrap().is_none());
    }

    #[test]
    fn missing_save_loads_as_none() {
        let engine = GameEngine::new(BundledData, MemoryStorage::default());
        assert!(engine.load_game("nothing-here").unwrap().is_none());
    }
}
