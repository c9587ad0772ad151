//! 双 deck 同步播放引擎

mod actor;
pub mod core;
pub mod deck;
pub mod drift;
pub mod eq;
pub mod fade;
mod messages;
pub mod output;
mod poller;
pub mod pool;
mod rodio_output;
pub mod sync;
#[cfg(test)]
mod testing;

pub use actor::{AudioBackend, EngineConfig, EngineHandle, spawn_engine};
pub use self::core::{EngineEffect, EngineInput, EngineOptions, SyncEngine};
pub use deck::{DeckSource, DeckStatus, MasterGain};
pub use messages::{EngineEvent, PlayerCommand, PlayerSnapshot};
pub use output::{DeckOutput, NullOutput, OutputSignal};
pub use poller::{PollerHandle, StatusSource, spawn_poller};
pub use pool::DeckPool;
pub use rodio_output::RodioOutput;
pub use sync::SyncPhase;
