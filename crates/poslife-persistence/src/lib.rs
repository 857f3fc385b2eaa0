//! Persistence boundary for poslife.
//!
//! The engine never waits on storage: it hands every mutated position and
//! every resolved trade to a [`PositionRepository`] and carries on. Storage
//! formats are up to the implementation; [`InMemoryRepository`] keeps
//! everything in process and is what the tests and the bot use.

pub mod error;
pub mod memory;
pub mod repository;

pub use error::{PersistenceError, PersistenceResult};
pub use memory::InMemoryRepository;
pub use repository::{Order, PositionRepository};
