//! Protocol module - workflow orchestration.
//!
//! This module provides the engine facade that runs every DSC workflow
//! atomically: reentrancy guard, snapshot rollback, compensated external
//! settlement and event emission.

pub mod engine;
pub mod events;
pub mod guard;
pub mod operations;
pub mod settlement;

pub use engine::*;
pub use events::*;
pub use guard::*;
pub use operations::*;
pub use settlement::*;
