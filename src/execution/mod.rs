// Trade execution module: decision gate, ratchet manager, symbol pipeline
pub mod engine;
pub mod executor;
pub mod position_manager;

pub use engine::{run_engine, SymbolEngine, TickOutcome};
pub use executor::{ExecutionAction, ExecutionDecision, Executor};
pub use position_manager::PositionManager;
