pub use crate::execution_engine::{ExecutionEngine, MockExecutionEngine, NullExecutionEngine};

mod execution_engine;
