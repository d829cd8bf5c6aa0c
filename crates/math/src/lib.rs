/// Mathematical utilities for borrowflow
///
/// This crate provides checked big-integer helpers, decimal fixed-point
/// conversion between token precisions, and the borrow-capacity
/// calculation used by the workflow runner.

pub mod safe;
pub mod fixed_point;
pub mod capacity;

// Re-export commonly used functions
pub use safe::*;
pub use fixed_point::*;
pub use capacity::*;
