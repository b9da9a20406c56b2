//! Utility functions and types

mod parallel;
mod persist;

pub use parallel::{parallel_map_bounded, ParallelConfig};
pub use persist::{load_json, save_json};
