// src/detection/mod.rs

mod error;
mod filter;

// Re-export public APIs
pub use filter::DetectionFilter;
