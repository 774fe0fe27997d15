mod generators;
mod operations;
mod tests;

pub use operations::{Harness, OpResult, Operation};
