// src/compose/mod.rs

//! Task composition.
//!
//! - [`step`] holds the [`Step`] tree and the [`series`] / [`parallel`]
//!   combinators.
//! - [`graph`] checks that composites reference each other without cycles
//!   and yields a safe registration order.

pub mod graph;
pub mod step;

pub use graph::registration_order;
pub use step::{parallel, series, Step};
