//! Characteristic definitions: limits, formulas and conversion formulas per
//! entity group, with entity-specific overlay rows.

mod catalog;
mod definition;
mod resolver;

pub use catalog::*;
pub use definition::*;
pub use resolver::*;
