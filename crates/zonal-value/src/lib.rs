#![deny(missing_docs)]
#![doc = "Zonotope values tracking a computation in the real and implementation domains, with their participation in region merges and diagnosis."]

mod arith;
mod atomic;
mod compare;
mod elementary;
mod integral;
mod merge;
mod persist;
mod transcendental;
mod zonotope;

pub use elementary::Elementary;
pub use integral::RoundingMode;
pub use merge::ZonotopeMerge;
pub use zonotope::Zonotope;
