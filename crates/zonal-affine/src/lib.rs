#![deny(missing_docs)]
#![doc = "Noise symbols, region merge tables and linear equations with sound binary64 coefficients."]

mod equation;
mod merge_table;
mod symbol;

pub use equation::LinearEquation;
pub use merge_table::MergeTable;
pub use symbol::{NoiseSymbol, SymbolId, SymbolKind, SymbolTable};
