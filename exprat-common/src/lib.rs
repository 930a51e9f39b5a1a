//! Internal modules for exprat

pub mod config;
#[macro_use]
pub mod macros;
pub mod output;
#[macro_use]
pub mod memory;
pub mod check;
pub mod expansion;
pub mod formula;
pub mod hashtable;
pub mod input;
pub mod literal;
pub mod parser;
pub mod sorting;
