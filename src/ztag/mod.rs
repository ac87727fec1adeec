//! Parser for the Perforce `-ztag` tagged output format.
//!
//! `-ztag` output is not a single well-defined grammar: it mixes `... key
//! value` field lines, free-text preambles (login banners, error text), and
//! fields whose values legitimately span multiple lines (change
//! descriptions). This module tolerates all three without a prior schema and
//! never fails on malformed text.

mod parser;
mod types;

pub use parser::*;
pub use types::*;
