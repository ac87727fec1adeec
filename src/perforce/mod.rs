//! Perforce command client.
//!
//! Shells out to the `p4` CLI, feeds it stdin where needed, and interprets
//! its tagged output and error text. Perforce signals several legitimate
//! non-error conditions as command failures, so each operation carries its
//! own allow-list of "soft" failure texts; anything unmatched stays a hard
//! error.

mod client;
mod error;
mod invoker;

pub use client::*;
pub use error::*;
pub use invoker::*;
