//! p4bump - Automated Perforce version bumping via the p4 CLI.

pub mod bump;
pub mod config;
pub mod perforce;
pub mod version;
pub mod ztag;
