//! Common error and result types shared by the Tessera ingestion crates.

pub mod error;
pub mod result;

pub use error::Error;
pub use result::Result;
