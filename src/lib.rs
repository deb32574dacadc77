//! Verokarhu - Finnish capital gains tax calculator
//!
//! This library ingests broker transaction exports (Trading 212, Revolut,
//! Interactive Brokers, or a generic manual CSV), matches sales against
//! acquisition lots in FIFO order under Finnish capital-taxation rules, and
//! produces per-sale results, a per-lot audit trail, and income summaries.

pub mod error;
pub mod importers;
pub mod reports;
pub mod tax;
pub mod utils;
