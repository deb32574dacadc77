// Reports module - per-lot audit rows, terminal tables, export files

pub mod audit;
pub mod export;
pub mod tables;

pub use audit::{expand_sale_rows, ReportRow};
