//! Data loading and saving
//!
//! Point sets are read from CSV into D×N matrices (one column per point) and
//! result matrices are written back one column per line.

pub mod csv;

pub use self::csv::*;
