//! Minimum-phase band-limited step (minBLEP) correction.
//!
//! `MinBlepTable` is the shared, read-only step response; `MinBlepGenerator`
//! is the per-lane ring of corrections in flight.

mod generator;
mod table;

pub use generator::MinBlepGenerator;
pub use table::MinBlepTable;
