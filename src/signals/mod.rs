// =============================================================================
// Signals Module
// =============================================================================
//
// Stateless signal rules evaluated over an `IndicatorFrame`.

pub mod crossover;

pub use crossover::{detect_latest, Signal};
