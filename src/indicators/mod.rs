// =============================================================================
// Technical Indicators Module
// =============================================================================
//
// Pure, side-effect-free indicator math. Series are aligned with their input
// and use `Option<f64>` for bars that are still warming up, so callers are
// forced to handle insufficient history.

pub mod ema;
pub mod frame;
pub mod macd;

pub use frame::{IndicatorBar, IndicatorFrame, MIN_HISTORY};
