// =============================================================================
// EMA-Stack + MACD Histogram Crossover Detector
// =============================================================================
//
// LONG  : EMA9 > EMA21 > EMA55 and the histogram crosses zero upward
//         (previous < 0, latest > 0).
// SHORT : EMA9 < EMA21 < EMA55 and the histogram crosses zero downward
//         (previous > 0, latest < 0).
//
// Anything else is NEUTRAL, including a crossing under a mixed EMA stack and
// any bar whose inputs are still warming up. The detector is memoryless.
// =============================================================================

use crate::indicators::{IndicatorBar, IndicatorFrame};

/// Directional outcome of one evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Signal {
    Long,
    Short,
    Neutral,
}

impl Signal {
    /// `true` for `Long` and `Short`.
    pub fn is_actionable(&self) -> bool {
        !matches!(self, Self::Neutral)
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            Self::Long => "📈",
            Self::Short => "📉",
            Self::Neutral => "➖",
        }
    }
}

impl std::fmt::Display for Signal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Long => write!(f, "LONG"),
            Self::Short => write!(f, "SHORT"),
            Self::Neutral => write!(f, "NEUTRAL"),
        }
    }
}

/// Apply the crossover rule to the two most recent bars.
pub fn evaluate(latest: &IndicatorBar, previous: &IndicatorBar) -> Signal {
    let (Some(e9), Some(e21), Some(e55), Some(hist), Some(prev_hist)) = (
        latest.ema9,
        latest.ema21,
        latest.ema55,
        latest.histogram,
        previous.histogram,
    ) else {
        return Signal::Neutral;
    };

    if e9 > e21 && e21 > e55 && prev_hist < 0.0 && hist > 0.0 {
        return Signal::Long;
    }
    if e9 < e21 && e21 < e55 && prev_hist > 0.0 && hist < 0.0 {
        return Signal::Short;
    }
    Signal::Neutral
}

/// Evaluate the last two bars of `frame`; fewer than two bars is `Neutral`.
pub fn detect_latest(frame: &IndicatorFrame) -> Signal {
    match frame.last_two() {
        Some((latest, previous)) => evaluate(latest, previous),
        None => Signal::Neutral,
    }
}
