// =============================================================================
// Alert Dispatch
// =============================================================================

pub mod telegram;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone};

use crate::error::ScanError;
use crate::signals::Signal;

pub use telegram::TelegramDispatcher;

/// Outbound notification channel.
#[async_trait]
pub trait AlertDispatcher: Send + Sync {
    /// Deliver `text` to `channel_id`. Failures are reported, never retried.
    async fn send_message(&self, channel_id: &str, text: &str) -> Result<(), ScanError>;
}

/// Alert text for a detected signal:
///
/// ```text
/// [📈 LONG signal]
/// XRPUSDT @ 14:05 (Bybit)
/// ```
pub fn format_alert<Tz: TimeZone>(
    signal: Signal,
    symbol: &str,
    detected_at: &DateTime<Tz>,
    exchange: &str,
) -> String
where
    Tz::Offset: std::fmt::Display,
{
    format!(
        "[{} {} signal]\n{} @ {} ({})",
        signal.emoji(),
        signal,
        symbol,
        detected_at.format("%H:%M"),
        exchange
    )
}
