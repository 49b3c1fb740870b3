//! Ping and login counters.
//!
//! Connection workers only see the [`StatsRecorder`] trait; [`HourlyStats`]
//! keeps a sliding window of per-hour counters behind it.

pub use hourly::{HourlyStats, StatsData, HOUR_DATE_FORMAT};

mod hourly;

/// Notifications emitted by the session state machine. Implementations are
/// called concurrently from every connection worker.
pub trait StatsRecorder: Send + Sync + std::fmt::Debug {
    fn record_ping(&self);
    fn record_login(&self);
}
