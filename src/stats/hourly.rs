use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Local, TimeZone};
use parking_lot::Mutex;
use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use super::StatsRecorder;
use crate::Shutdown;

/// Year-Month-Day-Hour
pub const HOUR_DATE_FORMAT: &str = "%Y-%m-%d-%H";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatsData {
    #[serde(rename = "hourDate")]
    pub hour_date: String,
    #[serde(rename = "pingCount")]
    pub ping_count: u64,
    #[serde(rename = "loginCount")]
    pub login_count: u64,
}

impl StatsData {
    fn empty(hour_date: String) -> Self {
        StatsData {
            hour_date,
            ping_count: 0,
            login_count: 0,
        }
    }
}

/// Fixed-size window of hourly counters, oldest bucket first.
///
/// The window always holds `capacity` buckets. A record in a new hour drops the
/// oldest bucket and appends a fresh one, so hours without any traffic leave
/// no gap until the next roll.
#[derive(Debug)]
pub struct HourlyStats {
    window: Mutex<VecDeque<StatsData>>,
}

impl HourlyStats {
    pub fn new(capacity: usize) -> Self {
        Self::starting_at(capacity, Local::now())
    }

    /// Builds a window whose buckets cover the `capacity` hours before `now`.
    pub fn starting_at<Tz: TimeZone>(capacity: usize, now: DateTime<Tz>) -> Self
    where
        Tz::Offset: std::fmt::Display,
    {
        let mut window = VecDeque::with_capacity(capacity);
        for hours_back in (1..=capacity as i64).rev() {
            let hour = now.clone() - chrono::Duration::hours(hours_back);
            window.push_back(StatsData::empty(
                hour.format(HOUR_DATE_FORMAT).to_string(),
            ));
        }
        HourlyStats {
            window: Mutex::new(window),
        }
    }

    /// Adds to the bucket of `now`, returning the previous newest bucket when
    /// `now` starts a new hour.
    pub(crate) fn register_at<Tz: TimeZone>(
        &self,
        now: &DateTime<Tz>,
        pings: u64,
        logins: u64,
    ) -> Option<StatsData>
    where
        Tz::Offset: std::fmt::Display,
    {
        let hour_date = now.format(HOUR_DATE_FORMAT).to_string();
        let mut window = self.window.lock();
        if let Some(current) = window.back_mut() {
            if current.hour_date == hour_date {
                current.ping_count += pings;
                current.login_count += logins;
                return None;
            }
        }
        trace!("starting stats bucket {}", hour_date);
        let completed = window.back().cloned();
        if !window.is_empty() {
            window.pop_front();
        }
        window.push_back(StatsData {
            hour_date,
            ping_count: pings,
            login_count: logins,
        });
        completed
    }

    /// Starts a new bucket if the hour changed since the last record.
    pub fn roll(&self) {
        report_completed(self.register_at(&Local::now(), 0, 0));
    }

    pub fn snapshot(&self) -> Vec<StatsData> {
        self.window.lock().iter().cloned().collect()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.snapshot())
    }

    /// Rolls the window every `interval` until shutdown is signalled.
    pub fn start_roller(
        self: Arc<Self>,
        interval: Duration,
        mut shutdown: Shutdown,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = shutdown.recv() => {
                        debug!("stats roller received shutdown signal");
                        break;
                    }
                    _ = tokio::time::sleep(interval) => self.roll(),
                }
            }
        })
    }
}

impl StatsRecorder for HourlyStats {
    fn record_ping(&self) {
        report_completed(self.register_at(&Local::now(), 1, 0));
    }

    fn record_login(&self) {
        report_completed(self.register_at(&Local::now(), 0, 1));
    }
}

fn report_completed(completed: Option<StatsData>) {
    let Some(bucket) = completed else {
        return;
    };
    match serde_json::to_string(&bucket) {
        Ok(json) => info!("hourly stats completed: {}", json),
        Err(err) => warn!("failed to serialize stats bucket {}: {}", bucket.hour_date, err),
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use tokio::sync::broadcast;

    use super::*;

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 9, hour, 15, 0).unwrap()
    }

    #[test]
    fn test_window_is_prefilled_with_previous_hours() {
        let stats = HourlyStats::starting_at(3, at(10));
        let hours: Vec<String> = stats.snapshot().into_iter().map(|d| d.hour_date).collect();
        assert_eq!(hours, vec!["2024-03-09-07", "2024-03-09-08", "2024-03-09-09"]);
    }

    #[test]
    fn test_records_in_same_hour_share_bucket() {
        let stats = HourlyStats::starting_at(2, at(10));
        stats.register_at(&at(10), 1, 0);
        stats.register_at(&at(10), 1, 0);
        stats.register_at(&at(10), 0, 1);

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[0].hour_date, "2024-03-09-09");
        assert_eq!(
            snapshot[1],
            StatsData {
                hour_date: "2024-03-09-10".to_string(),
                ping_count: 2,
                login_count: 1,
            }
        );
    }

    #[test]
    fn test_new_hour_shifts_window() {
        let stats = HourlyStats::starting_at(2, at(10));
        stats.register_at(&at(10), 5, 0);
        stats.register_at(&at(11), 0, 0);

        let snapshot = stats.snapshot();
        assert_eq!(snapshot[0].hour_date, "2024-03-09-10");
        assert_eq!(snapshot[0].ping_count, 5);
        assert_eq!(snapshot[1].hour_date, "2024-03-09-11");
        assert_eq!(snapshot[1].ping_count, 0);
    }

    #[test]
    fn test_new_hour_hands_back_completed_bucket() {
        let stats = HourlyStats::starting_at(3, at(10));
        let prefilled = stats.register_at(&at(10), 2, 1).unwrap();
        assert_eq!(prefilled.hour_date, "2024-03-09-09");
        assert_eq!(stats.register_at(&at(10), 1, 0), None);

        let completed = stats.register_at(&at(11), 0, 0).unwrap();
        assert_eq!(
            completed,
            StatsData {
                hour_date: "2024-03-09-10".to_string(),
                ping_count: 3,
                login_count: 1,
            }
        );
    }

    #[test]
    fn test_json_field_names() {
        let stats = HourlyStats::starting_at(1, at(1));
        assert_eq!(
            stats.to_json().unwrap(),
            r#"[{"hourDate":"2024-03-09-00","pingCount":0,"loginCount":0}]"#
        );
    }

    #[test]
    fn test_concurrent_pings_are_all_counted() {
        let stats = Arc::new(HourlyStats::new(4));
        let workers: Vec<_> = (0..8)
            .map(|_| {
                let stats = stats.clone();
                std::thread::spawn(move || {
                    for _ in 0..1000 {
                        stats.record_ping();
                    }
                })
            })
            .collect();
        for worker in workers {
            worker.join().unwrap();
        }

        let total: u64 = stats.snapshot().iter().map(|d| d.ping_count).sum();
        assert_eq!(total, 8000);
    }

    #[tokio::test]
    async fn test_roller_stops_on_shutdown() {
        let (notify_shutdown, _) = broadcast::channel(1);
        let stats = Arc::new(HourlyStats::new(2));
        let handle = stats
            .clone()
            .start_roller(Duration::from_millis(5), Shutdown::new(notify_shutdown.subscribe()));

        tokio::time::sleep(Duration::from_millis(20)).await;
        notify_shutdown.send(()).unwrap();
        handle.await.unwrap();
        assert_eq!(stats.snapshot().len(), 2);
    }
}
