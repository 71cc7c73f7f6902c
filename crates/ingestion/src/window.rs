//! Event fetch window

use chrono::{DateTime, Duration, Utc};

/// Longest span the events endpoint is asked for in one request
pub const MAX_FETCH_WINDOW_DAYS: i64 = 7;

/// Effective `[from, to]` of one event fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchWindow {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
    /// `to` was pulled back to honor the maximum span
    pub clamped: bool,
}

impl FetchWindow {
    /// Clamp `to` so that `to - from` never exceeds the maximum span.
    ///
    /// There is no catch-up: events after the clamped end are only fetched
    /// by a later run, once the watermark has advanced.
    pub fn clamped(from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        let max_to = from + Duration::days(MAX_FETCH_WINDOW_DAYS);
        if to > max_to {
            Self {
                from,
                to: max_to,
                clamped: true,
            }
        } else {
            Self {
                from,
                to,
                clamped: false,
            }
        }
    }

    /// `start` / `end` query parameters in epoch seconds.
    ///
    /// `start` is `floor(from)`, `end` is `ceil(to) + 1` so that the last
    /// second is included.
    pub fn query_bounds(&self) -> (i64, i64) {
        let start = self.from.timestamp();
        let mut end = self.to.timestamp();
        if self.to.timestamp_subsec_nanos() > 0 {
            end += 1;
        }
        (start, end + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn d0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_long_window_is_clamped_to_seven_days() {
        let window = FetchWindow::clamped(d0(), d0() + Duration::days(10));
        assert!(window.clamped);
        assert_eq!(window.from, d0());
        assert_eq!(window.to, d0() + Duration::days(7));
    }

    #[test]
    fn test_short_window_is_untouched() {
        let window = FetchWindow::clamped(d0(), d0() + Duration::hours(5));
        assert!(!window.clamped);
        assert_eq!(window.to, d0() + Duration::hours(5));
    }

    #[test]
    fn test_exactly_seven_days_is_not_clamped() {
        let window = FetchWindow::clamped(d0(), d0() + Duration::days(7));
        assert!(!window.clamped);
    }

    #[test]
    fn test_query_bounds_round_outwards() {
        let from = d0() + Duration::milliseconds(700);
        let to = d0() + Duration::seconds(60) + Duration::milliseconds(200);
        let (start, end) = FetchWindow::clamped(from, to).query_bounds();
        assert_eq!(start, d0().timestamp());
        assert_eq!(end, d0().timestamp() + 62);
    }

    #[test]
    fn test_query_bounds_whole_seconds() {
        let (start, end) = FetchWindow::clamped(d0(), d0() + Duration::seconds(10)).query_bounds();
        assert_eq!(start, d0().timestamp());
        assert_eq!(end, d0().timestamp() + 11);
    }
}
