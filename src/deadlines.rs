//! Upcoming-deadline window.

use chrono::{DateTime, Duration, Utc};

use crate::types::{Record, UpcomingDeadline};

/// Default window for the deadline table.
pub const DEFAULT_WINDOW_DAYS: i64 = 7;

/// Records due within `[now, now + window]`, earliest first.
///
/// Records without a deadline are skipped. Equal deadlines keep their input
/// order. A negative window selects nothing.
pub fn upcoming(records: &[Record], now: DateTime<Utc>, window: Duration) -> Vec<UpcomingDeadline> {
    if window < Duration::zero() {
        return Vec::new();
    }
    let end = now
        .checked_add_signed(window)
        .unwrap_or(DateTime::<Utc>::MAX_UTC);

    let mut due: Vec<UpcomingDeadline> = records
        .iter()
        .filter_map(|r| {
            let deadline = r.deadline?;
            (deadline >= now && deadline <= end).then(|| UpcomingDeadline {
                title: r.title.clone(),
                deadline,
            })
        })
        .collect();

    // sort_by_key is stable
    due.sort_by_key(|d| d.deadline);
    due
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    fn record(title: &str, deadline: Option<DateTime<Utc>>) -> Record {
        Record {
            status: "Open".to_string(),
            owner: "Ana".to_string(),
            country: "US".to_string(),
            title: title.to_string(),
            deadline,
        }
    }

    #[test]
    fn keeps_only_deadlines_inside_window() {
        let records = vec![
            record("soon", Some(at(2024, 1, 3))),
            record("later", Some(at(2024, 1, 20))),
        ];
        let out = upcoming(&records, at(2024, 1, 1), Duration::days(7));
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].title, "soon");
        assert_eq!(out[0].deadline, at(2024, 1, 3));
    }

    #[test]
    fn bounds_are_inclusive() {
        let now = at(2024, 1, 1);
        let records = vec![
            record("end", Some(at(2024, 1, 8))),
            record("start", Some(now)),
            record("past", Some(now - Duration::seconds(1))),
            record("beyond", Some(at(2024, 1, 8) + Duration::seconds(1))),
        ];
        let titles: Vec<String> = upcoming(&records, now, Duration::days(7))
            .into_iter()
            .map(|d| d.title)
            .collect();
        assert_eq!(titles, vec!["start", "end"]);
    }

    #[test]
    fn skips_missing_deadlines_and_sorts_ascending() {
        let now = at(2024, 3, 1);
        let records = vec![
            record("c", Some(at(2024, 3, 5))),
            record("none", None),
            record("a", Some(at(2024, 3, 2))),
            record("b", Some(at(2024, 3, 4))),
        ];
        let out = upcoming(&records, now, Duration::days(DEFAULT_WINDOW_DAYS));
        let titles: Vec<&str> = out.iter().map(|d| d.title.as_str()).collect();
        assert_eq!(titles, vec!["a", "b", "c"]);
        assert!(out.windows(2).all(|w| w[0].deadline <= w[1].deadline));
    }

    #[test]
    fn ties_keep_input_order() {
        let day = at(2024, 3, 2);
        let records = vec![
            record("first", Some(day)),
            record("second", Some(day)),
            record("third", Some(day)),
        ];
        let titles: Vec<String> = upcoming(&records, at(2024, 3, 1), Duration::days(7))
            .into_iter()
            .map(|d| d.title)
            .collect();
        assert_eq!(titles, vec!["first", "second", "third"]);
    }

    #[test]
    fn accepts_arbitrary_windows() {
        let now = at(2024, 1, 1);
        let records = vec![
            record("hour", Some(now + Duration::hours(1))),
            record("month", Some(at(2024, 1, 25))),
        ];
        assert_eq!(upcoming(&records, now, Duration::hours(2)).len(), 1);
        assert_eq!(upcoming(&records, now, Duration::days(30)).len(), 2);
        assert!(upcoming(&records, now, Duration::zero()).is_empty());
    }

    #[test]
    fn negative_window_selects_nothing() {
        let now = at(2024, 1, 10);
        let records = vec![record("past", Some(at(2024, 1, 9)))];
        assert!(upcoming(&records, now, Duration::days(-7)).is_empty());
    }

    #[test]
    fn huge_window_saturates() {
        let now = at(2024, 1, 1);
        let records = vec![record("far", Some(at(9000, 1, 1)))];
        let out = upcoming(&records, now, Duration::days(100_000_000));
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn empty_input_gives_empty_output() {
        assert!(upcoming(&[], at(2024, 1, 1), Duration::days(7)).is_empty());
    }
}
