// Dashboard service
// One full recompute pass: filter, then every aggregate and the deadline window.

use chrono::{DateTime, Duration, Utc};

use crate::aggregate::{count_by_country, count_by_status, count_by_status_then_country};
use crate::deadlines::upcoming;
use crate::filter::apply;
use crate::loader::Dataset;
use crate::types::{DashboardView, FilterSelection};

/// Result type for dashboard data loading
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[allow(clippy::large_enum_variant)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum DashboardResult {
    Success { data: DashboardView },
    Empty { message: String },
}

impl DashboardResult {
    pub fn view(&self) -> Option<&DashboardView> {
        match self {
            DashboardResult::Success { data } => Some(data),
            DashboardResult::Empty { .. } => None,
        }
    }
}

/// Derive every view for `selection` from scratch.
///
/// Pure: the same dataset, selection, `now` and `window` always give the same view.
pub fn build_dashboard_view(
    dataset: &Dataset,
    selection: &FilterSelection,
    now: DateTime<Utc>,
    window: Duration,
) -> DashboardView {
    let filtered = apply(dataset.records(), selection);

    DashboardView {
        total_records: dataset.len(),
        matched_records: filtered.len(),
        selection: selection.clone(),
        now,
        window_seconds: window.num_seconds(),
        status_counts: count_by_status(&filtered),
        status_by_country: count_by_status_then_country(&filtered),
        country_counts: count_by_country(&filtered),
        upcoming: upcoming(&filtered, now, window),
    }
}

/// Build the dashboard, reporting "no rows" as an explicit empty result.
pub fn get_dashboard(
    dataset: &Dataset,
    selection: &FilterSelection,
    now: DateTime<Utc>,
    window: Duration,
) -> DashboardResult {
    if dataset.is_empty() {
        return DashboardResult::Empty {
            message: "The dataset has no rows.".to_string(),
        };
    }

    let view = build_dashboard_view(dataset, selection, now, window);
    log::debug!(
        "Dashboard recomputed: {} of {} records match",
        view.matched_records,
        view.total_records
    );

    if view.matched_records == 0 {
        return DashboardResult::Empty {
            message: "No opportunities match the current filters.".to_string(),
        };
    }

    DashboardResult::Success { data: view }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FacetField, Record};
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    fn record(status: &str, owner: &str, country: &str, deadline: Option<DateTime<Utc>>) -> Record {
        Record {
            status: status.to_string(),
            owner: owner.to_string(),
            country: country.to_string(),
            title: format!("{status} in {country}"),
            deadline,
        }
    }

    fn dataset() -> Dataset {
        Dataset::from_records(vec![
            record("Won", "Ana", "US", None),
            record("Lost", "Ben", "US", None),
            record("Won", "Ben", "UK", Some(at(2024, 1, 10))),
            record("Open", "Ana", "DE", Some(at(2024, 1, 3))),
        ])
    }

    #[test]
    fn unfiltered_view_covers_every_record() {
        let view = build_dashboard_view(
            &dataset(),
            &FilterSelection::new(),
            at(2024, 1, 1),
            Duration::days(7),
        );
        assert_eq!(view.total_records, 4);
        assert_eq!(view.matched_records, 4);
        assert_eq!(view.status_counts.total(), 4);
        assert_eq!(view.status_by_country.total(), 4);
        assert_eq!(view.country_counts.get("US"), Some(2));
        assert_eq!(view.window_seconds, 7 * 86_400);
        assert_eq!(view.upcoming.len(), 1);
        assert_eq!(view.upcoming[0].title, "Open in DE");
    }

    #[test]
    fn views_follow_the_selection() {
        let selection = FilterSelection::new().with(FacetField::Owner, ["Ben"]);
        let view = build_dashboard_view(&dataset(), &selection, at(2024, 1, 5), Duration::days(7));
        assert_eq!(view.matched_records, 2);
        assert_eq!(view.status_counts.get("Won"), Some(1));
        assert_eq!(view.status_counts.get("Open"), None);
        assert_eq!(view.upcoming.len(), 1);
        assert_eq!(view.upcoming[0].title, "Won in UK");
    }

    #[test]
    fn sub_day_window_is_kept_exactly() {
        let view = build_dashboard_view(
            &dataset(),
            &FilterSelection::new(),
            at(2024, 1, 1),
            Duration::hours(12),
        );
        assert_eq!(view.window_seconds, 12 * 3_600);
    }

    #[test]
    fn no_matches_is_an_empty_result_not_an_error() {
        let selection = FilterSelection::new().with(FacetField::Country, ["FR"]);
        let result = get_dashboard(&dataset(), &selection, at(2024, 1, 1), Duration::days(7));
        assert!(matches!(result, DashboardResult::Empty { .. }));
        assert!(result.view().is_none());
    }

    #[test]
    fn empty_dataset_is_an_empty_result() {
        let result = get_dashboard(
            &Dataset::default(),
            &FilterSelection::new(),
            at(2024, 1, 1),
            Duration::days(7),
        );
        assert!(matches!(result, DashboardResult::Empty { .. }));
    }

    #[test]
    fn matches_without_deadlines_still_succeed() {
        let selection = FilterSelection::new().with(FacetField::Status, ["Lost"]);
        let result = get_dashboard(&dataset(), &selection, at(2024, 1, 1), Duration::days(7));
        let view = result.view().unwrap();
        assert_eq!(view.matched_records, 1);
        assert!(view.upcoming.is_empty());
    }

    #[test]
    fn result_serializes_with_status_tag() {
        let result = get_dashboard(
            &dataset(),
            &FilterSelection::new(),
            at(2024, 1, 1),
            Duration::days(7),
        );
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["status"], "success");
        assert_eq!(json["data"]["matchedRecords"], 4);
        assert_eq!(json["data"]["statusByCountry"][0]["status"], "Won");
        assert_eq!(json["data"]["upcoming"][0]["title"], "Open in DE");
    }
}
