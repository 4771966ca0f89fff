use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use parking_lot::Mutex;

use crate::error::ConfigError;
use crate::loader::{parse_deadline, parse_timezone, Dataset};
use crate::services::dashboard::{get_dashboard, DashboardResult};
use crate::types::{Config, FilterSelection};

/// Last computed dashboard and the inputs that produced it.
struct Memo {
    selection: FilterSelection,
    now: DateTime<Utc>,
    window: Duration,
    result: DashboardResult,
}

impl Memo {
    fn matches(&self, selection: &FilterSelection, now: DateTime<Utc>, window: Duration) -> bool {
        self.now == now && self.window == window && &self.selection == selection
    }
}

/// Session state: the loaded dataset plus a single-entry dashboard memo.
///
/// The dataset is never mutated; the memo only skips recomputation when the
/// exact same selection is asked for twice in a row.
pub struct AppState {
    pub config: Config,
    dataset: Dataset,
    memo: Mutex<Option<Memo>>,
}

impl AppState {
    pub fn new(config: Config, dataset: Dataset) -> Self {
        Self {
            config,
            dataset,
            memo: Mutex::new(None),
        }
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    /// Default deadline window from config.
    pub fn window(&self) -> Result<Duration, ConfigError> {
        window_from_days(self.config.window_days)
    }

    /// Reference time and window for one request.
    ///
    /// `now` is parsed like a deadline in `tz` and defaults to the current
    /// time. `window_days` overrides the configured window.
    pub fn resolve_window(
        &self,
        now: Option<&str>,
        window_days: Option<i64>,
        tz: &Tz,
    ) -> Result<(DateTime<Utc>, Duration), ConfigError> {
        let now = match now {
            Some(text) => parse_deadline(text, tz)
                .ok_or_else(|| ConfigError::InvalidReferenceTime(text.to_string()))?,
            None => Utc::now(),
        };

        let window = match window_days {
            Some(days) => window_from_days(days)?,
            None => self.window()?,
        };

        Ok((now, window))
    }

    /// Dashboard for `selection`, reusing the previous result when the inputs match.
    pub fn dashboard(
        &self,
        selection: &FilterSelection,
        now: DateTime<Utc>,
        window: Duration,
    ) -> DashboardResult {
        let mut memo = self.memo.lock();
        if let Some(entry) = memo.as_ref() {
            if entry.matches(selection, now, window) {
                log::debug!("Dashboard memo hit");
                return entry.result.clone();
            }
        }

        let result = get_dashboard(&self.dataset, selection, now, window);
        *memo = Some(Memo {
            selection: selection.clone(),
            now,
            window,
            result: result.clone(),
        });
        result
    }

    /// True when the next `dashboard` call with these inputs will be served from the memo.
    pub fn is_memoized(&self, selection: &FilterSelection, now: DateTime<Utc>, window: Duration) -> bool {
        self.memo
            .lock()
            .as_ref()
            .is_some_and(|entry| entry.matches(selection, now, window))
    }
}

/// Get the canonical config file path (~/.pipeline-tool/config.json)
pub fn config_path() -> Result<PathBuf, ConfigError> {
    let home = dirs::home_dir().ok_or(ConfigError::NoHomeDir)?;
    Ok(home.join(".pipeline-tool").join("config.json"))
}

/// Load configuration.
///
/// An explicit `path` must exist. Without one, ~/.pipeline-tool/config.json is
/// read when present and defaults are used otherwise.
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let config_path = match path {
        Some(p) => p.to_path_buf(),
        None => {
            let default_path = config_path()?;
            if !default_path.exists() {
                log::debug!(
                    "No config at {}; using defaults",
                    default_path.display()
                );
                return Ok(Config::default());
            }
            default_path
        }
    };

    let content = fs::read_to_string(&config_path).map_err(|e| ConfigError::Read {
        path: config_path.clone(),
        message: e.to_string(),
    })?;

    let config: Config = serde_json::from_str(&content).map_err(|e| ConfigError::Parse {
        path: config_path.clone(),
        message: e.to_string(),
    })?;

    validate_config(&config)?;
    log::debug!("Loaded config from {}", config_path.display());
    Ok(config)
}

fn validate_config(config: &Config) -> Result<(), ConfigError> {
    parse_timezone(&config.timezone)?;
    window_from_days(config.window_days)?;
    Ok(())
}

/// A window of whole days. Negative counts and counts too large for a
/// `Duration` are rejected.
pub fn window_from_days(days: i64) -> Result<Duration, ConfigError> {
    if days < 0 {
        return Err(ConfigError::InvalidWindow(days));
    }
    Duration::try_days(days).ok_or(ConfigError::InvalidWindow(days))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FacetField, Record};
    use chrono::TimeZone;

    fn state() -> AppState {
        let records = vec![
            Record {
                status: "Won".to_string(),
                owner: "Ana".to_string(),
                country: "US".to_string(),
                title: "Deal".to_string(),
                deadline: None,
            },
            Record {
                status: "Lost".to_string(),
                owner: "Ben".to_string(),
                country: "UK".to_string(),
                title: "Other deal".to_string(),
                deadline: None,
            },
        ];
        AppState::new(Config::default(), Dataset::from_records(records))
    }

    #[test]
    fn load_config_reads_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(
            &path,
            r#"{"datasetPath": "/data/pipeline.csv", "timezone": "Europe/London", "windowDays": 3}"#,
        )
        .unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.dataset_path.as_deref(), Some("/data/pipeline.csv"));
        assert_eq!(config.timezone, "Europe/London");
        assert_eq!(config.window_days, 3);
    }

    #[test]
    fn load_config_rejects_invalid_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(load_config(Some(&path)), Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn load_config_rejects_unknown_timezone_and_negative_window() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        fs::write(&path, r#"{"timezone": "Atlantis/Central"}"#).unwrap();
        assert!(matches!(
            load_config(Some(&path)),
            Err(ConfigError::UnknownTimezone(_))
        ));

        fs::write(&path, r#"{"windowDays": -1}"#).unwrap();
        assert!(matches!(
            load_config(Some(&path)),
            Err(ConfigError::InvalidWindow(-1))
        ));
    }

    #[test]
    fn load_config_rejects_window_too_large_for_a_duration() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"windowDays": 200000000000}"#).unwrap();
        assert!(matches!(
            load_config(Some(&path)),
            Err(ConfigError::InvalidWindow(200_000_000_000))
        ));
    }

    #[test]
    fn window_is_an_error_when_config_was_not_validated() {
        let config = Config {
            window_days: i64::MAX,
            ..Config::default()
        };
        let state = AppState::new(config, Dataset::default());
        assert!(matches!(state.window(), Err(ConfigError::InvalidWindow(i64::MAX))));
    }

    #[test]
    fn resolve_window_applies_overrides() {
        let state = state();
        let (now, window) = state
            .resolve_window(Some("2024-03-01"), Some(14), &Tz::UTC)
            .unwrap();
        assert_eq!(now, Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap());
        assert_eq!(window, Duration::days(14));

        let (_, window) = state.resolve_window(None, None, &Tz::UTC).unwrap();
        assert_eq!(window, Duration::days(7));
    }

    #[test]
    fn resolve_window_rejects_bad_input() {
        let state = state();
        assert!(matches!(
            state.resolve_window(None, Some(200_000_000_000), &Tz::UTC),
            Err(ConfigError::InvalidWindow(200_000_000_000))
        ));
        assert!(matches!(
            state.resolve_window(None, Some(-3), &Tz::UTC),
            Err(ConfigError::InvalidWindow(-3))
        ));
        assert!(matches!(
            state.resolve_window(Some("next week"), None, &Tz::UTC),
            Err(ConfigError::InvalidReferenceTime(_))
        ));
    }

    #[test]
    fn window_from_days_accepts_large_and_zero_windows() {
        assert!(window_from_days(100_000_000_000).is_ok());
        assert_eq!(window_from_days(0).unwrap(), Duration::zero());
    }

    #[test]
    fn load_config_requires_explicit_file_to_exist() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.json");
        assert!(matches!(load_config(Some(&missing)), Err(ConfigError::Read { .. })));
    }

    #[test]
    fn memo_serves_repeat_requests() {
        let state = state();
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let selection = FilterSelection::new().with(FacetField::Status, ["Won"]);

        let window = state.window().unwrap();

        assert!(!state.is_memoized(&selection, now, window));
        let first = state.dashboard(&selection, now, window);
        assert!(state.is_memoized(&selection, now, window));
        let second = state.dashboard(&selection, now, window);
        assert_eq!(first, second);
    }

    #[test]
    fn memo_is_replaced_when_selection_changes() {
        let state = state();
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let won = FilterSelection::new().with(FacetField::Status, ["Won"]);
        let lost = FilterSelection::new().with(FacetField::Status, ["Lost"]);

        let window = state.window().unwrap();

        let a = state.dashboard(&won, now, window);
        let b = state.dashboard(&lost, now, window);
        assert_ne!(a, b);
        assert!(!state.is_memoized(&won, now, window));
        assert!(state.is_memoized(&lost, now, window));

        // same answer as an uncached computation
        assert_eq!(b, get_dashboard(state.dataset(), &lost, now, window));
    }
}
