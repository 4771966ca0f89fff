use std::borrow::Cow;
use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};

/// Configuration stored in ~/.pipeline-tool/config.json
///
/// Every field is optional on disk; CLI flags override whatever is loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Default dataset when `--data` is not given.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dataset_path: Option<String>,
    /// IANA timezone used to read naive deadlines and print dates.
    #[serde(default = "default_timezone")]
    pub timezone: String,
    /// Width of the upcoming-deadline window.
    #[serde(default = "default_window_days")]
    pub window_days: i64,
    /// Field separator override for delimited sources.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delimiter: Option<char>,
    #[serde(default)]
    pub columns: ColumnMapping,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            dataset_path: None,
            timezone: default_timezone(),
            window_days: default_window_days(),
            delimiter: None,
            columns: ColumnMapping::default(),
        }
    }
}

fn default_timezone() -> String {
    "UTC".to_string()
}

fn default_window_days() -> i64 {
    7
}

/// Header names of the source columns feeding each record field.
///
/// Defaults match the pipeline tracker export, whose categorical columns
/// carry generic `field_N` headers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnMapping {
    #[serde(default = "default_status_column")]
    pub status: String,
    #[serde(default = "default_owner_column")]
    pub owner: String,
    #[serde(default = "default_country_column")]
    pub country: String,
    #[serde(default = "default_deadline_column")]
    pub deadline: String,
    #[serde(default = "default_title_column")]
    pub title: String,
}

impl Default for ColumnMapping {
    fn default() -> Self {
        Self {
            status: default_status_column(),
            owner: default_owner_column(),
            country: default_country_column(),
            deadline: default_deadline_column(),
            title: default_title_column(),
        }
    }
}

fn default_status_column() -> String {
    "field_1".to_string()
}

fn default_owner_column() -> String {
    "field_2".to_string()
}

fn default_country_column() -> String {
    "field_4".to_string()
}

fn default_deadline_column() -> String {
    "field_6".to_string()
}

fn default_title_column() -> String {
    "Title".to_string()
}

/// A categorical value as seen by the aggregators.
///
/// Blank (empty after trimming) is its own category rather than a
/// stringified placeholder. It serializes as `null`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    Blank,
    Value(String),
}

impl Category {
    pub const BLANK_LABEL: &'static str = "(blank)";

    /// Build from an already-trimmed field value.
    pub fn from_field(value: &str) -> Self {
        if value.is_empty() {
            Category::Blank
        } else {
            Category::Value(value.to_string())
        }
    }

    pub fn is_blank(&self) -> bool {
        matches!(self, Category::Blank)
    }

    /// Display label; blank renders as `(blank)`.
    ///
    /// A real value spelled `(blank)` is quoted so the two never print alike.
    pub fn label(&self) -> Cow<'_, str> {
        match self {
            Category::Blank => Cow::Borrowed(Self::BLANK_LABEL),
            Category::Value(v) if v == Self::BLANK_LABEL => Cow::Owned(format!("\"{}\"", v)),
            Category::Value(v) => Cow::Borrowed(v),
        }
    }

    /// Field value this category was built from.
    pub fn as_field(&self) -> &str {
        match self {
            Category::Blank => "",
            Category::Value(v) => v,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

impl Serialize for Category {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Category::Blank => serializer.serialize_none(),
            Category::Value(v) => serializer.serialize_str(v),
        }
    }
}

/// The filterable fields of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FacetField {
    Status,
    Owner,
    Country,
}

impl FacetField {
    pub const ALL: [FacetField; 3] = [FacetField::Status, FacetField::Owner, FacetField::Country];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Status => "status",
            Self::Owner => "owner",
            Self::Country => "country",
        }
    }

    /// Heading used by the presentation layer.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Status => "Status",
            Self::Owner => "Responsible Person",
            Self::Country => "Country",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "status" => Some(Self::Status),
            "owner" | "person" | "people" => Some(Self::Owner),
            "country" | "countries" => Some(Self::Country),
            _ => None,
        }
    }
}

/// One opportunity row. Text fields are trimmed at load time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    pub status: String,
    pub owner: String,
    pub country: String,
    pub title: String,
    pub deadline: Option<DateTime<Utc>>,
}

impl Record {
    /// Value of a facet field.
    pub fn field(&self, field: FacetField) -> &str {
        match field {
            FacetField::Status => &self.status,
            FacetField::Owner => &self.owner,
            FacetField::Country => &self.country,
        }
    }
}

/// The user's current facet constraints.
///
/// An empty set means no restriction on that field. Values are trimmed on
/// insertion so they compare exactly against loaded records.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterSelection {
    #[serde(default)]
    pub status: BTreeSet<String>,
    #[serde(default)]
    pub owner: BTreeSet<String>,
    #[serde(default)]
    pub country: BTreeSet<String>,
}

impl FilterSelection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`FilterSelection::set`].
    pub fn with<I, S>(mut self, field: FacetField, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.set(field, values);
        self
    }

    /// Replace the inclusion set for `field`.
    pub fn set<I, S>(&mut self, field: FacetField, values: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        *self.values_mut(field) = values
            .into_iter()
            .map(|v| v.as_ref().trim().to_string())
            .collect();
    }

    pub fn clear(&mut self, field: FacetField) {
        self.values_mut(field).clear();
    }

    pub fn values(&self, field: FacetField) -> &BTreeSet<String> {
        match field {
            FacetField::Status => &self.status,
            FacetField::Owner => &self.owner,
            FacetField::Country => &self.country,
        }
    }

    fn values_mut(&mut self, field: FacetField) -> &mut BTreeSet<String> {
        match field {
            FacetField::Status => &mut self.status,
            FacetField::Owner => &mut self.owner,
            FacetField::Country => &mut self.country,
        }
    }

    /// True when no field carries a constraint.
    pub fn is_unrestricted(&self) -> bool {
        FacetField::ALL.iter().all(|f| self.values(*f).is_empty())
    }
}

/// One (category, count) pair of a grouped count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryCount {
    pub category: Category,
    pub count: usize,
}

/// Grouped counts in first-appearance order.
///
/// Order carries no meaning beyond determinism; callers re-sort with
/// [`CategoryCounts::sorted_by_count`] or [`CategoryCounts::sorted_by_label`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct CategoryCounts {
    entries: Vec<CategoryCount>,
}

impl CategoryCounts {
    pub(crate) fn from_entries(entries: Vec<CategoryCount>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[CategoryCount] {
        &self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = &CategoryCount> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Count for a field value; the empty string looks up the blank category.
    pub fn get(&self, value: &str) -> Option<usize> {
        let key = Category::from_field(value.trim());
        self.entries
            .iter()
            .find(|e| e.category == key)
            .map(|e| e.count)
    }

    pub fn total(&self) -> usize {
        self.entries.iter().map(|e| e.count).sum()
    }

    /// Descending by count; ties keep first-appearance order.
    pub fn sorted_by_count(&self) -> Vec<CategoryCount> {
        let mut sorted = self.entries.clone();
        sorted.sort_by(|a, b| b.count.cmp(&a.count));
        sorted
    }

    /// Ascending by label, blank last.
    pub fn sorted_by_label(&self) -> Vec<CategoryCount> {
        let mut sorted = self.entries.clone();
        sorted.sort_by(|a, b| match (&a.category, &b.category) {
            (Category::Blank, Category::Blank) => std::cmp::Ordering::Equal,
            (Category::Blank, _) => std::cmp::Ordering::Greater,
            (_, Category::Blank) => std::cmp::Ordering::Less,
            (Category::Value(x), Category::Value(y)) => x.cmp(y),
        });
        sorted
    }
}

/// One status with its per-country breakdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusNode {
    pub status: Category,
    pub count: usize,
    pub countries: CategoryCounts,
}

/// Two-level status → country count tree, statuses in first-appearance order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct StatusTree {
    pub nodes: Vec<StatusNode>,
}

impl StatusTree {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn total(&self) -> usize {
        self.nodes.iter().map(|n| n.count).sum()
    }

    pub fn get(&self, status: &str) -> Option<&StatusNode> {
        let key = Category::from_field(status.trim());
        self.nodes.iter().find(|n| n.status == key)
    }
}

/// A row of the upcoming-deadline table. Formatting is left to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpcomingDeadline {
    pub title: String,
    pub deadline: DateTime<Utc>,
}

/// Every derived view for one filter selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardView {
    pub total_records: usize,
    pub matched_records: usize,
    pub selection: FilterSelection,
    pub now: DateTime<Utc>,
    /// Width of the deadline window, kept exact so sub-day windows survive.
    pub window_seconds: i64,
    pub status_counts: CategoryCounts,
    pub status_by_country: StatusTree,
    pub country_counts: CategoryCounts,
    pub upcoming: Vec<UpcomingDeadline>,
}
