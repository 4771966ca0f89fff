//! Terminal presentation of dashboard views.
//!
//! Everything here is formatting: the views arrive fully computed and are
//! only re-sorted for display.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;

use crate::loader::Dataset;
use crate::services::dashboard::DashboardResult;
use crate::types::{
    Category, CategoryCounts, DashboardView, FacetField, StatusTree, UpcomingDeadline,
};

const BAR_WIDTH: usize = 40;

/// Calendar date of a deadline in the display timezone.
pub fn format_deadline(deadline: DateTime<Utc>, tz: &Tz) -> String {
    deadline.with_timezone(tz).format("%Y-%m-%d").to_string()
}

/// Render a full dashboard as plain text.
pub fn render_dashboard(result: &DashboardResult, tz: &Tz) -> String {
    match result {
        DashboardResult::Success { data } => render_view(data, tz),
        DashboardResult::Empty { message } => format!("{}\n", message),
    }
}

fn render_view(view: &DashboardView, tz: &Tz) -> String {
    let mut output = String::new();

    output.push_str(&format!(
        "Showing {} of {} opportunities\n",
        view.matched_records, view.total_records
    ));
    for field in FacetField::ALL {
        let values = view.selection.values(field);
        if !values.is_empty() {
            let shown: Vec<String> = values.iter().map(|v| value_label(v)).collect();
            output.push_str(&format!(
                "  {}: {}\n",
                field.display_name(),
                shown.join(", ")
            ));
        }
    }

    output.push_str("\n== Status Distribution ==\n");
    output.push_str(&render_distribution(&view.status_counts));

    output.push_str("\n== Status by Country ==\n");
    output.push_str(&render_tree(&view.status_by_country));

    output.push_str("\n== Opportunities by Country ==\n");
    output.push_str(&render_bars(&view.country_counts));

    output.push_str(&format!(
        "\n== Deadlines Approaching in the Next {} ==\n",
        describe_window(view.window_seconds)
    ));
    output.push_str(&render_deadlines(&view.upcoming, view.window_seconds, tz));

    output
}

fn value_label(value: &str) -> String {
    Category::from_field(value).to_string()
}

/// Window length in the largest whole unit, e.g. `7 days` or `12 hours`.
pub fn describe_window(seconds: i64) -> String {
    const UNITS: [(i64, &str); 3] = [(86_400, "day"), (3_600, "hour"), (60, "minute")];

    let (n, unit) = UNITS
        .iter()
        .find(|(size, _)| seconds % size == 0)
        .map(|(size, unit)| (seconds / size, *unit))
        .unwrap_or((seconds, "second"));

    if n == 1 {
        format!("1 {}", unit)
    } else {
        format!("{} {}s", n, unit)
    }
}

/// Label, count and share of the total, largest first.
pub fn render_distribution(counts: &CategoryCounts) -> String {
    if counts.is_empty() {
        return "No data to display.\n".to_string();
    }

    let total = counts.total() as f64;
    let width = label_width(counts);
    let mut output = String::new();
    for entry in counts.sorted_by_count() {
        let share = entry.count as f64 * 100.0 / total;
        output.push_str(&format!(
            "  {:<width$}  {:>5}  {:>5.1}%\n",
            entry.category.label(),
            entry.count,
            share,
            width = width
        ));
    }
    output
}

/// Two-level drill-down: statuses, then countries within each.
pub fn render_tree(tree: &StatusTree) -> String {
    if tree.is_empty() {
        return "No data to display.\n".to_string();
    }

    let mut output = String::new();
    for node in &tree.nodes {
        output.push_str(&format!("  {} ({})\n", node.status.label(), node.count));
        for child in node.countries.sorted_by_count() {
            output.push_str(&format!(
                "    └ {} ({})\n",
                child.category.label(),
                child.count
            ));
        }
    }
    output
}

/// Horizontal bar chart, largest first.
pub fn render_bars(counts: &CategoryCounts) -> String {
    if counts.is_empty() {
        return "No data to display for bar chart.\n".to_string();
    }

    let max = counts.iter().map(|e| e.count).max().unwrap_or(1).max(1);
    let width = label_width(counts);
    let mut output = String::new();
    for entry in counts.sorted_by_count() {
        let len = (entry.count * BAR_WIDTH).div_ceil(max);
        output.push_str(&format!(
            "  {:<width$}  {} {}\n",
            entry.category.label(),
            "█".repeat(len),
            entry.count,
            width = width
        ));
    }
    output
}

/// Title and calendar date of each upcoming deadline.
pub fn render_deadlines(rows: &[UpcomingDeadline], window_seconds: i64, tz: &Tz) -> String {
    if rows.is_empty() {
        return format!(
            "No opportunities with deadlines in the next {}.\n",
            describe_window(window_seconds)
        );
    }

    let title_width = rows
        .iter()
        .map(|r| r.title.chars().count())
        .max()
        .unwrap_or(0)
        .max("Opportunity Title".len());

    let mut output = format!(
        "  {:<width$}  Deadline\n",
        "Opportunity Title",
        width = title_width
    );
    for row in rows {
        output.push_str(&format!(
            "  {:<width$}  {}\n",
            row.title,
            format_deadline(row.deadline, tz),
            width = title_width
        ));
    }
    output
}

/// Sorted options for every facet, as offered to the filter controls.
pub fn render_facets(dataset: &Dataset) -> String {
    let mut output = String::new();
    for field in FacetField::ALL {
        let options = dataset.facet_options(field);
        output.push_str(&format!(
            "{} ({}):\n",
            field.display_name(),
            field.as_str()
        ));
        if options.is_empty() {
            output.push_str("  (none)\n");
        }
        for option in options {
            output.push_str(&format!("  {}\n", value_label(&option)));
        }
    }
    output
}

fn label_width(counts: &CategoryCounts) -> usize {
    counts
        .iter()
        .map(|e| e.category.label().chars().count())
        .max()
        .unwrap_or(0)
}
