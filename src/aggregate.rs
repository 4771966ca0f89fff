//! Grouped counts over a (filtered) record collection.
//!
//! Each aggregator is a pure function of its input. Blank values are
//! counted under [`Category::Blank`], so every record lands in exactly one
//! bucket and totals always equal the input length.

use std::collections::HashMap;

use crate::types::{Category, CategoryCount, CategoryCounts, Record, StatusNode, StatusTree};

/// Accumulates counts while remembering first-appearance order.
#[derive(Default)]
struct Tally {
    index: HashMap<Category, usize>,
    entries: Vec<CategoryCount>,
}

impl Tally {
    fn add(&mut self, value: &str) {
        let category = Category::from_field(value.trim());
        match self.index.get(&category) {
            Some(&pos) => self.entries[pos].count += 1,
            None => {
                self.index.insert(category.clone(), self.entries.len());
                self.entries.push(CategoryCount { category, count: 1 });
            }
        }
    }

    fn finish(self) -> CategoryCounts {
        CategoryCounts::from_entries(self.entries)
    }
}

fn count_by(records: &[Record], key: impl Fn(&Record) -> &str) -> CategoryCounts {
    let mut tally = Tally::default();
    for record in records {
        tally.add(key(record));
    }
    tally.finish()
}

/// Count of records per status.
pub fn count_by_status(records: &[Record]) -> CategoryCounts {
    count_by(records, |r| r.status.as_str())
}

/// Count of records per country.
pub fn count_by_country(records: &[Record]) -> CategoryCounts {
    count_by(records, |r| r.country.as_str())
}

/// Status nodes, each broken down by country.
pub fn count_by_status_then_country(records: &[Record]) -> StatusTree {
    let mut index: HashMap<Category, usize> = HashMap::new();
    let mut groups: Vec<(Category, Tally)> = Vec::new();

    for record in records {
        let status = Category::from_field(record.status.trim());
        let pos = match index.get(&status) {
            Some(&pos) => pos,
            None => {
                index.insert(status.clone(), groups.len());
                groups.push((status, Tally::default()));
                groups.len() - 1
            }
        };
        groups[pos].1.add(&record.country);
    }

    let nodes = groups
        .into_iter()
        .map(|(status, tally)| {
            let countries = tally.finish();
            StatusNode {
                status,
                count: countries.total(),
                countries,
            }
        })
        .collect();

    StatusTree { nodes }
}
