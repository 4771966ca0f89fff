//! Dataset loader for delimited text and spreadsheets
//!
//! Produces an immutable [`Dataset`] of trimmed [`Record`]s:
//! 1. Detect the source format from the file extension
//! 2. Read a header row plus data rows as text cells
//! 3. Resolve the configured column names against the trimmed headers
//! 4. Build records, parsing deadlines into UTC instants
//!
//! A deadline that cannot be parsed becomes `None`; it never fails the load.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

use crate::error::{ConfigError, LoadError};
use crate::filter::facet_options;
use crate::types::{ColumnMapping, Config, FacetField, Record};

/// Naive date-time layouts tried in order after RFC 3339.
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%d/%m/%Y %H:%M",
];

/// Date-only layouts; month-first wins over day-first when both fit.
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%d/%m/%Y",
    "%d.%m.%Y",
    "%B %d, %Y",
    "%b %d, %Y",
    "%d %B %Y",
    "%d %b %Y",
];

/// Supported source formats, detected by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    /// .csv, .txt (comma) and .tsv, .tab (tab)
    Delimited(u8),
    /// .xlsx, .xlsm, .xlsb, .xls, .ods
    Spreadsheet,
}

impl SourceFormat {
    pub fn detect(path: &Path) -> Result<Self, LoadError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();

        match ext.as_str() {
            "csv" | "txt" => Ok(Self::Delimited(b',')),
            "tsv" | "tab" => Ok(Self::Delimited(b'\t')),
            "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => Ok(Self::Spreadsheet),
            _ => Err(LoadError::UnsupportedFormat(ext)),
        }
    }
}

/// How to map and interpret source columns.
#[derive(Debug, Clone)]
pub struct LoadOptions {
    pub columns: ColumnMapping,
    /// Zone for deadlines written without an offset.
    pub timezone: Tz,
    /// Overrides the separator implied by the file extension.
    pub delimiter: Option<u8>,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            columns: ColumnMapping::default(),
            timezone: Tz::UTC,
            delimiter: None,
        }
    }
}

impl LoadOptions {
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let timezone = parse_timezone(&config.timezone)?;
        let delimiter = match config.delimiter {
            Some(c) if c.is_ascii() => Some(c as u8),
            Some(c) => return Err(ConfigError::InvalidDelimiter(c)),
            None => None,
        };

        Ok(Self {
            columns: config.columns.clone(),
            timezone,
            delimiter,
        })
    }
}

pub fn parse_timezone(name: &str) -> Result<Tz, ConfigError> {
    name.trim()
        .parse::<Tz>()
        .map_err(|_| ConfigError::UnknownTimezone(name.to_string()))
}

/// The loaded record collection. Never mutated after load.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dataset {
    records: Vec<Record>,
    source: Option<PathBuf>,
    unparsed_deadlines: usize,
}

impl Dataset {
    pub fn from_records(records: Vec<Record>) -> Self {
        Self {
            records,
            source: None,
            unparsed_deadlines: 0,
        }
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// Rows whose deadline text was present but unreadable.
    pub fn unparsed_deadlines(&self) -> usize {
        self.unparsed_deadlines
    }

    /// Sorted distinct non-blank values of `field` across the whole dataset.
    pub fn facet_options(&self, field: FacetField) -> Vec<String> {
        facet_options(&self.records, field)
    }
}

/// Load a dataset from disk, choosing the reader by extension.
pub fn load_dataset(path: &Path, options: &LoadOptions) -> Result<Dataset, LoadError> {
    if !path.exists() {
        return Err(LoadError::NotFound(path.to_path_buf()));
    }

    let mut dataset = match SourceFormat::detect(path)? {
        SourceFormat::Delimited(default_delimiter) => {
            let file = File::open(path).map_err(|e| LoadError::Read {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
            read_delimited(file, options.delimiter.unwrap_or(default_delimiter), options)?
        }
        SourceFormat::Spreadsheet => {
            let (headers, rows) = read_spreadsheet(path)?;
            build_dataset(headers, rows.into_iter().map(Ok), options)?
        }
    };
    dataset.source = Some(path.to_path_buf());

    log::info!(
        "Loaded {} records from {}",
        dataset.len(),
        path.display()
    );
    Ok(dataset)
}

/// Read delimited text with a header row.
///
/// Short rows are padded with blanks rather than rejected.
pub fn read_delimited<R: Read>(
    reader: R,
    delimiter: u8,
    options: &LoadOptions,
) -> Result<Dataset, LoadError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let headers: Vec<String> = csv_reader
        .headers()
        .map_err(|e| malformed(&e))?
        .iter()
        .map(clean_header)
        .collect();

    let rows = csv_reader.records().map(|row| {
        row.map(|r| r.iter().map(str::to_string).collect::<Vec<_>>())
            .map_err(|e| malformed(&e))
    });

    build_dataset(headers, rows, options)
}

fn malformed(err: &csv::Error) -> LoadError {
    LoadError::MalformedRow {
        row: err.position().map(|p| p.line() as usize).unwrap_or(0),
        message: err.to_string(),
    }
}

fn clean_header(header: &str) -> String {
    header.trim_start_matches('\u{feff}').trim().to_string()
}

fn read_spreadsheet(path: &Path) -> Result<(Vec<String>, Vec<Vec<String>>), LoadError> {
    use calamine::{open_workbook_auto, Reader};

    let read_error = |message: String| LoadError::Read {
        path: path.to_path_buf(),
        message,
    };

    let mut workbook = open_workbook_auto(path).map_err(|e| read_error(e.to_string()))?;
    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| LoadError::EmptySheet(path.to_path_buf()))?;
    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| read_error(e.to_string()))?;

    sheet_rows(&range).ok_or_else(|| LoadError::EmptySheet(path.to_path_buf()))
}

/// Header row and body rows of a sheet as text cells. `None` without a header.
fn sheet_rows(range: &calamine::Range<calamine::Data>) -> Option<(Vec<String>, Vec<Vec<String>>)> {
    let mut rows = range.rows();
    let header = rows.next()?;
    let headers = header
        .iter()
        .map(|c| clean_header(&cell_to_string(c)))
        .collect();
    let body = rows
        .map(|row| row.iter().map(cell_to_string).collect())
        .collect();

    Some((headers, body))
}

fn cell_to_string(cell: &calamine::Data) -> String {
    use calamine::Data;
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Int(n) => n.to_string(),
        Data::Float(f) => format!("{}", f),
        Data::Bool(b) => b.to_string(),
        Data::Error(_) => String::new(),
        Data::DateTime(dt) => dt
            .as_datetime()
            .map(|d| d.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_default(),
        Data::DateTimeIso(s) => s.clone(),
        Data::DurationIso(s) => s.clone(),
    }
}

/// Header positions of the configured columns.
struct ColumnIndex {
    status: usize,
    owner: usize,
    country: usize,
    title: usize,
    deadline: Option<usize>,
}

impl ColumnIndex {
    fn resolve(headers: &[String], columns: &ColumnMapping) -> Result<Self, LoadError> {
        let find = |name: &str| headers.iter().position(|h| h == name.trim());
        let require = |name: &str| {
            find(name).ok_or_else(|| LoadError::MissingColumn {
                column: name.to_string(),
                available: headers.join(", "),
            })
        };

        let deadline = find(&columns.deadline);
        if deadline.is_none() {
            log::warn!(
                "Deadline column '{}' not found; no deadlines will be shown",
                columns.deadline
            );
        }

        Ok(Self {
            status: require(&columns.status)?,
            owner: require(&columns.owner)?,
            country: require(&columns.country)?,
            title: require(&columns.title)?,
            deadline,
        })
    }
}

fn cell(row: &[String], idx: usize) -> &str {
    row.get(idx).map(|s| s.trim()).unwrap_or("")
}

fn build_dataset<I>(headers: Vec<String>, rows: I, options: &LoadOptions) -> Result<Dataset, LoadError>
where
    I: IntoIterator<Item = Result<Vec<String>, LoadError>>,
{
    let index = ColumnIndex::resolve(&headers, &options.columns)?;
    let mut records = Vec::new();
    let mut unparsed_deadlines = 0;

    for (n, row) in rows.into_iter().enumerate() {
        let row = row?;
        if row.iter().all(|c| c.trim().is_empty()) {
            continue;
        }

        let deadline_text = index.deadline.map(|i| cell(&row, i)).unwrap_or("");
        let deadline = parse_deadline(deadline_text, &options.timezone);
        if deadline.is_none() && !deadline_text.is_empty() {
            unparsed_deadlines += 1;
            // +2: one for the header, one for 1-based numbering
            log::debug!("Row {}: unreadable deadline {:?}", n + 2, deadline_text);
        }

        records.push(Record {
            status: cell(&row, index.status).to_string(),
            owner: cell(&row, index.owner).to_string(),
            country: cell(&row, index.country).to_string(),
            title: cell(&row, index.title).to_string(),
            deadline,
        });
    }

    if unparsed_deadlines > 0 {
        log::warn!(
            "{} of {} deadlines could not be parsed and were left empty",
            unparsed_deadlines,
            records.len()
        );
    }

    Ok(Dataset {
        records,
        source: None,
        unparsed_deadlines,
    })
}

/// Parse deadline text into a UTC instant.
///
/// Values without an offset are read as wall-clock time in `timezone`.
/// Returns `None` for blank or unrecognised text.
pub fn parse_deadline(raw: &str, timezone: &Tz) -> Option<DateTime<Utc>> {
    let value = raw.trim();
    if value.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%d %H:%M:%S%.f%:z", "%Y-%m-%d %H:%M:%S%.f%z"] {
        if let Ok(dt) = DateTime::parse_from_str(value, fmt) {
            return Some(dt.with_timezone(&Utc));
        }
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, fmt) {
            return Some(resolve_local_datetime(timezone, naive));
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(value, fmt) {
            return Some(resolve_local_datetime(timezone, date.and_time(NaiveTime::MIN)));
        }
    }
    None
}

/// Resolve a wall-clock time in `tz` to UTC, handling DST transitions.
///
/// Ambiguous times (fall-back) take the earlier instant. Times inside a
/// spring-forward gap move to the instant one hour later.
fn resolve_local_datetime(tz: &Tz, naive: NaiveDateTime) -> DateTime<Utc> {
    if let Some(dt) = tz.from_local_datetime(&naive).earliest() {
        return dt.with_timezone(&Utc);
    }

    if let Some(dt) = naive
        .checked_add_signed(Duration::hours(1))
        .and_then(|shifted| tz.from_local_datetime(&shifted).earliest())
    {
        log::debug!(
            "DST gap detected for {} in {}; using post-transition time",
            naive,
            tz
        );
        return dt.with_timezone(&Utc);
    }

    log::warn!(
        "Could not resolve local datetime {} in {}; falling back to UTC",
        naive,
        tz
    );
    Utc.from_utc_datetime(&naive)
}
