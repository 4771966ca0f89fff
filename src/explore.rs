//! Command grammar for the interactive explore loop.
//!
//! One command per line:
//! - `status Won, Lost` / `owner Ana` / `country US` replace a facet's values
//! - `(blank)` selects rows with no value; `"(blank)"` matches that text literally
//! - `status` alone or `clear status` lifts that facet's constraint
//! - `clear` lifts every constraint
//! - `show`, `facets`, `help`, `quit`

use crate::types::{Category, FacetField, FilterSelection};

pub const HELP: &str = "\
Commands:
  status <a, b, ...>   keep only these statuses
  owner <a, b, ...>    keep only these responsible people
  country <a, b, ...>  keep only these countries
                       (blank) picks rows with no value, quote to match text as-is
  clear [field]        remove one constraint, or all of them
  show                 print the dashboard again
  facets               list selectable values
  help                 show this message
  quit                 leave
";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExploreCommand {
    Set(FacetField, Vec<String>),
    Clear(Option<FacetField>),
    Show,
    Facets,
    Help,
    Quit,
    Noop,
}

impl ExploreCommand {
    /// Apply a filter command to `selection`. Returns true when it changed.
    pub fn apply_to(&self, selection: &mut FilterSelection) -> bool {
        let before = selection.clone();
        match self {
            ExploreCommand::Set(field, values) => selection.set(*field, values),
            ExploreCommand::Clear(Some(field)) => selection.clear(*field),
            ExploreCommand::Clear(None) => *selection = FilterSelection::new(),
            _ => return false,
        }
        *selection != before
    }
}

pub fn parse_command(line: &str) -> Result<ExploreCommand, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(ExploreCommand::Noop);
    }

    let (head, rest) = match line.split_once(char::is_whitespace) {
        Some((head, rest)) => (head, rest.trim()),
        None => (line, ""),
    };

    match head.to_ascii_lowercase().as_str() {
        "quit" | "exit" | "q" => Ok(ExploreCommand::Quit),
        "show" => Ok(ExploreCommand::Show),
        "help" | "?" => Ok(ExploreCommand::Help),
        "facets" => Ok(ExploreCommand::Facets),
        "clear" if rest.is_empty() => Ok(ExploreCommand::Clear(None)),
        "clear" => FacetField::parse(rest)
            .map(|f| ExploreCommand::Clear(Some(f)))
            .ok_or_else(|| format!("Unknown field '{}'", rest)),
        other => {
            let field =
                FacetField::parse(other).ok_or_else(|| format!("Unknown command '{}'", head))?;
            if rest.is_empty() {
                return Ok(ExploreCommand::Clear(Some(field)));
            }
            let values = rest.split(',').filter_map(parse_value).collect();
            Ok(ExploreCommand::Set(field, values))
        }
    }
}

/// One comma-separated value. `(blank)` stands for the empty value.
fn parse_value(token: &str) -> Option<String> {
    let token = token.trim();
    if token.eq_ignore_ascii_case(Category::BLANK_LABEL) {
        return Some(String::new());
    }
    if token.len() >= 2 {
        if let Some(inner) = token.strip_prefix('"').and_then(|t| t.strip_suffix('"')) {
            return Some(inner.trim().to_string());
        }
    }
    (!token.is_empty()).then(|| token.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_facet_values() {
        assert_eq!(
            parse_command("status Won,  Lost "),
            Ok(ExploreCommand::Set(
                FacetField::Status,
                vec!["Won".to_string(), "Lost".to_string()]
            ))
        );
        assert_eq!(
            parse_command("Country United Kingdom"),
            Ok(ExploreCommand::Set(
                FacetField::Country,
                vec!["United Kingdom".to_string()]
            ))
        );
    }

    #[test]
    fn blank_token_selects_blank_rows() {
        assert_eq!(
            parse_command("country (blank), US"),
            Ok(ExploreCommand::Set(
                FacetField::Country,
                vec![String::new(), "US".to_string()]
            ))
        );
        assert_eq!(
            parse_command("owner \"(blank)\""),
            Ok(ExploreCommand::Set(FacetField::Owner, vec!["(blank)".to_string()]))
        );
        assert_eq!(
            parse_command("status Won,,"),
            Ok(ExploreCommand::Set(FacetField::Status, vec!["Won".to_string()]))
        );
    }

    #[test]
    fn blank_selection_filters_to_blank_rows() {
        use crate::types::Record;

        let record = |country: &str| Record {
            status: "Won".to_string(),
            owner: "Ana".to_string(),
            country: country.to_string(),
            title: "Deal".to_string(),
            deadline: None,
        };
        let records = vec![record("US"), record(""), record("UK")];

        let mut selection = FilterSelection::new();
        let command = parse_command("country (blank)").unwrap();
        assert!(command.apply_to(&mut selection));

        let kept = crate::filter::apply(&records, &selection);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].country, "");
    }

    #[test]
    fn bare_field_clears_it() {
        assert_eq!(
            parse_command("owner"),
            Ok(ExploreCommand::Clear(Some(FacetField::Owner)))
        );
        assert_eq!(
            parse_command("clear country"),
            Ok(ExploreCommand::Clear(Some(FacetField::Country)))
        );
        assert_eq!(parse_command("clear"), Ok(ExploreCommand::Clear(None)));
    }

    #[test]
    fn control_words() {
        assert_eq!(parse_command(""), Ok(ExploreCommand::Noop));
        assert_eq!(parse_command("  QUIT"), Ok(ExploreCommand::Quit));
        assert_eq!(parse_command("?"), Ok(ExploreCommand::Help));
        assert_eq!(parse_command("facets"), Ok(ExploreCommand::Facets));
        assert_eq!(parse_command("show"), Ok(ExploreCommand::Show));
    }

    #[test]
    fn unknown_input_is_an_error() {
        assert!(parse_command("deadline tomorrow").is_err());
        assert!(parse_command("clear title").is_err());
    }

    #[test]
    fn apply_reports_changes() {
        let mut selection = FilterSelection::new();
        let set = ExploreCommand::Set(FacetField::Status, vec!["Won".to_string()]);
        assert!(set.apply_to(&mut selection));
        assert!(!set.apply_to(&mut selection));
        assert!(selection.status.contains("Won"));

        assert!(ExploreCommand::Clear(None).apply_to(&mut selection));
        assert!(selection.is_unrestricted());
        assert!(!ExploreCommand::Show.apply_to(&mut selection));
    }
}
