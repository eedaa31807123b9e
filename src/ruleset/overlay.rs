//! Custom rule overlays: hand written rules spliced into a loaded ruleset

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use super::RuleFile;
use crate::ast::Token;
use crate::evaluator::ConfigurationError;
use crate::parser::parse_bracketed;

const APPEND_ROW: &str = "None";

/// One overlay entry as read from the custom rules file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomRule {
    /// `section:row`, or `section:None` to append to the section
    pub row: String,
    /// New rules in bracketed notation
    #[serde(default)]
    pub rules: String,
    /// Number of existing rules, starting at `row`, the new rules replace
    #[serde(default)]
    pub drop: usize,
}

/// Where an overlay lands
#[derive(Debug, Clone, PartialEq, Eq)]
struct Coordinate {
    section: String,
    /// `None` appends
    row: Option<usize>,
}

impl Coordinate {
    /// Overlays apply back to front so earlier row numbers stay valid
    fn sort_key(&self) -> (&str, usize) {
        (self.section.as_str(), self.row.unwrap_or(usize::MAX))
    }
}

fn overlay_error(row: &str, message: impl Into<String>) -> ConfigurationError {
    ConfigurationError::Overlay {
        row: row.to_string(),
        message: message.into(),
    }
}

impl CustomRule {
    fn coordinate(&self) -> Result<Coordinate, ConfigurationError> {
        if self.row.trim() == APPEND_ROW {
            let message = if self.rules.trim().is_empty() && self.drop == 0 {
                "an empty customization was given, populate or remove it"
            } else {
                "to add or drop rules, give a section and rule row such as processing:3"
            };
            return Err(overlay_error(&self.row, message));
        }

        let (section, row) = self
            .row
            .split_once(':')
            .ok_or_else(|| overlay_error(&self.row, "expected section:row"))?;
        let row = match row.trim() {
            APPEND_ROW => None,
            number => Some(number.parse::<usize>().map_err(|_| {
                overlay_error(&self.row, format!("\"{number}\" is not a rule row"))
            })?),
        };
        if row.is_none() && self.drop > 0 {
            return Err(overlay_error(
                &self.row,
                "dropping rules needs a starting rule row",
            ));
        }
        Ok(Coordinate {
            section: section.trim().to_string(),
            row,
        })
    }
}

/// Read an overlay list from a JSON file
pub fn load_overlays(path: &Path) -> Result<Vec<CustomRule>, ConfigurationError> {
    let to_error = |message: String| ConfigurationError::RuleFile {
        source_name: path.display().to_string(),
        message,
    };
    let text = fs::read_to_string(path).map_err(|err| to_error(err.to_string()))?;
    serde_json::from_str(&text).map_err(|err| to_error(err.to_string()))
}

/// Overlays with their coordinates, in the order they are applied
fn application_order(
    overlays: &[CustomRule],
) -> Result<Vec<(Coordinate, &CustomRule)>, ConfigurationError> {
    let mut placed = overlays
        .iter()
        .map(|overlay| Ok((overlay.coordinate()?, overlay)))
        .collect::<Result<Vec<_>, ConfigurationError>>()?;
    placed.sort_by(|(a, _), (b, _)| b.sort_key().cmp(&a.sort_key()));
    Ok(placed)
}

/// Splice overlays into `file`.
///
/// Overlays apply in descending `section:row` order. With `drop > 0` the
/// rows `[row, row + drop)` are replaced by the new rules; otherwise the
/// new rules go in after `row`, or at the end for `section:None`.
pub fn apply_overlays(file: &mut RuleFile, overlays: &[CustomRule]) -> Result<(), ConfigurationError> {
    for (coordinate, overlay) in application_order(overlays)? {
        let new_rules = parse_bracketed(&overlay.rules)
            .map_err(|err| overlay_error(&overlay.row, format!("parsing problem: {err}")))?;
        let section = file.section_mut(&coordinate.section).ok_or_else(|| {
            overlay_error(
                &overlay.row,
                format!("unable to find rule section \"{}\"", coordinate.section),
            )
        })?;
        let len = section.rules.len();
        for rule in &new_rules {
            log::info!("Parsed new rule: {}", Token::List(rule.clone()));
        }

        match coordinate.row {
            None => section.rules.extend(new_rules),
            Some(row) if overlay.drop > 0 => {
                if row >= len {
                    return Err(overlay_error(
                        &overlay.row,
                        format!("section has {len} rules, can't drop from row {row}"),
                    ));
                }
                let end = (row + overlay.drop).min(len);
                section.rules.splice(row..end, new_rules);
            }
            Some(row) => {
                if row > len {
                    return Err(overlay_error(
                        &overlay.row,
                        format!("section has {len} rules, can't insert after row {row}"),
                    ));
                }
                let at = (row + 1).min(len);
                section.rules.splice(at..at, new_rules);
            }
        }
    }
    Ok(())
}
