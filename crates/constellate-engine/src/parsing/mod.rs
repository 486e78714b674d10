pub mod directives;
pub mod format;
pub mod inference;
pub mod units;

use std::collections::BTreeSet;

use tracing::debug;

use crate::models::{Backend, Cell, SetupCode, Unit};

use directives::{Directive, parse_line};
use inference::infer;
use units::{TaggedCell, UnitParser};

/// A structural error that aborts document construction. No partial result is
/// ever produced: silently dropped content is worse than a build failure,
/// since the output is reviewed by a human before publishing.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("unknown directive `#constellate: {keyword}` in cell:\n{source_text}")]
    UnknownDirective { keyword: String, source_text: String },

    #[error("could not parse cell (inferred {kind}) after {}:\n{source_text}", previous_or_start(.previous))]
    UnparseableCell {
        kind: String,
        source_text: String,
        previous: Option<String>,
    },

    #[error("no captured figure for {kind} cell, re-run the notebook before building:\n{source_text}")]
    MissingFigure { kind: String, source_text: String },
}

fn previous_or_start(previous: &Option<String>) -> String {
    match previous {
        Some(md) => format!("unit `{md}`"),
        None => "the start of the document".to_string(),
    }
}

/// Outcome of scanning a cell list: setup code partitioned by backend plus
/// the ordered unit sequence.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedNotebook {
    pub setup: SetupCode,
    pub units: Vec<Unit>,
}

/// Resolves a flat cell sequence into typed units.
///
/// Three passes: the directive pass drops blank/ignored cells and routes
/// setup cells into their backend partitions; the inference pass tags every
/// remaining code cell with a content kind; the composition pass consumes the
/// tagged stream greedily, highest-precedence parser first, with no
/// backtracking.
pub fn parse_cells(cells: &[Cell]) -> Result<ParsedNotebook, ParseError> {
    let (setup, kept) = partition_directives(cells)?;
    let tagged = tag_cells(kept)?;
    let units = compose_units(&tagged)?;
    Ok(ParsedNotebook { setup, units })
}

fn partition_directives(cells: &[Cell]) -> Result<(SetupCode, Vec<Cell>), ParseError> {
    let mut setup = SetupCode::new();
    let mut kept = Vec::new();

    for cell in cells {
        if cell.is_blank() {
            continue;
        }
        if let Some(first) = cell.first_line()
            && matches!(parse_line(first), Some(Ok(Directive::Ignore)))
        {
            debug!("dropping ignored cell");
            continue;
        }

        // Setup lines are honored anywhere in the cell; every directive line
        // must carry a known keyword.
        let mut targets: Vec<Option<Backend>> = Vec::new();
        for line in &cell.source {
            match parse_line(line) {
                Some(Err(keyword)) => {
                    return Err(ParseError::UnknownDirective {
                        keyword,
                        source_text: cell.source_text(),
                    });
                }
                Some(Ok(Directive::Setup(target))) => targets.push(target),
                _ => {}
            }
        }

        if targets.is_empty() {
            kept.push(cell.clone());
        } else {
            debug!("adding cell to setup");
            let source = cell.source_text();
            if targets.iter().any(Option::is_none) {
                setup.push_all(&source);
            } else {
                let named: BTreeSet<Backend> = targets.into_iter().flatten().collect();
                for backend in named {
                    setup.push(backend, source.clone());
                }
            }
        }
    }
    Ok((setup, kept))
}

pub(crate) fn tag_cells(cells: Vec<Cell>) -> Result<Vec<TaggedCell>, ParseError> {
    cells
        .into_iter()
        .map(|cell| {
            let kind = cell.is_code().then(|| infer(&cell)).transpose()?;
            Ok(TaggedCell { cell, kind })
        })
        .collect()
}

fn compose_units(tagged: &[TaggedCell]) -> Result<Vec<Unit>, ParseError> {
    let registry = UnitParser::registry();
    let mut units = Vec::new();
    let mut index = 0;

    while index < tagged.len() {
        let rest = &tagged[index..];
        let mut parsed = None;
        for parser in &registry {
            if let Some(hit) = parser.try_parse(rest)? {
                parsed = Some(hit);
                break;
            }
        }
        let Some((consumed, unit)) = parsed else {
            let offending = &rest[0];
            return Err(ParseError::UnparseableCell {
                kind: offending.kind_label(),
                source_text: offending.cell.source_text(),
                previous: units.last().map(|unit: &Unit| preview(unit.markdown())),
            });
        };
        units.push(unit);
        index += consumed;
    }
    Ok(units)
}

/// First line of a markdown body, shortened for diagnostics.
fn preview(markdown: &str) -> String {
    let first = markdown.lines().next().unwrap_or("");
    let truncated: String = first.chars().take(80).collect();
    if truncated.len() < first.len() {
        format!("{truncated}…")
    } else {
        truncated
    }
}
