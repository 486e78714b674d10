use std::cmp::Reverse;

use pulldown_cmark::{CodeBlockKind, Event, Parser, Tag, TagEnd};
use serde_json::Value;
use tracing::warn;

use crate::models::{Cell, ContentKind, Unit, value_text};

use super::ParseError;
use super::directives::{Directive, KindDirective, parse_line, strip_directives};
use super::format::canonical_source;
use super::inference::{
    MIME_HTML, MIME_PLOTLY, MIME_TEXT, MIME_VEGALITE_PREFIX, MIME_WIDGET_VIEW, VEGA_EMBED_MARKER,
};

/// A cell annotated with its inferred content kind (code cells only).
#[derive(Debug, Clone, PartialEq)]
pub struct TaggedCell {
    pub cell: Cell,
    pub kind: Option<ContentKind>,
}

impl TaggedCell {
    /// Kind label for diagnostics.
    pub fn kind_label(&self) -> String {
        match &self.kind {
            Some(kind) => kind.to_string(),
            None => "markdown".to_string(),
        }
    }
}

/// The closed, precedence-ordered set of unit parsers.
///
/// Each variant claims a contiguous run of one or two cells from the front of
/// the stream when its pattern matches. Declaration order breaks precedence
/// ties, exactly as the registry sort relies on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitParser {
    Latex,
    Matplotlib,
    Panel,
    Plotly,
    Vega,
    Widget,
    Dataframe,
    Code,
    PureMarkdown,
}

impl UnitParser {
    pub const ALL: [UnitParser; 9] = [
        UnitParser::Latex,
        UnitParser::Matplotlib,
        UnitParser::Panel,
        UnitParser::Plotly,
        UnitParser::Vega,
        UnitParser::Widget,
        UnitParser::Dataframe,
        UnitParser::Code,
        UnitParser::PureMarkdown,
    ];

    /// Higher parses first. Plain code runs after every figure parser so a
    /// diagram-producing cell is never claimed as plain output; pure markdown
    /// catches whatever remains.
    pub fn precedence(self) -> u8 {
        match self {
            UnitParser::Code => 2,
            UnitParser::PureMarkdown => 1,
            _ => 3,
        }
    }

    /// Parsers in match order: descending precedence, declaration order
    /// within a tier.
    pub fn registry() -> Vec<UnitParser> {
        let mut parsers = UnitParser::ALL.to_vec();
        parsers.sort_by_key(|p| Reverse(p.precedence()));
        parsers
    }

    /// Attempts to parse a unit from the front of `cells`. Returns the number
    /// of cells consumed alongside the unit, or `None` when the pattern does
    /// not match here.
    pub fn try_parse(self, cells: &[TaggedCell]) -> Result<Option<(usize, Unit)>, ParseError> {
        match self {
            UnitParser::Latex => Ok(parse_latex(cells)),
            UnitParser::Matplotlib => Ok(parse_matplotlib(cells)),
            UnitParser::Panel => Ok(parse_panel(cells)),
            UnitParser::Plotly => parse_plotly(cells),
            UnitParser::Vega => parse_vega(cells),
            UnitParser::Widget => parse_widget(cells),
            UnitParser::Dataframe => Ok(parse_dataframe(cells)),
            UnitParser::Code => Ok(parse_code(cells)),
            UnitParser::PureMarkdown => Ok(parse_pure_markdown(cells)),
        }
    }
}

/// Markdown cell followed by a code cell inferred as `want`.
fn plot_pair<'a>(cells: &'a [TaggedCell], want: &ContentKind) -> Option<(&'a Cell, &'a Cell)> {
    let [first, second, ..] = cells else {
        return None;
    };
    (first.cell.is_markdown() && second.cell.is_code() && second.kind.as_ref() == Some(want))
        .then_some((&first.cell, &second.cell))
}

/// Stored form of an executed Python cell: directives stripped, canonically
/// formatted.
fn python_code(cell: &Cell) -> String {
    canonical_source(&strip_directives(&cell.source), "python")
}

fn parse_latex(cells: &[TaggedCell]) -> Option<(usize, Unit)> {
    let [first, second, ..] = cells else {
        return None;
    };
    if !first.cell.is_markdown() || !second.cell.is_markdown() {
        return None;
    }
    match second.cell.first_line().and_then(parse_line) {
        Some(Ok(Directive::Kind(KindDirective::Latex))) => Some((
            2,
            Unit::MarkdownLatex {
                markdown: first.cell.source_text(),
                latex: strip_directives(&second.cell.source),
            },
        )),
        _ => None,
    }
}

fn parse_matplotlib(cells: &[TaggedCell]) -> Option<(usize, Unit)> {
    let (md, code) = plot_pair(cells, &ContentKind::MatplotlibImage)?;
    Some((
        2,
        Unit::MarkdownMatplotlib {
            markdown: md.source_text(),
            code: python_code(code),
            light: None,
            dark: None,
        },
    ))
}

fn parse_panel(cells: &[TaggedCell]) -> Option<(usize, Unit)> {
    let (md, code) = plot_pair(cells, &ContentKind::InteractivePanel)?;
    Some((
        2,
        Unit::MarkdownPanel {
            markdown: md.source_text(),
            code: python_code(code),
        },
    ))
}

/// Plotly cannot synthesize "the current figure" the way matplotlib and panel
/// can, so an unexecuted cell is unrecoverable.
fn parse_plotly(cells: &[TaggedCell]) -> Result<Option<(usize, Unit)>, ParseError> {
    let Some((md, code)) = plot_pair(cells, &ContentKind::PlotlyChart) else {
        return Ok(None);
    };
    let figure = code
        .payload(MIME_PLOTLY)
        .cloned()
        .ok_or_else(|| missing_figure(&ContentKind::PlotlyChart, code))?;
    Ok(Some((
        2,
        Unit::MarkdownPlotly {
            markdown: md.source_text(),
            code: python_code(code),
            figure,
        },
    )))
}

fn parse_vega(cells: &[TaggedCell]) -> Result<Option<(usize, Unit)>, ParseError> {
    let Some((md, code)) = plot_pair(cells, &ContentKind::VegaChart) else {
        return Ok(None);
    };
    let chart = code
        .payload_matching(|mime| mime.starts_with(MIME_VEGALITE_PREFIX))
        .cloned()
        .or_else(|| {
            code.payload_text(MIME_HTML)
                .and_then(|html| carve_vega_spec(&html))
        })
        .ok_or_else(|| missing_figure(&ContentKind::VegaChart, code))?;
    Ok(Some((
        2,
        Unit::MarkdownVega {
            markdown: md.source_text(),
            code: python_code(code),
            chart,
        },
    )))
}

fn parse_widget(cells: &[TaggedCell]) -> Result<Option<(usize, Unit)>, ParseError> {
    let Some((md, code)) = plot_pair(cells, &ContentKind::Ipywidget) else {
        return Ok(None);
    };
    let state = code
        .payload(MIME_WIDGET_VIEW)
        .cloned()
        .ok_or_else(|| missing_figure(&ContentKind::Ipywidget, code))?;
    Ok(Some((
        2,
        Unit::MarkdownWidget {
            markdown: md.source_text(),
            code: python_code(code),
            state,
        },
    )))
}

fn parse_dataframe(cells: &[TaggedCell]) -> Option<(usize, Unit)> {
    let (md, code) = plot_pair(cells, &ContentKind::Dataframe)?;
    let stored = python_code(code);
    let expr = match code.first_line().and_then(parse_line) {
        Some(Ok(Directive::Kind(KindDirective::Dataframe { expr: Some(expr) }))) => expr,
        // Convention: a bare trailing expression statement is the dataframe
        // to show.
        _ => stored
            .lines()
            .rev()
            .find(|line| !line.trim().is_empty())
            .map(|line| line.trim().to_string())
            .unwrap_or_default(),
    };
    Some((
        2,
        Unit::MarkdownDataframe {
            markdown: md.source_text(),
            code: stored,
            expr,
            data: None,
        },
    ))
}

fn parse_code(cells: &[TaggedCell]) -> Option<(usize, Unit)> {
    if let Some((md, code)) = plot_pair(cells, &ContentKind::PlainText) {
        let output = captured_text_output(code);
        if output.is_none() {
            warn!(
                cell = %code.source_text(),
                "no output captured for plain code cell, is that what you wanted?"
            );
        }
        return Some((
            2,
            Unit::MarkdownCode {
                markdown: md.source_text(),
                code: python_code(code),
                lang: "python".to_string(),
                output,
            },
        ));
    }

    // A markdown cell holding nothing but one fenced code block is a
    // non-executed code display unit.
    let first = cells.first()?;
    if first.cell.is_markdown() {
        let stripped = strip_directives(&first.cell.source);
        if let Some((lang, body)) = single_fenced_block(&stripped) {
            return Some((
                1,
                Unit::MarkdownCode {
                    markdown: String::new(),
                    code: canonical_source(&body, &lang),
                    lang,
                    output: None,
                },
            ));
        }
    }
    None
}

fn parse_pure_markdown(cells: &[TaggedCell]) -> Option<(usize, Unit)> {
    let first = cells.first()?;
    first.cell.is_markdown().then(|| {
        (
            1,
            Unit::PureMarkdown {
                markdown: first.cell.source_text(),
            },
        )
    })
}

fn missing_figure(kind: &ContentKind, cell: &Cell) -> ParseError {
    ParseError::MissingFigure {
        kind: kind.to_string(),
        source_text: cell.source_text(),
    }
}

/// First `text/plain` or stdout-named output record, in output order.
fn captured_text_output(cell: &Cell) -> Option<String> {
    for out in &cell.outputs {
        if let Some(text) = out.data.get(MIME_TEXT).and_then(value_text) {
            return Some(text);
        }
        if out.name.as_deref() == Some("stdout")
            && let Some(text) = &out.text
        {
            return Some(text.clone());
        }
    }
    None
}

/// Checks that `markdown` consists of exactly one fenced code block, returning
/// the fence language tag and body.
fn single_fenced_block(markdown: &str) -> Option<(String, String)> {
    let mut events = Parser::new(markdown);
    let lang = match events.next() {
        Some(Event::Start(Tag::CodeBlock(CodeBlockKind::Fenced(info)))) => {
            let tag = info.split_whitespace().next().unwrap_or("");
            if tag.is_empty() { "text" } else { tag }.to_string()
        }
        _ => return None,
    };
    let mut body = String::new();
    loop {
        match events.next() {
            Some(Event::Text(text)) => body.push_str(&text),
            Some(Event::End(TagEnd::CodeBlock)) => break,
            _ => return None,
        }
    }
    events.next().is_none().then_some((lang, body))
}

/// Best-effort extraction of a vega-lite spec from captured HTML: the first
/// balanced JSON object after the embed marker. The embed markup changes
/// across renderer versions, so failure here is an ordinary missing figure.
fn carve_vega_spec(html: &str) -> Option<Value> {
    let marker = html.find(VEGA_EMBED_MARKER)?;
    let open = marker + html[marker..].find('{')?;

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (offset, byte) in html.as_bytes()[open..].iter().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if *byte == b'\\' {
                escaped = true;
            } else if *byte == b'"' {
                in_string = false;
            }
            continue;
        }
        match byte {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return serde_json::from_str(&html[open..open + offset + 1]).ok();
                }
            }
            _ => {}
        }
    }
    None
}
