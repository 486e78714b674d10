use crate::models::{Cell, ContentKind};

use super::ParseError;
use super::directives::{Directive, KindDirective, parse_line};

pub(crate) const MIME_JAVASCRIPT: &str = "application/javascript";
pub(crate) const MIME_WIDGET_VIEW: &str = "application/vnd.jupyter.widget-view+json";
pub(crate) const MIME_PNG: &str = "image/png";
pub(crate) const MIME_PLOTLY: &str = "application/vnd.plotly.v1+json";
pub(crate) const MIME_VEGALITE_PREFIX: &str = "application/vnd.vegalite.";
pub(crate) const MIME_TEXT: &str = "text/plain";
pub(crate) const MIME_HTML: &str = "text/html";

/// Substring rendered by pandas around HTML tables.
pub(crate) const DATAFRAME_MARKER: &str = "class=\"dataframe\"";
/// Substring rendered by vega-embed output HTML.
pub(crate) const VEGA_EMBED_MARKER: &str = "vega-embed";

const MATPLOTLIB_LIBS: [&str; 2] = ["plt", "sns"];
const PANEL_LIBS: [&str; 2] = ["bokeh", "pn"];
const PLOTLY_LIBS: [&str; 2] = ["px", "go"];

/// Decides which content kind a code cell represents.
///
/// Resolution order, first match wins: explicit first-line directive,
/// captured-output MIME sniffing, source-text library heuristic, and finally
/// `PlainText`. Pure and deterministic for identical cell content; ambiguity
/// in the library heuristic (zero or several ecosystems) silently resolves to
/// `PlainText`, which downstream parsers treat as "show code plus any
/// plain-text output".
pub fn infer(cell: &Cell) -> Result<ContentKind, ParseError> {
    if let Some(kind) = directive_override(cell)? {
        return Ok(kind);
    }
    if let Some(kind) = sniff_mime(cell) {
        return Ok(kind);
    }
    if let Some(kind) = sniff_source(&cell.source_text()) {
        return Ok(kind);
    }
    Ok(ContentKind::PlainText)
}

fn directive_override(cell: &Cell) -> Result<Option<ContentKind>, ParseError> {
    let Some(first) = cell.first_line() else {
        return Ok(None);
    };
    match parse_line(first) {
        Some(Ok(Directive::Kind(kind))) => Ok(Some(match kind {
            KindDirective::Matplotlib => ContentKind::MatplotlibImage,
            KindDirective::Panel => ContentKind::InteractivePanel,
            KindDirective::Plotly => ContentKind::PlotlyChart,
            KindDirective::Vega => ContentKind::VegaChart,
            KindDirective::Widget => ContentKind::Ipywidget,
            KindDirective::Plain => ContentKind::PlainText,
            KindDirective::Latex => ContentKind::LatexBlock,
            KindDirective::Dataframe { .. } => ContentKind::Dataframe,
        })),
        Some(Ok(_)) => Ok(None),
        Some(Err(keyword)) => Err(ParseError::UnknownDirective {
            keyword,
            source_text: cell.source_text(),
        }),
        None => Ok(None),
    }
}

/// Fixed-priority MIME table over the union of captured output types, with an
/// HTML-body sniff as the lowest tier.
fn sniff_mime(cell: &Cell) -> Option<ContentKind> {
    let mimes = cell.mime_types();
    if mimes.contains(MIME_JAVASCRIPT) || mimes.contains(MIME_WIDGET_VIEW) {
        return Some(ContentKind::InteractivePanel);
    }
    if mimes.contains(MIME_PNG) {
        return Some(ContentKind::MatplotlibImage);
    }
    if mimes.contains(MIME_PLOTLY) {
        return Some(ContentKind::PlotlyChart);
    }
    if mimes.iter().any(|m| m.starts_with(MIME_VEGALITE_PREFIX)) {
        return Some(ContentKind::VegaChart);
    }

    if mimes.contains(MIME_TEXT) && mimes.contains(MIME_HTML) {
        let html = cell.payload_text(MIME_HTML)?;
        let dataframe = html.contains(DATAFRAME_MARKER);
        let vega = html.contains(VEGA_EMBED_MARKER);
        return match (dataframe, vega) {
            (true, false) => Some(ContentKind::Dataframe),
            (false, true) => Some(ContentKind::VegaChart),
            _ => None,
        };
    }
    None
}

/// Library-abbreviation heuristic: exactly one plotting ecosystem mentioned
/// in the source wins; anything else falls through.
fn sniff_source(source: &str) -> Option<ContentKind> {
    let candidates = [
        (ContentKind::MatplotlibImage, uses_any(source, &MATPLOTLIB_LIBS)),
        (ContentKind::InteractivePanel, uses_any(source, &PANEL_LIBS)),
        (ContentKind::PlotlyChart, uses_any(source, &PLOTLY_LIBS)),
    ];
    let mut matched = candidates.into_iter().filter_map(|(kind, hit)| hit.then_some(kind));
    match (matched.next(), matched.next()) {
        (Some(kind), None) => Some(kind),
        _ => None,
    }
}

fn uses_any(source: &str, libs: &[&str]) -> bool {
    libs.iter().any(|lib| source.contains(&format!("{lib}.")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Output;
    use rstest::rstest;
    use serde_json::json;

    #[test]
    fn directive_beats_everything() {
        // Last line is a bare expression and there is a PNG output, but the
        // directive decides.
        let cell = Cell::code(
            "#constellate: dataframe result\nresult",
            vec![Output::display(MIME_PNG, json!("aGk="))],
        );
        assert_eq!(infer(&cell).unwrap(), ContentKind::Dataframe);
    }

    #[test]
    fn unknown_directive_is_fatal() {
        let cell = Cell::code("#constellate: sparkle\nx", vec![]);
        assert!(matches!(
            infer(&cell),
            Err(ParseError::UnknownDirective { keyword, .. }) if keyword == "sparkle"
        ));
    }

    #[rstest]
    #[case(MIME_PLOTLY, ContentKind::PlotlyChart)]
    #[case(MIME_PNG, ContentKind::MatplotlibImage)]
    #[case(MIME_JAVASCRIPT, ContentKind::InteractivePanel)]
    #[case(MIME_WIDGET_VIEW, ContentKind::InteractivePanel)]
    #[case("application/vnd.vegalite.v4+json", ContentKind::VegaChart)]
    fn mime_sniffing_uses_priority_table(#[case] mime: &str, #[case] expected: ContentKind) {
        // No plotting libraries in the source at all.
        let cell = Cell::code("make_chart()", vec![Output::display(mime, json!({}))]);
        assert_eq!(infer(&cell).unwrap(), expected);
    }

    #[test]
    fn widget_mime_outranks_png() {
        let cell = Cell::code(
            "interact()",
            vec![
                Output::display(MIME_PNG, json!("aGk=")),
                Output::display(MIME_WIDGET_VIEW, json!({"model_id": "abc"})),
            ],
        );
        assert_eq!(infer(&cell).unwrap(), ContentKind::InteractivePanel);
    }

    fn text_and_html(text: serde_json::Value, html: serde_json::Value) -> Output {
        let mut out = Output::display(MIME_TEXT, text);
        out.data.insert(MIME_HTML.to_string(), html);
        out
    }

    #[test]
    fn html_body_sniff_detects_dataframes() {
        let cell = Cell::code(
            "df.head()",
            vec![text_and_html(
                json!("   a  b"),
                json!("<table border=\"1\" class=\"dataframe\">...</table>"),
            )],
        );
        assert_eq!(infer(&cell).unwrap(), ContentKind::Dataframe);
    }

    #[test]
    fn html_body_sniff_with_both_markers_falls_through() {
        let html = "<div class=\"vega-embed\"><table class=\"dataframe\"></table></div>";
        let cell = Cell::code(
            "thing",
            vec![text_and_html(json!("repr"), json!(html))],
        );
        assert_eq!(infer(&cell).unwrap(), ContentKind::PlainText);
    }

    #[rstest]
    #[case("fig, ax = plt.subplots()", ContentKind::MatplotlibImage)]
    #[case("sns.histplot(data)", ContentKind::MatplotlibImage)]
    #[case("bokeh.plotting.show(p)", ContentKind::InteractivePanel)]
    #[case("pn.Column(widget)", ContentKind::InteractivePanel)]
    #[case("px.scatter(df, x='a')", ContentKind::PlotlyChart)]
    fn source_heuristic_detects_single_ecosystem(
        #[case] source: &str,
        #[case] expected: ContentKind,
    ) {
        let cell = Cell::code(source, vec![]);
        assert_eq!(infer(&cell).unwrap(), expected);
    }

    #[rstest]
    #[case("print('hello')")]
    // Two ecosystems: silent fallback, not an error.
    #[case("plt.plot(xs); pn.Column()")]
    fn ambiguous_or_plain_source_defaults_to_plain_text(#[case] source: &str) {
        let cell = Cell::code(source, vec![]);
        assert_eq!(infer(&cell).unwrap(), ContentKind::PlainText);
    }

    #[test]
    fn inference_is_deterministic() {
        let cell = Cell::code("plt.plot(xs)", vec![]);
        assert_eq!(infer(&cell).unwrap(), infer(&cell).unwrap());
    }
}
