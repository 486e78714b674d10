use constellate_engine::{
    Cell, ContentKind, Document, Output, ParseError, Unit,
};
use pretty_assertions::assert_eq;
use serde_json::json;

fn png_output() -> Output {
    Output::display("image/png", json!("aVZCT1J3MEtHZ28="))
}

#[test]
fn title_markdown_then_plot_pair_builds_two_units() {
    let cells = vec![
        Cell::markdown("# Title"),
        Cell::markdown("## Sec"),
        Cell::code("plt.plot(xs)", vec![png_output()]),
    ];
    let doc = Document::from_cells(&cells).unwrap();

    assert_eq!(doc.units().len(), 2);
    assert_eq!(doc.units()[0].kind(), ContentKind::PlainMarkdown);
    assert_eq!(doc.units()[1].kind(), ContentKind::MatplotlibImage);
    assert_eq!(doc.title(), "Title");
    assert_eq!(doc.slug(), "title");
    assert_eq!(doc.breadcrumbs()[1], vec![0]);
}

#[test]
fn derived_metadata_stays_aligned_with_units() {
    let cells = vec![
        Cell::markdown("# Intro"),
        Cell::markdown("## Walkthrough"),
        Cell::code("print('x')", vec![Output::stream("stdout", "x\n")]),
        Cell::markdown("### Detail"),
        Cell::code("1 + 1", vec![Output::display("text/plain", json!("2"))]),
        Cell::markdown("## Appendix"),
    ];
    let doc = Document::from_cells(&cells).unwrap();

    let n = doc.units().len();
    assert_eq!(doc.unit_ids().len(), n);
    assert_eq!(doc.outline().len(), n);
    assert_eq!(doc.breadcrumbs().len(), n);
}

#[test]
fn breadcrumb_parents_are_prior_and_shallower() {
    let cells = vec![
        Cell::markdown("# Top"),
        Cell::markdown("## A"),
        Cell::markdown("no heading prose"),
        Cell::markdown("### A.1"),
        Cell::markdown("## B"),
    ];
    let doc = Document::from_cells(&cells).unwrap();

    for (i, trail) in doc.breadcrumbs().iter().enumerate() {
        if let Some(&parent) = trail.last() {
            assert!(parent < i);
            assert!(doc.outline()[parent].level < doc.outline()[i].level);
        }
    }
    // The headingless unit nests under the nearest heading.
    assert_eq!(doc.breadcrumbs()[2], vec![0, 1]);
}

#[test]
fn every_kept_cell_is_consumed_exactly_once() {
    let cells = vec![
        Cell::markdown("# Title"),
        Cell::code("#constellate: ignore\nscratch()", vec![]),
        Cell::markdown("## Plot"),
        Cell::code("plt.plot(xs)", vec![png_output()]),
        Cell::markdown("## Listing"),
        Cell::code("print('x')", vec![Output::stream("stdout", "x\n")]),
        Cell::markdown("Closing prose."),
    ];
    let doc = Document::from_cells(&cells).unwrap();

    // 6 kept cells: one lone markdown, two pairs, one trailing markdown.
    let consumed: usize = doc
        .units()
        .iter()
        .map(|unit| match unit {
            Unit::PureMarkdown { .. } => 1,
            _ => 2,
        })
        .sum();
    assert_eq!(consumed, 6);
    assert_eq!(doc.units().len(), 4);
}

#[test]
fn construction_is_deterministic() {
    let cells = vec![
        Cell::markdown("# Title"),
        Cell::markdown("## Plot"),
        Cell::code("plt.plot(xs)", vec![png_output()]),
        Cell::markdown("## Table"),
        Cell::code(
            "#constellate: dataframe result\nresult",
            vec![],
        ),
    ];
    let a = Document::from_cells(&cells).unwrap();
    let b = Document::from_cells(&cells).unwrap();

    assert_eq!(a.units(), b.units());
    assert_eq!(a.unit_ids(), b.unit_ids());
    assert_eq!(a.to_value(), b.to_value());
}

#[test]
fn missing_plotly_figure_aborts_the_whole_build() {
    let cells = vec![
        Cell::markdown("# Title"),
        Cell::markdown("## Fine section"),
        Cell::code("print('x')", vec![Output::stream("stdout", "x\n")]),
        Cell::markdown("## Broken chart"),
        Cell::code("px.scatter(df)", vec![]),
    ];
    let err = Document::from_cells(&cells).unwrap_err();
    assert!(matches!(err, ParseError::MissingFigure { kind, .. } if kind == "plotly_chart"));
}

#[test]
fn setup_context_distinguishes_otherwise_identical_units() {
    let base = vec![
        Cell::markdown("# Title"),
        Cell::markdown("## Plot"),
        Cell::code("plt.plot(xs)", vec![png_output()]),
    ];
    let mut themed = base.clone();
    themed.insert(
        0,
        Cell::code("#constellate: setup_matplotlib\nplt.style.use('dark')", vec![]),
    );

    let plain = Document::from_cells(&base).unwrap();
    let themed = Document::from_cells(&themed).unwrap();

    assert_eq!(plain.units(), themed.units());
    assert_ne!(plain.unit_ids(), themed.unit_ids());
}

#[test]
fn directive_overrides_beat_output_sniffing_end_to_end() {
    // PNG output would normally infer matplotlib; the directive pins the
    // cell as a dataframe and names the expression.
    let cells = vec![
        Cell::markdown("# Title"),
        Cell::markdown("## Table"),
        Cell::code(
            "#constellate: dataframe result\nintermediate = f()\nresult",
            vec![png_output()],
        ),
    ];
    let doc = Document::from_cells(&cells).unwrap();
    assert!(matches!(
        &doc.units()[1],
        Unit::MarkdownDataframe { expr, .. } if expr == "result"
    ));
}

#[test]
fn bokeh_source_infers_a_panel_unit_without_outputs() {
    let cells = vec![
        Cell::markdown("# Title"),
        Cell::markdown("## Dashboard"),
        Cell::code("p = bokeh.plotting.figure()", vec![]),
    ];
    let doc = Document::from_cells(&cells).unwrap();
    assert_eq!(doc.units()[1].kind(), ContentKind::InteractivePanel);
}

#[test]
fn plotly_mime_output_wins_without_source_hints() {
    let cells = vec![
        Cell::markdown("# Title"),
        Cell::markdown("## Chart"),
        Cell::code(
            "make_chart()",
            vec![Output::display(
                "application/vnd.plotly.v1+json",
                json!({"data": [], "layout": {}}),
            )],
        ),
    ];
    let doc = Document::from_cells(&cells).unwrap();
    assert_eq!(doc.units()[1].kind(), ContentKind::PlotlyChart);
}
