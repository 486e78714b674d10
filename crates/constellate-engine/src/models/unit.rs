use std::fmt;

use serde::Serialize;
use serde_json::Value;

use super::backend::Backend;

/// The closed set of rendering categories a unit may belong to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentKind {
    PlainText,
    CodeDiagram(String),
    MatplotlibImage,
    InteractivePanel,
    PlotlyChart,
    VegaChart,
    Ipywidget,
    Dataframe,
    LatexBlock,
    PlainMarkdown,
}

impl ContentKind {
    pub fn name(&self) -> &'static str {
        match self {
            ContentKind::PlainText => "plain_text",
            ContentKind::CodeDiagram(_) => "code_diagram",
            ContentKind::MatplotlibImage => "matplotlib_image",
            ContentKind::InteractivePanel => "interactive_panel",
            ContentKind::PlotlyChart => "plotly_chart",
            ContentKind::VegaChart => "vega_chart",
            ContentKind::Ipywidget => "ipywidget",
            ContentKind::Dataframe => "dataframe",
            ContentKind::LatexBlock => "latex_block",
            ContentKind::PlainMarkdown => "plain_markdown",
        }
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContentKind::CodeDiagram(lang) => write!(f, "code_diagram({lang})"),
            other => f.write_str(other.name()),
        }
    }
}

/// One semantically atomic content element of the output document: a markdown
/// block paired with an optional rendering payload.
///
/// Units are constructed only during parsing and never mutated structurally
/// afterwards; the `Option` artifact fields (`light`/`dark`/`df_json`) are the
/// only state filled in post-construction, by an external renderer.
///
/// Serialized field names follow the persisted document format.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Unit {
    PureMarkdown {
        markdown: String,
    },
    MarkdownCode {
        markdown: String,
        code: String,
        lang: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        output: Option<String>,
    },
    MarkdownMatplotlib {
        markdown: String,
        #[serde(rename = "matplotlib")]
        code: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        light: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        dark: Option<String>,
    },
    MarkdownPanel {
        markdown: String,
        #[serde(rename = "panel")]
        code: String,
    },
    MarkdownPlotly {
        markdown: String,
        #[serde(rename = "plotly")]
        code: String,
        figure: Value,
    },
    MarkdownVega {
        markdown: String,
        #[serde(rename = "vega")]
        code: String,
        chart: Value,
    },
    MarkdownWidget {
        markdown: String,
        #[serde(rename = "widget")]
        code: String,
        state: Value,
    },
    MarkdownDataframe {
        markdown: String,
        code: String,
        expr: String,
        #[serde(rename = "df_json", skip_serializing_if = "Option::is_none")]
        data: Option<Value>,
    },
    MarkdownLatex {
        markdown: String,
        latex: String,
    },
}

impl Unit {
    pub fn kind(&self) -> ContentKind {
        match self {
            Unit::PureMarkdown { .. } => ContentKind::PlainMarkdown,
            Unit::MarkdownCode { lang, .. } => {
                if lang == "python" {
                    ContentKind::PlainText
                } else {
                    ContentKind::CodeDiagram(lang.clone())
                }
            }
            Unit::MarkdownMatplotlib { .. } => ContentKind::MatplotlibImage,
            Unit::MarkdownPanel { .. } => ContentKind::InteractivePanel,
            Unit::MarkdownPlotly { .. } => ContentKind::PlotlyChart,
            Unit::MarkdownVega { .. } => ContentKind::VegaChart,
            Unit::MarkdownWidget { .. } => ContentKind::Ipywidget,
            Unit::MarkdownDataframe { .. } => ContentKind::Dataframe,
            Unit::MarkdownLatex { .. } => ContentKind::LatexBlock,
        }
    }

    pub fn markdown(&self) -> &str {
        match self {
            Unit::PureMarkdown { markdown }
            | Unit::MarkdownCode { markdown, .. }
            | Unit::MarkdownMatplotlib { markdown, .. }
            | Unit::MarkdownPanel { markdown, .. }
            | Unit::MarkdownPlotly { markdown, .. }
            | Unit::MarkdownVega { markdown, .. }
            | Unit::MarkdownWidget { markdown, .. }
            | Unit::MarkdownDataframe { markdown, .. }
            | Unit::MarkdownLatex { markdown, .. } => markdown,
        }
    }

    /// Source code carried by this unit, if any.
    pub fn code(&self) -> Option<&str> {
        match self {
            Unit::MarkdownCode { code, .. }
            | Unit::MarkdownMatplotlib { code, .. }
            | Unit::MarkdownPanel { code, .. }
            | Unit::MarkdownPlotly { code, .. }
            | Unit::MarkdownVega { code, .. }
            | Unit::MarkdownWidget { code, .. }
            | Unit::MarkdownDataframe { code, .. } => Some(code),
            Unit::PureMarkdown { .. } | Unit::MarkdownLatex { .. } => None,
        }
    }

    /// The rendering backend whose setup code scopes this unit's execution.
    pub fn backend(&self) -> Option<Backend> {
        match self {
            Unit::MarkdownMatplotlib { .. } => Some(Backend::Matplotlib),
            Unit::MarkdownPanel { .. } => Some(Backend::Panel),
            Unit::MarkdownPlotly { .. } => Some(Backend::Plotly),
            Unit::MarkdownDataframe { .. } => Some(Backend::Dataframe),
            _ => None,
        }
    }
}
