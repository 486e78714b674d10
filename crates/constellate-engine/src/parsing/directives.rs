use std::sync::LazyLock;

use regex::Regex;

use crate::models::Backend;

/// Prefix shared by every structural metadata comment.
pub const DIRECTIVE_PREFIX: &str = "#constellate";

static DIRECTIVE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*#constellate:\s*(\S+)\s*(.*?)\s*$").expect("directive grammar compiles")
});

/// A recognized `#constellate: <keyword>` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    /// Drop the cell entirely.
    Ignore,
    /// Route the cell's full source into the setup list for one backend, or
    /// all backends when unqualified.
    Setup(Option<Backend>),
    /// Per-cell rendering-kind override.
    Kind(KindDirective),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KindDirective {
    Matplotlib,
    Panel,
    Plotly,
    Vega,
    Widget,
    Plain,
    Latex,
    Dataframe {
        /// Explicit extraction expression, e.g. `#constellate: dataframe result`.
        expr: Option<String>,
    },
}

/// Recognizes one source line.
///
/// Returns `None` for ordinary lines, `Some(Ok(_))` for a well-formed
/// directive, and `Some(Err(keyword))` for a directive-shaped line with an
/// unrecognized keyword. Keywords are case-insensitive; trailing tokens are
/// ignored except for the dataframe expression, which keeps its original
/// spelling.
pub fn parse_line(line: &str) -> Option<Result<Directive, String>> {
    let captures = DIRECTIVE_RE.captures(line)?;
    let keyword = captures[1].to_lowercase();
    let rest = captures.get(2).map(|m| m.as_str()).unwrap_or("");

    let directive = match keyword.as_str() {
        "ignore" => Directive::Ignore,
        "setup" => Directive::Setup(None),
        "matplotlib" => Directive::Kind(KindDirective::Matplotlib),
        "panel" => Directive::Kind(KindDirective::Panel),
        "plotly" => Directive::Kind(KindDirective::Plotly),
        "vega" => Directive::Kind(KindDirective::Vega),
        "widget" => Directive::Kind(KindDirective::Widget),
        "plain" => Directive::Kind(KindDirective::Plain),
        "latex" => Directive::Kind(KindDirective::Latex),
        "dataframe" => Directive::Kind(KindDirective::Dataframe {
            expr: (!rest.is_empty()).then(|| rest.to_string()),
        }),
        _ => match keyword.strip_prefix("setup_").and_then(Backend::from_tag) {
            Some(backend) => Directive::Setup(Some(backend)),
            None => return Some(Err(keyword)),
        },
    };
    Some(Ok(directive))
}

/// Drops directive lines from a cell's source, joining what remains. This is
/// the form code is stored in before canonical formatting.
pub fn strip_directives(source: &[String]) -> String {
    source
        .iter()
        .filter(|line| !is_directive_line(line))
        .map(String::as_str)
        .collect()
}

fn is_directive_line(line: &str) -> bool {
    let trimmed = line.trim_start().as_bytes();
    trimmed.len() >= DIRECTIVE_PREFIX.len()
        && trimmed[..DIRECTIVE_PREFIX.len()].eq_ignore_ascii_case(DIRECTIVE_PREFIX.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("#constellate: ignore", Directive::Ignore)]
    #[case("  #CONSTELLATE: Ignore  ", Directive::Ignore)]
    #[case("#constellate: setup", Directive::Setup(None))]
    #[case("#constellate: setup_plotly", Directive::Setup(Some(Backend::Plotly)))]
    #[case("#constellate: matplotlib", Directive::Kind(KindDirective::Matplotlib))]
    #[case("#constellate: panel extra tokens", Directive::Kind(KindDirective::Panel))]
    #[case("#constellate: latex", Directive::Kind(KindDirective::Latex))]
    fn recognizes_directives(#[case] line: &str, #[case] expected: Directive) {
        assert_eq!(parse_line(line), Some(Ok(expected)));
    }

    #[test]
    fn dataframe_expression_keeps_case() {
        assert_eq!(
            parse_line("#constellate: DATAFRAME df.head(10)"),
            Some(Ok(Directive::Kind(KindDirective::Dataframe {
                expr: Some("df.head(10)".to_string())
            })))
        );
        assert_eq!(
            parse_line("#constellate: dataframe"),
            Some(Ok(Directive::Kind(KindDirective::Dataframe { expr: None })))
        );
    }

    #[test]
    fn unknown_keywords_are_reported() {
        assert_eq!(
            parse_line("#constellate: bogus"),
            Some(Err("bogus".to_string()))
        );
        assert_eq!(
            parse_line("#constellate: setup_bogus"),
            Some(Err("setup_bogus".to_string()))
        );
    }

    #[test]
    fn ordinary_lines_are_not_directives() {
        assert_eq!(parse_line("import numpy as np"), None);
        assert_eq!(parse_line("# constellate is a tool"), None);
        assert_eq!(parse_line("#constellated: nope"), None);
    }

    #[test]
    fn strip_directives_removes_metadata_lines() {
        let source = vec![
            "#constellate: matplotlib\n".to_string(),
            "plt.plot(xs)\n".to_string(),
            "  #Constellate: setup\n".to_string(),
            "plt.show()".to_string(),
        ];
        assert_eq!(strip_directives(&source), "plt.plot(xs)\nplt.show()");
    }
}
