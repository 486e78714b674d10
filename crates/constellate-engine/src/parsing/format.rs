/// Maximum run of blank lines canonical Python keeps.
const MAX_BLANK_RUN: usize = 2;

/// Canonical source formatting for stored code.
///
/// Semantically identical code must always serialize identically, because
/// unit identifiers are content fingerprints over the serialized form.
/// Python is normalized line by line: trailing whitespace stripped, leading
/// and trailing blank lines dropped, interior blank runs capped, no trailing
/// newline. Other languages pass through unformatted.
pub fn canonical_source(code: &str, lang: &str) -> String {
    if lang != "python" {
        return code.to_string();
    }

    let lines: Vec<&str> = code.lines().map(str::trim_end).collect();
    let first = lines.iter().position(|l| !l.is_empty());
    let last = lines.iter().rposition(|l| !l.is_empty());
    let (Some(first), Some(last)) = (first, last) else {
        return String::new();
    };

    let mut out = Vec::with_capacity(last - first + 1);
    let mut blank_run = 0;
    for line in &lines[first..=last] {
        if line.is_empty() {
            blank_run += 1;
            if blank_run > MAX_BLANK_RUN {
                continue;
            }
        } else {
            blank_run = 0;
        }
        out.push(*line);
    }
    out.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn strips_trailing_whitespace_and_outer_blanks() {
        let code = "\n\nx = 1   \ny = 2\t\n\n\n";
        assert_eq!(canonical_source(code, "python"), "x = 1\ny = 2");
    }

    #[test]
    fn caps_interior_blank_runs() {
        let code = "a = 1\n\n\n\n\nb = 2";
        assert_eq!(canonical_source(code, "python"), "a = 1\n\n\nb = 2");
    }

    #[test]
    fn is_idempotent() {
        let code = "import numpy as np  \n\n\n\ndef f():\n    return 1\n";
        let once = canonical_source(code, "python");
        assert_eq!(canonical_source(&once, "python"), once);
    }

    #[test]
    fn equivalent_cells_normalize_identically() {
        let a = "plt.plot(xs)  \nplt.show()\n\n";
        let b = "\nplt.plot(xs)\nplt.show()";
        assert_eq!(
            canonical_source(a, "python"),
            canonical_source(b, "python")
        );
    }

    #[test]
    fn foreign_languages_pass_through() {
        let code = "flowchart TD   \n\n\n  A --> B\n";
        assert_eq!(canonical_source(code, "mermaid"), code);
    }

    #[test]
    fn empty_python_normalizes_to_empty() {
        assert_eq!(canonical_source("\n  \n", "python"), "");
    }
}
