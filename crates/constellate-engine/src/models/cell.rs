use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Notebook cell kind. Anything else in the envelope is rejected at load time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CellType {
    Markdown,
    Code,
}

/// One markdown or code block from a notebook, with its captured execution
/// outputs. Cells are owned by the caller and read-only to the engine.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Cell {
    pub cell_type: CellType,
    /// Source lines. Each line keeps its own trailing newline, matching the
    /// notebook envelope.
    #[serde(default, deserialize_with = "lines_or_string")]
    pub source: Vec<String>,
    /// Captured outputs. Only meaningful for code cells.
    #[serde(default)]
    pub outputs: Vec<Output>,
}

impl Cell {
    /// Builds a markdown cell from flat text, splitting it into envelope-style
    /// lines.
    pub fn markdown(text: &str) -> Self {
        Self {
            cell_type: CellType::Markdown,
            source: split_lines(text),
            outputs: vec![],
        }
    }

    /// Builds a code cell from flat text and its captured outputs.
    pub fn code(text: &str, outputs: Vec<Output>) -> Self {
        Self {
            cell_type: CellType::Code,
            source: split_lines(text),
            outputs,
        }
    }

    pub fn is_markdown(&self) -> bool {
        self.cell_type == CellType::Markdown
    }

    pub fn is_code(&self) -> bool {
        self.cell_type == CellType::Code
    }

    /// Whole source as one string.
    pub fn source_text(&self) -> String {
        self.source.concat()
    }

    pub fn first_line(&self) -> Option<&str> {
        self.source.first().map(|s| s.as_str())
    }

    /// A cell whose source holds no visible text at all.
    pub fn is_blank(&self) -> bool {
        self.source.iter().all(|line| line.trim().is_empty())
    }

    /// Union of MIME type keys across all captured output records.
    pub fn mime_types(&self) -> BTreeSet<&str> {
        self.outputs
            .iter()
            .flat_map(|out| out.data.keys().map(|k| k.as_str()))
            .collect()
    }

    /// First captured payload stored under `mime`, in output order.
    pub fn payload(&self, mime: &str) -> Option<&Value> {
        self.outputs.iter().find_map(|out| out.data.get(mime))
    }

    /// First captured payload whose MIME type satisfies `pred`.
    pub fn payload_matching(&self, pred: impl Fn(&str) -> bool) -> Option<&Value> {
        self.outputs.iter().find_map(|out| {
            out.data
                .iter()
                .find(|(mime, _)| pred(mime.as_str()))
                .map(|(_, v)| v)
        })
    }

    /// First captured payload under `mime`, flattened to text.
    pub fn payload_text(&self, mime: &str) -> Option<String> {
        self.payload(mime).and_then(value_text)
    }

    /// Text of the first stream output named `name` (e.g. `stdout`).
    pub fn stream_text(&self, name: &str) -> Option<String> {
        self.outputs
            .iter()
            .find(|out| out.name.as_deref() == Some(name))
            .and_then(|out| out.text.clone())
    }
}

/// One captured output record: a stream (`name` + `text`) or a display bundle
/// mapping MIME types to payloads.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct Output {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "opt_joined_text")]
    pub text: Option<String>,
    #[serde(default)]
    pub data: BTreeMap<String, Value>,
}

impl Output {
    /// A display bundle with a single MIME payload.
    pub fn display(mime: &str, payload: Value) -> Self {
        Self {
            data: BTreeMap::from([(mime.to_string(), payload)]),
            ..Self::default()
        }
    }

    /// A stream record, e.g. `stdout`.
    pub fn stream(name: &str, text: &str) -> Self {
        Self {
            name: Some(name.to_string()),
            text: Some(text.to_string()),
            ..Self::default()
        }
    }
}

/// Flattens a captured payload to text: a plain string, or a list of line
/// strings joined back together. JSON payloads yield `None`.
pub fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Array(parts) => {
            let mut joined = String::new();
            for part in parts {
                joined.push_str(part.as_str()?);
            }
            Some(joined)
        }
        _ => None,
    }
}

fn split_lines(text: &str) -> Vec<String> {
    text.split_inclusive('\n').map(str::to_string).collect()
}

/// The envelope stores text either as one string or as a list of lines.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawText {
    One(String),
    Many(Vec<String>),
}

fn lines_or_string<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match RawText::deserialize(deserializer)? {
        RawText::One(text) => split_lines(&text),
        RawText::Many(lines) => lines,
    })
}

fn opt_joined_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<RawText>::deserialize(deserializer)?.map(|raw| match raw {
        RawText::One(text) => text,
        RawText::Many(lines) => lines.concat(),
    }))
}
