use std::fs;
use std::io::Read;
use std::path::Path;

use serde::Deserialize;

use crate::models::Cell;

#[derive(Debug, thiserror::Error)]
pub enum NotebookError {
    #[error("failed to read notebook: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed notebook: {0}")]
    Json(#[from] serde_json::Error),
    #[error("malformed notebook: no cell list")]
    MissingCells,
}

/// The notebook file's outer envelope. Everything except the cell list is
/// ignored.
#[derive(Deserialize)]
struct Envelope {
    cells: Option<Vec<Cell>>,
}

/// Loads the cell list from notebook JSON bytes.
pub fn notebook_from_slice(bytes: &[u8]) -> Result<Vec<Cell>, NotebookError> {
    let envelope: Envelope = serde_json::from_slice(bytes)?;
    envelope.cells.ok_or(NotebookError::MissingCells)
}

/// Loads the cell list from a reader of notebook JSON.
pub fn notebook_from_reader(mut reader: impl Read) -> Result<Vec<Cell>, NotebookError> {
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;
    notebook_from_slice(&bytes)
}

/// Loads the cell list from a notebook file. The `.ipynb` extension is not
/// required.
pub fn notebook_from_file(path: &Path) -> Result<Vec<Cell>, NotebookError> {
    notebook_from_slice(&fs::read(path)?)
}
