pub mod document;
pub mod io;
pub mod models;
pub mod parsing;

// Re-export key types for easier usage
pub use document::render::{Artifact, RenderError, RenderJob, Renderer};
pub use document::{Document, outline::OutlineEntry};
pub use io::{NotebookError, notebook_from_file, notebook_from_reader, notebook_from_slice};
pub use models::{Backend, Cell, CellType, ContentKind, Output, SetupCode, Unit};
pub use parsing::{ParseError, ParsedNotebook, parse_cells};
