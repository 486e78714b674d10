use serde_json::Value;

use crate::models::Backend;

/// Failure while enriching a document with rendered artifacts.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("renderer failed for unit {unit}: {cause:#}")]
    Failed { unit: usize, cause: anyhow::Error },

    #[error("artifact {got} does not fit unit {unit} ({expected})")]
    ArtifactMismatch {
        unit: usize,
        expected: String,
        got: String,
    },
}

/// A rendered artifact handed back by the external renderer.
#[derive(Debug, Clone, PartialEq)]
pub enum Artifact {
    /// Light/dark themed raster images as data URIs.
    Images { light: String, dark: String },
    /// Serialized table rows extracted from a dataframe expression.
    Rows(Value),
}

impl Artifact {
    pub fn name(&self) -> &'static str {
        match self {
            Artifact::Images { .. } => "images",
            Artifact::Rows(_) => "rows",
        }
    }
}

/// Everything an external renderer needs to materialize one unit's artifact:
/// the unit's code plus the setup blocks for its backend, re-established in
/// each unit's execution scope.
///
/// Rendering executes untrusted notebook code. The engine never evaluates
/// source text itself; callers should invoke the renderer with process-level
/// isolation of their choosing, once per unit, in any order or in parallel.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderJob {
    /// Index of the unit inside the document.
    pub unit: usize,
    pub backend: Backend,
    /// Setup blocks for `backend`, in cell order.
    pub setup: Vec<String>,
    pub code: String,
    /// Dataframe extraction expression, when the unit has one.
    pub expr: Option<String>,
}

/// External collaborator that executes a render job and produces an artifact.
///
/// Implementations own their execution contexts: per-backend state that is
/// expensive to compute in setup code is meant to be established once per
/// backend and cheaply duplicated per unit, with non-duplicable resources
/// (live connections, loaded modules) shared by reference across the
/// backend's units.
pub trait Renderer {
    fn render(&mut self, job: &RenderJob) -> Result<Artifact, anyhow::Error>;
}
