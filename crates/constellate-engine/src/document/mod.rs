pub mod identity;
pub mod outline;
pub mod render;

use serde_json::{Value, json};

use crate::models::{Backend, Cell, SetupCode, Unit};
use crate::parsing::{ParseError, parse_cells};

use outline::OutlineEntry;
use render::{Artifact, RenderError, RenderJob, Renderer};

/// The full ordered collection of units plus setup code and derived
/// navigation metadata for one notebook.
///
/// Built atomically from a cell list: either the whole document parses or
/// construction fails with the first structural error. After construction the
/// unit sequence, identifiers, outline and breadcrumbs never change; external
/// renderers only fill in per-unit artifact payloads.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    setup: SetupCode,
    units: Vec<Unit>,
    unit_ids: Vec<String>,
    outline: Vec<OutlineEntry>,
    breadcrumbs: Vec<Vec<usize>>,
    title: String,
    slug: String,
}

impl Document {
    /// Builds a document from a notebook's cell list.
    pub fn from_cells(cells: &[Cell]) -> Result<Self, ParseError> {
        let parsed = parse_cells(cells)?;
        let outline = outline::outline_of(&parsed.units);
        let breadcrumbs = outline::breadcrumbs_of(&outline);
        // The first unit is assumed to open with the document's title,
        // whatever its heading level.
        let title = outline
            .first()
            .map(|entry| entry.title.clone())
            .unwrap_or_default();
        let slug = outline::slugify(&title);
        let unit_ids = parsed
            .units
            .iter()
            .map(|unit| identity::unit_id(&parsed.setup, unit))
            .collect();

        Ok(Self {
            setup: parsed.setup,
            units: parsed.units,
            unit_ids,
            outline,
            breadcrumbs,
            title,
            slug,
        })
    }

    pub fn units(&self) -> &[Unit] {
        &self.units
    }

    pub fn unit_ids(&self) -> &[String] {
        &self.unit_ids
    }

    pub fn outline(&self) -> &[OutlineEntry] {
        &self.outline
    }

    pub fn breadcrumbs(&self) -> &[Vec<usize>] {
        &self.breadcrumbs
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn slug(&self) -> &str {
        &self.slug
    }

    pub fn setup(&self) -> &SetupCode {
        &self.setup
    }

    /// Render jobs for every unit whose artifact is still pending, scoped to
    /// the unit's backend setup code.
    pub fn render_jobs(&self) -> Vec<RenderJob> {
        self.units
            .iter()
            .enumerate()
            .filter_map(|(index, unit)| {
                let (code, expr) = match unit {
                    Unit::MarkdownMatplotlib {
                        code, light: None, ..
                    } => (code.clone(), None),
                    Unit::MarkdownDataframe {
                        code,
                        expr,
                        data: None,
                        ..
                    } => (code.clone(), Some(expr.clone())),
                    _ => return None,
                };
                let backend = unit.backend()?;
                Some(RenderJob {
                    unit: index,
                    backend,
                    setup: self.setup.for_backend(backend).to_vec(),
                    code,
                    expr,
                })
            })
            .collect()
    }

    /// The standalone source bundle (setup plus unit code) used to stand up a
    /// live interactive session for a panel unit. `None` for other kinds.
    pub fn panel_source(&self, index: usize) -> Option<String> {
        match self.units.get(index)? {
            Unit::MarkdownPanel { code, .. } => {
                let mut parts: Vec<&str> = self
                    .setup
                    .for_backend(Backend::Panel)
                    .iter()
                    .map(String::as_str)
                    .collect();
                parts.push(code);
                Some(parts.join("\n\n"))
            }
            _ => None,
        }
    }

    /// Drives the renderer over every pending job and attaches the returned
    /// artifacts. Units render independently; callers wanting parallelism or
    /// isolation can run `render_jobs` themselves and feed
    /// [`Document::attach_artifact`].
    pub fn render_with(&mut self, renderer: &mut dyn Renderer) -> Result<(), RenderError> {
        for job in self.render_jobs() {
            let artifact = renderer
                .render(&job)
                .map_err(|cause| RenderError::Failed {
                    unit: job.unit,
                    cause,
                })?;
            self.attach_artifact(job.unit, artifact)?;
        }
        Ok(())
    }

    /// Fills one unit's artifact payload. The only mutation a document
    /// admits after construction.
    pub fn attach_artifact(
        &mut self,
        index: usize,
        artifact: Artifact,
    ) -> Result<(), RenderError> {
        let Some(unit) = self.units.get_mut(index) else {
            return Err(RenderError::ArtifactMismatch {
                unit: index,
                expected: "no unit at this index".to_string(),
                got: artifact.name().to_string(),
            });
        };
        match (unit, artifact) {
            (
                Unit::MarkdownMatplotlib { light, dark, .. },
                Artifact::Images {
                    light: l,
                    dark: d,
                },
            ) => {
                *light = Some(l);
                *dark = Some(d);
                Ok(())
            }
            (Unit::MarkdownDataframe { data, .. }, Artifact::Rows(rows)) => {
                *data = Some(rows);
                Ok(())
            }
            (unit, artifact) => Err(RenderError::ArtifactMismatch {
                unit: index,
                expected: unit.kind().to_string(),
                got: artifact.name().to_string(),
            }),
        }
    }

    /// The persisted document: setup per backend, units annotated with their
    /// identifiers, and the derived navigation metadata.
    pub fn to_value(&self) -> Value {
        let mut root = serde_json::Map::new();
        for backend in Backend::ALL {
            root.insert(
                format!("setup_{}", backend.tag()),
                json!(self.setup.for_backend(backend)),
            );
        }

        let units: Vec<Value> = self
            .units
            .iter()
            .zip(&self.unit_ids)
            .map(|(unit, id)| {
                let mut value =
                    serde_json::to_value(unit).expect("unit serialization cannot fail");
                value
                    .as_object_mut()
                    .expect("units serialize as objects")
                    .insert("unit_id".to_string(), json!(id));
                value
            })
            .collect();
        root.insert("units".to_string(), Value::Array(units));

        root.insert("breadcrumbs".to_string(), json!(self.breadcrumbs));
        root.insert("title".to_string(), json!(self.title));
        root.insert("slug".to_string(), json!(self.slug));
        root.insert(
            "unit_titles".to_string(),
            json!(
                self.outline
                    .iter()
                    .map(|entry| entry.title.as_str())
                    .collect::<Vec<_>>()
            ),
        );
        Value::Object(root)
    }

    /// Pretty-printed persisted form, ready to write to a `.constellate`
    /// file.
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(&self.to_value()).expect("document serialization cannot fail")
    }
}
