use serde::Serialize;

use crate::models::Unit;

/// Heading level assigned to units that open with no heading at all.
pub const NO_HEADING: u8 = 4;

/// Heading level and text derived from a unit's markdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutlineEntry {
    pub level: u8,
    pub title: String,
}

/// Derives the per-unit outline from markdown heading lines.
pub fn outline_of(units: &[Unit]) -> Vec<OutlineEntry> {
    units.iter().map(|unit| heading_of(unit.markdown())).collect()
}

/// First heading line wins; `# ` is checked before `## ` before `### `.
pub fn heading_of(markdown: &str) -> OutlineEntry {
    for line in markdown.lines() {
        for (level, prefix) in [(1, "# "), (2, "## "), (3, "### ")] {
            if let Some(title) = line.strip_prefix(prefix) {
                return OutlineEntry {
                    level,
                    title: title.trim().to_string(),
                };
            }
        }
    }
    OutlineEntry {
        level: NO_HEADING,
        title: String::new(),
    }
}

/// Derives each unit's breadcrumb trail: the nearest prior unit with a
/// strictly shallower heading level is the parent, and a unit's trail is its
/// parent's trail extended with the parent's index. Units without an ancestor
/// start a new top-level entry.
pub fn breadcrumbs_of(outline: &[OutlineEntry]) -> Vec<Vec<usize>> {
    let mut trails: Vec<Vec<usize>> = Vec::with_capacity(outline.len());
    for (index, entry) in outline.iter().enumerate() {
        let parent = (0..index).rev().find(|&j| outline[j].level < entry.level);
        let trail = match parent {
            Some(j) => {
                let mut trail = trails[j].clone();
                trail.push(j);
                trail
            }
            None => Vec::new(),
        };
        trails.push(trail);
    }
    trails
}

/// URL-safe form of a title: lowercased, runs of anything non-alphanumeric
/// collapsed to single dashes.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_dash = false;
    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }
    slug
}
