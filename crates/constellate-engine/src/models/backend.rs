use std::collections::BTreeMap;

/// A target rendering technology with its own setup-code partition.
///
/// Declaration order is load-bearing: it fixes the order setup blocks are
/// folded into unit fingerprints and the order of `setup_<backend>` keys in
/// the persisted document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Backend {
    Matplotlib,
    Panel,
    Plotly,
    Dataframe,
}

impl Backend {
    pub const ALL: [Backend; 4] = [
        Backend::Matplotlib,
        Backend::Panel,
        Backend::Plotly,
        Backend::Dataframe,
    ];

    /// Wire tag, as used in `#constellate: setup_<tag>` and `setup_<tag>`
    /// document keys.
    pub fn tag(self) -> &'static str {
        match self {
            Backend::Matplotlib => "matplotlib",
            Backend::Panel => "panel",
            Backend::Plotly => "plotly",
            Backend::Dataframe => "dataframe",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Backend> {
        Backend::ALL.into_iter().find(|b| b.tag() == tag)
    }
}

/// Setup-code blocks partitioned by rendering backend, in cell order within
/// each backend.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SetupCode {
    blocks: BTreeMap<Backend, Vec<String>>,
}

impl SetupCode {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a setup block to one backend's list.
    pub fn push(&mut self, backend: Backend, source: String) {
        self.blocks.entry(backend).or_default().push(source);
    }

    /// Appends a setup block to every backend's list.
    pub fn push_all(&mut self, source: &str) {
        for backend in Backend::ALL {
            self.push(backend, source.to_string());
        }
    }

    pub fn for_backend(&self, backend: Backend) -> &[String] {
        self.blocks.get(&backend).map(Vec::as_slice).unwrap_or(&[])
    }

    /// All setup blocks in backend-declaration order, the order the identity
    /// fingerprint consumes them.
    pub fn iter_blocks(&self) -> impl Iterator<Item = &str> {
        Backend::ALL
            .into_iter()
            .flat_map(move |b| self.for_backend(b).iter().map(String::as_str))
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.values().all(Vec::is_empty)
    }
}
