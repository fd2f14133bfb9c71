/// Url prefixes the requester may see. An empty filter allows nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PermissionFilter {
    prefixes: Vec<String>,
    allow_all: bool,
}

impl PermissionFilter {
    pub fn new<I, S>(prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        PermissionFilter {
            prefixes: prefixes.into_iter().map(Into::into).collect(),
            allow_all: false,
        }
    }

    /// For trusted callers
    pub fn allow_all() -> Self {
        PermissionFilter {
            prefixes: Vec::new(),
            allow_all: true,
        }
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefixes.push(prefix.into());
        self
    }

    pub fn allows(&self, url: &str) -> bool {
        self.allow_all || self.prefixes.iter().any(|p| url.starts_with(p.as_str()))
    }
}
