//! What a client knows about the repository it is talking to.

use super::cache::PropertyCache;

/// Per-connection repository state: location, discovered identifiers and
/// the property cache.
///
/// A context is not internally synchronized; concurrent resolvers use one
/// context each.
#[derive(Debug, Clone)]
pub struct RepositoryContext {
    location: String,
    uuid: Option<String>,
    root_path: Option<String>,
    cache: PropertyCache,
}

impl RepositoryContext {
    /// Create a context for a repository URL such as
    /// `svn+ssh://svn.example.com/repos/project/trunk`.
    pub fn new(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            uuid: None,
            root_path: None,
            cache: PropertyCache::new(),
        }
    }

    /// The current location URL.
    #[must_use]
    pub fn location(&self) -> &str {
        &self.location
    }

    /// Point the context at another URL. Cached properties are dropped;
    /// discovered identifiers are kept.
    pub fn set_location(&mut self, location: impl Into<String>) {
        self.location = location.into();
        self.cache.clear();
    }

    /// Scheme and authority of the location, e.g. `svn+ssh://host:2222`.
    #[must_use]
    pub fn origin(&self) -> &str {
        let Some(scheme_end) = self.location.find("://") else {
            return "";
        };
        let authority = scheme_end + 3;
        match self.location[authority..].find('/') {
            Some(slash) => &self.location[..authority + slash],
            None => &self.location,
        }
    }

    /// Path component of the location.
    #[must_use]
    pub fn path(&self) -> &str {
        let origin = self.origin().len();
        match &self.location[origin..] {
            "" => "/",
            path => path,
        }
    }

    /// The repository UUID, once known.
    #[must_use]
    pub fn uuid(&self) -> Option<&str> {
        self.uuid.as_deref()
    }

    /// Record the repository UUID.
    pub fn set_uuid(&mut self, uuid: impl Into<String>) {
        self.uuid = Some(uuid.into());
    }

    /// Path of the repository root on the server, once known.
    #[must_use]
    pub fn root_path(&self) -> Option<&str> {
        self.root_path.as_deref()
    }

    /// Record the repository root path.
    pub fn set_root_path(&mut self, root: impl Into<String>) {
        self.root_path = Some(root.into());
    }

    /// URL of the repository root, once known.
    #[must_use]
    pub fn root_url(&self) -> Option<String> {
        self.root_path
            .as_deref()
            .map(|root| format!("{}{}", self.origin(), root))
    }

    /// The property cache.
    #[must_use]
    pub const fn cache(&self) -> &PropertyCache {
        &self.cache
    }

    /// Mutable access to the property cache.
    pub fn cache_mut(&mut self) -> &mut PropertyCache {
        &mut self.cache
    }
}
