//! Property names and the bundles a property fetch returns.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;

/// Namespace of the repository-specific DAV properties.
pub const SVN_DAV_NAMESPACE: &str = "http://subversion.tigris.org/xmlns/dav/";

/// Namespace of the core WebDAV properties.
pub const DAV_NAMESPACE: &str = "DAV:";

/// A namespace-qualified property identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PropertyName {
    /// Namespace URI.
    pub namespace: Cow<'static, str>,
    /// Local name.
    pub name: Cow<'static, str>,
}

impl PropertyName {
    /// Repository UUID.
    pub const REPOSITORY_UUID: Self = Self::constant(SVN_DAV_NAMESPACE, "repository-uuid");

    /// Path of the resource relative to the repository root.
    pub const BASELINE_RELATIVE_PATH: Self =
        Self::constant(SVN_DAV_NAMESPACE, "baseline-relative-path");

    /// Path of the version-controlled configuration resource.
    pub const VERSION_CONTROLLED_CONFIGURATION: Self =
        Self::constant(DAV_NAMESPACE, "version-controlled-configuration");

    /// Resource type.
    pub const RESOURCE_TYPE: Self = Self::constant(DAV_NAMESPACE, "resourcetype");

    const fn constant(namespace: &'static str, name: &'static str) -> Self {
        Self {
            namespace: Cow::Borrowed(namespace),
            name: Cow::Borrowed(name),
        }
    }

    /// Create a property name.
    pub fn new(namespace: impl Into<Cow<'static, str>>, name: impl Into<Cow<'static, str>>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for PropertyName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.namespace, self.name)
    }
}

/// The properties queried to bootstrap access to a repository resource.
pub const STARTING_PROPERTIES: [PropertyName; 4] = [
    PropertyName::VERSION_CONTROLLED_CONFIGURATION,
    PropertyName::RESOURCE_TYPE,
    PropertyName::BASELINE_RELATIVE_PATH,
    PropertyName::REPOSITORY_UUID,
];

/// Breadth of a property fetch relative to its path.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Depth {
    /// The resource itself.
    #[default]
    Zero,
    /// The resource and its immediate children.
    One,
    /// The full subtree.
    Infinite,
}

impl Depth {
    /// Header value used on the wire.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Zero => "0",
            Self::One => "1",
            Self::Infinite => "infinity",
        }
    }
}

impl fmt::Display for Depth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Property values of one resource.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropertyBundle {
    path: String,
    properties: BTreeMap<PropertyName, String>,
    lopped_path: String,
}

impl PropertyBundle {
    /// Create an empty bundle for `path`.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    /// Add a property value.
    #[must_use]
    pub fn with(mut self, name: PropertyName, value: impl Into<String>) -> Self {
        self.set(name, value);
        self
    }

    /// Set a property value.
    pub fn set(&mut self, name: PropertyName, value: impl Into<String>) {
        self.properties.insert(name, value.into());
    }

    /// The resource path this bundle describes.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Look up a property value.
    #[must_use]
    pub fn get(&self, name: &PropertyName) -> Option<&str> {
        self.properties.get(name).map(String::as_str)
    }

    /// Whether a value is present for `name`.
    #[must_use]
    pub fn contains(&self, name: &PropertyName) -> bool {
        self.properties.contains_key(name)
    }

    /// All property values, ordered by name.
    #[must_use]
    pub const fn properties(&self) -> &BTreeMap<PropertyName, String> {
        &self.properties
    }

    /// Number of properties.
    #[must_use]
    pub fn len(&self) -> usize {
        self.properties.len()
    }

    /// Whether the bundle has no properties.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    /// Repository UUID, if present.
    #[must_use]
    pub fn repository_uuid(&self) -> Option<&str> {
        self.get(&PropertyName::REPOSITORY_UUID)
    }

    /// Path relative to the repository root, if present.
    #[must_use]
    pub fn baseline_relative_path(&self) -> Option<&str> {
        self.get(&PropertyName::BASELINE_RELATIVE_PATH)
    }

    /// Version-controlled configuration path, if present.
    #[must_use]
    pub fn version_controlled_configuration(&self) -> Option<&str> {
        self.get(&PropertyName::VERSION_CONTROLLED_CONFIGURATION)
    }

    /// Portion of the requested path below the resolved resource.
    ///
    /// Empty unless the bundle came from an upward path walk that had to
    /// skip unversioned segments.
    #[must_use]
    pub fn lopped_path(&self) -> &str {
        &self.lopped_path
    }

    pub(crate) fn set_lopped_path(&mut self, lopped: String) {
        self.lopped_path = lopped;
    }

    /// A copy restricted to `names`, or `None` if any of them is missing.
    #[must_use]
    pub fn select(&self, names: &[PropertyName]) -> Option<Self> {
        let mut selected = Self::new(self.path.clone());
        for name in names {
            let value = self.properties.get(name)?;
            selected.properties.insert(name.clone(), value.clone());
        }
        Some(selected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn well_known_names() {
        assert_eq!(
            PropertyName::REPOSITORY_UUID.to_string(),
            "http://subversion.tigris.org/xmlns/dav/repository-uuid"
        );
        assert_eq!(
            PropertyName::new("DAV:", "resourcetype"),
            PropertyName::RESOURCE_TYPE
        );
        assert_eq!(STARTING_PROPERTIES.len(), 4);
    }

    #[test]
    fn select_requires_every_name() {
        let bundle = PropertyBundle::new("/repo")
            .with(PropertyName::REPOSITORY_UUID, "uuid-1")
            .with(PropertyName::RESOURCE_TYPE, "collection");

        let selected = bundle.select(&[PropertyName::REPOSITORY_UUID]).unwrap();
        assert_eq!(selected.len(), 1);
        assert_eq!(selected.repository_uuid(), Some("uuid-1"));
        assert_eq!(selected.path(), "/repo");

        assert!(bundle.select(&STARTING_PROPERTIES).is_none());
    }

    #[test]
    fn depth_on_the_wire() {
        assert_eq!(Depth::default(), Depth::Zero);
        assert_eq!(Depth::Infinite.to_string(), "infinity");
    }
}
