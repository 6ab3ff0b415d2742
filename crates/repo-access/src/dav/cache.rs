//! The per-context property cache.

use super::property::{PropertyBundle, PropertyName};

/// Holds the most recently fetched bundle of one repository context.
///
/// A lookup hits only when every requested property is present; there is
/// no partial merge, so a miss is followed by a full fetch whose result
/// replaces the cached bundle.
#[derive(Debug, Clone, Default)]
pub struct PropertyCache {
    current: Option<PropertyBundle>,
}

impl PropertyCache {
    /// Create an empty cache.
    #[must_use]
    pub const fn new() -> Self {
        Self { current: None }
    }

    /// The cached values of `names`, if all of them are cached.
    #[must_use]
    pub fn lookup(&self, names: &[PropertyName]) -> Option<PropertyBundle> {
        self.current.as_ref()?.select(names)
    }

    /// Replace the cached bundle.
    pub fn replace(&mut self, bundle: PropertyBundle) {
        self.current = Some(bundle);
    }

    /// Drop the cached bundle.
    pub fn clear(&mut self) {
        self.current = None;
    }

    /// The cached bundle.
    #[must_use]
    pub const fn current(&self) -> Option<&PropertyBundle> {
        self.current.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cached() -> PropertyCache {
        let mut cache = PropertyCache::new();
        cache.replace(
            PropertyBundle::new("/repo")
                .with(PropertyName::REPOSITORY_UUID, "u")
                .with(PropertyName::RESOURCE_TYPE, "collection"),
        );
        cache
    }

    #[test]
    fn empty_cache_misses() {
        assert!(PropertyCache::new().lookup(&[]).is_none());
    }

    #[test]
    fn full_coverage_hits() {
        let hit = cached().lookup(&[PropertyName::REPOSITORY_UUID]).unwrap();
        assert_eq!(hit.repository_uuid(), Some("u"));
    }

    #[test]
    fn partial_coverage_misses() {
        let cache = cached();
        assert!(
            cache
                .lookup(&[PropertyName::REPOSITORY_UUID, PropertyName::BASELINE_RELATIVE_PATH])
                .is_none()
        );
    }

    #[test]
    fn replace_is_wholesale() {
        let mut cache = cached();
        cache.replace(PropertyBundle::new("/other").with(PropertyName::BASELINE_RELATIVE_PATH, "x"));
        assert!(cache.lookup(&[PropertyName::REPOSITORY_UUID]).is_none());
        assert_eq!(cache.current().map(PropertyBundle::path), Some("/other"));

        cache.clear();
        assert!(cache.current().is_none());
    }
}
