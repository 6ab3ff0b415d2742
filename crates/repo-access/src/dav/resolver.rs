//! Starting-property discovery.
//!
//! The resolver asks the server for the starting properties of a path. If
//! the path is not a versioned resource (the server answers "not found"),
//! it walks up one segment at a time until an ancestor answers, remembering
//! the skipped segments as the *lopped path*. The answering resource tells
//! the client the repository UUID and, through its baseline-relative path,
//! where the repository root is.

use std::future::Future;

use super::context::RepositoryContext;
use super::property::{Depth, PropertyBundle, PropertyName, STARTING_PROPERTIES};
use crate::error::{AccessError, ErrorCode, ProtocolError, Result};
use crate::path;

/// Issues property requests against a repository server.
pub trait PropertyFetcher: Send + Sync {
    /// Fetch `properties` for `path` at `depth`, optionally at a label.
    ///
    /// Returns one bundle per matching resource, the requested resource
    /// first. A missing resource is reported as a [`ProtocolError`] with
    /// [`ErrorCode::NotFound`].
    fn fetch_properties(
        &self,
        path: &str,
        depth: Depth,
        label: Option<&str>,
        properties: &[PropertyName],
    ) -> impl Future<Output = Result<Vec<PropertyBundle>>> + Send;
}

/// Resolves properties for repository paths over one fetcher.
#[derive(Debug, Clone)]
pub struct ResourceResolver<F> {
    fetcher: F,
}

impl<F: PropertyFetcher> ResourceResolver<F> {
    /// Create a resolver.
    pub const fn new(fetcher: F) -> Self {
        Self { fetcher }
    }

    /// The underlying fetcher.
    pub const fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// Consume the resolver, returning the fetcher.
    pub fn into_inner(self) -> F {
        self.fetcher
    }

    /// Fetch `properties` for `path`, answering from the context's cache
    /// when it already holds every one of them.
    ///
    /// A cache hit issues no request. A miss issues exactly one request
    /// for the full set and, with `use_cache`, replaces the cached bundle.
    ///
    /// # Errors
    ///
    /// [`AccessError::PropertyNotFound`] if the server returns no resource;
    /// request errors are passed through unchanged.
    pub async fn deliver_properties(
        &self,
        ctx: &mut RepositoryContext,
        path: &str,
        label: Option<&str>,
        properties: &[PropertyName],
        depth: Depth,
        use_cache: bool,
    ) -> Result<PropertyBundle> {
        if use_cache {
            if let Some(hit) = ctx.cache().lookup(properties) {
                tracing::debug!(path = %path, "Properties served from cache");
                return Ok(hit);
            }
        }

        let resources = self
            .fetcher
            .fetch_properties(path, depth, label, properties)
            .await?;
        let Some(bundle) = resources.into_iter().next() else {
            return Err(AccessError::property_not_found(path, label));
        };

        if use_cache {
            ctx.cache_mut().replace(bundle.clone());
        }
        Ok(bundle)
    }

    /// Fetch the starting properties of exactly `path`, with caching.
    ///
    /// # Errors
    ///
    /// See [`ResourceResolver::deliver_properties`].
    pub async fn starting_properties(
        &self,
        ctx: &mut RepositoryContext,
        path: &str,
        label: Option<&str>,
    ) -> Result<PropertyBundle> {
        self.deliver_properties(ctx, path, label, &STARTING_PROPERTIES, Depth::Zero, true)
            .await
    }

    /// Find the starting properties of `path` or its nearest versioned
    /// ancestor.
    ///
    /// The returned bundle carries the lopped path. The context adopts the
    /// repository UUID if it has none yet, and records the repository root
    /// when the server reports a baseline-relative path.
    ///
    /// # Errors
    ///
    /// [`AccessError::NotPartOfRepository`] if no ancestor up to the root
    /// exists. Any error other than "not found" ends the walk and is
    /// returned unchanged.
    pub async fn resolve_starting_properties(
        &self,
        ctx: &mut RepositoryContext,
        path: &str,
    ) -> Result<PropertyBundle> {
        let mut current = path.to_string();
        let mut lopped = String::new();

        let mut bundle = loop {
            let err = match self.starting_properties(ctx, &current, None).await {
                Ok(bundle) => break bundle,
                Err(AccessError::Protocol(err)) if err.code() == ErrorCode::NotFound => err,
                Err(err) => return Err(err),
            };

            let parent = path::remove_tail(&current);
            if path::is_root(&current) || parent.is_empty() || parent.len() >= current.len() {
                return Err(AccessError::NotPartOfRepository {
                    path: path.to_string(),
                    source: err,
                });
            }

            lopped = path::append(path::tail(&current), &lopped);
            tracing::debug!(path = %current, parent = %parent, lopped = %lopped, "Not versioned, trying parent");
            current = parent.to_string();
        };

        if ctx.uuid().is_none() {
            if let Some(uuid) = bundle.repository_uuid() {
                ctx.set_uuid(uuid);
            }
        }
        if let Some(relative) = bundle.baseline_relative_path() {
            let root = repository_root(&current, &path::uri_encode(relative))?;
            tracing::debug!(path = %current, root = %root, "Repository root resolved");
            ctx.set_root_path(root);
        }

        bundle.set_lopped_path(lopped);
        Ok(bundle)
    }

    /// Path of the version-controlled configuration resource for `path`.
    ///
    /// # Errors
    ///
    /// A [`ProtocolError`] with [`ErrorCode::OptionsRequestFailed`] if the
    /// server does not report one, or any error of
    /// [`ResourceResolver::resolve_starting_properties`].
    pub async fn vcc_path(&self, ctx: &mut RepositoryContext, path: &str) -> Result<String> {
        let bundle = self.resolve_starting_properties(ctx, path).await?;
        bundle
            .version_controlled_configuration()
            .map(str::to_owned)
            .ok_or_else(|| {
                ProtocolError::new(
                    ErrorCode::OptionsRequestFailed,
                    "The OPTIONS response did not include the requested version-controlled-configuration value",
                )
                .into()
            })
    }
}

/// Strip the encoded baseline-relative path from the end of `resolved`.
///
/// A trailing `/` on `resolved` is ignored before the suffix is cut.
fn repository_root(resolved: &str, encoded_relative: &str) -> Result<String> {
    let resolved = match resolved.trim_end_matches(path::DELIMITER) {
        "" => resolved,
        trimmed => trimmed,
    };
    let root = resolved
        .len()
        .checked_sub(encoded_relative.len())
        .and_then(|keep| resolved.get(..keep))
        .ok_or_else(|| {
            ProtocolError::with_args(
                ErrorCode::RequestFailed,
                "Baseline-relative path '{0}' does not fit resource path '{1}'",
                &[&encoded_relative, &resolved],
            )
        })?;

    Ok(match root.trim_end_matches(path::DELIMITER) {
        "" => "/".to_string(),
        root => root.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockServer;

    fn server() -> MockServer {
        MockServer::new().with_resource(
            PropertyBundle::new("/repos/p")
                .with(PropertyName::REPOSITORY_UUID, "uuid-1")
                .with(PropertyName::BASELINE_RELATIVE_PATH, "")
                .with(PropertyName::RESOURCE_TYPE, "collection")
                .with(PropertyName::VERSION_CONTROLLED_CONFIGURATION, "/repos/p/!svn/vcc/default"),
        )
    }

    fn ctx() -> RepositoryContext {
        RepositoryContext::new("https://svn.example.com/repos/p")
    }

    #[test]
    fn root_strips_encoded_suffix() {
        assert_eq!(repository_root("/repos/p/trunk", "trunk").unwrap(), "/repos/p");
        assert_eq!(repository_root("/repos/p/trunk/", "trunk").unwrap(), "/repos/p");
        assert_eq!(repository_root("/repos/p", "").unwrap(), "/repos/p");
        assert_eq!(repository_root("/trunk", "trunk").unwrap(), "/");
        assert_eq!(
            repository_root("/a%20b/c%20d", &path::uri_encode("c d")).unwrap(),
            "/a%20b"
        );

        let err = repository_root("/x", "much/longer").unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::RequestFailed));
    }

    #[tokio::test]
    async fn walks_up_to_versioned_ancestor() {
        let resolver = ResourceResolver::new(server());
        let mut ctx = ctx();

        let bundle = resolver
            .resolve_starting_properties(&mut ctx, "/repos/p/b/c")
            .await
            .unwrap();

        assert_eq!(bundle.lopped_path(), "b/c");
        assert_eq!(bundle.path(), "/repos/p");
        assert_eq!(ctx.uuid(), Some("uuid-1"));
        assert_eq!(ctx.root_path(), Some("/repos/p"));
        assert_eq!(
            resolver.fetcher().requested_paths(),
            ["/repos/p/b/c", "/repos/p/b", "/repos/p"]
        );
    }

    #[tokio::test]
    async fn root_not_found_is_not_part_of_repository() {
        let resolver = ResourceResolver::new(MockServer::new());
        let mut ctx = ctx();

        let err = resolver
            .resolve_starting_properties(&mut ctx, "/")
            .await
            .unwrap_err();
        assert!(matches!(err, AccessError::NotPartOfRepository { ref path, .. } if path == "/"));
        assert_eq!(err.code(), Some(ErrorCode::NotFound));
        assert_eq!(resolver.fetcher().requests(), 1);

        let err = resolver
            .resolve_starting_properties(&mut ctx, "/x/y")
            .await
            .unwrap_err();
        assert!(matches!(err, AccessError::NotPartOfRepository { .. }));
        assert_eq!(resolver.fetcher().requests(), 4);
    }

    #[tokio::test]
    async fn other_errors_stop_the_walk() {
        let server = server().with_error(
            "/repos/p/b",
            ProtocolError::new(ErrorCode::RequestFailed, "boom"),
        );
        let resolver = ResourceResolver::new(server);

        let err = resolver
            .resolve_starting_properties(&mut ctx(), "/repos/p/b/c")
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "boom");
        assert_eq!(err.code(), Some(ErrorCode::RequestFailed));
        assert_eq!(resolver.fetcher().requests(), 2);
    }

    #[tokio::test]
    async fn known_uuid_is_kept() {
        let resolver = ResourceResolver::new(server());
        let mut ctx = ctx();
        ctx.set_uuid("already-known");

        resolver
            .resolve_starting_properties(&mut ctx, "/repos/p")
            .await
            .unwrap();
        assert_eq!(ctx.uuid(), Some("already-known"));
    }

    #[tokio::test]
    async fn cache_hit_issues_no_request() {
        let resolver = ResourceResolver::new(server());
        let mut ctx = ctx();

        let first = resolver
            .starting_properties(&mut ctx, "/repos/p", None)
            .await
            .unwrap();
        let second = resolver
            .starting_properties(&mut ctx, "/repos/p", None)
            .await
            .unwrap();

        assert_eq!(resolver.fetcher().requests(), 1);
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn partial_cache_coverage_refetches_everything() {
        let resolver = ResourceResolver::new(server());
        let mut ctx = ctx();
        ctx.cache_mut()
            .replace(PropertyBundle::new("/repos/p").with(PropertyName::REPOSITORY_UUID, "stale"));

        let bundle = resolver
            .deliver_properties(
                &mut ctx,
                "/repos/p",
                None,
                &[PropertyName::REPOSITORY_UUID, PropertyName::RESOURCE_TYPE],
                Depth::Zero,
                true,
            )
            .await
            .unwrap();

        assert_eq!(resolver.fetcher().requests(), 1);
        assert_eq!(
            resolver.fetcher().last_request().map(|r| r.properties.len()),
            Some(2)
        );
        assert_eq!(bundle.repository_uuid(), Some("uuid-1"));
        assert_eq!(ctx.cache().current(), Some(&bundle));
    }

    #[tokio::test]
    async fn uncached_delivery_leaves_cache_alone() {
        let resolver = ResourceResolver::new(server());
        let mut ctx = ctx();

        for _ in 0..2 {
            resolver
                .deliver_properties(&mut ctx, "/repos/p", None, &STARTING_PROPERTIES, Depth::Zero, false)
                .await
                .unwrap();
        }
        assert_eq!(resolver.fetcher().requests(), 2);
        assert!(ctx.cache().current().is_none());
    }

    #[tokio::test]
    async fn empty_response_names_path_and_label() {
        let resolver = ResourceResolver::new(MockServer::new().with_empty("/repos/p"));
        let mut ctx = ctx();

        let err = resolver
            .starting_properties(&mut ctx, "/repos/p", None)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Failed to find label 'NULL' for URL '/repos/p'");

        let err = resolver
            .starting_properties(&mut ctx, "/repos/p", Some("42"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AccessError::PropertyNotFound { ref label, .. } if label.as_deref() == Some("42")
        ));
    }

    #[tokio::test]
    async fn vcc_path_present_and_missing() {
        let resolver = ResourceResolver::new(server());
        assert_eq!(
            resolver.vcc_path(&mut ctx(), "/repos/p/trunk").await.unwrap(),
            "/repos/p/!svn/vcc/default"
        );

        let bare = ResourceResolver::new(
            MockServer::new().with_resource(PropertyBundle::new("/r").with(PropertyName::RESOURCE_TYPE, "")),
        );
        let err = bare.vcc_path(&mut ctx(), "/r").await.unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::OptionsRequestFailed));
        assert!(err.to_string().contains("version-controlled-configuration"));
    }
}
