//! Repository property discovery over the DAV property vocabulary.
//!
//! - [`property`]: property names, depths and bundles
//! - [`cache`]: the per-context property cache
//! - [`context`]: what a client knows about its repository
//! - [`resolver`]: the starting-property walk

pub mod cache;
pub mod context;
pub mod property;
pub mod resolver;

pub use cache::PropertyCache;
pub use context::RepositoryContext;
pub use property::{
    DAV_NAMESPACE, Depth, PropertyBundle, PropertyName, STARTING_PROPERTIES, SVN_DAV_NAMESPACE,
};
pub use resolver::{PropertyFetcher, ResourceResolver};
