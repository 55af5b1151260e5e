//! Task-level access resolution.
//!
//! A resource (task) has one owner and any number of explicit [`Grant`]s. The
//! [`AccessResolver`] turns that into an [`EffectiveLevel`] for a principal and checks it against
//! the fixed capability table in [`authorize`]. Sharing and revoking are owner-only.
//!
//! Storage is abstracted behind [`AccessStore`]; [`InMemoryAccessStore`] backs tests and
//! single-process deployments.

pub mod grant;
pub mod level;
pub mod resolver;
pub mod store;

pub use grant::{Grant, PrincipalId, Resource, ResourceId};
pub use level::{
    authorize, AccessLevel, Action, Authorization, EffectiveAccess, EffectiveLevel,
    ParseAccessLevelError,
};
pub use resolver::AccessResolver;
pub use store::{AccessStore, GrantUpsert, InMemoryAccessStore};
