//! Sandbox isolation for Sandwire.
//!
//! A [`SandboxGroup`] is an isolated set of loadable types: each group owns
//! its own class namespace, so the same type name may bind to different
//! code in different groups. A [`Whitelist`] decides which type names may
//! cross a group's trust boundary at all.

mod error;
mod group;
mod ids;
mod policy;
mod whitelist;

pub use error::{SandboxError, SandboxResult};
pub use group::{ClassBinding, SandboxGroup, SandboxGroupBuilder};
pub use ids::SandboxGroupId;
pub use policy::{GroupConfig, TypePattern, WhitelistConfig, WhitelistMode, WhitelistPolicy};
pub use whitelist::{AllWhitelist, Whitelist};
