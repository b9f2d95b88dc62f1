pub mod condition;
pub mod config;
pub mod document;
pub mod error;
pub mod literal;
pub mod resolve;
pub mod winres;

pub use config::{Platform, ResolveOptions, ResolverBuilder};
pub use document::BuildDocument;
pub use error::{ErrorKind, GypError, Result};
pub use resolve::{ResolvedConfig, Resolver};
