pub mod viewer;

pub use viewer::{IdentityResolver, JwtIdentityResolver, OptionalViewer};
