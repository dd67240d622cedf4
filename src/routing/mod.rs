//! Sport path segments and the legacy date-route rewriter.

pub mod middleware;
pub mod rewrite;
pub mod sport;

pub use rewrite::{rewrite, RewriteOutcome, RouteDescriptor, RoutePattern};
pub use sport::Sport;
