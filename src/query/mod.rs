//! Read-side query layer: version resolution, filter compilation, taxonomy
//! lookups, localization and the service tying them together.

pub mod compiler;
pub mod localizer;
pub mod predicate;
pub mod resolver;
pub mod service;
pub mod taxonomy;

#[cfg(test)]
pub(crate) mod test_support;

pub use compiler::{compile, visibility, ResolvedTaxonomy, SearchMode};
pub use localizer::{Localized, Localizer};
pub use predicate::{CompareOp, Field, Predicate, Value};
pub use resolver::{resolve, ResolutionPolicy};
pub use service::{QueryService, QuerySettings};
pub use taxonomy::TagCategoryIndex;
