//! Data models for the journal query layer.
//!
//! Wire names are camelCase to match the upstream content-serving layer.

mod article;
mod criteria;
mod locale;
mod result;

pub use article::*;
pub use criteria::*;
pub use locale::*;
pub use result::*;
