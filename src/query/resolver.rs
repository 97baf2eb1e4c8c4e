//! Picks one representative version per article out of a version history.

use indexmap::map::Entry;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::models::ArticleVersion;

/// How competing eligible versions of one article are settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResolutionPolicy {
    /// The first eligible version in enumeration order is kept.
    #[default]
    FirstEligible,
    /// The eligible version with the highest version number is kept.
    HighestVersion,
}

impl ResolutionPolicy {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "first-eligible" => Some(ResolutionPolicy::FirstEligible),
            "highest-version" => Some(ResolutionPolicy::HighestVersion),
            _ => None,
        }
    }
}

/// Reduce `versions` to at most one approved, non-trashed version per article id.
///
/// The map keeps the position at which each article id was first accepted, so
/// iteration order follows the repository's enumeration order.
pub fn resolve<I>(versions: I, policy: ResolutionPolicy) -> IndexMap<String, ArticleVersion>
where
    I: IntoIterator<Item = ArticleVersion>,
{
    let mut kept: IndexMap<String, ArticleVersion> = IndexMap::new();

    for candidate in versions {
        if !candidate.version.is_current_approved() {
            continue;
        }

        match kept.entry(candidate.item.article_id.clone()) {
            Entry::Vacant(slot) => {
                slot.insert(candidate);
            }
            Entry::Occupied(mut slot) => {
                if policy == ResolutionPolicy::HighestVersion
                    && candidate.version.version > slot.get().version.version
                {
                    slot.insert(candidate);
                }
            }
        }
    }

    kept
}
