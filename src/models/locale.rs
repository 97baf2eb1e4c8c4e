//! Locale identifiers in the `language[_COUNTRY]` form.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A language with an optional country, e.g. `en_US` or `ru`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Locale {
    pub language: String,
    pub country: Option<String>,
}

impl Locale {
    /// Parse `en_US`, `en-US` or `en`. Language is lowercased, country uppercased.
    pub fn parse(language_id: &str) -> Option<Self> {
        let trimmed = language_id.trim();
        if trimmed.is_empty() {
            return None;
        }

        let mut parts = trimmed.splitn(2, ['_', '-']);
        let language = parts.next()?.to_ascii_lowercase();
        if language.is_empty() || !language.chars().all(|c| c.is_ascii_alphabetic()) {
            return None;
        }

        let country = match parts.next() {
            Some(c) if !c.is_empty() && c.chars().all(|c| c.is_ascii_alphanumeric()) => {
                Some(c.to_ascii_uppercase())
            }
            Some(_) => return None,
            None => None,
        };

        Some(Self { language, country })
    }

    /// Canonical language id used as the key of per-language fields.
    pub fn language_id(&self) -> String {
        match &self.country {
            Some(country) => format!("{}_{}", self.language, country),
            None => self.language.clone(),
        }
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.language_id())
    }
}

impl TryFrom<String> for Locale {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Locale::parse(&value).ok_or_else(|| format!("invalid locale: {:?}", value))
    }
}

impl From<Locale> for String {
    fn from(locale: Locale) -> Self {
        locale.language_id()
    }
}
