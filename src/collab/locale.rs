//! Locale resolution against a configured set of available locales.

use async_trait::async_trait;

use crate::errors::CollaboratorError;
use crate::models::Locale;

use super::LocaleService;

/// Resolves language ids against a fixed list of locales.
///
/// An exact match wins; otherwise the first available locale with the same
/// language is used (`en` → `en_US`). Unknown or malformed ids resolve to
/// nothing.
#[derive(Debug, Clone)]
pub struct StaticLocaleService {
    available: Vec<Locale>,
}

impl StaticLocaleService {
    pub fn new(available: Vec<Locale>) -> Self {
        Self { available }
    }
}

#[async_trait]
impl LocaleService for StaticLocaleService {
    async fn resolve_locale(
        &self,
        language_id: &str,
    ) -> Result<Option<Locale>, CollaboratorError> {
        let Some(requested) = Locale::parse(language_id) else {
            return Ok(None);
        };

        if let Some(exact) = self.available.iter().find(|l| **l == requested) {
            return Ok(Some(exact.clone()));
        }

        Ok(self
            .available
            .iter()
            .find(|l| l.language == requested.language)
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> StaticLocaleService {
        StaticLocaleService::new(vec![
            Locale::parse("en_US").unwrap(),
            Locale::parse("ru_RU").unwrap(),
        ])
    }

    #[tokio::test]
    async fn exact_match() {
        let locale = service().resolve_locale("ru-RU").await.unwrap().unwrap();
        assert_eq!(locale.language_id(), "ru_RU");
    }

    #[tokio::test]
    async fn language_only_falls_back_to_first_country() {
        let locale = service().resolve_locale("en").await.unwrap().unwrap();
        assert_eq!(locale.language_id(), "en_US");
    }

    #[tokio::test]
    async fn unknown_language_resolves_to_nothing() {
        assert_eq!(service().resolve_locale("de_DE").await.unwrap(), None);
        assert_eq!(service().resolve_locale("").await.unwrap(), None);
    }
}
