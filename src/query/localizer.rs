//! Single-locale projection of an article version.

use std::sync::Arc;

use crate::collab::{CallScope, LocaleService};
use crate::errors::AppError;
use crate::models::{ArticleVersion, Locale, Version};

/// Title and rendered body in one language.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Localized {
    /// Configured locale for the effective language, when there is one.
    pub locale: Option<Locale>,
    pub title: Option<String>,
    pub content: Option<String>,
}

pub struct Localizer {
    locales: Arc<dyn LocaleService>,
}

impl Localizer {
    pub fn new(locales: Arc<dyn LocaleService>) -> Self {
        Self { locales }
    }

    /// Project `article` into `language_id`, falling back to its default language.
    ///
    /// Title and body are keyed by the effective language id; the locale
    /// service only supplies the matching configured [`Locale`].
    pub async fn localize(
        &self,
        article: &ArticleVersion,
        language_id: &str,
        scope: &CallScope,
    ) -> Result<Localized, AppError> {
        let effective = effective_language_id(&article.version, language_id);

        let context = format!(
            "groupId={} articleId={} languageId={}",
            article.item.group_id, article.item.article_id, effective
        );
        let locale = scope
            .run("resolve_locale", &context, None, || {
                self.locales.resolve_locale(effective)
            })
            .await?;

        Ok(Localized {
            locale,
            ..project(&article.version, effective)
        })
    }
}

/// Requested language when the version has a body in it, else the default.
pub fn effective_language_id<'a>(version: &'a Version, requested: &'a str) -> &'a str {
    if version.bodies.contains_key(requested) {
        requested
    } else {
        &version.default_language_id
    }
}

/// Pick title and body for `language_id`; a missing title falls back to the default language.
pub fn project(version: &Version, language_id: &str) -> Localized {
    let title = version
        .titles
        .get(language_id)
        .or_else(|| version.titles.get(&version.default_language_id))
        .cloned();
    let content = version.bodies.get(language_id).map(|body| render_body(body));
    Localized {
        locale: None,
        title,
        content,
    }
}

/// Render structured markup to display text; plain text passes through.
///
/// Text and CDATA nodes are joined with single spaces. Malformed markup is
/// returned unchanged.
pub fn render_body(body: &str) -> String {
    if !body.trim_start().starts_with('<') {
        return body.to_string();
    }

    let mut reader = quick_xml::Reader::from_str(body);
    reader.config_mut().trim_text(true);
    let mut parts: Vec<String> = Vec::new();
    loop {
        match reader.read_event() {
            Ok(quick_xml::events::Event::Text(te)) => match te.unescape() {
                Ok(text) => parts.push(text.into_owned()),
                Err(_) => return body.to_string(),
            },
            Ok(quick_xml::events::Event::CData(cd)) => {
                parts.push(String::from_utf8_lossy(&cd).into_owned());
            }
            Ok(quick_xml::events::Event::Eof) => break,
            Err(_) => return body.to_string(),
            _ => {}
        }
    }

    parts
        .iter()
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
