//! SQLite implementation of the content repository and tagging collaborators.
//!
//! Predicates are translated to SQL with `QueryBuilder`; every value is bound,
//! never interpolated.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool, Transaction};

use crate::collab::{AssetRef, CategoryId, ContentRepository, TagId, TaggingService};
use crate::errors::{AppError, CollaboratorError};
use crate::models::{ArticleVersion, ContentItem, GroupId, ResourceKey, Version, WorkflowStatus};
use crate::query::{CompareOp, Field, Predicate, Value};

const SELECT_VERSIONS: &str = r#"SELECT v.id, v.version, v.status, v.in_trash,
          v.default_language_id, v.modified_at,
          a.resource_key, a.group_id, a.article_id
   FROM article_versions v
   JOIN articles a ON a.resource_key = v.resource_key"#;

/// Titles and bodies of one version, keyed by language id.
type Localizations = (BTreeMap<String, String>, BTreeMap<String, String>);

/// Bound values per `IN (...)` list, under SQLite's host parameter limit.
const BIND_CHUNK: usize = 500;

#[derive(Debug, Clone, Copy)]
enum Taxonomy {
    Tag,
    Category,
}

impl Taxonomy {
    fn table(self) -> &'static str {
        match self {
            Taxonomy::Tag => "asset_tags",
            Taxonomy::Category => "asset_categories",
        }
    }

    fn entries(self) -> &'static str {
        match self {
            Taxonomy::Tag => "asset_tag_entries",
            Taxonomy::Category => "asset_category_entries",
        }
    }

    fn key_column(self) -> &'static str {
        match self {
            Taxonomy::Tag => "tag_id",
            Taxonomy::Category => "category_id",
        }
    }
}

/// Article store backed by a SQLite pool.
#[derive(Clone)]
pub struct SqliteRepository {
    pool: SqlitePool,
}

impl SqliteRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Store one article version with its localizations, tags and categories.
    ///
    /// The article row is created on first insert; tags and categories are
    /// created by name when missing. Returns the version row id.
    pub async fn insert_version(&self, article: &ArticleVersion) -> Result<i64, AppError> {
        let item = &article.item;
        let version = &article.version;
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO articles (resource_key, group_id, article_id) VALUES (?, ?, ?)
             ON CONFLICT(resource_key) DO NOTHING",
        )
        .bind(item.resource_key)
        .bind(item.group_id)
        .bind(&item.article_id)
        .execute(&mut *tx)
        .await?;

        let version_id = sqlx::query(
            "INSERT INTO article_versions
                (resource_key, version, status, in_trash, default_language_id, modified_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(item.resource_key)
        .bind(version.version)
        .bind(version.status.code())
        .bind(version.in_trash as i32)
        .bind(&version.default_language_id)
        .bind(version.modified_at.to_rfc3339())
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();

        let languages: BTreeSet<&String> =
            version.titles.keys().chain(version.bodies.keys()).collect();
        for language_id in languages {
            let title = version.titles.get(language_id);
            let body = version.bodies.get(language_id);
            sqlx::query(
                "INSERT INTO article_localizations
                    (version_id, language_id, title, body, title_folded, body_folded)
                 VALUES (?, ?, ?, ?, ?, ?)",
            )
            .bind(version_id)
            .bind(language_id)
            .bind(title.map(String::as_str))
            .bind(body.map(String::as_str))
            .bind(title.map(|t| t.to_lowercase()))
            .bind(body.map(|b| b.to_lowercase()))
            .execute(&mut *tx)
            .await?;
        }

        for name in &item.tags {
            link(&mut tx, Taxonomy::Tag, name, item.resource_key).await?;
        }
        for name in &item.categories {
            link(&mut tx, Taxonomy::Category, name, item.resource_key).await?;
        }

        tx.commit().await?;
        tracing::debug!(
            article_id = %item.article_id,
            version = version.version,
            version_id,
            "stored article version"
        );
        Ok(version_id)
    }

    async fn fetch_versions(
        &self,
        predicate: Option<&Predicate>,
    ) -> Result<Vec<ArticleVersion>, CollaboratorError> {
        let mut query = QueryBuilder::<Sqlite>::new(SELECT_VERSIONS);
        if let Some(predicate) = predicate {
            query.push(" WHERE ");
            push_predicate(&mut query, predicate);
        }
        query.push(" ORDER BY v.id");

        let rows = query.build().fetch_all(&self.pool).await?;
        self.hydrate(rows).await
    }

    /// Attach localizations and materialized taxonomy to version rows.
    ///
    /// One localization query and one query per taxonomy for every
    /// [`BIND_CHUNK`] rows, independent of the row count.
    async fn hydrate(&self, rows: Vec<SqliteRow>) -> Result<Vec<ArticleVersion>, CollaboratorError> {
        let mut version_ids = Vec::with_capacity(rows.len());
        let mut resource_keys = BTreeSet::new();
        for row in &rows {
            version_ids.push(row.try_get::<i64, _>("id")?);
            resource_keys.insert(row.try_get::<ResourceKey, _>("resource_key")?);
        }
        let resource_keys: Vec<ResourceKey> = resource_keys.into_iter().collect();

        let mut localized = self.localizations(&version_ids).await?;
        let tags = self.names_for(Taxonomy::Tag, &resource_keys).await?;
        let categories = self.names_for(Taxonomy::Category, &resource_keys).await?;

        let mut versions = Vec::with_capacity(rows.len());
        for row in rows {
            let version_id: i64 = row.try_get("id")?;
            let resource_key: ResourceKey = row.try_get("resource_key")?;

            let status_code: i64 = row.try_get("status")?;
            let status = WorkflowStatus::from_code(status_code).ok_or_else(|| {
                CollaboratorError::unavailable(format!(
                    "version {} has unknown status code {}",
                    version_id, status_code
                ))
            })?;
            let in_trash: i64 = row.try_get("in_trash")?;
            let modified_at: String = row.try_get("modified_at")?;
            let (titles, bodies) = localized.remove(&version_id).unwrap_or_default();

            versions.push(ArticleVersion {
                item: ContentItem {
                    group_id: row.try_get("group_id")?,
                    article_id: row.try_get("article_id")?,
                    resource_key,
                    tags: tags.get(&resource_key).cloned().unwrap_or_default(),
                    categories: categories.get(&resource_key).cloned().unwrap_or_default(),
                },
                version: Version {
                    version: row.try_get("version")?,
                    status,
                    in_trash: in_trash != 0,
                    default_language_id: row.try_get("default_language_id")?,
                    titles,
                    bodies,
                    modified_at: parse_timestamp(&modified_at)?,
                },
            });
        }

        Ok(versions)
    }

    /// Titles and bodies per version id, keyed by language id.
    async fn localizations(
        &self,
        version_ids: &[i64],
    ) -> Result<HashMap<i64, Localizations>, CollaboratorError> {
        let mut localized: HashMap<i64, Localizations> = HashMap::new();
        for chunk in version_ids.chunks(BIND_CHUNK) {
            let mut query = QueryBuilder::<Sqlite>::new(
                "SELECT version_id, language_id, title, body FROM article_localizations
                 WHERE version_id IN (",
            );
            let mut ids = query.separated(", ");
            for id in chunk {
                ids.push_bind(*id);
            }
            ids.push_unseparated(")");

            for row in query.build().fetch_all(&self.pool).await? {
                let version_id: i64 = row.try_get("version_id")?;
                let language_id: String = row.try_get("language_id")?;
                let (titles, bodies) = localized.entry(version_id).or_default();
                if let Some(title) = row.try_get::<Option<String>, _>("title")? {
                    titles.insert(language_id.clone(), title);
                }
                if let Some(body) = row.try_get::<Option<String>, _>("body")? {
                    bodies.insert(language_id, body);
                }
            }
        }
        Ok(localized)
    }

    /// Tag or category names attached to each of `resource_keys`.
    async fn names_for(
        &self,
        taxonomy: Taxonomy,
        resource_keys: &[ResourceKey],
    ) -> Result<HashMap<ResourceKey, BTreeSet<String>>, CollaboratorError> {
        let mut names: HashMap<ResourceKey, BTreeSet<String>> = HashMap::new();
        for chunk in resource_keys.chunks(BIND_CHUNK) {
            let mut query = QueryBuilder::<Sqlite>::new(format!(
                "SELECT e.resource_key, t.name FROM {} t JOIN {} e ON e.{} = t.id
                 WHERE e.resource_key IN (",
                taxonomy.table(),
                taxonomy.entries(),
                taxonomy.key_column()
            ));
            let mut keys = query.separated(", ");
            for key in chunk {
                keys.push_bind(*key);
            }
            keys.push_unseparated(")");

            for row in query.build().fetch_all(&self.pool).await? {
                let resource_key: ResourceKey = row.try_get("resource_key")?;
                names
                    .entry(resource_key)
                    .or_default()
                    .insert(row.try_get("name")?);
            }
        }
        Ok(names)
    }

    async fn ids_named(&self, taxonomy: Taxonomy, name: &str) -> Result<Vec<i64>, CollaboratorError> {
        let sql = format!(
            "SELECT id FROM {} WHERE name_folded = ? ORDER BY id",
            taxonomy.table()
        );
        let ids = sqlx::query_scalar(&sql)
            .bind(name.to_lowercase())
            .fetch_all(&self.pool)
            .await?;
        Ok(ids)
    }
}

#[async_trait]
impl ContentRepository for SqliteRepository {
    async fn fetch_all(&self) -> Result<Vec<ArticleVersion>, CollaboratorError> {
        self.fetch_versions(None).await
    }

    async fn fetch_matching(
        &self,
        predicate: &Predicate,
    ) -> Result<Vec<ArticleVersion>, CollaboratorError> {
        self.fetch_versions(Some(predicate)).await
    }

    async fn fetch_current(
        &self,
        group_id: GroupId,
        article_id: &str,
    ) -> Result<Option<ArticleVersion>, CollaboratorError> {
        let sql = format!(
            "{} WHERE a.group_id = ? AND a.article_id = ? ORDER BY v.version DESC, v.id DESC LIMIT 1",
            SELECT_VERSIONS
        );
        let row = sqlx::query(&sql)
            .bind(group_id)
            .bind(article_id)
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        Ok(self.hydrate(vec![row]).await?.pop())
    }
}

#[async_trait]
impl TaggingService for SqliteRepository {
    async fn find_tags_by_name(&self, name: &str) -> Result<Vec<TagId>, CollaboratorError> {
        self.ids_named(Taxonomy::Tag, name).await
    }

    async fn find_categories_by_name(
        &self,
        name: &str,
    ) -> Result<Vec<CategoryId>, CollaboratorError> {
        self.ids_named(Taxonomy::Category, name).await
    }

    async fn associations_for(
        &self,
        asset: AssetRef,
    ) -> Result<Vec<ResourceKey>, CollaboratorError> {
        let (taxonomy, id) = match asset {
            AssetRef::Tag(id) => (Taxonomy::Tag, id),
            AssetRef::Category(id) => (Taxonomy::Category, id),
        };
        let sql = format!(
            "SELECT resource_key FROM {} WHERE {} = ? ORDER BY resource_key",
            taxonomy.entries(),
            taxonomy.key_column()
        );
        let keys = sqlx::query_scalar(&sql)
            .bind(id)
            .fetch_all(&self.pool)
            .await?;
        Ok(keys)
    }
}

/// Create the named tag/category if needed and attach it to `resource_key`.
async fn link(
    tx: &mut Transaction<'_, Sqlite>,
    taxonomy: Taxonomy,
    name: &str,
    resource_key: ResourceKey,
) -> Result<(), sqlx::Error> {
    let insert = format!(
        "INSERT INTO {} (name, name_folded) VALUES (?, ?) ON CONFLICT(name) DO NOTHING",
        taxonomy.table()
    );
    sqlx::query(&insert)
        .bind(name)
        .bind(name.to_lowercase())
        .execute(&mut **tx)
        .await?;

    let select = format!("SELECT id FROM {} WHERE name = ?", taxonomy.table());
    let id: i64 = sqlx::query_scalar(&select)
        .bind(name)
        .fetch_one(&mut **tx)
        .await?;

    let attach = format!(
        "INSERT OR IGNORE INTO {} ({}, resource_key) VALUES (?, ?)",
        taxonomy.entries(),
        taxonomy.key_column()
    );
    sqlx::query(&attach)
        .bind(id)
        .bind(resource_key)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

fn push_predicate(query: &mut QueryBuilder<'_, Sqlite>, predicate: &Predicate) {
    match predicate {
        Predicate::And(children) => push_junction(query, children, " AND ", "1 = 1"),
        Predicate::Or(children) => push_junction(query, children, " OR ", "0 = 1"),
        Predicate::Compare { field, op, value } => push_compare(query, *field, *op, value),
        Predicate::InSet {
            field: Field::ResourceKey,
            values,
        } if !values.is_empty() => {
            query.push("a.resource_key IN (");
            let mut keys = query.separated(", ");
            for key in values {
                keys.push_bind(*key);
            }
            keys.push_unseparated(")");
        }
        Predicate::InSet { .. } => {
            query.push("0 = 1");
        }
    }
}

fn push_junction(
    query: &mut QueryBuilder<'_, Sqlite>,
    children: &[Predicate],
    separator: &str,
    empty: &str,
) {
    if children.is_empty() {
        query.push(empty);
        return;
    }
    query.push("(");
    for (i, child) in children.iter().enumerate() {
        if i > 0 {
            query.push(separator);
        }
        push_predicate(query, child);
    }
    query.push(")");
}

fn push_compare(query: &mut QueryBuilder<'_, Sqlite>, field: Field, op: CompareOp, value: &Value) {
    match (field, value) {
        (Field::Status, Value::Status(status)) if op == CompareOp::Eq => {
            query.push("v.status = ").push_bind(status.code());
        }
        (Field::Title | Field::Content, Value::Text(term)) => {
            let title = field == Field::Title;
            query.push(
                "EXISTS (SELECT 1 FROM article_localizations l WHERE l.version_id = v.id AND ",
            );
            match op {
                CompareOp::Eq => {
                    query
                        .push(if title { "l.title" } else { "l.body" })
                        .push(" = ")
                        .push_bind(term.clone());
                }
                // Folded columns hold `to_lowercase()` text; LIKE's own folding is ASCII only.
                CompareOp::Contains => {
                    query
                        .push(if title { "l.title_folded" } else { "l.body_folded" })
                        .push(" LIKE ")
                        .push_bind(like_pattern(&term.to_lowercase()))
                        .push(" ESCAPE '\\'");
                }
            }
            query.push(")");
        }
        (Field::ResourceKey, Value::Text(term)) if op == CompareOp::Eq => {
            match term.parse::<ResourceKey>() {
                Ok(key) => {
                    query.push("a.resource_key = ").push_bind(key);
                }
                Err(_) => {
                    query.push("0 = 1");
                }
            }
        }
        _ => {
            query.push("0 = 1");
        }
    }
}

fn like_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, CollaboratorError> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| CollaboratorError::unavailable(format!("bad timestamp {:?}: {}", value, e)))
}
