//! SQLite storage adapter.
//!
//! Holds article versions, their localizations and the asset tagging tables.
//! [`SqliteRepository`] serves both the content and the tagging collaborator.

mod repository;

pub use repository::*;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;

/// Initialize the database connection pool and run migrations.
pub async fn init_database(db_path: &Path) -> Result<SqlitePool, sqlx::Error> {
    // Ensure the parent directory exists
    if let Some(parent) = db_path.parent() {
        tokio::fs::create_dir_all(parent).await.ok();
    }

    let db_url = format!("sqlite:{}?mode=rwc", db_path.display());

    let options = SqliteConnectOptions::from_str(&db_url)?
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
        .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
        .busy_timeout(std::time::Duration::from_secs(30));

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    run_migrations(&pool).await?;

    Ok(pool)
}

async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS articles (
            resource_key INTEGER PRIMARY KEY,
            group_id INTEGER NOT NULL,
            article_id TEXT NOT NULL,
            UNIQUE (group_id, article_id)
        );
        "#,
    )
    .execute(pool)
    .await?;

    // Status codes: 0 approved, 1 pending, 2 draft, 3 expired, 8 trashed.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS article_versions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            resource_key INTEGER NOT NULL REFERENCES articles(resource_key),
            version REAL NOT NULL,
            status INTEGER NOT NULL,
            in_trash INTEGER NOT NULL DEFAULT 0,
            default_language_id TEXT NOT NULL,
            modified_at TEXT NOT NULL,
            UNIQUE (resource_key, version)
        );
        "#,
    )
    .execute(pool)
    .await?;

    // `*_folded` columns hold the Unicode lowercase form used for matching.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS article_localizations (
            version_id INTEGER NOT NULL REFERENCES article_versions(id),
            language_id TEXT NOT NULL,
            title TEXT,
            body TEXT,
            title_folded TEXT,
            body_folded TEXT,
            PRIMARY KEY (version_id, language_id)
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS asset_tags (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            name_folded TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS asset_categories (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            name_folded TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS asset_tag_entries (
            tag_id INTEGER NOT NULL REFERENCES asset_tags(id),
            resource_key INTEGER NOT NULL,
            PRIMARY KEY (tag_id, resource_key)
        );

        CREATE TABLE IF NOT EXISTS asset_category_entries (
            category_id INTEGER NOT NULL REFERENCES asset_categories(id),
            resource_key INTEGER NOT NULL,
            PRIMARY KEY (category_id, resource_key)
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_versions_resource_key ON article_versions(resource_key);
        CREATE INDEX IF NOT EXISTS idx_versions_status ON article_versions(status);
        CREATE INDEX IF NOT EXISTS idx_articles_article_id ON articles(article_id);
        CREATE INDEX IF NOT EXISTS idx_tag_entries_resource_key ON asset_tag_entries(resource_key);
        CREATE INDEX IF NOT EXISTS idx_category_entries_resource_key ON asset_category_entries(resource_key);
        CREATE INDEX IF NOT EXISTS idx_tags_name_folded ON asset_tags(name_folded);
        CREATE INDEX IF NOT EXISTS idx_categories_name_folded ON asset_categories(name_folded);
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
