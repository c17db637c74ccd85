use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use bf_core::{
    ArticleRecord, ArticleStore, EnhancedArticleRecord, EnhancedArticleStore, Error, Result,
};
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool};
use sqlx::Row;

const MIGRATIONS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS articles (
        id TEXT PRIMARY KEY,
        title TEXT NOT NULL,
        content TEXT NOT NULL,
        content_html TEXT NOT NULL,
        author TEXT NOT NULL,
        published_date TEXT NOT NULL,
        source_url TEXT NOT NULL,
        image_url TEXT NOT NULL,
        excerpt TEXT NOT NULL,
        tags TEXT NOT NULL,
        is_scraped INTEGER NOT NULL,
        original_article_id TEXT,
        version INTEGER NOT NULL,
        created_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS enhanced_articles (
        id TEXT PRIMARY KEY,
        original_article_id TEXT NOT NULL,
        title TEXT NOT NULL,
        content TEXT NOT NULL,
        content_html TEXT NOT NULL,
        reference_articles TEXT NOT NULL,
        citations TEXT NOT NULL,
        citations_html TEXT NOT NULL,
        enhanced_at TEXT NOT NULL,
        model_used TEXT NOT NULL,
        search_query TEXT NOT NULL
    )
    "#,
    // Add future migrations here
];

pub struct SqliteStore {
    pool: Arc<SqlitePool>,
    db_path: PathBuf,
}

impl SqliteStore {
    pub async fn open(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true);
        let pool = SqlitePool::connect_with(options)
            .await
            .map_err(|e| Error::Storage(format!("failed to open {}: {}", db_path.display(), e)))?;

        for (i, migration) in MIGRATIONS.iter().enumerate() {
            sqlx::query(migration)
                .execute(&pool)
                .await
                .map_err(|e| Error::Storage(format!("migration {} failed: {}", i, e)))?;
        }

        Ok(Self {
            pool: Arc::new(pool),
            db_path: db_path.to_path_buf(),
        })
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }
}

fn parse_datetime(raw: &str, column: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::Storage(format!("bad {} timestamp: {}", column, e)))
}

fn article_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<ArticleRecord> {
    let tags: String = row.get("tags");
    Ok(ArticleRecord {
        id: row.get("id"),
        title: row.get("title"),
        content: row.get("content"),
        content_html: row.get("content_html"),
        author: row.get("author"),
        published_date: parse_datetime(row.get("published_date"), "published_date")?,
        source_url: row.get("source_url"),
        image_url: row.get("image_url"),
        excerpt: row.get("excerpt"),
        tags: serde_json::from_str(&tags)?,
        is_scraped: row.get::<i64, _>("is_scraped") != 0,
        original_article_id: row.get("original_article_id"),
        version: row.get::<i64, _>("version") as u32,
        created_at: parse_datetime(row.get("created_at"), "created_at")?,
    })
}

fn enhanced_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<EnhancedArticleRecord> {
    let references: String = row.get("reference_articles");
    Ok(EnhancedArticleRecord {
        id: row.get("id"),
        original_article_id: row.get("original_article_id"),
        title: row.get("title"),
        content: row.get("content"),
        content_html: row.get("content_html"),
        reference_articles: serde_json::from_str(&references)?,
        citations: row.get("citations"),
        citations_html: row.get("citations_html"),
        enhanced_at: parse_datetime(row.get("enhanced_at"), "enhanced_at")?,
        model_used: row.get("model_used"),
        search_query: row.get("search_query"),
    })
}

async fn write_article(pool: &SqlitePool, record: &ArticleRecord, replace: bool) -> Result<()> {
    let verb = if replace { "INSERT OR REPLACE" } else { "INSERT" };
    let tags = serde_json::to_string(&record.tags)?;
    sqlx::query(&format!(
        r#"
        {} INTO articles
        (id, title, content, content_html, author, published_date, source_url,
         image_url, excerpt, tags, is_scraped, original_article_id, version, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
        verb
    ))
    .bind(&record.id)
    .bind(&record.title)
    .bind(&record.content)
    .bind(&record.content_html)
    .bind(&record.author)
    .bind(record.published_date.to_rfc3339())
    .bind(&record.source_url)
    .bind(&record.image_url)
    .bind(&record.excerpt)
    .bind(tags)
    .bind(record.is_scraped as i64)
    .bind(record.original_article_id.as_deref())
    .bind(record.version as i64)
    .bind(record.created_at.to_rfc3339())
    .execute(pool)
    .await
    .map_err(|e| Error::Storage(format!("failed to write article {}: {}", record.id, e)))?;
    Ok(())
}

#[async_trait]
impl ArticleStore for SqliteStore {
    async fn insert(&self, record: ArticleRecord) -> Result<()> {
        write_article(&self.pool, &record, false).await
    }

    async fn replace(&self, record: ArticleRecord) -> Result<()> {
        let existing = sqlx::query("SELECT id FROM articles WHERE id = ?")
            .bind(&record.id)
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| Error::Storage(e.to_string()))?;
        if existing.is_none() {
            return Err(Error::NotFound(format!("article {}", record.id)));
        }
        write_article(&self.pool, &record, true).await
    }

    async fn get(&self, id: &str) -> Result<Option<ArticleRecord>> {
        let row = sqlx::query("SELECT * FROM articles WHERE id = ?")
            .bind(id)
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| Error::Storage(e.to_string()))?;
        row.map(|r| article_from_row(&r)).transpose()
    }

    async fn find_by_source_url(&self, url: &str) -> Result<Option<ArticleRecord>> {
        let row = sqlx::query(
            "SELECT * FROM articles WHERE source_url = ? AND original_article_id IS NULL",
        )
        .bind(url)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| Error::Storage(e.to_string()))?;
        row.map(|r| article_from_row(&r)).transpose()
    }

    async fn list(&self, offset: usize, limit: usize) -> Result<Vec<ArticleRecord>> {
        let rows = sqlx::query("SELECT * FROM articles ORDER BY created_at DESC LIMIT ? OFFSET ?")
            .bind(limit as i64)
            .bind(offset as i64)
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| Error::Storage(e.to_string()))?;
        rows.iter().map(article_from_row).collect()
    }

    async fn count(&self) -> Result<usize> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM articles")
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| Error::Storage(e.to_string()))?;
        Ok(row.get::<i64, _>("n") as usize)
    }

    async fn updates_of(&self, root_id: &str) -> Result<Vec<ArticleRecord>> {
        let rows = sqlx::query(
            "SELECT * FROM articles WHERE original_article_id = ? ORDER BY created_at DESC",
        )
        .bind(root_id)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| Error::Storage(e.to_string()))?;
        rows.iter().map(article_from_row).collect()
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM articles WHERE id = ?")
            .bind(id)
            .execute(&*self.pool)
            .await
            .map_err(|e| Error::Storage(e.to_string()))?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl EnhancedArticleStore for SqliteStore {
    async fn insert_enhanced(&self, record: EnhancedArticleRecord) -> Result<()> {
        let references = serde_json::to_string(&record.reference_articles)?;
        sqlx::query(
            r#"
            INSERT INTO enhanced_articles
            (id, original_article_id, title, content, content_html, reference_articles,
             citations, citations_html, enhanced_at, model_used, search_query)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&record.id)
        .bind(&record.original_article_id)
        .bind(&record.title)
        .bind(&record.content)
        .bind(&record.content_html)
        .bind(references)
        .bind(&record.citations)
        .bind(&record.citations_html)
        .bind(record.enhanced_at.to_rfc3339())
        .bind(&record.model_used)
        .bind(&record.search_query)
        .execute(&*self.pool)
        .await
        .map_err(|e| Error::Storage(format!("failed to write enhanced {}: {}", record.id, e)))?;
        Ok(())
    }

    async fn latest_for(&self, original_id: &str) -> Result<Option<EnhancedArticleRecord>> {
        let row = sqlx::query(
            "SELECT * FROM enhanced_articles WHERE original_article_id = ? \
             ORDER BY enhanced_at DESC LIMIT 1",
        )
        .bind(original_id)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| Error::Storage(e.to_string()))?;
        row.map(|r| enhanced_from_row(&r)).transpose()
    }

    async fn all_for(&self, original_id: &str) -> Result<Vec<EnhancedArticleRecord>> {
        let rows = sqlx::query(
            "SELECT * FROM enhanced_articles WHERE original_article_id = ? \
             ORDER BY enhanced_at DESC",
        )
        .bind(original_id)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| Error::Storage(e.to_string()))?;
        rows.iter().map(enhanced_from_row).collect()
    }
}
