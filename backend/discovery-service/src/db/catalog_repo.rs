/// Catalog Repository
///
/// PostgreSQL implementation of the storage collaborator. Schema lives in
/// `migrations/0001_catalog.sql`.
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::{debug, error};

use super::{CatalogStore, PackQuery, PackSort};
use crate::error::{AppError, Result};
use crate::models::{
    CandidateItem, CategoryStats, EngagementCounters, InteractionHistory, PackSummary,
    StickerPreview, StickerSummary, VisibilityFlags,
};

const PACK_COLUMNS: &str = r#"
    p.id,
    p.creator_id,
    p.name,
    COALESCE(p.description, '') AS description,
    p.category_ids,
    p.created_at,
    p.is_animated,
    p.sticker_count,
    p.tray_image_url,
    p.downloads,
    p.views,
    p.favorites,
    p.is_private,
    p.is_authorized
"#;

/// Visibility is hard-coded; the five binds are exclusions, category,
/// animated flag, window start and the viewer's creator id.
const PACK_PREDICATE: &str = r#"
    WHERE p.deleted_at IS NULL
        AND p.is_private = FALSE
        AND p.is_authorized = TRUE
        AND NOT (p.id = ANY($1::TEXT[]))
        AND ($2::TEXT IS NULL OR $2 = ANY(p.category_ids))
        AND ($3::BOOLEAN IS NULL OR p.is_animated = $3)
        AND ($4::TIMESTAMPTZ IS NULL OR p.created_at >= $4)
        AND ($5::TEXT IS NULL OR p.creator_id <> $5)
"#;

#[derive(Debug, sqlx::FromRow)]
struct PackRow {
    id: String,
    creator_id: String,
    name: String,
    description: String,
    category_ids: Vec<String>,
    created_at: DateTime<Utc>,
    is_animated: bool,
    sticker_count: i32,
    tray_image_url: Option<String>,
    downloads: i64,
    views: i64,
    favorites: i64,
    is_private: bool,
    is_authorized: bool,
}

impl From<PackRow> for CandidateItem {
    fn from(row: PackRow) -> Self {
        Self {
            id: row.id,
            creator_id: row.creator_id,
            name: row.name,
            description: row.description,
            category_ids: row.category_ids,
            created_at: row.created_at,
            is_animated: row.is_animated,
            sticker_count: row.sticker_count.max(0) as u32,
            tray_image_url: row.tray_image_url,
            engagement: EngagementCounters {
                downloads: row.downloads.max(0) as u64,
                views: row.views.max(0) as u64,
                favorites: row.favorites.max(0) as u64,
            },
            visibility: VisibilityFlags {
                is_private: row.is_private,
                is_authorized: row.is_authorized,
            },
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct PackSummaryRow {
    id: String,
    creator_id: String,
    name: String,
    description: String,
    category_ids: Vec<String>,
    is_animated: bool,
}

impl From<PackSummaryRow> for PackSummary {
    fn from(row: PackSummaryRow) -> Self {
        Self {
            id: row.id,
            creator_id: row.creator_id,
            name: row.name,
            description: row.description,
            category_ids: row.category_ids,
            is_animated: row.is_animated,
        }
    }
}

pub struct PgCatalogStore {
    pool: PgPool,
}

impl PgCatalogStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn order_clause(sort: PackSort) -> &'static str {
        match sort {
            PackSort::Newest => "p.created_at DESC, p.id",
            PackSort::Popular => "p.downloads DESC, p.favorites DESC, p.created_at DESC, p.id",
        }
    }

    fn excluded(query: &PackQuery) -> Vec<String> {
        query.exclude_ids.iter().cloned().collect()
    }

    async fn fetch_ranked(
        &self,
        query: &PackQuery,
        order: &str,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<CandidateItem>> {
        let sql = format!(
            "SELECT {} FROM packs p {} ORDER BY {} OFFSET $6 LIMIT $7",
            PACK_COLUMNS, PACK_PREDICATE, order
        );

        let rows = sqlx::query_as::<_, PackRow>(&sql)
            .bind(Self::excluded(query))
            .bind(query.category_id.as_deref())
            .bind(query.animated)
            .bind(query.created_after)
            .bind(query.exclude_creator_id.as_deref())
            .bind(i64::try_from(offset).unwrap_or(i64::MAX))
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                error!("Failed to query packs: {}", e);
                AppError::Database(e.to_string())
            })?;

        Ok(rows.into_iter().map(CandidateItem::from).collect())
    }

    async fn fetch_summaries(
        &self,
        sql: &str,
        viewer_id: &str,
        limit: usize,
    ) -> Result<Vec<PackSummary>> {
        let rows = sqlx::query_as::<_, PackSummaryRow>(sql)
            .bind(viewer_id)
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                error!("Failed to load interaction history: {}", e);
                AppError::Database(e.to_string())
            })?;

        Ok(rows.into_iter().map(PackSummary::from).collect())
    }
}

#[async_trait]
impl CatalogStore for PgCatalogStore {
    async fn find_packs(&self, query: &PackQuery) -> Result<Vec<CandidateItem>> {
        if query.limit == 0 {
            return Ok(Vec::new());
        }
        self.fetch_ranked(query, Self::order_clause(query.sort), query.offset, query.limit)
            .await
    }

    async fn sample_packs(&self, query: &PackQuery, size: usize) -> Result<Vec<CandidateItem>> {
        if size == 0 {
            return Ok(Vec::new());
        }
        self.fetch_ranked(query, "random()", 0, size).await
    }

    async fn count_packs(&self, query: &PackQuery) -> Result<u64> {
        let sql = format!("SELECT COUNT(*) FROM packs p {}", PACK_PREDICATE);

        let (count,): (i64,) = sqlx::query_as(&sql)
            .bind(Self::excluded(query))
            .bind(query.category_id.as_deref())
            .bind(query.animated)
            .bind(query.created_after)
            .bind(query.exclude_creator_id.as_deref())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                error!("Failed to count packs: {}", e);
                AppError::Database(e.to_string())
            })?;

        Ok(count.max(0) as u64)
    }

    async fn interaction_history(
        &self,
        viewer_id: &str,
        limit: usize,
    ) -> Result<Option<InteractionHistory>> {
        let (exists,): (bool,) = sqlx::query_as(
            "SELECT EXISTS(SELECT 1 FROM users WHERE id = $1 AND deleted_at IS NULL)",
        )
        .bind(viewer_id)
        .fetch_one(&self.pool)
        .await?;

        if !exists {
            debug!(viewer_id = %viewer_id, "Viewer not found, no interaction history");
            return Ok(None);
        }

        let owned_packs = self
            .fetch_summaries(
                r#"
                SELECT p.id, p.creator_id, p.name, COALESCE(p.description, '') AS description,
                       p.category_ids, p.is_animated
                FROM packs p
                WHERE p.creator_id = $1 AND p.deleted_at IS NULL
                ORDER BY p.created_at DESC
                LIMIT $2
                "#,
                viewer_id,
                limit,
            )
            .await?;

        let favorite_packs = self
            .fetch_summaries(
                r#"
                SELECT p.id, p.creator_id, p.name, COALESCE(p.description, '') AS description,
                       p.category_ids, p.is_animated
                FROM pack_favorites f
                JOIN packs p ON p.id = f.pack_id
                WHERE f.user_id = $1 AND p.deleted_at IS NULL
                ORDER BY f.created_at DESC
                LIMIT $2
                "#,
                viewer_id,
                limit,
            )
            .await?;

        let favorite_stickers = sqlx::query_as::<_, (String, String, Vec<String>, bool)>(
            r#"
            SELECT s.id, s.pack_id, p.category_ids, s.is_animated
            FROM sticker_favorites f
            JOIN stickers s ON s.id = f.sticker_id
            JOIN packs p ON p.id = s.pack_id
            WHERE f.user_id = $1 AND s.deleted_at IS NULL AND p.deleted_at IS NULL
            ORDER BY f.created_at DESC
            LIMIT $2
            "#,
        )
        .bind(viewer_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(|(id, pack_id, category_ids, is_animated)| StickerSummary {
            id,
            pack_id,
            category_ids,
            is_animated,
        })
        .collect();

        Ok(Some(InteractionHistory {
            owned_packs,
            favorite_packs,
            favorite_stickers,
        }))
    }

    async fn increment_views(
        &self,
        pack_ids: &[String],
        viewer_id: Option<String>,
    ) -> Result<u64> {
        if pack_ids.is_empty() {
            return Ok(0);
        }

        let result = sqlx::query("UPDATE packs SET views = views + 1 WHERE id = ANY($1::TEXT[])")
            .bind(pack_ids)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                error!("Failed to increment pack views: {}", e);
                AppError::Database(e.to_string())
            })?;

        debug!(
            viewer_id = ?viewer_id,
            updated = result.rows_affected(),
            "Incremented pack views"
        );

        Ok(result.rows_affected())
    }

    async fn active_categories(&self, limit: usize) -> Result<Vec<CategoryStats>> {
        let rows = sqlx::query_as::<_, (String, String, i64, i64)>(
            r#"
            SELECT id, name, search_count, pack_count
            FROM categories
            WHERE is_active = TRUE
            ORDER BY search_count DESC, pack_count DESC, id
            LIMIT $1
            "#,
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to load active categories: {}", e);
            AppError::Database(e.to_string())
        })?;

        Ok(rows
            .into_iter()
            .map(|(id, name, search_count, pack_count)| CategoryStats {
                id,
                name,
                search_count: search_count.max(0) as u64,
                pack_count: pack_count.max(0) as u64,
            })
            .collect())
    }

    async fn top_sticker_in_category(&self, category_id: &str) -> Result<Option<StickerPreview>> {
        let row = sqlx::query_as::<_, (String, String, String)>(
            r#"
            SELECT s.id, s.pack_id, s.image_url
            FROM stickers s
            JOIN packs p ON p.id = s.pack_id
            WHERE $1 = ANY(p.category_ids)
                AND p.is_private = FALSE
                AND p.is_authorized = TRUE
                AND p.deleted_at IS NULL
                AND s.deleted_at IS NULL
            ORDER BY (s.downloads + s.views + s.favorites) DESC, s.id
            LIMIT 1
            "#,
        )
        .bind(category_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to load preview sticker for {}: {}", category_id, e);
            AppError::Database(e.to_string())
        })?;

        Ok(row.map(|(sticker_id, pack_id, image_url)| StickerPreview {
            sticker_id: Some(sticker_id),
            pack_id: Some(pack_id),
            image_url,
            is_placeholder: false,
        }))
    }
}
