use async_trait::async_trait;
use chrono::Utc;
use sqlx::{sqlite::SqlitePoolOptions, Pool, Sqlite};

use super::{ImageStore, StoreError, StoreResult};
use crate::image::{Image, ImageSpec, ImageStatus};

const INIT_SQL: &str = r"
CREATE TABLE IF NOT EXISTS images (
    namespace TEXT NOT NULL,
    name TEXT NOT NULL,
    resource_version INTEGER NOT NULL,
    spec TEXT NOT NULL,
    status TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    PRIMARY KEY (namespace, name)
);
";

/// Image store persisted in a SQLite database.
///
/// Spec and status are stored as JSON documents; `resource_version` is the
/// optimistic-concurrency token checked by every status update.
pub struct SqliteImageStore {
    pool: Pool<Sqlite>,
}

impl SqliteImageStore {
    pub async fn open(path: &str) -> StoreResult<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&format!("sqlite:{path}?mode=rwc"))
            .await?;

        sqlx::query(INIT_SQL).execute(&pool).await?;

        Ok(Self { pool })
    }

    pub async fn open_memory() -> StoreResult<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;

        sqlx::query(INIT_SQL).execute(&pool).await?;

        Ok(Self { pool })
    }

    pub async fn list_images(&self, namespace: &str) -> StoreResult<Vec<Image>> {
        let rows: Vec<(String, String, i64, String, String)> = sqlx::query_as(
            r"
            SELECT namespace, name, resource_version, spec, status
            FROM images WHERE namespace = ? ORDER BY name
            ",
        )
        .bind(namespace)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(parse_image_row).collect()
    }

    async fn current_version(&self, namespace: &str, name: &str) -> StoreResult<Option<i64>> {
        let row: Option<(i64,)> = sqlx::query_as(
            "SELECT resource_version FROM images WHERE namespace = ? AND name = ?",
        )
        .bind(namespace)
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(version,)| version))
    }
}

#[async_trait]
impl ImageStore for SqliteImageStore {
    async fn get_image(&self, namespace: &str, name: &str) -> StoreResult<Image> {
        let row: (String, String, i64, String, String) = sqlx::query_as(
            r"
            SELECT namespace, name, resource_version, spec, status
            FROM images WHERE namespace = ? AND name = ?
            ",
        )
        .bind(namespace)
        .bind(name)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::not_found(namespace, name))?;

        parse_image_row(row)
    }

    async fn create_image(&self, image: &Image) -> StoreResult<Image> {
        let spec_json = serde_json::to_string(&image.spec)?;
        let status_json = serde_json::to_string(&image.status)?;
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            r"
            INSERT INTO images (namespace, name, resource_version, spec, status, created_at, updated_at)
            VALUES (?, ?, 1, ?, ?, ?, ?)
            ",
        )
        .bind(&image.namespace)
        .bind(&image.name)
        .bind(spec_json)
        .bind(status_json)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e {
                if db_err.is_unique_violation() {
                    return StoreError::AlreadyExists {
                        namespace: image.namespace.clone(),
                        name: image.name.clone(),
                    };
                }
            }
            StoreError::Database(e)
        })?;

        self.get_image(&image.namespace, &image.name).await
    }

    async fn update_status(&self, image: &Image) -> StoreResult<Image> {
        let status_json = serde_json::to_string(&image.status)?;

        let result = sqlx::query(
            r"
            UPDATE images
            SET status = ?, resource_version = resource_version + 1, updated_at = ?
            WHERE namespace = ? AND name = ? AND resource_version = ?
            ",
        )
        .bind(status_json)
        .bind(Utc::now().to_rfc3339())
        .bind(&image.namespace)
        .bind(&image.name)
        .bind(image.resource_version)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return match self.current_version(&image.namespace, &image.name).await? {
                Some(actual) => Err(StoreError::Conflict {
                    namespace: image.namespace.clone(),
                    name: image.name.clone(),
                    expected: image.resource_version,
                    actual,
                }),
                None => Err(StoreError::not_found(&image.namespace, &image.name)),
            };
        }

        self.get_image(&image.namespace, &image.name).await
    }
}

fn parse_image_row(row: (String, String, i64, String, String)) -> StoreResult<Image> {
    let (namespace, name, resource_version, spec_json, status_json) = row;
    let spec: ImageSpec = serde_json::from_str(&spec_json)?;
    let status: ImageStatus = serde_json::from_str(&status_json)?;

    Ok(Image {
        namespace,
        name,
        resource_version,
        spec,
        status,
    })
}
