//! SQLite-backed persistent vector store.
//!
//! In-process store using SQLite for vectors and metadata and
//! brute-force cosine similarity for search, scoped per namespace.

use std::collections::BTreeMap;
use std::path::PathBuf;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};

use super::store::{DeleteScope, IndexStats, PersistentVectorStore, VectorMetadata, VectorRecord};
use super::types::{EmbeddingVector, MatchSource, RetrievalMatch};
use crate::core::config::AppPaths;
use crate::core::errors::RagError;
use crate::vector_math;

pub struct SqliteVectorStore {
    pool: SqlitePool,
    db_path: PathBuf,
}

impl SqliteVectorStore {
    pub async fn new(paths: &AppPaths) -> Result<Self, RagError> {
        Self::with_path(paths.db_path.clone()).await
    }

    pub async fn with_path(db_path: PathBuf) -> Result<Self, RagError> {
        let options = SqliteConnectOptions::new()
            .filename(&db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(RagError::store)?;

        let store = Self { pool, db_path };
        store.init_schema().await?;
        Ok(store)
    }

    pub fn db_path(&self) -> &PathBuf {
        &self.db_path
    }

    async fn init_schema(&self) -> Result<(), RagError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS vectors (
                namespace TEXT NOT NULL,
                id TEXT NOT NULL,
                text TEXT NOT NULL,
                doc_id TEXT,
                metadata TEXT NOT NULL DEFAULT '{}',
                embedding BLOB NOT NULL,
                created_at TEXT NOT NULL DEFAULT (STRFTIME('%Y-%m-%dT%H:%M:%fZ', 'now')),
                PRIMARY KEY (namespace, id)
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(RagError::store)?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_vectors_doc ON vectors(namespace, doc_id)")
            .execute(&self.pool)
            .await
            .map_err(RagError::store)?;

        Ok(())
    }

    fn serialize_embedding(embedding: &[f32]) -> Vec<u8> {
        embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
    }

    fn deserialize_embedding(bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect()
    }

    async fn write_record<'e, E>(
        executor: E,
        namespace: &str,
        id: &str,
        vector: &EmbeddingVector,
        metadata: &VectorMetadata,
    ) -> Result<(), RagError>
    where
        E: sqlx::Executor<'e, Database = sqlx::Sqlite>,
    {
        if vector.is_empty() {
            return Err(RagError::Validation(format!(
                "vector '{}' in namespace '{}' is empty",
                id, namespace
            )));
        }
        let metadata_str = serde_json::to_string(metadata).map_err(RagError::internal)?;
        let blob = Self::serialize_embedding(vector.as_slice());

        sqlx::query(
            "INSERT OR REPLACE INTO vectors (namespace, id, text, doc_id, metadata, embedding)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )
        .bind(namespace)
        .bind(id)
        .bind(&metadata.text)
        .bind(metadata.doc_id.as_deref())
        .bind(&metadata_str)
        .bind(&blob)
        .execute(executor)
        .await
        .map_err(RagError::store)?;

        Ok(())
    }
}

#[async_trait]
impl PersistentVectorStore for SqliteVectorStore {
    async fn query(
        &self,
        namespace: &str,
        vector: &EmbeddingVector,
        top_k: usize,
    ) -> Result<Vec<RetrievalMatch>, RagError> {
        if top_k == 0 {
            return Ok(Vec::new());
        }

        let rows = sqlx::query(
            "SELECT text, embedding
             FROM vectors
             WHERE namespace = ?1
             ORDER BY rowid",
        )
        .bind(namespace)
        .fetch_all(&self.pool)
        .await
        .map_err(RagError::store)?;

        let mut texts = Vec::with_capacity(rows.len());
        let mut embeddings = Vec::with_capacity(rows.len());
        for row in &rows {
            let bytes: Vec<u8> = row.get("embedding");
            texts.push(row.get::<String, _>("text"));
            embeddings.push(Self::deserialize_embedding(&bytes));
        }

        Ok(
            vector_math::rank_descending_by_cosine(vector.as_slice(), &embeddings)
                .into_iter()
                .take(top_k)
                .map(|(idx, score)| {
                    RetrievalMatch::new(std::mem::take(&mut texts[idx]), score, MatchSource::Store)
                })
                .collect(),
        )
    }

    async fn upsert(
        &self,
        namespace: &str,
        id: &str,
        vector: &EmbeddingVector,
        metadata: VectorMetadata,
    ) -> Result<(), RagError> {
        Self::write_record(&self.pool, namespace, id, vector, &metadata).await
    }

    async fn upsert_batch(&self, namespace: &str, records: Vec<VectorRecord>) -> Result<(), RagError> {
        if records.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await.map_err(RagError::store)?;
        for record in &records {
            Self::write_record(&mut *tx, namespace, &record.id, &record.vector, &record.metadata)
                .await?;
        }
        tx.commit().await.map_err(RagError::store)?;

        tracing::debug!("Upserted {} vectors into '{}'", records.len(), namespace);
        Ok(())
    }

    async fn delete(&self, namespace: &str, scope: DeleteScope) -> Result<usize, RagError> {
        let removed = match scope {
            DeleteScope::All => sqlx::query("DELETE FROM vectors WHERE namespace = ?1")
                .bind(namespace)
                .execute(&self.pool)
                .await
                .map_err(RagError::store)?
                .rows_affected(),
            DeleteScope::Document(doc_id) => {
                sqlx::query("DELETE FROM vectors WHERE namespace = ?1 AND doc_id = ?2")
                    .bind(namespace)
                    .bind(&doc_id)
                    .execute(&self.pool)
                    .await
                    .map_err(RagError::store)?
                    .rows_affected()
            }
            DeleteScope::Ids(ids) => {
                let mut tx = self.pool.begin().await.map_err(RagError::store)?;
                let mut removed = 0;
                for id in &ids {
                    removed += sqlx::query("DELETE FROM vectors WHERE namespace = ?1 AND id = ?2")
                        .bind(namespace)
                        .bind(id)
                        .execute(&mut *tx)
                        .await
                        .map_err(RagError::store)?
                        .rows_affected();
                }
                tx.commit().await.map_err(RagError::store)?;
                removed
            }
        };

        Ok(removed as usize)
    }

    async fn describe_stats(&self, namespace: Option<&str>) -> Result<IndexStats, RagError> {
        let rows = if let Some(namespace) = namespace {
            sqlx::query(
                "SELECT namespace, COUNT(*) AS count
                 FROM vectors
                 WHERE namespace = ?1
                 GROUP BY namespace",
            )
            .bind(namespace)
            .fetch_all(&self.pool)
            .await
            .map_err(RagError::store)?
        } else {
            sqlx::query(
                "SELECT namespace, COUNT(*) AS count
                 FROM vectors
                 GROUP BY namespace",
            )
            .fetch_all(&self.pool)
            .await
            .map_err(RagError::store)?
        };

        let namespaces: BTreeMap<String, usize> = rows
            .iter()
            .map(|row| {
                let count: i64 = row.get("count");
                (row.get::<String, _>("namespace"), count as usize)
            })
            .collect();
        let total = namespaces.values().sum();

        Ok(IndexStats { namespaces, total })
    }
}
