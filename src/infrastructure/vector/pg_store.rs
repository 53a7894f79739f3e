//! pgvector-backed vector store
//!
//! Nearest-neighbour queries go through the HNSW index (`vector_cosine_ops`),
//! so results are approximate: a chunk can be missed when the graph search
//! does not visit it. Raising `ef_search` widens the search at query time.
//! The candidate page is re-sorted by (score desc, created_at asc, id asc)
//! so equal scores come back in insertion order.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pgvector::Vector;
use sqlx::postgres::PgPool;
use sqlx::FromRow;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::domain::errors::StoreError;
use crate::domain::models::{Chunk, NewChunk, ScoredChunk};
use crate::domain::ports::VectorStore;

/// Identifiers longer than this are truncated by Postgres.
const MAX_IDENT_LEN: usize = 63;

/// Validated, optionally schema-qualified table identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableName {
    schema: Option<String>,
    table: String,
}

impl TableName {
    /// Parse `table` or `schema.table`.
    pub fn parse(name: &str) -> Result<Self, StoreError> {
        let parts: Vec<&str> = name.split('.').collect();
        let (schema, table) = match parts.as_slice() {
            [table] => (None, *table),
            [schema, table] => (Some(*schema), *table),
            _ => {
                return Err(StoreError::Schema(format!(
                    "invalid table name '{name}': expected 'table' or 'schema.table'"
                )))
            }
        };

        if let Some(schema) = schema {
            validate_ident(schema)?;
        }
        validate_ident(table)?;

        Ok(Self {
            schema: schema.map(str::to_string),
            table: table.to_string(),
        })
    }

    /// Fully-qualified table reference with quoted identifiers.
    pub fn qualified(&self) -> String {
        match &self.schema {
            Some(schema) => format!("{}.{}", quote_ident(schema), quote_ident(&self.table)),
            None => quote_ident(&self.table),
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }
}

fn validate_ident(ident: &str) -> Result<(), StoreError> {
    let mut chars = ident.chars();
    let valid_start = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    let valid_rest = chars.all(|c| c.is_ascii_alphanumeric() || c == '_');

    if !valid_start || !valid_rest || ident.len() > MAX_IDENT_LEN {
        return Err(StoreError::Schema(format!("invalid identifier '{ident}'")));
    }
    Ok(())
}

/// Quotes Postgres identifiers, escaping embedded quotes.
pub fn quote_ident(input: &str) -> String {
    format!("\"{}\"", input.replace('"', "\"\""))
}

#[derive(Debug, FromRow)]
struct ScoredRow {
    id: Uuid,
    text: String,
    reference_description: Option<String>,
    reference_link: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    score: f64,
}

#[derive(Debug, FromRow)]
struct ChunkRow {
    id: Uuid,
    text: String,
    reference_description: Option<String>,
    reference_link: Option<String>,
    embedding: Option<Vector>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ChunkRow> for Chunk {
    fn from(row: ChunkRow) -> Self {
        Self {
            id: row.id,
            text: row.text,
            reference_description: row.reference_description,
            reference_link: row.reference_link,
            embedding: row.embedding.map(|v| v.to_vec()),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

impl From<ScoredRow> for ScoredChunk {
    #[allow(clippy::cast_possible_truncation)]
    fn from(row: ScoredRow) -> Self {
        Self {
            chunk: Chunk {
                id: row.id,
                text: row.text,
                reference_description: row.reference_description,
                reference_link: row.reference_link,
                embedding: None,
                created_at: row.created_at,
                updated_at: row.updated_at,
            },
            score: row.score as f32,
        }
    }
}

/// Vector store over a pgvector table
#[derive(Debug, Clone)]
pub struct PgVectorStore {
    pool: PgPool,
    table: TableName,
    dimensions: usize,
    ef_search: Option<u32>,
    insert_sql: String,
    nearest_sql: String,
    get_sql: String,
    count_sql: String,
}

impl PgVectorStore {
    pub fn new(pool: PgPool, table: TableName, dimensions: usize, ef_search: Option<u32>) -> Self {
        let qualified = table.qualified();
        Self {
            insert_sql: format!(
                "INSERT INTO {qualified} (text, reference_description, reference_link, embedding) \
                 VALUES ($1, $2, $3, $4) RETURNING id"
            ),
            nearest_sql: format!(
                "SELECT id, text, reference_description, reference_link, created_at, updated_at, score \
                 FROM ( \
                     SELECT id, text, reference_description, reference_link, created_at, updated_at, \
                            1 - (embedding <=> $1) AS score \
                     FROM {qualified} \
                     WHERE embedding IS NOT NULL \
                     ORDER BY embedding <=> $1 \
                     LIMIT $2 \
                 ) AS candidates \
                 WHERE $3::float8 IS NULL OR score >= $3::float8 \
                 ORDER BY score DESC, created_at ASC, id ASC"
            ),
            get_sql: format!(
                "SELECT id, text, reference_description, reference_link, embedding, created_at, updated_at \
                 FROM {qualified} WHERE id = $1"
            ),
            count_sql: format!("SELECT COUNT(*) FROM {qualified}"),
            pool,
            table,
            dimensions,
            ef_search,
        }
    }

    /// Check that the table exists and its `embedding` column has the
    /// configured dimension.
    pub async fn verify_schema(&self) -> Result<(), StoreError> {
        let qualified = self.table.qualified();

        let exists: Option<String> = sqlx::query_scalar("SELECT to_regclass($1)::text")
            .bind(&qualified)
            .fetch_one(&self.pool)
            .await?;
        if exists.is_none() {
            return Err(StoreError::Schema(format!(
                "table {qualified} does not exist; run `kbae migrate`"
            )));
        }

        let typmod: Option<i32> = sqlx::query_scalar(
            "SELECT atttypmod FROM pg_attribute \
             WHERE attrelid = to_regclass($1) AND attname = 'embedding' AND NOT attisdropped",
        )
        .bind(&qualified)
        .fetch_optional(&self.pool)
        .await?;

        match typmod {
            None => Err(StoreError::Schema(format!(
                "table {qualified} has no embedding column"
            ))),
            Some(dims) if usize::try_from(dims).ok() == Some(self.dimensions) => {
                info!(table = %qualified, dimensions = self.dimensions, "Vector schema verified");
                Ok(())
            }
            Some(dims) => Err(StoreError::Schema(format!(
                "embedding column of {qualified} has dimension {dims}, configured {}",
                self.dimensions
            ))),
        }
    }

    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl VectorStore for PgVectorStore {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    #[instrument(skip(self, chunk), fields(table = %self.table.table()))]
    async fn insert(&self, chunk: NewChunk) -> Result<Uuid, StoreError> {
        chunk.validate(self.dimensions)?;

        let id: Uuid = sqlx::query_scalar(&self.insert_sql)
            .bind(&chunk.text)
            .bind(&chunk.reference_description)
            .bind(&chunk.reference_link)
            .bind(Vector::from(chunk.embedding))
            .fetch_one(&self.pool)
            .await?;

        debug!(%id, "Chunk inserted");
        Ok(id)
    }

    #[instrument(skip(self, query), fields(table = %self.table.table()))]
    async fn nearest(
        &self,
        query: &[f32],
        k: usize,
        threshold: Option<f32>,
    ) -> Result<Vec<ScoredChunk>, StoreError> {
        if k == 0 {
            return Err(StoreError::InvalidK);
        }
        if query.len() != self.dimensions {
            return Err(StoreError::DimensionMismatch {
                expected: self.dimensions,
                actual: query.len(),
            });
        }

        let limit = i64::try_from(k).unwrap_or(i64::MAX);
        let vector = Vector::from(query.to_vec());
        let threshold = threshold.map(f64::from);
        let statement = sqlx::query_as::<_, ScoredRow>(&self.nearest_sql)
            .bind(vector)
            .bind(limit)
            .bind(threshold);

        let rows = match self.ef_search {
            Some(ef_search) => {
                let mut tx = self.pool.begin().await?;
                sqlx::query("SELECT set_config('hnsw.ef_search', $1, true)")
                    .bind(ef_search.to_string())
                    .execute(&mut *tx)
                    .await?;
                let rows = statement.fetch_all(&mut *tx).await?;
                tx.commit().await?;
                rows
            }
            None => statement.fetch_all(&self.pool).await?,
        };

        Ok(rows.into_iter().map(ScoredChunk::from).collect())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Chunk>, StoreError> {
        let row = sqlx::query_as::<_, ChunkRow>(&self.get_sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Chunk::from))
    }

    async fn count(&self) -> Result<u64, StoreError> {
        let count: i64 = sqlx::query_scalar(&self.count_sql)
            .fetch_one(&self.pool)
            .await?;
        Ok(u64::try_from(count).unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_name_plain() {
        let table = TableName::parse("chunks").unwrap();
        assert_eq!(table.qualified(), "\"chunks\"");
        assert_eq!(table.table(), "chunks");
    }

    #[test]
    fn test_table_name_schema_qualified() {
        let table = TableName::parse("kb.chunks_v2").unwrap();
        assert_eq!(table.qualified(), "\"kb\".\"chunks_v2\"");
    }

    #[test]
    fn test_table_name_rejects_injection() {
        assert!(TableName::parse("chunks; DROP TABLE chunks").is_err());
        assert!(TableName::parse("a.b.c").is_err());
        assert!(TableName::parse("").is_err());
        assert!(TableName::parse("1chunks").is_err());
        assert!(TableName::parse(&"x".repeat(64)).is_err());
    }

    #[test]
    fn test_quote_ident_escapes_quotes() {
        assert_eq!(quote_ident("we\"ird"), "\"we\"\"ird\"");
    }
}
