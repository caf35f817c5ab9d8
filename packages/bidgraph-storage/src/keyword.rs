use sqlx::PgExecutor;

use crate::{
	Result,
	models::{ChunkMatch, ChunkMatchRow},
};

/// Trigram-similarity lookup over chunk text. The `%` operator prunes
/// candidates through the GIN index before `similarity()` orders what is
/// left, so short queries that share no trigrams with a chunk simply do
/// not return it.
pub async fn keyword_match<'e, E>(
	executor: E,
	tenant_id: &str,
	query: &str,
	document_type: Option<&str>,
	top_k: u32,
) -> Result<Vec<ChunkMatch>>
where
	E: PgExecutor<'e>,
{
	if query.trim().is_empty() {
		return Ok(Vec::new());
	}

	let rows = sqlx::query_as::<_, ChunkMatchRow>(
		"\
SELECT
\tchunk_id,
\tcontent,
\tsimilarity(content, $1)::real AS similarity,
\tmetadata
FROM document_chunks
WHERE tenant_id = $2
\tAND ($3::text IS NULL OR document_type = $3)
\tAND content % $1
ORDER BY similarity DESC, chunk_id ASC
LIMIT $4",
	)
	.bind(query)
	.bind(tenant_id)
	.bind(document_type)
	.bind(top_k as i64)
	.fetch_all(executor)
	.await?;

	Ok(rows.into_iter().map(ChunkMatch::from).collect())
}
