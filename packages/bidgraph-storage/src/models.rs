use serde_json::Value;
use time::OffsetDateTime;
use uuid::Uuid;

/// One chunk surfaced by either retrieval leg, scored in that leg's own
/// scale. Scores are only comparable within a single leg; fusion works on
/// ranks, not on these raw values.
#[derive(Clone, Debug, PartialEq)]
pub struct ChunkMatch {
	pub id: String,
	pub content: String,
	pub similarity: f32,
	pub metadata: Value,
}

#[derive(Clone, Debug, sqlx::FromRow)]
pub struct ChunkMatchRow {
	pub chunk_id: String,
	pub content: String,
	pub similarity: f32,
	pub metadata: Value,
}
impl From<ChunkMatchRow> for ChunkMatch {
	fn from(row: ChunkMatchRow) -> Self {
		Self {
			id: row.chunk_id,
			content: row.content,
			similarity: row.similarity,
			metadata: row.metadata,
		}
	}
}

#[derive(Clone, Debug, sqlx::FromRow)]
pub struct ExtractionRecordRow {
	pub record_id: Uuid,
	pub tenant_id: String,
	pub document_id: String,
	pub document_name: String,
	pub entities: Value,
	pub relationships: Value,
	pub entity_count: i32,
	pub relationship_count: i32,
	pub created_at: OffsetDateTime,
}

#[derive(Clone, Debug, sqlx::FromRow)]
pub struct GraphNodeRow {
	pub name: String,
	pub entity_type: String,
	pub confidence: f32,
	pub occurrence_count: i64,
	pub document_ids: Vec<String>,
}

#[derive(Clone, Debug, sqlx::FromRow)]
pub struct EntityPairRow {
	pub entity1: String,
	pub entity2: String,
	pub pair_count: i64,
}
