use time::OffsetDateTime;
use uuid::Uuid;

use crate::entity::{EntityRelationship, ExtractedEntity};

/// One row of the append-only extraction log: everything a single
/// extraction run produced for one document. Entities are stored
/// deduplicated; relationships are stored raw.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct ExtractionRecord {
	pub record_id: Uuid,
	pub tenant_id: String,
	pub document_id: String,
	pub document_name: String,
	pub entities: Vec<ExtractedEntity>,
	pub relationships: Vec<EntityRelationship>,
	pub entity_count: u32,
	pub relationship_count: u32,
	#[serde(with = "time::serde::rfc3339")]
	pub created_at: OffsetDateTime,
}
impl ExtractionRecord {
	pub fn new(
		tenant_id: &str,
		document_id: &str,
		document_name: &str,
		entities: Vec<ExtractedEntity>,
		relationships: Vec<EntityRelationship>,
		created_at: OffsetDateTime,
	) -> Self {
		let entity_count = entities.len() as u32;
		let relationship_count = relationships.len() as u32;

		Self {
			record_id: Uuid::new_v4(),
			tenant_id: tenant_id.to_string(),
			document_id: document_id.to_string(),
			document_name: document_name.to_string(),
			entities,
			relationships,
			entity_count,
			relationship_count,
			created_at,
		}
	}
}
