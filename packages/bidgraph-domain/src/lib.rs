pub mod entity;
pub mod record;

pub use entity::{
	EntityRelationship, EntityType, ExtractedEntity, RelationshipType, clamp_unit, dedup_entities,
	entity_key, truncate_chars,
};
pub use record::ExtractionRecord;
