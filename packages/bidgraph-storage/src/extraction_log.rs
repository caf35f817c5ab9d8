use std::collections::HashMap;

use bidgraph_domain::{EntityType, ExtractedEntity, ExtractionRecord, entity_key};
use sqlx::PgPool;

use crate::{Error, Result, models::ExtractionRecordRow};

/// Appends one extraction record and folds it into the incremental graph
/// aggregates in the same transaction, so graph queries never observe a
/// record without its node and pair updates.
pub async fn append(pool: &PgPool, record: &ExtractionRecord) -> Result<()> {
	let entities = serde_json::to_value(&record.entities)
		.map_err(|err| Error::InvalidArgument(format!("Unencodable entities: {err}")))?;
	let relationships = serde_json::to_value(&record.relationships)
		.map_err(|err| Error::InvalidArgument(format!("Unencodable relationships: {err}")))?;
	let mut tx = pool.begin().await?;

	sqlx::query(
		"\
INSERT INTO extraction_records (
\trecord_id,
\ttenant_id,
\tdocument_id,
\tdocument_name,
\tentities,
\trelationships,
\tentity_count,
\trelationship_count,
\tcreated_at
)
VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9)",
	)
	.bind(record.record_id)
	.bind(record.tenant_id.as_str())
	.bind(record.document_id.as_str())
	.bind(record.document_name.as_str())
	.bind(entities)
	.bind(relationships)
	.bind(record.entity_count as i32)
	.bind(record.relationship_count as i32)
	.bind(record.created_at)
	.execute(&mut *tx)
	.await?;

	// Records store deduplicated entities, but aggregate per key anyway so
	// a record can never contribute more than one occurrence per node.
	let mut unique: HashMap<(EntityType, String), &ExtractedEntity> = HashMap::new();

	for entity in &record.entities {
		let key = entity_key(entity.entity_type, &entity.name);

		unique
			.entry(key)
			.and_modify(|kept| {
				if entity.confidence > kept.confidence {
					*kept = entity;
				}
			})
			.or_insert(entity);
	}

	for ((entity_type, name_norm), entity) in &unique {
		sqlx::query(
			"\
INSERT INTO graph_nodes (
\ttenant_id, entity_type, name_norm, name, confidence, occurrence_count, document_ids, updated_at
)
VALUES ($1,$2,$3,$4,$5,1,ARRAY[$6],now())
ON CONFLICT (tenant_id, entity_type, name_norm) DO UPDATE
SET
\tconfidence = GREATEST(graph_nodes.confidence, EXCLUDED.confidence),
\toccurrence_count = graph_nodes.occurrence_count + 1,
\tdocument_ids = CASE
\t\tWHEN EXCLUDED.document_ids[1] = ANY (graph_nodes.document_ids) THEN graph_nodes.document_ids
\t\tELSE graph_nodes.document_ids || EXCLUDED.document_ids
\tEND,
\tupdated_at = now()",
		)
		.bind(record.tenant_id.as_str())
		.bind(entity_type.as_str())
		.bind(name_norm.as_str())
		.bind(entity.name.trim())
		.bind(entity.confidence)
		.bind(record.document_id.as_str())
		.execute(&mut *tx)
		.await?;
	}

	let mut keys: Vec<&(EntityType, String)> = unique.keys().collect();

	keys.sort();

	for (i, a) in keys.iter().enumerate() {
		for b in keys.iter().skip(i + 1) {
			sqlx::query(
				"\
INSERT INTO graph_entity_pairs (
\ttenant_id, type_a, name_a, type_b, name_b, entity1, entity2, pair_count, updated_at
)
VALUES ($1,$2,$3,$4,$5,$6,$7,1,now())
ON CONFLICT (tenant_id, type_a, name_a, type_b, name_b) DO UPDATE
SET
\tpair_count = graph_entity_pairs.pair_count + 1,
\tupdated_at = now()",
			)
			.bind(record.tenant_id.as_str())
			.bind(a.0.as_str())
			.bind(a.1.as_str())
			.bind(b.0.as_str())
			.bind(b.1.as_str())
			.bind(unique[*a].name.trim())
			.bind(unique[*b].name.trim())
			.execute(&mut *tx)
			.await?;
		}
	}

	tx.commit().await?;

	Ok(())
}

/// Most recent records first. This is the bounded window edge queries scan.
pub async fn recent_records(
	pool: &PgPool,
	tenant_id: &str,
	limit: u32,
) -> Result<Vec<ExtractionRecord>> {
	let rows = sqlx::query_as::<_, ExtractionRecordRow>(
		"\
SELECT
\trecord_id,
\ttenant_id,
\tdocument_id,
\tdocument_name,
\tentities,
\trelationships,
\tentity_count,
\trelationship_count,
\tcreated_at
FROM extraction_records
WHERE tenant_id = $1
ORDER BY created_at DESC, record_id ASC
LIMIT $2",
	)
	.bind(tenant_id)
	.bind(limit as i64)
	.fetch_all(pool)
	.await?;

	rows.into_iter().map(decode_record).collect()
}

fn decode_record(row: ExtractionRecordRow) -> Result<ExtractionRecord> {
	let entities = serde_json::from_value(row.entities)
		.map_err(|err| Error::Decode(format!("extraction_records.entities: {err}")))?;
	let relationships = serde_json::from_value(row.relationships)
		.map_err(|err| Error::Decode(format!("extraction_records.relationships: {err}")))?;

	Ok(ExtractionRecord {
		record_id: row.record_id,
		tenant_id: row.tenant_id,
		document_id: row.document_id,
		document_name: row.document_name,
		entities,
		relationships,
		entity_count: row.entity_count as u32,
		relationship_count: row.relationship_count as u32,
		created_at: row.created_at,
	})
}
