use bidgraph_domain::EntityType;
use bidgraph_graph::{EntityPair, GraphNode};
use sqlx::PgExecutor;

use crate::{
	Result,
	models::{EntityPairRow, GraphNodeRow},
};

/// Case-insensitive containment match in either direction against the
/// normalized node name. An empty query matches nothing.
pub async fn matching_nodes<'e, E>(
	executor: E,
	tenant_id: &str,
	query: &str,
	type_filter: Option<EntityType>,
) -> Result<Vec<GraphNode>>
where
	E: PgExecutor<'e>,
{
	let query_lower = query.trim().to_lowercase();

	if query_lower.is_empty() {
		return Ok(Vec::new());
	}

	let rows = sqlx::query_as::<_, GraphNodeRow>(
		"\
SELECT
\tname,
\tentity_type,
\tconfidence,
\toccurrence_count,
\tdocument_ids
FROM graph_nodes
WHERE tenant_id = $1
\tAND ($3::text IS NULL OR entity_type = $3)
\tAND (position($2 IN name_norm) > 0 OR position(name_norm IN $2) > 0)
ORDER BY occurrence_count DESC, name_norm ASC",
	)
	.bind(tenant_id)
	.bind(query_lower)
	.bind(type_filter.map(|entity_type| entity_type.as_str()))
	.fetch_all(executor)
	.await?;

	Ok(rows.into_iter().filter_map(node_from_row).collect())
}

pub async fn nodes_by_type<'e, E>(
	executor: E,
	tenant_id: &str,
	entity_type: EntityType,
	limit: u32,
) -> Result<Vec<GraphNode>>
where
	E: PgExecutor<'e>,
{
	let rows = sqlx::query_as::<_, GraphNodeRow>(
		"\
SELECT
\tname,
\tentity_type,
\tconfidence,
\toccurrence_count,
\tdocument_ids
FROM graph_nodes
WHERE tenant_id = $1 AND entity_type = $2
ORDER BY occurrence_count DESC, name_norm ASC
LIMIT $3",
	)
	.bind(tenant_id)
	.bind(entity_type.as_str())
	.bind(limit as i64)
	.fetch_all(executor)
	.await?;

	Ok(rows.into_iter().filter_map(node_from_row).collect())
}

/// Pair counters are stored under the sorted key orientation; queries
/// accept either orientation.
pub async fn pair_counts<'e, E>(
	executor: E,
	tenant_id: &str,
	type1: EntityType,
	type2: EntityType,
	limit: u32,
) -> Result<Vec<EntityPair>>
where
	E: PgExecutor<'e>,
{
	let rows = sqlx::query_as::<_, EntityPairRow>(
		"\
SELECT
\tentity1,
\tentity2,
\tpair_count
FROM graph_entity_pairs
WHERE tenant_id = $1
\tAND ((type_a = $2 AND type_b = $3) OR (type_a = $3 AND type_b = $2))
ORDER BY pair_count DESC, entity1 ASC, entity2 ASC
LIMIT $4",
	)
	.bind(tenant_id)
	.bind(type1.as_str())
	.bind(type2.as_str())
	.bind(limit as i64)
	.fetch_all(executor)
	.await?;

	Ok(rows
		.into_iter()
		.map(|row| EntityPair {
			entity1: row.entity1,
			entity2: row.entity2,
			cooccurrence_count: row.pair_count.max(0) as u64,
		})
		.collect())
}

pub async fn document_count<'e, E>(executor: E, tenant_id: &str) -> Result<u64>
where
	E: PgExecutor<'e>,
{
	let (count,): (i64,) = sqlx::query_as(
		"SELECT COUNT(DISTINCT document_id) FROM extraction_records WHERE tenant_id = $1",
	)
	.bind(tenant_id)
	.fetch_one(executor)
	.await?;

	Ok(count.max(0) as u64)
}

// Rows only ever hold whitelisted types, but an unrecognized value from a
// hand-edited database is dropped rather than failing the whole query.
fn node_from_row(row: GraphNodeRow) -> Option<GraphNode> {
	let entity_type = EntityType::parse(&row.entity_type)?;

	Some(GraphNode {
		name: row.name,
		entity_type,
		confidence: row.confidence,
		document_ids: row.document_ids,
		occurrence_count: row.occurrence_count.max(0) as u64,
	})
}
