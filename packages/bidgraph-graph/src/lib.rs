//! Query-side view of the extraction log. Node aggregates and
//! co-occurrence counters are maintained incrementally as records are
//! appended, so graph queries never rescan raw records for aggregation.
//! Edge matching stays a scan over a bounded recent window, since edges are
//! reported verbatim per record.

use std::collections::{HashMap, HashSet};

use bidgraph_domain::{EntityType, ExtractionRecord, entity_key};

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct GraphNode {
	pub name: String,
	#[serde(rename = "type")]
	pub entity_type: EntityType,
	/// Max confidence seen across contributing records.
	pub confidence: f32,
	pub document_ids: Vec<String>,
	/// Number of extraction records contributing this entity, not the
	/// number of mentions inside any record.
	pub occurrence_count: u64,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct GraphEdge {
	pub source: String,
	pub target: String,
	#[serde(rename = "type")]
	pub relationship_type: bidgraph_domain::RelationshipType,
	pub strength: f32,
	pub document_id: String,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct EntityPair {
	pub entity1: String,
	pub entity2: String,
	pub cooccurrence_count: u64,
}

#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
pub struct GraphQueryResult {
	pub nodes: Vec<GraphNode>,
	pub edges: Vec<GraphEdge>,
	pub total_documents: u64,
}

type NodeKey = (EntityType, String);
type PairKey = (NodeKey, NodeKey);

/// Per-tenant aggregates, updated once per appended record.
#[derive(Clone, Debug, Default)]
pub struct GraphIndex {
	nodes: HashMap<NodeKey, GraphNode>,
	pairs: HashMap<PairKey, EntityPair>,
	documents: HashSet<String>,
}
impl GraphIndex {
	pub fn apply(&mut self, record: &ExtractionRecord) {
		// Records store deduplicated entities, but aggregate per key anyway
		// so a record can never contribute more than one occurrence.
		let mut unique: HashMap<NodeKey, &bidgraph_domain::ExtractedEntity> = HashMap::new();

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

		for (key, entity) in &unique {
			let node = self.nodes.entry(key.clone()).or_insert_with(|| GraphNode {
				name: entity.name.trim().to_string(),
				entity_type: entity.entity_type,
				confidence: 0.0,
				document_ids: Vec::new(),
				occurrence_count: 0,
			});

			node.occurrence_count += 1;
			node.confidence = node.confidence.max(entity.confidence);

			if !node.document_ids.contains(&record.document_id) {
				node.document_ids.push(record.document_id.clone());
			}
		}

		let mut keys: Vec<&NodeKey> = unique.keys().collect();

		keys.sort();

		for (i, a) in keys.iter().enumerate() {
			for b in keys.iter().skip(i + 1) {
				let pair_key = ((*a).clone(), (*b).clone());
				let entry = self.pairs.entry(pair_key).or_insert_with(|| EntityPair {
					entity1: unique[*a].name.trim().to_string(),
					entity2: unique[*b].name.trim().to_string(),
					cooccurrence_count: 0,
				});

				entry.cooccurrence_count += 1;
			}
		}

		self.documents.insert(record.document_id.clone());
	}

	/// Case-insensitive containment match in either direction, the same
	/// rule callers use against entity names.
	pub fn matching_nodes(&self, query: &str, type_filter: Option<EntityType>) -> Vec<GraphNode> {
		let query_lower = query.trim().to_lowercase();
		let mut matched: Vec<GraphNode> = self
			.nodes
			.iter()
			.filter(|((entity_type, name_lower), _)| {
				type_filter.is_none_or(|wanted| wanted == *entity_type)
					&& name_matches(name_lower, &query_lower)
			})
			.map(|(_, node)| node.clone())
			.collect();

		sort_nodes(&mut matched);

		matched
	}

	pub fn nodes_by_type(&self, entity_type: EntityType, limit: usize) -> Vec<GraphNode> {
		let mut matched: Vec<GraphNode> = self
			.nodes
			.values()
			.filter(|node| node.entity_type == entity_type)
			.cloned()
			.collect();

		sort_nodes(&mut matched);
		matched.truncate(limit);

		matched
	}

	pub fn cooccurrence(
		&self,
		type1: EntityType,
		type2: EntityType,
		limit: usize,
	) -> Vec<EntityPair> {
		let mut pairs: Vec<EntityPair> = self
			.pairs
			.iter()
			.filter(|(((type_a, _), (type_b, _)), _)| {
				(*type_a == type1 && *type_b == type2) || (*type_a == type2 && *type_b == type1)
			})
			.map(|(_, pair)| pair.clone())
			.collect();

		pairs.sort_by(|a, b| {
			b.cooccurrence_count
				.cmp(&a.cooccurrence_count)
				.then_with(|| a.entity1.cmp(&b.entity1))
				.then_with(|| a.entity2.cmp(&b.entity2))
		});
		pairs.truncate(limit);

		pairs
	}

	pub fn document_count(&self) -> u64 {
		self.documents.len() as u64
	}
}

pub fn name_matches(name_lower: &str, query_lower: &str) -> bool {
	if query_lower.is_empty() {
		return false;
	}

	name_lower.contains(query_lower) || query_lower.contains(name_lower)
}

/// Relationship edges from the given records whose source or target
/// substring-matches the query, reported verbatim.
pub fn matching_edges(records: &[ExtractionRecord], query: &str) -> Vec<GraphEdge> {
	let query_lower = query.trim().to_lowercase();
	let mut edges = Vec::new();

	if query_lower.is_empty() {
		return edges;
	}

	for record in records {
		for rel in &record.relationships {
			let source_match = rel.source_entity.to_lowercase().contains(&query_lower);
			let target_match = rel.target_entity.to_lowercase().contains(&query_lower);

			if source_match || target_match {
				edges.push(GraphEdge {
					source: rel.source_entity.clone(),
					target: rel.target_entity.clone(),
					relationship_type: rel.relationship_type,
					strength: rel.strength,
					document_id: record.document_id.clone(),
				});
			}
		}
	}

	edges
}

/// Short natural-language digest of the strongest matches, for prompt
/// enrichment. Best effort, not a data contract.
pub fn render_context(query: &str, result: &GraphQueryResult, top_n: usize) -> String {
	if result.nodes.is_empty() {
		return String::new();
	}

	let mut out = format!("Knowledge graph context for \"{query}\":\n");

	for node in result.nodes.iter().take(top_n) {
		out.push_str(&format!(
			"- {} ({}): found in {} record(s) across {} document(s)\n",
			node.name,
			node.entity_type.as_str(),
			node.occurrence_count,
			node.document_ids.len(),
		));
	}

	out.push_str(&format!(
		"\nTotal documents analyzed: {}\nRelated connections: {}",
		result.total_documents,
		result.edges.len(),
	));

	out
}

fn sort_nodes(nodes: &mut [GraphNode]) {
	nodes.sort_by(|a, b| {
		b.occurrence_count
			.cmp(&a.occurrence_count)
			.then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
	});
}
