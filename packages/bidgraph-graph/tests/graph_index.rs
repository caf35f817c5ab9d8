use std::collections::BTreeMap;

use bidgraph_domain::{
	EntityRelationship, EntityType, ExtractedEntity, ExtractionRecord, RelationshipType,
};
use bidgraph_graph::{GraphIndex, GraphQueryResult, matching_edges, render_context};

fn entity(name: &str, entity_type: EntityType, confidence: f32) -> ExtractedEntity {
	ExtractedEntity {
		name: name.to_string(),
		entity_type,
		context: String::new(),
		confidence,
		attributes: BTreeMap::new(),
	}
}

fn record(document_id: &str, entities: Vec<ExtractedEntity>) -> ExtractionRecord {
	ExtractionRecord::new(
		"t1",
		document_id,
		&format!("{document_id}.pdf"),
		entities,
		Vec::new(),
		time::OffsetDateTime::UNIX_EPOCH,
	)
}

#[test]
fn occurrence_counts_records_not_mentions() {
	let mut index = GraphIndex::default();

	index.apply(&record("doc-1", vec![entity("FHIR", EntityType::Technology, 0.7)]));
	index.apply(&record("doc-2", vec![entity("FHIR", EntityType::Technology, 0.9)]));
	index.apply(&record("doc-3", vec![entity("Kubernetes", EntityType::Technology, 0.8)]));

	let nodes = index.matching_nodes("FHIR", None);

	assert_eq!(nodes.len(), 1);
	assert_eq!(nodes[0].name, "FHIR");
	assert_eq!(nodes[0].occurrence_count, 2);
	assert!((nodes[0].confidence - 0.9).abs() < f32::EPSILON);
	assert_eq!(nodes[0].document_ids.len(), 2);
	assert_eq!(index.document_count(), 3);
}

#[test]
fn duplicate_document_does_not_duplicate_ids() {
	let mut index = GraphIndex::default();

	index.apply(&record("doc-1", vec![entity("DHA", EntityType::Agency, 0.5)]));
	index.apply(&record("doc-1", vec![entity("DHA", EntityType::Agency, 0.6)]));

	let nodes = index.matching_nodes("DHA", None);

	assert_eq!(nodes[0].occurrence_count, 2);
	assert_eq!(nodes[0].document_ids, vec!["doc-1".to_string()]);
}

#[test]
fn cooccurrence_counts_once_per_record() {
	let mut index = GraphIndex::default();

	for doc in ["doc-1", "doc-2"] {
		index.apply(&record(
			doc,
			vec![
				entity("DHA", EntityType::Agency, 0.8),
				entity("FHIR", EntityType::Technology, 0.9),
			],
		));
	}

	let pairs = index.cooccurrence(EntityType::Agency, EntityType::Technology, 20);

	assert_eq!(pairs.len(), 1);
	assert_eq!(pairs[0].cooccurrence_count, 2);

	let names = [pairs[0].entity1.as_str(), pairs[0].entity2.as_str()];

	assert!(names.contains(&"DHA"));
	assert!(names.contains(&"FHIR"));

	// Querying with swapped types finds the same pair.
	let swapped = index.cooccurrence(EntityType::Technology, EntityType::Agency, 20);

	assert_eq!(swapped, pairs);
}

#[test]
fn nodes_sort_by_occurrence_then_name() {
	let mut index = GraphIndex::default();

	index.apply(&record(
		"doc-1",
		vec![
			entity("AWS GovCloud", EntityType::Technology, 0.9),
			entity("FHIR", EntityType::Technology, 0.9),
		],
	));
	index.apply(&record("doc-2", vec![entity("FHIR", EntityType::Technology, 0.8)]));

	let nodes = index.nodes_by_type(EntityType::Technology, 10);

	assert_eq!(nodes[0].name, "FHIR");
	assert_eq!(nodes[1].name, "AWS GovCloud");
}

#[test]
fn type_filter_restricts_matches() {
	let mut index = GraphIndex::default();

	index.apply(&record(
		"doc-1",
		vec![entity("VA", EntityType::Agency, 0.9), entity("VA", EntityType::Technology, 0.4)],
	));

	// Same name under two types stays two nodes.
	assert_eq!(index.matching_nodes("VA", None).len(), 2);

	let agencies = index.matching_nodes("VA", Some(EntityType::Agency));

	assert_eq!(agencies.len(), 1);
	assert_eq!(agencies[0].entity_type, EntityType::Agency);
}

#[test]
fn containment_matches_both_directions() {
	let mut index = GraphIndex::default();

	index.apply(&record("doc-1", vec![entity("FHIR", EntityType::Technology, 0.9)]));

	assert_eq!(index.matching_nodes("fhir integration", None).len(), 1);
	assert_eq!(index.matching_nodes("FHI", None).len(), 1);
	assert!(index.matching_nodes("", None).is_empty());
}

#[test]
fn edges_match_on_either_endpoint() {
	let mut record = record("doc-1", vec![]);

	record.relationships = vec![
		EntityRelationship {
			source_entity: "Dr. Jane Smith".to_string(),
			target_entity: "DHA".to_string(),
			relationship_type: RelationshipType::RelatedTo,
			document_id: "doc-1".to_string(),
			strength: 0.7,
		},
		EntityRelationship {
			source_entity: "OASIS".to_string(),
			target_entity: "SEWP V".to_string(),
			relationship_type: RelationshipType::SucceededBy,
			document_id: "doc-1".to_string(),
			strength: 0.5,
		},
	];

	let edges = matching_edges(&[record], "dha");

	assert_eq!(edges.len(), 1);
	assert_eq!(edges[0].target, "DHA");
}

#[test]
fn context_digest_lists_top_nodes() {
	let mut index = GraphIndex::default();

	index.apply(&record("doc-1", vec![entity("FHIR", EntityType::Technology, 0.9)]));

	let result = GraphQueryResult {
		nodes: index.matching_nodes("FHIR", None),
		edges: Vec::new(),
		total_documents: index.document_count(),
	};
	let digest = render_context("FHIR", &result, 10);

	assert!(digest.contains("FHIR (technology)"));
	assert!(digest.contains("Total documents analyzed: 1"));

	let empty = render_context("nothing", &GraphQueryResult::default(), 10);

	assert!(empty.is_empty());
}
