use std::sync::{Arc, atomic::Ordering};

use bidgraph_domain::EntityType;
use bidgraph_providers::TaskKind;
use bidgraph_service::{
	Backends, BidgraphService, DegradedEmbeddingProvider, ExtractRequest, GraphSearchRequest,
	Provenance, SearchRequest, ServiceError,
};
use bidgraph_testkit::{
	MemoryGraphStore, ScriptedInference, StaticSearchBackend, chunk, init_tracing, test_config,
};

struct Harness {
	inference: Arc<ScriptedInference>,
	search: Arc<StaticSearchBackend>,
	graph: Arc<MemoryGraphStore>,
}
impl Harness {
	fn new(search: StaticSearchBackend) -> Self {
		init_tracing();

		Self {
			inference: Arc::new(ScriptedInference::default()),
			search: Arc::new(search),
			graph: Arc::new(MemoryGraphStore::default()),
		}
	}

	fn service(&self, cfg: bidgraph_config::Config) -> BidgraphService {
		let embedding = Arc::new(DegradedEmbeddingProvider { dimensions: cfg.embedding.dimensions });

		BidgraphService::with_backends(cfg, Backends {
			inference: self.inference.clone(),
			embedding,
			search: self.search.clone(),
			graph: self.graph.clone(),
		})
	}
}

fn search_request(query: &str) -> SearchRequest {
	SearchRequest { tenant_id: "t1".to_string(), query: query.to_string(), document_type: None }
}

#[tokio::test]
async fn hybrid_search_merges_legs_and_tags_provenance() {
	let harness = Harness::new(StaticSearchBackend::new(
		vec![chunk("a", "vector hit", 0.9), chunk("b", "shared hit", 0.8)],
		vec![chunk("b", "shared hit", 0.7), chunk("c", "keyword hit", 0.6)],
	));
	let mut cfg = test_config();

	cfg.search.min_score = 0.0;

	let results = harness
		.service(cfg)
		.hybrid_search(&search_request("fhir integration"))
		.await
		.expect("search failed");
	let ids: Vec<&str> = results.iter().map(|r| r.id.as_str()).collect();

	assert_eq!(ids, vec!["b", "a", "c"]);

	let b = &results[0];

	assert_eq!(b.provenance, Provenance::Both);
	assert!((b.vector_score - 0.8).abs() < f32::EPSILON);
	assert!((b.keyword_score - 0.7).abs() < f32::EPSILON);
	assert!((b.combined_score - (0.6 / 62.0 + 0.4 / 61.0)).abs() < 1e-6);
}

#[tokio::test]
async fn failed_vector_leg_degrades_to_keyword_only() {
	let harness = Harness::new(StaticSearchBackend::new(
		vec![chunk("a", "vector hit", 0.9)],
		vec![chunk("c", "keyword hit", 0.6)],
	));

	harness.search.fail_vector.store(true, Ordering::SeqCst);

	let mut cfg = test_config();

	cfg.search.min_score = 0.0;

	let results = harness
		.service(cfg)
		.hybrid_search(&search_request("anything"))
		.await
		.expect("search failed");

	assert_eq!(results.len(), 1);
	assert_eq!(results[0].id, "c");
	assert_eq!(results[0].provenance, Provenance::Keyword);
}

#[tokio::test]
async fn both_legs_failing_yields_empty_not_error() {
	let harness = Harness::new(StaticSearchBackend::default());

	harness.search.fail_vector.store(true, Ordering::SeqCst);
	harness.search.fail_keyword.store(true, Ordering::SeqCst);

	let results = harness
		.service(test_config())
		.hybrid_search(&search_request("anything"))
		.await
		.expect("search failed");

	assert!(results.is_empty());
}

#[tokio::test]
async fn blank_query_is_rejected() {
	let harness = Harness::new(StaticSearchBackend::default());
	let result = harness.service(test_config()).hybrid_search(&search_request("   ")).await;

	assert!(matches!(result, Err(ServiceError::InvalidRequest { .. })));
}

#[tokio::test]
async fn retrieve_applies_scripted_rerank_scores() {
	let harness = Harness::new(StaticSearchBackend::new(
		vec![chunk("a", "first passage", 0.9), chunk("b", "second passage", 0.8)],
		Vec::new(),
	));

	harness.inference.push_ok(r#"[{"index": 1, "score": 0.2}, {"index": 2, "score": 0.9}]"#);

	let mut cfg = test_config();

	cfg.search.min_score = 0.0;

	let results = harness
		.service(cfg)
		.retrieve(&search_request("second"))
		.await
		.expect("retrieve failed");

	// 0.2 falls below the default min_relevance of 0.3.
	assert_eq!(results.len(), 1);
	assert_eq!(results[0].result.id, "b");
	assert!((results[0].reranker_score - 0.9).abs() < f32::EPSILON);
	assert_eq!(results[0].original_rank, 2);

	let prompts = harness.inference.prompts();

	assert_eq!(prompts.len(), 1);
	assert_eq!(prompts[0].0, TaskKind::Rerank);
	assert!(prompts[0].1.contains("[1] first passage"));
	assert!(prompts[0].1.contains("[2] second passage"));
}

#[tokio::test]
async fn rerank_failure_falls_back_to_retrieval_order() {
	let harness = Harness::new(StaticSearchBackend::new(
		vec![
			chunk("a", "first", 0.9),
			chunk("b", "second", 0.8),
			chunk("c", "third", 0.7),
		],
		Vec::new(),
	));

	harness.inference.push_err("model offline");

	let mut cfg = test_config();

	cfg.search.min_score = 0.0;

	let results = harness
		.service(cfg)
		.retrieve(&search_request("anything"))
		.await
		.expect("retrieve failed");

	assert_eq!(results.len(), 3);

	let ids: Vec<&str> = results.iter().map(|r| r.result.id.as_str()).collect();

	assert_eq!(ids, vec!["a", "b", "c"]);

	for pair in results.windows(2) {
		assert!(pair[0].reranker_score >= pair[1].reranker_score);
	}

	assert!((results[0].reranker_score - 1.0).abs() < f32::EPSILON);
}

#[tokio::test]
async fn extraction_dedupes_and_drops_unknown_types() {
	let harness = Harness::new(StaticSearchBackend::default());

	harness.inference.push_ok(
		r#"{"entities": [
			{"name": "FHIR", "type": "technology", "context": "mentioned early", "confidence": 0.4},
			{"name": "fhir", "type": "technology", "context": "mentioned again", "confidence": 0.9},
			{"name": "Mystery", "type": "foobar", "confidence": 0.9},
			{"name": "DHA", "type": "agency", "confidence": 0.8}
		], "relationships": [
			{"source_entity": "FHIR", "target_entity": "DHA", "type": "related_to", "strength": 0.7},
			{"source_entity": "X", "target_entity": "Y", "type": "mentions", "strength": 0.5}
		]}"#,
	);

	let service = harness.service(test_config());
	let record = service
		.extract_entities(&ExtractRequest {
			tenant_id: "t1".to_string(),
			document_id: "doc-1".to_string(),
			document_name: "rfp.pdf".to_string(),
			content: "The VA requires FHIR integration.".to_string(),
		})
		.await
		.expect("extraction failed");

	assert_eq!(record.entity_count, 2);
	assert_eq!(record.relationship_count, 1);

	let fhir = record.entities.iter().find(|e| e.name == "FHIR").expect("FHIR missing");

	assert!((fhir.confidence - 0.9).abs() < f32::EPSILON);
	assert_eq!(harness.graph.record_count("t1"), 1);

	let prompts = harness.inference.prompts();

	assert_eq!(prompts.len(), 1);
	assert_eq!(prompts[0].0, TaskKind::Extraction);
}

#[tokio::test]
async fn failed_chunk_skips_but_extraction_continues() {
	let harness = Harness::new(StaticSearchBackend::default());

	harness.inference.push_err("model offline");
	harness.inference.push_ok(
		r#"{"entities": [{"name": "Kubernetes", "type": "technology", "confidence": 0.8}], "relationships": []}"#,
	);

	let mut cfg = test_config();

	// Two paragraphs that cannot share a chunk.
	cfg.extraction.max_chunk_chars = 10;

	let record = harness
		.service(cfg)
		.extract_entities(&ExtractRequest {
			tenant_id: "t1".to_string(),
			document_id: "doc-2".to_string(),
			document_name: "whitepaper.pdf".to_string(),
			content: "first paragraph text\n\nsecond paragraph text".to_string(),
		})
		.await
		.expect("extraction failed");

	assert_eq!(record.entity_count, 1);
	assert_eq!(record.entities[0].name, "Kubernetes");
	assert_eq!(harness.inference.prompts().len(), 2);
}

#[tokio::test]
async fn append_failure_is_a_hard_error() {
	let harness = Harness::new(StaticSearchBackend::default());

	harness.graph.fail_appends.store(true, Ordering::SeqCst);
	harness.inference.push_ok(r#"{"entities": [], "relationships": []}"#);

	let result = harness
		.service(test_config())
		.extract_entities(&ExtractRequest {
			tenant_id: "t1".to_string(),
			document_id: "doc-3".to_string(),
			document_name: "soo.pdf".to_string(),
			content: "content".to_string(),
		})
		.await;

	assert!(matches!(result, Err(ServiceError::Storage { .. })));
}

#[tokio::test]
async fn graph_queries_reflect_appended_records() {
	let harness = Harness::new(StaticSearchBackend::default());

	for doc in ["doc-1", "doc-2"] {
		harness.inference.push_ok(
			r#"{"entities": [
				{"name": "DHA", "type": "agency", "confidence": 0.8},
				{"name": "FHIR", "type": "technology", "confidence": 0.9}
			], "relationships": [
				{"source_entity": "FHIR", "target_entity": "DHA", "type": "related_to", "strength": 0.7}
			]}"#,
		);
		harness
			.service(test_config())
			.extract_entities(&ExtractRequest {
				tenant_id: "t1".to_string(),
				document_id: doc.to_string(),
				document_name: format!("{doc}.pdf"),
				content: "DHA mandates FHIR.".to_string(),
			})
			.await
			.expect("extraction failed");
	}

	let service = harness.service(test_config());
	let result = service
		.search_graph(&GraphSearchRequest {
			tenant_id: "t1".to_string(),
			query: "fhir".to_string(),
			type_filter: None,
		})
		.await;

	assert_eq!(result.nodes.len(), 1);
	assert_eq!(result.nodes[0].occurrence_count, 2);
	assert_eq!(result.nodes[0].document_ids.len(), 2);
	assert_eq!(result.edges.len(), 2);
	assert_eq!(result.total_documents, 2);

	let technologies = service.entities_by_type("t1", EntityType::Technology, 10).await;

	assert_eq!(technologies.len(), 1);
	assert_eq!(technologies[0].name, "FHIR");

	let pairs =
		service.entity_cooccurrence("t1", EntityType::Agency, EntityType::Technology, 10).await;

	assert_eq!(pairs.len(), 1);
	assert_eq!(pairs[0].cooccurrence_count, 2);

	let context = service.build_context("t1", "fhir").await;

	assert!(context.contains("Knowledge graph context for \"fhir\":"));
	assert!(context.contains("FHIR (technology)"));
}

#[tokio::test]
async fn graph_store_failure_degrades_to_empty_results() {
	let harness = Harness::new(StaticSearchBackend::default());

	harness.graph.fail_reads.store(true, Ordering::SeqCst);

	let service = harness.service(test_config());
	let result = service
		.search_graph(&GraphSearchRequest {
			tenant_id: "t1".to_string(),
			query: "fhir".to_string(),
			type_filter: None,
		})
		.await;

	assert!(result.nodes.is_empty());
	assert!(result.edges.is_empty());
	assert_eq!(result.total_documents, 0);
	assert!(service.build_context("t1", "fhir").await.is_empty());
	assert!(service.entities_by_type("t1", EntityType::Agency, 10).await.is_empty());
}
