use bidgraph_domain::EntityType;
use bidgraph_graph::{EntityPair, GraphNode, GraphQueryResult, matching_edges, render_context};

use crate::BidgraphService;

#[derive(Clone, Debug, serde::Deserialize)]
pub struct GraphSearchRequest {
	pub tenant_id: String,
	pub query: String,
	#[serde(default)]
	pub type_filter: Option<EntityType>,
}

// Graph queries are read-only and best effort: a store failure degrades to
// an empty answer rather than an error.
impl BidgraphService {
	pub async fn search_graph(&self, request: &GraphSearchRequest) -> GraphQueryResult {
		let tenant_id = request.tenant_id.trim();
		let query = request.query.trim();
		let nodes = self
			.backends
			.graph
			.matching_nodes(tenant_id, query, request.type_filter)
			.await
			.unwrap_or_else(|err| {
				tracing::warn!(error = %err, "Graph node lookup failed; returning no nodes.");

				Vec::new()
			});
		let records = self
			.backends
			.graph
			.recent_records(tenant_id, self.cfg.graph.recent_limit)
			.await
			.unwrap_or_else(|err| {
				tracing::warn!(error = %err, "Recent record scan failed; returning no edges.");

				Vec::new()
			});
		let total_documents =
			self.backends.graph.document_count(tenant_id).await.unwrap_or_else(|err| {
				tracing::warn!(error = %err, "Document count failed; reporting zero.");

				0
			});

		GraphQueryResult { nodes, edges: matching_edges(&records, query), total_documents }
	}

	pub async fn entities_by_type(
		&self,
		tenant_id: &str,
		entity_type: EntityType,
		limit: u32,
	) -> Vec<GraphNode> {
		self.backends.graph.nodes_by_type(tenant_id.trim(), entity_type, limit).await.unwrap_or_else(
			|err| {
				tracing::warn!(error = %err, "Nodes-by-type lookup failed; returning none.");

				Vec::new()
			},
		)
	}

	pub async fn entity_cooccurrence(
		&self,
		tenant_id: &str,
		type1: EntityType,
		type2: EntityType,
		limit: u32,
	) -> Vec<EntityPair> {
		self.backends.graph.pair_counts(tenant_id.trim(), type1, type2, limit).await.unwrap_or_else(
			|err| {
				tracing::warn!(error = %err, "Co-occurrence lookup failed; returning none.");

				Vec::new()
			},
		)
	}

	/// Natural-language digest of the strongest graph matches, for prompt
	/// enrichment. Empty when nothing matches.
	pub async fn build_context(&self, tenant_id: &str, query: &str) -> String {
		let result = self
			.search_graph(&GraphSearchRequest {
				tenant_id: tenant_id.to_string(),
				query: query.to_string(),
				type_filter: None,
			})
			.await;

		render_context(query.trim(), &result, self.cfg.graph.context_top_n as usize)
	}
}
