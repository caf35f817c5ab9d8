use crate::{BidgraphService, ServiceError, ServiceResult, fusion};

#[derive(Clone, Debug, serde::Deserialize)]
pub struct SearchRequest {
	pub tenant_id: String,
	pub query: String,
	#[serde(default)]
	pub document_type: Option<String>,
}

/// Which retrieval leg surfaced a result.
#[derive(Clone, Copy, Debug, Eq, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provenance {
	Vector,
	Keyword,
	Both,
}

#[derive(Clone, Debug, serde::Serialize)]
pub struct RankedResult {
	pub id: String,
	pub content: String,
	/// Native cosine similarity, `0` when the vector leg did not surface it.
	pub vector_score: f32,
	/// Native trigram similarity, `0` when the keyword leg did not surface it.
	pub keyword_score: f32,
	/// Reciprocal-rank-fusion score; the only score comparable across legs.
	pub combined_score: f32,
	pub provenance: Provenance,
	pub metadata: serde_json::Value,
}

impl BidgraphService {
	/// Fans out the vector and keyword lookups concurrently and fuses their
	/// rankings. Either leg may fail or time out; a failed leg contributes
	/// nothing rather than failing the search.
	pub async fn hybrid_search(&self, request: &SearchRequest) -> ServiceResult<Vec<RankedResult>> {
		self.hybrid_search_with_limit(request, self.cfg.search.final_top_n).await
	}

	pub(crate) async fn hybrid_search_with_limit(
		&self,
		request: &SearchRequest,
		top_n: u32,
	) -> ServiceResult<Vec<RankedResult>> {
		let tenant_id = request.tenant_id.trim();
		let query = request.query.trim();

		if tenant_id.is_empty() {
			return Err(ServiceError::InvalidRequest {
				message: "tenant_id must not be empty.".to_string(),
			});
		}
		if query.is_empty() {
			return Err(ServiceError::InvalidRequest {
				message: "query must not be empty.".to_string(),
			});
		}

		let document_type =
			request.document_type.as_deref().map(str::trim).filter(|value| !value.is_empty());
		let embedding = self.backends.embedding.embed(query).await;
		let search_cfg = &self.cfg.search;
		let (vector, keyword) = tokio::join!(
			self.backends.search.vector_match(
				tenant_id,
				embedding,
				document_type,
				search_cfg.vector_top_k,
			),
			self.backends.search.keyword_match(
				tenant_id,
				query,
				document_type,
				search_cfg.keyword_top_k,
			),
		);
		let vector = vector.unwrap_or_else(|err| {
			tracing::warn!(error = %err, "Vector search failed; continuing without it.");

			Vec::new()
		});
		let keyword = keyword.unwrap_or_else(|err| {
			tracing::warn!(error = %err, "Keyword search failed; continuing without it.");

			Vec::new()
		});

		tracing::debug!(
			vector = vector.len(),
			keyword = keyword.len(),
			"Hybrid search legs complete.",
		);

		Ok(fusion::reciprocal_rank_fusion(search_cfg, top_n, vector, keyword))
	}
}
