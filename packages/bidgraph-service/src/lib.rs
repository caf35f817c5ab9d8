pub mod extract;
pub mod fusion;
pub mod graph;
pub mod rerank;
pub mod search;

use std::{future::Future, pin::Pin, sync::Arc};

use bidgraph_config::{Config, LlmProviderConfig};
use bidgraph_domain::{EntityType, ExtractionRecord};
use bidgraph_graph::{EntityPair, GraphNode};
use bidgraph_providers::{TaskKind, embedding, inference};
use bidgraph_storage::{db::Db, extraction_log, models::ChunkMatch, qdrant::QdrantStore};

pub use extract::ExtractRequest;
pub use graph::GraphSearchRequest;
pub use rerank::RerankedResult;
pub use search::{Provenance, RankedResult, SearchRequest};

pub type ServiceResult<T> = Result<T, ServiceError>;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub trait InferenceProvider
where
	Self: Send + Sync,
{
	fn infer<'a>(
		&'a self,
		cfg: &'a LlmProviderConfig,
		task: TaskKind,
		prompt: &'a str,
		system_prompt: &'a str,
	) -> BoxFuture<'a, color_eyre::Result<String>>;
}

/// Infallible by contract: an implementation that cannot produce a semantic
/// vector must produce a degraded one rather than an error.
pub trait EmbeddingProvider
where
	Self: Send + Sync,
{
	fn embed<'a>(&'a self, text: &'a str) -> BoxFuture<'a, Vec<f32>>;
}

pub trait SearchBackend
where
	Self: Send + Sync,
{
	fn vector_match<'a>(
		&'a self,
		tenant_id: &'a str,
		embedding: Vec<f32>,
		document_type: Option<&'a str>,
		top_k: u32,
	) -> BoxFuture<'a, color_eyre::Result<Vec<ChunkMatch>>>;

	fn keyword_match<'a>(
		&'a self,
		tenant_id: &'a str,
		query: &'a str,
		document_type: Option<&'a str>,
		top_k: u32,
	) -> BoxFuture<'a, color_eyre::Result<Vec<ChunkMatch>>>;
}

pub trait GraphStore
where
	Self: Send + Sync,
{
	fn append<'a>(&'a self, record: &'a ExtractionRecord) -> BoxFuture<'a, color_eyre::Result<()>>;

	fn recent_records<'a>(
		&'a self,
		tenant_id: &'a str,
		limit: u32,
	) -> BoxFuture<'a, color_eyre::Result<Vec<ExtractionRecord>>>;

	fn matching_nodes<'a>(
		&'a self,
		tenant_id: &'a str,
		query: &'a str,
		type_filter: Option<EntityType>,
	) -> BoxFuture<'a, color_eyre::Result<Vec<GraphNode>>>;

	fn nodes_by_type<'a>(
		&'a self,
		tenant_id: &'a str,
		entity_type: EntityType,
		limit: u32,
	) -> BoxFuture<'a, color_eyre::Result<Vec<GraphNode>>>;

	fn pair_counts<'a>(
		&'a self,
		tenant_id: &'a str,
		type1: EntityType,
		type2: EntityType,
		limit: u32,
	) -> BoxFuture<'a, color_eyre::Result<Vec<EntityPair>>>;

	fn document_count<'a>(&'a self, tenant_id: &'a str)
	-> BoxFuture<'a, color_eyre::Result<u64>>;
}

#[derive(Debug)]
pub enum ServiceError {
	InvalidRequest { message: String },
	Storage { message: String },
}
impl std::fmt::Display for ServiceError {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::InvalidRequest { message } => write!(f, "Invalid request: {message}"),
			Self::Storage { message } => write!(f, "Storage error: {message}"),
		}
	}
}
impl std::error::Error for ServiceError {}
impl From<bidgraph_storage::Error> for ServiceError {
	fn from(err: bidgraph_storage::Error) -> Self {
		Self::Storage { message: err.to_string() }
	}
}

#[derive(Clone)]
pub struct Backends {
	pub inference: Arc<dyn InferenceProvider>,
	pub embedding: Arc<dyn EmbeddingProvider>,
	pub search: Arc<dyn SearchBackend>,
	pub graph: Arc<dyn GraphStore>,
}

pub struct BidgraphService {
	pub cfg: Config,
	pub backends: Backends,
}
impl BidgraphService {
	pub fn new(cfg: Config, db: Db, qdrant: QdrantStore) -> Self {
		let inference: Arc<dyn InferenceProvider> = Arc::new(DefaultInference);
		let embedding: Arc<dyn EmbeddingProvider> =
			Arc::new(LlmEmbeddingProvider::new(&cfg, inference.clone()));
		let search: Arc<dyn SearchBackend> = Arc::new(StorageBackend {
			qdrant: Arc::new(qdrant),
			pool: db.pool.clone(),
		});
		let graph: Arc<dyn GraphStore> = Arc::new(PgGraphStore { pool: db.pool });

		Self { cfg, backends: Backends { inference, embedding, search, graph } }
	}

	pub fn with_backends(cfg: Config, backends: Backends) -> Self {
		Self { cfg, backends }
	}
}

struct DefaultInference;
impl InferenceProvider for DefaultInference {
	fn infer<'a>(
		&'a self,
		cfg: &'a LlmProviderConfig,
		task: TaskKind,
		prompt: &'a str,
		system_prompt: &'a str,
	) -> BoxFuture<'a, color_eyre::Result<String>> {
		Box::pin(inference::infer(cfg, task, prompt, system_prompt))
	}
}

/// Asks the model for a JSON embedding vector and hands anything unusable to
/// the degraded provider, so `embed` never fails.
pub struct LlmEmbeddingProvider {
	cfg: LlmProviderConfig,
	dimensions: u32,
	max_input_chars: u32,
	inference: Arc<dyn InferenceProvider>,
	fallback: DegradedEmbeddingProvider,
}
impl LlmEmbeddingProvider {
	pub fn new(cfg: &Config, inference: Arc<dyn InferenceProvider>) -> Self {
		Self {
			cfg: cfg.providers.llm.clone(),
			dimensions: cfg.embedding.dimensions,
			max_input_chars: cfg.embedding.max_input_chars,
			inference,
			fallback: DegradedEmbeddingProvider { dimensions: cfg.embedding.dimensions },
		}
	}
}
impl EmbeddingProvider for LlmEmbeddingProvider {
	fn embed<'a>(&'a self, text: &'a str) -> BoxFuture<'a, Vec<f32>> {
		Box::pin(async move {
			let prompt = embedding::embedding_prompt(text, self.dimensions, self.max_input_chars);

			match self
				.inference
				.infer(&self.cfg, TaskKind::Embedding, &prompt, embedding::EMBEDDING_SYSTEM_PROMPT)
				.await
			{
				Ok(content) => match embedding::parse_embedding_content(&content) {
					Some(vector) if vector.len() == self.dimensions as usize => return vector,
					Some(vector) => tracing::warn!(
						got = vector.len(),
						want = self.dimensions,
						"Embedding dimension mismatch; using degraded embedding.",
					),
					None => tracing::warn!(
						"Embedding response was not a numeric array; using degraded embedding.",
					),
				},
				Err(err) => tracing::warn!(
					error = %err,
					"Embedding inference failed; using degraded embedding.",
				),
			}

			self.fallback.embed(text).await
		})
	}
}

/// Deterministic hash-bucket embedding. Keeps the retrieval pipeline
/// available when the model cannot produce a vector.
pub struct DegradedEmbeddingProvider {
	pub dimensions: u32,
}
impl EmbeddingProvider for DegradedEmbeddingProvider {
	fn embed<'a>(&'a self, text: &'a str) -> BoxFuture<'a, Vec<f32>> {
		Box::pin(async move { embedding::degraded_embedding(text, self.dimensions as usize) })
	}
}

pub struct StorageBackend {
	pub qdrant: Arc<QdrantStore>,
	pub pool: sqlx::PgPool,
}
impl SearchBackend for StorageBackend {
	fn vector_match<'a>(
		&'a self,
		tenant_id: &'a str,
		embedding: Vec<f32>,
		document_type: Option<&'a str>,
		top_k: u32,
	) -> BoxFuture<'a, color_eyre::Result<Vec<ChunkMatch>>> {
		Box::pin(async move {
			Ok(self.qdrant.vector_match(tenant_id, embedding, document_type, top_k).await?)
		})
	}

	fn keyword_match<'a>(
		&'a self,
		tenant_id: &'a str,
		query: &'a str,
		document_type: Option<&'a str>,
		top_k: u32,
	) -> BoxFuture<'a, color_eyre::Result<Vec<ChunkMatch>>> {
		Box::pin(async move {
			Ok(bidgraph_storage::keyword::keyword_match(
				&self.pool,
				tenant_id,
				query,
				document_type,
				top_k,
			)
			.await?)
		})
	}
}

pub struct PgGraphStore {
	pub pool: sqlx::PgPool,
}
impl GraphStore for PgGraphStore {
	fn append<'a>(&'a self, record: &'a ExtractionRecord) -> BoxFuture<'a, color_eyre::Result<()>> {
		Box::pin(async move { Ok(extraction_log::append(&self.pool, record).await?) })
	}

	fn recent_records<'a>(
		&'a self,
		tenant_id: &'a str,
		limit: u32,
	) -> BoxFuture<'a, color_eyre::Result<Vec<ExtractionRecord>>> {
		Box::pin(async move {
			Ok(extraction_log::recent_records(&self.pool, tenant_id, limit).await?)
		})
	}

	fn matching_nodes<'a>(
		&'a self,
		tenant_id: &'a str,
		query: &'a str,
		type_filter: Option<EntityType>,
	) -> BoxFuture<'a, color_eyre::Result<Vec<GraphNode>>> {
		Box::pin(async move {
			Ok(bidgraph_storage::graph::matching_nodes(&self.pool, tenant_id, query, type_filter)
				.await?)
		})
	}

	fn nodes_by_type<'a>(
		&'a self,
		tenant_id: &'a str,
		entity_type: EntityType,
		limit: u32,
	) -> BoxFuture<'a, color_eyre::Result<Vec<GraphNode>>> {
		Box::pin(async move {
			Ok(bidgraph_storage::graph::nodes_by_type(&self.pool, tenant_id, entity_type, limit)
				.await?)
		})
	}

	fn pair_counts<'a>(
		&'a self,
		tenant_id: &'a str,
		type1: EntityType,
		type2: EntityType,
		limit: u32,
	) -> BoxFuture<'a, color_eyre::Result<Vec<EntityPair>>> {
		Box::pin(async move {
			Ok(bidgraph_storage::graph::pair_counts(&self.pool, tenant_id, type1, type2, limit)
				.await?)
		})
	}

	fn document_count<'a>(
		&'a self,
		tenant_id: &'a str,
	) -> BoxFuture<'a, color_eyre::Result<u64>> {
		Box::pin(async move { Ok(bidgraph_storage::graph::document_count(&self.pool, tenant_id).await?) })
	}
}
