use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Clone, Debug, Deserialize)]
pub struct Config {
	pub service: Service,
	pub storage: Storage,
	pub providers: Providers,
	#[serde(default)]
	pub embedding: Embedding,
	#[serde(default)]
	pub search: Search,
	#[serde(default)]
	pub rerank: Rerank,
	#[serde(default)]
	pub extraction: Extraction,
	#[serde(default)]
	pub graph: Graph,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Service {
	pub log_level: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Storage {
	pub postgres: Postgres,
	pub qdrant: Qdrant,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Postgres {
	pub dsn: String,
	pub pool_max_conns: u32,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Qdrant {
	pub url: String,
	pub collection: String,
	pub vector_dim: u32,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Providers {
	pub llm: LlmProviderConfig,
}

/// One chat-completion endpoint serves embedding generation, reranking, and
/// entity extraction; the task kind is routed by the caller.
#[derive(Clone, Debug, Deserialize)]
pub struct LlmProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub temperature: f32,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Embedding {
	pub dimensions: u32,
	/// Query text is capped to this many characters before being sent to the
	/// embedding prompt.
	pub max_input_chars: u32,
}
impl Default for Embedding {
	fn default() -> Self {
		Self { dimensions: 384, max_input_chars: 500 }
	}
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Search {
	pub vector_weight: f32,
	pub keyword_weight: f32,
	pub vector_top_k: u32,
	pub keyword_top_k: u32,
	pub rrf_k: f32,
	pub min_score: f32,
	pub final_top_n: u32,
}
impl Default for Search {
	fn default() -> Self {
		Self {
			vector_weight: 0.6,
			keyword_weight: 0.4,
			vector_top_k: 20,
			keyword_top_k: 20,
			rrf_k: 60.0,
			min_score: 0.1,
			final_top_n: 10,
		}
	}
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Rerank {
	pub candidate_count: u32,
	pub return_count: u32,
	pub min_relevance: f32,
	pub include_explanation: bool,
	pub passage_max_chars: u32,
}
impl Default for Rerank {
	fn default() -> Self {
		Self {
			candidate_count: 20,
			return_count: 5,
			min_relevance: 0.3,
			include_explanation: false,
			passage_max_chars: 500,
		}
	}
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Extraction {
	pub max_chunk_chars: u32,
	pub context_max_chars: u32,
}
impl Default for Extraction {
	fn default() -> Self {
		Self { max_chunk_chars: 4_000, context_max_chars: 500 }
	}
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Graph {
	/// Bounded window of recent extraction records scanned for edge matches.
	pub recent_limit: u32,
	pub context_top_n: u32,
}
impl Default for Graph {
	fn default() -> Self {
		Self { recent_limit: 500, context_top_n: 10 }
	}
}
