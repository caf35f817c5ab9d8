//! In-memory stand-ins for the service's backend seams, so integration
//! suites can drive the full pipeline without Postgres, Qdrant, or a live
//! inference endpoint.

use std::{
	collections::{HashMap, VecDeque},
	sync::{
		Mutex, Once,
		atomic::{AtomicBool, Ordering},
	},
};

use color_eyre::eyre;
use tracing_subscriber::EnvFilter;

use bidgraph_config::{
	Config, LlmProviderConfig, Postgres, Providers, Qdrant, Service, Storage,
};
use bidgraph_domain::{EntityType, ExtractionRecord};
use bidgraph_graph::{EntityPair, GraphIndex, GraphNode};
use bidgraph_providers::TaskKind;
use bidgraph_service::{BoxFuture, GraphStore, InferenceProvider, SearchBackend};
use bidgraph_storage::models::ChunkMatch;

static INIT: Once = Once::new();

pub fn init_tracing() {
	INIT.call_once(|| {
		let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

		tracing_subscriber::fmt().with_env_filter(filter).with_test_writer().init();
	});
}

/// A config with harmless placeholder endpoints and default tunables.
pub fn test_config() -> Config {
	Config {
		service: Service { log_level: "info".to_string() },
		storage: Storage {
			postgres: Postgres {
				dsn: "postgres://localhost:5432/bidgraph_test".to_string(),
				pool_max_conns: 2,
			},
			qdrant: Qdrant {
				url: "http://localhost:6334".to_string(),
				collection: "bidgraph_test".to_string(),
				vector_dim: 384,
			},
		},
		providers: Providers {
			llm: LlmProviderConfig {
				provider_id: "test".to_string(),
				api_base: "http://localhost:9".to_string(),
				api_key: "test-key".to_string(),
				path: "/v1/chat/completions".to_string(),
				model: "test-model".to_string(),
				temperature: 0.0,
				timeout_ms: 1_000,
				default_headers: Default::default(),
			},
		},
		embedding: Default::default(),
		search: Default::default(),
		rerank: Default::default(),
		extraction: Default::default(),
		graph: Default::default(),
	}
}

pub fn chunk(id: &str, content: &str, similarity: f32) -> ChunkMatch {
	ChunkMatch {
		id: id.to_string(),
		content: content.to_string(),
		similarity,
		metadata: serde_json::Value::Object(Default::default()),
	}
}

/// Replays queued responses in order and records every prompt it saw. An
/// exhausted queue yields errors, which the service treats as soft failures.
#[derive(Default)]
pub struct ScriptedInference {
	responses: Mutex<VecDeque<Result<String, String>>>,
	prompts: Mutex<Vec<(TaskKind, String)>>,
}
impl ScriptedInference {
	pub fn push_ok(&self, content: &str) {
		self.responses
			.lock()
			.unwrap_or_else(|err| err.into_inner())
			.push_back(Ok(content.to_string()));
	}

	pub fn push_err(&self, message: &str) {
		self.responses
			.lock()
			.unwrap_or_else(|err| err.into_inner())
			.push_back(Err(message.to_string()));
	}

	pub fn prompts(&self) -> Vec<(TaskKind, String)> {
		self.prompts.lock().unwrap_or_else(|err| err.into_inner()).clone()
	}
}
impl InferenceProvider for ScriptedInference {
	fn infer<'a>(
		&'a self,
		_cfg: &'a LlmProviderConfig,
		task: TaskKind,
		prompt: &'a str,
		_system_prompt: &'a str,
	) -> BoxFuture<'a, color_eyre::Result<String>> {
		self.prompts
			.lock()
			.unwrap_or_else(|err| err.into_inner())
			.push((task, prompt.to_string()));

		let next = self.responses.lock().unwrap_or_else(|err| err.into_inner()).pop_front();

		Box::pin(async move {
			match next {
				Some(Ok(content)) => Ok(content),
				Some(Err(message)) => Err(eyre::eyre!(message)),
				None => Err(eyre::eyre!("No scripted response left.")),
			}
		})
	}
}

/// Serves preset result lists for each retrieval leg; either leg can be
/// switched to fail for soft-degradation tests.
#[derive(Default)]
pub struct StaticSearchBackend {
	pub vector: Vec<ChunkMatch>,
	pub keyword: Vec<ChunkMatch>,
	pub fail_vector: AtomicBool,
	pub fail_keyword: AtomicBool,
}
impl StaticSearchBackend {
	pub fn new(vector: Vec<ChunkMatch>, keyword: Vec<ChunkMatch>) -> Self {
		Self { vector, keyword, ..Default::default() }
	}
}
impl SearchBackend for StaticSearchBackend {
	fn vector_match<'a>(
		&'a self,
		_tenant_id: &'a str,
		_embedding: Vec<f32>,
		_document_type: Option<&'a str>,
		top_k: u32,
	) -> BoxFuture<'a, color_eyre::Result<Vec<ChunkMatch>>> {
		Box::pin(async move {
			if self.fail_vector.load(Ordering::SeqCst) {
				return Err(eyre::eyre!("vector backend unavailable"));
			}

			let mut matches = self.vector.clone();

			matches.truncate(top_k as usize);

			Ok(matches)
		})
	}

	fn keyword_match<'a>(
		&'a self,
		_tenant_id: &'a str,
		_query: &'a str,
		_document_type: Option<&'a str>,
		top_k: u32,
	) -> BoxFuture<'a, color_eyre::Result<Vec<ChunkMatch>>> {
		Box::pin(async move {
			if self.fail_keyword.load(Ordering::SeqCst) {
				return Err(eyre::eyre!("keyword backend unavailable"));
			}

			let mut matches = self.keyword.clone();

			matches.truncate(top_k as usize);

			Ok(matches)
		})
	}
}

#[derive(Default)]
struct TenantGraph {
	index: GraphIndex,
	records: Vec<ExtractionRecord>,
}

/// Per-tenant extraction log plus graph index, mirroring the Postgres-backed
/// store's semantics in memory.
#[derive(Default)]
pub struct MemoryGraphStore {
	tenants: Mutex<HashMap<String, TenantGraph>>,
	pub fail_appends: AtomicBool,
	pub fail_reads: AtomicBool,
}
impl MemoryGraphStore {
	pub fn record_count(&self, tenant_id: &str) -> usize {
		self.tenants
			.lock()
			.unwrap_or_else(|err| err.into_inner())
			.get(tenant_id)
			.map(|tenant| tenant.records.len())
			.unwrap_or(0)
	}

	fn read_guard(&self) -> color_eyre::Result<()> {
		if self.fail_reads.load(Ordering::SeqCst) {
			return Err(eyre::eyre!("graph store unavailable"));
		}

		Ok(())
	}
}
impl GraphStore for MemoryGraphStore {
	fn append<'a>(&'a self, record: &'a ExtractionRecord) -> BoxFuture<'a, color_eyre::Result<()>> {
		Box::pin(async move {
			if self.fail_appends.load(Ordering::SeqCst) {
				return Err(eyre::eyre!("graph store unavailable"));
			}

			let mut tenants = self.tenants.lock().unwrap_or_else(|err| err.into_inner());
			let tenant = tenants.entry(record.tenant_id.clone()).or_default();

			tenant.index.apply(record);
			tenant.records.push(record.clone());

			Ok(())
		})
	}

	fn recent_records<'a>(
		&'a self,
		tenant_id: &'a str,
		limit: u32,
	) -> BoxFuture<'a, color_eyre::Result<Vec<ExtractionRecord>>> {
		Box::pin(async move {
			self.read_guard()?;

			let tenants = self.tenants.lock().unwrap_or_else(|err| err.into_inner());
			let mut records: Vec<ExtractionRecord> = tenants
				.get(tenant_id)
				.map(|tenant| tenant.records.iter().rev().cloned().collect())
				.unwrap_or_default();

			records.truncate(limit as usize);

			Ok(records)
		})
	}

	fn matching_nodes<'a>(
		&'a self,
		tenant_id: &'a str,
		query: &'a str,
		type_filter: Option<EntityType>,
	) -> BoxFuture<'a, color_eyre::Result<Vec<GraphNode>>> {
		Box::pin(async move {
			self.read_guard()?;

			let tenants = self.tenants.lock().unwrap_or_else(|err| err.into_inner());

			Ok(tenants
				.get(tenant_id)
				.map(|tenant| tenant.index.matching_nodes(query, type_filter))
				.unwrap_or_default())
		})
	}

	fn nodes_by_type<'a>(
		&'a self,
		tenant_id: &'a str,
		entity_type: EntityType,
		limit: u32,
	) -> BoxFuture<'a, color_eyre::Result<Vec<GraphNode>>> {
		Box::pin(async move {
			self.read_guard()?;

			let tenants = self.tenants.lock().unwrap_or_else(|err| err.into_inner());

			Ok(tenants
				.get(tenant_id)
				.map(|tenant| tenant.index.nodes_by_type(entity_type, limit as usize))
				.unwrap_or_default())
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
			self.read_guard()?;

			let tenants = self.tenants.lock().unwrap_or_else(|err| err.into_inner());

			Ok(tenants
				.get(tenant_id)
				.map(|tenant| tenant.index.cooccurrence(type1, type2, limit as usize))
				.unwrap_or_default())
		})
	}

	fn document_count<'a>(
		&'a self,
		tenant_id: &'a str,
	) -> BoxFuture<'a, color_eyre::Result<u64>> {
		Box::pin(async move {
			self.read_guard()?;

			let tenants = self.tenants.lock().unwrap_or_else(|err| err.into_inner());

			Ok(tenants.get(tenant_id).map(|tenant| tenant.index.document_count()).unwrap_or(0))
		})
	}
}
