mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	Config, Embedding, Extraction, Graph, LlmProviderConfig, Postgres, Providers, Qdrant, Rerank,
	Search, Service, Storage,
};

use std::{fs, path::Path};

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;

	let mut cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.storage.postgres.pool_max_conns == 0 {
		return Err(Error::Validation {
			message: "storage.postgres.pool_max_conns must be greater than zero.".to_string(),
		});
	}
	if cfg.storage.qdrant.collection.trim().is_empty() {
		return Err(Error::Validation {
			message: "storage.qdrant.collection must be non-empty.".to_string(),
		});
	}
	if cfg.embedding.dimensions == 0 {
		return Err(Error::Validation {
			message: "embedding.dimensions must be greater than zero.".to_string(),
		});
	}
	if cfg.embedding.dimensions != cfg.storage.qdrant.vector_dim {
		return Err(Error::Validation {
			message: "embedding.dimensions must match storage.qdrant.vector_dim.".to_string(),
		});
	}
	if cfg.providers.llm.api_key.trim().is_empty() {
		return Err(Error::Validation {
			message: "providers.llm.api_key must be non-empty.".to_string(),
		});
	}
	if cfg.providers.llm.timeout_ms == 0 {
		return Err(Error::Validation {
			message: "providers.llm.timeout_ms must be greater than zero.".to_string(),
		});
	}

	for (label, weight) in [
		("search.vector_weight", cfg.search.vector_weight),
		("search.keyword_weight", cfg.search.keyword_weight),
	] {
		if !weight.is_finite() || !(0.0..=1.0).contains(&weight) {
			return Err(Error::Validation {
				message: format!("{label} must be in the range 0.0-1.0."),
			});
		}
	}

	if !cfg.search.rrf_k.is_finite() || cfg.search.rrf_k <= 0.0 {
		return Err(Error::Validation {
			message: "search.rrf_k must be greater than zero.".to_string(),
		});
	}
	if !cfg.search.min_score.is_finite() || cfg.search.min_score < 0.0 {
		return Err(Error::Validation {
			message: "search.min_score must be zero or greater.".to_string(),
		});
	}

	for (label, count) in [
		("search.vector_top_k", cfg.search.vector_top_k),
		("search.keyword_top_k", cfg.search.keyword_top_k),
		("search.final_top_n", cfg.search.final_top_n),
		("rerank.candidate_count", cfg.rerank.candidate_count),
		("rerank.return_count", cfg.rerank.return_count),
		("rerank.passage_max_chars", cfg.rerank.passage_max_chars),
		("extraction.max_chunk_chars", cfg.extraction.max_chunk_chars),
		("extraction.context_max_chars", cfg.extraction.context_max_chars),
		("graph.recent_limit", cfg.graph.recent_limit),
		("graph.context_top_n", cfg.graph.context_top_n),
	] {
		if count == 0 {
			return Err(Error::Validation {
				message: format!("{label} must be greater than zero."),
			});
		}
	}

	if !cfg.rerank.min_relevance.is_finite() || !(0.0..=1.0).contains(&cfg.rerank.min_relevance) {
		return Err(Error::Validation {
			message: "rerank.min_relevance must be in the range 0.0-1.0.".to_string(),
		});
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	// Joining api_base and path must not produce a double slash.
	while cfg.providers.llm.api_base.ends_with('/') {
		cfg.providers.llm.api_base.pop();
	}
	if !cfg.providers.llm.path.starts_with('/') {
		cfg.providers.llm.path.insert(0, '/');
	}
}
