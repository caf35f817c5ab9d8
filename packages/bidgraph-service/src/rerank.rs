use bidgraph_domain::{clamp_unit, truncate_chars};
use bidgraph_providers::TaskKind;
use regex::Regex;

use crate::{BidgraphService, ServiceResult, search::{RankedResult, SearchRequest}};

pub const RERANK_SYSTEM_PROMPT: &str =
	"You are a relevance judge for government proposal research. Output ONLY a JSON array.";

#[derive(Clone, Debug, serde::Serialize)]
pub struct RerankedResult {
	#[serde(flatten)]
	pub result: RankedResult,
	/// Cross-encoder relevance in `[0, 1]`.
	pub reranker_score: f32,
	/// 1-based position the candidate held before reranking.
	pub original_rank: u32,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub explanation: Option<String>,
}

struct ScoredPassage {
	score: f32,
	explanation: Option<String>,
}

impl BidgraphService {
	/// The full retrieval pipeline: hybrid search over the reranker's
	/// candidate budget, then one batched cross-encoder pass.
	pub async fn retrieve(&self, request: &SearchRequest) -> ServiceResult<Vec<RerankedResult>> {
		let candidates =
			self.hybrid_search_with_limit(request, self.cfg.rerank.candidate_count).await?;

		Ok(self.rerank(request.query.trim(), candidates).await)
	}

	/// One LLM call scores the whole batch. Any inference or parse failure
	/// degrades to rank-derived default scores, so reranking never fails a
	/// retrieval that already has candidates.
	pub async fn rerank(
		&self,
		query: &str,
		mut candidates: Vec<RankedResult>,
	) -> Vec<RerankedResult> {
		let cfg = &self.cfg.rerank;

		candidates.truncate(cfg.candidate_count as usize);

		if candidates.is_empty() {
			return Vec::new();
		}

		let prompt = rerank_prompt(query, &candidates, cfg);
		let scored = match self
			.backends
			.inference
			.infer(&self.cfg.providers.llm, TaskKind::Rerank, &prompt, RERANK_SYSTEM_PROMPT)
			.await
		{
			Ok(content) => {
				let scored = parse_rerank_scores(&content, candidates.len());

				if scored.is_none() {
					tracing::warn!("Rerank response had no usable score array; using rank-derived scores.");
				}

				scored
			},
			Err(err) => {
				tracing::warn!(error = %err, "Rerank inference failed; using rank-derived scores.");

				None
			},
		};
		let scored = scored.unwrap_or_else(|| default_scores(candidates.len()));
		let mut results: Vec<RerankedResult> = candidates
			.into_iter()
			.zip(scored)
			.enumerate()
			.map(|(index, (result, passage))| RerankedResult {
				result,
				reranker_score: passage.score,
				original_rank: (index + 1) as u32,
				explanation: if cfg.include_explanation { passage.explanation } else { None },
			})
			.collect();

		results.sort_by(|a, b| b.reranker_score.total_cmp(&a.reranker_score));
		results.retain(|result| result.reranker_score >= cfg.min_relevance);
		results.truncate(cfg.return_count as usize);

		results
	}
}

fn rerank_prompt(query: &str, candidates: &[RankedResult], cfg: &bidgraph_config::Rerank) -> String {
	let mut prompt = format!(
		"Score how relevant each passage is to the query, from 0.0 to 1.0.\n\nQuery: {query}\n\nPassages:\n"
	);

	for (index, candidate) in candidates.iter().enumerate() {
		let passage = truncate_chars(&candidate.content, cfg.passage_max_chars as usize);

		prompt.push_str(&format!("\n[{}] {passage}\n", index + 1));
	}
	if cfg.include_explanation {
		prompt.push_str(
			"\nRespond with ONLY a JSON array like [{\"index\": 1, \"score\": 0.95, \"explanation\": \"...\"}], one object per passage.",
		);
	} else {
		prompt.push_str(
			"\nRespond with ONLY a JSON array like [{\"index\": 1, \"score\": 0.95}], one object per passage.",
		);
	}

	prompt
}

/// Pulls the first bracketed JSON array out of the response and maps entries
/// back to candidates by their 1-based index. Candidates the model skipped
/// score zero; out-of-range scores are clamped into `[0, 1]`.
fn parse_rerank_scores(content: &str, count: usize) -> Option<Vec<ScoredPassage>> {
	let array = Regex::new(r"\[[\s\S]*\]").ok()?.find(content)?;
	let entries: Vec<serde_json::Value> = serde_json::from_str(array.as_str()).ok()?;
	let mut scored: Vec<ScoredPassage> =
		(0..count).map(|_| ScoredPassage { score: 0.0, explanation: None }).collect();

	for entry in &entries {
		let Some(index) = entry.get("index").and_then(|value| value.as_u64()) else {
			continue;
		};

		if index == 0 || index as usize > count {
			continue;
		}

		let score = entry.get("score").and_then(|value| value.as_f64()).unwrap_or(0.0) as f32;

		scored[index as usize - 1] = ScoredPassage {
			score: clamp_unit(score),
			explanation: entry
				.get("explanation")
				.and_then(|value| value.as_str())
				.map(str::to_string),
		};
	}

	Some(scored)
}

/// Rank-derived fallback: strictly decreasing from the fused order, floored
/// at 0.1 so late candidates are never filtered out as zero-relevance.
fn default_scores(count: usize) -> Vec<ScoredPassage> {
	(0..count)
		.map(|index| ScoredPassage {
			score: (1.0 - 0.05 * index as f32).max(0.1),
			explanation: None,
		})
		.collect()
}
