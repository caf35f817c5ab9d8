//! Reciprocal rank fusion over the two retrieval legs. Works on ranks, not
//! raw scores, so the legs' incompatible similarity scales never mix.

use std::collections::HashMap;

use bidgraph_storage::models::ChunkMatch;

use crate::search::{Provenance, RankedResult};

/// `Σ weight / (rrf_k + rank)` over the legs containing each id, 1-based
/// rank per leg. Ids present in both legs merge into one entry tagged
/// `both`. Ties keep the order ids were first encountered scanning the
/// vector leg then the keyword leg.
pub fn reciprocal_rank_fusion(
	cfg: &bidgraph_config::Search,
	top_n: u32,
	vector: Vec<ChunkMatch>,
	keyword: Vec<ChunkMatch>,
) -> Vec<RankedResult> {
	let mut order: Vec<String> = Vec::new();
	let mut fused: HashMap<String, RankedResult> = HashMap::new();

	for (index, matched) in vector.into_iter().enumerate() {
		let contribution = cfg.vector_weight / (cfg.rrf_k + (index + 1) as f32);

		order.push(matched.id.clone());
		fused.insert(matched.id.clone(), RankedResult {
			id: matched.id,
			content: matched.content,
			vector_score: matched.similarity,
			keyword_score: 0.0,
			combined_score: contribution,
			provenance: Provenance::Vector,
			metadata: matched.metadata,
		});
	}

	for (index, matched) in keyword.into_iter().enumerate() {
		let contribution = cfg.keyword_weight / (cfg.rrf_k + (index + 1) as f32);

		match fused.get_mut(&matched.id) {
			Some(existing) => {
				existing.keyword_score = matched.similarity;
				existing.combined_score += contribution;
				existing.provenance = Provenance::Both;
			},
			None => {
				order.push(matched.id.clone());
				fused.insert(matched.id.clone(), RankedResult {
					id: matched.id,
					content: matched.content,
					vector_score: 0.0,
					keyword_score: matched.similarity,
					combined_score: contribution,
					provenance: Provenance::Keyword,
					metadata: matched.metadata,
				});
			},
		}
	}

	let mut results: Vec<RankedResult> =
		order.into_iter().filter_map(|id| fused.remove(&id)).collect();

	results.retain(|result| result.combined_score >= cfg.min_score);
	// Stable sort, so equal scores keep first-encounter order.
	results.sort_by(|a, b| b.combined_score.total_cmp(&a.combined_score));
	results.truncate(top_n as usize);

	results
}

#[cfg(test)]
mod tests {
	use super::*;

	fn matched(id: &str, similarity: f32) -> ChunkMatch {
		ChunkMatch {
			id: id.to_string(),
			content: format!("content of {id}"),
			similarity,
			metadata: serde_json::Value::Object(Default::default()),
		}
	}

	fn cfg(vector_weight: f32, keyword_weight: f32) -> bidgraph_config::Search {
		bidgraph_config::Search {
			vector_weight,
			keyword_weight,
			rrf_k: 60.0,
			min_score: 0.0,
			..Default::default()
		}
	}

	#[test]
	fn vector_rank_one_beats_keyword_rank_two() {
		let cfg = cfg(1.0, 0.4);
		let vector = vec![matched("A", 0.91)];
		let keyword = vec![matched("C", 0.8), matched("B", 0.7)];
		let results = reciprocal_rank_fusion(&cfg, 10, vector, keyword);
		let a = results.iter().find(|r| r.id == "A").expect("A missing");
		let b = results.iter().find(|r| r.id == "B").expect("B missing");

		assert!((a.combined_score - 1.0 / 61.0).abs() < 1e-6);
		assert!((b.combined_score - 0.4 / 62.0).abs() < 1e-6);
		assert!(
			results.iter().position(|r| r.id == "A") < results.iter().position(|r| r.id == "B")
		);
	}

	#[test]
	fn id_in_both_legs_merges_with_summed_score() {
		let cfg = cfg(0.6, 0.4);
		let results = reciprocal_rank_fusion(
			&cfg,
			10,
			vec![matched("X", 0.9)],
			vec![matched("X", 0.5)],
		);

		assert_eq!(results.len(), 1);
		assert_eq!(results[0].provenance, Provenance::Both);
		assert!((results[0].vector_score - 0.9).abs() < f32::EPSILON);
		assert!((results[0].keyword_score - 0.5).abs() < f32::EPSILON);
		assert!((results[0].combined_score - (0.6 / 61.0 + 0.4 / 61.0)).abs() < 1e-6);
	}

	#[test]
	fn better_rank_never_scores_lower_within_a_leg() {
		let cfg = cfg(0.6, 0.4);
		let vector = (0..5).map(|i| matched(&format!("v{i}"), 0.9)).collect();
		let results = reciprocal_rank_fusion(&cfg, 10, vector, Vec::new());

		for pair in results.windows(2) {
			assert!(pair[0].combined_score > pair[1].combined_score);
		}
	}

	#[test]
	fn ties_keep_first_encounter_order() {
		// Same weight and same rank in disjoint legs produce an exact tie.
		let cfg = cfg(0.5, 0.5);
		let results = reciprocal_rank_fusion(
			&cfg,
			10,
			vec![matched("from-vector", 0.9)],
			vec![matched("from-keyword", 0.9)],
		);

		assert_eq!(results[0].id, "from-vector");
		assert_eq!(results[1].id, "from-keyword");
	}

	#[test]
	fn min_score_drops_weak_entries_and_top_n_truncates() {
		let mut cfg = cfg(0.6, 0.4);

		cfg.min_score = 0.6 / 62.5;

		let vector = (0..4).map(|i| matched(&format!("v{i}"), 0.9)).collect();
		let results = reciprocal_rank_fusion(&cfg, 10, vector, Vec::new());

		// Ranks 3 and 4 fall below the cutoff.
		assert_eq!(results.len(), 2);

		let vector = (0..4).map(|i| matched(&format!("v{i}"), 0.9)).collect();
		let cfg = self::cfg(0.6, 0.4);
		let results = reciprocal_rank_fusion(&cfg, 3, vector, Vec::new());

		assert_eq!(results.len(), 3);
	}

	#[test]
	fn deterministic_across_runs() {
		for _ in 0..16 {
			let cfg = cfg(0.6, 0.4);
			let vector = vec![matched("a", 0.9), matched("b", 0.8)];
			let keyword = vec![matched("b", 0.7), matched("c", 0.6)];
			let results = reciprocal_rank_fusion(&cfg, 10, vector, keyword);
			let ids: Vec<&str> = results.iter().map(|r| r.id.as_str()).collect();

			assert_eq!(ids, vec!["b", "a", "c"]);
		}
	}
}
