use regex::Regex;

pub const EMBEDDING_SYSTEM_PROMPT: &str =
	"You are an embedding generator. Output ONLY a JSON array of numbers.";

pub fn embedding_prompt(text: &str, dimensions: u32, max_input_chars: u32) -> String {
	let capped: String = text.chars().take(max_input_chars as usize).collect();

	format!(
		"Generate a JSON array of {dimensions} floating-point numbers representing a semantic embedding for: \"{capped}\""
	)
}

/// Pulls the first bracketed JSON array out of a model response. Anything
/// that is not a non-empty numeric array yields `None` so the caller can
/// fall back to the degraded embedding.
pub fn parse_embedding_content(content: &str) -> Option<Vec<f32>> {
	let array = Regex::new(r"\[[\s\S]*\]").ok()?.find(content)?;
	let parsed: Vec<f64> = serde_json::from_str(array.as_str()).ok()?;

	if parsed.is_empty() {
		return None;
	}

	Some(parsed.into_iter().map(|v| v as f32).collect())
}

/// Deterministic pseudo-embedding used when the model yields no usable
/// vector. Each character code is scattered into one of `dimensions`
/// buckets via a fixed hash mixed with word and character position, then
/// the vector is L2-normalized. Not a semantic embedding; it only keeps
/// the pipeline available.
pub fn degraded_embedding(text: &str, dimensions: usize) -> Vec<f32> {
	let mut embedding = vec![0.0_f32; dimensions];

	if dimensions == 0 {
		return embedding;
	}

	let normalized: String = text
		.to_lowercase()
		.chars()
		.filter(|c| c.is_ascii_alphanumeric() || c.is_whitespace())
		.collect();
	let words: Vec<&str> = normalized.split_whitespace().collect();

	if words.is_empty() {
		return embedding;
	}

	let weight = 1.0 / (words.len() as f32).sqrt();

	for (word_index, word) in words.iter().enumerate() {
		for (char_index, ch) in word.chars().enumerate() {
			let dim = (ch as usize * 31 + word_index * 17 + char_index * 13) % dimensions;

			embedding[dim] += weight;
		}
	}

	let norm = embedding.iter().map(|v| v * v).sum::<f32>().sqrt();

	if norm > 0.0 {
		for value in &mut embedding {
			*value /= norm;
		}
	}

	embedding
}
