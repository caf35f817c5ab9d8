//! Splits document text into extraction-sized chunks on blank-line
//! paragraph boundaries. Paragraphs are packed greedily up to the character
//! budget; a single oversized paragraph is kept whole rather than split
//! mid-paragraph.

#[derive(Clone, Debug)]
pub struct ChunkingConfig {
	pub max_chars: usize,
}

pub fn split_text(text: &str, cfg: &ChunkingConfig) -> Vec<String> {
	let mut chunks = Vec::new();
	let mut current = String::new();
	let mut current_chars = 0_usize;

	for paragraph in paragraphs(text) {
		let paragraph_chars = paragraph.chars().count();

		if current_chars + paragraph_chars > cfg.max_chars && !current.is_empty() {
			chunks.push(std::mem::take(&mut current));

			current_chars = 0;
		}
		if !current.is_empty() {
			current.push_str("\n\n");
		}

		current.push_str(paragraph);

		current_chars += paragraph_chars;
	}

	if !current.trim().is_empty() {
		chunks.push(current);
	}

	chunks
}

fn paragraphs(text: &str) -> Vec<&str> {
	let mut out = Vec::new();
	let mut start = None;
	let mut end = 0_usize;

	for (offset, line) in line_spans(text) {
		if line.trim().is_empty() {
			if let Some(begin) = start.take() {
				out.push(text[begin..end].trim_end());
			}
		} else {
			if start.is_none() {
				start = Some(offset);
			}

			end = offset + line.len();
		}
	}

	if let Some(begin) = start {
		out.push(text[begin..end].trim_end());
	}

	out
}

fn line_spans(text: &str) -> impl Iterator<Item = (usize, &str)> {
	let mut offset = 0_usize;

	text.split_inclusive('\n').map(move |line| {
		let at = offset;

		offset += line.len();

		(at, line)
	})
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn packs_paragraphs_greedily() {
		let cfg = ChunkingConfig { max_chars: 20 };
		let chunks = split_text("alpha one\n\nbeta two\n\ngamma three", &cfg);

		assert_eq!(chunks, vec!["alpha one\n\nbeta two".to_string(), "gamma three".to_string()]);
	}

	#[test]
	fn keeps_oversized_paragraph_whole() {
		let cfg = ChunkingConfig { max_chars: 10 };
		let long = "a paragraph that is far longer than the budget";
		let chunks = split_text(&format!("short\n\n{long}\n\ntail"), &cfg);

		assert_eq!(chunks.len(), 3);
		assert_eq!(chunks[1], long);
	}

	#[test]
	fn collapses_repeated_blank_lines() {
		let cfg = ChunkingConfig { max_chars: 100 };
		let chunks = split_text("one\n\n\n\ntwo\n   \nthree\n", &cfg);

		assert_eq!(chunks, vec!["one\n\ntwo\n\nthree".to_string()]);
	}

	#[test]
	fn empty_input_yields_no_chunks() {
		let cfg = ChunkingConfig { max_chars: 100 };

		assert!(split_text("", &cfg).is_empty());
		assert!(split_text("\n\n  \n", &cfg).is_empty());
	}
}
