use std::time::Duration;

use color_eyre::{Result, eyre};
use reqwest::Client;
use serde_json::Value;

/// What a prompt is for. The endpoint is shared; the kind is carried for
/// routing and diagnostics.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TaskKind {
	Embedding,
	Rerank,
	Extraction,
}
impl TaskKind {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Embedding => "embedding",
			Self::Rerank => "rerank",
			Self::Extraction => "extraction",
		}
	}
}

/// One chat-completion round trip. Returns the raw assistant content; the
/// caller owns all parsing and fallback behavior.
pub async fn infer(
	cfg: &bidgraph_config::LlmProviderConfig,
	_task: TaskKind,
	prompt: &str,
	system_prompt: &str,
) -> Result<String> {
	let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;
	let url = format!("{}{}", cfg.api_base, cfg.path);
	let body = serde_json::json!({
		"model": cfg.model,
		"temperature": cfg.temperature,
		"messages": [
			{ "role": "system", "content": system_prompt },
			{ "role": "user", "content": prompt },
		],
	});
	let res = client
		.post(url)
		.headers(crate::auth_headers(&cfg.api_key, &cfg.default_headers)?)
		.json(&body)
		.send()
		.await?;
	let json: Value = res.error_for_status()?.json().await?;

	parse_infer_content(json)
}

fn parse_infer_content(json: Value) -> Result<String> {
	json.get("choices")
		.and_then(|v| v.as_array())
		.and_then(|arr| arr.first())
		.and_then(|choice| choice.get("message"))
		.and_then(|msg| msg.get("content"))
		.and_then(|c| c.as_str())
		.map(str::to_string)
		.ok_or_else(|| eyre::eyre!("Inference response is missing message content."))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_choice_content() {
		let json = serde_json::json!({
			"choices": [
				{ "message": { "content": "[0.1, 0.2]" } }
			]
		});

		assert_eq!(parse_infer_content(json).expect("parse failed"), "[0.1, 0.2]");
	}

	#[test]
	fn missing_content_is_an_error() {
		let json = serde_json::json!({ "choices": [] });

		assert!(parse_infer_content(json).is_err());
	}
}
