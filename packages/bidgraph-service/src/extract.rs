use std::collections::BTreeMap;

use bidgraph_chunking::ChunkingConfig;
use bidgraph_domain::{
	EntityRelationship, EntityType, ExtractedEntity, ExtractionRecord, RelationshipType,
	clamp_unit, dedup_entities, truncate_chars,
};
use bidgraph_providers::TaskKind;
use regex::Regex;

use crate::{BidgraphService, ServiceError, ServiceResult};

pub const EXTRACTION_SYSTEM_PROMPT: &str =
	"You extract structured entities from government contracting documents. Output ONLY strict JSON.";

#[derive(Clone, Debug, serde::Deserialize)]
pub struct ExtractRequest {
	pub tenant_id: String,
	pub document_id: String,
	pub document_name: String,
	pub content: String,
}

impl BidgraphService {
	/// Chunks the document, runs one extraction call per chunk, and persists
	/// exactly one deduplicated record. A chunk whose call or parse fails
	/// contributes nothing and processing continues; the only hard failure
	/// is the final append.
	pub async fn extract_entities(
		&self,
		request: &ExtractRequest,
	) -> ServiceResult<ExtractionRecord> {
		let tenant_id = request.tenant_id.trim();
		let document_id = request.document_id.trim();

		if tenant_id.is_empty() {
			return Err(ServiceError::InvalidRequest {
				message: "tenant_id must not be empty.".to_string(),
			});
		}
		if document_id.is_empty() {
			return Err(ServiceError::InvalidRequest {
				message: "document_id must not be empty.".to_string(),
			});
		}

		let extraction_cfg = &self.cfg.extraction;
		let chunks = bidgraph_chunking::split_text(&request.content, &ChunkingConfig {
			max_chars: extraction_cfg.max_chunk_chars as usize,
		});
		let mut entities = Vec::new();
		let mut relationships = Vec::new();

		for (index, chunk) in chunks.iter().enumerate() {
			let prompt = extraction_prompt(chunk);
			let content = match self
				.backends
				.inference
				.infer(
					&self.cfg.providers.llm,
					TaskKind::Extraction,
					&prompt,
					EXTRACTION_SYSTEM_PROMPT,
				)
				.await
			{
				Ok(content) => content,
				Err(err) => {
					tracing::warn!(
						chunk = index,
						error = %err,
						"Extraction inference failed for chunk; skipping it.",
					);

					continue;
				},
			};
			let Some(parsed) = parse_extraction(
				&content,
				document_id,
				extraction_cfg.context_max_chars as usize,
			) else {
				tracing::warn!(chunk = index, "Extraction response had no usable JSON; skipping it.");

				continue;
			};

			entities.extend(parsed.entities);
			relationships.extend(parsed.relationships);
		}

		let entities = dedup_entities(entities);

		tracing::debug!(
			chunks = chunks.len(),
			entities = entities.len(),
			relationships = relationships.len(),
			"Extraction complete; appending record.",
		);

		let record = ExtractionRecord::new(
			tenant_id,
			document_id,
			request.document_name.trim(),
			entities,
			relationships,
			time::OffsetDateTime::now_utc(),
		);

		self.backends
			.graph
			.append(&record)
			.await
			.map_err(|err| ServiceError::Storage { message: err.to_string() })?;

		Ok(record)
	}
}

struct ParsedExtraction {
	entities: Vec<ExtractedEntity>,
	relationships: Vec<EntityRelationship>,
}

fn extraction_prompt(chunk: &str) -> String {
	format!(
		"Extract entities and relationships from this government contracting document excerpt.\n\n\
		Entity types (use exactly these): agency, contract_vehicle, person, technology, requirement, past_performance.\n\
		Relationship types (use exactly these): appeared_in, related_to, succeeded_by.\n\n\
		Respond with ONLY strict JSON of the form:\n\
		{{\"entities\": [{{\"name\": \"...\", \"type\": \"...\", \"context\": \"...\", \"confidence\": 0.9, \"attributes\": {{}}}}], \
		\"relationships\": [{{\"source_entity\": \"...\", \"target_entity\": \"...\", \"type\": \"...\", \"strength\": 0.7}}]}}\n\n\
		Document excerpt:\n{chunk}"
	)
}

/// Defensive parse of one chunk response: first braced JSON block, unknown
/// types dropped, confidence and strength clamped, context truncated. `None`
/// means the chunk yielded nothing usable.
fn parse_extraction(
	content: &str,
	document_id: &str,
	context_max_chars: usize,
) -> Option<ParsedExtraction> {
	let block = Regex::new(r"\{[\s\S]*\}").ok()?.find(content)?;
	let parsed: serde_json::Value = serde_json::from_str(block.as_str()).ok()?;
	let mut entities = Vec::new();
	let mut relationships = Vec::new();

	for raw in parsed.get("entities").and_then(|v| v.as_array()).into_iter().flatten() {
		let Some(name) = raw.get("name").and_then(|v| v.as_str()).map(str::trim) else {
			continue;
		};

		if name.is_empty() {
			continue;
		}

		let Some(entity_type) =
			raw.get("type").and_then(|v| v.as_str()).and_then(EntityType::parse)
		else {
			continue;
		};
		let context = raw.get("context").and_then(|v| v.as_str()).unwrap_or("");
		let confidence = raw.get("confidence").and_then(|v| v.as_f64()).unwrap_or(0.5) as f32;
		let mut attributes = BTreeMap::new();

		if let Some(map) = raw.get("attributes").and_then(|v| v.as_object()) {
			for (key, value) in map {
				if let Some(value) = value.as_str() {
					attributes.insert(key.clone(), value.to_string());
				}
			}
		}

		entities.push(ExtractedEntity {
			name: name.to_string(),
			entity_type,
			context: truncate_chars(context, context_max_chars),
			confidence: clamp_unit(confidence),
			attributes,
		});
	}

	for raw in parsed.get("relationships").and_then(|v| v.as_array()).into_iter().flatten() {
		let Some(source) = raw.get("source_entity").and_then(|v| v.as_str()).map(str::trim)
		else {
			continue;
		};
		let Some(target) = raw.get("target_entity").and_then(|v| v.as_str()).map(str::trim)
		else {
			continue;
		};

		if source.is_empty() || target.is_empty() {
			continue;
		}

		let Some(relationship_type) =
			raw.get("type").and_then(|v| v.as_str()).and_then(RelationshipType::parse)
		else {
			continue;
		};
		let strength = raw.get("strength").and_then(|v| v.as_f64()).unwrap_or(0.5) as f32;

		relationships.push(EntityRelationship {
			source_entity: source.to_string(),
			target_entity: target.to_string(),
			relationship_type,
			document_id: document_id.to_string(),
			strength: clamp_unit(strength),
		});
	}

	Some(ParsedExtraction { entities, relationships })
}
