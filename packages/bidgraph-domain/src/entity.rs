use std::collections::BTreeMap;

/// Entity categories recognized by the extractor. The whitelist is closed:
/// anything else coming back from the model is discarded.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
	Agency,
	ContractVehicle,
	Person,
	Technology,
	Requirement,
	PastPerformance,
}
impl EntityType {
	pub const ALL: [Self; 6] = [
		Self::Agency,
		Self::ContractVehicle,
		Self::Person,
		Self::Technology,
		Self::Requirement,
		Self::PastPerformance,
	];

	pub fn as_str(self) -> &'static str {
		match self {
			Self::Agency => "agency",
			Self::ContractVehicle => "contract_vehicle",
			Self::Person => "person",
			Self::Technology => "technology",
			Self::Requirement => "requirement",
			Self::PastPerformance => "past_performance",
		}
	}

	/// Strict whitelist parse; unknown labels yield `None`.
	pub fn parse(raw: &str) -> Option<Self> {
		match raw.trim() {
			"agency" => Some(Self::Agency),
			"contract_vehicle" => Some(Self::ContractVehicle),
			"person" => Some(Self::Person),
			"technology" => Some(Self::Technology),
			"requirement" => Some(Self::Requirement),
			"past_performance" => Some(Self::PastPerformance),
			_ => None,
		}
	}
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipType {
	AppearedIn,
	RelatedTo,
	SucceededBy,
}
impl RelationshipType {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::AppearedIn => "appeared_in",
			Self::RelatedTo => "related_to",
			Self::SucceededBy => "succeeded_by",
		}
	}

	pub fn parse(raw: &str) -> Option<Self> {
		match raw.trim() {
			"appeared_in" => Some(Self::AppearedIn),
			"related_to" => Some(Self::RelatedTo),
			"succeeded_by" => Some(Self::SucceededBy),
			_ => None,
		}
	}
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ExtractedEntity {
	pub name: String,
	#[serde(rename = "type")]
	pub entity_type: EntityType,
	pub context: String,
	pub confidence: f32,
	#[serde(default)]
	pub attributes: BTreeMap<String, String>,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct EntityRelationship {
	pub source_entity: String,
	pub target_entity: String,
	#[serde(rename = "type")]
	pub relationship_type: RelationshipType,
	pub document_id: String,
	pub strength: f32,
}

pub fn clamp_unit(value: f32) -> f32 {
	if value.is_nan() {
		return 0.0;
	}

	value.clamp(0.0, 1.0)
}

/// Truncates to a character budget without splitting a scalar value.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
	if text.chars().count() <= max_chars {
		return text.to_string();
	}

	text.chars().take(max_chars).collect()
}

/// Aggregation key shared by dedup and the graph index.
pub fn entity_key(entity_type: EntityType, name: &str) -> (EntityType, String) {
	(entity_type, name.trim().to_lowercase())
}

/// Collapses duplicates by `(type, lowercase(name))`, keeping the higher
/// confidence. The first occurrence wins an exact tie, and output order
/// follows first encounter.
pub fn dedup_entities(entities: Vec<ExtractedEntity>) -> Vec<ExtractedEntity> {
	let mut kept: Vec<ExtractedEntity> = Vec::with_capacity(entities.len());
	let mut index: std::collections::HashMap<(EntityType, String), usize> =
		std::collections::HashMap::new();

	for entity in entities {
		let key = entity_key(entity.entity_type, &entity.name);

		match index.get(&key) {
			Some(&slot) => {
				if entity.confidence > kept[slot].confidence {
					kept[slot] = entity;
				}
			},
			None => {
				index.insert(key, kept.len());
				kept.push(entity);
			},
		}
	}

	kept
}
