use std::collections::HashMap;

use qdrant_client::qdrant::{
	Condition, CreateCollectionBuilder, Distance, Filter, Query, QueryPointsBuilder,
	VectorParamsBuilder, point_id::PointIdOptions, value::Kind,
};

use crate::{Result, models::ChunkMatch};

pub struct QdrantStore {
	pub client: qdrant_client::Qdrant,
	pub collection: String,
	pub vector_dim: u32,
}
impl QdrantStore {
	pub fn new(cfg: &bidgraph_config::Qdrant) -> Result<Self> {
		let client = qdrant_client::Qdrant::from_url(&cfg.url).build()?;

		Ok(Self { client, collection: cfg.collection.clone(), vector_dim: cfg.vector_dim })
	}

	pub async fn ensure_collection(&self) -> Result<()> {
		if self.client.collection_exists(&self.collection).await? {
			return Ok(());
		}

		self.client
			.create_collection(CreateCollectionBuilder::new(&self.collection).vectors_config(
				VectorParamsBuilder::new(self.vector_dim as u64, Distance::Cosine),
			))
			.await?;

		Ok(())
	}

	/// Nearest-neighbor lookup scoped to one tenant, optionally narrowed to
	/// a single document type. Points missing the `content` payload field
	/// are dropped rather than surfaced as empty candidates.
	pub async fn vector_match(
		&self,
		tenant_id: &str,
		embedding: Vec<f32>,
		document_type: Option<&str>,
		top_k: u32,
	) -> Result<Vec<ChunkMatch>> {
		let mut must = vec![Condition::matches("tenant_id", tenant_id.to_string())];

		if let Some(document_type) = document_type {
			must.push(Condition::matches("document_type", document_type.to_string()));
		}

		let search = QueryPointsBuilder::new(self.collection.clone())
			.query(Query::new_nearest(embedding))
			.filter(Filter::must(must))
			.limit(top_k as u64)
			.with_payload(true);
		let response = self.client.query(search).await?;
		let mut matches = Vec::with_capacity(response.result.len());

		for point in response.result {
			let Some(id) = point.id.as_ref().and_then(point_id_string) else {
				continue;
			};
			let Some(content) = payload_string(&point.payload, "content") else {
				continue;
			};
			let metadata = point
				.payload
				.get("metadata")
				.map(|value| json_value(value.clone()))
				.unwrap_or(serde_json::Value::Object(Default::default()));

			matches.push(ChunkMatch { id, content, similarity: point.score, metadata });
		}

		Ok(matches)
	}
}

fn point_id_string(point_id: &qdrant_client::qdrant::PointId) -> Option<String> {
	match &point_id.point_id_options {
		Some(PointIdOptions::Uuid(id)) => Some(id.clone()),
		Some(PointIdOptions::Num(id)) => Some(id.to_string()),
		None => None,
	}
}

fn payload_string(
	payload: &HashMap<String, qdrant_client::qdrant::Value>,
	key: &str,
) -> Option<String> {
	match &payload.get(key)?.kind {
		Some(Kind::StringValue(text)) => Some(text.clone()),
		_ => None,
	}
}

fn json_value(value: qdrant_client::qdrant::Value) -> serde_json::Value {
	match value.kind {
		Some(Kind::BoolValue(value)) => serde_json::Value::Bool(value),
		Some(Kind::IntegerValue(value)) => serde_json::Value::from(value),
		Some(Kind::DoubleValue(value)) => serde_json::Value::from(value),
		Some(Kind::StringValue(value)) => serde_json::Value::String(value),
		Some(Kind::ListValue(list)) =>
			serde_json::Value::Array(list.values.into_iter().map(json_value).collect()),
		Some(Kind::StructValue(fields)) => serde_json::Value::Object(
			fields.fields.into_iter().map(|(key, value)| (key, json_value(value))).collect(),
		),
		Some(Kind::NullValue(_)) | None => serde_json::Value::Null,
	}
}
