/// Idempotent bootstrap DDL. Statements are `IF NOT EXISTS` so re-running
/// against a live database is safe.
pub fn render_schema() -> &'static str {
	include_str!("../sql/init.sql")
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn schema_covers_all_tables() {
		let sql = render_schema();

		for table in
			["document_chunks", "extraction_records", "graph_nodes", "graph_entity_pairs"]
		{
			assert!(sql.contains(&format!("CREATE TABLE IF NOT EXISTS {table}")), "{table}");
		}

		// Statement splitting in `Db::ensure_schema` relies on this.
		assert!(!sql.contains("$$"));
	}
}
