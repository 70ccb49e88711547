use serde::Deserialize;

use super::{BoxFuture, GraphRecord, GraphStore, GraphStoreError};

const LOCATION_QUERY: &str = "\
MATCH (loc:Location)
WHERE any(term IN $terms WHERE
       toLower(loc.name) CONTAINS toLower(term) OR
       toLower(loc.type) CONTAINS toLower(term) OR
       toLower(loc.region) CONTAINS toLower(term) OR
       toLower(loc.description) CONTAINS toLower(term))
  AND loc.name IS NOT NULL
  AND loc.name <> 'Unknown'
  AND loc.description IS NOT NULL
  AND size(loc.description) > 20
OPTIONAL MATCH (loc)-[:LOCATED_IN]->(region:Region)
OPTIONAL MATCH (loc)-[:HAS_TAG]->(tag:Tag)
OPTIONAL MATCH (loc)-[:NEARBY]->(nearby:Location)
WITH loc, region,
     collect(DISTINCT tag.name) AS tags,
     collect(DISTINCT nearby.name) AS nearby_locations
RETURN
    loc.id AS node_id,
    loc.name AS name,
    loc.type AS type,
    loc.region AS region,
    loc.description AS description,
    loc.best_time_to_visit AS best_time,
    tags,
    region.name AS region_name,
    nearby_locations
ORDER BY loc.name
LIMIT $limit";

/// Neo4j graph store spoken to over the transactional HTTP endpoint.
#[derive(Clone)]
pub struct Neo4jStore {
    client: reqwest::Client,
    commit_url: String,
    user: String,
    password: String,
}

impl std::fmt::Debug for Neo4jStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Neo4jStore")
            .field("commit_url", &self.commit_url)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish_non_exhaustive()
    }
}

#[derive(Deserialize)]
struct TxResponse {
    #[serde(default)]
    results: Vec<TxResult>,
    #[serde(default)]
    errors: Vec<TxError>,
}

#[derive(Deserialize)]
struct TxResult {
    columns: Vec<String>,
    #[serde(default)]
    data: Vec<TxRow>,
}

#[derive(Deserialize)]
struct TxRow {
    row: Vec<serde_json::Value>,
}

#[derive(Deserialize)]
struct TxError {
    code: String,
    message: String,
}

impl Neo4jStore {
    /// `base_url` is the HTTP root of the server, e.g. `http://localhost:7474`.
    #[must_use]
    pub fn new(
        client: reqwest::Client,
        base_url: &str,
        database: &str,
        user: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            client,
            commit_url: format!("{}/db/{database}/tx/commit", base_url.trim_end_matches('/')),
            user: user.into(),
            password: password.into(),
        }
    }

    async fn run(
        &self,
        statement: &str,
        parameters: serde_json::Value,
    ) -> Result<TxResult, GraphStoreError> {
        let body = serde_json::json!({
            "statements": [{ "statement": statement, "parameters": parameters }]
        });

        let response = self
            .client
            .post(&self.commit_url)
            .basic_auth(&self.user, Some(&self.password))
            .json(&body)
            .send()
            .await
            .map_err(|e| GraphStoreError::Connection(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(GraphStoreError::Connection(format!(
                "graph endpoint returned {status}"
            )));
        }

        let parsed: TxResponse = response
            .json()
            .await
            .map_err(|e| GraphStoreError::Decode(e.to_string()))?;

        if let Some(err) = parsed.errors.into_iter().next() {
            return Err(GraphStoreError::Query(format!("{}: {}", err.code, err.message)));
        }

        parsed
            .results
            .into_iter()
            .next()
            .ok_or_else(|| GraphStoreError::Decode("response contained no result set".into()))
    }
}

fn rows_to_records(result: TxResult) -> Result<Vec<GraphRecord>, GraphStoreError> {
    let TxResult { columns, data } = result;
    data.into_iter()
        .map(|TxRow { row }| {
            let object: serde_json::Map<String, serde_json::Value> =
                columns.iter().cloned().zip(row).collect();
            serde_json::from_value(serde_json::Value::Object(object))
                .map_err(|e| GraphStoreError::Decode(e.to_string()))
        })
        .collect()
}

impl GraphStore for Neo4jStore {
    fn query(
        &self,
        terms: &[String],
        limit: usize,
    ) -> BoxFuture<'_, Result<Vec<GraphRecord>, GraphStoreError>> {
        let parameters = serde_json::json!({ "terms": terms, "limit": limit });
        Box::pin(async move {
            let result = self.run(LOCATION_QUERY, parameters).await?;
            rows_to_records(result)
        })
    }

    fn verify_connectivity(&self) -> BoxFuture<'_, Result<(), GraphStoreError>> {
        Box::pin(async move {
            self.run("RETURN 1", serde_json::json!({})).await?;
            Ok(())
        })
    }
}
