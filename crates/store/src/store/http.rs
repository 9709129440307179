//! Remote store backend.
//!
//! Speaks the service's JSON-RPC style protocol directly: every operation is
//! one signed `POST /` with an `x-amz-target` header naming the operation
//! and a JSON body in the documented request shape. Items cross the codec in
//! both directions; non-2xx answers surface unchanged as
//! [`StoreError::Request`] so callers (and the bootstrapper) can inspect the
//! service's error type string.

use chrono::Utc;
use docvet_core::attr::{self, Item};
use docvet_core::sigv4::{self, sign_request, Credentials};
use serde_json::{json, Value};

use crate::config::Config;
use crate::error::{Result, StoreError};
use crate::types::{
    IndexSpec, IndexState, IndexStatus, Query, QueryPage, TableSpec, TableState, TableStatus,
    TtlState, TtlStatus, Update,
};

const SERVICE: &str = "dynamodb";
const TARGET_PREFIX: &str = "DynamoDB_20120810";

/// Store backend talking to the real service over HTTP.
///
/// No per-request timeout is imposed here; only the bootstrapper's polling
/// loops are bounded.
#[derive(Debug)]
pub struct HttpStore {
    http: reqwest::Client,
    endpoint: String,
    host: String,
    region: String,
    credentials: Credentials,
}

impl HttpStore {
    /// Builds the remote backend from configuration.
    ///
    /// Fails fast with [`StoreError::MissingCredentials`] when no access key
    /// pair is configured; the endpoint defaults to the region's service
    /// endpoint unless overridden.
    pub fn new(config: &Config) -> Result<Self> {
        let credentials = Credentials::new(
            config.access_key_id.clone().unwrap_or_default(),
            config.secret_access_key.clone().unwrap_or_default(),
            config.session_token.clone(),
        )
        .map_err(|_| StoreError::MissingCredentials)?;

        let endpoint = config
            .endpoint_url
            .clone()
            .unwrap_or_else(|| format!("https://dynamodb.{}.amazonaws.com", config.region));
        let host = host_of(&endpoint)?;

        Ok(Self {
            http: reqwest::Client::new(),
            endpoint,
            host,
            region: config.region.clone(),
            credentials,
        })
    }

    async fn call(&self, operation: &str, body: Value) -> Result<Value> {
        let payload = serde_json::to_string(&body)?;
        let target = format!("{TARGET_PREFIX}.{operation}");
        let signed = sign_request(
            &self.credentials,
            &self.region,
            SERVICE,
            &self.host,
            &target,
            &payload,
            Utc::now(),
        );
        tracing::debug!(operation, "store request");

        let mut request = self
            .http
            .post(&self.endpoint)
            .header("content-type", sigv4::CONTENT_TYPE)
            .header("x-amz-date", &signed.amz_date)
            .header("x-amz-target", &target)
            .header("authorization", &signed.authorization);
        if let Some(token) = &signed.security_token {
            request = request.header("x-amz-security-token", token);
        }

        let response = request.body(payload).send().await?;
        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            tracing::debug!(operation, status = status.as_u16(), "store request failed");
            return Err(StoreError::Request {
                status: status.as_u16(),
                body: text,
            });
        }
        if text.is_empty() {
            return Ok(Value::Object(serde_json::Map::new()));
        }
        Ok(serde_json::from_str(&text)?)
    }

    // ------------------------------------------------------------------
    // Data plane
    // ------------------------------------------------------------------

    pub async fn put(&self, table: &str, item: Item, condition: Option<&str>) -> Result<()> {
        let mut body = json!({
            "TableName": table,
            "Item": attr::item_to_wire(&item)?,
        });
        if let Some(condition) = condition {
            body["ConditionExpression"] = json!(condition);
        }
        self.call("PutItem", body).await?;
        Ok(())
    }

    pub async fn get(&self, table: &str, key: &Item, consistent_read: bool) -> Result<Option<Item>> {
        let body = json!({
            "TableName": table,
            "Key": attr::item_to_wire(key)?,
            "ConsistentRead": consistent_read,
        });
        let response = self.call("GetItem", body).await?;
        match response.get("Item") {
            Some(wire) => Ok(Some(attr::item_from_wire(wire)?)),
            None => Ok(None),
        }
    }

    pub async fn update(&self, table: &str, key: &Item, update: &Update) -> Result<()> {
        let body = json!({
            "TableName": table,
            "Key": attr::item_to_wire(key)?,
            "UpdateExpression": update.expression,
            "ExpressionAttributeValues": attr::item_to_wire(&update.values)?,
        });
        self.call("UpdateItem", body).await?;
        Ok(())
    }

    pub async fn delete(&self, table: &str, key: &Item, condition: Option<&str>) -> Result<()> {
        let mut body = json!({
            "TableName": table,
            "Key": attr::item_to_wire(key)?,
        });
        if let Some(condition) = condition {
            body["ConditionExpression"] = json!(condition);
        }
        self.call("DeleteItem", body).await?;
        Ok(())
    }

    pub async fn query(&self, table: &str, query: &Query) -> Result<QueryPage> {
        let response = self.call("Query", query_body(table, query)?).await?;
        let items = match response.get("Items").and_then(Value::as_array) {
            Some(wire_items) => wire_items
                .iter()
                .map(attr::item_from_wire)
                .collect::<std::result::Result<Vec<_>, _>>()?,
            None => Vec::new(),
        };
        let cursor = response
            .get("LastEvaluatedKey")
            .map(attr::item_from_wire)
            .transpose()?;
        Ok(QueryPage { items, cursor })
    }

    // ------------------------------------------------------------------
    // Control plane
    // ------------------------------------------------------------------

    pub async fn describe_table(&self, table: &str) -> Result<TableState> {
        let response = self
            .call("DescribeTable", json!({ "TableName": table }))
            .await?;
        parse_table_state(&response)
    }

    pub async fn create_table(&self, spec: &TableSpec) -> Result<()> {
        self.call("CreateTable", create_table_body(spec)).await?;
        Ok(())
    }

    pub async fn add_index(&self, table: &str, index: &IndexSpec) -> Result<()> {
        self.call("UpdateTable", add_index_body(table, index)).await?;
        Ok(())
    }

    pub async fn describe_ttl(&self, table: &str) -> Result<TtlState> {
        let response = self
            .call("DescribeTimeToLive", json!({ "TableName": table }))
            .await?;
        parse_ttl_state(&response)
    }

    pub async fn enable_ttl(&self, table: &str, attribute: &str) -> Result<()> {
        let body = json!({
            "TableName": table,
            "TimeToLiveSpecification": { "AttributeName": attribute, "Enabled": true },
        });
        self.call("UpdateTimeToLive", body).await?;
        Ok(())
    }
}

// ----------------------------------------------------------------------
// Request bodies and response parsing
// ----------------------------------------------------------------------

fn host_of(endpoint: &str) -> Result<String> {
    let rest = endpoint
        .strip_prefix("https://")
        .or_else(|| endpoint.strip_prefix("http://"))
        .ok_or_else(|| StoreError::InvalidEndpoint(endpoint.to_string()))?;
    let host = rest.split('/').next().unwrap_or_default();
    if host.is_empty() {
        return Err(StoreError::InvalidEndpoint(endpoint.to_string()));
    }
    Ok(host.to_string())
}

fn query_body(table: &str, query: &Query) -> Result<Value> {
    let mut body = json!({
        "TableName": table,
        "KeyConditionExpression": query.key_condition,
        "ExpressionAttributeValues": attr::item_to_wire(&query.values)?,
        "ScanIndexForward": query.scan_forward,
    });
    if let Some(index) = &query.index {
        body["IndexName"] = json!(index);
    }
    if let Some(filter) = &query.filter {
        body["FilterExpression"] = json!(filter);
    }
    if let Some(cursor) = &query.cursor {
        body["ExclusiveStartKey"] = attr::item_to_wire(cursor)?;
    }
    if let Some(limit) = query.limit {
        body["Limit"] = json!(limit);
    }
    Ok(body)
}

fn create_table_body(spec: &TableSpec) -> Value {
    let mut body = json!({
        "TableName": spec.name,
        "KeySchema": key_schema(&spec.hash_key, spec.range_key.as_deref()),
        "AttributeDefinitions": attribute_definitions(spec),
        "BillingMode": "PAY_PER_REQUEST",
    });
    if !spec.indexes.is_empty() {
        body["GlobalSecondaryIndexes"] =
            Value::Array(spec.indexes.iter().map(index_definition).collect());
    }
    body
}

fn add_index_body(table: &str, index: &IndexSpec) -> Value {
    let mut names = vec![index.hash_key.as_str()];
    if let Some(range) = index.range_key.as_deref() {
        if !names.contains(&range) {
            names.push(range);
        }
    }
    json!({
        "TableName": table,
        "AttributeDefinitions": string_attribute_definitions(&names),
        "GlobalSecondaryIndexUpdates": [{ "Create": index_definition(index) }],
    })
}

fn key_schema(hash: &str, range: Option<&str>) -> Value {
    let mut schema = vec![json!({ "AttributeName": hash, "KeyType": "HASH" })];
    if let Some(range) = range {
        schema.push(json!({ "AttributeName": range, "KeyType": "RANGE" }));
    }
    Value::Array(schema)
}

// Key attributes are always strings; definitions are deduplicated across
// the table key and every index key.
fn attribute_definitions(spec: &TableSpec) -> Value {
    let mut names: Vec<&str> = Vec::new();
    for name in [Some(spec.hash_key.as_str()), spec.range_key.as_deref()]
        .into_iter()
        .flatten()
    {
        if !names.contains(&name) {
            names.push(name);
        }
    }
    for index in &spec.indexes {
        for name in [Some(index.hash_key.as_str()), index.range_key.as_deref()]
            .into_iter()
            .flatten()
        {
            if !names.contains(&name) {
                names.push(name);
            }
        }
    }
    string_attribute_definitions(&names)
}

fn string_attribute_definitions(names: &[&str]) -> Value {
    Value::Array(
        names
            .iter()
            .map(|name| json!({ "AttributeName": name, "AttributeType": "S" }))
            .collect(),
    )
}

fn index_definition(index: &IndexSpec) -> Value {
    json!({
        "IndexName": index.name,
        "KeySchema": key_schema(&index.hash_key, index.range_key.as_deref()),
        "Projection": { "ProjectionType": "ALL" },
    })
}

fn parse_table_state(response: &Value) -> Result<TableState> {
    let table = response
        .get("Table")
        .ok_or_else(|| StoreError::UnexpectedResponse("DescribeTable without Table".to_string()))?;
    let status = table
        .get("TableStatus")
        .and_then(Value::as_str)
        .unwrap_or("ACTIVE");
    let indexes = table
        .get("GlobalSecondaryIndexes")
        .and_then(Value::as_array)
        .map(|indexes| {
            indexes
                .iter()
                .map(|index| IndexState {
                    name: index
                        .get("IndexName")
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string(),
                    status: IndexStatus::parse(
                        index
                            .get("IndexStatus")
                            .and_then(Value::as_str)
                            .unwrap_or("ACTIVE"),
                    ),
                })
                .collect()
        })
        .unwrap_or_default();
    Ok(TableState {
        status: TableStatus::parse(status),
        indexes,
    })
}

fn parse_ttl_state(response: &Value) -> Result<TtlState> {
    let description = response.get("TimeToLiveDescription").ok_or_else(|| {
        StoreError::UnexpectedResponse("DescribeTimeToLive without TimeToLiveDescription".to_string())
    })?;
    Ok(TtlState {
        status: TtlStatus::parse(
            description
                .get("TimeToLiveStatus")
                .and_then(Value::as_str)
                .unwrap_or("DISABLED"),
        ),
        attribute: description
            .get("AttributeName")
            .and_then(Value::as_str)
            .map(str::to_string),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BackendKind;
    use serde_json::json;

    fn remote_config() -> Config {
        Config {
            backend: BackendKind::Dynamodb,
            region: "us-east-1".to_string(),
            endpoint_url: None,
            access_key_id: Some("AKIDEXAMPLE".to_string()),
            secret_access_key: Some("secret".to_string()),
            session_token: None,
            table_name: "docvet".to_string(),
            cache_table_name: "docvet-cache".to_string(),
            gsi1_name: "GSI1".to_string(),
            cache_ttl_seconds: 86_400,
        }
    }

    fn sample_spec() -> TableSpec {
        TableSpec {
            name: "docvet".to_string(),
            hash_key: "PK".to_string(),
            range_key: Some("SK".to_string()),
            indexes: vec![IndexSpec {
                name: "GSI1".to_string(),
                hash_key: "GSI1PK".to_string(),
                range_key: Some("GSI1SK".to_string()),
            }],
            ttl_attribute: None,
        }
    }

    #[test]
    fn test_new_requires_credentials() {
        let mut config = remote_config();
        config.access_key_id = None;
        assert!(matches!(
            HttpStore::new(&config),
            Err(StoreError::MissingCredentials)
        ));
    }

    #[test]
    fn test_endpoint_derived_from_region() {
        let store = HttpStore::new(&remote_config()).unwrap();
        assert_eq!(store.endpoint, "https://dynamodb.us-east-1.amazonaws.com");
        assert_eq!(store.host, "dynamodb.us-east-1.amazonaws.com");
    }

    #[test]
    fn test_endpoint_override_keeps_port() {
        let mut config = remote_config();
        config.endpoint_url = Some("http://localhost:8000".to_string());
        let store = HttpStore::new(&config).unwrap();
        assert_eq!(store.host, "localhost:8000");
    }

    #[test]
    fn test_host_of_rejects_bad_endpoints() {
        assert!(host_of("localhost:8000").is_err());
        assert!(host_of("https://").is_err());
    }

    #[test]
    fn test_query_body_shape() {
        let mut values = docvet_core::attr::Item::new();
        values.insert(":pk".to_string(), json!("ORG#1"));
        let query = Query::new("PK = :pk", values)
            .on_index("GSI1")
            .with_filter("attribute_not_exists(archived)")
            .with_limit(10);

        let body = query_body("docvet", &query).unwrap();
        assert_eq!(
            body,
            json!({
                "TableName": "docvet",
                "KeyConditionExpression": "PK = :pk",
                "ExpressionAttributeValues": { ":pk": { "S": "ORG#1" } },
                "ScanIndexForward": true,
                "IndexName": "GSI1",
                "FilterExpression": "attribute_not_exists(archived)",
                "Limit": 10,
            })
        );
    }

    #[test]
    fn test_create_table_body_shape() {
        let body = create_table_body(&sample_spec());
        assert_eq!(
            body,
            json!({
                "TableName": "docvet",
                "KeySchema": [
                    { "AttributeName": "PK", "KeyType": "HASH" },
                    { "AttributeName": "SK", "KeyType": "RANGE" },
                ],
                "AttributeDefinitions": [
                    { "AttributeName": "PK", "AttributeType": "S" },
                    { "AttributeName": "SK", "AttributeType": "S" },
                    { "AttributeName": "GSI1PK", "AttributeType": "S" },
                    { "AttributeName": "GSI1SK", "AttributeType": "S" },
                ],
                "BillingMode": "PAY_PER_REQUEST",
                "GlobalSecondaryIndexes": [{
                    "IndexName": "GSI1",
                    "KeySchema": [
                        { "AttributeName": "GSI1PK", "KeyType": "HASH" },
                        { "AttributeName": "GSI1SK", "KeyType": "RANGE" },
                    ],
                    "Projection": { "ProjectionType": "ALL" },
                }],
            })
        );
    }

    #[test]
    fn test_add_index_body_shape() {
        let index = IndexSpec {
            name: "GSI2".to_string(),
            hash_key: "GSI2PK".to_string(),
            range_key: None,
        };
        let body = add_index_body("docvet", &index);
        assert_eq!(
            body,
            json!({
                "TableName": "docvet",
                "AttributeDefinitions": [
                    { "AttributeName": "GSI2PK", "AttributeType": "S" },
                ],
                "GlobalSecondaryIndexUpdates": [{
                    "Create": {
                        "IndexName": "GSI2",
                        "KeySchema": [{ "AttributeName": "GSI2PK", "KeyType": "HASH" }],
                        "Projection": { "ProjectionType": "ALL" },
                    }
                }],
            })
        );
    }

    #[test]
    fn test_parse_table_state() {
        let response = json!({
            "Table": {
                "TableStatus": "UPDATING",
                "GlobalSecondaryIndexes": [
                    { "IndexName": "GSI1", "IndexStatus": "CREATING" },
                ],
            }
        });
        let state = parse_table_state(&response).unwrap();
        assert_eq!(state.status, TableStatus::Updating);
        assert_eq!(state.indexes.len(), 1);
        assert_eq!(state.indexes[0].name, "GSI1");
        assert_eq!(state.indexes[0].status, IndexStatus::Creating);

        assert!(parse_table_state(&json!({})).is_err());
    }

    #[test]
    fn test_parse_ttl_state() {
        let response = json!({
            "TimeToLiveDescription": {
                "TimeToLiveStatus": "ENABLED",
                "AttributeName": "expiresAt",
            }
        });
        let state = parse_ttl_state(&response).unwrap();
        assert_eq!(state.status, TtlStatus::Enabled);
        assert_eq!(state.attribute.as_deref(), Some("expiresAt"));

        let disabled = parse_ttl_state(&json!({ "TimeToLiveDescription": {} })).unwrap();
        assert_eq!(disabled.status, TtlStatus::Disabled);
        assert!(disabled.attribute.is_none());
    }
}
