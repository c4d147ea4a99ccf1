//! Provider dispatcher
//!
//! A [`Request`] names a resource or data source type and an operation.
//! The dispatcher validates the attributes against the type's schema,
//! converts them into the handler's typed state and converts the result
//! back. Failures never escape [`Provider::invoke`]; they are reported as
//! diagnostics on the response.

use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::attrs::{Attributes, from_attributes, to_attributes};
use crate::client::ProviderClient;
use crate::config::ProviderConfig;
use crate::data_source;
use crate::diag::Diagnostic;
use crate::error::{Error, Result};
use crate::resource::{BucketObjectState, BucketState, bucket, bucket_object};
use crate::schema::{self, ResourceSchema, SchemaKind};
use crate::traits::S3Api;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Create,
    Read,
    Update,
    Delete,
    Import,
    ReadData,
    Plan,
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Operation::Create => "create",
            Operation::Read => "read",
            Operation::Update => "update",
            Operation::Delete => "delete",
            Operation::Import => "import",
            Operation::ReadData => "read_data",
            Operation::Plan => "plan",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub type_name: String,
    pub operation: Operation,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prior_state: Option<Attributes>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<Attributes>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl Request {
    pub fn new(type_name: impl Into<String>, operation: Operation) -> Self {
        Self {
            type_name: type_name.into(),
            operation,
            prior_state: None,
            config: None,
            id: None,
        }
    }

    pub fn with_config(mut self, config: Attributes) -> Self {
        self.config = Some(config);
        self
    }

    pub fn with_prior_state(mut self, prior_state: Attributes) -> Self {
        self.prior_state = Some(prior_state);
        self
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    fn config(&self) -> Result<&Attributes> {
        self.config
            .as_ref()
            .ok_or_else(|| Error::Validation(format!("config is required for {}", self.operation)))
    }

    fn prior_state(&self) -> Result<&Attributes> {
        self.prior_state.as_ref().ok_or_else(|| {
            Error::Validation(format!("prior_state is required for {}", self.operation))
        })
    }
}

/// Outcome of an invocation. `new_state` is null once the resource is gone.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub new_state: Option<Attributes>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<Diagnostic>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub requires_replace: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unknown: Vec<String>,
}

impl Response {
    fn state(new_state: Option<Attributes>) -> Self {
        Self {
            new_state,
            ..Default::default()
        }
    }

    /// True when an error diagnostic is present
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == crate::diag::Severity::Error)
    }
}

/// CRUD entry points of a managed resource, over its typed state
#[async_trait]
trait Handler: Serialize + DeserializeOwned + Send + Sync + Sized {
    async fn create(client: &ProviderClient, plan: Self) -> Result<Option<Self>>;
    async fn read(client: &ProviderClient, state: Self) -> Result<Option<Self>>;
    async fn update(client: &ProviderClient, prior: &Self, plan: Self) -> Result<Option<Self>>;
    async fn delete(client: &ProviderClient, state: &Self) -> Result<()>;

    fn planned_unknowns(_prior: &Self, _plan: &Self) -> Vec<&'static str> {
        Vec::new()
    }
}

#[async_trait]
impl Handler for BucketState {
    async fn create(client: &ProviderClient, plan: Self) -> Result<Option<Self>> {
        bucket::create(client, plan).await
    }

    async fn read(client: &ProviderClient, state: Self) -> Result<Option<Self>> {
        bucket::read(client, state, false).await
    }

    async fn update(client: &ProviderClient, prior: &Self, plan: Self) -> Result<Option<Self>> {
        bucket::update(client, prior, plan).await
    }

    async fn delete(client: &ProviderClient, state: &Self) -> Result<()> {
        bucket::delete(client, state).await
    }
}

#[async_trait]
impl Handler for BucketObjectState {
    async fn create(client: &ProviderClient, plan: Self) -> Result<Option<Self>> {
        bucket_object::create(client, plan).await
    }

    async fn read(client: &ProviderClient, state: Self) -> Result<Option<Self>> {
        bucket_object::read(client, state).await
    }

    async fn update(client: &ProviderClient, prior: &Self, plan: Self) -> Result<Option<Self>> {
        bucket_object::update(client, prior, plan).await
    }

    async fn delete(client: &ProviderClient, state: &Self) -> Result<()> {
        bucket_object::delete(client, state).await
    }

    fn planned_unknowns(prior: &Self, plan: &Self) -> Vec<&'static str> {
        bucket_object::planned_unknowns(prior, plan)
    }
}

fn unsupported_type(type_name: &str, kind: SchemaKind) -> Error {
    let what = match kind {
        SchemaKind::DataSource => "data source",
        _ => "resource",
    };
    Error::Validation(format!("unsupported {what} type {type_name:?}"))
}

/// Configured values overlaid on the prior state: computed attributes the
/// configuration leaves unset keep their prior value, and so does the id
fn merge_prior(schema: &ResourceSchema, prior: &Attributes, config: &Attributes) -> Attributes {
    let mut planned = config.clone();
    schema.apply_defaults(&mut planned);
    for attr in schema.attributes.iter().filter(|attr| attr.computed) {
        if planned.get(attr.name).is_none_or(Value::is_null)
            && let Some(value) = prior.get(attr.name)
        {
            planned.insert(attr.name.to_string(), value.clone());
        }
    }
    if let Some(id) = prior.get("id") {
        planned.insert("id".to_string(), id.clone());
    }
    planned
}

fn mark_unknown(planned: &mut Attributes, unknown: &[String]) {
    for name in unknown {
        planned.insert(name.clone(), Value::Null);
    }
}

fn state_attributes<T: Serialize>(state: Option<T>) -> Result<Option<Attributes>> {
    state.as_ref().map(to_attributes).transpose()
}

/// The configured provider: immutable settings plus the shared client
pub struct Provider {
    config: ProviderConfig,
    client: ProviderClient,
}

impl Provider {
    pub fn new(config: ProviderConfig, api: Arc<dyn S3Api>) -> Self {
        let client = ProviderClient::new(api, &config);
        Self { config, client }
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    pub fn client(&self) -> &ProviderClient {
        &self.client
    }

    /// Run a request, reporting any failure as an error diagnostic
    pub async fn invoke(&self, request: Request) -> Response {
        let type_name = request.type_name.clone();
        let operation = request.operation;

        match self.dispatch(request).await {
            Ok(response) => response,
            Err(err) => {
                tracing::debug!("{operation} {type_name} failed: {err}");
                Response {
                    diagnostics: vec![Diagnostic::from_error(&err)],
                    ..Default::default()
                }
            }
        }
    }

    /// Run a request, returning failures as errors
    pub async fn dispatch(&self, request: Request) -> Result<Response> {
        tracing::debug!(
            type_name = %request.type_name,
            operation = %request.operation,
            "dispatching request"
        );

        if request.operation == Operation::ReadData {
            return self.read_data(&request).await;
        }

        let schema = schema::find(&request.type_name, SchemaKind::Resource)
            .ok_or_else(|| unsupported_type(&request.type_name, SchemaKind::Resource))?;

        if request.operation == Operation::Import {
            if !schema.importable {
                return Err(Error::Validation(format!(
                    "resource {} does not support import",
                    schema.type_name
                )));
            }
            let id = request
                .id
                .as_deref()
                .filter(|id| !id.is_empty())
                .ok_or_else(|| Error::Validation("id is required for import".to_string()))?;
            let state = bucket::import(&self.client, id).await?;
            return Ok(Response::state(Some(to_attributes(&state)?)));
        }

        match schema.type_name {
            schema::BUCKET => self.apply::<BucketState>(&schema, &request).await,
            schema::BUCKET_OBJECT => self.apply::<BucketObjectState>(&schema, &request).await,
            other => Err(unsupported_type(other, SchemaKind::Resource)),
        }
    }

    async fn apply<H: Handler>(&self, schema: &ResourceSchema, request: &Request) -> Result<Response> {
        let client = &self.client;

        match request.operation {
            Operation::Plan => plan::<H>(schema, request),
            Operation::Create => {
                let config = request.config()?;
                schema.validate(config)?;
                let mut planned = config.clone();
                schema.apply_defaults(&mut planned);
                let state = H::create(client, from_attributes(&planned)?).await?;
                Ok(Response::state(state_attributes(state)?))
            }
            Operation::Read => {
                let state = H::read(client, from_attributes(request.prior_state()?)?).await?;
                Ok(Response::state(state_attributes(state)?))
            }
            Operation::Update => {
                let config = request.config()?;
                let prior_attrs = request.prior_state()?;
                schema.validate(config)?;

                let planned = merge_prior(schema, prior_attrs, config);
                let replace = schema.requires_replace(prior_attrs, &planned);
                if !replace.is_empty() {
                    return Err(Error::Validation(format!(
                        "cannot update in place, replacement required for: {}",
                        replace.join(", ")
                    )));
                }

                let prior: H = from_attributes(prior_attrs)?;
                let state = H::update(client, &prior, from_attributes(&planned)?).await?;
                Ok(Response::state(state_attributes(state)?))
            }
            Operation::Delete => {
                let state: H = from_attributes(request.prior_state()?)?;
                H::delete(client, &state).await?;
                Ok(Response::state(None))
            }
            Operation::Import | Operation::ReadData => Err(Error::General(format!(
                "operation {} is not handled here",
                request.operation
            ))),
        }
    }

    async fn read_data(&self, request: &Request) -> Result<Response> {
        let schema = schema::find(&request.type_name, SchemaKind::DataSource)
            .ok_or_else(|| unsupported_type(&request.type_name, SchemaKind::DataSource))?;

        let config = request.config()?;
        schema.validate(config)?;
        let mut args = config.clone();
        schema.apply_defaults(&mut args);

        let client = &self.client;
        let state = match schema.type_name {
            schema::BUCKET => {
                to_attributes(&data_source::bucket::read(client, from_attributes(&args)?).await?)?
            }
            schema::BUCKET_OBJECT => to_attributes(
                &data_source::bucket_object::read(client, from_attributes(&args)?).await?,
            )?,
            schema::BUCKET_OBJECTS => to_attributes(
                &data_source::bucket_objects::read(client, from_attributes(&args)?).await?,
            )?,
            other => return Err(unsupported_type(other, SchemaKind::DataSource)),
        };
        Ok(Response::state(Some(state)))
    }
}

/// Planned state for a create (no prior state) or an update. Attributes
/// only known after apply are set to null and listed in `unknown`.
fn plan<H: Handler>(schema: &ResourceSchema, request: &Request) -> Result<Response> {
    let config = request.config()?;
    schema.validate(config)?;

    let mut fresh = config.clone();
    schema.apply_defaults(&mut fresh);

    let Some(prior) = request.prior_state.as_ref() else {
        let unknown = schema.unknown_computed(&fresh);
        mark_unknown(&mut fresh, &unknown);
        return Ok(Response {
            new_state: Some(fresh),
            unknown,
            ..Default::default()
        });
    };

    let requires_replace = schema.requires_replace(prior, &fresh);
    let (mut planned, unknown) = if requires_replace.is_empty() {
        let planned = merge_prior(schema, prior, config);
        let prior_state: H = from_attributes(prior)?;
        let planned_state: H = from_attributes(&planned)?;
        let unknown = H::planned_unknowns(&prior_state, &planned_state)
            .into_iter()
            .map(String::from)
            .collect();
        (planned, unknown)
    } else {
        let unknown = schema.unknown_computed(&fresh);
        (fresh, unknown)
    };
    mark_unknown(&mut planned, &unknown);

    Ok(Response {
        new_state: Some(planned),
        requires_replace,
        unknown,
        ..Default::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    use crate::testing::FakeS3;

    fn attrs(value: Value) -> Attributes {
        match value {
            Value::Object(map) => map,
            other => panic!("not an object: {other}"),
        }
    }

    fn provider(fake: &Arc<FakeS3>) -> Provider {
        let config = ProviderConfig::with_static_credentials("eu-west-1", "a", "b");
        Provider::new(config, fake.clone())
    }

    #[tokio::test]
    async fn test_bucket_lifecycle() {
        let fake = Arc::new(FakeS3::new());
        let provider = provider(&fake);

        let created = provider
            .invoke(
                Request::new("rabata_s3_bucket", Operation::Create)
                    .with_config(attrs(json!({"bucket": "assets"}))),
            )
            .await;
        assert!(created.diagnostics.is_empty(), "{:?}", created.diagnostics);
        let state = created.new_state.unwrap();
        assert_eq!(state["id"], "assets");
        assert_eq!(state["arn"], "arn:aws:s3:::assets");
        assert_eq!(state["acl"], "private");
        assert!(fake.bucket_exists("assets"));

        let read = provider
            .invoke(Request::new("rabata_s3_bucket", Operation::Read).with_prior_state(state.clone()))
            .await;
        assert_eq!(read.new_state.as_ref(), Some(&state));

        let deleted = provider
            .invoke(Request::new("rabata_s3_bucket", Operation::Delete).with_prior_state(state))
            .await;
        assert!(deleted.diagnostics.is_empty());
        assert_eq!(deleted.new_state, None);
        assert!(!fake.bucket_exists("assets"));
    }

    #[tokio::test]
    async fn test_read_of_missing_bucket_clears_state() {
        let fake = Arc::new(FakeS3::new());
        let response = provider(&fake)
            .invoke(
                Request::new("rabata_s3_bucket", Operation::Read)
                    .with_prior_state(attrs(json!({"id": "gone", "bucket": "gone"}))),
            )
            .await;

        assert!(response.diagnostics.is_empty());
        assert_eq!(response.new_state, None);
    }

    #[tokio::test]
    async fn test_conflicting_content_is_reported_without_calls() {
        let fake = Arc::new(FakeS3::new().with_bucket("b"));
        let response = provider(&fake)
            .invoke(
                Request::new("rabata_s3_bucket_object", Operation::Create).with_config(attrs(
                    json!({"bucket": "b", "key": "k", "content": "x", "content_base64": "eA=="}),
                )),
            )
            .await;

        assert!(response.has_errors());
        assert_eq!(
            response.diagnostics[0].summary,
            "Conflict: content: conflicts with content_base64"
        );
        assert_eq!(fake.calls("put_object"), 0);
    }

    #[tokio::test]
    async fn test_plan_new_bucket_marks_computed_unknown() {
        let fake = Arc::new(FakeS3::new());
        let response = provider(&fake)
            .invoke(
                Request::new("rabata_s3_bucket", Operation::Plan)
                    .with_config(attrs(json!({"bucket_prefix": "tf-"}))),
            )
            .await;

        assert_eq!(response.unknown[0], "id");
        assert!(response.unknown.contains(&"bucket".to_string()));
        assert!(response.unknown.contains(&"region".to_string()));
        let planned = response.new_state.unwrap();
        assert_eq!(planned["acl"], "private");
        assert_eq!(planned["bucket"], Value::Null);
    }

    #[tokio::test]
    async fn test_plan_rename_requires_replace() {
        let fake = Arc::new(FakeS3::new());
        let prior = attrs(json!({"id": "old", "bucket": "old", "acl": "private", "region": "eu-west-1"}));
        let response = provider(&fake)
            .invoke(
                Request::new("rabata_s3_bucket", Operation::Plan)
                    .with_prior_state(prior)
                    .with_config(attrs(json!({"bucket": "new"}))),
            )
            .await;

        assert_eq!(response.requires_replace, vec!["bucket"]);
        assert!(response.unknown.contains(&"region".to_string()));
    }

    #[tokio::test]
    async fn test_plan_new_etag_marks_version_unknown() {
        let fake = Arc::new(FakeS3::new());
        let prior = attrs(json!({
            "id": "k", "bucket": "b", "key": "k", "etag": "aaa", "version_id": "v1"
        }));
        let response = provider(&fake)
            .invoke(
                Request::new("rabata_s3_bucket_object", Operation::Plan)
                    .with_prior_state(prior)
                    .with_config(attrs(json!({"bucket": "b", "key": "k", "etag": "bbb"}))),
            )
            .await;

        assert!(response.requires_replace.is_empty());
        assert_eq!(response.unknown, vec!["version_id"]);
        let planned = response.new_state.unwrap();
        assert_eq!(planned["id"], "k");
        assert_eq!(planned["version_id"], Value::Null);
    }

    #[tokio::test]
    async fn test_update_object_acl_in_place() {
        let fake = Arc::new(FakeS3::new().with_bucket("b"));
        let provider = provider(&fake);
        let config = json!({"bucket": "b", "key": "k", "content": "hello"});

        let created = provider
            .invoke(
                Request::new("rabata_s3_bucket_object", Operation::Create)
                    .with_config(attrs(config.clone())),
            )
            .await
            .new_state
            .unwrap();

        let mut updated_config = attrs(config);
        updated_config.insert("acl".into(), json!("public-read"));
        let updated = provider
            .invoke(
                Request::new("rabata_s3_bucket_object", Operation::Update)
                    .with_prior_state(created.clone())
                    .with_config(updated_config),
            )
            .await;

        assert!(updated.diagnostics.is_empty(), "{:?}", updated.diagnostics);
        let state = updated.new_state.unwrap();
        assert_eq!(state["acl"], "public-read");
        assert_eq!(state["version_id"], created["version_id"]);
        assert_eq!(fake.calls("put_object"), 1);
        assert_eq!(fake.object_acl("b", "k").as_deref(), Some("public-read"));
    }

    #[tokio::test]
    async fn test_update_rejects_force_new_change() {
        let fake = Arc::new(FakeS3::new().with_bucket("b"));
        let err = provider(&fake)
            .dispatch(
                Request::new("rabata_s3_bucket_object", Operation::Update)
                    .with_prior_state(attrs(json!({"id": "k", "bucket": "b", "key": "k"})))
                    .with_config(attrs(json!({"bucket": "b", "key": "other"}))),
            )
            .await
            .unwrap_err();

        assert!(err.to_string().contains("replacement required for: key"));
    }

    #[tokio::test]
    async fn test_import_bucket() {
        let fake = Arc::new(FakeS3::new().with_bucket("existing"));
        let response = provider(&fake)
            .invoke(Request::new("rabata_s3_bucket", Operation::Import).with_id("existing"))
            .await;

        let state = response.new_state.unwrap();
        assert_eq!(state["bucket"], "existing");
        assert_eq!(state["region"], "eu-west-1");
    }

    #[tokio::test]
    async fn test_import_object_is_unsupported() {
        let fake = Arc::new(FakeS3::new());
        let err = provider(&fake)
            .dispatch(Request::new("rabata_s3_bucket_object", Operation::Import).with_id("b/k"))
            .await
            .unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[tokio::test]
    async fn test_read_data_bucket_objects() {
        let fake = Arc::new(
            FakeS3::new()
                .with_bucket("b")
                .with_object("b", "a.txt", "a")
                .with_object("b", "b.txt", "b"),
        );
        let response = provider(&fake)
            .invoke(
                Request::new("rabata_s3_bucket_objects", Operation::ReadData)
                    .with_config(attrs(json!({"bucket": "b"}))),
            )
            .await;

        let state = response.new_state.unwrap();
        assert_eq!(state["keys"], json!(["a.txt", "b.txt"]));
        assert_eq!(state["max_keys"], 1000);
    }

    #[tokio::test]
    async fn test_unknown_type_is_error() {
        let fake = Arc::new(FakeS3::new());
        let response = provider(&fake)
            .invoke(Request::new("rabata_s3_queue", Operation::Read))
            .await;

        assert!(response.has_errors());
        assert_eq!(
            response.diagnostics[0].summary,
            "Validation error: unsupported resource type \"rabata_s3_queue\""
        );
    }

    #[test]
    fn test_unknown_operation_is_rejected() {
        let parsed: std::result::Result<Request, _> =
            serde_json::from_value(json!({"type_name": "rabata_s3_bucket", "operation": "refresh"}));
        assert!(parsed.is_err());
    }
}
