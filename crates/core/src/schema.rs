//! Resource and data source schemas
//!
//! Each attribute is declared with its type, mutability class, default,
//! conflicts and validators. The same declarations validate incoming
//! attribute maps, fill defaults, decide which changes force replacement
//! and are printed as JSON by the CLI.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use serde_json::Value;

use crate::attrs::{Attributes, is_zero};
use crate::config;
use crate::error::{Error, Result};
use crate::id::UNIQUE_ID_SUFFIX_LENGTH;
use crate::validation;

pub const PROVIDER: &str = "rabata";
pub const BUCKET: &str = "rabata_s3_bucket";
pub const BUCKET_OBJECT: &str = "rabata_s3_bucket_object";
pub const BUCKET_OBJECTS: &str = "rabata_s3_bucket_objects";

pub const GRANT_TYPES: &[&str] = &["CanonicalUser", "Group"];

pub const GRANT_PERMISSIONS: &[&str] = &["FULL_CONTROL", "READ", "READ_ACP", "WRITE", "WRITE_ACP"];

pub const OBJECT_CANNED_ACLS: &[&str] = &[
    "private",
    "public-read",
    "public-read-write",
    "authenticated-read",
    "aws-exec-read",
    "bucket-owner-read",
    "bucket-owner-full-control",
];

pub const STORAGE_CLASSES: &[&str] = &[
    "STANDARD",
    "REDUCED_REDUNDANCY",
    "GLACIER",
    "STANDARD_IA",
    "ONEZONE_IA",
    "INTELLIGENT_TIERING",
    "DEEP_ARCHIVE",
];

/// Default page size and total key budget of the objects data source
pub const DEFAULT_MAX_KEYS: i64 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeType {
    String,
    Bool,
    Int,
    Map,
    Set,
    List,
}

impl AttributeType {
    fn matches(self, value: &Value) -> bool {
        match self {
            AttributeType::String => value.is_string(),
            AttributeType::Bool => value.is_boolean(),
            AttributeType::Int => value.is_i64() || value.is_u64(),
            AttributeType::Map => value
                .as_object()
                .is_some_and(|m| m.values().all(Value::is_string)),
            AttributeType::Set | AttributeType::List => value.is_array(),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            AttributeType::String => "string",
            AttributeType::Bool => "bool",
            AttributeType::Int => "number",
            AttributeType::Map => "map of string",
            AttributeType::Set => "set",
            AttributeType::List => "list",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Validator {
    StringLenBetween { min: usize, max: usize },
    StringInSlice { allowed: Vec<&'static str> },
    NoZeroValue,
    LowercaseKeys,
}

impl Validator {
    fn check(&self, name: &str, value: &Value) -> Result<()> {
        match (self, value) {
            (Validator::StringLenBetween { min, max }, Value::String(s)) => {
                validation::string_len_between(name, s, *min, *max)
            }
            (Validator::StringInSlice { allowed }, Value::String(s)) => {
                validation::string_in_slice(name, s, allowed)
            }
            (Validator::NoZeroValue, value) if is_zero(value) => {
                Err(Error::Validation(format!("{name} must not be empty")))
            }
            (Validator::LowercaseKeys, Value::Object(map)) => {
                let metadata: BTreeMap<String, String> = map
                    .iter()
                    .map(|(k, v)| (k.clone(), v.as_str().unwrap_or_default().to_string()))
                    .collect();
                validation::validate_metadata_is_lowercase(&metadata)
            }
            _ => Ok(()),
        }
    }
}

/// Element type of a set or list attribute
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Element {
    String {
        #[serde(skip_serializing_if = "Vec::is_empty")]
        validators: Vec<Validator>,
    },
    Block {
        attributes: Vec<Attribute>,
    },
}

fn is_false(b: &bool) -> bool {
    !b
}

#[derive(Debug, Clone, Serialize)]
pub struct Attribute {
    pub name: &'static str,
    #[serde(rename = "type")]
    pub kind: AttributeType,
    #[serde(skip_serializing_if = "is_false")]
    pub required: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub optional: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub computed: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub force_new: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub conflicts_with: Vec<&'static str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub validators: Vec<Validator>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elem: Option<Element>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<&'static str>,
}

impl Attribute {
    pub fn new(name: &'static str, kind: AttributeType) -> Self {
        Self {
            name,
            kind,
            required: false,
            optional: false,
            computed: false,
            force_new: false,
            default: None,
            conflicts_with: Vec::new(),
            validators: Vec::new(),
            elem: None,
            description: None,
        }
    }

    pub fn string(name: &'static str) -> Self {
        Self::new(name, AttributeType::String)
    }

    pub fn bool(name: &'static str) -> Self {
        Self::new(name, AttributeType::Bool)
    }

    pub fn int(name: &'static str) -> Self {
        Self::new(name, AttributeType::Int)
    }

    pub fn map(name: &'static str) -> Self {
        Self::new(name, AttributeType::Map)
    }

    pub fn set(name: &'static str, elem: Element) -> Self {
        let mut attr = Self::new(name, AttributeType::Set);
        attr.elem = Some(elem);
        attr
    }

    pub fn list(name: &'static str, elem: Element) -> Self {
        let mut attr = Self::new(name, AttributeType::List);
        attr.elem = Some(elem);
        attr
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn computed(mut self) -> Self {
        self.computed = true;
        self
    }

    pub fn force_new(mut self) -> Self {
        self.force_new = true;
        self
    }

    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn conflicts_with(mut self, others: &[&'static str]) -> Self {
        self.conflicts_with.extend_from_slice(others);
        self
    }

    pub fn validate(mut self, validator: Validator) -> Self {
        self.validators.push(validator);
        self
    }

    pub fn describe(mut self, text: &'static str) -> Self {
        self.description = Some(text);
        self
    }

    /// Neither required nor optional: the provider alone sets it
    pub fn is_computed_only(&self) -> bool {
        self.computed && !self.required && !self.optional
    }

    /// Set to a non-zero value other than its default. Default values never
    /// trigger conflicts, so `acl = "private"` coexists with grants.
    fn is_set_in(&self, values: &Attributes) -> bool {
        values
            .get(self.name)
            .is_some_and(|v| !is_zero(v) && self.default.as_ref() != Some(v))
    }
}

fn string_elem(validators: Vec<Validator>) -> Element {
    Element::String { validators }
}

fn in_slice(allowed: &[&'static str]) -> Validator {
    Validator::StringInSlice {
        allowed: allowed.to_vec(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SchemaKind {
    Provider,
    Resource,
    DataSource,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResourceSchema {
    pub type_name: &'static str,
    pub kind: SchemaKind,
    #[serde(skip_serializing_if = "is_false")]
    pub importable: bool,
    pub attributes: Vec<Attribute>,
}

impl ResourceSchema {
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name == name)
    }

    /// Check an attribute map against the declarations.
    ///
    /// All problems are collected; conflicting attributes are reported as
    /// [`Error::Conflict`], everything else as [`Error::Validation`].
    pub fn validate(&self, values: &Attributes) -> Result<()> {
        let mut problems = Problems::default();
        check_block(&self.attributes, values, "", true, &mut problems);

        if !problems.conflicts.is_empty() {
            let conflicts: Vec<String> = problems.conflicts.into_iter().collect();
            return Err(Error::Conflict(conflicts.join("; ")));
        }
        if !problems.errors.is_empty() {
            return Err(Error::Validation(problems.errors.join("; ")));
        }
        Ok(())
    }

    /// Insert defaults for absent or null attributes
    pub fn apply_defaults(&self, values: &mut Attributes) {
        for attr in &self.attributes {
            if let Some(default) = &attr.default
                && values.get(attr.name).is_none_or(Value::is_null)
            {
                values.insert(attr.name.to_string(), default.clone());
            }
        }
    }

    /// ForceNew attributes whose configured value differs from `prior`.
    /// A computed attribute left out of the configuration keeps its prior
    /// value and never forces replacement.
    pub fn requires_replace(&self, prior: &Attributes, config: &Attributes) -> Vec<String> {
        self.attributes
            .iter()
            .filter(|attr| attr.force_new)
            .filter(|attr| {
                let new = config.get(attr.name).filter(|v| !v.is_null());
                if new.is_none() && attr.computed {
                    return false;
                }
                !same_value(prior.get(attr.name), new)
            })
            .map(|attr| attr.name.to_string())
            .collect()
    }

    /// Computed attributes that are not known before apply
    pub fn unknown_computed(&self, config: &Attributes) -> Vec<String> {
        let mut unknown: Vec<String> = self
            .attributes
            .iter()
            .filter(|attr| attr.computed)
            .filter(|attr| config.get(attr.name).is_none_or(Value::is_null))
            .map(|attr| attr.name.to_string())
            .collect();
        unknown.insert(0, "id".to_string());
        unknown
    }
}

/// Absent, null and zero values compare equal
fn same_value(a: Option<&Value>, b: Option<&Value>) -> bool {
    let a = a.filter(|v| !is_zero(v));
    let b = b.filter(|v| !is_zero(v));
    match (a, b) {
        (Some(Value::Array(x)), Some(Value::Array(y))) => {
            // sets compare without order
            let x: BTreeSet<String> = x.iter().map(Value::to_string).collect();
            let y: BTreeSet<String> = y.iter().map(Value::to_string).collect();
            x == y
        }
        (a, b) => a == b,
    }
}

#[derive(Default)]
struct Problems {
    errors: Vec<String>,
    conflicts: BTreeSet<String>,
}

fn check_block(
    attributes: &[Attribute],
    values: &Attributes,
    path: &str,
    top_level: bool,
    problems: &mut Problems,
) {
    for (key, value) in values {
        if top_level && key == "id" {
            continue;
        }
        match attributes.iter().find(|a| a.name == key) {
            None => problems
                .errors
                .push(format!("{path}{key}: unsupported argument")),
            Some(attr) if attr.is_computed_only() && !is_zero(value) => problems
                .errors
                .push(format!("{path}{key}: computed attribute cannot be set")),
            Some(_) => {}
        }
    }

    for attr in attributes {
        let name = format!("{path}{}", attr.name);
        let Some(value) = values.get(attr.name).filter(|v| !v.is_null()) else {
            if attr.required {
                problems
                    .errors
                    .push(format!("{name}: the argument is required"));
            }
            continue;
        };

        if !attr.kind.matches(value) {
            problems
                .errors
                .push(format!("{name}: expected {}", attr.kind.name()));
            continue;
        }

        if attr.required && matches!(attr.kind, AttributeType::Set | AttributeType::List) && is_zero(value) {
            problems
                .errors
                .push(format!("{name}: at least one element is required"));
        }

        for validator in &attr.validators {
            if let Err(err) = validator.check(&name, value) {
                problems.errors.push(validation_message(err));
            }
        }

        if let (Some(elem), Value::Array(items)) = (&attr.elem, value) {
            for (i, item) in items.iter().enumerate() {
                check_element(elem, item, &format!("{name}.{i}"), problems);
            }
        }

        if attr.is_set_in(values) {
            for other in &attr.conflicts_with {
                let other_set = attributes
                    .iter()
                    .find(|a| a.name == *other)
                    .is_some_and(|a| a.is_set_in(values));
                if other_set {
                    let (first, second) = if attr.name < *other {
                        (attr.name, *other)
                    } else {
                        (*other, attr.name)
                    };
                    problems
                        .conflicts
                        .insert(format!("{path}{first}: conflicts with {second}"));
                }
            }
        }
    }
}

fn check_element(elem: &Element, item: &Value, name: &str, problems: &mut Problems) {
    match (elem, item) {
        (Element::String { validators }, Value::String(_)) => {
            for validator in validators {
                if let Err(err) = validator.check(name, item) {
                    problems.errors.push(validation_message(err));
                }
            }
        }
        (Element::Block { attributes }, Value::Object(block)) => {
            check_block(attributes, block, &format!("{name}."), false, problems);
        }
        (Element::String { .. }, _) => problems.errors.push(format!("{name}: expected string")),
        (Element::Block { .. }, _) => problems.errors.push(format!("{name}: expected object")),
    }
}

fn validation_message(err: Error) -> String {
    match err {
        Error::Validation(msg) => msg,
        other => other.to_string(),
    }
}

/// Provider configuration schema
pub fn provider() -> ResourceSchema {
    let described = |attr: Attribute| match config::description(attr.name) {
        Some(text) => attr.describe(text),
        None => attr,
    };

    ResourceSchema {
        type_name: PROVIDER,
        kind: SchemaKind::Provider,
        importable: false,
        attributes: vec![
            described(Attribute::string("access_key").optional()),
            described(Attribute::string("secret_key").optional()),
            described(Attribute::string("profile").optional()),
            described(Attribute::string("shared_credentials_file").optional()),
            described(Attribute::string("region").required()),
            described(
                Attribute::int("max_retries")
                    .optional()
                    .default_value(config::DEFAULT_MAX_RETRIES),
            ),
            described(Attribute::map("endpoints").optional()),
            described(Attribute::bool("insecure").optional().default_value(false)),
            described(
                Attribute::bool("s3_force_path_style")
                    .optional()
                    .default_value(true),
            ),
        ],
    }
}

/// `rabata_s3_bucket` resource schema
pub fn bucket() -> ResourceSchema {
    let grant = Element::Block {
        attributes: vec![
            Attribute::string("id").optional(),
            Attribute::string("type")
                .required()
                .validate(in_slice(GRANT_TYPES)),
            Attribute::string("uri").optional(),
            Attribute::set(
                "permissions",
                string_elem(vec![in_slice(GRANT_PERMISSIONS)]),
            )
            .required(),
        ],
    };

    ResourceSchema {
        type_name: BUCKET,
        kind: SchemaKind::Resource,
        importable: true,
        attributes: vec![
            Attribute::string("bucket")
                .optional()
                .computed()
                .force_new()
                .conflicts_with(&["bucket_prefix"])
                .validate(Validator::StringLenBetween {
                    min: 0,
                    max: validation::MAX_BUCKET_NAME_LEN,
                }),
            Attribute::string("bucket_prefix")
                .optional()
                .force_new()
                .conflicts_with(&["bucket"])
                .validate(Validator::StringLenBetween {
                    min: 0,
                    max: validation::MAX_BUCKET_NAME_LEN - UNIQUE_ID_SUFFIX_LENGTH,
                }),
            Attribute::string("bucket_domain_name").computed(),
            Attribute::string("bucket_regional_domain_name").computed(),
            Attribute::string("arn").optional().computed(),
            Attribute::string("acl")
                .optional()
                .default_value("private")
                .conflicts_with(&["grant"]),
            Attribute::set("grant", grant)
                .optional()
                .conflicts_with(&["acl"]),
            Attribute::string("region").computed(),
            Attribute::bool("force_destroy")
                .optional()
                .default_value(false),
        ],
    }
}

/// `rabata_s3_bucket_object` resource schema
pub fn bucket_object() -> ResourceSchema {
    ResourceSchema {
        type_name: BUCKET_OBJECT,
        kind: SchemaKind::Resource,
        importable: false,
        attributes: vec![
            Attribute::string("bucket")
                .required()
                .force_new()
                .validate(Validator::NoZeroValue),
            Attribute::string("key")
                .required()
                .force_new()
                .validate(Validator::NoZeroValue),
            Attribute::string("acl")
                .optional()
                .default_value("private")
                .validate(in_slice(OBJECT_CANNED_ACLS)),
            Attribute::string("cache_control").optional(),
            Attribute::string("content_disposition").optional(),
            Attribute::string("content_encoding").optional(),
            Attribute::string("content_language").optional(),
            Attribute::map("metadata")
                .optional()
                .validate(Validator::LowercaseKeys),
            Attribute::string("content_type").optional().computed(),
            Attribute::string("source")
                .optional()
                .conflicts_with(&["content", "content_base64"]),
            Attribute::string("content")
                .optional()
                .conflicts_with(&["source", "content_base64"]),
            Attribute::string("content_base64")
                .optional()
                .conflicts_with(&["source", "content"]),
            Attribute::string("storage_class")
                .optional()
                .computed()
                .validate(in_slice(STORAGE_CLASSES)),
            Attribute::string("etag").optional().computed(),
            Attribute::string("version_id").computed(),
            Attribute::bool("force_destroy")
                .optional()
                .default_value(false),
        ],
    }
}

/// `rabata_s3_bucket` data source schema
pub fn data_bucket() -> ResourceSchema {
    ResourceSchema {
        type_name: BUCKET,
        kind: SchemaKind::DataSource,
        importable: false,
        attributes: vec![
            Attribute::string("bucket").required(),
            Attribute::string("arn").computed(),
            Attribute::string("bucket_domain_name").computed(),
            Attribute::string("bucket_regional_domain_name").computed(),
            Attribute::string("region").computed(),
        ],
    }
}

/// `rabata_s3_bucket_object` data source schema
pub fn data_bucket_object() -> ResourceSchema {
    ResourceSchema {
        type_name: BUCKET_OBJECT,
        kind: SchemaKind::DataSource,
        importable: false,
        attributes: vec![
            Attribute::string("body").computed(),
            Attribute::string("bucket").required(),
            Attribute::string("cache_control").computed(),
            Attribute::string("content_disposition").computed(),
            Attribute::string("content_encoding").computed(),
            Attribute::string("content_language").computed(),
            Attribute::int("content_length").computed(),
            Attribute::string("content_type").computed(),
            Attribute::string("etag").computed(),
            Attribute::string("expiration").computed(),
            Attribute::string("expires").computed(),
            Attribute::string("key").required(),
            Attribute::string("last_modified").computed(),
            Attribute::map("metadata").computed(),
            Attribute::string("range").optional(),
            Attribute::string("sse_kms_key_id").computed(),
            Attribute::string("storage_class").computed(),
            Attribute::string("version_id").optional().computed(),
        ],
    }
}

/// `rabata_s3_bucket_objects` data source schema
pub fn data_bucket_objects() -> ResourceSchema {
    ResourceSchema {
        type_name: BUCKET_OBJECTS,
        kind: SchemaKind::DataSource,
        importable: false,
        attributes: vec![
            Attribute::string("bucket").required(),
            Attribute::string("prefix").optional(),
            Attribute::string("delimiter").optional(),
            Attribute::string("encoding_type").optional(),
            Attribute::int("max_keys")
                .optional()
                .default_value(DEFAULT_MAX_KEYS),
            Attribute::string("start_after").optional(),
            Attribute::bool("fetch_owner").optional(),
            Attribute::list("keys", string_elem(Vec::new())).computed(),
            Attribute::list("common_prefixes", string_elem(Vec::new())).computed(),
            Attribute::list("owners", string_elem(Vec::new())).computed(),
        ],
    }
}

/// Every resource schema
pub fn resources() -> Vec<ResourceSchema> {
    vec![bucket(), bucket_object()]
}

/// Every data source schema
pub fn data_sources() -> Vec<ResourceSchema> {
    vec![data_bucket(), data_bucket_object(), data_bucket_objects()]
}

/// Look up a schema by type name and kind
pub fn find(type_name: &str, kind: SchemaKind) -> Option<ResourceSchema> {
    match kind {
        SchemaKind::Provider => Some(provider()).filter(|s| s.type_name == type_name),
        SchemaKind::Resource => resources().into_iter().find(|s| s.type_name == type_name),
        SchemaKind::DataSource => data_sources()
            .into_iter()
            .find(|s| s.type_name == type_name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn attrs(value: Value) -> Attributes {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_bucket_conflicts_with_prefix() {
        let err = bucket()
            .validate(&attrs(json!({"bucket": "a-bucket", "bucket_prefix": "a-"})))
            .unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
        assert_eq!(
            err.to_string(),
            "Conflict: bucket: conflicts with bucket_prefix"
        );
    }

    #[test]
    fn test_default_acl_does_not_conflict_with_grants() {
        let grant = json!([{"type": "CanonicalUser", "id": "abc", "permissions": ["READ"]}]);
        let schema = bucket();

        assert!(schema
            .validate(&attrs(json!({"acl": "private", "grant": grant.clone()})))
            .is_ok());

        let err = schema
            .validate(&attrs(json!({"acl": "public-read", "grant": grant})))
            .unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
    }

    #[test]
    fn test_object_body_sources_conflict() {
        let err = bucket_object()
            .validate(&attrs(json!({
                "bucket": "b",
                "key": "k",
                "content": "hello",
                "content_base64": "aGVsbG8="
            })))
            .unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
        assert!(err.to_string().contains("content: conflicts with content_base64"));
    }

    #[test]
    fn test_required_and_validators() {
        let err = bucket_object()
            .validate(&attrs(json!({
                "key": "",
                "acl": "everyone",
                "metadata": {"Owner": "me"},
            })))
            .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("bucket: the argument is required"));
        assert!(msg.contains("key must not be empty"));
        assert!(msg.contains("expected acl to be one of"));
        assert!(msg.contains("Offending key: \"Owner\""));
    }

    #[test]
    fn test_nested_grant_validation() {
        let err = bucket()
            .validate(&attrs(json!({
                "grant": [{"type": "Robot", "permissions": []}]
            })))
            .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("expected grant.0.type to be one of"));
        assert!(msg.contains("grant.0.permissions: at least one element is required"));
    }

    #[test]
    fn test_unknown_and_computed_attributes_rejected() {
        let err = bucket()
            .validate(&attrs(json!({"colour": "blue", "region": "eu-west-1"})))
            .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("colour: unsupported argument"));
        assert!(msg.contains("region: computed attribute cannot be set"));
    }

    #[test]
    fn test_type_mismatch() {
        let err = bucket()
            .validate(&attrs(json!({"force_destroy": "yes"})))
            .unwrap_err();
        assert!(err.to_string().contains("force_destroy: expected bool"));
    }

    #[test]
    fn test_bucket_prefix_length_limit() {
        let prefix = "p".repeat(38);
        assert!(bucket()
            .validate(&attrs(json!({"bucket_prefix": prefix})))
            .is_err());
        let prefix = "p".repeat(37);
        assert!(bucket()
            .validate(&attrs(json!({"bucket_prefix": prefix})))
            .is_ok());
    }

    #[test]
    fn test_apply_defaults() {
        let mut values = attrs(json!({"bucket": "b", "force_destroy": null}));
        bucket().apply_defaults(&mut values);
        assert_eq!(values["acl"], json!("private"));
        assert_eq!(values["force_destroy"], json!(false));

        let mut values = attrs(json!({"bucket": "b"}));
        data_bucket_objects().apply_defaults(&mut values);
        assert_eq!(values["max_keys"], json!(1000));
    }

    #[test]
    fn test_requires_replace() {
        let schema = bucket_object();
        let prior = attrs(json!({"bucket": "b", "key": "k", "content": "v1"}));

        let config = attrs(json!({"bucket": "b", "key": "k", "content": "v2"}));
        assert!(schema.requires_replace(&prior, &config).is_empty());

        let config = attrs(json!({"bucket": "b", "key": "k2"}));
        assert_eq!(schema.requires_replace(&prior, &config), vec!["key"]);
    }

    #[test]
    fn test_omitted_computed_name_keeps_bucket() {
        let prior = attrs(json!({"bucket": "terraform-2026", "bucket_prefix": ""}));
        let config = attrs(json!({}));
        assert!(bucket().requires_replace(&prior, &config).is_empty());
    }

    #[test]
    fn test_set_comparison_ignores_order() {
        let before = attrs(json!({"grant": [{"a": 1}, {"b": 2}]}));
        let after = attrs(json!({"grant": [{"b": 2}, {"a": 1}]}));
        assert!(same_value(before.get("grant"), after.get("grant")));
        assert!(!same_value(before.get("grant"), Some(&json!([{"a": 1}]))));
    }

    #[test]
    fn test_find_schemas() {
        assert!(find(BUCKET, SchemaKind::Resource).unwrap().importable);
        assert!(find(BUCKET_OBJECTS, SchemaKind::Resource).is_none());
        assert!(find(BUCKET_OBJECTS, SchemaKind::DataSource).is_some());
        assert!(find(PROVIDER, SchemaKind::Provider).is_some());
    }

    #[test]
    fn test_schema_serializes() {
        let json = serde_json::to_value(bucket()).unwrap();
        assert_eq!(json["type_name"], json!("rabata_s3_bucket"));
        assert_eq!(json["attributes"][0]["name"], json!("bucket"));
        assert_eq!(json["attributes"][0]["force_new"], json!(true));
    }

    #[test]
    fn test_provider_schema_has_descriptions() {
        let schema = provider();
        assert!(schema.attributes.iter().all(|a| a.description.is_some()));
        assert!(schema.attribute("region").unwrap().required);
    }
}
