use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::error::GenerateError;

/// Primitive kinds a constrained response may contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SchemaType {
    String,
    Object,
}

/// Response schema handed to the model backend to bound its output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseSchema {
    #[serde(rename = "type")]
    pub schema_type: SchemaType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, ResponseSchema>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,
    #[serde(default, rename = "enum", skip_serializing_if = "Vec::is_empty")]
    pub enum_values: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_properties: Option<u64>,
}

/// A model response that does not fit its schema.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{path}: {reason}")]
pub struct SchemaViolation {
    pub path: String,
    pub reason: String,
}

impl SchemaViolation {
    fn new(path: &str, reason: impl Into<String>) -> Self {
        Self {
            path: path.to_string(),
            reason: reason.into(),
        }
    }
}

impl ResponseSchema {
    fn empty(schema_type: SchemaType) -> Self {
        Self {
            schema_type,
            title: None,
            description: None,
            format: None,
            properties: BTreeMap::new(),
            required: Vec::new(),
            enum_values: Vec::new(),
            min_length: None,
            max_length: None,
            min_properties: None,
        }
    }

    /// Check a decoded model response against this schema.
    pub fn validate(&self, value: &Value) -> Result<(), SchemaViolation> {
        self.validate_at(value, "$")
    }

    fn validate_at(&self, value: &Value, path: &str) -> Result<(), SchemaViolation> {
        match self.schema_type {
            SchemaType::Object => {
                let object = value
                    .as_object()
                    .ok_or_else(|| SchemaViolation::new(path, "expected an object"))?;
                for name in &self.required {
                    if !object.contains_key(name) {
                        return Err(SchemaViolation::new(
                            path,
                            format!("missing required property '{name}'"),
                        ));
                    }
                }
                for (name, field) in object {
                    let property = self.properties.get(name).ok_or_else(|| {
                        SchemaViolation::new(path, format!("unexpected property '{name}'"))
                    })?;
                    property.validate_at(field, &format!("{path}.{name}"))?;
                }
                Ok(())
            }
            SchemaType::String => {
                let text = value
                    .as_str()
                    .ok_or_else(|| SchemaViolation::new(path, "expected a string"))?;
                let len = text.chars().count() as u64;
                if let Some(min) = self.min_length {
                    if len < min {
                        return Err(SchemaViolation::new(
                            path,
                            format!("length {len} is below the minimum of {min}"),
                        ));
                    }
                }
                if let Some(max) = self.max_length {
                    if len > max {
                        return Err(SchemaViolation::new(
                            path,
                            format!("length {len} exceeds the maximum of {max}"),
                        ));
                    }
                }
                if !self.enum_values.is_empty() && !self.enum_values.iter().any(|v| v == text) {
                    return Err(SchemaViolation::new(
                        path,
                        format!("'{text}' is not one of {:?}", self.enum_values),
                    ));
                }
                Ok(())
            }
        }
    }
}

/// Derive the response schema for shape `T`.
///
/// Only the structure of `T` is used, never any values.
pub fn derive_schema<T: JsonSchema>() -> Result<ResponseSchema, GenerateError> {
    let schema = schemars::schema_for!(T);
    let root = serde_json::to_value(&schema)?;
    let derived = from_json_schema(&root)?;
    tracing::debug!(schema = %serde_json::to_string(&derived)?, "derived response schema");
    Ok(derived)
}

/// Convert a JSON Schema document into a response schema.
///
/// The root must be an object. Every property becomes required, recursively.
pub fn from_json_schema(root: &Value) -> Result<ResponseSchema, GenerateError> {
    let mut deriver = Deriver {
        root,
        visiting: Vec::new(),
    };
    let schema = deriver.convert(root, "$")?;
    if schema.schema_type != SchemaType::Object {
        return Err(GenerateError::unsupported("$", "shape root must be an object"));
    }
    Ok(schema)
}

struct Deriver<'a> {
    root: &'a Value,
    visiting: Vec<String>,
}

impl<'a> Deriver<'a> {
    fn convert(&mut self, node: &'a Value, path: &str) -> Result<ResponseSchema, GenerateError> {
        let object = node
            .as_object()
            .ok_or_else(|| GenerateError::unsupported(path, "schema node is not an object"))?;

        if let Some(reference) = object.get("$ref").and_then(Value::as_str) {
            let target = self.resolve(reference, path)?;
            self.visiting.push(reference.to_string());
            let resolved = self.convert(target, path);
            self.visiting.pop();
            return resolved.map(|schema| with_annotations(schema, object));
        }

        if let Some(all_of) = object.get("allOf").and_then(Value::as_array) {
            return match all_of.as_slice() {
                [single] => self
                    .convert(single, path)
                    .map(|schema| with_annotations(schema, object)),
                _ => Err(GenerateError::unsupported(path, "'allOf' composition is not supported")),
            };
        }

        for keyword in ["oneOf", "anyOf", "not"] {
            if object.contains_key(keyword) {
                return Err(GenerateError::unsupported(
                    path,
                    format!("'{keyword}' is not supported"),
                ));
            }
        }

        let type_name = match object.get("type") {
            Some(Value::String(name)) => name.as_str(),
            Some(Value::Array(_)) => {
                return Err(GenerateError::unsupported(
                    path,
                    "optional or union types are not supported",
                ))
            }
            _ => return Err(GenerateError::unsupported(path, "field has no type")),
        };

        match type_name {
            "string" => self.convert_string(object, path),
            "object" => self.convert_object(object, path),
            other => Err(GenerateError::unsupported(
                path,
                format!("field kind '{other}' is not supported"),
            )),
        }
    }

    fn convert_string(
        &mut self,
        object: &Map<String, Value>,
        path: &str,
    ) -> Result<ResponseSchema, GenerateError> {
        let mut schema = with_annotations(ResponseSchema::empty(SchemaType::String), object);
        let declared_min = object.get("minLength").and_then(Value::as_u64).unwrap_or(0);
        schema.min_length = Some(declared_min.max(1));
        schema.max_length = object.get("maxLength").and_then(Value::as_u64);
        if let Some(values) = object.get("enum") {
            let values = values
                .as_array()
                .ok_or_else(|| GenerateError::unsupported(path, "'enum' must be an array"))?;
            for value in values {
                let value = value.as_str().ok_or_else(|| {
                    GenerateError::unsupported(path, "only string enumerations are supported")
                })?;
                schema.enum_values.push(value.to_string());
            }
        }
        Ok(schema)
    }

    fn convert_object(
        &mut self,
        object: &'a Map<String, Value>,
        path: &str,
    ) -> Result<ResponseSchema, GenerateError> {
        let properties = object
            .get("properties")
            .and_then(Value::as_object)
            .filter(|p| !p.is_empty())
            .ok_or_else(|| GenerateError::unsupported(path, "object declares no properties"))?;

        let mut schema = with_annotations(ResponseSchema::empty(SchemaType::Object), object);
        for (name, property) in properties {
            let converted = self.convert(property, &format!("{path}.{name}"))?;
            tracing::trace!(path, property = %name, "marking property required");
            schema.properties.insert(name.clone(), converted);
            schema.required.push(name.clone());
        }
        schema.min_properties = Some(schema.properties.len() as u64);
        Ok(schema)
    }

    fn resolve(&self, reference: &str, path: &str) -> Result<&'a Value, GenerateError> {
        if self.visiting.iter().any(|r| r == reference) {
            return Err(GenerateError::unsupported(
                path,
                format!("recursive shape through '{reference}'"),
            ));
        }
        if reference == "#" {
            return Ok(self.root);
        }
        let (section, name) = reference
            .strip_prefix("#/$defs/")
            .map(|name| ("$defs", name))
            .or_else(|| {
                reference
                    .strip_prefix("#/definitions/")
                    .map(|name| ("definitions", name))
            })
            .ok_or_else(|| {
                GenerateError::unsupported(path, format!("external reference '{reference}'"))
            })?;
        self.root
            .get(section)
            .and_then(|defs| defs.get(name))
            .ok_or_else(|| {
                GenerateError::unsupported(path, format!("unresolved reference '{reference}'"))
            })
    }
}

fn with_annotations(mut schema: ResponseSchema, object: &Map<String, Value>) -> ResponseSchema {
    let text = |key: &str| object.get(key).and_then(Value::as_str).map(String::from);
    if let Some(title) = text("title") {
        schema.title = Some(title);
    }
    if let Some(description) = text("description") {
        schema.description = Some(description);
    }
    if let Some(format) = text("format") {
        schema.format = Some(format);
    }
    schema
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeSet, HashMap};

    use palter_core::{Bucket, ServiceAccount};
    use serde_json::json;

    use super::*;

    #[derive(JsonSchema)]
    #[allow(dead_code)]
    struct Owner {
        team: String,
        contact: String,
    }

    #[derive(JsonSchema)]
    #[allow(dead_code)]
    struct Workload {
        /// Name of the workload.
        name: String,
        owner: Owner,
    }

    #[derive(JsonSchema)]
    #[allow(dead_code)]
    struct Counted {
        name: String,
        replicas: u32,
    }

    #[derive(JsonSchema)]
    #[allow(dead_code)]
    struct MaybeLabelled {
        name: String,
        label: Option<String>,
    }

    #[derive(JsonSchema)]
    #[allow(dead_code)]
    struct Tagged {
        tags: Vec<String>,
    }

    #[derive(JsonSchema)]
    #[allow(dead_code)]
    struct Labelled {
        labels: HashMap<String, String>,
    }

    #[derive(JsonSchema)]
    #[allow(dead_code)]
    #[serde(rename_all = "SCREAMING_SNAKE_CASE")]
    enum StorageClass {
        Standard,
        Nearline,
    }

    #[derive(JsonSchema)]
    #[allow(dead_code)]
    struct Classified {
        class: StorageClass,
    }

    #[derive(JsonSchema)]
    #[allow(dead_code)]
    struct Node {
        name: String,
        next: Box<Node>,
    }

    #[test]
    fn test_flat_string_shape_requires_every_field() {
        let schema = derive_schema::<ServiceAccount>().unwrap();
        assert_eq!(schema.schema_type, SchemaType::Object);

        let required: BTreeSet<&str> = schema.required.iter().map(String::as_str).collect();
        let expected: BTreeSet<&str> = ["id", "name", "description", "email"].into();
        assert_eq!(required, expected);
        assert_eq!(schema.required.len(), 4);
        assert_eq!(schema.min_properties, Some(4));

        for property in schema.properties.values() {
            assert_eq!(property.schema_type, SchemaType::String);
            assert_eq!(property.min_length, Some(1));
        }
    }

    #[test]
    fn test_serde_renames_are_respected() {
        let schema = derive_schema::<Bucket>().unwrap();
        assert!(schema.properties.contains_key("storageClass"));
        assert!(!schema.properties.contains_key("storage_class"));
    }

    #[test]
    fn test_doc_comments_become_descriptions() {
        let schema = derive_schema::<ServiceAccount>().unwrap();
        let id = &schema.properties["id"];
        assert!(id.description.as_deref().unwrap().contains("account id"));
    }

    #[test]
    fn test_nested_objects_are_required_recursively() {
        let schema = derive_schema::<Workload>().unwrap();
        assert_eq!(schema.required, vec!["name".to_string(), "owner".to_string()]);

        let owner = &schema.properties["owner"];
        assert_eq!(owner.schema_type, SchemaType::Object);
        assert_eq!(owner.required, vec!["contact".to_string(), "team".to_string()]);
        assert_eq!(owner.min_properties, Some(2));
    }

    #[test]
    fn test_string_enum_is_carried() {
        let schema = derive_schema::<Classified>().unwrap();
        let class = &schema.properties["class"];
        assert_eq!(class.schema_type, SchemaType::String);
        assert_eq!(class.enum_values, vec!["STANDARD", "NEARLINE"]);
    }

    #[test]
    fn test_unsupported_kinds_rejected() {
        let err = derive_schema::<Counted>().unwrap_err();
        assert!(
            matches!(err, GenerateError::UnsupportedShape { ref path, .. } if path == "$.replicas")
        );

        assert!(matches!(
            derive_schema::<MaybeLabelled>(),
            Err(GenerateError::UnsupportedShape { .. })
        ));
        assert!(matches!(
            derive_schema::<Tagged>(),
            Err(GenerateError::UnsupportedShape { .. })
        ));
        assert!(matches!(
            derive_schema::<Labelled>(),
            Err(GenerateError::UnsupportedShape { .. })
        ));
    }

    #[test]
    fn test_recursive_shape_rejected() {
        let err = derive_schema::<Node>().unwrap_err();
        assert!(err.to_string().contains("recursive"), "{err}");
    }

    #[test]
    fn test_length_constraints_from_json_schema() {
        let root = json!({
            "type": "object",
            "properties": {
                "code": { "type": "string", "minLength": 3, "maxLength": 8 },
                "name": { "type": "string", "minLength": 0 }
            }
        });
        let schema = from_json_schema(&root).unwrap();
        assert_eq!(schema.properties["code"].min_length, Some(3));
        assert_eq!(schema.properties["code"].max_length, Some(8));
        assert_eq!(schema.properties["name"].min_length, Some(1));
    }

    #[test]
    fn test_legacy_definitions_resolved() {
        let root = json!({
            "type": "object",
            "properties": {
                "owner": { "allOf": [{ "$ref": "#/definitions/Owner" }], "description": "Owning team" }
            },
            "definitions": {
                "Owner": { "type": "object", "properties": { "team": { "type": "string" } } }
            }
        });
        let schema = from_json_schema(&root).unwrap();
        let owner = &schema.properties["owner"];
        assert_eq!(owner.description.as_deref(), Some("Owning team"));
        assert_eq!(owner.required, vec!["team".to_string()]);
    }

    #[test]
    fn test_non_object_root_rejected() {
        let err = from_json_schema(&json!({ "type": "string" })).unwrap_err();
        assert!(matches!(err, GenerateError::UnsupportedShape { .. }));
    }

    #[test]
    fn test_wire_format() {
        let schema = derive_schema::<Bucket>().unwrap();
        let wire = serde_json::to_value(&schema).unwrap();
        assert_eq!(wire["type"], "OBJECT");
        assert_eq!(wire["properties"]["name"]["type"], "STRING");
        assert_eq!(wire["properties"]["name"]["minLength"], 1);
        assert_eq!(wire["minProperties"], 3);
        assert!(wire.get("enum").is_none());
    }

    #[test]
    fn test_validate_accepts_conforming_value() {
        let schema = derive_schema::<Workload>().unwrap();
        let value = json!({ "name": "etl", "owner": { "team": "data", "contact": "data@example.com" } });
        assert!(schema.validate(&value).is_ok());
    }

    #[test]
    fn test_validate_reports_path() {
        let schema = derive_schema::<Workload>().unwrap();

        let missing = json!({ "name": "etl", "owner": { "team": "data" } });
        let err = schema.validate(&missing).unwrap_err();
        assert_eq!(err.path, "$.owner");
        assert!(err.reason.contains("contact"));

        let wrong_type = json!({ "name": 7, "owner": { "team": "data", "contact": "x" } });
        assert_eq!(schema.validate(&wrong_type).unwrap_err().path, "$.name");

        let extra = json!({ "name": "etl", "owner": { "team": "d", "contact": "c" }, "zone": "a" });
        assert!(schema.validate(&extra).unwrap_err().reason.contains("zone"));

        let empty = json!({ "name": "", "owner": { "team": "d", "contact": "c" } });
        assert!(schema.validate(&empty).is_err());

        assert!(schema.validate(&json!(["etl"])).is_err());
    }

    #[test]
    fn test_validate_enum_membership() {
        let schema = derive_schema::<Classified>().unwrap();
        assert!(schema.validate(&json!({ "class": "NEARLINE" })).is_ok());
        assert!(schema.validate(&json!({ "class": "GLACIER" })).is_err());
    }
}
