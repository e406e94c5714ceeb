//! Binding example documents to operations.
//!
//! Literal JSON from an example is overlaid onto the finalized SDK graph: every value
//! is checked against its declared type and turned into a typed [`SdkExampleValue`].
//! Values that do not fit are reported and omitted, never fatal.

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{Number, Value};
use tracing::trace;

use crate::diagnostics::{DiagnosticCode, Diagnostics};
use crate::http::SdkHttpOperation;
use crate::loader::{ExampleIndex, LoadedExample};
use crate::types::{BuiltInKind, PropertyId, PropertyKind, SdkGraph, SdkTypeId, SdkTypeKind};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SdkHttpOperationExample {
    /// Example title.
    pub name: String,
    pub file_path: String,
    pub parameters: Vec<SdkHttpParameterExample>,
    pub responses: Vec<SdkHttpResponseExample>,
    pub raw_example: Value,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SdkHttpParameterExample {
    pub parameter: PropertyId,
    pub value: SdkExampleValue,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SdkHttpResponseExample {
    pub status_code: u16,
    pub headers: Vec<SdkHttpResponseHeaderExample>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body_value: Option<SdkExampleValue>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SdkHttpResponseHeaderExample {
    pub header: PropertyId,
    pub value: SdkExampleValue,
}

/// A literal example value typed against the SDK graph.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum SdkExampleValue {
    String {
        #[serde(rename = "type")]
        ty: SdkTypeId,
        value: String,
    },
    Number {
        #[serde(rename = "type")]
        ty: SdkTypeId,
        value: Number,
    },
    Boolean {
        #[serde(rename = "type")]
        ty: SdkTypeId,
        value: bool,
    },
    Null {
        #[serde(rename = "type")]
        ty: SdkTypeId,
    },
    Unknown {
        #[serde(rename = "type")]
        ty: SdkTypeId,
        value: Value,
    },
    Array {
        #[serde(rename = "type")]
        ty: SdkTypeId,
        value: Vec<SdkExampleValue>,
    },
    Dict {
        #[serde(rename = "type")]
        ty: SdkTypeId,
        value: IndexMap<String, SdkExampleValue>,
    },
    Union {
        #[serde(rename = "type")]
        ty: SdkTypeId,
        value: Value,
    },
    #[serde(rename_all = "camelCase")]
    Model {
        #[serde(rename = "type")]
        ty: SdkTypeId,
        value: IndexMap<String, SdkExampleValue>,
        #[serde(skip_serializing_if = "Option::is_none")]
        additional_properties_value: Option<IndexMap<String, SdkExampleValue>>,
    },
}

impl SdkExampleValue {
    pub fn ty(&self) -> SdkTypeId {
        match self {
            SdkExampleValue::String { ty, .. }
            | SdkExampleValue::Number { ty, .. }
            | SdkExampleValue::Boolean { ty, .. }
            | SdkExampleValue::Null { ty }
            | SdkExampleValue::Unknown { ty, .. }
            | SdkExampleValue::Array { ty, .. }
            | SdkExampleValue::Dict { ty, .. }
            | SdkExampleValue::Union { ty, .. }
            | SdkExampleValue::Model { ty, .. } => *ty,
        }
    }
}

/// Maps literal values onto types, reporting against one example file.
pub struct ExampleMapper<'g, 'd> {
    graph: &'g SdkGraph,
    diagnostics: &'d mut Diagnostics,
    file_path: String,
}

impl<'g, 'd> ExampleMapper<'g, 'd> {
    pub fn new(
        graph: &'g SdkGraph,
        diagnostics: &'d mut Diagnostics,
        file_path: impl Into<String>,
    ) -> Self {
        Self {
            graph,
            diagnostics,
            file_path: file_path.into(),
        }
    }

    fn unmatched(&mut self, path: &str, message: String) {
        self.diagnostics.report(
            DiagnosticCode::ExampleValueNoMapping,
            format!("{}#{}", self.file_path, path),
            message,
        );
    }

    fn no_mapping(&mut self, path: &str, ty: SdkTypeId, value: &Value) {
        let graph = self.graph;
        let node = graph.ty(ty);
        let type_name = if node.name.is_empty() {
            node.kind_name().to_string()
        } else {
            node.name.clone()
        };
        self.diagnostics.report(
            DiagnosticCode::ExampleValueNoMapping,
            format!("{}#{}", self.file_path, path),
            format!("value `{value}` does not match type `{type_name}`"),
        );
    }

    /// Type `value` against `ty`; `None` when it does not fit.
    pub fn map(&mut self, ty: SdkTypeId, value: &Value, path: &str) -> Option<SdkExampleValue> {
        let graph = self.graph;
        let kind = &graph.ty(ty).kind;
        match kind {
            SdkTypeKind::BuiltIn { builtin, .. } => self.map_builtin(ty, *builtin, value, path),
            SdkTypeKind::DateTime { wire_type, .. } | SdkTypeKind::Duration { wire_type, .. } => {
                let wire = match &graph.ty(*wire_type).kind {
                    SdkTypeKind::BuiltIn { builtin, .. } => *builtin,
                    _ => BuiltInKind::String,
                };
                self.map_builtin(ty, wire, value, path)
            }
            SdkTypeKind::Constant { value_type, .. }
            | SdkTypeKind::EnumValue { value_type, .. } => {
                let wire = self.builtin_of(*value_type);
                self.map_builtin(ty, wire, value, path)
            }
            SdkTypeKind::Enum(data) => {
                let wire = self.builtin_of(data.value_type);
                let fixed = data.is_fixed;
                let known = data.values.iter().any(|v| match &graph.ty(*v).kind {
                    SdkTypeKind::EnumValue { value: member, .. } => loosely_equal(member, value),
                    _ => false,
                });
                if fixed && !known {
                    self.no_mapping(path, ty, value);
                    return None;
                }
                self.map_builtin(ty, wire, value, path)
            }
            SdkTypeKind::Nullable { inner } => {
                if value.is_null() {
                    Some(SdkExampleValue::Null { ty })
                } else {
                    self.map(*inner, value, path)
                }
            }
            SdkTypeKind::Array { value_type } => {
                let Value::Array(items) = value else {
                    self.no_mapping(path, ty, value);
                    return None;
                };
                let value_type = *value_type;
                let mapped = items
                    .iter()
                    .enumerate()
                    .filter_map(|(i, item)| self.map(value_type, item, &format!("{path}/{i}")))
                    .collect();
                Some(SdkExampleValue::Array { ty, value: mapped })
            }
            SdkTypeKind::Dict { value_type, .. } => {
                let Value::Object(entries) = value else {
                    self.no_mapping(path, ty, value);
                    return None;
                };
                let value_type = *value_type;
                let mut mapped = IndexMap::new();
                for (key, item) in entries {
                    if let Some(v) = self.map(value_type, item, &format!("{path}/{key}")) {
                        mapped.insert(key.clone(), v);
                    }
                }
                Some(SdkExampleValue::Dict { ty, value: mapped })
            }
            SdkTypeKind::Union { .. } => Some(SdkExampleValue::Union {
                ty,
                value: value.clone(),
            }),
            SdkTypeKind::Tuple { .. } => Some(SdkExampleValue::Unknown {
                ty,
                value: value.clone(),
            }),
            SdkTypeKind::Model(_) => self.map_model(ty, value, path),
            SdkTypeKind::Credential { .. } | SdkTypeKind::Endpoint { .. } => None,
        }
    }

    fn builtin_of(&self, ty: SdkTypeId) -> BuiltInKind {
        let graph = self.graph;
        match &graph.ty(ty).kind {
            SdkTypeKind::BuiltIn { builtin, .. } => *builtin,
            _ => BuiltInKind::Unknown,
        }
    }

    fn map_builtin(
        &mut self,
        ty: SdkTypeId,
        builtin: BuiltInKind,
        value: &Value,
        path: &str,
    ) -> Option<SdkExampleValue> {
        if builtin == BuiltInKind::Unknown {
            return Some(SdkExampleValue::Unknown {
                ty,
                value: value.clone(),
            });
        }
        let mapped = if builtin.is_numeric() {
            match value {
                Value::Number(n) => Some(n.clone()),
                Value::String(s) => parse_number(s),
                _ => None,
            }
            .map(|value| SdkExampleValue::Number { ty, value })
        } else if builtin == BuiltInKind::Boolean {
            match value {
                Value::Bool(b) => Some(*b),
                Value::String(s) => s.parse::<bool>().ok(),
                _ => None,
            }
            .map(|value| SdkExampleValue::Boolean { ty, value })
        } else {
            value.as_str().map(|s| SdkExampleValue::String {
                ty,
                value: s.to_string(),
            })
        };
        if mapped.is_none() {
            self.no_mapping(path, ty, value);
        }
        mapped
    }

    fn map_model(&mut self, ty: SdkTypeId, value: &Value, path: &str) -> Option<SdkExampleValue> {
        let graph = self.graph;
        let Value::Object(entries) = value else {
            self.no_mapping(path, ty, value);
            return None;
        };
        let ty = self.discriminated_subtype(ty, entries).unwrap_or(ty);

        let mut properties: IndexMap<&str, PropertyId> = IndexMap::new();
        let mut additional = None;
        let mut current = Some(ty);
        while let Some(model) = current {
            let Some(data) = graph.model(model) else {
                break;
            };
            for p in &data.properties {
                let property = graph.property(*p);
                if property.kind == PropertyKind::Property {
                    let wire = property
                        .serialization_options
                        .json
                        .as_ref()
                        .map(|j| j.name.as_str())
                        .unwrap_or(property.serialized_name.as_str());
                    properties.entry(wire).or_insert(*p);
                }
            }
            additional = additional.or(data.additional_properties);
            current = data.base_model;
        }

        let mut mapped = IndexMap::new();
        let mut extra = IndexMap::new();
        for (key, item) in entries {
            let item_path = format!("{path}/{key}");
            if let Some(p) = properties.get(key.as_str()) {
                let property_type = graph.property(*p).ty;
                if let Some(v) = self.map(property_type, item, &item_path) {
                    mapped.insert(key.clone(), v);
                }
            } else if let Some(additional) = additional {
                if let Some(v) = self.map(additional, item, &item_path) {
                    extra.insert(key.clone(), v);
                }
            } else {
                self.diagnostics.report(
                    DiagnosticCode::ExampleValueNoMapping,
                    format!("{}#{}", self.file_path, item_path),
                    format!("property `{key}` is not defined on `{}`", graph.ty(ty).name),
                );
            }
        }
        Some(SdkExampleValue::Model {
            ty,
            value: mapped,
            additional_properties_value: additional.map(|_| extra),
        })
    }

    fn discriminated_subtype(
        &self,
        ty: SdkTypeId,
        entries: &serde_json::Map<String, Value>,
    ) -> Option<SdkTypeId> {
        let graph = self.graph;
        let data = graph.model(ty)?;
        let discriminator = graph.property(data.discriminator_property?);
        let value = entries.get(&discriminator.serialized_name)?.as_str()?;
        data.discriminated_subtypes.get(value).copied()
    }
}

fn parse_number(s: &str) -> Option<Number> {
    if let Ok(i) = s.parse::<i64>() {
        return Some(Number::from(i));
    }
    s.parse::<f64>().ok().and_then(Number::from_f64)
}

fn loosely_equal(member: &Value, value: &Value) -> bool {
    match (member, value) {
        (Value::Number(a), Value::Number(b)) => a.as_f64() == b.as_f64(),
        (Value::Number(a), Value::String(s)) => {
            parse_number(s).and_then(|n| n.as_f64()) == a.as_f64()
        }
        _ => member == value,
    }
}

fn example_for_document(
    graph: &SdkGraph,
    http: &SdkHttpOperation,
    loaded: &LoadedExample,
    diagnostics: &mut Diagnostics,
) -> SdkHttpOperationExample {
    let document = &loaded.document;
    let mut mapper = ExampleMapper::new(graph, diagnostics, loaded.file_path.clone());

    let body_entry = http.body_param.and_then(|body| {
        document
            .parameters
            .get_key_value(&graph.property(body).name)
            .or_else(|| document.parameters.get_key_value("body"))
    });

    let mut parameters = Vec::new();
    let mut matched: Vec<&str> = Vec::new();
    for p in &http.parameters {
        let parameter = graph.property(*p);
        if let Some((key, value)) = document.parameters.get_key_value(&parameter.serialized_name) {
            matched.push(key.as_str());
            let path = format!("/parameters/{key}");
            if let Some(value) = mapper.map(parameter.ty, value, &path) {
                parameters.push(SdkHttpParameterExample {
                    parameter: *p,
                    value,
                });
            }
        }
    }
    if let (Some(body), Some((key, value))) = (http.body_param, body_entry) {
        matched.push(key.as_str());
        let parameter = graph.property(body);
        let path = format!("/parameters/{key}");
        if let Some(value) = mapper.map(parameter.ty, value, &path) {
            parameters.push(SdkHttpParameterExample {
                parameter: body,
                value,
            });
        }
    }
    for key in document.parameters.keys() {
        if !matched.contains(&key.as_str()) {
            mapper.unmatched(
                &format!("/parameters/{key}"),
                format!("parameter `{key}` does not match any operation parameter"),
            );
        }
    }

    let mut responses = Vec::new();
    for (code, response_doc) in &document.responses {
        let path = format!("/responses/{code}");
        let found = code
            .parse::<u16>()
            .ok()
            .and_then(|c| http.response_for(c).map(|r| (c, r)));
        let Some((status_code, response)) = found else {
            mapper.unmatched(&path, format!("status code `{code}` does not match any response"));
            continue;
        };
        let mut headers = Vec::new();
        for (name, value) in &response_doc.headers {
            let header = response
                .headers
                .iter()
                .find(|h| graph.property(**h).serialized_name.eq_ignore_ascii_case(name));
            let header_path = format!("{path}/headers/{name}");
            match header {
                Some(h) => {
                    if let Some(value) = mapper.map(graph.property(*h).ty, value, &header_path) {
                        headers.push(SdkHttpResponseHeaderExample { header: *h, value });
                    }
                }
                None => mapper.unmatched(
                    &header_path,
                    format!("header `{name}` is not declared on response `{code}`"),
                ),
            }
        }
        let body_value = match (response.ty, &response_doc.body) {
            (Some(ty), Some(body)) => mapper.map(ty, body, &format!("{path}/body")),
            (None, Some(_)) => {
                mapper.unmatched(
                    &format!("{path}/body"),
                    format!("response `{code}` has no body type"),
                );
                None
            }
            _ => None,
        };
        responses.push(SdkHttpResponseExample {
            status_code,
            headers,
            body_value,
        });
    }

    SdkHttpOperationExample {
        name: document.title.clone(),
        file_path: loaded.file_path.clone(),
        parameters,
        responses,
        raw_example: loaded.raw.clone(),
    }
}

/// Attach examples to one operation.
///
/// `operation_ids` are tried in order; the first one with indexed examples wins.
pub(crate) fn bind_operation(
    graph: &SdkGraph,
    http: &mut SdkHttpOperation,
    operation_ids: &[String],
    index: &ExampleIndex,
    diagnostics: &mut Diagnostics,
) {
    let Some(documents) = operation_ids.iter().find_map(|id| index.get(id)) else {
        return;
    };
    let mut examples: Vec<SdkHttpOperationExample> = documents
        .values()
        .map(|loaded| example_for_document(graph, http, loaded, diagnostics))
        .collect();
    examples.sort_by(|a, b| a.file_path.cmp(&b.file_path));
    trace!(operation = ?operation_ids.first(), examples = examples.len(), "bound examples");
    http.examples = examples;
}
