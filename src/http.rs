//! Wire-level HTTP operations and their correspondence to method parameters.
//!
//! [`map_operation`] turns the HTTP shape of one operation into parameter, body and
//! response nodes, synthesizes `Content-Type`/`Accept` headers when the shape has none,
//! and records for every wire parameter which method-level parameter supplies it.

use std::collections::{HashSet, VecDeque};

use heck::{ToLowerCamelCase, ToUpperCamelCase};
use serde::Serialize;
use serde_json::Value;

use crate::context::SdkContext;
use crate::diagnostics::DiagnosticCode;
use crate::examples::SdkHttpOperationExample;
use crate::naming::{library_name, operation_cross_language_id};
use crate::resolver::{apply_encode, new_property, resolve_type};
use crate::source::{
    HttpParameterShape, HttpVerb, OperationId, ParameterLocation, SourceGraph, SourceId,
    StatusCodes,
};
use crate::types::{
    BuiltInKind, CollectionFormat, PropertyId, PropertyKind, SdkModelProperty, SdkType,
    SdkTypeId, SdkTypeKind,
};

/// Content types for which a single declared value becomes a constant header.
const CONSTANT_CONTENT_TYPES: &[&str] = &[
    "application/json",
    "text/plain",
    "application/octet-stream",
];

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SdkHttpOperation {
    pub verb: HttpVerb,
    pub path: String,
    pub uri_template: String,
    pub parameters: Vec<PropertyId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body_param: Option<PropertyId>,
    pub responses: Vec<SdkHttpResponse>,
    pub exceptions: Vec<SdkHttpResponse>,
    pub examples: Vec<SdkHttpOperationExample>,
}

impl SdkHttpOperation {
    /// Success response for a status code, exact codes before ranges.
    pub fn response_for(&self, code: u16) -> Option<&SdkHttpResponse> {
        self.responses
            .iter()
            .find(|r| r.status_codes == StatusCodes::Exact(code))
            .or_else(|| self.responses.iter().find(|r| r.status_codes.matches(code)))
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SdkHttpResponse {
    pub status_codes: StatusCodes,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub ty: Option<SdkTypeId>,
    pub headers: Vec<PropertyId>,
    pub content_types: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_content_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Map the HTTP shape of an operation.
///
/// Synthesized `contentType`/`accept` method parameters are appended to `method_params`,
/// and unused path parameters are removed from it.
pub(crate) fn map_operation(
    ctx: &mut SdkContext<'_>,
    op: OperationId,
    method_params: &mut Vec<PropertyId>,
    client_params: &[PropertyId],
) -> SdkHttpOperation {
    let source = ctx.source;
    let operation = source.operation(op);
    let shape = &operation.http;
    let op_id = operation_cross_language_id(source, op);
    tracing::debug!(
        operation = %op_id,
        verb = ?shape.verb,
        path = %shape.path,
        "mapping http operation"
    );

    let template = if shape.uri_template.is_empty() {
        shape.path.as_str()
    } else {
        shape.uri_template.as_str()
    };
    let mut parameters = Vec::new();
    for param in &shape.parameters {
        if param.location == ParameterLocation::Path && !template_uses(template, &param.name) {
            tracing::trace!(
                parameter = %param.name,
                "dropping path parameter absent from the template"
            );
            let origin = source.property_origin(param.property);
            method_params.retain(|m| {
                ctx.graph
                    .property(*m)
                    .raw
                    .map_or(true, |r| source.property_origin(r) != origin)
            });
            continue;
        }
        let pid = map_parameter(ctx, op, &op_id, param, client_params);
        parameters.push(pid);
    }

    let mut body_param = None;
    if let Some(body) = &shape.body {
        let payload = effective_payload_type(source, body.ty);
        let ty = resolve_type(ctx, payload, Some(op));
        let content_types = body.content_types.clone();
        let default_content_type = default_content_type(&content_types)
            .unwrap_or_else(|| "application/json".to_string());
        let kind = PropertyKind::Body {
            content_types: content_types.clone(),
            default_content_type,
        };
        let mut property = match body.property {
            Some(p) => new_property(ctx, p, kind, ty),
            None => {
                let type_name = ctx.graph.ty(ty).name.clone();
                let name = if type_name.is_empty() {
                    "body".to_string()
                } else {
                    type_name.to_lower_camel_case()
                };
                let mut property = SdkModelProperty::new(kind, name, ty);
                property.is_generated_name = true;
                property
            }
        };
        if property.serialized_name.is_empty() {
            property.serialized_name = "body".to_string();
        }
        property.cross_language_id = format!("{}.{}", op_id, property.name);
        let optional = property.optional;
        body_param = Some(ctx.graph.push_property(property));

        let has_content_type = shape.parameters.iter().any(|p| {
            p.location == ParameterLocation::Header && p.name.eq_ignore_ascii_case("content-type")
        });
        if !has_content_type {
            let ty = match content_types.as_slice() {
                [single] if CONSTANT_CONTENT_TYPES.contains(&single.as_str()) => {
                    let name = format!("{}ContentType", operation.name.to_upper_camel_case());
                    string_constant(ctx, single, name, &operation.namespace, &op_id)
                }
                _ => ctx.builtin(BuiltInKind::String),
            };
            let header =
                synthesized_header(ctx, &op_id, "contentType", "Content-Type", ty, optional);
            parameters.push(header);
            ensure_method_param(ctx, &op_id, method_params, "contentType", ty, optional);
        }
    }

    let (mut responses, mut exceptions) = map_responses(ctx, op);

    if operation.response_as_bool {
        let truthy = bool_constant(ctx, true);
        let falsy = bool_constant(ctx, false);
        for response in &mut responses {
            response.ty = Some(truthy);
        }
        match exceptions
            .iter()
            .position(|e| e.status_codes == StatusCodes::Exact(404))
        {
            Some(index) => {
                let mut not_found = exceptions.remove(index);
                not_found.ty = Some(falsy);
                responses.push(not_found);
            }
            None => responses.push(SdkHttpResponse {
                status_codes: StatusCodes::Exact(404),
                ty: Some(falsy),
                headers: Vec::new(),
                content_types: Vec::new(),
                default_content_type: None,
                description: None,
            }),
        }
    }

    let has_accept = shape
        .parameters
        .iter()
        .any(|p| p.location == ParameterLocation::Header && p.name.eq_ignore_ascii_case("accept"));
    let mut accept_types: Vec<String> = Vec::new();
    for response in &responses {
        for ct in &response.content_types {
            if !accept_types.contains(ct) {
                accept_types.push(ct.clone());
            }
        }
    }
    if !has_accept && !accept_types.is_empty() {
        let ty = match accept_types.as_slice() {
            [single] => {
                let name = format!("{}Accept", operation.name.to_upper_camel_case());
                string_constant(ctx, single, name, &operation.namespace, &op_id)
            }
            _ => ctx.builtin(BuiltInKind::String),
        };
        let header = synthesized_header(ctx, &op_id, "accept", "Accept", ty, false);
        parameters.push(header);
        ensure_method_param(ctx, &op_id, method_params, "accept", ty, false);
    }

    for pid in parameters.iter().copied().chain(body_param) {
        let mapped = corresponding_method_params(ctx, &op_id, pid, method_params, client_params);
        ctx.graph.property_mut(pid).corresponding_method_params = mapped;
    }

    SdkHttpOperation {
        verb: shape.verb,
        path: shape.path.clone(),
        uri_template: shape.uri_template.clone(),
        parameters,
        body_param,
        responses,
        exceptions,
        examples: Vec::new(),
    }
}

/// Collapse an anonymous body model whose properties all come from one named model.
pub(crate) fn effective_payload_type(source: &SourceGraph, ty: SourceId) -> SourceId {
    let Some(model) = source.model(ty) else {
        return ty;
    };
    if !model.name.is_empty() || model.properties.is_empty() {
        return ty;
    }
    let mut owner = None;
    for p in &model.properties {
        let origin_model = source
            .property(*p)
            .and_then(|prop| prop.source_property)
            .map(|s| source.property_origin(s))
            .and_then(|o| source.property(o))
            .and_then(|o| o.model);
        match (owner, origin_model) {
            (_, None) => return ty,
            (None, Some(m)) => owner = Some(m),
            (Some(current), Some(m)) if current == m => {}
            _ => return ty,
        }
    }
    match owner {
        Some(m)
            if source.model(m).is_some_and(|named| {
                !named.name.is_empty() && named.properties.len() == model.properties.len()
            }) =>
        {
            m
        }
        _ => ty,
    }
}

/// `application/json` when declared, else the first content type.
pub(crate) fn default_content_type(content_types: &[String]) -> Option<String> {
    content_types
        .iter()
        .find(|ct| ct.as_str() == "application/json")
        .or_else(|| content_types.first())
        .cloned()
}

// --- Parameters ---

fn map_parameter(
    ctx: &mut SdkContext<'_>,
    op: OperationId,
    op_id: &str,
    param: &HttpParameterShape,
    client_params: &[PropertyId],
) -> PropertyId {
    let source = ctx.source;
    let ty = match source.property(param.property) {
        Some(p) => resolve_type(ctx, p.ty, Some(op)),
        None => ctx.builtin(BuiltInKind::Unknown),
    };
    let ty = apply_encode(ctx, param.property, ty, param.location == ParameterLocation::Header);
    let is_array = matches!(
        ctx.graph.ty(ctx.graph.strip_nullable(ty)).kind,
        SdkTypeKind::Array { .. }
    );
    let kind = match param.location {
        ParameterLocation::Path => PropertyKind::Path {
            explode: param.explode,
            style: param.style.clone().unwrap_or_else(|| "simple".to_string()),
            allow_reserved: param.allow_reserved,
        },
        ParameterLocation::Query => PropertyKind::Query {
            explode: param.explode,
            collection_format: if is_array {
                Some(collection_format(ctx, param))
            } else {
                None
            },
        },
        ParameterLocation::Header => PropertyKind::Header {
            collection_format: if is_array {
                Some(collection_format(ctx, param))
            } else {
                None
            },
        },
        ParameterLocation::Cookie => PropertyKind::Cookie,
    };
    let mut property = new_property(ctx, param.property, kind, ty);
    property.serialized_name = param.name.clone();
    property.on_client = is_on_client(ctx, param.property, &property, client_params);
    property.cross_language_id = format!("{}.{}", op_id, source.name(param.property));
    ctx.graph.push_property(property)
}

fn collection_format(ctx: &mut SdkContext<'_>, param: &HttpParameterShape) -> CollectionFormat {
    let source = ctx.source;
    if param.explode {
        return CollectionFormat::Multi;
    }
    match source.meta(param.property).encode.as_ref().map(|e| e.encoding.as_str()) {
        None | Some("commaDelimited") => CollectionFormat::Csv,
        Some("pipeDelimited") => CollectionFormat::Pipes,
        Some("spaceDelimited") => CollectionFormat::Ssv,
        Some(other) => {
            ctx.report(
                DiagnosticCode::InvalidEncodeForCollectionFormat,
                param.name.clone(),
                format!("encoding {} is not a collection format", other),
            );
            CollectionFormat::Csv
        }
    }
}

fn is_on_client(
    ctx: &SdkContext<'_>,
    raw: SourceId,
    property: &SdkModelProperty,
    client_params: &[PropertyId],
) -> bool {
    if client_match(ctx, raw, &property.name, client_params).is_some() {
        return true;
    }
    if property.is_api_version_param {
        return client_params
            .iter()
            .any(|c| ctx.graph.property(*c).is_api_version_param);
    }
    ctx.options.arm && property.name == "subscriptionId"
}

/// Client parameter declared for the same source property, or aliased to `name`.
fn client_match(
    ctx: &SdkContext<'_>,
    raw: SourceId,
    name: &str,
    client_params: &[PropertyId],
) -> Option<PropertyId> {
    let source = ctx.source;
    let origin = source.property_origin(raw);
    client_params.iter().copied().find(|c| {
        let Some(client_raw) = ctx.graph.property(*c).raw else {
            return false;
        };
        source.property_origin(client_raw) == origin
            || source.meta(client_raw).param_alias.as_deref() == Some(name)
    })
}

/// Whether an RFC 6570 template references the variable `name`.
fn template_uses(template: &str, name: &str) -> bool {
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        let Some(len) = rest[start..].find('}') else {
            break;
        };
        let expression = &rest[start + 1..start + len];
        let expression = expression.trim_start_matches(['+', '#', '.', '/', ';', '?', '&']);
        if expression
            .split(',')
            .any(|v| v.trim_end_matches('*') == name)
        {
            return true;
        }
        rest = &rest[start + len + 1..];
    }
    false
}

fn string_constant(
    ctx: &mut SdkContext<'_>,
    value: &str,
    name: String,
    namespace: &str,
    op_id: &str,
) -> SdkTypeId {
    let value_type = ctx.builtin(BuiltInKind::String);
    let mut ty = SdkType::new(SdkTypeKind::Constant {
        value: Value::String(value.to_string()),
        value_type,
    })
    .named(name.clone(), namespace);
    ty.is_generated_name = true;
    ty.cross_language_id = format!("{}.{}", op_id, name);
    ctx.graph.push_type(ty)
}

fn bool_constant(ctx: &mut SdkContext<'_>, value: bool) -> SdkTypeId {
    let value_type = ctx.builtin(BuiltInKind::Boolean);
    let mut ty = SdkType::new(SdkTypeKind::Constant {
        value: Value::Bool(value),
        value_type,
    });
    ty.name = if value { "True" } else { "False" }.to_string();
    ty.is_generated_name = true;
    ctx.graph.push_type(ty)
}

fn synthesized_header(
    ctx: &mut SdkContext<'_>,
    op_id: &str,
    name: &str,
    serialized_name: &str,
    ty: SdkTypeId,
    optional: bool,
) -> PropertyId {
    let mut property = SdkModelProperty::new(
        PropertyKind::Header {
            collection_format: None,
        },
        name,
        ty,
    );
    property.serialized_name = serialized_name.to_string();
    property.optional = optional;
    property.is_generated_name = true;
    property.cross_language_id = format!("{}.{}", op_id, name);
    ctx.graph.push_property(property)
}

fn ensure_method_param(
    ctx: &mut SdkContext<'_>,
    op_id: &str,
    method_params: &mut Vec<PropertyId>,
    name: &str,
    ty: SdkTypeId,
    optional: bool,
) {
    if method_params
        .iter()
        .any(|m| ctx.graph.property(*m).name == name)
    {
        return;
    }
    let mut property = SdkModelProperty::new(PropertyKind::Method, name, ty);
    property.optional = optional;
    property.is_generated_name = true;
    property.cross_language_id = format!("{}.{}", op_id, name);
    method_params.push(ctx.graph.push_property(property));
}

// --- Responses ---

fn map_responses(
    ctx: &mut SdkContext<'_>,
    op: OperationId,
) -> (Vec<SdkHttpResponse>, Vec<SdkHttpResponse>) {
    let source = ctx.source;
    let operation = source.operation(op);
    let mut responses = Vec::new();
    let mut exceptions = Vec::new();
    for shape in &operation.http.responses {
        let mut headers: Vec<PropertyId> = Vec::new();
        let mut ty: Option<SdkTypeId> = None;
        let mut content_types: Vec<String> = Vec::new();
        for content in &shape.responses {
            for h in &content.headers {
                let hty = match source.property(*h) {
                    Some(p) => resolve_type(ctx, p.ty, Some(op)),
                    None => ctx.builtin(BuiltInKind::Unknown),
                };
                let hty = apply_encode(ctx, *h, hty, true);
                let header = new_property(ctx, *h, PropertyKind::ResponseHeader, hty);
                let duplicate = headers
                    .iter()
                    .any(|e| ctx.graph.property(*e).serialized_name == header.serialized_name);
                if !duplicate {
                    headers.push(ctx.graph.push_property(header));
                }
            }
            if let Some(body) = &content.body {
                let body_ty = resolve_type(ctx, effective_payload_type(source, body.ty), Some(op));
                match ty {
                    Some(existing) if existing != body_ty => {
                        ctx.report(
                            DiagnosticCode::MultipleResponseTypes,
                            operation.name.clone(),
                            format!(
                                "multiple response types for status code {:?}",
                                shape.status_codes
                            ),
                        );
                    }
                    Some(_) => {}
                    None => ty = Some(body_ty),
                }
                for ct in &body.content_types {
                    if !content_types.contains(ct) {
                        content_types.push(ct.clone());
                    }
                }
            }
        }
        let response = SdkHttpResponse {
            status_codes: shape.status_codes,
            ty,
            headers,
            default_content_type: default_content_type(&content_types),
            content_types,
            description: shape.description.clone(),
        };
        let is_error = shape.status_codes == StatusCodes::Any
            || shape.response_type.is_some_and(|t| source.is_error_model(t));
        if is_error {
            exceptions.push(response);
        } else {
            responses.push(response);
        }
    }
    (responses, exceptions)
}

// --- Correspondence ---

/// Method-level parameters (or nested properties of them) that supply a wire parameter.
fn corresponding_method_params(
    ctx: &mut SdkContext<'_>,
    op_id: &str,
    param: PropertyId,
    method_params: &[PropertyId],
    client_params: &[PropertyId],
) -> Vec<PropertyId> {
    let property = ctx.graph.property(param).clone();

    if let Some(raw) = property.raw {
        if let Some(client) = client_match(ctx, raw, &property.name, client_params) {
            return vec![client];
        }
    }

    if property.on_client && property.is_api_version_param {
        if let Some(version) = client_params
            .iter()
            .copied()
            .find(|c| ctx.graph.property(*c).is_api_version_param)
        {
            return vec![version];
        }
        ctx.report(
            DiagnosticCode::NoCorrespondingMethodParam,
            format!("{}.{}", op_id, property.name),
            "missing api version parameter on the client",
        );
        return Vec::new();
    }

    if property.on_client && ctx.options.arm && property.name == "subscriptionId" {
        if let Some(subscription) = client_params
            .iter()
            .copied()
            .find(|c| ctx.graph.property(*c).name == "subscriptionId")
        {
            return vec![subscription];
        }
    }

    if let Some(direct) = find_mapping(ctx, &property, method_params) {
        return vec![direct];
    }

    if matches!(property.kind, PropertyKind::Body { .. }) {
        let body_type = ctx.graph.strip_nullable(property.ty);
        if ctx.graph.model(body_type).is_some() {
            // Only the body model's own properties must correspond.
            let fields = ctx.graph.model_properties(body_type);
            let mut mapped = Vec::new();
            let mut skipped = 0;
            for field in &fields {
                let field = ctx.graph.property(*field).clone();
                match find_mapping(ctx, &field, method_params) {
                    Some(m) => mapped.push(m),
                    None if field.optional => skipped += 1,
                    None => break,
                }
            }
            if mapped.len() + skipped == fields.len() {
                return mapped;
            }
        }
    }

    if !property.optional {
        ctx.report(
            DiagnosticCode::NoCorrespondingMethodParam,
            format!("{}.{}", op_id, property.name),
            format!(
                "no method parameter corresponds to http parameter {}",
                property.name
            ),
        );
    }
    Vec::new()
}

/// Breadth-first search through method parameters and their nested model properties.
fn find_mapping(
    ctx: &SdkContext<'_>,
    target: &SdkModelProperty,
    method_params: &[PropertyId],
) -> Option<PropertyId> {
    let source = ctx.source;
    let target_origin = target.raw.map(|r| source.property_origin(r));
    let mut queue: VecDeque<PropertyId> = method_params.iter().copied().collect();
    let mut visited = HashSet::new();
    while let Some(candidate) = queue.pop_front() {
        let c = ctx.graph.property(candidate);
        let same_origin = match (target_origin, c.raw) {
            (Some(t), Some(raw)) => source.property_origin(raw) == t,
            _ => false,
        };
        let synthesized = (target.serialized_name.eq_ignore_ascii_case("content-type")
            && c.name == "contentType")
            || (target.serialized_name.eq_ignore_ascii_case("accept") && c.name == "accept");
        if same_origin || synthesized {
            return Some(candidate);
        }
        let mut current = Some(ctx.graph.strip_nullable(c.ty));
        while let Some(m) = current {
            let Some(data) = ctx.graph.model(m) else {
                break;
            };
            if !visited.insert(m) {
                break;
            }
            queue.extend(data.properties.iter().copied());
            current = data.base_model;
        }
    }
    None
}

/// Resolve the method parameters of an operation.
pub(crate) fn method_parameters(
    ctx: &mut SdkContext<'_>,
    op: OperationId,
    client_params: &[PropertyId],
) -> Vec<PropertyId> {
    let source = ctx.source;
    let operation = source.operation(op);
    let op_id = operation_cross_language_id(source, op);
    let mut params = Vec::new();
    for p in &operation.parameters {
        let Some(prop) = source.property(*p) else {
            continue;
        };
        if source.is_never_or_void(prop.ty) {
            continue;
        }
        if client_match(ctx, *p, &library_name(ctx, *p), client_params).is_some() {
            continue;
        }
        let ty = resolve_type(ctx, prop.ty, Some(op));
        let ty = apply_encode(ctx, *p, ty, false);
        let mut property = new_property(ctx, *p, PropertyKind::Method, ty);
        property.cross_language_id = format!("{}.{}", op_id, prop.name);
        if property.is_api_version_param
            && client_params
                .iter()
                .any(|c| ctx.graph.property(*c).is_api_version_param)
        {
            continue;
        }
        if ctx.options.arm && property.name == "subscriptionId" {
            continue;
        }
        params.push(ctx.graph.push_property(property));
    }
    params
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::SdkContextOptions;
    use crate::source::{
        HttpBodyShape, HttpMetadata, HttpOperationShape, HttpResponseContent, HttpResponseShape,
        SourceOperation,
    };
    use pretty_assertions::assert_eq;

    fn json_body(ty: SourceId, property: Option<SourceId>) -> HttpBodyShape {
        HttpBodyShape {
            ty,
            property,
            content_types: vec!["application/json".into()],
            multipart: false,
        }
    }

    fn ok(body: Option<SourceId>) -> HttpResponseShape {
        HttpResponseShape {
            status_codes: StatusCodes::Exact(200),
            description: None,
            response_type: body,
            responses: vec![HttpResponseContent {
                headers: Vec::new(),
                body: body.map(|b| json_body(b, None)),
            }],
        }
    }

    fn map(ctx: &mut SdkContext<'_>, op: OperationId) -> (SdkHttpOperation, Vec<PropertyId>) {
        let mut params = method_parameters(ctx, op, &[]);
        let http = map_operation(ctx, op, &mut params, &[]);
        (http, params)
    }

    #[test]
    fn path_and_query_parameters_map_directly() {
        let mut g = SourceGraph::new();
        let s = g.std_scalar("string");
        let id = g.parameter("id", s, false);
        let filter = g.parameter("filter", s, true);
        let op = g.add_operation(SourceOperation {
            name: "get".into(),
            namespace: "Ns".into(),
            parameters: vec![id, filter],
            http: HttpOperationShape {
                path: "/widgets/{id}".into(),
                uri_template: "/widgets/{id}{?filter}".into(),
                parameters: vec![
                    HttpParameterShape {
                        location: ParameterLocation::Path,
                        name: "id".into(),
                        property: id,
                        ..Default::default()
                    },
                    HttpParameterShape {
                        location: ParameterLocation::Query,
                        name: "filter".into(),
                        property: filter,
                        ..Default::default()
                    },
                ],
                ..Default::default()
            },
            ..Default::default()
        });
        let mut ctx = SdkContext::new(&g, SdkContextOptions::default());
        let (http, params) = map(&mut ctx, op);
        assert_eq!(http.parameters.len(), 2);
        let path = ctx.graph().property(http.parameters[0]);
        assert!(matches!(&path.kind, PropertyKind::Path { style, .. } if style == "simple"));
        assert_eq!(path.corresponding_method_params, vec![params[0]]);
        assert_eq!(path.cross_language_id, "Ns.get.id");
        let query = ctx.graph().property(http.parameters[1]);
        assert_eq!(query.corresponding_method_params, vec![params[1]]);
        assert!(ctx.diagnostics().is_empty());
    }

    #[test]
    fn unused_path_parameter_is_dropped() {
        let mut g = SourceGraph::new();
        let s = g.std_scalar("string");
        let id = g.parameter("id", s, false);
        let op = g.add_operation(SourceOperation {
            name: "list".into(),
            parameters: vec![id],
            http: HttpOperationShape {
                path: "/widgets".into(),
                parameters: vec![HttpParameterShape {
                    location: ParameterLocation::Path,
                    name: "id".into(),
                    property: id,
                    ..Default::default()
                }],
                ..Default::default()
            },
            ..Default::default()
        });
        let mut ctx = SdkContext::new(&g, SdkContextOptions::default());
        let (http, params) = map(&mut ctx, op);
        assert!(http.parameters.is_empty());
        assert!(params.is_empty());
    }

    #[test]
    fn default_content_type_prefers_plain_json() {
        let types = |list: &[&str]| list.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        assert_eq!(
            default_content_type(&types(&["application/merge-patch+json", "application/json"])),
            Some("application/json".to_string())
        );
        assert_eq!(
            default_content_type(&types(&["text/plain", "application/merge-patch+json"])),
            Some("text/plain".to_string())
        );
        assert_eq!(default_content_type(&[]), None);
    }

    #[test]
    fn template_variables() {
        assert!(template_uses("/a/{id}", "id"));
        assert!(template_uses("/a{/segments*}", "segments"));
        assert!(template_uses("/a{?x,y}", "y"));
        assert!(!template_uses("/a/{identity}", "id"));
    }

    #[test]
    fn array_query_collection_formats() {
        let mut g = SourceGraph::new();
        let s = g.std_scalar("string");
        let arr = g.array_of(s);
        let tags = g.parameter("tags", arr, false);
        let names = g.parameter("names", arr, false);
        g.meta_mut(names).encode = Some(crate::source::EncodeHint {
            encoding: "pipeDelimited".into(),
            wire_type: None,
        });
        let odd = g.parameter("odd", arr, false);
        g.meta_mut(odd).encode = Some(crate::source::EncodeHint {
            encoding: "base64".into(),
            wire_type: None,
        });
        let query = |name: &str, property: SourceId, explode: bool| HttpParameterShape {
            location: ParameterLocation::Query,
            name: name.into(),
            property,
            explode,
            ..Default::default()
        };
        let op = g.add_operation(SourceOperation {
            name: "search".into(),
            parameters: vec![tags, names, odd],
            http: HttpOperationShape {
                path: "/search".into(),
                parameters: vec![
                    query("tags", tags, true),
                    query("names", names, false),
                    query("odd", odd, false),
                ],
                ..Default::default()
            },
            ..Default::default()
        });
        let mut ctx = SdkContext::new(&g, SdkContextOptions::default());
        let (http, _) = map(&mut ctx, op);
        let formats: Vec<Option<CollectionFormat>> = http
            .parameters
            .iter()
            .map(|p| match ctx.graph().property(*p).kind {
                PropertyKind::Query {
                    collection_format, ..
                } => collection_format,
                _ => None,
            })
            .collect();
        assert_eq!(
            formats,
            vec![
                Some(CollectionFormat::Multi),
                Some(CollectionFormat::Pipes),
                Some(CollectionFormat::Csv)
            ]
        );
        assert_eq!(
            ctx.diagnostics()
                .with_code(DiagnosticCode::InvalidEncodeForCollectionFormat)
                .count(),
            1
        );
    }

    #[test]
    fn json_body_synthesizes_constant_content_type() {
        let mut g = SourceGraph::new();
        let s = g.std_scalar("string");
        let widget = g.add_model("Widget", "Ns");
        g.add_property(widget, "name", s, false);
        let body = g.parameter("widget", widget, false);
        let op = g.add_operation(SourceOperation {
            name: "create".into(),
            namespace: "Ns".into(),
            parameters: vec![body],
            http: HttpOperationShape {
                verb: HttpVerb::Post,
                path: "/widgets".into(),
                body: Some(json_body(widget, Some(body))),
                responses: vec![ok(Some(widget))],
                ..Default::default()
            },
            ..Default::default()
        });
        let mut ctx = SdkContext::new(&g, SdkContextOptions::default());
        let (http, params) = map(&mut ctx, op);

        let body_param = ctx.graph().property(http.body_param.unwrap());
        assert_eq!(body_param.name, "widget");
        assert_eq!(body_param.corresponding_method_params, vec![params[0]]);

        let names: Vec<&str> = params
            .iter()
            .map(|p| ctx.graph().property(*p).name.as_str())
            .collect();
        assert_eq!(names, vec!["widget", "contentType", "accept"]);

        let content_type = ctx.graph().property(http.parameters[0]);
        assert_eq!(content_type.serialized_name, "Content-Type");
        assert_eq!(content_type.corresponding_method_params, vec![params[1]]);
        match &ctx.graph()[content_type.ty].kind {
            SdkTypeKind::Constant { value, .. } => assert_eq!(value, "application/json"),
            other => panic!("unexpected {}", other.kind_name()),
        }
        assert_eq!(ctx.graph()[content_type.ty].name, "CreateContentType");
        let accept = ctx.graph().property(http.parameters[1]);
        assert_eq!(accept.serialized_name, "Accept");
        assert!(ctx.diagnostics().is_empty());
    }

    #[test]
    fn multiple_content_types_use_string_header() {
        let mut g = SourceGraph::new();
        let bytes = g.std_scalar("bytes");
        let body = g.parameter("data", bytes, false);
        let op = g.add_operation(SourceOperation {
            name: "upload".into(),
            parameters: vec![body],
            http: HttpOperationShape {
                verb: HttpVerb::Put,
                path: "/data".into(),
                body: Some(HttpBodyShape {
                    ty: bytes,
                    property: Some(body),
                    content_types: vec!["image/png".into(), "image/jpeg".into()],
                    multipart: false,
                }),
                ..Default::default()
            },
            ..Default::default()
        });
        let mut ctx = SdkContext::new(&g, SdkContextOptions::default());
        let (http, _) = map(&mut ctx, op);
        let header = ctx.graph().property(http.parameters[0]);
        assert!(matches!(
            ctx.graph()[header.ty].kind,
            SdkTypeKind::BuiltIn {
                builtin: BuiltInKind::String,
                ..
            }
        ));
        let body = ctx.graph().property(http.body_param.unwrap());
        assert!(matches!(
            &body.kind,
            PropertyKind::Body { default_content_type, .. } if default_content_type == "image/png"
        ));
    }

    fn spread_fixture(required_missing: bool) -> (SourceGraph, OperationId) {
        let mut g = SourceGraph::new();
        let s = g.std_scalar("string");
        let widget = g.add_model("Widget", "Ns");
        let name = g.add_property(widget, "name", s, false);
        let color = g.add_property(widget, "color", s, true);
        let size = g.add_property(widget, "size", s, true);

        let body_model = g.add_model("", "Ns");
        let mut params = Vec::new();
        let fields = [(name, "name", false), (color, "color", true), (size, "size", true)];
        for (origin, pname, optional) in fields {
            let body_prop = g.add_property(body_model, pname, s, optional);
            g.property_mut(body_prop).unwrap().source_property = Some(origin);
            let skip = pname == "size" || (required_missing && pname == "name");
            if !skip {
                let p = g.parameter(pname, s, optional);
                g.property_mut(p).unwrap().source_property = Some(origin);
                params.push(p);
            }
        }
        let op = g.add_operation(SourceOperation {
            name: "create".into(),
            namespace: "Ns".into(),
            parameters: params,
            http: HttpOperationShape {
                verb: HttpVerb::Post,
                path: "/widgets".into(),
                body: Some(json_body(body_model, None)),
                ..Default::default()
            },
            ..Default::default()
        });
        (g, op)
    }

    #[test]
    fn spread_body_corresponds_field_by_field() {
        let (g, op) = spread_fixture(false);
        let mut ctx = SdkContext::new(&g, SdkContextOptions::default());
        let (http, params) = map(&mut ctx, op);
        let body = ctx.graph().property(http.body_param.unwrap());
        assert_eq!(ctx.graph()[body.ty].name, "Widget");
        assert_eq!(body.name, "widget");
        assert!(body.is_generated_name);
        assert_eq!(body.corresponding_method_params, vec![params[0], params[1]]);
        assert!(ctx.diagnostics().is_empty());
    }

    #[test]
    fn missing_required_correspondence_reports() {
        let (g, op) = spread_fixture(true);
        let mut ctx = SdkContext::new(&g, SdkContextOptions::default());
        let (http, _) = map(&mut ctx, op);
        let body = ctx.graph().property(http.body_param.unwrap());
        assert!(body.corresponding_method_params.is_empty());
        assert_eq!(
            ctx.diagnostics()
                .with_code(DiagnosticCode::NoCorrespondingMethodParam)
                .count(),
            1
        );
    }

    #[test]
    fn optional_only_body_needs_no_method_params() {
        let mut g = SourceGraph::new();
        let s = g.std_scalar("string");
        let options = g.add_model("", "Ns");
        g.add_property(options, "size", s, true);
        let op = g.add_operation(SourceOperation {
            name: "touch".into(),
            namespace: "Ns".into(),
            http: HttpOperationShape {
                verb: HttpVerb::Post,
                path: "/touch".into(),
                body: Some(json_body(options, None)),
                ..Default::default()
            },
            ..Default::default()
        });
        let mut ctx = SdkContext::new(&g, SdkContextOptions::default());
        let (http, _) = map(&mut ctx, op);
        let body = ctx.graph().property(http.body_param.unwrap());
        assert!(!body.optional);
        assert!(body.corresponding_method_params.is_empty());
        assert!(ctx.diagnostics().is_empty());
    }

    #[test]
    fn derived_body_ignores_inherited_required_properties() {
        let mut g = SourceGraph::new();
        let s = g.std_scalar("string");
        let base = g.add_model("Base", "Ns");
        g.add_property(base, "id", s, false);
        let derived = g.add_model("Derived", "Ns");
        let name = g.add_property(derived, "name", s, false);
        g.extend(derived, base);
        let param = g.parameter("name", s, false);
        g.property_mut(param).unwrap().source_property = Some(name);
        let op = g.add_operation(SourceOperation {
            name: "rename".into(),
            namespace: "Ns".into(),
            parameters: vec![param],
            http: HttpOperationShape {
                verb: HttpVerb::Post,
                path: "/rename".into(),
                body: Some(json_body(derived, None)),
                ..Default::default()
            },
            ..Default::default()
        });
        let mut ctx = SdkContext::new(&g, SdkContextOptions::default());
        let (http, params) = map(&mut ctx, op);
        let body = ctx.graph().property(http.body_param.unwrap());
        assert_eq!(ctx.graph()[body.ty].name, "Derived");
        assert_eq!(body.corresponding_method_params, vec![params[0]]);
        assert_eq!(
            ctx.diagnostics()
                .with_code(DiagnosticCode::NoCorrespondingMethodParam)
                .count(),
            0
        );
    }

    #[test]
    fn nested_property_found_breadth_first() {
        let mut g = SourceGraph::new();
        let s = g.std_scalar("string");
        let options = g.add_model("Options", "Ns");
        let trace = g.add_property(options, "traceId", s, false);
        g.meta_mut(trace).http = Some(HttpMetadata::Header {
            name: "x-trace".into(),
        });
        let param = g.parameter("options", options, false);
        let op = g.add_operation(SourceOperation {
            name: "ping".into(),
            parameters: vec![param],
            http: HttpOperationShape {
                path: "/ping".into(),
                parameters: vec![HttpParameterShape {
                    location: ParameterLocation::Header,
                    name: "x-trace".into(),
                    property: trace,
                    ..Default::default()
                }],
                ..Default::default()
            },
            ..Default::default()
        });
        let mut ctx = SdkContext::new(&g, SdkContextOptions::default());
        let (http, params) = map(&mut ctx, op);
        let header = ctx.graph().property(http.parameters[0]);
        let options_ty = ctx.graph().property(params[0]).ty;
        let nested = ctx.graph().model_properties(options_ty)[0];
        assert_eq!(header.corresponding_method_params, vec![nested]);
    }

    #[test]
    fn error_responses_become_exceptions() {
        let mut g = SourceGraph::new();
        let s = g.std_scalar("string");
        let err = g.add_model("Error", "Ns");
        g.add_property(err, "code", s, false);
        g.meta_mut(err).error = true;
        let op = g.add_operation(SourceOperation {
            name: "get".into(),
            http: HttpOperationShape {
                path: "/".into(),
                responses: vec![
                    ok(Some(s)),
                    HttpResponseShape {
                        status_codes: StatusCodes::Any,
                        response_type: Some(err),
                        responses: vec![HttpResponseContent {
                            headers: Vec::new(),
                            body: Some(json_body(err, None)),
                        }],
                        ..Default::default()
                    },
                ],
                ..Default::default()
            },
            ..Default::default()
        });
        let mut ctx = SdkContext::new(&g, SdkContextOptions::default());
        let (http, _) = map(&mut ctx, op);
        assert_eq!(http.responses.len(), 1);
        assert_eq!(http.exceptions.len(), 1);
        assert_eq!(http.exceptions[0].status_codes, StatusCodes::Any);
        assert_eq!(
            http.responses[0].default_content_type.as_deref(),
            Some("application/json")
        );
        assert!(http.response_for(200).is_some());
    }

    #[test]
    fn head_operation_returns_bool() {
        let mut g = SourceGraph::new();
        let op = g.add_operation(SourceOperation {
            name: "exists".into(),
            response_as_bool: true,
            http: HttpOperationShape {
                verb: HttpVerb::Head,
                path: "/".into(),
                responses: vec![HttpResponseShape {
                    status_codes: StatusCodes::Exact(204),
                    ..Default::default()
                }],
                ..Default::default()
            },
            ..Default::default()
        });
        let mut ctx = SdkContext::new(&g, SdkContextOptions::default());
        let (http, _) = map(&mut ctx, op);
        assert_eq!(http.responses.len(), 2);
        let values: Vec<Value> = http
            .responses
            .iter()
            .map(|r| match &ctx.graph()[r.ty.unwrap()].kind {
                SdkTypeKind::Constant { value, .. } => value.clone(),
                _ => Value::Null,
            })
            .collect();
        assert_eq!(values, vec![Value::Bool(true), Value::Bool(false)]);
    }

    #[test]
    fn differing_response_bodies_warn() {
        let mut g = SourceGraph::new();
        let s = g.std_scalar("string");
        let i = g.std_scalar("int32");
        let op = g.add_operation(SourceOperation {
            name: "get".into(),
            http: HttpOperationShape {
                path: "/".into(),
                responses: vec![HttpResponseShape {
                    status_codes: StatusCodes::Exact(200),
                    responses: vec![
                        HttpResponseContent {
                            headers: Vec::new(),
                            body: Some(json_body(s, None)),
                        },
                        HttpResponseContent {
                            headers: Vec::new(),
                            body: Some(json_body(i, None)),
                        },
                    ],
                    ..Default::default()
                }],
                ..Default::default()
            },
            ..Default::default()
        });
        let mut ctx = SdkContext::new(&g, SdkContextOptions::default());
        map(&mut ctx, op);
        assert_eq!(
            ctx.diagnostics()
                .with_code(DiagnosticCode::MultipleResponseTypes)
                .count(),
            1
        );
    }
}
