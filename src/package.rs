//! The compilation pass driver and the finished [`SdkPackage`].
//!
//! Pass order is fixed: clients and their operations are resolved in declaration
//! order, then usage and access are finalized over the whole referenced set, then
//! names, then examples.

use heck::ToUpperCamelCase;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, trace};

use crate::context::SdkContext;
use crate::diagnostics::{DiagnosticCode, Diagnostics};
use crate::error::GraphError;
use crate::examples::bind_operation;
use crate::http::{map_operation, method_parameters, SdkHttpOperation};
use crate::loader::{ExampleIndex, RawExampleFile};
use crate::naming::{self, operation_cross_language_id, resolve_operation_id, OperationRoot};
use crate::options::SdkContextOptions;
use crate::resolver::{apply_encode, new_property, resolve_type};
use crate::source::{
    AuthScheme, LiteralValue, OperationId, SourceClient, SourceGraph, SourceId, SourceKind,
};
use crate::types::{
    Access, BuiltInKind, PropertyId, PropertyKind, SdkGraph, SdkModelProperty, SdkType,
    SdkTypeId, SdkTypeKind, UsageFlags,
};
use crate::usage::{handle_all_types, update_types_from_operation, ClientUsage};

// --- Output model ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MethodKind {
    Basic,
    Paging,
    Lro,
    LroPaging,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SdkMethodResponse {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub ty: Option<SdkTypeId>,
    /// Properties to walk from the wire response to the method result.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub result_segments: Vec<PropertyId>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SdkPagingMetadata {
    pub page_items_segments: Vec<PropertyId>,
    pub next_link_segments: Vec<PropertyId>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SdkLroMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_result: Option<SdkTypeId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_envelope_result: Option<SdkTypeId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub polling_model: Option<SdkTypeId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_result_path: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SdkServiceMethod {
    pub kind: MethodKind,
    pub name: String,
    pub access: Access,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    pub cross_language_id: String,
    pub operation: SdkHttpOperation,
    pub parameters: Vec<PropertyId>,
    pub response: SdkMethodResponse,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exception: Option<SdkMethodResponse>,
    pub generate_convenient: bool,
    pub generate_protocol: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paging: Option<SdkPagingMetadata>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lro: Option<SdkLroMetadata>,
    #[serde(skip)]
    pub raw: OperationId,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SdkClientInitialization {
    pub name: String,
    pub parameters: Vec<PropertyId>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SdkClientType {
    pub name: String,
    pub namespace: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    pub client_initialization: SdkClientInitialization,
    pub methods: Vec<SdkServiceMethod>,
    pub api_versions: Vec<String>,
    pub cross_language_id: String,
    /// Cross-language id of the parent client.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    pub children: Vec<SdkClientType>,
}

impl SdkClientType {
    /// This client and every descendant, depth first.
    pub fn walk(&self) -> Vec<&SdkClientType> {
        let mut out = vec![self];
        for child in &self.children {
            out.extend(child.walk());
        }
        out
    }
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SdkNamespace {
    pub name: String,
    pub full_name: String,
    pub clients: Vec<String>,
    pub models: Vec<SdkTypeId>,
    pub enums: Vec<SdkTypeId>,
    pub unions: Vec<SdkTypeId>,
    pub namespaces: Vec<SdkNamespace>,
}

/// Everything emitters consume.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SdkPackage {
    pub clients: Vec<SdkClientType>,
    pub models: Vec<SdkTypeId>,
    pub enums: Vec<SdkTypeId>,
    /// Unions and nullable wrappers.
    pub unions: Vec<SdkTypeId>,
    pub namespaces: Vec<SdkNamespace>,
    pub cross_language_package_id: String,
    pub graph: SdkGraph,
    pub diagnostics: Diagnostics,
}

impl SdkPackage {
    /// Every client in the package, roots first then descendants.
    pub fn all_clients(&self) -> Vec<&SdkClientType> {
        self.clients.iter().flat_map(SdkClientType::walk).collect()
    }

    /// Method with the given name on any client.
    pub fn method(&self, name: &str) -> Option<&SdkServiceMethod> {
        self.all_clients()
            .into_iter()
            .flat_map(|c| c.methods.iter())
            .find(|m| m.name == name)
    }

    /// Declared model, enum or union with the given name.
    pub fn find_type(&self, name: &str) -> Option<SdkTypeId> {
        self.models
            .iter()
            .chain(&self.enums)
            .chain(&self.unions)
            .copied()
            .find(|t| self.graph.ty(*t).name == name)
    }
}

// --- Client planning ---

struct ClientPlan<'s> {
    source: Option<&'s SourceClient>,
    name: String,
    namespace: String,
    operations: Vec<OperationId>,
    children: Vec<ClientPlan<'s>>,
}

impl ClientPlan<'_> {
    fn operations(&self) -> Vec<OperationId> {
        let mut ops = self.operations.clone();
        for child in &self.children {
            ops.extend(child.operations());
        }
        ops
    }

    fn find_mut(&mut self, name: &str) -> Option<&mut Self> {
        if self.name == name {
            return Some(self);
        }
        self.children.iter_mut().find_map(|c| c.find_mut(name))
    }
}

fn plan_client<'s>(
    ctx: &mut SdkContext<'_>,
    client: &'s SourceClient,
    relocated: &mut Vec<OperationId>,
) -> ClientPlan<'s> {
    let source = ctx.source;
    let mut operations = Vec::new();
    for op in &client.operations {
        let operation = source.operation(*op);
        if operation.is_templated {
            continue;
        }
        match &operation.client_location {
            Some(location) if source.explicit_clients => {
                ctx.report(
                    DiagnosticCode::ClientLocationConflict,
                    operation.name.clone(),
                    format!(
                        "client location `{location}` is ignored because clients are \
                         declared explicitly"
                    ),
                );
                operations.push(*op);
            }
            Some(_) => relocated.push(*op),
            None => operations.push(*op),
        }
    }
    let scope = ctx.options.language_scope().to_string();
    let children = client
        .children
        .iter()
        .map(|c| plan_client(ctx, c, relocated))
        .collect();
    ClientPlan {
        source: Some(client),
        name: client
            .meta
            .client_name(&scope)
            .unwrap_or(&client.name)
            .to_string(),
        namespace: client.namespace.clone(),
        operations,
        children,
    }
}

fn plan_clients<'s>(ctx: &mut SdkContext<'s>) -> Vec<ClientPlan<'s>> {
    let source: &'s SourceGraph = ctx.source;
    if source.clients.is_empty() {
        let namespace = source
            .namespaces
            .first()
            .map(|n| n.name.clone())
            .or_else(|| source.operations.first().map(|o| o.namespace.clone()))
            .unwrap_or_default();
        let base = namespace.rsplit('.').next().unwrap_or_default();
        let operations = source
            .operations
            .iter()
            .enumerate()
            .filter(|(_, o)| !o.is_templated)
            .map(|(i, _)| OperationId(i as u32))
            .collect();
        return vec![ClientPlan {
            source: None,
            name: format!("{}Client", base.to_upper_camel_case()),
            namespace,
            operations,
            children: Vec::new(),
        }];
    }

    let mut plans = Vec::new();
    for client in &source.clients {
        let mut relocated = Vec::new();
        let mut plan = plan_client(ctx, client, &mut relocated);
        for op in relocated {
            let Some(location) = source.operation(op).client_location.clone() else {
                continue;
            };
            trace!(
                operation = %source.operation(op).name,
                location = %location,
                "relocating operation"
            );
            match plan.find_mut(&location) {
                Some(target) => target.operations.push(op),
                None => {
                    let namespace = plan.namespace.clone();
                    plan.children.push(ClientPlan {
                        source: None,
                        name: location,
                        namespace,
                        operations: vec![op],
                        children: Vec::new(),
                    });
                }
            }
        }
        plans.push(plan);
    }
    plans
}

// --- Client parameters ---

struct ClientParameters {
    parameters: Vec<PropertyId>,
    server_parameter_types: Vec<SdkTypeId>,
    version_enum: Option<SdkTypeId>,
    api_versions: Vec<String>,
}

fn version_strings(source: &SourceGraph, versions: SourceId) -> Vec<String> {
    let SourceKind::Enum(e) = source.kind(versions) else {
        return Vec::new();
    };
    e.members
        .iter()
        .filter_map(|m| match source.kind(*m) {
            SourceKind::EnumMember(member) => Some(match &member.value {
                Some(LiteralValue::String(s)) => s.clone(),
                _ => member.name.clone(),
            }),
            _ => None,
        })
        .collect()
}

fn elevated_parameter(ctx: &mut SdkContext<'_>, raw: SourceId, client_id: &str) -> PropertyId {
    let source = ctx.source;
    let ty = match source.property(raw) {
        Some(p) => resolve_type(ctx, p.ty, None),
        None => ctx.builtin(BuiltInKind::String),
    };
    let ty = apply_encode(ctx, raw, ty, false);
    let mut property = new_property(ctx, raw, PropertyKind::Method, ty);
    property.on_client = true;
    property.cross_language_id = format!("{}.{}", client_id, property.name);
    ctx.graph.push_property(property)
}

fn any_parameter(
    graph: &SdkGraph,
    params: &[PropertyId],
    predicate: impl Fn(&SdkModelProperty) -> bool,
) -> bool {
    params.iter().any(|p| predicate(graph.property(*p)))
}

fn client_parameters(
    ctx: &mut SdkContext<'_>,
    plan: &ClientPlan<'_>,
    client_id: &str,
) -> ClientParameters {
    let source = ctx.source;
    let client = plan.source;
    let mut parameters = Vec::new();

    // endpoint
    let mut template_arguments = Vec::new();
    let server_url = match client.and_then(|c| c.server.as_ref()) {
        Some(server) => {
            for p in &server.parameters {
                let ty = match source.property(*p) {
                    Some(prop) => resolve_type(ctx, prop.ty, None),
                    None => ctx.builtin(BuiltInKind::String),
                };
                let mut property = new_property(
                    ctx,
                    *p,
                    PropertyKind::Path {
                        explode: false,
                        style: "simple".to_string(),
                        allow_reserved: true,
                    },
                    ty,
                );
                property.on_client = true;
                property.cross_language_id = format!("{}.{}", client_id, property.name);
                template_arguments.push(ctx.graph.push_property(property));
            }
            server.url.clone()
        }
        None => {
            let url = ctx.builtin(BuiltInKind::Url);
            let mut property = SdkModelProperty::new(
                PropertyKind::Path {
                    explode: false,
                    style: "simple".to_string(),
                    allow_reserved: true,
                },
                "endpoint",
                url,
            );
            property.is_generated_name = true;
            property.on_client = true;
            property.doc = Some("Service host".to_string());
            property.cross_language_id = format!("{client_id}.endpoint");
            template_arguments.push(ctx.graph.push_property(property));
            "{endpoint}".to_string()
        }
    };
    let server_parameter_types: Vec<SdkTypeId> = template_arguments
        .iter()
        .map(|p| ctx.graph.property(*p).ty)
        .collect();
    let endpoint_type = ctx.graph.push_type(SdkType::new(SdkTypeKind::Endpoint {
        server_url,
        template_arguments,
    }));
    let mut endpoint = SdkModelProperty::new(
        PropertyKind::Endpoint { url_encode: false },
        "endpoint",
        endpoint_type,
    );
    endpoint.is_generated_name = true;
    endpoint.on_client = true;
    endpoint.doc = Some("Service host".to_string());
    endpoint.cross_language_id = format!("{client_id}.endpoint");
    parameters.push(ctx.graph.push_property(endpoint));

    // credential
    let schemes: Vec<AuthScheme> = client
        .map(|c| c.auth.clone())
        .unwrap_or_default()
        .into_iter()
        .filter(|s| *s != AuthScheme::NoAuth)
        .collect();
    if !schemes.is_empty() {
        let credential_type = ctx
            .graph
            .push_type(SdkType::new(SdkTypeKind::Credential { schemes }));
        ctx.graph.ty_mut(credential_type).cross_language_id =
            format!("{client_id}.CredentialUnion");
        let mut credential =
            SdkModelProperty::new(PropertyKind::Credential, "credential", credential_type);
        credential.is_generated_name = true;
        credential.on_client = true;
        credential.doc =
            Some("Credential used to authenticate requests to the service.".to_string());
        credential.cross_language_id = format!("{client_id}.credential");
        parameters.push(ctx.graph.push_property(credential));
    }

    // explicit client parameters
    for p in client.map(|c| c.parameters.as_slice()).unwrap_or_default() {
        let elevated = elevated_parameter(ctx, *p, client_id);
        parameters.push(elevated);
    }

    // api version
    let version_source = client.and_then(|c| c.versions);
    let mut api_versions = version_source
        .map(|v| version_strings(source, v))
        .unwrap_or_default();
    if let Some(pinned) = ctx.options.pinned_api_version() {
        if let Some(pos) = api_versions.iter().position(|v| v == pinned) {
            api_versions.truncate(pos + 1);
        }
    }
    let operations = plan.operations();
    let op_params: Vec<SourceId> = operations
        .iter()
        .flat_map(|op| source.operation(*op).parameters.iter().copied())
        .collect();
    if !any_parameter(&ctx.graph, &parameters, |p| p.is_api_version_param) {
        if let Some(raw) = op_params.iter().copied().find(|p| naming::is_api_version(source, *p)) {
            let id = elevated_parameter(ctx, raw, client_id);
            let default = ctx
                .options
                .pinned_api_version()
                .map(str::to_string)
                .or_else(|| api_versions.last().cloned());
            let property = ctx.graph.property_mut(id);
            property.is_api_version_param = true;
            if let Some(version) = default {
                property.client_default_value = Some(Value::String(version));
            }
            parameters.push(id);
        }
    }

    // subscription id
    if ctx.options.arm && !any_parameter(&ctx.graph, &parameters, |p| p.name == "subscriptionId") {
        if let Some(raw) = op_params
            .iter()
            .copied()
            .find(|p| source.name(*p) == "subscriptionId")
        {
            let id = elevated_parameter(ctx, raw, client_id);
            parameters.push(id);
        }
    }

    let version_enum = version_source.map(|v| resolve_type(ctx, v, None));
    ClientParameters {
        parameters,
        server_parameter_types,
        version_enum,
        api_versions,
    }
}

// --- Methods ---

fn segments(graph: &SdkGraph, root: Option<SdkTypeId>, names: &[String]) -> Vec<PropertyId> {
    let mut out = Vec::new();
    let mut current = root;
    for name in names {
        let Some(model) = current.map(|t| graph.strip_nullable(t)) else {
            break;
        };
        let Some(p) = graph.find_property(model, name) else {
            break;
        };
        out.push(p);
        current = Some(graph.property(p).ty);
    }
    out
}

fn method_response(
    ctx: &mut SdkContext<'_>,
    op: OperationId,
    http: &SdkHttpOperation,
) -> SdkMethodResponse {
    let source = ctx.source;
    let operation = source.operation(op);
    let mut types: Vec<SdkTypeId> = Vec::new();
    let mut without_body = false;
    for response in &http.responses {
        match response.ty {
            Some(ty) if !types.contains(&ty) => types.push(ty),
            Some(_) => {}
            None => without_body = true,
        }
    }
    let ty = match types.len() {
        0 => None,
        1 => Some(types[0]),
        _ => {
            let name = format!("{}Response", operation.name.to_upper_camel_case());
            let mut union = SdkType::new(SdkTypeKind::Union { variants: types })
                .named(name, &operation.namespace);
            union.is_generated_name = true;
            union.usage = UsageFlags::OUTPUT;
            union.cross_language_id =
                format!("{}.Response", operation_cross_language_id(source, op));
            let id = ctx.graph.push_type(union);
            ctx.extra_referenced.push(id);
            Some(id)
        }
    };
    let ty = match ty {
        Some(t)
            if without_body && !matches!(ctx.graph.ty(t).kind, SdkTypeKind::Nullable { .. }) =>
        {
            // Wrapper only, not a referenced declaration.
            let mut nullable = SdkType::new(SdkTypeKind::Nullable { inner: t });
            nullable.usage = UsageFlags::OUTPUT;
            nullable.access = ctx.graph.ty(t).access;
            Some(ctx.graph.push_type(nullable))
        }
        other => other,
    };
    SdkMethodResponse {
        ty,
        result_segments: Vec::new(),
    }
}

fn build_method(
    ctx: &mut SdkContext<'_>,
    op: OperationId,
    client_params: &[PropertyId],
) -> SdkServiceMethod {
    let source = ctx.source;
    let operation = source.operation(op);
    let mut parameters = method_parameters(ctx, op, client_params);
    let http = map_operation(ctx, op, &mut parameters, client_params);
    update_types_from_operation(ctx, op, &http, &parameters);

    let mut response = method_response(ctx, op, &http);
    let exception = http
        .exceptions
        .iter()
        .find_map(|e| e.ty)
        .map(|ty| SdkMethodResponse {
            ty: Some(ty),
            result_segments: Vec::new(),
        });

    let paging = operation.paging.as_ref().map(|shape| {
        let root = response.ty;
        let items = segments(&ctx.graph, root, &shape.item_segments);
        let next = segments(&ctx.graph, root, &shape.next_link_segments);
        if items.len() == shape.item_segments.len() {
            if let Some(last) = items.last() {
                response.ty = Some(ctx.graph.property(*last).ty);
                response.result_segments = items.clone();
            }
        }
        SdkPagingMetadata {
            page_items_segments: items,
            next_link_segments: next,
        }
    });

    let lro = operation.lro.as_ref().map(|shape| {
        let mut resolve = |id: Option<SourceId>| {
            id.filter(|i| !source.is_never_or_void(*i))
                .map(|i| resolve_type(ctx, i, Some(op)))
        };
        let metadata = SdkLroMetadata {
            final_result: resolve(shape.final_result),
            final_envelope_result: resolve(shape.final_envelope_result),
            polling_model: resolve(shape.polling_model),
            final_result_path: shape.final_result_path.clone(),
        };
        if paging.is_none() {
            response.ty = metadata.final_result;
            if let (Some(envelope), Some(path)) =
                (metadata.final_envelope_result, &metadata.final_result_path)
            {
                let names: Vec<String> = path.split('.').map(str::to_string).collect();
                response.result_segments = segments(&ctx.graph, Some(envelope), &names);
            }
        }
        metadata
    });

    let kind = match (&lro, &paging) {
        (Some(_), Some(_)) => MethodKind::LroPaging,
        (Some(_), None) => MethodKind::Lro,
        (None, Some(_)) => MethodKind::Paging,
        (None, None) => MethodKind::Basic,
    };
    let scope = ctx.options.language_scope();
    SdkServiceMethod {
        kind,
        name: operation
            .meta
            .client_name(scope)
            .unwrap_or(&operation.name)
            .to_string(),
        access: operation.meta.access.unwrap_or_default(),
        doc: operation.meta.doc.clone(),
        summary: operation.meta.summary.clone(),
        cross_language_id: operation_cross_language_id(source, op),
        operation: http,
        parameters,
        response,
        exception,
        generate_convenient: operation
            .convenient
            .unwrap_or(ctx.options.generate_convenience_methods),
        generate_protocol: operation
            .protocol
            .unwrap_or(ctx.options.generate_protocol_methods),
        paging,
        lro,
        raw: op,
    }
}

fn build_client(
    ctx: &mut SdkContext<'_>,
    plan: &ClientPlan<'_>,
    params: &ClientParameters,
    parent: Option<&str>,
) -> SdkClientType {
    let cross_language_id = naming::qualified(&plan.namespace, &plan.name);
    debug!(client = %cross_language_id, operations = plan.operations.len(), "building client");
    let methods = plan
        .operations
        .iter()
        .map(|op| build_method(ctx, *op, &params.parameters))
        .collect();
    let children = plan
        .children
        .iter()
        .map(|c| build_client(ctx, c, params, Some(cross_language_id.as_str())))
        .collect();
    SdkClientType {
        name: plan.name.clone(),
        namespace: plan.namespace.clone(),
        doc: plan.source.and_then(|c| c.meta.doc.clone()),
        summary: plan.source.and_then(|c| c.meta.summary.clone()),
        client_initialization: SdkClientInitialization {
            name: format!("{}Options", plan.name),
            parameters: params.parameters.clone(),
        },
        methods,
        api_versions: params.api_versions.clone(),
        cross_language_id: cross_language_id.clone(),
        parent: parent.map(str::to_string),
        children,
    }
}

fn validate_client_names(ctx: &mut SdkContext<'_>, clients: &[SdkClientType]) {
    let mut seen = std::collections::HashSet::new();
    for client in clients.iter().flat_map(SdkClientType::walk) {
        if !seen.insert((client.namespace.clone(), client.name.clone())) {
            let scope = ctx.options.language_scope().to_string();
            ctx.report(
                DiagnosticCode::DuplicateClientName,
                client.cross_language_id.clone(),
                format!("client name `{}` is duplicated in scope `{}`", client.name, scope),
            );
        }
    }
}

// --- Namespaces ---

fn namespace_slot<'n>(
    level: &'n mut Vec<SdkNamespace>,
    segments: &[&str],
    depth: usize,
) -> &'n mut SdkNamespace {
    let segment = segments[depth];
    let pos = match level.iter().position(|n| n.name == segment) {
        Some(pos) => pos,
        None => {
            level.push(SdkNamespace {
                name: segment.to_string(),
                full_name: segments[..=depth].join("."),
                ..Default::default()
            });
            level.len() - 1
        }
    };
    let node = &mut level[pos];
    if depth + 1 == segments.len() {
        node
    } else {
        namespace_slot(&mut node.namespaces, segments, depth + 1)
    }
}

fn namespace_tree(
    graph: &SdkGraph,
    clients: &[SdkClientType],
    types: &[SdkTypeId],
) -> Vec<SdkNamespace> {
    let mut roots = Vec::new();
    for client in clients.iter().flat_map(SdkClientType::walk) {
        if client.namespace.is_empty() {
            continue;
        }
        let segments: Vec<&str> = client.namespace.split('.').collect();
        namespace_slot(&mut roots, &segments, 0)
            .clients
            .push(client.name.clone());
    }
    for ty in types {
        let node = graph.ty(*ty);
        if node.namespace.is_empty() {
            continue;
        }
        let segments: Vec<&str> = node.namespace.split('.').collect();
        let slot = namespace_slot(&mut roots, &segments, 0);
        match node.kind {
            SdkTypeKind::Model(_) => slot.models.push(*ty),
            SdkTypeKind::Enum(_) => slot.enums.push(*ty),
            _ => slot.unions.push(*ty),
        }
    }
    roots
}

// --- Driver ---

/// Build the SDK package for a source graph.
///
/// `examples` are the already-read files of the examples directory.
///
/// # Errors
///
/// Returns a `GraphError` if the source graph has dangling references or
/// wrongly-kinded nodes. Every other problem is reported in
/// [`SdkPackage::diagnostics`].
pub fn create_sdk_package(
    source: &SourceGraph,
    options: SdkContextOptions,
    examples: &[RawExampleFile],
) -> Result<SdkPackage, GraphError> {
    source.validate()?;
    let mut ctx = SdkContext::new(source, options);
    debug!(
        nodes = source.nodes.len(),
        operations = source.operations.len(),
        "creating sdk package"
    );

    let plans = plan_clients(&mut ctx);
    let mut clients = Vec::new();
    let mut usages = Vec::new();
    for plan in &plans {
        let client_id = naming::qualified(&plan.namespace, &plan.name);
        let params = client_parameters(&mut ctx, plan, &client_id);
        clients.push(build_client(&mut ctx, plan, &params, None));
        usages.push(ClientUsage {
            server_parameter_types: params.server_parameter_types,
            version_enum: params.version_enum,
        });
    }

    let orphans = handle_all_types(&mut ctx, &usages);
    {
        let methods: Vec<&SdkServiceMethod> = clients
            .iter()
            .flat_map(SdkClientType::walk)
            .flat_map(|c| c.methods.iter())
            .collect();
        let roots: Vec<OperationRoot<'_>> = methods
            .iter()
            .map(|m| OperationRoot {
                id: m.raw,
                http: &m.operation,
                method_params: &m.parameters,
            })
            .collect();
        naming::finalize(&mut ctx, &orphans, &roots);
    }
    validate_client_names(&mut ctx, &clients);

    if examples.is_empty() {
        if let Some(dir) = ctx.options.examples_dir.clone() {
            ctx.report(
                DiagnosticCode::ExampleLoading,
                dir.clone(),
                format!("no example files found in `{dir}`"),
            );
        }
    } else {
        let version = ctx
            .options
            .pinned_api_version()
            .map(str::to_string)
            .or_else(|| clients.first().and_then(|c| c.api_versions.last().cloned()));
        let index = ExampleIndex::build(examples, version.as_deref(), &mut ctx.diagnostics);
        bind_examples(&mut ctx, &mut clients, &index);
    }

    let referenced = ctx.referenced_types();
    let (graph, diagnostics) = ctx.into_parts();
    let mut models = Vec::new();
    let mut enums = Vec::new();
    let mut unions = Vec::new();
    for ty in &referenced {
        match graph.ty(*ty).kind {
            SdkTypeKind::Model(_) => models.push(*ty),
            SdkTypeKind::Enum(_) => enums.push(*ty),
            SdkTypeKind::Union { .. } | SdkTypeKind::Nullable { .. } => unions.push(*ty),
            _ => {}
        }
    }
    let namespaces = namespace_tree(&graph, &clients, &referenced);
    let cross_language_package_id = clients
        .first()
        .map(|c| c.namespace.clone())
        .unwrap_or_default();
    debug!(
        clients = clients.len(),
        models = models.len(),
        diagnostics = diagnostics.len(),
        "sdk package created"
    );
    Ok(SdkPackage {
        clients,
        models,
        enums,
        unions,
        namespaces,
        cross_language_package_id,
        graph,
        diagnostics,
    })
}

fn bind_examples(ctx: &mut SdkContext<'_>, clients: &mut [SdkClientType], index: &ExampleIndex) {
    for client in clients {
        for method in &mut client.methods {
            let honored = resolve_operation_id(ctx, method.raw, true);
            let plain = resolve_operation_id(ctx, method.raw, false);
            let mut ids = vec![honored];
            if !ids.contains(&plain) {
                ids.push(plain);
            }
            bind_operation(&ctx.graph, &mut method.operation, &ids, index, &mut ctx.diagnostics);
        }
        bind_examples(ctx, &mut client.children, index);
    }
}
