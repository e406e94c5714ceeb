//! Library names, operation ids, generated names and cross-language ids.

use std::collections::{HashMap, HashSet};

use heck::ToUpperCamelCase;

use crate::context::SdkContext;
use crate::http::SdkHttpOperation;
use crate::source::{HttpMetadata, OperationId, SourceGraph, SourceId, SourceKind};
use crate::types::{PropertyId, PropertyKind, SdkGraph, SdkTypeId, SdkTypeKind};

/// Name a node carries in generated code.
///
/// A language-scoped client name wins over a friendly name; template instances are named
/// after their declaration followed by their arguments.
pub fn library_name(ctx: &SdkContext<'_>, id: SourceId) -> String {
    let source = ctx.source;
    let meta = source.meta(id);
    if let Some(name) = meta.client_name(ctx.options.language_scope()) {
        return name.to_string();
    }
    if let Some(friendly) = &meta.friendly_name {
        return friendly.clone();
    }
    if let SourceKind::Model(model) = source.kind(id) {
        if !model.name.is_empty() && !model.template_arguments.is_empty() {
            let mut name = model.name.clone();
            for arg in &model.template_arguments {
                let named = matches!(
                    source.kind(*arg),
                    SourceKind::Model(_)
                        | SourceKind::Enum(_)
                        | SourceKind::Union(_)
                        | SourceKind::Scalar { .. }
                );
                if named && !source.name(*arg).is_empty() {
                    name.push_str(&library_name(ctx, *arg).to_upper_camel_case());
                }
            }
            return name;
        }
    }
    source.name(id).to_string()
}

/// Name used on the wire: the HTTP binding name, then the JSON encoded name.
pub fn wire_name(source: &SourceGraph, id: SourceId) -> String {
    let meta = source.meta(id);
    match &meta.http {
        Some(
            HttpMetadata::Header { name }
            | HttpMetadata::Query { name }
            | HttpMetadata::Path { name }
            | HttpMetadata::Cookie { name },
        ) => return name.clone(),
        _ => {}
    }
    meta.encoded_name("application/json")
        .map(str::to_string)
        .unwrap_or_else(|| source.name(id).to_string())
}

/// Whether a parameter carries the service API version.
pub fn is_api_version(source: &SourceGraph, id: SourceId) -> bool {
    if let Some(explicit) = source.meta(id).api_version {
        return explicit;
    }
    let name = source.name(id).to_lowercase();
    name.contains("apiversion") || name.contains("api-version")
}

/// Stable operation id used to match example documents.
pub fn resolve_operation_id(ctx: &SdkContext<'_>, op: OperationId, honor_renaming: bool) -> String {
    let source = ctx.source;
    let operation = source.operation(op);
    if let Some(explicit) = &operation.operation_id {
        return explicit.clone();
    }
    let name = if honor_renaming {
        operation
            .meta
            .client_name(ctx.options.language_scope())
            .unwrap_or(&operation.name)
    } else {
        operation.name.as_str()
    };
    if let Some(location) = &operation.client_location {
        return format!("{}_{}", location, name);
    }
    if let Some(interface) = &operation.interface {
        return format!("{}_{}", interface, name);
    }
    let namespace = operation.namespace.as_str();
    let is_service_namespace = namespace.is_empty()
        || if source.clients.is_empty() {
            source
                .namespaces
                .first()
                .map(|n| n.name.as_str())
                .or_else(|| source.operations.first().map(|o| o.namespace.as_str()))
                == Some(namespace)
        } else {
            source.clients.iter().any(|c| c.namespace == namespace)
        };
    match namespace.rsplit('.').next() {
        Some(last) if !is_service_namespace => format!("{}_{}", last, name),
        _ => name.to_string(),
    }
}

/// `Namespace.Interface.operation`.
pub fn operation_cross_language_id(source: &SourceGraph, op: OperationId) -> String {
    let operation = source.operation(op);
    let mut parts: Vec<&str> = Vec::new();
    if !operation.namespace.is_empty() {
        parts.push(&operation.namespace);
    }
    if let Some(interface) = &operation.interface {
        parts.push(interface);
    }
    parts.push(&operation.name);
    parts.join(".")
}

pub(crate) fn qualified(namespace: &str, name: &str) -> String {
    if namespace.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", namespace, name)
    }
}

/// Crude singular form used for array element labels.
fn singular(label: &str) -> String {
    if let Some(stem) = label.strip_suffix("ies") {
        format!("{}y", stem)
    } else if label.len() > 1 && label.ends_with('s') && !label.ends_with("ss") {
        label[..label.len() - 1].to_string()
    } else {
        label.to_string()
    }
}

/// One operation as a naming search root.
pub(crate) struct OperationRoot<'r> {
    pub id: OperationId,
    pub http: &'r SdkHttpOperation,
    pub method_params: &'r [PropertyId],
}

// --- Context path search ---

#[derive(Debug, Clone)]
struct Segment {
    label: String,
    ty: Option<SdkTypeId>,
}

struct Discovery {
    namespace: String,
    paths: HashMap<SdkTypeId, Vec<Segment>>,
}

struct PathFinder<'g> {
    graph: &'g SdkGraph,
    visited: HashSet<SdkTypeId>,
    path: Vec<Segment>,
    found: HashMap<SdkTypeId, Vec<Segment>>,
}

impl<'g> PathFinder<'g> {
    fn new(graph: &'g SdkGraph) -> Self {
        Self {
            graph,
            visited: HashSet::new(),
            path: Vec::new(),
            found: HashMap::new(),
        }
    }

    fn visit(&mut self, label: &str, ty: SdkTypeId) {
        if !self.visited.insert(ty) {
            return;
        }
        self.path.push(Segment {
            label: label.to_string(),
            ty: Some(ty),
        });
        if !self.found.contains_key(&ty) {
            self.found.insert(ty, self.path.clone());
        }
        let graph = self.graph;
        match &graph.ty(ty).kind {
            SdkTypeKind::Nullable { inner } => {
                self.path.pop();
                self.visit(label, *inner);
                return;
            }
            SdkTypeKind::Union { variants } => {
                self.path.pop();
                for v in variants {
                    self.visit(label, *v);
                }
                return;
            }
            SdkTypeKind::Array { value_type } => {
                self.path.pop();
                self.visit(&singular(label), *value_type);
                return;
            }
            SdkTypeKind::Dict { value_type, .. } => {
                self.path.pop();
                self.visit(label, *value_type);
                return;
            }
            SdkTypeKind::Model(data) => {
                for p in &data.properties {
                    let property = graph.property(*p);
                    self.visit(&property.name, property.ty);
                }
                if let Some(additional) = data.additional_properties {
                    self.visit("AdditionalProperty", additional);
                }
                if let Some(base) = data.base_model {
                    self.visit(&graph.ty(base).name, base);
                }
                for sub in data.discriminated_subtypes.values() {
                    self.visit(&graph.ty(*sub).name, *sub);
                }
            }
            _ => {}
        }
        self.path.pop();
    }

    fn visit_operation(&mut self, name: &str, root: &OperationRoot<'_>) {
        let graph = self.graph;
        self.path.push(Segment {
            label: name.to_string(),
            ty: None,
        });
        if let Some(body) = root.http.body_param {
            self.visit("Request", graph.property(body).ty);
        }
        for p in &root.http.parameters {
            let property = graph.property(*p);
            self.visit(
                &format!("Request{}", property.name.to_upper_camel_case()),
                property.ty,
            );
        }
        for p in root.method_params {
            let property = graph.property(*p);
            self.visit(&property.name, property.ty);
        }
        for response in root.http.responses.iter().chain(root.http.exceptions.iter()) {
            if let Some(ty) = response.ty {
                self.visit("Response", ty);
            }
            for h in &response.headers {
                let header = graph.property(*h);
                self.visit(
                    &format!("Response{}", header.name.to_upper_camel_case()),
                    header.ty,
                );
            }
        }
        self.path.pop();
    }
}

fn name_from_path(graph: &SdkGraph, path: &[Segment]) -> String {
    let mut name = String::new();
    let last = path.len().saturating_sub(1);
    for (i, segment) in path.iter().enumerate().rev() {
        if i != last {
            if let Some(t) = segment.ty {
                let node = graph.ty(t);
                if !node.is_generated_name && !node.name.is_empty() && node.is_declaration() {
                    name.insert_str(0, &node.name);
                    return name;
                }
            }
        }
        name.insert_str(0, &segment.label.to_upper_camel_case());
    }
    name
}

fn anonymous_id(namespace: &str, path: &[Segment]) -> String {
    let labels: Vec<&str> = path.iter().map(|s| s.label.as_str()).collect();
    format!("{}.anonymous", qualified(namespace, &labels.join(".")))
}

fn fallback_name(kind: &SdkTypeKind) -> &'static str {
    match kind {
        SdkTypeKind::Enum(_) => "AnonymousEnum",
        SdkTypeKind::Union { .. } | SdkTypeKind::Nullable { .. } => "AnonymousUnion",
        SdkTypeKind::Constant { .. } => "AnonymousConstant",
        _ => "AnonymousModel",
    }
}

fn unique_name(used: &mut HashSet<String>, base: &str) -> String {
    if used.insert(base.to_string()) {
        return base.to_string();
    }
    let mut n = 1;
    loop {
        let candidate = format!("{}{}", base, n);
        if used.insert(candidate.clone()) {
            return candidate;
        }
        n += 1;
    }
}

fn needs_generated_name(kind: &SdkTypeKind) -> bool {
    matches!(
        kind,
        SdkTypeKind::Model(_)
            | SdkTypeKind::Enum(_)
            | SdkTypeKind::Union { .. }
            | SdkTypeKind::Nullable { .. }
            | SdkTypeKind::Constant { .. }
    )
}

/// Name every anonymous type, resolve conflicts with declared names and assign
/// cross-language ids.
pub(crate) fn finalize(
    ctx: &mut SdkContext<'_>,
    orphans: &[SdkTypeId],
    operations: &[OperationRoot<'_>],
) {
    let source = ctx.source;
    let mut discoveries = Vec::new();
    for orphan in orphans {
        let mut finder = PathFinder::new(&ctx.graph);
        let node = ctx.graph.ty(*orphan);
        finder.visit(&node.name, *orphan);
        discoveries.push(Discovery {
            namespace: node.namespace.clone(),
            paths: finder.found,
        });
    }
    for root in operations {
        let operation = source.operation(root.id);
        let mut finder = PathFinder::new(&ctx.graph);
        finder.visit_operation(&operation.name, root);
        discoveries.push(Discovery {
            namespace: operation.namespace.clone(),
            paths: finder.found,
        });
    }

    let targets: Vec<SdkTypeId> = ctx
        .graph
        .types()
        .filter(|(_, t)| t.is_generated_name && t.name.is_empty() && needs_generated_name(&t.kind))
        .map(|(id, _)| id)
        .collect();

    let mut cross_ids: HashMap<SdkTypeId, String> = HashMap::new();
    for target in targets {
        let raw = ctx.graph.ty(target).raw;
        if let Some(existing) = raw.and_then(|r| ctx.generated_names.get(&r)).cloned() {
            ctx.graph.ty_mut(target).name = existing;
            continue;
        }
        // Orphan roots come before operation roots.
        let found = discoveries
            .iter()
            .find_map(|d| d.paths.get(&target).map(|p| (d, p)));
        let base = match found {
            Some((discovery, path)) => {
                cross_ids.insert(target, anonymous_id(&discovery.namespace, path));
                name_from_path(&ctx.graph, path)
            }
            None => fallback_name(&ctx.graph.ty(target).kind).to_string(),
        };
        let name = unique_name(&mut ctx.used_generated_names, &base);
        tracing::trace!(ty = target.index(), name = %name, "generated name");
        if let Some(r) = raw {
            ctx.generated_names.insert(r, name.clone());
        }
        ctx.graph.ty_mut(target).name = name;
    }

    resolve_conflicting_names(ctx);
    assign_cross_language_ids(ctx, &cross_ids);
}

/// Rename generated names that collide with a user-declared name.
fn resolve_conflicting_names(ctx: &mut SdkContext<'_>) {
    let declared: HashSet<String> = ctx
        .graph
        .types()
        .filter(|(_, t)| !t.is_generated_name && t.is_declaration() && !t.name.is_empty())
        .map(|(_, t)| t.name.clone())
        .collect();
    let mut renames: HashMap<String, String> = HashMap::new();
    let ids: Vec<SdkTypeId> = ctx.graph.types().map(|(id, _)| id).collect();
    for id in ids {
        let node = ctx.graph.ty(id);
        if !node.is_generated_name || !declared.contains(&node.name) {
            continue;
        }
        let old = node.name.clone();
        let new = match renames.get(&old) {
            Some(n) => n.clone(),
            None => {
                let mut n = 1;
                let renamed = loop {
                    let candidate = format!("{}{}", old, n);
                    if !declared.contains(&candidate)
                        && ctx.used_generated_names.insert(candidate.clone())
                    {
                        break candidate;
                    }
                    n += 1;
                };
                renames.insert(old.clone(), renamed.clone());
                renamed
            }
        };
        tracing::debug!(from = %old, to = %new, "generated name conflicts with declared type");
        if let Some(r) = ctx.graph.ty(id).raw {
            ctx.generated_names.insert(r, new.clone());
        }
        ctx.graph.ty_mut(id).name = new;
    }
}

fn assign_cross_language_ids(ctx: &mut SdkContext<'_>, anonymous: &HashMap<SdkTypeId, String>) {
    let source = ctx.source;
    let ids: Vec<SdkTypeId> = ctx.graph.types().map(|(id, _)| id).collect();

    for id in &ids {
        let node = ctx.graph.ty(*id);
        if !node.is_declaration() && !matches!(node.kind, SdkTypeKind::Constant { .. }) {
            continue;
        }
        if !node.cross_language_id.is_empty() {
            continue;
        }
        let cross_id = if node.is_generated_name {
            match anonymous.get(id) {
                Some(c) => c.clone(),
                None => continue,
            }
        } else {
            let declared = node
                .raw
                .map(|r| source.name(r))
                .filter(|n| !n.is_empty())
                .unwrap_or(node.name.as_str());
            qualified(&node.namespace, declared)
        };
        ctx.graph.ty_mut(*id).cross_language_id = cross_id;
    }

    // Inner nodes of anonymous nullable wrappers share the wrapper's id.
    for id in &ids {
        if let SdkTypeKind::Nullable { inner } = ctx.graph.ty(*id).kind {
            let outer = ctx.graph.ty(*id).cross_language_id.clone();
            if ctx.graph.ty(inner).cross_language_id.is_empty() && !outer.is_empty() {
                ctx.graph.ty_mut(inner).cross_language_id = outer;
            }
        }
    }

    for id in &ids {
        let (parent, values, properties) = match &ctx.graph.ty(*id).kind {
            SdkTypeKind::Enum(data) => (
                ctx.graph.ty(*id).cross_language_id.clone(),
                data.values.clone(),
                Vec::new(),
            ),
            SdkTypeKind::Model(data) => (
                ctx.graph.ty(*id).cross_language_id.clone(),
                Vec::new(),
                data.properties.clone(),
            ),
            _ => continue,
        };
        for v in values {
            let name = ctx.graph.ty(v).name.clone();
            ctx.graph.ty_mut(v).cross_language_id = format!("{}.{}", parent, name);
        }
        for p in properties {
            let property = ctx.graph.property(p);
            if property.kind != PropertyKind::Property || !property.cross_language_id.is_empty() {
                continue;
            }
            let declared = property
                .raw
                .map(|r| source.name(r).to_string())
                .unwrap_or_else(|| property.name.clone());
            ctx.graph.property_mut(p).cross_language_id = format!("{}.{}", parent, declared);
        }
    }
}
