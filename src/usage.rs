//! Usage and access propagation over the SDK graph.
//!
//! Every usage-producing site (operation inputs and outputs, LRO result types,
//! server parameters, the version enum) calls [`propagate`] with a fresh `seen` set,
//! so one node collects contributions from many independent walks. Usage is OR-ed in
//! and never cleared. Access is most-permissive-wins unless an explicit override is
//! applied, and a public node is never narrowed to internal silently.

use std::collections::HashSet;

use tracing::{debug, trace};

use crate::context::SdkContext;
use crate::diagnostics::DiagnosticCode;
use crate::http::SdkHttpOperation;
use crate::resolver::resolve_type;
use crate::serialization::{self, is_json, is_xml};
use crate::source::{OperationId, SourceKind};
use crate::types::{Access, PropertyId, PropertyKind, SdkTypeId, SdkTypeKind, UsageFlags};

const MERGE_PATCH: &str = "application/merge-patch+json";

/// Value written by one propagation walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UsageOrAccess {
    Usage(UsageFlags),
    Access(Access),
}

impl From<UsageFlags> for UsageOrAccess {
    fn from(flags: UsageFlags) -> Self {
        UsageOrAccess::Usage(flags)
    }
}

impl From<Access> for UsageOrAccess {
    fn from(access: Access) -> Self {
        UsageOrAccess::Access(access)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropagationOptions {
    /// Follow composition edges past the root.
    pub propagation: bool,
    /// Leave the root untouched and only walk from it.
    pub skip_first: bool,
    /// Explicit per-type override rather than inferred use.
    pub is_override: bool,
}

impl Default for PropagationOptions {
    fn default() -> Self {
        Self {
            propagation: true,
            skip_first: false,
            is_override: false,
        }
    }
}

impl PropagationOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn no_propagation(mut self) -> Self {
        self.propagation = false;
        self
    }

    pub fn skip_first(mut self) -> Self {
        self.skip_first = true;
        self
    }

    pub fn overriding(mut self) -> Self {
        self.is_override = true;
        self
    }
}

/// Apply `value` to `ty` and, unless disabled, everything it reaches.
pub fn propagate(
    ctx: &mut SdkContext<'_>,
    ty: SdkTypeId,
    value: impl Into<UsageOrAccess>,
    options: PropagationOptions,
) {
    let mut walk = Walk {
        propagation: options.propagation,
        skip_first: options.skip_first,
        is_override: options.is_override,
        seen: HashSet::new(),
        ignore_subtypes: Vec::new(),
    };
    walk.visit(ctx, ty, value.into());
}

struct Walk {
    propagation: bool,
    skip_first: bool,
    is_override: bool,
    seen: HashSet<SdkTypeId>,
    /// `true` while walking up into a base model, so its other subtypes are left alone.
    ignore_subtypes: Vec<bool>,
}

impl Walk {
    fn ignoring_subtypes(&self) -> bool {
        self.ignore_subtypes.last() == Some(&true)
    }

    fn visit(&mut self, ctx: &mut SdkContext<'_>, ty: SdkTypeId, value: UsageOrAccess) {
        if self.seen.contains(&ty) {
            self.skip_first = false;
            return;
        }
        let kind = ctx.graph.ty(ty).kind.clone();
        match &kind {
            SdkTypeKind::Array { value_type } | SdkTypeKind::Dict { value_type, .. } => {
                return self.visit(ctx, *value_type, value);
            }
            SdkTypeKind::EnumValue { enum_type, .. } => {
                return self.visit(ctx, *enum_type, value);
            }
            SdkTypeKind::Model(_)
            | SdkTypeKind::Enum(_)
            | SdkTypeKind::Union { .. }
            | SdkTypeKind::Nullable { .. } => {}
            _ => return,
        }
        if !self.ignoring_subtypes() {
            self.seen.insert(ty);
        }

        if self.skip_first {
            self.skip_first = false;
            if let UsageOrAccess::Access(_) = value {
                ctx.graph.ty_mut(ty).access_set = true;
            }
        } else {
            self.apply(ctx, ty, value);
        }

        let data = match kind {
            SdkTypeKind::Enum(_) => return,
            SdkTypeKind::Union { variants } => {
                for v in variants {
                    self.visit(ctx, v, value);
                }
                return;
            }
            SdkTypeKind::Nullable { inner } => return self.visit(ctx, inner, value),
            SdkTypeKind::Model(data) => data,
            _ => return,
        };
        if !self.propagation {
            return;
        }

        if let Some(base) = data.base_model {
            self.ignore_subtypes.push(true);
            let base_discriminated = ctx
                .graph
                .model(base)
                .is_some_and(|b| b.discriminator_property.is_some());
            if ctx.options.disable_usage_access_propagation_to_base && !base_discriminated {
                self.skip_first = true;
            }
            self.visit(ctx, base, value);
            self.ignore_subtypes.pop();
        }
        if !self.ignoring_subtypes() {
            for sub in data.discriminated_subtypes.values() {
                self.ignore_subtypes.push(false);
                self.visit(ctx, *sub, value);
                self.ignore_subtypes.pop();
            }
        }
        if let Some(additional) = data.additional_properties {
            self.ignore_subtypes.push(false);
            self.visit(ctx, additional, value);
            self.ignore_subtypes.pop();
        }
        for p in data.properties {
            let property = ctx.graph.property(p);
            let property_type = property.ty;
            let property_value = match value {
                UsageOrAccess::Usage(flags) => {
                    if property.kind == PropertyKind::Property
                        && property.is_read_only()
                        && flags == UsageFlags::INPUT
                    {
                        continue;
                    }
                    value
                }
                UsageOrAccess::Access(_) => property
                    .raw
                    .and_then(|r| ctx.source.meta(r).access)
                    .map(UsageOrAccess::Access)
                    .unwrap_or(value),
            };
            self.ignore_subtypes.push(false);
            self.visit(ctx, property_type, property_value);
            self.ignore_subtypes.pop();
        }
    }

    fn apply(&self, ctx: &mut SdkContext<'_>, ty: SdkTypeId, value: UsageOrAccess) {
        match value {
            UsageOrAccess::Usage(flags) => {
                ctx.graph.ty_mut(ty).usage |= flags;
            }
            UsageOrAccess::Access(access) => {
                let node = ctx.graph.ty(ty);
                if self.is_override {
                    if access == Access::Internal
                        && node.access == Access::Public
                        && node.access_set
                    {
                        let name = node.name.clone();
                        ctx.report(
                            DiagnosticCode::ConflictAccessOverride,
                            name.clone(),
                            format!(
                                "access override `internal` on `{name}` conflicts with its use \
                                 by a public operation"
                            ),
                        );
                    } else {
                        ctx.graph.ty_mut(ty).access = access;
                    }
                } else if !node.access_set || node.access != Access::Public {
                    ctx.graph.ty_mut(ty).access = access;
                }
                ctx.graph.ty_mut(ty).access_set = true;
            }
        }
    }
}

/// Record usage, access and serialization for everything one operation touches.
pub(crate) fn update_types_from_operation(
    ctx: &mut SdkContext<'_>,
    op: OperationId,
    http: &SdkHttpOperation,
    method_params: &[PropertyId],
) {
    let source = ctx.source;
    let operation = source.operation(op);
    let convenient = operation
        .convenient
        .unwrap_or(ctx.options.generate_convenience_methods);
    let access = operation.meta.access.unwrap_or(Access::Public);
    let body_shape = operation.http.body.as_ref();
    trace!(operation = %operation.name, convenient, "updating types from operation");

    let body_property = body_shape.and_then(|b| b.property);
    let parameter_types: Vec<SdkTypeId> = method_params
        .iter()
        .chain(http.parameters.iter())
        .map(|p| ctx.graph.property(*p))
        .filter(|p| p.raw.is_none() || p.raw != body_property)
        .map(|p| p.ty)
        .collect();
    for ty in parameter_types {
        if convenient {
            propagate(ctx, ty, UsageFlags::INPUT, PropagationOptions::new());
        }
        propagate(ctx, ty, access, PropagationOptions::new());
    }

    if let Some(body) = http.body_param {
        let body_type = ctx.graph.property(body).ty;
        let content_types = match &ctx.graph.property(body).kind {
            PropertyKind::Body { content_types, .. } => content_types.clone(),
            _ => Vec::new(),
        };
        let multipart = body_shape.is_some_and(|b| b.multipart);
        let is_model = ctx.graph.model(body_type).is_some();
        if convenient {
            if body_shape.is_some_and(|b| b.is_spread()) && is_model {
                let spread_only = PropagationOptions::new().no_propagation();
                propagate(ctx, body_type, UsageFlags::SPREAD, spread_only);
                let below_root = PropagationOptions::new().skip_first();
                propagate(ctx, body_type, UsageFlags::INPUT, below_root);
            } else {
                propagate(ctx, body_type, UsageFlags::INPUT, PropagationOptions::new());
            }
            if content_types.iter().any(|c| is_json(c)) {
                propagate(ctx, body_type, UsageFlags::JSON, PropagationOptions::new());
            }
            if content_types.iter().any(|c| is_xml(c)) {
                propagate(ctx, body_type, UsageFlags::XML, PropagationOptions::new());
            }
            if content_types.iter().any(|c| c == MERGE_PATCH) {
                propagate(ctx, body_type, UsageFlags::JSON_MERGE_PATCH, PropagationOptions::new());
            }
            if multipart {
                propagate(
                    ctx,
                    body_type,
                    UsageFlags::MULTIPART_FORM_DATA,
                    PropagationOptions::new().no_propagation(),
                );
            }
            serialization::attach(ctx, body_type, &content_types);

            if is_model {
                let node = ctx.graph.ty(body_type);
                let in_multipart = node.usage.contains(UsageFlags::MULTIPART_FORM_DATA);
                let in_others = node.usage.intersects(UsageFlags::JSON | UsageFlags::XML);
                if (!multipart && in_multipart) || (multipart && in_others) {
                    let name = node.name.clone();
                    ctx.report(
                        DiagnosticCode::ConflictingMultipartModelUsage,
                        name.clone(),
                        format!(
                            "model `{name}` is used both as a multipart body and as a regular body"
                        ),
                    );
                }
            }
        }
        propagate(ctx, body_type, access, PropagationOptions::new());
    }

    let is_lro = operation.lro.is_some();
    let responses = http
        .responses
        .iter()
        .map(|r| (r, false))
        .chain(http.exceptions.iter().map(|r| (r, true)));
    for (response, is_exception) in responses {
        if let Some(ty) = response.ty {
            if convenient {
                let usage = if is_exception {
                    UsageFlags::EXCEPTION
                } else if is_lro {
                    UsageFlags::LRO_INITIAL
                } else {
                    UsageFlags::OUTPUT
                };
                propagate(ctx, ty, usage, PropagationOptions::new());
                if response.content_types.iter().any(|c| is_json(c)) {
                    propagate(ctx, ty, UsageFlags::JSON, PropagationOptions::new());
                }
                serialization::attach(ctx, ty, &response.content_types);
            }
            propagate(ctx, ty, access, PropagationOptions::new());
        }
        for header in &response.headers {
            let ty = ctx.graph.property(*header).ty;
            if convenient {
                propagate(ctx, ty, UsageFlags::OUTPUT, PropagationOptions::new());
            }
            propagate(ctx, ty, access, PropagationOptions::new());
        }
    }

    if let (Some(lro), true) = (&operation.lro, convenient) {
        let components = [
            (lro.final_result, UsageFlags::OUTPUT),
            (lro.final_envelope_result, UsageFlags::LRO_FINAL_ENVELOPE),
            (lro.polling_model, UsageFlags::LRO_POLLING),
        ];
        let json = ["application/json".to_string()];
        for (component, usage) in components {
            let Some(raw) = component.filter(|c| !source.is_never_or_void(*c)) else {
                continue;
            };
            let ty = resolve_type(ctx, raw, Some(op));
            propagate(ctx, ty, usage, PropagationOptions::new());
            propagate(ctx, ty, access, PropagationOptions::new());
            serialization::attach(ctx, ty, &json);
        }
    }
}

/// Client-level contributions that are not tied to one operation.
#[derive(Debug, Clone, Default)]
pub(crate) struct ClientUsage {
    pub server_parameter_types: Vec<SdkTypeId>,
    pub version_enum: Option<SdkTypeId>,
}

/// Finishing passes once every operation has contributed.
///
/// Returns the orphan declarations in namespace order.
pub(crate) fn handle_all_types(
    ctx: &mut SdkContext<'_>,
    clients: &[ClientUsage],
) -> Vec<SdkTypeId> {
    for client in clients {
        for ty in &client.server_parameter_types {
            propagate(ctx, *ty, UsageFlags::INPUT, PropagationOptions::new());
        }
        if let Some(versions) = client.version_enum {
            propagate(ctx, versions, UsageFlags::API_VERSION_ENUM, PropagationOptions::new());
        }
    }

    let orphans = resolve_orphans(ctx);
    for ty in &orphans {
        propagate(ctx, *ty, UsageFlags::NONE, PropagationOptions::new());
        serialization::attach(ctx, *ty, &[]);
    }

    update_access_overrides(ctx);
    update_usage_overrides(ctx);
    update_spread_models(ctx);
    debug!(
        types = ctx.graph.type_count(),
        orphans = orphans.len(),
        "usage and access propagation finished"
    );
    orphans
}

fn resolve_orphans(ctx: &mut SdkContext<'_>) -> Vec<SdkTypeId> {
    let source = ctx.source;
    let mut orphans = Vec::new();
    for namespace in &source.namespaces {
        for id in &namespace.types {
            let template = matches!(
                source.kind(*id),
                SourceKind::Model(m) if m.is_template_declaration
            );
            if template {
                continue;
            }
            orphans.push(resolve_type(ctx, *id, None));
        }
    }
    orphans
}

fn access_override(ctx: &SdkContext<'_>, ty: SdkTypeId) -> Option<Access> {
    ctx.graph.ty(ty).raw.and_then(|r| ctx.source.meta(r).access)
}

fn update_access_overrides(ctx: &mut SdkContext<'_>) {
    let referenced = ctx.referenced_types();
    for ty in &referenced {
        if !ctx.graph.ty(*ty).access_set && access_override(ctx, *ty).is_none() {
            propagate(ctx, *ty, Access::Public, PropagationOptions::new());
        }
    }
    for ty in &referenced {
        if let Some(access) = access_override(ctx, *ty) {
            propagate(ctx, *ty, access, PropagationOptions::new().overriding());
        }
    }
}

fn update_usage_overrides(ctx: &mut SdkContext<'_>) {
    for ty in ctx.referenced_types() {
        let Some(usage) = ctx
            .graph
            .ty(ty)
            .raw
            .and_then(|r| ctx.source.meta(r).usage)
        else {
            continue;
        };
        propagate(ctx, ty, usage, PropagationOptions::new().overriding());
        if usage.contains(UsageFlags::JSON) {
            serialization::attach(ctx, ty, &["application/json".to_string()]);
        }
        if usage.contains(UsageFlags::XML) {
            serialization::attach(ctx, ty, &["application/xml".to_string()]);
        }
    }
}

/// Spread-only models are an implementation detail of the method signature.
fn update_spread_models(ctx: &mut SdkContext<'_>) {
    for ty in ctx.referenced_types() {
        let node = ctx.graph.ty_mut(ty);
        if matches!(node.kind, SdkTypeKind::Model(_))
            && node.usage.contains(UsageFlags::SPREAD)
            && !node.usage.intersects(UsageFlags::INPUT | UsageFlags::OUTPUT)
        {
            node.access = Access::Internal;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{map_operation, method_parameters};
    use crate::options::SdkContextOptions;
    use crate::source::{
        HttpBodyShape, HttpOperationShape, HttpVerb, Lifecycle, SourceGraph, SourceId,
        SourceOperation,
    };

    fn pet_hierarchy(g: &mut SourceGraph) -> (SourceId, SourceId, SourceId) {
        let s = g.std_scalar("string");
        let pet = g.add_model("Pet", "Ns");
        g.meta_mut(pet).discriminator = Some("kind".into());
        let dog = g.add_model("Dog", "Ns");
        let dog_kind = g.string_literal("dog");
        g.add_property(dog, "kind", dog_kind, false);
        g.add_property(dog, "bark", s, false);
        g.extend(dog, pet);
        let cat = g.add_model("Cat", "Ns");
        let cat_kind = g.string_literal("cat");
        g.add_property(cat, "kind", cat_kind, false);
        g.extend(cat, pet);
        (pet, dog, cat)
    }

    #[test]
    fn usage_is_monotonic_and_idempotent() {
        let mut g = SourceGraph::new();
        let s = g.std_scalar("string");
        let m = g.add_model("Widget", "Ns");
        g.add_property(m, "name", s, false);
        let mut ctx = SdkContext::new(&g, SdkContextOptions::default());
        let ty = resolve_type(&mut ctx, m, None);

        propagate(&mut ctx, ty, UsageFlags::INPUT, PropagationOptions::new());
        let once = ctx.graph()[ty].usage;
        propagate(&mut ctx, ty, UsageFlags::INPUT, PropagationOptions::new());
        assert_eq!(ctx.graph()[ty].usage, once);
        propagate(&mut ctx, ty, UsageFlags::OUTPUT, PropagationOptions::new());
        propagate(&mut ctx, ty, UsageFlags::NONE, PropagationOptions::new());
        assert_eq!(ctx.graph()[ty].usage, UsageFlags::INPUT | UsageFlags::OUTPUT);
    }

    #[test]
    fn self_referential_model_terminates() {
        let mut g = SourceGraph::new();
        let node = g.add_model("Node", "Ns");
        let children = g.array_of(node);
        g.add_property(node, "children", children, true);
        let mut ctx = SdkContext::new(&g, SdkContextOptions::default());
        let ty = resolve_type(&mut ctx, node, None);
        propagate(&mut ctx, ty, UsageFlags::OUTPUT, PropagationOptions::new());
        assert!(ctx.graph()[ty].usage.contains(UsageFlags::OUTPUT));
    }

    #[test]
    fn read_only_properties_skip_input() {
        let mut g = SourceGraph::new();
        let s = g.std_scalar("string");
        let meta = g.add_model("Meta", "Ns");
        g.add_property(meta, "etag", s, false);
        let m = g.add_model("Widget", "Ns");
        let p = g.add_property(m, "meta", meta, false);
        g.meta_mut(p).visibility = Some(vec![Lifecycle::Read]);
        let mut ctx = SdkContext::new(&g, SdkContextOptions::default());
        let ty = resolve_type(&mut ctx, m, None);
        let meta_ty = resolve_type(&mut ctx, meta, None);

        propagate(&mut ctx, ty, UsageFlags::INPUT, PropagationOptions::new());
        assert!(ctx.graph()[meta_ty].usage.is_empty());
        propagate(&mut ctx, ty, UsageFlags::OUTPUT, PropagationOptions::new());
        assert_eq!(ctx.graph()[meta_ty].usage, UsageFlags::OUTPUT);
    }

    #[test]
    fn subtype_usage_does_not_leak_to_siblings() {
        let mut g = SourceGraph::new();
        let (pet, dog, cat) = pet_hierarchy(&mut g);
        let mut ctx = SdkContext::new(&g, SdkContextOptions::default());
        let pet_ty = resolve_type(&mut ctx, pet, None);
        let dog_ty = resolve_type(&mut ctx, dog, None);
        let cat_ty = resolve_type(&mut ctx, cat, None);

        propagate(&mut ctx, dog_ty, UsageFlags::INPUT, PropagationOptions::new());
        assert!(ctx.graph()[dog_ty].usage.contains(UsageFlags::INPUT));
        assert!(ctx.graph()[pet_ty].usage.contains(UsageFlags::INPUT));
        assert!(ctx.graph()[cat_ty].usage.is_empty());

        propagate(&mut ctx, pet_ty, UsageFlags::OUTPUT, PropagationOptions::new());
        assert!(ctx.graph()[cat_ty].usage.contains(UsageFlags::OUTPUT));
    }

    #[test]
    fn base_propagation_can_be_disabled_for_plain_inheritance() {
        let mut g = SourceGraph::new();
        let s = g.std_scalar("string");
        let base = g.add_model("Resource", "Ns");
        g.add_property(base, "id", s, false);
        let derived = g.add_model("Widget", "Ns");
        g.add_property(derived, "name", s, false);
        g.extend(derived, base);
        let options = SdkContextOptions::default().disable_usage_access_propagation_to_base(true);
        let mut ctx = SdkContext::new(&g, options);
        let derived_ty = resolve_type(&mut ctx, derived, None);
        let base_ty = resolve_type(&mut ctx, base, None);

        propagate(&mut ctx, derived_ty, UsageFlags::INPUT, PropagationOptions::new());
        assert!(ctx.graph()[base_ty].usage.is_empty());
    }

    #[test]
    fn skip_first_leaves_root_untouched() {
        let mut g = SourceGraph::new();
        let s = g.std_scalar("string");
        let inner = g.add_model("Inner", "Ns");
        g.add_property(inner, "x", s, false);
        let m = g.add_model("Outer", "Ns");
        g.add_property(m, "inner", inner, false);
        let mut ctx = SdkContext::new(&g, SdkContextOptions::default());
        let ty = resolve_type(&mut ctx, m, None);
        let inner_ty = resolve_type(&mut ctx, inner, None);

        propagate(&mut ctx, ty, UsageFlags::INPUT, PropagationOptions::new().skip_first());
        assert!(ctx.graph()[ty].usage.is_empty());
        assert!(ctx.graph()[inner_ty].usage.contains(UsageFlags::INPUT));
    }

    #[test]
    fn public_wins_without_override() {
        let mut g = SourceGraph::new();
        let m = g.add_model("Widget", "Ns");
        let mut ctx = SdkContext::new(&g, SdkContextOptions::default());
        let ty = resolve_type(&mut ctx, m, None);

        propagate(&mut ctx, ty, Access::Internal, PropagationOptions::new());
        assert_eq!(ctx.graph()[ty].access, Access::Internal);
        propagate(&mut ctx, ty, Access::Public, PropagationOptions::new());
        assert_eq!(ctx.graph()[ty].access, Access::Public);
        propagate(&mut ctx, ty, Access::Internal, PropagationOptions::new());
        assert_eq!(ctx.graph()[ty].access, Access::Public);
        assert!(ctx.diagnostics().is_empty());
    }

    #[test]
    fn internal_override_on_public_type_conflicts() {
        let mut g = SourceGraph::new();
        let m = g.add_model("Widget", "Ns");
        let mut ctx = SdkContext::new(&g, SdkContextOptions::default());
        let ty = resolve_type(&mut ctx, m, None);

        propagate(&mut ctx, ty, Access::Public, PropagationOptions::new());
        propagate(&mut ctx, ty, Access::Internal, PropagationOptions::new().overriding());
        assert_eq!(ctx.graph()[ty].access, Access::Public);
        let codes: Vec<_> = ctx.diagnostics().iter().map(|d| d.code).collect();
        assert_eq!(codes, vec![DiagnosticCode::ConflictAccessOverride]);
    }

    #[test]
    fn overrides_apply_to_unused_types() {
        let mut g = SourceGraph::new();
        let s = g.std_scalar("string");
        let hidden = g.add_model("Hidden", "Ns");
        g.meta_mut(hidden).access = Some(Access::Internal);
        g.meta_mut(hidden).usage = Some(UsageFlags::INPUT | UsageFlags::JSON);
        g.add_property(hidden, "name", s, false);
        g.declare("Ns", hidden);
        let shown = g.add_model("Shown", "Ns");
        g.declare("Ns", shown);
        let mut ctx = SdkContext::new(&g, SdkContextOptions::default());

        let orphans = handle_all_types(&mut ctx, &[]);
        assert_eq!(orphans.len(), 2);
        let hidden_ty = orphans[0];
        assert_eq!(ctx.graph()[hidden_ty].access, Access::Internal);
        assert_eq!(ctx.graph()[hidden_ty].usage, UsageFlags::INPUT | UsageFlags::JSON);
        assert!(ctx.graph().model(hidden_ty).unwrap().serialization_options.json.is_some());
        assert_eq!(ctx.graph()[orphans[1]].access, Access::Public);
        assert!(ctx.graph()[orphans[1]].usage.is_empty());
    }

    #[test]
    fn template_declarations_are_not_orphans() {
        let mut g = SourceGraph::new();
        let page = g.add_model("Page", "Ns");
        g.model_mut(page).unwrap().is_template_declaration = true;
        g.declare("Ns", page);
        let mut ctx = SdkContext::new(&g, SdkContextOptions::default());
        assert!(handle_all_types(&mut ctx, &[]).is_empty());
    }

    #[test]
    fn spread_only_models_become_internal() {
        let mut g = SourceGraph::new();
        let m = g.add_model("Params", "Ns");
        let mut ctx = SdkContext::new(&g, SdkContextOptions::default());
        let ty = resolve_type(&mut ctx, m, None);
        propagate(&mut ctx, ty, UsageFlags::SPREAD, PropagationOptions::new().no_propagation());
        propagate(&mut ctx, ty, Access::Public, PropagationOptions::new());
        handle_all_types(&mut ctx, &[]);
        assert_eq!(ctx.graph()[ty].access, Access::Internal);
    }

    #[test]
    fn version_enum_and_server_parameters() {
        let mut g = SourceGraph::new();
        let versions = g.enumeration("Versions", "Ns", &[("v1", None), ("v2", None)]);
        let region = g.enumeration("Region", "Ns", &[("east", None)]);
        let mut ctx = SdkContext::new(&g, SdkContextOptions::default());
        let versions_ty = resolve_type(&mut ctx, versions, None);
        let region_ty = resolve_type(&mut ctx, region, None);
        handle_all_types(
            &mut ctx,
            &[ClientUsage {
                server_parameter_types: vec![region_ty],
                version_enum: Some(versions_ty),
            }],
        );
        assert_eq!(ctx.graph()[versions_ty].usage, UsageFlags::API_VERSION_ENUM);
        assert_eq!(ctx.graph()[region_ty].usage, UsageFlags::INPUT);
    }

    fn body_operation(
        g: &mut SourceGraph,
        name: &str,
        ty: SourceId,
        content_type: &str,
        multipart: bool,
    ) -> OperationId {
        let param = g.parameter("body", ty, false);
        g.add_operation(SourceOperation {
            name: name.into(),
            namespace: "Ns".into(),
            parameters: vec![param],
            http: HttpOperationShape {
                verb: HttpVerb::Post,
                path: format!("/{name}"),
                body: Some(HttpBodyShape {
                    ty,
                    property: Some(param),
                    content_types: vec![content_type.into()],
                    multipart,
                }),
                ..Default::default()
            },
            ..Default::default()
        })
    }

    fn apply(ctx: &mut SdkContext<'_>, op: OperationId) {
        let mut params = method_parameters(ctx, op, &[]);
        let http = map_operation(ctx, op, &mut params, &[]);
        update_types_from_operation(ctx, op, &http, &params);
    }

    #[test]
    fn merge_patch_body_is_flagged() {
        let mut g = SourceGraph::new();
        let s = g.std_scalar("string");
        let patch = g.add_model("WidgetPatch", "Ns");
        g.add_property(patch, "color", s, true);
        let plain = g.add_model("Widget", "Ns");
        g.add_property(plain, "color", s, true);
        let update = body_operation(&mut g, "update", patch, "application/merge-patch+json", false);
        let create = body_operation(&mut g, "create", plain, "application/json", false);

        let mut ctx = SdkContext::new(&g, SdkContextOptions::default());
        apply(&mut ctx, update);
        apply(&mut ctx, create);
        let patch_ty = resolve_type(&mut ctx, patch, None);
        let plain_ty = resolve_type(&mut ctx, plain, None);
        assert!(ctx.graph()[patch_ty]
            .usage
            .contains(UsageFlags::INPUT | UsageFlags::JSON_MERGE_PATCH));
        assert!(!ctx.graph()[plain_ty].usage.contains(UsageFlags::JSON_MERGE_PATCH));
    }

    #[test]
    fn multipart_and_json_bodies_conflict() {
        let mut g = SourceGraph::new();
        let s = g.std_scalar("string");
        let widget = g.add_model("Widget", "Ns");
        g.add_property(widget, "name", s, false);
        let create = body_operation(&mut g, "create", widget, "application/json", false);
        let upload = body_operation(&mut g, "upload", widget, "multipart/form-data", true);

        let mut ctx = SdkContext::new(&g, SdkContextOptions::default());
        apply(&mut ctx, create);
        assert_eq!(
            ctx.diagnostics()
                .with_code(DiagnosticCode::ConflictingMultipartModelUsage)
                .count(),
            0
        );
        apply(&mut ctx, upload);
        let conflicts: Vec<&str> = ctx
            .diagnostics()
            .with_code(DiagnosticCode::ConflictingMultipartModelUsage)
            .map(|d| d.target.as_str())
            .collect();
        assert_eq!(conflicts, vec!["Widget"]);
        assert!(ctx.diagnostics().has_errors());
    }
}
