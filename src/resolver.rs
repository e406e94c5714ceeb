//! Type resolution: one source node in, one canonical SDK node out.
//!
//! Resolution is memoized through the context caches. Models are cached before their
//! properties are resolved so self-referential and mutually-referential models terminate,
//! and unions are cached before their variants for the same reason. A union that
//! contains itself through nested unions only (no model or array in between) is reported
//! as circular and replaced by an empty union.

use std::collections::HashSet;

use indexmap::IndexMap;
use serde_json::Value;

use crate::context::SdkContext;
use crate::diagnostics::DiagnosticCode;
use crate::naming::{is_api_version, library_name, wire_name};
use crate::source::{
    HttpMetadata, IndexKey, IntrinsicName, LiteralValue, OperationId, SourceEnum,
    SourceEnumMember, SourceGraph, SourceId, SourceKind, SourceModel, SourceUnion,
    SourceVariant, STD_NAMESPACE,
};
use crate::types::{
    BuiltInKind, DateTimeKind, EnumData, ModelData, PropertyId, PropertyKind, SdkModelProperty,
    SdkType, SdkTypeId, SdkTypeKind,
};

/// Resolve a source node to its canonical SDK type node.
///
/// Repeated calls with the same node return the same id, whatever path reached it.
/// Model properties resolve to the type of the property.
pub fn resolve_type(
    ctx: &mut SdkContext<'_>,
    id: SourceId,
    operation: Option<OperationId>,
) -> SdkTypeId {
    if ctx.union_stack.contains(&id) {
        return circular_union(ctx, id);
    }
    if let Some(existing) = ctx.cached(id) {
        return existing;
    }
    let source = ctx.source;
    match source.kind(id) {
        SourceKind::Intrinsic { name } => resolve_intrinsic(ctx, id, *name),
        SourceKind::Scalar { .. } => resolve_scalar(ctx, id),
        SourceKind::String { .. } | SourceKind::Number { .. } | SourceKind::Boolean { .. } => {
            resolve_literal(ctx, id)
        }
        SourceKind::Model(model) => resolve_model(ctx, id, model, operation),
        SourceKind::ModelProperty(property) => resolve_type(ctx, property.ty, operation),
        SourceKind::Enum(e) => resolve_enum(ctx, id, e),
        SourceKind::EnumMember(member) => resolve_enum_member(ctx, id, member),
        SourceKind::Union(union) => resolve_union(ctx, id, union, operation),
        SourceKind::Tuple { values } => resolve_tuple(ctx, id, values, operation),
    }
}

/// Shape of a model carrying an index signature and no declared members.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum IndexShape {
    Array(SourceId),
    Dict(SourceId),
}

/// Classify a model as array or dictionary from its indexer.
///
/// Named models with an index signature stay models (with additional properties).
pub(crate) fn index_shape(source: &SourceGraph, model: &SourceModel) -> Option<IndexShape> {
    let indexer = model.indexer?;
    if !model.properties.is_empty() {
        return None;
    }
    match indexer.key {
        IndexKey::Integer => Some(IndexShape::Array(indexer.value)),
        IndexKey::String => {
            let is_record_alias = model
                .source_model
                .and_then(|s| source.model(s))
                .is_some_and(|s| s.name == "Record");
            (model.name == "Record" && !is_record_alias).then_some(IndexShape::Dict(indexer.value))
        }
    }
}

/// Name of the first standard scalar on the `extends` chain of a scalar.
pub(crate) fn std_ancestor(source: &SourceGraph, id: SourceId) -> Option<&str> {
    let mut visited = HashSet::new();
    let mut current = id;
    loop {
        let SourceKind::Scalar {
            name,
            namespace,
            base,
        } = source.kind(current)
        else {
            return None;
        };
        if namespace == STD_NAMESPACE {
            return Some(name);
        }
        visited.insert(current);
        match base {
            Some(b) if !visited.contains(b) => current = *b,
            _ => return None,
        }
    }
}

/// JSON value for a numeric literal, integral when possible.
pub(crate) fn number_value(v: f64) -> Value {
    if v.is_finite() && v.fract() == 0.0 && v.abs() < 9.0e15 {
        Value::from(v as i64)
    } else {
        serde_json::Number::from_f64(v)
            .map(Value::Number)
            .unwrap_or(Value::Null)
    }
}

pub(crate) fn int_or_float(v: f64) -> BuiltInKind {
    if v.is_finite() && v.fract() == 0.0 {
        BuiltInKind::Int32
    } else {
        BuiltInKind::Float32
    }
}

/// Build a property node with the metadata every property kind shares.
pub(crate) fn new_property(
    ctx: &SdkContext<'_>,
    id: SourceId,
    kind: PropertyKind,
    ty: SdkTypeId,
) -> SdkModelProperty {
    let source = ctx.source;
    let meta = source.meta(id);
    let mut property = SdkModelProperty::new(kind, library_name(ctx, id), ty);
    property.serialized_name = wire_name(source, id);
    property.optional = source.property(id).is_some_and(|p| p.optional);
    property.doc = meta.doc.clone();
    property.summary = meta.summary.clone();
    property.decorators = meta.decorators.clone();
    property.raw = Some(id);
    property.visibility = meta.visibility.clone();
    property.flatten = meta.flatten;
    property.access = meta.access.unwrap_or_default();
    property.is_api_version_param = is_api_version(source, id);
    property.client_default_value = source.property(id).and_then(|p| p.default_value.clone());
    property
}

/// Resolve a model property into a `property` node, memoized per source property.
pub(crate) fn resolve_model_property(
    ctx: &mut SdkContext<'_>,
    id: SourceId,
    operation: Option<OperationId>,
) -> PropertyId {
    if let Some(existing) = ctx.property_cache.get(&id) {
        return *existing;
    }
    let source = ctx.source;
    let ty = match source.property(id) {
        Some(p) => resolve_type(ctx, p.ty, operation),
        None => ctx.builtin(BuiltInKind::Unknown),
    };
    let ty = apply_encode(ctx, id, ty, false);
    let property = new_property(ctx, id, PropertyKind::Property, ty);
    let pid = ctx.graph.push_property(property);
    ctx.property_cache.insert(id, pid);
    pid
}

/// Apply a property-level encoding hint (or the header date-time default).
///
/// The canonical scalar node is shared, so an encoded property gets its own copy.
pub(crate) fn apply_encode(
    ctx: &mut SdkContext<'_>,
    property: SourceId,
    ty: SdkTypeId,
    is_header: bool,
) -> SdkTypeId {
    let source = ctx.source;
    let hint = source.meta(property).encode.clone();
    if hint.is_none() && !is_header {
        return ty;
    }
    let scalar_encoded = ctx
        .graph
        .ty(ty)
        .raw
        .is_some_and(|r| source.meta(r).encode.is_some());
    let mut copy = ctx.graph.ty(ty).clone();
    let changed = match &mut copy.kind {
        SdkTypeKind::DateTime {
            encode, wire_type, ..
        } => match &hint {
            Some(h) => {
                *encode = h.encoding.clone();
                *wire_type = wire_type_for(ctx, &h.encoding, h.wire_type);
                true
            }
            None if is_header && !scalar_encoded && encode == "rfc3339" => {
                *encode = "rfc7231".to_string();
                true
            }
            None => false,
        },
        SdkTypeKind::Duration {
            encode, wire_type, ..
        } => match &hint {
            Some(h) => {
                *encode = h.encoding.clone();
                *wire_type = wire_type_for(ctx, &h.encoding, h.wire_type);
                true
            }
            None => false,
        },
        SdkTypeKind::BuiltIn { encode, .. } => match &hint {
            Some(h) => {
                *encode = Some(h.encoding.clone());
                true
            }
            None => false,
        },
        _ => false,
    };
    if !changed {
        return ty;
    }
    ctx.graph.push_type(copy)
}

fn wire_type_for(
    ctx: &mut SdkContext<'_>,
    encoding: &str,
    explicit: Option<SourceId>,
) -> SdkTypeId {
    if let Some(w) = explicit {
        return resolve_type(ctx, w, None);
    }
    let kind = match encoding {
        "unixTimestamp" => BuiltInKind::Int64,
        "seconds" => BuiltInKind::Float,
        _ => BuiltInKind::String,
    };
    ctx.builtin(kind)
}

// --- Internal implementation ---

fn cache_type(ctx: &mut SdkContext<'_>, id: SourceId, ty: SdkType) -> SdkTypeId {
    let tid = ctx.graph.push_type(ty);
    ctx.type_cache.insert(id, tid);
    tid
}

fn resolve_intrinsic(ctx: &mut SdkContext<'_>, id: SourceId, name: IntrinsicName) -> SdkTypeId {
    let mut ty = SdkType::new(SdkTypeKind::BuiltIn {
        builtin: BuiltInKind::Unknown,
        encode: None,
        base_type: None,
    })
    .named("unknown", STD_NAMESPACE)
    .raw(Some(id));
    ty.cross_language_id = format!("{}.unknown", STD_NAMESPACE);
    tracing::trace!(intrinsic = name.as_str(), "intrinsic resolved as unknown");
    cache_type(ctx, id, ty)
}

fn resolve_scalar(ctx: &mut SdkContext<'_>, id: SourceId) -> SdkTypeId {
    let source = ctx.source;
    let SourceKind::Scalar {
        name,
        namespace,
        base,
    } = source.kind(id)
    else {
        return ctx.builtin(BuiltInKind::Unknown);
    };
    let base_type = match base {
        Some(b) if namespace != STD_NAMESPACE => Some(resolve_type(ctx, *b, None)),
        _ => None,
    };
    let meta = source.meta(id);
    let hint = meta.encode.as_ref();
    let kind = match std_ancestor(source, id) {
        Some(ancestor @ ("utcDateTime" | "offsetDateTime")) => {
            let encode = hint
                .map(|h| h.encoding.clone())
                .unwrap_or_else(|| "rfc3339".to_string());
            let wire_type = wire_type_for(ctx, &encode, hint.and_then(|h| h.wire_type));
            SdkTypeKind::DateTime {
                datetime: if ancestor == "utcDateTime" {
                    DateTimeKind::UtcDateTime
                } else {
                    DateTimeKind::OffsetDateTime
                },
                encode,
                wire_type,
                base_type,
            }
        }
        Some("duration") => {
            let encode = hint
                .map(|h| h.encoding.clone())
                .unwrap_or_else(|| "ISO8601".to_string());
            let wire_type = wire_type_for(ctx, &encode, hint.and_then(|h| h.wire_type));
            SdkTypeKind::Duration {
                encode,
                wire_type,
                base_type,
            }
        }
        Some(ancestor) => {
            let builtin = BuiltInKind::parse(ancestor).unwrap_or(BuiltInKind::Unknown);
            let encode = hint.map(|h| h.encoding.clone()).or_else(|| {
                (builtin == BuiltInKind::Bytes).then(|| "base64".to_string())
            });
            SdkTypeKind::BuiltIn {
                builtin,
                encode,
                base_type,
            }
        }
        None => SdkTypeKind::BuiltIn {
            builtin: BuiltInKind::Unknown,
            encode: None,
            base_type,
        },
    };
    let mut ty = SdkType::new(kind)
        .named(name.clone(), namespace.clone())
        .raw(Some(id));
    ty.doc = meta.doc.clone();
    ty.summary = meta.summary.clone();
    ty.decorators = meta.decorators.clone();
    ty.cross_language_id = qualified_name(namespace, name);
    cache_type(ctx, id, ty)
}

fn resolve_literal(ctx: &mut SdkContext<'_>, id: SourceId) -> SdkTypeId {
    let source = ctx.source;
    let (value, value_kind) = match source.kind(id) {
        SourceKind::String { value } => (Value::String(value.clone()), BuiltInKind::String),
        SourceKind::Number { value } => (number_value(*value), int_or_float(*value)),
        SourceKind::Boolean { value } => (Value::Bool(*value), BuiltInKind::Boolean),
        _ => return ctx.builtin(BuiltInKind::Unknown),
    };
    let value_type = ctx.builtin(value_kind);
    let mut ty = SdkType::new(SdkTypeKind::Constant { value, value_type }).raw(Some(id));
    ty.is_generated_name = true;
    cache_type(ctx, id, ty)
}

fn resolve_model(
    ctx: &mut SdkContext<'_>,
    id: SourceId,
    model: &SourceModel,
    operation: Option<OperationId>,
) -> SdkTypeId {
    let source = ctx.source;
    let saved_unions = std::mem::take(&mut ctx.union_stack);
    let tid = match index_shape(source, model) {
        Some(IndexShape::Array(item)) => resolve_array(ctx, id, item, operation),
        Some(IndexShape::Dict(value)) => resolve_dict(ctx, id, value, operation),
        None => resolve_model_type(ctx, id, model, operation),
    };
    ctx.union_stack = saved_unions;
    tid
}

fn resolve_model_type(
    ctx: &mut SdkContext<'_>,
    id: SourceId,
    model: &SourceModel,
    operation: Option<OperationId>,
) -> SdkTypeId {
    let source = ctx.source;
    let meta = source.meta(id);
    let mut ty = SdkType::new(SdkTypeKind::Model(ModelData::default()))
        .named(library_name(ctx, id), model.namespace.clone())
        .raw(Some(id));
    ty.is_generated_name = ty.name.is_empty();
    ty.doc = meta.doc.clone();
    ty.summary = meta.summary.clone();
    ty.decorators = meta.decorators.clone();
    let tid = ctx.graph.push_type(ty);
    ctx.referenced.insert(id, tid);
    tracing::trace!(model = %model.name, id = %id, "resolving model");

    if let Some(indexer) = model.indexer {
        let additional = resolve_type(ctx, indexer.value, operation);
        if let Some(data) = ctx.graph.model_mut(tid) {
            data.additional_properties = Some(additional);
        }
    }

    for prop in &model.properties {
        if is_metadata_only(source, *prop) {
            continue;
        }
        let pid = resolve_model_property(ctx, *prop, operation);
        if let Some(data) = ctx.graph.model_mut(tid) {
            data.properties.push(pid);
        }
    }

    if let Some(base) = model.base_model {
        let base_shape = source.model(base).and_then(|b| index_shape(source, b));
        match base_shape {
            Some(IndexShape::Dict(value)) => {
                let additional = resolve_type(ctx, value, operation);
                if let Some(data) = ctx.graph.model_mut(tid) {
                    data.additional_properties = Some(additional);
                }
            }
            _ => {
                let base_type = resolve_type(ctx, base, operation);
                if ctx.graph.model(base_type).is_some() {
                    if let Some(data) = ctx.graph.model_mut(tid) {
                        data.base_model = Some(base_type);
                    }
                }
            }
        }
    }

    add_discriminator(ctx, id, tid, model, operation);
    ctx.referenced.insert(id, tid);
    tid
}

/// Status-code, never/void and invisible properties never reach a model's property list.
fn is_metadata_only(source: &SourceGraph, prop: SourceId) -> bool {
    let meta = source.meta(prop);
    if matches!(meta.http, Some(HttpMetadata::StatusCode)) || meta.is_invisible() {
        return true;
    }
    source
        .property(prop)
        .is_some_and(|p| source.is_never_or_void(p.ty))
}

fn resolve_array(
    ctx: &mut SdkContext<'_>,
    id: SourceId,
    item: SourceId,
    operation: Option<OperationId>,
) -> SdkTypeId {
    let value_type = resolve_type(ctx, item, operation);
    if let Some(existing) = ctx.type_cache.get(&id) {
        return *existing;
    }
    let mut ty = SdkType::new(SdkTypeKind::Array { value_type })
        .named("Array", STD_NAMESPACE)
        .raw(Some(id));
    ty.cross_language_id = format!("{}.Array", STD_NAMESPACE);
    cache_type(ctx, id, ty)
}

fn resolve_dict(
    ctx: &mut SdkContext<'_>,
    id: SourceId,
    value: SourceId,
    operation: Option<OperationId>,
) -> SdkTypeId {
    let value_type = resolve_type(ctx, value, operation);
    if let Some(existing) = ctx.type_cache.get(&id) {
        return *existing;
    }
    let key_type = ctx.builtin(BuiltInKind::String);
    let mut ty = SdkType::new(SdkTypeKind::Dict {
        key_type,
        value_type,
    })
    .named("Record", STD_NAMESPACE)
    .raw(Some(id));
    ty.cross_language_id = format!("{}.Record", STD_NAMESPACE);
    cache_type(ctx, id, ty)
}

fn resolve_tuple(
    ctx: &mut SdkContext<'_>,
    id: SourceId,
    values: &[SourceId],
    operation: Option<OperationId>,
) -> SdkTypeId {
    let value_types = values
        .iter()
        .map(|v| resolve_type(ctx, *v, operation))
        .collect();
    if let Some(existing) = ctx.type_cache.get(&id) {
        return *existing;
    }
    let ty = SdkType::new(SdkTypeKind::Tuple { value_types }).raw(Some(id));
    cache_type(ctx, id, ty)
}

fn resolve_enum(ctx: &mut SdkContext<'_>, id: SourceId, e: &SourceEnum) -> SdkTypeId {
    let source = ctx.source;
    let meta = source.meta(id);
    let placeholder = ctx.builtin(BuiltInKind::String);
    let mut ty = SdkType::new(SdkTypeKind::Enum(EnumData {
        value_type: placeholder,
        values: Vec::new(),
        is_fixed: true,
        is_flags: false,
        is_union_as_enum: false,
        api_versions: Vec::new(),
    }))
    .named(library_name(ctx, id), e.namespace.clone())
    .raw(Some(id));
    ty.doc = meta.doc.clone();
    ty.summary = meta.summary.clone();
    ty.decorators = meta.decorators.clone();
    let tid = ctx.graph.push_type(ty);
    ctx.referenced.insert(id, tid);

    let mut members = Vec::new();
    for member in &e.members {
        let SourceKind::EnumMember(m) = source.kind(*member) else {
            continue;
        };
        members.push((*member, member_value(m)));
    }
    let value_type = value_type_for(ctx, members.iter().map(|(_, v)| v));
    let mut values = Vec::new();
    for (member, value) in members {
        let name = library_name(ctx, member);
        let vid = push_enum_value(ctx, tid, value_type, name, value, Some(member));
        ctx.type_cache.insert(member, vid);
        values.push(vid);
    }
    if let SdkTypeKind::Enum(data) = &mut ctx.graph.ty_mut(tid).kind {
        data.value_type = value_type;
        data.values = values;
    }
    tid
}

fn member_value(member: &SourceEnumMember) -> Value {
    match &member.value {
        Some(LiteralValue::String(s)) => Value::String(s.clone()),
        Some(LiteralValue::Number(n)) => number_value(*n),
        None => Value::String(member.name.clone()),
    }
}

/// `string` if any value is a string, else `int32` or `float32`.
fn value_type_for<'v>(
    ctx: &mut SdkContext<'_>,
    values: impl Iterator<Item = &'v Value> + Clone,
) -> SdkTypeId {
    let any_string = values.clone().any(Value::is_string);
    let mut empty = true;
    let mut integral = true;
    for v in values {
        empty = false;
        if let Some(f) = v.as_f64() {
            if f.fract() != 0.0 {
                integral = false;
            }
        }
    }
    let kind = if any_string || empty {
        BuiltInKind::String
    } else if integral {
        BuiltInKind::Int32
    } else {
        BuiltInKind::Float32
    };
    ctx.builtin(kind)
}

fn push_enum_value(
    ctx: &mut SdkContext<'_>,
    enum_type: SdkTypeId,
    value_type: SdkTypeId,
    name: String,
    value: Value,
    raw: Option<SourceId>,
) -> SdkTypeId {
    let source = ctx.source;
    let namespace = ctx.graph.ty(enum_type).namespace.clone();
    let mut ty = SdkType::new(SdkTypeKind::EnumValue {
        value,
        enum_type,
        value_type,
    })
    .named(name, namespace)
    .raw(raw);
    if let Some(r) = raw {
        ty.doc = source.meta(r).doc.clone();
    }
    ctx.graph.push_type(ty)
}

fn resolve_enum_member(
    ctx: &mut SdkContext<'_>,
    id: SourceId,
    member: &SourceEnumMember,
) -> SdkTypeId {
    resolve_type(ctx, member.enum_type, None);
    match ctx.type_cache.get(&id) {
        Some(v) => *v,
        None => ctx.builtin(BuiltInKind::Unknown),
    }
}

fn empty_union(ctx: &mut SdkContext<'_>, id: SourceId) -> SdkTypeId {
    let source = ctx.source;
    let mut ty = SdkType::new(SdkTypeKind::Union {
        variants: Vec::new(),
    })
    .named(library_name(ctx, id), source.kind(id).namespace())
    .raw(Some(id));
    ty.is_generated_name = ty.name.is_empty();
    ctx.graph.push_type(ty)
}

fn circular_union(ctx: &mut SdkContext<'_>, id: SourceId) -> SdkTypeId {
    let name = display_name(ctx.source, id);
    ctx.report(
        DiagnosticCode::UnionCircular,
        name.clone(),
        format!("union {} contains itself", name),
    );
    empty_union(ctx, id)
}

fn display_name(source: &SourceGraph, id: SourceId) -> String {
    let name = source.name(id);
    if name.is_empty() {
        format!("anonymous union {}", id)
    } else {
        name.to_string()
    }
}

fn resolve_union(
    ctx: &mut SdkContext<'_>,
    id: SourceId,
    union: &SourceUnion,
    operation: Option<OperationId>,
) -> SdkTypeId {
    let source = ctx.source;
    let mut has_null = false;
    let mut seen = HashSet::new();
    let mut non_null: Vec<&SourceVariant> = Vec::new();
    for variant in &union.variants {
        if source.is_null(variant.ty) {
            has_null = true;
        } else if seen.insert(variant.ty) {
            non_null.push(variant);
        }
    }

    if non_null.is_empty() {
        let name = display_name(source, id);
        ctx.report(
            DiagnosticCode::UnionNull,
            name.clone(),
            format!("union {} only contains null", name),
        );
        let empty = empty_union(ctx, id);
        ctx.referenced.insert(id, empty);
        return empty;
    }

    ctx.union_stack.push(id);
    let result = if non_null.len() == 1 && has_null {
        let placeholder = ctx.builtin(BuiltInKind::Unknown);
        let nullable = push_union_shell(
            ctx,
            id,
            SdkTypeKind::Nullable { inner: placeholder },
        );
        ctx.referenced.insert(id, nullable);
        let inner = resolve_type(ctx, non_null[0].ty, operation);
        ctx.graph.ty_mut(nullable).kind = SdkTypeKind::Nullable { inner };
        nullable
    } else {
        let may_flatten = ctx.options.flatten_union_as_enum
            || !non_null.iter().any(|v| {
                matches!(source.kind(v.ty), SourceKind::Union(_) | SourceKind::Enum(_))
            });
        let as_enum = if may_flatten {
            union_as_enum(ctx, id, &non_null)
        } else {
            None
        };
        match as_enum {
            Some(enum_type) => {
                let result = if has_null {
                    ctx.extra_referenced.push(enum_type);
                    push_union_shell(
                        ctx,
                        id,
                        SdkTypeKind::Nullable { inner: enum_type },
                    )
                } else {
                    enum_type
                };
                ctx.referenced.insert(id, result);
                result
            }
            None => {
                let union_type = push_union_shell(
                    ctx,
                    id,
                    SdkTypeKind::Union {
                        variants: Vec::new(),
                    },
                );
                let result = if has_null {
                    ctx.extra_referenced.push(union_type);
                    push_union_shell(
                        ctx,
                        id,
                        SdkTypeKind::Nullable { inner: union_type },
                    )
                } else {
                    union_type
                };
                ctx.referenced.insert(id, result);
                let variants = non_null
                    .iter()
                    .map(|v| resolve_type(ctx, v.ty, operation))
                    .collect();
                ctx.graph.ty_mut(union_type).kind = SdkTypeKind::Union { variants };
                result
            }
        }
    };
    ctx.union_stack.pop();
    result
}

fn push_union_shell(
    ctx: &mut SdkContext<'_>,
    id: SourceId,
    kind: SdkTypeKind,
) -> SdkTypeId {
    let source = ctx.source;
    let meta = source.meta(id);
    let mut ty = SdkType::new(kind)
        .named(library_name(ctx, id), source.kind(id).namespace())
        .raw(Some(id));
    ty.is_generated_name = ty.name.is_empty();
    ty.doc = meta.doc.clone();
    ty.summary = meta.summary.clone();
    ty.decorators = meta.decorators.clone();
    let tid = ctx.graph.push_type(ty);
    tid
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LiteralFamily {
    String,
    Number,
}

/// Record the family of the next literal; `false` when it differs from the previous ones.
fn join(family: &mut Option<LiteralFamily>, next: LiteralFamily) -> bool {
    if matches!(*family, Some(f) if f != next) {
        return false;
    }
    *family = Some(next);
    true
}

/// Build an enum from a union whose variants are all literals of one family.
fn union_as_enum(
    ctx: &mut SdkContext<'_>,
    id: SourceId,
    variants: &[&SourceVariant],
) -> Option<SdkTypeId> {
    let source = ctx.source;
    let flatten = ctx.options.flatten_union_as_enum;
    let mut family: Option<LiteralFamily> = None;
    let mut open_scalar: Option<SourceId> = None;
    let mut entries: Vec<(String, Value, Option<SourceId>)> = Vec::new();
    let mut visited = HashSet::new();
    let mut pending: Vec<(Option<String>, SourceId)> =
        variants.iter().rev().map(|v| (v.name.clone(), v.ty)).collect();

    while let Some((name, ty)) = pending.pop() {
        match source.kind(ty) {
            SourceKind::String { value } => {
                if !join(&mut family, LiteralFamily::String) {
                    return None;
                }
                entries.push((
                    name.unwrap_or_else(|| value.clone()),
                    Value::String(value.clone()),
                    None,
                ));
            }
            SourceKind::Number { value } => {
                if !join(&mut family, LiteralFamily::Number) {
                    return None;
                }
                let v = number_value(*value);
                entries.push((name.unwrap_or_else(|| v.to_string()), v, None));
            }
            SourceKind::Scalar { .. } => {
                let scalar_family = match std_ancestor(source, ty) {
                    Some("string") => LiteralFamily::String,
                    Some(n) if BuiltInKind::parse(n).is_some_and(|k| k.is_numeric()) => {
                        LiteralFamily::Number
                    }
                    _ => return None,
                };
                if !join(&mut family, scalar_family) {
                    return None;
                }
                open_scalar = Some(ty);
            }
            SourceKind::EnumMember(m) => {
                let value = member_value(m);
                let f = if value.is_string() {
                    LiteralFamily::String
                } else {
                    LiteralFamily::Number
                };
                if !join(&mut family, f) {
                    return None;
                }
                entries.push((m.name.clone(), value, Some(ty)));
            }
            SourceKind::Enum(e) if flatten => {
                for member in &e.members {
                    if let SourceKind::EnumMember(m) = source.kind(*member) {
                        let value = member_value(m);
                        let f = if value.is_string() {
                            LiteralFamily::String
                        } else {
                            LiteralFamily::Number
                        };
                        if !join(&mut family, f) {
                            return None;
                        }
                        entries.push((m.name.clone(), value, Some(*member)));
                    }
                }
            }
            SourceKind::Union(u) if flatten => {
                if !visited.insert(ty) {
                    return None;
                }
                for v in u.variants.iter().rev() {
                    if !source.is_null(v.ty) {
                        pending.push((v.name.clone(), v.ty));
                    }
                }
            }
            _ => return None,
        }
    }
    if entries.is_empty() {
        return None;
    }

    let value_type = match open_scalar {
        Some(scalar) => resolve_type(ctx, scalar, None),
        None => value_type_for(ctx, entries.iter().map(|(_, v, _)| v)),
    };
    let enum_type = push_union_shell(
        ctx,
        id,
        SdkTypeKind::Enum(EnumData {
            value_type,
            values: Vec::new(),
            is_fixed: open_scalar.is_none(),
            is_flags: false,
            is_union_as_enum: true,
            api_versions: Vec::new(),
        }),
    );
    let mut values = Vec::new();
    let mut seen_values = HashSet::new();
    for (name, value, raw) in entries {
        if !seen_values.insert(value.to_string()) {
            continue;
        }
        values.push(push_enum_value(ctx, enum_type, value_type, name, value, raw));
    }
    if let SdkTypeKind::Enum(data) = &mut ctx.graph.ty_mut(enum_type).kind {
        data.values = values;
    }
    Some(enum_type)
}

/// Link discriminated subtypes and the discriminator property of a base model.
fn add_discriminator(
    ctx: &mut SdkContext<'_>,
    id: SourceId,
    tid: SdkTypeId,
    model: &SourceModel,
    operation: Option<OperationId>,
) {
    let source = ctx.source;
    let Some(discriminator) = source.meta(id).discriminator.clone() else {
        return;
    };
    let model_name = ctx.graph.ty(tid).name.clone();
    let base_property = own_property(ctx, tid, &discriminator);
    let base_enum = base_property
        .map(|p| ctx.graph.strip_nullable(ctx.graph.property(p).ty))
        .filter(|t| matches!(ctx.graph.ty(*t).kind, SdkTypeKind::Enum(_)));

    let mut subtypes = IndexMap::new();
    let mut synthesized_type = None;
    let mut synthesized_wire_name = None;
    for derived in &model.derived_models {
        let child = resolve_type(ctx, *derived, operation);
        let Some(pid) = own_property(ctx, child, &discriminator) else {
            continue;
        };
        let child_name = ctx.graph.ty(child).name.clone();
        let pty = ctx.graph.property(pid).ty;
        let (value, value_type, is_constant) = match &ctx.graph.ty(pty).kind {
            SdkTypeKind::Constant { value, value_type } => (value.clone(), *value_type, true),
            SdkTypeKind::EnumValue {
                value, enum_type, ..
            } => (value.clone(), *enum_type, false),
            _ => {
                ctx.report(
                    DiagnosticCode::DiscriminatorNotConstant,
                    format!("{}.{}", child_name, discriminator),
                    format!(
                        "discriminator property {} of {} must be a constant or enum member",
                        discriminator, child_name
                    ),
                );
                continue;
            }
        };
        let Value::String(text) = value else {
            ctx.report(
                DiagnosticCode::DiscriminatorNotString,
                format!("{}.{}", child_name, discriminator),
                format!("discriminator value of {} is not a string", child_name),
            );
            continue;
        };

        if let (Some(enum_type), true) = (base_enum, is_constant) {
            let matching = match &ctx.graph.ty(enum_type).kind {
                SdkTypeKind::Enum(data) => data.values.iter().copied().find(|v| {
                    matches!(
                        &ctx.graph.ty(*v).kind,
                        SdkTypeKind::EnumValue { value, .. }
                            if value.as_str() == Some(text.as_str())
                    )
                }),
                _ => None,
            };
            if let Some(enum_value) = matching {
                ctx.graph.property_mut(pid).ty = enum_value;
            }
        }

        ctx.graph.property_mut(pid).discriminator = true;
        if let Some(data) = ctx.graph.model_mut(child) {
            data.discriminator_value = Some(text.clone());
        }
        if synthesized_type.is_none() {
            synthesized_type = Some(value_type);
            synthesized_wire_name = Some(ctx.graph.property(pid).serialized_name.clone());
        }
        subtypes.insert(text, child);
    }

    let discriminator_property = match base_property {
        Some(p) => {
            ctx.graph.property_mut(p).discriminator = true;
            p
        }
        None => {
            let ty = match synthesized_type {
                Some(t) => t,
                None => ctx.builtin(BuiltInKind::String),
            };
            let mut property =
                SdkModelProperty::new(PropertyKind::Property, discriminator.clone(), ty);
            property.serialized_name =
                synthesized_wire_name.unwrap_or_else(|| discriminator.clone());
            property.discriminator = true;
            property.doc = Some(format!("Discriminator property for {}.", model_name));
            let pid = ctx.graph.push_property(property);
            if let Some(data) = ctx.graph.model_mut(tid) {
                data.properties.insert(0, pid);
            }
            pid
        }
    };
    tracing::trace!(
        model = %model_name,
        subtypes = subtypes.len(),
        "discriminator linked"
    );
    if let Some(data) = ctx.graph.model_mut(tid) {
        data.discriminator_property = Some(discriminator_property);
        data.discriminated_subtypes = subtypes;
    }
}

/// A model's own property whose declared name is `name`.
fn own_property(ctx: &SdkContext<'_>, model: SdkTypeId, name: &str) -> Option<PropertyId> {
    let source = ctx.source;
    let data = ctx.graph.model(model)?;
    data.properties.iter().copied().find(|p| {
        let property = ctx.graph.property(*p);
        match property.raw {
            Some(raw) => source.name(raw) == name,
            None => property.name == name,
        }
    })
}

fn qualified_name(namespace: &str, name: &str) -> String {
    if namespace.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", namespace, name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::SdkContextOptions;
    use crate::source::{EncodeHint, Indexer, SourceGraph};

    fn ctx(source: &SourceGraph) -> SdkContext<'_> {
        SdkContext::new(source, SdkContextOptions::default())
    }

    #[test]
    fn scalar_resolution_is_memoized() {
        let mut g = SourceGraph::new();
        let s = g.std_scalar("string");
        let mut ctx = ctx(&g);
        let a = resolve_type(&mut ctx, s, None);
        let b = resolve_type(&mut ctx, s, None);
        assert_eq!(a, b);
        assert!(matches!(
            ctx.graph()[a].kind,
            SdkTypeKind::BuiltIn {
                builtin: BuiltInKind::String,
                ..
            }
        ));
    }

    #[test]
    fn custom_scalar_walks_extends_chain() {
        let mut g = SourceGraph::new();
        let int32 = g.std_scalar("int32");
        let age = g.scalar("Age", "Ns", Some(int32));
        let mut ctx = ctx(&g);
        let ty = resolve_type(&mut ctx, age, None);
        let node = &ctx.graph()[ty];
        assert_eq!(node.name, "Age");
        assert_eq!(node.cross_language_id, "Ns.Age");
        match node.kind {
            SdkTypeKind::BuiltIn {
                builtin, base_type, ..
            } => {
                assert_eq!(builtin, BuiltInKind::Int32);
                assert_eq!(base_type, Some(resolve_type(&mut ctx, int32, None)));
            }
            ref other => panic!("unexpected {}", other.kind_name()),
        }
    }

    #[test]
    fn unknown_leaf_scalar_is_unknown() {
        let mut g = SourceGraph::new();
        let odd = g.scalar("Odd", "Ns", None);
        let mut ctx = ctx(&g);
        let ty = resolve_type(&mut ctx, odd, None);
        assert!(matches!(
            ctx.graph()[ty].kind,
            SdkTypeKind::BuiltIn {
                builtin: BuiltInKind::Unknown,
                ..
            }
        ));
        assert!(ctx.diagnostics().is_empty());
    }

    #[test]
    fn datetime_defaults() {
        let mut g = SourceGraph::new();
        let utc = g.std_scalar("utcDateTime");
        let dur = g.std_scalar("duration");
        let mut ctx = ctx(&g);
        let t = resolve_type(&mut ctx, utc, None);
        match &ctx.graph()[t].kind {
            SdkTypeKind::DateTime {
                encode, datetime, ..
            } => {
                assert_eq!(encode, "rfc3339");
                assert_eq!(*datetime, DateTimeKind::UtcDateTime);
            }
            other => panic!("unexpected {}", other.kind_name()),
        }
        let d = resolve_type(&mut ctx, dur, None);
        assert!(matches!(
            &ctx.graph()[d].kind,
            SdkTypeKind::Duration { encode, .. } if encode == "ISO8601"
        ));
    }

    #[test]
    fn unix_timestamp_encoding_on_property_copies_node() {
        let mut g = SourceGraph::new();
        let utc = g.std_scalar("utcDateTime");
        let m = g.add_model("Event", "Ns");
        let plain = g.add_property(m, "created", utc, false);
        let encoded = g.add_property(m, "expires", utc, false);
        g.meta_mut(encoded).encode = Some(EncodeHint {
            encoding: "unixTimestamp".into(),
            wire_type: None,
        });
        let mut ctx = ctx(&g);
        let plain_prop = resolve_model_property(&mut ctx, plain, None);
        let encoded_prop = resolve_model_property(&mut ctx, encoded, None);
        let canonical = resolve_type(&mut ctx, utc, None);
        assert_eq!(ctx.graph()[plain_prop].ty, canonical);
        let encoded_ty = ctx.graph()[encoded_prop].ty;
        assert_ne!(encoded_ty, canonical);
        match &ctx.graph()[encoded_ty].kind {
            SdkTypeKind::DateTime {
                encode, wire_type, ..
            } => {
                assert_eq!(encode, "unixTimestamp");
                assert!(matches!(
                    ctx.graph()[*wire_type].kind,
                    SdkTypeKind::BuiltIn {
                        builtin: BuiltInKind::Int64,
                        ..
                    }
                ));
            }
            other => panic!("unexpected {}", other.kind_name()),
        }
    }

    #[test]
    fn literals_become_constants() {
        let mut g = SourceGraph::new();
        let s = g.string_literal("dog");
        let n = g.number_literal(1.5);
        let i = g.number_literal(3.0);
        let mut ctx = ctx(&g);
        let st = resolve_type(&mut ctx, s, None);
        let nt = resolve_type(&mut ctx, n, None);
        let it = resolve_type(&mut ctx, i, None);
        let float32 = ctx.builtin(BuiltInKind::Float32);
        let int32 = ctx.builtin(BuiltInKind::Int32);
        assert!(matches!(
            &ctx.graph()[st].kind,
            SdkTypeKind::Constant { value, .. } if value == "dog"
        ));
        assert!(matches!(
            &ctx.graph()[nt].kind,
            SdkTypeKind::Constant { value_type, .. } if *value_type == float32
        ));
        assert!(matches!(
            &ctx.graph()[it].kind,
            SdkTypeKind::Constant { value, value_type } if *value_type == int32 && value == 3
        ));
    }

    #[test]
    fn array_and_dict_classification() {
        let mut g = SourceGraph::new();
        let s = g.std_scalar("string");
        let arr = g.array_of(s);
        let rec = g.record_of(s);
        let mut ctx = ctx(&g);
        let a = resolve_type(&mut ctx, arr, None);
        let d = resolve_type(&mut ctx, rec, None);
        let st = resolve_type(&mut ctx, s, None);
        assert!(matches!(
            ctx.graph()[a].kind,
            SdkTypeKind::Array { value_type } if value_type == st
        ));
        assert!(matches!(
            ctx.graph()[d].kind,
            SdkTypeKind::Dict { value_type, .. } if value_type == st
        ));
        assert_eq!(resolve_type(&mut ctx, arr, None), a);
    }

    #[test]
    fn named_model_with_indexer_gets_additional_properties() {
        let mut g = SourceGraph::new();
        let s = g.std_scalar("string");
        let m = g.add_model("Bag", "Ns");
        g.model_mut(m).unwrap().indexer = Some(Indexer {
            key: IndexKey::String,
            value: s,
        });
        let mut ctx = ctx(&g);
        let ty = resolve_type(&mut ctx, m, None);
        let st = resolve_type(&mut ctx, s, None);
        let data = ctx.graph().model(ty).expect("model");
        assert_eq!(data.additional_properties, Some(st));
    }

    #[test]
    fn extending_record_gives_additional_properties() {
        let mut g = SourceGraph::new();
        let s = g.std_scalar("string");
        let rec = g.record_of(s);
        let m = g.add_model("Extra", "Ns");
        let name = g.add_property(m, "name", s, false);
        let _ = name;
        g.model_mut(m).unwrap().base_model = Some(rec);
        let mut ctx = ctx(&g);
        let ty = resolve_type(&mut ctx, m, None);
        let data = ctx.graph().model(ty).expect("model");
        assert!(data.base_model.is_none());
        assert!(data.additional_properties.is_some());
    }

    #[test]
    fn self_referential_model_terminates() {
        let mut g = SourceGraph::new();
        let node = g.add_model("Node", "Ns");
        let children = g.array_of(node);
        g.add_property(node, "children", children, true);
        g.add_property(node, "parent", node, true);
        let mut ctx = ctx(&g);
        let ty = resolve_type(&mut ctx, node, None);
        let props = ctx.graph().model_properties(ty);
        assert_eq!(props.len(), 2);
        assert_eq!(ctx.graph()[props[1]].ty, ty);
        let arr = ctx.graph()[props[0]].ty;
        assert!(matches!(
            ctx.graph()[arr].kind,
            SdkTypeKind::Array { value_type } if value_type == ty
        ));
    }

    #[test]
    fn metadata_properties_are_stripped() {
        let mut g = SourceGraph::new();
        let s = g.std_scalar("string");
        let int32 = g.std_scalar("int32");
        let never = g.intrinsic(IntrinsicName::Never);
        let m = g.add_model("Resp", "Ns");
        g.add_property(m, "name", s, false);
        let code = g.add_property(m, "code", int32, false);
        g.meta_mut(code).http = Some(HttpMetadata::StatusCode);
        g.add_property(m, "gone", never, false);
        let hidden = g.add_property(m, "hidden", s, false);
        g.meta_mut(hidden).visibility = Some(vec![]);
        let mut ctx = ctx(&g);
        let ty = resolve_type(&mut ctx, m, None);
        let props = ctx.graph().model_properties(ty);
        assert_eq!(props.len(), 1);
        assert_eq!(ctx.graph()[props[0]].name, "name");
    }

    #[test]
    fn enum_value_type_inference() {
        let mut g = SourceGraph::new();
        let colors = g.enumeration("Color", "Ns", &[("Red", None), ("Blue", None)]);
        let levels = g.enumeration(
            "Level",
            "Ns",
            &[
                ("Low", Some(LiteralValue::Number(1.0))),
                ("High", Some(LiteralValue::Number(2.0))),
            ],
        );
        let mut ctx = ctx(&g);
        let c = resolve_type(&mut ctx, colors, None);
        let l = resolve_type(&mut ctx, levels, None);
        let string = ctx.builtin(BuiltInKind::String);
        let int32 = ctx.builtin(BuiltInKind::Int32);
        match (&ctx.graph()[c].kind, &ctx.graph()[l].kind) {
            (SdkTypeKind::Enum(cd), SdkTypeKind::Enum(ld)) => {
                assert_eq!(cd.value_type, string);
                assert_eq!(ld.value_type, int32);
                assert_eq!(cd.values.len(), 2);
                assert!(cd.is_fixed);
            }
            _ => panic!("expected enums"),
        }
    }

    #[test]
    fn enum_member_resolves_to_value() {
        let mut g = SourceGraph::new();
        let colors = g.enumeration("Color", "Ns", &[("Red", None)]);
        let member = match g.kind(colors) {
            SourceKind::Enum(e) => e.members[0],
            _ => unreachable!(),
        };
        let mut ctx = ctx(&g);
        let v = resolve_type(&mut ctx, member, None);
        let e = resolve_type(&mut ctx, colors, None);
        assert!(matches!(
            &ctx.graph()[v].kind,
            SdkTypeKind::EnumValue { enum_type, value, .. } if *enum_type == e && value == "Red"
        ));
    }

    #[test]
    fn nullable_union_wraps_canonical_node() {
        let mut g = SourceGraph::new();
        let s = g.std_scalar("string");
        let null = g.null();
        let u = g.union("", "", &[s, null]);
        let mut ctx = ctx(&g);
        let ty = resolve_type(&mut ctx, u, None);
        let st = resolve_type(&mut ctx, s, None);
        assert!(matches!(ctx.graph()[ty].kind, SdkTypeKind::Nullable { inner } if inner == st));
        assert_eq!(resolve_type(&mut ctx, u, None), ty);
    }

    #[test]
    fn only_null_union_reports() {
        let mut g = SourceGraph::new();
        let null = g.null();
        let u = g.union("Nothing", "Ns", &[null]);
        let mut ctx = ctx(&g);
        let ty = resolve_type(&mut ctx, u, None);
        assert!(matches!(
            &ctx.graph()[ty].kind,
            SdkTypeKind::Union { variants } if variants.is_empty()
        ));
        assert_eq!(
            ctx.diagnostics().with_code(DiagnosticCode::UnionNull).count(),
            1
        );
    }

    #[test]
    fn directly_nested_circular_union_reports() {
        let mut g = SourceGraph::new();
        let s = g.std_scalar("string");
        let int32 = g.std_scalar("int32");
        let u = g.union("Loop", "Ns", &[s, int32]);
        if let SourceKind::Union(union) = &mut g.nodes[u.0 as usize].kind {
            union.variants.push(crate::source::SourceVariant { name: None, ty: u });
        }
        let options = SdkContextOptions::default().flatten_union_as_enum(false);
        let mut ctx = SdkContext::new(&g, options);
        let ty = resolve_type(&mut ctx, u, None);
        assert_eq!(
            ctx.diagnostics().with_code(DiagnosticCode::UnionCircular).count(),
            1
        );
        match &ctx.graph()[ty].kind {
            SdkTypeKind::Union { variants } => {
                assert_eq!(variants.len(), 3);
                assert!(matches!(
                    &ctx.graph()[variants[2]].kind,
                    SdkTypeKind::Union { variants } if variants.is_empty()
                ));
            }
            other => panic!("unexpected {}", other.kind_name()),
        }
    }

    #[test]
    fn union_through_model_is_not_circular() {
        let mut g = SourceGraph::new();
        let s = g.std_scalar("string");
        let tree = g.add_model("Tree", "Ns");
        let u = g.union("Item", "Ns", &[s, tree]);
        g.add_property(tree, "child", u, true);
        let mut ctx = ctx(&g);
        let ty = resolve_type(&mut ctx, u, None);
        let t = resolve_type(&mut ctx, tree, None);
        assert!(ctx.diagnostics().is_empty());
        let child = ctx.graph().model_properties(t)[0];
        assert_eq!(ctx.graph()[child].ty, ty);
    }

    #[test]
    fn literal_union_becomes_enum() {
        let mut g = SourceGraph::new();
        let a = g.string_literal("a");
        let b = g.string_literal("b");
        let s = g.std_scalar("string");
        let closed = g.union("Closed", "Ns", &[a, b]);
        let open = g.union("Open", "Ns", &[a, b, s]);
        let mut ctx = ctx(&g);
        let c = resolve_type(&mut ctx, closed, None);
        let o = resolve_type(&mut ctx, open, None);
        match (&ctx.graph()[c].kind, &ctx.graph()[o].kind) {
            (SdkTypeKind::Enum(cd), SdkTypeKind::Enum(od)) => {
                assert!(cd.is_fixed && cd.is_union_as_enum);
                assert!(!od.is_fixed);
                assert_eq!(od.values.len(), 2);
            }
            _ => panic!("expected enums"),
        }
    }

    #[test]
    fn mixed_literal_union_stays_union() {
        let mut g = SourceGraph::new();
        let a = g.string_literal("a");
        let one = g.number_literal(1.0);
        let u = g.union("Mixed", "Ns", &[a, one]);
        let mut ctx = ctx(&g);
        let ty = resolve_type(&mut ctx, u, None);
        assert!(matches!(
            &ctx.graph()[ty].kind,
            SdkTypeKind::Union { variants } if variants.len() == 2
        ));
    }

    #[test]
    fn nested_enum_union_respects_flatten_option() {
        let mut g = SourceGraph::new();
        let colors = g.enumeration("Color", "Ns", &[("Red", None)]);
        let extra = g.string_literal("Green");
        let u = g.union("AllColors", "Ns", &[colors, extra]);

        let mut flat = ctx(&g);
        let ty = resolve_type(&mut flat, u, None);
        assert!(matches!(&flat.graph()[ty].kind, SdkTypeKind::Enum(d) if d.values.len() == 2));

        let plain_options = SdkContextOptions::default().flatten_union_as_enum(false);
        let mut plain = SdkContext::new(&g, plain_options);
        let ty = resolve_type(&mut plain, u, None);
        assert!(matches!(&plain.graph()[ty].kind, SdkTypeKind::Union { .. }));
    }

    #[test]
    fn nullable_literal_union_wraps_enum() {
        let mut g = SourceGraph::new();
        let a = g.string_literal("a");
        let b = g.string_literal("b");
        let null = g.null();
        let u = g.union("Choice", "Ns", &[a, b, null]);
        let mut ctx = ctx(&g);
        let ty = resolve_type(&mut ctx, u, None);
        match ctx.graph()[ty].kind {
            SdkTypeKind::Nullable { inner } => {
                assert!(matches!(ctx.graph()[inner].kind, SdkTypeKind::Enum(_)));
                assert!(ctx.referenced_types().contains(&inner));
            }
            ref other => panic!("unexpected {}", other.kind_name()),
        }
    }

    #[test]
    fn discriminator_synthesized_on_base() {
        let mut g = SourceGraph::new();
        let pet = g.add_model("Pet", "Ns");
        g.meta_mut(pet).discriminator = Some("kind".into());
        let dog = g.add_model("Dog", "Ns");
        let dog_kind = g.string_literal("dog");
        g.add_property(dog, "kind", dog_kind, false);
        g.extend(dog, pet);
        let mut ctx = ctx(&g);
        let pet_ty = resolve_type(&mut ctx, pet, None);
        let dog_ty = resolve_type(&mut ctx, dog, None);
        let data = ctx.graph().model(pet_ty).unwrap();
        assert_eq!(data.discriminated_subtypes.get("dog"), Some(&dog_ty));
        let disc = data.discriminator_property.unwrap();
        assert_eq!(data.properties[0], disc);
        let disc_prop = &ctx.graph()[disc];
        assert!(disc_prop.discriminator);
        assert_eq!(disc_prop.doc.as_deref(), Some("Discriminator property for Pet."));
        assert_eq!(
            ctx.graph().model(dog_ty).unwrap().discriminator_value.as_deref(),
            Some("dog")
        );
    }

    #[test]
    fn non_constant_discriminator_reports() {
        let mut g = SourceGraph::new();
        let s = g.std_scalar("string");
        let pet = g.add_model("Pet", "Ns");
        g.meta_mut(pet).discriminator = Some("kind".into());
        let dog = g.add_model("Dog", "Ns");
        g.add_property(dog, "kind", s, false);
        g.extend(dog, pet);
        let mut ctx = ctx(&g);
        let pet_ty = resolve_type(&mut ctx, pet, None);
        assert_eq!(
            ctx.diagnostics()
                .with_code(DiagnosticCode::DiscriminatorNotConstant)
                .count(),
            1
        );
        assert!(ctx.graph().model(pet_ty).unwrap().discriminated_subtypes.is_empty());
    }

    #[test]
    fn numeric_discriminator_warns() {
        let mut g = SourceGraph::new();
        let pet = g.add_model("Pet", "Ns");
        g.meta_mut(pet).discriminator = Some("kind".into());
        let dog = g.add_model("Dog", "Ns");
        let one = g.number_literal(1.0);
        g.add_property(dog, "kind", one, false);
        g.extend(dog, pet);
        let mut ctx = ctx(&g);
        resolve_type(&mut ctx, pet, None);
        assert_eq!(
            ctx.diagnostics()
                .with_code(DiagnosticCode::DiscriminatorNotString)
                .count(),
            1
        );
    }

    #[test]
    fn derived_first_still_links_subtypes() {
        let mut g = SourceGraph::new();
        let pet = g.add_model("Pet", "Ns");
        g.meta_mut(pet).discriminator = Some("kind".into());
        let cat = g.add_model("Cat", "Ns");
        let cat_kind = g.string_literal("cat");
        g.add_property(cat, "kind", cat_kind, false);
        g.extend(cat, pet);
        let mut ctx = ctx(&g);
        let cat_ty = resolve_type(&mut ctx, cat, None);
        let pet_ty = resolve_type(&mut ctx, pet, None);
        assert_eq!(ctx.graph().model(cat_ty).unwrap().base_model, Some(pet_ty));
        assert_eq!(
            ctx.graph().model(pet_ty).unwrap().discriminated_subtypes.get("cat"),
            Some(&cat_ty)
        );
    }
}
