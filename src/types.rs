//! Core types of the SDK type graph.
//!
//! All nodes live in an [`SdkGraph`] arena and reference each other through
//! [`SdkTypeId`] and [`PropertyId`] indices, so cyclic models need no shared pointers.

use std::ops::{BitAnd, BitOr, BitOrAssign, Index};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::source::{AuthScheme, DecoratorInfo, Lifecycle, SourceId, XmlNamespace};

/// Index of a type node in the [`SdkGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct SdkTypeId(pub(crate) u32);

impl SdkTypeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Index of a property or parameter node in the [`SdkGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct PropertyId(pub(crate) u32);

impl PropertyId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Additive bitmask of the roles a type plays across all operations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UsageFlags(u32);

impl UsageFlags {
    pub const NONE: UsageFlags = UsageFlags(0);
    pub const INPUT: UsageFlags = UsageFlags(1 << 1);
    pub const OUTPUT: UsageFlags = UsageFlags(1 << 2);
    pub const API_VERSION_ENUM: UsageFlags = UsageFlags(1 << 3);
    pub const JSON_MERGE_PATCH: UsageFlags = UsageFlags(1 << 4);
    pub const MULTIPART_FORM_DATA: UsageFlags = UsageFlags(1 << 5);
    pub const SPREAD: UsageFlags = UsageFlags(1 << 6);
    pub const JSON: UsageFlags = UsageFlags(1 << 8);
    pub const XML: UsageFlags = UsageFlags(1 << 9);
    pub const EXCEPTION: UsageFlags = UsageFlags(1 << 10);
    pub const LRO_INITIAL: UsageFlags = UsageFlags(1 << 11);
    pub const LRO_POLLING: UsageFlags = UsageFlags(1 << 12);
    pub const LRO_FINAL_ENVELOPE: UsageFlags = UsageFlags(1 << 13);

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn from_bits(bits: u32) -> Self {
        UsageFlags(bits)
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// True when every bit of `other` is set.
    pub const fn contains(self, other: UsageFlags) -> bool {
        self.0 & other.0 == other.0
    }

    /// True when any bit of `other` is set.
    pub const fn intersects(self, other: UsageFlags) -> bool {
        self.0 & other.0 != 0
    }
}

impl BitOr for UsageFlags {
    type Output = UsageFlags;

    fn bitor(self, rhs: Self) -> Self::Output {
        UsageFlags(self.0 | rhs.0)
    }
}

impl BitOrAssign for UsageFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for UsageFlags {
    type Output = UsageFlags;

    fn bitand(self, rhs: Self) -> Self::Output {
        UsageFlags(self.0 & rhs.0)
    }
}

/// Effective accessibility of a node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Access {
    #[default]
    Public,
    Internal,
}

impl Access {
    /// Parse an access value from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "public" => Some(Access::Public),
            "internal" => Some(Access::Internal),
            _ => None,
        }
    }
}

/// Built-in scalar kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BuiltInKind {
    Numeric,
    Integer,
    Safeint,
    Int8,
    Int16,
    Int32,
    Int64,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Float,
    Float32,
    Float64,
    Decimal,
    Decimal128,
    String,
    Url,
    Bytes,
    Boolean,
    PlainDate,
    PlainTime,
    Unknown,
}

impl BuiltInKind {
    /// Parse a standard scalar name.
    ///
    /// Returns `None` for names that are not plain built-ins (including the date-time
    /// and duration scalars, which get their own node kinds).
    pub fn parse(s: &str) -> Option<Self> {
        let kind = match s {
            "numeric" => BuiltInKind::Numeric,
            "integer" => BuiltInKind::Integer,
            "safeint" => BuiltInKind::Safeint,
            "int8" => BuiltInKind::Int8,
            "int16" => BuiltInKind::Int16,
            "int32" => BuiltInKind::Int32,
            "int64" => BuiltInKind::Int64,
            "uint8" => BuiltInKind::Uint8,
            "uint16" => BuiltInKind::Uint16,
            "uint32" => BuiltInKind::Uint32,
            "uint64" => BuiltInKind::Uint64,
            "float" => BuiltInKind::Float,
            "float32" => BuiltInKind::Float32,
            "float64" => BuiltInKind::Float64,
            "decimal" => BuiltInKind::Decimal,
            "decimal128" => BuiltInKind::Decimal128,
            "string" => BuiltInKind::String,
            "url" => BuiltInKind::Url,
            "bytes" => BuiltInKind::Bytes,
            "boolean" => BuiltInKind::Boolean,
            "plainDate" => BuiltInKind::PlainDate,
            "plainTime" => BuiltInKind::PlainTime,
            "unknown" => BuiltInKind::Unknown,
            _ => return None,
        };
        Some(kind)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BuiltInKind::Numeric => "numeric",
            BuiltInKind::Integer => "integer",
            BuiltInKind::Safeint => "safeint",
            BuiltInKind::Int8 => "int8",
            BuiltInKind::Int16 => "int16",
            BuiltInKind::Int32 => "int32",
            BuiltInKind::Int64 => "int64",
            BuiltInKind::Uint8 => "uint8",
            BuiltInKind::Uint16 => "uint16",
            BuiltInKind::Uint32 => "uint32",
            BuiltInKind::Uint64 => "uint64",
            BuiltInKind::Float => "float",
            BuiltInKind::Float32 => "float32",
            BuiltInKind::Float64 => "float64",
            BuiltInKind::Decimal => "decimal",
            BuiltInKind::Decimal128 => "decimal128",
            BuiltInKind::String => "string",
            BuiltInKind::Url => "url",
            BuiltInKind::Bytes => "bytes",
            BuiltInKind::Boolean => "boolean",
            BuiltInKind::PlainDate => "plainDate",
            BuiltInKind::PlainTime => "plainTime",
            BuiltInKind::Unknown => "unknown",
        }
    }

    pub fn is_numeric(&self) -> bool {
        self.is_integer() || self.is_float() || *self == BuiltInKind::Numeric
    }

    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            BuiltInKind::Integer
                | BuiltInKind::Safeint
                | BuiltInKind::Int8
                | BuiltInKind::Int16
                | BuiltInKind::Int32
                | BuiltInKind::Int64
                | BuiltInKind::Uint8
                | BuiltInKind::Uint16
                | BuiltInKind::Uint32
                | BuiltInKind::Uint64
        )
    }

    pub fn is_float(&self) -> bool {
        matches!(
            self,
            BuiltInKind::Float
                | BuiltInKind::Float32
                | BuiltInKind::Float64
                | BuiltInKind::Decimal
                | BuiltInKind::Decimal128
        )
    }

    /// Kinds whose example values are written as JSON strings.
    pub fn is_string_like(&self) -> bool {
        matches!(
            self,
            BuiltInKind::String
                | BuiltInKind::Url
                | BuiltInKind::Bytes
                | BuiltInKind::PlainDate
                | BuiltInKind::PlainTime
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DateTimeKind {
    UtcDateTime,
    OffsetDateTime,
}

/// One node of the SDK type graph.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SdkType {
    #[serde(flatten)]
    pub kind: SdkTypeKind,
    pub name: String,
    pub namespace: String,
    pub is_generated_name: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub decorators: Vec<DecoratorInfo>,
    #[serde(skip)]
    pub raw: Option<SourceId>,
    pub usage: UsageFlags,
    pub access: Access,
    #[serde(skip)]
    pub(crate) access_set: bool,
    pub cross_language_id: String,
}

impl SdkType {
    pub fn new(kind: SdkTypeKind) -> Self {
        Self {
            kind,
            name: String::new(),
            namespace: String::new(),
            is_generated_name: false,
            doc: None,
            summary: None,
            decorators: Vec::new(),
            raw: None,
            usage: UsageFlags::NONE,
            access: Access::Public,
            access_set: false,
            cross_language_id: String::new(),
        }
    }

    /// Set name and namespace.
    pub fn named(mut self, name: impl Into<String>, namespace: impl Into<String>) -> Self {
        self.name = name.into();
        self.namespace = namespace.into();
        self
    }

    /// Set the raw source back-reference.
    pub fn raw(mut self, raw: Option<SourceId>) -> Self {
        self.raw = raw;
        self
    }

    pub fn kind_name(&self) -> &'static str {
        self.kind.kind_name()
    }

    /// Whether emitters see this node as a referenced declaration.
    pub fn is_declaration(&self) -> bool {
        matches!(
            self.kind,
            SdkTypeKind::Model(_)
                | SdkTypeKind::Enum(_)
                | SdkTypeKind::Union { .. }
                | SdkTypeKind::Nullable { .. }
        )
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum SdkTypeKind {
    #[serde(rename_all = "camelCase")]
    BuiltIn {
        builtin: BuiltInKind,
        #[serde(skip_serializing_if = "Option::is_none")]
        encode: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        base_type: Option<SdkTypeId>,
    },
    #[serde(rename_all = "camelCase")]
    DateTime {
        datetime: DateTimeKind,
        encode: String,
        wire_type: SdkTypeId,
        #[serde(skip_serializing_if = "Option::is_none")]
        base_type: Option<SdkTypeId>,
    },
    #[serde(rename_all = "camelCase")]
    Duration {
        encode: String,
        wire_type: SdkTypeId,
        #[serde(skip_serializing_if = "Option::is_none")]
        base_type: Option<SdkTypeId>,
    },
    #[serde(rename_all = "camelCase")]
    Array { value_type: SdkTypeId },
    #[serde(rename_all = "camelCase")]
    Tuple { value_types: Vec<SdkTypeId> },
    #[serde(rename_all = "camelCase")]
    Dict {
        key_type: SdkTypeId,
        value_type: SdkTypeId,
    },
    Nullable { inner: SdkTypeId },
    Enum(EnumData),
    #[serde(rename_all = "camelCase")]
    EnumValue {
        value: Value,
        enum_type: SdkTypeId,
        value_type: SdkTypeId,
    },
    #[serde(rename_all = "camelCase")]
    Constant { value: Value, value_type: SdkTypeId },
    Union { variants: Vec<SdkTypeId> },
    Model(ModelData),
    Credential { schemes: Vec<AuthScheme> },
    #[serde(rename_all = "camelCase")]
    Endpoint {
        server_url: String,
        template_arguments: Vec<PropertyId>,
    },
}

impl SdkTypeKind {
    pub fn kind_name(&self) -> &'static str {
        match self {
            SdkTypeKind::BuiltIn { .. } => "builtIn",
            SdkTypeKind::DateTime { .. } => "dateTime",
            SdkTypeKind::Duration { .. } => "duration",
            SdkTypeKind::Array { .. } => "array",
            SdkTypeKind::Tuple { .. } => "tuple",
            SdkTypeKind::Dict { .. } => "dict",
            SdkTypeKind::Nullable { .. } => "nullable",
            SdkTypeKind::Enum(_) => "enum",
            SdkTypeKind::EnumValue { .. } => "enumValue",
            SdkTypeKind::Constant { .. } => "constant",
            SdkTypeKind::Union { .. } => "union",
            SdkTypeKind::Model(_) => "model",
            SdkTypeKind::Credential { .. } => "credential",
            SdkTypeKind::Endpoint { .. } => "endpoint",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnumData {
    pub value_type: SdkTypeId,
    pub values: Vec<SdkTypeId>,
    pub is_fixed: bool,
    pub is_flags: bool,
    pub is_union_as_enum: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub api_versions: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelData {
    pub properties: Vec<PropertyId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_model: Option<SdkTypeId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub additional_properties: Option<SdkTypeId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discriminator_property: Option<PropertyId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discriminator_value: Option<String>,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub discriminated_subtypes: IndexMap<String, SdkTypeId>,
    pub serialization_options: SerializationOptions,
}

/// Per-content-type wire metadata for models and properties.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SerializationOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub json: Option<JsonSerializationOptions>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub xml: Option<XmlSerializationOptions>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub multipart: Option<MultipartOptions>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JsonSerializationOptions {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct XmlSerializationOptions {
    pub name: String,
    pub attribute: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ns: Option<XmlNamespace>,
    pub unwrapped: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items_ns: Option<XmlNamespace>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MultipartOptions {
    pub name: String,
    pub is_file_part: bool,
    pub is_multi: bool,
    pub default_content_types: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollectionFormat {
    Multi,
    Csv,
    Ssv,
    Tsv,
    Pipes,
}

/// Variant-specific data of a property or parameter node.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum PropertyKind {
    #[serde(rename_all = "camelCase")]
    Path {
        explode: bool,
        style: String,
        allow_reserved: bool,
    },
    #[serde(rename_all = "camelCase")]
    Query {
        explode: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        collection_format: Option<CollectionFormat>,
    },
    #[serde(rename_all = "camelCase")]
    Header {
        #[serde(skip_serializing_if = "Option::is_none")]
        collection_format: Option<CollectionFormat>,
    },
    Cookie,
    #[serde(rename_all = "camelCase")]
    Body {
        content_types: Vec<String>,
        default_content_type: String,
    },
    Method,
    ResponseHeader,
    Property,
    #[serde(rename_all = "camelCase")]
    Endpoint { url_encode: bool },
    Credential,
}

impl PropertyKind {
    pub fn kind_name(&self) -> &'static str {
        match self {
            PropertyKind::Path { .. } => "path",
            PropertyKind::Query { .. } => "query",
            PropertyKind::Header { .. } => "header",
            PropertyKind::Cookie => "cookie",
            PropertyKind::Body { .. } => "body",
            PropertyKind::Method => "method",
            PropertyKind::ResponseHeader => "responseheader",
            PropertyKind::Property => "property",
            PropertyKind::Endpoint { .. } => "endpoint",
            PropertyKind::Credential => "credential",
        }
    }
}

/// Property, HTTP parameter, method parameter or response header.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SdkModelProperty {
    #[serde(flatten)]
    pub kind: PropertyKind,
    pub name: String,
    pub is_generated_name: bool,
    pub serialized_name: String,
    #[serde(rename = "type")]
    pub ty: SdkTypeId,
    pub optional: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub decorators: Vec<DecoratorInfo>,
    #[serde(skip)]
    pub raw: Option<SourceId>,
    pub discriminator: bool,
    pub flatten: bool,
    pub on_client: bool,
    pub is_api_version_param: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_default_value: Option<Value>,
    pub access: Access,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visibility: Option<Vec<Lifecycle>>,
    pub serialization_options: SerializationOptions,
    pub cross_language_id: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub corresponding_method_params: Vec<PropertyId>,
}

impl SdkModelProperty {
    pub fn new(kind: PropertyKind, name: impl Into<String>, ty: SdkTypeId) -> Self {
        let name = name.into();
        Self {
            kind,
            serialized_name: name.clone(),
            name,
            is_generated_name: false,
            ty,
            optional: false,
            doc: None,
            summary: None,
            decorators: Vec::new(),
            raw: None,
            discriminator: false,
            flatten: false,
            on_client: false,
            is_api_version_param: false,
            client_default_value: None,
            access: Access::Public,
            visibility: None,
            serialization_options: SerializationOptions::default(),
            cross_language_id: String::new(),
            corresponding_method_params: Vec::new(),
        }
    }

    pub fn is_read_only(&self) -> bool {
        matches!(&self.visibility, Some(v) if v.len() == 1 && v[0] == Lifecycle::Read)
    }
}

/// Arena holding every type and property node of one compilation pass.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SdkGraph {
    types: Vec<SdkType>,
    properties: Vec<SdkModelProperty>,
}

impl SdkGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push_type(&mut self, ty: SdkType) -> SdkTypeId {
        let id = SdkTypeId(self.types.len() as u32);
        self.types.push(ty);
        id
    }

    pub(crate) fn push_property(&mut self, property: SdkModelProperty) -> PropertyId {
        let id = PropertyId(self.properties.len() as u32);
        self.properties.push(property);
        id
    }

    pub fn ty(&self, id: SdkTypeId) -> &SdkType {
        &self.types[id.index()]
    }

    pub fn ty_mut(&mut self, id: SdkTypeId) -> &mut SdkType {
        &mut self.types[id.index()]
    }

    pub fn property(&self, id: PropertyId) -> &SdkModelProperty {
        &self.properties[id.index()]
    }

    pub fn property_mut(&mut self, id: PropertyId) -> &mut SdkModelProperty {
        &mut self.properties[id.index()]
    }

    pub fn types(&self) -> impl Iterator<Item = (SdkTypeId, &SdkType)> {
        self.types
            .iter()
            .enumerate()
            .map(|(i, t)| (SdkTypeId(i as u32), t))
    }

    pub fn type_count(&self) -> usize {
        self.types.len()
    }

    pub fn property_count(&self) -> usize {
        self.properties.len()
    }

    pub fn model(&self, id: SdkTypeId) -> Option<&ModelData> {
        match &self.ty(id).kind {
            SdkTypeKind::Model(m) => Some(m),
            _ => None,
        }
    }

    pub fn model_mut(&mut self, id: SdkTypeId) -> Option<&mut ModelData> {
        match &mut self.ty_mut(id).kind {
            SdkTypeKind::Model(m) => Some(m),
            _ => None,
        }
    }

    /// Property ids of a model, empty for every other kind.
    pub fn model_properties(&self, id: SdkTypeId) -> Vec<PropertyId> {
        self.model(id)
            .map(|m| m.properties.clone())
            .unwrap_or_default()
    }

    /// Inner type of a nullable wrapper, or the id itself.
    pub fn strip_nullable(&self, id: SdkTypeId) -> SdkTypeId {
        match self.ty(id).kind {
            SdkTypeKind::Nullable { inner } => inner,
            _ => id,
        }
    }

    /// Find a property of a model (or its bases) by its declared source name.
    pub fn find_property(&self, model: SdkTypeId, name: &str) -> Option<PropertyId> {
        let mut current = Some(model);
        let mut hops = 0;
        while let Some(m) = current {
            let data = self.model(m)?;
            if let Some(p) = data
                .properties
                .iter()
                .find(|p| self.property(**p).name == name)
            {
                return Some(*p);
            }
            current = data.base_model;
            hops += 1;
            if hops > self.types.len() {
                break;
            }
        }
        None
    }
}

impl Index<SdkTypeId> for SdkGraph {
    type Output = SdkType;

    fn index(&self, id: SdkTypeId) -> &SdkType {
        self.ty(id)
    }
}

impl Index<PropertyId> for SdkGraph {
    type Output = SdkModelProperty;

    fn index(&self, id: PropertyId) -> &SdkModelProperty {
        self.property(id)
    }
}
