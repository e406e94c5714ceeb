//! Input contract: the declarative type graph and HTTP shapes produced upstream.
//!
//! A [`SourceGraph`] is an arena of [`SourceNode`]s addressed by [`SourceId`], plus the
//! operations, clients and namespaces that reference them. Every node carries a
//! [`Metadata`] block holding the decorator-derived facts the middle-end queries
//! (client names, encoded names, visibility, encoding hints, access/usage overrides).
//!
//! Graphs can be built in code with the builder methods or decoded from JSON with
//! [`SourceGraph::from_json`]; both paths go through [`SourceGraph::validate`].

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::GraphError;
use crate::types::{Access, UsageFlags};

/// Namespace holding the standard scalars.
pub const STD_NAMESPACE: &str = "TypeSpec";

/// Client-name scope that applies to every language.
pub const ALL_SCOPES: &str = "*";

/// Index of a node in [`SourceGraph::nodes`].
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct SourceId(pub u32);

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Index of an operation in [`SourceGraph::operations`].
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct OperationId(pub u32);

impl fmt::Display for OperationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "op#{}", self.0)
    }
}

/// One declarative type node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceNode {
    #[serde(flatten)]
    pub kind: SourceKind,
    #[serde(default)]
    pub meta: Metadata,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum SourceKind {
    Intrinsic {
        name: IntrinsicName,
    },
    Scalar {
        name: String,
        #[serde(default)]
        namespace: String,
        #[serde(default)]
        base: Option<SourceId>,
    },
    String {
        value: String,
    },
    Number {
        value: f64,
    },
    Boolean {
        value: bool,
    },
    Model(SourceModel),
    ModelProperty(SourceProperty),
    Enum(SourceEnum),
    EnumMember(SourceEnumMember),
    Union(SourceUnion),
    Tuple {
        values: Vec<SourceId>,
    },
}

impl SourceKind {
    /// Returns the kind tag used in JSON and error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            SourceKind::Intrinsic { .. } => "intrinsic",
            SourceKind::Scalar { .. } => "scalar",
            SourceKind::String { .. } => "string",
            SourceKind::Number { .. } => "number",
            SourceKind::Boolean { .. } => "boolean",
            SourceKind::Model(_) => "model",
            SourceKind::ModelProperty(_) => "modelProperty",
            SourceKind::Enum(_) => "enum",
            SourceKind::EnumMember(_) => "enumMember",
            SourceKind::Union(_) => "union",
            SourceKind::Tuple { .. } => "tuple",
        }
    }

    /// Declared name, empty for anonymous nodes and literals.
    pub fn name(&self) -> &str {
        match self {
            SourceKind::Scalar { name, .. } => name,
            SourceKind::Model(m) => &m.name,
            SourceKind::ModelProperty(p) => &p.name,
            SourceKind::Enum(e) => &e.name,
            SourceKind::EnumMember(m) => &m.name,
            SourceKind::Union(u) => &u.name,
            SourceKind::Intrinsic { name } => name.as_str(),
            _ => "",
        }
    }

    pub fn namespace(&self) -> &str {
        match self {
            SourceKind::Scalar { namespace, .. } => namespace,
            SourceKind::Model(m) => &m.namespace,
            SourceKind::Enum(e) => &e.namespace,
            SourceKind::Union(u) => &u.namespace,
            _ => "",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntrinsicName {
    Unknown,
    Null,
    Void,
    Never,
}

impl IntrinsicName {
    pub fn as_str(&self) -> &'static str {
        match self {
            IntrinsicName::Unknown => "unknown",
            IntrinsicName::Null => "null",
            IntrinsicName::Void => "void",
            IntrinsicName::Never => "never",
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SourceModel {
    pub name: String,
    pub namespace: String,
    pub properties: Vec<SourceId>,
    pub indexer: Option<Indexer>,
    pub base_model: Option<SourceId>,
    pub derived_models: Vec<SourceId>,
    /// Target of `model X is Y`.
    pub source_model: Option<SourceId>,
    pub template_arguments: Vec<SourceId>,
    pub is_template_declaration: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Indexer {
    pub key: IndexKey,
    pub value: SourceId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexKey {
    Integer,
    String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SourceProperty {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: SourceId,
    pub optional: bool,
    /// Owning model, if any.
    pub model: Option<SourceId>,
    /// Property this one was spread or copied from.
    pub source_property: Option<SourceId>,
    pub default_value: Option<Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SourceEnum {
    pub name: String,
    pub namespace: String,
    pub members: Vec<SourceId>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SourceEnumMember {
    pub name: String,
    pub enum_type: SourceId,
    /// Explicit value; the member name is used when absent.
    pub value: Option<LiteralValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LiteralValue {
    String(String),
    Number(f64),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SourceUnion {
    pub name: String,
    pub namespace: String,
    pub variants: Vec<SourceVariant>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SourceVariant {
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub ty: SourceId,
}

/// Decorator-derived facts attached to a node or operation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Metadata {
    pub doc: Option<String>,
    pub summary: Option<String>,
    pub decorators: Vec<DecoratorInfo>,
    /// Client-name overrides keyed by language scope (`*` for every scope).
    pub client_names: BTreeMap<String, String>,
    pub friendly_name: Option<String>,
    /// Wire-name overrides keyed by MIME type.
    pub encoded_names: BTreeMap<String, String>,
    pub encode: Option<EncodeHint>,
    /// `Some(vec![])` marks a property invisible in every lifecycle phase.
    pub visibility: Option<Vec<Lifecycle>>,
    pub access: Option<Access>,
    pub usage: Option<UsageFlags>,
    /// Name of the discriminator property declared on a base model.
    pub discriminator: Option<String>,
    pub error: bool,
    pub http: Option<HttpMetadata>,
    pub xml: Option<XmlMetadata>,
    pub multipart: Option<MultipartMetadata>,
    pub api_version: Option<bool>,
    pub param_alias: Option<String>,
    pub flatten: bool,
}

impl Metadata {
    /// Client-name override for a language scope, falling back to the all-scope one.
    pub fn client_name(&self, scope: &str) -> Option<&str> {
        self.client_names
            .get(scope)
            .or_else(|| self.client_names.get(ALL_SCOPES))
            .map(String::as_str)
    }

    pub fn encoded_name(&self, mime: &str) -> Option<&str> {
        self.encoded_names.get(mime).map(String::as_str)
    }

    /// Only readable, never writable.
    pub fn is_read_only(&self) -> bool {
        matches!(&self.visibility, Some(v) if v.len() == 1 && v[0] == Lifecycle::Read)
    }

    pub fn is_invisible(&self) -> bool {
        matches!(&self.visibility, Some(v) if v.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecoratorInfo {
    pub name: String,
    #[serde(default)]
    pub arguments: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncodeHint {
    pub encoding: String,
    #[serde(default)]
    pub wire_type: Option<SourceId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Lifecycle {
    Create,
    Read,
    Update,
    Delete,
    Query,
}

/// HTTP role a model property plays when it appears inside a request or response model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum HttpMetadata {
    StatusCode,
    Header { name: String },
    Query { name: String },
    Path { name: String },
    Cookie { name: String },
    Body,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct XmlMetadata {
    pub name: Option<String>,
    pub attribute: bool,
    pub ns: Option<XmlNamespace>,
    pub unwrapped: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct XmlNamespace {
    pub namespace: String,
    pub prefix: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MultipartMetadata {
    pub file: bool,
    pub default_content_types: Vec<String>,
}

// --- Operations and HTTP shapes ---

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SourceOperation {
    pub name: String,
    pub namespace: String,
    pub interface: Option<String>,
    /// Method-level parameters (model property nodes).
    pub parameters: Vec<SourceId>,
    pub meta: Metadata,
    /// Explicit operation id override.
    pub operation_id: Option<String>,
    pub is_templated: bool,
    /// Target of `op x is y`.
    pub source_operation: Option<OperationId>,
    pub client_location: Option<String>,
    pub convenient: Option<bool>,
    pub protocol: Option<bool>,
    pub lro: Option<LroShape>,
    pub paging: Option<PagingShape>,
    pub response_as_bool: bool,
    pub http: HttpOperationShape,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HttpVerb {
    #[default]
    Get,
    Put,
    Post,
    Patch,
    Delete,
    Head,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HttpOperationShape {
    pub verb: HttpVerb,
    pub path: String,
    pub uri_template: String,
    pub parameters: Vec<HttpParameterShape>,
    pub body: Option<HttpBodyShape>,
    pub responses: Vec<HttpResponseShape>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterLocation {
    Path,
    #[default]
    Query,
    Header,
    Cookie,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HttpParameterShape {
    pub location: ParameterLocation,
    /// Wire name.
    pub name: String,
    pub property: SourceId,
    pub explode: bool,
    pub style: Option<String>,
    pub allow_reserved: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HttpBodyShape {
    #[serde(rename = "type")]
    pub ty: SourceId,
    /// Declaring property; `None` when the body was spread from parameters.
    pub property: Option<SourceId>,
    pub content_types: Vec<String>,
    pub multipart: bool,
}

impl HttpBodyShape {
    pub fn is_spread(&self) -> bool {
        self.property.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StatusCodes {
    Exact(u16),
    Range { start: u16, end: u16 },
    Any,
}

impl Default for StatusCodes {
    fn default() -> Self {
        StatusCodes::Exact(200)
    }
}

impl StatusCodes {
    pub fn matches(&self, code: u16) -> bool {
        match *self {
            StatusCodes::Exact(c) => c == code,
            StatusCodes::Range { start, end } => (start..=end).contains(&code),
            StatusCodes::Any => false,
        }
    }

    pub fn is_success(&self) -> bool {
        match *self {
            StatusCodes::Exact(c) => (200..300).contains(&c),
            StatusCodes::Range { start, .. } => (200..300).contains(&start),
            StatusCodes::Any => false,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HttpResponseShape {
    pub status_codes: StatusCodes,
    pub description: Option<String>,
    /// The declared response model, used to detect error models.
    pub response_type: Option<SourceId>,
    pub responses: Vec<HttpResponseContent>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HttpResponseContent {
    /// Header properties.
    pub headers: Vec<SourceId>,
    pub body: Option<HttpBodyShape>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LroShape {
    pub final_result: Option<SourceId>,
    pub final_envelope_result: Option<SourceId>,
    pub polling_model: Option<SourceId>,
    pub final_result_path: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PagingShape {
    /// Property names leading from the response model to the page items.
    pub item_segments: Vec<String>,
    pub next_link_segments: Vec<String>,
}

// --- Clients ---

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SourceClient {
    pub name: String,
    pub namespace: String,
    pub operations: Vec<OperationId>,
    pub children: Vec<SourceClient>,
    /// Explicit client-level parameters.
    pub parameters: Vec<SourceId>,
    pub server: Option<ServerShape>,
    pub auth: Vec<AuthScheme>,
    /// Enum listing the service's API versions, oldest first.
    pub versions: Option<SourceId>,
    pub meta: Metadata,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerShape {
    pub url: String,
    pub parameters: Vec<SourceId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum AuthScheme {
    ApiKey {
        #[serde(rename = "in")]
        location: ParameterLocation,
        name: String,
    },
    Http {
        scheme: String,
    },
    #[serde(rename = "oauth2")]
    OAuth2 {
        #[serde(default)]
        scopes: Vec<String>,
    },
    NoAuth,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SourceNamespace {
    pub name: String,
    /// Declared models, enums and unions, in declaration order.
    pub types: Vec<SourceId>,
}

/// The complete upstream graph.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SourceGraph {
    pub nodes: Vec<SourceNode>,
    pub operations: Vec<SourceOperation>,
    pub clients: Vec<SourceClient>,
    pub namespaces: Vec<SourceNamespace>,
    /// Clients were declared explicitly rather than inferred from the service.
    pub explicit_clients: bool,
}

impl SourceGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode a graph from JSON and validate its references.
    ///
    /// # Errors
    ///
    /// Returns `GraphError::InvalidJson` if the text is not a graph document, or a
    /// validation error if it references unknown nodes.
    pub fn from_json(content: &str) -> Result<Self, GraphError> {
        let graph: SourceGraph =
            serde_json::from_str(content).map_err(|source| GraphError::InvalidJson { source })?;
        graph.validate()?;
        Ok(graph)
    }

    /// Node by id. Ids come from this graph, so the lookup is infallible after validation.
    pub fn node(&self, id: SourceId) -> &SourceNode {
        &self.nodes[id.0 as usize]
    }

    pub fn get(&self, id: SourceId) -> Option<&SourceNode> {
        self.nodes.get(id.0 as usize)
    }

    pub fn kind(&self, id: SourceId) -> &SourceKind {
        &self.node(id).kind
    }

    pub fn meta(&self, id: SourceId) -> &Metadata {
        &self.node(id).meta
    }

    pub fn operation(&self, id: OperationId) -> &SourceOperation {
        &self.operations[id.0 as usize]
    }

    pub fn name(&self, id: SourceId) -> &str {
        self.kind(id).name()
    }

    pub fn model(&self, id: SourceId) -> Option<&SourceModel> {
        match self.kind(id) {
            SourceKind::Model(m) => Some(m),
            _ => None,
        }
    }

    pub fn property(&self, id: SourceId) -> Option<&SourceProperty> {
        match self.kind(id) {
            SourceKind::ModelProperty(p) => Some(p),
            _ => None,
        }
    }

    pub fn is_null(&self, id: SourceId) -> bool {
        matches!(
            self.kind(id),
            SourceKind::Intrinsic {
                name: IntrinsicName::Null
            }
        )
    }

    pub fn is_never_or_void(&self, id: SourceId) -> bool {
        matches!(
            self.kind(id),
            SourceKind::Intrinsic {
                name: IntrinsicName::Never | IntrinsicName::Void
            }
        )
    }

    /// Error model: marked `@error` directly or through its base chain.
    pub fn is_error_model(&self, id: SourceId) -> bool {
        let mut current = Some(id);
        let mut guard = 0;
        while let Some(c) = current {
            if self.meta(c).error {
                return true;
            }
            current = self.model(c).and_then(|m| m.base_model);
            guard += 1;
            if guard > self.nodes.len() {
                break;
            }
        }
        false
    }

    /// Follow `source_property` links back to the property originally declared.
    pub fn property_origin(&self, id: SourceId) -> SourceId {
        let mut current = id;
        for _ in 0..self.nodes.len() {
            match self.property(current).and_then(|p| p.source_property) {
                Some(next) if next != current => current = next,
                _ => break,
            }
        }
        current
    }

    /// Check every reference in the graph points at an existing node of the right kind.
    pub fn validate(&self) -> Result<(), GraphError> {
        let node_count = self.nodes.len();
        let check = |referrer: &dyn Fn() -> String, id: SourceId| -> Result<(), GraphError> {
            if (id.0 as usize) < node_count {
                Ok(())
            } else {
                Err(GraphError::DanglingNode {
                    referrer: referrer(),
                    id,
                })
            }
        };
        let check_property =
            |referrer: &dyn Fn() -> String, id: SourceId| -> Result<(), GraphError> {
            check(referrer, id)?;
            match self.kind(id) {
                SourceKind::ModelProperty(_) => Ok(()),
                other => Err(GraphError::UnexpectedKind {
                    id,
                    expected: "modelProperty",
                    actual: other.kind_name(),
                }),
            }
        };

        for (index, node) in self.nodes.iter().enumerate() {
            let referrer = || format!("node #{}", index);
            match &node.kind {
                SourceKind::Scalar { base, .. } => {
                    if let Some(b) = base {
                        check(&referrer, *b)?;
                    }
                }
                SourceKind::Model(m) => {
                    for p in &m.properties {
                        check_property(&referrer, *p)?;
                    }
                    let mut refs: Vec<SourceId> = m.derived_models.clone();
                    refs.extend(m.indexer.map(|i| i.value));
                    refs.extend(m.base_model);
                    refs.extend(m.source_model);
                    refs.extend(m.template_arguments.iter().copied());
                    for id in refs {
                        check(&referrer, id)?;
                    }
                }
                SourceKind::ModelProperty(p) => {
                    check(&referrer, p.ty)?;
                    for id in p.model.iter().chain(p.source_property.iter()) {
                        check(&referrer, *id)?;
                    }
                }
                SourceKind::Enum(e) => {
                    for m in &e.members {
                        check(&referrer, *m)?;
                    }
                }
                SourceKind::EnumMember(m) => check(&referrer, m.enum_type)?,
                SourceKind::Union(u) => {
                    for v in &u.variants {
                        check(&referrer, v.ty)?;
                    }
                }
                SourceKind::Tuple { values } => {
                    for v in values {
                        check(&referrer, *v)?;
                    }
                }
                _ => {}
            }
            if let Some(encode) = &node.meta.encode {
                if let Some(w) = encode.wire_type {
                    check(&referrer, w)?;
                }
            }
        }

        for (index, op) in self.operations.iter().enumerate() {
            let referrer = || format!("operation {}", op.name);
            for p in &op.parameters {
                check_property(&referrer, *p)?;
            }
            for p in &op.http.parameters {
                check_property(&referrer, p.property)?;
            }
            if let Some(body) = &op.http.body {
                check(&referrer, body.ty)?;
                if let Some(p) = body.property {
                    check_property(&referrer, p)?;
                }
            }
            for r in &op.http.responses {
                if let Some(t) = r.response_type {
                    check(&referrer, t)?;
                }
                for inner in &r.responses {
                    for h in &inner.headers {
                        check_property(&referrer, *h)?;
                    }
                    if let Some(body) = &inner.body {
                        check(&referrer, body.ty)?;
                    }
                }
            }
            if let Some(lro) = &op.lro {
                for id in [lro.final_result, lro.final_envelope_result, lro.polling_model]
                    .into_iter()
                    .flatten()
                {
                    check(&referrer, id)?;
                }
            }
            if let Some(source_op) = op.source_operation {
                if source_op.0 as usize >= self.operations.len() || source_op.0 as usize == index
                {
                    return Err(GraphError::DanglingOperation {
                        referrer: referrer(),
                        id: source_op,
                    });
                }
            }
        }

        let mut pending: Vec<&SourceClient> = self.clients.iter().collect();
        while let Some(client) = pending.pop() {
            let referrer = || format!("client {}", client.name);
            for op in &client.operations {
                if op.0 as usize >= self.operations.len() {
                    return Err(GraphError::DanglingOperation {
                        referrer: referrer(),
                        id: *op,
                    });
                }
            }
            for p in &client.parameters {
                check_property(&referrer, *p)?;
            }
            if let Some(server) = &client.server {
                for p in &server.parameters {
                    check_property(&referrer, *p)?;
                }
            }
            if let Some(v) = client.versions {
                check(&referrer, v)?;
            }
            pending.extend(client.children.iter());
        }

        for ns in &self.namespaces {
            let referrer = || format!("namespace {}", ns.name);
            for t in &ns.types {
                check(&referrer, *t)?;
            }
        }
        Ok(())
    }

    // --- Builder API ---

    pub fn add(&mut self, kind: SourceKind) -> SourceId {
        self.add_with_meta(kind, Metadata::default())
    }

    pub fn add_with_meta(&mut self, kind: SourceKind, meta: Metadata) -> SourceId {
        let id = SourceId(self.nodes.len() as u32);
        self.nodes.push(SourceNode { kind, meta });
        id
    }

    pub fn meta_mut(&mut self, id: SourceId) -> &mut Metadata {
        &mut self.nodes[id.0 as usize].meta
    }

    pub fn model_mut(&mut self, id: SourceId) -> Option<&mut SourceModel> {
        match &mut self.nodes[id.0 as usize].kind {
            SourceKind::Model(m) => Some(m),
            _ => None,
        }
    }

    pub fn property_mut(&mut self, id: SourceId) -> Option<&mut SourceProperty> {
        match &mut self.nodes[id.0 as usize].kind {
            SourceKind::ModelProperty(p) => Some(p),
            _ => None,
        }
    }

    /// Standard scalar by name, shared across calls.
    pub fn std_scalar(&mut self, name: &str) -> SourceId {
        let existing = self.nodes.iter().position(|node| {
            matches!(&node.kind, SourceKind::Scalar { name: n, namespace, .. }
                if n == name && namespace == STD_NAMESPACE)
        });
        match existing {
            Some(index) => SourceId(index as u32),
            None => self.add(SourceKind::Scalar {
                name: name.to_string(),
                namespace: STD_NAMESPACE.to_string(),
                base: None,
            }),
        }
    }

    /// User scalar extending `base`.
    pub fn scalar(&mut self, name: &str, namespace: &str, base: Option<SourceId>) -> SourceId {
        self.add(SourceKind::Scalar {
            name: name.to_string(),
            namespace: namespace.to_string(),
            base,
        })
    }

    pub fn intrinsic(&mut self, name: IntrinsicName) -> SourceId {
        let existing = self
            .nodes
            .iter()
            .position(|node| matches!(&node.kind, SourceKind::Intrinsic { name: n } if *n == name));
        match existing {
            Some(index) => SourceId(index as u32),
            None => self.add(SourceKind::Intrinsic { name }),
        }
    }

    pub fn null(&mut self) -> SourceId {
        self.intrinsic(IntrinsicName::Null)
    }

    pub fn string_literal(&mut self, value: &str) -> SourceId {
        self.add(SourceKind::String {
            value: value.to_string(),
        })
    }

    pub fn number_literal(&mut self, value: f64) -> SourceId {
        self.add(SourceKind::Number { value })
    }

    pub fn boolean_literal(&mut self, value: bool) -> SourceId {
        self.add(SourceKind::Boolean { value })
    }

    /// Empty model; an empty name declares an anonymous model.
    pub fn add_model(&mut self, name: &str, namespace: &str) -> SourceId {
        self.add(SourceKind::Model(SourceModel {
            name: name.to_string(),
            namespace: namespace.to_string(),
            ..Default::default()
        }))
    }

    /// Add a property to `model` and return the property node.
    pub fn add_property(
        &mut self,
        model: SourceId,
        name: &str,
        ty: SourceId,
        optional: bool,
    ) -> SourceId {
        let id = self.add(SourceKind::ModelProperty(SourceProperty {
            name: name.to_string(),
            ty,
            optional,
            model: Some(model),
            ..Default::default()
        }));
        if let Some(m) = self.model_mut(model) {
            m.properties.push(id);
        }
        id
    }

    /// Free-standing property, e.g. an operation parameter.
    pub fn parameter(&mut self, name: &str, ty: SourceId, optional: bool) -> SourceId {
        self.add(SourceKind::ModelProperty(SourceProperty {
            name: name.to_string(),
            ty,
            optional,
            ..Default::default()
        }))
    }

    /// Link `derived` to `base` in both directions.
    pub fn extend(&mut self, derived: SourceId, base: SourceId) {
        if let Some(m) = self.model_mut(derived) {
            m.base_model = Some(base);
        }
        if let Some(m) = self.model_mut(base) {
            m.derived_models.push(derived);
        }
    }

    /// `T[]`.
    pub fn array_of(&mut self, item: SourceId) -> SourceId {
        self.add(SourceKind::Model(SourceModel {
            name: "Array".to_string(),
            namespace: STD_NAMESPACE.to_string(),
            indexer: Some(Indexer {
                key: IndexKey::Integer,
                value: item,
            }),
            ..Default::default()
        }))
    }

    /// `Record<T>`.
    pub fn record_of(&mut self, value: SourceId) -> SourceId {
        self.add(SourceKind::Model(SourceModel {
            name: "Record".to_string(),
            namespace: STD_NAMESPACE.to_string(),
            indexer: Some(Indexer {
                key: IndexKey::String,
                value,
            }),
            ..Default::default()
        }))
    }

    /// Enum with members given as `(name, value)`.
    pub fn enumeration(
        &mut self,
        name: &str,
        namespace: &str,
        members: &[(&str, Option<LiteralValue>)],
    ) -> SourceId {
        let id = self.add(SourceKind::Enum(SourceEnum {
            name: name.to_string(),
            namespace: namespace.to_string(),
            members: Vec::new(),
        }));
        let member_ids: Vec<SourceId> = members
            .iter()
            .map(|(member, value)| {
                self.add(SourceKind::EnumMember(SourceEnumMember {
                    name: member.to_string(),
                    enum_type: id,
                    value: value.clone(),
                }))
            })
            .collect();
        if let SourceKind::Enum(e) = &mut self.nodes[id.0 as usize].kind {
            e.members = member_ids;
        }
        id
    }

    pub fn union(&mut self, name: &str, namespace: &str, variants: &[SourceId]) -> SourceId {
        self.add(SourceKind::Union(SourceUnion {
            name: name.to_string(),
            namespace: namespace.to_string(),
            variants: variants
                .iter()
                .map(|ty| SourceVariant { name: None, ty: *ty })
                .collect(),
        }))
    }

    pub fn add_operation(&mut self, operation: SourceOperation) -> OperationId {
        let id = OperationId(self.operations.len() as u32);
        self.operations.push(operation);
        id
    }

    /// Register a declared type under its namespace for orphan handling.
    pub fn declare(&mut self, namespace: &str, ty: SourceId) {
        match self.namespaces.iter_mut().find(|n| n.name == namespace) {
            Some(ns) => ns.types.push(ty),
            None => self.namespaces.push(SourceNamespace {
                name: namespace.to_string(),
                types: vec![ty],
            }),
        }
    }
}
