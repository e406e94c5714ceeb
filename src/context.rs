//! The resolution context threaded through every pass.
//!
//! Owns the SDK arena, the memoization caches and the diagnostics sink for one
//! compilation pass. Each test can build its own isolated context.

use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;

use crate::diagnostics::{DiagnosticCode, Diagnostics};
use crate::options::SdkContextOptions;
use crate::source::{SourceGraph, SourceId, STD_NAMESPACE};
use crate::types::{BuiltInKind, PropertyId, SdkGraph, SdkType, SdkTypeId, SdkTypeKind};

pub struct SdkContext<'a> {
    pub(crate) source: &'a SourceGraph,
    pub(crate) options: SdkContextOptions,
    pub(crate) graph: SdkGraph,
    pub(crate) diagnostics: Diagnostics,
    /// Models, enums, unions and nullables keyed by source node, in first-seen order.
    pub(crate) referenced: IndexMap<SourceId, SdkTypeId>,
    /// Declarations that share a source node with a cached wrapper (e.g. the enum
    /// inside a nullable union-as-enum).
    pub(crate) extra_referenced: Vec<SdkTypeId>,
    /// Every other source-backed node: scalars, literals, arrays, dicts, tuples, enum values.
    pub(crate) type_cache: HashMap<SourceId, SdkTypeId>,
    /// Synthesized built-ins (constant value types, default wire types).
    pub(crate) builtins: HashMap<BuiltInKind, SdkTypeId>,
    pub(crate) property_cache: HashMap<SourceId, PropertyId>,
    pub(crate) union_stack: Vec<SourceId>,
    pub(crate) generated_names: HashMap<SourceId, String>,
    pub(crate) used_generated_names: HashSet<String>,
}

impl<'a> SdkContext<'a> {
    pub fn new(source: &'a SourceGraph, options: SdkContextOptions) -> Self {
        Self {
            source,
            options,
            graph: SdkGraph::new(),
            diagnostics: Diagnostics::new(),
            referenced: IndexMap::new(),
            extra_referenced: Vec::new(),
            type_cache: HashMap::new(),
            builtins: HashMap::new(),
            property_cache: HashMap::new(),
            union_stack: Vec::new(),
            generated_names: HashMap::new(),
            used_generated_names: HashSet::new(),
        }
    }

    pub fn source(&self) -> &'a SourceGraph {
        self.source
    }

    pub fn options(&self) -> &SdkContextOptions {
        &self.options
    }

    pub fn graph(&self) -> &SdkGraph {
        &self.graph
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Split the context into its output parts.
    pub fn into_parts(self) -> (SdkGraph, Diagnostics) {
        (self.graph, self.diagnostics)
    }

    pub(crate) fn report(
        &mut self,
        code: DiagnosticCode,
        target: impl Into<String>,
        message: impl Into<String>,
    ) {
        self.diagnostics.report(code, target, message);
    }

    /// Canonical node previously built for a source node.
    pub fn cached(&self, id: SourceId) -> Option<SdkTypeId> {
        self.referenced
            .get(&id)
            .or_else(|| self.type_cache.get(&id))
            .copied()
    }

    /// Every referenced declaration, cache order first, then extras.
    pub fn referenced_types(&self) -> Vec<SdkTypeId> {
        let mut seen = HashSet::new();
        self.referenced
            .values()
            .chain(self.extra_referenced.iter())
            .copied()
            .filter(|id| seen.insert(*id))
            .collect()
    }

    /// Shared synthesized built-in node for `kind`.
    pub(crate) fn builtin(&mut self, kind: BuiltInKind) -> SdkTypeId {
        if let Some(id) = self.builtins.get(&kind) {
            return *id;
        }
        let mut ty = SdkType::new(SdkTypeKind::BuiltIn {
            builtin: kind,
            encode: if kind == BuiltInKind::Bytes {
                Some("base64".to_string())
            } else {
                None
            },
            base_type: None,
        })
        .named(kind.as_str(), STD_NAMESPACE);
        ty.cross_language_id = format!("{}.{}", STD_NAMESPACE, kind.as_str());
        let id = self.graph.push_type(ty);
        self.builtins.insert(kind, id);
        id
    }
}
