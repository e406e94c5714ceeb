//! SDK Type Graph
//!
//! Turns an annotated API description (a [`SourceGraph`]) into the canonical,
//! language-neutral graph that SDK emitters consume.
//!
//! Every source type is resolved once into an [`SdkGraph`] node. HTTP parameters are
//! linked back to the method parameters that supply them. Usage and access are then
//! propagated through the graph, wire serialization options are attached, anonymous
//! types are named, and example documents are bound to operations.
//!
//! # Example
//!
//! ```
//! use sdk_typegraph::{create_sdk_package, SdkContextOptions, SourceGraph, UsageFlags};
//!
//! let mut graph = SourceGraph::new();
//! let string = graph.std_scalar("string");
//! let widget = graph.add_model("Widget", "Demo");
//! graph.add_property(widget, "name", string, false);
//! graph.declare("Demo", widget);
//!
//! let package = create_sdk_package(&graph, SdkContextOptions::default(), &[]).unwrap();
//! let widget = package.find_type("Widget").unwrap();
//!
//! // Nothing references the model, so it carries no usage but is still emitted.
//! assert_eq!(package.graph[widget].usage, UsageFlags::NONE);
//! assert_eq!(package.models, vec![widget]);
//! ```
//!
//! # Passes
//!
//! | Pass | Module | Output |
//! |------|--------|--------|
//! | Type resolution | `resolver` | one node per source type |
//! | HTTP mapping | `http` | parameters, bodies, responses, correspondence |
//! | Usage & access | `usage` | usage flags and access on every reachable node |
//! | Serialization | `serialization` | json, xml and multipart options |
//! | Naming | `naming` | generated names and cross-language ids |
//! | Examples | `loader`, `examples` | typed example values per operation |

mod context;
mod diagnostics;
mod error;
mod examples;
mod http;
mod loader;
mod naming;
mod options;
mod package;
mod resolver;
mod serialization;
mod source;
mod types;
mod usage;

pub use context::SdkContext;
pub use diagnostics::{Diagnostic, DiagnosticCode, Diagnostics, Severity};
pub use error::{ExampleError, GraphError, ShapeError};
pub use examples::{
    ExampleMapper, SdkExampleValue, SdkHttpOperationExample, SdkHttpParameterExample,
    SdkHttpResponseExample, SdkHttpResponseHeaderExample,
};
pub use http::{SdkHttpOperation, SdkHttpResponse};
pub use loader::{
    check_document_shape, parse_example_document, ExampleDocument, ExampleIndex,
    ExampleResponseDocument, LoadedExample, RawExampleFile,
};
pub use naming::{
    is_api_version, library_name, operation_cross_language_id, resolve_operation_id, wire_name,
};
pub use options::SdkContextOptions;
pub use package::{
    create_sdk_package, MethodKind, SdkClientInitialization, SdkClientType, SdkLroMetadata,
    SdkMethodResponse, SdkNamespace, SdkPackage, SdkPagingMetadata, SdkServiceMethod,
};
pub use resolver::resolve_type;
pub use serialization::{attach as attach_serialization_options, is_json, is_multipart, is_xml};
pub use source::{
    AuthScheme, DecoratorInfo, EncodeHint, HttpBodyShape, HttpMetadata, HttpOperationShape,
    HttpParameterShape, HttpResponseContent, HttpResponseShape, HttpVerb, IndexKey, Indexer,
    IntrinsicName, Lifecycle, LiteralValue, LroShape, Metadata, MultipartMetadata, OperationId,
    PagingShape, ParameterLocation, ServerShape, SourceClient, SourceEnum, SourceEnumMember,
    SourceGraph, SourceId, SourceKind, SourceModel, SourceNamespace, SourceNode,
    SourceOperation, SourceProperty, SourceUnion, SourceVariant, StatusCodes, XmlMetadata,
    XmlNamespace, STD_NAMESPACE,
};
pub use types::{
    Access, BuiltInKind, CollectionFormat, DateTimeKind, EnumData, JsonSerializationOptions,
    ModelData, MultipartOptions, PropertyId, PropertyKind, SdkGraph, SdkModelProperty, SdkType,
    SdkTypeId, SdkTypeKind, SerializationOptions, UsageFlags, XmlSerializationOptions,
};
pub use usage::{propagate, PropagationOptions, UsageOrAccess};
