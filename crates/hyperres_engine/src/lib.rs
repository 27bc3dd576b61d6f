/* 📖 # Why split declaration, registration and writing?

A resource is declared once as a Representor (what a document shows) and a
Routes value (how models are found and changed). Declarations are registered
concurrently into a RegistryBuilder and frozen into an immutable
ResourceRegistry, which resolves the relations between resources. Writers only
ever read the frozen registry, so rendering needs no locking at all.
*/

pub mod api;
pub mod config;
pub mod error_mapper;
pub mod functional_list;
pub mod identifier;
pub mod model;
pub mod registry;
pub mod representor;
pub mod request;
pub mod routes;
mod service_tests;
pub mod uri;
pub mod writer;

pub use api::{HypermediaService, HypermediaServiceBuilder};
pub use config::{ServerConfig, load_config};
pub use error_mapper::{ApiError, ErrorMessageMapper, ProblemJsonMapper, write_error};
pub use functional_list::{EmbeddedPath, FunctionalList};
pub use identifier::Identifier;
pub use model::{Lookup, ModelClass, Page, PageItems, Pagination, SingleModel};
pub use registry::{RegistryBuilder, Resource, ResourceRegistry};
pub use representor::{
    BinaryFile, Field, FieldKind, NestedRepresentor, RESERVED_KEYS, RelatedCollection, RelatedModel,
    Representor, RepresentorBuilder,
};
pub use request::{
    Embedded, Fields, FixedServerUrl, HostHeaderServerUrl, RequestContext, ServerUrlProvider,
};
pub use routes::{
    CreateItem, DeleteItem, FieldValues, GetItem, GetPage, Operation, Path, RouteContext, Routes,
    RoutesBuilder, UpdateItem,
};
pub use uri::{IdentityTransformer, PrefixTransformer, UriTransformer};
pub use writer::{
    HalMapper, JsonObjectBuilder, MessageMapper, PageWriter, PlainJsonMapper, SingleModelWriter,
    WriterHelper,
};
