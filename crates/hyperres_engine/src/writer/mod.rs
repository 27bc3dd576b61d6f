//! Rendering of models and pages into hypermedia JSON.

pub mod hal;
pub mod helper;
pub mod json_builder;
pub mod mapper;
pub mod page;
pub mod plain;
pub mod single_model;

#[cfg(test)]
mod fixtures;

pub use hal::HalMapper;
pub use helper::{DEFAULT_MAX_EMBED_DEPTH, WriterHelper};
pub use json_builder::JsonObjectBuilder;
pub use mapper::{MessageMapper, PageLink};
pub use page::PageWriter;
pub use plain::PlainJsonMapper;
pub use single_model::SingleModelWriter;
