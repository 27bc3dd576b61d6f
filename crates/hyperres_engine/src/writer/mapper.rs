/* 📖 # Why a mapper per media type?

The writers decide WHAT appears in a document (guided by WriterHelper); a
MessageMapper decides WHERE each element goes in the JSON of one media type.
Supporting a new format means implementing these hooks, without touching the
traversal, the filters or URL construction. Mappers are chosen per request
from the `Accept` header.
*/

use std::fmt;

use serde_json::Value;

use super::json_builder::JsonObjectBuilder;

/// Navigation links of a collection page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageLink {
    Current,
    First,
    Previous,
    Next,
    Last,
}

impl PageLink {
    /// Link relation name as used by most hypermedia formats.
    pub fn relation(&self) -> &'static str {
        match self {
            PageLink::Current => "self",
            PageLink::First => "first",
            PageLink::Previous => "prev",
            PageLink::Next => "next",
            PageLink::Last => "last",
        }
    }
}

/// Lays out the elements of single-model and page documents for one media type.
pub trait MessageMapper: fmt::Debug + Send + Sync {
    fn media_type(&self) -> &'static str;

    fn map_self_url(&self, json: &mut JsonObjectBuilder, url: &str);

    fn map_types(&self, json: &mut JsonObjectBuilder, types: &[String]);

    fn map_field(&self, json: &mut JsonObjectBuilder, key: &str, value: Value);

    fn map_link(&self, json: &mut JsonObjectBuilder, key: &str, url: &str);

    fn map_binary(&self, json: &mut JsonObjectBuilder, key: &str, url: &str);

    /// A to-one relation that is not embedded.
    fn map_linked_resource_url(&self, json: &mut JsonObjectBuilder, key: &str, url: &str);

    /// A to-one relation written in full. `document` already contains its own self URL.
    fn map_embedded_resource(&self, json: &mut JsonObjectBuilder, key: &str, document: Value);

    fn map_related_collection_url(&self, json: &mut JsonObjectBuilder, key: &str, url: &str);

    fn map_page_url(&self, json: &mut JsonObjectBuilder, link: PageLink, url: &str);

    fn map_page_counts(
        &self,
        json: &mut JsonObjectBuilder,
        total_count: usize,
        item_count: usize,
        page_count: usize,
    );

    fn map_page_item(&self, json: &mut JsonObjectBuilder, item: Value);
}
