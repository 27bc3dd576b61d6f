use serde_json::{Value, json};

use super::json_builder::JsonObjectBuilder;
use super::mapper::{MessageMapper, PageLink};

/// `application/hal+json`: fields inline, every URL under `_links` as an `href`,
/// embedded resources and page items under `_embedded`.
///
/// HAL has no notion of type labels, so they are left out.
#[derive(Debug, Clone, Copy, Default)]
pub struct HalMapper;

impl HalMapper {
    fn link(json: &mut JsonObjectBuilder, relation: &str, url: &str) {
        json.nested_field(&["_links", relation], "href", json!(url));
    }
}

impl MessageMapper for HalMapper {
    fn media_type(&self) -> &'static str {
        "application/hal+json"
    }

    fn map_self_url(&self, json: &mut JsonObjectBuilder, url: &str) {
        Self::link(json, "self", url);
    }

    fn map_types(&self, _json: &mut JsonObjectBuilder, _types: &[String]) {}

    fn map_field(&self, json: &mut JsonObjectBuilder, key: &str, value: Value) {
        json.field(key, value);
    }

    fn map_link(&self, json: &mut JsonObjectBuilder, key: &str, url: &str) {
        Self::link(json, key, url);
    }

    fn map_binary(&self, json: &mut JsonObjectBuilder, key: &str, url: &str) {
        Self::link(json, key, url);
    }

    fn map_linked_resource_url(&self, json: &mut JsonObjectBuilder, key: &str, url: &str) {
        Self::link(json, key, url);
    }

    fn map_embedded_resource(&self, json: &mut JsonObjectBuilder, key: &str, document: Value) {
        json.nested_field(&["_embedded"], key, document);
    }

    fn map_related_collection_url(&self, json: &mut JsonObjectBuilder, key: &str, url: &str) {
        Self::link(json, key, url);
    }

    fn map_page_url(&self, json: &mut JsonObjectBuilder, link: PageLink, url: &str) {
        Self::link(json, link.relation(), url);
    }

    fn map_page_counts(
        &self,
        json: &mut JsonObjectBuilder,
        total_count: usize,
        item_count: usize,
        _page_count: usize,
    ) {
        json.field("total", json!(total_count))
            .field("count", json!(item_count));
    }

    fn map_page_item(&self, json: &mut JsonObjectBuilder, item: Value) {
        json.push(&["_embedded"], "items", item);
    }
}
