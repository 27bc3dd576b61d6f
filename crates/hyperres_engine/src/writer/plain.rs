use serde_json::{Value, json};

use super::json_builder::JsonObjectBuilder;
use super::mapper::{MessageMapper, PageLink};

/// `application/json`: every kind of element in its own top-level object.
///
/// ```text
/// { "self", "types", "fields", "links", "binaries", "relatedCollections", "embedded" }
/// ```
/// Pages carry `self`, `pages`, `totalItems`, `numberOfItems`, `pageCount` and `members`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainJsonMapper;

impl MessageMapper for PlainJsonMapper {
    fn media_type(&self) -> &'static str {
        "application/json"
    }

    fn map_self_url(&self, json: &mut JsonObjectBuilder, url: &str) {
        json.field("self", json!(url));
    }

    fn map_types(&self, json: &mut JsonObjectBuilder, types: &[String]) {
        json.field("types", json!(types));
    }

    fn map_field(&self, json: &mut JsonObjectBuilder, key: &str, value: Value) {
        json.nested_field(&["fields"], key, value);
    }

    fn map_link(&self, json: &mut JsonObjectBuilder, key: &str, url: &str) {
        json.nested_field(&["links"], key, json!(url));
    }

    fn map_binary(&self, json: &mut JsonObjectBuilder, key: &str, url: &str) {
        json.nested_field(&["binaries"], key, json!(url));
    }

    fn map_linked_resource_url(&self, json: &mut JsonObjectBuilder, key: &str, url: &str) {
        json.nested_field(&["links"], key, json!(url));
    }

    fn map_embedded_resource(&self, json: &mut JsonObjectBuilder, key: &str, document: Value) {
        json.nested_field(&["embedded"], key, document);
    }

    fn map_related_collection_url(&self, json: &mut JsonObjectBuilder, key: &str, url: &str) {
        json.nested_field(&["relatedCollections"], key, json!(url));
    }

    fn map_page_url(&self, json: &mut JsonObjectBuilder, link: PageLink, url: &str) {
        match link {
            PageLink::Current => json.field("self", json!(url)),
            other => json.nested_field(&["pages"], other.relation(), json!(url)),
        };
    }

    fn map_page_counts(
        &self,
        json: &mut JsonObjectBuilder,
        total_count: usize,
        item_count: usize,
        page_count: usize,
    ) {
        json.field("totalItems", json!(total_count))
            .field("numberOfItems", json!(item_count))
            .field("pageCount", json!(page_count));
    }

    fn map_page_item(&self, json: &mut JsonObjectBuilder, item: Value) {
        json.push(&[], "members", item);
    }
}
