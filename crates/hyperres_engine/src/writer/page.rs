use serde_json::Value;

use super::helper::WriterHelper;
use super::json_builder::JsonObjectBuilder;
use super::mapper::{MessageMapper, PageLink};
use super::single_model::SingleModelWriter;
use crate::model::{Lookup, Page};
use crate::request::RequestContext;

const COLLECTION_TYPE: &str = "Collection";

/// Writes one page of a collection: navigation URLs, counts and every item in full.
pub struct PageWriter<'a> {
    helper: &'a WriterHelper,
    mapper: &'a dyn MessageMapper,
    context: &'a RequestContext,
}

impl<'a> PageWriter<'a> {
    pub fn new(
        helper: &'a WriterHelper,
        mapper: &'a dyn MessageMapper,
        context: &'a RequestContext,
    ) -> Self {
        Self {
            helper,
            mapper,
            context,
        }
    }

    /// The page document; None when the item class is not registered.
    pub fn write(&self, page: &Page) -> Option<Value> {
        let Lookup::Found(collection_url) = self.helper.collection_url(page, self.context) else {
            return None;
        };
        let per_page = page.pagination().per_page();
        let page_url = |number: usize| format!("{}?page={}&per_page={}", collection_url, number, per_page);

        let mut json = JsonObjectBuilder::new();
        let mapper = self.mapper;
        mapper.map_page_url(&mut json, PageLink::Current, &page_url(page.pagination().page()));
        mapper.map_types(&mut json, &[COLLECTION_TYPE.to_string()]);
        mapper.map_page_url(&mut json, PageLink::First, &page_url(1));
        if let Some(previous) = page.previous_page() {
            mapper.map_page_url(&mut json, PageLink::Previous, &page_url(previous));
        }
        if let Some(next) = page.next_page() {
            mapper.map_page_url(&mut json, PageLink::Next, &page_url(next));
        }
        mapper.map_page_url(&mut json, PageLink::Last, &page_url(page.page_count()));
        mapper.map_page_counts(&mut json, page.total_count(), page.items().len(), page.page_count());

        let items = SingleModelWriter::new(self.helper, mapper, self.context);
        for item in page.items() {
            if let Some(document) = items.write(item) {
                mapper.map_page_item(&mut json, document);
            }
        }
        Some(json.build())
    }
}
