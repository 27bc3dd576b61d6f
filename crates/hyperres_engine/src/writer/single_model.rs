use serde_json::Value;

use super::helper::WriterHelper;
use super::json_builder::JsonObjectBuilder;
use super::mapper::MessageMapper;
use crate::functional_list::EmbeddedPath;
use crate::model::{Lookup, SingleModel};
use crate::request::RequestContext;

/// Writes the document of one model in the layout of a message mapper.
///
/// Embedded relations are written recursively into their own objects.
pub struct SingleModelWriter<'a> {
    helper: &'a WriterHelper,
    mapper: &'a dyn MessageMapper,
    context: &'a RequestContext,
}

impl<'a> SingleModelWriter<'a> {
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

    /// The document of `model`; None when its class is not registered.
    pub fn write(&self, model: &SingleModel) -> Option<Value> {
        if !self.helper.registry().representor(model.class()).is_found() {
            return None;
        }
        let mut json = JsonObjectBuilder::new();
        self.write_model(model, &EmbeddedPath::empty(), &mut json);
        Some(json.build())
    }

    fn write_model(&self, model: &SingleModel, path: &EmbeddedPath, json: &mut JsonObjectBuilder) {
        let (helper, mapper, context) = (self.helper, self.mapper, self.context);

        if let Lookup::Found(url) = helper.single_url(model, context) {
            mapper.map_self_url(json, &url);
        }
        helper.write_types(model.class(), |types| mapper.map_types(json, types));
        helper.write_fields(model, context, |key, value| mapper.map_field(json, key, value));
        helper.write_links(model.class(), context, |key, url| mapper.map_link(json, key, url));
        helper.write_binaries(model, context, |key, url| mapper.map_binary(json, key, &url));

        let Lookup::Found(representor) = helper.registry().representor(model.class()) else {
            return;
        };
        for relation in representor.related_models() {
            let mut linked = None;
            let mut embedded = None;
            helper.write_related_model(
                relation,
                model,
                path,
                context,
                |related, related_path| {
                    let mut document = JsonObjectBuilder::new();
                    self.write_model(related, related_path, &mut document);
                    embedded = Some(document.build());
                },
                |url, _, _| linked = Some(url.to_string()),
            );
            match (linked, embedded) {
                (Some(_), Some(document)) => {
                    mapper.map_embedded_resource(json, relation.key(), document)
                }
                (Some(url), None) => mapper.map_linked_resource_url(json, relation.key(), &url),
                _ => {}
            }
        }
        for collection in representor.related_collections() {
            helper.write_related_collection(collection, model, path, context, |url, _| {
                mapper.map_related_collection_url(json, collection.key(), url)
            });
        }
    }
}
