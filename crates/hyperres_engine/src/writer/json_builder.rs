use serde_json::{Map, Value};

/// Builds a JSON object by writing values at nested key paths.
///
/// Intermediate objects are created on demand. Writing through a key that holds
/// a non-object value replaces that value with an object.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JsonObjectBuilder {
    root: Map<String, Value>,
}

impl JsonObjectBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `key` on the root object.
    pub fn field(&mut self, key: &str, value: Value) -> &mut Self {
        self.root.insert(key.to_string(), value);
        self
    }

    /// Set `key` on the object found at `path`, e.g. `(["_links", "self"], "href")`.
    pub fn nested_field(&mut self, path: &[&str], key: &str, value: Value) -> &mut Self {
        self.object_at(path).insert(key.to_string(), value);
        self
    }

    /// Append `value` to the array under `key` of the object at `path`.
    pub fn push(&mut self, path: &[&str], key: &str, value: Value) -> &mut Self {
        let slot = self
            .object_at(path)
            .entry(key.to_string())
            .or_insert_with(|| Value::Array(vec![]));
        match slot {
            Value::Array(values) => values.push(value),
            other => *other = Value::Array(vec![value]),
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }

    pub fn build(self) -> Value {
        Value::Object(self.root)
    }

    fn object_at(&mut self, path: &[&str]) -> &mut Map<String, Value> {
        let mut current = &mut self.root;
        for segment in path {
            let entry = current
                .entry(segment.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !entry.is_object() {
                *entry = Value::Object(Map::new());
            }
            current = match entry {
                Value::Object(map) => map,
                _ => unreachable!(),
            };
        }
        current
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_nested_fields_create_objects() {
        let mut json = JsonObjectBuilder::new();
        json.field("title", json!("Dune"))
            .nested_field(&["_links", "self"], "href", json!("http://h/p/books/1"))
            .nested_field(&["_links", "author"], "href", json!("http://h/p/authors/1"));
        assert_eq!(
            json.build(),
            json!({
                "title": "Dune",
                "_links": {
                    "self": {"href": "http://h/p/books/1"},
                    "author": {"href": "http://h/p/authors/1"}
                }
            })
        );
    }

    #[test]
    fn test_push_appends_to_array() {
        let mut json = JsonObjectBuilder::new();
        assert!(json.is_empty());
        json.push(&[], "members", json!(1))
            .push(&[], "members", json!(2))
            .push(&["_embedded"], "items", json!({"a": 1}));
        assert_eq!(
            json.build(),
            json!({"members": [1, 2], "_embedded": {"items": [{"a": 1}]}})
        );
    }

    #[test]
    fn test_scalar_is_replaced_by_object() {
        let mut json = JsonObjectBuilder::new();
        json.field("links", json!("oops"))
            .nested_field(&["links"], "author", json!("http://h/p/authors/1"));
        assert_eq!(
            json.build(),
            json!({"links": {"author": "http://h/p/authors/1"}})
        );
    }
}
