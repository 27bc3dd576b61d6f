use std::fmt;

/// Names a single resource: the resource path it is registered under plus its id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identifier {
    resource: String,
    id: String,
}

impl Identifier {
    pub fn new(resource: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            id: id.into(),
        }
    }

    /// The resource path, e.g. `books`.
    pub fn resource(&self) -> &str {
        &self.resource
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Relative URI of the form `/<resource>/<id>`, with the id percent-encoded.
    pub fn as_uri(&self) -> String {
        format!("/{}/{}", self.resource, urlencoding::encode(&self.id))
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_uri())
    }
}
