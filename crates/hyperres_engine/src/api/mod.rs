/* 📖 # Why an API module in hyperres_engine?

The api module turns a frozen ResourceRegistry into an HttpService from
hyperres_base. Everything it answers is derived from the registry: the routes
decide what exists, the representors decide what a document shows, and the
negotiated mapper decides how it is laid out.
*/

mod negotiation;
mod service;

pub use negotiation::{accepted_media_types, select};
pub use service::{HypermediaService, HypermediaServiceBuilder};
