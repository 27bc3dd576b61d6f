/* 📖 # Why have hyperres_base as a core library?
hyperres_base provides the error type, tracing setup and the HTTP plumbing used
by every other crate. The engine stays free of any particular server, and the
CLI only glues the two together.
*/

pub mod error;
pub mod http;
pub mod server;
pub mod tracing;

// Re-export commonly used types for convenience
pub use error::{ErrorKind, HyperresError, HyperresResult, ResultExt};
