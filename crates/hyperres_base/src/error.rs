use std::error::Error as StdError;
use std::fmt;
use std::path::PathBuf;

use tracing_error::{SpanTrace, SpanTraceStatus};

/* 📖 # Why a custom error type and not use anyhow/eyre/thiserror etc?

- Better control over error handling
- Errors carry the span trace of the request or registration that produced them
- The API service needs to pattern match on the error kind to choose a status code
 */

/// Error variants that can occur while registering or serving resources.
/// Each variant represents a specific error category with its associated context.
#[derive(Debug)]
pub enum ErrorKind {
    /// File system operation failed
    FileError {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The resources were declared or wired incorrectly.
    /// These are fatal and surface once, at startup or at the first point of need.
    Configuration { message: String },

    /// The addressed resource does not exist
    NotFound { message: String },

    /// The request could not be understood
    BadRequest { message: String },

    /// The resource exists but does not support the requested operation
    MethodNotAllowed { message: String },

    /// Multiple errors occurred during batch operations
    Multiple {
        errors: Vec<HyperresError>,
        count: usize,
    },

    /// Catch-all for other errors with a message
    Message { message: String },
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::FileError { path, source } => {
                write!(f, "File error at {}: {}", path.display(), source)
            }
            ErrorKind::Configuration { message } => {
                write!(f, "Configuration error: {}", message)
            }
            ErrorKind::NotFound { message }
            | ErrorKind::BadRequest { message }
            | ErrorKind::MethodNotAllowed { message }
            | ErrorKind::Message { message } => write!(f, "{}", message),
            ErrorKind::Multiple { errors, count } => {
                write!(f, "Multiple errors occurred ({} total)", count)?;
                if let Some(first) = errors.first() {
                    write!(f, ": {}", first)?;
                }
                Ok(())
            }
        }
    }
}

/* 📖 # Why separate ErrorKind and HyperresError?
ErrorKind holds the structural variant callers match on (the API service maps
NotFound to 404, MethodNotAllowed to 405 and so on). HyperresError wraps it with
the runtime context strings and the span trace captured when the error was
created.
*/

/// Error type wrapping ErrorKind with context and span trace.
pub struct HyperresError {
    kind: ErrorKind,
    context: Vec<String>,
    span_trace: SpanTrace,
}

impl HyperresError {
    /// Creates a new error from an ErrorKind, capturing the current span trace.
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            context: vec![],
            span_trace: SpanTrace::capture(),
        }
    }

    /// Creates a catch-all error with a message.
    pub fn message(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Message {
            message: message.into(),
        })
    }

    /// Creates a fatal configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Configuration {
            message: message.into(),
        })
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound {
            message: message.into(),
        })
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::BadRequest {
            message: message.into(),
        })
    }

    pub fn method_not_allowed(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::MethodNotAllowed {
            message: message.into(),
        })
    }

    /// Collects several errors into one. Returns None for an empty list.
    pub fn multiple(errors: Vec<HyperresError>) -> Option<Self> {
        if errors.is_empty() {
            return None;
        }
        let count = errors.len();
        Some(Self::new(ErrorKind::Multiple { errors, count }))
    }

    /// Like `multiple`, but a single error is returned as is.
    pub fn combine(mut errors: Vec<HyperresError>) -> Option<Self> {
        if errors.len() == 1 {
            return errors.pop();
        }
        Self::multiple(errors)
    }

    /// Attaches context to an error.
    /// Context is displayed before the error message.
    pub fn context(mut self, context: impl Into<String>) -> Self {
        self.context.push(context.into());
        self
    }

    /// Attaches context using lazy evaluation.
    pub fn with_context<F>(mut self, f: F) -> Self
    where
        F: FnOnce() -> String,
    {
        self.context.push(f());
        self
    }

    /// Returns a reference to the underlying ErrorKind.
    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    /// Returns the context strings in the order they were attached.
    pub fn get_context(&self) -> &[String] {
        &self.context
    }

    /// Returns the span trace captured when the error was created.
    pub fn span_trace(&self) -> &SpanTrace {
        &self.span_trace
    }

    /// Returns the innermost error in the chain.
    pub fn root_cause(&self) -> &(dyn StdError + 'static) {
        let mut current: &(dyn StdError + 'static) = self;
        while let Some(next) = current.source() {
            current = next;
        }
        current
    }

    fn fmt_tree(&self, f: &mut fmt::Formatter<'_>, indent: &str) -> fmt::Result {
        write!(f, "{}", self.kind)?;

        let mut children: Vec<Child<'_>> =
            self.context.iter().map(|c| Child::Context(c)).collect();
        if let ErrorKind::Multiple { errors, .. } = &self.kind {
            children.extend(errors.iter().map(Child::Error));
        }

        let last_index = children.len().saturating_sub(1);
        for (index, child) in children.iter().enumerate() {
            let last = index == last_index;
            let connector = if last { "└─ " } else { "├─ " };
            let nested_indent = format!("{}{}", indent, if last { "   " } else { "│  " });
            write!(f, "\n{}{}", indent, connector)?;
            match child {
                Child::Context(context) => write!(f, "{}", context)?,
                Child::Error(error) => {
                    write!(f, "error: ")?;
                    error.fmt_tree(f, &nested_indent)?;
                }
            }
        }
        Ok(())
    }
}

enum Child<'a> {
    Context(&'a String),
    Error(&'a HyperresError),
}

impl From<ErrorKind> for HyperresError {
    fn from(kind: ErrorKind) -> Self {
        Self::new(kind)
    }
}

impl StdError for HyperresError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match &self.kind {
            ErrorKind::FileError { source, .. } => Some(source),
            ErrorKind::Multiple { errors, .. } => errors.first().and_then(|e| e.source()),
            _ => None,
        }
    }
}

impl fmt::Display for HyperresError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for context in &self.context {
            write!(f, "{}: ", context)?;
        }
        write!(f, "{}", self.kind)
    }
}

/* 📖 # Why a tree-shaped Debug output?
Errors printed at startup (a misdeclared representor, a broken config file) are
read by humans. Showing the message first, then context and nested errors as a tree,
then the span trace, keeps the interesting line at the top.
*/
impl fmt::Debug for HyperresError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_tree(f, "")?;
        if self.span_trace.status() == SpanTraceStatus::CAPTURED {
            write!(f, "\nTrace: {}", self.span_trace)?;
        }
        Ok(())
    }
}

/* 📖 # Why use Box<HyperresError> in the result type?

Boxing the error reduces the size of the result type, making it more efficient to return in the common case.

*/

/// Standard result type for hyperres operations.
pub type HyperresResult<T> = std::result::Result<T, Box<HyperresError>>;

/// Extension trait for attaching context to Results.
pub trait ResultExt<T> {
    /// Attaches context to an error, consuming and re-wrapping it.
    fn context(self, context: impl Into<String>) -> HyperresResult<T>;

    /// Attaches context using lazy evaluation.
    /// Context is only evaluated if the result is an error.
    fn with_context<F>(self, f: F) -> HyperresResult<T>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for HyperresResult<T> {
    fn context(self, context: impl Into<String>) -> HyperresResult<T> {
        self.map_err(|err| Box::new(err.context(context)))
    }

    fn with_context<F>(self, f: F) -> HyperresResult<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|err| Box::new(err.with_context(f)))
    }
}

/// Creates a boxed error from a format string.
///
/// A leading `not_found`, `bad_request`, `method_not_allowed` or `configuration`
/// selects the error kind; without one the error is a plain message.
///
/// ```
/// use hyperres_base::{ErrorKind, err};
///
/// let error = err!(not_found, "no book with isbn '{}'", "42");
/// assert!(matches!(error.kind(), ErrorKind::NotFound { .. }));
/// assert_eq!(err!("{}-{}", "a", 1).to_string(), "a-1");
/// ```
#[macro_export]
macro_rules! err {
    (not_found, $($arg:tt)+) => {
        Box::new($crate::HyperresError::not_found(format!($($arg)+)))
    };
    (bad_request, $($arg:tt)+) => {
        Box::new($crate::HyperresError::bad_request(format!($($arg)+)))
    };
    (method_not_allowed, $($arg:tt)+) => {
        Box::new($crate::HyperresError::method_not_allowed(format!($($arg)+)))
    };
    (configuration, $($arg:tt)+) => {
        Box::new($crate::HyperresError::configuration(format!($($arg)+)))
    };
    ($($arg:tt)*) => {
        Box::new($crate::HyperresError::message(format!($($arg)*)))
    };
}

/// Returns early with a boxed error, see `err!`.
#[macro_export]
macro_rules! bail {
    ($($arg:tt)*) => {
        return Err($crate::err!($($arg)*))
    };
}
