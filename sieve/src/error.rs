//! Error types and result definitions for sieve operations.
//!
//! Provides a classified error system with aggregation and captured diagnostic metadata. A
//! [`SieveError`] is either a single error with optional detail and source, or the aggregation of
//! the errors reported by several pipeline units that failed together.

use std::backtrace::Backtrace;
use std::borrow::Cow;
use std::error;
use std::fmt;
use std::panic::Location;
use std::sync::Arc;

/// Convenient result type for sieve operations using [`SieveError`] as the error type.
pub type SieveResult<T> = Result<T, SieveError>;

/// Data carried by a single [`SieveError`].
#[derive(Debug, Clone)]
struct ErrorPayload {
    kind: ErrorKind,
    description: Cow<'static, str>,
    detail: Option<Cow<'static, str>>,
    source: Option<Arc<dyn error::Error + Send + Sync>>,
    location: &'static Location<'static>,
    backtrace: Arc<Backtrace>,
}

/// Error returned by every fallible sieve operation.
///
/// Either a single classified error, or the errors of several units that failed in the same run.
#[derive(Debug, Clone)]
pub struct SieveError {
    repr: ErrorRepr,
}

#[derive(Debug, Clone)]
enum ErrorRepr {
    Single(Box<ErrorPayload>),
    /// Errors of the stage chain and of the generator, in join order.
    Many {
        errors: Vec<SieveError>,
        location: &'static Location<'static>,
    },
}

/// Specific categories of errors that can occur while running a pipeline.
#[derive(PartialEq, Eq, Copy, Clone, Debug, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    // Channel Errors
    ChannelClosed,

    // Resource Errors
    ChannelCreateFailed,
    StageSpawnFailed,
    RuntimeUnavailable,

    // Worker Errors
    StageWorkerPanic,
    StageWorkerCancelled,
    GeneratorWorkerPanic,
    GeneratorWorkerCancelled,

    // Lifecycle Errors
    PipelineShutdown,
    InvalidState,

    // IO Errors
    IoError,

    // Unknown / Uncategorized
    Unknown,

    // Special error kinds used for tests that trigger failures via fault injection.
    #[cfg(feature = "failpoints")]
    InjectedFault,
}

impl SieveError {
    /// Returns the [`ErrorKind`] of this error.
    ///
    /// An aggregated error reports the kind of its first error, which is the root cause of the
    /// failure, or [`ErrorKind::Unknown`] when it is empty.
    pub fn kind(&self) -> ErrorKind {
        match &self.repr {
            ErrorRepr::Single(payload) => payload.kind,
            ErrorRepr::Many { errors, .. } => {
                errors.first().map_or(ErrorKind::Unknown, SieveError::kind)
            }
        }
    }

    /// Returns the kinds of all errors, flattening aggregated errors depth first.
    pub fn kinds(&self) -> Vec<ErrorKind> {
        let mut kinds = vec![];
        self.collect_kinds(&mut kinds);

        kinds
    }

    fn collect_kinds(&self, kinds: &mut Vec<ErrorKind>) {
        match &self.repr {
            ErrorRepr::Single(payload) => kinds.push(payload.kind),
            ErrorRepr::Many { errors, .. } => {
                for err in errors {
                    err.collect_kinds(kinds);
                }
            }
        }
    }

    /// Returns the aggregated errors, or [`None`] for a single error.
    pub fn errors(&self) -> Option<&[SieveError]> {
        match &self.repr {
            ErrorRepr::Single(_) => None,
            ErrorRepr::Many { errors, .. } => Some(errors),
        }
    }

    /// Returns the dynamic detail, or the first one found among aggregated errors.
    pub fn detail(&self) -> Option<&str> {
        match &self.repr {
            ErrorRepr::Single(payload) => payload.detail.as_deref(),
            ErrorRepr::Many { errors, .. } => errors.iter().find_map(SieveError::detail),
        }
    }

    /// Returns the backtrace captured when a single error was created.
    pub fn backtrace(&self) -> Option<&Backtrace> {
        match &self.repr {
            ErrorRepr::Single(payload) => Some(&payload.backtrace),
            ErrorRepr::Many { .. } => None,
        }
    }

    /// Returns where the error was created.
    pub fn location(&self) -> &'static Location<'static> {
        match &self.repr {
            ErrorRepr::Single(payload) => payload.location,
            ErrorRepr::Many { location, .. } => location,
        }
    }

    /// Attaches the error that caused this one.
    ///
    /// Aggregated errors are left untouched, their source is their first error.
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: error::Error + Send + Sync + 'static,
    {
        if let ErrorRepr::Single(payload) = &mut self.repr {
            payload.source = Some(Arc::new(source));
        }

        self
    }

    #[track_caller]
    fn single(
        kind: ErrorKind,
        description: &'static str,
        detail: Option<Cow<'static, str>>,
    ) -> Self {
        SieveError {
            repr: ErrorRepr::Single(Box::new(ErrorPayload {
                kind,
                description: Cow::Borrowed(description),
                detail,
                source: None,
                location: Location::caller(),
                backtrace: Arc::new(Backtrace::capture()),
            })),
        }
    }
}

/// Two errors are equal when they carry the same kinds in the same order.
impl PartialEq for SieveError {
    fn eq(&self, other: &SieveError) -> bool {
        self.errors().is_some() == other.errors().is_some() && self.kinds() == other.kinds()
    }
}

impl fmt::Display for SieveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.repr {
            ErrorRepr::Single(payload) => {
                write!(
                    f,
                    "[{:?}] {} @ {}",
                    payload.kind, payload.description, payload.location
                )?;

                if let Some(detail) = &payload.detail {
                    f.write_str("\n  Detail:")?;
                    write_indented(f, detail, "    ")?;
                }

                Ok(())
            }
            ErrorRepr::Many { errors, location } => {
                write!(f, "[Many] {} errors aggregated @ {location}", errors.len())?;

                for (index, err) in errors.iter().enumerate() {
                    write!(f, "\n  {}.", index + 1)?;
                    write_indented(f, &err.to_string(), "     ")?;
                }

                Ok(())
            }
        }
    }
}

/// Writes each line of `text` on a new line prefixed with `indent`.
fn write_indented(f: &mut fmt::Formatter<'_>, text: &str, indent: &str) -> fmt::Result {
    let mut lines = text.lines();

    if let Some(first) = lines.next() {
        write!(f, "\n{indent}{first}")?;
    }
    for line in lines {
        write!(f, "\n{indent}{}", line.trim_end())?;
    }

    Ok(())
}

impl error::Error for SieveError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match &self.repr {
            ErrorRepr::Single(payload) => payload
                .source
                .as_deref()
                .map(|source| source as &(dyn error::Error + 'static)),
            ErrorRepr::Many { errors, .. } => errors
                .first()
                .map(|err| err as &(dyn error::Error + 'static)),
        }
    }
}

impl From<(ErrorKind, &'static str)> for SieveError {
    #[track_caller]
    fn from((kind, description): (ErrorKind, &'static str)) -> SieveError {
        SieveError::single(kind, description, None)
    }
}

impl<D> From<(ErrorKind, &'static str, D)> for SieveError
where
    D: Into<Cow<'static, str>>,
{
    #[track_caller]
    fn from((kind, description, detail): (ErrorKind, &'static str, D)) -> SieveError {
        SieveError::single(kind, description, Some(detail.into()))
    }
}

/// Aggregates the errors of several units.
///
/// A single error is returned as is instead of being wrapped.
impl<E> From<Vec<E>> for SieveError
where
    E: Into<SieveError>,
{
    #[track_caller]
    fn from(errors: Vec<E>) -> SieveError {
        let location = Location::caller();
        let mut errors: Vec<SieveError> = errors.into_iter().map(Into::into).collect();

        match errors.pop() {
            Some(err) if errors.is_empty() => err,
            last => {
                errors.extend(last);

                SieveError {
                    repr: ErrorRepr::Many { errors, location },
                }
            }
        }
    }
}

impl From<std::io::Error> for SieveError {
    #[track_caller]
    fn from(err: std::io::Error) -> SieveError {
        SieveError::single(
            ErrorKind::IoError,
            "I/O operation failed",
            Some(err.to_string().into()),
        )
        .with_source(err)
    }
}
