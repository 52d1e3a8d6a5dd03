//! Build errors and the per-phase error collector.

use std::io;
use std::time::Duration;

use parking_lot::Mutex;
use thiserror::Error;

use crate::address::RefError;
use crate::config::ConfigError;
use crate::core::BuildPhase;
use crate::log;
use crate::render::RenderError;

#[derive(Debug, Error)]
pub enum BuildError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Error attributed to a source file.
    #[error("{path}{}: {message}", line_suffix(.line))]
    File {
        path: String,
        line: Option<usize>,
        message: String,
    },

    #[error(transparent)]
    Reference(#[from] RefError),

    #[error("failed to render {page}: {message}")]
    Render { page: String, message: String },

    #[error("build timed out after {}ms", .elapsed.as_millis())]
    Timeout { elapsed: Duration },

    /// Broken internal invariant; the build cannot continue.
    #[error("internal error: {0}")]
    Invariant(String),

    #[error("build phase {actual} reached while {expected} was required")]
    Phase {
        expected: BuildPhase,
        actual: BuildPhase,
    },

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },
}

fn line_suffix(line: &Option<usize>) -> String {
    line.map(|l| format!(":{l}")).unwrap_or_default()
}

impl BuildError {
    pub fn file(path: impl Into<String>, line: Option<usize>, message: impl Into<String>) -> Self {
        Self::File {
            path: path.into(),
            line,
            message: message.into(),
        }
    }

    pub fn io(context: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Attach a page to a renderer failure, keeping line information.
    pub fn from_render(page: &str, err: RenderError) -> Self {
        match err {
            RenderError::Source { line, message } => Self::file(page, line, message),
            RenderError::Reference(err) => Self::Reference(err),
            other => Self::Render {
                page: page.to_string(),
                message: other.to_string(),
            },
        }
    }

    /// Whether the error points at a specific source file.
    pub fn has_file_context(&self) -> bool {
        match self {
            Self::File { .. } => true,
            Self::Render { page, .. } => !page.is_empty(),
            Self::Reference(RefError::Ambiguous { context, .. }) => context.is_some(),
            _ => false,
        }
    }

    /// Fatal errors stop the build immediately.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Config(_) | Self::Timeout { .. } | Self::Invariant(_) | Self::Phase { .. }
        )
    }
}

/// Collects per-page errors from a parallel phase.
///
/// [`finish`](Self::finish) picks one representative, preferring errors with
/// file context, and logs the others up to `max_logged`.
#[derive(Debug)]
pub struct ErrorCollector {
    errors: Mutex<Vec<BuildError>>,
    max_logged: usize,
}

impl ErrorCollector {
    pub fn new(max_logged: usize) -> Self {
        Self {
            errors: Mutex::new(Vec::new()),
            max_logged,
        }
    }

    pub fn push(&self, err: BuildError) {
        self.errors.lock().push(err);
    }

    pub fn len(&self) -> usize {
        self.errors.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.lock().is_empty()
    }

    /// Log every collected error without failing, returning how many there
    /// were.
    pub fn log_all(self) -> usize {
        let errors = self.errors.into_inner();
        for err in errors.iter().take(self.max_logged) {
            log!("error"; "{}", err);
        }
        if errors.len() > self.max_logged {
            log!("error"; "... and {} more", errors.len() - self.max_logged);
        }
        errors.len()
    }

    /// `Ok(())` when nothing was collected, else the representative error.
    pub fn finish(self) -> Result<(), BuildError> {
        let mut errors = self.errors.into_inner();
        if errors.is_empty() {
            return Ok(());
        }
        let pick = errors
            .iter()
            .position(BuildError::has_file_context)
            .unwrap_or(0);
        let representative = errors.remove(pick);

        for err in errors.iter().take(self.max_logged) {
            log!("error"; "{}", err);
        }
        if errors.len() > self.max_logged {
            log!("error"; "... and {} more", errors.len() - self.max_logged);
        }
        Err(representative)
    }
}
