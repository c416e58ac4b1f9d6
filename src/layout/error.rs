use thiserror::Error;

/// Fatal layout failures. Anything here aborts the slide; recoverable
/// conditions (ratio part-count mismatch, font floor) degrade with a
/// warning instead of surfacing as an error.
#[derive(Debug, Error)]
pub enum LayoutError {
    #[error("circular dependency detected while resolving container \"{0}\"")]
    CircularDependency(String),

    #[error("container \"{0}\" is not defined in the template")]
    MissingContainer(String),

    #[error("failed to evaluate expression \"{expr}\": {reason}")]
    ExpressionEvaluation { expr: String, reason: String },

    #[error("container \"{0}\" declares neither bounds nor positioning")]
    MissingGeometry(String),

    #[error("graphic \"{graphic}\" needs at least {required} items in container \"{container}\"")]
    InsufficientTimelineItems {
        graphic: &'static str,
        container: String,
        required: usize,
    },
}

impl LayoutError {
    pub fn expression(expr: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ExpressionEvaluation {
            expr: expr.into(),
            reason: reason.into(),
        }
    }
}

pub type LayoutResult<T> = Result<T, LayoutError>;
