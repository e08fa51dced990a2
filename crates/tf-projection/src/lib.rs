//! tf-projection: pluggable projection queries over aggregated outputs.
//!
//! The aggregator treats the query grammar as opaque; anything implementing
//! [`Projector`] can be plugged in. The shipped default compiles JMESPath
//! expressions.

use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProjectionError {
    #[error("invalid projection expression: {0}")]
    InvalidExpression(String),
    #[error("projection evaluation failed: {0}")]
    Evaluation(String),
}

/// Evaluates a projection over aggregated outputs rendered as plain JSON
/// (canonical names as keys, output lists as arrays).
pub trait Projector: Send + Sync {
    fn project(&self, data: &Value) -> Result<Value, ProjectionError>;
}

/// Default projector backed by a compiled JMESPath expression.
#[derive(Debug)]
pub struct JmespathProjector {
    expression: jmespath::Expression<'static>,
}

impl JmespathProjector {
    pub fn new(query: &str) -> Result<Self, ProjectionError> {
        let expression = jmespath::compile(query)
            .map_err(|e| ProjectionError::InvalidExpression(e.to_string()))?;
        Ok(Self { expression })
    }
}

impl Projector for JmespathProjector {
    fn project(&self, data: &Value) -> Result<Value, ProjectionError> {
        let result = self
            .expression
            .search(data.clone())
            .map_err(|e| ProjectionError::Evaluation(e.to_string()))?;
        serde_json::to_value(&*result).map_err(|e| ProjectionError::Evaluation(e.to_string()))
    }
}
