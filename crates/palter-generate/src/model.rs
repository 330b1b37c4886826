use async_trait::async_trait;

use crate::error::ModelError;
use crate::shape::ResponseSchema;

/// A generative model that can be bound to a response schema.
///
/// Implementations are shared across calls and must not keep per-call state.
#[async_trait]
pub trait ConstrainedModel: Send + Sync {
    /// Name of the underlying model, for logging.
    fn name(&self) -> &str;

    /// Run one prompt and return the raw JSON text of a single candidate.
    async fn generate_constrained(
        &self,
        prompt: &str,
        schema: &ResponseSchema,
    ) -> Result<String, ModelError>;
}
