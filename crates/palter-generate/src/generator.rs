use std::sync::Arc;

use futures::stream::{self, StreamExt, TryStreamExt};
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::error::GenerateError;
use crate::model::ConstrainedModel;
use crate::prompt::render_prompt;
use crate::shape::{derive_schema, ResponseSchema};

/// A resource shape the generator can produce.
pub trait Shape: JsonSchema + Serialize + DeserializeOwned + Send + Sync {}

impl<T> Shape for T where T: JsonSchema + Serialize + DeserializeOwned + Send + Sync {}

/// Produces new instances of a shape by asking a constrained model to follow
/// the naming patterns of a set of examples.
#[derive(Clone)]
pub struct Generator {
    model: Arc<dyn ConstrainedModel>,
    concurrency: usize,
}

impl Generator {
    /// A generator issuing one call at a time.
    pub fn new(model: Arc<dyn ConstrainedModel>) -> Self {
        Self {
            model,
            concurrency: 1,
        }
    }

    /// Allow up to `width` calls in flight. Zero is treated as one.
    pub fn with_concurrency(mut self, width: usize) -> Self {
        self.concurrency = width.max(1);
        self
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    pub fn model_name(&self) -> &str {
        self.model.name()
    }

    /// Generate exactly `count` instances of `T`, or fail.
    ///
    /// Any failed call aborts the batch and drops the calls still in flight.
    /// With more than one call in flight the order of the result is
    /// unspecified.
    pub async fn generate_many<T: Shape>(
        &self,
        cancel: &CancellationToken,
        examples: &[T],
        count: usize,
    ) -> Result<Vec<T>, GenerateError> {
        if count == 0 {
            return Ok(Vec::new());
        }

        let schema = derive_schema::<T>()?;
        let prompt = render_prompt(examples)?;
        debug!(
            examples = examples.len(),
            count,
            concurrency = self.concurrency,
            model = self.model.name(),
            "starting generation"
        );

        let calls: Vec<_> = (0..count)
            .map(|index| self.generate_one::<T>(cancel, &prompt, &schema, index))
            .collect();
        let instances: Vec<T> = stream::iter(calls)
            .buffer_unordered(self.concurrency)
            .try_collect()
            .await?;

        info!(count = instances.len(), model = self.model.name(), "generated instances");
        Ok(instances)
    }

    async fn generate_one<T: Shape>(
        &self,
        cancel: &CancellationToken,
        prompt: &str,
        schema: &ResponseSchema,
        index: usize,
    ) -> Result<T, GenerateError> {
        let text = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(GenerateError::Cancelled),
            result = self.model.generate_constrained(prompt, schema) => {
                result.map_err(|source| GenerateError::Model { index, source })?
            }
        };
        debug!(index, bytes = text.len(), "received model response");
        parse_instance(&text, schema)
    }
}

/// Decode one model response into an instance of `T`.
///
/// The text must hold a single JSON object that satisfies `schema`.
pub fn parse_instance<T: DeserializeOwned>(
    text: &str,
    schema: &ResponseSchema,
) -> Result<T, GenerateError> {
    let value: Value = serde_json::from_str(text.trim())
        .map_err(|e| GenerateError::MalformedResponse(e.to_string()))?;
    if !value.is_object() {
        return Err(GenerateError::MalformedResponse(
            "expected a single JSON object".to_string(),
        ));
    }
    schema.validate(&value)?;
    serde_json::from_value(value).map_err(|e| GenerateError::MalformedResponse(e.to_string()))
}
