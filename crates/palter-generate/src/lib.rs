//! Schema-constrained generation of decoy resources.
//!
//! A resource shape (any type deriving [`schemars::JsonSchema`]) is turned
//! into a [`ResponseSchema`] that bounds the model's output, and the
//! [`Generator`] asks a [`ConstrainedModel`] for new instances that follow the
//! naming patterns of a set of examples.

pub mod error;
pub mod generator;
pub mod model;
pub mod prompt;
pub mod shape;
pub mod vertex;

pub use error::{GenerateError, ModelError};
pub use generator::{parse_instance, Generator, Shape};
pub use model::ConstrainedModel;
pub use prompt::render_prompt;
pub use shape::{derive_schema, from_json_schema, ResponseSchema, SchemaType, SchemaViolation};
pub use vertex::{ModelSettings, VertexClient};
