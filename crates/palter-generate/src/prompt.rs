use serde::Serialize;

const PREAMBLE: &str = "\
You are a cloud engineer producing decoy GCP resource definitions. Each decoy \
must look like it was created by the same team that created the existing \
resources below, so that anyone browsing the project takes it for a real one. \
Decoys exist to detect unauthorized access, so they must never point at or \
collide with real workloads.

## Goal

Produce one new resource definition whose identifiers and descriptive fields \
follow the naming convention of the examples exactly, while remaining a \
distinct resource that can be told apart internally for tracking.

## Criteria

- Believability: reads like a genuine resource of this organization.
- Subtlety: nothing about it draws attention or looks out of place.
- Natural integration: fits the existing resource set without friction.
- Non-interference: never reuses or shadows an existing identifier.
- Variability: avoid repeating the same template across decoys.
- Differentiation: stays distinguishable from the real resources.

## Method

1. Study the examples before writing anything.
2. Infer prefixes, separators, casing and numbering schemes.
3. Note department codes, environment markers and resource type hints.
4. Compose a new definition that follows those exact patterns.
5. Keep it plausible but unrelated to any critical system.

## Existing resources
";

const CLOSING: &str = "\n\
The result has to convince an experienced cloud engineer that it belongs to \
this organization.";

/// Render the instruction prompt for a batch of examples.
///
/// Examples are embedded as compact JSON, one bullet per example.
pub fn render_prompt<T: Serialize>(examples: &[T]) -> Result<String, serde_json::Error> {
    let mut prompt = String::from(PREAMBLE);
    for example in examples {
        prompt.push_str("\n- ");
        prompt.push_str(&serde_json::to_string(example)?);
    }
    prompt.push('\n');
    prompt.push_str(CLOSING);
    Ok(prompt)
}
