//! Redaction rules, traversal, and entrypoints.
//!
//! This module ties the pieces together:
//!
//! - **`rule`**: Decision layer - what happens to one node (`RedactionRule`, `Decision`)
//! - **`engine`**: BSON layer - recursive pruning of `bson::Document` trees
//! - **`scoped`**: Typed layer - the same pruning for `#[derive(TagScoped)]` structs
//! - **`pipeline`**: Store layer - the rule as a `$redact` aggregation stage
//!
//! Requester tag sets live in `crate::tags`.

mod engine;
mod pipeline;
mod rule;
mod scoped;

pub use engine::{decide, node_tags, redact, redact_all, redact_stream, redact_with, TAGS_FIELD};
pub use pipeline::{parse_redact_stage, redact_stage, redaction_pipeline};
pub use rule::{Decision, RedactionRule, TagIntersection};
pub use scoped::{ChildSlot, Redactable, TagScoped, TagSource};
