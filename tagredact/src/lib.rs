//! Tag-based redaction of nested documents fetched over mutually authenticated TLS.
//!
//! This crate separates:
//! - **Transport**: loading TLS material and opening a verified session to the
//!   document store.
//! - **Policy**: deciding, node by node, which parts of a document a requester
//!   may see.
//!
//! Every document node (top-level record, embedded document, or document inside
//! an array) carries its own `tags`. A requester holding a [`TagSet`] sees a
//! node only when the two sets intersect; otherwise the node and its whole
//! subtree are removed. Tags are never inherited from a parent.
//!
//! Key rules:
//! - Use [`redact`] for raw `bson::Document` trees.
//! - Use `#[derive(TagScoped)]` with `#[redact(tags)]` and `#[redact]` for typed
//!   records.
//! - Use [`redaction_pipeline`] to let the store prune before anything is sent.
//!
//! What this crate does:
//! - loads root CA bundles and client identities ([`tls`])
//! - connects, verifies liveness, and wraps the store in a [`Session`]
//! - applies the tag-intersection rule client-side or server-side
//!
//! What it does not do:
//! - authenticate requesters or decide which tags they hold
//! - persist anything beyond the demonstration records in [`seed`]

// <https://doc.rust-lang.org/rustc/lints/listing/allowed-by-default.html>
#![warn(
    anonymous_parameters,
    bare_trait_objects,
    elided_lifetimes_in_paths,
    missing_copy_implementations,
    rust_2018_idioms,
    trivial_casts,
    trivial_numeric_casts,
    unreachable_pub,
    unsafe_code,
    unused_extern_crates,
    unused_import_braces
)]
// <https://rust-lang.github.io/rust-clippy/stable>
#![warn(
    clippy::all,
    clippy::cargo,
    clippy::dbg_macro,
    clippy::float_cmp_const,
    clippy::get_unwrap,
    clippy::mem_forget,
    clippy::nursery,
    clippy::pedantic,
    clippy::todo,
    clippy::unwrap_used,
    clippy::uninlined_format_args
)]
// Allow some clippy lints
#![allow(
    clippy::default_trait_access,
    clippy::doc_markdown,
    clippy::if_not_else,
    clippy::module_name_repetitions,
    clippy::multiple_crate_versions,
    clippy::must_use_candidate,
    clippy::needless_pass_by_value,
    clippy::use_self,
    clippy::cargo_common_metadata,
    clippy::missing_errors_doc,
    clippy::struct_excessive_bools,
    clippy::missing_const_for_fn,
    clippy::redundant_pub_crate,
    clippy::result_large_err,
    clippy::future_not_send,
    clippy::option_if_let_else
)]
// Allow some lints while testing
#![cfg_attr(test, allow(clippy::non_ascii_literal, clippy::unwrap_used))]

pub use tagredact_derive::TagScoped;

// Module declarations
pub mod config;
pub mod connector;
mod error;
pub mod logging;
mod redaction;
pub mod seed;
pub mod sink;
pub mod slog;
pub mod store;
mod tags;
pub mod tls;

// Re-exports
pub use connector::{Endpoint, SecureConnector, DEFAULT_CONNECT_TIMEOUT, DEFAULT_PORT};
pub use error::{Error, Result};
pub use redaction::{
    decide, node_tags, parse_redact_stage, redact, redact_all, redact_stage, redact_stream,
    redact_with, redaction_pipeline, ChildSlot, Decision, Redactable, RedactionRule,
    TagIntersection, TagSource, TAGS_FIELD,
};
pub use store::{Namespace, SeedOutcome, Session};
pub use tags::TagSet;

// The derive macro and the trait share a name; the trait lives in the type
// namespace, the macro in the macro namespace.
pub use redaction::TagScoped;
