//! Adapters for emitting documents and tag sets through `slog`.
//!
//! This module connects redacted documents with `slog` by providing
//! `slog::Value` implementations that serialize them as structured JSON via
//! `slog`'s nested-value support.
//!
//! It is responsible for:
//! - Ensuring a logged document is the redacted form, never the source.
//! - Avoiding fallible logging APIs: conversion failures are represented as
//!   placeholder strings rather than propagated as errors.
//!
//! It does not configure `slog`; see [`crate::logging`] for the binary's drain.

use bson::Document;
use serde_json::Value as JsonValue;
use slog::{Key, Record, Result as SlogResult, Serializer, Value as SlogValue};

use crate::{redaction::redact, tags::TagSet};

/// Placeholder logged when a document cannot be converted to JSON.
pub const UNSERIALIZABLE_PLACEHOLDER: &str = "Failed to serialize document";

/// A `slog::Value` that emits a document as structured JSON.
///
/// The payload is stored as a `serde_json::Value`; BSON-specific types such as
/// object ids use their extended JSON form.
pub struct DocumentJson {
    value: JsonValue,
}

impl DocumentJson {
    fn new(value: JsonValue) -> Self {
        Self { value }
    }

    /// Wraps a document that is already safe to log.
    pub fn from_redacted(document: Document) -> Self {
        let value = serde_json::to_value(&document)
            .unwrap_or_else(|_| JsonValue::String(UNSERIALIZABLE_PLACEHOLDER.to_string()));
        Self::new(value)
    }

    /// Redacts `document` for `requester` and wraps the result.
    ///
    /// A pruned document logs as JSON `null`.
    pub fn redacted(document: &Document, requester: &TagSet) -> Self {
        redact(document, requester).map_or_else(|| Self::new(JsonValue::Null), Self::from_redacted)
    }

    /// The JSON that will be emitted.
    pub fn as_json(&self) -> &JsonValue {
        &self.value
    }
}

impl SlogValue for DocumentJson {
    fn serialize(&self, record: &Record<'_>, key: Key, serializer: &mut dyn Serializer) -> SlogResult {
        let nested = slog::Serde(self.value.clone());
        SlogValue::serialize(&nested, record, key, serializer)
    }
}

impl SlogValue for TagSet {
    fn serialize(&self, _record: &Record<'_>, key: Key, serializer: &mut dyn Serializer) -> SlogResult {
        serializer.emit_arguments(key, &format_args!("{self}"))
    }
}
