//! Server-side redaction: the same tag-intersection rule expressed as a
//! `$redact` aggregation stage, so pruned subtrees never leave the store.
//!
//! The stage evaluates every embedded document on its own `tags`, exactly like
//! the client-side engine. A missing or non-array `tags` value counts as an
//! empty set rather than failing the aggregation.
//!
//! Requester tags are wrapped in `$literal`: a bare string starting with `$`
//! would otherwise be read as a field path by the store.

use bson::{doc, Bson, Document};

use super::engine::TAGS_FIELD;
use crate::tags::TagSet;

const DESCEND: &str = "$$DESCEND";
const PRUNE: &str = "$$PRUNE";
const LITERAL: &str = "$literal";

/// Builds the `$redact` stage for a requester.
pub fn redact_stage(requester: &TagSet) -> Document {
    let field = format!("${TAGS_FIELD}");
    let mut requester_literal = Document::new();
    requester_literal.insert(LITERAL, requester.iter().map(Bson::from).collect::<Vec<_>>());
    doc! {
        "$redact": {
            "$cond": {
                "if": {
                    "$gt": [
                        {
                            "$size": {
                                "$setIntersection": [
                                    { "$cond": [{ "$isArray": [field.as_str()] }, field.as_str(), []] },
                                    requester_literal,
                                ]
                            }
                        },
                        0,
                    ]
                },
                "then": DESCEND,
                "else": PRUNE,
            }
        }
    }
}

/// Builds a `$match` + `$redact` pipeline.
pub fn redaction_pipeline(filter: Document, requester: &TagSet) -> Vec<Document> {
    vec![doc! { "$match": filter }, redact_stage(requester)]
}

/// Recovers the requester tag set from a stage built by [`redact_stage`].
///
/// Returns `None` for any other stage shape.
pub fn parse_redact_stage(stage: &Document) -> Option<TagSet> {
    let cond = stage.get_document("$redact").ok()?.get_document("$cond").ok()?;
    if cond.get_str("then").ok()? != DESCEND || cond.get_str("else").ok()? != PRUNE {
        return None;
    }
    let comparison = cond.get_document("if").ok()?.get_array("$gt").ok()?;
    if comparison.get(1).and_then(bson_as_i64) != Some(0) {
        return None;
    }
    let operands = comparison
        .first()?
        .as_document()?
        .get_document("$size")
        .ok()?
        .get_array("$setIntersection")
        .ok()?;
    let tags = match operands.get(1)? {
        Bson::Array(tags) => tags,
        Bson::Document(wrapped) if wrapped.len() == 1 => wrapped.get_array(LITERAL).ok()?,
        _ => return None,
    };
    tags.iter().map(|tag| tag.as_str()).collect()
}

fn bson_as_i64(value: &Bson) -> Option<i64> {
    match value {
        Bson::Int32(n) => Some(i64::from(*n)),
        Bson::Int64(n) => Some(*n),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use bson::doc;

    use super::*;

    fn tags(values: &[&str]) -> TagSet {
        values.iter().copied().collect()
    }

    #[test]
    fn stage_lists_requester_tags() {
        let stage = redact_stage(&tags(&["IT", "HR"]));
        let cond = stage
            .get_document("$redact")
            .unwrap()
            .get_document("$cond")
            .unwrap();
        assert_eq!(cond.get_str("then").unwrap(), "$$DESCEND");
        assert_eq!(cond.get_str("else").unwrap(), "$$PRUNE");
    }

    #[test]
    fn parse_recovers_tag_set() {
        let requester = tags(&["HR", "IT", "MAN"]);
        assert_eq!(parse_redact_stage(&redact_stage(&requester)), Some(requester));
        assert_eq!(parse_redact_stage(&redact_stage(&TagSet::new())), Some(TagSet::new()));
    }

    #[test]
    fn requester_tags_are_literal() {
        let requester = tags(&["$HR", "IT"]);
        let stage = redact_stage(&requester);
        let operands = stage
            .get_document("$redact")
            .and_then(|redact| redact.get_document("$cond"))
            .and_then(|cond| cond.get_document("if"))
            .and_then(|cmp| cmp.get_array("$gt"))
            .unwrap()[0]
            .as_document()
            .unwrap()
            .get_document("$size")
            .and_then(|size| size.get_array("$setIntersection"))
            .unwrap()
            .clone();
        assert_eq!(
            operands[1],
            Bson::Document(doc! { "$literal": ["$HR", "IT"] })
        );
        assert_eq!(parse_redact_stage(&stage), Some(requester));
    }

    #[test]
    fn parse_accepts_bare_tag_array() {
        let stage = doc! {
            "$redact": { "$cond": {
                "if": { "$gt": [
                    { "$size": { "$setIntersection": [
                        { "$cond": [{ "$isArray": ["$tags"] }, "$tags", []] },
                        ["HR"],
                    ] } },
                    0,
                ] },
                "then": "$$DESCEND",
                "else": "$$PRUNE",
            } }
        };
        assert_eq!(parse_redact_stage(&stage), Some(tags(&["HR"])));
    }

    #[test]
    fn parse_rejects_other_stages() {
        assert_eq!(parse_redact_stage(&doc! { "$match": {} }), None);
        assert_eq!(
            parse_redact_stage(&doc! { "$redact": { "$cond": { "if": true, "then": "$$KEEP", "else": "$$PRUNE" } } }),
            None
        );
    }

    #[test]
    fn pipeline_matches_then_redacts() {
        let pipeline = redaction_pipeline(doc! { "name": "Pritam" }, &tags(&["HR"]));
        assert_eq!(pipeline.len(), 2);
        assert_eq!(
            pipeline[0].get_document("$match").unwrap(),
            &doc! { "name": "Pritam" }
        );
        assert!(parse_redact_stage(&pipeline[1]).is_some());
    }
}
