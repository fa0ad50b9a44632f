//! Result printing.

use std::io::Write;

use bson::{Bson, Document};
use futures::{Stream, TryStreamExt};

use crate::error::{Error, Result};

/// Printed when a query yields no documents.
pub const NO_MATCHES: &str = "No matches.";

/// Renders a document as one line of relaxed extended JSON.
pub fn render(document: Document) -> Result<String> {
    let json = Bson::Document(document).into_relaxed_extjson();
    serde_json::to_string(&json).map_err(|e| Error::Decode(e.to_string()))
}

/// Drains `documents` into `out`, one line per document.
///
/// Returns the number of documents written. The stream is dropped, and its
/// cursor released, on every return path.
pub async fn write_results<S, W>(documents: S, out: &mut W) -> Result<usize>
where
    S: Stream<Item = Result<Document>>,
    W: Write,
{
    futures::pin_mut!(documents);
    let mut written = 0;
    while let Some(document) = documents.try_next().await? {
        writeln!(out, "{}", render(document)?).map_err(Error::Output)?;
        written += 1;
    }
    if written == 0 {
        writeln!(out, "{NO_MATCHES}").map_err(Error::Output)?;
    }
    out.flush().map_err(Error::Output)?;
    Ok(written)
}

#[cfg(test)]
mod tests {
    use bson::doc;
    use futures::{executor::block_on, stream};

    use super::*;

    #[test]
    fn writes_one_line_per_document() {
        let documents = stream::iter(vec![
            Ok(doc! { "name": "Pritam", "tags": ["HR"] }),
            Ok(doc! { "count": 3_i64, "name": "James" }),
        ]);
        let mut out = Vec::new();
        let written = block_on(write_results(documents, &mut out)).unwrap();
        assert_eq!(written, 2);
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "{\"name\":\"Pritam\",\"tags\":[\"HR\"]}\n{\"count\":3,\"name\":\"James\"}\n"
        );
    }

    #[test]
    fn empty_stream_prints_no_matches() {
        let mut out = Vec::new();
        let written = block_on(write_results(stream::empty::<Result<Document>>(), &mut out)).unwrap();
        assert_eq!(written, 0);
        assert_eq!(String::from_utf8(out).unwrap(), "No matches.\n");
    }

    #[test]
    fn stream_errors_stop_output() {
        let documents = stream::iter(vec![
            Ok(doc! { "name": "Pritam" }),
            Err(Error::Query("cursor killed".into())),
            Ok(doc! { "name": "James" }),
        ]);
        let mut out = Vec::new();
        let err = block_on(write_results(documents, &mut out)).unwrap_err();
        assert!(matches!(err, Error::Query(_)));
        assert_eq!(String::from_utf8(out).unwrap(), "{\"name\":\"Pritam\"}\n");
    }
}
