//! CSV rendering for the submission export.

use std::fmt::Write;
use std::io;

use bytes::Bytes;
use chrono::SecondsFormat;
use futures_util::stream::{self, Stream, StreamExt};

use crate::models::Submission;
use crate::store::SubmissionStream;

pub const COLUMNS: [&str; 9] = [
    "timestamp",
    "name",
    "role",
    "support",
    "response",
    "clarity",
    "reports",
    "overall",
    "comments",
];

pub fn header_line() -> String {
    let mut line = COLUMNS.join(",");
    line.push('\n');
    line
}

/// One CSV line. Text is always quoted, ratings are bare, nulls are empty.
pub fn render_row(sub: &Submission) -> String {
    let mut line = sub.created_at.to_rfc3339_opts(SecondsFormat::Millis, true);

    for cell in [Some(sub.name.as_str()), Some(sub.role.as_str())] {
        line.push(',');
        push_text(&mut line, cell);
    }
    for rating in [sub.support, sub.response, sub.clarity] {
        line.push(',');
        push_number(&mut line, rating);
    }
    line.push(',');
    push_text(&mut line, sub.reports.as_deref());
    line.push(',');
    push_number(&mut line, sub.overall);
    line.push(',');
    push_text(&mut line, sub.comments.as_deref());

    line.push('\n');
    line
}

fn push_text(line: &mut String, value: Option<&str>) {
    if let Some(value) = value {
        line.push('"');
        line.push_str(&value.replace('"', "\"\""));
        line.push('"');
    }
}

fn push_number(line: &mut String, value: Option<i32>) {
    if let Some(value) = value {
        let _ = write!(line, "{value}");
    }
}

/// The response body: header, the already-fetched first row, then the rest
/// of the rows as the store yields them. A store error ends the body with an
/// I/O error so the connection is torn down instead of looking complete.
pub fn csv_body(
    first: Option<Submission>,
    rest: SubmissionStream,
) -> impl Stream<Item = Result<Bytes, io::Error>> + Send + 'static {
    let leading = std::iter::once(header_line())
        .chain(first.as_ref().map(render_row))
        .map(|line| Ok::<_, io::Error>(Bytes::from(line)));

    let rows = rest.map(|row| match row {
        Ok(sub) => Ok(Bytes::from(render_row(&sub))),
        Err(err) => {
            tracing::error!("CSV export aborted: {err}");
            Err(io::Error::other(err.to_string()))
        }
    });

    stream::iter(leading.collect::<Vec<_>>()).chain(rows)
}
