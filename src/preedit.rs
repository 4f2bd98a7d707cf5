//! Layout-repair edits applied to the text before segmentation.
//!
//! Transcribers mark text that was captured in the wrong place with
//! ignorable spans (`htr.delete`, `htr.move-to-end`). The edits run on the
//! raw export, so every later offset refers to the edited text.
//!
//! ```text
//!   before:  "Page 3 Anna gave Ben a book ."      htr.delete over "Page 3"
//!             ^^^^^^^ removed (marked text + trailing separator)
//!   after:   "Anna gave Ben a book ."             other spans shift left by 7
//! ```

use crate::diagnostics::Diagnostics;
use crate::input::{AnnotationExport, RawSpan};
use crate::schema::CompiledSchema;

/// A recognized text edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditOp {
    /// Remove the marked range.
    Delete,
    /// Cut the marked range and append it to the end of the text.
    MoveToEnd,
}

impl EditOp {
    /// Parse the operation segment of an ignorable label.
    #[must_use]
    pub fn parse(op: &str) -> Option<Self> {
        match op {
            "delete" => Some(EditOp::Delete),
            "move-to-end" | "move_to_end" => Some(EditOp::MoveToEnd),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
struct PendingEdit {
    op: EditOp,
    span: RawSpan,
}

/// Apply every recognized edit span, in input order, and drop the consumed
/// edit spans from the export.
///
/// Unknown ignorable operations are reported and left in place; the
/// classifier skips them later.
pub fn apply_text_edits(
    export: AnnotationExport,
    schema: &CompiledSchema,
    diags: &mut Diagnostics,
) -> AnnotationExport {
    let AnnotationExport {
        id,
        text,
        spans,
        relations,
    } = export;

    // Edits and ordinary spans keep their relative input order.
    let mut items: Vec<(Option<EditOp>, RawSpan)> = Vec::with_capacity(spans.len());
    for span in spans {
        let op = edit_op(&span, schema, diags);
        items.push((op, span));
    }
    if items.iter().all(|(op, _)| op.is_none()) {
        return AnnotationExport {
            id,
            text,
            spans: items.into_iter().map(|(_, s)| s).collect(),
            relations,
        };
    }

    let mut chars: Vec<char> = text.chars().collect();
    let mut remaining: Vec<(Option<EditOp>, RawSpan)> = items;

    loop {
        let Some(pos) = remaining.iter().position(|(op, _)| op.is_some()) else {
            break;
        };
        let (op, span) = remaining.remove(pos);
        let Some(op) = op else { break };
        let edit = PendingEdit { op, span };

        let len = chars.len();
        let begin = edit.span.begin.min(len);
        let end = edit.span.end.saturating_add(1).min(len).max(begin);
        if begin == end {
            diags.notice(Some(&edit.span.id), "empty text edit ignored");
            continue;
        }

        match edit.op {
            EditOp::Delete => {
                chars.drain(begin..end);
                remaining.retain(|(_, span)| {
                    let inside = span.begin >= begin && span.end <= end;
                    if inside {
                        diags.notice(
                            Some(&span.id),
                            format!("dropped: inside text deleted by {}", edit.span.id),
                        );
                    }
                    !inside
                });
                for (_, span) in &mut remaining {
                    span.begin = shift(span.begin, begin, end);
                    span.end = shift(span.end, begin, end);
                }
            }
            EditOp::MoveToEnd => {
                let moved: Vec<char> = chars.drain(begin..end).collect();
                let tail = chars.len();
                chars.extend(moved);
                for (_, span) in &mut remaining {
                    if span.begin >= begin && span.end <= end {
                        span.begin = span.begin - begin + tail;
                        span.end = span.end - begin + tail;
                    } else {
                        span.begin = shift(span.begin, begin, end);
                        span.end = shift(span.end, begin, end);
                    }
                }
            }
        }
        log::debug!(
            "applied {:?} from {} over chars {}..{}",
            edit.op,
            edit.span.id,
            begin,
            end
        );
    }

    AnnotationExport {
        id,
        text: chars.into_iter().collect(),
        spans: remaining.into_iter().map(|(_, s)| s).collect(),
        relations,
    }
}

/// Recognized edit operation of a span, if it is an ignorable edit span.
fn edit_op(span: &RawSpan, schema: &CompiledSchema, diags: &mut Diagnostics) -> Option<EditOp> {
    let label = span.label_str()?.to_lowercase();
    let mut segments = label.split('.');
    let tag = segments.next()?;
    if !schema.ignorable_tags.contains(tag) {
        return None;
    }
    let op = segments.next().unwrap_or("");
    let parsed = EditOp::parse(op);
    if parsed.is_none() {
        diags.malformed(Some(&span.id), format!("unknown text edit operation {:?}", label));
    }
    parsed
}

/// Offset after removing `[begin, end)`; offsets inside collapse to `begin`.
fn shift(offset: usize, begin: usize, end: usize) -> usize {
    if offset <= begin {
        offset
    } else if offset >= end {
        offset - (end - begin)
    } else {
        begin
    }
}
