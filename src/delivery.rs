//! Output delivery planning
//!
//! Decides how captured output reaches the chat surface: one inline
//! message when everything fits the platform budget, otherwise a short
//! notice plus file attachments. The labels, filenames, notice strings
//! and the 2000-character ceiling are wire contracts and must not drift.

use crate::capture::{display_value, ExecutionResult};
use crate::codeblock::{escape_markdown, sanitize_for_display};

/// Platform ceiling for one inline message, in characters.
pub const MESSAGE_BUDGET: usize = 2000;

/// Fallback notice for the captured-execution path.
pub const EXECUTION_OVERFLOW_NOTICE: &str = "Output too big, uploading as file(s).";

/// Fallback notice for the shell-streaming path. Deliberately different
/// wording from the execution path; the two are separate contracts.
pub const SHELL_OVERFLOW_NOTICE: &str = "Output too long, uploading as file.";

/// One labeled output field. `value: None` is absent and renders nothing;
/// a present value renders even when falsy (numeric zero, empty string).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryField {
    /// Display label for the segment heading
    pub label: &'static str,
    /// Filename used on the attachment fallback path
    pub filename: &'static str,
    /// Field content; absent fields are omitted entirely
    pub value: Option<String>,
}

impl DeliveryField {
    pub fn new(label: &'static str, filename: &'static str, value: Option<String>) -> Self {
        Self {
            label,
            filename,
            value,
        }
    }
}

/// A single file attachment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// Exactly one of these forms is produced per planning call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryPayload {
    /// Everything fits in one message
    Inline { text: String },
    /// Over budget: a notice plus one file per present field, in order
    Attachments {
        notice: String,
        files: Vec<Attachment>,
    },
}

impl DeliveryPayload {
    /// Inline text, if this payload is the inline form
    pub fn inline_text(&self) -> Option<&str> {
        match self {
            DeliveryPayload::Inline { text } => Some(text),
            DeliveryPayload::Attachments { .. } => None,
        }
    }
}

/// Plan delivery for an ordered list of labeled fields.
///
/// The budget check is on the total rendered length: one oversized field
/// forces every present field onto the attachment path together, and the
/// attachments carry the raw values, not the sanitized display forms.
pub fn plan_delivery(fields: &[DeliveryField]) -> DeliveryPayload {
    let mut rendered = String::new();
    for field in fields {
        if let Some(value) = &field.value {
            rendered.push_str(&format!(
                "**{}**```\n{}\n```",
                escape_markdown(field.label),
                sanitize_for_display(value)
            ));
        }
    }

    if rendered.is_empty() {
        return DeliveryPayload::Inline {
            text: "No output".to_string(),
        };
    }

    if rendered.chars().count() <= MESSAGE_BUDGET {
        return DeliveryPayload::Inline { text: rendered };
    }

    debug!("rendered output over budget, falling back to attachments");
    DeliveryPayload::Attachments {
        notice: EXECUTION_OVERFLOW_NOTICE.to_string(),
        files: fields
            .iter()
            .filter_map(|field| {
                field.value.as_ref().map(|value| Attachment {
                    filename: field.filename.to_string(),
                    bytes: value.clone().into_bytes(),
                })
            })
            .collect(),
    }
}

/// Build the conventional four fields from a captured execution result.
///
/// The stream fields treat an empty capture as absent; the value and
/// exception slots distinguish absent from present-but-falsy.
pub fn execution_fields(result: &ExecutionResult) -> Vec<DeliveryField> {
    let non_empty = |text: &String| {
        if text.is_empty() {
            None
        } else {
            Some(text.clone())
        }
    };
    vec![
        DeliveryField::new(
            "Return value",
            "return.txt",
            result.return_value.as_ref().map(display_value),
        ),
        DeliveryField::new(
            "Exception",
            "exception.txt",
            result.error.as_ref().map(|e| e.message.clone()),
        ),
        DeliveryField::new("Output stream", "stdout.txt", non_empty(&result.stdout)),
        DeliveryField::new("Error stream", "stderr.txt", non_empty(&result.stderr)),
    ]
}

/// Plan one captured execution result end to end.
pub fn plan_execution(result: &ExecutionResult) -> DeliveryPayload {
    plan_delivery(&execution_fields(result))
}

/// Plan one incremental shell update from the raw accumulated buffer.
///
/// Returns `None` when the sanitized output is entirely whitespace (the
/// caller skips the edit). Unlike the execution path, the attachment
/// carries the sanitized text.
pub fn plan_shell_update(raw: &str) -> Option<DeliveryPayload> {
    let out = sanitize_for_display(raw);
    if out.trim().is_empty() {
        return None;
    }

    // Newline before the output so its first line cannot be taken as a
    // syntax-highlighting language tag.
    let codeblock = format!("```\n{}\n```", out);
    if codeblock.chars().count() <= MESSAGE_BUDGET {
        return Some(DeliveryPayload::Inline { text: codeblock });
    }

    Some(DeliveryPayload::Attachments {
        notice: SHELL_OVERFLOW_NOTICE.to_string(),
        files: vec![Attachment {
            filename: "output.txt".to_string(),
            bytes: out.into_bytes(),
        }],
    })
}
