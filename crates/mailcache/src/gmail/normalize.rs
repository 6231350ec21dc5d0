//! Gmail API response normalization
//!
//! Converts Gmail API responses to cache records.

use anyhow::{Result, bail};
use chrono::{TimeZone, Utc};
use log::warn;

use super::api::{GmailMessage, MessagePart, MessagePayload};
use crate::models::{Attachment, EmailAddress, EmailRecord, labels};

/// Normalize a Gmail API message to an [`EmailRecord`]
///
/// Flags come from the label list: no `UNREAD` means read, `STARRED` and
/// `IMPORTANT` set the matching flags.
pub fn normalize_message(gmail_msg: GmailMessage) -> Result<EmailRecord> {
    if gmail_msg.id.trim().is_empty() {
        bail!("Gmail message has no id");
    }

    let label_ids = gmail_msg.label_ids.unwrap_or_default();
    let has = |label: &str| label_ids.iter().any(|l| l == label);
    let is_read = !has(labels::UNREAD);
    let is_starred = has(labels::STARRED);
    let is_important = has(labels::IMPORTANT);

    let payload = gmail_msg.payload.as_ref();

    let from = payload
        .and_then(|p| extract_header(p, "From"))
        .map(|s| EmailAddress::parse(&s))
        .unwrap_or_else(|| EmailAddress::new("unknown@unknown.com"));

    let to = payload
        .and_then(|p| extract_header(p, "To"))
        .map(|s| parse_address_list(&s))
        .unwrap_or_default();

    let subject = payload
        .and_then(|p| extract_header(p, "Subject"))
        .unwrap_or_default();

    // Milliseconds since epoch
    let internal_date: i64 = match gmail_msg.internal_date.as_deref().map(str::parse::<i64>) {
        Some(Ok(ms)) => ms,
        Some(Err(_)) | None => {
            warn!("Message {} has no usable internalDate", gmail_msg.id);
            0
        }
    };
    let date = Utc
        .timestamp_millis_opt(internal_date)
        .single()
        .unwrap_or_else(Utc::now);

    let attachments = payload
        .and_then(|p| p.parts.as_deref())
        .map(collect_attachments)
        .unwrap_or_default();

    Ok(EmailRecord::builder(gmail_msg.id)
        .thread_id(gmail_msg.thread_id)
        .label_ids(label_ids)
        .read(is_read)
        .starred(is_starred)
        .important(is_important)
        .date(date)
        .subject(subject)
        .from(from)
        .to(to)
        .snippet(decode_html_entities(&gmail_msg.snippet))
        .attachments(attachments)
        .build())
}

/// Extract a header value by name
fn extract_header(payload: &MessagePayload, name: &str) -> Option<String> {
    payload.headers.as_ref()?.iter().find_map(|h| {
        if h.name.eq_ignore_ascii_case(name) {
            Some(h.value.clone())
        } else {
            None
        }
    })
}

/// Parse a comma-separated list of email addresses
///
/// Commas inside a quoted display name or an angle-bracket address do not
/// split.
fn parse_address_list(s: &str) -> Vec<EmailAddress> {
    let mut addresses = Vec::new();
    let mut in_quotes = false;
    let mut in_angle = false;
    let mut escaped = false;
    let mut start = 0;

    for (i, c) in s.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' if in_quotes => escaped = true,
            '"' => in_quotes = !in_quotes,
            '<' if !in_quotes => in_angle = true,
            '>' if !in_quotes => in_angle = false,
            ',' if !in_quotes && !in_angle => {
                addresses.push(&s[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    addresses.push(&s[start..]);

    addresses
        .into_iter()
        .map(str::trim)
        .filter(|addr| !addr.is_empty())
        .map(EmailAddress::parse)
        .collect()
}

/// Every part with a filename, depth first
fn collect_attachments(parts: &[MessagePart]) -> Vec<Attachment> {
    let mut found = Vec::new();
    for part in parts {
        if let Some(filename) = &part.filename
            && !filename.is_empty()
        {
            found.push(Attachment {
                filename: filename.clone(),
                mime_type: part.mime_type.clone(),
                size: part.body.as_ref().and_then(|b| b.size),
            });
        }

        if let Some(nested) = &part.parts {
            found.extend(collect_attachments(nested));
        }
    }
    found
}

/// Decode HTML entities in snippet text
fn decode_html_entities(s: &str) -> String {
    s.replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&nbsp;", " ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gmail::api::{Header, MessageBody};

    fn make_test_payload(headers: Vec<(&str, &str)>) -> MessagePayload {
        MessagePayload {
            headers: Some(
                headers
                    .into_iter()
                    .map(|(n, v)| Header {
                        name: n.to_string(),
                        value: v.to_string(),
                    })
                    .collect(),
            ),
            parts: None,
            mime_type: Some("multipart/mixed".to_string()),
        }
    }

    fn make_test_message(labels: &[&str], payload: MessagePayload) -> GmailMessage {
        GmailMessage {
            id: "18c2f".to_string(),
            thread_id: "18c2a".to_string(),
            label_ids: Some(labels.iter().map(|l| l.to_string()).collect()),
            snippet: "Fish &amp; chips".to_string(),
            internal_date: Some("1700000000000".to_string()),
            payload: Some(payload),
        }
    }

    #[test]
    fn test_normalize_headers_and_flags() {
        let payload = make_test_payload(vec![
            ("From", "\"Grace Hopper\" <grace@example.com>"),
            ("To", "alice@example.com, Bob <bob@example.com>"),
            ("Subject", "Compiler notes"),
        ]);
        let record =
            normalize_message(make_test_message(&["INBOX", "STARRED"], payload)).unwrap();

        assert_eq!(record.id.as_str(), "18c2f");
        assert_eq!(record.thread_id.as_str(), "18c2a");
        assert_eq!(record.subject, "Compiler notes");
        assert_eq!(record.from.name.as_deref(), Some("Grace Hopper"));
        assert_eq!(record.to.len(), 2);
        assert_eq!(record.snippet, "Fish & chips");
        assert_eq!(record.date.timestamp_millis(), 1_700_000_000_000);
        assert!(record.is_read);
        assert!(record.is_starred);
        assert!(!record.is_important);
    }

    #[test]
    fn test_unread_label_clears_read() {
        let payload = make_test_payload(vec![]);
        let record = normalize_message(make_test_message(&["INBOX", "UNREAD"], payload)).unwrap();
        assert!(!record.is_read);
        assert_eq!(record.from.email, "unknown@unknown.com");
    }

    #[test]
    fn test_attachments_from_nested_parts() {
        let mut payload = make_test_payload(vec![]);
        payload.parts = Some(vec![
            MessagePart {
                mime_type: Some("text/plain".to_string()),
                filename: Some(String::new()),
                body: None,
                parts: None,
            },
            MessagePart {
                mime_type: Some("multipart/mixed".to_string()),
                filename: None,
                body: None,
                parts: Some(vec![MessagePart {
                    mime_type: Some("application/pdf".to_string()),
                    filename: Some("invoice.pdf".to_string()),
                    body: Some(MessageBody { size: Some(2048) }),
                    parts: None,
                }]),
            },
        ]);

        let record = normalize_message(make_test_message(&["INBOX"], payload)).unwrap();
        assert_eq!(record.attachments.len(), 1);
        assert_eq!(record.attachments[0].filename, "invoice.pdf");
        assert_eq!(record.attachments[0].size, Some(2048));
    }

    #[test]
    fn test_missing_id_rejected() {
        let mut message = make_test_message(&[], make_test_payload(vec![]));
        message.id = String::new();
        assert!(normalize_message(message).is_err());
    }

    #[test]
    fn test_address_list_keeps_quoted_commas() {
        let to = parse_address_list("\"Doe, Jane\" <jane@example.com>, bob@example.com,");
        assert_eq!(to.len(), 2);
        assert_eq!(to[0].name.as_deref(), Some("Doe, Jane"));
        assert_eq!(to[0].email, "jane@example.com");
        assert_eq!(to[1].email, "bob@example.com");

        let escaped = parse_address_list(r#""Ops \"West, 2\"" <ops@example.com>, c@example.com"#);
        assert_eq!(escaped.len(), 2);
        assert_eq!(escaped[1].email, "c@example.com");
    }

    #[test]
    fn test_extract_header_case_insensitive() {
        let payload = make_test_payload(vec![("FROM", "test@example.com")]);
        assert_eq!(
            extract_header(&payload, "from"),
            Some("test@example.com".to_string())
        );
    }
}
