//! Decoding raw scanner payloads into ticket identifiers.
//!
//! Tickets are printed with one of three payloads:
//!
//! - a URL whose path contains `/tickets/{id}`
//! - a JSON object with a `ticketId`, `ticket_id` or `id` field
//! - the bare identifier
//!
//! Anything else is noise from the camera and is dropped.

use crate::types::TicketId;

/// JSON fields that may carry the identifier, in order of preference.
const JSON_ID_FIELDS: [&str; 3] = ["ticketId", "ticket_id", "id"];

/// Whether `candidate` looks like a ticket identifier: non-empty ASCII
/// letters, digits, `-` and `_`.
#[must_use]
pub fn is_ticket_id(candidate: &str) -> bool {
    !candidate.is_empty()
        && candidate
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

/// Extract a ticket identifier from a raw scanner payload.
///
/// Returns `None` for anything that is not a recognisable ticket code.
///
/// # Example
///
/// ```
/// use ticket_integrity::scan::parse_ticket_id;
///
/// let id = parse_ticket_id("https://tix.example.com/tickets/abc123?src=qr");
/// assert_eq!(id.map(|id| id.into_inner()), Some("abc123".to_string()));
/// assert!(parse_ticket_id("").is_none());
/// ```
#[must_use]
pub fn parse_ticket_id(raw: &str) -> Option<TicketId> {
    let payload = raw.trim();
    if payload.is_empty() {
        return None;
    }

    from_url(payload)
        .or_else(|| from_json(payload))
        .or_else(|| is_ticket_id(payload).then(|| payload.to_string()))
        .map(TicketId::new)
}

fn from_url(payload: &str) -> Option<String> {
    let (scheme, rest) = payload.split_once("://")?;
    if scheme.is_empty() {
        return None;
    }
    let path_start = rest.find('/')?;
    let path = &rest[path_start..];
    let path = path.split(['?', '#']).next().unwrap_or_default();

    let mut segments = path.split('/').filter(|segment| !segment.is_empty());
    while let Some(segment) = segments.next() {
        if segment == "tickets" {
            return segments
                .next()
                .filter(|id| is_ticket_id(id))
                .map(str::to_string);
        }
    }
    None
}

fn from_json(payload: &str) -> Option<String> {
    if !payload.starts_with('{') {
        return None;
    }
    let value: serde_json::Value = serde_json::from_str(payload).ok()?;
    let object = value.as_object()?;

    JSON_ID_FIELDS.iter().find_map(|field| {
        let id = match object.get(*field)? {
            serde_json::Value::String(id) => id.trim().to_string(),
            serde_json::Value::Number(number) => number.to_string(),
            _ => return None,
        };
        is_ticket_id(&id).then_some(id)
    })
}
