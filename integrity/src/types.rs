//! Domain types for gate check-in and purchase screening.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::IntegrityError;

// ============================================================================
// Identifiers
// ============================================================================

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wraps an identifier as stored by the ticketing backend
            #[must_use]
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Borrows the raw identifier
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consumes the wrapper
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

string_id!(
    /// Opaque ticket identifier, as printed in the ticket's QR code
    TicketId
);

string_id!(
    /// Event identifier
    EventId
);

string_id!(
    /// Purchaser / attendee account identifier
    UserId
);

// ============================================================================
// Tickets
// ============================================================================

/// Lifecycle status of an issued ticket
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TicketStatus {
    /// Awaiting payment
    Pending,
    /// Paid and valid for entry
    Confirmed,
    /// Cancelled by the organizer or purchaser
    Cancelled,
    /// Payment returned
    Refunded,
}

impl TicketStatus {
    /// Storage representation
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Cancelled => "cancelled",
            Self::Refunded => "refunded",
        }
    }

    /// Whether the ticket still counts toward a purchaser's per-event cap
    #[must_use]
    pub const fn counts_toward_cap(self) -> bool {
        matches!(self, Self::Pending | Self::Confirmed)
    }
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TicketStatus {
    type Err = IntegrityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "confirmed" => Ok(Self::Confirmed),
            "cancelled" => Ok(Self::Cancelled),
            "refunded" => Ok(Self::Refunded),
            other => Err(IntegrityError::Corrupt(format!(
                "unknown ticket status `{other}`"
            ))),
        }
    }
}

/// An issued ticket as seen by the gate
///
/// `checked_in` only ever moves from `false` to `true`, and only through a
/// committed check-in or an override.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    /// Ticket identifier
    pub id: TicketId,
    /// Event the ticket admits to
    pub event_id: EventId,
    /// Holder's account, if the ticket was bought by a registered user
    pub attendee_id: Option<UserId>,
    /// Lifecycle status
    pub status: TicketStatus,
    /// Ticket tier shown to gate staff (e.g. "General Admission")
    pub ticket_type: String,
    /// Number of admissions covered by the ticket
    pub quantity: u32,
    /// Whether the ticket has been admitted
    pub checked_in: bool,
    /// When the ticket was admitted
    pub checked_in_at: Option<DateTime<Utc>>,
    /// Staff member who admitted the ticket
    pub checked_in_by: Option<String>,
    /// Gate the ticket was admitted through
    pub entry_point: Option<String>,
    /// Set when a supervisor admitted the ticket by override
    pub reentry_override: bool,
    /// Number of admissions recorded (legacy counter kept for reporting)
    pub scanned_count: u32,
    /// Time of the last recorded admission (legacy)
    pub last_scanned_at: Option<DateTime<Utc>>,
    /// Staff member of the last recorded admission (legacy)
    pub last_scanned_by: Option<String>,
}

impl Ticket {
    /// A single-admission ticket that has not been scanned
    #[must_use]
    pub fn new(id: impl Into<TicketId>, event_id: impl Into<EventId>, status: TicketStatus) -> Self {
        Self {
            id: id.into(),
            event_id: event_id.into(),
            attendee_id: None,
            status,
            ticket_type: "General Admission".to_string(),
            quantity: 1,
            checked_in: false,
            checked_in_at: None,
            checked_in_by: None,
            entry_point: None,
            reentry_override: false,
            scanned_count: 0,
            last_scanned_at: None,
            last_scanned_by: None,
        }
    }

    /// Sets the holder
    #[must_use]
    pub fn with_attendee(mut self, attendee_id: impl Into<UserId>) -> Self {
        self.attendee_id = Some(attendee_id.into());
        self
    }

    /// Sets the tier and admission count
    #[must_use]
    pub fn with_ticket_type(mut self, ticket_type: impl Into<String>, quantity: u32) -> Self {
        self.ticket_type = ticket_type.into();
        self.quantity = quantity;
        self
    }

    /// Marks the ticket admitted and bumps the legacy scan counters
    pub fn record_admission(&mut self, at: DateTime<Utc>, by: &str, entry_point: &str) {
        self.checked_in = true;
        self.checked_in_at = Some(at);
        self.checked_in_by = Some(by.to_string());
        self.entry_point = Some(entry_point.to_string());
        self.scanned_count = self.scanned_count.saturating_add(1);
        self.last_scanned_at = Some(at);
        self.last_scanned_by = Some(by.to_string());
    }
}

// ============================================================================
// Purchase screening
// ============================================================================

/// A purchase about to be attempted, as submitted to the fraud guard
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseIntent {
    /// Purchaser account; `None` for guest checkout
    pub user_id: Option<UserId>,
    /// Purchaser email, when known
    pub email: Option<String>,
    /// Client IP address
    pub ip_address: String,
    /// Event being purchased
    pub event_id: EventId,
    /// Number of tickets requested
    pub quantity: u32,
    /// Client device fingerprint, when the storefront provides one
    pub fingerprint: Option<String>,
}

/// A logged purchase attempt (append-only)
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseAttempt {
    /// Purchaser account; `None` for guests
    pub user_id: Option<UserId>,
    /// Event purchased
    pub event_id: EventId,
    /// Client IP address
    pub ip_address: String,
    /// When the attempt was screened
    pub attempted_at: DateTime<Utc>,
    /// Whether the screening allowed the purchase
    pub success: bool,
    /// Client device fingerprint
    pub fingerprint: Option<String>,
}

impl PurchaseAttempt {
    /// Builds the ledger row for a screened intent
    #[must_use]
    pub fn from_intent(intent: &PurchaseIntent, attempted_at: DateTime<Utc>, success: bool) -> Self {
        Self {
            user_id: intent.user_id.clone(),
            event_id: intent.event_id.clone(),
            ip_address: intent.ip_address.clone(),
            attempted_at,
            success,
            fingerprint: intent.fingerprint.clone(),
        }
    }
}

/// What a blacklist entry matches against
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlacklistKind {
    /// Account identifier
    User,
    /// Client IP address
    Ip,
    /// Purchaser email
    Email,
}

impl BlacklistKind {
    /// Storage representation
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Ip => "ip",
            Self::Email => "email",
        }
    }
}

impl FromStr for BlacklistKind {
    type Err = IntegrityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Self::User),
            "ip" => Ok(Self::Ip),
            "email" => Ok(Self::Email),
            other => Err(IntegrityError::Corrupt(format!(
                "unknown blacklist type `{other}`"
            ))),
        }
    }
}

/// A blocked user, IP address or email
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlacklistEntry {
    /// What `value` identifies
    pub kind: BlacklistKind,
    /// The blocked identifier
    pub value: String,
    /// Operator-supplied reason, never shown to purchasers
    pub reason: String,
    /// End of the block; `None` blocks permanently
    pub expires_at: Option<DateTime<Utc>>,
}

impl BlacklistEntry {
    /// Whether the entry still blocks at `now`
    #[must_use]
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_none_or(|expires_at| now <= expires_at)
    }
}

/// Category of a suspicious-activity record
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityType {
    /// Purchase attempts above the rate limits
    RapidPurchases,
    /// The same ticket presented more than once
    DuplicateTickets,
    /// Automated purchasing signals
    BotBehavior,
    /// One person operating several accounts
    MultipleAccounts,
    /// A purchase attempt from a blacklisted identity
    Blacklisted,
}

impl ActivityType {
    /// Storage representation
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::RapidPurchases => "rapid_purchases",
            Self::DuplicateTickets => "duplicate_tickets",
            Self::BotBehavior => "bot_behavior",
            Self::MultipleAccounts => "multiple_accounts",
            Self::Blacklisted => "blacklisted",
        }
    }
}

/// Severity of a suspicious-activity record
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational
    Low,
    /// Worth reviewing
    Medium,
    /// Likely abuse
    High,
    /// Operators are alerted immediately
    Critical,
}

impl Severity {
    /// Storage representation
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

/// An audit record of detected or reported abuse
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SuspiciousActivity {
    /// Account involved, if any
    pub user_id: Option<UserId>,
    /// Category
    pub activity_type: ActivityType,
    /// Severity
    pub severity: Severity,
    /// Client IP address
    pub ip_address: String,
    /// Free-form details (signal name, counts, intervals)
    pub metadata: serde_json::Value,
    /// When the activity was detected
    pub detected_at: DateTime<Utc>,
}
