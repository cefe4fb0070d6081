//! Purchase fraud screening.
//!
//! [`FraudGuard::screen`] runs an ordered chain of checks against a purchase
//! intent and stops at the first denial:
//!
//! 1. **Blacklist**: user, email and IP address
//! 2. **Rate limit**: attempts per user, per IP and per event+IP in a sliding window
//! 3. **Ticket cap**: tickets already held plus the requested quantity
//! 4. **Bot detection**: device fingerprint fan-out and inhumanly regular timing
//!
//! Every screened intent is appended to the purchase ledger afterwards, with
//! `success` set to the decision, so later screenings see it. Checks only
//! read attempts recorded before the current one.
//!
//! The guard is advisory and never fails. When a check cannot read its data
//! it passes (fails open) with a warning and a metric: a storage outage must
//! not stop legitimate sales.
//!
//! Denial reasons are deliberately generic and never say which signal fired.

mod blacklist;
mod bot;
mod rate_limit;
mod ticket_cap;

use crate::activity::ActivityLog;
use crate::config::FraudConfig;
use crate::error::Result;
use crate::metrics;
use crate::providers::{Blacklist, EventPolicy, PurchaseLedger, TicketStore};
use crate::types::{BlacklistEntry, BlacklistKind, PurchaseAttempt, PurchaseIntent, SuspiciousActivity};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use ticket_integrity_core::environment::Clock;

/// The check that denied a purchase
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FraudStage {
    /// Blocked user, email or IP address
    Blacklist,
    /// Too many recent attempts
    RateLimit,
    /// Per-user ticket cap reached
    TicketCap,
    /// Automation signals
    BotDetection,
}

impl FraudStage {
    /// Metric and log label
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Blacklist => "blacklist",
            Self::RateLimit => "rate_limit",
            Self::TicketCap => "ticket_cap",
            Self::BotDetection => "bot_detection",
        }
    }
}

/// Outcome of screening a purchase intent
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum FraudDecision {
    /// The purchase may proceed
    Allowed {
        /// Tickets the user may still buy for the event, before this
        /// purchase completes; `None` for guests
        remaining_allowance: Option<u32>,
    },
    /// The purchase must not proceed
    Denied {
        /// The check that denied
        stage: FraudStage,
        /// Message safe to show the purchaser
        reason: String,
    },
}

impl FraudDecision {
    /// Whether the purchase may proceed
    #[must_use]
    pub const fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed { .. })
    }
}

/// A denial produced by one check
#[derive(Debug, Clone, PartialEq, Eq)]
struct Denial {
    stage: FraudStage,
    reason: String,
}

impl Denial {
    fn new(stage: FraudStage, reason: impl Into<String>) -> Self {
        Self {
            stage,
            reason: reason.into(),
        }
    }
}

impl From<Denial> for FraudDecision {
    fn from(denial: Denial) -> Self {
        Self::Denied {
            stage: denial.stage,
            reason: denial.reason,
        }
    }
}

/// Unwraps a check's read, passing the check when the read failed
fn read_or_pass<T: Default>(check: &'static str, read: Result<T>) -> T {
    match read {
        Ok(value) => value,
        Err(error) => {
            tracing::warn!(%error, check, "Fraud check data unavailable, failing open");
            metrics::record_fail_open(check);
            T::default()
        },
    }
}

/// Start of a lookback window ending at `now`
fn window_start(now: DateTime<Utc>, window: chrono::Duration) -> DateTime<Utc> {
    now.checked_sub_signed(window).unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Screens purchase intents before payment.
pub struct FraudGuard<L, B, T, P> {
    ledger: L,
    blacklist: B,
    tickets: T,
    policy: P,
    activity: ActivityLog,
    clock: Arc<dyn Clock>,
    config: FraudConfig,
}

impl<L, B, T, P> FraudGuard<L, B, T, P>
where
    L: PurchaseLedger,
    B: Blacklist,
    T: TicketStore,
    P: EventPolicy,
{
    /// Create a guard over the given providers
    #[must_use]
    pub fn new(
        ledger: L,
        blacklist: B,
        tickets: T,
        policy: P,
        activity: ActivityLog,
        clock: Arc<dyn Clock>,
        config: FraudConfig,
    ) -> Self {
        Self {
            ledger,
            blacklist,
            tickets,
            policy,
            activity,
            clock,
            config,
        }
    }

    /// Screen a purchase intent and record the attempt.
    #[tracing::instrument(
        skip(self, intent),
        fields(
            event_id = %intent.event_id,
            user_id = intent.user_id.as_ref().map(crate::types::UserId::as_str),
            ip_address = %intent.ip_address,
            quantity = intent.quantity,
        )
    )]
    pub async fn screen(&self, intent: &PurchaseIntent) -> FraudDecision {
        let now = self.clock.now();
        let decision = self.evaluate(intent, now).await;

        let attempt = PurchaseAttempt::from_intent(intent, now, decision.is_allowed());
        if let Err(error) = self.ledger.record(attempt).await {
            tracing::warn!(%error, "Failed to record purchase attempt");
            metrics::record_audit_failure();
        }

        match &decision {
            FraudDecision::Allowed { remaining_allowance } => {
                tracing::debug!(?remaining_allowance, "Purchase allowed");
                metrics::record_fraud_decision("allowed");
            },
            FraudDecision::Denied { stage, .. } => {
                tracing::warn!(stage = stage.as_str(), "Purchase denied");
                metrics::record_fraud_decision(stage.as_str());
            },
        }

        decision
    }

    async fn evaluate(&self, intent: &PurchaseIntent, now: DateTime<Utc>) -> FraudDecision {
        if let Some(denial) = blacklist::check(&self.blacklist, &self.activity, intent, now).await {
            return denial.into();
        }

        if let Some(denial) =
            rate_limit::check(&self.ledger, &self.activity, &self.config, intent, now).await
        {
            return denial.into();
        }

        let remaining_allowance =
            match ticket_cap::check(&self.tickets, &self.policy, &self.config, intent).await {
                Ok(remaining) => remaining,
                Err(denial) => return denial.into(),
            };

        if let Some(denial) = bot::check(&self.ledger, &self.activity, &self.config, intent, now).await {
            return denial.into();
        }

        FraudDecision::Allowed {
            remaining_allowance,
        }
    }

    /// Record activity reported by another part of the platform.
    pub fn report_activity(&self, activity: SuspiciousActivity) {
        self.activity.log(activity);
    }

    /// Block a user, email or IP address.
    ///
    /// # Errors
    ///
    /// Returns error if the blacklist cannot be written.
    pub async fn add_to_blacklist(&self, mut entry: BlacklistEntry) -> Result<()> {
        if entry.kind == BlacklistKind::Email {
            entry.value = blacklist::normalize_email(&entry.value);
        }
        tracing::info!(kind = entry.kind.as_str(), expires_at = ?entry.expires_at, "Blacklist entry added");
        self.blacklist.add(entry).await
    }
}
