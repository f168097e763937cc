//! # Customer Ledger
//!
//! Profiles derived from sale and refund documents.
//!
//! ## Matching Policy
//! A document's customer matches an existing profile when either
//! - the trimmed names are equal (case-sensitive), or
//! - the document carries a non-blank email equal to the profile's email.
//!
//! The first profile that matches wins. Nothing fuzzier is attempted, so
//! "Jon Smith" and "John Smith" without an email become two profiles.
//!
//! `lifetime_spend` is only ever moved by signed deltas from the engine.

use chrono::{DateTime, Utc};
use tracing::debug;
use uuid::Uuid;

use crate::money::Money;
use crate::types::{CustomerContact, CustomerProfile};

#[derive(Debug, Clone, Default)]
pub struct CustomerLedger {
    profiles: Vec<CustomerProfile>,
}

impl CustomerLedger {
    pub fn new() -> Self {
        CustomerLedger::default()
    }

    pub(crate) fn from_profiles(profiles: Vec<CustomerProfile>) -> Self {
        CustomerLedger { profiles }
    }

    fn position(&self, contact: &CustomerContact) -> Option<usize> {
        let name = contact.name.trim();
        let email = contact.email();
        self.profiles.iter().position(|profile| {
            profile.name.trim() == name
                || email.is_some_and(|e| profile.email.as_deref().map(str::trim) == Some(e))
        })
    }

    pub fn find(&self, contact: &CustomerContact) -> Option<&CustomerProfile> {
        self.position(contact).map(|i| &self.profiles[i])
    }

    pub fn get(&self, id: &str) -> Option<&CustomerProfile> {
        self.profiles.iter().find(|p| p.id == id)
    }

    /// True when both contacts resolve to the same existing profile.
    pub fn same_profile(&self, a: &CustomerContact, b: &CustomerContact) -> bool {
        match (self.position(a), self.position(b)) {
            (Some(x), Some(y)) => x == y,
            _ => false,
        }
    }

    /// Adds `spend_delta` to the matching profile, creating it if needed,
    /// and refreshes contact details and the visit time.
    ///
    /// Details on the document replace stored ones only when present.
    pub(crate) fn record_visit(
        &mut self,
        contact: &CustomerContact,
        spend_delta: Money,
        at: DateTime<Utc>,
    ) -> &CustomerProfile {
        let index = match self.position(contact) {
            Some(index) => {
                let profile = &mut self.profiles[index];
                if let Some(email) = contact.email() {
                    profile.email = Some(email.to_string());
                }
                if let Some(phone) = non_blank(&contact.phone) {
                    profile.phone = Some(phone);
                }
                if let Some(address) = non_blank(&contact.address) {
                    profile.address = Some(address);
                }
                profile.last_visit = at;
                profile.lifetime_spend_cents += spend_delta.cents();
                index
            }
            None => {
                self.profiles.push(CustomerProfile {
                    id: Uuid::new_v4().to_string(),
                    name: contact.name.trim().to_string(),
                    email: contact.email().map(str::to_string),
                    phone: non_blank(&contact.phone),
                    address: non_blank(&contact.address),
                    last_visit: at,
                    lifetime_spend_cents: spend_delta.cents(),
                });
                self.profiles.len() - 1
            }
        };
        let profile = &self.profiles[index];
        debug!(
            customer = %profile.name,
            delta = spend_delta.cents(),
            lifetime = profile.lifetime_spend_cents,
            "Customer spend updated"
        );
        profile
    }

    /// Subtracts `amount` from the matching profile, if any. Contact details
    /// and visit time are left alone.
    pub(crate) fn retract(&mut self, contact: &CustomerContact, amount: Money) -> bool {
        match self.position(contact) {
            Some(index) => {
                self.profiles[index].lifetime_spend_cents -= amount.cents();
                true
            }
            None => false,
        }
    }

    pub(crate) fn clear(&mut self) {
        self.profiles.clear();
    }

    pub fn list(&self) -> impl Iterator<Item = &CustomerProfile> {
        self.profiles.iter()
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
