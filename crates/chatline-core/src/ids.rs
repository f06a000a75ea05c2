//! Identifier types.
//!
//! Conversation ids are two-phase: a conversation created locally before the
//! server knows about it carries a [`ProvisionalId`]; once the server answers
//! it is promoted to a [`ServerId`]. The two are never coerced into one
//! another implicitly, only through [`ProvisionalId::promote`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};

// All string ids share the same shape so they stay interchangeable on the wire.
macro_rules! define_string_id {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(raw: impl Into<String>) -> Self {
                Self(raw.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
                formatter.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }
    };
}

define_string_id!(ServerId);
define_string_id!(ProvisionalId);
define_string_id!(MessageId);
define_string_id!(LocalId);

static LAST_PROVISIONAL_MILLIS: AtomicI64 = AtomicI64::new(0);

impl ProvisionalId {
    /// Generates a provisional id of the form `conv_<unix millis>`.
    ///
    /// Ids generated in the same millisecond are bumped forward so that two
    /// provisional conversations never share an id within one process.
    pub fn generate(now: DateTime<Utc>) -> Self {
        let wanted = now.timestamp_millis();
        let mut last = LAST_PROVISIONAL_MILLIS.load(Ordering::Relaxed);
        loop {
            let next = wanted.max(last + 1);
            match LAST_PROVISIONAL_MILLIS.compare_exchange_weak(
                last,
                next,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => return Self(format!("conv_{next}")),
                Err(actual) => last = actual,
            }
        }
    }

    /// Promotes this provisional id to the id the server issued.
    pub fn promote(self, confirmed: ServerId) -> Promotion {
        Promotion {
            provisional: self,
            confirmed,
        }
    }
}

impl LocalId {
    /// Generates a fresh id for an optimistic entry.
    pub fn generate() -> Self {
        Self(format!("local_{}", uuid::Uuid::new_v4()))
    }
}

/// Record of a provisional conversation id being replaced by a server id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Promotion {
    pub provisional: ProvisionalId,
    pub confirmed: ServerId,
}

/// Identifier of a conversation in either phase.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "phase", content = "value", rename_all = "snake_case")]
pub enum ConversationId {
    Provisional(ProvisionalId),
    Confirmed(ServerId),
}

impl ConversationId {
    /// The raw id as sent to the remote service.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Provisional(id) => id.as_str(),
            Self::Confirmed(id) => id.as_str(),
        }
    }

    pub fn is_provisional(&self) -> bool {
        matches!(self, Self::Provisional(_))
    }

    pub fn as_provisional(&self) -> Option<&ProvisionalId> {
        match self {
            Self::Provisional(id) => Some(id),
            Self::Confirmed(_) => None,
        }
    }

    pub fn as_confirmed(&self) -> Option<&ServerId> {
        match self {
            Self::Provisional(_) => None,
            Self::Confirmed(id) => Some(id),
        }
    }

    /// Returns the id this one becomes after `promotion`, or itself when the
    /// promotion concerns another conversation.
    pub fn promoted(&self, promotion: &Promotion) -> ConversationId {
        match self {
            Self::Provisional(id) if *id == promotion.provisional => {
                Self::Confirmed(promotion.confirmed.clone())
            }
            other => other.clone(),
        }
    }
}

impl fmt::Display for ConversationId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl From<ServerId> for ConversationId {
    fn from(value: ServerId) -> Self {
        Self::Confirmed(value)
    }
}

impl From<ProvisionalId> for ConversationId {
    fn from(value: ProvisionalId) -> Self {
        Self::Provisional(value)
    }
}
