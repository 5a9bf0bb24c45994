//! Strongly-typed identifiers used across the domain.
//!
//! Ids are assigned by the backing store when a record is created; clients never
//! invent ids for records they submit.

use core::str::FromStr;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;

macro_rules! store_id {
    ($(#[$doc:meta])* $t:ident) => {
        $(#[$doc])*
        #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $t(Uuid);

        impl $t {
            /// Mint a time-ordered (v7) id. Only stores do this outside of tests.
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $t {
            fn default() -> Self {
                Self::new()
            }
        }

        impl core::fmt::Display for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                core::fmt::Display::fmt(&self.0, f)
            }
        }

        impl From<Uuid> for $t {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }

        impl From<$t> for Uuid {
            fn from(id: $t) -> Uuid {
                id.0
            }
        }

        impl FromStr for $t {
            type Err = DomainError;

            fn from_str(raw: &str) -> Result<Self, DomainError> {
                Uuid::from_str(raw.trim())
                    .map(Self)
                    .map_err(|e| DomainError::invalid_id(format!("{}: {e}", stringify!($t))))
            }
        }
    };
}

store_id!(
    /// A customer engagement.
    DealId
);
store_id!(
    /// One progression snapshot of a deal's sale side.
    SaleId
);
store_id!(
    /// The procurement side of a deal.
    PurchaseId
);
store_id!(
    /// An invoice, supplier or logistics line.
    LineId
);
store_id!(CounterpartyId);
store_id!(WorkerId);
store_id!(
    /// A notification accepted by the notification service.
    NotificationId
);
