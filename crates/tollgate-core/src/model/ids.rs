// ── Core identity types ──
//
// Platform-assigned chat/user ids are i64 on the wire; payments are
// numbered by the store. Newtypes keep the four id spaces from being
// mixed up at call sites.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Platform user id of a subscriber.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct SubscriberId(i64);

/// Platform chat id of a managed group or channel. Negative for groups
/// on the Bot API; the sign carries no meaning here.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct DestinationId(i64);

/// Platform user id of an admin.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct AdminId(i64);

/// Store-assigned payment number, monotonically increasing.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct PaymentId(u64);

macro_rules! id_impls {
    ($name:ident, $raw:ty) => {
        impl $name {
            pub const fn new(raw: $raw) -> Self {
                Self(raw)
            }

            pub const fn get(self) -> $raw {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<$raw> for $name {
            fn from(raw: $raw) -> Self {
                Self(raw)
            }
        }
    };
}

id_impls!(SubscriberId, i64);
id_impls!(DestinationId, i64);
id_impls!(AdminId, i64);
id_impls!(PaymentId, u64);

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn ids_order_by_raw_value() {
        let a = DestinationId::new(-100_200);
        let b = DestinationId::new(-100_100);
        assert!(a < b);
    }

    #[test]
    fn display_matches_raw() {
        assert_eq!(SubscriberId::new(42).to_string(), "42");
        assert_eq!(DestinationId::new(-1001).to_string(), "-1001");
    }
}
