//! Overflow policies for bounded dispatch queues
//!
//! When a bounded queue is full, these policies decide what happens to the
//! incoming record. No policy loses a record without signalling it: drops are
//! counted, alerted on stderr and reported through the overflow callback, and
//! `Reject` hands the error back to the caller.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Policy for handling queue overflow in queued dispatch
///
/// # Example
///
/// ```
/// use fuxlogger::OverflowPolicy;
/// use std::time::Duration;
///
/// // Default behavior: apply backpressure to the producer
/// let policy = OverflowPolicy::default();
/// assert_eq!(policy, OverflowPolicy::Block);
///
/// // Block with timeout
/// let policy = OverflowPolicy::BlockWithTimeout(Duration::from_millis(100));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
    /// Block the producer until space is available
    Block,

    /// Block with timeout, then drop the new record
    BlockWithTimeout(#[serde(with = "duration_millis")] Duration),

    /// Evict the oldest queued record to make room
    DropOldest,

    /// Drop the incoming record
    DropNewest,

    /// Fail the log call with `QueueFull`
    Reject,
}

impl OverflowPolicy {
    /// Whether a producer may be parked by this policy
    pub fn blocks_producer(&self) -> bool {
        matches!(
            self,
            OverflowPolicy::Block | OverflowPolicy::BlockWithTimeout(_)
        )
    }
}

impl Default for OverflowPolicy {
    fn default() -> Self {
        OverflowPolicy::Block
    }
}

impl fmt::Display for OverflowPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OverflowPolicy::Block => write!(f, "Block"),
            OverflowPolicy::BlockWithTimeout(d) => write!(f, "BlockWithTimeout({:?})", d),
            OverflowPolicy::DropOldest => write!(f, "DropOldest"),
            OverflowPolicy::DropNewest => write!(f, "DropNewest"),
            OverflowPolicy::Reject => write!(f, "Reject"),
        }
    }
}

/// Callback type for overflow notifications
///
/// Called when records are dropped due to queue overflow.
/// The parameter is the total count of dropped records so far.
pub type OverflowCallback = Arc<dyn Fn(u64) + Send + Sync>;

pub(crate) mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overflow_policy_default() {
        assert_eq!(OverflowPolicy::default(), OverflowPolicy::Block);
    }

    #[test]
    fn test_overflow_policy_display() {
        assert_eq!(OverflowPolicy::DropNewest.to_string(), "DropNewest");
        assert_eq!(OverflowPolicy::DropOldest.to_string(), "DropOldest");
        assert_eq!(OverflowPolicy::Block.to_string(), "Block");
        assert_eq!(OverflowPolicy::Reject.to_string(), "Reject");
        assert_eq!(
            OverflowPolicy::BlockWithTimeout(Duration::from_millis(100)).to_string(),
            "BlockWithTimeout(100ms)"
        );
    }

    #[test]
    fn test_blocks_producer() {
        assert!(OverflowPolicy::Block.blocks_producer());
        assert!(OverflowPolicy::BlockWithTimeout(Duration::from_millis(5)).blocks_producer());
        assert!(!OverflowPolicy::DropOldest.blocks_producer());
        assert!(!OverflowPolicy::Reject.blocks_producer());
    }

    #[test]
    fn test_overflow_policy_serde() {
        let policy: OverflowPolicy = serde_json::from_str("\"drop_oldest\"").unwrap();
        assert_eq!(policy, OverflowPolicy::DropOldest);

        let policy: OverflowPolicy =
            serde_json::from_str("{\"block_with_timeout\": 250}").unwrap();
        assert_eq!(policy, OverflowPolicy::BlockWithTimeout(Duration::from_millis(250)));
    }
}
