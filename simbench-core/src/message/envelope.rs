// Layer 1: Standard library imports
use std::fmt::Debug;

// Layer 2: Third-party crate imports
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// Layer 3: Internal module imports
use super::traits::{Message, MessagePriority};
use crate::address::SimulatorAddress;

/// Generic message envelope with zero-cost abstraction
///
/// # Type Safety
/// The envelope is generic over the message type M, ensuring compile-time
/// type safety without runtime dispatch or type erasure.
///
/// # Stack Allocation
/// `MessageEnvelope<M>` is stack-allocated when M is stack-allocated,
/// avoiding heap overhead for message passing.
///
/// # Example
/// ```rust
/// use simbench_core::message::{Message, MessageEnvelope, MessagePriority};
/// use simbench_core::address::SimulatorAddress;
///
/// #[derive(Debug, Clone)]
/// struct MyMessage {
///     content: String,
/// }
///
/// impl Message for MyMessage {
///     const MESSAGE_TYPE: &'static str = "my_message";
/// }
///
/// let msg = MyMessage { content: "Hello".to_string() };
/// let sender = SimulatorAddress::agent(1);
///
/// let envelope = MessageEnvelope::new(msg)
///     .with_sender(sender)
///     .with_ttl(60);
///
/// assert_eq!(envelope.message_type(), "my_message");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageEnvelope<M: Message> {
    /// The actual message payload
    pub payload: M,

    /// Optional sender address for reply capability
    pub sender: Option<SimulatorAddress>,

    /// Optional recipient for reply-to pattern
    pub reply_to: Option<SimulatorAddress>,

    /// Message creation timestamp
    pub timestamp: DateTime<Utc>,

    /// Optional correlation ID for request/response tracking
    pub correlation_id: Option<Uuid>,

    /// Message priority (extracted from payload)
    pub priority: MessagePriority,

    /// Optional time-to-live in seconds
    pub ttl: Option<u64>,
}

impl<M: Message> MessageEnvelope<M> {
    /// Create a new message envelope with minimal information
    ///
    /// # Example
    /// ```rust
    /// use simbench_core::message::{Message, MessageEnvelope};
    ///
    /// #[derive(Debug, Clone)]
    /// struct TestMsg;
    /// impl Message for TestMsg {
    ///     const MESSAGE_TYPE: &'static str = "test";
    /// }
    ///
    /// let envelope = MessageEnvelope::new(TestMsg);
    /// assert_eq!(envelope.message_type(), "test");
    /// ```
    pub fn new(payload: M) -> Self {
        let priority = payload.priority();
        Self {
            payload,
            sender: None,
            reply_to: None,
            timestamp: Utc::now(),
            correlation_id: None,
            priority,
            ttl: None,
        }
    }

    /// Builder method: Set sender address
    ///
    /// # Example
    /// ```rust
    /// use simbench_core::message::{Message, MessageEnvelope};
    /// use simbench_core::address::SimulatorAddress;
    ///
    /// #[derive(Debug, Clone)]
    /// struct TestMsg;
    /// impl Message for TestMsg {
    ///     const MESSAGE_TYPE: &'static str = "test";
    /// }
    ///
    /// let sender = SimulatorAddress::agent(1);
    /// let envelope = MessageEnvelope::new(TestMsg)
    ///     .with_sender(sender);
    ///
    /// assert_eq!(envelope.sender, Some(sender));
    /// ```
    pub fn with_sender(mut self, sender: SimulatorAddress) -> Self {
        self.sender = Some(sender);
        self
    }

    /// Builder method: Set reply-to address
    pub fn with_reply_to(mut self, reply_to: SimulatorAddress) -> Self {
        self.reply_to = Some(reply_to);
        self
    }

    /// Builder method: Set correlation ID
    pub fn with_correlation_id(mut self, id: Uuid) -> Self {
        self.correlation_id = Some(id);
        self
    }

    /// Builder method: Set time-to-live in seconds
    pub fn with_ttl(mut self, ttl_seconds: u64) -> Self {
        self.ttl = Some(ttl_seconds);
        self
    }

    /// Check if message has expired based on TTL
    ///
    /// # Example
    /// ```rust
    /// use simbench_core::message::{Message, MessageEnvelope};
    ///
    /// #[derive(Debug, Clone)]
    /// struct TestMsg;
    /// impl Message for TestMsg {
    ///     const MESSAGE_TYPE: &'static str = "test";
    /// }
    ///
    /// let envelope = MessageEnvelope::new(TestMsg).with_ttl(60);
    /// assert!(!envelope.is_expired()); // Fresh message
    /// ```
    pub fn is_expired(&self) -> bool {
        if let Some(ttl) = self.ttl {
            let age = Utc::now()
                .signed_duration_since(self.timestamp)
                .num_seconds() as u64;
            age > ttl
        } else {
            false
        }
    }

    /// Get message type from payload's const
    pub fn message_type(&self) -> &'static str {
        M::MESSAGE_TYPE
    }
}
