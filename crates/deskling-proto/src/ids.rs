//! Message and trace identifiers.
//!
//! Ids are UUIDv7 values (millisecond timestamp plus random bits) rendered as
//! 32 lower-case hex characters. They only need to be unique within the local
//! fabric, not unguessable.

use uuid::Uuid;

/// Fresh id for a single envelope instance.
#[must_use]
pub fn new_message_id() -> String {
    Uuid::now_v7().simple().to_string()
}

/// Fresh id for the start of a causal chain.
#[must_use]
pub fn new_trace_id() -> String {
    Uuid::now_v7().simple().to_string()
}
