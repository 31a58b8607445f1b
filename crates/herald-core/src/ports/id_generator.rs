//! IdGenerator port.
//!
//! IDs are ULIDs whose timestamp part comes from the injected [`Clock`], so a
//! [`FixedClock`](crate::ports::FixedClock) yields IDs with a deterministic
//! time prefix.

use ulid::Ulid;

use crate::domain::{OwnerId, ReminderId};
use crate::ports::Clock;

pub trait IdGenerator: Send + Sync {
    fn generate_reminder_id(&self) -> ReminderId;

    fn generate_owner_id(&self) -> OwnerId;
}

pub struct UlidGenerator<C> {
    clock: C,
}

impl<C: Clock> UlidGenerator<C> {
    pub fn new(clock: C) -> Self {
        Self { clock }
    }

    fn next_ulid(&self) -> Ulid {
        let timestamp_ms = self.clock.now().timestamp_millis() as u64;
        Ulid::from_parts(timestamp_ms, rand::random())
    }
}

impl<C: Clock> IdGenerator for UlidGenerator<C> {
    fn generate_reminder_id(&self) -> ReminderId {
        ReminderId::from(self.next_ulid())
    }

    fn generate_owner_id(&self) -> OwnerId {
        OwnerId::from(self.next_ulid())
    }
}
