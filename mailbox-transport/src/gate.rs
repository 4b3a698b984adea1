//! Single-permit gate serializing chunks on the wire.

use tokio::sync::Semaphore;

use crate::error::TransportError;

/// Allows one unacknowledged chunk per direction.
///
/// The sender takes the permit before writing a chunk. The permit is not
/// returned when the write finishes; it comes back only when the peer's
/// acknowledgement is observed by [`release`](Self::release).
#[derive(Debug)]
pub struct SendGate {
    permits: Semaphore,
}

impl Default for SendGate {
    fn default() -> Self {
        Self::new()
    }
}

impl SendGate {
    /// Create an open gate.
    pub fn new() -> Self {
        Self {
            permits: Semaphore::new(1),
        }
    }

    /// Wait for the gate and close it behind the caller.
    pub async fn acquire(&self) -> Result<(), TransportError> {
        let permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| TransportError::GateClosed)?;
        permit.forget();
        Ok(())
    }

    /// Reopen the gate after an acknowledgement.
    ///
    /// Returns `false` if the gate was already open, meaning the
    /// acknowledgement did not match an outstanding chunk.
    pub fn release(&self) -> bool {
        if self.permits.available_permits() == 0 {
            self.permits.add_permits(1);
            true
        } else {
            false
        }
    }

    /// Whether a chunk could be sent right now.
    pub fn is_open(&self) -> bool {
        self.permits.available_permits() > 0
    }
}
