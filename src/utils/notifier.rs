//! Notifier implementations for tests and headless deployments

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::traits::*;
use crate::types::*;

/// Notifier that drops every message
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotifier;

#[async_trait]
impl Notifier for NoopNotifier {
    async fn notify(&self, _user_id: UserId, _message: &str) -> Result<(), NotifyError> {
        Ok(())
    }
}

/// A message handed to a [`MemoryNotifier`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub user_id: UserId,
    pub message: String,
}

/// Notifier that keeps deliveries in memory
#[derive(Debug, Clone, Default)]
pub struct MemoryNotifier {
    deliveries: Arc<Mutex<Vec<Delivery>>>,
    failing: Arc<AtomicBool>,
}

impl MemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following delivery fail (or succeed again)
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Messages delivered so far, oldest first
    pub fn deliveries(&self) -> Vec<Delivery> {
        self.deliveries
            .lock()
            .map(|deliveries| deliveries.clone())
            .unwrap_or_default()
    }

    /// Messages delivered to one user
    pub fn messages_for(&self, user_id: UserId) -> Vec<String> {
        self.deliveries()
            .into_iter()
            .filter(|delivery| delivery.user_id == user_id)
            .map(|delivery| delivery.message)
            .collect()
    }
}

#[async_trait]
impl Notifier for MemoryNotifier {
    async fn notify(&self, user_id: UserId, message: &str) -> Result<(), NotifyError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(NotifyError {
                user_id,
                reason: "channel unavailable".to_string(),
            });
        }

        let mut deliveries = self.deliveries.lock().map_err(|_| NotifyError {
            user_id,
            reason: "delivery log poisoned".to_string(),
        })?;
        deliveries.push(Delivery {
            user_id,
            message: message.to_string(),
        });
        Ok(())
    }
}
