//! One-shot hand-off of the cluster join credential
//!
//! The manager's pipeline holds the [`JoinPublisher`]; the orchestrator holds
//! the [`JoinSubscription`] and reads it only after the manager's pipeline
//! has finished, which is what orders the workers after the manager.

use tokio::sync::oneshot;

use crate::error::{ActionError, Result};

/// What a worker needs to join the manager's cluster
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinCredential {
    pub token: String,
    pub address: String,
}

/// Write-once side of the hand-off
#[derive(Debug)]
pub struct JoinPublisher {
    sender: Option<oneshot::Sender<JoinCredential>>,
}

/// Read side of the hand-off
#[derive(Debug)]
pub struct JoinSubscription {
    receiver: oneshot::Receiver<JoinCredential>,
}

/// Create a connected publisher/subscription pair
pub fn join_channel() -> (JoinPublisher, JoinSubscription) {
    let (sender, receiver) = oneshot::channel();
    (
        JoinPublisher {
            sender: Some(sender),
        },
        JoinSubscription { receiver },
    )
}

impl JoinPublisher {
    /// Publish the credential; only the first call can succeed
    pub fn publish(&mut self, credential: JoinCredential) -> Result<()> {
        let sender = self.sender.take().ok_or_else(|| {
            ActionError::Cluster("join credential already published".to_string())
        })?;
        sender
            .send(credential)
            .map_err(|_| ActionError::Cluster("nobody is waiting for the join credential".to_string()))
    }

    pub fn is_published(&self) -> bool {
        self.sender.is_none()
    }
}

impl JoinSubscription {
    /// The published credential, or `None` if the publisher went away
    /// without publishing
    pub async fn credential(self) -> Option<JoinCredential> {
        self.receiver.await.ok()
    }
}
