//! Sub-game Host
//!
//! A parent round owns at most one nested round. The child gets its own
//! board, state and clock, and reports back over a dedicated channel that
//! only this parent holds the receiving end of.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc;
use tracing::debug;

use crate::core::node::NodeId;
use crate::device::protocol::InternalUpdate;
use crate::game::round::{Completion, Round, RoundConfig, RoundError, RoundServices};
use crate::game::variants::GameVariant;

/// Holder for a parent's nested round.
#[derive(Debug, Default)]
pub struct SubGameHost {
    current: Mutex<Option<Round>>,
}

impl SubGameHost {
    /// Host with no child.
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self) -> MutexGuard<'_, Option<Round>> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Dispose any held child, then create and start a fresh one.
    ///
    /// Returns the child and the receiver its completion report arrives on.
    /// The receiver yields `None` if the child is disposed before reporting.
    pub async fn enter(
        &self,
        variant: Arc<dyn GameVariant>,
        nodes: Vec<NodeId>,
        services: RoundServices,
        config: RoundConfig,
    ) -> Result<(Round, mpsc::UnboundedReceiver<InternalUpdate>), RoundError> {
        self.dispose();

        let (tx, rx) = mpsc::unbounded_channel();
        let child = Round::with_completion(variant, nodes, services, config, Completion::Parent(tx));
        *self.slot() = Some(child.clone());

        if let Err(e) = child.start().await {
            self.dispose();
            return Err(e);
        }
        debug!("Bonus round {} started", child.id().short());
        Ok((child, rx))
    }

    /// The held child, if any.
    pub fn current(&self) -> Option<Round> {
        self.slot().clone()
    }

    /// A child is held and still playing.
    pub fn is_running(&self) -> bool {
        self.current().is_some_and(|child| child.phase().is_active())
    }

    /// Drop the held child, stopping it silently. Returns whether one was held.
    pub fn dispose(&self) -> bool {
        let child = self.slot().take();
        match child {
            Some(child) => {
                debug!("Disposing bonus round {}", child.id().short());
                child.dispose();
                true
            }
            None => false,
        }
    }
}
