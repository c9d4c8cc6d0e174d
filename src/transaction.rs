//! Simulated swap transaction workflow
//!
//! State machine driving one swap attempt from confirmation to a terminal
//! outcome. The terminal result is a configurable coin flip: this component
//! is the simulation boundary, and anything replacing it with real
//! settlement replaces exactly this module.

use std::sync::Arc;

use rand::Rng;
use serde::Serialize;
use tokio::sync::watch;
use tokio::time::sleep;
use tracing::{debug, info};

use crate::config::TransactionConfig;
use crate::error::{Result, SwapCoreError};

/// State of a swap attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TransactionState {
    Idle,
    Pending,
    Exchanging,
    Confirming,
    Succeeded,
    Failed,
}

impl TransactionState {
    /// True while the attempt is running and cannot be dismissed
    pub fn is_in_flight(self) -> bool {
        matches!(
            self,
            TransactionState::Pending | TransactionState::Exchanging | TransactionState::Confirming
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, TransactionState::Succeeded | TransactionState::Failed)
    }
}

/// Drives a single swap attempt through its timed status sequence.
///
/// The spawned driver task is the sole writer; callers observe state through
/// `state()` or the watch receiver from `watch()`.
pub struct TransactionWorkflow {
    config: TransactionConfig,
    state_tx: Arc<watch::Sender<TransactionState>>,
}

impl TransactionWorkflow {
    pub fn new(config: TransactionConfig) -> Self {
        let (tx, _rx) = watch::channel(TransactionState::Idle);
        Self {
            config,
            state_tx: Arc::new(tx),
        }
    }

    /// Current state
    pub fn state(&self) -> TransactionState {
        *self.state_tx.borrow()
    }

    /// Observation point for state changes
    pub fn watch(&self) -> watch::Receiver<TransactionState> {
        self.state_tx.subscribe()
    }

    /// Begin the attempt. Valid from `Idle` only.
    pub fn start(&self) -> Result<()> {
        self.begin(TransactionState::Idle)
    }

    /// Retry after a failed attempt. Valid from `Failed` only.
    pub fn retry(&self) -> Result<()> {
        self.begin(TransactionState::Failed)
    }

    /// Dismiss the attempt once it has reached a terminal state, resetting
    /// to `Idle`. Rejected while the sequence is running.
    pub fn dismiss(&self) -> Result<()> {
        let mut rejected = false;
        self.state_tx.send_if_modified(|state| {
            if state.is_in_flight() {
                rejected = true;
                false
            } else {
                *state = TransactionState::Idle;
                true
            }
        });
        if rejected {
            return Err(SwapCoreError::TransactionInFlight);
        }
        Ok(())
    }

    /// Compare-and-set into `Pending`, then spawn the driver task. The
    /// check and the transition happen inside one `send_if_modified`, so
    /// racing callers cannot start two sequences.
    fn begin(&self, expected: TransactionState) -> Result<()> {
        let mut observed = expected;
        let accepted = self.state_tx.send_if_modified(|state| {
            observed = *state;
            if *state == expected {
                *state = TransactionState::Pending;
                true
            } else {
                false
            }
        });

        if !accepted {
            return Err(SwapCoreError::InvalidTransition { from: observed });
        }

        info!("transaction pending");
        let tx = Arc::clone(&self.state_tx);
        let config = self.config.clone();
        tokio::spawn(drive(tx, config));
        Ok(())
    }
}

/// Timed status sequence for one attempt. No cancellation point: the
/// sequence always reaches `Succeeded` or `Failed`.
async fn drive(tx: Arc<watch::Sender<TransactionState>>, config: TransactionConfig) {
    sleep(config.exchanging_after).await;
    tx.send_replace(TransactionState::Exchanging);
    debug!("transaction exchanging");

    sleep(config.confirming_after.saturating_sub(config.exchanging_after)).await;
    tx.send_replace(TransactionState::Confirming);
    debug!("transaction confirming");

    sleep(config.terminal_after.saturating_sub(config.confirming_after)).await;
    // Simulated settlement outcome; not a real execution result.
    let success = rand::thread_rng().gen_bool(config.success_probability);
    let outcome = if success {
        TransactionState::Succeeded
    } else {
        TransactionState::Failed
    };
    info!(?outcome, "transaction settled (simulated)");
    tx.send_replace(outcome);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn fast_config(success_probability: f64) -> TransactionConfig {
        TransactionConfig {
            exchanging_after: Duration::from_millis(15),
            confirming_after: Duration::from_millis(30),
            terminal_after: Duration::from_millis(40),
            success_probability,
        }
    }

    async fn wait_terminal(workflow: &TransactionWorkflow) -> TransactionState {
        let mut rx = workflow.watch();
        loop {
            if rx.borrow().is_terminal() {
                return *rx.borrow();
            }
            rx.changed().await.unwrap();
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_reaches_success_with_probability_one() {
        let workflow = TransactionWorkflow::new(fast_config(1.0));
        workflow.start().unwrap();
        assert_eq!(workflow.state(), TransactionState::Pending);

        assert_eq!(wait_terminal(&workflow).await, TransactionState::Succeeded);
    }

    #[tokio::test(start_paused = true)]
    async fn test_observes_full_sequence() {
        let workflow = TransactionWorkflow::new(fast_config(0.0));
        let mut rx = workflow.watch();
        workflow.start().unwrap();

        let mut seen = vec![*rx.borrow_and_update()];
        while !seen.last().unwrap().is_terminal() {
            rx.changed().await.unwrap();
            seen.push(*rx.borrow_and_update());
        }
        assert_eq!(
            seen,
            vec![
                TransactionState::Pending,
                TransactionState::Exchanging,
                TransactionState::Confirming,
                TransactionState::Failed,
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_dismiss_rejected_in_flight() {
        let workflow = TransactionWorkflow::new(fast_config(1.0));
        workflow.start().unwrap();

        assert!(matches!(
            workflow.dismiss(),
            Err(SwapCoreError::TransactionInFlight)
        ));

        wait_terminal(&workflow).await;
        workflow.dismiss().unwrap();
        assert_eq!(workflow.state(), TransactionState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_from_failed() {
        let workflow = TransactionWorkflow::new(fast_config(0.0));
        workflow.start().unwrap();
        assert_eq!(wait_terminal(&workflow).await, TransactionState::Failed);

        workflow.retry().unwrap();
        assert_eq!(workflow.state(), TransactionState::Pending);
        assert!(wait_terminal(&workflow).await.is_terminal());
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_transitions_rejected() {
        let workflow = TransactionWorkflow::new(fast_config(1.0));

        // Retry before any attempt
        assert!(matches!(
            workflow.retry(),
            Err(SwapCoreError::InvalidTransition {
                from: TransactionState::Idle
            })
        ));

        workflow.start().unwrap();
        // Double start while pending
        assert!(matches!(
            workflow.start(),
            Err(SwapCoreError::InvalidTransition {
                from: TransactionState::Pending
            })
        ));

        // No restart from Succeeded until dismissed
        assert_eq!(wait_terminal(&workflow).await, TransactionState::Succeeded);
        assert!(workflow.start().is_err());
        assert!(workflow.retry().is_err());

        workflow.dismiss().unwrap();
        workflow.start().unwrap();
    }
}
