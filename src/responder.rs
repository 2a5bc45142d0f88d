//! Scripted answers to permission prompts.
//!
//! Prompts are queued on a channel and answered from a background task, so results reach the
//! plugin through its permission-result entry point after the originating call has returned,
//! the same way a platform dialog would.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use permissions_broker::{PermissionPrompter, PromptRequest};
use smsbridge_core_types::{BridgeError, PermissionStatus};
use smsbridge_providers::{FixtureDevice, SmsPlugin};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::config::PromptConfig;

/// Surface-side prompter: forwards each prompt to the responder task.
pub struct ScriptedPrompter {
    tx: mpsc::UnboundedSender<PromptRequest>,
    issued: Arc<AtomicUsize>,
}

#[async_trait]
impl PermissionPrompter for ScriptedPrompter {
    async fn prompt(&self, request: PromptRequest) -> Result<(), BridgeError> {
        self.issued.fetch_add(1, Ordering::SeqCst);
        self.tx.send(request).map_err(|_| {
            self.issued.fetch_sub(1, Ordering::SeqCst);
            BridgeError::Internal("prompt responder has stopped".into())
        })
    }
}

pub struct Responder {
    prompter: Arc<ScriptedPrompter>,
    issued: Arc<AtomicUsize>,
    answered: watch::Receiver<usize>,
    task: JoinHandle<()>,
}

impl Responder {
    /// Start answering prompts for `plugin`. Granted rights are recorded on `device` so later
    /// calls find them held.
    pub fn spawn(
        plugin: Arc<SmsPlugin>,
        device: Arc<FixtureDevice>,
        policy: PromptConfig,
        delay: Duration,
    ) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<PromptRequest>();
        let (answered_tx, answered) = watch::channel(0usize);
        let issued = Arc::new(AtomicUsize::new(0));

        let task = tokio::spawn(async move {
            while let Some(request) = rx.recv().await {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                let statuses: Vec<PermissionStatus> = request
                    .rights
                    .iter()
                    .map(|right| policy.status_for(*right))
                    .collect();
                for (right, status) in request.rights.iter().zip(&statuses) {
                    if status.is_granted() {
                        device.grant(*right);
                    }
                }
                info!(
                    target = "smsbridge",
                    request_id = %request.request_id,
                    permissions = ?request.permissions,
                    ?statuses,
                    "answering permission prompt"
                );
                let resolution = plugin
                    .on_permission_result(request.request_id, &statuses)
                    .await;
                debug!(
                    target = "smsbridge",
                    request_id = %request.request_id,
                    ?resolution,
                    "prompt answered"
                );
                answered_tx.send_modify(|count| *count += 1);
            }
        });

        Self {
            prompter: Arc::new(ScriptedPrompter {
                tx,
                issued: Arc::clone(&issued),
            }),
            issued,
            answered,
            task,
        }
    }

    pub fn prompter(&self) -> Arc<dyn PermissionPrompter> {
        self.prompter.clone()
    }

    pub fn issued(&self) -> usize {
        self.issued.load(Ordering::SeqCst)
    }

    /// Wait until every prompt issued so far has been answered.
    pub async fn settle(&self) {
        let issued = self.issued();
        let mut answered = self.answered.clone();
        // Only fails once the task is gone, and then nothing is left to wait for.
        let _ = answered.wait_for(|count| *count >= issued).await;
    }

    pub fn stop(self) {
        self.task.abort();
    }
}
