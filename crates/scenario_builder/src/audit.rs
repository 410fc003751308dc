//! Fire-and-forget audit trail to the external `application_logs` table.
//!
//! Handlers enqueue entries on an unbounded channel and move on; a single
//! background worker drains the channel and performs the inserts. A failed
//! insert is logged locally and never propagates back to the request.

use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::logging::log_error;

pub const AUDIT_MODULE: &str = "SUMO_API_GRID";
pub const AUDIT_ACTOR: &str = "API/SUMO_BACKEND";

/// Severity vocabulary of the shared log table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditLevel {
    Info,
    Success,
    Error,
    Critical,
}

impl AuditLevel {
    fn as_str(self) -> &'static str {
        match self {
            AuditLevel::Info => "INFO",
            AuditLevel::Success => "SUCCESS",
            AuditLevel::Error => "ERROR",
            AuditLevel::Critical => "CRITICAL",
        }
    }
}

/// One row destined for the shared table; column names match its schema.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AuditEntry {
    pub nivel: String,
    pub modulo: String,
    pub mensagem: String,
    pub user_email: String,
}

impl AuditEntry {
    pub fn new(level: AuditLevel, message: impl Into<String>) -> Self {
        Self {
            nivel: level.as_str().to_string(),
            modulo: AUDIT_MODULE.to_string(),
            mensagem: message.into(),
            user_email: AUDIT_ACTOR.to_string(),
        }
    }
}

/// Cheap cloneable handle handlers use to enqueue entries.
#[derive(Clone)]
pub struct AuditLog {
    sender: mpsc::UnboundedSender<AuditEntry>,
}

impl AuditLog {
    /// A log handle with its raw receiving end, no worker attached.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<AuditEntry>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }

    pub fn record(&self, level: AuditLevel, message: impl Into<String>) {
        let entry = AuditEntry::new(level, message);
        // Receiver gone means the worker already shut down; nothing to do.
        let _ = self.sender.send(entry);
    }
}

/// Seam over the table insert so the worker is testable offline.
pub trait AuditSink: Send + Sync + 'static {
    fn insert(
        &self,
        entry: &AuditEntry,
    ) -> impl std::future::Future<Output = Result<(), String>> + Send;
}

/// Inserts rows through the Supabase REST endpoint for the table.
pub struct SupabaseAuditSink {
    client: reqwest::Client,
    base_url: String,
    service_role_key: String,
}

impl SupabaseAuditSink {
    pub fn new(base_url: String, service_role_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
            service_role_key,
        }
    }
}

impl AuditSink for SupabaseAuditSink {
    async fn insert(&self, entry: &AuditEntry) -> Result<(), String> {
        let url = format!("{}/rest/v1/application_logs", self.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.service_role_key)
            .header("apikey", self.service_role_key.clone())
            .json(entry)
            .send()
            .await
            .map_err(|e| format!("audit request failed: {e}"))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(format!("audit insert rejected ({status}): {detail}"));
        }
        Ok(())
    }
}

/// Spawn the drain worker; the handle resolves once every sender is dropped
/// and the channel is empty.
pub fn spawn_audit_worker<S: AuditSink>(sink: S) -> (AuditLog, JoinHandle<()>) {
    let (log, mut receiver) = AuditLog::channel();
    let worker = tokio::spawn(async move {
        while let Some(entry) = receiver.recv().await {
            if let Err(message) = sink.insert(&entry).await {
                log_error(
                    "audit_delivery_failed",
                    serde_json::json!({
                        "nivel": entry.nivel,
                        "mensagem": entry.mensagem,
                        "error": message,
                    }),
                );
            }
        }
    });
    (log, worker)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    struct RecordingSink {
        entries: Arc<Mutex<Vec<AuditEntry>>>,
    }

    impl AuditSink for RecordingSink {
        async fn insert(&self, entry: &AuditEntry) -> Result<(), String> {
            self.entries
                .lock()
                .expect("entries lock poisoned")
                .push(entry.clone());
            Ok(())
        }
    }

    struct RefusingSink;

    impl AuditSink for RefusingSink {
        async fn insert(&self, _entry: &AuditEntry) -> Result<(), String> {
            Err("table offline".to_string())
        }
    }

    #[tokio::test]
    async fn worker_drains_entries_in_order() {
        let entries = Arc::new(Mutex::new(Vec::new()));
        let (log, worker) = spawn_audit_worker(RecordingSink {
            entries: entries.clone(),
        });

        log.record(AuditLevel::Info, "starting");
        log.record(AuditLevel::Success, "done");
        drop(log);
        worker.await.expect("worker should not panic");

        let seen = entries.lock().expect("entries lock poisoned");
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].nivel, "INFO");
        assert_eq!(seen[0].mensagem, "starting");
        assert_eq!(seen[1].nivel, "SUCCESS");
        assert_eq!(seen[0].modulo, AUDIT_MODULE);
        assert_eq!(seen[0].user_email, AUDIT_ACTOR);
    }

    #[tokio::test]
    async fn delivery_failure_does_not_stop_the_worker() {
        let (log, worker) = spawn_audit_worker(RefusingSink);

        log.record(AuditLevel::Error, "first");
        log.record(AuditLevel::Critical, "second");
        drop(log);

        // Reaching completion proves failed inserts are swallowed.
        worker.await.expect("worker should not panic");
    }

    #[test]
    fn entry_carries_the_shared_table_vocabulary() {
        let entry = AuditEntry::new(AuditLevel::Critical, "disk full");
        assert_eq!(entry.nivel, "CRITICAL");
        assert_eq!(entry.modulo, "SUMO_API_GRID");
        assert_eq!(entry.user_email, "API/SUMO_BACKEND");
    }
}
