//! Workflow automation trigger (n8n)
//!
//! One-way notification into the workflow-automation service. The call is
//! fire-and-forget: it runs on a detached task, and its outcome is only
//! ever reported through logs. Nothing here can fail the primary request.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info};

/// Fire-and-forget workflow trigger client
#[derive(Clone)]
pub struct WorkflowTrigger {
    inner: Option<Arc<TriggerInner>>,
}

struct TriggerInner {
    client: reqwest::Client,
    url: String,
    api_key: Option<String>,
}

impl WorkflowTrigger {
    /// Create a trigger; a missing URL disables it (events are logged and
    /// dropped)
    pub fn new(url: Option<String>, api_key: Option<String>) -> Self {
        let inner = url.map(|url| {
            Arc::new(TriggerInner {
                client: reqwest::Client::builder()
                    .timeout(Duration::from_secs(10))
                    .build()
                    .unwrap_or_default(),
                url,
                api_key,
            })
        });
        Self { inner }
    }

    /// A trigger that drops all events (used in tests and when the
    /// workflow service is not configured)
    pub fn disabled() -> Self {
        Self { inner: None }
    }

    /// Fire a workflow event. Returns immediately; delivery happens on a
    /// detached task and failures are logged, never propagated.
    pub fn fire(&self, event: &'static str, payload: serde_json::Value) {
        let Some(inner) = self.inner.clone() else {
            debug!(event, "Workflow trigger not configured, dropping event");
            return;
        };

        tokio::spawn(async move {
            let body = serde_json::json!({
                "event": event,
                "data": payload,
            });

            let mut request = inner.client.post(&inner.url).json(&body);
            if let Some(key) = &inner.api_key {
                request = request.header("X-N8N-API-KEY", key);
            }

            match request.send().await {
                Ok(response) if response.status().is_success() => {
                    info!(event, "Workflow trigger delivered");
                }
                Ok(response) => {
                    error!(event, status = %response.status(), "Workflow trigger rejected");
                }
                Err(e) => {
                    error!(event, error = %e, "Workflow trigger failed");
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn disabled_trigger_is_a_no_op() {
        let trigger = WorkflowTrigger::disabled();
        // Must not panic or block
        trigger.fire("quote_approved", serde_json::json!({"quote_id": "q1"}));
    }
}
