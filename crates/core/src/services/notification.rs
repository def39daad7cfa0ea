//! Poll announcement dispatch.
//!
//! Delivery is delegated to an external HTTP function; the service only
//! posts the payload. Callers treat every failure as non-fatal.

use livepoll_common::{AppError, AppResult, config::NotifyConfig};
use serde::Serialize;
use tracing::debug;

/// Payload posted to the notification endpoint.
#[derive(Debug, Serialize)]
struct PollAnnouncement<'a> {
    to: &'a [String],
    question: &'a str,
    options: &'a [String],
}

/// Outbound notification dispatcher.
#[derive(Clone)]
pub struct NotificationService {
    http: reqwest::Client,
    endpoint: Option<String>,
    token: Option<String>,
}

impl NotificationService {
    /// Create a dispatcher from configuration. With no endpoint
    /// configured, every dispatch is a no-op.
    #[must_use]
    pub fn new(config: &NotifyConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: config.endpoint.clone(),
            token: config.token.clone(),
        }
    }

    /// A dispatcher with delivery disabled.
    #[must_use]
    pub fn disabled() -> Self {
        Self::new(&NotifyConfig::default())
    }

    /// Announce a new poll to the given recipients.
    pub async fn send_poll_announcement(
        &self,
        to: &[String],
        question: &str,
        options: &[String],
    ) -> AppResult<()> {
        let Some(endpoint) = &self.endpoint else {
            debug!("Notification dispatch disabled, skipping announcement");
            return Ok(());
        };
        if to.is_empty() {
            return Ok(());
        }

        let payload = PollAnnouncement { to, question, options };

        let mut request = self.http.post(endpoint).json(&payload);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| AppError::ExternalService(e.to_string()))?;

        if !response.status().is_success() {
            return Err(AppError::ExternalService(format!(
                "Notification endpoint returned {}",
                response.status()
            )));
        }

        debug!(recipients = to.len(), "Poll announcement dispatched");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_disabled_dispatch_is_noop() {
        let service = NotificationService::disabled();
        let result = service
            .send_poll_announcement(
                &["someone@example.com".to_string()],
                "Favorite color?",
                &["Red".to_string(), "Blue".to_string()],
            )
            .await;
        assert!(result.is_ok());
    }

    #[test]
    fn test_announcement_payload_shape() {
        let to = vec!["a@example.com".to_string()];
        let options = vec!["A".to_string(), "B".to_string()];
        let payload = PollAnnouncement {
            to: &to,
            question: "Q?",
            options: &options,
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["to"][0], "a@example.com");
        assert_eq!(json["question"], "Q?");
        assert_eq!(json["options"][1], "B");
    }
}
