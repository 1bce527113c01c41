//! Outbound report delivery
//!
//! Reports are posted to a chat-service webhook as `{"content": "..."}`. Any status outside
//! 2xx counts as a failed delivery.

use std::time::Duration;

use serde_json::json;

use crate::constants::network::REPORT_TIMEOUT_SECS;
use crate::error::{LibraryError, LibraryResult};

/// Webhook endpoint plus the shared HTTP client
#[derive(Debug, Clone)]
pub struct ReportWebhook {
    client: reqwest::Client,
    url: String,
}

impl ReportWebhook {
    pub fn new(url: impl Into<String>) -> LibraryResult<Self> {
        let url = url.into();
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(LibraryError::Config {
                message: format!("report webhook must be an http(s) URL, got {:?}", url),
            });
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REPORT_TIMEOUT_SECS))
            .build()
            .map_err(|e| LibraryError::Config {
                message: format!("cannot build HTTP client: {}", e),
            })?;

        Ok(Self { client, url })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Post one report
    pub async fn deliver(&self, content: &str) -> LibraryResult<()> {
        let response = self
            .client
            .post(&self.url)
            .json(&json!({ "content": content }))
            .send()
            .await
            .map_err(|e| LibraryError::ReportDelivery {
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(LibraryError::ReportDelivery {
                message: format!("webhook answered {}", status),
            });
        }
        Ok(())
    }
}

/// Report text in the webhook's markdown
pub fn format_report(
    reporter: &str,
    reported: &str,
    reported_uuid: Option<uuid::Uuid>,
    reason: &str,
    recent_messages: &[String],
) -> String {
    let mut content = format!("**{}** reported **{}**", reporter, reported);
    if let Some(uuid) = reported_uuid {
        content.push_str(&format!(" ({})", uuid));
    }
    content.push_str(&format!(" for \"{}\".", reason));

    if reported_uuid.is_some() {
        content.push_str(&format!("\n\n**{}**'s recent chat messages:", reported));
        for message in recent_messages {
            content.push_str(&format!("\n- \"{}\"", message));
        }
    }
    content
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};
    use tokio::task::JoinHandle;

    /// Read one HTTP request and return its body
    async fn read_body(stream: &mut TcpStream) -> String {
        let mut buffer = Vec::new();
        let mut chunk = [0u8; 1024];
        loop {
            let read = stream.read(&mut chunk).await.unwrap();
            if read == 0 {
                return String::new();
            }
            buffer.extend_from_slice(&chunk[..read]);

            let text = String::from_utf8_lossy(&buffer).into_owned();
            if let Some(end) = text.find("\r\n\r\n") {
                let length = text[..end]
                    .lines()
                    .filter_map(|line| line.split_once(':'))
                    .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
                    .and_then(|(_, value)| value.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                if buffer.len() >= end + 4 + length {
                    return text[end + 4..end + 4 + length].to_string();
                }
            }
        }
    }

    /// One-shot HTTP endpoint answering with `status`; yields the request body it received
    pub(crate) async fn webhook_endpoint(status: u16) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/report", listener.local_addr().unwrap());
        let task = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let body = read_body(&mut stream).await;
            let response = format!(
                "HTTP/1.1 {} Webhook\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
                status
            );
            stream.write_all(response.as_bytes()).await.unwrap();
            stream.shutdown().await.unwrap();
            body
        });
        (url, task)
    }

    #[tokio::test]
    async fn test_delivery_posts_json_content() {
        let (url, endpoint) = webhook_endpoint(204).await;
        let webhook = ReportWebhook::new(url).unwrap();

        webhook.deliver("**a** reported **b**").await.unwrap();
        let body: serde_json::Value = serde_json::from_str(&endpoint.await.unwrap()).unwrap();
        assert_eq!(body, json!({ "content": "**a** reported **b**" }));
    }

    #[tokio::test]
    async fn test_error_status_is_a_failed_delivery() {
        let (url, endpoint) = webhook_endpoint(500).await;
        let webhook = ReportWebhook::new(url).unwrap();

        let result = webhook.deliver("anything").await;
        assert!(matches!(result, Err(LibraryError::ReportDelivery { .. })));
        endpoint.await.unwrap();
    }

    #[tokio::test]
    async fn test_unreachable_webhook_fails() {
        // bind then drop so nothing is listening on the port
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/report", listener.local_addr().unwrap());
        drop(listener);

        let webhook = ReportWebhook::new(url).unwrap();
        assert!(webhook.deliver("anything").await.is_err());
    }

    #[test]
    fn test_non_http_url_rejected() {
        assert!(ReportWebhook::new("ftp://example.com").is_err());
    }

    #[test]
    fn test_report_lists_recent_messages() {
        let uuid = uuid::Uuid::from_u128(9);
        let content = format_report(
            "reader",
            "vandal",
            Some(uuid),
            "spam",
            &["buy now".to_string(), "cheap".to_string()],
        );
        assert_eq!(
            content,
            format!(
                "**reader** reported **vandal** ({}) for \"spam\".\n\n**vandal**'s recent chat messages:\n- \"buy now\"\n- \"cheap\"",
                uuid
            )
        );

        let offline = format_report("reader", "ghost", None, "", &[]);
        assert_eq!(offline, "**reader** reported **ghost** for \"\".");
    }
}
