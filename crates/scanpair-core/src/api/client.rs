//! HTTP implementation of [`RemoteApi`].

use reqwest::header::{ACCEPT, CONTENT_TYPE};

use super::wire::{build_push_payload, parse_push_response, parse_reference_list};
use super::{ApiError, ApiResult, PushOutcome, RemoteApi};
use crate::config::AppConfig;
use crate::models::{ReferenceKind, ScanRecord};
use crate::util::compact_text;

/// reqwest-backed client for the scan backend.
#[derive(Debug, Clone)]
pub struct HttpSyncClient {
    push_url: String,
    selectors_url: String,
    client: reqwest::Client,
}

impl HttpSyncClient {
    /// Build a client with the timeouts and endpoints from `config`.
    pub fn new(config: &AppConfig) -> ApiResult<Self> {
        let config = config
            .clone()
            .validated()
            .map_err(|error| ApiError::InvalidConfiguration(error.to_string()))?;

        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout())
            .read_timeout(config.request_timeout())
            .timeout(config.request_timeout())
            .build()?;

        Ok(Self {
            push_url: config.push_url(),
            selectors_url: config.selectors_url(),
            client,
        })
    }

    pub fn push_url(&self) -> &str {
        &self.push_url
    }

    /// Read the body of a response, turning non-2xx answers into errors.
    async fn read_success_body(response: reqwest::Response) -> ApiResult<(u16, String)> {
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(ApiError::Status {
                code: status.as_u16(),
                body: compact_text(&body),
            });
        }
        Ok((status.as_u16(), body))
    }
}

impl RemoteApi for HttpSyncClient {
    async fn push_records(&self, records: &[ScanRecord]) -> ApiResult<PushOutcome> {
        let payload = build_push_payload(records);
        tracing::debug!(url = %self.push_url, count = payload.len(), "Pushing scan records");

        let response = self
            .client
            .post(&self.push_url)
            .header(ACCEPT, "application/json")
            .json(&payload)
            .send()
            .await?;

        let (status_code, body) = Self::read_success_body(response).await?;
        let server_status = parse_push_response(&body)?;
        tracing::debug!(status_code, server_status = %server_status, "Push acknowledged");

        Ok(PushOutcome {
            status_code,
            server_status,
        })
    }

    async fn pull_reference_list(&self, kind: ReferenceKind) -> ApiResult<Vec<String>> {
        tracing::debug!(url = %self.selectors_url, list = kind.wire_name(), "Pulling reference list");

        let response = self
            .client
            .post(&self.selectors_url)
            .query(&[("endpoint", kind.wire_name())])
            .header(ACCEPT, "application/json")
            .header(CONTENT_TYPE, "application/json")
            .send()
            .await?;

        let (_, body) = Self::read_success_body(response).await?;
        parse_reference_list(kind, &body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NewScanRecord, SyncStatus};
    use crate::services::DatabaseService;
    use crate::sync::{SyncOrchestrator, SyncOutcome};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::sync::oneshot;

    /// Serve one canned HTTP response and hand back the raw request.
    async fn serve_once(
        status_line: &'static str,
        body: &'static str,
    ) -> (String, oneshot::Receiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (request_tx, request_rx) = oneshot::channel();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let request = read_request(&mut socket).await;
            let response = format!(
                "HTTP/1.1 {status_line}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
            request_tx.send(request).ok();
        });

        (format!("http://{addr}"), request_rx)
    }

    async fn read_request(socket: &mut tokio::net::TcpStream) -> String {
        let mut buffer = Vec::new();
        let mut chunk = [0_u8; 4096];
        loop {
            let read = socket.read(&mut chunk).await.unwrap();
            if read == 0 {
                break;
            }
            buffer.extend_from_slice(&chunk[..read]);

            let text = String::from_utf8_lossy(&buffer);
            if let Some(header_end) = text.find("\r\n\r\n") {
                let content_length = text[..header_end]
                    .lines()
                    .find_map(|line| {
                        let (name, value) = line.split_once(':')?;
                        name.eq_ignore_ascii_case("content-length")
                            .then(|| value.trim().parse::<usize>().ok())
                            .flatten()
                    })
                    .unwrap_or(0);
                if buffer.len() >= header_end + 4 + content_length {
                    break;
                }
            }
        }
        String::from_utf8_lossy(&buffer).into_owned()
    }

    /// Accept connections and hold them open without ever answering.
    async fn serve_silently() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });
        format!("http://{addr}")
    }

    fn client_for(base_url: &str) -> HttpSyncClient {
        let config = AppConfig {
            api_base_url: base_url.to_string(),
            ..AppConfig::default()
        };
        HttpSyncClient::new(&config).unwrap()
    }

    fn pending(id: i64) -> ScanRecord {
        ScanRecord {
            id,
            station_code: "ST01".to_string(),
            station_scanned_at: 1_000,
            merchandise_code: "Acme - Rose - Freedom".to_string(),
            merchandise_scanned_at: 4_500,
            elapsed_seconds: 3,
            sync_status: SyncStatus::Pending,
        }
    }

    #[test]
    fn new_rejects_invalid_base_url() {
        let config = AppConfig {
            api_base_url: "hub.example.com".to_string(),
            ..AppConfig::default()
        };
        assert!(matches!(
            HttpSyncClient::new(&config),
            Err(ApiError::InvalidConfiguration(_))
        ));
    }

    #[tokio::test]
    async fn push_posts_batch_and_reads_status() {
        let (base_url, request_rx) = serve_once("200 OK", r#"{"status":"ok"}"#).await;
        let client = client_for(&base_url);

        let outcome = client.push_records(&[pending(1), pending(2)]).await.unwrap();
        assert_eq!(outcome.status_code, 200);
        assert_eq!(outcome.server_status, "ok");

        let request = request_rx.await.unwrap();
        assert!(request.starts_with("POST /api.php?type=app2barcodes"));
        assert!(request.contains("\"qrPrefrio\":\"ST01\""));
        assert!(request.contains("\"segDif\":3"));
    }

    #[tokio::test]
    async fn push_reports_non_success_status() {
        let (base_url, _request_rx) =
            serve_once("500 Internal Server Error", r#"{"status":"error"}"#).await;
        let client = client_for(&base_url);

        let error = client.push_records(&[pending(1)]).await.unwrap_err();
        assert_eq!(error.status_code(), Some(500));
    }

    #[tokio::test]
    async fn push_reports_malformed_body() {
        let (base_url, _request_rx) = serve_once("200 OK", "not json").await;
        let client = client_for(&base_url);

        let error = client.push_records(&[pending(1)]).await.unwrap_err();
        assert!(matches!(error, ApiError::InvalidPayload(_)));
    }

    #[tokio::test]
    async fn push_reports_connection_failure() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = client_for(&format!("http://{addr}"));
        let error = client.push_records(&[pending(1)]).await.unwrap_err();
        assert!(matches!(error, ApiError::Http(_)));
    }

    #[tokio::test]
    async fn pull_uses_endpoint_query() {
        let (base_url, request_rx) =
            serve_once("200 OK", r#"{"tipos":["Rose","Carnation"]}"#).await;
        let client = client_for(&base_url);

        let names = client
            .pull_reference_list(ReferenceKind::FlowerType)
            .await
            .unwrap();
        assert_eq!(names, vec!["Rose".to_string(), "Carnation".to_string()]);

        let request = request_rx.await.unwrap();
        assert!(request.starts_with("POST /api_qr.php?endpoint=tipos"));
    }

    #[tokio::test]
    async fn push_times_out_when_backend_stalls() {
        let base_url = serve_silently().await;
        let config = AppConfig {
            api_base_url: base_url,
            request_timeout_secs: 1,
            ..AppConfig::default()
        };
        let client = HttpSyncClient::new(&config).unwrap();

        let error = client.push_records(&[pending(1)]).await.unwrap_err();
        assert!(error.is_timeout(), "expected timeout, got {error}");
    }

    #[tokio::test]
    async fn stalled_push_keeps_batch_pending() {
        let base_url = serve_silently().await;
        let config = AppConfig {
            api_base_url: base_url,
            request_timeout_secs: 1,
            ..AppConfig::default()
        };
        let db = DatabaseService::open_in_memory().unwrap();
        let id = db
            .insert_scan_record(&NewScanRecord::new("ST01", 1_000, "LOT1", 4_500))
            .await
            .unwrap();
        let orchestrator = SyncOrchestrator::new(db, HttpSyncClient::new(&config).unwrap());

        let outcome = orchestrator.sync_pending().await.unwrap();
        assert!(matches!(outcome, SyncOutcome::RetryNeeded { pending: 1, .. }));

        let stored = orchestrator
            .database()
            .get_scan_record(id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.sync_status, SyncStatus::Pending);
    }
}
