use futures::stream::{self, StreamExt};
use log::debug;
use reqwest::Client;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Runtime;
use tokio::sync::Semaphore;

use super::{truncate_tokens, EmbeddingProvider};
use crate::error::EmbeddingError;

/// Texts per HTTP request
const REQUEST_BATCH: usize = 16;

/// Requests buffered ahead of the semaphore, per permit
const BUFFER_CAPACITY_MULTIPLIER: usize = 2;

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingDatum>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingDatum {
    embedding: Vec<f32>,
    #[serde(default)]
    index: Option<usize>,
}

/// Client for an OpenAI-compatible `/embeddings` endpoint.
///
/// Owns its own tokio runtime so the rest of the pipeline stays synchronous.
/// Requests run concurrently up to `concurrency`; any transport error,
/// timeout, or non-success status aborts the batch.
pub struct HttpEmbedder {
    client: Client,
    runtime: Runtime,
    url: String,
    model: String,
    api_key: Option<String>,
    max_tokens: usize,
    concurrency: usize,
    timeout: Duration,
}

impl HttpEmbedder {
    pub fn new(
        url: String,
        model: String,
        api_key: Option<String>,
        max_tokens: usize,
        concurrency: usize,
        timeout: Duration,
    ) -> Result<Self, EmbeddingError> {
        let client = Client::builder()
            .build()
            .map_err(|e| EmbeddingError::Request(e.to_string()))?;
        Self::with_client(client, url, model, api_key, max_tokens, concurrency, timeout)
    }

    fn with_client(
        client: Client,
        url: String,
        model: String,
        api_key: Option<String>,
        max_tokens: usize,
        concurrency: usize,
        timeout: Duration,
    ) -> Result<Self, EmbeddingError> {
        let runtime = Runtime::new().map_err(|e| EmbeddingError::Runtime(e.to_string()))?;

        Ok(Self {
            client,
            runtime,
            url,
            model,
            api_key,
            max_tokens,
            concurrency: concurrency.max(1),
            timeout,
        })
    }

    async fn request(&self, inputs: Vec<String>) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let payload = serde_json::json!({
            "input": inputs,
            "model": self.model,
        });

        let mut request = self.client.post(&self.url).timeout(self.timeout).json(&payload);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EmbeddingError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: EmbeddingResponse = response.json().await.map_err(|e| self.transport_error(e))?;
        decode_embeddings(parsed, inputs.len())
    }

    fn transport_error(&self, e: reqwest::Error) -> EmbeddingError {
        if e.is_timeout() {
            EmbeddingError::Timeout(self.timeout.as_secs())
        } else if e.is_decode() {
            EmbeddingError::Response(e.to_string())
        } else {
            EmbeddingError::Request(e.to_string())
        }
    }
}

/// Check the vector count and restore request order
fn decode_embeddings(
    mut response: EmbeddingResponse,
    expected: usize,
) -> Result<Vec<Vec<f32>>, EmbeddingError> {
    if response.data.len() != expected {
        return Err(EmbeddingError::Response(format!(
            "requested {} embeddings, received {}",
            expected,
            response.data.len()
        )));
    }

    // Servers may reorder; `index` restores request order when present
    if response.data.iter().all(|d| d.index.is_some()) {
        response.data.sort_by_key(|d| d.index);
    }

    Ok(response.data.into_iter().map(|d| d.embedding).collect())
}

impl EmbeddingProvider for HttpEmbedder {
    fn name(&self) -> &str {
        "http"
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let chunks: Vec<Vec<String>> = texts
            .chunks(REQUEST_BATCH)
            .map(|chunk| chunk.iter().map(|t| truncate_tokens(t, self.max_tokens)).collect())
            .collect();
        debug!("Sending {} embedding requests to {}", chunks.len(), self.url);

        let semaphore = Arc::new(Semaphore::new(self.concurrency));

        self.runtime.block_on(async {
            let mut results: Vec<(usize, Result<Vec<Vec<f32>>, EmbeddingError>)> =
                stream::iter(chunks.into_iter().enumerate())
                    .map(|(i, chunk)| {
                        let semaphore = semaphore.clone();
                        async move {
                            let _permit = semaphore
                                .acquire()
                                .await
                                .expect("semaphore should never be closed");
                            (i, self.request(chunk).await)
                        }
                    })
                    .buffer_unordered(self.concurrency * BUFFER_CAPACITY_MULTIPLIER)
                    .collect()
                    .await;

            results.sort_by_key(|(i, _)| *i);

            let mut vectors = Vec::with_capacity(texts.len());
            for (_, result) in results {
                vectors.extend(result?);
            }
            Ok(vectors)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::{TcpListener, TcpStream};
    use std::thread;

    fn datum(index: Option<usize>, value: f32) -> EmbeddingDatum {
        EmbeddingDatum {
            embedding: vec![value, 0.0],
            index,
        }
    }

    /// Read one request: headers plus a Content-Length body. Returns the body.
    fn read_request(stream: &mut TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];
        loop {
            let read = stream.read(&mut chunk).unwrap();
            if read == 0 {
                return String::new();
            }
            buf.extend_from_slice(&chunk[..read]);
            if let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                let headers = String::from_utf8_lossy(&buf[..end]).to_lowercase();
                let length = headers
                    .lines()
                    .find_map(|line| line.strip_prefix("content-length:"))
                    .and_then(|v| v.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                if buf.len() >= end + 4 + length {
                    return String::from_utf8_lossy(&buf[end + 4..end + 4 + length]).into_owned();
                }
            }
        }
    }

    fn respond(stream: &mut TcpStream, status_line: &str, body: &str) {
        let response = format!(
            "{}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status_line,
            body.len(),
            body
        );
        stream.write_all(response.as_bytes()).unwrap();
    }

    /// Serve a single canned response on a loopback port; returns the endpoint URL
    fn serve_once(status_line: &'static str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}/v1/embeddings", listener.local_addr().unwrap());
        thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            read_request(&mut stream);
            respond(&mut stream, status_line, body);
        });
        url
    }

    /// Answer `requests` calls, embedding "abstract k" as [k, 0], with
    /// `index` fields reversed
    fn serve_numbered(requests: usize) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}/v1/embeddings", listener.local_addr().unwrap());
        thread::spawn(move || {
            for _ in 0..requests {
                let (mut stream, _) = listener.accept().unwrap();
                let request: serde_json::Value = serde_json::from_str(&read_request(&mut stream)).unwrap();
                let inputs = request["input"].as_array().unwrap();
                let data: Vec<serde_json::Value> = inputs
                    .iter()
                    .enumerate()
                    .rev()
                    .map(|(i, text)| {
                        let k: f32 = text.as_str().unwrap().trim_start_matches("abstract ").parse().unwrap();
                        serde_json::json!({"embedding": [k, 0.0], "index": i})
                    })
                    .collect();
                let body = serde_json::json!({ "data": data }).to_string();
                respond(&mut stream, "HTTP/1.1 200 OK", &body);
            }
        });
        url
    }

    fn embedder(url: String) -> HttpEmbedder {
        let client = Client::builder().no_proxy().build().unwrap();
        HttpEmbedder::with_client(
            client,
            url,
            "test-model".to_string(),
            None,
            512,
            2,
            Duration::from_secs(5),
        )
        .unwrap()
    }

    fn texts(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("abstract {}", i)).collect()
    }

    #[test]
    fn test_decode_restores_request_order() {
        let response = EmbeddingResponse {
            data: vec![datum(Some(2), 2.0), datum(Some(0), 0.0), datum(Some(1), 1.0)],
        };
        let vectors = decode_embeddings(response, 3).unwrap();
        let firsts: Vec<f32> = vectors.iter().map(|v| v[0]).collect();
        assert_eq!(firsts, vec![0.0, 1.0, 2.0]);
    }

    #[test]
    fn test_decode_without_index_keeps_arrival_order() {
        let response = EmbeddingResponse {
            data: vec![datum(None, 5.0), datum(Some(0), 3.0)],
        };
        let vectors = decode_embeddings(response, 2).unwrap();
        assert_eq!(vectors[0][0], 5.0);
        assert_eq!(vectors[1][0], 3.0);
    }

    #[test]
    fn test_decode_rejects_count_mismatch() {
        let response = EmbeddingResponse {
            data: vec![datum(Some(0), 1.0)],
        };
        let result = decode_embeddings(response, 2);
        assert!(matches!(result, Err(EmbeddingError::Response(_))));
    }

    #[test]
    fn test_embed_batch_reads_openai_response() {
        let url = serve_once(
            "HTTP/1.1 200 OK",
            r#"{"data": [{"embedding": [0.0, 1.0], "index": 1}, {"embedding": [1.0, 0.0], "index": 0}]}"#,
        );
        let vectors = embedder(url).embed_batch(&texts(2)).unwrap();
        assert_eq!(vectors, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
    }

    #[test]
    fn test_concurrent_requests_keep_input_order() {
        // 40 texts: three requests in flight under a concurrency of 2
        let url = serve_numbered(3);
        let vectors = embedder(url).embed_batch(&texts(40)).unwrap();

        assert_eq!(vectors.len(), 40);
        for (k, vector) in vectors.iter().enumerate() {
            assert_eq!(vector[0], k as f32);
        }
    }

    #[test]
    fn test_error_status_aborts_batch() {
        let url = serve_once("HTTP/1.1 503 Service Unavailable", r#"{"error": "overloaded"}"#);
        let result = embedder(url).embed_batch(&texts(3));
        match result {
            Err(EmbeddingError::Status { status, body }) => {
                assert_eq!(status, 503);
                assert!(body.contains("overloaded"));
            }
            other => panic!("expected status error, got {:?}", other),
        }
    }

    #[test]
    fn test_malformed_body_is_response_error() {
        let url = serve_once("HTTP/1.1 200 OK", r#"{"vectors": []}"#);
        let result = embedder(url).embed_batch(&texts(1));
        assert!(matches!(result, Err(EmbeddingError::Response(_))));
    }

    #[test]
    fn test_unreachable_endpoint_is_request_error() {
        let result = embedder("http://127.0.0.1:1/v1/embeddings".to_string()).embed_batch(&texts(1));
        assert!(matches!(
            result,
            Err(EmbeddingError::Request(_)) | Err(EmbeddingError::Timeout(_))
        ));
    }
}
