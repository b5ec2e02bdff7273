use serde::{Deserialize, Serialize};
use std::time::Duration;
use textpipe_core::{trim_to_last_sentence, Error, GenerationRequest, Result, TextGenerator};

use crate::{env, env_u64};

pub const DEFAULT_INFERENCE_URL: &str = "https://api-inference.huggingface.co/models/gpt2";
pub const DEFAULT_INFERENCE_TIMEOUT: Duration = Duration::from_secs(60);

pub const CREDENTIAL_ENV: &str = "API_TOKEN";
pub const ENDPOINT_ENV: &str = "TEXTPIPE_INFERENCE_URL";
pub const TIMEOUT_ENV: &str = "TEXTPIPE_INFERENCE_TIMEOUT_MS";

#[derive(Clone)]
pub struct InferenceConfig {
    pub endpoint: String,
    /// Bearer token for the endpoint. `None` sends the request unauthenticated.
    pub credential: Option<String>,
    pub timeout: Duration,
}

// Hand-written so the credential never ends up in logs.
impl std::fmt::Debug for InferenceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InferenceConfig")
            .field("endpoint", &self.endpoint)
            .field(
                "credential",
                &self.credential.as_ref().map(|_| "<redacted>"),
            )
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_INFERENCE_URL.to_string(),
            credential: None,
            timeout: DEFAULT_INFERENCE_TIMEOUT,
        }
    }
}

impl InferenceConfig {
    /// Read once at startup: `API_TOKEN`, `TEXTPIPE_INFERENCE_URL`, `TEXTPIPE_INFERENCE_TIMEOUT_MS`.
    pub fn from_env() -> Self {
        Self {
            endpoint: env(ENDPOINT_ENV).unwrap_or_else(|| DEFAULT_INFERENCE_URL.to_string()),
            credential: env(CREDENTIAL_ENV),
            timeout: env_u64(TIMEOUT_ENV)
                .map(Duration::from_millis)
                .unwrap_or(DEFAULT_INFERENCE_TIMEOUT),
        }
    }
}

#[derive(Debug, Clone)]
pub struct InferenceClient {
    client: reqwest::Client,
    config: InferenceConfig,
}

impl InferenceClient {
    pub fn new(config: InferenceConfig) -> Result<Self> {
        if config.credential.is_none() {
            tracing::warn!(
                "{CREDENTIAL_ENV} is not set; inference requests will be sent without credentials"
            );
        }
        let client = reqwest::Client::builder()
            .user_agent(crate::USER_AGENT)
            .timeout(config.timeout)
            .build()
            .map_err(|e| Error::Transport(e.to_string()))?;
        Ok(Self { client, config })
    }

    pub fn endpoint(&self) -> &str {
        &self.config.endpoint
    }

    /// Call the endpoint and return the first candidate's text, untrimmed.
    pub async fn generate_raw(&self, req: &GenerationRequest) -> Result<String> {
        req.validate()?;
        let body = InferenceRequest {
            inputs: &req.prompt,
            parameters: Parameters {
                max_new_tokens: req.max_new_tokens,
                temperature: req.temperature,
            },
        };

        tracing::debug!(
            endpoint = %self.config.endpoint,
            prompt_chars = req.prompt.len(),
            max_new_tokens = req.max_new_tokens,
            temperature = req.temperature,
            "calling inference endpoint"
        );
        let mut rb = self
            .client
            .post(&self.config.endpoint)
            .header(reqwest::header::CONTENT_TYPE, "application/json");
        if let Some(k) = &self.config.credential {
            rb = rb.header(reqwest::header::AUTHORIZATION, format!("Bearer {k}"));
        }

        let resp = rb
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Transport(e.to_string()))?;
        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| Error::Transport(e.to_string()))?;
        if !status.is_success() {
            return Err(Error::Inference {
                status: status.as_u16(),
                body: text,
            });
        }

        // Only the first candidate is read; later elements may have any shape.
        let candidates: Vec<serde_json::Value> = serde_json::from_str(&text)
            .map_err(|e| Error::MalformedResponse(format!("expected a JSON array: {e}")))?;
        let first = candidates
            .into_iter()
            .next()
            .ok_or_else(|| Error::MalformedResponse("no generation candidates".to_string()))?;
        let first: Candidate = serde_json::from_value(first)
            .map_err(|e| Error::MalformedResponse(format!("first candidate: {e}")))?;
        tracing::debug!(
            generated_chars = first.generated_text.len(),
            "inference response received"
        );
        Ok(first.generated_text)
    }
}

#[async_trait::async_trait]
impl TextGenerator for InferenceClient {
    async fn generate(&self, req: &GenerationRequest) -> Result<String> {
        let raw = self.generate_raw(req).await?;
        Ok(trim_to_last_sentence(&raw))
    }
}

#[derive(Debug, Serialize)]
struct InferenceRequest<'a> {
    inputs: &'a str,
    parameters: Parameters,
}

#[derive(Debug, Serialize)]
struct Parameters {
    max_new_tokens: u32,
    temperature: f64,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    generated_text: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        http::{header, HeaderMap, StatusCode},
        routing::post,
        Json, Router,
    };
    use std::net::SocketAddr;

    async fn serve(app: Router) -> SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr: SocketAddr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        addr
    }

    fn config(addr: SocketAddr, credential: Option<&str>) -> InferenceConfig {
        InferenceConfig {
            endpoint: format!("http://{addr}/models/gpt2"),
            credential: credential.map(str::to_string),
            timeout: Duration::from_secs(5),
        }
    }

    /// Mimics the hosted endpoint: requires `Bearer secret`, echoes the payload shape back.
    fn fake_endpoint(generated: &'static str) -> Router {
        Router::new().route(
            "/models/gpt2",
            post(move |headers: HeaderMap, Json(v): Json<serde_json::Value>| async move {
                let auth = headers
                    .get(header::AUTHORIZATION)
                    .and_then(|h| h.to_str().ok())
                    .unwrap_or("");
                if auth != "Bearer secret" {
                    return (
                        StatusCode::UNAUTHORIZED,
                        Json(serde_json::json!({"error": "Authorization header is invalid"})),
                    );
                }
                let ok = v["inputs"].is_string()
                    && v["parameters"]["max_new_tokens"].as_u64() == Some(50)
                    && v["parameters"]["temperature"].as_f64() == Some(0.8);
                if !ok {
                    return (
                        StatusCode::BAD_REQUEST,
                        Json(serde_json::json!({"error": format!("unexpected payload: {v}")})),
                    );
                }
                (
                    StatusCode::OK,
                    Json(serde_json::json!([{ "generated_text": generated }])),
                )
            }),
        )
    }

    #[tokio::test]
    async fn generate_posts_payload_and_trims_to_last_sentence() {
        let addr = serve(fake_endpoint(
            "  Life is a box of chocolates. You never know what you're gonna g ",
        ))
        .await;
        let client = InferenceClient::new(config(addr, Some("secret"))).unwrap();
        assert_eq!(client.endpoint(), format!("http://{addr}/models/gpt2"));

        let req = GenerationRequest::new("Life is a box of");
        let raw = client.generate_raw(&req).await.unwrap();
        assert!(raw.starts_with("  Life"), "raw text is returned untouched");

        let out = client.generate(&req).await.unwrap();
        assert_eq!(out, "Life is a box of chocolates.");
    }

    #[tokio::test]
    async fn generate_without_period_returns_trimmed_text() {
        let addr = serve(fake_endpoint("\n and so it goes ")).await;
        let client = InferenceClient::new(config(addr, Some("secret"))).unwrap();
        let out = client
            .generate(&GenerationRequest::new("prompt"))
            .await
            .unwrap();
        assert_eq!(out, "and so it goes");
    }

    #[tokio::test]
    async fn missing_credential_surfaces_as_inference_error() {
        let addr = serve(fake_endpoint("unused.")).await;
        let client = InferenceClient::new(config(addr, None)).unwrap();
        let err = client
            .generate(&GenerationRequest::new("prompt"))
            .await
            .unwrap_err();
        match err {
            Error::Inference { status, body } => {
                assert_eq!(status, 401);
                assert!(body.contains("Authorization header is invalid"), "{body}");
            }
            other => panic!("expected inference error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn error_status_carries_code_and_body() {
        let app = Router::new().route(
            "/models/gpt2",
            post(|| async { (StatusCode::SERVICE_UNAVAILABLE, "model gpt2 is loading") }),
        );
        let addr = serve(app).await;
        let client = InferenceClient::new(config(addr, Some("secret"))).unwrap();
        let err = client
            .generate(&GenerationRequest::new("prompt"))
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Request failed with status code 503: model gpt2 is loading"
        );
    }

    #[tokio::test]
    async fn unexpected_json_shape_is_malformed_response() {
        let app = Router::new()
            .route(
                "/object",
                post(|| async { Json(serde_json::json!({"generated_text": "x."})) }),
            )
            .route("/empty", post(|| async { Json(serde_json::json!([])) }));
        let addr = serve(app).await;

        for path in ["object", "empty"] {
            let client = InferenceClient::new(InferenceConfig {
                endpoint: format!("http://{addr}/{path}"),
                credential: Some("secret".to_string()),
                timeout: Duration::from_secs(5),
            })
            .unwrap();
            let err = client
                .generate(&GenerationRequest::new("prompt"))
                .await
                .unwrap_err();
            assert!(
                matches!(err, Error::MalformedResponse(_)),
                "{path}: got {err:?}"
            );
        }
    }

    #[tokio::test]
    async fn only_the_first_candidate_has_to_parse() {
        let app = Router::new()
            .route(
                "/mixed",
                post(|| async { Json(serde_json::json!([{ "generated_text": "A. B" }, "extra"])) }),
            )
            .route(
                "/scalar-first",
                post(|| async { Json(serde_json::json!(["A. B", { "generated_text": "C." }])) }),
            );
        let addr = serve(app).await;
        let client_for = |path: &str| {
            InferenceClient::new(InferenceConfig {
                endpoint: format!("http://{addr}/{path}"),
                credential: Some("secret".to_string()),
                timeout: Duration::from_secs(5),
            })
            .unwrap()
        };

        let out = client_for("mixed")
            .generate(&GenerationRequest::new("prompt"))
            .await
            .unwrap();
        assert_eq!(out, "A.");

        let err = client_for("scalar-first")
            .generate(&GenerationRequest::new("prompt"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::MalformedResponse(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn missing_generated_text_reads_as_empty() {
        let app = Router::new().route(
            "/models/gpt2",
            post(|| async { Json(serde_json::json!([{ "score": 1 }])) }),
        );
        let addr = serve(app).await;
        let client = InferenceClient::new(config(addr, Some("secret"))).unwrap();
        let out = client
            .generate(&GenerationRequest::new("prompt"))
            .await
            .unwrap();
        assert_eq!(out, "");
    }

    #[tokio::test]
    async fn connection_failure_is_transport_error() {
        // Grab a free port, then close it so nothing is listening.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = InferenceClient::new(config(addr, Some("secret"))).unwrap();
        let err = client
            .generate(&GenerationRequest::new("prompt"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Transport(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn invalid_parameters_fail_before_any_request() {
        let client = InferenceClient::new(InferenceConfig::default()).unwrap();
        let mut req = GenerationRequest::new("prompt");
        req.temperature = 0.0;
        let err = client.generate(&req).await.unwrap_err();
        assert!(matches!(err, Error::InvalidParameter(_)), "got {err:?}");
    }

    #[test]
    fn debug_output_redacts_credential() {
        let cfg = InferenceConfig {
            credential: Some("hf_super_secret".to_string()),
            ..InferenceConfig::default()
        };
        let s = format!("{cfg:?}");
        assert!(!s.contains("hf_super_secret"), "{s}");
        assert!(s.contains("<redacted>"), "{s}");
    }
}
