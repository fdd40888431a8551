//! Main API client implementation

use crate::config::ClientConfig;
use crate::credentials::CredentialStore;
use crate::endpoints::{AuthApi, CommunityApi, DiaryApi, FoodsApi, ProfileApi};
use crate::envelope::{self, Payload};
use crate::error::{ApiError, ApiResult};
use crate::policy::{AttemptOutcome, Decision};
use crate::request::{RequestBuilder, RequestSpec};
use crate::transport::{HttpTransport, RawResponse, Transport, TransportError};
use dietlog_core::storage::FileStore;
use dietlog_telemetry::{metrics, Timer};
use reqwest::StatusCode;
use std::future::Future;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, instrument, warn, Span};

/// Dietlog API client
///
/// Every typed operation goes through [`execute`](Self::execute):
/// build the request (with auth), send it, apply the retry policy, decode
/// the envelope. Cloning is cheap; clones share the credential store and
/// the connection pool.
#[derive(Clone)]
pub struct DietlogClient {
    config: Arc<ClientConfig>,
    credentials: Arc<CredentialStore>,
    builder: Arc<RequestBuilder>,
    transport: Arc<dyn Transport>,
}

impl DietlogClient {
    /// Create a new client from `dietlog.toml` and the environment
    pub fn new() -> ApiResult<Self> {
        Self::with_config(ClientConfig::load()?)
    }

    /// Create a new client with specific configuration
    pub fn with_config(config: ClientConfig) -> ApiResult<Self> {
        config.validate()?;

        let transport = Arc::new(HttpTransport::new(config.timeout)?);
        let credentials = Arc::new(open_credentials(&config));

        Ok(Self::with_parts(config, credentials, transport))
    }

    /// Assemble a client from explicit parts. The configuration is used
    /// as given, without validation.
    pub fn with_parts(
        config: ClientConfig,
        credentials: Arc<CredentialStore>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        let builder = RequestBuilder::new(
            config.base_url.clone(),
            config.client_id.clone(),
            config.user_agent.clone(),
            Arc::clone(&credentials),
        );

        Self {
            config: Arc::new(config),
            credentials,
            builder: Arc::new(builder),
            transport,
        }
    }

    /// Get the current configuration
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// The shared credential store
    #[must_use]
    pub fn credentials(&self) -> &Arc<CredentialStore> {
        &self.credentials
    }

    // -------------------------------------------------------------------------
    // Endpoint API accessors
    // -------------------------------------------------------------------------

    /// Sign-in and session endpoints
    #[must_use]
    pub fn auth(&self) -> AuthApi {
        AuthApi::new(self.clone())
    }

    /// Current user profile
    #[must_use]
    pub fn profile(&self) -> ProfileApi {
        ProfileApi::new(self.clone())
    }

    /// Food database search
    #[must_use]
    pub fn foods(&self) -> FoodsApi {
        FoodsApi::new(self.clone())
    }

    /// Food diary records
    #[must_use]
    pub fn diary(&self) -> DiaryApi {
        DiaryApi::new(self.clone())
    }

    /// Community feed, posts and likes
    #[must_use]
    pub fn community(&self) -> CommunityApi {
        CommunityApi::new(self.clone())
    }

    // -------------------------------------------------------------------------
    // Request pipeline
    // -------------------------------------------------------------------------

    /// Run one logical call and decode its `data` into `T`
    #[instrument(
        skip(self, spec),
        fields(method = %spec.method(), path = %spec.path(), request_id = tracing::field::Empty)
    )]
    pub async fn execute<T: Payload>(&self, spec: RequestSpec) -> ApiResult<T> {
        metrics().increment("api.requests");
        let timer = Timer::start("api.latency_ms");

        let result = self.run(&spec).await;
        let elapsed = timer.stop();

        match &result {
            Ok(_) => debug!(?elapsed, "Request succeeded"),
            Err(e) => {
                metrics().increment(&format!("api.failures.{}", e.kind));
                debug!(
                    kind = %e.kind,
                    status = ?e.http_status,
                    error = %e,
                    ?elapsed,
                    "Request failed"
                );
            }
        }
        result
    }

    async fn run<T: Payload>(&self, spec: &RequestSpec) -> ApiResult<T> {
        let mut request = self.builder.build(spec)?;
        Span::current().record("request_id", request.request_id());

        let policy = &self.config.retry;
        let mut state = policy.start();

        loop {
            let result = self.transport.send(&request).await;
            let outcome = match &result {
                Ok(response) => AttemptOutcome::Status(response.status),
                Err(TransportError::Timeout(_)) => AttemptOutcome::TimedOut,
                Err(_) => AttemptOutcome::NetworkFailure,
            };
            debug!(attempt = state.attempt, ?outcome, "Attempt finished");

            match (policy.decide(&state, outcome), result) {
                (Decision::Accept, Ok(response)) => {
                    return envelope::decode(&response.body)
                        .map_err(|e| e.or_request_id(request.request_id()));
                }
                (Decision::Retry(delay), _) => {
                    warn!(
                        attempt = state.attempt,
                        max_attempts = state.max_attempts,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        "Retrying after backoff"
                    );
                    metrics().increment("api.retries");
                    tokio::time::sleep(delay).await;
                    state.advance();
                    self.builder.reauthorize(&mut request, spec)?;
                }
                (Decision::Unauthorized, _) => {
                    warn!("Server rejected the credential; clearing session");
                    self.credentials.clear();
                    return Err(ApiError::unauthenticated("Session was rejected by the server")
                        .with_status(401)
                        .with_request_id(request.request_id()));
                }
                (_, result) => return Err(failure(result, request.request_id())),
            }
        }
    }
}

/// Turn a final failed attempt into an [`ApiError`]
///
/// An error status whose body is a `success: false` envelope is an
/// application error carrying that status. Exhausted rate limits and any
/// other body are transport errors.
fn failure(result: Result<RawResponse, TransportError>, request_id: &str) -> ApiError {
    match result {
        Ok(response) => {
            let Ok(env) = envelope::parse(&response.body) else {
                return ApiError::transport(response.status, status_text(response.status))
                    .with_request_id(request_id);
            };
            let server_id = if env.request_id.is_empty() {
                request_id.to_string()
            } else {
                env.request_id
            };
            let error = if env.success || response.status == 429 {
                ApiError::transport(
                    response.status,
                    env.message.unwrap_or_else(|| status_text(response.status)),
                )
            } else {
                ApiError::application(env.message).with_status(response.status)
            };
            error.with_request_id(server_id)
        }
        Err(e) => ApiError::network_unavailable(e.to_string())
            .with_request_id(request_id)
            .with_source(e),
    }
}

fn status_text(status: u16) -> String {
    StatusCode::from_u16(status)
        .ok()
        .and_then(|s| s.canonical_reason())
        .map_or_else(|| format!("HTTP {status}"), |reason| format!("HTTP {status} {reason}"))
}

fn open_credentials(config: &ClientConfig) -> CredentialStore {
    let Some(ref path) = config.credentials_path else {
        return CredentialStore::in_memory();
    };

    match FileStore::open(path) {
        Ok(store) => CredentialStore::load(Arc::new(store)),
        Err(e) => {
            let report = e.to_report();
            warn!(
                path = %path.display(),
                code = %report.code_str,
                category = %report.category,
                error = %report.message,
                source = ?report.source,
                suggestion = ?report.suggestion,
                "Credential file unusable; session will not persist"
            );
            CredentialStore::in_memory()
        }
    }
}

/// Handle to a call started with [`spawn`]
#[derive(Debug)]
pub struct CallHandle {
    task: JoinHandle<()>,
}

impl CallHandle {
    /// Stop the call. Pending retries are abandoned and the completion
    /// callback will not run unless it already has.
    pub fn cancel(&self) {
        self.task.abort();
    }

    /// Whether the call completed or was cancelled
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait until the call completed or was cancelled
    pub async fn wait(self) {
        if let Err(e) = self.task.await {
            if e.is_panic() {
                warn!(error = %e, "Completion callback panicked");
            }
        }
    }
}

/// Run `call` on the runtime and hand its result to `on_complete`.
///
/// Calls are independent: several spawned calls may finish in any order.
pub fn spawn<T, F, C>(call: F, on_complete: C) -> CallHandle
where
    T: Send + 'static,
    F: Future<Output = ApiResult<T>> + Send + 'static,
    C: FnOnce(ApiResult<T>) + Send + 'static,
{
    let task = tokio::spawn(async move {
        let result = call.await;
        on_complete(result);
    });
    CallHandle { task }
}
