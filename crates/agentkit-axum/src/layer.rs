//! Tower middleware running the AgentKit request hook at the request
//! boundary.
//!
//! Shaped after `x402_axum::layer::X402Middleware`/`X402MiddlewareService`:
//! a thin `Layer` that clones a few `Arc`s into a `Service` wrapping a boxed
//! clone of whatever it's layered onto, so it composes with any other Tower
//! middleware (including a sibling `x402-axum` payment layer placed further
//! inside the stack).

use agentkit::policy::{HookOutcome, PolicyEngine};
use agentkit_types::HookEvent;
use axum_core::extract::Request;
use axum_core::response::Response;
use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tower::Layer;
use tower::Service;
use tower::util::BoxCloneSyncService;
use url::Url;

/// Inserted into the request's extensions when the request hook grants
/// access. A payment-enforcing layer further inside the stack should check
/// for this extension and skip charging for the request — that check is the
/// contract this crate asks the enclosing framework adapter to honour.
#[derive(Debug, Clone)]
pub struct AgentKitGrant {
    pub address: String,
    pub human_id: agentkit_types::HumanId,
}

/// Tower [`Layer`] that runs [`PolicyEngine::request_hook`] on every request
/// routed through it.
#[derive(Clone)]
pub struct AgentKitLayer {
    policy: Arc<PolicyEngine>,
    base_url: Option<Url>,
}

impl AgentKitLayer {
    /// Builds a layer around a shared [`PolicyEngine`]. One `PolicyEngine`
    /// corresponds to one [`agentkit_types::AccessMode`]; a deployment
    /// offering different modes on different routes layers each route with
    /// its own `AgentKitLayer`.
    pub fn new(policy: Arc<PolicyEngine>) -> Self {
        Self {
            policy,
            base_url: None,
        }
    }

    /// Sets the base URL used to reconstruct the full resource URI a
    /// request's payload is validated against. Defaults to
    /// `http://localhost/`, matching `x402-axum`'s own fallback — avoid
    /// relying on that default in production.
    pub fn with_base_url(mut self, base_url: Url) -> Self {
        self.base_url = Some(base_url);
        self
    }

    fn base_url(&self) -> Url {
        self.base_url
            .clone()
            .unwrap_or_else(|| Url::parse("http://localhost/").unwrap())
    }
}

impl<S> Layer<S> for AgentKitLayer
where
    S: Service<Request, Response = Response, Error = Infallible> + Clone + Send + Sync + 'static,
    S::Future: Send + 'static,
{
    type Service = AgentKitMiddlewareService;

    fn layer(&self, inner: S) -> Self::Service {
        AgentKitMiddlewareService {
            policy: self.policy.clone(),
            base_url: self.base_url(),
            inner: BoxCloneSyncService::new(inner),
        }
    }
}

/// The `Service` [`AgentKitLayer`] produces. The wrapped service's concrete
/// type is erased behind [`BoxCloneSyncService`] so this type itself stays
/// non-generic, matching `X402MiddlewareService`'s shape.
#[derive(Clone)]
pub struct AgentKitMiddlewareService {
    policy: Arc<PolicyEngine>,
    base_url: Url,
    inner: BoxCloneSyncService<Request, Response, Infallible>,
}

impl AgentKitMiddlewareService {
    fn resource_uri(&self, uri: &http::Uri) -> String {
        let mut resource = self.base_url.clone();
        resource.set_path(uri.path());
        resource.set_query(uri.query());
        resource.to_string()
    }
}

impl Service<Request> for AgentKitMiddlewareService {
    type Response = Response;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Response, Infallible>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    #[tracing::instrument(skip(self, req), fields(path = req.uri().path()))]
    fn call(&mut self, req: Request) -> Self::Future {
        let policy = self.policy.clone();
        let resource_uri = self.resource_uri(req.uri());
        let resource_path = req.uri().path().to_string();
        let header_value = req
            .headers()
            .get("agentkit")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let mut inner = self.inner.clone();

        Box::pin(async move {
            let result = policy
                .request_hook(header_value.as_deref(), &resource_uri, &resource_path)
                .await;

            match &result.event {
                Some(HookEvent::ValidationFailed { error, .. }) => {
                    tracing::debug!(?error, "agentkit validation failed");
                }
                Some(event) => tracing::info!(?event, "agentkit request hook"),
                None => {}
            }

            let mut req = req;
            if result.outcome == HookOutcome::GrantAccess {
                if let Some(HookEvent::AgentVerified { address, human_id, .. }) = result.event {
                    req.extensions_mut().insert(AgentKitGrant { address, human_id });
                }
            }

            inner.call(req).await
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentkit::{AccessMode, AgentBook, InMemoryUsageStore, SignatureVerifier};
    use axum_core::body::Body;
    use http::{Request as HttpRequest, StatusCode};
    use tower::ServiceExt;
    use tower::service_fn;

    fn policy(mode: AccessMode) -> Arc<PolicyEngine> {
        Arc::new(
            PolicyEngine::new(
                mode,
                SignatureVerifier::default(),
                Arc::new(AgentBook::new(Default::default(), Default::default())),
                Arc::new(InMemoryUsageStore::new()),
            )
            .unwrap(),
        )
    }

    async fn echo_grant(req: Request) -> Result<Response, Infallible> {
        let granted = req.extensions().get::<AgentKitGrant>().is_some();
        let status = if granted { StatusCode::OK } else { StatusCode::PAYMENT_REQUIRED };
        Ok(Response::builder().status(status).body(Body::empty()).unwrap())
    }

    #[tokio::test]
    async fn no_header_passes_through_without_granting() {
        let layer = AgentKitLayer::new(policy(AccessMode::Free));
        let mut service = layer.layer(service_fn(echo_grant));
        let req = HttpRequest::builder().uri("/data").body(Body::empty()).unwrap();
        let response = service.ready().await.unwrap().call(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::PAYMENT_REQUIRED);
    }

    #[tokio::test]
    async fn malformed_header_passes_through_without_granting() {
        let layer = AgentKitLayer::new(policy(AccessMode::Free));
        let mut service = layer.layer(service_fn(echo_grant));
        let req = HttpRequest::builder()
            .uri("/data")
            .header("agentkit", "not base64!!!")
            .body(Body::empty())
            .unwrap();
        let response = service.ready().await.unwrap().call(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::PAYMENT_REQUIRED);
    }
}
