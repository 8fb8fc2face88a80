use error_printer::OptionPrinter;
use http::Extensions;
use reqwest::header::{AUTHORIZATION, HeaderValue};
use reqwest::{Request, Response};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware, Middleware, Next};
use trainer_config::groups::client::ConfigValueGroup as ClientConfig;

use crate::error::{Result, TrainerClientError};

/// Builds the client used for every call to the training backend.
pub fn build_http_client(config: &ClientConfig) -> Result<ClientWithMiddleware> {
    let auth_middleware = config
        .auth_token
        .as_deref()
        .filter(|t| !t.trim().is_empty())
        .map(AuthMiddleware::new)
        .transpose()?
        .info_none("trainer API auth disabled");

    let reqwest_client = reqwest::Client::builder()
        .connect_timeout(config.connect_timeout)
        .read_timeout(config.read_timeout)
        .user_agent(config.user_agent.as_str())
        .build()?;

    Ok(ClientBuilder::new(reqwest_client).maybe_with(auth_middleware).build())
}

/// Helper trait to allow the reqwest_middleware client to optionally add a middleware.
trait OptionalMiddleware {
    fn maybe_with<M: Middleware>(self, middleware: Option<M>) -> Self;
}

impl OptionalMiddleware for ClientBuilder {
    fn maybe_with<M: Middleware>(self, middleware: Option<M>) -> Self {
        match middleware {
            Some(m) => self.with(m),
            None => self,
        }
    }
}

/// Adds a static bearer token to outbound requests.
pub struct AuthMiddleware {
    header: HeaderValue,
}

impl AuthMiddleware {
    pub fn new(token: &str) -> Result<Self> {
        let mut header = HeaderValue::from_str(&format!("Bearer {}", token.trim()))
            .map_err(|e| TrainerClientError::ConfigurationError(format!("invalid auth token: {e}")))?;
        header.set_sensitive(true);
        Ok(Self { header })
    }
}

#[async_trait::async_trait]
impl Middleware for AuthMiddleware {
    async fn handle(
        &self,
        mut req: Request,
        extensions: &mut Extensions,
        next: Next<'_>,
    ) -> reqwest_middleware::Result<Response> {
        req.headers_mut().insert(AUTHORIZATION, self.header.clone());
        next.run(req, extensions).await
    }
}
