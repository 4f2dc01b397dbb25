use std::future::Future;
use std::pin::Pin;

use jsonrpc_core::{Request, Response};
pub use reqwest;

use crate::error::{JsonRpcError, JsonRpcResult};
use crate::Client;

/// Reqwest client implementation.
#[derive(Clone)]
pub struct ReqwestClient {
    client: reqwest::Client,
    endpoint_url: String,
}

impl ReqwestClient {
    /// Creates a new client.
    pub fn new(endpoint_url: String) -> Self {
        Self::new_with_client(endpoint_url, Default::default())
    }

    /// Creates a new client with a custom reqwest client.
    pub fn new_with_client(endpoint_url: String, client: reqwest::Client) -> Self {
        Self {
            endpoint_url,
            client,
        }
    }
}

impl Client for ReqwestClient {
    fn send_rpc_request(
        &self,
        request: Request,
    ) -> Pin<Box<dyn Future<Output = JsonRpcResult<Response>> + Send>> {
        let client = self.client.clone();
        let endpoint_url = self.endpoint_url.clone();
        Box::pin(async move {
            log::trace!("ReqwestClient - sending request {request:?}");

            let response = client.post(&endpoint_url).json(&request).send().await?;

            let status = response.status();
            if !status.is_success() {
                let text = response.text().await.unwrap_or_default();
                return Err(JsonRpcError::Http { code: status, text });
            }

            let response = response.json::<Response>().await?;

            log::trace!("response: {response:?}");

            Ok(response)
        })
    }
}
