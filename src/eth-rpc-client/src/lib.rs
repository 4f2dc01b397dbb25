use std::future::Future;
use std::pin::Pin;

use ethers_core::types::{BlockNumber, TransactionRequest, U64};
pub use jsonrpc_core::{Call, Id, MethodCall, Output, Params, Request, Response, Version};
use serde::de::DeserializeOwned;

pub use crate::error::{JsonRpcError, JsonRpcResult};

pub mod error;

#[cfg(feature = "reqwest")]
pub mod reqwest;

const ETH_CHAIN_ID_METHOD: &str = "eth_chainId";
const ETH_CALL_METHOD: &str = "eth_call";

macro_rules! make_params_array {
    ($($items:expr),*) => {
        Params::Array(vec![$(serde_json::to_value($items)?, )*])
    };
}

/// A client for interacting with an Ethereum node over JSON-RPC.
#[derive(Clone)]
pub struct EthJsonRpcClient<C: Client> {
    client: C,
}

impl<C: Client> EthJsonRpcClient<C> {
    /// Create a new client.
    pub fn new(client: C) -> Self {
        Self { client }
    }

    /// Returns chain id
    pub async fn get_chain_id(&self) -> JsonRpcResult<u64> {
        self.single_request::<U64>(
            ETH_CHAIN_ID_METHOD.to_string(),
            Params::Array(vec![]),
            Id::Str(ETH_CHAIN_ID_METHOD.to_string()),
        )
        .await
        .map(|v| v.as_u64())
    }

    /// Performs eth call and returns the result.
    pub async fn eth_call(
        &self,
        params: &TransactionRequest,
        block: BlockNumber,
    ) -> JsonRpcResult<String> {
        self.single_request(
            ETH_CALL_METHOD.to_string(),
            make_params_array!(params, block),
            // For some reason some JSON RPC services fail to parse requests with null id
            Id::Str(ETH_CALL_METHOD.to_string()),
        )
        .await
    }

    /// Performs a single request.
    pub async fn single_request<R: DeserializeOwned>(
        &self,
        method: String,
        params: Params,
        id: Id,
    ) -> JsonRpcResult<R> {
        let request = Request::Single(Call::MethodCall(MethodCall {
            jsonrpc: Some(Version::V2),
            method,
            params,
            id,
        }));

        let response = self.client.send_rpc_request(request).await?;

        match response {
            Response::Single(response) => match response {
                Output::Success(success) => Ok(serde_json::from_value(success.result)?),
                Output::Failure(failure) => Err(JsonRpcError::Rpc(failure.error)),
            },
            Response::Batch(_) => Err(JsonRpcError::UnexpectedBatch),
        }
    }
}

pub trait Client: Clone + Send + Sync {
    /// Send RPC request.
    fn send_rpc_request(
        &self,
        request: Request,
    ) -> Pin<Box<dyn Future<Output = JsonRpcResult<Response>> + Send>>;
}
