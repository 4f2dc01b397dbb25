use anyhow::Context;
use async_trait::async_trait;
use eth_rpc_client::{Client, EthJsonRpcClient};
use ethers_core::types::{BlockNumber, Bytes, TransactionRequest, H160, U256};
use ethers_core::utils::id;

/// Solidity signature of the per-token rarity getter.
const GET_RARITY_SIGNATURE: &str = "getRarity(uint256)";

/// Read-only view of the rarity code assigned to a single token.
#[async_trait]
pub trait RarityReader: Send + Sync {
    async fn read_rarity(&self, token_id: u64) -> anyhow::Result<u8>;
}

/// Rarity getter bound to a deployed tiers contract.
pub struct RarityContract<C: Client> {
    client: EthJsonRpcClient<C>,
    address: H160,
}

impl<C: Client> RarityContract<C> {
    pub fn new(client: EthJsonRpcClient<C>, address: H160) -> Self {
        Self { client, address }
    }
}

#[async_trait]
impl<C: Client> RarityReader for RarityContract<C> {
    async fn read_rarity(&self, token_id: u64) -> anyhow::Result<u8> {
        let call = TransactionRequest {
            to: Some(self.address.into()),
            data: Some(calldata(token_id)),
            ..Default::default()
        };
        let output = self.client.eth_call(&call, BlockNumber::Latest).await?;
        decode_uint8(&output)
            .with_context(|| format!("bad {GET_RARITY_SIGNATURE} output for token {token_id}"))
    }
}

/// Parses a 20-byte contract address from hex, with or without the 0x prefix.
pub fn parse_address(address: &str) -> anyhow::Result<H160> {
    let hex_str = address.strip_prefix("0x").unwrap_or(address);
    let bytes =
        hex::decode(hex_str).with_context(|| format!("invalid contract address: {address}"))?;
    if bytes.len() != 20 {
        anyhow::bail!("invalid contract address length: {} bytes", bytes.len());
    }
    Ok(H160::from_slice(&bytes))
}

fn calldata(token_id: u64) -> Bytes {
    let mut data = id(GET_RARITY_SIGNATURE).to_vec();
    let mut arg = [0u8; 32];
    U256::from(token_id).to_big_endian(&mut arg);
    data.extend_from_slice(&arg);
    data.into()
}

fn decode_uint8(output: &str) -> anyhow::Result<u8> {
    let bytes = hex::decode(output.trim_start_matches("0x"))?;
    if bytes.is_empty() {
        anyhow::bail!("empty eth_call result");
    }
    if bytes.len() > 32 {
        anyhow::bail!("eth_call result too long: {} bytes", bytes.len());
    }
    let value = U256::from_big_endian(&bytes);
    if value > U256::from(u8::MAX) {
        anyhow::bail!("rarity code out of range: {value}");
    }
    Ok(value.low_u64() as u8)
}
