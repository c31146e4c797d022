use async_trait::async_trait;
use jsonrpsee::http_client::{HttpClient, HttpClientBuilder};
use jsonrpsee::ws_client::{WsClient, WsClientBuilder};
use serde::de::DeserializeOwned;
use serde_json::json;

use crate::api::{ChainApi, GolosRpcClient, SigningGatewayRpcClient};
use crate::types::*;

/// A connected JSON-RPC client, HTTP or WebSocket depending on the URL scheme.
pub(crate) enum RpcTransport {
    Http(HttpClient),
    Ws(WsClient),
}

impl RpcTransport {
    pub(crate) async fn connect(url: &str) -> Result<Self, ChainError> {
        if url.starts_with("http://") || url.starts_with("https://") {
            let client = HttpClientBuilder::default()
                .build(url)
                .map_err(ChainError::from)?;
            Ok(RpcTransport::Http(client))
        } else if url.starts_with("ws://") || url.starts_with("wss://") {
            let client = WsClientBuilder::default()
                .build(url)
                .await
                .map_err(ChainError::from)?;
            Ok(RpcTransport::Ws(client))
        } else {
            Err(ChainError::InvalidEndpoint(url.to_string()))
        }
    }

    async fn golos_call(
        &self,
        api: &str,
        method: &str,
        args: serde_json::Value,
    ) -> Result<serde_json::Value, ChainError> {
        let (api, method) = (api.to_string(), method.to_string());
        let value = match self {
            RpcTransport::Http(c) => GolosRpcClient::call(c, api, method, args).await?,
            RpcTransport::Ws(c) => GolosRpcClient::call(c, api, method, args).await?,
        };
        Ok(value)
    }

    pub(crate) async fn gateway_transfer(
        &self,
        signing_key: String,
        from: String,
        to: String,
        amount: String,
        memo: String,
    ) -> Result<serde_json::Value, ChainError> {
        let value = match self {
            RpcTransport::Http(c) => c.transfer(signing_key, from, to, amount, memo).await?,
            RpcTransport::Ws(c) => c.transfer(signing_key, from, to, amount, memo).await?,
        };
        Ok(value)
    }

    pub(crate) async fn gateway_custom_json(
        &self,
        signing_key: String,
        required_auths: Vec<String>,
        required_posting_auths: Vec<String>,
        id: String,
        json: String,
    ) -> Result<serde_json::Value, ChainError> {
        let value = match self {
            RpcTransport::Http(c) => {
                c.custom_json(signing_key, required_auths, required_posting_auths, id, json)
                    .await?
            }
            RpcTransport::Ws(c) => {
                c.custom_json(signing_key, required_auths, required_posting_auths, id, json)
                    .await?
            }
        };
        Ok(value)
    }
}

/// Golos node client speaking the `call` JSON-RPC dialect.
pub struct RpcChainClient {
    transport: RpcTransport,
}

impl RpcChainClient {
    /// Connect to a node. `http(s)://` and `ws(s)://` endpoints are supported.
    pub async fn connect(endpoint: &str) -> Result<Self, ChainError> {
        let transport = RpcTransport::connect(endpoint).await?;
        tracing::debug!(%endpoint, "connected to chain node");
        Ok(Self { transport })
    }

    async fn query<T: DeserializeOwned>(
        &self,
        api: &str,
        method: &'static str,
        args: serde_json::Value,
    ) -> Result<T, ChainError> {
        tracing::trace!(api, method, %args, "rpc call");
        let value = self.transport.golos_call(api, method, args).await?;
        decode(method, value)
    }
}

/// Decode a raw result, mapping shape mismatches to `MalformedResponse`.
fn decode<T: DeserializeOwned>(
    method: &'static str,
    value: serde_json::Value,
) -> Result<T, ChainError> {
    serde_json::from_value(value).map_err(|e| ChainError::MalformedResponse {
        method,
        reason: e.to_string(),
    })
}

#[async_trait]
impl ChainApi for RpcChainClient {
    async fn dynamic_global_properties(&self) -> Result<DynamicGlobalProperties, ChainError> {
        self.query("database_api", "get_dynamic_global_properties", json!([]))
            .await
    }

    async fn accounts(&self, names: &[AccountName]) -> Result<Vec<Account>, ChainError> {
        self.query("database_api", "get_accounts", json!([names]))
            .await
    }

    async fn followers(
        &self,
        account: &str,
        start: &str,
        kind: FollowKind,
        limit: u32,
    ) -> Result<Vec<FollowEntry>, ChainError> {
        self.query(
            "follow",
            "get_followers",
            json!([account, start, kind.as_str(), limit]),
        )
        .await
    }

    async fn account_history(
        &self,
        account: &str,
        from: HistoryCursor,
        limit: u32,
    ) -> Result<Vec<HistoryEntry>, ChainError> {
        self.query(
            "account_history",
            "get_account_history",
            json!([account, from.as_param(), limit]),
        )
        .await
    }
}
