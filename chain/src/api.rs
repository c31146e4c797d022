use async_trait::async_trait;
use jsonrpsee::core::RpcResult;
use jsonrpsee::proc_macros::rpc;

use crate::types::*;

/// Read-only chain queries the reward pipeline depends on.
///
/// Every method is a suspension point; implementations must not retry on
/// their own, so callers keep control over request volume.
#[async_trait]
pub trait ChainApi: Send + Sync {
    /// Head block properties; only the server time is consumed.
    async fn dynamic_global_properties(&self) -> Result<DynamicGlobalProperties, ChainError>;

    /// Look up account objects by name. Unknown names are silently absent.
    async fn accounts(&self, names: &[AccountName]) -> Result<Vec<Account>, ChainError>;

    /// One page of followers of `account`, starting at follower `start`
    /// (inclusive, empty string for the first page).
    async fn followers(
        &self,
        account: &str,
        start: &str,
        kind: FollowKind,
        limit: u32,
    ) -> Result<Vec<FollowEntry>, ChainError>;

    /// Account history ending at `from`, reading `limit` records back.
    async fn account_history(
        &self,
        account: &str,
        from: HistoryCursor,
        limit: u32,
    ) -> Result<Vec<HistoryEntry>, ChainError>;
}

/// Golos node JSON-RPC surface.
///
/// Golos routes everything through a single `call` method whose parameters
/// are `[plugin api, method, args]`.
#[rpc(client)]
pub trait GolosRpc {
    #[method(name = "call")]
    async fn call(
        &self,
        api: String,
        method: String,
        args: serde_json::Value,
    ) -> RpcResult<serde_json::Value>;
}

/// Signing gateway JSON-RPC surface. The gateway holds the transaction
/// serialization and signing logic and broadcasts on our behalf.
#[rpc(client)]
pub trait SigningGatewayRpc {
    #[method(name = "transfer")]
    async fn transfer(
        &self,
        signing_key: String,
        from: String,
        to: String,
        amount: String,
        memo: String,
    ) -> RpcResult<serde_json::Value>;

    #[method(name = "custom_json")]
    async fn custom_json(
        &self,
        signing_key: String,
        required_auths: Vec<String>,
        required_posting_auths: Vec<String>,
        id: String,
        json: String,
    ) -> RpcResult<serde_json::Value>;
}
