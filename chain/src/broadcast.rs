use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::client::RpcTransport;
use crate::types::*;

/// Whether side effects are sent to the chain or only planned and logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BroadcastMode {
    DryRun,
    Live,
}

impl BroadcastMode {
    pub fn from_flag(broadcast: bool) -> Self {
        if broadcast {
            BroadcastMode::Live
        } else {
            BroadcastMode::DryRun
        }
    }

    pub fn is_live(&self) -> bool {
        matches!(self, BroadcastMode::Live)
    }
}

/// A funds transfer to be signed and broadcast.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferOperation {
    pub from: AccountName,
    pub to: AccountName,
    pub amount: Asset,
    pub memo: String,
}

/// A structured custom-data operation to be signed and broadcast.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomDataOperation {
    pub required_auths: Vec<AccountName>,
    pub required_posting_auths: Vec<AccountName>,
    pub id: String,
    pub json: String,
}

/// Fund-moving and data-writing side effects.
#[async_trait]
pub trait Broadcaster: Send + Sync {
    async fn transfer(&self, op: &TransferOperation) -> Result<(), ChainError>;

    async fn custom_json(&self, op: &CustomDataOperation) -> Result<(), ChainError>;
}

/// Broadcasts through a signing gateway that owns transaction assembly,
/// signing and submission. The key travels with every request.
pub struct GatewayBroadcaster {
    signing_key: SigningKey,
    transport: RpcTransport,
}

impl GatewayBroadcaster {
    pub async fn connect(endpoint: &str, signing_key: SigningKey) -> Result<Self, ChainError> {
        let transport = RpcTransport::connect(endpoint).await?;
        tracing::debug!(%endpoint, "connected to signing gateway");
        Ok(Self {
            signing_key,
            transport,
        })
    }
}

fn rejected(err: ChainError) -> ChainError {
    match err {
        ChainError::Rpc { message, .. } => ChainError::Broadcast(message),
        other => other,
    }
}

#[async_trait]
impl Broadcaster for GatewayBroadcaster {
    async fn transfer(&self, op: &TransferOperation) -> Result<(), ChainError> {
        let result = self
            .transport
            .gateway_transfer(
                self.signing_key.expose().to_string(),
                op.from.clone(),
                op.to.clone(),
                op.amount.to_string(),
                op.memo.clone(),
            )
            .await
            .map_err(rejected)?;
        tracing::trace!(to = %op.to, %result, "transfer accepted");
        Ok(())
    }

    async fn custom_json(&self, op: &CustomDataOperation) -> Result<(), ChainError> {
        let result = self
            .transport
            .gateway_custom_json(
                self.signing_key.expose().to_string(),
                op.required_auths.clone(),
                op.required_posting_auths.clone(),
                op.id.clone(),
                op.json.clone(),
            )
            .await
            .map_err(rejected)?;
        tracing::trace!(id = %op.id, %result, "custom_json accepted");
        Ok(())
    }
}

/// Stand-in used in dry-run mode, where nothing may be broadcast.
/// Every call fails.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledBroadcaster;

#[async_trait]
impl Broadcaster for DisabledBroadcaster {
    async fn transfer(&self, op: &TransferOperation) -> Result<(), ChainError> {
        Err(ChainError::Broadcast(format!(
            "broadcasting is disabled, transfer to {} not sent",
            op.to
        )))
    }

    async fn custom_json(&self, op: &CustomDataOperation) -> Result<(), ChainError> {
        Err(ChainError::Broadcast(format!(
            "broadcasting is disabled, custom_json {} not sent",
            op.id
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gateway_rpc_errors_become_broadcast_rejections() {
        let err = rejected(ChainError::Rpc {
            code: -32000,
            message: "missing required active authority".to_string(),
        });
        assert_eq!(
            err,
            ChainError::Broadcast("missing required active authority".to_string())
        );

        let transport = rejected(ChainError::Transport("closed".to_string()));
        assert_eq!(transport, ChainError::Transport("closed".to_string()));
    }

    #[tokio::test]
    async fn disabled_broadcaster_refuses_everything() {
        let op = TransferOperation {
            from: "a".to_string(),
            to: "b".to_string(),
            amount: Asset::zero("GBG"),
            memo: String::new(),
        };
        assert!(matches!(
            DisabledBroadcaster.transfer(&op).await,
            Err(ChainError::Broadcast(_))
        ));
    }

    #[tokio::test]
    async fn connect_rejects_unknown_scheme() {
        let result = GatewayBroadcaster::connect("ftp://gateway", SigningKey::new("k")).await;
        assert!(matches!(result, Err(ChainError::InvalidEndpoint(_))));
    }
}
