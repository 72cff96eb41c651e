//! Pushing stored tokens into the local agent's token slots.

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};
use tracing::info;

use crate::error::AgentError;
use crate::traits::{AgentApi, ParameterStore};

/// Token slots of a running Consul agent.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
    EnumIter,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TokenSlot {
    AclToken,
    AclAgentToken,
    AclAgentMasterToken,
    AclReplicationToken,
}

impl TokenSlot {
    /// Path below `/v1/agent/token/` for this slot.
    pub fn endpoint(&self) -> &'static str {
        match self {
            TokenSlot::AclToken => "acl_token",
            TokenSlot::AclAgentToken => "acl_agent_token",
            TokenSlot::AclAgentMasterToken => "acl_agent_master_token",
            TokenSlot::AclReplicationToken => "acl_replication_token",
        }
    }
}

/// Read the token stored at `token_param` and install it in `slot`.
pub fn push_agent_token<A, S>(
    agent: &A,
    store: &S,
    slot: TokenSlot,
    token_param: &str,
) -> Result<(), AgentError>
where
    A: AgentApi + ?Sized,
    S: ParameterStore + ?Sized,
{
    let token = store
        .get(token_param, true)
        .map_err(|source| AgentError::TokenRead {
            param: token_param.to_string(),
            source,
        })?;

    agent
        .update_agent_token(slot, &token)
        .map_err(|source| AgentError::Push {
            slot: slot.to_string(),
            source,
        })?;

    info!(event = "Agent", slot = slot.as_ref(), param = token_param, "Updated agent token");
    Ok(())
}
