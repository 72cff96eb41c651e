//! Validated configuration, built once from the parsed command line.

use std::path::PathBuf;
use std::time::Duration;

use crate::agent::TokenSlot;
use crate::cli::{AgentArgs, BootstrapArgs, Cli, Command, SyncArgs};
use crate::consul::{ConsulConfig, DEFAULT_ADDRESS};
use crate::error::ConfigError;
use crate::sync::SyncOptions;
use crate::types::PutOptions;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapConfig {
    pub token_param: String,
    pub put_options: PutOptions,
    pub hide: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    /// Parameter holding the management token used for every Consul call.
    pub token_param: String,
    pub options: SyncOptions,
    pub put_options: PutOptions,
    /// `None` runs a single cycle.
    pub recurring: Option<Duration>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentConfig {
    pub slot: TokenSlot,
    pub token_param: String,
    pub management_token_param: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Bootstrap(BootstrapConfig),
    Sync(SyncConfig),
    Agent(AgentConfig),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub debug: bool,
    pub store_dir: PathBuf,
    /// Consul target without a token; connecting adds it.
    pub consul: ConsulConfig,
    pub action: Action,
}

fn required(value: Option<String>, message: &'static str) -> Result<String, ConfigError> {
    value
        .filter(|v| !v.is_empty())
        .ok_or(ConfigError::Missing(message))
}

fn consul_config(address: Option<String>) -> Result<ConsulConfig, ConfigError> {
    let address = address.unwrap_or_else(|| DEFAULT_ADDRESS.to_string());
    let trimmed = address.trim();
    if trimmed.is_empty() || trimmed.chars().any(char::is_whitespace) {
        return Err(ConfigError::InvalidAddress(address));
    }
    Ok(ConsulConfig::new(trimmed))
}

impl TryFrom<BootstrapArgs> for BootstrapConfig {
    type Error = ConfigError;

    fn try_from(args: BootstrapArgs) -> Result<Self, Self::Error> {
        Ok(Self {
            token_param: required(
                args.consul_token_param,
                "SSM parameter name to write Consul bootstrap token ID is required",
            )?,
            put_options: args.put.put_options(),
            hide: args.hide,
        })
    }
}

impl TryFrom<SyncArgs> for SyncConfig {
    type Error = ConfigError;

    fn try_from(args: SyncArgs) -> Result<Self, Self::Error> {
        let token_param = required(
            args.consul_token_param,
            "SSM parameter for Consul management token is required",
        )?;
        let definition_prefix = required(
            args.definition_prefix,
            "SSM prefix is required to read Consul ACL definitions",
        )?;

        let mut options = SyncOptions::new(definition_prefix, args.id_prefix)
            .with_leader_check(args.leader);
        options.page_size = args.page_size.filter(|n| *n > 0);

        Ok(Self {
            token_param,
            options,
            put_options: args.put.put_options(),
            recurring: args
                .recurring
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs),
        })
    }
}

impl From<AgentArgs> for AgentConfig {
    fn from(args: AgentArgs) -> Self {
        Self {
            slot: args.slot,
            token_param: args.token_param,
            management_token_param: args.consul_token_param.filter(|p| !p.is_empty()),
        }
    }
}

impl Config {
    pub fn from_cli(cli: Cli) -> Result<Self, ConfigError> {
        let action = match cli.command {
            Command::Bootstrap(args) => Action::Bootstrap(args.try_into()?),
            Command::Sync(args) => Action::Sync(args.try_into()?),
            Command::Agent(args) => Action::Agent(args.into()),
        };
        Ok(Self {
            debug: cli.debug,
            store_dir: cli.store_dir,
            consul: consul_config(cli.consul_addr)?,
            action,
        })
    }
}
