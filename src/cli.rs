//! Command-line surface. Every flag can also be set through an `SSM_*`
//! environment variable named after it.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::agent::TokenSlot;
use crate::types::PutOptions;

/// Bootstrap and manage Consul ACLs through a parameter store
#[derive(Parser, Debug)]
#[command(name = "consul-acl-sync")]
#[command(version)]
pub struct Cli {
    /// Enable debug logging
    #[arg(long, global = true, env = "SSM_DEBUG")]
    pub debug: bool,

    /// Directory holding the parameter store
    #[arg(long, global = true, env = "SSM_STORE_DIR", default_value = "parameters")]
    pub store_dir: PathBuf,

    /// Consul agent address, `host:port` or URL
    #[arg(long, global = true, env = "CONSUL_HTTP_ADDR")]
    pub consul_addr: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Bootstrap Consul ACLs and save the token to a parameter
    Bootstrap(BootstrapArgs),
    /// Synchronize Consul ACLs from definition parameters
    Sync(SyncArgs),
    /// Update a Consul agent token from a parameter
    Agent(AgentArgs),
}

/// How new parameters are written.
#[derive(Args, Debug, Clone, Default)]
pub struct PutArgs {
    /// Optional KMS key ID recorded for encrypted parameters
    #[arg(short = 'k', long, env = "SSM_KMS_KEY_ID")]
    pub kms_key_id: Option<String>,

    /// Write parameters unencrypted
    #[arg(short = 'I', long, env = "SSM_INSECURE")]
    pub insecure: bool,

    /// Overwrite existing parameter values
    #[arg(short = 'o', long, env = "SSM_OVERWRITE")]
    pub overwrite: bool,
}

impl PutArgs {
    pub fn put_options(&self) -> PutOptions {
        PutOptions::from_flags(self.insecure, self.kms_key_id.clone(), self.overwrite)
    }
}

#[derive(Args, Debug, Clone)]
pub struct BootstrapArgs {
    /// Parameter name to write the bootstrap token to (required)
    #[arg(short = 'm', long, env = "SSM_CONSUL_TOKEN_PARAM")]
    pub consul_token_param: Option<String>,

    /// Do not print the bootstrap token
    #[arg(long, env = "SSM_HIDE")]
    pub hide: bool,

    #[command(flatten)]
    pub put: PutArgs,
}

#[derive(Args, Debug, Clone)]
pub struct SyncArgs {
    /// Prefix to read ACL definitions from (required)
    #[arg(short = 'd', long, env = "SSM_DEFINITION_PREFIX")]
    pub definition_prefix: Option<String>,

    /// Prefix to read and write ACL token IDs
    #[arg(short = 'i', long, env = "SSM_ID_PREFIX", default_value = "")]
    pub id_prefix: String,

    /// Parameter holding the Consul management token (required)
    #[arg(short = 'm', long, env = "SSM_CONSUL_TOKEN_PARAM")]
    pub consul_token_param: Option<String>,

    /// Maximum results per listing request
    #[arg(short = 'p', long, env = "SSM_PAGE_SIZE")]
    pub page_size: Option<usize>,

    /// Manage ACLs only if the Consul agent is the current leader
    #[arg(short = 'l', long, env = "SSM_LEADER")]
    pub leader: bool,

    /// Repeat, waiting this many seconds between syncs
    #[arg(short = 'r', long, env = "SSM_RECURRING", value_name = "SECS")]
    pub recurring: Option<u64>,

    #[command(flatten)]
    pub put: PutArgs,
}

#[derive(Args, Debug, Clone)]
pub struct AgentArgs {
    /// Agent token slot to set
    pub slot: TokenSlot,

    /// Parameter holding the token to install
    pub token_param: String,

    /// Parameter holding the Consul management token
    #[arg(short = 'm', long, env = "SSM_CONSUL_TOKEN_PARAM")]
    pub consul_token_param: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use clap::error::ErrorKind;
    use yare::parameterized;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("consul-acl-sync").chain(args.iter().copied()))
            .unwrap()
    }

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_sync() {
        let cli = parse(&[
            "--store-dir", "/var/lib/params",
            "sync", "-d", "/consul/acl/definitions", "-i", "/consul/acl/ids",
            "-m", "/consul/token", "-p", "5", "-l", "-r", "30", "-I", "-o",
        ]);

        assert_eq!(cli.store_dir, PathBuf::from("/var/lib/params"));
        let Command::Sync(args) = cli.command else {
            panic!("expected sync");
        };
        assert_eq!(args.definition_prefix.as_deref(), Some("/consul/acl/definitions"));
        assert_eq!(args.id_prefix, "/consul/acl/ids");
        assert_eq!(args.consul_token_param.as_deref(), Some("/consul/token"));
        assert_eq!(args.page_size, Some(5));
        assert!(args.leader);
        assert_eq!(args.recurring, Some(30));
        assert_eq!(args.put.put_options(), PutOptions::from_flags(true, None, true));
    }

    #[test]
    fn test_parse_bootstrap() {
        let cli = parse(&["bootstrap", "-m", "/consul/token", "-k", "alias/consul", "--hide", "--debug"]);

        assert!(cli.debug);
        let Command::Bootstrap(args) = cli.command else {
            panic!("expected bootstrap");
        };
        assert!(args.hide);
        let options = args.put.put_options();
        assert!(options.secure);
        assert_eq!(options.key_id.as_deref(), Some("alias/consul"));
        assert!(!options.overwrite);
    }

    #[parameterized(
        acl_token = { "acl_token", TokenSlot::AclToken },
        replication = { "acl_replication_token", TokenSlot::AclReplicationToken },
    )]
    fn test_parse_agent(slot: &str, expected: TokenSlot) {
        let cli = parse(&["agent", slot, "/consul/agent-token", "-m", "/consul/token"]);
        let Command::Agent(args) = cli.command else {
            panic!("expected agent");
        };
        assert_eq!(args.slot, expected);
        assert_eq!(args.token_param, "/consul/agent-token");
        assert_eq!(args.consul_token_param.as_deref(), Some("/consul/token"));
    }

    #[test]
    fn test_parse_rejects_unknown_slot() {
        let err = Cli::try_parse_from(["consul-acl-sync", "agent", "acl_master_token", "/p"])
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValueValidation);
    }

    #[test]
    fn test_parse_rejects_bad_page_size() {
        let err = Cli::try_parse_from(["consul-acl-sync", "sync", "-p", "many"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValueValidation);
    }
}
