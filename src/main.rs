use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::error;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use consul_acl_sync::cli::Cli;
use consul_acl_sync::config::{Action, AgentConfig, BootstrapConfig, Config, SyncConfig};
use consul_acl_sync::{
    BootstrapExit, ConsulClient, ConsulConfig, FsParameterStore, SyncRunner, TracingSink,
    bootstrap, connect, push_agent_token, sync_exit_code,
};

fn init_tracing(debug: bool) {
    let default_level = if debug { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .init();
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // --help and --version are not failures.
            let code = if e.use_stderr() { 1 } else { 0 };
            let _ = e.print();
            return ExitCode::from(code);
        }
    };
    init_tracing(cli.debug);

    let config = match Config::from_cli(cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };

    let store = FsParameterStore::new(&config.store_dir);
    match config.action {
        Action::Bootstrap(action) => run_bootstrap(&config.consul, &store, &action),
        Action::Sync(action) => run_sync(&config.consul, &store, &action),
        Action::Agent(action) => run_agent(&config.consul, &store, &action),
    }
}

fn run_bootstrap(consul: &ConsulConfig, store: &FsParameterStore, config: &BootstrapConfig) -> ExitCode {
    let client = match ConsulClient::new(consul) {
        Ok(client) => client,
        Err(e) => {
            error!(event = "Bootstrap", "Failed to create Consul client: {e}");
            return ExitCode::FAILURE;
        }
    };

    let result = bootstrap(&client, store, &config.token_param, &config.put_options);
    if let Err(e) = &result {
        error!(event = "Bootstrap", "{e}");
    }
    let exit = BootstrapExit::new(&result, config.hide);
    if let Some(token) = exit.print {
        println!("{token}");
    }
    ExitCode::from(exit.code)
}

fn run_sync(consul: &ConsulConfig, store: &FsParameterStore, config: &SyncConfig) -> ExitCode {
    let client = match connect(consul, store, Some(&config.token_param)) {
        Ok(client) => client,
        Err(e) => {
            error!(event = "Sync", "{e}");
            return ExitCode::FAILURE;
        }
    };
    let runner = SyncRunner::new(&client, store, config.put_options.clone())
        .with_sink(Arc::new(TracingSink));

    let result = match config.recurring {
        Some(interval) => runner
            .run_recurring(&config.options, interval)
            .map(|_| ()),
        None => runner.run_cycle(&config.options).map(drop),
    };
    if let Err(e) = &result {
        error!(event = "Sync", "{e}");
    }
    ExitCode::from(sync_exit_code(&result))
}

fn run_agent(consul: &ConsulConfig, store: &FsParameterStore, config: &AgentConfig) -> ExitCode {
    let result = connect(consul, store, config.management_token_param.as_deref())
        .map_err(|e| e.to_string())
        .and_then(|client| {
            push_agent_token(&client, store, config.slot, &config.token_param)
                .map_err(|e| e.to_string())
        });
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(event = "Agent", "{e}");
            ExitCode::FAILURE
        }
    }
}
