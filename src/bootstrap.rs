//! One-shot ACL bootstrap of a fresh cluster.

use tracing::{error, info};

use crate::error::BootstrapError;
use crate::traits::{AgentApi, ParameterStore};
use crate::types::PutOptions;

/// What the command line reports for a bootstrap result.
#[derive(Debug, PartialEq, Eq)]
pub struct BootstrapExit<'a> {
    /// Token to write to stdout.
    pub print: Option<&'a str>,
    pub code: u8,
}

impl<'a> BootstrapExit<'a> {
    /// The token is shown unless `hide` is set, and always shown when it
    /// could not be stored.
    pub fn new(result: &'a Result<String, BootstrapError>, hide: bool) -> Self {
        match result {
            Ok(token) => Self {
                print: (!hide).then_some(token.as_str()),
                code: 0,
            },
            Err(err) => Self {
                print: err.token(),
                code: err.exit_code(),
            },
        }
    }
}

/// Bootstrap the cluster's ACL system and store the management token at
/// `token_param`.
///
/// If the store rejects the write, the token is only available through
/// [`BootstrapError::token`]; the cluster will not issue it again.
pub fn bootstrap<A, S>(
    agent: &A,
    store: &S,
    token_param: &str,
    options: &PutOptions,
) -> Result<String, BootstrapError>
where
    A: AgentApi + ?Sized,
    S: ParameterStore + ?Sized,
{
    if token_param.is_empty() {
        return Err(BootstrapError::MissingParameter);
    }

    let token = agent.bootstrap().map_err(BootstrapError::Request)?;
    info!(event = "Bootstrap", phase = "Request", "Bootstrapped Consul ACLs");

    if let Err(source) = store.put(token_param, &token, options) {
        error!(
            event = "Bootstrap",
            phase = "Persist",
            param = token_param,
            "Failed to save bootstrap token: {source}"
        );
        return Err(BootstrapError::Persist {
            token,
            param: token_param.to_string(),
            source,
        });
    }

    info!(
        event = "Bootstrap",
        phase = "Persist",
        param = token_param,
        secure = options.secure,
        "Saved bootstrap token"
    );
    Ok(token)
}
