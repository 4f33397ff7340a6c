//! G2O Verify - check Akamai Ghost-to-Origin signatures from the command line.
//!
//! Useful for confirming that an origin's nonce/secret configuration matches
//! what the edge is sending, or for producing signatures in test setups.
//!
//! # Usage
//!
//! ```text
//! G2O_NONCE_SECRETS=v1:s3cr3tk3y g2o-verify validate <path> <data-header> <signature>
//! g2o-verify sign <path> <data-header> <secret>
//! ```
//!
//! `validate` prints the outcome as JSON and exits with status 1 when the
//! request is not authenticated.
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `G2O_NONCE_SECRETS` | *(unset)* | `key1:secret1,key2:secret2` |
//! | `G2O_TIME_WINDOW` | `30000` | Time window, `0` disables the check |
//! | `LOG_LEVEL` | `info` | Log level filter |
//! | `RUST_LOG` | *(unset)* | Fine-grained tracing filter (overrides `LOG_LEVEL`) |

use anyhow::{Context, Result, bail};
use g2o_auth::{AuthData, Validator, ValidatorConfig, sign};
use tracing::info;
use tracing_subscriber::EnvFilter;

const USAGE: &str = "usage:
  g2o-verify validate <path> <data-header> <signature>
  g2o-verify sign <path> <data-header> <secret>";

/// A parsed command line.
#[derive(Debug, PartialEq, Eq)]
enum Command {
    Validate {
        path: String,
        data: String,
        signature: String,
    },
    Sign {
        path: String,
        data: String,
        secret: String,
    },
}

impl Command {
    fn parse(args: &[String]) -> Result<Self> {
        match args {
            [cmd, path, data, signature] if cmd == "validate" => Ok(Self::Validate {
                path: path.clone(),
                data: data.clone(),
                signature: signature.clone(),
            }),
            [cmd, path, data, secret] if cmd == "sign" => Ok(Self::Sign {
                path: path.clone(),
                data: data.clone(),
                secret: secret.clone(),
            }),
            _ => bail!("{USAGE}"),
        }
    }
}

/// Initialize the tracing subscriber.
///
/// Uses `RUST_LOG` if set, otherwise falls back to the `LOG_LEVEL` config value.
fn init_tracing(log_level: &str) -> Result<()> {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::try_new(log_level)
            .with_context(|| format!("invalid log level filter: {log_level}"))?
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    Ok(())
}

/// Validate one request and return whether it was authenticated.
fn run_validate(config: &ValidatorConfig, path: &str, data: &str, signature: &str) -> Result<bool> {
    let validator = Validator::from_config(config).context("cannot build G2O validator")?;

    info!(
        time_window = validator.time_window(),
        replay_ttl_secs = config.replay_ttl_secs,
        "validating G2O request",
    );

    let outcome = validator.validate(path, data, signature);
    println!("{}", serde_json::to_string(&outcome)?);
    Ok(outcome.is_authenticated())
}

/// Compute the signature the edge would send.
fn run_sign(path: &str, data: &str, secret: &str) -> Result<String> {
    let parsed = AuthData::parse(path, data).context("cannot parse data header")?;
    let signature = sign(&parsed.with_secret(secret)).context("cannot sign data header")?;
    Ok(signature)
}

fn main() -> Result<()> {
    let config = ValidatorConfig::from_env();
    init_tracing(&config.log_level)?;

    let args: Vec<String> = std::env::args().skip(1).collect();
    match Command::parse(&args)? {
        Command::Validate {
            path,
            data,
            signature,
        } => {
            if !run_validate(&config, &path, &data, &signature)? {
                std::process::exit(1);
            }
        }
        Command::Sign { path, data, secret } => {
            println!("{}", run_sign(&path, &data, &secret)?);
        }
    }

    Ok(())
}
