use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use log::{info, warn};
use plugin_account_types::{selector_from_name, short_string, Call, Felt, Policy, SessionDomain};
use serde_json::{json, Value};
use session_signer::{
    build_invoke, issue_session,
    types::{CallConfig, SessionBundle, SessionConfig, SignedTransaction},
    DirectKeySigner, EcdsaKeyPair, IssuedSession, PluginSigner, SessionKeySigner,
};
use time::{format_description::well_known::Rfc3339, OffsetDateTime};

/// Issue session tokens and sign transactions for a plugin account.
///
/// Secret keys are 32-byte hex strings, read from `--key-path` or the `OWNER_KEY` /
/// `SESSION_KEY` environment variables.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// File holding the hex secret key for the command (overrides the environment).
    #[arg(long, global = true)]
    key_path: Option<PathBuf>,

    /// Owner secret key (hex).
    #[arg(long, env = "OWNER_KEY", hide_env_values = true, global = true)]
    owner_key: Option<String>,

    /// Session secret key (hex).
    #[arg(long, env = "SESSION_KEY", hide_env_values = true, global = true)]
    session_key: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the selector felt of an entry point name.
    Selector { name: String },

    /// Issue a session token from a JSON session config, signed with the owner key.
    Issue {
        #[arg(long)]
        config: PathBuf,

        /// Where to write the session bundle; printed to stdout when omitted.
        #[arg(long)]
        out: Option<PathBuf>,

        /// Expire this many seconds from now instead of at the config's `expires_at`.
        #[arg(long)]
        expires_in: Option<u64>,
    },

    /// Sign a batch of calls and print the transaction as JSON.
    Sign {
        /// JSON array of `{ to, selector, calldata }`.
        #[arg(long)]
        calls: PathBuf,

        #[arg(long, value_parser = parse_felt)]
        account: Felt,

        #[arg(long, value_parser = parse_felt)]
        nonce: Felt,

        /// Installed plugin that validates the signature.
        #[arg(long, value_parser = parse_felt)]
        plugin: Felt,

        /// Session bundle from `issue`; signs with the session key when given.
        #[arg(long)]
        session: Option<PathBuf>,

        #[arg(long, value_parser = parse_felt, default_value = "0")]
        max_fee: Felt,

        #[arg(long, default_value = "SN_GOERLI")]
        chain_id: String,
    },
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    match &cli.command {
        Command::Selector { name } => {
            println!("{:#x}", selector_from_name(name));
        },
        Command::Issue { config, out, expires_in } => {
            let owner = load_key(&cli, cli.owner_key.as_deref(), "OWNER_KEY")?;
            let bundle = issue(&owner, config, *expires_in)?;
            let value = with_issued_at(serde_json::to_value(&bundle)?);
            match out {
                Some(path) => {
                    write_json_atomic(path, &value)?;
                    info!("wrote session bundle to {}", path.display());
                },
                None => println!("{}", serde_json::to_string_pretty(&value)?),
            }
        },
        Command::Sign {
            calls,
            account,
            nonce,
            plugin,
            session,
            max_fee,
            chain_id,
        } => {
            let chain_id = parse_chain_id(chain_id)?;
            let calls = load_calls(calls)?;
            let signer: Box<dyn PluginSigner> = match session {
                Some(path) => {
                    let key = load_key(&cli, cli.session_key.as_deref(), "SESSION_KEY")?;
                    let bundle: SessionBundle = read_json(path)?;
                    if bundle.account != *account || bundle.chain_id != chain_id {
                        bail!("session bundle was issued for a different account or chain");
                    }
                    let issued = IssuedSession::from_bundle(&bundle)?;
                    if issued.token.session_key != key.public_key() {
                        bail!("session key does not match the key in the bundle");
                    }
                    Box::new(SessionKeySigner::new(*plugin, key, issued))
                },
                None => {
                    let key = load_key(&cli, cli.owner_key.as_deref(), "OWNER_KEY")?;
                    Box::new(DirectKeySigner::new(*plugin, key))
                },
            };

            let tx = build_invoke(signer.as_ref(), *account, &calls, *nonce, *max_fee, chain_id)?;
            let signed = SignedTransaction {
                transaction_hash: tx.hash(chain_id),
                sender: tx.sender,
                calldata: tx.calldata,
                signature: tx.signature,
                max_fee: tx.max_fee,
                nonce: tx.nonce,
                version: tx.version,
            };
            println!("{}", serde_json::to_string_pretty(&signed)?);
        },
    }
    Ok(())
}

fn issue(owner: &EcdsaKeyPair, config_path: &Path, expires_in: Option<u64>) -> Result<SessionBundle> {
    let mut config: SessionConfig = read_json(config_path)?;
    let domain = SessionDomain::new(parse_chain_id(&config.chain_id)?, config.account);
    let policies = config
        .policies
        .iter()
        .map(|p| Policy::new(p.contract_address, selector_from_name(&p.selector)))
        .collect();

    let now = OffsetDateTime::now_utc().unix_timestamp();
    if let Some(seconds) = expires_in {
        config.expires_at = u64::try_from(now)
            .ok()
            .and_then(|now| now.checked_add(seconds))
            .ok_or_else(|| anyhow!("--expires-in {seconds} overflows the expiry timestamp"))?;
    }
    if i64::try_from(config.expires_at).map_or(false, |expires_at| expires_at <= now) {
        warn!("session expires at {} which is already in the past", config.expires_at);
    }

    let issued = issue_session(owner, &domain, config.session_key, config.expires_at, policies)?;
    Ok(issued.to_bundle(&domain))
}

fn load_calls(path: &Path) -> Result<Vec<Call>> {
    let calls: Vec<CallConfig> = read_json(path)?;
    Ok(calls
        .into_iter()
        .map(|c| Call::new(c.to, selector_from_name(&c.selector), c.calldata))
        .collect())
}

/// `--key-path` wins over the environment variable.
fn load_key(cli: &Cli, from_env: Option<&str>, var: &str) -> Result<EcdsaKeyPair> {
    let raw = match &cli.key_path {
        Some(path) => fs::read_to_string(path).with_context(|| format!("failed reading {}", path.display()))?,
        None => from_env
            .map(str::to_string)
            .ok_or_else(|| anyhow!("missing key: provide --key-path or set {var}"))?,
    };
    let trimmed = raw.trim();
    let bytes = hex::decode(trimmed.strip_prefix("0x").unwrap_or(trimmed)).context("secret key is not hex")?;
    Ok(EcdsaKeyPair::from_bytes(&bytes)?)
}

fn parse_felt(s: &str) -> Result<Felt, String> {
    Felt::from_str(s).map_err(|e| format!("invalid felt `{s}`: {e}"))
}

/// Short-string chain names (`SN_GOERLI`) or raw felts (`0x...`).
fn parse_chain_id(s: &str) -> Result<Felt> {
    if s.starts_with("0x") {
        return parse_felt(s).map_err(|e| anyhow!(e));
    }
    short_string(s).ok_or_else(|| anyhow!("chain id `{s}` is not a short string"))
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = fs::read_to_string(path).with_context(|| format!("failed reading {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("failed parsing JSON in {}", path.display()))
}

fn with_issued_at(mut value: Value) -> Value {
    let now = OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_else(|_| "unknown".to_string());
    if value.is_object() {
        value["issued_at"] = json!(now);
    }
    value
}

fn write_json_atomic(path: &Path, value: &Value) -> Result<()> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    if !parent.as_os_str().is_empty() && !parent.exists() {
        fs::create_dir_all(parent).with_context(|| format!("failed creating directory {}", parent.display()))?;
    }

    let serialised = serde_json::to_string_pretty(value).context("failed serialising JSON")?;
    let tmp_path = tmp_path_for(path);
    fs::write(&tmp_path, serialised.as_bytes())
        .with_context(|| format!("failed writing temp file {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("failed replacing {}", path.display()))?;
    Ok(())
}

fn tmp_path_for(path: &Path) -> PathBuf {
    let mut tmp = path.as_os_str().to_os_string();
    tmp.push(".tmp");
    PathBuf::from(tmp)
}
