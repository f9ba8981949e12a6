//! kiwi-connect CLI - inspect local identities and connector selection
//!
//!   kiwi-connect keys                          → stored local identity addresses
//!   kiwi-connect identity [--preferred <addr>] → resolved local identity
//!   kiwi-connect active                        → active-identity cookie pointer
//!   kiwi-connect current [--connected <addr>]  → current address and its source
//!   kiwi-connect eligible <addr> --allowlist <file> [--delegations <file>]
//!   kiwi-connect connectors [--env native|browser] [--mobile] [--rainbow]
//!
//! Stores live under `$KIWI_ROOT/<app>/data` (`keys.json`, `cookies.json`).
//!
//! Output format:
//!   --json     Output raw JSON (default for non-tty)
//!   --pretty   Pretty-print JSON (default for tty)

use anyhow::{anyhow, Context, Result};
use kiwi_connect::logging::init_logging;
use kiwi_connect::registry::plan;
use kiwi_connect::{
    current_address, eligible, Address, Allowlist, ClientConfig, Delegations, Device, Environment, FileCookieJar,
    FileKeyStore, LocalAccounts,
};
use serde_json::{json, Value};
use std::env;
use std::io::IsTerminal;
use std::sync::Arc;
use tracing::debug;

fn main() {
    init_logging();

    let args: Vec<String> = env::args().collect();
    let opts = ParsedArgs::parse(&args[1..]);

    if opts.help {
        print_usage();
        return;
    }

    if opts.version {
        println!("kiwi-connect {}", env!("CARGO_PKG_VERSION"));
        return;
    }

    let config = opts.config();
    debug!(app = %config.app, environment = config.environment.as_str(), "configuration loaded");

    let result = match opts.command.as_deref() {
        Some("keys") => cmd_keys(&config),
        Some("identity") => cmd_identity(&config, &opts),
        Some("active") => cmd_active(&config),
        Some("current") => cmd_current(&config, &opts),
        Some("eligible") => cmd_eligible(&opts),
        Some("connectors") => cmd_connectors(&config, &opts),
        Some(cmd) => Err(anyhow!("Unknown command: {}", cmd)),
        None => {
            print_usage();
            return;
        }
    };

    let pretty = opts.pretty || (!opts.json && std::io::stdout().is_terminal());
    match result {
        Ok(output) => println!("{}", render(&output, pretty)),
        Err(e) => {
            eprintln!("{}", render(&json!({"error": format!("{:#}", e)}), pretty));
            std::process::exit(1);
        }
    }
}

fn render(value: &Value, pretty: bool) -> String {
    let rendered = if pretty { serde_json::to_string_pretty(value) } else { serde_json::to_string(value) };
    rendered.unwrap_or_else(|_| value.to_string())
}

#[derive(Default)]
struct ParsedArgs {
    command: Option<String>,
    target: Option<String>,
    app: Option<String>,
    root: Option<String>,
    preferred: Option<String>,
    connected: Option<String>,
    allowlist: Option<String>,
    delegations: Option<String>,
    environment: Option<String>,
    mobile: bool,
    rainbow: bool,
    json: bool,
    pretty: bool,
    help: bool,
    version: bool,
}

impl ParsedArgs {
    fn parse(args: &[String]) -> Self {
        // Load .env file if present
        if let Ok(contents) = std::fs::read_to_string(".env") {
            for line in contents.lines() {
                let line = line.trim();
                if line.is_empty() || line.starts_with('#') {
                    continue;
                }
                if let Some((key, value)) = line.split_once('=') {
                    let value = value.trim().trim_matches('"');
                    if !value.is_empty() && env::var(key.trim()).is_err() {
                        env::set_var(key.trim(), value);
                    }
                }
            }
        }

        let mut opts = ParsedArgs::default();
        let mut positional = Vec::new();
        let mut i = 0;

        while i < args.len() {
            let arg = &args[i];
            let value = args.get(i + 1).cloned();
            match arg.as_str() {
                "--help" | "-h" => opts.help = true,
                "--version" | "-V" => opts.version = true,
                "--json" => opts.json = true,
                "--pretty" => opts.pretty = true,
                "--mobile" => opts.mobile = true,
                "--rainbow" => opts.rainbow = true,
                "--native" => opts.environment = Some("native".into()),
                "--app" | "-a" | "--root" | "--preferred" | "--connected" | "--allowlist" | "--delegations"
                | "--env" => {
                    let slot = match arg.as_str() {
                        "--app" | "-a" => &mut opts.app,
                        "--root" => &mut opts.root,
                        "--preferred" => &mut opts.preferred,
                        "--connected" => &mut opts.connected,
                        "--allowlist" => &mut opts.allowlist,
                        "--delegations" => &mut opts.delegations,
                        _ => &mut opts.environment,
                    };
                    if value.is_some() {
                        *slot = value;
                        i += 1;
                    }
                }
                _ if !arg.starts_with('-') => positional.push(arg.clone()),
                _ => {} // Ignore unknown flags
            }
            i += 1;
        }

        let mut positional = positional.into_iter();
        opts.command = positional.next();
        opts.target = positional.next();
        opts
    }

    /// Environment variables first, CLI flags override.
    fn config(&self) -> ClientConfig {
        let mut config = ClientConfig::from_env();
        if let Some(app) = &self.app {
            config.app = app.clone();
        }
        if let Some(root) = &self.root {
            config.data_root = Some(root.into());
        }
        match self.environment.as_deref().map(str::parse::<Environment>) {
            Some(Ok(env)) => config.environment = env,
            Some(Err(e)) => tracing::warn!("ignoring --env: {}", e),
            None => {}
        }
        if self.mobile {
            config.device = Device::mobile();
        }
        config
    }
}

fn print_usage() {
    println!(
        r#"kiwi-connect - wallet connectors and local identity

USAGE:
    kiwi-connect <command> [target] [options]

COMMANDS:
    keys                        List stored local identity addresses
    identity                    Resolve the local identity
    active                      Show the active-identity cookie pointer
    current                     Resolve the current address
    eligible <address>          Check allowlist / delegation eligibility
    connectors                  Show which wallets would be offered

OPTIONS:
    --app, -a <name>            Application name (env: KIWI_APP)
    --root <path>               Data root (env: KIWI_ROOT)
    --preferred <address>       Disambiguate between local identities
    --connected <address>       Externally connected account
    --allowlist <file>          JSON array of allowed addresses
    --delegations <file>        JSON object delegate → identity
    --env <native|browser>      Environment (env: KIWI_ENV)
    --native                    Same as --env native
    --mobile                    Treat the device as a touch phone
    --rainbow                   Injected provider is Rainbow

OUTPUT OPTIONS:
    --json                      Raw JSON output
    --pretty                    Pretty-print JSON
    --version, -V               Print version

EXAMPLES:
    kiwi-connect identity --preferred 0xAbC...
    kiwi-connect current --connected 0x123... --json | jq .address
    kiwi-connect eligible 0x123... --allowlist allowlist.json --delegations delegations.json
"#
    );
}

fn local_accounts(config: &ClientConfig) -> LocalAccounts {
    let dir = config.data_dir();
    LocalAccounts::new(
        Arc::new(FileKeyStore::open(dir.join("keys.json"))),
        Arc::new(FileCookieJar::open(dir.join("cookies.json"))),
    )
    .with_cookie_max_age(config.cookie_max_age)
}

fn parse_address(raw: &str) -> Result<Address> {
    raw.parse().with_context(|| format!("invalid address {}", raw))
}

fn optional_address(raw: Option<&str>) -> Result<Option<Address>> {
    raw.map(parse_address).transpose()
}

fn cmd_keys(config: &ClientConfig) -> Result<Value> {
    let keys = local_accounts(config).scan()?;
    Ok(json!({
        "addresses": keys.addresses().collect::<Vec<_>>(),
        "conflicts": keys.conflicts().collect::<Vec<_>>(),
        "count": keys.len(),
    }))
}

fn cmd_identity(config: &ClientConfig, opts: &ParsedArgs) -> Result<Value> {
    let preferred = optional_address(opts.preferred.as_deref())?;
    let identity = local_accounts(config).resolve(preferred.as_ref())?;
    Ok(json!({"identity": identity.map(|i| i.address)}))
}

fn cmd_active(config: &ClientConfig) -> Result<Value> {
    Ok(json!({"active": local_accounts(config).active()?}))
}

fn cmd_current(config: &ClientConfig, opts: &ParsedArgs) -> Result<Value> {
    let local = local_accounts(config);
    let connected = optional_address(opts.connected.as_deref())?;
    let preferred = match connected {
        Some(address) => Some(address),
        None => local.active()?,
    };
    let identity = local.resolve(preferred.as_ref())?;
    let address = current_address(connected.as_ref(), identity.as_ref());
    let source = if connected.is_some() {
        Some("connected")
    } else if identity.is_some() {
        Some("local")
    } else {
        None
    };
    Ok(json!({"address": address, "source": source}))
}

fn read_json<T: serde::de::DeserializeOwned>(path: &str) -> Result<T> {
    let raw = std::fs::read_to_string(path).with_context(|| format!("reading {}", path))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing {}", path))
}

fn cmd_eligible(opts: &ParsedArgs) -> Result<Value> {
    let address = optional_address(opts.target.as_deref())?;
    let allowlist: Allowlist = match &opts.allowlist {
        Some(path) => read_json(path)?,
        None => return Err(anyhow!("--allowlist <file> is required")),
    };
    let delegations: Delegations = match &opts.delegations {
        Some(path) => read_json(path)?,
        None => Delegations::new(),
    };
    let identity = eligible(&allowlist, &delegations, address.as_ref());
    Ok(json!({"address": address, "eligible": identity.is_some(), "identity": identity}))
}

fn cmd_connectors(config: &ClientConfig, opts: &ParsedArgs) -> Result<Value> {
    let wallets = plan(config, opts.rainbow);
    Ok(json!({
        "environment": config.environment.as_str(),
        "desktop": config.device.is_desktop(),
        "wallets": wallets,
    }))
}
