//! Beeseed CLI - operator front-end over the vault
//!
//!   beeseed init [--mnemonic <words>]   → Create (or import) the root mnemonic
//!   beeseed address                     → Allocate the next account address
//!   beeseed address --index <n>         → Re-derive the address of account n
//!   beeseed reveal                      → Print the mnemonic (after PIN unlock)
//!   beeseed seal --pin <pin>            → Seal a plain mnemonic record under a PIN
//!   beeseed status                      → Initialized / locked / next index (never creates)
//!
//! Output format:
//!   --json     Output raw JSON (default for non-tty)
//!   --pretty   Pretty-print JSON (default for tty)

use beeseed::logging::init_logging;
use beeseed::{AuthMode, Vault, VaultConfig, VaultError, HARDENED_OFFSET};
use serde_json::{json, Value};
use std::env;
use std::io::IsTerminal;
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
        println!("beeseed {}", env!("CARGO_PKG_VERSION"));
        return;
    }

    let result = match opts.command.as_deref() {
        Some("init") => cmd_init(&opts),
        Some("address") | Some("addr") => cmd_address(&opts),
        Some("reveal") => cmd_reveal(&opts),
        Some("seal") => cmd_seal(&opts),
        Some("status") => cmd_status(&opts),
        Some(cmd) => Err(format!("Unknown command: {}", cmd)),
        None => {
            print_usage();
            return;
        }
    };

    let pretty = !opts.json && (opts.pretty || std::io::stdout().is_terminal());
    match result {
        Ok(output) => println!("{}", render(&output, pretty)),
        Err(e) => {
            eprintln!("{}", render(&json!({"error": e}), pretty));
            std::process::exit(1);
        }
    }
}

fn render(value: &Value, pretty: bool) -> String {
    let rendered = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    };
    rendered.unwrap_or_else(|_| value.to_string())
}

#[derive(Default)]
struct ParsedArgs {
    command: Option<String>,
    app: Option<String>,
    mnemonic: Option<String>,
    index: Option<String>,
    data_dir: Option<String>,
    pin: Option<String>,
    auth_mode: Option<String>,
    passphrase: Option<String>,
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
                "--app" | "-a" => { opts.app = value; i += 1; }
                "--mnemonic" | "-m" => { opts.mnemonic = value; i += 1; }
                "--index" | "-i" => { opts.index = Some(value.unwrap_or_default()); i += 1; }
                "--data-dir" | "-d" => { opts.data_dir = value; i += 1; }
                "--pin" => { opts.pin = value; i += 1; }
                "--auth" | "--auth-mode" => { opts.auth_mode = value; i += 1; }
                "--passphrase" => { opts.passphrase = value; i += 1; }
                _ if !arg.starts_with('-') => positional.push(arg.clone()),
                _ => {} // Ignore unknown flags
            }
            i += 1;
        }

        if !positional.is_empty() {
            opts.command = Some(positional.remove(0));
        }

        // Apply environment variables (lower priority than CLI args)
        if opts.app.is_none() {
            opts.app = env::var("BEESEED_APP").ok();
        }
        if opts.pin.is_none() {
            opts.pin = env::var("BEESEED_PIN").ok().filter(|s| !s.is_empty());
        }
        if opts.auth_mode.is_none() {
            opts.auth_mode = env::var("BEESEED_AUTH_MODE").ok().filter(|s| !s.is_empty());
        }
        if opts.data_dir.is_none() {
            opts.data_dir = env::var("BEESEED_DATA_DIR").ok().filter(|s| !s.is_empty());
        }

        opts
    }
}

fn print_usage() {
    println!(
        r#"beeseed - deterministic wallet addresses from one mnemonic

USAGE:
    beeseed <command> [options]

COMMANDS:
    init                    Create the root mnemonic (or import with --mnemonic)
    address                 Allocate the next account and print its address
    reveal                  Print the root mnemonic
    seal                    Seal a plain mnemonic record under --pin
    status                  Show vault state

OPTIONS:
    --app, -a <name>        Application scope (env: BEESEED_APP, default: beeseed)
    --mnemonic, -m <words>  Import an existing 12-word mnemonic (init only)
    --index, -i <n>         Re-derive account n instead of allocating (address only)
    --data-dir, -d <path>   Data root (env: BEESEED_DATA_DIR)
    --pin <pin>             Unlock PIN (env: BEESEED_PIN)
    --auth <mode>           Auth mode: pin|none (env: BEESEED_AUTH_MODE, default: pin)
    --passphrase <text>     Optional BIP39 passphrase

OUTPUT OPTIONS:
    --json                  Raw JSON output
    --pretty                Pretty-print JSON
    --version, -V           Print version

EXAMPLES:
    beeseed init --app demo --pin 1234
    beeseed address --app demo --pin 1234
    beeseed address --app demo --pin 1234 --index 0 --json | jq -r .address
"#
    );
}

fn parse_auth_mode(value: Option<&str>) -> Result<AuthMode, String> {
    value.unwrap_or("pin").parse().map_err(|e: VaultError| e.to_string())
}

/// `--index` must be a valid account index when given; it never falls back to allocation.
fn parse_index(raw: Option<&str>) -> Result<Option<u32>, String> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    match raw.trim().parse::<u32>() {
        Ok(index) if index < HARDENED_OFFSET => Ok(Some(index)),
        _ => Err(format!("Invalid index: {raw:?} (expected 0..{HARDENED_OFFSET})")),
    }
}

fn build_config(opts: &ParsedArgs) -> Result<VaultConfig, String> {
    let app = opts.app.clone().unwrap_or_else(|| "beeseed".into());
    let auth_mode = parse_auth_mode(opts.auth_mode.as_deref())?;
    let mut config = VaultConfig::new(app).with_auth_mode(auth_mode);
    if let Some(ref dir) = opts.data_dir {
        config = config.with_data_dir(dir);
    }
    if let Some(ref passphrase) = opts.passphrase {
        config = config.with_passphrase(passphrase.clone());
    }
    debug!(?config, "resolved vault config");
    Ok(config)
}

/// Open the vault and pass the PIN gate when PIN auth is on.
fn open_unlocked(opts: &ParsedArgs) -> Result<Vault, String> {
    let vault = Vault::open(build_config(opts)?).map_err(|e| e.to_string())?;
    if vault.is_locked().map_err(|e| e.to_string())? {
        let pin = opts.pin.as_deref().ok_or("PIN required (--pin or BEESEED_PIN)")?;
        if !vault.unlock(pin).map_err(|e| e.to_string())? {
            return Err("Invalid PIN".into());
        }
    }
    Ok(vault)
}

fn cmd_init(opts: &ParsedArgs) -> Result<Value, String> {
    let vault = match opts.mnemonic.as_deref() {
        Some(words) => Vault::import(build_config(opts)?, words, opts.pin.as_deref())
            .map_err(|e| e.to_string())?,
        None => open_unlocked(opts)?,
    };
    Ok(json!({
        "initialized": vault.is_initialized().map_err(|e| e.to_string())?,
        "fingerprint": vault.fingerprint().map_err(|e| e.to_string())?,
        "next_index": vault.current_index().map_err(|e| e.to_string())?,
    }))
}

fn cmd_address(opts: &ParsedArgs) -> Result<Value, String> {
    let index = parse_index(opts.index.as_deref())?;
    let vault = open_unlocked(opts)?;
    let (index, address) = match index {
        Some(index) => (index, vault.address_at(index).map_err(|e| e.to_string())?),
        None => vault.create_next_account().map_err(|e| e.to_string())?,
    };
    Ok(json!({"index": index, "address": address.to_string()}))
}

fn cmd_reveal(opts: &ParsedArgs) -> Result<Value, String> {
    let vault = open_unlocked(opts)?;
    let mnemonic = vault.reveal_mnemonic().map_err(|e| e.to_string())?;
    Ok(json!({
        "mnemonic": mnemonic.phrase(),
        "words": mnemonic.words().collect::<Vec<_>>(),
    }))
}

fn cmd_seal(opts: &ParsedArgs) -> Result<Value, String> {
    let pin = opts.pin.as_deref().ok_or("PIN required (--pin or BEESEED_PIN)")?;
    let vault = Vault::open_existing(build_config(opts)?)
        .map_err(|e| e.to_string())?
        .ok_or("No mnemonic stored; run `beeseed init` first")?;
    if !vault.seal_plain(pin).map_err(|e| e.to_string())? {
        return Err("Invalid PIN".into());
    }
    Ok(json!({
        "sealed": true,
        "fingerprint": vault.fingerprint().map_err(|e| e.to_string())?,
    }))
}

/// Read-only: a fresh data dir stays empty whatever the auth mode.
fn cmd_status(opts: &ParsedArgs) -> Result<Value, String> {
    let config = build_config(opts)?;
    let auth_mode = config.auth_mode;
    let Some(vault) = Vault::open_existing(config).map_err(|e| e.to_string())? else {
        return Ok(json!({
            "auth_mode": auth_mode.as_str(),
            "initialized": false,
            "locked": true,
            "next_index": Value::Null,
        }));
    };
    let mut unsealed = false;
    if let Some(pin) = opts.pin.as_deref() {
        match vault.unlock(pin) {
            Ok(_) => {}
            Err(VaultError::UnsealedSecret) => unsealed = true,
            Err(e) => return Err(e.to_string()),
        }
    }
    Ok(json!({
        "auth_mode": auth_mode.as_str(),
        "initialized": true,
        "needs_seal": unsealed,
        "locked": vault.is_locked().map_err(|e| e.to_string())?,
        "next_index": vault.current_index().ok(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_absent_means_allocate() {
        assert_eq!(parse_index(None), Ok(None));
    }

    #[test]
    fn test_index_valid_values() {
        assert_eq!(parse_index(Some("0")), Ok(Some(0)));
        assert_eq!(parse_index(Some(" 42 ")), Ok(Some(42)));
        assert_eq!(parse_index(Some("2147483647")), Ok(Some(HARDENED_OFFSET - 1)));
    }

    #[test]
    fn test_index_malformed_is_an_error_not_an_allocation() {
        for raw in ["abc", "-1", "4294967296", "2147483648", ""] {
            assert!(parse_index(Some(raw)).is_err(), "{raw:?} should be rejected");
        }
    }

    #[test]
    fn test_auth_mode_flag() {
        assert_eq!(parse_auth_mode(None), Ok(AuthMode::Pin));
        assert_eq!(parse_auth_mode(Some("none")), Ok(AuthMode::None));
        assert!(parse_auth_mode(Some("password")).is_err());
    }
}
