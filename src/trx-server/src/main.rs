// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

mod config;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use tokio::signal;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use trx_app::{init_logging, normalize_name, parse_key_value, ConfigFile};
use trx_backend::{
    register_builtin_backends_on, ExtraConfig, RegistrationContext, RigAccess, RigDaemon,
    StartRequest,
};
use trx_core::rig::controller::{DaemonError, RigEventEmitter, RigListener};
use trx_core::{CapabilityKind, DynResult, Parameter, PowerStatus, RigCommand};

use config::ServerConfig;

const PKG_DESCRIPTION: &str = concat!(env!("CARGO_PKG_NAME"), " - rig polling daemon");

#[derive(Debug, Parser)]
#[command(
    author = env!("CARGO_PKG_AUTHORS"),
    version = env!("CARGO_PKG_VERSION"),
    about = PKG_DESCRIPTION,
)]
struct Cli {
    /// Path to configuration file
    #[arg(long = "config", short = 'C', value_name = "FILE")]
    config: Option<PathBuf>,
    /// Print example configuration and exit
    #[arg(long = "print-config")]
    print_config: bool,
    /// Rig backend to use (e.g. dummy)
    #[arg(short = 'r', long = "rig")]
    rig: Option<String>,
    /// Access method to reach the rig CAT interface
    #[arg(short = 'a', long = "access", value_enum)]
    access: Option<AccessKind>,
    /// Rig CAT address:
    /// when access is serial: <path> <baud>;
    /// when access is TCP: <host>:<port>
    #[arg(value_name = "RIG_ADDR")]
    rig_addr: Option<String>,
    /// Base delay between commands in milliseconds
    #[arg(long = "cycle-delay-ms")]
    cycle_delay_ms: Option<u64>,
    /// Drive the cycle from a periodic callback instead of a worker task
    #[arg(long = "callback-mode")]
    callback_mode: bool,
    /// Driver option as key=value, may be repeated
    #[arg(long = "set", value_name = "KEY=VALUE", value_parser = parse_key_value)]
    extra: Vec<(String, String)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum AccessKind {
    Serial,
    Tcp,
    None,
}

/// Parse a serial rig address of the form "<path> <baud>".
fn parse_serial_addr(addr: &str) -> DynResult<(String, u32)> {
    let mut parts = addr.split_whitespace();
    let path = parts
        .next()
        .ok_or("Serial rig address must be '<path> <baud>'")?;
    let baud_str = parts
        .next()
        .ok_or("Serial rig address must be '<path> <baud>'")?;
    if parts.next().is_some() {
        return Err("Serial rig address must be '<path> <baud>' (got extra data)".into());
    }
    let baud: u32 = baud_str
        .parse()
        .map_err(|e| format!("Invalid baud '{}': {}", baud_str, e))?;
    Ok((path.to_string(), baud))
}

fn resolve_access(cli: &Cli, cfg: &ServerConfig) -> DynResult<RigAccess> {
    let access_type = cli
        .access
        .as_ref()
        .map(|a| match a {
            AccessKind::Serial => "serial",
            AccessKind::Tcp => "tcp",
            AccessKind::None => "none",
        })
        .or(cfg.rig.access.access_type.as_deref());

    let access = match access_type {
        None if cli.rig_addr.is_none() && cfg.rig.access.port.is_none() => RigAccess::None,
        Some("serial") | None => {
            let (path, baud) = if let Some(ref addr) = cli.rig_addr {
                parse_serial_addr(addr)?
            } else if let (Some(port), Some(baud)) = (&cfg.rig.access.port, cfg.rig.access.baud) {
                (port.clone(), baud)
            } else {
                return Err("Serial access requires port and baud. Use '<path> <baud>' argument or set [rig.access].port and .baud in config.".into());
            };
            RigAccess::Serial { path, baud }
        }
        Some("tcp") => {
            let addr = if let Some(ref addr) = cli.rig_addr {
                addr.clone()
            } else if let (Some(host), Some(port)) = (&cfg.rig.access.host, cfg.rig.access.tcp_port)
            {
                format!("{}:{}", host, port)
            } else {
                return Err("TCP access requires host:port. Use argument or set [rig.access].host and .tcp_port in config.".into());
            };
            RigAccess::Tcp { addr }
        }
        Some("none") => RigAccess::None,
        Some(other) => return Err(format!("Unknown access type: {}", other).into()),
    };
    Ok(access)
}

/// Merge config file and CLI arguments into a start request.
fn resolve_request(
    cli: &Cli,
    cfg: &ServerConfig,
    registry: &RegistrationContext,
) -> DynResult<StartRequest> {
    let rig_str = cli.rig.clone().or_else(|| cfg.rig.model.clone());
    let rig = match rig_str.as_deref() {
        Some(name) => normalize_name(name),
        None => {
            return Err("Rig model not specified. Use --rig or set [rig].model in config.".into())
        }
    };
    if !registry.is_backend_registered(&rig) {
        return Err(format!(
            "Unknown rig model: {} (available: {})",
            rig,
            registry.registered_backends().join(", ")
        )
        .into());
    }

    let mut extra: ExtraConfig = cfg.rig.extra.clone();
    extra.extend(cli.extra.iter().cloned());

    let mut request = StartRequest::new(&rig)
        .with_access(resolve_access(cli, cfg)?)
        .with_callback_mode(cli.callback_mode);
    request.extra = extra;
    if let Some(ms) = cli.cycle_delay_ms {
        if !(1..=10_000).contains(&ms) {
            return Err("--cycle-delay-ms must be in range 1..=10000".into());
        }
        request = request.with_cycle_delay_ms(ms);
    }
    Ok(request)
}

/// Logs the events a rig operator should see.
struct LogListener;

impl RigListener for LogListener {
    fn on_ptt_change(&self, transmitting: bool) {
        info!("PTT {}", if transmitting { "on" } else { "off" });
    }

    fn on_power_change(&self, power: PowerStatus) {
        info!("Power status: {:?}", power);
    }

    fn on_capability_revoked(&self, kind: CapabilityKind, param: Parameter) {
        warn!("Disabled {:?} of {} for this session", kind, param);
    }

    fn on_defect(&self, command: Option<RigCommand>, reason: &str) {
        match command {
            Some(command) => warn!("Rig descriptor mismatch at {}: {}", command, reason),
            None => warn!("Rig descriptor mismatch: {}", reason),
        }
    }
}

#[tokio::main]
async fn main() -> DynResult<()> {
    let mut registry = RegistrationContext::new();
    register_builtin_backends_on(&mut registry);

    let cli = Cli::parse();

    if cli.print_config {
        println!("{}", ServerConfig::example_combined_toml());
        return Ok(());
    }

    let (cfg, config_path) = ServerConfig::load(cli.config.as_deref())?;
    cfg.validate()
        .map_err(|e| format!("Invalid server configuration: {}", e))?;

    init_logging(cfg.general.log_level.as_deref());

    if let Some(ref path) = config_path {
        info!("Loaded configuration from {}", path.display());
    }

    let request = resolve_request(&cli, &cfg, &registry)?;
    match &request.access {
        RigAccess::Serial { path, baud } => info!(
            "Starting trx-rigd (rig: {}, access: serial {} @ {} baud)",
            request.model, path, baud
        ),
        RigAccess::Tcp { addr } => info!(
            "Starting trx-rigd (rig: {}, access: tcp {})",
            request.model, addr
        ),
        RigAccess::None => info!("Starting trx-rigd (rig: {})", request.model),
    }

    let mut events = RigEventEmitter::new();
    events.register(Arc::new(LogListener));

    let daemon = RigDaemon::new(registry, cfg.to_daemon_options()?);
    let store = daemon.start(request, events).await?;
    let caps = store.capabilities();
    info!(
        "Rig probed: {} readable, {} writable parameters",
        caps.read.len(),
        caps.write.len()
    );

    let mut acquired_rx = store.subscribe();
    let watcher = tokio::spawn(async move {
        let mut last_freq = acquired_rx.borrow().freq;
        while acquired_rx.changed().await.is_ok() {
            let freq = acquired_rx.borrow().freq;
            if freq != last_freq {
                info!("Frequency: {} Hz", freq.hz);
                last_freq = freq;
            }
        }
    });

    signal::ctrl_c().await?;
    info!("Ctrl+C received, shutting down");
    shutdown(&daemon, watcher).await?;
    Ok(())
}

/// Stop the daemon and the state watcher. A failed stop is returned so
/// the process exits non-zero.
async fn shutdown(daemon: &RigDaemon, watcher: JoinHandle<()>) -> Result<(), DaemonError> {
    let result = daemon.stop().await;
    watcher.abort();
    let _ = watcher.await;
    if let Err(ref e) = result {
        error!("Rig daemon stop error: {}", e);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use trx_core::rig::controller::DaemonOptions;

    #[test]
    fn test_parse_serial_addr() {
        assert_eq!(
            parse_serial_addr("/dev/ttyUSB0 38400").unwrap(),
            ("/dev/ttyUSB0".to_string(), 38400)
        );
        assert!(parse_serial_addr("/dev/ttyUSB0").is_err());
        assert!(parse_serial_addr("/dev/ttyUSB0 38400 8N1").is_err());
        assert!(parse_serial_addr("/dev/ttyUSB0 fast").is_err());
    }

    #[tokio::test]
    async fn test_shutdown_returns_stop_error() {
        let daemon = RigDaemon::new(RegistrationContext::new(), DaemonOptions::default());
        let watcher = tokio::spawn(std::future::pending::<()>());
        let result = shutdown(&daemon, watcher).await;
        assert!(matches!(result, Err(DaemonError::NotRunning)));
    }

    #[tokio::test]
    async fn test_shutdown_after_start() {
        let mut registry = RegistrationContext::new();
        register_builtin_backends_on(&mut registry);
        let daemon = RigDaemon::new(registry, DaemonOptions::default());
        daemon
            .start(StartRequest::new("dummy"), RigEventEmitter::new())
            .await
            .unwrap();
        let watcher = tokio::spawn(std::future::pending::<()>());
        shutdown(&daemon, watcher).await.unwrap();
        assert!(!daemon.is_running().await);
    }
}
