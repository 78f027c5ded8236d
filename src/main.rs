//! toolwatch CLI entry point.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use toolwatch::config::{Config, Environment};
use toolwatch::controller::worker::UnavailableSession;
use toolwatch::controller::{SimulatedController, WorkerController};
use toolwatch::core::traits::{BusPublisher, ControllerClient};
use toolwatch::monitor::supervisor::BackoffConfig;
use toolwatch::monitor::MachineConfig;
use toolwatch::publisher::mqtt::{MqttPublisher, MqttPublisherConfig};
use toolwatch::service::{shutdown_signal, Service};

/// CNC tool-change edge monitor: watches controllers, publishes tool-change
/// and error events, and emits a periodic heartbeat.
#[derive(Parser, Debug)]
#[command(name = "toolwatch", version, about, long_about = None)]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Raise log verbosity to debug (overridden by RUST_LOG if set).
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose);

    let config = match Config::from_file(&args.config) {
        Ok(config) => config,
        Err(err) => {
            error!(path = ?args.config, error = %err, "failed to load configuration");
            return ExitCode::FAILURE;
        }
    };

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(err) => {
            error!(error = %err, "failed to start tokio runtime");
            return ExitCode::FAILURE;
        }
    };

    rt.block_on(run(config))
}

async fn run(config: Config) -> ExitCode {
    info!(
        env = ?config.env,
        machines = config.machines.len(),
        "toolwatch starting"
    );

    let publisher: Arc<dyn BusPublisher> = Arc::new(MqttPublisher::start(MqttPublisherConfig {
        host: config.mqtt.host.clone(),
        port: config.mqtt.port,
        username: config.mqtt.username.clone(),
        password: config.mqtt.password.clone(),
        tls: config.mqtt.tls,
        client_id: "toolwatch".to_string(),
    }));

    let backoff = BackoffConfig {
        min_delay: Duration::from_secs_f64(config.monitoring.reconnect_min_delay_s),
        max_delay: Duration::from_secs_f64(config.monitoring.reconnect_max_delay_s),
    };

    let mut machine_configs = Vec::with_capacity(config.machines.len());
    let mut clients: Vec<Box<dyn ControllerClient>> = Vec::with_capacity(config.machines.len());

    for machine in &config.machines {
        let machine_id = toolwatch::core::ids::MachineId::new(machine.machine_id.clone());
        let poll_interval_ms = machine
            .poll_interval_ms
            .unwrap_or(config.monitoring.poll_interval_ms_default);

        machine_configs.push(MachineConfig {
            machine_id: machine_id.clone(),
            ip: machine.ip.clone(),
            port: machine.port,
            monitored_paths: machine
                .monitored_paths
                .iter()
                .map(|p| toolwatch::core::ids::PathId(p.path))
                .collect(),
            poll_interval: Duration::from_millis(poll_interval_ms),
            debounce_consecutive_reads: config.monitoring.debounce_consecutive_reads,
            heartbeat_interval: Duration::from_secs(config.monitoring.heartbeat_interval_s),
            backoff,
        });

        clients.push(match config.env {
            Environment::Development => Box::new(
                SimulatedController::new(machine_id, machine.ip.clone()),
            ) as Box<dyn ControllerClient>,
            Environment::Production => {
                Box::new(WorkerController::spawn(machine_id, Box::new(UnavailableSession)))
                    as Box<dyn ControllerClient>
            }
        });
    }

    let service = Service::new(publisher, machine_configs, clients);
    service.run_until(shutdown_signal()).await;

    info!("toolwatch exited cleanly");
    ExitCode::SUCCESS
}

fn init_logging(verbose: bool) {
    let default_directive = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}
