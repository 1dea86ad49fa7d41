//! cadence-daemon: runs a TWAP oracle against a reference venue pair.
//!
//! Single OS process running a Tokio async runtime. A keeper task updates
//! the oracle once per epoch; clients query it via JSON-RPC over a Unix
//! socket in the data directory.

mod commands;
mod config;
mod events;
mod keeper;
mod rpc;

use std::collections::HashMap;
use std::sync::Arc;

use cadence_oracle::clock::{Clock, SystemClock};
use cadence_oracle::pair::ConstantProductPair;
use cadence_oracle::twap::TwapOracle;
use cadence_sentry::Sentry;
use cadence_types::events::{Event, EventType};
use tokio::sync::{broadcast, RwLock};
use tracing::{error, info};

use crate::config::DaemonConfig;
use crate::events::EventBus;
use crate::rpc::RpcServer;

/// Time source shared by the venue, the oracle and the daemon.
pub type SharedClock = Arc<dyn Clock>;

/// The reference venue.
pub type Pair = ConstantProductPair<SharedClock>;

/// The oracle bound to [`Pair`].
pub type Oracle = TwapOracle<Arc<Pair>, SharedClock>;

/// Daemon-wide shared state.
pub struct DaemonState {
    /// Configuration.
    pub config: DaemonConfig,
    /// Time source.
    pub clock: SharedClock,
    /// Venue pair the oracle observes.
    pub pair: Arc<Pair>,
    /// The oracle. `update` takes the write lock, reads share it.
    pub oracle: RwLock<Oracle>,
    /// Allow-list gate.
    pub sentry: RwLock<Sentry>,
    /// Event bus for pushing events to subscribers.
    pub event_bus: EventBus,
    /// Shutdown signal sender.
    pub shutdown_tx: broadcast::Sender<()>,
}

impl DaemonState {
    /// Open the venue and bind an oracle to it.
    pub fn build(config: DaemonConfig, clock: SharedClock) -> anyhow::Result<Self> {
        let pair_cfg = &config.pair;
        let (reserve0, reserve1) = pair_cfg.reserves()?;
        let pair = Arc::new(ConstantProductPair::new(
            pair_cfg.token0,
            pair_cfg.token1,
            reserve0,
            reserve1,
            clock.clone(),
        )?);

        let metadata = HashMap::from([
            (pair_cfg.token0, pair_cfg.token0_decimals),
            (pair_cfg.token1, pair_cfg.token1_decimals),
        ]);
        let oracle = TwapOracle::new(
            pair.clone(),
            &metadata,
            clock.clone(),
            config.oracle.period_secs,
        )?;

        let sentry = Sentry::new(config.sentry.admin);
        let (shutdown_tx, _shutdown_rx) = broadcast::channel(1);

        Ok(Self {
            config,
            clock,
            pair,
            oracle: RwLock::new(oracle),
            sentry: RwLock::new(sentry),
            event_bus: EventBus::new(1000),
            shutdown_tx,
        })
    }

    /// Current Unix time according to the shared clock.
    pub fn now(&self) -> u64 {
        self.clock.now()
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Load config
    let config = DaemonConfig::load()?;

    // 2. Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(format!("cadence={}", config.advanced.log_level).parse()?),
        )
        .init();

    info!("cadence daemon starting");

    let data_dir = config.data_dir();
    std::fs::create_dir_all(&data_dir)?;

    // 3. Build oracle, venue and sentry
    let state = Arc::new(DaemonState::build(config, Arc::new(SystemClock))?);

    // 4. Start the keeper
    let keeper = tokio::spawn(keeper::run(state.clone(), state.shutdown_tx.subscribe()));

    // 5. Start IPC server
    let socket_path = data_dir.join("daemon.sock");
    let rpc_server = RpcServer::new(state.clone(), socket_path.clone());

    info!("Starting JSON-RPC server on {:?}", socket_path);

    state.event_bus.emit(Event::new(
        EventType::DaemonStarted,
        state.now(),
        serde_json::json!({
            "version": env!("CARGO_PKG_VERSION"),
        }),
    ));

    // 6. Run the RPC server until shutdown
    let mut shutdown_rx = state.shutdown_tx.subscribe();
    tokio::select! {
        result = rpc_server.run() => {
            if let Err(e) = result {
                error!("RPC server error: {}", e);
            }
        }
        _ = shutdown_rx.recv() => {
            info!("Shutdown signal received");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Ctrl-C received, shutting down");
        }
    }

    // Graceful shutdown
    info!("Daemon shutting down gracefully");
    let _ = state.shutdown_tx.send(());
    if let Err(e) = keeper.await {
        error!("keeper task failed: {}", e);
    }

    // Clean up socket file
    let _ = std::fs::remove_file(&socket_path);

    info!("Daemon stopped");
    Ok(())
}
