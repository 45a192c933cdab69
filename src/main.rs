use axum::{
    Router,
    extract::Extension,
    routing::{get, post},
};
use shuffle_coordinator::master::handlers::*;
use shuffle_coordinator::master::protocol::*;
use shuffle_coordinator::master::service::{ShuffleMaster, ShuffleMasterConfig};
use shuffle_coordinator::metrics::fetch::HttpMetricsClient;
use shuffle_coordinator::metrics::sizing::SizingPolicy;
use shuffle_coordinator::partition::backend::LocalShuffleBackend;
use std::net::SocketAddr;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 3 {
        eprintln!(
            "Usage: {} --bind <addr:port> [--max-partitions <n>] [--enable-snapshots] \
             [--bytes-per-channel <n>]",
            args[0]
        );
        eprintln!("Example: {} --bind 127.0.0.1:6123", args[0]);
        std::process::exit(1);
    }

    let mut bind_addr: Option<SocketAddr> = None;
    let mut max_partitions: usize = 10_000;
    let mut snapshots_enabled = false;
    let mut bytes_per_channel: u64 = 0;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--bind" => {
                bind_addr = Some(args[i + 1].parse()?);
                i += 2;
            }
            "--max-partitions" => {
                max_partitions = args[i + 1].parse()?;
                i += 2;
            }
            "--enable-snapshots" => {
                snapshots_enabled = true;
                i += 1;
            }
            "--bytes-per-channel" => {
                bytes_per_channel = args[i + 1].parse()?;
                i += 2;
            }
            _ => {
                i += 1;
            }
        }
    }

    let Some(bind_addr) = bind_addr else {
        eprintln!("--bind is required");
        std::process::exit(1);
    };

    tracing::info!("Starting shuffle coordinator on {}", bind_addr);

    // 1. Backend with HTTP metrics pull from producer executors:
    let backend =
        LocalShuffleBackend::with_remote_metrics(max_partitions, HttpMetricsClient::new());

    // 2. Coordinator facade:
    let config = ShuffleMasterConfig {
        sizing: SizingPolicy {
            bytes_per_input_channel: bytes_per_channel,
            bytes_per_output_subpartition: bytes_per_channel,
        },
        snapshots_enabled,
        ..Default::default()
    };

    let master = ShuffleMaster::with_metrics(config, backend.clone(), backend);
    master.start()?;

    // 3. HTTP control surface:
    let app = Router::new()
        .route(ENDPOINT_JOB_REGISTER, post(handle_register_job))
        .route(ENDPOINT_JOB_UNREGISTER, post(handle_unregister_job))
        .route(ENDPOINT_JOB_RECOVERY_STARTED, post(handle_recovery_started))
        .route(ENDPOINT_PARTITION_REGISTER, post(handle_register_partition))
        .route(ENDPOINT_PARTITION_RELEASE, post(handle_release_partition))
        .route(ENDPOINT_PARTITION_LOST, post(handle_partition_lost))
        .route(ENDPOINT_METRICS_QUERY, post(handle_metrics_query))
        .route(ENDPOINT_METRICS_REPORT, post(handle_metrics_report))
        .route(ENDPOINT_SNAPSHOT, post(handle_snapshot))
        .route(ENDPOINT_RESTORE, post(handle_restore))
        .route(ENDPOINT_STATUS, get(handle_status))
        .layer(Extension(master.clone()));

    tracing::info!("Control surface listening on {}", bind_addr);
    tracing::info!("Press Ctrl+C to shutdown");

    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    axum::serve(listener, app).await?;

    master.close();

    Ok(())
}
