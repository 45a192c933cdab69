use super::protocol::*;
use super::service::ShuffleMaster;
use crate::error::ShuffleError;
use crate::job::context::JobShuffleContext;
use crate::partition::backend::LocalShuffleBackend;

use axum::{Extension, Json, http::StatusCode};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;

type Master = Arc<ShuffleMaster<LocalShuffleBackend>>;

fn error_status(e: &ShuffleError) -> StatusCode {
    match e {
        ShuffleError::UnknownJob(_) => StatusCode::NOT_FOUND,
        ShuffleError::DuplicateRegistration(_) => StatusCode::CONFLICT,
        ShuffleError::ProducerUnreachable { .. } => StatusCode::BAD_GATEWAY,
        ShuffleError::Backend(_) => StatusCode::INTERNAL_SERVER_ERROR,
        ShuffleError::NotAwaitingRecovery(_) => StatusCode::CONFLICT,
        ShuffleError::SnapshotCodec(_) => StatusCode::BAD_REQUEST,
    }
}

pub async fn handle_register_job(
    Extension(master): Extension<Master>,
    Json(req): Json<RegisterJobRequest>,
) -> StatusCode {
    let (context, mut lost_rx) = JobShuffleContext::channel(req.job_id.clone());

    // Over HTTP the control plane is remote; surface lost-partition
    // notifications in the log until it polls or reconnects. The drain task
    // ends when a re-registration replaces the context.
    let job_id = req.job_id.clone();
    tokio::spawn(async move {
        while let Some(lost) = lost_rx.recv().await {
            tracing::warn!(
                "Job {} lost {} partitions: reschedule their producers",
                job_id,
                lost.partitions.len()
            );
        }
    });

    master.register_job(context);
    StatusCode::OK
}

pub async fn handle_unregister_job(
    Extension(master): Extension<Master>,
    Json(req): Json<UnregisterJobRequest>,
) -> StatusCode {
    master.unregister_job(&req.job_id);
    StatusCode::OK
}

pub async fn handle_recovery_started(
    Extension(master): Extension<Master>,
    Json(req): Json<RecoveryStartedRequest>,
) -> StatusCode {
    master.notify_partition_recovery_started(&req.job_id);
    StatusCode::OK
}

pub async fn handle_register_partition(
    Extension(master): Extension<Master>,
    Json(req): Json<RegisterPartitionRequest>,
) -> (StatusCode, Json<RegisterPartitionResponse>) {
    match master
        .register_partition_with_producer(&req.job_id, req.partition, req.producer)
        .await
    {
        Ok(descriptor) => (
            StatusCode::OK,
            Json(RegisterPartitionResponse {
                descriptor: Some(descriptor),
                error: None,
            }),
        ),
        Err(e) => {
            tracing::error!("Partition registration failed: {}", e);
            (
                error_status(&e),
                Json(RegisterPartitionResponse {
                    descriptor: None,
                    error: Some(e.to_string()),
                }),
            )
        }
    }
}

pub async fn handle_release_partition(
    Extension(master): Extension<Master>,
    Json(req): Json<ReleasePartitionRequest>,
) -> StatusCode {
    master.release_partition_externally(&req.descriptor);
    StatusCode::OK
}

pub async fn handle_partition_lost(
    Extension(master): Extension<Master>,
    Json(req): Json<PartitionLostRequest>,
) -> StatusCode {
    master.notify_partitions_lost(&req.job_id, req.partitions);
    StatusCode::OK
}

pub async fn handle_metrics_report(
    Extension(master): Extension<Master>,
    Json(req): Json<MetricsReportRequest>,
) -> StatusCode {
    master
        .backend()
        .report_metrics(&req.partition_id, req.metrics);
    StatusCode::OK
}

pub async fn handle_metrics_query(
    Extension(master): Extension<Master>,
    Json(req): Json<MetricsQueryRequest>,
) -> (StatusCode, Json<MetricsQueryResponse>) {
    let partitions = master
        .get_partition_with_metrics(
            &req.job_id,
            Duration::from_millis(req.timeout_ms),
            req.partitions,
        )
        .await;

    (StatusCode::OK, Json(MetricsQueryResponse { partitions }))
}

pub async fn handle_snapshot(
    Extension(master): Extension<Master>,
    Json(req): Json<SnapshotRequest>,
) -> (StatusCode, Json<SnapshotResponse>) {
    let (reply_tx, reply_rx) = oneshot::channel();

    match &req.job_id {
        Some(job_id) => master.snapshot_job_state(reply_tx, job_id),
        None => master.snapshot_state(reply_tx),
    }

    // A dropped sender means snapshots are unsupported (or the job is
    // unknown); that is the documented no-op, not a failure.
    let snapshot = reply_rx.await.ok();
    (StatusCode::OK, Json(SnapshotResponse { snapshot }))
}

pub async fn handle_restore(
    Extension(master): Extension<Master>,
    Json(req): Json<RestoreRequest>,
) -> StatusCode {
    let result = match &req.job_id {
        Some(job_id) => master.restore_job_state(&req.snapshots, job_id),
        None => match req.snapshots.first() {
            Some(snapshot) => master.restore_state(snapshot),
            None => Ok(()),
        },
    };

    match result {
        Ok(()) => StatusCode::OK,
        Err(e) => {
            tracing::error!("Restore failed: {}", e);
            error_status(&e)
        }
    }
}

pub async fn handle_status(
    Extension(master): Extension<Master>,
) -> (StatusCode, Json<StatusResponse>) {
    (
        StatusCode::OK,
        Json(StatusResponse {
            jobs: master.job_count(),
            partitions: master.partition_count(),
            supports_batch_snapshot: master.supports_batch_snapshot(),
        }),
    )
}
