//! Recovery Module Tests
//!
//! Snapshot codec round trips and the combination rules for multi-snapshot
//! job restores.

#[cfg(test)]
mod tests {
    use crate::descriptor::types::{
        ExecutionAttemptId, IntermediateResultId, JobId, PartitionKind, ResultPartitionId,
    };
    use crate::partition::backend::{LocalShuffleDescriptor, ShuffleDescriptor};
    use crate::recovery::snapshot::{
        ShuffleMasterSnapshot, SnapshotScope, combine_job_descriptors,
    };

    fn descriptor(partition_id: ResultPartitionId, data_port: u16) -> LocalShuffleDescriptor {
        LocalShuffleDescriptor {
            producer_attempt: partition_id.producer_attempt.clone(),
            partition_id,
            producer_address: "127.0.0.1:7000".parse().unwrap(),
            data_port,
            kind: PartitionKind::Blocking,
        }
    }

    fn some_partition() -> ResultPartitionId {
        ResultPartitionId::new(IntermediateResultId::new(), ExecutionAttemptId::new())
    }

    // ============================================================
    // TEST 1: Codec round trip
    // ============================================================

    #[test]
    fn test_snapshot_round_trip() {
        // ARRANGE: two jobs with one partition each
        let job_a = JobId::new();
        let job_b = JobId::new();
        let table = vec![
            (job_a.clone(), vec![descriptor(some_partition(), 9000)]),
            (job_b.clone(), vec![descriptor(some_partition(), 9001)]),
        ];

        // ACT
        let snapshot = ShuffleMasterSnapshot::encode(SnapshotScope::Whole, table)
            .expect("encode failed");
        let decoded: Vec<(JobId, Vec<LocalShuffleDescriptor>)> =
            snapshot.decode().expect("decode failed");

        // ASSERT
        assert_eq!(snapshot.scope, SnapshotScope::Whole);
        assert!(!snapshot.is_job_scoped());
        assert_eq!(decoded.len(), 2);

        let jobs: Vec<&JobId> = decoded.iter().map(|(job, _)| job).collect();
        assert!(jobs.contains(&&job_a));
        assert!(jobs.contains(&&job_b));
    }

    #[test]
    fn test_job_scoped_snapshot_keeps_its_scope() {
        let job_id = JobId::new();
        let snapshot = ShuffleMasterSnapshot::encode::<LocalShuffleDescriptor>(
            SnapshotScope::Job(job_id.clone()),
            vec![(job_id.clone(), vec![])],
        )
        .expect("encode failed");

        assert!(snapshot.is_job_scoped());
        assert_eq!(snapshot.scope, SnapshotScope::Job(job_id));
    }

    // ============================================================
    // TEST 2: Snapshot payload survives outer serialization
    // ============================================================

    #[test]
    fn test_snapshot_is_persistable_as_opaque_bytes() {
        let job_id = JobId::new();
        let partition_id = some_partition();
        let snapshot = ShuffleMasterSnapshot::encode(
            SnapshotScope::Job(job_id.clone()),
            vec![(job_id.clone(), vec![descriptor(partition_id.clone(), 9000)])],
        )
        .expect("encode failed");

        // The control plane persists snapshots without looking inside
        let json = serde_json::to_string(&snapshot).expect("outer serialization failed");
        let restored: ShuffleMasterSnapshot =
            serde_json::from_str(&json).expect("outer deserialization failed");

        let decoded: Vec<(JobId, Vec<LocalShuffleDescriptor>)> =
            restored.decode().expect("decode failed");
        assert_eq!(decoded.len(), 1);
        assert_eq!(decoded[0].1[0].partition_id, partition_id);
    }

    // ============================================================
    // TEST 3: Combining snapshots from multiple incarnations
    // ============================================================

    #[test]
    fn test_combine_later_descriptor_wins() {
        // ARRANGE: same partition captured by two coordinator incarnations,
        // the second with a different data port
        let partition_id = some_partition();
        let older = descriptor(partition_id.clone(), 9000);
        let newer = descriptor(partition_id.clone(), 9100);
        let other = descriptor(some_partition(), 9001);

        // ACT
        let combined = combine_job_descriptors(vec![vec![older, other], vec![newer]]);

        // ASSERT: one entry per partition, later batch wins
        assert_eq!(combined.len(), 2);
        let winner = combined
            .iter()
            .find(|d| d.result_partition_id() == &partition_id)
            .expect("partition missing");
        assert_eq!(winner.data_port, 9100);
    }

    #[test]
    fn test_combine_empty_batches() {
        let combined: Vec<LocalShuffleDescriptor> = combine_job_descriptors(vec![]);
        assert!(combined.is_empty());
    }
}
