//! Descriptor Module Tests
//!
//! Validates identity semantics and the value-object contracts the rest of
//! the coordinator relies on.

#[cfg(test)]
mod tests {
    use crate::descriptor::types::{
        ExecutionAttemptId, IntermediateResultId, JobId, MemorySize, PartitionKind,
        ResultPartitionId,
    };

    // ============================================================
    // TEST 1: Identifier uniqueness and display
    // ============================================================

    #[test]
    fn test_generated_ids_are_unique() {
        assert_ne!(JobId::new().0, JobId::new().0);
        assert_ne!(IntermediateResultId::new().0, IntermediateResultId::new().0);
        assert_ne!(ExecutionAttemptId::new().0, ExecutionAttemptId::new().0);
    }

    #[test]
    fn test_result_partition_id_combines_result_and_attempt() {
        let result_id = IntermediateResultId("result-1".to_string());
        let attempt_a = ExecutionAttemptId("attempt-a".to_string());
        let attempt_b = ExecutionAttemptId("attempt-b".to_string());

        // Same logical result, different producer attempts -> different ids
        let p1 = ResultPartitionId::new(result_id.clone(), attempt_a);
        let p2 = ResultPartitionId::new(result_id, attempt_b);

        assert_ne!(p1, p2);
        assert_eq!(p1.to_string(), "result-1@attempt-a");
    }

    // ============================================================
    // TEST 2: Partition kind release semantics
    // ============================================================

    #[test]
    fn test_only_persistent_kind_survives_job() {
        assert!(PartitionKind::BlockingPersistent.is_cluster_persistent());
        assert!(!PartitionKind::Blocking.is_cluster_persistent());
        assert!(!PartitionKind::Pipelined.is_cluster_persistent());
    }

    // ============================================================
    // TEST 3: MemorySize arithmetic
    // ============================================================

    #[test]
    fn test_memory_size_zero_and_add() {
        assert_eq!(MemorySize::ZERO.bytes(), 0);
        assert_eq!(MemorySize(64).add(MemorySize(128)), MemorySize(192));
    }

    // ============================================================
    // TEST 4: Identifiers survive serialization
    // ============================================================

    #[test]
    fn test_result_partition_id_serialization() {
        let id = ResultPartitionId::new(IntermediateResultId::new(), ExecutionAttemptId::new());

        let json = serde_json::to_string(&id).expect("Serialization failed");
        let restored: ResultPartitionId =
            serde_json::from_str(&json).expect("Deserialization failed");

        assert_eq!(id, restored);
    }
}
