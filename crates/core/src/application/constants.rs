// Operator constants (no magic values)

/// Listener metadata key under which a backend job id is reported
pub const JOB_ID_META_KEY: &str = "dataflow-job-id";
