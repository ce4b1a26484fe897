pub const TASKS_COLLECTION: &str = "tasks";

pub const DEPLOYMENTS_COLLECTION: &str = "deployments";

pub const VERIFICATIONS_COLLECTION: &str = "verifications";

/// Holds one monotonically increasing sequence per collection that needs numeric ids.
pub const COUNTERS_COLLECTION: &str = "counters";
