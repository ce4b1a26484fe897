use serde::Serialize;
use strum_macros::{Display, EnumIter};

/// Logical queues. Each is published under the shared exchange with its own
/// name as routing key, and consumed as `<queue>.<service>`.
#[derive(Display, Debug, Clone, Copy, PartialEq, Eq, EnumIter, Hash)]
pub enum QueueType {
    #[strum(serialize = "compilations")]
    Compilations,
    #[strum(serialize = "contracts")]
    Contracts,
}

impl QueueType {
    pub fn routing_key(&self) -> String {
        self.to_string()
    }

    /// Durable queue name owned by `service`.
    pub fn namespaced(&self, service: &str) -> String {
        format!("{}.{}", self, service)
    }
}

/// A typed message that always travels on the same queue.
pub trait QueueMessage: Serialize {
    const QUEUE: QueueType;
}
