use clap::Args;

/// Parameters used to config the in-process queue.
#[derive(Debug, Clone, Args)]
pub struct InMemoryQueueCliArgs {
    /// Use an in-process queue. Messages do not survive a restart,
    /// so this is only meant for local runs and tests.
    #[arg(long)]
    pub in_memory_queue: bool,
}
