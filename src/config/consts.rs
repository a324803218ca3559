/// Worker count used when available parallelism cannot be determined
pub const DEFAULT_WORKER_THREADS_FALLBACK: usize = 4;
/// Pending queued executions, both priority classes together
pub const DEFAULT_MAX_QUEUED: usize = 256;
/// Consecutive foreground dispatches allowed while background work waits
pub const DEFAULT_FOREGROUND_WEIGHT: u32 = 4;
/// Settled executions nobody collected are reclaimed after an hour
pub const DEFAULT_ABANDONED_AFTER_SECS: u64 = 3600;
/// How often the sweeper looks for abandoned executions
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 60;
/// Poll interval of remote-delegated processes
pub const DEFAULT_REMOTE_POLL_INTERVAL_MS: u64 = 250;
