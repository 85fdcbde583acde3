//! Canonical structured event names used across `tf-listener`.

// Batch dispatch events.
pub const BATCH_RECEIVE: &str = "batch_receive";
pub const BATCH_PROCESSED: &str = "batch_processed";
pub const TRANSFORM_INSERT_FAILED: &str = "transform_insert_failed";
pub const TRANSFORM_INSERT_PANICKED: &str = "transform_insert_panicked";
pub const BATCH_DROP_SHUTDOWN: &str = "batch_drop_shutdown";
pub const BATCH_DROP_EXECUTOR_STOPPED: &str = "batch_drop_executor_stopped";

// Stream subscription events.
pub const SUBSCRIBE_OK: &str = "subscribe_ok";
pub const SUBSCRIBE_FAILED: &str = "subscribe_failed";
pub const UNSUBSCRIBE: &str = "unsubscribe";

// Scheduler and executor lifecycle events.
pub const SCHEDULER_CALLER_DRIVEN: &str = "scheduler_caller_driven";
pub const EXECUTOR_SPAWN_START: &str = "executor_spawn_start";
pub const EXECUTOR_SPAWN_OK: &str = "executor_spawn_ok";
pub const EXECUTOR_SPAWN_FAILED: &str = "executor_spawn_failed";
pub const EXECUTOR_LOOP_STOPPED: &str = "executor_loop_stopped";
pub const EXECUTOR_JOIN_FAILED: &str = "executor_join_failed";
pub const DEDICATED_THREAD_FLAG_SET: &str = "dedicated_thread_flag_set";

// Listener lifecycle events.
pub const LISTENER_START: &str = "listener_start";
pub const LISTENER_READY: &str = "listener_ready";
pub const LISTENER_START_FAILED: &str = "listener_start_failed";
pub const LISTENER_SHUTDOWN: &str = "listener_shutdown";
