//! Runtime helper for spawning the dedicated executor loop.

use crate::error::ListenerError;
use std::future::Future;
use std::io;
use std::sync::mpsc;
use std::thread;
use tokio::runtime::{Builder, Runtime};

pub(crate) const EXECUTOR_THREAD_NAME: &str = "tf-listener";

/// Builds the runtime the executor loop runs on. Called on the executor
/// thread itself.
pub(crate) type RuntimeFactory = fn() -> io::Result<Runtime>;

pub(crate) fn build_executor_runtime() -> io::Result<Runtime> {
    Builder::new_current_thread().build()
}

/// Starts one named thread that builds its runtime with `build_runtime` and
/// drives `run_loop` to completion on it.
///
/// Returns once the runtime is built, so a build failure is reported here
/// rather than lost on the executor thread. The runtime never leaves that
/// thread.
pub(crate) fn spawn_executor_loop<F, Fut>(
    thread_name: &str,
    build_runtime: RuntimeFactory,
    run_loop: F,
) -> Result<thread::JoinHandle<()>, ListenerError>
where
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = ()>,
{
    let (ready_sender, ready_receiver) = mpsc::channel();

    let handle = thread::Builder::new()
        .name(thread_name.to_string())
        .spawn(move || {
            let runtime = match build_runtime() {
                Ok(runtime) => runtime,
                Err(err) => {
                    let _ = ready_sender.send(Err(err));
                    return;
                }
            };
            let _ = ready_sender.send(Ok(()));
            runtime.block_on(run_loop());
        })
        .map_err(ListenerError::ExecutorSpawn)?;

    let ready = ready_receiver.recv();
    match ready {
        Ok(Ok(())) => Ok(handle),
        Ok(Err(err)) => {
            let _ = handle.join();
            Err(ListenerError::ExecutorRuntime(err))
        }
        Err(_) => {
            let _ = handle.join();
            Err(ListenerError::ExecutorRuntime(io::Error::other(
                "executor thread exited before its runtime was built",
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{build_executor_runtime, spawn_executor_loop, EXECUTOR_THREAD_NAME};
    use crate::error::ListenerError;
    use std::io;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::mpsc;
    use std::sync::Arc;
    use tokio::runtime::Runtime;

    fn failing_runtime() -> io::Result<Runtime> {
        Err(io::Error::other("no runtime for you"))
    }

    #[test]
    fn executor_loop_runs_on_named_thread() {
        let (tx, rx) = mpsc::channel();

        let handle = spawn_executor_loop(
            EXECUTOR_THREAD_NAME,
            build_executor_runtime,
            move || async move {
                let name = std::thread::current().name().map(str::to_string);
                tx.send(name).expect("test receiver should be alive");
            },
        )
        .expect("thread should spawn");

        handle.join().expect("loop thread should not panic");
        assert_eq!(
            rx.recv().expect("loop should report its thread name"),
            Some(EXECUTOR_THREAD_NAME.to_string())
        );
    }

    #[tokio::test]
    async fn runtime_build_failure_is_reported_from_async_callers() {
        let ran = Arc::new(AtomicBool::new(false));
        let loop_ran = ran.clone();

        let result = spawn_executor_loop(EXECUTOR_THREAD_NAME, failing_runtime, move || async move {
            loop_ran.store(true, Ordering::SeqCst);
        });

        match result {
            Err(ListenerError::ExecutorRuntime(err)) => {
                assert_eq!(err.to_string(), "no runtime for you")
            }
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("runtime build failure should be reported"),
        }
        assert!(!ran.load(Ordering::SeqCst));
    }
}
