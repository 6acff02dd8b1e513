//! Task-scoped access to the current interaction's controller.
//!
//! Code deep in the pipeline can log checkpoints without having a
//! controller threaded through every call. The handle lives in tokio
//! task-local storage, so it is visible only inside the future (or
//! synchronous closure) it was scoped to. Two interactions running as
//! separate tasks never see each other's controller.
//!
//! ```rust,ignore
//! let controller = Arc::new(LatencyController::new(Profile::Argo));
//! context::scope(controller.clone(), async {
//!     context::log_checkpoint("input_received");
//!     run_pipeline().await;
//! })
//! .await;
//! let report = controller.report();
//! ```

use std::future::Future;
use std::sync::Arc;

use crate::controller::LatencyController;

tokio::task_local! {
    static CURRENT: Arc<LatencyController>;
}

/// Runs `fut` with `controller` as the current controller.
pub async fn scope<F>(controller: Arc<LatencyController>, fut: F) -> F::Output
where
    F: Future,
{
    CURRENT.scope(controller, fut).await
}

/// Runs `f` synchronously with `controller` as the current controller.
pub fn sync_scope<F, R>(controller: Arc<LatencyController>, f: F) -> R
where
    F: FnOnce() -> R,
{
    CURRENT.sync_scope(controller, f)
}

/// Returns the current controller, if called inside a scope.
pub fn current() -> Option<Arc<LatencyController>> {
    CURRENT.try_with(Arc::clone).ok()
}

/// Logs `name` on the current controller. Returns `None` outside a scope.
pub fn log_checkpoint(name: &str) -> Option<f64> {
    CURRENT.try_with(|c| c.log_checkpoint(name)).ok()
}
