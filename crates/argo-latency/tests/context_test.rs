//! Task-scoped current-controller handle.

use std::sync::Arc;

use argo_latency::{context, LatencyController};
use argo_types::Profile;

#[tokio::test]
async fn no_controller_outside_scope() {
    assert!(context::current().is_none());
    assert_eq!(context::log_checkpoint("orphan"), None);
}

#[tokio::test]
async fn scope_exposes_controller_to_nested_calls() {
    async fn stt_stage() {
        context::log_checkpoint("stt_complete");
    }

    let controller = Arc::new(LatencyController::new(Profile::Argo));
    context::scope(controller.clone(), async {
        let current = context::current().expect("controller should be in scope");
        assert!(Arc::ptr_eq(&current, &controller));
        context::log_checkpoint("input_received");
        stt_stage().await;
    })
    .await;

    let report = controller.report();
    let names: Vec<&str> = report.checkpoints.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, ["input_received", "stt_complete"]);
    assert!(context::current().is_none(), "scope should not leak");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_interactions_do_not_share_checkpoints() {
    let mut handles = Vec::new();

    for i in 0..8 {
        handles.push(tokio::spawn(async move {
            let controller = Arc::new(LatencyController::new(Profile::Voice));
            context::scope(controller.clone(), async move {
                for step in 0..20 {
                    context::log_checkpoint(&format!("interaction_{i}_step_{step}"));
                    tokio::task::yield_now().await;
                }
            })
            .await;
            (i, controller.report())
        }));
    }

    for handle in handles {
        let (i, report) = handle.await.expect("interaction task should not panic");
        assert_eq!(report.checkpoints.len(), 20);
        let prefix = format!("interaction_{i}_");
        assert!(
            report.checkpoints.iter().all(|c| c.name.starts_with(&prefix)),
            "interaction {i} saw another interaction's checkpoints"
        );
    }
}

#[test]
fn sync_scope_on_owning_thread() {
    let controller = Arc::new(LatencyController::new(Profile::Fast));
    let logged = context::sync_scope(controller.clone(), || context::log_checkpoint("wake_word"));
    assert!(logged.is_some());
    assert!(controller.checkpoint("wake_word").is_some());
}
