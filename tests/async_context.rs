use logm::infrastructure::mocks::MemorySink;
use logm::{DiagnosticMap, DiagnosticStack, LoggerFactory, WithContext};
use std::sync::Arc;
use std::time::Duration;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_context_follows_task_across_workers() {
    let sink = Arc::new(MemorySink::new());
    let factory = LoggerFactory::builder().with_sink(sink).build().unwrap();

    let mut handles = Vec::new();
    for id in 0..16 {
        let logger = factory.logger("tasks");
        DiagnosticMap::current().put("task", id.to_string());
        DiagnosticStack::current().clear().push(format!("t{}", id));

        let task = WithContext::new(async move {
            let mut registries = Vec::new();
            for step in 0..3 {
                tokio::time::sleep(Duration::from_millis(1)).await;
                DiagnosticStack::current().push(format!("step{}", step));
                registries.push(logger.info().log_with(step).unwrap());
                DiagnosticStack::current().pop();
            }
            registries
        });
        handles.push((id, tokio::spawn(task)));
    }
    DiagnosticMap::current().clear();
    DiagnosticStack::current().clear();

    for (id, handle) in handles {
        for (step, registry) in handle.await.unwrap().into_iter().enumerate() {
            assert_eq!(registry.context().get("task"), Some(id.to_string().as_str()));
            assert_eq!(
                registry.stack(),
                &[format!("step{}", step), format!("t{}", id)]
            );
        }
    }
}

#[tokio::test]
async fn test_worker_context_untouched_by_task() {
    DiagnosticMap::current().put("owner", "test");

    let inner = DiagnosticMap::current().wrap_future(async {
        DiagnosticMap::current().put("owner", "task").put("extra", "1");
        tokio::task::yield_now().await;
        DiagnosticMap::current().get("extra")
    });

    DiagnosticMap::current().put("owner", "changed-after-capture");
    let seen = inner.await;

    assert_eq!(seen.as_deref(), Some("1"));
    assert_eq!(DiagnosticMap::current().get("owner").as_deref(), Some("changed-after-capture"));
    assert!(!DiagnosticMap::current().contains_key("extra"));
}

#[tokio::test]
async fn test_stack_only_wrapper_leaves_map_alone() {
    DiagnosticStack::current().clear().push("outer");

    let fut = DiagnosticStack::current().wrap_future(async {
        DiagnosticMap::current().put("leak", "yes");
        DiagnosticStack::current().snapshot()
    });
    DiagnosticStack::current().clear();

    assert_eq!(fut.await, vec!["outer".to_string()]);
    assert!(DiagnosticStack::current().is_empty());
    // Only the stack was wrapped, so map writes stay on this thread.
    assert_eq!(DiagnosticMap::current().get("leak").as_deref(), Some("yes"));
    DiagnosticMap::current().remove_thread_context();
}
