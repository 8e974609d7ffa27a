use resource_invoker::mock::{recording_sink, FixedArguments, MockEngine};
use resource_invoker::*;
use std::sync::Arc;

struct Inventory;
impl Resource for Inventory {}

fn routing(descriptor: ResourceMethodDescriptor) -> RoutingResult {
    RoutingResult::new(Arc::new(descriptor), Arc::new(ExecutionContext::new()))
}

fn stock_task() -> ResourceMethodDescriptor {
    ResourceMethodDescriptor::task::<Inventory, _>("stock", vec![ParamRole::Regular], |_, args| {
        let sku = args.get::<String>(0)?;
        Ok(Some(Task::new(format!("count {sku}"), move |plan: PlanContext| async move {
            Ok(payload((sku.len() as u32, plan.id())))
        })))
    })
    .unwrap()
}

/// A batch of async sub-requests shares a single top-level plan.
#[tokio::test]
async fn test_batch_shares_one_plan() {
    resource_invoker::telemetry::try_setup_tracing();
    let engine = Arc::new(MockEngine::delegating(TokioEngine::current().unwrap()));
    engine.expect_top_level_runs(1);
    let invoker = MethodInvoker::new(Arc::new(ResourceRegistry::new().register(|| Inventory)), Some(engine.clone()));
    let multiplexer = Multiplexer::new(invoker);

    let skus = ["apple", "kiwi", "banana"];
    let mut receivers = Vec::new();
    let mut batch = Vec::new();
    for sku in skus {
        let (sink, rx) = recording_sink();
        receivers.push(rx);
        batch.push(
            SubRequest::new(
                RequestData::new().with_path_key("sku", sku),
                routing(stock_task()),
                Arc::new(FixedArguments::new([payload(sku.to_string())])),
                sink,
            )
            .with_report(Arc::new(ExecutionReportBuilder::new())),
        );
    }

    multiplexer.dispatch(batch);

    let mut plans = Vec::new();
    for (sku, mut rx) in skus.into_iter().zip(receivers) {
        let outcome = rx.recv().await.unwrap();
        let (count, plan) = *outcome.result().unwrap().downcast_ref::<(u32, u64)>().unwrap();
        assert_eq!(count as usize, sku.len());
        assert_eq!(outcome.report().unwrap().trace.as_ref().unwrap().plan_id, plan);
        plans.push(plan);
    }
    assert!(plans.windows(2).all(|w| w[0] == w[1]));
    engine.verify();
}

/// Sync sub-requests run inside the batch too, each with its own outcome.
#[tokio::test]
async fn test_mixed_batch_delivers_every_outcome() {
    let invoker = MethodInvoker::new(
        Arc::new(ResourceRegistry::new().register(|| Inventory)),
        Some(Arc::new(TokioEngine::current().unwrap())),
    );
    let echo = ResourceMethodDescriptor::sync::<Inventory, _>("echo", vec![ParamRole::Regular], |_, args| {
        Ok(args.payload(0)?)
    })
    .unwrap();
    let broken = ResourceMethodDescriptor::sync::<Inventory, _>("broken", vec![], |_, _| {
        Err(ServiceError::new(HttpStatus::SERVICE_UNAVAILABLE, "warehouse offline").into())
    })
    .unwrap();

    let (echo_sink, mut echo_rx) = recording_sink();
    let (broken_sink, mut broken_rx) = recording_sink();
    let (stock_sink, mut stock_rx) = recording_sink();
    Multiplexer::new(invoker).dispatch(vec![
        SubRequest::new(
            RequestData::new(),
            routing(echo),
            Arc::new(FixedArguments::new([payload("pong")])),
            echo_sink.clone(),
        ),
        SubRequest::new(RequestData::new(), routing(broken), Arc::new(FixedArguments::none()), broken_sink.clone()),
        SubRequest::new(
            RequestData::new(),
            routing(stock_task()),
            Arc::new(FixedArguments::new([payload(String::from("pear"))])),
            stock_sink.clone(),
        ),
    ]);

    assert!(echo_rx.recv().await.unwrap().is_success());
    let broken = broken_rx.recv().await.unwrap();
    assert_eq!(broken.error().unwrap().status(), HttpStatus::SERVICE_UNAVAILABLE);
    assert!(stock_rx.recv().await.unwrap().is_success());
    assert_eq!(echo_sink.deliveries() + broken_sink.deliveries() + stock_sink.deliveries(), 3);
}

/// Without an engine the batch cannot share a plan; async entries fail individually.
#[tokio::test]
async fn test_batch_without_engine_fails_async_entries() {
    let invoker = MethodInvoker::new(Arc::new(ResourceRegistry::new().register(|| Inventory)), None);
    let (sink, mut rx) = recording_sink();

    Multiplexer::new(invoker).dispatch(vec![SubRequest::new(
        RequestData::new(),
        routing(stock_task()),
        Arc::new(FixedArguments::new([payload(String::from("fig"))])),
        sink,
    )]);

    let outcome = rx.recv().await.unwrap();
    let message = outcome.error().unwrap().message().to_string();
    assert!(message.contains("Inventory.stock"), "{message}");
}
