//! # Invoker Sample
//!
//! Runs one request per calling convention, then a batch that shares a single plan.
//!
//! ```bash
//! RUST_LOG=info cargo run -p invoker-sample
//! RUST_LOG=debug cargo run -p invoker-sample
//! ```

use invoker_sample::catalog::Catalog;
use invoker_sample::model::{Order, Product, ProductCreate, Quote};
use invoker_sample::shop::Shop;
use resource_invoker::telemetry::setup_tracing;
use resource_invoker::{BoxError, Outcome, RequestData, TokioEngine};
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info, Instrument};

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    setup_tracing();

    info!("Starting shop");
    let catalog = Catalog::new();
    let widget = catalog.add(ProductCreate {
        name: "Super Widget".to_string(),
        price: 25.50,
        quantity: 100,
    });
    let gadget = catalog.add(ProductCreate {
        name: "Gadget".to_string(),
        price: 4.0,
        quantity: 3,
    });

    let shop = Shop::new(catalog, Some(Arc::new(TokioEngine::current()?)))?;

    // SYNC
    let outcome = shop
        .handle("products.get", RequestData::new().with_path_key("id", widget.0.to_string()))
        .await;
    log_outcome::<Product>("products.get", &outcome);

    // CALLBACK
    let outcome = shop
        .handle(
            "products.reserve",
            RequestData::new()
                .with_path_key("id", gadget.0.to_string())
                .with_query("quantity", "5"),
        )
        .await;
    log_outcome::<u32>("products.reserve", &outcome);

    // PROMISE
    let outcome = shop
        .handle(
            "pricing.quote",
            RequestData::new()
                .with_path_key("id", widget.0.to_string())
                .with_query("quantity", "12"),
        )
        .await;
    log_outcome::<Quote>("pricing.quote", &outcome);

    // TASK
    let span = tracing::info_span!("order_processing");
    let outcome = shop
        .handle(
            "orders.place",
            RequestData::new().with_entity(json!({ "product_id": widget.0, "quantity": 3 })),
        )
        .instrument(span)
        .await;
    log_outcome::<Order>("orders.place", &outcome);
    if let Some(attachments) = outcome.response_attachments() {
        info!(count = attachments.len(), "Receipts streamed");
    }

    // Batch: both async calls join one plan
    let outcomes = shop
        .handle_batch(vec![
            (
                "pricing.quote",
                RequestData::new()
                    .with_path_key("id", gadget.0.to_string())
                    .with_query("quantity", "2"),
            ),
            (
                "orders.place",
                RequestData::new().with_entity(json!({ "product_id": gadget.0, "quantity": 1 })),
            ),
            ("products.get", RequestData::new().with_path_key("id", "404")),
        ])
        .await;
    for outcome in &outcomes {
        if let Some(trace) = outcome.report().and_then(|r| r.trace.as_ref()) {
            info!(plan = trace.plan_id, tasks = trace.entries.len(), "Batch entry traced");
        }
    }
    log_outcome::<Quote>("batch pricing.quote", &outcomes[0]);
    log_outcome::<Order>("batch orders.place", &outcomes[1]);
    log_outcome::<Product>("batch products.get", &outcomes[2]);

    info!("Shop finished");
    Ok(())
}

fn log_outcome<T: std::fmt::Debug + 'static>(route: &str, outcome: &Outcome) {
    match outcome {
        Outcome::Success { result, .. } => match result.downcast_ref::<T>() {
            Some(value) => info!(route, ?value, "Succeeded"),
            None => error!(route, "Succeeded with an unexpected result type"),
        },
        Outcome::Error { error, .. } => error!(route, status = %error.status(), error = %error.message(), "Failed"),
    }
}
