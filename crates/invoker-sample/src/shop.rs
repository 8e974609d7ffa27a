//! # Shop
//!
//! A minimal stand-in for the protocol layer: it owns the route table, turns request data
//! into arguments, and hands each request to the [`MethodInvoker`]. Batches go through the
//! [`Multiplexer`] so their async parts share one plan.

use crate::catalog::Catalog;
use crate::model::{OrderCreate, ProductId};
use crate::resources::{OrderResource, PricingResource, ProductResource};
use resource_invoker::{
    outcome_channel, payload, Argument, ArgumentBuilder, Arguments, BoxError, DescriptorError, Engine,
    ExecutionContext, ExecutionReportBuilder, HttpStatus, MethodInvoker, Multiplexer, Outcome, ParamRole,
    RequestData, ResourceMethodDescriptor, ResourceRegistry, RoutingResult, ServiceError, SubRequest,
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::{info, warn};

struct Route {
    descriptor: Arc<ResourceMethodDescriptor>,
    builder: Arc<dyn ArgumentBuilder>,
}

pub struct Shop {
    catalog: Catalog,
    invoker: MethodInvoker,
    multiplexer: Multiplexer,
    routes: HashMap<&'static str, Route>,
}

impl Shop {
    /// Registers every route. Fails if a descriptor does not match its interface.
    pub fn new(catalog: Catalog, engine: Option<Arc<dyn Engine>>) -> Result<Self, DescriptorError> {
        let registry = {
            let (products, pricing, orders) = (catalog.clone(), catalog.clone(), catalog.clone());
            ResourceRegistry::new()
                .register(move || ProductResource::new(products.clone()))
                .register(move || PricingResource::new(pricing.clone()))
                .register(move || OrderResource::new(orders.clone()))
        };
        let invoker = MethodInvoker::new(Arc::new(registry), engine);

        let mut routes = HashMap::new();
        routes.insert(
            "products.get",
            Route {
                descriptor: Arc::new(ResourceMethodDescriptor::sync::<ProductResource, _>(
                    "get",
                    vec![ParamRole::Regular],
                    ProductResource::get,
                )?),
                builder: Arc::new(|request: &RequestData, _: &RoutingResult| -> Result<Arguments, BoxError> {
                    Ok(Arguments::values([payload(path_id(request)?)]))
                }),
            },
        );
        routes.insert(
            "products.reserve",
            Route {
                descriptor: Arc::new(ResourceMethodDescriptor::callback::<ProductResource, _>(
                    "reserve",
                    vec![ParamRole::Regular, ParamRole::Regular, ParamRole::CallbackSlot],
                    ProductResource::reserve,
                )?),
                builder: Arc::new(|request: &RequestData, _: &RoutingResult| -> Result<Arguments, BoxError> {
                    Ok(Arguments::values([
                        payload(path_id(request)?),
                        payload(query_u32(request, "quantity")?),
                    ]))
                }),
            },
        );
        routes.insert(
            "pricing.quote",
            Route {
                descriptor: Arc::new(ResourceMethodDescriptor::promise::<PricingResource, _>(
                    "quote",
                    vec![ParamRole::ContextSlot, ParamRole::Regular, ParamRole::Regular],
                    PricingResource::quote,
                )?),
                builder: Arc::new(|request: &RequestData, _: &RoutingResult| -> Result<Arguments, BoxError> {
                    Ok(Arguments::new(vec![
                        Argument::Unbound,
                        Argument::Value(payload(path_id(request)?)),
                        Argument::Value(payload(query_u32(request, "quantity")?)),
                    ]))
                }),
            },
        );
        routes.insert(
            "orders.place",
            Route {
                descriptor: Arc::new(ResourceMethodDescriptor::task::<OrderResource, _>(
                    "place",
                    vec![ParamRole::Regular],
                    OrderResource::place,
                )?),
                builder: Arc::new(|request: &RequestData, _: &RoutingResult| -> Result<Arguments, BoxError> {
                    let entity = request
                        .entity
                        .clone()
                        .ok_or_else(|| ServiceError::new(HttpStatus::BAD_REQUEST, "missing order body"))?;
                    let params: OrderCreate = serde_json::from_value(entity)
                        .map_err(|e| ServiceError::new(HttpStatus::BAD_REQUEST, "malformed order body").with_cause(e))?;
                    Ok(Arguments::values([payload(params)]))
                }),
            },
        );

        info!(routes = routes.len(), "Shop ready");
        Ok(Self {
            catalog,
            multiplexer: Multiplexer::new(invoker.clone()),
            invoker,
            routes,
        })
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Handles one request and waits for its outcome.
    pub async fn handle(&self, route: &str, request: RequestData) -> Outcome {
        let Some(entry) = self.routes.get(route) else {
            return unknown_route(route);
        };
        let routing = RoutingResult::new(Arc::clone(&entry.descriptor), Arc::new(ExecutionContext::new()));
        let (sink, outcome) = outcome_channel();
        self.invoker.invoke(
            &request,
            &routing,
            entry.builder.as_ref(),
            sink,
            Some(Arc::new(ExecutionReportBuilder::new())),
        );
        outcome.await.unwrap_or_else(|_| lost_outcome())
    }

    /// Handles a batch under one shared plan. Outcomes come back in request order.
    pub async fn handle_batch(&self, requests: Vec<(&str, RequestData)>) -> Vec<Outcome> {
        let mut pending = Vec::with_capacity(requests.len());
        let mut batch = Vec::new();
        for (route, request) in requests {
            let Some(entry) = self.routes.get(route) else {
                pending.push(Pending::Ready(unknown_route(route)));
                continue;
            };
            let (sink, outcome) = outcome_channel();
            let routing = RoutingResult::new(Arc::clone(&entry.descriptor), Arc::new(ExecutionContext::new()));
            batch.push(
                SubRequest::new(request, routing, Arc::clone(&entry.builder), sink)
                    .with_report(Arc::new(ExecutionReportBuilder::new())),
            );
            pending.push(Pending::Waiting(outcome));
        }

        self.multiplexer.dispatch(batch);

        let mut outcomes = Vec::with_capacity(pending.len());
        for entry in pending {
            outcomes.push(match entry {
                Pending::Ready(outcome) => outcome,
                Pending::Waiting(receiver) => receiver.await.unwrap_or_else(|_| lost_outcome()),
            });
        }
        outcomes
    }
}

enum Pending {
    Ready(Outcome),
    Waiting(oneshot::Receiver<Outcome>),
}

fn path_id(request: &RequestData) -> Result<ProductId, ServiceError> {
    let raw = request
        .path_keys
        .get("id")
        .ok_or_else(|| ServiceError::new(HttpStatus::BAD_REQUEST, "missing path key `id`"))?;
    raw.parse::<u32>()
        .map(ProductId)
        .map_err(|e| ServiceError::new(HttpStatus::BAD_REQUEST, format!("invalid product id `{raw}`")).with_cause(e))
}

fn query_u32(request: &RequestData, name: &str) -> Result<u32, ServiceError> {
    let raw = request
        .query
        .get(name)
        .ok_or_else(|| ServiceError::new(HttpStatus::BAD_REQUEST, format!("missing query parameter `{name}`")))?;
    raw.parse::<u32>()
        .map_err(|e| ServiceError::new(HttpStatus::BAD_REQUEST, format!("invalid `{name}`: `{raw}`")).with_cause(e))
}

fn unknown_route(route: &str) -> Outcome {
    warn!(route, "Unknown route");
    Outcome::Error {
        error: ServiceError::new(HttpStatus::NOT_FOUND, format!("no route `{route}`")),
        report: None,
        request_attachments: None,
        response_attachments: None,
    }
}

fn lost_outcome() -> Outcome {
    Outcome::Error {
        error: ServiceError::internal("request finished without an outcome"),
        report: None,
        request_attachments: None,
        response_attachments: None,
    }
}
