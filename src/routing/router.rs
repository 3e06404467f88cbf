//! Route table.
//!
//! Every (resource, operation) pair gets its own method router wrapped in the
//! same chain: correlation → logging → authorization. The endpoint behind the
//! chain only reaches the handler through the dispatcher.

use axum::{
    body::Bytes,
    extract::{Path, State},
    middleware,
    routing::{on, MethodFilter, MethodRouter},
    Extension, Router,
};
use tower::ServiceBuilder;

use crate::http::request::{correlate, RequestContext};
use crate::http::response::Envelope;
use crate::http::server::AppState;
use crate::observability::logging::log_exchange;
use crate::resources::handlers::{self, Invocation};
use crate::resources::{Animal, Person, Resource, ResourceKind};
use crate::routing::{Operation, RouteSpec};
use crate::security::authorize;

/// Operations reachable on `/{resource}` and `/{resource}/`. All but create
/// answer 400 for the missing id.
const COLLECTION_OPS: [Operation; 5] = [
    Operation::Create,
    Operation::Read,
    Operation::Replace,
    Operation::Patch,
    Operation::Delete,
];

const ITEM_OPS: [Operation; 4] = [Operation::Read, Operation::Replace, Operation::Patch, Operation::Delete];

/// Build the frozen router for every resource kind.
pub fn build_routes(state: AppState) -> Router {
    let mut router = Router::new();
    for kind in ResourceKind::ALL {
        router = match kind {
            ResourceKind::Person => mount::<Person>(router, &state),
            ResourceKind::Animal => mount::<Animal>(router, &state),
        };
        tracing::debug!(resource = %kind, "Routes mounted");
    }
    router.with_state(state)
}

fn mount<R: Resource>(router: Router<AppState>, state: &AppState) -> Router<AppState> {
    let base = format!("/{}", R::KIND.segment());

    let collection = COLLECTION_OPS
        .into_iter()
        .map(|op| decorated::<R>(state, op, false))
        .fold(MethodRouter::new(), MethodRouter::merge);
    let item = ITEM_OPS
        .into_iter()
        .map(|op| decorated::<R>(state, op, true))
        .fold(MethodRouter::new(), MethodRouter::merge);

    router
        .route(&base, collection.clone())
        .route(&format!("{base}/"), collection)
        .route(&format!("{base}/{{id}}"), item)
        .route(&format!("{base}/{{id}}/clone"), decorated::<R>(state, Operation::Clone, true))
}

/// One verb on one path, wrapped in the middleware chain.
fn decorated<R: Resource>(state: &AppState, operation: Operation, with_id: bool) -> MethodRouter<AppState> {
    let route = RouteSpec {
        resource: R::KIND,
        operation,
        timeout: state.policy.timeout_for(R::KIND, operation),
    };
    let filter = method_filter(operation);

    let endpoint = if with_id {
        on(
            filter,
            move |State(app): State<AppState>,
                  Extension(ctx): Extension<RequestContext>,
                  Path(id): Path<String>,
                  body: Bytes| async move { dispatch::<R>(app, ctx, operation, Some(id), body).await },
        )
    } else {
        on(
            filter,
            move |State(app): State<AppState>, Extension(ctx): Extension<RequestContext>, body: Bytes| async move {
                dispatch::<R>(app, ctx, operation, None, body).await
            },
        )
    };

    // First layer added is outermost.
    endpoint.layer(
        ServiceBuilder::new()
            .layer(middleware::from_fn_with_state(route, correlate))
            .layer(middleware::from_fn(log_exchange))
            .layer(middleware::from_fn_with_state(state.authorizer.clone(), authorize)),
    )
}

fn method_filter(operation: Operation) -> MethodFilter {
    match operation {
        Operation::Create | Operation::Clone => MethodFilter::POST,
        Operation::Read => MethodFilter::GET,
        Operation::Replace => MethodFilter::PUT,
        Operation::Patch => MethodFilter::PATCH,
        Operation::Delete => MethodFilter::DELETE,
    }
}

async fn dispatch<R: Resource>(
    app: AppState,
    ctx: RequestContext,
    operation: Operation,
    id: Option<String>,
    body: Bytes,
) -> Envelope {
    let store = app.store.bound_to(&ctx);
    let invocation = Invocation { operation, id, body };
    app.dispatcher
        .dispatch(&ctx, handlers::handle::<R>(store, invocation))
        .await
}
