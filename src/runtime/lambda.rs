//! AWS Lambda entry point.

use crate::dispatch::DispatchController;
use crate::http::{ApiGatewayEvent, ApiGatewayResponse};
use lambda_runtime::{service_fn, Error, LambdaEvent};
use std::sync::Arc;
use tracing::error;

async fn handle_request(
    controller: &DispatchController,
    event: LambdaEvent<ApiGatewayEvent>,
) -> Result<ApiGatewayResponse, Error> {
    controller.handle_event(event.payload).await.map_err(|err| {
        error!(error = %err, "Request failed");
        Error::from(err)
    })
}

/// Serve invocations until the runtime shuts the process down.
pub async fn run(controller: Arc<DispatchController>) -> Result<(), Error> {
    lambda_runtime::run(service_fn(move |event| {
        let controller = controller.clone();
        async move { handle_request(&controller, event).await }
    }))
    .await
}
