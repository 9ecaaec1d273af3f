use std::{panic::AssertUnwindSafe, sync::Arc};

use async_trait::async_trait;
use futures::FutureExt;
use shared::{
    domain::Identity,
    error::{ErrorCode, HandlerError},
    protocol::{ActionRequest, HandlerResult, Method, Parameters},
};
use storage::{StoreAccessor, StoreHandle};
use tracing::{debug, error, info, warn};

use crate::{
    gate::{authorize, AuthResult, Session},
    registry::ActionRegistry,
};

pub const GENERIC_FAILURE_MESSAGE: &str = "Wystąpił błąd podczas wykonywania akcji";

/// Produces the default page for requests that are not routed to an action.
#[async_trait]
pub trait ViewRenderer: Send + Sync {
    async fn render(&self, store: &mut StoreHandle, viewer: &Identity) -> anyhow::Result<String>;
}

/// The single path a request took through the dispatcher.
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    /// No valid session; send the caller to the login page.
    Redirect,
    /// The store accessor could not produce a handle.
    StoreUnavailable,
    /// Result of a routed action, including unknown actions.
    Routed(HandlerResult),
    /// Rendered default view.
    Page(String),
    RenderFailed,
}

#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<ActionRegistry>,
    renderer: Arc<dyn ViewRenderer>,
}

impl Dispatcher {
    pub fn new(registry: Arc<ActionRegistry>, renderer: Arc<dyn ViewRenderer>) -> Self {
        Self { registry, renderer }
    }

    pub async fn handle<A>(
        &self,
        request: &ActionRequest,
        session: Option<&Session>,
        store: &A,
    ) -> DispatchOutcome
    where
        A: StoreAccessor + ?Sized,
    {
        let caller = match authorize(session) {
            AuthResult::Authorized(identity) => identity,
            AuthResult::Unauthorized => {
                debug!(method = ?request.method(), "unauthenticated request redirected to login");
                return DispatchOutcome::Redirect;
            }
        };

        // Released when this function returns, whichever branch is taken.
        let mut handle = match store.acquire().await {
            Ok(handle) => handle,
            Err(error) => {
                error!(user_id = caller.user_id.0, error = %format!("{error:#}"), "store unavailable");
                return DispatchOutcome::StoreUnavailable;
            }
        };

        match routable_action(request) {
            Some(action) => {
                let result = self
                    .route(action, &mut handle, request.parameters(), &caller)
                    .await;
                DispatchOutcome::Routed(result)
            }
            None => self.render(&mut handle, &caller).await,
        }
    }

    async fn route(
        &self,
        action: &str,
        store: &mut StoreHandle,
        params: &Parameters,
        caller: &Identity,
    ) -> HandlerResult {
        let Some(handler) = self.registry.resolve(action) else {
            warn!(action, user_id = caller.user_id.0, "unknown action");
            return HandlerResult::unknown_action(action);
        };

        let outcome = AssertUnwindSafe(handler.execute(store, params, caller))
            .catch_unwind()
            .await;

        match outcome {
            Ok(Ok(result)) => {
                debug!(action, user_id = caller.user_id.0, success = result.success, "action handled");
                result
            }
            Ok(Err(err)) => {
                if matches!(err, HandlerError::Store(_)) {
                    error!(action, user_id = caller.user_id.0, error = %err, "action failed");
                } else {
                    info!(action, user_id = caller.user_id.0, error = %err, "action rejected");
                }
                HandlerResult::failure(err.code(), err.user_message())
            }
            Err(_) => {
                error!(action, user_id = caller.user_id.0, "action handler panicked");
                HandlerResult::failure(ErrorCode::Internal, GENERIC_FAILURE_MESSAGE)
            }
        }
    }

    async fn render(&self, store: &mut StoreHandle, caller: &Identity) -> DispatchOutcome {
        match self.renderer.render(store, caller).await {
            Ok(page) => DispatchOutcome::Page(page),
            Err(error) => {
                error!(user_id = caller.user_id.0, error = %format!("{error:#}"), "view rendering failed");
                DispatchOutcome::RenderFailed
            }
        }
    }
}

/// Only a POST with a non-empty `action` is routed; everything else renders.
fn routable_action(request: &ActionRequest) -> Option<&str> {
    if request.method() != Method::Post {
        return None;
    }
    request.action().filter(|action| !action.is_empty())
}

#[cfg(test)]
#[path = "tests/dispatcher_tests.rs"]
mod tests;
