use std::{net::SocketAddr, sync::Arc};

use axum::{
    extract::{
        rejection::{FormRejection, QueryRejection},
        DefaultBodyLimit, Query, State,
    },
    http::{header, HeaderMap, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
    Form, Json, Router,
};
use serde::Deserialize;
use server_api::{
    authorize, credentials, standard_registry, AuthResult, DispatchOutcome, Dispatcher,
};
use shared::protocol::{ActionRequest, Parameters};
use storage::{StoreAccessor, Storage};
use tower_http::limit::RequestBodyLimitLayer;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

mod app_state;
mod config;
mod session;
mod views;

use app_state::AppState;
use config::{load_settings, prepare_database_url, DEFAULT_SESSION_SECRET};
use session::SessionKeys;
use views::{error_page, login_page, CitizensPage, STORE_UNAVAILABLE_MESSAGE};

const MAX_FORM_BYTES: usize = 64 * 1024;
const INVALID_CREDENTIALS_MESSAGE: &str = "Nieprawidłowy login lub hasło";

#[derive(Debug, Deserialize)]
struct LoginForm {
    username: String,
    password: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let settings = load_settings();
    settings.validate()?;
    let database_url = prepare_database_url(&settings.database_url)?;
    let storage = Storage::new(&database_url).await.map_err(|error| {
        error!(
            %database_url,
            %error,
            "failed to open SQLite database; verify parent directory exists and permissions are correct"
        );
        error
    })?;

    if settings.session_secret == DEFAULT_SESSION_SECRET {
        warn!("APP__SESSION_SECRET is not set; sessions are signed with the development secret");
    }

    let registry = standard_registry()?;
    info!(actions = ?registry.action_ids(), "action registry ready");

    let state = AppState {
        storage,
        dispatcher: Dispatcher::new(Arc::new(registry), Arc::new(CitizensPage)),
        sessions: SessionKeys::new(
            &settings.session_secret,
            settings.session_ttl_seconds,
            settings.cookie_secure,
        ),
        login_path: settings.login_path,
        legacy_mount_path: settings.legacy_mount_path,
    };
    let app = build_router(Arc::new(state));

    let addr: SocketAddr = settings.server_bind.parse()?;
    info!(%addr, "server listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn build_router(state: Arc<AppState>) -> Router {
    let mut router = Router::new()
        .route("/", get(page).post(action))
        .route(
            &state.login_path,
            get(login_form)
                .post(login)
                .layer(RequestBodyLimitLayer::new(MAX_FORM_BYTES)),
        )
        .route("/logout", post(logout))
        .route("/healthz", get(healthz));

    if let Some(path) = state.legacy_mount_path.as_deref() {
        router = router.route(path, get(page).post(action));
    }

    // Dispatcher routes read their body inside the handler so the identity
    // gate decides before any body rejection is returned.
    router
        .layer(DefaultBodyLimit::max(MAX_FORM_BYTES))
        .with_state(state)
}

async fn healthz(State(state): State<Arc<AppState>>) -> Response {
    match state.storage.health_check().await {
        Ok(()) => "ok".into_response(),
        Err(error) => {
            warn!(error = %format!("{error:#}"), "health check failed");
            (StatusCode::SERVICE_UNAVAILABLE, "unavailable").into_response()
        }
    }
}

async fn page(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    query: Result<Query<Vec<(String, String)>>, QueryRejection>,
) -> Response {
    let pairs = match query {
        Ok(Query(pairs)) => pairs,
        Err(rejection) => {
            debug!(%rejection, "unreadable query string treated as empty");
            Vec::new()
        }
    };
    dispatch(&state, &headers, ActionRequest::get(Parameters::new(pairs))).await
}

/// A body that is not a readable form carries no action and renders the
/// page. Only an authenticated caller learns that the body was too large.
async fn action(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    form: Result<Form<Vec<(String, String)>>, FormRejection>,
) -> Response {
    let pairs = match form {
        Ok(Form(pairs)) => pairs,
        Err(rejection) => {
            let session = state.sessions.session_from_headers(&headers);
            if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE
                && matches!(authorize(session.as_ref()), AuthResult::Authorized(_))
            {
                return (StatusCode::PAYLOAD_TOO_LARGE, rejection.body_text()).into_response();
            }
            debug!(%rejection, "unreadable form body treated as empty");
            Vec::new()
        }
    };
    dispatch(&state, &headers, ActionRequest::post(Parameters::new(pairs))).await
}

async fn dispatch(state: &AppState, headers: &HeaderMap, request: ActionRequest) -> Response {
    let session = state.sessions.session_from_headers(headers);

    match state
        .dispatcher
        .handle(&request, session.as_ref(), &state.storage)
        .await
    {
        DispatchOutcome::Redirect => Redirect::to(&state.login_path).into_response(),
        DispatchOutcome::StoreUnavailable => store_unavailable(),
        DispatchOutcome::Routed(result) => Json(result).into_response(),
        DispatchOutcome::Page(html) => Html(html).into_response(),
        DispatchOutcome::RenderFailed => {
            (StatusCode::INTERNAL_SERVER_ERROR, Html(error_page())).into_response()
        }
    }
}

async fn login_form(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    if state.sessions.session_from_headers(&headers).is_some() {
        return Redirect::to("/").into_response();
    }
    Html(login_page(None, &state.login_path)).into_response()
}

async fn login(State(state): State<Arc<AppState>>, Form(form): Form<LoginForm>) -> Response {
    let mut store = match state.storage.acquire().await {
        Ok(store) => store,
        Err(error) => {
            error!(error = %format!("{error:#}"), "store unavailable during login");
            return store_unavailable();
        }
    };

    let identity = match credentials::authenticate(&mut store, &form.username, &form.password).await
    {
        Ok(Some(identity)) => identity,
        Ok(None) => {
            return (
                StatusCode::UNAUTHORIZED,
                Html(login_page(
                    Some(INVALID_CREDENTIALS_MESSAGE),
                    &state.login_path,
                )),
            )
                .into_response();
        }
        Err(error) => {
            error!(error = %format!("{error:#}"), "credential lookup failed");
            return store_unavailable();
        }
    };

    let token = match state.sessions.issue(&identity) {
        Ok(token) => token,
        Err(error) => {
            error!(%error, "failed to sign session token");
            return (StatusCode::INTERNAL_SERVER_ERROR, Html(error_page())).into_response();
        }
    };

    info!(user_id = identity.user_id.0, username = %identity.username, "officer logged in");
    (
        [(header::SET_COOKIE, state.sessions.set_cookie(&token))],
        Redirect::to("/"),
    )
        .into_response()
}

async fn logout(State(state): State<Arc<AppState>>) -> Response {
    (
        [(header::SET_COOKIE, state.sessions.clear_cookie())],
        Redirect::to(&state.login_path),
    )
        .into_response()
}

fn store_unavailable() -> Response {
    (StatusCode::SERVICE_UNAVAILABLE, STORE_UNAVAILABLE_MESSAGE).into_response()
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
