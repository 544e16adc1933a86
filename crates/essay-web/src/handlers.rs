//! Request handlers, one per route.

use axum::extract::{Path, Query, State};
use axum::http::header::SET_COOKIE;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::{Extension, Form};
use essay_core::annotation::annotate;
use essay_core::history::{load_history_view, HistoryView};
use essay_core::hover::{transition, HoverEvent, HoverState};
use essay_core::routes::Route;
use essay_core::session::{Identity, SessionContext};
use essay_core::store::{RecordStore, StoreError};
use essay_core::submission::SubmissionDraft;
use essay_grader::flow::{SubmissionFlow, SubmitError};
use serde::Deserialize;
use tracing::{error, info, warn};

use crate::auth::{clear_session_cookie, request_token, session_cookie};
use crate::state::AppState;
use crate::views;

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub token: String,
}

#[derive(Debug, Deserialize)]
pub struct GradeForm {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ResultQuery {
    pub hover: Option<String>,
}

fn redirect_to(route: Route) -> Response {
    Redirect::to(&route.path()).into_response()
}

/// The signed-in identity, or a redirect to the login page.
///
/// `session_gate` already turns anonymous requests for protected routes
/// away; this only unwraps the identity for the handler.
fn require_identity(session: &SessionContext) -> Result<Identity, Response> {
    session
        .identity()
        .cloned()
        .ok_or_else(|| redirect_to(Route::Login))
}

pub async fn healthz() -> &'static str {
    "ok"
}

pub async fn landing(Extension(session): Extension<SessionContext>) -> Html<String> {
    Html(views::landing(session.identity()))
}

pub async fn login_page(Extension(session): Extension<SessionContext>) -> Response {
    if session.is_signed_in() {
        return redirect_to(Route::Dashboard);
    }
    Html(views::login(None)).into_response()
}

pub async fn login_submit(State(state): State<AppState>, Form(form): Form<LoginForm>) -> Response {
    let token = form.token.trim();
    let identity = if token.is_empty() {
        None
    } else {
        match state.db.resolve_session(token) {
            Ok(identity) => identity,
            Err(err) => {
                error!(error = %err, "session lookup failed");
                return (
                    StatusCode::SERVICE_UNAVAILABLE,
                    Html(views::login(Some("Sign-in is unavailable right now. Try again shortly."))),
                )
                    .into_response();
            }
        }
    };

    match identity {
        Some(identity) => {
            info!(user_id = %identity.id, "signed in");
            let cookie = session_cookie(&state.cookie_name, token, state.session_ttl);
            ([(SET_COOKIE, cookie)], Redirect::to(&Route::Dashboard.path())).into_response()
        }
        None => (
            StatusCode::UNAUTHORIZED,
            Html(views::login(Some("That session token is invalid or has expired."))),
        )
            .into_response(),
    }
}

pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Some(token) = request_token(&headers, &state.cookie_name) {
        match state.db.revoke_session(&token) {
            Ok(()) | Err(essay_db::DbError::SessionNotFound) => {}
            Err(err) => warn!(error = %err, "session revoke failed"),
        }
    }
    (
        [(SET_COOKIE, clear_session_cookie(&state.cookie_name))],
        Redirect::to(&Route::Landing.path()),
    )
        .into_response()
}

pub async fn signup() -> Html<String> {
    Html(views::signup())
}

pub async fn dashboard(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
) -> Response {
    match load_history_view(&session, &state.db) {
        HistoryView::SignInRequired => redirect_to(Route::Login),
        HistoryView::Entries(entries) => match session.identity() {
            Some(identity) => Html(views::dashboard(identity, &entries)).into_response(),
            None => redirect_to(Route::Login),
        },
    }
}

pub async fn grade_new_page(Extension(session): Extension<SessionContext>) -> Response {
    let identity = match require_identity(&session) {
        Ok(identity) => identity,
        Err(redirect) => return redirect,
    };
    Html(views::grade_new(&identity, &SubmissionDraft::default(), None)).into_response()
}

pub async fn grade_new_submit(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
    Form(form): Form<GradeForm>,
) -> Response {
    let identity = match require_identity(&session) {
        Ok(identity) => identity,
        Err(redirect) => return redirect,
    };
    let draft = SubmissionDraft::new(form.title, form.body);

    // Dropping this request (client gone) or shutting down cancels grading.
    let cancel = state.shutdown.child_token();
    let _cancel_on_drop = cancel.clone().drop_guard();

    let mut flow = SubmissionFlow::new(state.grader.as_ref(), state.policy.clone());
    match flow.submit(&session, &draft, &state.db, &cancel).await {
        Ok(nav) => Redirect::to(&nav.to.path()).into_response(),
        Err(SubmitError::Unauthenticated) => redirect_to(Route::Login),
        Err(SubmitError::Validation(err)) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Html(views::grade_new(&identity, &draft, Some(&err.to_string()))),
        )
            .into_response(),
        Err(err @ (SubmitError::Grading(_) | SubmitError::Cancelled)) => {
            let message = format!("We could not grade your essay: {err}. Please try again.");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Html(views::grade_new(&identity, &draft, Some(&message))),
            )
                .into_response()
        }
        Err(err @ SubmitError::NotReady { .. }) => (
            StatusCode::CONFLICT,
            Html(views::grade_new(&identity, &draft, Some(&err.to_string()))),
        )
            .into_response(),
        Err(SubmitError::Store(err)) => {
            error!(error = %err, "saving graded essay failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Html(views::error_page(
                    Some(&identity),
                    "Your essay was graded but could not be saved.",
                )),
            )
                .into_response()
        }
    }
}

pub async fn grade_result(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
    Path(id): Path<String>,
    Query(query): Query<ResultQuery>,
) -> Response {
    let identity = match require_identity(&session) {
        Ok(identity) => identity,
        Err(redirect) => return redirect,
    };

    let record = match state.db.get_for_owner(&identity.id, &id) {
        Ok(record) => record,
        Err(StoreError::NotFound) => {
            return (StatusCode::NOT_FOUND, Html(views::not_found(Some(&identity))))
                .into_response();
        }
        Err(err) => {
            error!(essay_id = %id, error = %err, "loading essay failed");
            return (
                StatusCode::SERVICE_UNAVAILABLE,
                Html(views::error_page(
                    Some(&identity),
                    "This essay could not be loaded right now.",
                )),
            )
                .into_response();
        }
    };

    let body = annotate(&record.body, &record.annotations);
    let hover = match query.hover {
        Some(span) => transition(&HoverState::Idle, &HoverEvent::PointerEnter(span), &body).0,
        None => HoverState::Idle,
    };
    Html(views::grade_result(&identity, &record, &body, &hover)).into_response()
}

pub async fn not_found(Extension(session): Extension<SessionContext>) -> Response {
    (StatusCode::NOT_FOUND, Html(views::not_found(session.identity()))).into_response()
}
