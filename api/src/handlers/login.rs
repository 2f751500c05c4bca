use axum::{
    extract::State,
    response::{Html, IntoResponse, Redirect, Response},
    Form,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use common::models::Credentials;
use tera::Context;

use super::{render, ErrorResponse};
use crate::state::AppState;

/// Name of the cookie carrying the signed session token
pub const SESSION_COOKIE: &str = "pythonhub_session";

const INVALID_DETAILS: &str =
    "Invalid details. Please check your first name, last name, and password.";

fn login_context(error: Option<&str>, credentials: Option<&Credentials>) -> Context {
    let mut context = Context::new();
    context.insert("error", &error);
    if let Some(credentials) = credentials {
        context.insert("first", &credentials.first);
        context.insert("last", &credentials.last);
    }
    context
}

/// Display the login page
#[tracing::instrument]
pub async fn login_page() -> Result<Html<String>, ErrorResponse> {
    render("login.html", &login_context(None, None))
}

/// Check the submitted name and password against the allow-list
#[tracing::instrument(skip(state, jar, credentials))]
pub async fn login_submit(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(credentials): Form<Credentials>,
) -> Result<Response, ErrorResponse> {
    let Some(identity) = state.verifier.verify(&credentials) else {
        return Ok(render("login.html", &login_context(Some(INVALID_DETAILS), Some(&credentials)))?
            .into_response());
    };

    let token = state
        .sessions
        .issue(&identity)
        .map_err(|e| ErrorResponse::from(common::errors::ApiError::from(e)))?;
    let lifetime = state
        .sessions
        .lifetime()
        .map_err(|e| ErrorResponse::from(common::errors::ApiError::from(e)))?;

    let cookie = Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::seconds(lifetime.num_seconds()))
        .build();

    tracing::info!(user = %identity.display_name(), "Login successful");

    Ok((jar.add(cookie), Redirect::to("/")).into_response())
}

/// Drop the session cookie and return to the login page
#[tracing::instrument(skip(jar))]
pub async fn logout(jar: CookieJar) -> impl IntoResponse {
    let jar = jar.remove(Cookie::build((SESSION_COOKIE, "")).path("/"));
    (jar, Redirect::to("/login"))
}
