use axum::{
    extract::State,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar};

use crate::handlers::login::SESSION_COOKIE;
use crate::state::AppState;

/// Session middleware that validates the signed session cookie
///
/// A valid session puts the signed-in `Identity` into the request
/// extensions; anything else is sent to the login page.
#[tracing::instrument(skip(state, req, next))]
pub async fn session_middleware(
    State(state): State<AppState>,
    mut req: Request<axum::body::Body>,
    next: Next,
) -> Response {
    let jar = CookieJar::from_headers(req.headers());
    let Some(token) = jar.get(SESSION_COOKIE).map(|c| c.value().to_string()) else {
        return Redirect::to("/login").into_response();
    };

    match state.sessions.validate(&token) {
        Ok(identity) => {
            req.extensions_mut().insert(identity);
            next.run(req).await
        }
        Err(e) => {
            tracing::warn!(error = %e, "Rejected session cookie");
            let jar = jar.remove(Cookie::build((SESSION_COOKIE, "")).path("/"));
            (jar, Redirect::to("/login")).into_response()
        }
    }
}
