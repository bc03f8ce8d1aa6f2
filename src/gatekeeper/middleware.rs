use std::sync::Arc;

use axum::{
    Json,
    extract::{Request, State},
    http::{HeaderValue, header::CONTENT_TYPE},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tower_sessions::Session;

use super::{Classification, Decision, Gatekeeper, SessionSnapshot};
use crate::found;

/// gatekeeper_middleware
///
/// Axum adapter around [`Gatekeeper`]. Classifies the request, reads the session
/// only when the path is guarded, then either runs the handler, redirects to a
/// login page, or answers a preflight. The fixed CORS headers are written onto
/// whichever response comes out.
///
/// A session store failure on a guarded path counts as "not logged in".
pub async fn gatekeeper_middleware(
    State(gate): State<Arc<Gatekeeper>>,
    session: Session,
    request: Request,
    next: Next,
) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_owned();

    let classification = gate.classify(&method, &path);
    tracing::debug!(%method, %path, ?classification, "gatekeeper classified request");

    let decision = match classification {
        Classification::Preflight => Decision::Preflight,
        Classification::StaticAsset | Classification::Public { .. } => Decision::Pass,
        Classification::Guarded(realm) => {
            let snapshot = match SessionSnapshot::load(&session, &[gate.session_key(realm)]).await
            {
                Ok(snapshot) => snapshot,
                Err(error) => {
                    tracing::warn!(
                        %path,
                        ?realm,
                        %error,
                        "session lookup failed, treating as anonymous"
                    );
                    SessionSnapshot::default()
                }
            };
            let decision = gate.authorize(realm, &snapshot);
            if let Decision::Redirect(location) = &decision {
                tracing::info!(
                    %method,
                    %path,
                    ?realm,
                    %location,
                    "redirecting unauthenticated request"
                );
            }
            decision
        }
    };

    let mut response = match decision {
        Decision::Preflight => preflight_response(),
        Decision::Pass => next.run(request).await,
        Decision::Redirect(location) => found(&location),
    };

    for (name, value) in gate.cors_headers() {
        response.headers_mut().insert(name.clone(), value.clone());
    }

    response
}

fn preflight_response() -> Response {
    let mut response = Json(serde_json::Map::new()).into_response();
    response.headers_mut().insert(
        CONTENT_TYPE,
        HeaderValue::from_static("application/json; charset=utf-8"),
    );
    response
}
