//! Image endpoint.

use axum::{
    extract::State,
    http::{header, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
};
use imgcache::sniff;
use tracing::{error, warn};

use crate::metrics::Counter;
use crate::state::AppState;

/// Serve `?url=` through the cache.
///
/// Failures are deliberately opaque to clients: whatever went wrong, the
/// response is an empty 404.
pub(super) async fn serve(State(state): State<AppState>, method: Method, uri: Uri) -> Response {
    if method != Method::GET {
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    }

    let url = image_url(uri.query());
    if uri.path() == "/" && url.is_empty() {
        return StatusCode::OK.into_response();
    }

    // Resolve on a separate task so a client hanging up does not abort the
    // origin fetch or the cache write.
    let resolver = state.resolver();
    let task_url = url.clone();
    let resolved = tokio::spawn(async move { resolver.resolve(&task_url).await }).await;

    let body = match resolved {
        Ok(Ok(body)) => body,
        Ok(Err(e)) => {
            warn!(url = %url, error = %e, "Image request failed");
            return failure(&state);
        }
        Err(e) => {
            error!(url = %url, error = %e, "Resolve task failed");
            return failure(&state);
        }
    };

    // entries are re-sniffed on every serve, nothing else is stored
    let content_type = sniff::detect(&body);
    if !sniff::is_image(content_type) {
        warn!(url = %url, content_type = %content_type, "Cached payload is not an image");
        return failure(&state);
    }

    state.metrics().increment(Counter::RequestSuccess);
    ([(header::CONTENT_TYPE, content_type)], body).into_response()
}

fn failure(state: &AppState) -> Response {
    state.metrics().increment(Counter::RequestError);
    StatusCode::NOT_FOUND.into_response()
}

/// First `url` query parameter, form-decoded. Missing means empty.
fn image_url(query: Option<&str>) -> String {
    query
        .and_then(|q| {
            url::form_urlencoded::parse(q.as_bytes())
                .find(|(name, _)| name == "url")
                .map(|(_, value)| value.into_owned())
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(None, "")]
    #[case(Some(""), "")]
    #[case(Some("size=10"), "")]
    #[case(Some("url="), "")]
    #[case(Some("url=http://a/b.jpg"), "http://a/b.jpg")]
    #[case(Some("url=http%3A%2F%2Fa%2Fb.jpg"), "http://a/b.jpg")]
    #[case(Some("url=http://a/Emma+Watson.jpg"), "http://a/Emma Watson.jpg")]
    #[case(Some("url=first&url=second"), "first")]
    #[case(Some("w=1&url=x"), "x")]
    fn test_image_url(#[case] query: Option<&str>, #[case] expected: &str) {
        assert_eq!(image_url(query), expected);
    }
}
