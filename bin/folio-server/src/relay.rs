//! Forwards an upstream event stream to the caller unchanged.
//!
//! The first chunk is awaited before any header is committed, so a stream
//! that fails immediately still gets a proper JSON error. After that the
//! status is fixed: a later upstream error is logged and simply ends the
//! body.

use std::convert::Infallible;
use std::fmt::Display;

use axum::body::Body;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::Response;
use bytes::Bytes;
use futures::{Stream, StreamExt, future, stream};
use tracing::{debug, warn};

use crate::error::ServerError;

pub const EVENT_STREAM: &str = "text/event-stream";

pub async fn relay<S, E>(mut upstream: S) -> Result<Response, ServerError>
where
    S: Stream<Item = Result<Bytes, E>> + Send + Unpin + 'static,
    E: Display + Send + 'static,
{
    let first = match upstream.next().await {
        Some(Ok(chunk)) => Some(chunk),
        Some(Err(e)) => return Err(ServerError::Stream(e.to_string())),
        None => None,
    };
    debug!(first_chunk = first.as_ref().map(Bytes::len), "relaying upstream stream");

    let rest = upstream
        .map(|item| item.inspect_err(|e| warn!(error = %e, "upstream stream failed, closing relay")))
        .take_while(|item| future::ready(item.is_ok()))
        .filter_map(|item| future::ready(item.ok()));

    let body = stream::iter(first).chain(rest).map(Ok::<Bytes, Infallible>);

    let mut response = Response::new(Body::from_stream(body));
    *response.status_mut() = StatusCode::OK;
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(EVENT_STREAM));
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
    headers.insert("x-accel-buffering", HeaderValue::from_static("no"));
    Ok(response)
}

#[cfg(test)]
mod test {
    use axum::response::IntoResponse;
    use http_body_util::BodyExt;

    use super::*;

    async fn body_text(response: Response) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn chunks(
        items: Vec<Result<&'static str, &'static str>>,
    ) -> impl Stream<Item = Result<Bytes, String>> + Send + Unpin {
        stream::iter(
            items
                .into_iter()
                .map(|i| i.map(|s| Bytes::from_static(s.as_bytes())).map_err(str::to_owned)),
        )
    }

    #[tokio::test]
    async fn forwards_bytes_in_order_with_headers() {
        let response = relay(chunks(vec![Ok("data: a\n\n"), Ok("data: b\n\n"), Ok("data: [DONE]\n\n")]))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let headers = response.headers();
        assert_eq!(headers[header::CONTENT_TYPE], EVENT_STREAM);
        assert_eq!(headers[header::CACHE_CONTROL], "no-cache");
        assert_eq!(headers[header::CONNECTION], "keep-alive");
        assert_eq!(headers["x-accel-buffering"], "no");

        assert_eq!(body_text(response).await, "data: a\n\ndata: b\n\ndata: [DONE]\n\n");
    }

    #[tokio::test]
    async fn empty_upstream_ends_body() {
        let response = relay(chunks(vec![])).await.unwrap();
        assert_eq!(body_text(response).await, "");
    }

    #[tokio::test]
    async fn early_failure_is_a_json_error() {
        let err = relay(chunks(vec![Err("reset"), Ok("data: a\n\n")])).await.unwrap_err();
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_text(response).await, r#"{"error":"Stream error","details":"reset"}"#);
    }

    #[tokio::test]
    async fn late_failure_truncates_body() {
        let response = relay(chunks(vec![Ok("data: a\n\n"), Err("reset"), Ok("data: b\n\n")]))
            .await
            .unwrap();
        assert_eq!(body_text(response).await, "data: a\n\n");
    }
}
