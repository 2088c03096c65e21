use std::{future::Future, pin::pin, time::Duration};

use futures_util::future::{select, Either};
use reqwest::{
    header::{HeaderMap, HeaderName, HeaderValue},
    StatusCode,
};
use serde::de::DeserializeOwned;

use crate::{
    request::RequestState,
    transport::{HttpRequest, HttpResponse},
    ApiError, PostgrestClient, PostgrestError, Result, Transport,
};

/// Sends `state` and decodes a 2xx payload into `R`; `None` on 204.
pub(crate) async fn execute<T, R>(client: &PostgrestClient<T>, state: RequestState) -> Result<Option<R>>
where
    T: Transport,
    R: DeserializeOwned,
{
    let response = dispatch(client, state).await?;
    decode_payload(response)
}

/// Sends `state` and checks the status without decoding a success payload.
pub(crate) async fn execute_discard<T>(client: &PostgrestClient<T>, state: RequestState) -> Result<()>
where
    T: Transport,
{
    dispatch(client, state).await.map(|_| ())
}

/// Races [`execute`] against `signal`.
pub(crate) async fn execute_with_cancellation<T, R, F>(
    client: &PostgrestClient<T>,
    state: RequestState,
    signal: F,
) -> Result<Option<R>>
where
    T: Transport,
    R: DeserializeOwned,
    F: Future<Output = ()>,
{
    race_signal(execute::<T, R>(client, state), signal).await
}

/// Races [`execute_discard`] against `signal`.
pub(crate) async fn execute_discard_with_cancellation<T, F>(
    client: &PostgrestClient<T>,
    state: RequestState,
    signal: F,
) -> Result<()>
where
    T: Transport,
    F: Future<Output = ()>,
{
    race_signal(execute_discard(client, state), signal).await
}

/// Drops the in-flight `request` if `signal` completes first.
async fn race_signal<O, Q, F>(request: Q, signal: F) -> Result<O>
where
    Q: Future<Output = Result<O>>,
    F: Future<Output = ()>,
{
    let request = pin!(request);
    let signal = pin!(signal);
    match select(request, signal).await {
        Either::Left((result, _)) => result,
        Either::Right(((), _)) => {
            #[cfg(feature = "tracing")]
            tracing::debug!("request cancelled by caller signal");
            Err(PostgrestError::Cancelled)
        }
    }
}

async fn dispatch<T: Transport>(client: &PostgrestClient<T>, state: RequestState) -> Result<HttpResponse> {
    let request = build_request(client, state)?;

    #[cfg(feature = "tracing")]
    tracing::debug!("dispatching {} {}", request.method, request.url);

    let response = client.transport().send(request).await?;

    #[cfg(feature = "tracing")]
    tracing::debug!("received response status {}", response.status);

    check_status(response)
}

/// Resolves `state` against the client's base URL and default headers.
pub(crate) fn build_request<T>(client: &PostgrestClient<T>, mut state: RequestState) -> Result<HttpRequest>
where
    T: Transport,
{
    let body = state
        .take_body()
        .transpose()
        .map_err(|err| PostgrestError::Encode(format!("invalid request body: {err}")))?;

    let relative = state.path().strip_prefix('/').unwrap_or(state.path());
    let mut url = client.base_url().clone();
    url.path_segments_mut()
        .map_err(|()| {
            PostgrestError::Config(format!("base url '{}' cannot carry a path", client.base_url()))
        })?
        .pop_if_empty()
        .extend(relative.split('/'));
    if !state.query().is_empty() {
        url.query_pairs_mut().extend_pairs(state.query().iter());
    }

    let mut merged = client.headers().clone();
    merged.overlay(state.headers());
    let mut headers = HeaderMap::new();
    for (raw_name, raw_value) in merged.iter() {
        let name = HeaderName::from_bytes(raw_name.as_bytes()).map_err(|err| {
            PostgrestError::Encode(format!("invalid header name '{raw_name}': {err}"))
        })?;
        let value = HeaderValue::from_str(raw_value).map_err(|err| {
            PostgrestError::Encode(format!("invalid value for header '{raw_name}': {err}"))
        })?;
        headers.insert(name, value);
    }

    Ok(HttpRequest {
        method: state.method().clone(),
        url,
        headers,
        body,
        timeout: Some(Duration::from_millis(client.options().timeout_ms)),
    })
}

fn check_status(response: HttpResponse) -> Result<HttpResponse> {
    if response.status.is_success() {
        return Ok(response);
    }

    let mut error = serde_json::from_str::<ApiError>(&response.body).map_err(|err| {
        PostgrestError::Decode(format!(
            "invalid error response JSON for status {}: {err}; body: {}",
            response.status, response.body
        ))
    })?;
    error.status = response.status.as_u16();

    #[cfg(feature = "tracing")]
    tracing::warn!("request rejected with status {}: {}", error.status, error);

    Err(PostgrestError::Api(error))
}

fn decode_payload<R: DeserializeOwned>(response: HttpResponse) -> Result<Option<R>> {
    if response.status == StatusCode::NO_CONTENT {
        return Ok(None);
    }

    serde_json::from_str::<R>(&response.body)
        .map(Some)
        .map_err(|err| {
            PostgrestError::Decode(format!(
                "invalid response JSON: {err}; body: {}",
                response.body
            ))
        })
}
