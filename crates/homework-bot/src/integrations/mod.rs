//! HTTP adapters for the collaborator traits in [`crate::workflows::homework::ports`].

pub mod gitlab;
pub mod recruitee;

pub use gitlab::{ForkPolling, GitlabClient};
pub use recruitee::RecruiteeClient;

use reqwest::{Response, Url};
use serde::de::DeserializeOwned;

use crate::workflows::homework::{ClientError, ClientResult, Service};

const USER_AGENT: &str = concat!("homework-bot/", env!("CARGO_PKG_VERSION"));

fn transport(service: Service) -> impl Fn(reqwest::Error) -> ClientError {
    move |err| ClientError::Transport {
        service,
        message: err.to_string(),
    }
}

/// Appends `segments` to `base`, percent-encoding each one.
fn endpoint<'a>(
    service: Service,
    base: &Url,
    segments: impl IntoIterator<Item = &'a str>,
) -> ClientResult<Url> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|()| ClientError::Transport {
            service,
            message: format!("{base} cannot be used as a base URL"),
        })?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

fn parse_base(service: Service, raw: &str) -> ClientResult<Url> {
    Url::parse(raw).map_err(|err| ClientError::Transport {
        service,
        message: format!("invalid base URL '{raw}': {err}"),
    })
}

async fn expect_success(service: Service, response: Response) -> ClientResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ClientError::UnexpectedStatus {
        service,
        status: status.as_u16(),
        body,
    })
}

async fn decode<T: DeserializeOwned>(service: Service, response: Response) -> ClientResult<T> {
    let response = expect_success(service, response).await?;
    response.json::<T>().await.map_err(|err| ClientError::Decode {
        service,
        message: err.to_string(),
    })
}
