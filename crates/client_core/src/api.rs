//! Backend endpoints consumed by the profile view.

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::{de::DeserializeOwned, Serialize};
use shared::protocol::{
    CheckProfileRequest, CheckProfileResponse, ErrorBody, LogVisitRequest, SearchProfileRequest,
    SearchProfileResponse, UserPatch, ViewedProfile, CHECK_PROFILE_PATH, LOG_VISIT_PATH,
    SEARCH_PROFILE_PATH,
};
use tracing::debug;
use url::Url;

use crate::error::EndpointError;

/// Outcome of a profile lookup that came back with an OK status.
#[derive(Debug, Clone, PartialEq)]
pub enum ProfileLookup {
    Found {
        profile: ViewedProfile,
        user: Option<UserPatch>,
    },
    /// Soft error: the server answered, but with a message key such as
    /// `not-found` or `blocked` instead of a profile.
    Refused {
        message: String,
        user: Option<UserPatch>,
    },
}

#[async_trait]
pub trait ProfileApi: Send + Sync {
    async fn search_profile(
        &self,
        request: &SearchProfileRequest,
    ) -> Result<ProfileLookup, EndpointError>;
    async fn log_visit(&self, request: &LogVisitRequest) -> Result<(), EndpointError>;
    async fn check_profile(
        &self,
        request: &CheckProfileRequest,
    ) -> Result<CheckProfileResponse, EndpointError>;
}

pub struct HttpProfileApi {
    http: Client,
    base_url: Url,
}

impl HttpProfileApi {
    pub fn new(base_url: &str) -> Result<Self, EndpointError> {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(http: Client, base_url: &str) -> Result<Self, EndpointError> {
        let base_url =
            Url::parse(base_url).map_err(|e| EndpointError::InvalidUrl(format!("{base_url}: {e}")))?;
        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &'static str) -> Result<Url, EndpointError> {
        self.base_url
            .join(path)
            .map_err(|e| EndpointError::InvalidUrl(format!("{path}: {e}")))
    }

    async fn post<B: Serialize + Sync>(
        &self,
        path: &'static str,
        body: &B,
    ) -> Result<Response, EndpointError> {
        let url = self.endpoint(path)?;
        let res = self
            .http
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| EndpointError::Transport(e.to_string()))?;
        debug!(endpoint = path, status = res.status().as_u16(), "backend responded");
        Ok(res)
    }

    /// Turns a non-OK response into [`EndpointError::Status`], keeping the
    /// server's `error` field when the body has one.
    async fn reject(path: &'static str, res: Response) -> EndpointError {
        let status = res.status().as_u16();
        let error = res
            .json::<ErrorBody>()
            .await
            .ok()
            .and_then(|body| body.error)
            .filter(|e| !e.is_empty());
        EndpointError::Status {
            endpoint: path,
            status,
            error,
        }
    }

    async fn decode<T: DeserializeOwned>(path: &'static str, res: Response) -> Result<T, EndpointError> {
        res.json::<T>().await.map_err(|e| EndpointError::Decode {
            endpoint: path,
            message: e.to_string(),
        })
    }
}

#[async_trait]
impl ProfileApi for HttpProfileApi {
    async fn search_profile(
        &self,
        request: &SearchProfileRequest,
    ) -> Result<ProfileLookup, EndpointError> {
        let res = self.post(SEARCH_PROFILE_PATH, request).await?;
        if !res.status().is_success() {
            return Err(Self::reject(SEARCH_PROFILE_PATH, res).await);
        }

        let body: SearchProfileResponse = Self::decode(SEARCH_PROFILE_PATH, res).await?;
        if let Some(message) = body.soft_message() {
            return Ok(ProfileLookup::Refused {
                message: message.to_string(),
                user: body.user,
            });
        }
        let profile = body.matching_user_profile.ok_or(EndpointError::Decode {
            endpoint: SEARCH_PROFILE_PATH,
            message: "response carried neither a profile nor a message".to_string(),
        })?;
        Ok(ProfileLookup::Found {
            profile,
            user: body.user,
        })
    }

    async fn log_visit(&self, request: &LogVisitRequest) -> Result<(), EndpointError> {
        let res = self.post(LOG_VISIT_PATH, request).await?;
        if !res.status().is_success() {
            return Err(Self::reject(LOG_VISIT_PATH, res).await);
        }
        Ok(())
    }

    async fn check_profile(
        &self,
        request: &CheckProfileRequest,
    ) -> Result<CheckProfileResponse, EndpointError> {
        let res = self.post(CHECK_PROFILE_PATH, request).await?;
        if !res.status().is_success() {
            return Err(Self::reject(CHECK_PROFILE_PATH, res).await);
        }
        Self::decode(CHECK_PROFILE_PATH, res).await
    }
}

#[cfg(test)]
#[path = "tests/api_tests.rs"]
mod tests;
