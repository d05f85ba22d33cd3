//! Site relay directory backed by the site's REST API.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde::de::DeserializeOwned;
use tracing::debug;

use super::{RelayChange, SiteError, SiteRelayDirectory};
use crate::auth::UserAuth;
use crate::types::RelayId;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Deserialize)]
struct Collection<T> {
    value: Vec<T>,
}

#[derive(Deserialize)]
struct RelayObject {
    id: RelayId,
}

#[derive(Serialize)]
struct CreateRelay<'a> {
    id: &'a RelayId,
    alias: &'a str,
}

const RELAY_COLLECTION: &str = "domain-types/relay/collections/all";

pub struct RestSiteDirectory {
    client: reqwest::Client,
    base_url: String,
}

impl RestSiteDirectory {
    pub fn new(base_url: &str) -> Result<Self, SiteError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| SiteError::Unavailable(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        auth: &UserAuth,
    ) -> Result<T, SiteError> {
        let url = format!("{}/{path}", self.base_url);
        let response = self
            .client
            .get(&url)
            .bearer_auth(auth.token())
            .send()
            .await
            .map_err(|e| SiteError::Unavailable(format!("{url}: {e}")))?;

        check_status(response.status(), &url)?;
        response
            .json::<T>()
            .await
            .map_err(|e| SiteError::Malformed(format!("{url}: {e}")))
    }
}

fn check_status(status: StatusCode, url: &str) -> Result<(), SiteError> {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(SiteError::Unauthorized),
        status if !status.is_success() => Err(SiteError::Unavailable(format!(
            "HTTP error: {status} for URL: {url}"
        ))),
        _ => Ok(()),
    }
}

#[async_trait]
impl SiteRelayDirectory for RestSiteDirectory {
    async fn authenticate(&self, auth: &UserAuth) -> Result<(), SiteError> {
        self.get_json::<serde_json::Value>("version", auth).await?;
        Ok(())
    }

    async fn list_relays(&self, auth: &UserAuth) -> Result<HashSet<RelayId>, SiteError> {
        let relays: Collection<RelayObject> = self
            .get_json(RELAY_COLLECTION, auth)
            .await?;
        debug!(count = relays.value.len(), "Fetched site relay list");
        Ok(relays.value.into_iter().map(|r| r.id).collect())
    }

    async fn list_relay_changes(&self, auth: &UserAuth) -> Result<Vec<RelayChange>, SiteError> {
        let changes: Collection<RelayChange> = self
            .get_json("domain-types/activation_run/collections/pending_changes", auth)
            .await?;
        Ok(changes.value)
    }

    async fn create_relay(
        &self,
        auth: &UserAuth,
        relay_id: &RelayId,
        alias: &str,
    ) -> Result<(), SiteError> {
        let url = format!("{}/{RELAY_COLLECTION}", self.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(auth.token())
            .json(&CreateRelay { id: relay_id, alias })
            .send()
            .await
            .map_err(|e| SiteError::Unavailable(format!("{url}: {e}")))?;

        if response.status() == StatusCode::CONFLICT {
            debug!(relay_id = %relay_id, "Relay already configured on site");
            return Ok(());
        }
        check_status(response.status(), &url)?;
        debug!(relay_id = %relay_id, "Relay created on site");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::site::ChangeOp;
    use axum::Router;
    use axum::http::{HeaderMap, StatusCode as AxumStatus};
    use axum::routing::get;
    use tokio::net::TcpListener;

    const TOKEN: &str = "site-token";

    fn authorized(headers: &HeaderMap) -> bool {
        headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v == format!("Bearer {TOKEN}"))
    }

    /// Start a fake site API and return its base URL.
    async fn start_mock_site() -> String {
        let app = Router::new()
            .route(
                "/api/version",
                get(|headers: HeaderMap| async move {
                    if authorized(&headers) {
                        Ok(axum::Json(serde_json::json!({"version": "2.4.0"})))
                    } else {
                        Err(AxumStatus::UNAUTHORIZED)
                    }
                }),
            )
            .route(
                "/api/domain-types/relay/collections/all",
                get(|headers: HeaderMap| async move {
                    if authorized(&headers) {
                        Ok(axum::Json(
                            serde_json::json!({"value": [{"id": "r1"}, {"id": "r2"}]}),
                        ))
                    } else {
                        Err(AxumStatus::FORBIDDEN)
                    }
                })
                .post(
                    |headers: HeaderMap, axum::Json(body): axum::Json<serde_json::Value>| async move {
                        if !authorized(&headers) {
                            return AxumStatus::UNAUTHORIZED;
                        }
                        match body["id"].as_str() {
                            Some("r1" | "r2") => AxumStatus::CONFLICT,
                            Some(_) if body["alias"].is_string() => AxumStatus::OK,
                            _ => AxumStatus::BAD_REQUEST,
                        }
                    },
                ),
            )
            .route(
                "/api/domain-types/activation_run/collections/pending_changes",
                get(|| async {
                    axum::Json(serde_json::json!({
                        "value": [{"relay_id": "r3", "op": "DEL"}, {"relay_id": "r4", "op": "ADD"}]
                    }))
                }),
            );

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}/api/")
    }

    #[tokio::test]
    async fn lists_relays_with_bearer_token() {
        let site = RestSiteDirectory::new(&start_mock_site().await).unwrap();
        let auth = UserAuth::new(TOKEN);

        site.authenticate(&auth).await.unwrap();
        let relays = site.list_relays(&auth).await.unwrap();
        assert_eq!(
            relays,
            HashSet::from([RelayId::from("r1"), RelayId::from("r2")])
        );
    }

    #[tokio::test]
    async fn rejected_token_is_unauthorized() {
        let site = RestSiteDirectory::new(&start_mock_site().await).unwrap();
        let auth = UserAuth::new("wrong");

        assert!(matches!(
            site.authenticate(&auth).await.unwrap_err(),
            SiteError::Unauthorized
        ));
        assert!(matches!(
            site.list_relays(&auth).await.unwrap_err(),
            SiteError::Unauthorized
        ));
    }

    #[tokio::test]
    async fn pending_changes_keep_site_order() {
        let site = RestSiteDirectory::new(&start_mock_site().await).unwrap();
        let changes = site
            .list_relay_changes(&UserAuth::new(TOKEN))
            .await
            .unwrap();
        assert_eq!(
            changes,
            vec![
                RelayChange {
                    relay_id: "r3".into(),
                    op: ChangeOp::Del
                },
                RelayChange {
                    relay_id: "r4".into(),
                    op: ChangeOp::Add
                },
            ]
        );
    }

    #[tokio::test]
    async fn create_relay_posts_id_and_alias() {
        let site = RestSiteDirectory::new(&start_mock_site().await).unwrap();
        let auth = UserAuth::new(TOKEN);

        site.create_relay(&auth, &RelayId::from("r9"), "munich")
            .await
            .unwrap();
        // Already listed on the site.
        site.create_relay(&auth, &RelayId::from("r1"), "berlin")
            .await
            .unwrap();
        assert!(matches!(
            site.create_relay(&UserAuth::new("wrong"), &RelayId::from("r9"), "x")
                .await
                .unwrap_err(),
            SiteError::Unauthorized
        ));
    }

    #[tokio::test]
    async fn unreachable_site_is_unavailable() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let site = RestSiteDirectory::new(&format!("http://{addr}")).unwrap();
        assert!(matches!(
            site.list_relays(&UserAuth::new(TOKEN)).await.unwrap_err(),
            SiteError::Unavailable(_)
        ));
    }
}
