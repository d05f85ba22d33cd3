//! Shared helpers for the HTTP test modules.
//!
//! Wraps the service [`Fixture`] in the axum router and drives it with
//! `oneshot` requests.

#![allow(clippy::unwrap_used)]

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use serde_json::Value;
use tower::util::ServiceExt;

use super::{AppState, build_router};
use crate::test_helpers::{Fixture, SITE_TOKEN};

pub struct TestApp {
    pub fx: Fixture,
    pub router: Router,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::from_fixture(Fixture::new().await)
    }

    pub fn from_fixture(fx: Fixture) -> Self {
        let state = AppState {
            lifecycle: fx.lifecycle.clone(),
            tasks: fx.tasks.clone(),
            coordinator: fx.coordinator.clone(),
            registration: fx.registration.clone(),
            forwarder: fx.forwarder.clone(),
            snapshots: fx.snapshots.clone(),
        };
        Self {
            fx,
            router: build_router(state),
        }
    }

    /// Make `serial` the active snapshot with a rendered config per relay.
    pub fn write_snapshot(&self, serial: &str, relays: &[&str]) {
        self.fx.write_snapshot(serial, relays);
    }

    /// Send a request and return the status and the JSON body (`Null` when
    /// the body is empty).
    pub async fn call(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };
        (status, json)
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.call(Method::GET, uri, None, None).await
    }

    /// POST as the site user.
    pub async fn post_as_user(&self, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        self.call(Method::POST, uri, Some(SITE_TOKEN), body).await
    }
}
