//! Forwarding of monitoring data sent by relays to the monitoring core.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::net::UnixStream;
use tracing::debug;

use crate::error::RelayError;
use crate::registry::RelayRegistry;
use crate::types::{RelayId, Serial};

/// Monitoring data as posted by a relay. `payload` is base64.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringData {
    pub serial: Serial,
    pub host: String,
    pub service: String,
    pub timestamp: i64,
    pub payload: String,
}

/// Decoded monitoring data ready for the sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub relay_id: RelayId,
    pub serial: Serial,
    pub host: String,
    pub service: String,
    pub timestamp: i64,
    pub payload: Vec<u8>,
}

impl Submission {
    /// Header line preceding the payload on the wire.
    pub fn header_line(&self) -> String {
        format!(
            "relay:{} serial:{} host:{} service:{} timestamp:{}\n",
            self.relay_id, self.serial, self.host, self.service, self.timestamp
        )
    }
}

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("cannot connect to {path}: {source}")]
    Connect {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("write failed: {0}")]
    Write(#[from] std::io::Error),
}

#[async_trait]
pub trait MonitoringSink: Send + Sync {
    async fn submit(&self, submission: &Submission) -> Result<(), SinkError>;
}

/// Sink writing to the monitoring core's raw data socket, one connection
/// per submission.
#[derive(Debug, Clone)]
pub struct UnixSocketSink {
    path: PathBuf,
}

impl UnixSocketSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl MonitoringSink for UnixSocketSink {
    async fn submit(&self, submission: &Submission) -> Result<(), SinkError> {
        let mut stream =
            UnixStream::connect(&self.path)
                .await
                .map_err(|source| SinkError::Connect {
                    path: self.path.clone(),
                    source,
                })?;
        stream
            .write_all(submission.header_line().as_bytes())
            .await?;
        stream.write_all(&submission.payload).await?;
        stream.shutdown().await?;
        Ok(())
    }
}

#[derive(Clone)]
pub struct MonitoringForwarder {
    registry: RelayRegistry,
    sink: Arc<dyn MonitoringSink>,
}

impl MonitoringForwarder {
    pub fn new(registry: RelayRegistry, sink: Arc<dyn MonitoringSink>) -> Self {
        Self { registry, sink }
    }

    /// Hand a relay's data to the sink. The relay must be known locally
    /// (`ACTIVE` or `PENDING_DELETION`).
    ///
    /// Header fields are space separated on the wire, so `serial`, `host`
    /// and `service` must not contain whitespace.
    pub async fn forward(&self, relay_id: &RelayId, data: MonitoringData) -> Result<(), RelayError> {
        self.registry.require_operable(relay_id).await?;

        for (field, value) in [
            ("serial", data.serial.as_str()),
            ("host", data.host.as_str()),
            ("service", data.service.as_str()),
        ] {
            if value.contains(char::is_whitespace) {
                return Err(RelayError::InvalidPayload(format!(
                    "{field} must not contain whitespace: {value:?}"
                )));
            }
        }

        let payload = relayhub_core::encoding::base64_decode(&data.payload)
            .map_err(|e| RelayError::InvalidPayload(e.to_string()))?;
        let submission = Submission {
            relay_id: relay_id.clone(),
            serial: data.serial,
            host: data.host,
            service: data.service,
            timestamp: data.timestamp,
            payload,
        };
        self.sink.submit(&submission).await?;

        debug!(
            relay_id = %relay_id,
            host = %submission.host,
            service = %submission.service,
            bytes = submission.payload.len(),
            "Monitoring data forwarded"
        );
        Ok(())
    }
}
