//! Bus transport over Zenoh.
//!
//! A registered service is announced with a liveliness token and answers
//! queries on its attribute keys from its [`ItemTable`]. Value changes are
//! `put` on the same keys so subscribers see updates as they happen. See
//! [`chargemeter_common::keyexpr`] for the key layout.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use zenoh::Session;
use zenoh::key_expr::KeyExpr;
use zenoh::liveliness::LivelinessToken;
use zenoh::query::Query;

use chargemeter_common::{BusKeys, BusValue, Format, RegisterOp, decode, encode};

use crate::bus::Bus;
use crate::error::{BusError, Result};
use crate::item::{ItemTable, RegisterResponse, WriteOutcome};

/// [`Bus`] implementation on a Zenoh session.
pub struct ZenohBus {
    session: Arc<Session>,
    keys: BusKeys,
    format: Format,
    /// Liveliness tokens of our registered services, kept for their lifetime.
    tokens: Mutex<Vec<LivelinessToken>>,
    /// Queryable and subscriber loops serving registered services.
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl ZenohBus {
    pub fn new(session: Arc<Session>, keys: BusKeys, format: Format) -> Self {
        Self {
            session,
            keys,
            format,
            tokens: Mutex::new(Vec::new()),
            tasks: Mutex::new(Vec::new()),
        }
    }

    pub fn keys(&self) -> &BusKeys {
        &self.keys
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    /// Write a path of another service, as an external participant.
    pub async fn write(&self, service: &str, path: &str, value: &BusValue) -> Result<()> {
        let key = self.keys.write_request(service, path);
        put_value(&self.session, &key, value, self.format).await
    }

    /// Send a register request to the register link item at `path` of a service.
    pub async fn request_register(
        &self,
        service: &str,
        path: &str,
        op: RegisterOp,
        register_id: u16,
        payload: &[u8],
    ) -> Result<Option<RegisterResponse>> {
        let key = self.keys.register_request(service, op, register_id, path);
        let replies = self
            .session
            .get(&key)
            .payload(payload.to_vec())
            .await
            .map_err(|e| BusError::read(&key, e))?;

        while let Ok(reply) = replies.recv_async().await {
            match reply.result() {
                Ok(sample) => {
                    let bytes = sample.payload().to_bytes();
                    return Ok(Some(decode(&bytes, self.format)?));
                }
                Err(err) => {
                    tracing::debug!(key = %key, error = ?err, "Register request error reply");
                }
            }
        }
        Ok(None)
    }

    /// Stop serving registered services and drop their liveliness tokens.
    pub async fn shutdown(&self) {
        for task in self.tasks.lock().await.drain(..) {
            task.abort();
        }
        let count = {
            let mut tokens = self.tokens.lock().await;
            let count = tokens.len();
            tokens.clear();
            count
        };
        if count > 0 {
            tracing::debug!(count = count, "Service liveliness tokens undeclared");
        }
    }

    async fn serve_attributes(&self, service: &str, items: Arc<ItemTable>) -> Result<JoinHandle<()>> {
        let queryable = self
            .session
            .declare_queryable(self.keys.service_wildcard(service))
            .await
            .map_err(|e| registration_error(service, e))?;

        let keys = self.keys.clone();
        let format = self.format;
        let service = service.to_string();

        Ok(tokio::spawn(async move {
            while let Ok(query) = queryable.recv_async().await {
                answer_attribute_query(&query, &keys, &service, &items, format).await;
            }
        }))
    }

    async fn serve_writes(&self, service: &str, items: Arc<ItemTable>) -> Result<JoinHandle<()>> {
        let subscriber = self
            .session
            .declare_subscriber(self.keys.write_wildcard(service))
            .await
            .map_err(|e| registration_error(service, e))?;

        let session = self.session.clone();
        let keys = self.keys.clone();
        let format = self.format;
        let service = service.to_string();

        Ok(tokio::spawn(async move {
            while let Ok(sample) = subscriber.recv_async().await {
                let Some(path) = keys.parse_write_request(&service, sample.key_expr().as_str())
                else {
                    continue;
                };
                let bytes = sample.payload().to_bytes();
                let value: BusValue = match decode(&bytes, format) {
                    Ok(value) => value,
                    Err(e) => {
                        tracing::warn!(path = %path, error = %e, "Undecodable write request");
                        continue;
                    }
                };

                match items.write_external(&path, value.clone()) {
                    WriteOutcome::Accepted => {
                        tracing::debug!(path = %path, value = %value, "External write accepted");
                        let key = keys.attribute(&service, &path);
                        if let Err(e) = put_value(&session, &key, &value, format).await {
                            tracing::warn!(key = %key, error = %e, "Failed to announce write");
                        }
                    }
                    outcome => {
                        tracing::debug!(path = %path, outcome = ?outcome, "External write refused");
                    }
                }
            }
        }))
    }

    async fn serve_registers(&self, service: &str, items: Arc<ItemTable>) -> Result<JoinHandle<()>> {
        let queryable = self
            .session
            .declare_queryable(self.keys.register_wildcard(service))
            .await
            .map_err(|e| registration_error(service, e))?;

        let keys = self.keys.clone();
        let format = self.format;
        let service = service.to_string();

        Ok(tokio::spawn(async move {
            while let Ok(query) = queryable.recv_async().await {
                let Some((op, register_id, path)) =
                    keys.parse_register_request(&service, query.key_expr().as_str())
                else {
                    continue;
                };

                let response = match op {
                    RegisterOp::Get => items.register_get(&path, register_id),
                    RegisterOp::Set => {
                        let payload = query
                            .payload()
                            .map(|p| p.to_bytes().into_owned())
                            .unwrap_or_default();
                        items.register_set(&path, register_id, &payload)
                    }
                };

                match encode(&response, format) {
                    Ok(payload) => {
                        if let Err(e) = query.reply(query.key_expr().clone(), payload).await {
                            tracing::warn!(path = %path, error = %e, "Failed to answer register request");
                        }
                    }
                    Err(e) => tracing::warn!(error = %e, "Failed to encode register response"),
                }
            }
        }))
    }
}

impl std::fmt::Debug for ZenohBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ZenohBus")
            .field("prefix", &self.keys.prefix())
            .field("format", &self.format)
            .finish()
    }
}

/// Answer a query on a service's attribute keys.
///
/// A query may name a single path or a wildcard; every declared path whose
/// key intersects the query is answered.
async fn answer_attribute_query(
    query: &Query,
    keys: &BusKeys,
    service: &str,
    items: &ItemTable,
    format: Format,
) {
    for (path, value) in items.snapshot() {
        let key = keys.attribute(service, &path);
        let Ok(key_expr) = KeyExpr::try_from(key.as_str()) else {
            continue;
        };
        if !query.key_expr().intersects(&key_expr) {
            continue;
        }

        match encode(&value, format) {
            Ok(payload) => {
                if let Err(e) = query.reply(key_expr.clone(), payload).await {
                    tracing::warn!(key = %key, error = %e, "Failed to answer attribute query");
                }
            }
            Err(e) => tracing::warn!(key = %key, error = %e, "Failed to encode attribute"),
        }
    }
}

/// Encode `value` and put it on `key`, tagged with the format's MIME type.
async fn put_value(session: &Session, key: &str, value: &BusValue, format: Format) -> Result<()> {
    let payload = encode(value, format)?;

    session
        .put(key, payload)
        .encoding(format.mime_type())
        .await
        .map_err(|e| BusError::Publish {
            key: key.to_string(),
            message: e.to_string(),
        })
}

fn registration_error(service: &str, err: impl ToString) -> BusError {
    BusError::Registration {
        service: service.to_string(),
        message: err.to_string(),
    }
}

#[async_trait]
impl Bus for ZenohBus {
    async fn live_participants(&self) -> Result<Vec<String>> {
        let wildcard = self.keys.liveliness_wildcard();
        let replies = self
            .session
            .liveliness()
            .get(&wildcard)
            .await
            .map_err(|e| BusError::liveliness(format!("Failed to query {}: {}", wildcard, e)))?;

        let mut names: Vec<String> = Vec::new();
        while let Ok(reply) = replies.recv_async().await {
            if let Ok(sample) = reply.result() {
                if let Some(name) = self.keys.parse_liveliness(sample.key_expr().as_str()) {
                    if !names.iter().any(|n| n == name) {
                        names.push(name.to_string());
                    }
                }
            }
        }
        Ok(names)
    }

    async fn read(&self, service: &str, path: &str) -> Result<Option<BusValue>> {
        let key = self.keys.attribute(service, path);
        let replies = self
            .session
            .get(&key)
            .await
            .map_err(|e| BusError::read(&key, e))?;

        while let Ok(reply) = replies.recv_async().await {
            match reply.result() {
                Ok(sample) => {
                    let bytes = sample.payload().to_bytes();
                    let value = decode(&bytes, self.format)
                        .map_err(|e| BusError::read(&key, format!("undecodable value: {}", e)))?;
                    return Ok(Some(value));
                }
                Err(err) => {
                    tracing::debug!(key = %key, error = ?err, "Error reply to attribute read");
                }
            }
        }
        Ok(None)
    }

    async fn publish(&self, service: &str, path: &str, value: &BusValue) -> Result<()> {
        let key = self.keys.attribute(service, path);
        put_value(&self.session, &key, value, self.format).await
    }

    async fn register(&self, service: &str, items: Arc<ItemTable>) -> Result<()> {
        let token_key = self.keys.liveliness(service);

        let attributes = self.serve_attributes(service, items.clone()).await?;
        let writes = self.serve_writes(service, items.clone()).await?;
        let registers = self.serve_registers(service, items.clone()).await?;
        self.tasks.lock().await.extend([attributes, writes, registers]);

        for (path, value) in items.snapshot() {
            if let Err(e) = self.publish(service, &path, &value).await {
                tracing::warn!(path = %path, error = %e, "Failed to publish initial value");
            }
        }

        // Announce last so readers find the service fully served.
        let token = self
            .session
            .liveliness()
            .declare_token(&token_key)
            .await
            .map_err(|e| {
                BusError::liveliness(format!("Failed to declare token {}: {}", token_key, e))
            })?;
        self.tokens.lock().await.push(token);

        tracing::info!(key = %token_key, "Service liveliness token declared");
        Ok(())
    }
}
