//! Pre-dispatch auxiliary client attachment.

use async_trait::async_trait;

use crate::context::WorkerContext;
use crate::error::WorkerError;
use crate::message::{AttachedClient, Event};

/// Given a decoded event, yields an auxiliary client (e.g. an SCM HTTP
/// client) to attach before handler dispatch. Grounded on the teacher's
/// `SecretProvider` trait shape (`server/src/data/secrets/provider.rs`):
/// a small async trait with one meaningful operation that callers implement
/// per backend.
#[async_trait]
pub trait ClientProvider: Send + Sync {
    async fn client_for(
        &self,
        ctx: &WorkerContext,
        event: &Event,
    ) -> Result<Option<AttachedClient>, WorkerError>;
}

/// A provider that never attaches a client. Used when no
/// [`ClientProvider`] is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoClientProvider;

#[async_trait]
impl ClientProvider for NoClientProvider {
    async fn client_for(
        &self,
        _ctx: &WorkerContext,
        _event: &Event,
    ) -> Result<Option<AttachedClient>, WorkerError> {
        Ok(None)
    }
}
