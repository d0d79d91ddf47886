//! Admission gate: the authentication boundary every connection crosses.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::mpsc;
use tracing::{error, info};

use pulse_auth::TokenVerifier;
use pulse_core::traits::store::PresenceStore;
use pulse_store::{StoreManager, keys};

use crate::connection::handle::ConnectionHandle;
use crate::connection::registry::ConnectionRegistry;
use crate::error::AdmissionError;

/// Gates every inbound connection attempt.
///
/// Verifies the presented credential, checks the shared store for an
/// active ban, and hands successful handshakes to the registry. During
/// shutdown the gate stops accepting so the drain can complete.
#[derive(Debug)]
pub struct AdmissionGate {
    /// Credential verifier.
    verifier: Arc<TokenVerifier>,
    /// Shared store holding ban flags.
    store: Arc<StoreManager>,
    /// Registry that owns admitted connections.
    registry: Arc<ConnectionRegistry>,
    /// Whether new connections are accepted.
    accepting: AtomicBool,
}

impl AdmissionGate {
    /// Creates a new gate.
    pub fn new(
        verifier: Arc<TokenVerifier>,
        store: Arc<StoreManager>,
        registry: Arc<ConnectionRegistry>,
    ) -> Self {
        Self {
            verifier,
            store,
            registry,
            accepting: AtomicBool::new(true),
        }
    }

    /// Runs the full admission sequence for one connection attempt.
    ///
    /// On success the identity is admitted to the registry (replacing any
    /// prior session) and presence is recorded best-effort. Every failure
    /// carries a stable reason code and terminates the handshake.
    pub async fn admit(
        &self,
        token: Option<&str>,
    ) -> Result<(Arc<ConnectionHandle>, mpsc::Receiver<String>), AdmissionError> {
        if !self.accepting.load(Ordering::SeqCst) {
            return Err(AdmissionError::Internal("gateway is shutting down".into()));
        }

        let token = token.ok_or(AdmissionError::AuthRequired)?;
        let claims = self.verifier.verify(token)?;
        let identity = claims.identity();

        match self.store.exists(&keys::ban(identity)).await {
            Ok(true) => {
                info!(identity = %identity, "Rejected banned identity");
                return Err(AdmissionError::TemporaryBan);
            }
            Ok(false) => {}
            Err(e) => {
                error!(identity = %identity, error = %e, "Ban check failed");
                return Err(AdmissionError::Internal(e.to_string()));
            }
        }

        Ok(self.registry.admit(identity).await)
    }

    /// Stops accepting new connections. Idempotent.
    pub fn close(&self) {
        self.accepting.store(false, Ordering::SeqCst);
        info!("Admission gate closed");
    }

    /// Whether the gate is accepting new connections.
    pub fn is_accepting(&self) -> bool {
        self.accepting.load(Ordering::SeqCst)
    }
}
