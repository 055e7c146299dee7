//! Bridge state: registry, runtime and the installed client.

use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use bridge_core::{BlockingRuntime, BridgeError, HandleRegistry, Result};
use client_traits::{ClientError, StorageClient};

/// Everything one bridge instance owns.
///
/// Explicitly constructed rather than scattered globals, so tests can build
/// private universes; only the C surface below holds a process-wide one
/// (the flat ABI has no slot to thread a universe argument through).
pub struct Universe {
    registry: HandleRegistry,
    runtime: BlockingRuntime,
    client: RwLock<Option<Arc<dyn StorageClient>>>,
}

impl Universe {
    pub fn new() -> std::io::Result<Self> {
        Ok(Self {
            registry: HandleRegistry::new(),
            runtime: BlockingRuntime::new()?,
            client: RwLock::new(None),
        })
    }

    pub fn registry(&self) -> &HandleRegistry {
        &self.registry
    }

    pub fn runtime(&self) -> &BlockingRuntime {
        &self.runtime
    }

    pub fn set_client(&self, client: Arc<dyn StorageClient>) {
        *self
            .client
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(client);
    }

    pub fn client(&self) -> Result<Arc<dyn StorageClient>> {
        self.client
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or_else(|| {
                BridgeError::Client(ClientError::Internal(
                    "storage client not configured".to_string(),
                ))
            })
    }
}

static UNIVERSE: OnceLock<std::io::Result<Universe>> = OnceLock::new();

/// The process-wide universe behind the C surface.
///
/// Runtime construction can fail in theory (thread spawn); that failure is
/// reported through every operation as an internal error instead of
/// panicking across the boundary.
pub(crate) fn universe() -> Result<&'static Universe> {
    match UNIVERSE.get_or_init(Universe::new) {
        Ok(universe) => Ok(universe),
        Err(err) => Err(BridgeError::Client(ClientError::Internal(format!(
            "bridge runtime unavailable: {err}"
        )))),
    }
}

/// Install the concrete storage client the C surface operates on.
///
/// The embedding product (or test harness) calls this once before foreign
/// code uses the bridge. Installing again replaces the client for future
/// operations; existing handles keep the sessions they were opened with.
pub fn install_client(client: Arc<dyn StorageClient>) {
    if let Ok(universe) = universe() {
        universe.set_client(client);
        tracing::debug!("storage client installed");
    }
}

/// Returns true if nothing is stored in the bridge's handle registry.
/// Intended for leak detection in tests.
#[no_mangle]
pub extern "C" fn depot_internal_universe_is_empty() -> bool {
    match universe() {
        Ok(universe) => universe.registry().is_empty(),
        Err(_) => true,
    }
}
