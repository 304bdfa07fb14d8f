use parking_lot::RwLock;
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, trace};

use crate::{GraphEngine, GraphError, InterfaceHandle, InterfaceKind, InterfaceRecord};

#[derive(Debug)]
struct Entry {
    record: InterfaceRecord,
    /// Whether the driver behind this interface accepts feature redirection.
    redirect_supported: bool,
    /// Failure injected by the operator, returned by every stage update.
    failure: Option<String>,
}

#[derive(Debug, Default)]
struct Inner {
    next_index: u32,
    interfaces: FxHashMap<InterfaceHandle, Entry>,
    by_name: FxHashMap<String, InterfaceHandle>,
    /// Enabled (interface, arc, stage) triples.
    enabled: FxHashSet<(InterfaceHandle, String, String)>,
}

/// An in-memory [`GraphEngine`]: an interface table plus per-interface feature state.
///
/// Handles are allocated monotonically and never reused, so a removed interface leaves a stale
/// handle behind.
#[derive(Debug, Default)]
pub struct InterfaceTable {
    inner: RwLock<Inner>,
}

impl InterfaceTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a physical port.
    pub fn add_hardware_port(&self, name: impl Into<String>) -> Result<InterfaceHandle, GraphError> {
        self.add_interface(name, InterfaceKind::HardwarePort)
    }

    /// Registers a sub-interface, tunnel or other virtual interface.
    pub fn add_virtual(&self, name: impl Into<String>) -> Result<InterfaceHandle, GraphError> {
        self.add_interface(name, InterfaceKind::Other)
    }

    pub fn add_interface(
        &self,
        name: impl Into<String>,
        kind: InterfaceKind,
    ) -> Result<InterfaceHandle, GraphError> {
        let name = name.into();
        let mut inner = self.inner.write();

        if inner.by_name.contains_key(&name) {
            return Err(GraphError::Internal(format!("interface {name} already exists")));
        }

        let next = inner
            .next_index
            .checked_add(1)
            .ok_or_else(|| GraphError::Internal("interface handle space exhausted".to_string()))?;
        let handle = InterfaceHandle::new(inner.next_index);
        inner.next_index = next;

        debug!(%handle, name = name.as_str(), ?kind, "interface created");

        inner.by_name.insert(name.clone(), handle);
        inner.interfaces.insert(
            handle,
            Entry {
                record: InterfaceRecord { handle, name, kind },
                redirect_supported: true,
                failure: None,
            },
        );

        Ok(handle)
    }

    /// Deletes an interface along with its feature state. Returns `false` if it was not present.
    pub fn remove(&self, handle: InterfaceHandle) -> bool {
        let mut inner = self.inner.write();

        let Some(entry) = inner.interfaces.remove(&handle) else {
            return false;
        };

        inner.by_name.remove(&entry.record.name);
        inner.enabled.retain(|(h, _, _)| *h != handle);

        debug!(%handle, "interface deleted");
        true
    }

    /// Sets whether the interface's driver supports feature redirection.
    pub fn set_redirect_supported(&self, handle: InterfaceHandle, supported: bool) -> bool {
        match self.inner.write().interfaces.get_mut(&handle) {
            Some(entry) => {
                entry.redirect_supported = supported;
                true
            }
            None => false,
        }
    }

    /// Makes every subsequent stage update on this interface fail with [`GraphError::Internal`].
    /// Passing `None` clears the failure.
    pub fn inject_failure(&self, handle: InterfaceHandle, failure: Option<String>) -> bool {
        match self.inner.write().interfaces.get_mut(&handle) {
            Some(entry) => {
                entry.failure = failure;
                true
            }
            None => false,
        }
    }

    pub fn is_stage_enabled(&self, handle: InterfaceHandle, arc_name: &str, stage_name: &str) -> bool {
        self.inner.read().enabled.contains(&(handle, arc_name.to_owned(), stage_name.to_owned()))
    }

    /// Number of enabled (interface, arc, stage) triples across the table.
    pub fn enabled_count(&self) -> usize {
        self.inner.read().enabled.len()
    }

    pub fn len(&self) -> usize {
        self.inner.read().interfaces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl GraphEngine for InterfaceTable {
    fn resolve_interface(&self, handle: InterfaceHandle) -> Option<InterfaceRecord> {
        self.inner.read().interfaces.get(&handle).map(|entry| entry.record.clone())
    }

    fn interface_by_name(&self, name: &str) -> Option<InterfaceHandle> {
        self.inner.read().by_name.get(name).copied()
    }

    fn set_stage_enabled(
        &self,
        arc_name: &str,
        stage_name: &str,
        handle: InterfaceHandle,
        enabled: bool,
    ) -> Result<(), GraphError> {
        let mut inner = self.inner.write();

        let Some(entry) = inner.interfaces.get(&handle) else {
            return Err(GraphError::NotFound(handle));
        };

        if let Some(ref failure) = entry.failure {
            return Err(GraphError::Internal(failure.clone()));
        }

        if !entry.redirect_supported {
            return Err(GraphError::Unimplemented);
        }

        let key = (handle, arc_name.to_owned(), stage_name.to_owned());
        let changed = if enabled { inner.enabled.insert(key) } else { inner.enabled.remove(&key) };

        trace!(%handle, arc_name, stage_name, enabled, changed, "stage updated");

        Ok(())
    }
}
