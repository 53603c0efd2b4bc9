//! Immersive-session negotiation and state observation.
//!
//! Upgrading the 2D scene into a head-mounted session is strictly
//! best-effort: negotiation may suspend for permission prompts, may fail on
//! unsupported platforms, and never blocks or aborts the base experience.
//! Session state is exposed through a plain observer registry rather than a
//! framework-specific observable type.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::error::ViewerError;

/// Session state values, delivered in order through the state stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XrState {
    NotInXr,
    Entering,
    InXr,
    Exiting,
}

/// Identifies one registered observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObserverId(u64);

type Observer<T> = Box<dyn FnMut(&T) + Send>;

struct Observers<T> {
    next_id: u64,
    observers: Vec<(u64, Observer<T>)>,
}

impl<T> Default for Observers<T> {
    fn default() -> Self {
        Self {
            next_id: 0,
            observers: Vec::new(),
        }
    }
}

/// Register a callback, receive ordered values, unsubscribe on teardown.
pub struct StateObservable<T> {
    inner: Arc<Mutex<Observers<T>>>,
}

impl<T> Clone for StateObservable<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Default for StateObservable<T> {
    fn default() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Observers::default())),
        }
    }
}

impl<T> StateObservable<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, observer: Observer<T>) -> ObserverId {
        let mut inner = self.inner.lock().unwrap();
        let id = inner.next_id;
        inner.next_id += 1;
        inner.observers.push((id, observer));
        ObserverId(id)
    }

    /// Returns false if the observer was already removed.
    pub fn remove(&self, id: ObserverId) -> bool {
        let mut inner = self.inner.lock().unwrap();
        let before = inner.observers.len();
        inner.observers.retain(|(observer_id, _)| *observer_id != id.0);
        inner.observers.len() != before
    }

    pub fn notify(&self, value: &T) {
        let mut inner = self.inner.lock().unwrap();
        for (_, observer) in inner.observers.iter_mut() {
            observer(value);
        }
    }

    pub fn observer_count(&self) -> usize {
        self.inner.lock().unwrap().observers.len()
    }
}

/// Input to session negotiation: the floor-mesh set (teleportation/boundary
/// surfaces) and whether extra capabilities are requested best-effort.
pub struct SessionRequest {
    pub floor_meshes: Vec<String>,
    /// Enable optional capabilities without failing when unsupported.
    pub optional_features: bool,
}

/// A negotiated head-mounted session layered on top of a scene. At most one
/// per scene. The state stream is for diagnostics and observation only; it
/// never gates rendering.
pub struct ImmersiveSession {
    floor_meshes: Vec<String>,
    state: XrState,
    on_state_changed: StateObservable<XrState>,
}

impl ImmersiveSession {
    pub fn new(floor_meshes: Vec<String>) -> Self {
        Self {
            floor_meshes,
            state: XrState::NotInXr,
            on_state_changed: StateObservable::new(),
        }
    }

    pub fn floor_meshes(&self) -> &[String] {
        &self.floor_meshes
    }

    pub fn state(&self) -> XrState {
        self.state
    }

    /// Record a state transition and notify observers. Repeated values are
    /// collapsed.
    pub fn set_state(&mut self, state: XrState) {
        if state != self.state {
            self.state = state;
            self.on_state_changed.notify(&state);
        }
    }

    pub fn on_state_changed(&self) -> &StateObservable<XrState> {
        &self.on_state_changed
    }
}

/// Provider of the immersive capability.
#[async_trait]
pub trait XrRuntime: Send + Sync {
    /// Attempt the upgrade. May suspend for platform permission prompts.
    async fn negotiate(&self, request: SessionRequest) -> Result<ImmersiveSession, ViewerError>;
}

/// Fallback for platforms without an XR runtime. Absence of support is a
/// degraded-capability signal, not an error the mount surfaces.
pub struct UnsupportedXrRuntime;

#[async_trait]
impl XrRuntime for UnsupportedXrRuntime {
    async fn negotiate(&self, _request: SessionRequest) -> Result<ImmersiveSession, ViewerError> {
        Err(ViewerError::ImmersiveUnsupported)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn observers_receive_ordered_state_values() {
        let mut session = ImmersiveSession::new(vec!["ground".into()]);
        let seen = Arc::new(Mutex::new(Vec::new()));

        let sink = Arc::clone(&seen);
        let id = session.on_state_changed().add(Box::new(move |state| {
            sink.lock().unwrap().push(*state);
        }));

        session.set_state(XrState::Entering);
        session.set_state(XrState::InXr);
        // Repeated value does not re-notify.
        session.set_state(XrState::InXr);
        session.set_state(XrState::Exiting);

        assert_eq!(
            *seen.lock().unwrap(),
            vec![XrState::Entering, XrState::InXr, XrState::Exiting]
        );

        assert!(session.on_state_changed().remove(id));
        assert!(!session.on_state_changed().remove(id));
        session.set_state(XrState::NotInXr);
        assert_eq!(seen.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn unsupported_runtime_reports_degraded_capability() {
        let runtime = UnsupportedXrRuntime;
        let result = runtime
            .negotiate(SessionRequest {
                floor_meshes: vec![],
                optional_features: true,
            })
            .await;
        assert!(matches!(result, Err(ViewerError::ImmersiveUnsupported)));
    }
}
