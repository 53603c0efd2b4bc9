//! Drawable surface binding and resize notifications.
//!
//! A [`Surface`] is the region the render engine targets: it reports logical
//! pixel dimensions and the device pixel ratio, and nothing else. The window
//! shell owns the surface; the engine only reads it.
//!
//! [`ResizeSignal`] is the window-level resize contract: listeners are
//! registered per mount and removed explicitly on unmount, so emitting the
//! signal N times results in exactly N engine resizes and zero after
//! teardown.

use std::sync::{Arc, Mutex};

use winit::window::Window;

/// Logical size of a drawable region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurfaceSize {
    pub width: u32,
    pub height: u32,
}

impl SurfaceSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// A mutable drawable handle: logical dimensions plus device pixel ratio.
pub trait Surface: Send + Sync {
    /// Current logical size of the drawable region.
    fn size(&self) -> SurfaceSize;

    /// Ratio between physical (backing-store) and logical pixels.
    fn device_pixel_ratio(&self) -> f64;
}

/// [`Surface`] over a winit window.
pub struct WindowSurface {
    window: Arc<Window>,
}

impl WindowSurface {
    pub fn new(window: Arc<Window>) -> Self {
        Self { window }
    }

    pub fn window(&self) -> &Arc<Window> {
        &self.window
    }
}

impl Surface for WindowSurface {
    fn size(&self) -> SurfaceSize {
        let scale = self.window.scale_factor();
        let size = self.window.inner_size().to_logical::<f64>(scale);
        SurfaceSize::new(size.width.round() as u32, size.height.round() as u32)
    }

    fn device_pixel_ratio(&self) -> f64 {
        self.window.scale_factor()
    }
}

/// Identifies one registered resize listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListenerId(u64);

type ResizeListener = Box<dyn FnMut() + Send>;

#[derive(Default)]
struct ResizeListeners {
    next_id: u64,
    listeners: Vec<(u64, ResizeListener)>,
    emitting: bool,
    removed_mid_emit: Vec<u64>,
}

/// Explicit resize-listener registry.
///
/// Clones share the same registry, so the window shell emits on its clone
/// while the lifecycle controller subscribes and unsubscribes on another.
#[derive(Clone, Default)]
pub struct ResizeSignal {
    inner: Arc<Mutex<ResizeListeners>>,
}

impl ResizeSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener, returning the id needed to remove it again.
    pub fn subscribe(&self, listener: ResizeListener) -> ListenerId {
        let mut inner = self.inner.lock().unwrap();
        let id = inner.next_id;
        inner.next_id += 1;
        inner.listeners.push((id, listener));
        ListenerId(id)
    }

    /// Remove a listener. Returns false if it was already gone.
    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        let mut inner = self.inner.lock().unwrap();
        let before = inner.listeners.len();
        inner.listeners.retain(|(listener_id, _)| *listener_id != id.0);
        if inner.listeners.len() != before {
            return true;
        }
        // While an emit is in flight the running listeners are swapped out of
        // the registry, so removal is recorded and reconciled when the emit
        // finishes.
        if inner.emitting && !inner.removed_mid_emit.contains(&id.0) {
            inner.removed_mid_emit.push(id.0);
            return true;
        }
        false
    }

    /// Invoke every registered listener once, in registration order.
    /// Listeners run outside the registry lock and may subscribe or
    /// unsubscribe on the same signal.
    pub fn emit(&self) {
        let mut current = {
            let mut inner = self.inner.lock().unwrap();
            inner.emitting = true;
            std::mem::take(&mut inner.listeners)
        };
        for (_, listener) in current.iter_mut() {
            listener();
        }
        let mut inner = self.inner.lock().unwrap();
        inner.emitting = false;
        let removed = std::mem::take(&mut inner.removed_mid_emit);
        current.retain(|(id, _)| !removed.contains(id));
        // Listeners subscribed during this emit fire from the next emit on.
        let mut added = std::mem::replace(&mut inner.listeners, current);
        inner.listeners.append(&mut added);
    }

    pub fn listener_count(&self) -> usize {
        self.inner.lock().unwrap().listeners.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn listeners_fire_once_per_emit_until_removed() {
        let signal = ResizeSignal::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&calls);
        let id = signal.subscribe(Box::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }));
        assert_eq!(signal.listener_count(), 1);

        signal.emit();
        signal.emit();
        signal.emit();
        assert_eq!(calls.load(Ordering::SeqCst), 3);

        assert!(signal.unsubscribe(id));
        assert_eq!(signal.listener_count(), 0);
        signal.emit();
        assert_eq!(calls.load(Ordering::SeqCst), 3);

        // Double removal reports failure instead of corrupting the registry.
        assert!(!signal.unsubscribe(id));
    }

    #[test]
    fn a_listener_may_remove_itself_during_emit() {
        let signal = ResizeSignal::new();
        let slot: Arc<Mutex<Option<ListenerId>>> = Arc::new(Mutex::new(None));
        let calls = Arc::new(AtomicUsize::new(0));

        let inner_signal = signal.clone();
        let inner_slot = Arc::clone(&slot);
        let counter = Arc::clone(&calls);
        let id = signal.subscribe(Box::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            if let Some(id) = inner_slot.lock().unwrap().take() {
                assert!(inner_signal.unsubscribe(id));
            }
        }));
        *slot.lock().unwrap() = Some(id);

        signal.emit();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(signal.listener_count(), 0);

        signal.emit();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(!signal.unsubscribe(id));
    }

    #[test]
    fn subscriptions_made_during_emit_fire_from_the_next_emit() {
        let signal = ResizeSignal::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let inner_signal = signal.clone();
        let counter = Arc::clone(&calls);
        let subscribed = std::cell::Cell::new(false);
        signal.subscribe(Box::new(move || {
            if !subscribed.replace(true) {
                let counter = Arc::clone(&counter);
                inner_signal.subscribe(Box::new(move || {
                    counter.fetch_add(1, Ordering::SeqCst);
                }));
            }
        }));

        signal.emit();
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(signal.listener_count(), 2);

        signal.emit();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn zero_area_is_detectable() {
        assert!(SurfaceSize::new(0, 600).is_empty());
        assert!(SurfaceSize::new(800, 0).is_empty());
        assert!(!SurfaceSize::new(800, 600).is_empty());
    }
}
