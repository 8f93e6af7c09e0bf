//! The drawing surface the reconciler drives.
//!
//! `MapSurface` is the only way the engine touches a map renderer. Hosts
//! implement it over their mapping library; `MemorySurface` is the in-process
//! implementation used for headless runs and tests.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use geoharmony_shared::{LatLng, LatLngBounds};
use thiserror::Error;

use crate::config::{FIT_BOUNDS_MAX_ZOOM, FIT_BOUNDS_PADDING_PX};
use crate::drawable::Drawable;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FitOptions {
    pub padding_px: u32,
    pub max_zoom: u8,
}

impl Default for FitOptions {
    fn default() -> Self {
        Self {
            padding_px: FIT_BOUNDS_PADDING_PX,
            max_zoom: FIT_BOUNDS_MAX_ZOOM,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaseMap {
    Standard,
    Topographic,
}

/// A camera move requested by the alert or timeline focus commands.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FocusRequest {
    PanTo { center: LatLng, zoom: u8 },
    FitBounds { bounds: LatLngBounds, options: FitOptions },
}

impl FocusRequest {
    pub fn apply<S: MapSurface + ?Sized>(self, surface: &mut S) {
        match self {
            Self::PanTo { center, zoom } => surface.pan_to(center, zoom),
            Self::FitBounds { bounds, options } => surface.fit_bounds(bounds, options),
        }
    }
}

#[derive(Debug, Error)]
pub enum SurfaceError {
    #[error("surface rejected drawable: {0}")]
    Rejected(String),
    #[error("surface has been disposed")]
    Disposed,
}

/// Unsubscribes a pointer listener when dropped.
pub struct PointerSubscription {
    unsubscribe: Option<Box<dyn FnOnce()>>,
}

impl PointerSubscription {
    pub fn new(unsubscribe: impl FnOnce() + 'static) -> Self {
        Self {
            unsubscribe: Some(Box::new(unsubscribe)),
        }
    }

    pub fn noop() -> Self {
        Self { unsubscribe: None }
    }

    pub fn cancel(mut self) {
        if let Some(unsubscribe) = self.unsubscribe.take() {
            unsubscribe();
        }
    }
}

impl Drop for PointerSubscription {
    fn drop(&mut self) {
        if let Some(unsubscribe) = self.unsubscribe.take() {
            unsubscribe();
        }
    }
}

impl fmt::Debug for PointerSubscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PointerSubscription")
            .field("active", &self.unsubscribe.is_some())
            .finish()
    }
}

pub trait MapSurface {
    type Handle: Clone + fmt::Debug + PartialEq;

    fn create_drawable(&mut self, drawable: &Drawable) -> Result<Self::Handle, SurfaceError>;
    fn remove_drawable(&mut self, handle: Self::Handle);
    fn pan_to(&mut self, center: LatLng, zoom: u8);
    fn fit_bounds(&mut self, bounds: LatLngBounds, options: FitOptions);
    fn on_pointer_move(&mut self, callback: Box<dyn FnMut(LatLng)>) -> PointerSubscription;
    fn set_base_map(&mut self, base: BaseMap);
}

/// One recorded surface call.
#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceCall {
    Create { handle: u64, id: String },
    Remove { handle: u64 },
    PanTo { center: LatLng, zoom: u8 },
    FitBounds { bounds: LatLngBounds, options: FitOptions },
    SetBaseMap(BaseMap),
}

type CreateHook = Box<dyn FnMut(&Drawable)>;
type RejectRule = Box<dyn Fn(&Drawable) -> bool>;
type PointerListener = Rc<RefCell<Box<dyn FnMut(LatLng)>>>;

#[derive(Default)]
struct MemoryState {
    next_handle: u64,
    next_listener: u64,
    live: BTreeMap<u64, Drawable>,
    calls: Vec<SurfaceCall>,
    view: Option<(LatLng, u8)>,
    base: Option<BaseMap>,
    listeners: BTreeMap<u64, PointerListener>,
    reject: Option<RejectRule>,
    on_create: Option<CreateHook>,
}

/// In-memory surface keeping every live drawable and a log of calls.
///
/// Clones share state, so a host can keep one clone for inspection while the
/// reconciler owns another.
#[derive(Clone, Default)]
pub struct MemorySurface {
    state: Rc<RefCell<MemoryState>>,
}

impl MemorySurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject every drawable matching `rule` with `SurfaceError::Rejected`.
    pub fn reject_when(&self, rule: impl Fn(&Drawable) -> bool + 'static) {
        self.state.borrow_mut().reject = Some(Box::new(rule));
    }

    /// Run `hook` after every successful create, outside any internal borrow.
    pub fn on_create(&self, hook: impl FnMut(&Drawable) + 'static) {
        self.state.borrow_mut().on_create = Some(Box::new(hook));
    }

    pub fn live_count(&self) -> usize {
        self.state.borrow().live.len()
    }

    /// Ids of live drawables, one entry per drawable.
    pub fn live_ids(&self) -> Vec<String> {
        self.state
            .borrow()
            .live
            .values()
            .map(|d| d.owner_id().to_string())
            .collect()
    }

    pub fn live_drawable(&self, id: &str) -> Option<Drawable> {
        self.state
            .borrow()
            .live
            .values()
            .find(|d| d.owner_id() == id)
            .cloned()
    }

    pub fn calls(&self) -> Vec<SurfaceCall> {
        self.state.borrow().calls.clone()
    }

    pub fn call_count(&self) -> usize {
        self.state.borrow().calls.len()
    }

    pub fn clear_calls(&self) {
        self.state.borrow_mut().calls.clear();
    }

    pub fn view(&self) -> Option<(LatLng, u8)> {
        self.state.borrow().view
    }

    pub fn base_map(&self) -> Option<BaseMap> {
        self.state.borrow().base
    }

    pub fn listener_count(&self) -> usize {
        self.state.borrow().listeners.len()
    }

    /// Deliver a pointer position to every listener.
    pub fn move_pointer(&self, at: LatLng) {
        let listeners: Vec<PointerListener> =
            self.state.borrow().listeners.values().cloned().collect();
        for listener in listeners {
            (listener.borrow_mut())(at);
        }
    }
}

impl MapSurface for MemorySurface {
    type Handle = u64;

    fn create_drawable(&mut self, drawable: &Drawable) -> Result<u64, SurfaceError> {
        let handle = {
            let mut state = self.state.borrow_mut();
            if state.reject.as_ref().is_some_and(|reject| reject(drawable)) {
                return Err(SurfaceError::Rejected(drawable.owner_id().to_string()));
            }
            state.next_handle += 1;
            let handle = state.next_handle;
            state.live.insert(handle, drawable.clone());
            state.calls.push(SurfaceCall::Create {
                handle,
                id: drawable.owner_id().to_string(),
            });
            handle
        };

        // The hook may re-enter the surface, so it runs without the borrow held.
        let hook = self.state.borrow_mut().on_create.take();
        if let Some(mut hook) = hook {
            hook(drawable);
            let mut state = self.state.borrow_mut();
            if state.on_create.is_none() {
                state.on_create = Some(hook);
            }
        }
        Ok(handle)
    }

    fn remove_drawable(&mut self, handle: u64) {
        let mut state = self.state.borrow_mut();
        if state.live.remove(&handle).is_none() {
            tracing::warn!(handle, "removing unknown drawable handle");
        }
        state.calls.push(SurfaceCall::Remove { handle });
    }

    fn pan_to(&mut self, center: LatLng, zoom: u8) {
        let mut state = self.state.borrow_mut();
        state.view = Some((center, zoom));
        state.calls.push(SurfaceCall::PanTo { center, zoom });
    }

    fn fit_bounds(&mut self, bounds: LatLngBounds, options: FitOptions) {
        let mut state = self.state.borrow_mut();
        state.view = Some((bounds.center(), options.max_zoom));
        state.calls.push(SurfaceCall::FitBounds { bounds, options });
    }

    fn on_pointer_move(&mut self, callback: Box<dyn FnMut(LatLng)>) -> PointerSubscription {
        let id = {
            let mut state = self.state.borrow_mut();
            state.next_listener += 1;
            let id = state.next_listener;
            state.listeners.insert(id, Rc::new(RefCell::new(callback)));
            id
        };
        let weak = Rc::downgrade(&self.state);
        PointerSubscription::new(move || {
            if let Some(state) = weak.upgrade() {
                state.borrow_mut().listeners.remove(&id);
            }
        })
    }

    fn set_base_map(&mut self, base: BaseMap) {
        let mut state = self.state.borrow_mut();
        state.base = Some(base);
        state.calls.push(SurfaceCall::SetBaseMap(base));
    }
}
