pub mod alerts;
pub mod catalogue;
pub mod config;
pub mod dashboard;
pub mod drawable;
pub mod feed;
pub mod pointer;
pub mod reconciler;
pub mod registry;
pub mod scheduler;
pub mod store;
pub mod surface;

pub use alerts::AlertStore;
pub use catalogue::{LayerCatalogue, LayerGroup};
pub use dashboard::Dashboard;
pub use drawable::{DrawError, Drawable};
pub use feed::{DataFeed, FeedBundle, FeedError, FeedSource};
pub use pointer::PointerReadout;
pub use reconciler::{PassReport, Reconciler};
pub use registry::{DrawnLayerRegistry, Partition};
pub use scheduler::{PassGate, PassPhase};
pub use store::{DesiredLayers, MapStore, StoreChange, StoreHandle};
pub use surface::{
    BaseMap, FitOptions, FocusRequest, MapSurface, MemorySurface, PointerSubscription,
    SurfaceCall, SurfaceError,
};
