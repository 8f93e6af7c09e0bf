pub mod alert;
pub mod colors;
pub mod date;
pub mod features;
pub mod filter;
pub mod geometry;
pub mod layer;
pub mod timeline;

pub use alert::{Alert, AlertLocation, Severity};
pub use colors::Rgb;
pub use date::{CALENDAR_BASIS, CalendarBasis, DateRange};
pub use features::{Feature, FeatureCollection, Properties};
pub use filter::{Dated, filter_by_date, filter_layer, filter_layers};
pub use geometry::{Geometry, GeometryError, LatLng, LatLngBounds};
pub use layer::{Layer, LayerData, LayerKind, PointRecord, TileSource};
pub use timeline::{EventLocation, TimelineEvent};
