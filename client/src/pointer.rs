use std::cell::Cell;
use std::rc::Rc;

use geoharmony_shared::LatLng;

use crate::surface::PointerSubscription;

/// Last pointer position over the map, for the coordinate readout.
#[derive(Debug)]
pub struct PointerReadout {
    last: Rc<Cell<Option<LatLng>>>,
    _subscription: PointerSubscription,
}

impl PointerReadout {
    /// `register` hands the listener to a surface and returns its subscription.
    pub fn new(register: impl FnOnce(Box<dyn FnMut(LatLng)>) -> PointerSubscription) -> Self {
        let last = Rc::new(Cell::new(None));
        let sink = last.clone();
        let subscription = register(Box::new(move |at| sink.set(Some(at))));
        Self {
            last,
            _subscription: subscription,
        }
    }

    pub fn position(&self) -> Option<LatLng> {
        self.last.get()
    }

    pub fn label(&self) -> Option<String> {
        self.position().map(format_coordinate)
    }
}

/// `Lat: 7.500000° N  Lon: 30.000000° E`
pub fn format_coordinate(at: LatLng) -> String {
    let ns = if at.lat >= 0.0 { 'N' } else { 'S' };
    let ew = if at.lng >= 0.0 { 'E' } else { 'W' };
    format!(
        "Lat: {:.6}° {ns}  Lon: {:.6}° {ew}",
        at.lat.abs(),
        at.lng.abs()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::{MapSurface, MemorySurface};

    #[test]
    fn formats_hemispheres() {
        assert_eq!(
            format_coordinate(LatLng::new(7.5, 30.0)),
            "Lat: 7.500000° N  Lon: 30.000000° E"
        );
        assert_eq!(
            format_coordinate(LatLng::new(-4.25, -12.125)),
            "Lat: 4.250000° S  Lon: 12.125000° W"
        );
    }

    #[test]
    fn tracks_moves_until_dropped() {
        let mut surface = MemorySurface::new();
        let readout = PointerReadout::new(|cb| surface.on_pointer_move(cb));
        assert_eq!(readout.label(), None);

        surface.move_pointer(LatLng::new(8.5, 31.5));
        assert_eq!(readout.position(), Some(LatLng::new(8.5, 31.5)));

        drop(readout);
        assert_eq!(surface.listener_count(), 0);
    }
}
