//! Map widget port and a recording implementation.

use std::collections::BTreeMap;

use crate::models::GeoPoint;

/// Default view before any marker is known.
pub const DEFAULT_CENTER: GeoPoint = GeoPoint::new(51.505, -0.09);
pub const DEFAULT_ZOOM: u8 = 2;

/// Padding ratio applied when fitting the view to the markers.
pub const FIT_PADDING: f64 = 0.5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerIcon {
    pub url: String,
    pub size: (u32, u32),
    pub anchor: (i32, i32),
    pub popup_anchor: (i32, i32),
}

impl MarkerIcon {
    /// 40x40 icon anchored at its bottom centre, popup opening above it.
    pub fn for_url(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            size: (40, 40),
            anchor: (20, 40),
            popup_anchor: (0, -40),
        }
    }
}

/// Everything a surface needs to draw one marker.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerSpec {
    pub position: GeoPoint,
    pub icon: MarkerIcon,
    pub popup_html: String,
}

/// Surface-issued marker reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MarkerHandle(pub u64);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatLngBounds {
    pub south_west: GeoPoint,
    pub north_east: GeoPoint,
}

impl LatLngBounds {
    /// Smallest box containing every point; `None` when there are none.
    pub fn from_points(points: impl IntoIterator<Item = GeoPoint>) -> Option<Self> {
        points.into_iter().fold(None, |bounds, point| {
            Some(match bounds {
                None => Self {
                    south_west: point,
                    north_east: point,
                },
                Some(Self {
                    south_west,
                    north_east,
                }) => Self {
                    south_west: GeoPoint::new(
                        south_west.lat.min(point.lat),
                        south_west.lng.min(point.lng),
                    ),
                    north_east: GeoPoint::new(
                        north_east.lat.max(point.lat),
                        north_east.lng.max(point.lng),
                    ),
                },
            })
        })
    }

    /// Grow each side by `ratio` of the box's extent.
    #[must_use]
    pub fn pad(self, ratio: f64) -> Self {
        let lat_buffer = (self.north_east.lat - self.south_west.lat).abs() * ratio;
        let lng_buffer = (self.north_east.lng - self.south_west.lng).abs() * ratio;
        Self {
            south_west: GeoPoint::new(
                self.south_west.lat - lat_buffer,
                self.south_west.lng - lng_buffer,
            ),
            north_east: GeoPoint::new(
                self.north_east.lat + lat_buffer,
                self.north_east.lng + lng_buffer,
            ),
        }
    }

    #[must_use]
    pub fn contains(&self, point: GeoPoint) -> bool {
        (self.south_west.lat..=self.north_east.lat).contains(&point.lat)
            && (self.south_west.lng..=self.north_east.lng).contains(&point.lng)
    }
}

/// The map widget as seen by the reconciler.
pub trait MapSurface {
    fn add_marker(&mut self, spec: &MarkerSpec) -> MarkerHandle;

    /// Move and re-label an existing marker without recreating it.
    fn update_marker(&mut self, handle: MarkerHandle, spec: &MarkerSpec);

    fn remove_marker(&mut self, handle: MarkerHandle);

    fn fit_bounds(&mut self, bounds: LatLngBounds);

    /// Release the widget. No other call is made afterwards.
    fn detach(&mut self);
}

/// Surface that keeps its state in memory and records every call.
#[derive(Debug, Clone, PartialEq)]
pub struct HeadlessMap {
    pub center: GeoPoint,
    pub zoom: u8,
    markers: BTreeMap<MarkerHandle, MarkerSpec>,
    next_handle: u64,
    fits: Vec<LatLngBounds>,
    adds: usize,
    updates: usize,
    removals: usize,
    detached: bool,
}

impl Default for HeadlessMap {
    fn default() -> Self {
        Self {
            center: DEFAULT_CENTER,
            zoom: DEFAULT_ZOOM,
            markers: BTreeMap::new(),
            next_handle: 1,
            fits: Vec::new(),
            adds: 0,
            updates: 0,
            removals: 0,
            detached: false,
        }
    }
}

impl HeadlessMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn markers(&self) -> impl Iterator<Item = (MarkerHandle, &MarkerSpec)> {
        self.markers.iter().map(|(handle, spec)| (*handle, spec))
    }

    #[must_use]
    pub fn marker(&self, handle: MarkerHandle) -> Option<&MarkerSpec> {
        self.markers.get(&handle)
    }

    #[must_use]
    pub fn marker_count(&self) -> usize {
        self.markers.len()
    }

    /// Every bounds passed to `fit_bounds`, in call order.
    #[must_use]
    pub fn fits(&self) -> &[LatLngBounds] {
        &self.fits
    }

    #[must_use]
    pub const fn adds(&self) -> usize {
        self.adds
    }

    #[must_use]
    pub const fn updates(&self) -> usize {
        self.updates
    }

    #[must_use]
    pub const fn removals(&self) -> usize {
        self.removals
    }

    #[must_use]
    pub const fn is_detached(&self) -> bool {
        self.detached
    }
}

impl MapSurface for HeadlessMap {
    fn add_marker(&mut self, spec: &MarkerSpec) -> MarkerHandle {
        let handle = MarkerHandle(self.next_handle);
        self.next_handle += 1;
        self.markers.insert(handle, spec.clone());
        self.adds += 1;
        handle
    }

    fn update_marker(&mut self, handle: MarkerHandle, spec: &MarkerSpec) {
        if let Some(existing) = self.markers.get_mut(&handle) {
            *existing = spec.clone();
            self.updates += 1;
        }
    }

    fn remove_marker(&mut self, handle: MarkerHandle) {
        if self.markers.remove(&handle).is_some() {
            self.removals += 1;
        }
    }

    fn fit_bounds(&mut self, bounds: LatLngBounds) {
        self.center = GeoPoint::new(
            (bounds.south_west.lat + bounds.north_east.lat) / 2.0,
            (bounds.south_west.lng + bounds.north_east.lng) / 2.0,
        );
        self.fits.push(bounds);
    }

    fn detach(&mut self) {
        self.markers.clear();
        self.detached = true;
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn bounds_pad_grows_each_side_by_ratio() {
        let bounds = LatLngBounds::from_points([GeoPoint::new(10.0, 20.0), GeoPoint::new(14.0, 28.0)])
            .unwrap()
            .pad(FIT_PADDING);
        assert_eq!(bounds.south_west, GeoPoint::new(8.0, 16.0));
        assert_eq!(bounds.north_east, GeoPoint::new(16.0, 32.0));
        assert!(bounds.contains(GeoPoint::new(15.0, 17.0)));
    }

    #[test]
    fn bounds_of_nothing_is_none() {
        assert!(LatLngBounds::from_points(std::iter::empty()).is_none());
    }

    #[test]
    fn headless_map_starts_at_default_view() {
        let map = HeadlessMap::new();
        assert_eq!(map.center, DEFAULT_CENTER);
        assert_eq!(map.zoom, DEFAULT_ZOOM);
        assert_eq!(map.marker_count(), 0);
    }

    #[test]
    fn icon_geometry_matches_marker_art() {
        let icon = MarkerIcon::for_url("https://cdn/a.png");
        assert_eq!(icon.size, (40, 40));
        assert_eq!(icon.anchor, (20, 40));
        assert_eq!(icon.popup_anchor, (0, -40));
    }
}
