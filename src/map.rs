//! Map marker projection
//!
//! Pure functions that turn itinerary, hotel and search data into map
//! markers, plus the view (center, zoom, bounds) a renderer should use.
//! Inputs without usable coordinates are skipped; empty input gives an
//! empty marker list.

use serde::{Deserialize, Serialize};

use crate::api::{Hotel, Location, PlaceItem, TripPlan};
use crate::config::MapsConfig;
use crate::error::{Result, TripPlannerError};

const STATIC_MAP_ENDPOINT: &str = "https://maps.googleapis.com/maps/api/staticmap";
const STATIC_MAP_SIZE: &str = "640x400";
/// The static maps API labels markers with a single character
const MARKER_LABELS: &[u8] = b"123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// A point to display on the map
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapMarker {
    pub lat: f64,
    pub lon: f64,
    pub title: String,
}

fn marker(lat: f64, lon: f64, title: &str) -> Option<MapMarker> {
    if lat.is_finite() && lon.is_finite() {
        Some(MapMarker {
            lat,
            lon,
            title: title.to_string(),
        })
    } else {
        None
    }
}

/// Marker for a single itinerary location, if it has both coordinates
pub fn marker_for_location(location: &Location) -> Option<MapMarker> {
    location
        .coordinates()
        .map(|(lat, lon)| MapMarker {
            lat,
            lon,
            title: location.name.clone(),
        })
}

/// Markers for every located stop, in day order then stop order
///
/// # Examples
///
/// ```
/// use tripplanner::api::{Day, Location, TripPlan};
/// use tripplanner::map::markers_from_trip_plan;
///
/// let plan = TripPlan {
///     trip_plan: vec![Day {
///         day: 1,
///         locations: vec![Location {
///             name: "Kinkaku-ji".to_string(),
///             lat: Some(35.0394),
///             lng: Some(135.7292),
///             ..Default::default()
///         }],
///     }],
///     stay_plan: vec![],
/// };
/// assert_eq!(markers_from_trip_plan(&plan)[0].title, "Kinkaku-ji");
/// ```
pub fn markers_from_trip_plan(plan: &TripPlan) -> Vec<MapMarker> {
    plan.trip_plan
        .iter()
        .flat_map(|day| day.locations.iter())
        .filter_map(marker_for_location)
        .collect()
}

/// Markers for hotels that carry coordinates
pub fn markers_from_hotels(hotels: &[Hotel]) -> Vec<MapMarker> {
    hotels
        .iter()
        .filter_map(|hotel| {
            let coords = hotel.coordinates?;
            marker(coords.lat?, coords.lng?, &hotel.name)
        })
        .collect()
}

/// Markers for search items (destinations, POIs) that carry `lat`/`lon`
pub fn markers_from_items(items: &[PlaceItem]) -> Vec<MapMarker> {
    items
        .iter()
        .filter_map(|item| {
            let title = item.name.as_deref().unwrap_or_default();
            marker(item.lat?, item.lon?, title)
        })
        .collect()
}

/// Smallest box containing a set of markers
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub south: f64,
    pub west: f64,
    pub north: f64,
    pub east: f64,
}

impl Bounds {
    fn around(markers: &[MapMarker]) -> Option<Self> {
        let first = markers.first()?;
        let init = Bounds {
            south: first.lat,
            west: first.lon,
            north: first.lat,
            east: first.lon,
        };
        Some(markers.iter().skip(1).fold(init, |b, m| Bounds {
            south: b.south.min(m.lat),
            west: b.west.min(m.lon),
            north: b.north.max(m.lat),
            east: b.east.max(m.lon),
        }))
    }
}

/// How a renderer should frame a set of markers
#[derive(Debug, Clone, PartialEq)]
pub struct MapView {
    pub center: (f64, f64),
    pub zoom: u8,
    /// Present when more than one marker should be fitted into view
    pub bounds: Option<Bounds>,
}

impl MapView {
    /// View for `markers`
    ///
    /// No markers: the configured default center and zoom. Otherwise
    /// centered on the first marker at the focused zoom, with bounds to fit
    /// when there is more than one.
    pub fn for_markers(markers: &[MapMarker], config: &MapsConfig) -> Self {
        match markers.first() {
            None => Self {
                center: (config.default_center[0], config.default_center[1]),
                zoom: config.default_zoom,
                bounds: None,
            },
            Some(first) => Self {
                center: (first.lat, first.lon),
                zoom: config.focused_zoom,
                bounds: if markers.len() > 1 {
                    Bounds::around(markers)
                } else {
                    None
                },
            },
        }
    }
}

/// Static map image URL showing `markers`
///
/// When the view has bounds the center and zoom are left out so the maps
/// provider fits every marker.
///
/// # Errors
///
/// Returns [`TripPlannerError::MissingMapsApiKey`] without an API key
pub fn static_map_url(markers: &[MapMarker], view: &MapView, api_key: Option<&str>) -> Result<String> {
    let key = match api_key.map(str::trim) {
        Some(key) if !key.is_empty() => key,
        _ => return Err(TripPlannerError::MissingMapsApiKey.into()),
    };

    let mut params: Vec<(String, String)> = vec![("size".to_string(), STATIC_MAP_SIZE.to_string())];
    if view.bounds.is_none() {
        params.push((
            "center".to_string(),
            format!("{:.6},{:.6}", view.center.0, view.center.1),
        ));
        params.push(("zoom".to_string(), view.zoom.to_string()));
    }
    for (i, m) in markers.iter().enumerate() {
        let label = MARKER_LABELS
            .get(i)
            .map(|b| format!("label:{}|", *b as char))
            .unwrap_or_default();
        params.push((
            "markers".to_string(),
            format!("{}{:.6},{:.6}", label, m.lat, m.lon),
        ));
    }
    params.push(("key".to_string(), key.to_string()));

    let url = url::Url::parse_with_params(STATIC_MAP_ENDPOINT, &params)
        .map_err(|e| TripPlannerError::Config(format!("Invalid static map URL: {}", e)))?;
    Ok(url.to_string())
}
