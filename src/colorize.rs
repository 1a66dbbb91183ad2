//! Choropleth coloring of cities by magnitude or possibility.
//!
//! Threshold tables are evaluated from the highest bucket down; the first
//! match wins. City names from the boundary data and from the backend are
//! compared only through [`normalize_city`].

use std::collections::HashMap;
use std::f64::consts::PI;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::Quake;

/// An sRGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    #[must_use]
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Scale each channel by `factor` (clamped to [0, 1]).
    #[must_use]
    pub fn darken(self, factor: f64) -> Self {
        let factor = factor.clamp(0.0, 1.0);
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let scale = |c: u8| (f64::from(c) * factor).round() as u8;
        Self::rgb(scale(self.r), scale(self.g), scale(self.b))
    }

    /// Darker variant shown while the pointer hovers a region.
    #[must_use]
    pub fn hover(self) -> Self {
        self.darken(HOVER_FACTOR)
    }

    /// Closest xterm 256-color index, for terminal swatches.
    #[must_use]
    pub fn ansi256(self) -> u8 {
        let level = |c: u8| (u16::from(c) * 5 + 127) / 255;
        #[allow(clippy::cast_possible_truncation)]
        let idx = 16 + 36 * level(self.r) + 6 * level(self.g) + level(self.b);
        idx as u8
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

impl std::str::FromStr for Color {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s.trim().trim_start_matches('#');
        if hex.len() != 6 || !hex.is_ascii() {
            return Err(format!("expected #RRGGBB, got {s}"));
        }
        let channel = |i: usize| {
            u8::from_str_radix(&hex[i..i + 2], 16).map_err(|e| format!("invalid color {s}: {e}"))
        };
        Ok(Self::rgb(channel(0)?, channel(2)?, channel(4)?))
    }
}

impl Serialize for Color {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

// Magnitude buckets
pub const RED: Color = Color::rgb(0xFF, 0x00, 0x00); // mag >= 7.0
pub const ORANGE_RED: Color = Color::rgb(0xFF, 0x45, 0x00); // mag >= 6.0
pub const ORANGE: Color = Color::rgb(0xFF, 0xA5, 0x00); // mag >= 5.0
pub const GOLD: Color = Color::rgb(0xFF, 0xD7, 0x00); // mag >= 4.0
pub const LIGHT_GREEN: Color = Color::rgb(0x90, 0xEE, 0x90); // mag < 4.0

// Probability buckets
pub const PROB_GREEN: Color = Color::rgb(0x4C, 0xAF, 0x50); // <= 0.25
pub const PROB_YELLOW: Color = Color::rgb(0xFF, 0xEB, 0x3B); // <= 0.50
pub const PROB_ORANGE: Color = Color::rgb(0xFF, 0x98, 0x00); // <= 0.75
pub const PROB_RED: Color = Color::rgb(0xF4, 0x43, 0x36); // > 0.75

/// Neutral fill for cities without data.
pub const NO_DATA: Color = Color::rgb(0xD3, 0xD3, 0xD3);

const HOVER_FACTOR: f64 = 0.8;
const DATA_OPACITY: f64 = 0.8;
const NO_DATA_OPACITY: f64 = 0.4;

/// Fill style for one region.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MapFill {
    pub fill: Color,
    pub hover: Color,
    pub opacity: f64,
}

impl MapFill {
    fn from_color(fill: Color, has_data: bool) -> Self {
        Self {
            fill,
            hover: fill.hover(),
            opacity: if has_data {
                DATA_OPACITY
            } else {
                NO_DATA_OPACITY
            },
        }
    }
}

/// Which aggregate a map is colored by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MapMetric {
    /// Maximum magnitude per city
    #[default]
    Magnitude,
    /// Maximum possibility per city (0-1)
    Possibility,
}

impl std::str::FromStr for MapMetric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "magnitude" | "severity" => Ok(Self::Magnitude),
            "possibility" | "probability" | "prediction" => Ok(Self::Possibility),
            _ => Err(format!(
                "unknown map metric: {s} (expected: magnitude, possibility)"
            )),
        }
    }
}

/// Color for a city's maximum magnitude; `None` means no data.
#[must_use]
pub fn magnitude_color(mag: Option<f64>) -> Color {
    match mag {
        Some(m) if m >= 7.0 => RED,
        Some(m) if m >= 6.0 => ORANGE_RED,
        Some(m) if m >= 5.0 => ORANGE,
        Some(m) if m >= 4.0 => GOLD,
        Some(_) => LIGHT_GREEN,
        None => NO_DATA,
    }
}

/// Color for a possibility in [0, 1]; zero, below or NaN means no data.
#[must_use]
pub fn probability_color(p: f64) -> Color {
    match p {
        p if p.is_nan() || p <= 0.0 => NO_DATA,
        p if p <= 0.25 => PROB_GREEN,
        p if p <= 0.50 => PROB_YELLOW,
        p if p <= 0.75 => PROB_ORANGE,
        _ => PROB_RED,
    }
}

/// Fill for a region given its aggregate under `metric`.
#[must_use]
pub fn region_fill(metric: MapMetric, value: Option<f64>) -> MapFill {
    match metric {
        MapMetric::Magnitude => MapFill::from_color(magnitude_color(value), value.is_some()),
        MapMetric::Possibility => {
            let p = value.unwrap_or(0.0);
            MapFill::from_color(probability_color(p), p > 0.0)
        }
    }
}

/// Canonical form of a city name for matching.
///
/// Folds case (Turkish dotted and dotless I both become `i`), strips the
/// Turkish diacritics ı/ü/ö/ş/ç/ğ and collapses whitespace.
#[must_use]
pub fn normalize_city(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        match c {
            'İ' | 'I' | 'ı' => out.push('i'),
            'Ü' | 'ü' => out.push('u'),
            'Ö' | 'ö' => out.push('o'),
            'Ş' | 'ş' => out.push('s'),
            'Ç' | 'ç' => out.push('c'),
            'Ğ' | 'ğ' => out.push('g'),
            // combining dot above, left behind by some İ lowercasings
            '\u{0307}' => {}
            other => out.extend(other.to_lowercase()),
        }
    }
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Aggregate for one city.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CityStat {
    /// City name as the backend spelled it first
    pub name: String,
    /// Maximum of the metric over the city's records
    pub value: f64,
    /// Number of records for the city
    pub count: usize,
}

/// Per-city aggregates keyed by normalized name.
#[derive(Debug, Clone, Default)]
pub struct CityAggregates {
    metric: MapMetric,
    by_city: HashMap<String, CityStat>,
}

impl CityAggregates {
    /// Build the per-city maxima of `metric` over `records`.
    ///
    /// Records without the metric (e.g. possibility on an observed quake) are
    /// skipped.
    pub fn from_records<'a, Q, I>(metric: MapMetric, records: I) -> Self
    where
        Q: Quake + 'a,
        I: IntoIterator<Item = &'a Q>,
    {
        let mut by_city: HashMap<String, CityStat> = HashMap::new();
        for record in records {
            let value = match metric {
                MapMetric::Magnitude => Some(record.magnitude()),
                MapMetric::Possibility => record.possibility(),
            };
            let Some(value) = value else { continue };

            let city = &record.location().city;
            by_city
                .entry(normalize_city(city))
                .and_modify(|stat| {
                    stat.value = stat.value.max(value);
                    stat.count += 1;
                })
                .or_insert_with(|| CityStat {
                    name: city.clone(),
                    value,
                    count: 1,
                });
        }
        Self { metric, by_city }
    }

    #[must_use]
    pub fn metric(&self) -> MapMetric {
        self.metric
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.by_city.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_city.is_empty()
    }

    /// Look up a city by any spelling.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&CityStat> {
        self.by_city.get(&normalize_city(name))
    }

    /// Fill for the region named `name`.
    #[must_use]
    pub fn fill_for(&self, name: &str) -> MapFill {
        region_fill(self.metric, self.get(name).map(|s| s.value))
    }

    /// All aggregates, highest value first.
    #[must_use]
    pub fn ranked(&self) -> Vec<&CityStat> {
        let mut stats: Vec<&CityStat> = self.by_city.values().collect();
        stats.sort_by(|a, b| b.value.total_cmp(&a.value).then_with(|| a.name.cmp(&b.name)));
        stats
    }
}

/// A named region polygon in (longitude, latitude) degrees.
#[derive(Debug, Clone, PartialEq)]
pub struct Boundary {
    pub name: String,
    /// Outer rings; multi-polygons contribute one ring per part
    pub rings: Vec<Vec<[f64; 2]>>,
}

impl Boundary {
    /// Area-weighted centroid of the outer rings.
    ///
    /// Degenerate rings fall back to the vertex mean.
    #[must_use]
    pub fn centroid(&self) -> Option<[f64; 2]> {
        let mut area_sum = 0.0;
        let mut cx = 0.0;
        let mut cy = 0.0;
        let mut vertex_sum = [0.0, 0.0];
        let mut vertex_count = 0usize;

        for ring in &self.rings {
            for pair in ring.windows(2) {
                let [x0, y0] = pair[0];
                let [x1, y1] = pair[1];
                let cross = x0 * y1 - x1 * y0;
                area_sum += cross;
                cx += (x0 + x1) * cross;
                cy += (y0 + y1) * cross;
            }
            for p in ring {
                vertex_sum[0] += p[0];
                vertex_sum[1] += p[1];
                vertex_count += 1;
            }
        }

        if vertex_count == 0 {
            return None;
        }
        if area_sum.abs() < f64::EPSILON {
            #[allow(clippy::cast_precision_loss)]
            let n = vertex_count as f64;
            return Some([vertex_sum[0] / n, vertex_sum[1] / n]);
        }
        // area_sum is twice the signed area
        Some([cx / (3.0 * area_sum), cy / (3.0 * area_sum)])
    }
}

/// Read named polygons from a GeoJSON `FeatureCollection`.
///
/// The region name is taken from the `name` property. Features without a
/// name or with a non-polygon geometry are skipped.
#[must_use]
pub fn parse_boundaries(geojson: &Value) -> Vec<Boundary> {
    let Some(features) = geojson.get("features").and_then(Value::as_array) else {
        return Vec::new();
    };

    features
        .iter()
        .filter_map(|feature| {
            let name = feature
                .pointer("/properties/name")
                .and_then(Value::as_str)?
                .to_string();
            let geometry = feature.get("geometry")?;
            let coords = geometry.get("coordinates")?;
            let rings = match geometry.get("type").and_then(Value::as_str)? {
                "Polygon" => coords.get(0).map(parse_ring).into_iter().collect(),
                "MultiPolygon" => coords
                    .as_array()?
                    .iter()
                    .filter_map(|poly| poly.get(0).map(parse_ring))
                    .collect(),
                _ => return None,
            };
            Some(Boundary { name, rings })
        })
        .collect()
}

fn parse_ring(ring: &Value) -> Vec<[f64; 2]> {
    ring.as_array()
        .map(|points| {
            points
                .iter()
                .filter_map(|p| Some([p.get(0)?.as_f64()?, p.get(1)?.as_f64()?]))
                .collect()
        })
        .unwrap_or_default()
}

/// Screen-space view of a geographic extent using Web Mercator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    /// Extent covering Turkey's provinces.
    #[must_use]
    pub fn turkey(width: f64, height: f64) -> Self {
        Self {
            west: 25.5,
            south: 35.5,
            east: 45.0,
            north: 42.5,
            width,
            height,
        }
    }

    /// Project a (longitude, latitude) pair to pixel coordinates.
    #[must_use]
    pub fn project(&self, lon: f64, lat: f64) -> [f64; 2] {
        let x = (lon - self.west) / (self.east - self.west) * self.width;
        let top = mercator_y(self.north);
        let bottom = mercator_y(self.south);
        let y = (top - mercator_y(lat)) / (top - bottom) * self.height;
        [x, y]
    }
}

fn mercator_y(lat: f64) -> f64 {
    let rad = lat * PI / 180.0;
    (PI / 4.0 + rad / 2.0).tan().ln()
}

/// Style and popup anchor of one boundary on a rendered map.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegionStyle {
    pub name: String,
    /// The city's aggregate, when the loaded records mention it
    pub value: Option<f64>,
    #[serde(flatten)]
    pub fill: MapFill,
    /// Screen position of the centroid
    pub anchor: Option<[f64; 2]>,
}

/// Style every boundary; regions without records get the no-data fill.
#[must_use]
pub fn style_regions(
    aggregates: &CityAggregates,
    boundaries: &[Boundary],
    viewport: &Viewport,
) -> Vec<RegionStyle> {
    boundaries
        .iter()
        .map(|boundary| RegionStyle {
            name: boundary.name.clone(),
            value: aggregates.get(&boundary.name).map(|s| s.value),
            fill: aggregates.fill_for(&boundary.name),
            anchor: boundary
                .centroid()
                .map(|[lon, lat]| viewport.project(lon, lat)),
        })
        .collect()
}

/// Find the boundary for `city` under any spelling.
#[must_use]
pub fn find_boundary<'a>(boundaries: &'a [Boundary], city: &str) -> Option<&'a Boundary> {
    let wanted = normalize_city(city);
    boundaries.iter().find(|b| normalize_city(&b.name) == wanted)
}

/// A popup anchored over one city.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Popup {
    pub city: String,
    /// Screen position of the city's centroid
    pub anchor: [f64; 2],
}

/// Click popup and hover preview; the two are independent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MapSelection {
    popup: Option<Popup>,
    hover: Option<String>,
}

impl MapSelection {
    #[must_use]
    pub fn popup(&self) -> Option<&Popup> {
        self.popup.as_ref()
    }

    #[must_use]
    pub fn hovered(&self) -> Option<&str> {
        self.hover.as_deref()
    }

    /// Click on a city: open its popup, move it from another city, or close
    /// it when the same city is clicked again.
    pub fn click(&mut self, boundary: &Boundary, viewport: &Viewport) {
        let same = self
            .popup
            .as_ref()
            .is_some_and(|p| normalize_city(&p.city) == normalize_city(&boundary.name));
        if same {
            self.popup = None;
            return;
        }

        self.popup = boundary.centroid().map(|[lon, lat]| Popup {
            city: boundary.name.clone(),
            anchor: viewport.project(lon, lat),
        });
    }

    /// Click on empty map area.
    pub fn click_outside(&mut self) {
        self.popup = None;
    }

    pub fn hover(&mut self, city: &str) {
        self.hover = Some(city.to_string());
    }

    pub fn leave(&mut self) {
        self.hover = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EarthquakeRecord, Location, PredictionRecord};
    use pretty_assertions::assert_eq;

    fn square(name: &str, lon: f64, lat: f64) -> Boundary {
        Boundary {
            name: name.into(),
            rings: vec![vec![
                [lon, lat],
                [lon + 1.0, lat],
                [lon + 1.0, lat + 1.0],
                [lon, lat + 1.0],
                [lon, lat],
            ]],
        }
    }

    fn quake(city: &str, magnitude: f64) -> EarthquakeRecord {
        EarthquakeRecord {
            id: format!("{city}-{magnitude}"),
            magnitude,
            depth: 5.0,
            location: Location {
                city: city.into(),
                latitude: 38.0,
                longitude: 30.0,
            },
            occurrence_date: chrono::NaiveDateTime::default(),
        }
    }

    #[test]
    fn test_magnitude_buckets() {
        assert_eq!(magnitude_color(Some(7.0)), RED);
        assert_eq!(magnitude_color(Some(6.5)), ORANGE_RED);
        assert_eq!(magnitude_color(Some(5.5)), ORANGE);
        assert_eq!(magnitude_color(Some(4.2)), GOLD);
        assert_eq!(magnitude_color(Some(2.0)), LIGHT_GREEN);
        assert_eq!(magnitude_color(None), NO_DATA);
    }

    #[test]
    fn test_probability_buckets() {
        assert_eq!(probability_color(0.0), NO_DATA);
        assert_eq!(probability_color(0.25), PROB_GREEN);
        assert_eq!(probability_color(0.26), PROB_YELLOW);
        assert_eq!(probability_color(0.5), PROB_YELLOW);
        assert_eq!(probability_color(0.75), PROB_ORANGE);
        assert_eq!(probability_color(0.9), PROB_RED);
    }

    #[test]
    fn test_nan_probability_has_no_data() {
        assert_eq!(probability_color(f64::NAN), NO_DATA);
        let fill = region_fill(MapMetric::Possibility, Some(f64::NAN));
        assert_eq!(fill, region_fill(MapMetric::Possibility, None));
    }

    #[test]
    fn test_no_data_is_dimmed() {
        let fill = region_fill(MapMetric::Magnitude, None);
        assert_eq!(fill.fill, NO_DATA);
        assert!(fill.opacity < region_fill(MapMetric::Magnitude, Some(3.0)).opacity);
    }

    #[test]
    fn test_hover_is_darker() {
        let hover = ORANGE.hover();
        assert_eq!(hover, Color::rgb(0xCC, 0x84, 0x00));
        assert_eq!(ORANGE.hover(), hover);
        assert_eq!(region_fill(MapMetric::Magnitude, Some(5.0)).hover, hover);
    }

    #[test]
    fn test_color_hex() {
        assert_eq!(ORANGE_RED.to_string(), "#FF4500");
        assert_eq!("#ff4500".parse::<Color>(), Ok(ORANGE_RED));
        assert!("#ff45".parse::<Color>().is_err());
    }

    #[test]
    fn test_normalize_istanbul() {
        let expected = normalize_city("istanbul");
        assert_eq!(normalize_city("İstanbul"), expected);
        assert_eq!(normalize_city("ISTANBUL"), expected);
        assert_eq!(normalize_city("  Istanbul "), expected);
    }

    #[test]
    fn test_normalize_turkish_letters() {
        assert_eq!(normalize_city("Şanlıurfa"), "sanliurfa");
        assert_eq!(normalize_city("MUĞLA"), "mugla");
        assert_eq!(normalize_city("Çanakkale"), "canakkale");
        assert_eq!(normalize_city("Gümüşhane"), "gumushane");
        assert_eq!(normalize_city("Kahramanmaraş"), normalize_city("KAHRAMANMARAS"));
    }

    #[test]
    fn test_aggregates_take_maximum() {
        let records = vec![quake("İzmir", 4.1), quake("IZMIR", 6.2), quake("Van", 3.0)];
        let agg = CityAggregates::from_records(MapMetric::Magnitude, &records);

        assert_eq!(agg.len(), 2);
        let izmir = agg.get("izmir").expect("izmir");
        assert_eq!(izmir.value, 6.2);
        assert_eq!(izmir.count, 2);
        assert_eq!(agg.fill_for("İZMİR").fill, ORANGE_RED);
        assert_eq!(agg.fill_for("Ankara").fill, NO_DATA);
        assert_eq!(agg.ranked()[0].name, "İzmir");
    }

    #[test]
    fn test_possibility_aggregates() {
        let records = vec![PredictionRecord {
            id: "1".into(),
            magnitude: 5.0,
            depth: 9.0,
            location: Location {
                city: "Düzce".into(),
                latitude: 40.8,
                longitude: 31.1,
            },
            occurrence_date: chrono::NaiveDateTime::default(),
            possibility: 0.6,
            prediction_date: chrono::NaiveDateTime::default(),
        }];
        let agg = CityAggregates::from_records(MapMetric::Possibility, &records);
        assert_eq!(agg.fill_for("duzce").fill, PROB_ORANGE);

        let observed = vec![quake("Düzce", 5.0)];
        let agg = CityAggregates::from_records(MapMetric::Possibility, &observed);
        assert!(agg.is_empty());
    }

    #[test]
    fn test_centroid_of_square() {
        let c = square("A", 30.0, 38.0).centroid().expect("centroid");
        assert!((c[0] - 30.5).abs() < 1e-9);
        assert!((c[1] - 38.5).abs() < 1e-9);
    }

    #[test]
    fn test_projection_corners() {
        let vp = Viewport::turkey(1000.0, 500.0);
        let [x, y] = vp.project(vp.west, vp.north);
        assert!(x.abs() < 1e-9 && y.abs() < 1e-9);
        let [x, y] = vp.project(vp.east, vp.south);
        assert!((x - 1000.0).abs() < 1e-9 && (y - 500.0).abs() < 1e-9);
    }

    #[test]
    fn test_single_popup() {
        let vp = Viewport::turkey(1000.0, 500.0);
        let a = square("Ankara", 32.0, 39.5);
        let b = square("Bursa", 28.5, 39.8);
        let mut sel = MapSelection::default();

        sel.click(&a, &vp);
        assert_eq!(sel.popup().map(|p| p.city.as_str()), Some("Ankara"));

        sel.click(&b, &vp);
        assert_eq!(sel.popup().map(|p| p.city.as_str()), Some("Bursa"));
        let [lon, lat] = b.centroid().expect("centroid");
        assert_eq!(sel.popup().map(|p| p.anchor), Some(vp.project(lon, lat)));

        sel.click(&b, &vp);
        assert!(sel.popup().is_none());

        sel.click(&a, &vp);
        sel.click_outside();
        assert!(sel.popup().is_none());
    }

    #[test]
    fn test_hover_independent_of_popup() {
        let vp = Viewport::turkey(800.0, 400.0);
        let mut sel = MapSelection::default();
        sel.click(&square("Ankara", 32.0, 39.5), &vp);
        sel.hover("Bursa");
        assert_eq!(sel.hovered(), Some("Bursa"));
        assert!(sel.popup().is_some());

        sel.leave();
        assert!(sel.popup().is_some());
        sel.click_outside();
        sel.hover("Van");
        assert_eq!(sel.hovered(), Some("Van"));
    }

    #[test]
    fn test_style_regions_marks_missing_cities() {
        let records = [quake("Van", 7.2)];
        let agg = CityAggregates::from_records(MapMetric::Magnitude, &records);
        let boundaries = [square("VAN", 43.0, 38.0), square("Bitlis", 42.0, 38.0)];
        let viewport = Viewport::turkey(800.0, 400.0);

        let styles = style_regions(&agg, &boundaries, &viewport);
        assert_eq!(styles[0].value, Some(7.2));
        assert_eq!(styles[0].fill.fill, RED);
        assert_eq!(styles[1].value, None);
        assert_eq!(styles[1].fill, region_fill(MapMetric::Magnitude, None));

        let [lon, lat] = boundaries[0].centroid().expect("centroid");
        assert_eq!(styles[0].anchor, Some(viewport.project(lon, lat)));
        assert_eq!(find_boundary(&boundaries, "bitlis").map(|b| b.name.as_str()), Some("Bitlis"));
        assert!(find_boundary(&boundaries, "Hatay").is_none());
    }

    #[test]
    fn test_parse_boundaries() {
        let geojson = serde_json::json!({
            "type": "FeatureCollection",
            "features": [
                {
                    "type": "Feature",
                    "properties": {"name": "Ankara"},
                    "geometry": {"type": "Polygon", "coordinates": [[[32.0, 39.0], [33.0, 39.0], [33.0, 40.0], [32.0, 39.0]]]}
                },
                {
                    "type": "Feature",
                    "properties": {"name": "Çanakkale"},
                    "geometry": {"type": "MultiPolygon", "coordinates": [
                        [[[26.0, 40.0], [27.0, 40.0], [27.0, 41.0], [26.0, 40.0]]],
                        [[[25.6, 40.1], [25.9, 40.1], [25.9, 40.3], [25.6, 40.1]]]
                    ]}
                },
                {"type": "Feature", "properties": {}, "geometry": {"type": "Point", "coordinates": [1.0, 2.0]}}
            ]
        });
        let boundaries = parse_boundaries(&geojson);
        assert_eq!(boundaries.len(), 2);
        assert_eq!(boundaries[1].rings.len(), 2);
        assert_eq!(boundaries[0].rings[0].len(), 4);
    }
}
