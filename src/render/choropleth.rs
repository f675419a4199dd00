//! Self-contained HTML choropleth with an inline SVG map.
//!
//! Regions come from a GeoJSON `FeatureCollection` and are joined to
//! aggregated values through one feature property. Coordinates are drawn
//! equirectangular (lon → x, lat → −y) and fitted to the canvas.

use geojson::{Feature, FeatureCollection, GeoJson};
use std::collections::HashMap;
use std::fmt::Write as _;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::error::{ProcessingError, Result};
use crate::utils::constants::{DEFAULT_KEY_PROPERTY, MAP_HEIGHT, MAP_WIDTH};

const PADDING: f64 = 10.0;

/// RGB color
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// Fill for regions without a value.
pub const NO_DATA_COLOR: Color = Color::new(0xcc, 0xcc, 0xcc);

/// Yellow → orange → red, low to high irradiance.
const GRADIENT: [Color; 5] = [
    Color::new(0xff, 0xff, 0xb2),
    Color::new(0xfe, 0xcc, 0x5c),
    Color::new(0xfd, 0x8d, 0x3c),
    Color::new(0xf0, 0x3b, 0x20),
    Color::new(0xbd, 0x00, 0x26),
];

/// Linear color interpolation
fn interpolate_color(a: Color, b: Color, t: f64) -> Color {
    let t = t.clamp(0.0, 1.0);
    let mix = |x: u8, y: u8| (x as f64 + (y as f64 - x as f64) * t).round() as u8;
    Color::new(mix(a.r, b.r), mix(a.g, b.g), mix(a.b, b.b))
}

/// Color for `value` on the gradient spanning `[min, max]`.
pub fn scale_color(value: f64, min: f64, max: f64) -> Color {
    let t = if max > min {
        ((value - min) / (max - min)).clamp(0.0, 1.0)
    } else {
        0.5
    };
    let segments = (GRADIENT.len() - 1) as f64;
    let position = t * segments;
    let index = (position.floor() as usize).min(GRADIENT.len() - 2);
    interpolate_color(GRADIENT[index], GRADIENT[index + 1], position - index as f64)
}

fn normalize_key(key: &str) -> String {
    key.trim().to_lowercase()
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// One boundary ready to draw: its key and outer/inner rings in lon/lat.
#[derive(Debug, Clone)]
struct Region {
    name: String,
    rings: Vec<Vec<(f64, f64)>>,
}

fn ring_points(ring: &[Vec<f64>]) -> Vec<(f64, f64)> {
    ring.iter()
        .filter(|p| p.len() >= 2)
        .map(|p| (p[0], p[1]))
        .collect()
}

fn region_from_feature(feature: &Feature, key_property: &str) -> Option<Region> {
    let name = match feature.property(key_property)? {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    };

    let rings = match &feature.geometry.as_ref()?.value {
        geojson::Value::Polygon(polygon) => polygon.iter().map(|r| ring_points(r)).collect(),
        geojson::Value::MultiPolygon(polygons) => polygons
            .iter()
            .flat_map(|polygon| polygon.iter().map(|r| ring_points(r)))
            .collect(),
        _ => return None,
    };

    Some(Region { name, rings })
}

/// Maps lon/lat into SVG canvas coordinates.
#[derive(Debug, Clone, Copy)]
struct Projection {
    min_lon: f64,
    max_lat: f64,
    scale: f64,
    offset_x: f64,
    offset_y: f64,
}

impl Projection {
    fn fit(regions: &[Region], width: u32, height: u32) -> Option<Self> {
        let points = regions.iter().flat_map(|r| r.rings.iter().flatten());
        let (mut min_lon, mut max_lon, mut min_lat, mut max_lat) =
            (f64::INFINITY, f64::NEG_INFINITY, f64::INFINITY, f64::NEG_INFINITY);
        for &(lon, lat) in points {
            min_lon = min_lon.min(lon);
            max_lon = max_lon.max(lon);
            min_lat = min_lat.min(lat);
            max_lat = max_lat.max(lat);
        }
        if !min_lon.is_finite() || !min_lat.is_finite() {
            return None;
        }

        let usable_w = width as f64 - 2.0 * PADDING;
        let usable_h = height as f64 - 2.0 * PADDING;
        let span_lon = (max_lon - min_lon).max(f64::EPSILON);
        let span_lat = (max_lat - min_lat).max(f64::EPSILON);
        let scale = (usable_w / span_lon).min(usable_h / span_lat);

        Some(Self {
            min_lon,
            max_lat,
            scale,
            offset_x: PADDING + (usable_w - span_lon * scale) / 2.0,
            offset_y: PADDING + (usable_h - span_lat * scale) / 2.0,
        })
    }

    fn project(&self, lon: f64, lat: f64) -> (f64, f64) {
        (
            self.offset_x + (lon - self.min_lon) * self.scale,
            self.offset_y + (self.max_lat - lat) * self.scale,
        )
    }

    fn path(&self, rings: &[Vec<(f64, f64)>]) -> String {
        let mut d = String::new();
        for ring in rings.iter().filter(|r| r.len() >= 3) {
            for (i, &(lon, lat)) in ring.iter().enumerate() {
                let (x, y) = self.project(lon, lat);
                let cmd = if i == 0 { 'M' } else { 'L' };
                let _ = write!(d, "{}{:.2},{:.2}", cmd, x, y);
            }
            d.push('Z');
        }
        d
    }
}

/// Renders aggregated values onto boundary polygons.
pub struct ChoroplethRenderer {
    features: Vec<Feature>,
    key_property: String,
    title: String,
    width: u32,
    height: u32,
}

impl ChoroplethRenderer {
    pub fn from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        debug!(path = %path.display(), "Read boundary file");
        Self::from_geojson_str(&content)
    }

    pub fn from_geojson_str(content: &str) -> Result<Self> {
        let collection = match content.parse::<GeoJson>()? {
            GeoJson::FeatureCollection(collection) => collection,
            _ => {
                return Err(ProcessingError::Render(
                    "Boundary file must be a GeoJSON FeatureCollection".to_string(),
                ))
            }
        };
        Ok(Self::from_collection(collection))
    }

    pub fn from_collection(collection: FeatureCollection) -> Self {
        Self {
            features: collection.features,
            key_property: DEFAULT_KEY_PROPERTY.to_string(),
            title: "Solar irradiance".to_string(),
            width: MAP_WIDTH,
            height: MAP_HEIGHT,
        }
    }

    /// Feature property joined against the aggregated group keys.
    pub fn with_key_property(mut self, key_property: &str) -> Self {
        self.key_property = key_property.to_string();
        self
    }

    pub fn with_title(mut self, title: &str) -> Self {
        self.title = title.to_string();
        self
    }

    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    fn regions(&self) -> Vec<Region> {
        self.features
            .iter()
            .filter_map(|f| region_from_feature(f, &self.key_property))
            .collect()
    }

    /// Polygon features that carry the key property.
    pub fn region_count(&self) -> usize {
        self.regions().len()
    }

    /// Build the complete HTML document.
    pub fn render(&self, data: &[(String, f64)]) -> Result<String> {
        let regions = self.regions();
        let projection = Projection::fit(&regions, self.width, self.height).ok_or_else(|| {
            ProcessingError::Render(format!(
                "No polygon features carry the '{}' property",
                self.key_property
            ))
        })?;

        let values: HashMap<String, f64> = data
            .iter()
            .map(|(key, value)| (normalize_key(key), *value))
            .collect();

        let region_keys: Vec<String> = regions.iter().map(|r| normalize_key(&r.name)).collect();
        for (key, _) in data {
            if !region_keys.contains(&normalize_key(key)) {
                warn!(group = %key, "No boundary matches this group");
            }
        }

        let (min, max) = data.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), (_, v)| {
            (lo.min(*v), hi.max(*v))
        });

        let mut svg = String::new();
        let _ = writeln!(
            svg,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
            w = self.width,
            h = self.height
        );

        let mut matched = 0;
        for (region, key) in regions.iter().zip(&region_keys) {
            let value = values.get(key).copied();
            let fill = match value {
                Some(v) => {
                    matched += 1;
                    scale_color(v, min, max)
                }
                None => NO_DATA_COLOR,
            };
            let label = match value {
                Some(v) => format!("{}: {:.2}", region.name, v),
                None => format!("{}: no data", region.name),
            };
            let _ = writeln!(
                svg,
                r##"  <path d="{}" fill="{}" fill-rule="evenodd" stroke="#ffffff" stroke-width="0.5"><title>{}</title></path>"##,
                projection.path(&region.rings),
                fill.to_hex(),
                escape_html(&label)
            );
        }
        svg.push_str("</svg>\n");

        info!(
            regions = regions.len(),
            matched,
            groups = data.len(),
            "Choropleth rendered"
        );

        Ok(self.document(&svg, data, min, max))
    }

    fn legend(&self, data: &[(String, f64)], min: f64, max: f64) -> String {
        let mut legend = String::from(r#"<div class="legend">"#);
        if !data.is_empty() {
            let stops: Vec<String> = GRADIENT.iter().map(|c| c.to_hex()).collect();
            let _ = write!(
                legend,
                r#"<span>{:.2}</span><span class="bar" style="background: linear-gradient(to right, {})"></span><span>{:.2}</span>"#,
                min,
                stops.join(", "),
                max
            );
        }
        let _ = write!(
            legend,
            r#"<span class="swatch" style="background: {}"></span><span>No data</span></div>"#,
            NO_DATA_COLOR.to_hex()
        );
        legend
    }

    fn document(&self, svg: &str, data: &[(String, f64)], min: f64, max: f64) -> String {
        let title = escape_html(&self.title);
        let mut rows = String::new();
        for (key, value) in data {
            let _ = writeln!(
                rows,
                "<tr><td>{}</td><td>{:.2}</td></tr>",
                escape_html(key),
                value
            );
        }

        format!(
            r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>{title}</title>
<style>
body {{ font-family: sans-serif; margin: 1.5em; }}
.legend {{ display: flex; align-items: center; gap: 0.5em; margin: 0.5em 0; }}
.legend .bar {{ display: inline-block; width: 240px; height: 14px; }}
.legend .swatch {{ display: inline-block; width: 14px; height: 14px; margin-left: 1.5em; }}
table {{ border-collapse: collapse; }}
td, th {{ border: 1px solid #ddd; padding: 2px 8px; }}
</style>
</head>
<body>
<h1>{title}</h1>
{svg}{legend}
<table>
<thead><tr><th>{property}</th><th>Mean</th></tr></thead>
<tbody>
{rows}</tbody>
</table>
</body>
</html>
"#,
            title = title,
            svg = svg,
            legend = self.legend(data, min, max),
            property = escape_html(&self.key_property),
            rows = rows
        )
    }

    pub fn write(&self, data: &[(String, f64)], path: &Path) -> Result<()> {
        let html = self.render(data)?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, html)?;
        info!(path = %path.display(), "Map written");
        Ok(())
    }
}
