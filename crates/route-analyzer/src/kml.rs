use chrono::{DateTime, Utc};
use quick_xml::events::Event;
use quick_xml::Reader;
use route_models::RoutePoint;

use crate::error::{AnalyzerError, AnalyzerResult};

/// Parses a KML `<coordinates>` block (plain `<LineString>`) or a
/// `<gx:Track>` (paired `<gx:coord>`/`<when>` elements, which also carry
/// per-point timestamps).
pub fn parse_kml(contents: &str) -> AnalyzerResult<Vec<RoutePoint>> {
    let mut reader = Reader::from_str(contents);
    reader.config_mut().trim_text(true);

    let mut points = Vec::new();
    let mut buf = Vec::new();
    let mut in_coordinates = false;
    let mut in_gx_coord = false;
    let mut in_when = false;
    let mut pending_times: Vec<DateTime<Utc>> = Vec::new();
    let mut gx_points: Vec<RoutePoint> = Vec::new();

    loop {
        match reader
            .read_event_into(&mut buf)
            .map_err(|e| AnalyzerError::Parse(e.to_string()))?
        {
            Event::Start(e) => match local_name(e.name().as_ref()) {
                "coordinates" => in_coordinates = true,
                "coord" => in_gx_coord = true,
                "when" => in_when = true,
                _ => {}
            },
            Event::Text(e) => {
                let text = e
                    .unescape()
                    .map_err(|err| AnalyzerError::Parse(err.to_string()))?;
                if in_coordinates {
                    for tuple in text.split_whitespace() {
                        if let Some(point) = parse_comma_tuple(tuple) {
                            points.push(point);
                        }
                    }
                } else if in_gx_coord {
                    if let Some(point) = parse_space_tuple(&text) {
                        gx_points.push(point);
                    }
                } else if in_when {
                    if let Ok(dt) = DateTime::parse_from_rfc3339(&text) {
                        pending_times.push(dt.with_timezone(&Utc));
                    }
                }
            }
            Event::End(e) => match local_name(e.name().as_ref()) {
                "coordinates" => in_coordinates = false,
                "coord" => in_gx_coord = false,
                "when" => in_when = false,
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    if !gx_points.is_empty() {
        for (point, time) in gx_points.iter_mut().zip(pending_times.into_iter()) {
            *point = point.with_timestamp(time);
        }
        return Ok(gx_points);
    }

    Ok(points)
}

/// Strips an XML namespace prefix (`gx:coord` -> `coord`) for comparison.
fn local_name(qualified: &[u8]) -> &str {
    let s = std::str::from_utf8(qualified).unwrap_or("");
    s.rsplit(':').next().unwrap_or(s)
}

fn parse_comma_tuple(tuple: &str) -> Option<RoutePoint> {
    let mut parts = tuple.split(',');
    let lon: f64 = parts.next()?.parse().ok()?;
    let lat: f64 = parts.next()?.parse().ok()?;
    let ele: Option<f64> = parts.next().and_then(|s| s.parse().ok());
    let mut point = RoutePoint::new(lat, lon);
    if let Some(ele) = ele {
        point = point.with_elevation(ele);
    }
    Some(point)
}

fn parse_space_tuple(text: &str) -> Option<RoutePoint> {
    let mut parts = text.split_whitespace();
    let lon: f64 = parts.next()?.parse().ok()?;
    let lat: f64 = parts.next()?.parse().ok()?;
    let ele: Option<f64> = parts.next().and_then(|s| s.parse().ok());
    let mut point = RoutePoint::new(lat, lon);
    if let Some(ele) = ele {
        point = point.with_elevation(ele);
    }
    Some(point)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_linestring_coordinates() {
        let kml = r#"<kml><Placemark><LineString>
<coordinates>-122.0,45.0,10 -122.001,45.001,12</coordinates>
</LineString></Placemark></kml>"#;
        let points = parse_kml(kml).unwrap();
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].lat, 45.0);
        assert_eq!(points[0].elevation_m, Some(10.0));
        assert!(points[0].timestamp.is_none());
    }

    #[test]
    fn parses_gx_track_with_timestamps() {
        let kml = r#"<kml><Placemark><gx:Track>
<when>2026-01-01T00:00:00Z</when>
<gx:coord>-122.0 45.0 10</gx:coord>
<when>2026-01-01T00:00:05Z</when>
<gx:coord>-122.001 45.001 12</gx:coord>
</gx:Track></Placemark></kml>"#;
        let points = parse_kml(kml).unwrap();
        assert_eq!(points.len(), 2);
        assert!(points[0].timestamp.is_some());
        assert!(points[1].timestamp.is_some());
    }
}
