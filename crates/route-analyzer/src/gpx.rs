use chrono::{DateTime, Utc};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use route_models::RoutePoint;

use crate::error::{AnalyzerError, AnalyzerResult};

#[derive(Default)]
struct PointBuilder {
    lat: f64,
    lon: f64,
    ele: Option<f64>,
    time: Option<DateTime<Utc>>,
}

impl PointBuilder {
    fn from_start(start: &BytesStart) -> AnalyzerResult<Self> {
        let mut lat = None;
        let mut lon = None;
        for attr in start.attributes() {
            let attr = attr.map_err(|e| AnalyzerError::Parse(e.to_string()))?;
            let value = attr
                .unescape_value()
                .map_err(|e| AnalyzerError::Parse(e.to_string()))?;
            match attr.key.as_ref() {
                b"lat" => lat = value.parse::<f64>().ok(),
                b"lon" => lon = value.parse::<f64>().ok(),
                _ => {}
            }
        }
        let lat = lat.ok_or_else(|| AnalyzerError::Parse("trkpt missing lat".into()))?;
        let lon = lon.ok_or_else(|| AnalyzerError::Parse("trkpt missing lon".into()))?;
        Ok(Self {
            lat,
            lon,
            ele: None,
            time: None,
        })
    }

    fn build(self) -> RoutePoint {
        let mut point = RoutePoint::new(self.lat, self.lon);
        if let Some(ele) = self.ele {
            point = point.with_elevation(ele);
        }
        if let Some(time) = self.time {
            point = point.with_timestamp(time);
        }
        point
    }
}

/// Parses GPX `<trkpt>` elements in document order across all `<trk>`/`<trkseg>`
/// blocks, concatenating them into a single flat point sequence.
pub fn parse_gpx(contents: &str) -> AnalyzerResult<Vec<RoutePoint>> {
    let mut reader = Reader::from_str(contents);
    reader.config_mut().trim_text(true);

    let mut points = Vec::new();
    let mut buf = Vec::new();
    let mut current: Option<PointBuilder> = None;
    let mut text_target: Option<&'static str> = None;

    loop {
        match reader
            .read_event_into(&mut buf)
            .map_err(|e| AnalyzerError::Parse(e.to_string()))?
        {
            Event::Start(e) if e.name().as_ref() == b"trkpt" => {
                current = Some(PointBuilder::from_start(&e)?);
            }
            Event::Empty(e) if e.name().as_ref() == b"trkpt" => {
                points.push(PointBuilder::from_start(&e)?.build());
            }
            Event::Start(e) if current.is_some() && e.name().as_ref() == b"ele" => {
                text_target = Some("ele");
            }
            Event::Start(e) if current.is_some() && e.name().as_ref() == b"time" => {
                text_target = Some("time");
            }
            Event::Text(e) => {
                if let (Some(target), Some(builder)) = (text_target, current.as_mut()) {
                    let text = e
                        .unescape()
                        .map_err(|err| AnalyzerError::Parse(err.to_string()))?;
                    match target {
                        "ele" => builder.ele = text.parse::<f64>().ok(),
                        "time" => {
                            builder.time = DateTime::parse_from_rfc3339(&text)
                                .ok()
                                .map(|dt| dt.with_timezone(&Utc));
                        }
                        _ => {}
                    }
                }
            }
            Event::End(e) => {
                let local = e.name();
                let local = local.as_ref();
                if local == b"ele" || local == b"time" {
                    text_target = None;
                } else if local == b"trkpt" {
                    if let Some(builder) = current.take() {
                        points.push(builder.build());
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(points)
}
