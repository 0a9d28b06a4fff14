//! Rewrites DASH manifests so players fetch everything from the gateway.

use chrono::{DateTime, NaiveDateTime, TimeDelta, Utc};
use quick_xml::{
    events::{BytesStart, BytesText, Event},
    Reader, Writer,
};

use crate::{
    error::{EdgeError, EdgeResult},
    util::path::strip_origin,
};

const AVAILABILITY_START_TIME: &[u8] = b"availabilityStartTime";

/// Rewrite an MPD for local serving.
///
/// - Absolute `BaseURL` values are reduced to path, query and fragment.
/// - `MPD@availabilityStartTime` is moved forward by `time_offset_ms` and
///   written as `%Y-%m-%dT%H:%M:%SZ`.
///
/// Everything else is copied as is.
pub fn rewrite_mpd(content: &str, time_offset_ms: i64) -> EdgeResult<String> {
    let mut reader = Reader::from_str(content);
    let mut writer = Writer::new(Vec::new());

    let mut seen_mpd = false;
    // only the first text chunk of a BaseURL can carry scheme and host
    let mut in_base_url = false;

    loop {
        match reader.read_event()? {
            Event::Eof => break,
            Event::Start(e) if e.local_name().as_ref() == b"MPD" => {
                seen_mpd = true;
                writer.write_event(Event::Start(shift_start_time(&e, time_offset_ms)?))?;
            }
            Event::Empty(e) if e.local_name().as_ref() == b"MPD" => {
                seen_mpd = true;
                writer.write_event(Event::Empty(shift_start_time(&e, time_offset_ms)?))?;
            }
            Event::Start(e) if e.local_name().as_ref() == b"BaseURL" => {
                in_base_url = true;
                writer.write_event(Event::Start(e))?;
            }
            Event::Text(e) if in_base_url => {
                in_base_url = false;
                let raw = std::str::from_utf8(&e)?;
                let base_url = strip_origin(raw.trim());
                tracing::debug!("Rewriting BaseURL {} to {base_url}", raw.trim());
                writer.write_event(Event::Text(BytesText::from_escaped(base_url)))?;
            }
            Event::End(e) => {
                in_base_url = false;
                writer.write_event(Event::End(e))?;
            }
            event => writer.write_event(event)?,
        }
    }

    if !seen_mpd {
        return Err(EdgeError::MpdError("missing MPD element".to_string()));
    }

    Ok(String::from_utf8_lossy(&writer.into_inner()).into_owned())
}

fn shift_start_time(start: &BytesStart, time_offset_ms: i64) -> EdgeResult<BytesStart<'static>> {
    let mut shifted = start.to_owned();
    shifted.clear_attributes();

    for attr in start.attributes() {
        let attr = attr.map_err(quick_xml::Error::InvalidAttr)?;
        if attr.key.local_name().as_ref() != AVAILABILITY_START_TIME {
            shifted.push_attribute(attr);
            continue;
        }

        let key = std::str::from_utf8(attr.key.as_ref())?;
        let value = std::str::from_utf8(&attr.value)?;
        let adjusted = parse_xs_datetime(value.trim())? + TimeDelta::milliseconds(time_offset_ms);
        let adjusted = adjusted.format("%Y-%m-%dT%H:%M:%SZ").to_string();
        tracing::info!(
            "availabilityStartTime {value}, time offset {time_offset_ms}ms, adjusted to {adjusted}"
        );
        shifted.push_attribute((key, adjusted.as_str()));
    }

    Ok(shifted)
}

fn parse_xs_datetime(value: &str) -> EdgeResult<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            // xs:dateTime allows omitting the zone, treat it as UTC
            NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f").map(|dt| dt.and_utc())
        })?)
}
