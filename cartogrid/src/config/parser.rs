//! INI parsing logic for converting `Ini` → `ConfigFile`.
//!
//! This is the single place where INI key names are mapped to struct fields.

use ini::{Ini, Properties};
use std::str::FromStr;

use super::file::{ConfigError, ConfigFile};
use crate::coord::{Location, ZoomRange};

/// Parse an `Ini` object into a `ConfigFile`.
///
/// Starts from `ConfigFile::default()` and overlays any values found in the INI.
pub(super) fn parse_ini(ini: &Ini) -> Result<ConfigFile, ConfigError> {
    let mut config = ConfigFile::default();

    // [grid] section
    if let Some(section) = ini.section(Some("grid")) {
        if let Some(v) = positive(section, "grid", "tile_width")? {
            config.grid.tile.width = v;
        }
        if let Some(v) = positive(section, "grid", "tile_height")? {
            config.grid.tile.height = v;
        }
        if let Some(v) = positive(section, "grid", "viewport_width")? {
            config.grid.viewport.width = v;
        }
        if let Some(v) = positive(section, "grid", "viewport_height")? {
            config.grid.viewport.height = v;
        }
        if let Some(v) = number::<u64>(section, "grid", "retention_ticks")? {
            config.grid.retention_ticks = v;
        }
        if let Some(v) = number::<usize>(section, "grid", "max_cached_tiles")? {
            // 0 disables the cap
            config.grid.max_cached_tiles = (v > 0).then_some(v);
        }
        if let Some(v) = positive(section, "grid", "load_channel_capacity")? {
            config.grid.load_channel_capacity = v as usize;
        }
    }

    // [zoom] section
    if let Some(section) = ini.section(Some("zoom")) {
        let min = number::<u32>(section, "zoom", "min")?.unwrap_or(config.grid.zoom.min);
        let max = number::<u32>(section, "zoom", "max")?.unwrap_or(config.grid.zoom.max);
        config.grid.zoom = ZoomRange::new(min, max).map_err(|e| ConfigError::InvalidValue {
            section: "zoom".to_string(),
            key: "min".to_string(),
            value: min.to_string(),
            reason: e.to_string(),
        })?;
    }

    // [fetch] section
    if let Some(section) = ini.section(Some("fetch")) {
        if let Some(v) = section.get("base_url") {
            let v = v.trim().trim_end_matches('/');
            if !v.is_empty() {
                config.fetch.base_url = v.to_string();
            }
        }
        if let Some(v) = section.get("user_agent") {
            let v = v.trim();
            if !v.is_empty() {
                config.fetch.user_agent = v.to_string();
            }
        }
        if let Some(v) = number::<u64>(section, "fetch", "timeout_secs")? {
            config.fetch.timeout_secs = v;
        }
        if let Some(v) = positive(section, "fetch", "max_concurrent")? {
            config.fetch.max_concurrent = v as usize;
        }
    }

    // [start] section: either world pixels (x, y) or geographic (lat, lon)
    if let Some(section) = ini.section(Some("start")) {
        let z = number::<f64>(section, "start", "z")?.unwrap_or(config.start.z);
        let lat = number::<f64>(section, "start", "lat")?;
        let lon = number::<f64>(section, "start", "lon")?;

        config.start = match (lat, lon) {
            (Some(lat), Some(lon)) => {
                let zoom = z.round().max(0.0) as u32;
                Location::from_lat_lon(lat, lon, zoom, config.grid.tile).map_err(
                    |e| ConfigError::InvalidValue {
                        section: "start".to_string(),
                        key: "lat/lon".to_string(),
                        value: format!("{}, {}", lat, lon),
                        reason: e.to_string(),
                    },
                )?
            }
            _ => Location::new(
                number::<f64>(section, "start", "x")?.unwrap_or(config.start.x),
                number::<f64>(section, "start", "y")?.unwrap_or(config.start.y),
                z,
            ),
        };
    }

    Ok(config)
}

/// Reads an optional numeric key.
fn number<T: FromStr>(
    section: &Properties,
    section_name: &str,
    key: &str,
) -> Result<Option<T>, ConfigError> {
    let Some(raw) = section.get(key) else {
        return Ok(None);
    };
    raw.trim()
        .parse()
        .map(Some)
        .map_err(|_| ConfigError::InvalidValue {
            section: section_name.to_string(),
            key: key.to_string(),
            value: raw.to_string(),
            reason: format!("expected a {}", std::any::type_name::<T>()),
        })
}

/// Reads an optional size key that must be a positive integer.
fn positive(
    section: &Properties,
    section_name: &str,
    key: &str,
) -> Result<Option<u32>, ConfigError> {
    match section.get(key).map(|raw| (raw, raw.trim().parse::<u32>())) {
        None => Ok(None),
        Some((_, Ok(v))) if v > 0 => Ok(Some(v)),
        Some((raw, _)) => Err(ConfigError::InvalidValue {
            section: section_name.to_string(),
            key: key.to_string(),
            value: raw.to_string(),
            reason: "must be a positive integer".to_string(),
        }),
    }
}
