use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

/// One capture instant rendered in the site's own zone and in a fixed
/// reference zone, each in a human-readable and a compact numeric form.
/// Downstream consumers sort and join on the compact forms, so they carry
/// four subsecond digits to keep rows written in the same second ordered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureTimestamps {
    /// Site-local, `%Y-%m-%d %H:%M:%S`.
    pub local: String,
    /// Site-local, `%Y%m%d%H%M%S` plus four subsecond digits.
    pub local_compact: String,
    /// Reference zone, `%Y-%m-%d %H:%M:%S`.
    pub reference: String,
    /// Reference zone, `%Y%m%d%H%M%S` plus four subsecond digits.
    pub reference_compact: String,
}

impl CaptureTimestamps {
    #[must_use]
    pub fn now(local_zone: Tz, reference_zone: Tz) -> Self {
        Self::at(Utc::now(), local_zone, reference_zone)
    }

    /// Render a known instant; [`CaptureTimestamps::now`] with the clock
    /// injectable for tests.
    #[must_use]
    pub fn at(instant: DateTime<Utc>, local_zone: Tz, reference_zone: Tz) -> Self {
        let local = instant.with_timezone(&local_zone);
        let reference = instant.with_timezone(&reference_zone);
        Self {
            local: human(&local),
            local_compact: compact(&local),
            reference: human(&reference),
            reference_compact: compact(&reference),
        }
    }

    /// Site-local `YYYYMMDD`, the token used in artifact names and dated
    /// remote directories.
    #[must_use]
    pub fn local_date(&self) -> &str {
        &self.local_compact[..8]
    }

    /// Site-local `HHMMSS` artifact-name token.
    #[must_use]
    pub fn local_time(&self) -> &str {
        &self.local_compact[8..14]
    }
}

fn human(dt: &DateTime<Tz>) -> String {
    dt.format("%Y-%m-%d %H:%M:%S").to_string()
}

fn compact(dt: &DateTime<Tz>) -> String {
    let subsec = (dt.timestamp_subsec_micros() / 100).min(9_999);
    format!("{}{subsec:04}", dt.format("%Y%m%d%H%M%S"))
}
