//! Line classifier: turns one transport line into a protocol input.

/// Classified line
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LineKind {
    /// Real sensor reading
    Reading { temperature: f64, humidity: f64 },
    /// Both fields exactly zero, clock-sync request only
    Ping,
    /// Unusable line, discarded without side effects
    Malformed(MalformedReason),
}

/// Why a line was discarded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MalformedReason {
    /// Blank after trimming
    Empty,
    /// Tagged, but not with the configured marker
    MissingMarker,
    /// Not exactly two comma-separated fields
    FieldCount(usize),
    /// A field did not parse as a number
    NotNumeric,
    /// NaN or infinity
    NonFinite,
}

impl MalformedReason {
    /// Metric label
    pub fn as_label(&self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::MissingMarker => "missing_marker",
            Self::FieldCount(_) => "field_count",
            Self::NotNumeric => "not_numeric",
            Self::NonFinite => "non_finite",
        }
    }
}

/// Classifies `"<temp>,<hum>"` lines, optionally prefixed by `"<marker>: "`
#[derive(Debug, Clone, Default)]
pub struct LineClassifier {
    marker: Option<String>,
}

impl LineClassifier {
    /// With `Some(marker)` everything up to `"<marker>: "` is dropped, bare
    /// lines are taken as-is and lines tagged otherwise are rejected. With
    /// `None` any prefix ending in `": "` is stripped.
    pub fn new(marker: Option<String>) -> Self {
        Self {
            marker: marker.filter(|m| !m.is_empty()),
        }
    }

    pub fn marker(&self) -> Option<&str> {
        self.marker.as_deref()
    }

    pub fn classify(&self, line: &str) -> LineKind {
        let line = line.trim();
        if line.is_empty() {
            return LineKind::Malformed(MalformedReason::Empty);
        }

        let payload = match &self.marker {
            Some(marker) => {
                let needle = format!("{marker}: ");
                match line.split_once(needle.as_str()) {
                    Some((_, rest)) => rest,
                    // Tagged with something else
                    None if line.contains(": ") => {
                        return LineKind::Malformed(MalformedReason::MissingMarker)
                    }
                    None => line,
                }
            }
            None => line.rsplit_once(": ").map_or(line, |(_, rest)| rest),
        };

        let fields: Vec<&str> = payload.split(',').map(str::trim).collect();
        let [temp, hum] = fields.as_slice() else {
            return LineKind::Malformed(MalformedReason::FieldCount(fields.len()));
        };

        let (Ok(temperature), Ok(humidity)) = (temp.parse::<f64>(), hum.parse::<f64>()) else {
            return LineKind::Malformed(MalformedReason::NotNumeric);
        };
        if !temperature.is_finite() || !humidity.is_finite() {
            return LineKind::Malformed(MalformedReason::NonFinite);
        }

        if temperature == 0.0 && humidity == 0.0 {
            LineKind::Ping
        } else {
            LineKind::Reading {
                temperature,
                humidity,
            }
        }
    }
}
