//! Timestamp parsing and formatting utilities.
//!
//! The editing core works in `f64` seconds internally; these helpers sit
//! at the tooling boundary, where durations arrive as `HH:MM:SS`,
//! `HH:MM:SS.mmm`, `MM:SS`, or plain `SS` strings and timelines are
//! rendered back for humans.

/// Parse a timestamp string to total seconds.
///
/// # Examples
/// ```
/// use podcam_models::timestamp::parse_timestamp;
/// assert_eq!(parse_timestamp("01:30:00").unwrap(), 5400.0);
/// assert_eq!(parse_timestamp("05:30").unwrap(), 330.0);
/// assert_eq!(parse_timestamp("90").unwrap(), 90.0);
/// ```
pub fn parse_timestamp(ts: &str) -> Result<f64, TimestampError> {
    let ts = ts.trim();
    if ts.is_empty() {
        return Err(TimestampError::Empty);
    }

    let parts: Vec<&str> = ts.split(':').collect();
    let components: Vec<f64> = parts
        .iter()
        .enumerate()
        .map(|(i, part)| {
            part.parse::<f64>()
                .map_err(|_| TimestampError::InvalidValue(i, part.to_string()))
        })
        .collect::<Result<_, _>>()?;

    if components.iter().any(|&c| c < 0.0) {
        return Err(TimestampError::Negative);
    }

    match components.as_slice() {
        [seconds] => Ok(*seconds),
        [minutes, seconds] => Ok(minutes * 60.0 + seconds),
        [hours, minutes, seconds] => Ok(hours * 3600.0 + minutes * 60.0 + seconds),
        _ => Err(TimestampError::InvalidFormat(ts.to_string())),
    }
}

/// Format seconds into an HH:MM:SS or HH:MM:SS.mmm string.
pub fn format_seconds(total_secs: f64) -> String {
    let hours = (total_secs / 3600.0).floor() as u32;
    let mins = ((total_secs % 3600.0) / 60.0).floor() as u32;
    let secs = total_secs % 60.0;

    // Include milliseconds if present
    if (secs - secs.floor()).abs() > 0.0001 {
        format!("{:02}:{:02}:{:06.3}", hours, mins, secs)
    } else {
        format!("{:02}:{:02}:{:02}", hours, mins, secs.floor() as u32)
    }
}

/// Timestamp parsing error.
#[derive(Debug, Clone, PartialEq)]
pub enum TimestampError {
    /// Timestamp string is empty
    Empty,
    /// Timestamp contains negative values
    Negative,
    /// Invalid numeric value for a component (index, raw text)
    InvalidValue(usize, String),
    /// Invalid timestamp format
    InvalidFormat(String),
}

impl std::fmt::Display for TimestampError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => write!(f, "Timestamp cannot be empty"),
            Self::Negative => write!(f, "Timestamp cannot be negative"),
            Self::InvalidValue(index, value) => {
                write!(f, "Invalid value '{}' in timestamp component {}", value, index)
            }
            Self::InvalidFormat(ts) => write!(
                f,
                "Invalid timestamp format '{}'. Use HH:MM:SS, HH:MM:SS.mmm, MM:SS, or SS",
                ts
            ),
        }
    }
}

impl std::error::Error for TimestampError {}
