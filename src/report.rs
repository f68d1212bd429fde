use chrono::DateTime;

use crate::geocode::GeoLabel;

pub const UNKNOWN_LOCATION: &str = "unknown location";

/// "City, State, Country" from whichever parts are present, else the
/// provider's display name, else [`UNKNOWN_LOCATION`].
pub fn describe_place(label: &GeoLabel) -> String {
    let parts: Vec<&str> = [&label.city, &label.state, &label.country]
        .into_iter()
        .filter_map(|p| p.as_deref())
        .collect();

    if !parts.is_empty() {
        return parts.join(", ");
    }

    label
        .display_fallback
        .clone()
        .unwrap_or_else(|| UNKNOWN_LOCATION.to_string())
}

/// Always UTC so output does not depend on the host timezone.
fn format_timestamp(timestamp: i64) -> String {
    match DateTime::from_timestamp(timestamp, 0) {
        Some(dt) => dt.format("%a %b %d %H:%M:%S %Y UTC").to_string(),
        None => format!("@{}", timestamp),
    }
}

/// Render the status line posted back to the room.
pub fn format_report(timestamp: i64, latitude: f64, longitude: f64, label: &GeoLabel) -> String {
    format!(
        "On {}, the ISS was over {} ({:.4}°, {:.4}°).",
        format_timestamp(timestamp),
        describe_place(label),
        latitude,
        longitude
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn label(city: Option<&str>, state: Option<&str>, country: Option<&str>) -> GeoLabel {
        GeoLabel {
            city: city.map(String::from),
            state: state.map(String::from),
            country: country.map(String::from),
            display_fallback: None,
        }
    }

    #[test]
    fn test_golden_output() {
        let out = format_report(
            1_700_000_000,
            48.8566,
            2.3522,
            &label(Some("Paris"), None, Some("France")),
        );
        assert_eq!(
            out,
            "On Tue Nov 14 22:13:20 2023 UTC, the ISS was over Paris, France (48.8566°, 2.3522°)."
        );
    }

    #[test]
    fn test_deterministic() {
        let l = label(Some("Paris"), Some("Ile-de-France"), Some("France"));
        let a = format_report(42, 48.8566, 2.3522, &l);
        let b = format_report(42, 48.8566, 2.3522, &l);
        assert_eq!(a, b);
        assert!(a.contains("Paris, Ile-de-France, France"));
        assert!(a.contains("48.8566°"));
        assert!(a.contains("2.3522°"));
    }

    #[test]
    fn test_four_decimal_places() {
        let out = format_report(0, -33.868_812_3, 151.2, &GeoLabel::default());
        assert!(out.contains("(-33.8688°, 151.2000°)"));
        assert!(out.starts_with("On Thu Jan 01 00:00:00 1970 UTC"));
    }

    #[test]
    fn test_partial_fields_joined_in_order() {
        assert_eq!(describe_place(&label(None, Some("Texas"), None)), "Texas");
        assert_eq!(
            describe_place(&label(Some("Austin"), None, Some("United States"))),
            "Austin, United States"
        );
        assert_eq!(
            describe_place(&label(None, Some("Texas"), Some("United States"))),
            "Texas, United States"
        );
    }

    #[test]
    fn test_display_fallback_used_when_no_fields() {
        let l = GeoLabel {
            display_fallback: Some("Pacific Ocean".to_string()),
            ..GeoLabel::default()
        };
        assert_eq!(describe_place(&l), "Pacific Ocean");
        assert!(format_report(0, 0.0, -150.0, &l).contains("over Pacific Ocean ("));
    }

    #[test]
    fn test_fields_win_over_display_fallback() {
        let mut l = label(None, None, Some("Chile"));
        l.display_fallback = Some("Somewhere, Chile".to_string());
        assert_eq!(describe_place(&l), "Chile");
    }

    #[test]
    fn test_unknown_location_marker() {
        assert_eq!(describe_place(&GeoLabel::default()), UNKNOWN_LOCATION);
        assert!(format_report(0, 0.0, 0.0, &GeoLabel::default()).contains("over unknown location"));
    }

    #[test]
    fn test_out_of_range_timestamp() {
        let out = format_report(i64::MAX, 0.0, 0.0, &GeoLabel::default());
        assert!(out.starts_with(&format!("On @{},", i64::MAX)));
    }
}
