//! GPX file generation from tracks.
//!
//! Generates GPX 1.1 XML that the `fitseg` decoder reads back. GPX carries
//! positions and timestamps only, so sensor channels are not written and
//! samples without a GPS fix are left out.

use fitseg::Track;
use fitseg::geometry::semicircles_to_degrees;
use time::format_description::well_known::Rfc3339;

/// Generates a GPX 1.1 XML document from a track.
///
/// The generated GPX includes:
/// - Standard GPX 1.1 header with schema declarations
/// - Single track with a single track segment
/// - Each fixed point with lat, lon and timestamp
pub fn generate_gpx(track: &Track) -> Vec<u8> {
    let mut gpx = String::new();

    // GPX 1.1 header
    gpx.push_str(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
    gpx.push('\n');
    gpx.push_str(r#"<gpx version="1.1" creator="fitseg-test-data""#);
    gpx.push_str(r#" xmlns="http://www.topografix.com/GPX/1/1""#);
    gpx.push_str(r#" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance""#);
    gpx.push_str(r#" xsi:schemaLocation="http://www.topografix.com/GPX/1/1 http://www.topografix.com/GPX/1/1/gpx.xsd">"#);
    gpx.push('\n');

    let name = escape_xml(track.name());
    gpx.push_str("  <metadata>\n");
    gpx.push_str(&format!("    <name>{name}</name>\n"));
    gpx.push_str("  </metadata>\n");

    gpx.push_str("  <trk>\n");
    gpx.push_str(&format!("    <name>{name}</name>\n"));
    gpx.push_str("    <trkseg>\n");

    for point in track.points() {
        let Some((lat, lon)) = point.position() else {
            continue;
        };
        let Ok(time) = point.timestamp.format(&Rfc3339) else {
            continue;
        };
        gpx.push_str(&format!(
            r#"      <trkpt lat="{:.7}" lon="{:.7}">"#,
            semicircles_to_degrees(lat),
            semicircles_to_degrees(lon)
        ));
        gpx.push('\n');
        gpx.push_str(&format!("        <time>{time}</time>\n"));
        gpx.push_str("      </trkpt>\n");
    }

    gpx.push_str("    </trkseg>\n");
    gpx.push_str("  </trk>\n");
    gpx.push_str("</gpx>\n");

    gpx.into_bytes()
}

/// Escapes XML special characters in a string.
fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use fitseg::TrackPoint;
    use fitseg::geometry::degrees_to_semicircles;
    use time::macros::datetime;

    fn track(name: &str) -> Track {
        let start = datetime!(2020-05-21 08:00 UTC);
        let points = vec![
            TrackPoint::at(start).with_position(
                degrees_to_semicircles(40.015),
                degrees_to_semicircles(-105.2705),
            ),
            TrackPoint::at(start + time::Duration::seconds(30)),
            TrackPoint::at(start + time::Duration::seconds(60)).with_position(
                degrees_to_semicircles(40.016),
                degrees_to_semicircles(-105.2695),
            ),
        ];
        Track::new(name, points).unwrap()
    }

    #[test]
    fn test_generate_gpx_basic() {
        let gpx = String::from_utf8(generate_gpx(&track("Test Activity"))).unwrap();

        assert!(gpx.contains(r#"version="1.1""#));
        assert!(gpx.contains("<name>Test Activity</name>"));
        assert!(gpx.contains(r#"lat="40.0150000""#));
        assert!(gpx.contains(r#"lon="-105.2705000""#));
        assert!(gpx.contains("<time>2020-05-21T08:00:00Z</time>"));
        assert!(gpx.contains("<time>2020-05-21T08:01:00Z</time>"));
    }

    #[test]
    fn test_points_without_fix_are_skipped() {
        let gpx = String::from_utf8(generate_gpx(&track("Gaps"))).unwrap();
        assert_eq!(gpx.matches("<trkpt").count(), 2);
        assert!(!gpx.contains("08:00:30"));
    }

    #[test]
    fn test_generate_gpx_escapes_special_chars() {
        let gpx = String::from_utf8(generate_gpx(&track("Test & <Activity> \"Name\""))).unwrap();
        assert!(gpx.contains("Test &amp; &lt;Activity&gt; &quot;Name&quot;"));
    }
}
