//! Projected VN-2000 coordinates to geographic latitude/longitude
//!
//! Station tables store VN-2000 TM coordinates (central meridian 107°45'E,
//! scale 0.9996, false easting 500 km) with the `X` column holding the
//! northing and `Y` the easting. The datum shift to WGS84 is taken as zero.

const SEMI_MAJOR_AXIS: f64 = 6_378_137.0;
const FLATTENING: f64 = 1.0 / 298.257_223_563;
const CENTRAL_MERIDIAN_DEG: f64 = 107.75;
const SCALE_FACTOR: f64 = 0.9996;
const FALSE_EASTING: f64 = 500_000.0;

/// Inverse transverse Mercator for a VN-2000 station position.
///
/// Returns `(latitude, longitude)` in degrees.
pub fn vn2000_to_wgs84(x_northing: f64, y_easting: f64) -> (f64, f64) {
    let a = SEMI_MAJOR_AXIS;
    let e2 = FLATTENING * (2.0 - FLATTENING);
    let ep2 = e2 / (1.0 - e2);

    // Footpoint latitude from the meridian arc
    let m = x_northing / SCALE_FACTOR;
    let mu = m / (a * (1.0 - e2 / 4.0 - 3.0 * e2.powi(2) / 64.0 - 5.0 * e2.powi(3) / 256.0));
    let root = (1.0 - e2).sqrt();
    let e1 = (1.0 - root) / (1.0 + root);
    let phi1 = mu
        + (3.0 * e1 / 2.0 - 27.0 * e1.powi(3) / 32.0) * (2.0 * mu).sin()
        + (21.0 * e1.powi(2) / 16.0 - 55.0 * e1.powi(4) / 32.0) * (4.0 * mu).sin()
        + (151.0 * e1.powi(3) / 96.0) * (6.0 * mu).sin()
        + (1097.0 * e1.powi(4) / 512.0) * (8.0 * mu).sin();

    let (sin_phi, cos_phi) = phi1.sin_cos();
    let tan_phi = phi1.tan();
    let c1 = ep2 * cos_phi * cos_phi;
    let t1 = tan_phi * tan_phi;
    let w = 1.0 - e2 * sin_phi * sin_phi;
    let n1 = a / w.sqrt();
    let r1 = a * (1.0 - e2) / w.powf(1.5);
    let d = (y_easting - FALSE_EASTING) / (n1 * SCALE_FACTOR);

    let lat = phi1
        - (n1 * tan_phi / r1)
            * (d.powi(2) / 2.0
                - (5.0 + 3.0 * t1 + 10.0 * c1 - 4.0 * c1 * c1 - 9.0 * ep2) * d.powi(4) / 24.0
                + (61.0 + 90.0 * t1 + 298.0 * c1 + 45.0 * t1 * t1 - 252.0 * ep2 - 3.0 * c1 * c1)
                    * d.powi(6)
                    / 720.0);
    let lon = (d - (1.0 + 2.0 * t1 + c1) * d.powi(3) / 6.0
        + (5.0 - 2.0 * c1 + 28.0 * t1 - 3.0 * c1 * c1 + 8.0 * ep2 + 24.0 * t1 * t1) * d.powi(5)
            / 120.0)
        / cos_phi;

    (lat.to_degrees(), CENTRAL_MERIDIAN_DEG + lon.to_degrees())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn origin_maps_to_central_meridian() {
        let (lat, lon) = vn2000_to_wgs84(0.0, FALSE_EASTING);
        assert!(lat.abs() < 1e-12);
        assert!((lon - CENTRAL_MERIDIAN_DEG).abs() < 1e-12);
    }

    #[test]
    fn quang_ninh_station() {
        // 21°N 107.3°E projected with the forward transform
        let (lat, lon) = vn2000_to_wgs84(2_322_213.4567, 453_231.6743);
        assert!((lat - 21.0).abs() < 1e-6, "lat = {lat}");
        assert!((lon - 107.3).abs() < 1e-6, "lon = {lon}");
    }

    #[test]
    fn meridian_arc_at_twenty_degrees() {
        let (lat, lon) = vn2000_to_wgs84(2_211_481.3077, FALSE_EASTING);
        assert!((lat - 20.0).abs() < 1e-6);
        assert!((lon - CENTRAL_MERIDIAN_DEG).abs() < 1e-12);
    }
}
