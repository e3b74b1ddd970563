use std::f64::consts::PI;

const EARTH_RADIUS_M: f64 = 6_371_000.0;
const DEG_TO_RAD: f64 = PI / 180.0;

/// Great-circle distance in meters between two WGS84 positions given in degrees.
pub fn haversine_distance(lat_1: f64, lon_1: f64, lat_2: f64, lon_2: f64) -> f64 {
    let d_lat = (lat_2 - lat_1) * DEG_TO_RAD;
    let d_lon = (lon_2 - lon_1) * DEG_TO_RAD;
    let lat_1_rad = lat_1 * DEG_TO_RAD;
    let lat_2_rad = lat_2 * DEG_TO_RAD;

    let h = (d_lat / 2.0).sin().powi(2)
        + lat_1_rad.cos() * lat_2_rad.cos() * (d_lon / 2.0).sin().powi(2);
    let angular = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());
    EARTH_RADIUS_M * angular
}
