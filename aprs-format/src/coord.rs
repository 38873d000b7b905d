// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! Latitude/longitude formatting (§4.8): uncompressed `DDMM.mmH` pairs and
//! the base91-compressed position encoding.

/// Formats latitude as `DDMM.mmH`, `H` in `{N, S}`.
pub fn format_lat_uncompressed(lat: f64) -> String {
    let hemi = if lat >= 0.0 { 'N' } else { 'S' };
    let lat = lat.abs();
    let deg = lat.trunc() as u32;
    let min = (lat.fract() * 60.0).min(59.99);
    format!("{deg:02}{min:05.2}{hemi}")
}

/// Formats longitude as `DDDMM.mmH`, `H` in `{E, W}`.
pub fn format_lon_uncompressed(lon: f64) -> String {
    let hemi = if lon >= 0.0 { 'E' } else { 'W' };
    let lon = lon.abs();
    let deg = lon.trunc() as u32;
    let min = (lon.fract() * 60.0).min(59.99);
    format!("{deg:03}{min:05.2}{hemi}")
}

const BASE91_DIGITS: usize = 4;
const BASE91_RADIX: i64 = 91;

fn base91_encode(mut value: i64, max: i64) -> [u8; BASE91_DIGITS] {
    value = value.clamp(0, max);
    let mut digits = [0u8; BASE91_DIGITS];
    for i in (0..BASE91_DIGITS).rev() {
        digits[i] = b'!' + (value % BASE91_RADIX) as u8;
        value /= BASE91_RADIX;
    }
    digits
}

/// Base91-compressed latitude, per §4.8:
/// `lat_scaled = round((90 - lat) * 380926)`.
pub fn compress_lat(lat: f64) -> [u8; BASE91_DIGITS] {
    let scaled = ((90.0 - lat) * 380_926.0).round() as i64;
    base91_encode(scaled, BASE91_RADIX.pow(BASE91_DIGITS as u32) - 1)
}

/// Base91-compressed longitude, per §4.8:
/// `lon_scaled = round((180 + lon) * 190463)`.
pub fn compress_lon(lon: f64) -> [u8; BASE91_DIGITS] {
    let scaled = ((180.0 + lon) * 190_463.0).round() as i64;
    base91_encode(scaled, BASE91_RADIX.pow(BASE91_DIGITS as u32) - 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uncompressed_equator_prime_meridian() {
        assert_eq!(format_lat_uncompressed(0.0), "0000.00N");
        assert_eq!(format_lon_uncompressed(0.0), "00000.00E");
    }

    #[test]
    fn uncompressed_negative_lat_lon_use_s_and_w() {
        assert_eq!(format_lat_uncompressed(-33.5), "3330.00S");
        assert_eq!(format_lon_uncompressed(-117.25), "11715.00W");
    }

    #[test]
    fn compressed_digits_stay_in_base91_range() {
        let lat = compress_lat(-90.0);
        let lon = compress_lon(180.0);
        for b in lat.iter().chain(lon.iter()) {
            assert!((b'!'..=b'!' + 90).contains(b));
        }
    }

    #[test]
    fn compressed_zero_zero_is_midpoint() {
        let lat = compress_lat(0.0);
        let lon = compress_lon(0.0);
        assert_eq!(std::str::from_utf8(&lat).unwrap().len(), 4);
        assert_eq!(std::str::from_utf8(&lon).unwrap().len(), 4);
    }
}
