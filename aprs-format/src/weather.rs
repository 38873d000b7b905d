// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! Weather info field assembly (§4.8, §4.9): unit conversion from SI
//! environment-metrics readings into the APRS positionless weather fields.

/// Raw environment-metrics readings in SI units, as decoded from a
/// Meshtastic telemetry packet. Any field may be absent.
#[derive(Debug, Clone, Default)]
pub struct WeatherReadings {
    pub wind_direction_deg: Option<f64>,
    pub wind_speed_ms: Option<f64>,
    pub wind_gust_ms: Option<f64>,
    pub temperature_c: Option<f64>,
    pub rain_1h_mm: Option<f64>,
    pub rain_24h_mm: Option<f64>,
    pub rain_since_midnight_mm: Option<f64>,
    pub humidity_pct: Option<f64>,
    pub pressure_hpa: Option<f64>,
}

impl WeatherReadings {
    /// Per §4.9: weather is only emitted when any relevant field is
    /// present.
    pub fn any_present(&self) -> bool {
        self.wind_direction_deg.is_some()
            || self.wind_speed_ms.is_some()
            || self.wind_gust_ms.is_some()
            || self.temperature_c.is_some()
            || self.rain_1h_mm.is_some()
            || self.rain_24h_mm.is_some()
            || self.rain_since_midnight_mm.is_some()
            || self.humidity_pct.is_some()
            || self.pressure_hpa.is_some()
    }
}

const MISSING_3: &str = "...";
const MISSING_2: &str = "..";
const MISSING_5: &str = ".....";

fn field3(value: Option<i32>) -> String {
    match value {
        Some(v) => format!("{v:03}"),
        None => MISSING_3.to_string(),
    }
}

fn humidity_field(pct: Option<f64>) -> String {
    match pct {
        // 100% is conventionally encoded as 00 since the field is two digits.
        Some(p) if p.round() as i32 >= 100 => "00".to_string(),
        Some(p) => format!("{:02}", p.round().clamp(0.0, 99.0) as i32),
        None => MISSING_2.to_string(),
    }
}

fn barometric_field(hpa: Option<f64>) -> String {
    match hpa {
        Some(h) => format!("{:05}", (h * 10.0).round().clamp(0.0, 99_999.0) as i32),
        None => MISSING_5.to_string(),
    }
}

fn ms_to_mph(ms: f64) -> i32 {
    (ms * 2.236_94).round() as i32
}

fn celsius_to_fahrenheit(c: f64) -> i32 {
    (c * 9.0 / 5.0 + 32.0).round() as i32
}

fn mm_to_hundredths_inch(mm: f64) -> i32 {
    (mm * 3.937_007_9).round() as i32
}

/// Formats the `_cDIRsSPDgGUSTtTEMPrR1PR24PRMIDhHUMbBARO` weather fragment.
pub fn format_weather_info(readings: &WeatherReadings) -> String {
    let dir = field3(readings.wind_direction_deg.map(|d| d.round() as i32));
    let spd = field3(readings.wind_speed_ms.map(ms_to_mph));
    let gust = field3(readings.wind_gust_ms.map(ms_to_mph));
    let temp = field3(readings.temperature_c.map(celsius_to_fahrenheit));
    let r1 = field3(readings.rain_1h_mm.map(mm_to_hundredths_inch));
    let r24 = field3(readings.rain_24h_mm.map(mm_to_hundredths_inch));
    let rmid = field3(readings.rain_since_midnight_mm.map(mm_to_hundredths_inch));
    let hum = humidity_field(readings.humidity_pct);
    let baro = barometric_field(readings.pressure_hpa);
    format!("_c{dir}s{spd}g{gust}t{temp}r{r1}P{r24}P{rmid}h{hum}b{baro}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_fields_present_converts_units() {
        let readings = WeatherReadings {
            wind_direction_deg: Some(180.0),
            wind_speed_ms: Some(4.4704), // 10 mph
            wind_gust_ms: Some(8.9408),  // 20 mph
            temperature_c: Some(20.0),   // 68 F
            rain_1h_mm: Some(2.54),      // 10 hundredths inch
            rain_24h_mm: Some(25.4),     // 100 hundredths inch
            rain_since_midnight_mm: Some(0.0),
            humidity_pct: Some(55.0),
            pressure_hpa: Some(1013.2),
        };
        let line = format_weather_info(&readings);
        assert_eq!(line, "_c180s010g020t068r010P100P000h55b10132");
    }

    #[test]
    fn missing_fields_use_dot_placeholders() {
        let readings = WeatherReadings::default();
        let line = format_weather_info(&readings);
        assert_eq!(line, "_c...s...g...t...r...P...P...h..b.....");
    }

    #[test]
    fn full_humidity_collapses_to_zero() {
        let mut readings = WeatherReadings::default();
        readings.humidity_pct = Some(100.0);
        let line = format_weather_info(&readings);
        assert!(line.contains("h00b"));
    }

    #[test]
    fn no_readings_present_reports_false() {
        assert!(!WeatherReadings::default().any_present());
        let mut readings = WeatherReadings::default();
        readings.pressure_hpa = Some(1000.0);
        assert!(readings.any_present());
    }
}
