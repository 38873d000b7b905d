// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! Telemetry report and definition line assembly (§4.8).

/// Replaces commas with spaces, since names feed into comma-separated
/// definition lines.
fn sanitize_name(name: &str) -> String {
    name.replace(',', " ")
}

/// Formats the `T#` telemetry report line. `seq` is taken mod 1000;
/// analog values are clamped to `0..=255`.
pub fn format_telemetry_report(seq: u32, analog: [f64; 5], digital_bits: u8) -> String {
    let seq = seq % 1000;
    let a: Vec<String> = analog
        .iter()
        .map(|v| (v.round().clamp(0.0, 255.0) as u8).to_string())
        .collect();
    format!(
        "T#{seq:03},{},{},{},{},{},{:08b}",
        a[0], a[1], a[2], a[3], a[4], digital_bits
    )
}

/// Formats a `PARM.` parameter-name definition line.
pub fn format_parm_line(analog_names: &[String], digital_names: &[String]) -> String {
    let names: Vec<String> = analog_names
        .iter()
        .chain(digital_names.iter())
        .map(|n| sanitize_name(n))
        .collect();
    format!("PARM.{}", names.join(","))
}

/// Formats a `UNIT.` unit-label definition line.
pub fn format_unit_line(analog_units: &[String], digital_units: &[String]) -> String {
    let units: Vec<String> = analog_units
        .iter()
        .chain(digital_units.iter())
        .map(|u| sanitize_name(u))
        .collect();
    format!("UNIT.{}", units.join(","))
}

/// Formats an `EQNS.` linear-scaling coefficients line: three values
/// `(a, b, c)` per analog channel, for `value = a*x^2 + b*x + c`.
pub fn format_eqns_line(coefficients: &[(f64, f64, f64); 5]) -> String {
    let parts: Vec<String> = coefficients
        .iter()
        .flat_map(|(a, b, c)| [a.to_string(), b.to_string(), c.to_string()])
        .collect();
    format!("EQNS.{}", parts.join(","))
}

/// Formats a `BITS.` digital-bitmask-and-title definition line.
pub fn format_bits_line(bit_sense: [bool; 8], title: &str) -> String {
    let mask: String = bit_sense
        .iter()
        .map(|b| if *b { '1' } else { '0' })
        .collect();
    format!("BITS.{mask},{}", sanitize_name(title))
}

/// Scales a raw telemetry value for transmission. Current release uses
/// identity scaling (raw ≈ actual); callers should treat the reported
/// value as advisory rather than calibrated.
pub fn identity_scale(raw: f64) -> f64 {
    raw
}
