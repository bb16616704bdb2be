//! FEMA flood zone vocabulary
//!
//! Zone codes as published in the National Flood Hazard Layer (`FLD_ZONE`)
//! and the risk level strings used by flood risk datasets.

/// Zone codes recognized as flood classifications
///
/// Includes the minimal-risk X zone and the undetermined D zone: their
/// presence still means the site has been classified.
const ZONE_CODES: &[&str] = &[
    "A", "AE", "AH", "AO", "AR", "A99", "V", "VE", "B", "C", "D", "X", "X500",
    "0.2 PCT ANNUAL CHANCE FLOOD HAZARD", "AREA OF MINIMAL FLOOD HAZARD", "OPEN WATER",
];

/// Risk level strings recognized as flood classifications
const RISK_LEVELS: &[&str] = &[
    "HIGH", "HIGH RISK", "MODERATE", "MODERATE RISK", "MODERATE TO LOW", "LOW", "LOW RISK",
    "MINIMAL", "MINIMAL RISK", "UNDETERMINED", "UNDETERMINED RISK",
];

fn normalize(code: &str) -> String {
    let upper = code.trim().to_ascii_uppercase();
    match upper.strip_prefix("ZONE ") {
        Some(rest) => rest.trim().to_string(),
        None => upper,
    }
}

/// Numbered legacy zones (A1-A30, V1-V30)
fn is_numbered_zone(code: &str) -> bool {
    let mut chars = code.chars();
    match chars.next() {
        Some('A') | Some('V') => {}
        _ => return false,
    }
    let digits: String = chars.collect();
    matches!(digits.parse::<u8>(), Ok(n) if (1..=30).contains(&n))
}

/// True for any recognized zone code, including minimal-risk codes
pub fn is_recognized_zone(code: &str) -> bool {
    let code = normalize(code);
    ZONE_CODES.contains(&code.as_str()) || is_numbered_zone(&code)
}

/// True for Special Flood Hazard Area zones (A and V families)
pub fn is_sfha_zone(code: &str) -> bool {
    let code = normalize(code);
    SFHA_ZONES.contains(&code.as_str()) || is_numbered_zone(&code)
}

const SFHA_ZONES: &[&str] = &["A", "AE", "AH", "AO", "AR", "A99", "V", "VE"];

/// True for any recognized risk level string
pub fn is_recognized_risk_level(level: &str) -> bool {
    RISK_LEVELS.contains(&normalize(level).as_str())
}

/// True for risk levels denoting high risk
pub fn is_high_risk_level(level: &str) -> bool {
    matches!(normalize(level).as_str(), "HIGH" | "HIGH RISK")
}

/// Severity rank for picking the worst of several zones (0 = worst)
pub fn zone_rank(code: &str) -> u8 {
    let code = normalize(code);
    if code.starts_with('V') && is_recognized_zone(&code) {
        0
    } else if is_sfha_zone(&code) {
        1
    } else if matches!(code.as_str(), "X500" | "B" | "0.2 PCT ANNUAL CHANCE FLOOD HAZARD") {
        2
    } else if code == "D" {
        3
    } else if is_recognized_zone(&code) {
        4
    } else {
        5
    }
}

/// Risk level implied by a zone code
pub fn zone_risk_level(code: &str) -> &'static str {
    match zone_rank(code) {
        0 | 1 => "High",
        2 => "Moderate",
        3 => "Undetermined",
        4 => "Minimal",
        _ => "Undetermined",
    }
}
