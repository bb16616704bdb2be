//! End-to-end proximity screening tests
//!
//! Exercise the full path from site and hazard input through the geometry
//! kernel and tier classifier to a verdict.

use siteguard::screening::{Screener, PROXIMITY_SOURCE};
use siteguard::types::{Coordinate, HazardFeature, Site, SiteRecord};
use siteguard::verdict::EliminationPolicy;
use siteguard::ThresholdTable;
use std::collections::BTreeMap;

fn hazard(name: &str, lat: f64, lon: f64) -> HazardFeature {
    HazardFeature {
        location: Coordinate::new(lat, lon),
        name: name.to_string(),
        category: "Facility".to_string(),
        status: Some("Active".to_string()),
        dataset: "EPA ECHO".to_string(),
        attributes: BTreeMap::new(),
    }
}

fn tiered(table: ThresholdTable, cutoff: &str) -> Screener {
    let cutoff = table.tier(cutoff).unwrap();
    Screener::new(table, EliminationPolicy::Tiered { cutoff })
}

fn unit_square() -> Site {
    Site::polygon(vec![
        Coordinate::new(0.0, 0.0),
        Coordinate::new(0.0, 1.0),
        Coordinate::new(1.0, 1.0),
        Coordinate::new(1.0, 0.0),
    ])
    .unwrap()
}

#[test]
fn hazard_inside_polygon_is_on_site() {
    let screener = tiered(ThresholdTable::five_tier(), "NEAR");
    let report = screener
        .screen_proximity(&unit_square(), &[hazard("tank", 0.5, 0.5)])
        .unwrap();

    assert_eq!(report.verdict.tier(), "ON-SITE");
    assert_eq!(report.verdict.distance_miles(), Some(0.0));
    assert!(report.verdict.eliminate());

    let nearest = report.nearest.unwrap();
    assert!(nearest.proximity.inside);
    assert!(nearest.proximity.distance.closest_point.is_none());
}

#[test]
fn hazard_on_polygon_edge_is_on_site() {
    let screener = tiered(ThresholdTable::five_tier(), "NEAR");
    let report = screener
        .screen_proximity(&unit_square(), &[hazard("edge", 0.0, 0.5)])
        .unwrap();
    assert_eq!(report.verdict.tier(), "ON-SITE");
}

#[test]
fn los_angeles_point_is_distant_under_five_tier() {
    // ~0.85 mi north of the site
    let screener = tiered(ThresholdTable::five_tier(), "NEAR");
    let report = screener
        .screen_proximity(&Site::point(34.05, -118.25), &[hazard("plant", 34.0622, -118.2437)])
        .unwrap();

    assert_eq!(report.verdict.tier(), "DISTANT");
    let miles = report.verdict.distance_miles().unwrap();
    assert!(miles > 0.5 && miles <= 1.0, "distance was {}", miles);
    assert!(!report.verdict.eliminate());
    assert!(report.verdict.reason().is_none());
    assert_eq!(report.verdict.source_name(), "EPA ECHO");
}

#[test]
fn downtown_la_hazard_one_hundredth_degree_north_is_distant() {
    // ~0.69 mi: beyond the half-mile band, within one mile
    let screener = tiered(ThresholdTable::five_tier(), "NEAR");
    let report = screener
        .screen_proximity(&Site::point(34.0522, -118.2437), &[hazard("plant", 34.0622, -118.2437)])
        .unwrap();

    let miles = report.verdict.distance_miles().unwrap();
    assert!((miles - 0.691).abs() < 0.001, "distance was {}", miles);
    assert_eq!(report.verdict.tier(), "DISTANT");
}

#[test]
fn astm_table_adds_regional_band() {
    let screener = tiered(ThresholdTable::astm(), "NEAR OFF-SITE");
    let report = screener
        .screen_proximity(&Site::point(34.05, -118.25), &[hazard("plant", 34.0622, -118.2437)])
        .unwrap();
    assert_eq!(report.verdict.tier(), "REGIONAL");
}

#[test]
fn ultra_conservative_eliminates_any_in_range_hazard() {
    let screener = Screener::new(ThresholdTable::five_tier(), EliminationPolicy::UltraConservative);
    let report = screener
        .screen_proximity(&Site::point(34.05, -118.25), &[hazard("plant", 34.0622, -118.2437)])
        .unwrap();
    assert!(report.verdict.eliminate());
    assert!(report.verdict.reason().unwrap().contains("DISTANT"));
}

#[test]
fn far_hazards_are_out_of_range_and_kept() {
    let screener = Screener::new(ThresholdTable::five_tier(), EliminationPolicy::UltraConservative);
    let report = screener
        .screen_proximity(&Site::point(34.05, -118.25), &[hazard("far", 35.0, -118.25)])
        .unwrap();
    assert_eq!(report.verdict.tier(), "OUT-OF-RANGE");
    assert!(!report.verdict.eliminate());
}

#[test]
fn batch_preserves_order_and_rejects_invalid_sites() {
    let screener = tiered(ThresholdTable::five_tier(), "NEAR");
    let hazards = vec![hazard("tank", 0.5, 0.5)];

    let records = vec![
        SiteRecord::new("square", unit_square()),
        SiteRecord::new("elsewhere", Site::point(40.0, -100.0)),
    ];
    let verdicts = screener.screen_proximity_batch(&records, &hazards).unwrap();
    assert_eq!(verdicts[0].site_id, "square");
    assert_eq!(verdicts[0].verdict.tier(), "ON-SITE");
    assert_eq!(verdicts[1].verdict.tier(), "OUT-OF-RANGE");

    let bad = vec![SiteRecord::new("bad", Site::point(0.0, 200.0))];
    let err = screener.screen_proximity_batch(&bad, &hazards).unwrap_err();
    assert!(err.to_string().contains("bad"));
}

#[test]
fn empty_hazard_list_reports_proximity_source() {
    let screener = tiered(ThresholdTable::five_tier(), "NEAR");
    let report = screener.screen_proximity(&unit_square(), &[]).unwrap();
    assert_eq!(report.verdict.source_name(), PROXIMITY_SOURCE);
    assert_eq!(report.verdict.tier(), "OUT-OF-RANGE");
}

#[test]
fn verdict_json_shape() {
    let screener = tiered(ThresholdTable::five_tier(), "NEAR");
    let records = vec![SiteRecord::new("square", unit_square())];
    let verdicts = screener
        .screen_proximity_batch(&records, &[hazard("tank", 0.5, 0.5)])
        .unwrap();

    let json = serde_json::to_value(&verdicts).unwrap();
    assert_eq!(json[0]["site_id"], "square");
    assert_eq!(json[0]["verdict"]["tier"], "ON-SITE");
    assert_eq!(json[0]["verdict"]["eliminate"], true);
    assert_eq!(json[0]["nearest"]["tier"]["name"], "ON-SITE");
}
