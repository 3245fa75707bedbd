//! Statewide merge chronology test
//!
//! Two overlapping fires (2005 and 2012) are exported, merged in separate
//! batches in reverse wall-clock order, and reduced. The 2012 fire must
//! own the shared pixels afterwards: chronology is decided by UID order,
//! never by which batch job happened to finish first.
//!
//! Run with: cargo test --test merge_chronology

use chrono::NaiveDate;
use ndarray::Array2;
use rustc_hash::FxHashMap;
use std::path::Path;

use fire_recovery_core::core_types::fire::{FireManifest, FireMetadata, FirePaths};
use fire_recovery_core::io::geotiff;
use fire_recovery_core::merge::{self, BarrierConfig, NUM_BANDS};
use fire_recovery_core::{GeoTransform, NodataPolicy, Raster, RecoveryParams};

const FIRE_SIZE: usize = 2;

fn fire_transform() -> GeoTransform {
    // one row and one column inside the statewide template
    GeoTransform::new(30.0, 150.0, 30.0, -30.0)
}

/// Write the full set of per-fire band files the merge engine reads back.
fn export_fire(root: &Path, name: &str, year: i32, recovery_time: i32) -> FireManifest {
    let output_dir = root.join(name);
    std::fs::create_dir_all(&output_dir).unwrap();
    let manifest = FireManifest {
        metadata: FireMetadata {
            name: name.to_string(),
            fire_id: format!("id{year}"),
            ignition: NaiveDate::from_ymd_opt(year, 6, 1).unwrap(),
            sensitivity_analysis: false,
        },
        paths: FirePaths {
            seasonal_dir: output_dir.clone(),
            severity: output_dir.join("unused.tif"),
            agdev_mask: output_dir.join("unused.tif"),
            disturbance_dir: output_dir.clone(),
            groupings_dir: output_dir.clone(),
            output_dir,
        },
    };
    let prefix = manifest.metadata.prefix();
    let shape = (FIRE_SIZE, FIRE_SIZE);

    let write_i8 = |band: &str, value: i8| {
        let raster = Raster::new(Array2::from_elem(shape, value), fire_transform(), Some(-1));
        geotiff::write_i8(&manifest.paths.band_path(&prefix, band), &raster).unwrap();
    };
    let write_i32 = |band: &str, value: i32| {
        let raster = Raster::new(
            Array2::from_elem(shape, value),
            fire_transform(),
            Some(-9999),
        );
        geotiff::write_i32(&manifest.paths.band_path(&prefix, band), &raster).unwrap();
    };

    write_i8("severity", 3);
    write_i8("temporal_coverage_qa", 0);
    write_i8("matched_group_temporal_coverage_qa", 0);
    write_i8("future_dist_agdev_mask", 0);
    write_i32("groups", 11_050);
    write_i32("fire_recovery_time", recovery_time);
    write_i32("prefire_baseline_recovery_time", recovery_time);
    manifest
}

#[test]
fn test_later_fire_wins_regardless_of_batch_order() {
    let root = std::env::temp_dir().join("recovery_merge_chronology_test");
    let _ = std::fs::remove_dir_all(&root);
    std::fs::create_dir_all(&root).unwrap();

    let template_path = root.join("statewide_template.tif");
    let template = Raster::new(
        Array2::from_elem((6, 6), 0_i8),
        GeoTransform::new(0.0, 180.0, 30.0, -30.0),
        Some(NodataPolicy::MOSAIC),
    );
    geotiff::write_i8(&template_path, &template).unwrap();

    let mut manifest: FxHashMap<String, FireManifest> = FxHashMap::default();
    manifest.insert(
        "early".to_string(),
        export_fire(&root, "EARLY", 2005, 4),
    );
    manifest.insert("late".to_string(), export_fire(&root, "LATE", 2012, 9));

    let fires = merge::assign_uids(&manifest);
    assert_eq!(fires[0].1.metadata.ignition_year(), 2005);

    // the 2012 batch finishes first; the 2005 batch lands later
    let batch_dir = root.join("batches");
    std::fs::create_dir_all(&batch_dir).unwrap();
    let params = RecoveryParams::default();
    merge::merge_batch(&fires, &template_path, 1, 1, &batch_dir, &params).unwrap();
    merge::merge_batch(&fires, &template_path, 0, 0, &batch_dir, &params).unwrap();

    // both batches present: barrier releases immediately
    let barrier = BarrierConfig {
        poll_interval: std::time::Duration::from_millis(5),
        max_wait: std::time::Duration::from_millis(50),
    };
    let files = merge::await_batch_outputs(&batch_dir, ".tif", 2 * NUM_BANDS, &barrier).unwrap();
    assert_eq!(files.len(), 2 * NUM_BANDS);

    let merged = merge::final_reduction(&batch_dir).unwrap();
    assert_eq!(merged.shape(), (6, 6));

    // the shared pixels carry the 2012 fire
    let time = merged.band("matched_recovery_time").unwrap();
    assert_eq!(time[[1, 1]], 9);
    assert_eq!(merged.band("fire_yr").unwrap()[[1, 1]], 30);
    assert_eq!(merged.band("UID_to").unwrap()[[1, 1]], 1);
    assert_eq!(merged.band("matched_recovery_status").unwrap()[[1, 1]], 1);

    // pixels outside both footprints stay at the global nodata
    assert_eq!(time[[0, 0]], NodataPolicy::MOSAIC);
    assert_eq!(time[[5, 5]], NodataPolicy::MOSAIC);

    // the final multi-band output's first directory is the time band
    let out = root.join("merged_recovery.tif");
    merged.write_multiband(&out).unwrap();
    let back = geotiff::read_i8(&out).unwrap();
    assert_eq!(back.data, *time);
    assert_eq!(back.nodata, Some(NodataPolicy::MOSAIC));

    let _ = std::fs::remove_dir_all(&root);
}
