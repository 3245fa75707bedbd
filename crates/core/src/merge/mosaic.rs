//! Byte-packed mosaic construction and merging
//!
//! A [`FireContribution`] is one fire's ten int8 bands, encoded from its
//! exported per-fire rasters. A [`MergedStateRaster`] composites
//! contributions in UID order: a fire writes only where its own recovery
//! data is present, so a later fire's valid pixels overwrite earlier fires
//! but its empty pixels never erase them.

use ndarray::Array2;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::core_types::config::RecoveryParams;
use crate::core_types::fire::FireManifest;
use crate::core_types::nodata::NodataPolicy;
use crate::core_types::raster::{GeoTransform, Raster};
use crate::error::RecoveryError;
use crate::io;
use crate::io::geotiff;
use crate::merge::bands::{band_index, MOSAIC_BANDS, NUM_BANDS};
use crate::merge::distance;
use crate::merge::uid::PackedUid;

/// Per-fire rasters the encoder consumes, aligned on one grid.
#[derive(Debug)]
pub struct ContributionLayers {
    pub severity: Array2<i8>,
    pub groups: Array2<i32>,
    pub matched_time: Array2<i32>,
    pub baseline_time: Array2<i32>,
    pub coverage_qa: Array2<i8>,
    pub group_coverage_qa: Array2<i8>,
    pub future_dist: Array2<i8>,
}

/// One fire's encoded int8 bands, in [`MOSAIC_BANDS`] order.
#[derive(Debug)]
pub struct FireContribution {
    pub uid: u32,
    pub transform: GeoTransform,
    bands: Vec<Array2<i8>>,
}

/// Encode one recovery time for the mosaic. Ineligible pixels (unburned or
/// ungrouped) carry no data; eligible pixels that are QA-excluded or never
/// recovered get the distinct "never recovered" sentinel.
fn encode_time(time: i32, eligible: bool, excluded: bool) -> i8 {
    if !eligible {
        NodataPolicy::MOSAIC
    } else if excluded || time == NodataPolicy::INT32 {
        NodataPolicy::NEVER_RECOVERED
    } else {
        time.clamp(1, 126) as i8
    }
}

/// Status band value derived from an encoded time band value.
fn status_of(time: i8) -> i8 {
    match time {
        NodataPolicy::MOSAIC => NodataPolicy::MOSAIC,
        NodataPolicy::NEVER_RECOVERED => 0,
        _ => 1,
    }
}

impl FireContribution {
    /// Encode a contribution from already loaded per-fire layers.
    ///
    /// # Errors
    /// Fails when the UID cannot be byte-packed or the layers disagree in
    /// shape.
    pub fn from_layers(
        manifest: &FireManifest,
        uid: u32,
        layers: &ContributionLayers,
        transform: &GeoTransform,
        params: &RecoveryParams,
    ) -> Result<Self, RecoveryError> {
        let shape = layers.severity.dim();
        for (name, ok) in [
            ("groups", layers.groups.dim() == shape),
            ("matched_time", layers.matched_time.dim() == shape),
            ("baseline_time", layers.baseline_time.dim() == shape),
            ("coverage_qa", layers.coverage_qa.dim() == shape),
            ("group_coverage_qa", layers.group_coverage_qa.dim() == shape),
            ("future_dist", layers.future_dist.dim() == shape),
        ] {
            if !ok {
                return Err(RecoveryError::LayerAlignment {
                    layer: name.to_string(),
                    reason: "per-fire band shapes disagree".to_string(),
                });
            }
        }
        let packed = PackedUid::pack(uid)?;

        let mut matched_time = Array2::from_elem(shape, NodataPolicy::MOSAIC);
        let mut baseline_time = Array2::from_elem(shape, NodataPolicy::MOSAIC);
        let mut veg = Array2::from_elem(shape, NodataPolicy::MOSAIC);
        for ((r, c), &sev) in layers.severity.indexed_iter() {
            let group = layers.groups[[r, c]];
            let eligible = (2..=4).contains(&sev) && group > 0;
            let excluded = layers.coverage_qa[[r, c]] == 1
                || layers.group_coverage_qa[[r, c]] == 1
                || layers.future_dist[[r, c]] == 1;
            matched_time[[r, c]] = encode_time(layers.matched_time[[r, c]], eligible, excluded);
            baseline_time[[r, c]] = encode_time(layers.baseline_time[[r, c]], eligible, excluded);
            if eligible {
                veg[[r, c]] = (group / 10_000).clamp(0, 126) as i8;
            }
        }

        let fire_yr =
            (manifest.metadata.ignition_year() - params.mosaic_base_year).clamp(0, 126) as i8;
        let bands = vec![
            matched_time.clone(),
            matched_time.mapv(status_of),
            baseline_time.clone(),
            baseline_time.mapv(status_of),
            veg,
            Array2::from_elem(shape, packed.hundreds),
            Array2::from_elem(shape, packed.tens_ones),
            layers.severity.clone(),
            Array2::from_elem(shape, fire_yr),
            distance::boundary_distance(&layers.severity, transform),
        ];
        Ok(Self {
            uid,
            transform: *transform,
            bands,
        })
    }

    /// Load and encode a contribution from a fire's exported band files.
    ///
    /// # Errors
    /// Fails when any required per-fire band is missing or unreadable.
    pub fn load(
        manifest: &FireManifest,
        uid: u32,
        params: &RecoveryParams,
    ) -> Result<Self, RecoveryError> {
        let prefix = manifest.metadata.prefix();
        let band = |name: &str| manifest.paths.band_path(&prefix, name);

        let severity = geotiff::read_i8(&band("severity"))?;
        let transform = severity.transform;
        let layers = ContributionLayers {
            severity: severity.data,
            groups: geotiff::read_i32(&band("groups"))?.data,
            matched_time: geotiff::read_i32(&band("fire_recovery_time"))?.data,
            baseline_time: geotiff::read_i32(&band("prefire_baseline_recovery_time"))?.data,
            coverage_qa: geotiff::read_i8(&band("temporal_coverage_qa"))?.data,
            group_coverage_qa: geotiff::read_i8(&band("matched_group_temporal_coverage_qa"))?.data,
            future_dist: geotiff::read_i8(&band("future_dist_agdev_mask"))?.data,
        };
        Self::from_layers(manifest, uid, &layers, &transform, params)
    }

    /// True where this fire carries recovery data worth merging.
    fn write_mask_at(&self, r: usize, c: usize) -> bool {
        self.bands[0][[r, c]] > 0 || self.bands[2][[r, c]] > 0
    }

    #[must_use]
    pub fn band(&self, name: &str) -> Option<&Array2<i8>> {
        band_index(name).map(|i| &self.bands[i])
    }
}

/// The statewide mosaic: ten template-shaped int8 bands.
#[derive(Debug, Clone)]
pub struct MergedStateRaster {
    rows: usize,
    cols: usize,
    transform: GeoTransform,
    bands: Vec<Array2<i8>>,
}

impl MergedStateRaster {
    /// Empty mosaic on the statewide template grid, all bands at nodata.
    #[must_use]
    pub fn new(rows: usize, cols: usize, transform: GeoTransform) -> Self {
        Self {
            rows,
            cols,
            transform,
            bands: (0..NUM_BANDS)
                .map(|_| Array2::from_elem((rows, cols), NodataPolicy::MOSAIC))
                .collect(),
        }
    }

    /// Empty mosaic shaped like a statewide reference raster on disk.
    ///
    /// # Errors
    /// Fails when the template file cannot be read.
    pub fn from_template_file(path: &Path) -> Result<Self, RecoveryError> {
        let template = geotiff::read_i8(path)?;
        let (rows, cols) = template.shape();
        Ok(Self::new(rows, cols, template.transform))
    }

    #[must_use]
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    #[must_use]
    pub fn transform(&self) -> &GeoTransform {
        &self.transform
    }

    #[must_use]
    pub fn band(&self, name: &str) -> Option<&Array2<i8>> {
        band_index(name).map(|i| &self.bands[i])
    }

    /// Composite one fire into the mosaic. Only pixels where the fire has
    /// recovery data are written; those pixels overwrite whatever an
    /// earlier fire left there. Callers must apply contributions in
    /// ascending UID order for chronology to hold.
    pub fn apply(&mut self, contribution: &FireContribution) {
        debug_assert!(
            self.transform.same_resolution(&contribution.transform),
            "contribution grid resolution differs from the mosaic template"
        );
        let (off_r, off_c) = self.transform.offset_of(&contribution.transform);
        let shape = contribution.bands[0].dim();
        let mut written = 0usize;
        for r in 0..shape.0 {
            for c in 0..shape.1 {
                if !contribution.write_mask_at(r, c) {
                    continue;
                }
                let tr = off_r + r as i64;
                let tc = off_c + c as i64;
                if tr < 0 || tc < 0 || tr as usize >= self.rows || tc as usize >= self.cols {
                    continue;
                }
                for (band, src) in self.bands.iter_mut().zip(&contribution.bands) {
                    band[[tr as usize, tc as usize]] = src[[r, c]];
                }
                written += 1;
            }
        }
        debug!(uid = contribution.uid, pixels = written, "fire merged");
    }

    /// Write each band as a single-layer batch mosaic named
    /// `merged_{band}_{uid_start}_{uid_end}.tif`.
    ///
    /// # Errors
    /// Fails when any band file cannot be written.
    pub fn write_band_mosaics(
        &self,
        dir: &Path,
        uid_start: u32,
        uid_end: u32,
    ) -> Result<Vec<PathBuf>, RecoveryError> {
        let mut paths = Vec::with_capacity(NUM_BANDS);
        for (band, data) in MOSAIC_BANDS.iter().zip(&self.bands) {
            let path = dir.join(format!("merged_{}_{uid_start:04}_{uid_end:04}.tif", band.name));
            let raster = Raster::new(data.clone(), self.transform, Some(NodataPolicy::MOSAIC));
            geotiff::write_i8(&path, &raster)?;
            paths.push(path);
        }
        info!(uid_start, uid_end, "batch mosaics written");
        Ok(paths)
    }

    /// Write the final multi-band mosaic. Band order and descriptions
    /// follow [`MOSAIC_BANDS`].
    ///
    /// # Errors
    /// Fails when the file cannot be written.
    pub fn write_multiband(&self, path: &Path) -> Result<(), RecoveryError> {
        let descriptions: Vec<String> = MOSAIC_BANDS
            .iter()
            .map(|b| format!("{}: {} [{}]", b.name, b.description, b.units))
            .collect();
        let bands: Vec<(&str, &Array2<i8>)> = descriptions
            .iter()
            .map(String::as_str)
            .zip(self.bands.iter())
            .collect();
        geotiff::write_multiband_i8(path, &bands, &self.transform, NodataPolicy::MOSAIC)
    }
}

/// Merge one contiguous UID range of fires into a fresh mosaic on the
/// statewide template and write its per-band batch files. A fire whose
/// exported bands cannot be loaded is logged and skipped; the batch output
/// is still produced from the fires that succeeded.
///
/// # Errors
/// Fails when the template cannot be read or a batch file cannot be
/// written.
pub fn merge_batch(
    fires: &[(u32, &FireManifest)],
    template: &Path,
    uid_start: u32,
    uid_end: u32,
    out_dir: &Path,
    params: &RecoveryParams,
) -> Result<Vec<PathBuf>, RecoveryError> {
    let mut mosaic = MergedStateRaster::from_template_file(template)?;
    let mut merged = 0usize;
    for (uid, fire) in fires {
        if *uid < uid_start || *uid > uid_end {
            continue;
        }
        match FireContribution::load(fire, *uid, params) {
            Ok(c) => {
                mosaic.apply(&c);
                merged += 1;
            }
            Err(e) => {
                tracing::warn!(
                    uid,
                    fire = %fire.metadata.prefix(),
                    error = %e,
                    "skipping fire in batch merge"
                );
            }
        }
    }
    info!(uid_start, uid_end, merged, "batch merge complete");
    mosaic.write_band_mosaics(out_dir, uid_start, uid_end)
}

/// `(band index, uid_start)` parsed from a batch mosaic file name.
fn parse_batch_name(path: &Path) -> Option<(usize, u32)> {
    let stem = path.file_stem()?.to_str()?;
    let rest = stem.strip_prefix("merged_")?;
    let mut parts = rest.rsplitn(3, '_');
    let _uid_end: u32 = parts.next()?.parse().ok()?;
    let uid_start: u32 = parts.next()?.parse().ok()?;
    let band = band_index(parts.next()?)?;
    Some((band, uid_start))
}

/// Final reduction: merge every batch's per-band mosaics last-wins in
/// ascending UID order into one [`MergedStateRaster`].
///
/// # Errors
/// Fails when the batch directory holds no recognizable batch outputs or a
/// file cannot be read.
pub fn final_reduction(batch_dir: &Path) -> Result<MergedStateRaster, RecoveryError> {
    let mut batches: Vec<(usize, u32, PathBuf)> = Vec::new();
    for path in io::list_files_with_suffix(batch_dir, ".tif")? {
        if let Some((band, uid_start)) = parse_batch_name(&path) {
            batches.push((band, uid_start, path));
        }
    }
    if batches.is_empty() {
        return Err(RecoveryError::Config(format!(
            "no batch mosaics under {}",
            batch_dir.display()
        )));
    }
    batches.sort();

    let first = geotiff::read_i8(&batches[0].2)?;
    let (rows, cols) = first.shape();
    let mut merged = MergedStateRaster::new(rows, cols, first.transform);

    for (band, _, path) in &batches {
        let layer = geotiff::read_i8(path)?;
        if layer.shape() != (rows, cols) {
            return Err(RecoveryError::LayerAlignment {
                layer: path.display().to_string(),
                reason: "batch mosaic shape differs from the template".to_string(),
            });
        }
        // last-wins within each band: later UID ranges overwrite
        for (dst, &src) in merged.bands[*band].iter_mut().zip(layer.data.iter()) {
            if src != NodataPolicy::MOSAIC {
                *dst = src;
            }
        }
    }
    info!(files = batches.len(), "final reduction complete");
    Ok(merged)
}
