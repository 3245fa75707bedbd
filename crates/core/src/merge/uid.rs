//! Dense chronological fire UIDs and their byte-packed form
//!
//! The mosaic stores every band as int8, so a fire's UID is split across
//! two bands: `UID_h = uid / 100` and `UID_to = uid % 100`. The split
//! round-trips losslessly for UIDs in `[0, 9999]` while keeping both
//! halves within signed-byte range.

use rustc_hash::FxHashMap;

use crate::core_types::fire::{chronological_order, FireManifest};
use crate::error::RecoveryError;

/// Largest UID the two-band packing can represent.
pub const MAX_UID: u32 = 9999;

/// A UID split into its two mosaic bands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PackedUid {
    /// Thousands and hundreds digits (`uid / 100`)
    pub hundreds: i8,
    /// Tens and ones digits (`uid % 100`)
    pub tens_ones: i8,
}

impl PackedUid {
    /// Split a UID into its two int8 bands.
    ///
    /// # Errors
    /// Fails for UIDs above [`MAX_UID`]; `uid / 100` would no longer fit a
    /// signed byte.
    pub fn pack(uid: u32) -> Result<Self, RecoveryError> {
        if uid > MAX_UID {
            return Err(RecoveryError::Config(format!(
                "uid {uid} exceeds the packable maximum {MAX_UID}"
            )));
        }
        Ok(Self {
            hundreds: (uid / 100) as i8,
            tens_ones: (uid % 100) as i8,
        })
    }

    /// Reassemble the UID.
    #[must_use]
    pub fn unpack(self) -> u32 {
        self.hundreds as u32 * 100 + self.tens_ones as u32
    }
}

/// Assign dense UIDs to every fire in the manifest, oldest fire first.
/// The ordering (and therefore each fire's UID) is deterministic across
/// processes, which is what lets batch jobs own disjoint UID ranges
/// without coordination.
#[must_use]
pub fn assign_uids(manifest: &FxHashMap<String, FireManifest>) -> Vec<(u32, &FireManifest)> {
    chronological_order(manifest)
        .into_iter()
        .enumerate()
        .map(|(i, f)| (i as u32, f))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_types::fire::{FireMetadata, FirePaths};
    use chrono::NaiveDate;
    use std::path::PathBuf;

    #[test]
    fn test_uid_roundtrip_over_full_range() {
        for uid in 0..=MAX_UID {
            let packed = PackedUid::pack(uid).unwrap();
            assert_eq!(packed.unpack(), uid);
            assert!(packed.hundreds >= 0);
            assert!((0..100).contains(&packed.tens_ones));
        }
    }

    #[test]
    fn test_uid_out_of_range_is_rejected() {
        assert!(PackedUid::pack(MAX_UID + 1).is_err());
    }

    #[test]
    fn test_uids_follow_ignition_order() {
        let entry = |name: &str, id: &str, y: i32| FireManifest {
            metadata: FireMetadata {
                name: name.to_string(),
                fire_id: id.to_string(),
                ignition: NaiveDate::from_ymd_opt(y, 6, 1).unwrap(),
                sensitivity_analysis: false,
            },
            paths: FirePaths {
                seasonal_dir: PathBuf::new(),
                severity: PathBuf::new(),
                agdev_mask: PathBuf::new(),
                disturbance_dir: PathBuf::new(),
                groupings_dir: PathBuf::new(),
                output_dir: PathBuf::new(),
            },
        };
        let mut manifest = FxHashMap::default();
        manifest.insert("late".to_string(), entry("late", "l", 2012));
        manifest.insert("early".to_string(), entry("early", "e", 2005));

        let uids = assign_uids(&manifest);
        assert_eq!(uids[0].0, 0);
        assert_eq!(uids[0].1.metadata.fire_id, "e");
        assert_eq!(uids[1].0, 1);
        assert_eq!(uids[1].1.metadata.fire_id, "l");
    }
}
