use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{MonthlyResume, RegularityStatus};

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ThresholdError {
    #[error("Regularity thresholds must satisfy 100 >= very_regular >= regular >= medium_regular > 0 (got {very_regular}/{regular}/{medium_regular})")]
    Unordered {
        very_regular: u32,
        regular: u32,
        medium_regular: u32,
    },
}

/// Lower bounds (inclusive, in percent of recorded occurrences attended)
/// for each regularity bucket.
///
/// A ratio of zero is `Absent`; any positive ratio below `medium_regular_pct`
/// is `LittleRegular`. A ratio sitting exactly on a bound belongs to the
/// higher bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegularityThresholds {
    pub very_regular_pct: u32,
    pub regular_pct: u32,
    pub medium_regular_pct: u32,
}

impl Default for RegularityThresholds {
    fn default() -> Self {
        Self {
            very_regular_pct: 80,
            regular_pct: 60,
            medium_regular_pct: 40,
        }
    }
}

impl RegularityThresholds {
    pub fn validate(&self) -> Result<(), ThresholdError> {
        let ordered = self.very_regular_pct <= 100
            && self.very_regular_pct >= self.regular_pct
            && self.regular_pct >= self.medium_regular_pct
            && self.medium_regular_pct > 0;
        if ordered {
            Ok(())
        } else {
            Err(ThresholdError::Unordered {
                very_regular: self.very_regular_pct,
                regular: self.regular_pct,
                medium_regular: self.medium_regular_pct,
            })
        }
    }

    /// Classify a resume. No resume means no classification.
    pub fn classify(&self, resume: Option<&MonthlyResume>) -> Option<RegularityStatus> {
        let resume = resume?;
        let attended = resume.attendance_count as u64;
        let recorded = resume.occurrence_count as u64;
        // attended / recorded >= pct / 100, without floating point
        let reaches = |pct: u32| attended * 100 >= pct as u64 * recorded;

        let status = if attended == 0 {
            RegularityStatus::Absent
        } else if reaches(self.very_regular_pct) {
            RegularityStatus::VeryRegular
        } else if reaches(self.regular_pct) {
            RegularityStatus::Regular
        } else if reaches(self.medium_regular_pct) {
            RegularityStatus::MediumRegular
        } else {
            RegularityStatus::LittleRegular
        };
        Some(status)
    }
}
