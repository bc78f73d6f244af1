//! Level of Detail (LOD) selection for terrain chunks
//!
//! Detail index 0 is full resolution. Each step up divides the vertex
//! density along both axes by 4, approximating a quadtree ladder:
//! - detail 0: every height-field cell
//! - detail 1: every 4th cell
//! - detail 2: every 16th cell
//! - detail n: every 4^n-th cell

use serde::{Deserialize, Serialize};

use crate::core::error::ConfigError;

/// Density divisor between consecutive detail indices
pub const DETAIL_BASE: u32 = 4;

/// Sampling stride in height-field cells at a detail index (`4^detail`).
///
/// Returns `None` when the stride no longer fits in a `u32`.
///
/// # Examples
/// ```
/// use terralod::terrain::lod::detail_increment;
///
/// assert_eq!(detail_increment(0), Some(1));
/// assert_eq!(detail_increment(1), Some(4));
/// assert_eq!(detail_increment(2), Some(16));
/// assert_eq!(detail_increment(16), None);
/// ```
pub fn detail_increment(detail: u32) -> Option<u32> {
    DETAIL_BASE.checked_pow(detail)
}

/// Ascending distance thresholds mapping viewer distance to a detail index
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f32>", into = "Vec<f32>")]
pub struct DetailRanges(Vec<f32>);

impl DetailRanges {
    /// Validate a threshold table. Thresholds must be strictly ascending.
    pub fn new(thresholds: Vec<f32>) -> Result<Self, ConfigError> {
        if thresholds.is_empty() {
            return Err(ConfigError::EmptyDetailRanges);
        }
        for (index, pair) in thresholds.windows(2).enumerate() {
            // Negated so NaN fails too
            if !(pair[0] < pair[1]) {
                return Err(ConfigError::NonAscendingDetailRanges {
                    index: index + 1,
                    previous: pair[0],
                    value: pair[1],
                });
            }
        }
        Ok(Self(thresholds))
    }

    /// Smallest `i` with `distance < thresholds[i]`, else `len()`
    ///
    /// # Examples
    /// ```
    /// use terralod::terrain::lod::DetailRanges;
    ///
    /// let ranges = DetailRanges::new(vec![100.0, 1500.0, 3000.0]).unwrap();
    /// assert_eq!(ranges.detail_index(50.0), 0);
    /// assert_eq!(ranges.detail_index(100.0), 1);
    /// assert_eq!(ranges.detail_index(2999.0), 2);
    /// assert_eq!(ranges.detail_index(5000.0), 3); // beyond every threshold
    /// ```
    pub fn detail_index(&self, distance: f32) -> u32 {
        self.0
            .iter()
            .position(|&max_dist| distance < max_dist)
            .unwrap_or(self.0.len()) as u32
    }

    /// Whether `detail` lies past the last threshold
    pub fn is_beyond(&self, detail: u32) -> bool {
        detail as usize >= self.0.len()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn thresholds(&self) -> &[f32] {
        &self.0
    }
}

impl TryFrom<Vec<f32>> for DetailRanges {
    type Error = ConfigError;

    fn try_from(thresholds: Vec<f32>) -> Result<Self, Self::Error> {
        Self::new(thresholds)
    }
}

impl From<DetailRanges> for Vec<f32> {
    fn from(ranges: DetailRanges) -> Self {
        ranges.0
    }
}

/// Everything a chunk needs to pick its detail index
#[derive(Clone, Debug, PartialEq)]
pub struct LodSettings {
    pub ranges: DetailRanges,
    /// Viewpoints at or below this altitude over a chunk force detail 0
    pub hover_range: f32,
    /// Render chunks past the last threshold instead of culling them
    pub show_farthest: bool,
}

impl LodSettings {
    /// Whether a chunk at `detail` should be hidden
    pub fn culls(&self, detail: u32) -> bool {
        !self.show_farthest && self.ranges.is_beyond(detail)
    }
}
