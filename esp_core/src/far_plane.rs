//! Scene-derived far distance used for gadget scaling and fading when no
//! hard distance limit is active.

pub const FAR_PLANE_MIN: f32 = 100.0;
pub const FAR_PLANE_MAX: f32 = 3000.0;
pub const FAR_PLANE_DEFAULT: f32 = 800.0;
pub const FAR_PLANE_INITIAL: f32 = 1500.0;
pub const MIN_SAMPLES_FOR_PERCENTILE: usize = 10;
pub const FAR_PLANE_PERCENTILE: f32 = 0.95;
pub const FAR_PLANE_SMOOTHING: f32 = 0.5;
pub const RECALCULATION_INTERVAL_MS: u64 = 1000;

/// Target far plane for one set of gadget distances.
///
/// Small samples use the mean because a percentile of a handful of values
/// is dominated by a single outlier.
pub fn target_far_plane(distances: &mut [f32]) -> f32 {
    let count = distances.len();
    if count == 0 {
        return FAR_PLANE_DEFAULT;
    }
    let raw = if count < MIN_SAMPLES_FOR_PERCENTILE {
        distances.iter().sum::<f32>() / count as f32
    } else {
        distances.sort_by(|a, b| a.total_cmp(b));
        let index = ((count as f32 * FAR_PLANE_PERCENTILE) as usize).min(count - 1);
        distances[index]
    };
    raw.clamp(FAR_PLANE_MIN, FAR_PLANE_MAX)
}

#[derive(Debug, Clone)]
pub struct AdaptiveFarPlane {
    value: f32,
    last_recalculation_ms: Option<u64>,
    samples: Vec<f32>,
}

impl Default for AdaptiveFarPlane {
    fn default() -> Self {
        Self {
            value: FAR_PLANE_INITIAL,
            last_recalculation_ms: None,
            samples: Vec::new(),
        }
    }
}

impl AdaptiveFarPlane {
    pub fn value(&self) -> f32 {
        self.value
    }

    /// Folds this tick's gadget distances into the smoothed value, at most
    /// once per recalculation interval. Returns the current value.
    pub fn update<I>(&mut self, gadget_distances: I, now_ms: u64) -> f32
    where
        I: IntoIterator<Item = f32>,
    {
        if let Some(last) = self.last_recalculation_ms {
            if now_ms.saturating_sub(last) < RECALCULATION_INTERVAL_MS {
                return self.value;
            }
        }
        self.last_recalculation_ms = Some(now_ms);

        self.samples.clear();
        self.samples
            .extend(gadget_distances.into_iter().filter(|d| d.is_finite() && *d > 0.0));
        let target = target_far_plane(&mut self.samples);
        self.value += (target - self.value) * FAR_PLANE_SMOOTHING;
        self.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_scene_uses_default() {
        assert_eq!(target_far_plane(&mut []), FAR_PLANE_DEFAULT);
    }

    #[test]
    fn small_samples_use_clamped_mean() {
        assert_eq!(target_far_plane(&mut [200.0, 400.0]), 300.0);
        assert_eq!(target_far_plane(&mut [10.0, 20.0]), FAR_PLANE_MIN);
    }

    #[test]
    fn large_samples_use_high_percentile() {
        let mut distances: Vec<f32> = (1..=100).map(|d| d as f32 * 10.0).collect();
        distances.reverse();
        // Index 95 of the sorted 10..=1000 series.
        assert_eq!(target_far_plane(&mut distances), 960.0);
    }

    #[test]
    fn smoothing_moves_halfway_and_respects_interval() {
        let mut plane = AdaptiveFarPlane::default();
        let first = plane.update([500.0; 4], 0);
        assert_eq!(first, (FAR_PLANE_INITIAL + 500.0) / 2.0);
        assert_eq!(plane.update([3000.0; 4], 500), first);
        let second = plane.update([500.0; 4], 1000);
        assert_eq!(second, (first + 500.0) / 2.0);
    }
}
