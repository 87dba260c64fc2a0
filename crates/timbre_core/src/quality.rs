//! Processing quality levels and load-based selection

use serde::{Deserialize, Serialize};

/// Trade-off between processing cost and fidelity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessingQuality {
    Low,
    Medium,
    #[default]
    High,
    Ultra,
}

impl ProcessingQuality {
    pub const ALL: [ProcessingQuality; 4] = [
        ProcessingQuality::Low,
        ProcessingQuality::Medium,
        ProcessingQuality::High,
        ProcessingQuality::Ultra,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ProcessingQuality::Low => "low",
            ProcessingQuality::Medium => "medium",
            ProcessingQuality::High => "high",
            ProcessingQuality::Ultra => "ultra",
        }
    }

    /// Processing parameters for this level
    pub fn profile(self) -> QualityProfile {
        match self {
            ProcessingQuality::Low => QualityProfile {
                window_size: 1024,
                overlap: 0.25,
                max_eq_bands: 3,
                noise_reduction_alpha: 1.5,
            },
            ProcessingQuality::Medium => QualityProfile {
                window_size: 2048,
                overlap: 0.5,
                max_eq_bands: 6,
                noise_reduction_alpha: 2.0,
            },
            ProcessingQuality::High => QualityProfile {
                window_size: 4096,
                overlap: 0.75,
                max_eq_bands: 10,
                noise_reduction_alpha: 2.5,
            },
            ProcessingQuality::Ultra => QualityProfile {
                window_size: 8192,
                overlap: 0.875,
                max_eq_bands: 15,
                noise_reduction_alpha: 3.0,
            },
        }
    }
}

impl std::fmt::Display for ProcessingQuality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Processing parameters tied to a quality level
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct QualityProfile {
    /// Spectral window (samples) for noise reduction
    pub window_size: usize,
    pub overlap: f64,
    /// Presets longer than this are truncated
    pub max_eq_bands: usize,
    /// Over-subtraction factor for spectral subtraction
    pub noise_reduction_alpha: f64,
}

/// Load percentages at which quality steps down
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QualityThresholds {
    pub cpu_high: f64,
    pub cpu_medium: f64,
    pub memory_high: f64,
    pub memory_medium: f64,
}

impl Default for QualityThresholds {
    fn default() -> Self {
        Self {
            cpu_high: 80.0,
            cpu_medium: 60.0,
            memory_high: 85.0,
            memory_medium: 70.0,
        }
    }
}

/// Picks a quality level from current system load
#[derive(Debug, Clone, Default)]
pub struct QualityManager {
    thresholds: QualityThresholds,
}

impl QualityManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_thresholds(thresholds: QualityThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &QualityThresholds {
        &self.thresholds
    }

    /// Highest level the load allows (never `Ultra`)
    ///
    /// Usages are percentages in [0, 100]. Unreadable (non-finite) usage
    /// yields `Medium`.
    pub fn optimal_quality(&self, cpu_usage: f64, memory_usage: f64) -> ProcessingQuality {
        if !(cpu_usage.is_finite() && memory_usage.is_finite()) {
            return ProcessingQuality::Medium;
        }
        let t = &self.thresholds;
        if cpu_usage >= t.cpu_high || memory_usage >= t.memory_high {
            ProcessingQuality::Low
        } else if cpu_usage >= t.cpu_medium || memory_usage >= t.memory_medium {
            ProcessingQuality::Medium
        } else {
            ProcessingQuality::High
        }
    }

    pub fn profile_for(&self, quality: ProcessingQuality) -> QualityProfile {
        quality.profile()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_quality() {
        assert_eq!(ProcessingQuality::default(), ProcessingQuality::High);
        assert_eq!(ProcessingQuality::Ultra.to_string(), "ultra");
    }

    #[test]
    fn test_profiles_scale_with_quality() {
        let profiles: Vec<QualityProfile> =
            ProcessingQuality::ALL.iter().map(|q| q.profile()).collect();
        for pair in profiles.windows(2) {
            assert!(pair[0].window_size < pair[1].window_size);
            assert!(pair[0].noise_reduction_alpha < pair[1].noise_reduction_alpha);
            assert!(pair[0].max_eq_bands < pair[1].max_eq_bands);
        }
        assert_eq!(ProcessingQuality::Medium.profile().noise_reduction_alpha, 2.0);
        assert_eq!(ProcessingQuality::Ultra.profile().max_eq_bands, 15);
    }

    #[test]
    fn test_optimal_quality_thresholds() {
        let manager = QualityManager::new();
        assert_eq!(manager.optimal_quality(10.0, 20.0), ProcessingQuality::High);
        assert_eq!(manager.optimal_quality(60.0, 20.0), ProcessingQuality::Medium);
        assert_eq!(manager.optimal_quality(10.0, 70.0), ProcessingQuality::Medium);
        assert_eq!(manager.optimal_quality(80.0, 20.0), ProcessingQuality::Low);
        assert_eq!(manager.optimal_quality(10.0, 85.0), ProcessingQuality::Low);
        assert_eq!(manager.optimal_quality(f64::NAN, 0.0), ProcessingQuality::Medium);
    }

    #[test]
    fn test_quality_serialization() {
        let json = serde_json::to_string(&ProcessingQuality::Low).unwrap();
        assert_eq!(json, "\"low\"");
        let back: ProcessingQuality = serde_json::from_str("\"ultra\"").unwrap();
        assert_eq!(back, ProcessingQuality::Ultra);
    }
}
