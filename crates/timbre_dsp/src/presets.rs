//! Built-in EQ Presets

use crate::eq::FrequencyBand;

/// Band as (center Hz, gain dB, Q)
pub type PresetBand = (f64, f64, f64);

/// Named EQ preset
pub type Preset = (&'static str, &'static [PresetBand]);

pub const FLAT_PRESET: &str = "flat";

/// List of built-in presets
pub const PRESETS: &[Preset] = &[
    (FLAT_PRESET, &[]),
    (
        "bass_boost",
        &[(60.0, 6.0, 0.7), (120.0, 4.0, 0.7), (250.0, 2.0, 0.7)],
    ),
    (
        "vocal_enhance",
        &[(200.0, -2.0, 0.5), (1000.0, 3.0, 1.0), (3000.0, 4.0, 1.2), (8000.0, 2.0, 0.8)],
    ),
    (
        "classical",
        &[
            (50.0, 2.0, 0.6),
            (400.0, -1.0, 0.8),
            (2000.0, 1.0, 0.7),
            (6000.0, 2.0, 0.9),
            (12000.0, 3.0, 0.8),
        ],
    ),
    (
        "rock",
        &[
            (80.0, 4.0, 0.8),
            (250.0, -2.0, 1.0),
            (1500.0, 2.0, 0.9),
            (4000.0, 3.0, 1.1),
            (10000.0, 4.0, 0.7),
        ],
    ),
    (
        "electronic",
        &[
            (40.0, 5.0, 0.9),
            (100.0, 3.0, 0.8),
            (500.0, -1.0, 0.6),
            (2000.0, 1.0, 0.8),
            (8000.0, 3.0, 1.0),
            (16000.0, 2.0, 0.7),
        ],
    ),
];

pub fn preset_names() -> impl Iterator<Item = &'static str> {
    PRESETS.iter().map(|(name, _)| *name)
}

/// Bands of a named preset (case-insensitive), if it exists
pub fn find_preset(name: &str) -> Option<Vec<FrequencyBand>> {
    let wanted = name.to_ascii_lowercase();
    PRESETS
        .iter()
        .find(|(preset, _)| *preset == wanted)
        .map(|(_, bands)| {
            bands
                .iter()
                .filter_map(|&(center, gain, q)| FrequencyBand::new(center, gain, q).ok())
                .collect()
        })
}

/// Bands of a named preset; unknown names give the flat preset
pub fn preset_bands(name: &str) -> Vec<FrequencyBand> {
    find_preset(name).unwrap_or_default()
}
