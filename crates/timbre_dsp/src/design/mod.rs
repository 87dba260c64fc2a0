//! Filter design
//!
//! Recursive families follow the classic analog-prototype route: a lowpass
//! prototype with a 1 rad/s edge is moved to the prewarped cutoff(s) by a
//! frequency transformation, mapped to the z-plane with the bilinear
//! transform, and expanded into transfer-function coefficients. FIR designs
//! use a Hamming-windowed sinc.

mod coefficients;
mod designer;
mod elliptic;
mod fir;
mod order;
mod polynomial;
mod prototype;
mod spec;
mod transform;

pub use coefficients::FilterCoefficients;
pub use designer::{
    DesignFilter, DesignerConfig, FilterDesigner, DEFAULT_STABILITY_MARGIN, MAX_FILTER_ORDER,
    STRICT_STABILITY_MARGIN,
};
pub use fir::firwin;
pub use polynomial::roots;
pub use spec::{
    FilterResponse, FilterSpecification, FilterType, DEFAULT_ATTENUATION_DB, DEFAULT_RIPPLE_DB,
    MAX_NORMALIZED_CUTOFF, MIN_NORMALIZED_CUTOFF,
};
