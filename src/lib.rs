//! # align-core
//!
//! The forced-alignment core of a speech-processing toolkit: an MFCC
//! feature pipeline, a windowed/band-constrained DTW aligner, and a
//! timeline mapper that turns an alignment path into a nested
//! sentence/segment timeline.
//!
//! The crate is single-threaded and synchronous end to end: one call
//! computes a full result without yielding, and owns every allocation it
//! makes for the duration of that call.

pub mod distance;
pub mod dtw;
pub mod error;
pub mod matrix;
pub mod mel;
pub mod mfcc;
pub mod resample;
pub mod stft;
pub mod timeline;

#[cfg(feature = "decode")]
pub mod fixture;

pub use distance::{cosine_cost, euclidean13_cost, euclidean_cost, magnitudes};
pub use dtw::{
    align_dtw_windowed, align_mfcc_dtw, compute_window_plan, cost_matrix_mb, AlignmentResult,
    DistanceKind, WindowPlan,
};
pub use error::AlignError;
pub use matrix::FeatureMatrix;
pub use mel::{build_filterbank, MelFilter};
pub use mfcc::{compute_mfccs, de_emphasize, pre_emphasize, MfccOptions};
pub use resample::{Resampler, RubatoResampler};
pub use stft::{stftr, stiftr, WindowKind};
pub use timeline::{
    remap_cropped_to_uncropped, word_path_to_timeline, RefWord, SegmentSpec, SentenceSpec,
    TargetSegmentation, TargetWordSpec, TimelineEntry, TimelineEntryKind, UncropSegment,
    WhitespacePolicy,
};
