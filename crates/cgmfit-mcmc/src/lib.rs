#![deny(missing_docs)]

//! Affine-invariant ensemble sampling of the `(log nH, log Z)` posterior of a
//! photoionisation grid, with chain diagnostics and run artefacts.

/// Append-only chain storage, flattening and CSV export.
pub mod chain;
/// YAML configuration schema and defaults.
pub mod config;
/// Deterministic seed derivation helpers.
pub mod determinism;
/// Autocorrelation time, convergence check and burn-in selection.
pub mod diagnostics;
/// End-to-end fit pipeline and artefact writing.
pub mod fit;
/// Stretch move, ensemble sampler and cancellation.
pub mod kernel;
/// Run manifest serialization helpers.
pub mod manifest;
/// Flat prior, Gaussian likelihood and their combination.
pub mod posterior;
/// Initial walker placement.
pub mod seeding;
/// Percentile summaries of posterior samples.
pub mod summary;

pub use chain::{Chain, ChainRecord, FlatSamples};
pub use config::{
    Bounds, ChainPolicy, DiagnosticsConfig, FitConfig, ObservationSource, OutputConfig,
    PriorBounds, SamplerConfig, SeedPolicy, WalkerInit,
};
pub use diagnostics::{AutocorrEstimate, ChainCut, NonConvergence};
pub use fit::{infer, run_fit, FitReport, FitRun, Inference, PreparedFit, RunArtefacts};
pub use kernel::{EnsembleSampler, SamplerRun, StopFlag, StretchMove};
pub use manifest::RunManifest;
pub use posterior::{BoxPrior, CloudPosterior, GaussianLikelihood, Posterior};
pub use summary::{percentile, summarize, ParameterSummary, PosteriorSummary};
