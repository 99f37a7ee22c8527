use cgmfit_core::{derive_substream_seed, RngHandle};

const INIT_DOMAIN: u64 = 0xA5A5_A5A5_A5A5_A5A5;

/// Seed for drawing the initial walker positions.
pub fn init_seed(master_seed: u64) -> u64 {
    derive_substream_seed(master_seed ^ INIT_DOMAIN, 0)
}

/// Master seed of the per-walker substreams used at `step`.
pub fn step_seed(master_seed: u64, step: usize) -> u64 {
    derive_substream_seed(master_seed, step as u64)
}

/// RNG for the stretch move made by `walker` at `step`.
///
/// Depends only on `(master_seed, step, walker)`, never on thread scheduling.
pub fn move_rng(master_seed: u64, step: usize, walker: usize) -> RngHandle {
    RngHandle::substream(step_seed(master_seed, step), walker as u64)
}
