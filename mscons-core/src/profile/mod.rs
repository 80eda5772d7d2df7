//! Synthetic quarter-hour profiles.
//!
//! Everything here is a pure function of its parameters and an integer seed;
//! the same seed always reproduces the same values.

pub mod consumption;
pub mod lcg;
pub mod pv;

pub use consumption::{consumption_days, generate_consumption, ConsumptionParams, ProfileFamily};
pub use lcg::Lcg;
pub use pv::{compute_day_scales, generate_pv_slots, pv_days, PvParams};
