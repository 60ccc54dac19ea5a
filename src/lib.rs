//! Core rust implementation of strainrs, a crate for constraint based metabolic
//! modeling and bilevel strain design.

pub mod analysis;
pub mod configuration;
pub mod metabolic_model;
pub mod optimize;
pub mod strain_design;
mod utils;
