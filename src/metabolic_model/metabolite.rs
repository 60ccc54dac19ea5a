//! Metabolite data type, one per row of the stoichiometric matrix

use derive_builder::Builder;

/// A chemical species balanced by the model
///
/// The metabolite's position in the model's insertion order determines its
/// row in the stoichiometric matrix.
#[derive(Builder, Debug, Clone)]
#[builder(setter(into))]
pub struct Metabolite {
    /// Unique identifier, referenced by reaction stoichiometries
    pub id: String,
    /// Human readable name
    #[builder(default = "None")]
    pub name: Option<String>,
    /// Short name of the compartment the metabolite lives in
    #[builder(default = "None")]
    pub compartment: Option<String>,
    /// Electrical charge
    #[builder(default = "0")]
    pub charge: i32,
    /// Chemical formula
    #[builder(default = "None")]
    pub formula: Option<String>,
}
