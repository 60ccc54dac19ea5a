//! Gene data type, the leaves of GPR rules
use std::fmt::{Display, Formatter};

use derive_builder::Builder;

/// A gene whose activity feeds into GPR evaluation
#[derive(Builder, Clone, Debug, Eq, PartialEq)]
#[builder(setter(into))]
pub struct Gene {
    /// Unique identifier, referenced by GPR gene nodes
    pub id: String,
    /// Human readable name
    #[builder(default = "None")]
    pub name: Option<String>,
    /// Current activity, flipped by expression thresholding or manual
    /// knockouts
    #[builder(default = "GeneActivity::Active")]
    pub activity: GeneActivity,
}

impl Display for Gene {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.id)
    }
}

/// Whether a gene is active or not
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum GeneActivity {
    /// Gene is considered active
    Active,
    /// Gene is considered inactive
    Inactive,
}
