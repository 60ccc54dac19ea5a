//! Reaction data type and the forward/reverse split used by every
//! optimization layer
use derive_builder::Builder;
use indexmap::IndexMap;

use crate::configuration::CONFIGURATION;
use crate::metabolic_model::gene::GeneActivity;
use crate::metabolic_model::model::Gpr;
use crate::utils::hashing::hash_as_hex_string;

/// A reaction of the metabolic model
///
/// Flux through the reaction is bounded by `lower_bound..=upper_bound`; a
/// negative lower bound marks the reaction as reversible. In optimization
/// problems the reaction is represented by a non negative forward variable
/// and, when reversible, a non negative reverse variable, so that net flux is
/// forward minus reverse.
#[derive(Builder, Debug, Clone)]
#[builder(setter(into))]
pub struct Reaction {
    /// Unique identifier
    pub id: String,
    /// Stoichiometry as metabolite id to coefficient, negative for consumed
    /// metabolites, positive for produced ones
    #[builder(default = "IndexMap::new()")]
    pub metabolites: IndexMap<String, f64>,
    /// Human readable name
    #[builder(default = "None")]
    pub name: Option<String>,
    /// GPR rule deciding whether the catalyzing machinery is present
    #[builder(default = "None")]
    pub gpr: Option<Gpr>,
    /// Lower flux bound
    #[builder(default = "CONFIGURATION.read().unwrap().lower_bound")]
    pub lower_bound: f64,
    /// Upper flux bound
    #[builder(default = "CONFIGURATION.read().unwrap().upper_bound")]
    pub upper_bound: f64,
    /// Subsystem the reaction belongs to
    #[builder(default = "None")]
    pub subsystem: Option<String>,
    /// Whether the reaction can currently carry flux
    #[builder(default = "ReactionActivity::Active")]
    pub activity: ReactionActivity,
    /// Pin for manually set activity: while true, expression thresholding
    /// leaves the activity alone
    #[builder(default = "false")]
    pub(crate) activity_set: bool,
}

impl Reaction {
    /// Whether the reaction can carry flux in both directions
    pub fn reversible(&self) -> bool {
        self.lower_bound < 0f64
    }

    /// Variable id of the forward direction, "{reaction_id}_forward"
    pub fn get_forward_id(&self) -> String {
        format!("{}_forward", &self.id)
    }

    /// Variable id of the reverse direction
    ///
    /// A hex hash of the reaction id is appended so the reverse id can never
    /// collide with another reaction's id.
    pub fn get_reverse_id(&self) -> String {
        format!("{}_reverse_{}", &self.id, hash_as_hex_string(&self.id))
    }

    /// Upper bound of the forward variable, zero for inactive reactions
    pub(crate) fn get_forward_upper_bound(&self) -> f64 {
        match self.activity {
            ReactionActivity::Active => self.upper_bound.max(0f64),
            ReactionActivity::Inactive => 0f64,
        }
    }

    /// Lower bound of the forward variable
    pub(crate) fn get_forward_lower_bound(&self) -> f64 {
        match self.activity {
            ReactionActivity::Active => self.lower_bound.max(0f64),
            ReactionActivity::Inactive => 0f64,
        }
    }

    /// Upper bound of the reverse variable, the mirrored lower flux bound
    pub(crate) fn get_reverse_upper_bound(&self) -> f64 {
        match self.activity {
            ReactionActivity::Active => (-self.lower_bound).max(0f64),
            ReactionActivity::Inactive => 0f64,
        }
    }

    /// Lower bound of the reverse variable, nonzero only when the flux is
    /// forced backward
    pub(crate) fn get_reverse_lower_bound(&self) -> f64 {
        match self.activity {
            ReactionActivity::Active => (-self.upper_bound).max(0f64),
            ReactionActivity::Inactive => 0f64,
        }
    }
}

/// Whether a Reaction is active or inactive
#[derive(Clone, Debug, PartialEq)]
pub enum ReactionActivity {
    /// The Reaction is active and can carry flux
    Active,
    /// The Reaction is inactive and can't carry flux
    Inactive,
}

impl From<GeneActivity> for ReactionActivity {
    fn from(value: GeneActivity) -> Self {
        match value {
            GeneActivity::Active => ReactionActivity::Active,
            GeneActivity::Inactive => ReactionActivity::Inactive,
        }
    }
}
