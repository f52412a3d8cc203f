//! Score components produced for a trajectory

/// Breakdown of the potential term `V`
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PenaltyBreakdown {
    /// Weighted sum of per-state constraint penalties
    pub constraints: f64,
    /// Fraction of suspect states, in [0, 1]
    pub drift: f64,
    /// Velocity instability, in [0, 1]
    pub convergence: f64,
}

impl PenaltyBreakdown {
    /// Sum of all penalty terms
    pub fn total(&self) -> f64 {
        self.constraints + self.drift + self.convergence
    }
}

/// Kinetic term, potential term and the resulting action
///
/// `kinetic` and `potential` are never negative; `action` may be.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScoreComponents {
    /// Aggregate activity across the trajectory (`T`)
    pub kinetic: f64,
    /// Aggregate penalty (`V`)
    pub potential: f64,
    /// `T - V`
    pub action: f64,
    /// How `V` was assembled
    pub penalties: PenaltyBreakdown,
    /// Number of states that triggered at least one constraint
    pub suspect_states: usize,
}

impl ScoreComponents {
    /// Assemble components from `T` and the penalty breakdown
    pub fn new(kinetic: f64, penalties: PenaltyBreakdown, suspect_states: usize) -> Self {
        let potential = penalties.total();
        Self {
            kinetic,
            potential,
            action: kinetic - potential,
            penalties,
            suspect_states,
        }
    }

    /// The all-zero score of an empty trajectory
    pub fn zero() -> Self {
        Self::default()
    }

    /// Admissibility threshold: non-negative action admits
    pub fn is_admissible(&self) -> bool {
        self.action >= 0.0
    }

    /// True when every component is a finite number
    pub fn is_finite(&self) -> bool {
        self.kinetic.is_finite() && self.potential.is_finite() && self.action.is_finite()
    }
}
