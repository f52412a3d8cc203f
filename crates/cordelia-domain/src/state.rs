//! Cognitive states and trajectories
//!
//! A trajectory is the ordered list of states a prompt passes through on
//! its way to an output. Velocities are derived once, at construction,
//! from each adjacent pair of states.

/// Lowest velocity a state transition can have
pub const VELOCITY_FLOOR: f64 = 0.5;

/// Width of the velocity range above [`VELOCITY_FLOOR`]
pub const VELOCITY_SPAN: f64 = 0.5;

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// A point in configuration space: one stage of processing a prompt
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CognitiveState {
    representation: String,
}

impl CognitiveState {
    /// Create a state from its textual representation
    pub fn new(representation: impl Into<String>) -> Self {
        Self {
            representation: representation.into(),
        }
    }

    /// The textual representation of this state
    pub fn representation(&self) -> &str {
        &self.representation
    }

    /// Length in characters (not bytes)
    pub fn char_len(&self) -> usize {
        self.representation.chars().count()
    }
}

impl From<&str> for CognitiveState {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for CognitiveState {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// Ordered sequence of states plus one velocity per adjacent pair
///
/// Invariant: `velocities.len() == states.len().saturating_sub(1)` and
/// every velocity lies in `[VELOCITY_FLOOR, VELOCITY_FLOOR + VELOCITY_SPAN)`.
#[derive(Debug, Clone, PartialEq)]
pub struct Trajectory {
    states: Vec<CognitiveState>,
    velocities: Vec<f64>,
}

impl Trajectory {
    /// Build a trajectory, deriving velocities from consecutive states
    pub fn new(states: Vec<CognitiveState>) -> Self {
        let velocities = states
            .windows(2)
            .map(|pair| transition_velocity(&pair[0], &pair[1]))
            .collect();

        Self { states, velocities }
    }

    /// An empty trajectory (no states, no velocities)
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// The three-stage trajectory every prompt starts from:
    /// `{prompt}_initial`, `{prompt}_processing`, `{prompt}_final`
    pub fn from_prompt(prompt: &str) -> Self {
        Self::new(vec![
            CognitiveState::new(format!("{}_initial", prompt)),
            CognitiveState::new(format!("{}_processing", prompt)),
            CognitiveState::new(format!("{}_final", prompt)),
        ])
    }

    /// States in order
    pub fn states(&self) -> &[CognitiveState] {
        &self.states
    }

    /// Velocities in order (one fewer than states)
    pub fn velocities(&self) -> &[f64] {
        &self.velocities
    }

    /// Number of states
    pub fn len(&self) -> usize {
        self.states.len()
    }

    /// True when the trajectory has no states
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}

/// Deterministic velocity between two states
///
/// Hashes both representations (with a separator so that `("ab", "c")`
/// and `("a", "bc")` differ) and maps the hash into the velocity range.
pub fn transition_velocity(from: &CognitiveState, to: &CognitiveState) -> f64 {
    let mut hash = FNV_OFFSET;
    for byte in from
        .representation
        .bytes()
        .chain(std::iter::once(0x1f))
        .chain(to.representation.bytes())
    {
        hash ^= u64::from(byte);
        hash = hash.wrapping_mul(FNV_PRIME);
    }

    VELOCITY_FLOOR + VELOCITY_SPAN * ((hash % 1000) as f64 / 1000.0)
}
