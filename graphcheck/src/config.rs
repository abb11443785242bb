/// Compiler settings shared by every program a validator builds.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ValidatorConfig {
    /// How many re-entries of an already entered type one root-to-leaf
    /// expansion path may hold. Repeats of every type on the path count
    /// against the same limit. Values below the cut-off are not validated;
    /// the compiler logs a warning for each type it had to truncate.
    pub cycle_depth: usize,
    /// Upper bound on member nodes in one compiled program. Exceeding it
    /// fails compilation with [`Error::MemberBudget`](crate::Error::MemberBudget).
    pub max_members: usize,
}

impl ValidatorConfig {
    pub const DEFAULT_CYCLE_DEPTH: usize = 4;
    pub const DEFAULT_MAX_MEMBERS: usize = 100_000;
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            cycle_depth: Self::DEFAULT_CYCLE_DEPTH,
            max_members: Self::DEFAULT_MAX_MEMBERS,
        }
    }
}
