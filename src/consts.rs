/// Number of bases per turn pair on the honeycomb lattice.
pub const HONEYCOMB_STEP: usize = 21;
pub const DEFAULT_NUM_BASES: usize = 2 * HONEYCOMB_STEP;

/// Set to `1` or `true` to allow single base crossovers.
pub const ALLOW_SINGLE_BASE_XOVERS_VAR: &str = "ENSNANO_ALLOW_SINGLE_BASE_XOVERS";

pub const CHANGE_NUM_BASES_LABEL: &str = "Changing the number of bases";
pub const DRAG_ALL_ENDS_LABEL: &str = "Auto-drag ends";

/// Header of a track encoded in the 5' -> 3' direction of increasing indices.
pub const LOW_TO_HIGH_HEADER: &str = "(5->3)";
pub const HIGH_TO_LOW_HEADER: &str = "(3->5)";
