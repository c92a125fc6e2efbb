//! Abstract domains for the argus analyzer.
//!
//! - [`UnitDomain`]: the trivial domain; every state is the same. Useful as
//!   a reachability skeleton and as the smallest example of the contract.
//! - [`IntvDomain`]: per-variable interval bounds with guard refinement and
//!   invalid-access checks for null dereferences and bad allocations.
//! - [`UsedGlobalsDomain`]: collects the globals each function touches;
//!   [`compute_used_globals`] packages it as the pre-analysis whose result
//!   the driver's per-function globals mode consumes.

mod itv;
mod unit;
mod used_globals;

pub use itv::{IntvDomain, Itv, ItvFromCall, ItvState, ItvSummary};
pub use unit::{UnitDomain, UnitState};
pub use used_globals::{compute_used_globals, UsedGlobalsDomain, UsedGlobalsState};
