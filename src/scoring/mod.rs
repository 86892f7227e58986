// Trust scoring: turns an account snapshot into a category and an action.
//
// Leaf modules are pure: snapshot types, per-factor scorers, the weight
// table, aggregation, classification, the action policy and reason text.
// `evaluate` ties them together behind the exemption list and the
// ban-history gate.

pub mod breakdown;
pub mod category;
pub mod detector;
pub mod evaluate;
pub mod factors;
pub mod policy;
pub mod reasons;
pub mod snapshot;
pub mod weights;

pub use category::TrustCategory;
pub use detector::DetectorConfig;
pub use evaluate::{assess, evaluate, score_snapshot, EvaluationResult, Outcome};
pub use policy::Action;
pub use snapshot::AccountSnapshot;
