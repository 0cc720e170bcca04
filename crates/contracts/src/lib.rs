pub mod alloy;
pub mod deployments;

pub use deployments::Env;
