#![deny(unreachable_patterns)]

//! Speed Planner and Config Builder: turns an analyzed route into a
//! complete, validated render invocation.

pub mod config_builder;
pub mod error;
mod speed;

pub use config_builder::{build_config, RenderRequest};
pub use error::{PlannerError, PlannerResult};
pub use speed::plan_speed;
