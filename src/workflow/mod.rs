pub mod item_ctx;
pub mod review_flow;

pub use item_ctx::ItemCtx;
pub use review_flow::{FlowOutcome, ReviewFlow, Stage, StageFailure};
