mod corpus;
pub mod pipeline;
pub mod rank;
pub mod recommend;

pub use pipeline::run_pipeline;
pub use rank::run_rank;
pub use recommend::run_recommend;
