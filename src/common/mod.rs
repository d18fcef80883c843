pub mod input;
pub mod logging;
pub mod output;
pub mod progress;
pub mod types;
pub mod utils;

pub use input::{open_lines, read_jsonl, read_jsonl_from};
pub use logging::*;
pub use output::JsonlWriter;
pub use progress::{create_embedding_progress_bar, create_stage_spinner};
pub use types::*;
pub use utils::*;
