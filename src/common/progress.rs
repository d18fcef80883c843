use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Ticking spinner for a stage with no natural item count (training, centrality)
pub fn create_stage_spinner(stage: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
            .expect("Failed to create progress style"),
    );
    pb.set_message(stage.to_string());
    pb.enable_steady_tick(Duration::from_millis(120));
    pb
}

/// Bar over `total` texts sent to an embedding provider
pub fn create_embedding_progress_bar(total: u64, provider: &str) -> ProgressBar {
    let pb = ProgressBar::new(total);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} texts ({per_sec}) {msg}")
            .expect("Failed to create progress style")
            .progress_chars("#>-"),
    );
    pb.set_message(format!("embedding via {}", provider));
    pb
}
