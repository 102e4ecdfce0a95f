pub mod build_sequential;
pub mod clip_grad;
pub mod episode_stats;
pub mod soft_update;
