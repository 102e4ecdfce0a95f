pub mod metrics;

use std::time::{SystemTime, UNIX_EPOCH};
use tracing_subscriber::EnvFilter;

/// `{env_id}__{exp_name}__{seed}__{unix_time}`, the run directory name.
pub fn run_name(env_id: &str, exp_name: &str, seed: u64) -> String {
    let unix_time = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    format!("{env_id}__{exp_name}__{seed}__{unix_time}")
}

pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn run_name_keeps_the_field_order() {
        let name = run_name("RC-v1", "smoke", 7);
        let fields: Vec<&str> = name.split("__").collect();
        assert_eq!(fields.len(), 4);
        assert_eq!(fields[0], "RC-v1");
        assert_eq!(fields[1], "smoke");
        assert_eq!(fields[2], "7");
    }
}
