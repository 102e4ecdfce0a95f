/// Cumulative reward and length of a finished episode.
#[derive(Debug, Clone, Copy)]
pub struct EpisodeRecord {
    pub episodic_return: f32,
    pub episodic_length: usize,
}

/// Tracks the running return and length of the current episode and emits a
/// record when the episode ends.
#[derive(Debug, Default)]
pub struct EpisodeStats {
    current_return: f32,
    current_length: usize,
}

impl EpisodeStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_step(&mut self, reward: f32, done: bool) -> Option<EpisodeRecord> {
        self.current_return += reward;
        self.current_length += 1;
        if done {
            let record = EpisodeRecord {
                episodic_return: self.current_return,
                episodic_length: self.current_length,
            };
            self.current_return = 0.;
            self.current_length = 0;
            Some(record)
        } else {
            None
        }
    }
}
