pub mod env;
pub mod replay_buffer;
pub mod schedules;
pub mod utils;

use candle_core::Result;

pub trait Algorithm {
    fn train(&mut self) -> Result<()>;
}
