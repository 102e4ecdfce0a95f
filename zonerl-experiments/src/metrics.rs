use candle_core::{Error, Result};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Scalar metrics sink keyed by named channels: one `scalars.csv` per run
/// with `channel,step,value` rows, plus a markdown hyperparameter table.
pub struct MetricsWriter {
    run_dir: PathBuf,
    scalars: File,
}

impl MetricsWriter {
    pub fn new<P: AsRef<Path>>(root: P, run_name: &str) -> Result<Self> {
        let run_dir = root.as_ref().join(run_name);
        fs::create_dir_all(&run_dir).map_err(Error::wrap)?;
        let mut scalars = File::create(run_dir.join("scalars.csv")).map_err(Error::wrap)?;
        writeln!(scalars, "channel,step,value").map_err(Error::wrap)?;
        Ok(Self { run_dir, scalars })
    }

    pub fn run_dir(&self) -> &Path {
        &self.run_dir
    }

    pub fn add_scalar(&mut self, channel: &str, step: usize, value: f32) -> Result<()> {
        writeln!(self.scalars, "{channel},{step},{value}").map_err(Error::wrap)
    }

    pub fn write_hyperparameters(&self, rows: &[(&str, String)]) -> Result<()> {
        let mut file =
            File::create(self.run_dir.join("hyperparameters.md")).map_err(Error::wrap)?;
        writeln!(file, "|param|value|").map_err(Error::wrap)?;
        writeln!(file, "|-|-|").map_err(Error::wrap)?;
        for (key, value) in rows {
            writeln!(file, "|{key}|{value}|").map_err(Error::wrap)?;
        }
        Ok(())
    }
}
