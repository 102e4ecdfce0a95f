use candle_core::{Error, Result, bail};
use std::fs;
use std::path::Path;

/// A fixed-interval exogenous input series (outdoor temperature, internal and
/// solar heat gains, measured zone output). Loaded once, read-only afterwards.
#[derive(Debug, Clone)]
pub struct DisturbanceSeries {
    /// Unix time of the first row.
    pub t0: i64,
    /// Interval between rows in seconds.
    pub dt: i64,
    pub names: Vec<String>,
    /// Row-major, one row per interval.
    pub values: Vec<Vec<f64>>,
}

impl DisturbanceSeries {
    /// Parses a headered CSV whose first column is a row index and remaining
    /// columns are named channels. Rows are assumed `dt`-spaced from `t0`.
    pub fn from_csv<P: AsRef<Path>>(path: P, t0: i64, dt: i64) -> Result<Self> {
        let raw = fs::read_to_string(path.as_ref()).map_err(Error::wrap)?;
        let mut lines = raw.lines();
        let header = match lines.next() {
            Some(header) => header,
            None => bail!("disturbance file {:?} is empty", path.as_ref()),
        };
        let names: Vec<String> = header.split(',').skip(1).map(|n| n.trim().to_string()).collect();
        let mut values = vec![];
        for (line_idx, line) in lines.enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let mut row = Vec::with_capacity(names.len());
            for field in line.split(',').skip(1) {
                let value: f64 = field.trim().parse().map_err(|err| {
                    Error::msg(format!("line {}: {err}", line_idx + 2))
                })?;
                row.push(value);
            }
            if row.len() != names.len() {
                bail!(
                    "line {}: expected {} fields, got {}",
                    line_idx + 2,
                    names.len(),
                    row.len()
                );
            }
            values.push(row);
        }
        Ok(Self {
            t0,
            dt,
            names,
            values,
        })
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Groups rows into `bin`-wide time bins and averages each group, the
    /// resampling the measured 1-minute series goes through before use.
    pub fn resample(&self, bin: i64) -> Result<Self> {
        if bin <= 0 || bin % self.dt != 0 {
            bail!("bin {} is not a multiple of the row interval {}", bin, self.dt);
        }
        let mut values: Vec<Vec<f64>> = vec![];
        let mut counts: Vec<usize> = vec![];
        let mut current_key = None;
        for (i, row) in self.values.iter().enumerate() {
            let key = (self.t0 + i as i64 * self.dt).div_euclid(bin);
            if current_key != Some(key) {
                current_key = Some(key);
                values.push(vec![0.; row.len()]);
                counts.push(0);
            }
            let group = values.last_mut().unwrap();
            for (acc, value) in group.iter_mut().zip(row) {
                *acc += value;
            }
            *counts.last_mut().unwrap() += 1;
        }
        for (group, count) in values.iter_mut().zip(&counts) {
            for acc in group.iter_mut() {
                *acc /= *count as f64;
            }
        }
        let t0 = self.t0.div_euclid(bin) * bin;
        Ok(Self {
            t0,
            dt: bin,
            names: self.names.clone(),
            values,
        })
    }

    /// Projects named channels, in the given order, into simulation input rows.
    pub fn select(&self, channels: &[&str]) -> Result<Vec<Vec<f64>>> {
        let mut indices = Vec::with_capacity(channels.len());
        for channel in channels {
            match self.names.iter().position(|n| n == channel) {
                Some(idx) => indices.push(idx),
                None => bail!("unknown disturbance channel {channel}"),
            }
        }
        Ok(self
            .values
            .iter()
            .map(|row| indices.iter().map(|idx| row[*idx]).collect())
            .collect())
    }

    /// Splits the series after `n` rows into a training and a testing part.
    pub fn split(&self, n: usize) -> (Self, Self) {
        let n = n.min(self.len());
        let head = Self {
            t0: self.t0,
            dt: self.dt,
            names: self.names.clone(),
            values: self.values[..n].to_vec(),
        };
        let tail = Self {
            t0: self.t0 + n as i64 * self.dt,
            dt: self.dt,
            names: self.names.clone(),
            values: self.values[n..].to_vec(),
        };
        (head, tail)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const SAMPLE: &str = "tests/data/disturbance_sample.csv";

    #[test]
    fn loads_the_sample_file() -> Result<()> {
        let series = DisturbanceSeries::from_csv(SAMPLE, 0, 60)?;
        assert_eq!(
            series.names,
            ["out_temp", "qint_lump", "qhvac", "qwin_lump", "qradin_lump", "temp_zone"]
        );
        assert_eq!(series.len(), 12);
        assert_eq!(series.values[0].len(), 6);
        Ok(())
    }

    #[test]
    fn resample_averages_bins() -> Result<()> {
        let series = DisturbanceSeries::from_csv(SAMPLE, 0, 60)?;
        let resampled = series.resample(240)?;
        // 12 one-minute rows fold into 3 four-minute bins
        assert_eq!(resampled.len(), 3);
        assert_eq!(resampled.dt, 240);
        let expected: f64 = series.values[..4].iter().map(|r| r[0]).sum::<f64>() / 4.;
        assert!((resampled.values[0][0] - expected).abs() < 1e-12);
        Ok(())
    }

    #[test]
    fn select_projects_in_order() -> Result<()> {
        let series = DisturbanceSeries::from_csv(SAMPLE, 0, 60)?;
        let rows = series.select(&["qint_lump", "out_temp"])?;
        assert_eq!(rows[0][0], series.values[0][1]);
        assert_eq!(rows[0][1], series.values[0][0]);
        assert!(series.select(&["not_a_channel"]).is_err());
        Ok(())
    }

    #[test]
    fn split_preserves_rows_and_shifts_t0() -> Result<()> {
        let series = DisturbanceSeries::from_csv(SAMPLE, 0, 60)?;
        let (train, test) = series.split(8);
        assert_eq!(train.len(), 8);
        assert_eq!(test.len(), 4);
        assert_eq!(test.t0, 8 * 60);
        assert_eq!(test.values[0], series.values[8]);
        Ok(())
    }
}
