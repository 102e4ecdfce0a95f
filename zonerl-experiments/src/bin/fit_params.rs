use candle_core::Result;
use clap::Parser;
use tracing::info;
use zonerl_experiments::init_tracing;
use zonerl_thermal::disturbance::DisturbanceSeries;
use zonerl_thermal::fit::{FitConfig, FitResult, fit};

/// Input channels of the zone model, in simulation order, followed by the
/// measured zone temperature the fit targets.
const INPUT_CHANNELS: [&str; 5] =
    ["out_temp", "qint_lump", "qhvac", "qwin_lump", "qradin_lump"];
const OUTPUT_CHANNEL: &str = "temp_zone";

#[derive(Parser, Debug)]
#[command(about = "Fit the 4R3C coefficients to measured zone data")]
struct Args {
    /// One-minute measurements of the disturbances and the zone temperature.
    #[arg(long, default_value = "data/disturbance_1min.csv")]
    data: String,
    /// Simulation step of the fitted rollout, seconds.
    #[arg(long, default_value_t = 3600.)]
    dt: f64,
    /// Fraction of the series used for fitting, the rest is held out.
    #[arg(long, default_value_t = 0.1)]
    train_ratio: f64,
    #[arg(long, default_value_t = 1000)]
    epochs: usize,
    #[arg(long, default_value_t = 1e-5)]
    learning_rate: f64,
    #[arg(long, default_value_t = 10.)]
    grad_clip: f64,
}

fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();

    let series = DisturbanceSeries::from_csv(&args.data, 0, 60)?.resample(args.dt as i64)?;
    let n_train = (series.len() as f64 * args.train_ratio) as usize;
    let (train, _held_out) = series.split(n_train);
    info!(
        rows = train.len(),
        total = series.len(),
        "fitting on the head of the series"
    );

    let d = train.select(&INPUT_CHANNELS)?;
    let y_true: Vec<f64> = train
        .select(&[OUTPUT_CHANNEL])?
        .into_iter()
        .map(|row| row[0])
        .collect();

    let config = FitConfig {
        epochs: args.epochs,
        learning_rate: args.learning_rate,
        grad_clip: args.grad_clip,
        dt: args.dt,
        ..Default::default()
    };
    // unit coefficients and rough summer wall temperatures to start from
    let p0 = [1., 1., 1., 1., 1., 1., 1., 32., 26.];
    let FitResult { params, loss } = fit(&p0, &d, &y_true, &config)?;

    println!("final loss: {loss:.6}");
    let names = ["Cai", "Cwe", "Cwi", "Re", "Ri", "Rw", "Rg", "Twe0", "Twi0"];
    for (name, value) in names.iter().zip(&params) {
        println!("{name:>5}: {value:.7}");
    }
    Ok(())
}
