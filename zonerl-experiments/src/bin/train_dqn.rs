use candle_core::Result;
use clap::Parser;
use tracing::{info, warn};
use zonerl_agents::dqn::builder::DqnAgentBuilder;
use zonerl_agents::dqn::{DqnAlgorithm, DqnConfig, DqnHooks, TrainReport};
use zonerl_core::Algorithm;
use zonerl_core::env::Env;
use zonerl_core::utils::episode_stats::EpisodeRecord;
use zonerl_experiments::metrics::MetricsWriter;
use zonerl_experiments::{init_tracing, run_name};
use zonerl_thermal::disturbance::DisturbanceSeries;
use zonerl_thermal::env::{R4C3Config, R4C3DiscreteEnv};

// the measured series starts on July 1st, midnight
const DATA_T0: i64 = 181 * 24 * 3600;

#[derive(Parser, Debug)]
#[command(about = "Train a DQN HVAC controller on the 4R3C zone model")]
struct Args {
    /// Name of this experiment, part of the run directory name.
    #[arg(long, default_value = "dqn")]
    exp_name: String,
    #[arg(long, default_value_t = 2)]
    seed: u64,
    /// Accepted for script compatibility, experiment tracking is not wired up.
    #[arg(long, default_value_t = false)]
    track: bool,
    /// Accepted for script compatibility, there is nothing to record.
    #[arg(long, default_value_t = false)]
    capture_video: bool,
    /// Save the trained network to `runs/<run_name>/model.safetensors`.
    #[arg(long, default_value_t = false)]
    save_model: bool,
    /// Accepted for script compatibility, models are only saved locally.
    #[arg(long, default_value_t = false)]
    upload_model: bool,
    #[arg(long, default_value = "R4C3Discrete-v0")]
    env_id: String,
    /// One-minute disturbance measurements driving the zone model.
    #[arg(long, default_value = "data/disturbance_1min.csv")]
    data: String,
    #[arg(long, default_value_t = 48_000)]
    total_timesteps: usize,
    #[arg(long, default_value_t = 1e-4)]
    learning_rate: f64,
    #[arg(long, default_value_t = 20_000)]
    buffer_size: usize,
    #[arg(long, default_value_t = 0.99)]
    gamma: f64,
    #[arg(long, default_value_t = 0.001)]
    tau: f64,
    #[arg(long, default_value_t = 1)]
    target_network_frequency: usize,
    #[arg(long, default_value_t = 64)]
    batch_size: usize,
    #[arg(long, default_value_t = 1.)]
    start_e: f32,
    #[arg(long, default_value_t = 0.01)]
    end_e: f32,
    #[arg(long, default_value_t = 0.5)]
    exploration_fraction: f32,
    #[arg(long, default_value_t = 0)]
    learning_starts: usize,
    #[arg(long, default_value_t = 1)]
    train_frequency: usize,
}

impl Args {
    fn dqn_config(&self) -> DqnConfig {
        DqnConfig {
            total_timesteps: self.total_timesteps,
            learning_starts: self.learning_starts,
            train_frequency: self.train_frequency,
            target_network_frequency: self.target_network_frequency,
            batch_size: self.batch_size,
            buffer_size: self.buffer_size,
            gamma: self.gamma,
            tau: self.tau,
            start_e: self.start_e,
            end_e: self.end_e,
            exploration_fraction: self.exploration_fraction,
            seed: self.seed,
        }
    }

    fn hyperparameter_rows(&self) -> Vec<(&'static str, String)> {
        vec![
            ("exp_name", self.exp_name.clone()),
            ("seed", self.seed.to_string()),
            ("track", self.track.to_string()),
            ("capture_video", self.capture_video.to_string()),
            ("save_model", self.save_model.to_string()),
            ("upload_model", self.upload_model.to_string()),
            ("env_id", self.env_id.clone()),
            ("data", self.data.clone()),
            ("total_timesteps", self.total_timesteps.to_string()),
            ("learning_rate", self.learning_rate.to_string()),
            ("buffer_size", self.buffer_size.to_string()),
            ("gamma", self.gamma.to_string()),
            ("tau", self.tau.to_string()),
            (
                "target_network_frequency",
                self.target_network_frequency.to_string(),
            ),
            ("batch_size", self.batch_size.to_string()),
            ("start_e", self.start_e.to_string()),
            ("end_e", self.end_e.to_string()),
            (
                "exploration_fraction",
                self.exploration_fraction.to_string(),
            ),
            ("learning_starts", self.learning_starts.to_string()),
            ("train_frequency", self.train_frequency.to_string()),
        ]
    }
}

/// Streams the training scalars into the per-run metrics sink.
struct MetricsHooks {
    writer: MetricsWriter,
}

impl DqnHooks for MetricsHooks {
    fn episode_end_hook(
        &mut self,
        step: usize,
        record: &EpisodeRecord,
        epsilon: f32,
    ) -> Result<()> {
        info!(
            step,
            episodic_return = record.episodic_return,
            episodic_length = record.episodic_length,
            "episode finished"
        );
        self.writer
            .add_scalar("charts/episodic_return", step, record.episodic_return)?;
        self.writer.add_scalar(
            "charts/episodic_length",
            step,
            record.episodic_length as f32,
        )?;
        self.writer.add_scalar("charts/epsilon", step, epsilon)
    }

    fn train_hook(&mut self, report: &TrainReport) -> Result<()> {
        if report.step % 100 != 0 {
            return Ok(());
        }
        self.writer
            .add_scalar("losses/td_loss", report.step, report.loss)?;
        self.writer
            .add_scalar("losses/q_values", report.step, report.mean_q)?;
        self.writer
            .add_scalar("charts/SPS", report.step, report.steps_per_second)
    }

    fn shutdown_hook(&mut self) -> Result<()> {
        info!(run_dir = %self.writer.run_dir().display(), "training finished");
        Ok(())
    }
}

fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();
    if args.track {
        warn!("--track is accepted but experiment tracking is not wired up");
    }
    if args.capture_video {
        warn!("--capture-video is accepted but there is nothing to record");
    }
    if args.upload_model {
        warn!("--upload-model is accepted, the model is only saved locally");
    }

    let run_name = run_name(&args.env_id, &args.exp_name, args.seed);
    let mut writer = MetricsWriter::new("runs", &run_name)?;
    writer.write_hyperparameters(&args.hyperparameter_rows())?;
    info!(%run_name, "starting training");

    let config = R4C3Config::default_experiment();
    let series = DisturbanceSeries::from_csv(&args.data, DATA_T0, 60)?
        .resample(config.dt as i64)?;
    let env = R4C3DiscreteEnv::new(config, &series)?;

    let description = env.env_description();
    let agent = DqnAgentBuilder {
        observation_size: description.observation_size(),
        action_size: description.action_size(),
        learning_rate: args.learning_rate,
        ..Default::default()
    }
    .build()?;

    let hooks = MetricsHooks { writer };
    let mut algorithm = DqnAlgorithm::new(env, agent, args.dqn_config(), hooks);
    algorithm.train()?;

    if args.save_model {
        let path = algorithm
            .hooks
            .writer
            .run_dir()
            .join("model.safetensors");
        algorithm.agent.save(&path)?;
        info!(path = %path.display(), "model saved");
    }
    Ok(())
}
