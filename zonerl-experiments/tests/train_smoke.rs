use candle_core::Result;
use zonerl_agents::dqn::builder::DqnAgentBuilder;
use zonerl_agents::dqn::{DqnAlgorithm, DqnConfig, DqnHooks, TrainReport};
use zonerl_core::Algorithm;
use zonerl_core::env::Env;
use zonerl_core::utils::episode_stats::EpisodeRecord;
use zonerl_thermal::disturbance::DisturbanceSeries;
use zonerl_thermal::env::{DISTURBANCE_CHANNELS, R4C3Config, R4C3DiscreteEnv};

#[derive(Default)]
struct CountingHooks {
    episodes: usize,
    train_reports: usize,
    shutdowns: usize,
}

impl DqnHooks for CountingHooks {
    fn episode_end_hook(
        &mut self,
        _step: usize,
        record: &EpisodeRecord,
        epsilon: f32,
    ) -> Result<()> {
        assert!(record.episodic_length > 0);
        assert!((0.0..=1.0).contains(&epsilon));
        self.episodes += 1;
        Ok(())
    }

    fn train_hook(&mut self, report: &TrainReport) -> Result<()> {
        assert!(report.loss.is_finite());
        self.train_reports += 1;
        Ok(())
    }

    fn shutdown_hook(&mut self) -> Result<()> {
        self.shutdowns += 1;
        Ok(())
    }
}

fn synthetic_series(rows: usize) -> DisturbanceSeries {
    DisturbanceSeries {
        t0: 0,
        dt: 900,
        names: DISTURBANCE_CHANNELS.iter().map(|n| n.to_string()).collect(),
        values: (0..rows)
            .map(|i| {
                let hour = (i as f64 * 900. / 3600.) % 24.;
                let sun = ((hour - 6.) / 12. * std::f64::consts::PI).sin().max(0.);
                vec![26. + 6. * sun, 0.1, 0.3 * sun, 0.05 * sun]
            })
            .collect(),
    }
}

#[test]
fn a_short_training_run_completes() -> Result<()> {
    let config = R4C3Config {
        ts: 0.,
        te: 4. * 3600.,
        n_actions: 5,
        ..R4C3Config::default_experiment()
    };
    let env = R4C3DiscreteEnv::new(config, &synthetic_series(64))?;
    let description = env.env_description();
    let agent = DqnAgentBuilder {
        observation_size: description.observation_size(),
        action_size: description.action_size(),
        hidden_layers: vec![32, 32],
        ..Default::default()
    }
    .build()?;
    let dqn_config = DqnConfig {
        total_timesteps: 64,
        batch_size: 8,
        buffer_size: 128,
        learning_starts: 8,
        seed: 1,
        ..Default::default()
    };
    let mut algorithm = DqnAlgorithm::new(env, agent, dqn_config, CountingHooks::default());
    algorithm.train()?;

    // 16 steps per episode over 64 timesteps
    assert!(algorithm.hooks.episodes >= 3);
    assert!(algorithm.hooks.train_reports > 0);
    assert_eq!(algorithm.hooks.shutdowns, 1);
    Ok(())
}
