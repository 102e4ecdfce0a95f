pub mod builder;

use candle_core::{D, Device, Result, Tensor};
use candle_nn::{AdamW, Module, Optimizer, Sequential, VarMap};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::Path;
use std::time::Instant;
use zonerl_core::{
    Algorithm,
    env::Env,
    replay_buffer::{ReplayBatch, ReplayBuffer, Transition},
    schedules::linear_schedule,
    utils::{
        clip_grad::clip_grad_components,
        episode_stats::{EpisodeRecord, EpisodeStats},
        soft_update::soft_update,
    },
};

pub struct QNetwork {
    net: Sequential,
}

impl QNetwork {
    pub fn new(net: Sequential) -> Self {
        Self { net }
    }

    /// Predicted value of every action for a batch of observations.
    pub fn forward(&self, observations: &Tensor) -> Result<Tensor> {
        self.net.forward(observations)
    }
}

/// Online and target Q-networks with the optimizer driving the online one.
pub struct DqnAgent {
    q_net: QNetwork,
    target_net: QNetwork,
    varmap: VarMap,
    target_varmap: VarMap,
    optimizer: AdamW,
    grad_clip: Option<f64>,
    device: Device,
}

impl DqnAgent {
    pub(crate) fn new(
        q_net: QNetwork,
        target_net: QNetwork,
        varmap: VarMap,
        target_varmap: VarMap,
        optimizer: AdamW,
        grad_clip: Option<f64>,
        device: Device,
    ) -> Result<Self> {
        let agent = Self {
            q_net,
            target_net,
            varmap,
            target_varmap,
            optimizer,
            grad_clip,
            device,
        };
        // the target starts as an exact copy of the online network
        agent.sync_target(1.0)?;
        Ok(agent)
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    /// The value-maximizing action for a single observation.
    pub fn best_action(&self, observation: &[f32]) -> Result<usize> {
        let observation =
            Tensor::from_slice(observation, (1, observation.len()), &self.device)?;
        let q_values = self.q_net.forward(&observation)?;
        let action = q_values.argmax(D::Minus1)?.squeeze(0)?.to_scalar::<u32>()?;
        Ok(action as usize)
    }

    /// One TD step on a sampled minibatch: bootstrapped target from the
    /// target network, MSE on the taken actions, gradient descent on the
    /// online network only. Returns the loss and the mean predicted value.
    pub fn learn(&mut self, batch: &ReplayBatch, gamma: f64) -> Result<(f32, f32)> {
        let q_next = self.target_net.forward(&batch.next_observations)?;
        let q_next_max = q_next.max(D::Minus1)?;
        let not_done = batch.dones.affine(-1., 1.)?;
        let bootstrap = not_done.mul(&q_next_max)?.affine(gamma, 0.)?;
        let td_target = batch.rewards.add(&bootstrap)?.detach();
        let q_pred = self
            .q_net
            .forward(&batch.observations)?
            .gather(&batch.actions.unsqueeze(1)?, 1)?
            .squeeze(1)?;
        let loss = q_pred.sub(&td_target)?.sqr()?.mean_all()?;
        let grads = match self.grad_clip {
            Some(clip) => clip_grad_components(&loss, &self.varmap, clip)?,
            None => loss.backward()?,
        };
        self.optimizer.step(&grads)?;
        Ok((
            loss.to_scalar::<f32>()?,
            q_pred.mean_all()?.to_scalar::<f32>()?,
        ))
    }

    /// Blends the online parameters into the target parameters.
    pub fn sync_target(&self, tau: f64) -> Result<()> {
        soft_update(&self.varmap, &self.target_varmap, tau)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.varmap.save(path)
    }
}

/// Loop counters and frequencies of the off-policy training run.
#[derive(Debug, Clone)]
pub struct DqnConfig {
    pub total_timesteps: usize,
    pub learning_starts: usize,
    pub train_frequency: usize,
    pub target_network_frequency: usize,
    pub batch_size: usize,
    pub buffer_size: usize,
    pub gamma: f64,
    pub tau: f64,
    pub start_e: f32,
    pub end_e: f32,
    pub exploration_fraction: f32,
    pub seed: u64,
}

impl Default for DqnConfig {
    fn default() -> Self {
        Self {
            total_timesteps: 48_000,
            learning_starts: 0,
            train_frequency: 1,
            target_network_frequency: 1,
            batch_size: 64,
            buffer_size: 20_000,
            gamma: 0.99,
            tau: 0.001,
            start_e: 1.,
            end_e: 0.01,
            exploration_fraction: 0.5,
            seed: 2,
        }
    }
}

pub struct TrainReport {
    pub step: usize,
    pub loss: f32,
    pub mean_q: f32,
    pub steps_per_second: f32,
}

pub trait DqnHooks {
    fn episode_end_hook(
        &mut self,
        step: usize,
        record: &EpisodeRecord,
        epsilon: f32,
    ) -> Result<()>;

    fn train_hook(&mut self, report: &TrainReport) -> Result<()>;

    fn shutdown_hook(&mut self) -> Result<()>;
}

/// Prints episode summaries, mirroring what the metrics-backed hooks log.
pub struct DefaultDqnHooks;

impl DqnHooks for DefaultDqnHooks {
    fn episode_end_hook(
        &mut self,
        step: usize,
        record: &EpisodeRecord,
        epsilon: f32,
    ) -> Result<()> {
        println!(
            "step: {:<7} episodic return: {:<10.2} length: {:<5} epsilon: {:.3}",
            step, record.episodic_return, record.episodic_length, epsilon
        );
        Ok(())
    }

    fn train_hook(&mut self, _report: &TrainReport) -> Result<()> {
        Ok(())
    }

    fn shutdown_hook(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Epsilon-greedy off-policy training over a single environment.
pub struct DqnAlgorithm<E: Env, H: DqnHooks> {
    pub env: E,
    pub agent: DqnAgent,
    pub buffer: ReplayBuffer,
    pub config: DqnConfig,
    pub hooks: H,
    rng: StdRng,
}

impl<E: Env, H: DqnHooks> DqnAlgorithm<E, H> {
    pub fn new(env: E, agent: DqnAgent, config: DqnConfig, hooks: H) -> Self {
        let buffer = ReplayBuffer::new(config.buffer_size);
        let rng = StdRng::seed_from_u64(config.seed);
        Self {
            env,
            agent,
            buffer,
            config,
            hooks,
            rng,
        }
    }
}

impl<E: Env, H: DqnHooks> Algorithm for DqnAlgorithm<E, H> {
    fn train(&mut self) -> Result<()> {
        let action_size = self.env.env_description().action_size();
        let exploration_steps =
            self.config.exploration_fraction * self.config.total_timesteps as f32;
        let start = Instant::now();
        let mut stats = EpisodeStats::new();
        let mut observation = self.env.reset(self.config.seed)?;

        for global_step in 0..self.config.total_timesteps {
            let epsilon = linear_schedule(
                self.config.start_e,
                self.config.end_e,
                exploration_steps,
                global_step,
            );
            let action = if self.rng.random::<f32>() < epsilon {
                self.rng.random_range(0..action_size)
            } else {
                self.agent.best_action(&observation)?
            };

            let snapshot = self.env.step(action)?;
            let done = snapshot.done();
            if let Some(record) = stats.record_step(snapshot.reward, done) {
                self.hooks.episode_end_hook(global_step, &record, epsilon)?;
            }
            // the stored next observation is the one the environment emitted
            // for this step; the reset below never leaks into the buffer
            self.buffer.push(Transition {
                observation,
                action: action as u32,
                reward: snapshot.reward,
                next_observation: snapshot.state.clone(),
                done,
            });
            observation = if done {
                self.env.reset(self.rng.random())?
            } else {
                snapshot.state
            };

            if global_step > self.config.learning_starts {
                if global_step % self.config.train_frequency == 0 {
                    let batch = self.buffer.sample(
                        self.config.batch_size,
                        &mut self.rng,
                        self.agent.device(),
                    )?;
                    let (loss, mean_q) = self.agent.learn(&batch, self.config.gamma)?;
                    let report = TrainReport {
                        step: global_step,
                        loss,
                        mean_q,
                        steps_per_second: global_step as f32
                            / start.elapsed().as_secs_f32().max(f32::EPSILON),
                    };
                    self.hooks.train_hook(&report)?;
                }
                if global_step % self.config.target_network_frequency == 0 {
                    self.agent.sync_target(self.config.tau)?;
                }
            }
        }
        self.hooks.shutdown_hook()
    }
}
