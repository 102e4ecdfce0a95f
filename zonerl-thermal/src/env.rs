use crate::disturbance::DisturbanceSeries;
use crate::integrate::{Euler, Stepper};
use crate::state_space::{RcParams, StateSpace};
use candle_core::{Result, bail};
use zonerl_core::env::{Env, EnvironmentDescription, SnapShot, Space};

/// The measured channels the environment draws from the disturbance series,
/// in simulation input order (HVAC power is injected between them).
pub const DISTURBANCE_CHANNELS: [&str; 4] =
    ["out_temp", "qint_lump", "qwin_lump", "qradin_lump"];

const OBSERVATION_SIZE: usize = 5;
const COMFORT_LOW: f64 = 22.;
const COMFORT_HIGH: f64 = 26.;
const OCCUPIED_FROM_HOUR: f64 = 8.;
const OCCUPIED_TO_HOUR: f64 = 18.;

/// Everything the environment needs, passed explicitly at construction; there
/// is no hidden process-wide setup.
#[derive(Debug, Clone)]
pub struct R4C3Config {
    pub rc_params: RcParams,
    /// Initial zone state [T_ai, T_we, T_wi].
    pub x0: [f64; 3],
    pub x_high: [f64; 3],
    pub x_low: [f64; 3],
    /// Number of discrete HVAC power levels.
    pub n_actions: usize,
    /// HVAC thermal power bounds in kW; negative is cooling.
    pub u_high: f64,
    pub u_low: f64,
    pub cop: f64,
    /// Episode horizon and step, unix seconds.
    pub ts: f64,
    pub te: f64,
    pub dt: f64,
    /// Reward weights for energy, comfort violation and control smoothness.
    pub weights: [f64; 3],
}

impl R4C3Config {
    /// The calibrated one-day summer experiment.
    pub fn default_experiment() -> Self {
        let ts = 195. * 24. * 3600.;
        Self {
            rc_params: RcParams::calibrated(),
            x0: [20., 35.8, 26.],
            x_high: [40., 80., 40.],
            x_low: [10., 10., 10.],
            n_actions: 101,
            u_high: 0.,
            u_low: -10.,
            cop: 1.,
            ts,
            te: ts + 24. * 3600.,
            dt: 900.,
            weights: [100., 1., 0.],
        }
    }

    fn n_steps(&self) -> usize {
        ((self.te - self.ts) / self.dt).round() as usize
    }
}

/// Discrete-action HVAC control over the 4R3C zone model. Each step advances
/// the zone by one `dt` with the Euler stepper under the disturbance row of
/// the current step; the episode truncates when the clock reaches `te` and
/// terminates early if the state leaves its bounds.
pub struct R4C3DiscreteEnv {
    config: R4C3Config,
    ss: StateSpace,
    stepper: Euler,
    /// One row of [T_ao, q_conv_i, q_rad_e, q_rad_i] per step, plus one
    /// preview row for the final observation.
    disturbances: Vec<Vec<f64>>,
    x: [f64; 3],
    t: f64,
    step_idx: usize,
    last_u: f64,
}

impl R4C3DiscreteEnv {
    pub fn new(config: R4C3Config, series: &DisturbanceSeries) -> Result<Self> {
        if config.n_actions < 2 {
            bail!("need at least two discrete actions, got {}", config.n_actions);
        }
        if (series.dt as f64 - config.dt).abs() > f64::EPSILON {
            bail!(
                "disturbance interval {} does not match the environment step {}",
                series.dt,
                config.dt
            );
        }
        let offset = (config.ts - series.t0 as f64) / config.dt;
        if offset < 0. || offset.fract() != 0. {
            bail!("episode start {} is not aligned with the series", config.ts);
        }
        let offset = offset as usize;
        let n_steps = config.n_steps();
        let rows = series.select(&DISTURBANCE_CHANNELS)?;
        // one preview row past the horizon for the final observation
        if rows.len() < offset + n_steps + 1 {
            bail!(
                "disturbance series has {} rows, the episode needs {}",
                rows.len(),
                offset + n_steps + 1
            );
        }
        let disturbances = rows[offset..offset + n_steps + 1].to_vec();
        let ss = StateSpace::from_params(&config.rc_params);
        Ok(Self {
            x: config.x0,
            t: config.ts,
            step_idx: 0,
            last_u: 0.,
            config,
            ss,
            stepper: Euler,
            disturbances,
        })
    }

    fn action_to_power(&self, action: usize) -> f64 {
        let fraction = action as f64 / (self.config.n_actions - 1) as f64;
        self.config.u_low + fraction * (self.config.u_high - self.config.u_low)
    }

    fn observation(&self) -> Vec<f32> {
        let hour = (self.t / 3600.) % 24.;
        let next_out_temp = self.disturbances[self.step_idx][0];
        vec![
            (hour / 24.) as f32,
            self.x[0] as f32,
            self.x[1] as f32,
            self.x[2] as f32,
            next_out_temp as f32,
        ]
    }

    fn out_of_bounds(&self) -> bool {
        self.x
            .iter()
            .zip(self.config.x_low.iter().zip(&self.config.x_high))
            .any(|(x, (low, high))| x < low || x > high)
    }
}

impl Env for R4C3DiscreteEnv {
    fn reset(&mut self, _seed: u64) -> Result<Vec<f32>> {
        self.x = self.config.x0;
        self.t = self.config.ts;
        self.step_idx = 0;
        self.last_u = 0.;
        Ok(self.observation())
    }

    fn step(&mut self, action: usize) -> Result<SnapShot> {
        if action >= self.config.n_actions {
            bail!(
                "action {} out of range for {} discrete actions",
                action,
                self.config.n_actions
            );
        }
        if self.step_idx >= self.config.n_steps() {
            bail!("the episode is over, reset the environment first");
        }
        let u = self.action_to_power(action);
        // heat-gain channels and HVAC power share the kW scale of the model
        let q_hvac = self.config.cop * u;
        let row = &self.disturbances[self.step_idx];
        let input = [row[0], row[1], q_hvac, row[2], row[3]];
        self.x = self
            .stepper
            .step(&self.ss, self.x, &input, self.config.dt);
        self.t += self.config.dt;
        self.step_idx += 1;

        let energy_kwh = u.abs() * self.config.dt / 3600.;
        let hour = (self.t / 3600.) % 24.;
        let occupied = (OCCUPIED_FROM_HOUR..OCCUPIED_TO_HOUR).contains(&hour);
        let violation = if occupied {
            (self.x[0] - COMFORT_HIGH).max(0.) + (COMFORT_LOW - self.x[0]).max(0.)
        } else {
            0.
        };
        let du = u - self.last_u;
        self.last_u = u;
        let w = self.config.weights;
        let reward =
            -(w[0] * energy_kwh + w[1] * violation * violation + w[2] * du * du) as f32;

        let terminated = self.out_of_bounds();
        let truncated = self.step_idx >= self.config.n_steps();
        Ok(SnapShot {
            state: self.observation(),
            reward,
            terminated,
            truncated,
        })
    }

    fn env_description(&self) -> EnvironmentDescription {
        // the observation mixes bounded state with unbounded time and
        // weather features, so no per-component bounds are reported
        EnvironmentDescription::new(
            Space::Continuous {
                min: None,
                max: None,
                size: OBSERVATION_SIZE,
            },
            Space::Discrete(self.config.n_actions),
        )
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn constant_series(rows: usize, dt: i64) -> DisturbanceSeries {
        DisturbanceSeries {
            t0: 0,
            dt,
            names: DISTURBANCE_CHANNELS.iter().map(|n| n.to_string()).collect(),
            values: vec![vec![30., 0.1, 0.3, 0.05]; rows],
        }
    }

    fn small_config() -> R4C3Config {
        R4C3Config {
            ts: 0.,
            te: 4. * 3600.,
            n_actions: 5,
            ..R4C3Config::default_experiment()
        }
    }

    #[test]
    fn runs_an_episode_to_truncation() -> Result<()> {
        let config = small_config();
        let n_steps = config.n_steps();
        let mut env = R4C3DiscreteEnv::new(config, &constant_series(32, 900))?;
        let observation = env.reset(0)?;
        assert_eq!(observation.len(), OBSERVATION_SIZE);
        for step in 0..n_steps {
            let snapshot = env.step(0)?;
            assert_eq!(snapshot.truncated, step == n_steps - 1);
            // full cooling costs energy every step
            assert!(snapshot.reward < 0.);
        }
        assert!(env.step(0).is_err());
        Ok(())
    }

    #[test]
    fn idle_action_is_free_of_energy_cost() -> Result<()> {
        let config = small_config();
        let mut env = R4C3DiscreteEnv::new(config.clone(), &constant_series(32, 900))?;
        env.reset(0)?;
        // action n-1 maps to u_high = 0 kW; no energy term and weights[1]
        // only bites inside the comfort logic
        let snapshot = env.step(config.n_actions - 1)?;
        assert!(snapshot.reward <= 0.);
        let u_cost: f32 = -(config.weights[0] * 0.) as f32;
        assert!(snapshot.reward >= u_cost - (config.weights[1] * 100.) as f32);
        Ok(())
    }

    #[test]
    fn terminates_when_the_state_leaves_its_bounds() -> Result<()> {
        let mut config = small_config();
        config.x_high = [20.5, 80., 40.];
        // hot outdoor air and no cooling push T_ai past the 20.5 °C cap
        let mut env = R4C3DiscreteEnv::new(config.clone(), &constant_series(32, 900))?;
        env.reset(0)?;
        let mut terminated = false;
        for _ in 0..config.n_steps() {
            if env.step(config.n_actions - 1)?.terminated {
                terminated = true;
                break;
            }
        }
        assert!(terminated);
        Ok(())
    }

    #[test]
    fn rejects_misaligned_series() {
        let config = small_config();
        assert!(R4C3DiscreteEnv::new(config.clone(), &constant_series(32, 600)).is_err());
        // too short for the horizon plus the preview row
        assert!(R4C3DiscreteEnv::new(config, &constant_series(10, 900)).is_err());
    }

    #[test]
    fn description_matches_the_config() -> Result<()> {
        let config = small_config();
        let env = R4C3DiscreteEnv::new(config, &constant_series(32, 900))?;
        let description = env.env_description();
        assert_eq!(description.action_size(), 5);
        assert_eq!(description.observation_size(), OBSERVATION_SIZE);
        Ok(())
    }
}
