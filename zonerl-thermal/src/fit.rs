use crate::integrate::simulate_tensors;
use crate::state_space::state_space_tensors;
use candle_core::{Device, IndexOp, Result, Tensor, Var, bail};

/// Knobs of the descent loop. The defaults are the reference experiment:
/// 1000 epochs, learning rate 1e-5, gradients clipped to ±10, hourly steps.
#[derive(Debug, Clone)]
pub struct FitConfig {
    pub epochs: usize,
    pub learning_rate: f64,
    pub grad_clip: f64,
    pub dt: f64,
    pub report_every: usize,
}

impl Default for FitConfig {
    fn default() -> Self {
        Self {
            epochs: 1000,
            learning_rate: 1e-5,
            grad_clip: 10.,
            dt: 3600.,
            report_every: 100,
        }
    }
}

pub struct FitResult {
    /// [Cai, Cwe, Cwi, Re, Ri, Rw, Rg, Twe0, Twi0] after the last epoch.
    pub params: Vec<f64>,
    /// Mean-squared output error of the fitted parameters.
    pub loss: f64,
}

fn loss_for(p: &Var, y0: f64, d: &Tensor, y_true: &Tensor, config: &FitConfig) -> Result<Tensor> {
    let (a, b) = state_space_tensors(p.as_tensor())?;
    let x0 = Tensor::stack(
        &[
            Tensor::full(y0, (), p.device())?,
            p.as_tensor().i(7)?,
            p.as_tensor().i(8)?,
        ],
        0,
    )?
    .reshape((3, 1))?;
    let n_steps = y_true.dim(0)? - 1;
    let y_pred = simulate_tensors(&a, &b, &x0, d, n_steps, config.dt)?;
    y_pred.sub(y_true)?.sqr()?.mean_all()
}

/// Fits the seven physical coefficients and the two unobserved initial wall
/// temperatures to the measured output `y_true` by differentiating the Euler
/// rollout and descending with clipped, fixed-learning-rate steps. Fixed
/// epoch count, no convergence check, no early stopping.
pub fn fit(
    p0: &[f64; 9],
    d: &[Vec<f64>],
    y_true: &[f64],
    config: &FitConfig,
) -> Result<FitResult> {
    if y_true.len() < 2 {
        bail!("need at least two observed outputs, got {}", y_true.len());
    }
    let n_steps = y_true.len() - 1;
    if d.len() < n_steps {
        bail!("disturbance series has {} rows, horizon needs {}", d.len(), n_steps);
    }
    let device = Device::Cpu;
    let y0 = y_true[0];
    let mut d_flat = Vec::with_capacity(n_steps * 5);
    for row in d.iter().take(n_steps) {
        if row.len() < 5 {
            bail!("disturbance rows need 5 input channels, got {}", row.len());
        }
        d_flat.extend_from_slice(&row[..5]);
    }
    let d = Tensor::from_vec(d_flat, (n_steps, 5), &device)?;
    let y_true = Tensor::from_vec(y_true.to_vec(), y_true.len(), &device)?;
    let p = Var::from_tensor(&Tensor::from_vec(p0.to_vec(), 9, &device)?)?;

    for epoch in 0..config.epochs {
        let loss = loss_for(&p, y0, &d, &y_true, config)?;
        let grads = loss.backward()?;
        let grad = match grads.get(p.as_tensor()) {
            Some(grad) => grad.clamp(-config.grad_clip, config.grad_clip)?,
            None => bail!("no gradient reached the parameter vector"),
        };
        let updated = (p.as_tensor() - grad.affine(config.learning_rate, 0.)?)?;
        p.set(&updated)?;
        if config.report_every > 0 && epoch % config.report_every == 0 {
            println!("epoch: {:<5} loss: {:.6}", epoch, loss.to_scalar::<f64>()?);
        }
    }

    let loss = loss_for(&p, y0, &d, &y_true, config)?.to_scalar::<f64>()?;
    Ok(FitResult {
        params: p.as_tensor().to_vec1()?,
        loss,
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::integrate::{Euler, simulate};
    use crate::state_space::{RcParams, StateSpace};

    fn synthetic_observations(params: &[f64; 7], x0: [f64; 3], d: &[Vec<f64>]) -> Vec<f64> {
        let ss = StateSpace::from_params(&RcParams::from_slice(params));
        let n = d.len() as f64;
        let trajectory = simulate(&ss, &Euler, x0, 0., n * 0.1, 0.1, d).unwrap();
        trajectory.outputs(&ss)
    }

    #[test]
    fn descent_reduces_the_loss() -> Result<()> {
        let d: Vec<Vec<f64>> = (0..20)
            .map(|i| vec![5. + (i % 4) as f64, 1., 0., 0.5, 0.5])
            .collect();
        let y_true = synthetic_observations(&[1., 1., 1., 1., 1., 1., 1.], [0., 0.5, 0.5], &d);

        // start slightly off the generating parameters
        let p0 = [1.1, 1.1, 1.1, 1.1, 1.1, 1.1, 1.1, 0.6, 0.6];
        let config = FitConfig {
            epochs: 0,
            learning_rate: 1e-4,
            grad_clip: 10.,
            dt: 0.1,
            report_every: 0,
        };
        let initial = fit(&p0, &d, &y_true, &config)?.loss;
        let config = FitConfig {
            epochs: 200,
            ..config
        };
        let fitted = fit(&p0, &d, &y_true, &config)?;
        assert!(fitted.loss.is_finite());
        assert!(fitted.loss < initial);
        Ok(())
    }

    #[test]
    fn update_step_is_bounded_by_clip_times_rate() -> Result<()> {
        let d: Vec<Vec<f64>> = vec![vec![1000., 1000., 1000., 1000., 1000.]; 4];
        let y_true = vec![0., 0., 0., 0., 0.];
        let p0 = [1., 1., 1., 1., 1., 1., 1., 50., 50.];
        let config = FitConfig {
            epochs: 1,
            learning_rate: 0.1,
            grad_clip: 10.,
            dt: 0.1,
            report_every: 0,
        };
        let fitted = fit(&p0, &d, &y_true, &config)?;
        // huge raw gradients, but every component moves at most lr * clip
        for (before, after) in p0.iter().zip(&fitted.params) {
            assert!((after - before).abs() <= 0.1 * 10. + 1e-9);
        }
        Ok(())
    }

    #[test]
    fn rejects_degenerate_inputs() {
        let config = FitConfig::default();
        let p0 = [1.; 9];
        assert!(fit(&p0, &[], &[1.], &config).is_err());
        assert!(fit(&p0, &[], &[1., 2.], &config).is_err());
    }
}
