use crate::state_space::StateSpace;
use candle_core::{IndexOp, Result, Tensor, bail};

/// The single-step solver collaborator: advances the state by one step of
/// size `dt`, holding the disturbance row constant over the step.
pub trait Stepper {
    fn step(&self, ss: &StateSpace, x: [f64; 3], u: &[f64], dt: f64) -> [f64; 3];
}

/// Explicit forward Euler.
pub struct Euler;

impl Stepper for Euler {
    fn step(&self, ss: &StateSpace, x: [f64; 3], u: &[f64], dt: f64) -> [f64; 3] {
        let dx = ss.derivative(x, u);
        [x[0] + dt * dx[0], x[1] + dt * dx[1], x[2] + dt * dx[2]]
    }
}

/// Classic fourth-order Runge-Kutta.
pub struct Rk4;

impl Stepper for Rk4 {
    fn step(&self, ss: &StateSpace, x: [f64; 3], u: &[f64], dt: f64) -> [f64; 3] {
        let add = |x: [f64; 3], k: [f64; 3], scale: f64| {
            [x[0] + scale * k[0], x[1] + scale * k[1], x[2] + scale * k[2]]
        };
        let k1 = ss.derivative(x, u);
        let k2 = ss.derivative(add(x, k1, dt / 2.), u);
        let k3 = ss.derivative(add(x, k2, dt / 2.), u);
        let k4 = ss.derivative(add(x, k3, dt), u);
        let mut next = x;
        for i in 0..3 {
            next[i] += dt / 6. * (k1[i] + 2. * k2[i] + 2. * k3[i] + k4[i]);
        }
        next
    }
}

/// Time points and states of a fixed-step run; both grow by exactly one entry
/// per step taken.
pub struct Trajectory {
    pub times: Vec<f64>,
    pub states: Vec<[f64; 3]>,
}

impl Trajectory {
    pub fn outputs(&self, ss: &StateSpace) -> Vec<f64> {
        self.states.iter().map(|x| ss.output(*x)).collect()
    }
}

/// Fixed-step simulation over `[ts, te]`, substituting disturbance row `k` on
/// step `k`. The last step is clamped so the final time point lands exactly
/// on `te` and never exceeds it.
pub fn simulate<S: Stepper>(
    ss: &StateSpace,
    stepper: &S,
    x0: [f64; 3],
    ts: f64,
    te: f64,
    dt: f64,
    d: &[Vec<f64>],
) -> Result<Trajectory> {
    if dt <= 0. || te < ts {
        bail!("invalid horizon: ts {ts}, te {te}, dt {dt}");
    }
    // the tiny slack keeps float noise in `(te - ts) / dt` from adding a
    // zero-length step when the horizon divides evenly
    let n_steps = ((te - ts) / dt - 1e-9).ceil() as usize;
    if d.len() < n_steps {
        bail!(
            "disturbance series has {} rows, horizon needs {}",
            d.len(),
            n_steps
        );
    }
    let mut times = Vec::with_capacity(n_steps + 1);
    let mut states = Vec::with_capacity(n_steps + 1);
    let mut t = ts;
    let mut x = x0;
    times.push(t);
    states.push(x);
    for row in d.iter().take(n_steps) {
        let step = dt.min(te - t);
        x = stepper.step(ss, x, row, step);
        t = (t + step).min(te);
        times.push(t);
        states.push(x);
    }
    Ok(Trajectory { times, states })
}

/// Differentiable Euler rollout: returns the predicted output sequence
/// y_k = x_k[0] with `n_steps + 1` entries. `a` is `(3, 3)`, `b` is `(3, 5)`,
/// `x0` is `(3, 1)` and `d` holds one `(5,)` disturbance row per step.
pub fn simulate_tensors(
    a: &Tensor,
    b: &Tensor,
    x0: &Tensor,
    d: &Tensor,
    n_steps: usize,
    dt: f64,
) -> Result<Tensor> {
    if d.dim(0)? < n_steps {
        bail!(
            "disturbance tensor has {} rows, horizon needs {}",
            d.dim(0)?,
            n_steps
        );
    }
    let mut x = x0.clone();
    let mut outputs = vec![x.i((0, 0))?];
    for k in 0..n_steps {
        let u = d.i(k)?.reshape((5, 1))?;
        let dx = (a.matmul(&x)? + b.matmul(&u)?)?;
        x = (&x + dx.affine(dt, 0.)?)?;
        outputs.push(x.i((0, 0))?);
    }
    Tensor::stack(&outputs, 0)
}
