use candle_core::{IndexOp, Result, Tensor};

/// Physical coefficients of the 4R3C zone model: thermal capacitances of the
/// indoor air, external wall and internal wall, and the four resistances
/// between them (envelope, interior, wall, glazing).
#[derive(Debug, Clone, Copy)]
pub struct RcParams {
    pub c_ai: f64,
    pub c_we: f64,
    pub c_wi: f64,
    pub r_e: f64,
    pub r_i: f64,
    pub r_w: f64,
    pub r_g: f64,
}

impl RcParams {
    /// Coefficients from the calibrated summer experiment.
    pub fn calibrated() -> Self {
        Self {
            c_ai: 6.9789902e3,
            c_we: 2.1591113e4,
            c_wi: 1.8807944e5,
            r_e: 3.4490612,
            r_i: 4.9556872e-1,
            r_w: 9.8289281e-2,
            r_g: 4.6257420,
        }
    }

    pub fn from_slice(p: &[f64; 7]) -> Self {
        Self {
            c_ai: p[0],
            c_we: p[1],
            c_wi: p[2],
            r_e: p[3],
            r_i: p[4],
            r_w: p[5],
            r_g: p[6],
        }
    }
}

/// Continuous-time linear model `x' = Ax + Bu`, `y = Cx + Du` with states
/// x = [T_ai, T_we, T_wi], inputs u = [T_ao, q_conv_i, q_hvac, q_rad_e,
/// q_rad_i] and output y = T_ai. The feed-through term D is fixed at zero.
#[derive(Debug, Clone)]
pub struct StateSpace {
    pub a: [[f64; 3]; 3],
    pub b: [[f64; 5]; 3],
    pub c: [f64; 3],
    pub d: f64,
}

impl StateSpace {
    /// Deterministic assembly of the four matrices from the physical
    /// coefficients. Pure; non-positive coefficients are not validated.
    pub fn from_params(p: &RcParams) -> Self {
        let mut a = [[0.; 3]; 3];
        let mut b = [[0.; 5]; 3];
        a[0][0] = -1. / p.c_ai * (1. / p.r_g + 1. / p.r_i);
        a[0][2] = 1. / (p.c_ai * p.r_i);
        a[1][1] = -1. / p.c_we * (1. / p.r_e + 1. / p.r_w);
        a[1][2] = 1. / (p.c_we * p.r_w);
        a[2][0] = 1. / (p.c_wi * p.r_i);
        a[2][1] = 1. / (p.c_wi * p.r_w);
        a[2][2] = -1. / p.c_wi * (1. / p.r_w + 1. / p.r_i);
        b[0][0] = 1. / (p.c_ai * p.r_g);
        b[0][1] = 1. / p.c_ai;
        b[0][2] = 1. / p.c_ai;
        b[1][0] = 1. / (p.c_we * p.r_e);
        b[1][3] = 1. / p.c_we;
        b[2][4] = 1. / p.c_wi;
        Self {
            a,
            b,
            c: [1., 0., 0.],
            d: 0.,
        }
    }

    /// `x' = Ax + Bu` for one state and one input row.
    pub fn derivative(&self, x: [f64; 3], u: &[f64]) -> [f64; 3] {
        let mut dx = [0.; 3];
        for (i, dxi) in dx.iter_mut().enumerate() {
            let mut value = 0.;
            for j in 0..3 {
                value += self.a[i][j] * x[j];
            }
            for (j, uj) in u.iter().enumerate().take(5) {
                value += self.b[i][j] * uj;
            }
            *dxi = value;
        }
        dx
    }

    pub fn output(&self, x: [f64; 3]) -> f64 {
        self.c[0] * x[0] + self.c[1] * x[1] + self.c[2] * x[2]
    }
}

/// Differentiable twin of [`StateSpace::from_params`]: assembles A `(3, 3)`
/// and B `(3, 5)` from the first seven entries of the parameter tensor
/// [Cai, Cwe, Cwi, Re, Ri, Rw, Rg, ..] so gradients flow back to `p`.
pub fn state_space_tensors(p: &Tensor) -> Result<(Tensor, Tensor)> {
    let c_ai = p.i(0)?;
    let c_we = p.i(1)?;
    let c_wi = p.i(2)?;
    let r_e = p.i(3)?;
    let r_i = p.i(4)?;
    let r_w = p.i(5)?;
    let r_g = p.i(6)?;
    let zero = Tensor::zeros((), p.dtype(), p.device())?;

    let a00 = ((r_g.recip()? + r_i.recip()?)? / &c_ai)?.neg()?;
    let a02 = (&c_ai * &r_i)?.recip()?;
    let a11 = ((r_e.recip()? + r_w.recip()?)? / &c_we)?.neg()?;
    let a12 = (&c_we * &r_w)?.recip()?;
    let a20 = (&c_wi * &r_i)?.recip()?;
    let a21 = (&c_wi * &r_w)?.recip()?;
    let a22 = ((r_w.recip()? + r_i.recip()?)? / &c_wi)?.neg()?;
    let a = Tensor::stack(
        &[
            a00,
            zero.clone(),
            a02,
            zero.clone(),
            a11,
            a12,
            a20,
            a21,
            a22,
        ],
        0,
    )?
    .reshape((3, 3))?;

    let b00 = (&c_ai * &r_g)?.recip()?;
    let b01 = c_ai.recip()?;
    let b02 = c_ai.recip()?;
    let b10 = (&c_we * &r_e)?.recip()?;
    let b13 = c_we.recip()?;
    let b24 = c_wi.recip()?;
    let b = Tensor::stack(
        &[
            b00,
            b01,
            b02,
            zero.clone(),
            zero.clone(),
            b10,
            zero.clone(),
            zero.clone(),
            b13,
            zero.clone(),
            zero.clone(),
            zero.clone(),
            zero.clone(),
            zero.clone(),
            b24,
        ],
        0,
    )?
    .reshape((3, 5))?;
    Ok((a, b))
}
