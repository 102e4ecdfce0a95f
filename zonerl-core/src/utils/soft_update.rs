use candle_core::Result;
use candle_nn::VarMap;

/// Blends the online parameters into the target parameters: for every shared
/// variable name, `target <- tau * online + (1 - tau) * target`. `tau = 1.0`
/// is the hard copy used when a target network is first initialized.
pub fn soft_update(online: &VarMap, target: &VarMap, tau: f64) -> Result<()> {
    let online_vars = online.data().lock().unwrap();
    let target_vars = target.data().lock().unwrap();
    for (name, online_var) in online_vars.iter() {
        let target_var = match target_vars.get(name) {
            Some(var) => var,
            None => continue,
        };
        let blended = (online_var.as_tensor().affine(tau, 0.)?
            + target_var.as_tensor().affine(1. - tau, 0.)?)?;
        target_var.set(&blended)?;
    }
    Ok(())
}
