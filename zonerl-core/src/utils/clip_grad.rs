use candle_core::Result;
use candle_core::Tensor;
use candle_core::backprop::GradStore;
use candle_nn::VarMap;

/// Runs backward on `loss` and clamps every gradient component of the
/// varmap's variables to `[-clip, clip]`.
pub fn clip_grad_components(loss: &Tensor, varmap: &VarMap, clip: f64) -> Result<GradStore> {
    let mut grad_store = loss.backward()?;
    for var in varmap.all_vars() {
        let clipped = match grad_store.get_id(var.id()) {
            Some(grad) => grad.clamp(-clip, clip)?,
            None => continue,
        };
        grad_store.insert(var.as_tensor(), clipped);
    }
    Ok(grad_store)
}

#[cfg(test)]
mod test {
    use super::*;
    use candle_core::{DType, Device};
    use candle_nn::{Init, VarMap};

    #[test]
    fn bounds_every_component() -> Result<()> {
        let device = Device::Cpu;
        let varmap = VarMap::new();
        let w = varmap.get(4, "w", Init::Const(1.), DType::F32, &device)?;
        // dloss/dw = 1000 for every component
        let loss = w.affine(1000., 0.)?.sum_all()?;
        let grads = clip_grad_components(&loss, &varmap, 10.)?;
        let var = &varmap.all_vars()[0];
        let grad: Vec<f32> = grads.get_id(var.id()).unwrap().to_vec1()?;
        assert!(grad.iter().all(|g| g.abs() <= 10.));
        Ok(())
    }
}
