use candle_core::{DType, Device, Result};
use candle_nn::{AdamW, Optimizer, ParamsAdamW, VarBuilder, VarMap};
use zonerl_core::utils::build_sequential::build_sequential;

use super::{DqnAgent, QNetwork};

pub struct DqnAgentBuilder {
    pub device: Device,
    pub observation_size: usize,
    pub action_size: usize,
    pub hidden_layers: Vec<usize>,
    pub learning_rate: f64,
    pub grad_clip: Option<f64>,
}

impl Default for DqnAgentBuilder {
    fn default() -> Self {
        Self {
            device: Device::Cpu,
            observation_size: 0,
            action_size: 0,
            hidden_layers: vec![256, 256, 256],
            learning_rate: 1e-4,
            grad_clip: None,
        }
    }
}

impl DqnAgentBuilder {
    pub fn build(&self) -> Result<DqnAgent> {
        let layers = [&self.hidden_layers[..], &[self.action_size]].concat();
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &self.device);
        let q_net = QNetwork::new(build_sequential(self.observation_size, &layers, &vb, "q")?);
        // same layer names so the soft update can match variables pairwise
        let target_varmap = VarMap::new();
        let target_vb = VarBuilder::from_varmap(&target_varmap, DType::F32, &self.device);
        let target_net =
            QNetwork::new(build_sequential(self.observation_size, &layers, &target_vb, "q")?);
        let optimizer = AdamW::new(
            varmap.all_vars(),
            ParamsAdamW {
                lr: self.learning_rate,
                weight_decay: 0.,
                ..Default::default()
            },
        )?;
        DqnAgent::new(
            q_net,
            target_net,
            varmap,
            target_varmap,
            optimizer,
            self.grad_clip,
            self.device.clone(),
        )
    }
}
