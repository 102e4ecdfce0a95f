use candle_core::Result;
use candle_nn::{Activation, Sequential, VarBuilder, linear, seq};

/// Stacks `Linear` layers with ReLU between them; the final layer is left
/// without an activation.
pub fn build_sequential(
    input_dim: usize,
    layers: &[usize],
    vb: &VarBuilder,
    prefix: &str,
) -> Result<Sequential> {
    let mut last_dim = input_dim;
    let mut nn = seq();
    let num_layers = layers.len();
    for (layer_idx, layer_size) in layers.iter().enumerate() {
        let layer_pp = format!("{prefix}{layer_idx}");
        nn = nn.add(linear(last_dim, *layer_size, vb.pp(layer_pp))?);
        if layer_idx != num_layers - 1 {
            nn = nn.add(Activation::Relu);
        }
        last_dim = *layer_size;
    }
    Ok(nn)
}
