use anyhow::{ensure, Result};
use candle_core::{DType, IndexOp, Tensor};

/// Mean over unmasked tokens of `[B,T,H]` hidden states, then L2-normalised.
pub fn masked_mean_l2(hidden: &Tensor, attention_mask: &Tensor) -> Result<Tensor> {
    let dims = hidden.dims();
    ensure!(dims.len() == 3, "hidden shape must be [B,T,H], got {dims:?}");
    let hidden_dim = dims[2];

    let mask = attention_mask.to_device(hidden.device())?.to_dtype(hidden.dtype())?;
    let mask_3d = mask.unsqueeze(2)?;
    let mask_broadcast = match mask_3d.broadcast_as(hidden.shape()) {
        Ok(m) => m,
        Err(_) => mask_3d.repeat((1, 1, hidden_dim))?,
    };
    let masked = (hidden * &mask_broadcast)?;
    let sum = masked.sum(1)?;
    let lengths = mask.sum(1)?.unsqueeze(1)?.to_dtype(sum.dtype())?;
    let mean = sum.broadcast_div(&lengths)?;
    l2_normalize(&mean)
}

/// First-token (CLS) hidden state of `[B,T,H]`, L2-normalised. BGE-M3 dense
/// vectors are defined this way.
pub fn cls_l2(hidden: &Tensor) -> Result<Tensor> {
    let dims = hidden.dims();
    ensure!(dims.len() == 3 && dims[1] > 0, "hidden shape must be [B,T,H] with T > 0, got {dims:?}");
    let cls = hidden.i((.., 0, ..))?.contiguous()?;
    l2_normalize(&cls)
}

pub fn l2_normalize(rows: &Tensor) -> Result<Tensor> {
    let eps_val = match rows.dtype() { DType::F16 => 1e-6f32, _ => 1e-12f32 };
    let eps = Tensor::new(&[eps_val], rows.device())?.to_dtype(rows.dtype())?.unsqueeze(0)?;
    let norm = rows.sqr()?.sum_keepdim(1)?.sqrt()?.broadcast_add(&eps)?;
    Ok(rows.broadcast_div(&norm)?)
}
