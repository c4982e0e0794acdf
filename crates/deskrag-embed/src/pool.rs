use anyhow::Result;
use candle_core::Tensor;

/// Mean of the token states selected by `attention_mask`.
///
/// `hidden` is `[B, T, H]`, `attention_mask` is `[B, T]` with 1 for real
/// tokens and 0 for padding. Returns `[B, H]`.
pub fn masked_mean(hidden: &Tensor, attention_mask: &Tensor) -> Result<Tensor> {
    let (batch, time, _hidden_dim) = hidden.dims3()?;
    anyhow::ensure!(
        attention_mask.dims() == [batch, time],
        "attention mask shape {:?} does not match hidden states [{batch}, {time}, _]",
        attention_mask.dims()
    );
    let mask = attention_mask.to_device(hidden.device())?.to_dtype(hidden.dtype())?.unsqueeze(2)?;
    let summed = hidden.broadcast_mul(&mask)?.sum(1)?;
    let counts = (mask.sum(1)? + 1e-9)?;
    Ok(summed.broadcast_div(&counts)?)
}

/// Scale each row of a `[B, H]` tensor to unit L2 norm.
pub fn l2_normalize(rows: &Tensor) -> Result<Tensor> {
    let norm = (rows.sqr()?.sum_keepdim(1)?.sqrt()? + 1e-12)?;
    Ok(rows.broadcast_div(&norm)?)
}

/// Sentence-transformer pooling: masked mean followed by L2 normalisation.
pub fn masked_mean_l2(hidden: &Tensor, attention_mask: &Tensor) -> Result<Tensor> {
    l2_normalize(&masked_mean(hidden, attention_mask)?)
}
