use anyhow::{anyhow, Result};
use candle_core::{Device, Tensor};
use tokenizers::Tokenizer;

/// Tokenize a batch and right-pad to the longest sequence (capped at `max_len`).
///
/// Returns `(input_ids, attention_mask)`, both `[B, T]` `u32` tensors.
pub fn tokenize_batch(
    tokenizer: &Tokenizer,
    texts: &[String],
    max_len: usize,
    pad_id: u32,
    device: &Device,
) -> Result<(Tensor, Tensor)> {
    let encodings = tokenizer
        .encode_batch(texts.to_vec(), true)
        .map_err(|e| anyhow!("Tokenization failed: {}", e))?;

    let width = encodings.iter().map(|e| e.get_ids().len().min(max_len)).max().unwrap_or(0).max(1);
    let mut ids = Vec::with_capacity(encodings.len() * width);
    let mut mask = Vec::with_capacity(encodings.len() * width);
    for enc in &encodings {
        let len = enc.get_ids().len().min(max_len);
        ids.extend_from_slice(&enc.get_ids()[..len]);
        mask.extend_from_slice(&enc.get_attention_mask()[..len]);
        ids.extend(std::iter::repeat(pad_id).take(width - len));
        mask.extend(std::iter::repeat(0u32).take(width - len));
    }

    let input_ids = Tensor::from_vec(ids, (encodings.len(), width), device)?;
    let attention_mask = Tensor::from_vec(mask, (encodings.len(), width), device)?;
    Ok((input_ids, attention_mask))
}
