use anyhow::{anyhow, Result};
use candle_core::{Device, Tensor};
use tokenizers::Tokenizer;

/// Token ids and attention mask for `texts`, each `[batch, len]` where `len`
/// is the longest encoding in the batch capped at `max_len`.
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
    let len = encodings.iter().map(|e| e.get_ids().len().min(max_len)).max().unwrap_or(0).max(1);

    let mut ids = Vec::with_capacity(texts.len() * len);
    let mut mask = Vec::with_capacity(texts.len() * len);
    for enc in &encodings {
        let n = enc.get_ids().len().min(len);
        ids.extend_from_slice(&enc.get_ids()[..n]);
        mask.extend_from_slice(&enc.get_attention_mask()[..n]);
        ids.extend(std::iter::repeat(pad_id).take(len - n));
        mask.extend(std::iter::repeat(0u32).take(len - n));
    }
    let input_ids = Tensor::from_vec(ids, (encodings.len(), len), device)?;
    let attention_mask = Tensor::from_vec(mask, (encodings.len(), len), device)?;
    Ok((input_ids, attention_mask))
}

/// Token ids of one text, truncated to `max_len` while keeping the final
/// special token (the encoder's end-of-sequence marker) when there is one.
pub fn encode_truncated(tokenizer: &Tokenizer, text: &str, max_len: usize) -> Result<Vec<u32>> {
    let enc = tokenizer.encode(text, true).map_err(|e| anyhow!("Tokenization failed: {}", e))?;
    let mut ids = enc.get_ids().to_vec();
    if ids.len() > max_len && max_len > 0 {
        let last = enc.get_special_tokens_mask().last().copied() == Some(1);
        let tail = ids.last().copied();
        ids.truncate(max_len);
        if let (true, Some(tail)) = (last, tail) {
            ids[max_len - 1] = tail;
        }
    }
    Ok(ids)
}
