#![allow(dead_code)]

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use deskrag_core::traits::Embedder;
use deskrag_embed::HashEmbedder;

/// Hash embedder under a chosen model name that counts embedded texts.
pub struct CountingEmbedder {
    inner: HashEmbedder,
    name: String,
    pub calls: AtomicUsize,
}

impl CountingEmbedder {
    pub fn new(name: &str) -> Self {
        Self { inner: HashEmbedder::new(256), name: name.to_string(), calls: AtomicUsize::new(0) }
    }

    pub fn calls(&self) -> usize { self.calls.load(Ordering::SeqCst) }
}

impl Embedder for CountingEmbedder {
    fn model_name(&self) -> &str { &self.name }
    fn dim(&self) -> usize { self.inner.dim() }
    fn max_len(&self) -> usize { self.inner.max_len() }
    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        self.calls.fetch_add(texts.len(), Ordering::SeqCst);
        self.inner.embed_batch(texts)
    }
}

/// Emits a NaN component for any text mentioning "broken".
pub struct NanEmbedder;

impl Embedder for NanEmbedder {
    fn model_name(&self) -> &str { "nan-embedder" }
    fn dim(&self) -> usize { 2 }
    fn max_len(&self) -> usize { usize::MAX }
    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| if t.contains("broken") { vec![f32::NAN, 1.0] } else { vec![1.0, 0.0] }).collect())
    }
}

pub const KB: &[(&str, &str)] = &[
    ("password.txt", "To reset your password, open the self-service portal and answer your security questions."),
    ("printer.txt", "To add a printer, open Settings, choose Printers, and pick the floor printer from the list."),
    ("vpn.txt", "To connect to VPN, open Client X and enter your SSO credentials."),
    ("wifi.txt", "The guest wifi network is CorpGuest and the password rotates every Monday."),
];

pub fn write_kb(dir: &Path, files: &[(&str, &str)]) {
    std::fs::create_dir_all(dir).unwrap();
    for (name, text) in files { std::fs::write(dir.join(name), text).unwrap(); }
}
