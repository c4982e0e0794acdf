#![allow(dead_code)]

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use deskrag_core::error::GenerationError;
use deskrag_core::traits::{Embedder, Generator, Prompt};
use deskrag_embed::HashEmbedder;
use deskrag_rag::prompt::REFUSAL;
use deskrag_rag::ServiceDesk;
use deskrag_vector::{IndexBuilder, IndexHandle};

/// Answers when the question and the context both mention a rule's topic,
/// refuses otherwise. Records every prompt it receives.
pub struct GroundedGenerator {
    rules: Vec<(&'static str, &'static str, &'static str)>,
    pub calls: AtomicUsize,
    pub prompts: Mutex<Vec<Prompt>>,
}

impl GroundedGenerator {
    pub fn new(rules: Vec<(&'static str, &'static str, &'static str)>) -> Self {
        Self { rules, calls: AtomicUsize::new(0), prompts: Mutex::new(Vec::new()) }
    }

    pub fn it_helpdesk() -> Self {
        Self::new(vec![
            ("vpn", "Client X", "Open Client X and sign in with your SSO credentials."),
            ("printer", "Printers", "Open Settings, choose Printers, and pick the floor printer."),
        ])
    }

    pub fn calls(&self) -> usize { self.calls.load(Ordering::SeqCst) }

    pub fn last_prompt(&self) -> Option<Prompt> { self.prompts.lock().unwrap().last().cloned() }
}

#[async_trait]
impl Generator for GroundedGenerator {
    fn name(&self) -> &str { "grounded-fake" }

    async fn generate(&self, prompt: &Prompt) -> Result<String, GenerationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.clone());
        let (context, question) = prompt.user.split_once("USER QUESTION:").unwrap_or((&prompt.user, ""));
        let question = question.to_lowercase();
        for (topic, evidence, reply) in &self.rules {
            if question.contains(topic) && context.contains(evidence) {
                return Ok(reply.to_string());
            }
        }
        Ok(REFUSAL.to_string())
    }
}

pub struct FailingGenerator {
    pub error: GenerationError,
    pub calls: AtomicUsize,
}

impl FailingGenerator {
    pub fn new(error: GenerationError) -> Self { Self { error, calls: AtomicUsize::new(0) } }
}

#[async_trait]
impl Generator for FailingGenerator {
    fn name(&self) -> &str { "failing-fake" }

    async fn generate(&self, _prompt: &Prompt) -> Result<String, GenerationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(self.error.clone())
    }
}

pub struct SlowGenerator(pub Duration);

#[async_trait]
impl Generator for SlowGenerator {
    fn name(&self) -> &str { "slow-fake" }

    async fn generate(&self, _prompt: &Prompt) -> Result<String, GenerationError> {
        tokio::time::sleep(self.0).await;
        Ok("too late".to_string())
    }
}

pub const VPN_KB: &[(&str, &str)] =
    &[("vpn.txt", "To connect to VPN, open Client X and enter your SSO credentials.")];

pub const HELPDESK_KB: &[(&str, &str)] = &[
    ("password.txt", "To reset your password, open the self-service portal and answer your security questions."),
    ("printer.txt", "To add a printer, open Settings, choose Printers, and pick the floor printer from the list."),
    ("vpn.txt", "To connect to VPN, open Client X and enter your SSO credentials."),
];

pub fn write_kb(dir: &Path, files: &[(&str, &str)]) {
    std::fs::create_dir_all(dir).unwrap();
    for (name, text) in files { std::fs::write(dir.join(name), text).unwrap(); }
}

pub fn embedder() -> Arc<dyn Embedder> {
    Arc::new(HashEmbedder::new(256))
}

/// Build (or load) the index for `files` under `root` with `embedder()`.
pub fn index_handle(root: &Path, files: &[(&str, &str)]) -> Arc<IndexHandle> {
    let kb = root.join("kb");
    write_kb(&kb, files);
    let index = IndexBuilder::new(embedder().as_ref()).load_or_build(&kb, &root.join("store.json")).unwrap();
    Arc::new(IndexHandle::new(index))
}

pub fn desk(root: &Path, files: &[(&str, &str)], generator: Arc<dyn Generator>) -> ServiceDesk {
    ServiceDesk::new(index_handle(root, files), embedder(), generator)
}

pub const GEMINI_OK: &str =
    r#"{"candidates": [{"content": {"role": "model", "parts": [{"text": "Open Client X."}]}, "finishReason": "STOP"}]}"#;

/// Local HTTP/1.1 server for the generation client. Each request gets the
/// next scripted `(status, body)`; the last one repeats. One request per
/// connection.
pub struct StubServer {
    pub endpoint: String,
    hits: Arc<AtomicUsize>,
    requests: Arc<Mutex<Vec<String>>>,
}

impl StubServer {
    pub async fn start(responses: Vec<(u16, &'static str)>) -> Self {
        Self::spawn(Some(responses)).await
    }

    /// Reads requests and never answers them.
    pub async fn hanging() -> Self {
        Self::spawn(None).await
    }

    async fn spawn(responses: Option<Vec<(u16, &'static str)>>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let endpoint = format!("http://{}", listener.local_addr().unwrap());
        let hits = Arc::new(AtomicUsize::new(0));
        let requests = Arc::new(Mutex::new(Vec::new()));
        let responses = Arc::new(responses);

        let (hits_in, requests_in) = (Arc::clone(&hits), Arc::clone(&requests));
        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let (hits, requests, responses) =
                    (Arc::clone(&hits_in), Arc::clone(&requests_in), Arc::clone(&responses));
                tokio::spawn(async move {
                    let request = read_request(&mut socket).await;
                    requests.lock().unwrap().push(request);
                    let n = hits.fetch_add(1, Ordering::SeqCst);
                    let Some(responses) = responses.as_deref() else {
                        tokio::time::sleep(Duration::from_secs(30)).await;
                        return;
                    };
                    let (code, body) = responses[n.min(responses.len() - 1)];
                    let response = format!(
                        "HTTP/1.1 {} Stub\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                        code,
                        body.len(),
                        body
                    );
                    let _ = socket.write_all(response.as_bytes()).await;
                    let _ = socket.shutdown().await;
                });
            }
        });
        Self { endpoint, hits, requests }
    }

    pub fn hits(&self) -> usize { self.hits.load(Ordering::SeqCst) }

    pub fn last_request(&self) -> Option<String> { self.requests.lock().unwrap().last().cloned() }
}

async fn read_request(socket: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let n = socket.read(&mut chunk).await.unwrap_or(0);
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            let head = String::from_utf8_lossy(&buf[..end]).to_lowercase();
            let body_len = head
                .lines()
                .find_map(|l| l.strip_prefix("content-length:"))
                .and_then(|v| v.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if buf.len() >= end + 4 + body_len {
                break;
            }
        }
    }
    String::from_utf8_lossy(&buf).into_owned()
}
