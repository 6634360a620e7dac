pub mod elevenlabs_tts_repository;
pub mod google_tts_repository;
pub mod minimax_tts_repository;
pub mod synthesis_repository;

pub use elevenlabs_tts_repository::ElevenLabsTtsRepository;
pub use google_tts_repository::GoogleTtsRepository;
pub use minimax_tts_repository::MinimaxTtsRepository;
pub use synthesis_repository::{SynthesisRepository, SynthesisRequest};

use crate::domain::voice::Provider;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Semaphore;

/// Maps a resolved provider to its configured client. Providers without
/// credentials are simply absent; a chunk that resolves to one fails at
/// dispatch with a clear message instead of at startup.
///
/// The registry also carries the one piece of state shared between
/// concurrent documents: a semaphore capping total in-flight provider
/// requests. Per-document concurrency alone would let a batch of N
/// documents open N times the intended number of connections.
pub struct ProviderRegistry {
    clients: HashMap<Provider, Arc<dyn SynthesisRepository>>,
    limiter: Arc<Semaphore>,
}

impl ProviderRegistry {
    pub fn new(max_in_flight: usize) -> Self {
        Self {
            clients: HashMap::new(),
            limiter: Arc::new(Semaphore::new(max_in_flight.max(1))),
        }
    }

    pub fn register(&mut self, provider: Provider, client: Arc<dyn SynthesisRepository>) {
        self.clients.insert(provider, client);
    }

    pub fn get(&self, provider: Provider) -> Option<Arc<dyn SynthesisRepository>> {
        self.clients.get(&provider).cloned()
    }

    /// Shared gate acquired around every provider call.
    pub fn limiter(&self) -> Arc<Semaphore> {
        self.limiter.clone()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}
