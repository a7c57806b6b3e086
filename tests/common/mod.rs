//! Shared fixtures: a recording channel, an in-memory store and a small
//! catalog.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use futures::stream;
use tokio::sync::RwLock;

use sales_funnel::catalog::{
    BankAccount, CatalogEntry, Category, ContentCatalog, NameMatcher, PaymentAssets,
    PaymentDetails, SegmentPricing, TextBlocks, WalletDetails,
};
use sales_funnel::channels::{Channel, IncomingMessage, MediaRef, MessageStream};
use sales_funnel::config::FunnelConfig;
use sales_funnel::error::{ChannelError, StoreError};
use sales_funnel::funnel::{Clock, ConversationState, EngineDeps, FunnelEngine};
use sales_funnel::store::StateStore;

/// What a successful send delivered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivered {
    Text(String),
    Media(PathBuf),
}

impl Delivered {
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Text(t) => Some(t),
            Self::Media(_) => None,
        }
    }
}

/// How an injected failure manifests.
#[derive(Debug, Clone, Copy)]
pub enum Fault {
    SendFailed,
    SessionLost,
}

/// Channel stub that records every successful send.
#[derive(Default)]
pub struct RecordingChannel {
    sent: Mutex<Vec<(String, Delivered)>>,
    attempts: AtomicUsize,
    /// Send attempt numbers (0-based, counted over the channel lifetime)
    /// that fail once.
    faults: Mutex<HashMap<usize, Fault>>,
    delay: Mutex<Duration>,
    /// Events yielded by `start`, in order.
    inbound: Mutex<Vec<IncomingMessage>>,
}

impl RecordingChannel {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Make the `n`th send from now (0-based) fail.
    pub fn fail_nth_from_now(&self, n: usize, fault: Fault) {
        let at = self.attempts.load(Ordering::SeqCst) + n;
        self.faults.lock().unwrap().insert(at, fault);
    }

    /// Queue an event for the stream returned by `start`.
    pub fn push_inbound(&self, message: IncomingMessage) {
        self.inbound.lock().unwrap().push(message);
    }

    /// Sleep this long inside every send.
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = delay;
    }

    pub fn sent(&self) -> Vec<(String, Delivered)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn delivered(&self) -> Vec<Delivered> {
        self.sent().into_iter().map(|(_, d)| d).collect()
    }

    pub fn texts(&self) -> Vec<String> {
        self.delivered()
            .into_iter()
            .filter_map(|d| d.text().map(str::to_string))
            .collect()
    }

    pub fn count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }

    pub fn clear(&self) {
        self.sent.lock().unwrap().clear();
    }

    async fn record(&self, reply_to: &str, item: Delivered) -> Result<(), ChannelError> {
        let delay = *self.delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
        if let Some(fault) = self.faults.lock().unwrap().remove(&attempt) {
            let name = "recording".to_string();
            let reason = format!("injected failure at send #{attempt}");
            return Err(match fault {
                Fault::SendFailed => ChannelError::SendFailed { name, reason },
                Fault::SessionLost => ChannelError::SessionLost { name, reason },
            });
        }

        self.sent.lock().unwrap().push((reply_to.to_string(), item));
        Ok(())
    }
}

#[async_trait]
impl Channel for RecordingChannel {
    fn name(&self) -> &str {
        "recording"
    }

    async fn start(&self) -> Result<MessageStream, ChannelError> {
        let inbound = std::mem::take(&mut *self.inbound.lock().unwrap());
        Ok(Box::pin(stream::iter(inbound)))
    }

    async fn send_text(&self, reply_to: &str, text: &str) -> Result<(), ChannelError> {
        self.record(reply_to, Delivered::Text(text.to_string())).await
    }

    async fn send_media(&self, reply_to: &str, media: &MediaRef) -> Result<(), ChannelError> {
        self.record(reply_to, Delivered::Media(media.path.clone())).await
    }

    async fn health_check(&self) -> Result<(), ChannelError> {
        Ok(())
    }

    async fn shutdown(&self) -> Result<(), ChannelError> {
        Ok(())
    }
}

/// `StateStore` kept in memory, for timer-driven tests.
#[derive(Default)]
pub struct MemoryStore {
    states: RwLock<BTreeMap<String, ConversationState>>,
}

#[async_trait]
impl StateStore for MemoryStore {
    async fn get(&self, user_id: &str) -> Option<ConversationState> {
        self.states.read().await.get(user_id).cloned()
    }

    async fn put(&self, state: ConversationState) -> Result<(), StoreError> {
        self.states.write().await.insert(state.user_id.clone(), state);
        Ok(())
    }

    async fn remove(&self, user_id: &str) -> Result<(), StoreError> {
        self.states.write().await.remove(user_id);
        Ok(())
    }

    async fn len(&self) -> usize {
        self.states.read().await.len()
    }
}

/// Clock frozen at a given instant.
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Wednesday 2024-06-05 10:00 in Lima.
pub fn office_hours() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 5, 15, 0, 0).unwrap()
}

/// Wednesday 2024-06-05 20:00 in Lima.
pub fn after_hours() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 6, 1, 0, 0).unwrap()
}

pub const LOCAL_USER: &str = "51987654321";
pub const FOREIGN_USER: &str = "5491122334455";

pub const GESTION: &str = "Gestión Pública";
pub const EDITION: &str = "Edición 5";

/// Fully populated course entry: its info burst is six actions.
pub fn gestion_entry() -> CatalogEntry {
    let mut entry = CatalogEntry::new(GESTION, EDITION);
    entry.personalized = Some("Te cuento sobre Gestión Pública".into());
    entry.benefits = Some("Beneficios del curso".into());
    entry.media.intro_video = Some(MediaRef::new("media/gestion/intro.mp4"));
    entry.media.image = Some(MediaRef::new("media/gestion/intro.jpg"));
    entry.media.brochure = Some(MediaRef::new("media/gestion/brochure.pdf"));
    entry.profile_responses[2] = Some("¡Genial que seas estudiante!".into());
    entry.student = SegmentPricing {
        cash: "500".into(),
        installment: "600".into(),
        list: "1,200".into(),
        reservation: "100".into(),
    };
    entry.standard = SegmentPricing {
        cash: "740".into(),
        installment: "900".into(),
        list: "1,850".into(),
        reservation: "150".into(),
    };
    entry
}

/// Program entry with a web checkout link.
pub fn diploma_entry() -> CatalogEntry {
    let mut entry = CatalogEntry::new("Diplomado en Finanzas", "2");
    entry.category = Category::Program;
    entry.media.image = Some(MediaRef::new("media/finanzas.png"));
    entry.checkout_link = Some("https://pagos.example/finanzas".into());
    entry.standard = SegmentPricing {
        cash: "1,000".into(),
        installment: "1,200".into(),
        list: "2,400".into(),
        reservation: "200".into(),
    };
    entry
}

pub fn catalog() -> ContentCatalog {
    let bank = |account: &str| BankAccount {
        bank: "BCP".into(),
        account: account.into(),
        cci: "00219300".into(),
        holder: "WE Foundation".into(),
    };
    ContentCatalog::new(
        vec![
            gestion_entry(),
            diploma_entry(),
            CatalogEntry::new("Contrataciones del Estado", "3"),
            CatalogEntry::new("Contrataciones del Estado", "4"),
        ],
        TextBlocks {
            greeting: Some("¡Hola! Gracias por escribirnos".into()),
            profile_prompt: Some("Indícame tu perfil (1-5)".into()),
            upsell: Some("Membresía PLUS".into()),
            call_to_action: Some("¿Deseas inscribirte? 1️⃣ Sí 3️⃣ Asesor".into()),
            promo_headline: None,
        },
        PaymentDetails {
            wallet: WalletDetails {
                number: "979 493 060".into(),
                holder: "WE Foundation".into(),
            },
            course_bank: bank("193-0001"),
            program_bank: bank("193-0002"),
        },
        PaymentAssets {
            wallet_qr_course: Some(MediaRef::new("media/pago/yapecursos.jpeg")),
            wallet_qr_program: Some(MediaRef::new("media/pago/yapeprog.jpeg")),
            checkout_video: Some(MediaRef::new("media/videos/WEB.mp4")),
            registration_image: Some(MediaRef::new("media/pago/webins.jpg")),
        },
    )
}

/// Engine wired to a recording channel.
pub struct Harness {
    pub engine: Arc<FunnelEngine>,
    pub channel: Arc<RecordingChannel>,
    pub store: Arc<dyn StateStore>,
    pub config: FunnelConfig,
}

impl Harness {
    pub fn new(store: Arc<dyn StateStore>, now: DateTime<Utc>) -> Self {
        let config = FunnelConfig::default();
        let channel = RecordingChannel::new();
        let engine = Arc::new(FunnelEngine::new(
            &config,
            EngineDeps {
                catalog: Arc::new(catalog()),
                matcher: Arc::new(NameMatcher),
                store: Arc::clone(&store),
                channel: channel.clone(),
                clock: Arc::new(FixedClock(now)),
            },
        ));
        Self {
            engine,
            channel,
            store,
            config,
        }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::default()), office_hours())
    }

    /// Deliver a direct message from `user_id` and handle it.
    pub async fn send(&self, user_id: &str, text: &str) -> sales_funnel::error::Result<()> {
        self.engine
            .handle(&IncomingMessage::new("recording", user_id, text))
            .await
    }

    pub async fn state(&self, user_id: &str) -> Option<ConversationState> {
        self.store.get(user_id).await
    }
}
