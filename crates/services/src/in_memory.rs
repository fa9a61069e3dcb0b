//! Reference in-memory collaborators for tests and demos. Deterministic on
//! purpose: confirmation codes and request ids are sequential, pricing
//! rates are fixed, and scripted authorization resolves the same way on
//! every run.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use tokio::sync::RwLock;

use concierge_core::domain::authorization::AuthorizationStatus;
use concierge_core::domain::memory::MemoryRecord;
use concierge_core::domain::turn::ConversationTurn;

use crate::authorization::{AuthorizationService, AuthorizationTicket};
use crate::hospitality::{
    Availability, AvailabilityService, BookingConfirmation, BookingRequest, BookingService,
    ConfirmationService, Order, OrderConfirmation, OrderingService, PriceBreakdown, PricedItem,
    PricingService, ServiceInfo, ServiceInfoLookup,
};
use crate::knowledge::{KnowledgeAnswer, KnowledgeRetrieval, KnowledgeSource};
use crate::memory_store::MemoryStore;
use crate::threads::ThreadStore;
use crate::ServiceError;

/// Keyword-matched knowledge base over a fixed corpus.
#[derive(Debug, Default)]
pub struct StaticKnowledgeBase {
    entries: Vec<KnowledgeEntry>,
}

#[derive(Clone, Debug)]
struct KnowledgeEntry {
    property_id: String,
    keywords: Vec<String>,
    answer: String,
    source_title: String,
}

impl StaticKnowledgeBase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry(
        mut self,
        property_id: impl Into<String>,
        keywords: &[&str],
        answer: impl Into<String>,
        source_title: impl Into<String>,
    ) -> Self {
        self.entries.push(KnowledgeEntry {
            property_id: property_id.into(),
            keywords: keywords.iter().map(|k| k.to_ascii_lowercase()).collect(),
            answer: answer.into(),
            source_title: source_title.into(),
        });
        self
    }
}

#[async_trait]
impl KnowledgeRetrieval for StaticKnowledgeBase {
    async fn answer(
        &self,
        question: &str,
        property_id: &str,
    ) -> Result<KnowledgeAnswer, ServiceError> {
        let normalized = question.to_ascii_lowercase();
        let mut best: Option<(usize, &KnowledgeEntry)> = None;

        for entry in self.entries.iter().filter(|e| e.property_id == property_id) {
            let hits = entry.keywords.iter().filter(|k| normalized.contains(k.as_str())).count();
            if hits > 0 && best.map_or(true, |(best_hits, _)| hits > best_hits) {
                best = Some((hits, entry));
            }
        }

        match best {
            Some((hits, entry)) => Ok(KnowledgeAnswer {
                answer_text: entry.answer.clone(),
                sources: vec![KnowledgeSource {
                    title: entry.source_title.clone(),
                    score: (0.5 + 0.1 * hits as f32).min(0.95),
                }],
            }),
            None => Ok(KnowledgeAnswer {
                answer_text:
                    "I couldn't find that in our property guide, but the front desk can help."
                        .to_string(),
                sources: Vec::new(),
            }),
        }
    }
}

#[derive(Default)]
pub struct InMemoryMemoryStore {
    records: RwLock<HashMap<String, Vec<MemoryRecord>>>,
}

impl InMemoryMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn records_in(&self, namespace: &str) -> Vec<MemoryRecord> {
        let records = self.records.read().await;
        records.get(namespace).cloned().unwrap_or_default()
    }
}

#[async_trait]
impl MemoryStore for InMemoryMemoryStore {
    async fn search(
        &self,
        namespace: &str,
        query: &str,
    ) -> Result<Vec<MemoryRecord>, ServiceError> {
        let normalized = query.to_ascii_lowercase();
        let query_tokens: Vec<&str> = normalized.split_whitespace().collect();
        let records = self.records.read().await;
        let candidates = records.get(namespace).cloned().unwrap_or_default();

        if query_tokens.is_empty() {
            return Ok(candidates);
        }

        Ok(candidates
            .into_iter()
            .filter(|record| {
                let text = record.text.to_ascii_lowercase();
                query_tokens.iter().any(|token| text.contains(token))
            })
            .collect())
    }

    async fn put(&self, namespace: &str, id: &str, text: &str) -> Result<(), ServiceError> {
        let mut records = self.records.write().await;
        records.entry(namespace.to_string()).or_default().push(MemoryRecord {
            id: id.to_string(),
            owner_namespace: namespace.to_string(),
            text: text.to_string(),
            created_at: Utc::now(),
        });
        Ok(())
    }
}

/// A memory store whose every call fails; exercises the degrade-to-empty
/// policy in the adapter.
#[derive(Clone, Debug, Default)]
pub struct FailingMemoryStore;

#[async_trait]
impl MemoryStore for FailingMemoryStore {
    async fn search(&self, _: &str, _: &str) -> Result<Vec<MemoryRecord>, ServiceError> {
        Err(ServiceError::Unavailable("memory store offline".to_string()))
    }

    async fn put(&self, _: &str, _: &str, _: &str) -> Result<(), ServiceError> {
        Err(ServiceError::Unavailable("memory store offline".to_string()))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SentConfirmation {
    pub kind: String,
    pub recipient: String,
    pub subject: String,
    pub content: String,
}

#[derive(Default)]
struct FrontDeskState {
    bookings: Vec<BookingRequest>,
    orders: Vec<Order>,
    confirmations: Vec<SentConfirmation>,
    closed_services: Vec<String>,
    service_info: HashMap<String, String>,
}

/// One stand-in for the whole suite of front-desk business collaborators.
/// Behavior is deliberately mechanical: sequential confirmation codes,
/// fixed tax and service-charge rates, four open slots unless a service
/// was closed via `close_service`.
#[derive(Default)]
pub struct FrontDesk {
    state: RwLock<FrontDeskState>,
    sequence: AtomicU64,
}

impl FrontDesk {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn close_service(&self, service_type: &str) {
        let mut state = self.state.write().await;
        state.closed_services.push(service_type.to_ascii_lowercase());
    }

    pub async fn add_service_info(&self, topic: &str, details: &str) {
        let mut state = self.state.write().await;
        state.service_info.insert(topic.to_ascii_lowercase(), details.to_string());
    }

    pub async fn bookings(&self) -> Vec<BookingRequest> {
        self.state.read().await.bookings.clone()
    }

    pub async fn orders(&self) -> Vec<Order> {
        self.state.read().await.orders.clone()
    }

    pub async fn sent_confirmations(&self) -> Vec<SentConfirmation> {
        self.state.read().await.confirmations.clone()
    }

    fn next_sequence(&self) -> u64 {
        self.sequence.fetch_add(1, Ordering::SeqCst) + 1
    }
}

#[async_trait]
impl BookingService for FrontDesk {
    async fn create(&self, request: BookingRequest) -> Result<BookingConfirmation, ServiceError> {
        {
            let state = self.state.read().await;
            if state.closed_services.contains(&request.service_type.to_ascii_lowercase()) {
                return Err(ServiceError::Rejected(format!(
                    "{} is fully booked",
                    request.service_type
                )));
            }
        }

        let code = format!("BK-{:04}", self.next_sequence());
        let summary = format!(
            "{} for {} on {} at {}",
            request.service_type, request.party_size, request.date, request.time
        );
        let mut state = self.state.write().await;
        state.bookings.push(request);
        Ok(BookingConfirmation { confirmation_code: code, summary })
    }
}

#[async_trait]
impl OrderingService for FrontDesk {
    async fn place_order(&self, order: Order) -> Result<OrderConfirmation, ServiceError> {
        if order.lines.is_empty() {
            return Err(ServiceError::Rejected("order has no items".to_string()));
        }
        let order_id = format!("ORD-{:04}", self.next_sequence());
        let mut state = self.state.write().await;
        state.orders.push(order);
        Ok(OrderConfirmation { order_id, estimated_minutes: 30 })
    }
}

#[async_trait]
impl PricingService for FrontDesk {
    async fn calculate(
        &self,
        items: Vec<PricedItem>,
        apply_tax: bool,
        apply_service_charge: bool,
    ) -> Result<PriceBreakdown, ServiceError> {
        let subtotal: Decimal =
            items.iter().map(|item| item.unit_price * Decimal::from(item.quantity)).sum();
        let tax = if apply_tax { subtotal * Decimal::new(10, 2) } else { Decimal::ZERO };
        let service_charge =
            if apply_service_charge { subtotal * Decimal::new(125, 3) } else { Decimal::ZERO };
        Ok(PriceBreakdown { subtotal, tax, service_charge, total: subtotal + tax + service_charge })
    }
}

#[async_trait]
impl AvailabilityService for FrontDesk {
    async fn check(
        &self,
        service_type: &str,
        _date: NaiveDate,
        _time: NaiveTime,
    ) -> Result<Availability, ServiceError> {
        let state = self.state.read().await;
        if state.closed_services.contains(&service_type.to_ascii_lowercase()) {
            return Ok(Availability { available: false, slots_remaining: 0 });
        }
        Ok(Availability { available: true, slots_remaining: 4 })
    }
}

#[async_trait]
impl ServiceInfoLookup for FrontDesk {
    async fn lookup(&self, topic: &str) -> Result<ServiceInfo, ServiceError> {
        let state = self.state.read().await;
        match state.service_info.get(&topic.to_ascii_lowercase()) {
            Some(details) => {
                Ok(ServiceInfo { topic: topic.to_string(), details: details.clone() })
            }
            None => Err(ServiceError::Rejected(format!("no service info for `{topic}`"))),
        }
    }
}

#[async_trait]
impl ConfirmationService for FrontDesk {
    async fn send(
        &self,
        kind: &str,
        recipient: &str,
        subject: &str,
        content: &str,
    ) -> Result<(), ServiceError> {
        let mut state = self.state.write().await;
        state.confirmations.push(SentConfirmation {
            kind: kind.to_string(),
            recipient: recipient.to_string(),
            subject: subject.to_string(),
            content: content.to_string(),
        });
        Ok(())
    }
}

/// How the scripted authorization service answers consent requests.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AuthorizationScript {
    /// Completed immediately, no URL.
    ApproveImmediately,
    /// Pending with a URL; completes after this many polls.
    PendingThenComplete { polls: u32 },
    /// Pending with a URL; every poll stays pending (forces the timeout).
    PendingForever,
    /// Pending with a URL; the first poll reports failure.
    PendingThenFail,
}

struct ScriptedRequest {
    script: AuthorizationScript,
    polls_seen: u32,
}

#[derive(Default)]
pub struct ScriptedAuthorizationService {
    scripts: RwLock<HashMap<String, AuthorizationScript>>,
    requests: RwLock<HashMap<String, ScriptedRequest>>,
    sequence: AtomicU64,
}

impl ScriptedAuthorizationService {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn script_tool(&self, tool_name: &str, script: AuthorizationScript) {
        let mut scripts = self.scripts.write().await;
        scripts.insert(tool_name.to_string(), script);
    }
}

#[async_trait]
impl AuthorizationService for ScriptedAuthorizationService {
    async fn request_authorization(
        &self,
        tool_name: &str,
        _user_id: &str,
    ) -> Result<AuthorizationTicket, ServiceError> {
        let script = {
            let scripts = self.scripts.read().await;
            scripts.get(tool_name).copied().unwrap_or(AuthorizationScript::ApproveImmediately)
        };

        let request_id = format!("auth-{:04}", self.sequence.fetch_add(1, Ordering::SeqCst) + 1);

        if script == AuthorizationScript::ApproveImmediately {
            return Ok(AuthorizationTicket {
                request_id,
                status: AuthorizationStatus::Completed,
                authorization_url: None,
            });
        }

        let url = format!("https://consent.example/{request_id}");
        let mut requests = self.requests.write().await;
        requests.insert(request_id.clone(), ScriptedRequest { script, polls_seen: 0 });
        Ok(AuthorizationTicket {
            request_id,
            status: AuthorizationStatus::Pending,
            authorization_url: Some(url),
        })
    }

    async fn poll(&self, request_id: &str) -> Result<AuthorizationStatus, ServiceError> {
        let mut requests = self.requests.write().await;
        let request = requests
            .get_mut(request_id)
            .ok_or_else(|| ServiceError::Rejected(format!("unknown request `{request_id}`")))?;
        request.polls_seen += 1;

        Ok(match request.script {
            AuthorizationScript::ApproveImmediately => AuthorizationStatus::Completed,
            AuthorizationScript::PendingThenComplete { polls } => {
                if request.polls_seen >= polls {
                    AuthorizationStatus::Completed
                } else {
                    AuthorizationStatus::Pending
                }
            }
            AuthorizationScript::PendingForever => AuthorizationStatus::Pending,
            AuthorizationScript::PendingThenFail => AuthorizationStatus::Failed,
        })
    }
}

#[derive(Default)]
pub struct InMemoryThreadStore {
    threads: RwLock<HashMap<String, Vec<ConversationTurn>>>,
}

impl InMemoryThreadStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ThreadStore for InMemoryThreadStore {
    async fn load(&self, session_id: &str) -> Result<Option<Vec<ConversationTurn>>, ServiceError> {
        let threads = self.threads.read().await;
        Ok(threads.get(session_id).cloned())
    }

    async fn save(
        &self,
        session_id: &str,
        turns: Vec<ConversationTurn>,
    ) -> Result<(), ServiceError> {
        let mut threads = self.threads.write().await;
        threads.insert(session_id.to_string(), turns);
        Ok(())
    }
}
