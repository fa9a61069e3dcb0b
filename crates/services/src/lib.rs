//! Concierge Services - collaborator contracts and reference fakes
//!
//! Every external system the engine talks to is specified here as an
//! `async_trait` contract: knowledge retrieval, the semantic memory store,
//! the front-desk business services (booking, ordering, pricing,
//! availability, confirmations), the human-authorization service, and the
//! hosting layer's thread store. Real implementations live outside this
//! workspace; the in-memory versions here back tests and demos.

use thiserror::Error;

pub mod authorization;
pub mod hospitality;
pub mod in_memory;
pub mod knowledge;
pub mod memory_store;
pub mod threads;

pub use authorization::{AuthorizationService, AuthorizationTicket};
pub use hospitality::{
    Availability, AvailabilityService, BookingConfirmation, BookingRequest, BookingService,
    ConfirmationService, Order, OrderConfirmation, OrderLine, OrderingService, PriceBreakdown,
    PricedItem, PricingService, ServiceInfo, ServiceInfoLookup,
};
pub use in_memory::{
    AuthorizationScript, FailingMemoryStore, FrontDesk, InMemoryMemoryStore, InMemoryThreadStore,
    ScriptedAuthorizationService, SentConfirmation, StaticKnowledgeBase,
};
pub use knowledge::{KnowledgeAnswer, KnowledgeRetrieval, KnowledgeSource};
pub use memory_store::MemoryStore;
pub use threads::ThreadStore;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ServiceError {
    #[error("service unavailable: {0}")]
    Unavailable(String),
    #[error("request rejected: {0}")]
    Rejected(String),
}
