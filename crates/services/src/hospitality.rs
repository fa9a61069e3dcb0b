use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::ServiceError;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BookingRequest {
    pub guest_name: String,
    pub service_type: String,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub party_size: u32,
    pub notes: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingConfirmation {
    pub confirmation_code: String,
    pub summary: String,
}

#[async_trait]
pub trait BookingService: Send + Sync {
    async fn create(&self, request: BookingRequest) -> Result<BookingConfirmation, ServiceError>;
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub item: String,
    pub quantity: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub room_number: String,
    pub lines: Vec<OrderLine>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderConfirmation {
    pub order_id: String,
    pub estimated_minutes: u32,
}

#[async_trait]
pub trait OrderingService: Send + Sync {
    async fn place_order(&self, order: Order) -> Result<OrderConfirmation, ServiceError>;
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PricedItem {
    pub name: String,
    pub unit_price: Decimal,
    pub quantity: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceBreakdown {
    pub subtotal: Decimal,
    pub tax: Decimal,
    pub service_charge: Decimal,
    pub total: Decimal,
}

#[async_trait]
pub trait PricingService: Send + Sync {
    async fn calculate(
        &self,
        items: Vec<PricedItem>,
        apply_tax: bool,
        apply_service_charge: bool,
    ) -> Result<PriceBreakdown, ServiceError>;
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Availability {
    pub available: bool,
    pub slots_remaining: u32,
}

#[async_trait]
pub trait AvailabilityService: Send + Sync {
    async fn check(
        &self,
        service_type: &str,
        date: NaiveDate,
        time: NaiveTime,
    ) -> Result<Availability, ServiceError>;
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceInfo {
    pub topic: String,
    pub details: String,
}

#[async_trait]
pub trait ServiceInfoLookup: Send + Sync {
    async fn lookup(&self, topic: &str) -> Result<ServiceInfo, ServiceError>;
}

#[async_trait]
pub trait ConfirmationService: Send + Sync {
    async fn send(
        &self,
        kind: &str,
        recipient: &str,
        subject: &str,
        content: &str,
    ) -> Result<(), ServiceError>;
}
