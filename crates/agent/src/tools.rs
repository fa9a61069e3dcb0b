use std::collections::HashMap;
use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use concierge_core::domain::turn::{ProposedToolCall, ToolCallResult};
use concierge_services::hospitality::{
    AvailabilityService, BookingRequest, BookingService, ConfirmationService, Order, OrderLine,
    OrderingService, PricedItem, PricingService, ServiceInfoLookup,
};

/// Closed set of tools the model may propose. Anything outside this union
/// fails per call at execution time; there is no runtime registration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ToolName {
    CreateBooking,
    PlaceOrder,
    CalculatePrice,
    CheckAvailability,
    LookupServiceInfo,
    SendConfirmation,
}

impl ToolName {
    pub fn from_wire(name: &str) -> Option<Self> {
        match name {
            "create_booking" => Some(Self::CreateBooking),
            "place_order" => Some(Self::PlaceOrder),
            "calculate_price" => Some(Self::CalculatePrice),
            "check_availability" => Some(Self::CheckAvailability),
            "lookup_service_info" => Some(Self::LookupServiceInfo),
            "send_confirmation" => Some(Self::SendConfirmation),
            _ => None,
        }
    }

    pub fn as_wire(&self) -> &'static str {
        match self {
            Self::CreateBooking => "create_booking",
            Self::PlaceOrder => "place_order",
            Self::CalculatePrice => "calculate_price",
            Self::CheckAvailability => "check_availability",
            Self::LookupServiceInfo => "lookup_service_info",
            Self::SendConfirmation => "send_confirmation",
        }
    }

    pub const ALL: [ToolName; 6] = [
        Self::CreateBooking,
        Self::PlaceOrder,
        Self::CalculatePrice,
        Self::CheckAvailability,
        Self::LookupServiceInfo,
        Self::SendConfirmation,
    ];
}

/// Which tools need explicit human consent before execution. Side-effecting
/// tools are gated by default; read-only lookups pass through.
#[derive(Clone, Debug)]
pub struct ToolRegistry {
    gated: HashMap<ToolName, bool>,
}

impl Default for ToolRegistry {
    fn default() -> Self {
        let mut gated = HashMap::new();
        gated.insert(ToolName::CreateBooking, true);
        gated.insert(ToolName::PlaceOrder, true);
        gated.insert(ToolName::SendConfirmation, true);
        gated.insert(ToolName::CalculatePrice, false);
        gated.insert(ToolName::CheckAvailability, false);
        gated.insert(ToolName::LookupServiceInfo, false);
        Self { gated }
    }
}

impl ToolRegistry {
    pub fn set_gated(&mut self, tool: ToolName, requires_authorization: bool) {
        self.gated.insert(tool, requires_authorization);
    }

    /// Unknown names are not gated; they fail later, at dispatch, so the
    /// per-call result invariant still holds.
    pub fn requires_authorization(&self, wire_name: &str) -> bool {
        ToolName::from_wire(wire_name)
            .and_then(|tool| self.gated.get(&tool).copied())
            .unwrap_or(false)
    }
}

#[derive(Debug, Deserialize)]
struct BookingArgs {
    guest_name: String,
    service_type: String,
    date: NaiveDate,
    time: NaiveTime,
    #[serde(default = "default_party_size")]
    party_size: u32,
    #[serde(default)]
    notes: Option<String>,
}

fn default_party_size() -> u32 {
    1
}

#[derive(Debug, Deserialize)]
struct OrderItemArgs {
    item: String,
    #[serde(default = "default_quantity")]
    quantity: u32,
}

fn default_quantity() -> u32 {
    1
}

#[derive(Debug, Deserialize)]
struct OrderArgs {
    room_number: String,
    items: Vec<OrderItemArgs>,
}

#[derive(Debug, Deserialize)]
struct PriceArgs {
    items: Vec<PricedItem>,
    #[serde(default)]
    apply_tax: bool,
    #[serde(default)]
    apply_service_charge: bool,
}

#[derive(Debug, Deserialize)]
struct AvailabilityArgs {
    service_type: String,
    date: NaiveDate,
    time: NaiveTime,
}

#[derive(Debug, Deserialize)]
struct ServiceInfoArgs {
    topic: String,
}

#[derive(Debug, Deserialize)]
struct ConfirmationArgs {
    kind: String,
    recipient: String,
    subject: String,
    content: String,
}

/// Static dispatch table over the front-desk collaborators. Holds no
/// business logic: arguments in, collaborator call, structured result out.
/// Collaborator errors become failed results and never propagate.
#[derive(Clone)]
pub struct ToolExecutor {
    booking: Arc<dyn BookingService>,
    ordering: Arc<dyn OrderingService>,
    pricing: Arc<dyn PricingService>,
    availability: Arc<dyn AvailabilityService>,
    service_info: Arc<dyn ServiceInfoLookup>,
    confirmation: Arc<dyn ConfirmationService>,
}

impl ToolExecutor {
    pub fn new(
        booking: Arc<dyn BookingService>,
        ordering: Arc<dyn OrderingService>,
        pricing: Arc<dyn PricingService>,
        availability: Arc<dyn AvailabilityService>,
        service_info: Arc<dyn ServiceInfoLookup>,
        confirmation: Arc<dyn ConfirmationService>,
    ) -> Self {
        Self { booking, ordering, pricing, availability, service_info, confirmation }
    }

    /// Executes every call on its own task; independent calls within the
    /// batch run concurrently. Results come back in the order the calls
    /// were given, regardless of completion order.
    pub async fn execute_batch(&self, calls: &[ProposedToolCall]) -> Vec<ToolCallResult> {
        let handles: Vec<_> = calls
            .iter()
            .map(|call| {
                let executor = self.clone();
                let call = call.clone();
                tokio::spawn(async move { executor.execute_one(call).await })
            })
            .collect();

        let mut results = Vec::with_capacity(calls.len());
        for (handle, call) in handles.into_iter().zip(calls) {
            let result = match handle.await {
                Ok(result) => result,
                Err(join_error) => ToolCallResult::failed(
                    call.call_id.clone(),
                    format!("tool task aborted: {join_error}"),
                ),
            };
            results.push(result);
        }
        results
    }

    async fn execute_one(&self, call: ProposedToolCall) -> ToolCallResult {
        let Some(tool) = ToolName::from_wire(&call.name) else {
            return ToolCallResult::failed(call.call_id, format!("unknown tool `{}`", call.name));
        };
        debug!(event_name = "tools.dispatch", tool = tool.as_wire(), call_id = %call.call_id);

        match tool {
            ToolName::CreateBooking => match parse_args::<BookingArgs>(&call) {
                Ok(args) => {
                    let request = BookingRequest {
                        guest_name: args.guest_name,
                        service_type: args.service_type,
                        date: args.date,
                        time: args.time,
                        party_size: args.party_size,
                        notes: args.notes,
                    };
                    to_result(call.call_id, tool, self.booking.create(request).await)
                }
                Err(result) => result,
            },
            ToolName::PlaceOrder => match parse_args::<OrderArgs>(&call) {
                Ok(args) => {
                    let order = Order {
                        room_number: args.room_number,
                        lines: args
                            .items
                            .into_iter()
                            .map(|line| OrderLine { item: line.item, quantity: line.quantity })
                            .collect(),
                    };
                    to_result(call.call_id, tool, self.ordering.place_order(order).await)
                }
                Err(result) => result,
            },
            ToolName::CalculatePrice => match parse_args::<PriceArgs>(&call) {
                Ok(args) => to_result(
                    call.call_id,
                    tool,
                    self.pricing
                        .calculate(args.items, args.apply_tax, args.apply_service_charge)
                        .await,
                ),
                Err(result) => result,
            },
            ToolName::CheckAvailability => match parse_args::<AvailabilityArgs>(&call) {
                Ok(args) => to_result(
                    call.call_id,
                    tool,
                    self.availability.check(&args.service_type, args.date, args.time).await,
                ),
                Err(result) => result,
            },
            ToolName::LookupServiceInfo => match parse_args::<ServiceInfoArgs>(&call) {
                Ok(args) => {
                    to_result(call.call_id, tool, self.service_info.lookup(&args.topic).await)
                }
                Err(result) => result,
            },
            ToolName::SendConfirmation => match parse_args::<ConfirmationArgs>(&call) {
                Ok(args) => {
                    let sent = self
                        .confirmation
                        .send(&args.kind, &args.recipient, &args.subject, &args.content)
                        .await
                        .map(|()| serde_json::json!({"sent": true}));
                    to_value_result(call.call_id, tool, sent)
                }
                Err(result) => result,
            },
        }
    }
}

fn parse_args<T: serde::de::DeserializeOwned>(
    call: &ProposedToolCall,
) -> Result<T, ToolCallResult> {
    serde_json::from_value(call.arguments.clone()).map_err(|error| {
        ToolCallResult::failed(
            call.call_id.clone(),
            format!("invalid arguments for `{}`: {error}", call.name),
        )
    })
}

fn to_result<T: serde::Serialize>(
    call_id: String,
    tool: ToolName,
    outcome: Result<T, concierge_services::ServiceError>,
) -> ToolCallResult {
    to_value_result(call_id, tool, outcome.map(|value| {
        serde_json::to_value(value).unwrap_or(Value::Null)
    }))
}

fn to_value_result(
    call_id: String,
    tool: ToolName,
    outcome: Result<Value, concierge_services::ServiceError>,
) -> ToolCallResult {
    match outcome {
        Ok(payload) => ToolCallResult::succeeded(call_id, payload),
        Err(error) => {
            ToolCallResult::failed(call_id, format!("{} failed: {error}", tool.as_wire()))
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use concierge_core::domain::turn::ProposedToolCall;
    use concierge_services::FrontDesk;

    use super::{ToolExecutor, ToolName, ToolRegistry};

    fn executor() -> (Arc<FrontDesk>, ToolExecutor) {
        let desk = Arc::new(FrontDesk::new());
        let executor = ToolExecutor::new(
            desk.clone(),
            desk.clone(),
            desk.clone(),
            desk.clone(),
            desk.clone(),
            desk.clone(),
        );
        (desk, executor)
    }

    fn booking_call(call_id: &str) -> ProposedToolCall {
        ProposedToolCall::new(
            "create_booking",
            json!({
                "guest_name": "A. Guest",
                "service_type": "spa",
                "date": "2026-09-01",
                "time": "15:00:00",
                "party_size": 2
            }),
            call_id,
        )
    }

    #[test]
    fn wire_names_round_trip() {
        for tool in ToolName::ALL {
            assert_eq!(ToolName::from_wire(tool.as_wire()), Some(tool));
        }
        assert_eq!(ToolName::from_wire("transmogrify"), None);
    }

    #[test]
    fn registry_gates_side_effecting_tools_by_default() {
        let registry = ToolRegistry::default();
        assert!(registry.requires_authorization("create_booking"));
        assert!(registry.requires_authorization("place_order"));
        assert!(registry.requires_authorization("send_confirmation"));
        assert!(!registry.requires_authorization("check_availability"));
        assert!(!registry.requires_authorization("unknown_tool"));
    }

    #[tokio::test]
    async fn booking_call_succeeds_with_structured_payload() {
        let (_, executor) = executor();
        let results = executor.execute_batch(&[booking_call("call-1")]).await;
        assert_eq!(results.len(), 1);
        assert!(results[0].success);
        assert_eq!(results[0].payload["confirmation_code"], "BK-0001");
    }

    #[tokio::test]
    async fn unknown_tool_yields_failure_not_panic() {
        let (_, executor) = executor();
        let call = ProposedToolCall::new("transmogrify", json!({}), "call-x");
        let results = executor.execute_batch(&[call]).await;
        assert!(!results[0].success);
        assert!(results[0].error_message.as_deref().expect("error").contains("unknown tool"));
    }

    #[tokio::test]
    async fn malformed_arguments_fail_only_that_call() {
        let (_, executor) = executor();
        let bad = ProposedToolCall::new("create_booking", json!({"date": 42}), "call-bad");
        let good = booking_call("call-good");
        let results = executor.execute_batch(&[bad, good]).await;
        assert!(!results[0].success);
        assert!(results[1].success);
    }

    #[tokio::test]
    async fn collaborator_rejection_is_caught_per_call() {
        let (desk, executor) = executor();
        desk.close_service("spa").await;
        let results = executor.execute_batch(&[booking_call("call-1")]).await;
        assert!(!results[0].success);
        assert!(results[0].error_message.as_deref().expect("error").contains("fully booked"));
    }

    #[tokio::test]
    async fn batch_results_keep_proposal_order() {
        let (_, executor) = executor();
        let calls = vec![
            booking_call("call-a"),
            ProposedToolCall::new(
                "check_availability",
                json!({"service_type": "spa", "date": "2026-09-01", "time": "15:00:00"}),
                "call-b",
            ),
            ProposedToolCall::new("lookup_service_info", json!({"topic": "spa"}), "call-c"),
        ];
        let results = executor.execute_batch(&calls).await;
        let ids: Vec<_> = results.iter().map(|r| r.call_id.as_str()).collect();
        assert_eq!(ids, vec!["call-a", "call-b", "call-c"]);
    }
}
