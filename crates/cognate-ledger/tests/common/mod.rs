#![allow(dead_code)]

use chrono::{DateTime, Duration, Utc};
use cognate_ledger::EventPayload;
use cognate_types::{
    Action, ActionCategory, Actor, ActorType, Location, Method, Reason, Severity, Trigger,
};

pub fn base_time() -> DateTime<Utc> {
    DateTime::from_timestamp(1_717_000_000, 0).unwrap()
}

/// A payload with the given classification, happening `minute` minutes after
/// [`base_time`].
pub fn event(
    actor_type: ActorType,
    category: ActionCategory,
    severity: Severity,
    minute: i64,
) -> EventPayload {
    EventPayload::new(
        Actor::new(actor_type, format!("{actor_type}-{minute}"), format!("Actor {minute}")),
        Action::new("task", format!("{category} event at minute {minute}"), category, severity),
        Reason::new(Trigger::Event).with_reasoning("scenario"),
        Method::new("scripted"),
    )
    .at(base_time() + Duration::minutes(minute))
    .in_location(Location::space("space-main"))
}

pub fn info(actor_type: ActorType, minute: i64) -> EventPayload {
    event(actor_type, ActionCategory::Action, Severity::Info, minute)
}
