//! Registry of live disruption events with synchronous subscribers.

use chrono::Utc;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};
use types::{
    AffectedResource, DayOfWeek, DisruptionEvent, DisruptionKind, DisruptionSeverity, EventId,
    EventStatus,
};
use uuid::Uuid;

use crate::DisruptionError;

pub type Subscriber = dyn Fn(&DisruptionEvent) + Send + Sync;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Active event with a fresh id and the current time.
pub fn new_event(
    kind: DisruptionKind,
    severity: DisruptionSeverity,
    affected_resources: Vec<AffectedResource>,
    affected_days: impl IntoIterator<Item = DayOfWeek>,
) -> DisruptionEvent {
    DisruptionEvent {
        id: EventId(Uuid::new_v4().to_string()),
        kind,
        severity,
        description: String::new(),
        affected_resources,
        affected_days: affected_days.into_iter().collect(),
        status: EventStatus::Active,
        reported_at: Utc::now(),
        resolved_at: None,
    }
}

#[derive(Default)]
struct Inner {
    events: HashMap<EventId, DisruptionEvent>,
    subscribers: Vec<(SubscriptionId, Arc<Subscriber>)>,
    next_subscription: u64,
}

#[derive(Default)]
pub struct DisruptionDetector {
    inner: RwLock<Inner>,
}

impl DisruptionDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, f: impl Fn(&DisruptionEvent) + Send + Sync + 'static) -> SubscriptionId {
        let mut w = self.inner.write();
        let id = SubscriptionId(w.next_subscription);
        w.next_subscription += 1;
        w.subscribers.push((id, Arc::new(f)));
        id
    }

    /// `false` when the subscription was already gone.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut w = self.inner.write();
        let before = w.subscribers.len();
        w.subscribers.retain(|(s, _)| *s != id);
        w.subscribers.len() != before
    }

    /// Stores the event as active and notifies every subscriber in
    /// subscription order. Subscribers run after the lock is released.
    pub fn report(&self, mut event: DisruptionEvent) -> Result<DisruptionEvent, DisruptionError> {
        if event.id.0.is_empty() {
            event.id = EventId(Uuid::new_v4().to_string());
        }
        event.status = EventStatus::Active;
        event.resolved_at = None;

        let subscribers: Vec<Arc<Subscriber>> = {
            let mut w = self.inner.write();
            if w.events.contains_key(&event.id) {
                return Err(DisruptionError::Duplicate(event.id));
            }
            w.events.insert(event.id.clone(), event.clone());
            w.subscribers.iter().map(|(_, f)| f.clone()).collect()
        };

        info!(
            event = %event.id,
            kind = ?event.kind,
            severity = ?event.severity,
            subscribers = subscribers.len(),
            "disruption reported"
        );
        for f in &subscribers {
            f(&event);
        }
        Ok(event)
    }

    pub fn resolve(&self, id: &EventId) -> Result<DisruptionEvent, DisruptionError> {
        self.close(id, EventStatus::Resolved)
    }

    pub fn cancel(&self, id: &EventId) -> Result<DisruptionEvent, DisruptionError> {
        self.close(id, EventStatus::Cancelled)
    }

    fn close(&self, id: &EventId, status: EventStatus) -> Result<DisruptionEvent, DisruptionError> {
        let mut w = self.inner.write();
        let ev = w
            .events
            .get_mut(id)
            .ok_or_else(|| DisruptionError::UnknownEvent(id.clone()))?;
        if ev.status != EventStatus::Active {
            return Err(DisruptionError::NotActive(id.clone(), ev.status));
        }
        ev.status = status;
        ev.resolved_at = Some(Utc::now());
        debug!(event = %id, ?status, "disruption closed");
        Ok(ev.clone())
    }

    pub fn get(&self, id: &EventId) -> Option<DisruptionEvent> {
        self.inner.read().events.get(id).cloned()
    }

    /// Active events, oldest first.
    pub fn active(&self) -> Vec<DisruptionEvent> {
        let mut v: Vec<DisruptionEvent> = self
            .inner
            .read()
            .events
            .values()
            .filter(|e| e.status == EventStatus::Active)
            .cloned()
            .collect();
        v.sort_by(|a, b| a.reported_at.cmp(&b.reported_at).then_with(|| a.id.cmp(&b.id)));
        v
    }

    /// Drops resolved and cancelled events closed more than `age` ago.
    /// Nothing else ever shrinks the registry. Returns how many were dropped.
    pub fn purge_closed(&self, age: chrono::Duration) -> usize {
        let cutoff = Utc::now() - age;
        let mut w = self.inner.write();
        let before = w.events.len();
        w.events.retain(|_, e| {
            e.status == EventStatus::Active || e.resolved_at.is_some_and(|t| t > cutoff)
        });
        let dropped = before - w.events.len();
        if dropped > 0 {
            debug!(dropped, "closed disruptions purged");
        }
        dropped
    }

    /// Every event still held, oldest first.
    pub fn history(&self) -> Vec<DisruptionEvent> {
        let mut v: Vec<DisruptionEvent> = self.inner.read().events.values().cloned().collect();
        v.sort_by(|a, b| a.reported_at.cmp(&b.reported_at).then_with(|| a.id.cmp(&b.id)));
        v
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use types::ResourceKind;

    fn absence(id: &str) -> DisruptionEvent {
        new_event(
            DisruptionKind::InstructorAbsence,
            DisruptionSeverity::High,
            vec![AffectedResource::direct(ResourceKind::Instructor, id)],
            [],
        )
    }

    #[test]
    fn subscribers_run_in_subscription_order() {
        let det = DisruptionDetector::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        for tag in ["first", "second", "third"] {
            let seen = seen.clone();
            det.subscribe(move |e| seen.lock().push(format!("{tag}:{}", e.affected_resources[0].id)));
        }
        det.report(absence("i1")).unwrap();
        assert_eq!(*seen.lock(), vec!["first:i1", "second:i1", "third:i1"]);
    }

    #[test]
    fn purge_keeps_active_and_recent_events() {
        let det = DisruptionDetector::new();
        let open = det.report(absence("i1")).unwrap();
        let done = det.report(absence("i2")).unwrap();
        det.cancel(&done.id).unwrap();

        assert_eq!(det.purge_closed(chrono::Duration::hours(1)), 0);
        assert_eq!(det.history().len(), 2);
        assert_eq!(det.purge_closed(chrono::Duration::zero()), 1);
        assert!(det.get(&done.id).is_none());
        assert_eq!(det.history().len(), 1);
        assert_eq!(det.active()[0].id, open.id);
    }

    #[test]
    fn unsubscribed_callbacks_are_not_called() {
        let det = DisruptionDetector::new();
        let hits = Arc::new(Mutex::new(0));
        let h = hits.clone();
        let sub = det.subscribe(move |_| *h.lock() += 1);
        det.report(absence("i1")).unwrap();
        assert!(det.unsubscribe(sub));
        assert!(!det.unsubscribe(sub));
        det.report(absence("i2")).unwrap();
        assert_eq!(*hits.lock(), 1);
    }

    #[test]
    fn subscriber_may_resolve_from_its_callback() {
        let det = Arc::new(DisruptionDetector::new());
        let d = det.clone();
        det.subscribe(move |e| {
            d.resolve(&e.id).unwrap();
        });
        let ev = det.report(absence("i1")).unwrap();
        assert!(det.active().is_empty());
        assert_eq!(det.get(&ev.id).unwrap().status, EventStatus::Resolved);
    }

    #[test]
    fn resolve_removes_from_active_set_once() {
        let det = DisruptionDetector::new();
        let a = det.report(absence("i1")).unwrap();
        let b = det.report(absence("i2")).unwrap();
        assert_eq!(det.active().len(), 2);

        let r = det.resolve(&a.id).unwrap();
        assert_eq!(r.status, EventStatus::Resolved);
        assert!(r.resolved_at.is_some());
        assert_eq!(det.active().len(), 1);
        assert_eq!(det.active()[0].id, b.id);

        assert!(matches!(det.resolve(&a.id), Err(DisruptionError::NotActive(_, EventStatus::Resolved))));
        assert!(matches!(det.cancel(&EventId::from("nope")), Err(DisruptionError::UnknownEvent(_))));
        assert_eq!(det.history().len(), 2);
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let det = DisruptionDetector::new();
        let ev = det.report(absence("i1")).unwrap();
        assert!(matches!(det.report(ev), Err(DisruptionError::Duplicate(_))));
    }
}
