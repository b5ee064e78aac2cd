//! Active-item tracking from viewport intersection ratios.
//!
//! Items register an opaque handle (a DOM node, a widget id, a row index) with
//! the [`VisibilityTracker`], which forwards it to an injected
//! [`IntersectionSource`]. The source later reports batches of
//! [`IntersectionEvent`]s; the tracker keeps the last ratio per item and picks
//! the item occupying the most viewport space as the active one.

use std::collections::HashMap;
use tokio::sync::watch;

/// Ratio thresholds at which the source should report changes.
///
/// Several thresholds give enough resolution to rank partially visible
/// items of different heights.
pub const INTERSECTION_THRESHOLDS: [f64; 5] = [0.0, 0.25, 0.5, 0.75, 1.0];

/// One observation from the source: how much of `id` is in view.
#[derive(Debug, Clone, PartialEq)]
pub struct IntersectionEvent {
    pub id: String,
    /// Fraction of the item inside the viewport, in `[0, 1]`.
    pub ratio: f64,
}

impl IntersectionEvent {
    pub fn new(id: impl Into<String>, ratio: f64) -> Self {
        Self {
            id: id.into(),
            ratio,
        }
    }
}

/// The viewport observation primitive.
pub trait IntersectionSource<H> {
    fn observe(&mut self, id: &str, target: &H, thresholds: &[f64]);
    fn unobserve(&mut self, id: &str, target: &H);
}

struct Record<H> {
    target: H,
    ratio: f64,
    /// Registration order, used to break ties for ids missing from a batch.
    seq: u64,
}

/// Registry of observed items and the currently active one.
pub struct VisibilityTracker<H> {
    source: Box<dyn IntersectionSource<H> + Send>,
    records: HashMap<String, Record<H>>,
    next_seq: u64,
    active: watch::Sender<Option<String>>,
}

impl<H> VisibilityTracker<H> {
    pub fn new(source: Box<dyn IntersectionSource<H> + Send>) -> Self {
        let (active, _) = watch::channel(None);
        Self {
            source,
            records: HashMap::new(),
            next_seq: 0,
            active,
        }
    }

    /// Register `target` for `id`, or unregister `id` when `target` is `None`.
    ///
    /// Any previous target for `id` is unobserved first, so an id never has
    /// more than one record. A fresh target starts at ratio 0 until the
    /// source reports it.
    pub fn register(&mut self, id: &str, target: Option<H>) {
        if let Some(previous) = self.records.remove(id) {
            self.source.unobserve(id, &previous.target);
        }

        let Some(target) = target else {
            tracing::trace!(id, "Item unregistered from visibility tracking");
            return;
        };

        self.source.observe(id, &target, &INTERSECTION_THRESHOLDS);
        let seq = self.next_seq;
        self.next_seq += 1;
        self.records.insert(
            id.to_string(),
            Record {
                target,
                ratio: 0.0,
                seq,
            },
        );
    }

    /// Drop every registration, e.g. when a reset empties the list.
    pub fn clear(&mut self) {
        for (id, record) in self.records.drain() {
            self.source.unobserve(&id, &record.target);
        }
    }

    /// Apply a batch of observations and recompute the active item.
    ///
    /// Returns the new active id when it changed. Events for ids that are not
    /// registered (late deliveries after unregistering) are ignored.
    pub fn observe_batch(&mut self, events: &[IntersectionEvent]) -> Option<String> {
        let mut batch_order: Vec<&str> = Vec::with_capacity(events.len());
        for event in events {
            let Some(record) = self.records.get_mut(&event.id) else {
                tracing::trace!(id = %event.id, "Ignoring intersection for unregistered item");
                continue;
            };
            record.ratio = if event.ratio.is_nan() {
                0.0
            } else {
                event.ratio.clamp(0.0, 1.0)
            };
            if !batch_order.contains(&event.id.as_str()) {
                batch_order.push(event.id.as_str());
            }
        }

        let best = self.most_visible(&batch_order)?;
        let changed = self.active.send_if_modified(|active| {
            if active.as_deref() == Some(best.as_str()) {
                false
            } else {
                *active = Some(best.clone());
                true
            }
        });
        if changed {
            tracing::debug!(id = %best, "Active item changed");
            Some(best)
        } else {
            None
        }
    }

    /// The id with the strictly greatest ratio above zero.
    ///
    /// Candidates are scanned in batch order first, then registration order,
    /// so the first one seen wins a tie.
    fn most_visible(&self, batch_order: &[&str]) -> Option<String> {
        let mut rest: Vec<(&String, &Record<H>)> = self
            .records
            .iter()
            .filter(|(id, _)| !batch_order.contains(&id.as_str()))
            .collect();
        rest.sort_by_key(|(_, record)| record.seq);

        let candidates = batch_order
            .iter()
            .filter_map(|id| self.records.get_key_value(*id))
            .chain(rest);

        let mut best: Option<&String> = None;
        let mut best_ratio = 0.0;
        for (id, record) in candidates {
            if record.ratio > best_ratio {
                best_ratio = record.ratio;
                best = Some(id);
            }
        }
        best.cloned()
    }

    pub fn active(&self) -> Option<String> {
        self.active.borrow().clone()
    }

    /// Receive the active id whenever it changes.
    pub fn subscribe(&self) -> watch::Receiver<Option<String>> {
        self.active.subscribe()
    }

    pub fn ratio(&self, id: &str) -> Option<f64> {
        self.records.get(id).map(|r| r.ratio)
    }

    pub fn is_tracked(&self, id: &str) -> bool {
        self.records.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
