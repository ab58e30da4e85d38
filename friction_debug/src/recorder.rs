// Copyright 2026 the Friction Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! In-memory event recording with JSON export.
//!
//! [`RecorderSink`] implements [`TraceSink`] and keeps an owned copy of every
//! event it sees. Faults borrow their error, so the recorder stores the
//! rendered message instead. [`RecorderSink::to_json_lines`] writes one JSON
//! object per event for offline inspection.

use std::io::{self, Write};

use friction_core::trace::{
    BatchEvent, Component, CreditEvent, FaultEvent, ManagerEvent, ObserverEvent, ScopeEvent,
    SeekDecisionEvent, ShuffleEvent, TraceSink,
};
use serde_json::{Value, json};

use crate::node_label;

/// A recorded event.
#[derive(Clone, Debug)]
pub enum RecordedEvent {
    /// A [`ManagerEvent`].
    Manager(ManagerEvent),
    /// An [`ObserverEvent`].
    Observer(ObserverEvent),
    /// A [`BatchEvent`].
    Batch(BatchEvent),
    /// A fault, with the error rendered to text.
    Fault {
        /// Which manager reported it.
        component: Component,
        /// The error's `Display` output.
        message: String,
    },
    /// A [`ScopeEvent`].
    Scope(ScopeEvent),
    /// A [`SeekDecisionEvent`].
    SeekDecision(SeekDecisionEvent),
    /// A [`CreditEvent`].
    Credit(CreditEvent),
    /// A [`ShuffleEvent`].
    Shuffle(ShuffleEvent),
}

impl RecordedEvent {
    /// Short event name, also used as the `"event"` field in JSON.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Manager(_) => "manager",
            Self::Observer(_) => "observer",
            Self::Batch(_) => "batch",
            Self::Fault { .. } => "fault",
            Self::Scope(_) => "scope",
            Self::SeekDecision(_) => "seek",
            Self::Credit(_) => "credit",
            Self::Shuffle(_) => "shuffle",
        }
    }

    /// The event as a JSON object.
    #[must_use]
    pub fn to_json(&self) -> Value {
        let name = self.name();
        match self {
            Self::Manager(e) => json!({
                "event": name,
                "component": e.component.as_str(),
                "action": format!("{:?}", e.action),
            }),
            Self::Observer(e) => json!({
                "event": name,
                "connected": e.connected,
                "childList": e.flags.child_list,
                "subtree": e.flags.subtree,
                "characterData": e.flags.character_data,
                "attributes": e.flags.attributes,
            }),
            Self::Batch(e) => json!({
                "event": name,
                "seq": e.seq,
                "records": e.records,
                "added": e.added,
                "text": e.text,
                "attributes": e.attributes,
                "delivered": e.delivered,
            }),
            Self::Fault { component, message } => json!({
                "event": name,
                "component": component.as_str(),
                "message": message,
            }),
            Self::Scope(e) => json!({
                "event": name,
                "previous": e.previous.map(node_label),
                "current": e.current.map(node_label),
                "cause": format!("{:?}", e.cause),
            }),
            Self::SeekDecision(e) => json!({
                "event": name,
                "media": node_label(e.media),
                "from": e.from,
                "to": e.to,
                "decision": format!("{:?}", e.decision),
                "credits": e.credits,
            }),
            Self::Credit(e) => json!({
                "event": name,
                "media": node_label(e.media),
                "credits": e.credits,
                "cause": format!("{:?}", e.cause),
            }),
            Self::Shuffle(e) => json!({
                "event": name,
                "node": node_label(e.node),
                "words": e.words,
                "changed": e.changed,
            }),
        }
    }
}

/// A [`TraceSink`] that records every event in memory.
#[derive(Debug, Default)]
pub struct RecorderSink {
    events: Vec<RecordedEvent>,
}

impl RecorderSink {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The recorded events, oldest first.
    #[must_use]
    pub fn events(&self) -> &[RecordedEvent] {
        &self.events
    }

    /// Consumes the recorder and returns its events.
    #[must_use]
    pub fn into_events(self) -> Vec<RecordedEvent> {
        self.events
    }

    /// Drops every recorded event.
    pub fn clear(&mut self) {
        self.events.clear();
    }

    /// Number of recorded faults.
    #[must_use]
    pub fn fault_count(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, RecordedEvent::Fault { .. }))
            .count()
    }

    /// Writes the recording as JSON lines, one event per line.
    ///
    /// # Errors
    ///
    /// Returns any error from `writer`.
    pub fn to_json_lines<W: Write>(&self, mut writer: W) -> io::Result<()> {
        for event in &self.events {
            serde_json::to_writer(&mut writer, &event.to_json())?;
            writer.write_all(b"\n")?;
        }
        Ok(())
    }

    fn push(&mut self, event: RecordedEvent) {
        self.events.push(event);
    }
}

impl TraceSink for RecorderSink {
    fn on_manager(&mut self, e: &ManagerEvent) {
        self.push(RecordedEvent::Manager(*e));
    }

    fn on_observer(&mut self, e: &ObserverEvent) {
        self.push(RecordedEvent::Observer(*e));
    }

    fn on_batch(&mut self, e: &BatchEvent) {
        self.push(RecordedEvent::Batch(*e));
    }

    fn on_fault(&mut self, e: &FaultEvent<'_>) {
        self.push(RecordedEvent::Fault {
            component: e.component,
            message: e.error.to_string(),
        });
    }

    fn on_scope(&mut self, e: &ScopeEvent) {
        self.push(RecordedEvent::Scope(*e));
    }

    fn on_seek_decision(&mut self, e: &SeekDecisionEvent) {
        self.push(RecordedEvent::SeekDecision(*e));
    }

    fn on_credit(&mut self, e: &CreditEvent) {
        self.push(RecordedEvent::Credit(*e));
    }

    fn on_shuffle(&mut self, e: &ShuffleEvent) {
        self.push(RecordedEvent::Shuffle(*e));
    }
}
