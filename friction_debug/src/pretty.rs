// Copyright 2026 the Friction Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Human-readable trace output.
//!
//! [`PrettyPrintSink`] implements [`TraceSink`] and writes one line per event
//! to a [`Write`](std::io::Write) destination (default: stderr).

use std::io::Write;

use friction_core::mutation::ObserveFlags;
use friction_core::trace::{
    BatchEvent, CreditCause, CreditEvent, FaultEvent, ManagerAction, ManagerEvent, ObserverEvent,
    ScopeCause, ScopeEvent, SeekDecision, SeekDecisionEvent, ShuffleEvent, TraceSink,
};

use crate::node_label;

/// Writes human-readable trace lines to a [`Write`](std::io::Write) destination.
pub struct PrettyPrintSink<W: Write = Box<dyn Write>> {
    writer: W,
}

impl<W: Write> std::fmt::Debug for PrettyPrintSink<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrettyPrintSink").finish_non_exhaustive()
    }
}

impl PrettyPrintSink {
    /// Creates a sink that writes to stderr.
    #[must_use]
    pub fn stderr() -> Self {
        Self {
            writer: Box::new(std::io::stderr()),
        }
    }

    /// Creates a sink that writes to a boxed writer.
    #[must_use]
    pub fn new(writer: Box<dyn Write>) -> Self {
        Self { writer }
    }
}

impl<W: Write> PrettyPrintSink<W> {
    /// Creates a sink that writes to the given destination.
    #[must_use]
    pub fn with_writer(writer: W) -> Self {
        Self { writer }
    }

    /// Consumes the sink and returns its writer.
    #[must_use]
    pub fn into_writer(self) -> W {
        self.writer
    }
}

fn action_name(action: ManagerAction) -> &'static str {
    match action {
        ManagerAction::Applied => "applied",
        ManagerAction::Updated => "updated",
        ManagerAction::Removed => "removed",
    }
}

fn cause_name(cause: ScopeCause) -> &'static str {
    match cause {
        ScopeCause::PointerOver => "pointer-over",
        ScopeCause::PointerOut => "pointer-out",
        ScopeCause::Reposition => "reposition",
        ScopeCause::Cleared => "cleared",
        ScopeCause::Sweep => "sweep",
        ScopeCause::Disabled => "disabled",
    }
}

fn decision_name(decision: SeekDecision) -> &'static str {
    match decision {
        SeekDecision::Free => "free",
        SeekDecision::Granted => "GRANTED",
        SeekDecision::Blocked => "BLOCKED",
        SeekDecision::Resnapped => "resnapped",
        SeekDecision::Held => "held",
    }
}

fn credit_cause_name(cause: CreditCause) -> &'static str {
    match cause {
        CreditCause::Replenished => "replenished",
        CreditCause::SourceReset => "source-reset",
        CreditCause::Spent => "spent",
    }
}

fn flag_letters(flags: ObserveFlags) -> String {
    [
        (flags.child_list, 'c'),
        (flags.subtree, 's'),
        (flags.character_data, 'd'),
        (flags.attributes, 'a'),
    ]
    .into_iter()
    .map(|(on, letter)| if on { letter } else { '-' })
    .collect()
}

fn scope_label(scope: Option<friction_core::node::NodeId>) -> String {
    scope.map_or_else(|| String::from("none"), node_label)
}

impl<W: Write> TraceSink for PrettyPrintSink<W> {
    fn on_manager(&mut self, e: &ManagerEvent) {
        let _ = writeln!(
            self.writer,
            "[manager] {} {}",
            e.component.as_str(),
            action_name(e.action),
        );
    }

    fn on_observer(&mut self, e: &ObserverEvent) {
        let state = if e.connected { "connected" } else { "disconnected" };
        let _ = writeln!(
            self.writer,
            "[observer] {state} flags={}",
            flag_letters(e.flags),
        );
    }

    fn on_batch(&mut self, e: &BatchEvent) {
        let _ = writeln!(
            self.writer,
            "[batch] #{} records={} added={} text={} attrs={} delivered={}",
            e.seq, e.records, e.added, e.text, e.attributes, e.delivered,
        );
    }

    fn on_fault(&mut self, e: &FaultEvent<'_>) {
        let _ = writeln!(self.writer, "[fault] {}: {}", e.component.as_str(), e.error);
    }

    fn on_scope(&mut self, e: &ScopeEvent) {
        let _ = writeln!(
            self.writer,
            "[scope] {} -> {} ({})",
            scope_label(e.previous),
            scope_label(e.current),
            cause_name(e.cause),
        );
    }

    fn on_seek_decision(&mut self, e: &SeekDecisionEvent) {
        let _ = writeln!(
            self.writer,
            "[seek] media={} {:.1}s -> {:.1}s {} credits={}",
            node_label(e.media),
            e.from,
            e.to,
            decision_name(e.decision),
            e.credits,
        );
    }

    fn on_credit(&mut self, e: &CreditEvent) {
        let _ = writeln!(
            self.writer,
            "[credit] media={} credits={} ({})",
            node_label(e.media),
            e.credits,
            credit_cause_name(e.cause),
        );
    }

    fn on_shuffle(&mut self, e: &ShuffleEvent) {
        let changed = if e.changed { "changed" } else { "unchanged" };
        let _ = writeln!(
            self.writer,
            "[shuffle] node={} words={} {changed}",
            node_label(e.node),
            e.words,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use friction_core::error::FrictionError;
    use friction_core::node::NodeId;
    use friction_core::trace::Component;

    fn output(sink: PrettyPrintSink<Vec<u8>>) -> String {
        String::from_utf8(sink.into_writer()).unwrap()
    }

    #[test]
    fn pretty_print_seek_decision() {
        let mut sink = PrettyPrintSink::with_writer(Vec::<u8>::new());
        sink.on_seek_decision(&SeekDecisionEvent {
            media: NodeId::new(7, 2),
            from: 10.0,
            to: 95.3,
            decision: SeekDecision::Blocked,
            credits: 0,
        });
        let out = output(sink);
        assert_eq!(out, "[seek] media=7:2 10.0s -> 95.3s BLOCKED credits=0\n");
    }

    #[test]
    fn pretty_print_observer_and_fault() {
        let mut sink = PrettyPrintSink::with_writer(Vec::<u8>::new());
        sink.on_observer(&ObserverEvent {
            flags: ObserveFlags {
                child_list: true,
                subtree: true,
                character_data: false,
                attributes: false,
            },
            connected: true,
        });
        sink.on_fault(&FaultEvent {
            component: Component::Marker,
            error: &FrictionError::Detached(NodeId::new(3, 0)),
        });
        let out = output(sink);
        let mut lines = out.lines();
        assert_eq!(lines.next(), Some("[observer] connected flags=cs--"));
        let fault = lines.next().unwrap();
        assert!(fault.starts_with("[fault] marker: "), "got: {fault}");
        assert_eq!(lines.next(), None);
    }

    #[test]
    fn pretty_print_scope_without_previous() {
        let mut sink = PrettyPrintSink::with_writer(Vec::<u8>::new());
        sink.on_scope(&ScopeEvent {
            previous: None,
            current: Some(NodeId::new(4, 1)),
            cause: ScopeCause::PointerOver,
        });
        assert_eq!(output(sink), "[scope] none -> 4:1 (pointer-over)\n");
    }
}
