/// What a session wants to receive. Each interest maps to one or more
/// topic-exchange binding keys over the seven-segment routing key layout
/// `priority.prematch|live.live|virt.message_type.sport.urn_type.urn_id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageInterest {
    All,
    LiveOnly,
    PrematchOnly,
    HighPriority,
    LowPriority,
    /// Only messages scoped to the given event urns (`sr:match:<n>`).
    SpecificEvents(Vec<String>),
    /// Liveness traffic only: alives and snapshot-complete markers.
    System,
}

/// Copyable discriminant of [`MessageInterest`], used as the liveness
/// tracking key so tracker entries never borrow the event-id list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InterestKind {
    All,
    LiveOnly,
    PrematchOnly,
    HighPriority,
    LowPriority,
    SpecificEvents,
    System,
}

impl InterestKind {
    pub fn name(&self) -> &'static str {
        match self {
            InterestKind::All => "all",
            InterestKind::LiveOnly => "live_only",
            InterestKind::PrematchOnly => "prematch_only",
            InterestKind::HighPriority => "high_priority",
            InterestKind::LowPriority => "low_priority",
            InterestKind::SpecificEvents => "specific_events",
            InterestKind::System => "system",
        }
    }
}

impl MessageInterest {
    pub fn kind(&self) -> InterestKind {
        match self {
            MessageInterest::All => InterestKind::All,
            MessageInterest::LiveOnly => InterestKind::LiveOnly,
            MessageInterest::PrematchOnly => InterestKind::PrematchOnly,
            MessageInterest::HighPriority => InterestKind::HighPriority,
            MessageInterest::LowPriority => InterestKind::LowPriority,
            MessageInterest::SpecificEvents(_) => InterestKind::SpecificEvents,
            MessageInterest::System => InterestKind::System,
        }
    }

    pub fn name(&self) -> &'static str {
        self.kind().name()
    }

    pub fn routing_keys(&self) -> Vec<String> {
        match self {
            MessageInterest::All => vec!["*.*.*.*.*.*.*".to_string()],
            MessageInterest::LiveOnly => vec!["*.*.live.*.*.*.*".to_string()],
            MessageInterest::PrematchOnly => vec!["*.pre.*.*.*.*.*".to_string()],
            MessageInterest::HighPriority => vec!["hi.*.*.*.*.*.*".to_string()],
            MessageInterest::LowPriority => vec!["lo.*.*.*.*.*.*".to_string()],
            MessageInterest::SpecificEvents(urns) => {
                urns.iter().map(|urn| event_routing_key(urn)).collect()
            }
            MessageInterest::System => vec![
                "-.-.-.alive.#".to_string(),
                "-.-.-.snapshot_complete.#".to_string(),
            ],
        }
    }
}

/// `sr:match:12345` binds as `#.sr:match.12345`: the final colon becomes the
/// segment separator so the urn id lands in its own routing-key segment.
fn event_routing_key(urn: &str) -> String {
    match urn.rfind(':') {
        Some(idx) => format!("#.{}.{}", &urn[..idx], &urn[idx + 1..]),
        None => format!("#.{urn}"),
    }
}
