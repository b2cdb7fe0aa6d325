//! Protocol events for state change notifications.
//!
//! Events are emitted for every successful workflow so that downstream
//! indexers can follow balance changes. A workflow that fails leaves no
//! events behind.

use serde::{Deserialize, Serialize};

use crate::core::collateral::{CollateralDeposited, CollateralRedeemed};
use crate::liquidation::LiquidationOutcome;
use crate::utils::address::{Address, Hash};
use crate::utils::constants::DEFAULT_MAX_EVENTS;
use crate::utils::math::Wad;

// ═══════════════════════════════════════════════════════════════════════════════
// EVENT TYPES
// ═══════════════════════════════════════════════════════════════════════════════

/// All protocol event types
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProtocolEvent {
    /// Collateral entered a position
    CollateralDeposited(CollateralDeposited),
    /// Collateral left a position
    CollateralRedeemed(CollateralRedeemed),
    /// DSC was minted against a position
    DscMinted(DscMintedEvent),
    /// DSC debt was repaid
    DscBurned(DscBurnedEvent),
    /// A position was liquidated
    Liquidated(LiquidationOutcome),
}

impl ProtocolEvent {
    /// Get the event type as a string
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::CollateralDeposited(_) => "CollateralDeposited",
            Self::CollateralRedeemed(_) => "CollateralRedeemed",
            Self::DscMinted(_) => "DscMinted",
            Self::DscBurned(_) => "DscBurned",
            Self::Liquidated(_) => "Liquidated",
        }
    }

    /// Accounts whose position the event changed
    pub fn involves(&self, account: &Address) -> bool {
        match self {
            Self::CollateralDeposited(e) => e.user == *account,
            Self::CollateralRedeemed(e) => e.from == *account || e.to == *account,
            Self::DscMinted(e) => e.user == *account,
            Self::DscBurned(e) => e.on_behalf_of == *account || e.payer == *account,
            Self::Liquidated(e) => e.target == *account || e.liquidator == *account,
        }
    }

    /// Compute event hash
    pub fn hash(&self) -> Hash {
        let data = bincode::serialize(self).unwrap_or_default();
        Hash::sha256(&data)
    }
}

/// Event emitted when DSC is minted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DscMintedEvent {
    /// Minter, now indebted
    pub user: Address,
    /// Amount minted
    pub amount: Wad,
}

/// Event emitted when DSC debt is repaid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DscBurnedEvent {
    /// Position whose debt decreased
    pub on_behalf_of: Address,
    /// Account that supplied the DSC
    pub payer: Address,
    /// Amount burned
    pub amount: Wad,
}

// ═══════════════════════════════════════════════════════════════════════════════
// EVENT LOG
// ═══════════════════════════════════════════════════════════════════════════════

/// Bounded log of emitted events, oldest pruned first
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventLog {
    events: Vec<ProtocolEvent>,
    max_events: usize,
    total_emitted: u64,
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new()
    }
}

impl EventLog {
    /// Create a new empty event log
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_MAX_EVENTS)
    }

    /// Create a log retaining at most `max_events`
    pub fn with_capacity(max_events: usize) -> Self {
        Self {
            events: Vec::new(),
            max_events,
            total_emitted: 0,
        }
    }

    /// Add an event to the log
    pub fn push(&mut self, event: ProtocolEvent) {
        self.events.push(event);
        self.total_emitted += 1;

        if self.events.len() > self.max_events {
            self.events.drain(0..self.events.len() - self.max_events);
        }
    }

    /// Get retained events
    pub fn events(&self) -> &[ProtocolEvent] {
        &self.events
    }

    /// Get events of a specific type
    pub fn filter_by_type(&self, event_type: &str) -> Vec<&ProtocolEvent> {
        self.events
            .iter()
            .filter(|e| e.event_type() == event_type)
            .collect()
    }

    /// Get events touching an account
    pub fn events_for(&self, account: &Address) -> Vec<&ProtocolEvent> {
        self.events.iter().filter(|e| e.involves(account)).collect()
    }

    /// Take all retained events, leaving the log empty
    pub fn drain(&mut self) -> Vec<ProtocolEvent> {
        std::mem::take(&mut self.events)
    }

    /// Events emitted since creation, including pruned and drained ones
    pub fn total_emitted(&self) -> u64 {
        self.total_emitted
    }

    /// Get the number of retained events
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
