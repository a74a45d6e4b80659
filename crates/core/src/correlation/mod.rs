//! Cross-server event correlation.
//!
//! Per-server detection results become [`event::Event`]s, which are merged
//! into one chronological list and linked into a causal chain of
//! trigger/effect segments.

pub mod chain;
pub mod event;
pub mod rules;
pub mod timeline;

pub use chain::{optimize, CausalChainBuilder, CausalChainSegment, ChainBuild};
pub use event::{derive_events, Event, EventType};
pub use rules::{infer_relationships, CausalRelationship, RelationshipRule};
pub use timeline::{build_chronological_event_map, find_related_events, find_related_indices};
