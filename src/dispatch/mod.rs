//! # Event dispatch: matching, delivery, and replay.
//!
//! [`Notifier`] is the context object the embedding system owns; the
//! `delivery` internals run one sequential worker per registration so that
//! slow or failing handlers never block the publisher or each other.

pub(crate) mod delivery;
mod notifier;

pub use delivery::{DeliveryMode, DeliveryOutcome, DeliveryReport};
pub use notifier::{Notifier, Replayed};
