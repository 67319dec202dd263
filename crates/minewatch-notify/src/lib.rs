//! minewatch-notify — notification delivery for minewatch.
//!
//! The engine only needs to know whether a message was delivered; the
//! transport behind [`Notifier`] is swappable. A failed delivery is
//! reported as a [`DeliveryError`] and never aborts the cycle.

pub mod command;
pub mod notifier;
pub mod webhook;

pub use command::CommandNotifier;
pub use notifier::{notifier_from_config, DeliveryError, LogNotifier, Message, Notifier};
pub use webhook::WebhookNotifier;
