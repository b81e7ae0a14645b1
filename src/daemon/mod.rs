//! Update service: the widget worker loop, signal handling and due-card
//! notifications.

#[cfg(feature = "daemon")]
pub mod loop_main;
pub mod notifications;
#[cfg(feature = "daemon")]
pub mod signals;
