//! The due-deck widget core: cursor, refresh controller, view-model builder,
//! threshold trigger, and the session that runs them as one request cycle.

pub mod controller;
pub mod cursor;
pub mod request;
pub mod session;
pub mod state;
pub mod trigger;
pub mod view;

#[cfg(test)]
mod test_properties;
