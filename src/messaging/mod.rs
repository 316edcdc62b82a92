/// Messaging module
///
/// Broadcast event bus for state-change notifications. Every mutation of
/// the wizard publishes a `StateEvent`; any number of listeners (navigation
/// bar, progress display, tests) can subscribe independently.
///
/// ## Usage
///
/// ```rust,ignore
/// let bus = EventBus::new();
/// let (rx, _id) = bus.subscribe();
///
/// bus.publish(StateEvent::WasReset);
///
/// while let Ok(event) = rx.recv() {
///     match event {
///         StateEvent::StepChanged { .. } => { /* re-render */ }
///         _ => {}
///     }
/// }
/// ```

pub mod bus;
pub mod events;

// Re-export commonly used types
pub use bus::{EventBus, SubscriberId};
pub use events::{JobKind, StateEvent};
