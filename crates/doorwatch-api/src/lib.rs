// doorwatch-api: wire envelope, typed dispatch, and live/simulated transports

pub mod dispatch;
pub mod error;
pub mod live;
pub mod message;
pub mod simulated;
pub mod transport;

pub use dispatch::{DispatchOutcome, Dispatcher, Handler, HandlerError, HandlerResult, Subscription, handler};
pub use error::Error;
pub use live::{LiveTransport, Opener, WsOpener};
pub use message::{
    AccessEventPayload, AlertPayload, DoorStatusPayload, EmergencyPayload, Envelope, Message,
    MessageKind, SystemStatusPayload, UserActivityPayload,
};
pub use simulated::{SimulatedTransport, SimulationConfig};
pub use transport::{ConnectionState, ReconnectPolicy, Transport};
