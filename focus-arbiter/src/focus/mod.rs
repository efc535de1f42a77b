//! Audio focus arbitration
//!
//! Request building, the focus stack, the arbitration engine and
//! asynchronous notification delivery.

pub mod attributes;
pub mod context;
pub mod dispatcher;
pub mod engine;
pub mod registry;
pub mod request;

pub use attributes::{AudioAttributes, ContentType, Usage};
pub use context::ExecutionContext;
pub use dispatcher::NotificationDispatcher;
pub use engine::{FocusArbiter, FocusInfo};
pub use registry::{FocusHolder, FocusRegistry};
pub use request::{FocusListener, FocusRequest, FocusRequestBuilder, FocusRequestId};
