//! Dispatch: discover handlers for a message and run them through aspects.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   MessageDispatcher                          │
//! │  dispatch(batch) → dispatch_one(message) for each, in order │
//! └─────────────────────────────────────────────────────────────┘
//!                            │
//!                            ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   HandlerDiscoverer                          │
//! │  most specific consumed type per handler, then order rule   │
//! └─────────────────────────────────────────────────────────────┘
//!                            │  one HandlerDescriptor per handler
//!                            ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Invocation (own copy of the aspect queue)                   │
//! │  proceed() → aspect 1 → aspect 2 → … → handler.consume()    │
//! │  an aspect that does not proceed short-circuits the rest    │
//! └─────────────────────────────────────────────────────────────┘
//! ```

mod aspect;
mod discoverer;
mod dispatcher;
mod error;
mod invocation;

pub use aspect::{Aspect, AspectProvider, AspectQueue, DefaultAspects, LoggingAspect};
pub use discoverer::{HandlerDescriptor, HandlerDiscoverer};
pub use dispatcher::MessageDispatcher;
pub use error::HandlerError;
pub use invocation::Invocation;
