use std::collections::VecDeque;
use std::sync::Arc;

use tracing::{debug, debug_span, warn};

use super::error::HandlerError;
use super::invocation::Invocation;

/// The per-invocation queue of aspects still to run.
pub type AspectQueue = VecDeque<Arc<dyn Aspect>>;

/// Interceptor around a handler invocation.
///
/// Call `invocation.proceed()` to continue down the chain; return without
/// calling it to skip the handler and every later aspect. Aspects that touch
/// shared state synchronize it themselves.
pub trait Aspect: Send + Sync {
    fn around(&self, invocation: &mut Invocation<'_>) -> Result<(), HandlerError>;
}

impl<F> Aspect for F
where
    F: Fn(&mut Invocation<'_>) -> Result<(), HandlerError> + Send + Sync,
{
    fn around(&self, invocation: &mut Invocation<'_>) -> Result<(), HandlerError> {
        self(invocation)
    }
}

/// Supplies the aspect queue for a dispatch run.
pub trait AspectProvider: Send + Sync {
    fn default_aspects(&self) -> AspectQueue;
}

enum AspectSource {
    Shared(Arc<dyn Aspect>),
    Factory(Arc<dyn Fn() -> Arc<dyn Aspect> + Send + Sync>),
}

/// Ordered list of aspects, each either a shared instance or a factory
/// called once per dispatch run.
#[derive(Default)]
pub struct DefaultAspects {
    sources: Vec<AspectSource>,
}

impl DefaultAspects {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a shared aspect instance.
    pub fn with<A: Aspect + 'static>(self, aspect: A) -> Self {
        self.with_shared(Arc::new(aspect))
    }

    pub fn with_shared(mut self, aspect: Arc<dyn Aspect>) -> Self {
        self.sources.push(AspectSource::Shared(aspect));
        self
    }

    /// Append an aspect created fresh for every dispatch run.
    pub fn with_factory<A, F>(mut self, factory: F) -> Self
    where
        A: Aspect + 'static,
        F: Fn() -> A + Send + Sync + 'static,
    {
        self.sources.push(AspectSource::Factory(Arc::new(move || {
            Arc::new(factory()) as Arc<dyn Aspect>
        })));
        self
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

impl AspectProvider for DefaultAspects {
    fn default_aspects(&self) -> AspectQueue {
        self.sources
            .iter()
            .map(|source| match source {
                AspectSource::Shared(aspect) => Arc::clone(aspect),
                AspectSource::Factory(factory) => factory(),
            })
            .collect()
    }
}

/// Opens a `tracing` span per invocation and logs the handler outcome.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingAspect;

impl Aspect for LoggingAspect {
    fn around(&self, invocation: &mut Invocation<'_>) -> Result<(), HandlerError> {
        let span = debug_span!(
            "handler",
            handler = invocation.handler_type().short_name(),
            message_type = invocation.message_type().short_name(),
            correlation_id = invocation.message().correlation_id().unwrap_or(""),
        );
        let _entered = span.enter();

        debug!("invoking handler");
        let result = invocation.proceed();
        match &result {
            Ok(()) => debug!(handled = invocation.is_handled(), "handler completed"),
            Err(e) => warn!(error = %e, "handler failed"),
        }
        result
    }
}
