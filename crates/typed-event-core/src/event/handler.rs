use std::fmt;
use std::sync::Arc;

/// What a handler returns. Infallible handlers always return `Ok(())`.
pub type HandlerResult = anyhow::Result<()>;

type HandlerFn<A> = dyn Fn(&A) -> HandlerResult + Send + Sync;

/// A handler for payloads of type `A`.
///
/// Cloning shares the underlying closure, and clones compare equal under
/// [`Handler::ptr_eq`]. That identity is what
/// [`Event::unsubscribe_handler`](crate::event::Event::unsubscribe_handler)
/// matches on, so keep a clone of the handler if you intend to remove it by
/// identity later. The handler stays callable on its own.
pub struct Handler<A> {
    f: Arc<HandlerFn<A>>,
}

impl<A: 'static> Handler<A> {
    /// Wrap an infallible closure.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&A) + Send + Sync + 'static,
    {
        Self {
            f: Arc::new(move |args: &A| {
                f(args);
                Ok(())
            }),
        }
    }

    /// Wrap a closure whose errors are reported by dispatch.
    pub fn fallible<F>(f: F) -> Self
    where
        F: Fn(&A) -> HandlerResult + Send + Sync + 'static,
    {
        Self { f: Arc::new(f) }
    }
}

impl<A> Handler<A> {
    /// Invoke the handler directly, outside of any dispatch.
    pub fn call(&self, args: &A) -> HandlerResult {
        (self.f)(args)
    }

    /// Whether both handles share the same closure.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.f, &other.f)
    }
}

impl<A> Clone for Handler<A> {
    fn clone(&self) -> Self {
        Self {
            f: Arc::clone(&self.f),
        }
    }
}

impl<A> fmt::Debug for Handler<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handler")
            .field("handles", &Arc::strong_count(&self.f))
            .finish()
    }
}
