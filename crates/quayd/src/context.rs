//! Environment handed to facade factories.

use std::sync::Arc;

use crate::abort::AbortSignal;
use crate::authorizer::Authorizer;
use crate::resources::Resources;
use crate::session::Session;
use crate::state::StateBackend;

/// Everything a facade factory may use to build its facade.
///
/// Factories receive nothing else: no global lookups, no ambient state.
pub trait FacadeContext {
    /// Cancellation signal for the connection. Never fires unless the root
    /// was built with a live signal.
    fn abort(&self) -> &AbortSignal;

    /// Identity and permission queries for the caller.
    fn auth(&self) -> Arc<dyn Authorizer>;

    /// The connection's resource table.
    fn resources(&self) -> Arc<Resources>;

    /// Backing store handle.
    fn state(&self) -> Arc<dyn StateBackend>;

    /// Object id the facade is being built for.
    fn id(&self) -> &str;
}

/// Context built by the root dispatcher for one construction.
pub(crate) struct CallContext<'a> {
    session: &'a Arc<Session>,
    abort: &'a AbortSignal,
    id: &'a str,
}

impl<'a> CallContext<'a> {
    pub(crate) const fn new(session: &'a Arc<Session>, abort: &'a AbortSignal, id: &'a str) -> Self {
        Self { session, abort, id }
    }
}

impl FacadeContext for CallContext<'_> {
    fn abort(&self) -> &AbortSignal {
        self.abort
    }

    fn auth(&self) -> Arc<dyn Authorizer> {
        Arc::clone(self.session) as Arc<dyn Authorizer>
    }

    fn resources(&self) -> Arc<Resources> {
        Arc::clone(self.session.resources())
    }

    fn state(&self) -> Arc<dyn StateBackend> {
        Arc::clone(self.session.state())
    }

    fn id(&self) -> &str {
        self.id
    }
}
