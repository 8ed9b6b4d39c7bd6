//! Sequential guard execution with first-denial short-circuit.

use crate::core::{BoxError, Guard, GuardContext, GuardVerdict, MaybeDeferred, State, TransitionName};
use tracing::trace;

/// Run `guards` in order and report the first denial, if any.
///
/// Guards run one at a time, each awaited before the next starts. A denial
/// stops the pipeline; a guard error stops it too and is returned as-is.
/// An empty list passes immediately.
pub(crate) fn run_guards<'a, S, E, K>(
    guards: Vec<&'a Guard<S, E, K>>,
    entity: &'a E,
    transition: &'a K,
    from: S,
    to: &'a S,
) -> MaybeDeferred<'a, Result<Option<String>, BoxError>>
where
    S: State + 'a,
    E: ?Sized + Sync,
    K: TransitionName,
{
    if guards.is_empty() {
        return MaybeDeferred::ready(Ok(None));
    }

    MaybeDeferred::defer(async move {
        let total = guards.len();
        for (position, guard) in guards.into_iter().enumerate() {
            let ctx = GuardContext {
                entity,
                transition,
                from: &from,
                to,
            };

            if let GuardVerdict::Deny(reason) = guard.check(ctx).await? {
                trace!(
                    transition = %transition,
                    position,
                    total,
                    "guard denied transition"
                );
                return Ok(Some(reason));
            }
        }
        Ok(None)
    })
}
