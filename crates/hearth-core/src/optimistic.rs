//! Local-first mutation with rollback.
//!
//! Every list mutation on the dashboards goes through [`apply_optimistic`]:
//! the local state changes immediately, and a failed write restores the
//! exact pre-mutation snapshot.

use std::future::Future;

use crate::Result;

/// Apply `mutate` to `state`, then await `write`; on error put `state` back.
///
/// `write` is not polled until after `mutate` has run.
pub async fn apply_optimistic<S, Fut>(
    state: &mut S,
    mutate: impl FnOnce(&mut S),
    write: Fut,
) -> Result<()>
where
    S: Clone,
    Fut: Future<Output = Result<()>>,
{
    let snapshot = state.clone();
    mutate(state);
    match write.await {
        Ok(()) => Ok(()),
        Err(error) => {
            *state = snapshot;
            tracing::debug!("Rolled back optimistic change: {error}");
            Err(error)
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::Error;

    #[tokio::test]
    async fn successful_write_keeps_change() {
        let mut items = vec![1, 2, 3];
        apply_optimistic(&mut items, |items| items.retain(|n| *n != 2), async { Ok(()) })
            .await
            .unwrap();
        assert_eq!(items, vec![1, 3]);
    }

    #[tokio::test]
    async fn failed_write_restores_snapshot() {
        let mut items = vec![1, 2, 3];
        let result = apply_optimistic(
            &mut items,
            |items| {
                items.clear();
                items.push(9);
            },
            async { Err(Error::Backend("offline".to_string())) },
        )
        .await;
        assert!(result.is_err());
        assert_eq!(items, vec![1, 2, 3]);
    }
}
