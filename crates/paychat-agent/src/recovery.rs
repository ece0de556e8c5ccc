//! Execute-with-at-most-one-recovery.

use std::future::Future;

/// Run `op` with `key`. If it fails with an error `is_recoverable` accepts,
/// obtain a fresh key from `recover` and run `op` exactly once more.
///
/// The second outcome is returned as-is, whatever it is. `recover` is
/// `FnOnce`, so there is no path to a third attempt. A failing `recover`
/// surfaces its own error and `op` is not retried.
pub async fn run_with_recovery<K, T, E, Op, OpFut, Recover, RecoverFut>(
    key: K,
    mut op: Op,
    is_recoverable: impl Fn(&E) -> bool,
    recover: Recover,
) -> Result<T, E>
where
    Op: FnMut(K) -> OpFut,
    OpFut: Future<Output = Result<T, E>>,
    Recover: FnOnce() -> RecoverFut,
    RecoverFut: Future<Output = Result<K, E>>,
{
    match op(key).await {
        Err(e) if is_recoverable(&e) => {
            tracing::debug!("recoverable failure, retrying once with a fresh key");
            let key = recover().await?;
            op(key).await
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[derive(Debug, PartialEq)]
    enum Fail {
        Expired,
        Broken,
    }

    #[tokio::test]
    async fn success_runs_once() {
        let calls = Cell::new(0);
        let recovered = Cell::new(false);
        let result = run_with_recovery(
            1,
            |k| {
                calls.set(calls.get() + 1);
                async move { Ok::<_, Fail>(k * 10) }
            },
            |e| *e == Fail::Expired,
            || {
                recovered.set(true);
                async { Ok(2) }
            },
        )
        .await;
        assert_eq!(result, Ok(10));
        assert_eq!(calls.get(), 1);
        assert!(!recovered.get());
    }

    #[tokio::test]
    async fn recoverable_failure_retries_with_new_key() {
        let seen = std::cell::RefCell::new(Vec::new());
        let result = run_with_recovery(
            "old",
            |k| {
                seen.borrow_mut().push(k);
                async move {
                    if k == "old" {
                        Err(Fail::Expired)
                    } else {
                        Ok(k.len())
                    }
                }
            },
            |e| *e == Fail::Expired,
            || async { Ok("fresh") },
        )
        .await;
        assert_eq!(result, Ok(5));
        assert_eq!(*seen.borrow(), vec!["old", "fresh"]);
    }

    #[tokio::test]
    async fn second_failure_is_returned_not_retried() {
        let calls = Cell::new(0);
        let result: Result<(), Fail> = run_with_recovery(
            0,
            |_| {
                calls.set(calls.get() + 1);
                async { Err(Fail::Expired) }
            },
            |e| *e == Fail::Expired,
            || async { Ok(1) },
        )
        .await;
        assert_eq!(result, Err(Fail::Expired));
        assert_eq!(calls.get(), 2);
    }

    #[tokio::test]
    async fn other_failures_skip_recovery() {
        let recovered = Cell::new(false);
        let result: Result<(), Fail> = run_with_recovery(
            0,
            |_| async { Err(Fail::Broken) },
            |e| *e == Fail::Expired,
            || {
                recovered.set(true);
                async { Ok(1) }
            },
        )
        .await;
        assert_eq!(result, Err(Fail::Broken));
        assert!(!recovered.get());
    }

    #[tokio::test]
    async fn failed_recovery_surfaces_its_error() {
        let calls = Cell::new(0);
        let result: Result<(), Fail> = run_with_recovery(
            0,
            |_| {
                calls.set(calls.get() + 1);
                async { Err(Fail::Expired) }
            },
            |e| *e == Fail::Expired,
            || async { Err(Fail::Broken) },
        )
        .await;
        assert_eq!(result, Err(Fail::Broken));
        assert_eq!(calls.get(), 1);
    }
}
