use std::future::Future;
use std::ops::ControlFlow;
use std::time::Duration;

use tokio::time::MissedTickBehavior;

/// Runs `f` on every tick of `interval`, starting immediately, until it breaks.
///
/// A tick that `f` overruns is delayed rather than fired in a burst, so a slow
/// poll never queues up back-to-back calls.
pub async fn new<T, F, Fut>(interval: Duration, mut f: F) -> T
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ControlFlow<T>>,
{
    let mut interval = tokio::time::interval(interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        interval.tick().await;

        if let ControlFlow::Break(ret) = f().await {
            break ret;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn breaks_with_value() {
        let calls = Cell::new(0);
        let ret = new(Duration::from_secs(10), || {
            calls.set(calls.get() + 1);
            let n = calls.get();
            async move {
                if n == 3 {
                    ControlFlow::Break(n * 10)
                } else {
                    ControlFlow::Continue(())
                }
            }
        })
        .await;
        assert_eq!(ret, 30);
        assert_eq!(calls.get(), 3);
    }
}
