use core::{
    future::Future,
    pin::pin,
    task::{Context, Poll, Waker},
};
use std::{
    sync::Arc,
    task::Wake,
    thread::{self, Thread},
};

pub mod logger;

struct ThreadWaker(Thread);

impl Wake for ThreadWaker {
    fn wake(self: Arc<Self>) {
        self.0.unpark();
    }

    fn wake_by_ref(self: &Arc<Self>) {
        self.0.unpark();
    }
}

thread_local! {
    static WAKER: Waker = Waker::from(Arc::new(ThreadWaker(thread::current())));
}

/// Drives `future` to completion on the calling thread, parking between polls.
pub fn block_on<F: Future>(future: F) -> F::Output {
    let mut future = pin!(future);
    let waker = WAKER.with(Waker::clone);
    let mut cx = Context::from_waker(&waker);

    loop {
        if let Poll::Ready(output) = future.as_mut().poll(&mut cx) {
            return output;
        }
        thread::park();
    }
}

/// Wraps any angle into [0, 360).
pub fn normalize_heading(angle: f64) -> f64 {
    let new_angle = (360. + (angle % 360.)) % 360.;

    if new_angle < 360. {
        new_angle
    } else {
        0.
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use embassy_time::{with_timeout, Duration, Instant, Timer};

    #[test]
    fn test_normalize_heading() {
        assert_abs_diff_eq!(normalize_heading(0.), 0.);
        assert_abs_diff_eq!(normalize_heading(360.), 0.);
        assert_abs_diff_eq!(normalize_heading(-10.), 350.);
        assert_abs_diff_eq!(normalize_heading(725.), 5.);
        assert!(normalize_heading(-1e-20) < 360.);
    }

    #[test]
    fn test_block_on_ready() {
        assert_eq!(block_on(async { 7 }), 7);
    }

    #[test]
    fn test_block_on_timer() {
        let start = Instant::now();
        block_on(Timer::after_millis(20));
        assert!(start.elapsed() >= Duration::from_millis(20));
    }

    #[test]
    fn test_block_on_timeout() {
        let result = block_on(with_timeout(
            Duration::from_millis(10),
            core::future::pending::<()>(),
        ));
        assert!(result.is_err());
    }
}
