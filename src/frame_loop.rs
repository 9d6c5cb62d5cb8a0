use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Source of absolute elapsed time for the animation.
#[derive(Debug, Clone)]
pub enum FrameClock {
    Realtime { start: Instant },
    /// Only advances when stepped, for deterministic updates.
    Manual { elapsed: Duration },
}

impl FrameClock {
    pub fn realtime() -> Self {
        Self::Realtime {
            start: Instant::now(),
        }
    }

    pub fn manual() -> Self {
        Self::Manual {
            elapsed: Duration::ZERO,
        }
    }

    pub fn elapsed(&self) -> Duration {
        match self {
            Self::Realtime { start } => start.elapsed(),
            Self::Manual { elapsed } => *elapsed,
        }
    }

    /// Advances a manual clock. Has no effect on a realtime clock.
    pub fn advance(&mut self, delta: Duration) {
        if let Self::Manual { elapsed } = self {
            *elapsed += delta;
        }
    }
}

/// Cancels a frame loop. Clones share the same flag.
#[derive(Debug, Clone, Default)]
pub struct StopToken(Arc<AtomicBool>);

impl StopToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Hands out the elapsed time for each frame until stopped.
#[derive(Debug)]
pub struct FrameLoop {
    clock: FrameClock,
    stop: StopToken,
    frame_count: u64,
}

impl FrameLoop {
    pub fn new(clock: FrameClock) -> Self {
        Self {
            clock,
            stop: StopToken::new(),
            frame_count: 0,
        }
    }

    pub fn stop_token(&self) -> StopToken {
        self.stop.clone()
    }

    pub fn is_running(&self) -> bool {
        !self.stop.is_stopped()
    }

    pub fn clock_mut(&mut self) -> &mut FrameClock {
        &mut self.clock
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Elapsed time for the next frame, or `None` once the loop has been stopped.
    pub fn next_frame(&mut self) -> Option<Duration> {
        if self.stop.is_stopped() {
            return None;
        }

        self.frame_count += 1;
        Some(self.clock.elapsed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_only_moves_when_advanced() {
        let mut frame_loop = FrameLoop::new(FrameClock::manual());

        assert_eq!(frame_loop.next_frame(), Some(Duration::ZERO));
        assert_eq!(frame_loop.next_frame(), Some(Duration::ZERO));

        frame_loop.clock_mut().advance(Duration::from_millis(16));
        frame_loop.clock_mut().advance(Duration::from_millis(16));

        assert_eq!(frame_loop.next_frame(), Some(Duration::from_millis(32)));
        assert_eq!(frame_loop.frame_count(), 3);
    }

    #[test]
    fn stopping_ends_the_loop_for_every_clone() {
        let mut frame_loop = FrameLoop::new(FrameClock::manual());
        let token = frame_loop.stop_token();

        assert!(frame_loop.next_frame().is_some());
        token.clone().stop();

        assert!(!frame_loop.is_running());
        assert!(token.is_stopped());
        assert_eq!(frame_loop.next_frame(), None);
        assert_eq!(frame_loop.frame_count(), 1);
    }

    #[test]
    fn realtime_clock_ignores_advance() {
        let mut clock = FrameClock::realtime();
        clock.advance(Duration::from_secs(3600));

        assert!(clock.elapsed() < Duration::from_secs(3600));
    }
}
