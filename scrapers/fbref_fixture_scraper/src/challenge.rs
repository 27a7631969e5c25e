use std::{
    thread,
    time::{Duration, Instant},
};
use tracing::{debug, info};

use crate::{browser::PageDriver, config::ChallengeConfig, error::FixtureError};

const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Time source for the challenge poll loop.
pub trait Clock {
    fn now(&self) -> Instant;
    fn sleep(&self, duration: Duration);
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> Instant {
        (**self).now()
    }

    fn sleep(&self, duration: Duration) {
        (**self).sleep(duration)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) {
        thread::sleep(duration);
    }
}

/// Waits for the anti-bot interstitial to clear by polling the page title.
#[derive(Debug, Clone)]
pub struct ChallengeGate {
    markers: Vec<String>,
    poll_interval: Duration,
    timeout: Duration,
}

impl ChallengeGate {
    pub fn new(config: &ChallengeConfig) -> Self {
        Self {
            markers: config.markers.iter().map(|m| m.to_lowercase()).collect(),
            poll_interval: config.poll_interval().max(MIN_POLL_INTERVAL),
            timeout: config.timeout(),
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    pub fn is_challenge_title(&self, title: &str) -> bool {
        let title = title.to_lowercase();
        self.markers.iter().any(|marker| title.contains(marker.as_str()))
    }

    pub fn await_resolution<D, C>(&self, driver: &D, clock: &C) -> Result<(), FixtureError>
    where
        D: PageDriver + ?Sized,
        C: Clock + ?Sized,
    {
        info!("Waiting for challenge page to resolve...");
        let started = clock.now();
        let mut attempt = 1u32;

        loop {
            let title = driver.title()?;
            if !self.is_challenge_title(&title) {
                info!("Challenge passed after {} check(s)", attempt);
                return Ok(());
            }

            let elapsed = clock.now().saturating_duration_since(started);
            if elapsed >= self.timeout {
                return Err(FixtureError::ChallengeTimeout {
                    timeout: self.timeout,
                    last_title: title,
                });
            }

            debug!("Challenge still shown (title: {:?}, check {})", title, attempt);
            clock.sleep(self.poll_interval.min(self.timeout - elapsed));
            attempt += 1;
        }
    }
}
