use std::time::Duration;

use tokio::time::Instant;

use crate::error::ValidationError;

/// Client-side wait between OTP resend requests.
///
/// The remaining time is reported in whole seconds and drops by one each
/// second: a 60 s cooldown reads 60 for the first second and 0 once it has
/// fully elapsed.
#[derive(Debug, Clone)]
pub struct ResendCooldown {
    duration: Duration,
    started: Option<Instant>,
}

impl ResendCooldown {
    pub fn new(duration: Duration) -> Self {
        Self {
            duration,
            started: None,
        }
    }

    /// Begin counting down from now.
    pub fn start(&mut self) {
        self.started = Some(Instant::now());
    }

    pub fn reset(&mut self) {
        self.started = None;
    }

    pub fn remaining_secs(&self) -> u64 {
        match self.started {
            Some(started) => self
                .duration
                .as_secs()
                .saturating_sub(started.elapsed().as_secs()),
            None => 0,
        }
    }

    pub fn is_active(&self) -> bool {
        self.remaining_secs() > 0
    }

    /// Ok when a resend may be sent now.
    pub fn check(&self) -> Result<(), ValidationError> {
        match self.remaining_secs() {
            0 => Ok(()),
            secs => Err(ValidationError::ResendCooldown(secs)),
        }
    }

    /// Link text for the resend action.
    pub fn label(&self) -> String {
        match self.remaining_secs() {
            0 => "Resend OTP".to_string(),
            secs => format!("Resend OTP ({secs}s)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn idle_cooldown_allows_resend() {
        let cooldown = ResendCooldown::new(Duration::from_secs(60));
        assert!(cooldown.check().is_ok());
        assert_eq!(cooldown.label(), "Resend OTP");
    }

    #[tokio::test(start_paused = true)]
    async fn counts_down_once_per_second() {
        let mut cooldown = ResendCooldown::new(Duration::from_secs(60));
        cooldown.start();

        let mut seen = Vec::new();
        for _ in 0..=60 {
            seen.push(cooldown.remaining_secs());
            tokio::time::advance(Duration::from_secs(1)).await;
        }
        let expected: Vec<u64> = (0..=60).rev().collect();
        assert_eq!(seen, expected);
    }

    #[tokio::test(start_paused = true)]
    async fn rejects_with_wait_message_until_elapsed() {
        let mut cooldown = ResendCooldown::new(Duration::from_secs(60));
        cooldown.start();

        tokio::time::advance(Duration::from_millis(15_500)).await;
        assert_eq!(
            cooldown.check().unwrap_err().to_string(),
            "Please wait 45s before resending"
        );
        assert_eq!(cooldown.label(), "Resend OTP (45s)");

        tokio::time::advance(Duration::from_millis(44_500)).await;
        assert!(cooldown.check().is_ok());
        assert!(!cooldown.is_active());
    }

    #[tokio::test(start_paused = true)]
    async fn reset_clears_countdown() {
        let mut cooldown = ResendCooldown::new(Duration::from_secs(60));
        cooldown.start();
        cooldown.reset();
        assert_eq!(cooldown.remaining_secs(), 0);
    }
}
