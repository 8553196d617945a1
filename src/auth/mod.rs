//! Login and one-time-password verification.
//!
//! The flow moves from credentials, to a pending OTP, to an authenticated
//! session. Every input is validated before a request goes out, and every
//! failure leaves the flow in a state where the user can try again.

pub mod cooldown;

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::client::CloudApi;
use crate::error::{CloudResult, ValidationError};

pub use cooldown::ResendCooldown;

/// Digits in a one-time password.
pub const OTP_LENGTH: usize = 6;

/// Where the login flow currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthStage {
    Credentials,
    OtpPending,
    Authenticated,
}

/// Check an OTP as typed. Surrounding whitespace is ignored; what remains
/// must be exactly six ASCII digits.
pub fn validate_otp(raw: &str) -> Result<&str, ValidationError> {
    let otp = raw.trim();
    if otp.len() == OTP_LENGTH && otp.bytes().all(|b| b.is_ascii_digit()) {
        Ok(otp)
    } else {
        Err(ValidationError::MalformedOtp)
    }
}

pub struct AuthFlow {
    api: Arc<dyn CloudApi>,
    stage: AuthStage,
    cooldown: ResendCooldown,
}

impl AuthFlow {
    pub fn new(api: Arc<dyn CloudApi>, resend_cooldown: Duration) -> Self {
        Self {
            api,
            stage: AuthStage::Credentials,
            cooldown: ResendCooldown::new(resend_cooldown),
        }
    }

    pub fn stage(&self) -> AuthStage {
        self.stage
    }

    pub fn cooldown(&self) -> &ResendCooldown {
        &self.cooldown
    }

    /// Submit credentials. On success the server has mailed an OTP and the
    /// flow waits for it.
    pub async fn login(&mut self, username: &str, password: &str) -> CloudResult<()> {
        let username = username.trim();
        if username.is_empty() || password.is_empty() {
            return Err(ValidationError::MissingCredentials.into());
        }

        self.api.login(username, password).await.inspect_err(|e| {
            warn!(error = %e, "Login rejected");
        })?;

        info!(%username, "Credentials accepted, OTP sent");
        self.stage = AuthStage::OtpPending;
        self.cooldown.reset();
        Ok(())
    }

    /// Submit an OTP. Malformed input never reaches the server.
    pub async fn verify(&mut self, raw_otp: &str) -> CloudResult<()> {
        self.require_otp_stage()?;
        let otp = validate_otp(raw_otp)?;

        self.api.verify_otp(otp).await.inspect_err(|e| {
            debug!(error = %e, "OTP rejected");
        })?;

        info!("OTP verified");
        self.stage = AuthStage::Authenticated;
        Ok(())
    }

    /// Ask for a new OTP, subject to the resend cooldown.
    pub async fn resend(&mut self) -> CloudResult<()> {
        self.require_otp_stage()?;
        self.cooldown.check()?;

        self.api.resend_otp().await.inspect_err(|e| {
            warn!(error = %e, "OTP resend failed");
        })?;

        self.cooldown.start();
        Ok(())
    }

    /// Abandon the pending OTP and start over.
    pub fn back_to_login(&mut self) {
        self.stage = AuthStage::Credentials;
        self.cooldown.reset();
    }

    fn require_otp_stage(&self) -> Result<(), ValidationError> {
        match self.stage {
            AuthStage::OtpPending => Ok(()),
            _ => Err(ValidationError::InvalidInput(
                "Sign in with your username and password first".to_string(),
            )),
        }
    }
}
