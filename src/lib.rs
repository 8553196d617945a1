//! Terminal client for a personal cloud-storage service.
//!
//! The [`drive`] module is the client-side view model: the file listing,
//! its category/search projection and the storage-usage aggregation. The
//! [`client`] module talks to the storage web service, [`auth`] runs the
//! login and OTP flow, and [`dashboard`] ties the model to a
//! [`render::DashboardView`].

pub mod auth;
pub mod client;
pub mod config;
pub mod dashboard;
pub mod drive;
pub mod error;
pub mod render;
pub mod shell;

#[cfg(test)]
mod testing;

pub use auth::{AuthFlow, AuthStage};
pub use client::{CloudApi, HttpCloudClient, UploadEvent, UploadFile};
pub use config::Config;
pub use dashboard::Dashboard;
pub use drive::{FileRecord, ViewState};
pub use error::{CloudError, CloudResult, ValidationError};
