//! Interactive session: sign in, verify the OTP, then drive the dashboard
//! from a command prompt.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use dialoguer::theme::ColorfulTheme;
use dialoguer::{Confirm, Input, Password};
use tracing::debug;

use crate::auth::{AuthFlow, AuthStage};
use crate::client::{CloudApi, HttpCloudClient, UploadFile};
use crate::config::Config;
use crate::dashboard::Dashboard;
use crate::drive::CategoryFilter;
use crate::render::{MessageKind, TerminalView};

const HELP: &str = "\
Commands:
  ls                         list files
  category <all|documents|images|videos>
  search [text]              filter by name; no text clears the search
  usage                      storage breakdown
  upload <path>              upload a local file
  get <name>                 download a file
  rm <name>                  delete a file
  refresh                    reload the listing
  logout                     end the session
  help                       this text
  quit                       exit";

/// One dashboard command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    List,
    Category(CategoryFilter),
    Search(String),
    Usage,
    Upload(PathBuf),
    Download(String),
    Delete(String),
    Refresh,
    Logout,
    Help,
    Quit,
}

/// Parse a command line. Arguments run to the end of the line so file
/// names may contain spaces.
pub fn parse_command(line: &str) -> Result<Command, String> {
    let line = line.trim();
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    let required = |what: &str| -> Result<String, String> {
        if rest.is_empty() {
            Err(format!("'{word}' needs {what}"))
        } else {
            Ok(rest.to_string())
        }
    };

    match word.to_lowercase().as_str() {
        "" | "ls" | "list" => Ok(Command::List),
        "category" | "cat" => rest.parse().map(Command::Category),
        "search" | "find" => Ok(Command::Search(rest.to_string())),
        "usage" | "df" => Ok(Command::Usage),
        "upload" | "put" => required("a path").map(|p| Command::Upload(PathBuf::from(p))),
        "get" | "download" => required("a file name").map(Command::Download),
        "rm" | "delete" => required("a file name").map(Command::Delete),
        "refresh" => Ok(Command::Refresh),
        "logout" => Ok(Command::Logout),
        "help" | "?" => Ok(Command::Help),
        "quit" | "exit" | "q" => Ok(Command::Quit),
        other => Err(format!("Unknown command '{other}'. Type 'help' for a list.")),
    }
}

/// What the user typed at the OTP prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
enum OtpAction {
    Verify(String),
    Resend,
    Back,
}

fn parse_otp_action(line: &str) -> OtpAction {
    match line.trim().to_lowercase().as_str() {
        "resend" | "r" => OtpAction::Resend,
        "back" | "b" => OtpAction::Back,
        _ => OtpAction::Verify(line.to_string()),
    }
}

enum SessionEnd {
    Logout,
    Expired,
    Quit,
}

/// Run sessions until the user quits.
pub async fn run(config: &Config) -> Result<()> {
    let api: Arc<dyn CloudApi> =
        Arc::new(HttpCloudClient::new(config).context("Failed to create HTTP client")?);
    let term = TerminalView::new();
    term.message(
        MessageKind::Success,
        &format!("Connected to {}", config.base_url),
    );

    loop {
        sign_in(api.clone(), config, &term).await?;

        match dashboard(api.clone(), config).await? {
            SessionEnd::Quit => return Ok(()),
            SessionEnd::Logout => {
                if let Err(err) = api.logout().await {
                    debug!(error = %err, "Logout request failed");
                }
                term.message(MessageKind::Success, "Logged out");
            }
            SessionEnd::Expired => {
                term.message(MessageKind::Error, "Session expired. Please login again.");
            }
        }
    }
}

async fn sign_in(api: Arc<dyn CloudApi>, config: &Config, term: &TerminalView) -> Result<()> {
    let mut flow = AuthFlow::new(api, config.resend_cooldown());

    loop {
        match flow.stage() {
            AuthStage::Credentials => {
                let username = prompt_text("Username", true).await?;
                let password = prompt_password("Password").await?;
                match flow.login(&username, &password).await {
                    Ok(()) => {
                        term.message(MessageKind::Success, "OTP sent! Loading verification...");
                        tokio::time::sleep(config.login_transition_delay()).await;
                        term.message(
                            MessageKind::Success,
                            "Check your email for the verification code",
                        );
                    }
                    Err(err) => term.message(MessageKind::Error, &err.user_message()),
                }
            }
            AuthStage::OtpPending => {
                let prompt = format!("OTP ('r' {}, 'b' back to login)", flow.cooldown().label());
                let line = prompt_text(&prompt, true).await?;
                match parse_otp_action(&line) {
                    OtpAction::Resend => match flow.resend().await {
                        Ok(()) => term.message(MessageKind::Success, "OTP resent to your email"),
                        Err(err) => term.message(MessageKind::Error, &err.user_message()),
                    },
                    OtpAction::Back => {
                        if confirm("Go back to login?").await? {
                            flow.back_to_login();
                        }
                    }
                    OtpAction::Verify(otp) => match flow.verify(&otp).await {
                        Ok(()) => {
                            term.message(MessageKind::Success, "Login successful! Redirecting...");
                            tokio::time::sleep(config.otp_redirect_delay()).await;
                        }
                        Err(err) => term.message(MessageKind::Error, &err.user_message()),
                    },
                }
            }
            AuthStage::Authenticated => return Ok(()),
        }
    }
}

async fn dashboard(api: Arc<dyn CloudApi>, config: &Config) -> Result<SessionEnd> {
    let mut dash = Dashboard::new(api, TerminalView::new(), config);
    dash.refresh().await;

    loop {
        let prompt = match dash.state().search_query() {
            "" => format!("drive [{}]", dash.state().active_category()),
            query => format!("drive [{}] /{}", dash.state().active_category(), query),
        };
        let line = prompt_text(&prompt, true).await?;

        let command = match parse_command(&line) {
            Ok(command) => command,
            Err(msg) => {
                dash.view().message(MessageKind::Error, &msg);
                continue;
            }
        };

        let outcome = match command {
            Command::List => {
                dash.render_files();
                Ok(())
            }
            Command::Category(category) => {
                dash.set_category(category);
                Ok(())
            }
            Command::Search(query) => {
                dash.set_search(query);
                Ok(())
            }
            Command::Usage => {
                dash.render_usage();
                Ok(())
            }
            Command::Refresh => {
                dash.refresh().await;
                Ok(())
            }
            Command::Upload(path) => {
                let path = PathBuf::from(shellexpand::tilde(&path.to_string_lossy()).into_owned());
                match UploadFile::from_path(&path).await {
                    Ok(file) => dash.upload(file).await,
                    Err(err) => {
                        dash.view().message(MessageKind::Error, &err.user_message());
                        Err(err)
                    }
                }
            }
            Command::Download(name) => dash.download(&name).await.map(|_| ()),
            Command::Delete(name) => {
                if confirm(&format!("Are you sure you want to delete {name}?")).await? {
                    dash.delete(&name).await
                } else {
                    Ok(())
                }
            }
            Command::Help => {
                println!("{HELP}");
                Ok(())
            }
            Command::Logout => return Ok(SessionEnd::Logout),
            Command::Quit => return Ok(SessionEnd::Quit),
        };

        if outcome.is_err_and(|err| err.is_unauthorized()) {
            return Ok(SessionEnd::Expired);
        }
    }
}

async fn prompt_text(prompt: &str, allow_empty: bool) -> Result<String> {
    let prompt = prompt.to_string();
    tokio::task::spawn_blocking(move || {
        Input::<String>::with_theme(&ColorfulTheme::default())
            .with_prompt(prompt)
            .allow_empty(allow_empty)
            .interact_text()
    })
    .await
    .context("Prompt task failed")?
    .context("Failed to read input")
}

async fn prompt_password(prompt: &str) -> Result<String> {
    let prompt = prompt.to_string();
    tokio::task::spawn_blocking(move || {
        Password::with_theme(&ColorfulTheme::default())
            .with_prompt(prompt)
            .allow_empty_password(true)
            .interact()
    })
    .await
    .context("Prompt task failed")?
    .context("Failed to read password")
}

async fn confirm(prompt: &str) -> Result<bool> {
    let prompt = prompt.to_string();
    tokio::task::spawn_blocking(move || {
        Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt(prompt)
            .default(false)
            .interact()
    })
    .await
    .context("Prompt task failed")?
    .context("Failed to read confirmation")
}
