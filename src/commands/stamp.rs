use crate::clock::{Clock, SystemClock};
use crate::error::AppError;
use crate::source;
use crate::token::{is_valid_meta_content, VersionToken};
use clap::Args;
use std::fs;
use std::path::PathBuf;

/// Inject a build version into an entry document template.
#[derive(Debug, Args)]
pub struct StampArgs {
    /// Entry document to rewrite in place
    #[arg(long)]
    pub html: PathBuf,
    /// Use this exact token
    #[arg(long, conflicts_with = "commit")]
    pub token: Option<String>,
    /// Build a `{timestamp}-{short hash}` token from this commit
    #[arg(long)]
    pub commit: Option<String>,
}

pub fn stamp(args: &StampArgs, clock: &dyn Clock) -> Result<VersionToken, AppError> {
    let token = match (&args.token, &args.commit) {
        (Some(token), _) => {
            // the token ends up in the live meta tag, so it must pass that check
            if !is_valid_meta_content(token) {
                return Err(AppError::Config(format!(
                    "Refusing to stamp placeholder token {token:?}"
                )));
            }
            VersionToken::new(token.trim())
        }
        (None, Some(commit)) if !commit.trim().is_empty() => {
            VersionToken::deterministic(clock.now_millis(), commit)
        }
        _ => {
            tracing::info!("No commit metadata, stamping a fallback token");
            VersionToken::fallback(clock.now_millis(), false)
        }
    };

    let html = fs::read_to_string(&args.html)?;
    let stamped = source::stamp_html(&html, &token)?;
    fs::write(&args.html, stamped)?;
    tracing::info!("Stamped {} with {token}", args.html.display());
    Ok(token)
}

pub fn execute(args: StampArgs) -> Result<(), AppError> {
    let token = stamp(&args, &SystemClock)?;
    println!("{token}");
    Ok(())
}
