use crate::diagnostics::VersionDiagnostics;
use crate::document::HtmlDocument;
use crate::error::AppError;
use crate::token::BuildVersionStamp;
use clap::Args;
use std::path::PathBuf;

/// Print what this build and its entry document report as their version.
#[derive(Debug, Args)]
pub struct DiagnoseArgs {
    #[arg(long)]
    pub html: PathBuf,
}

pub fn execute(args: DiagnoseArgs) -> Result<(), AppError> {
    let document = HtmlDocument::open(&args.html)?;
    let diagnostics = VersionDiagnostics::collect(BuildVersionStamp::compiled(), &document);
    println!("{}", serde_json::to_string_pretty(&diagnostics)?);
    Ok(())
}
