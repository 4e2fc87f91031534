use std::io::Write;

use pagekit::{Error, FailureReason, Framework, IncludeReport};

use crate::cli::{CacheCommand, Command, NocacheCommand};
use crate::error::CliError;

/// Execute `command` against `fw`, writing results to `out`.
pub async fn run(command: Command, fw: &Framework, out: &mut impl Write) -> Result<(), CliError> {
    match command {
        Command::Fetch { url, no_cache } => {
            let content = fw.load_file(&url, !no_cache).await.map_err(Error::from)?;
            writeln!(out, "{}", content)?;
        }
        Command::Include { modules } => {
            fw.startup();
            match fw.include(modules.as_str()).await {
                Ok(report) => write_report(out, &report)?,
                Err(Error::Include(report)) => {
                    write_report(out, &report)?;
                    return Err(Error::Include(report).into());
                }
                Err(error) => return Err(error.into()),
            }
        }
        Command::Cache(command) => cache(command, fw, out).await?,
        Command::Nocache(NocacheCommand::Show) => {
            writeln!(out, "{}", fw.no_cache().await?)?;
        }
        Command::Nocache(NocacheCommand::Set { modules }) => {
            fw.set_no_cache(modules.as_str()).await?;
        }
    }
    Ok(())
}

async fn cache(command: CacheCommand, fw: &Framework, out: &mut impl Write) -> Result<(), CliError> {
    let cache = fw.file_cache();
    match command {
        CacheCommand::List => {
            cache.open().await?;
            for (name, entry) in cache.dir() {
                writeln!(
                    out,
                    "{}\t{}\t{}",
                    name,
                    entry.added.to_rfc3339(),
                    entry.last_loaded.to_rfc3339()
                )?;
            }
        }
        CacheCommand::Show { name } => {
            writeln!(out, "{}", cache.load(&name).await?)?;
        }
        CacheCommand::Rm { name } => {
            cache.delete(&name).await?;
        }
        CacheCommand::Clear => {
            cache.clear().await?;
        }
    }
    Ok(())
}

fn write_report(out: &mut impl Write, report: &IncludeReport) -> std::io::Result<()> {
    for url in &report.loaded {
        writeln!(out, "loaded\t{}", url)?;
    }
    for failed in &report.failed {
        let reason = match &failed.reason {
            FailureReason::UnknownModule => "unknown module".to_string(),
            FailureReason::Load(error) => error.to_string(),
        };
        writeln!(
            out,
            "failed\t{}\t{}\t{}",
            failed.name,
            failed.url.as_deref().unwrap_or("-"),
            reason
        )?;
    }
    Ok(())
}
