mod render;
mod sidebar;

use std::io;

use ai::{Agent, SqlAgent};
use chat::ChatSession;
use colored::Colorize;
use config::{ConfigError, Credential, SqlChatConfig};
use db::{DatabaseHandle, DbError, HandleCache};
use render::TerminalRenderer;
use sidebar::Settings;
use tracing::info;
use tracing_subscriber::EnvFilter;

enum Command {
    Ask(String),
    Clear,
    Config,
    Quit,
}

fn read_command() -> io::Result<Command> {
    let line: String = match cliclack::input("You")
        .placeholder("Ask the database... (/clear, /config, /quit)")
        .required(false)
        .interact()
    {
        Ok(line) => line,
        Err(e) if e.kind() == io::ErrorKind::Interrupted => return Ok(Command::Quit),
        Err(e) => return Err(e),
    };

    Ok(match line.trim() {
        "/clear" => Command::Clear,
        "/config" => Command::Config,
        "/quit" | "/exit" => Command::Quit,
        _ => Command::Ask(line),
    })
}

/// Credential first, database second: a missing key stops before any
/// database is touched.
async fn backend(
    settings: &Settings,
    conf: &SqlChatConfig,
    cache: &HandleCache,
) -> anyhow::Result<(DatabaseHandle, Box<dyn Agent>)> {
    let credential = Credential::resolve(settings.api_key.as_deref())?;
    let database = cache.get_or_configure(&settings.source).await?;
    let agent: Box<dyn Agent> = Box::new(SqlAgent::groq(credential, &conf.ai)?);
    Ok((database, agent))
}

#[derive(Debug, PartialEq, Eq)]
enum Severity {
    Error,
    Warning,
}

/// Incomplete MySQL details are an error; a missing key is only a warning.
fn setup_severity(err: &anyhow::Error) -> Severity {
    match err.downcast_ref::<DbError>() {
        Some(DbError::Config(ConfigError::MissingConnectionParams { .. })) => Severity::Error,
        _ => Severity::Warning,
    }
}

fn report_setup_failure(err: &anyhow::Error) -> io::Result<()> {
    match setup_severity(err) {
        Severity::Error => cliclack::log::error(format!("{err:#}")),
        Severity::Warning => cliclack::log::warning(format!("{err:#}")),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .with_target(false)
        .init();

    let conf = SqlChatConfig::get_or_default();
    let cache = HandleCache::with_ttl(conf.embedded.path.clone(), conf.cache.ttl());

    cliclack::intro("Chat with SQL DB".blue().bold())?;

    let mut settings = sidebar::prompt(None)?;
    let (database, agent) = match backend(&settings, &conf, &cache).await {
        Ok(backend) => backend,
        Err(err) => {
            report_setup_failure(&err)?;
            cliclack::outro_cancel("Fix the settings and try again.")?;
            std::process::exit(1);
        }
    };
    info!(source = settings.source.label(), "session ready");

    let renderer = TerminalRenderer { show_steps: true };
    let mut session = ChatSession::new(renderer, database, agent);

    loop {
        match read_command()? {
            Command::Ask(query) => {
                session.ask(&query).await;
            }
            Command::Clear => session.reset(),
            Command::Config => {
                let next = sidebar::prompt(Some(&settings.source))?;
                match backend(&next, &conf, &cache).await {
                    Ok((database, agent)) => {
                        session.replace_backend(database, agent);
                        settings = next;
                        cliclack::log::success(format!("Using {}", settings.source.label()))?;
                    }
                    Err(err) => {
                        cliclack::log::error(format!("{err:#}, keeping previous settings"))?;
                    }
                }
            }
            Command::Quit => break,
        }
    }

    cliclack::outro("Bye!")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::{DataSource, NetworkedParams};

    #[tokio::test]
    async fn missing_mysql_details_are_an_error() {
        let cache = HandleCache::new("unused.db");
        let settings = Settings {
            source: DataSource::Networked(NetworkedParams::default()),
            api_key: Some("gsk_test".to_string()),
        };

        let err = backend(&settings, &SqlChatConfig::default(), &cache)
            .await
            .err().unwrap();
        assert_eq!(setup_severity(&err), Severity::Error);
    }

    #[test]
    fn missing_key_is_a_warning() {
        let err = anyhow::Error::from(ConfigError::MissingCredential);
        assert_eq!(setup_severity(&err), Severity::Warning);
    }
}
