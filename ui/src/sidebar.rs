use std::io;

use config::{API_KEY_ENV, Credential, DataSource, NetworkedParams};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Choice {
    Embedded,
    Networked,
}

/// What the user picked before chatting.
#[derive(Debug)]
pub struct Settings {
    pub source: DataSource,
    /// Typed key; `None` means fall back to the environment.
    pub api_key: Option<String>,
}

fn text(prompt: &str, default: &str) -> io::Result<String> {
    let mut input = cliclack::input(prompt).required(false);
    if !default.is_empty() {
        input = input.default_input(default);
    }
    input.interact()
}

fn networked(previous: Option<&NetworkedParams>) -> io::Result<NetworkedParams> {
    let previous = previous.cloned().unwrap_or_default();
    Ok(NetworkedParams {
        host: text("MySQL Host", &previous.host)?,
        user: text("MySQL User", &previous.user)?,
        password: cliclack::password("MySQL Password").mask('▪').interact()?,
        database: text("MySQL Database", &previous.database)?,
    })
}

fn api_key() -> io::Result<Option<String>> {
    if Credential::from_env().is_some() {
        let use_env = cliclack::confirm(format!("Use {API_KEY_ENV} from the environment?"))
            .initial_value(true)
            .interact()?;
        if use_env {
            return Ok(None);
        }
    }

    match cliclack::password("Groq API Key").mask('▪').interact() {
        Ok(key) => Ok(Some(key)),
        Err(e) if e.kind() == io::ErrorKind::Interrupted => Ok(None),
        Err(e) => Err(e),
    }
}

/// Asks for the data source and API key. `previous` pre-fills the MySQL fields.
pub fn prompt(previous: Option<&DataSource>) -> io::Result<Settings> {
    let initial = match previous {
        Some(DataSource::Networked(_)) => Choice::Networked,
        _ => Choice::Embedded,
    };

    let choice = cliclack::select("Choose Database")
        .item(
            Choice::Embedded,
            DataSource::Embedded.label(),
            "read-only local file",
        )
        .item(
            Choice::Networked,
            DataSource::Networked(NetworkedParams::default()).label(),
            "host, user, password, database",
        )
        .initial_value(initial)
        .interact()?;

    let source = match choice {
        Choice::Embedded => DataSource::Embedded,
        Choice::Networked => {
            let previous = match previous {
                Some(DataSource::Networked(params)) => Some(params),
                _ => None,
            };
            DataSource::Networked(networked(previous)?)
        }
    };

    Ok(Settings {
        source,
        api_key: api_key()?,
    })
}
