use std::fmt;

use crate::ConfigError;

/// Where questions are answered from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DataSource {
    /// The local `Employee.db` file, opened read-only.
    Embedded,
    /// A MySQL server.
    Networked(NetworkedParams),
}

impl DataSource {
    pub fn label(&self) -> &'static str {
        match self {
            DataSource::Embedded => "Use SQLite 3 Database - Employee.db",
            DataSource::Networked(_) => "Connect to MySQL Database",
        }
    }
}

/// Connection details for a MySQL server. `host` may carry a port (`db.local:3307`).
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct NetworkedParams {
    pub host: String,
    pub user: String,
    pub password: String,
    pub database: String,
}

impl fmt::Debug for NetworkedParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NetworkedParams")
            .field("host", &self.host)
            .field("user", &self.user)
            .field("password", &"[REDACTED]")
            .field("database", &self.database)
            .finish()
    }
}

impl NetworkedParams {
    /// Every field must be non-empty before a connection is attempted.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let missing: Vec<&'static str> = [
            ("host", &self.host),
            ("user", &self.user),
            ("password", &self.password),
            ("database", &self.database),
        ]
        .into_iter()
        .filter(|(_, value)| value.is_empty())
        .map(|(name, _)| name)
        .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::MissingConnectionParams { missing })
        }
    }

    /// Splits `host` into name and optional port.
    pub fn host_and_port(&self) -> (&str, Option<u16>) {
        match self.host.rsplit_once(':') {
            Some((name, port)) => match port.parse() {
                Ok(port) => (name, Some(port)),
                Err(_) => (self.host.as_str(), None),
            },
            None => (self.host.as_str(), None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> NetworkedParams {
        NetworkedParams {
            host: "db.internal".to_string(),
            user: "reporter".to_string(),
            password: "hunter2".to_string(),
            database: "hr".to_string(),
        }
    }

    #[test]
    fn complete_params_validate() {
        assert!(params().validate().is_ok());
    }

    #[test]
    fn each_missing_field_is_named() {
        let mut p = params();
        p.host.clear();
        p.password.clear();

        match p.validate() {
            Err(ConfigError::MissingConnectionParams { missing }) => {
                assert_eq!(missing, vec!["host", "password"]);
            }
            other => panic!("expected missing params, got {other:?}"),
        }
    }

    #[test]
    fn whitespace_counts_as_a_value() {
        let mut p = params();
        p.password = "   ".to_string();
        assert!(p.validate().is_ok());
    }

    #[test]
    fn default_params_miss_everything() {
        let err = NetworkedParams::default().validate().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Please provide all MySQL connection details (missing: host, user, password, database)."
        );
    }

    #[test]
    fn host_port_split() {
        let mut p = params();
        assert_eq!(p.host_and_port(), ("db.internal", None));

        p.host = "db.internal:3307".to_string();
        assert_eq!(p.host_and_port(), ("db.internal", Some(3307)));

        p.host = "weird:host".to_string();
        assert_eq!(p.host_and_port(), ("weird:host", None));
    }

    #[test]
    fn debug_redacts_password() {
        let rendered = format!("{:?}", DataSource::Networked(params()));
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("[REDACTED]"));
    }
}
