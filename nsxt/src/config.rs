//! Provider configuration resolution
//!
//! Each setting comes from the provider block, then the matching environment
//! variable, then a built-in default. Falling back to a default is allowed
//! but always produces a warning.

use secrecy::SecretString;
use tfplug::types::{AttributePath, Diagnostic, Dynamic, DynamicValue};

pub const ENV_INSECURE: &str = "NSXT_INSECURE";
pub const ENV_HOSTNAME: &str = "NSXT_HOSTNAME";
pub const ENV_USERNAME: &str = "NSXT_USERNAME";
pub const ENV_PASSWORD: &str = "NSXT_PASSWORD";

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_USERNAME: &str = "admin";
pub const DEFAULT_PASSWORD: &str = "password";

#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub host: String,
    pub username: String,
    pub password: SecretString,
    pub insecure: bool,
}

/// Result of resolution: the config plus any warnings about defaults
pub struct ResolvedConfig {
    pub config: ProviderConfig,
    pub diagnostics: Vec<Diagnostic>,
}

impl ProviderConfig {
    /// Resolve against the process environment
    pub fn from_env(config: &DynamicValue) -> Result<ResolvedConfig, Vec<Diagnostic>> {
        Self::resolve(config, |name| std::env::var(name).ok())
    }

    /// Resolve `config` using `env` for environment lookups. On failure every
    /// diagnostic gathered so far is returned, warnings included.
    pub fn resolve<F>(config: &DynamicValue, env: F) -> Result<ResolvedConfig, Vec<Diagnostic>>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut diagnostics = vec![];

        for name in ["insecure", "host", "username", "password"] {
            if matches!(config.get(&AttributePath::new(name)), Ok(Dynamic::Unknown)) {
                diagnostics.push(
                    Diagnostic::error(
                        format!("Unknown NSX-T {}", name),
                        format!(
                            "The provider cannot create the NSX-T API client as there is an unknown configuration value for {}. \
                             Set the value statically in the configuration, or use the environment variable.",
                            name
                        ),
                    )
                    .with_attribute(AttributePath::new(name)),
                );
            }
        }
        if !diagnostics.is_empty() {
            return Err(diagnostics);
        }

        let insecure = match config.get(&AttributePath::new("insecure")) {
            Ok(Dynamic::Bool(value)) => Some(*value),
            _ => match env(ENV_INSECURE).filter(|v| !v.trim().is_empty()) {
                Some(raw) => match parse_bool(&raw) {
                    Some(value) => Some(value),
                    None => {
                        diagnostics.push(
                            Diagnostic::error(
                                "Invalid NSX-T insecure value",
                                format!("{} must be true or false, got {:?}", ENV_INSECURE, raw),
                            )
                            .with_attribute(AttributePath::new("insecure")),
                        );
                        return Err(diagnostics);
                    }
                },
                None => None,
            },
        };
        let insecure = insecure.unwrap_or_else(|| {
            diagnostics.push(default_warning("insecure", "Insecure", "false", ENV_INSECURE));
            false
        });

        let host = string_setting(config, &env, "host", ENV_HOSTNAME).unwrap_or_else(|| {
            diagnostics.push(default_warning("host", "Hostname", DEFAULT_HOST, ENV_HOSTNAME));
            DEFAULT_HOST.to_string()
        });

        let username = string_setting(config, &env, "username", ENV_USERNAME).unwrap_or_else(|| {
            diagnostics.push(default_warning(
                "username",
                "Username",
                DEFAULT_USERNAME,
                ENV_USERNAME,
            ));
            DEFAULT_USERNAME.to_string()
        });

        let password = string_setting(config, &env, "password", ENV_PASSWORD).unwrap_or_else(|| {
            diagnostics.push(default_warning(
                "password",
                "Password",
                DEFAULT_PASSWORD,
                ENV_PASSWORD,
            ));
            DEFAULT_PASSWORD.to_string()
        });

        Ok(ResolvedConfig {
            config: ProviderConfig {
                host,
                username,
                password: SecretString::from(password),
                insecure,
            },
            diagnostics,
        })
    }
}

/// Explicit value if set, else the environment. Empty strings count as unset.
fn string_setting<F>(config: &DynamicValue, env: &F, name: &str, env_name: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    let explicit = match config.get(&AttributePath::new(name)) {
        Ok(Dynamic::String(value)) => Some(value.clone()),
        _ => None,
    };

    explicit
        .or_else(|| env(env_name))
        .filter(|value| !value.trim().is_empty())
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" => Some(true),
        "false" | "0" => Some(false),
        _ => None,
    }
}

fn default_warning(attribute: &str, label: &str, default: &str, env_name: &str) -> Diagnostic {
    Diagnostic::warning(
        format!(
            "Missing NSX-T Manager API {} (using default value: {})",
            label, default
        ),
        format!(
            "The provider is using a default value as there is a missing or empty value for the NSX-T Manager API {}. \
             Set the {} value in the configuration or use the {} environment variable.",
            attribute, attribute, env_name
        ),
    )
    .with_attribute(AttributePath::new(attribute))
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use std::collections::HashMap;
    use tfplug::DiagnosticsExt;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn defaults_produce_one_warning_each() {
        let resolved = ProviderConfig::resolve(&DynamicValue::object(), env_from(&[])).unwrap();

        assert_eq!(resolved.config.host, "127.0.0.1");
        assert_eq!(resolved.config.username, "admin");
        assert_eq!(resolved.config.password.expose_secret(), "password");
        assert!(!resolved.config.insecure);
        assert_eq!(resolved.diagnostics.len(), 4);
        assert!(!resolved.diagnostics.has_errors());
    }

    #[test]
    fn explicit_config_overrides_environment() {
        let mut config = DynamicValue::object();
        config
            .set_string(&AttributePath::new("host"), "nsx.example.com".to_string())
            .unwrap();
        config
            .set_string(&AttributePath::new("username"), "ops".to_string())
            .unwrap();
        config
            .set_string(&AttributePath::new("password"), "pw".to_string())
            .unwrap();
        config.set_bool(&AttributePath::new("insecure"), true).unwrap();

        let env = env_from(&[
            (ENV_HOSTNAME, "env-host"),
            (ENV_USERNAME, "env-user"),
            (ENV_PASSWORD, "env-pw"),
            (ENV_INSECURE, "false"),
        ]);
        let resolved = ProviderConfig::resolve(&config, env).unwrap();

        assert_eq!(resolved.config.host, "nsx.example.com");
        assert_eq!(resolved.config.username, "ops");
        assert_eq!(resolved.config.password.expose_secret(), "pw");
        assert!(resolved.config.insecure);
        assert!(resolved.diagnostics.is_empty());
    }

    #[test]
    fn environment_fills_unset_values() {
        let env = env_from(&[
            (ENV_HOSTNAME, "10.1.1.1"),
            (ENV_USERNAME, "env-user"),
            (ENV_PASSWORD, "env-pw"),
            (ENV_INSECURE, "TRUE"),
        ]);
        let resolved = ProviderConfig::resolve(&DynamicValue::object(), env).unwrap();

        assert_eq!(resolved.config.host, "10.1.1.1");
        assert_eq!(resolved.config.username, "env-user");
        assert!(resolved.config.insecure);
        assert!(resolved.diagnostics.is_empty());
    }

    #[test]
    fn empty_values_fall_back_to_defaults() {
        let mut config = DynamicValue::object();
        config
            .set_string(&AttributePath::new("host"), String::new())
            .unwrap();

        let resolved = ProviderConfig::resolve(&config, env_from(&[(ENV_USERNAME, "")])).unwrap();

        assert_eq!(resolved.config.host, DEFAULT_HOST);
        assert_eq!(resolved.config.username, DEFAULT_USERNAME);
        let host_warning = resolved
            .diagnostics
            .iter()
            .find(|d| d.attribute == Some(AttributePath::new("host")))
            .unwrap();
        assert!(host_warning.summary.contains("127.0.0.1"));
    }

    #[test]
    fn unparseable_insecure_is_an_error() {
        let result = ProviderConfig::resolve(
            &DynamicValue::object(),
            env_from(&[(ENV_INSECURE, "maybe")]),
        );

        let diags = match result {
            Err(diags) => diags,
            Ok(_) => panic!("expected an error"),
        };
        assert!(diags.has_errors());
        assert_eq!(diags[0].summary, "Invalid NSX-T insecure value");
    }

    #[test]
    fn unknown_values_are_errors() {
        let mut config = DynamicValue::object();
        config
            .set_value(&AttributePath::new("host"), Dynamic::Unknown)
            .unwrap();

        let result = ProviderConfig::resolve(&config, env_from(&[]));

        let diags = match result {
            Err(diags) => diags,
            Ok(_) => panic!("expected an error"),
        };
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].summary, "Unknown NSX-T host");
    }
}
