//! Configuration commands.

use duetrack_core::StoreFormat;

use super::Context;
use crate::config::{ClientConfig, resolve_setting};
use crate::error::{ClientError, ClientResult};
use crate::secret;

/// The configuration as TOML, with a plain-text password redacted.
pub fn to_toml(config: &ClientConfig) -> ClientResult<String> {
    toml::to_string_pretty(&config.redacted())
        .map_err(|e| ClientError::Config(format!("failed to serialize config: {e}")))
}

/// Dump the current configuration to stdout.
pub fn dump(config: &ClientConfig) -> ClientResult<()> {
    let toml_str = to_toml(config)?;
    println!("# config.toml ({})", ClientConfig::default_path().display());
    println!("{toml_str}");
    Ok(())
}

/// Checks the configuration, returning one line per verified item.
pub fn check(ctx: &Context) -> ClientResult<Vec<String>> {
    let mut checked = Vec::new();
    let portal = &ctx.config.portal;

    if portal.base_url.is_some() {
        let config = portal.to_portal_config().map_err(ClientError::Config)?;
        checked.push(format!(
            "portal: {} (semester {})",
            config.base_url, config.semester_prefix
        ));
    }

    for (field, value) in [("user_id", &portal.user_id), ("password", &portal.password)] {
        if let Some(value) = value.as_deref().filter(|v| secret::is_reference(v)) {
            resolve_setting(field, value)?;
            checked.push(format!("{field}: reference resolves"));
        }
    }

    match StoreFormat::from_path(&ctx.data_file)? {
        StoreFormat::Ics => {
            return Err(ClientError::Config(format!(
                "data file {} must be .json or .csv",
                ctx.data_file.display()
            )));
        }
        format => checked.push(format!("data file: {} ({format})", ctx.data_file.display())),
    }
    Ok(checked)
}

/// Validate the configuration.
pub fn validate(ctx: &Context) -> ClientResult<()> {
    for line in check(ctx)? {
        println!("{line}");
    }
    println!("Configuration is valid.");
    Ok(())
}

/// Show the configuration file path.
pub fn path() -> ClientResult<()> {
    println!("config: {}", ClientConfig::default_path().display());
    println!("data:   {}", ClientConfig::default_data_dir().display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use duetrack_core::{FormatOptions, OutputFormat};

    fn context(config: ClientConfig, data_file: &str) -> Context {
        Context {
            config,
            data_file: data_file.into(),
            format: OutputFormat::Tty,
            options: FormatOptions::default(),
        }
    }

    #[test]
    fn default_config_is_valid() {
        let lines = check(&context(ClientConfig::default(), "deadlines.json")).unwrap();
        assert_eq!(lines, ["data file: deadlines.json (json)"]);
    }

    #[test]
    fn calendar_data_file_is_rejected() {
        assert!(matches!(
            check(&context(ClientConfig::default(), "deadlines.ics")),
            Err(ClientError::Config(_))
        ));
        assert!(matches!(
            check(&context(ClientConfig::default(), "deadlines.txt")),
            Err(ClientError::Store(_))
        ));
    }

    #[test]
    fn unresolvable_password_is_reported() {
        let mut config = ClientConfig::default();
        config.portal.base_url = Some("https://portal.example.edu".into());
        config.portal.password = Some("env::_DUETRACK_VALIDATE_UNSET_4711".into());
        let err = check(&context(config, "deadlines.csv")).unwrap_err();
        assert!(
            matches!(err, ClientError::Secret { field: "password", .. }),
            "{err}"
        );
        assert!(err.to_string().contains("failed to resolve password"), "{err}");
    }

    #[test]
    fn config_dumps_as_toml() {
        let mut config = ClientConfig::default();
        config.ignored_courses.push("Calculus II".into());
        let text = to_toml(&config).unwrap();
        let back: ClientConfig = toml::from_str(&text).unwrap();
        assert_eq!(back.ignored_courses, ["Calculus II"]);
    }

    #[test]
    fn dump_never_shows_a_plain_password() {
        let mut config = ClientConfig::default();
        config.portal.user_id = Some("student".into());
        config.portal.password = Some("hunter2".into());
        let text = to_toml(&config).unwrap();
        assert!(!text.contains("hunter2"), "{text}");
        assert!(text.contains("password = \"<redacted>\""), "{text}");
        assert!(text.contains("user_id = \"student\""), "{text}");
    }
}
