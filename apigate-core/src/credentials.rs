//! Resolution of the operator's username and password.

use crate::error::ImportError;
use crate::model::{Credentials, TokenConfig};
use crate::prompt::Prompter;
use crate::secret::Secret;

/// Result of credential resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialResolution {
    pub credentials: Credentials,

    /// Set when the username had to be prompted for.
    pub needs_persist: bool,
}

/// Resolve the operator's credentials.
///
/// The configured username wins over `--username`; when neither is present
/// the operator is asked. The password comes from `--password` or a masked
/// prompt, asked a second time if the first answer is empty. The password is
/// never written anywhere; it only unlocks and re-seals stored secrets.
///
/// # Errors
///
/// Returns [`ImportError::Usage`] if the operator enters an empty username,
/// or an empty password twice.
pub fn resolve_credentials(
    config: &TokenConfig,
    cli_username: Option<&str>,
    cli_password: Option<&str>,
    prompter: &dyn Prompter,
) -> Result<CredentialResolution, ImportError> {
    let mut needs_persist = false;

    let username = if !config.username.is_empty() {
        config.username.clone()
    } else if let Some(username) = cli_username.filter(|u| !u.is_empty()) {
        username.to_string()
    } else {
        needs_persist = true;
        let entered = prompter.read_line("Enter Username: ")?;
        let entered = entered.trim();
        if entered.is_empty() {
            return Err(ImportError::usage("Import failed: empty username."));
        }
        entered.to_string()
    };

    let password = match cli_password.filter(|p| !p.is_empty()) {
        Some(password) => Secret::new(password),
        None => {
            let first = Secret::new(prompter.read_password(&format!("Enter Password for {}: ", username))?);
            if !first.expose().trim().is_empty() {
                first
            } else {
                let second = Secret::new(prompter.read_password(&format!(
                    "Password can't be empty; enter password for {}: ",
                    username
                ))?);
                if second.expose().trim().is_empty() {
                    return Err(ImportError::usage("Import failed: empty password."));
                }
                second
            }
        }
    };

    tracing::debug!("Resolved credentials for user {}", username);

    Ok(CredentialResolution {
        credentials: Credentials { username, password },
        needs_persist,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompt::ScriptedPrompter;

    fn config_with_user(username: &str) -> TokenConfig {
        TokenConfig {
            username: username.to_string(),
            ..TokenConfig::default()
        }
    }

    #[test]
    fn test_configured_username_wins_over_flag() {
        let prompter = ScriptedPrompter::new(Vec::<String>::new());
        let resolution =
            resolve_credentials(&config_with_user("admin"), Some("other"), Some("pw"), &prompter)
                .unwrap();

        assert_eq!(resolution.credentials.username, "admin");
        assert_eq!(resolution.credentials.password.expose(), "pw");
        assert!(!resolution.needs_persist);
        assert!(prompter.transcript().is_empty());
    }

    #[test]
    fn test_flag_username_used_when_not_configured() {
        let prompter = ScriptedPrompter::new(Vec::<String>::new());
        let resolution =
            resolve_credentials(&TokenConfig::default(), Some("cli-user"), Some("pw"), &prompter)
                .unwrap();

        assert_eq!(resolution.credentials.username, "cli-user");
        assert!(!resolution.needs_persist);
    }

    #[test]
    fn test_prompted_username_requires_persist() {
        let prompter = ScriptedPrompter::new([" prompted ", "secret"]);
        let resolution = resolve_credentials(&TokenConfig::default(), None, None, &prompter).unwrap();

        assert_eq!(resolution.credentials.username, "prompted");
        assert_eq!(resolution.credentials.password.expose(), "secret");
        assert!(resolution.needs_persist);
        assert_eq!(
            prompter.transcript(),
            vec!["Enter Username: ", "Enter Password for prompted: "]
        );
    }

    #[test]
    fn test_empty_username_is_usage_error() {
        let prompter = ScriptedPrompter::new(["   "]);
        let result = resolve_credentials(&TokenConfig::default(), None, Some("pw"), &prompter);
        assert!(matches!(result, Err(ImportError::Usage { .. })));
    }

    #[test]
    fn test_empty_password_is_asked_again() {
        let prompter = ScriptedPrompter::new(["", "second-try"]);
        let resolution =
            resolve_credentials(&config_with_user("admin"), None, None, &prompter).unwrap();

        assert_eq!(resolution.credentials.password.expose(), "second-try");
        assert_eq!(
            prompter.transcript()[1],
            "Password can't be empty; enter password for admin: "
        );
    }

    #[test]
    fn test_empty_password_twice_is_usage_error() {
        let prompter = ScriptedPrompter::new(["", " "]);
        let result = resolve_credentials(&config_with_user("admin"), None, None, &prompter);
        assert!(matches!(result, Err(ImportError::Usage { .. })));
        assert_eq!(prompter.remaining(), 0);
    }
}
