//! Configuration validation

use crate::schema::{RawConfig, RawGameMode, RawPlayer};
use oche_util::MAX_COST_PER_ATTENDEE;
use std::collections::HashSet;
use thiserror::Error;

/// Validation error
#[derive(Debug, Clone, Error)]
pub enum ValidationError {
    #[error("Player #{index}: {message}")]
    PlayerError { index: usize, message: String },

    #[error("Duplicate player email: {0}")]
    DuplicatePlayerEmail(String),

    #[error("Game mode #{index}: {message}")]
    GameModeError { index: usize, message: String },

    #[error("Duplicate game mode name: {0}")]
    DuplicateGameMode(String),

    #[error("Training config error: {0}")]
    TrainingError(String),
}

/// Validate a raw configuration
pub fn validate_config(config: &RawConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if let Some(cost) = config.training.default_cost_per_attendee {
        if cost.is_negative() {
            errors.push(ValidationError::TrainingError(format!(
                "default_cost_per_attendee must not be negative (got {})",
                cost
            )));
        } else if cost > MAX_COST_PER_ATTENDEE {
            errors.push(ValidationError::TrainingError(format!(
                "default_cost_per_attendee must not exceed {} (got {})",
                MAX_COST_PER_ATTENDEE, cost
            )));
        }
    }

    // Emails compare case-insensitively
    let mut seen_emails = HashSet::new();
    for (index, player) in config.players.iter().enumerate() {
        errors.extend(validate_player(index, player));
        let email = player.email.trim().to_lowercase();
        if !email.is_empty() && !seen_emails.insert(email) {
            errors.push(ValidationError::DuplicatePlayerEmail(player.email.clone()));
        }
    }

    if let Some(modes) = &config.game_modes {
        let mut seen_names = HashSet::new();
        for (index, mode) in modes.iter().enumerate() {
            errors.extend(validate_game_mode(index, mode));
            let name = mode.name.trim();
            if !name.is_empty() && !seen_names.insert(name) {
                errors.push(ValidationError::DuplicateGameMode(name.to_string()));
            }
        }
    }

    errors
}

fn validate_player(index: usize, player: &RawPlayer) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if player.name.trim().is_empty() {
        errors.push(ValidationError::PlayerError {
            index,
            message: "name cannot be empty".into(),
        });
    }

    let email = player.email.trim();
    if email.is_empty() {
        errors.push(ValidationError::PlayerError {
            index,
            message: "email cannot be empty".into(),
        });
    } else if !is_plausible_email(email) {
        errors.push(ValidationError::PlayerError {
            index,
            message: format!("'{}' is not an email address", email),
        });
    }

    errors
}

fn validate_game_mode(index: usize, mode: &RawGameMode) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if mode.name.trim().is_empty() {
        errors.push(ValidationError::GameModeError {
            index,
            message: "name cannot be empty".into(),
        });
    }

    if let Some(rules) = &mode.rules
        && !rules.is_object()
    {
        errors.push(ValidationError::GameModeError {
            index,
            message: "rules must be a table".into(),
        });
    }

    errors
}

/// `local@domain` with both halves non-empty
fn is_plausible_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && !domain.is_empty() && !domain.contains('@')
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(toml_str: &str) -> RawConfig {
        toml::from_str(toml_str).unwrap()
    }

    #[test]
    fn valid_config_has_no_errors() {
        let config = parse(
            r#"
            config_version = 1

            [[players]]
            name = "Alice"
            email = "alice@example.com"

            [[players]]
            name = "Bob"
            email = "bob@example.com"
            nickname = "Bulls"
        "#,
        );
        assert!(validate_config(&config).is_empty());
    }

    #[test]
    fn duplicate_emails_detected_case_insensitively() {
        let config = parse(
            r#"
            config_version = 1

            [[players]]
            name = "Alice"
            email = "alice@example.com"

            [[players]]
            name = "Alice Again"
            email = "ALICE@example.com"
        "#,
        );
        let errors = validate_config(&config);
        assert_eq!(errors.len(), 1);
        assert!(matches!(errors[0], ValidationError::DuplicatePlayerEmail(_)));
    }

    #[test]
    fn default_cost_above_ceiling_rejected() {
        let config = parse(
            r#"
            config_version = 1

            [training]
            default_cost_per_attendee = "92233720368547758.07"
        "#,
        );
        let errors = validate_config(&config);
        assert_eq!(errors.len(), 1);
        assert!(matches!(errors[0], ValidationError::TrainingError(_)));
    }

    #[test]
    fn all_errors_are_collected() {
        let config = parse(
            r#"
            config_version = 1

            [training]
            default_cost_per_attendee = "-1.00"

            [[players]]
            name = ""
            email = "not-an-email"

            [[game_modes]]
            name = "Cricket"

            [[game_modes]]
            name = "Cricket"
            rules = 3
        "#,
        );
        let errors = validate_config(&config);

        assert!(errors.iter().any(|e| matches!(e, ValidationError::TrainingError(_))));
        assert_eq!(
            errors
                .iter()
                .filter(|e| matches!(e, ValidationError::PlayerError { index: 0, .. }))
                .count(),
            2
        );
        assert!(errors.iter().any(|e| matches!(e, ValidationError::DuplicateGameMode(_))));
        assert!(errors
            .iter()
            .any(|e| matches!(e, ValidationError::GameModeError { index: 1, .. })));
    }

    #[test]
    fn email_shapes() {
        assert!(is_plausible_email("a@b"));
        assert!(!is_plausible_email("@b"));
        assert!(!is_plausible_email("a@"));
        assert!(!is_plausible_email("a@b@c"));
        assert!(!is_plausible_email("ab"));
    }
}
