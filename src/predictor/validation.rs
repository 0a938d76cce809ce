//! Request validation.
//!
//! Checks run in a fixed order and stop at the first violation, so a request
//! with several problems always reports the same one.

use super::error::{ValidationError, ValidationField};
use super::models::{PredictionRequest, Surface};

const NAME_MIN_CHARS: usize = 2;
const NAME_MAX_CHARS: usize = 100;
const TOURNAMENT_MAX_CHARS: usize = 100;

/// Error for a request that is absent altogether (a JSON `null` body).
/// This is the first check; it lives at the deserialization boundary since a
/// `&PredictionRequest` can never be null.
pub fn missing_request() -> ValidationError {
    ValidationError::new(ValidationField::Request, "Prediction request cannot be null")
}

/// Validate a prediction request and return its parsed surface.
pub fn validate(request: &PredictionRequest) -> Result<Surface, ValidationError> {
    validate_player_name(&request.player1_name, "Player 1", ValidationField::Player1Name)?;
    validate_player_name(&request.player2_name, "Player 2", ValidationField::Player2Name)?;
    let surface = validate_surface(&request.surface)?;
    validate_tournament(&request.tournament)?;

    if request.player1_name.to_lowercase() == request.player2_name.to_lowercase() {
        return Err(ValidationError::new(
            ValidationField::Players,
            "Players cannot be the same",
        ));
    }
    Ok(surface)
}

fn validate_player_name(
    name: &str,
    label: &str,
    field: ValidationField,
) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        return Err(ValidationError::new(field, format!("{} name cannot be empty", label)));
    }

    let len = name.chars().count();
    if !(NAME_MIN_CHARS..=NAME_MAX_CHARS).contains(&len) {
        return Err(ValidationError::new(
            field,
            format!(
                "{} name must be between {} and {} characters",
                label, NAME_MIN_CHARS, NAME_MAX_CHARS
            ),
        ));
    }

    if !name.chars().all(is_name_char) {
        return Err(ValidationError::new(
            field,
            format!("{} name contains invalid characters", label),
        ));
    }
    Ok(())
}

/// ASCII letters, `'`, `-` and the six ASCII whitespace characters,
/// vertical tab included.
fn is_name_char(c: char) -> bool {
    c.is_ascii_alphabetic()
        || matches!(c, ' ' | '\t' | '\n' | '\x0B' | '\x0C' | '\r' | '\'' | '-')
}

fn validate_surface(surface: &str) -> Result<Surface, ValidationError> {
    if surface.trim().is_empty() {
        return Err(ValidationError::new(
            ValidationField::Surface,
            "Surface cannot be empty",
        ));
    }

    surface.parse::<Surface>().map_err(|_| {
        let options: Vec<&str> = Surface::ALL.iter().map(Surface::as_str).collect();
        ValidationError::new(
            ValidationField::Surface,
            format!("Invalid surface. Valid options: {}", options.join(", ")),
        )
    })
}

fn validate_tournament(tournament: &str) -> Result<(), ValidationError> {
    if tournament.trim().is_empty() {
        return Err(ValidationError::new(
            ValidationField::Tournament,
            "Tournament cannot be empty",
        ));
    }

    if tournament.chars().count() > TOURNAMENT_MAX_CHARS {
        return Err(ValidationError::new(
            ValidationField::Tournament,
            format!(
                "Tournament name must not exceed {} characters",
                TOURNAMENT_MAX_CHARS
            ),
        ));
    }
    Ok(())
}
