use crate::error::LedgerError;
use crate::models::ledger::ScoreInput;

const MAX_PLAYER_NAME_LEN: usize = 32;

/// Trims and upper-cases a callsign. Empty names are rejected.
pub fn validate_player_name(name: &str) -> Result<String, LedgerError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(LedgerError::Validation("Player name is required".into()));
    }
    Ok(trimmed
        .chars()
        .take(MAX_PLAYER_NAME_LEN)
        .flat_map(char::to_uppercase)
        .collect())
}

pub fn validate_score(score: i64) -> Result<u64, LedgerError> {
    u64::try_from(score).map_err(|_| LedgerError::Validation("Score cannot be negative".into()))
}

/// Converts form or JSON input into a raw score; range checks happen in
/// [`validate_score`].
pub fn parse_score(input: &ScoreInput) -> Result<i64, LedgerError> {
    match input {
        ScoreInput::Number(n) => Ok(*n),
        ScoreInput::Text(text) => text
            .trim()
            .parse()
            .map_err(|_| LedgerError::Validation(format!("Score is not a number: {}", text))),
    }
}
