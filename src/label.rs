//! Derivation of the `gol_primera_mitad` label from the goal-minute lists of a match.
//!
//! A goal-minute list is a dot-delimited sequence of tokens, e.g., `"10.50.-"`. Each token is
//! either a minute or the terminator `-`, which marks that no further goals were scored.

use thiserror::Error;

/// Separator between the tokens of a goal-minute list.
pub const MINUTE_DELIMITER: char = '.';

/// Token signalling the end of the scored goals.
pub const TERMINATOR: &str = "-";

/// The last minute (inclusive) that counts as the first half.
pub const FIRST_HALF_MINUTES: i32 = 45;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LabelError {
    #[error("invalid goal minute '{token}'")]
    InvalidMinute { token: String },
}

/// Splits a raw goal-minute cell into its tokens. A blank cell has no tokens.
pub fn split_minutes(raw: &str) -> Vec<&str> {
    let raw = raw.trim();
    if raw.is_empty() {
        return vec![];
    }
    raw.split(MINUTE_DELIMITER).collect()
}

/// Determines whether the given goal-minute tokens contain a first-half goal.
///
/// Tokens are scanned in order. The terminator ends the scan with `false`; a minute at or
/// before [`FIRST_HALF_MINUTES`] ends it with `true`. Tokens past the deciding one are not
/// inspected, so a malformed token only fails the scan if it is reached.
pub fn first_half_goal<S: AsRef<str>>(tokens: &[S]) -> Result<bool, LabelError> {
    for token in tokens {
        let token = token.as_ref().trim();
        if token == TERMINATOR {
            return Ok(false);
        }
        let minute = token
            .parse::<i32>()
            .map_err(|_| LabelError::InvalidMinute {
                token: token.to_string(),
            })?;
        if minute <= FIRST_HALF_MINUTES {
            return Ok(true);
        }
    }
    Ok(false)
}

/// First-half goal flags for both sides of a match, and the combined label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HalfTimeLabel {
    pub home: bool,
    pub away: bool,
}
impl HalfTimeLabel {
    pub fn derive(home_minutes: &str, away_minutes: &str) -> Result<Self, LabelError> {
        let home = first_half_goal(&split_minutes(home_minutes))?;
        let away = first_half_goal(&split_minutes(away_minutes))?;
        Ok(Self { home, away })
    }

    pub fn any(&self) -> bool {
        self.home || self.away
    }

    /// The label as an integer: 1 if either side scored in the first half, 0 otherwise.
    pub fn value(&self) -> u8 {
        u8::from(self.any())
    }
}
