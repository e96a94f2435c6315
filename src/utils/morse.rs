// src/utils/morse.rs
//! Converts a message into on/off signal durations and plays them through a timer.
//!
//! Durations are measured in units: a dot is one unit and a dash three. Signal
//! elements of a letter are separated by one unit, letters by three and words
//! by seven.
use std::collections::HashMap;
use std::time::Duration;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use thiserror::Error;
use tracing::{debug, trace};

pub const DOT: u32 = 1;
pub const DASH: u32 = 3;
pub const SYMBOL_GAP: u32 = 1;
pub const LETTER_GAP: u32 = 3;
pub const WORD_GAP: u32 = 7;

static INTERNATIONAL_CODES: Lazy<HashMap<char, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ('A', ".-"), ('B', "-..."), ('C', "-.-."), ('D', "-.."), ('E', "."),
        ('F', "..-."), ('G', "--."), ('H', "...."), ('I', ".."), ('J', ".---"),
        ('K', "-.-"), ('L', ".-.."), ('M', "--"), ('N', "-."), ('O', "---"),
        ('P', ".--."), ('Q', "--.-"), ('R', ".-."), ('S', "..."), ('T', "-"),
        ('U', "..-"), ('V', "...-"), ('W', ".--"), ('X', "-..-"), ('Y', "-.--"),
        ('Z', "--.."),
        ('0', "-----"), ('1', ".----"), ('2', "..---"), ('3', "...--"), ('4', "....-"),
        ('5', "....."), ('6', "-...."), ('7', "--..."), ('8', "---.."), ('9', "----."),
    ])
});

/// ITU code table for letters and digits
pub fn international_codes() -> &'static HashMap<char, &'static str> {
    &INTERNATIONAL_CODES
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum MorseError {
    #[error("No code for character {0:?}")]
    UnknownCharacter(char),

    #[error("Empty code for character {0:?}")]
    EmptyCode(char),

    #[error("Invalid symbol {symbol:?} in code for {character:?}")]
    InvalidCode {
        character: char,
        symbol: char,
    },
}

/// Source of delays between toggles
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Timer: Send + Sync {
    async fn wait(&self, units: u32);
}

/// [`Timer`] backed by `tokio::time::sleep`
#[derive(Debug, Clone, Copy)]
pub struct TokioTimer {
    unit: Duration,
}

impl TokioTimer {
    pub fn new(unit: Duration) -> Self {
        Self { unit }
    }
}

#[async_trait]
impl Timer for TokioTimer {
    async fn wait(&self, units: u32) {
        tokio::time::sleep(self.unit * units).await;
    }
}

fn lookup<S: AsRef<str>>(codes: &HashMap<char, S>, character: char) -> Option<&str> {
    codes
        .get(&character)
        .or_else(|| codes.get(&character.to_ascii_uppercase()))
        .or_else(|| codes.get(&character.to_ascii_lowercase()))
        .map(|code| code.as_ref())
}

/// Encode `message` into alternating on/off durations, starting with "on".
///
/// Whitespace separates words; runs of it count as a single word gap.
pub fn encode<S: AsRef<str>>(message: &str, codes: &HashMap<char, S>) -> Result<Vec<u32>, MorseError> {
    let mut durations = Vec::new();

    for (word_index, word) in message.split_whitespace().enumerate() {
        if word_index > 0 {
            durations.push(WORD_GAP);
        }

        for (char_index, character) in word.chars().enumerate() {
            if char_index > 0 {
                durations.push(LETTER_GAP);
            }

            let code = lookup(codes, character).ok_or(MorseError::UnknownCharacter(character))?;
            if code.is_empty() {
                return Err(MorseError::EmptyCode(character));
            }

            for (symbol_index, symbol) in code.chars().enumerate() {
                if symbol_index > 0 {
                    durations.push(SYMBOL_GAP);
                }
                durations.push(match symbol {
                    '.' => DOT,
                    '-' => DASH,
                    symbol => return Err(MorseError::InvalidCode { character, symbol }),
                });
            }
        }
    }

    Ok(durations)
}

/// Drive `toggle` through `durations`.
///
/// The signal is toggled before each duration and once after the last, so it
/// ends in the state it started in. Returns the number of toggles issued. An
/// empty sequence issues no toggles at all.
pub async fn transmit<T, G>(durations: &[u32], timer: &T, mut toggle: G) -> usize
where
    T: Timer + ?Sized,
    G: FnMut(),
{
    if durations.is_empty() {
        return 0;
    }

    for &units in durations {
        toggle();
        trace!("Holding signal for {} units", units);
        timer.wait(units).await;
    }
    toggle();

    durations.len() + 1
}

/// Encode and transmit `message` in one go
pub async fn transmit_message<S, T, G>(
    message: &str,
    codes: &HashMap<char, S>,
    timer: &T,
    toggle: G,
) -> Result<usize, MorseError>
where
    S: AsRef<str>,
    T: Timer + ?Sized,
    G: FnMut(),
{
    let durations = encode(message, codes)?;
    debug!("Transmitting {:?} as {} signal segments", message, durations.len());
    Ok(transmit(&durations, timer, toggle).await)
}
