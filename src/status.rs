use serde_json::Value;

use crate::content::StoreError;
use crate::data::StatusService;

/// Outcome of a single health probe. No retries.
#[derive(Debug, Clone, PartialEq)]
pub enum Health {
    Up(Value),
    Down(StoreError),
}

pub fn probe(service: &dyn StatusService) -> Health {
    match service.health() {
        Ok(payload) => Health::Up(payload),
        Err(err) => Health::Down(err),
    }
}

impl Health {
    pub fn is_up(&self) -> bool {
        matches!(self, Health::Up(_))
    }

    pub fn render(&self) -> String {
        match self {
            Health::Up(payload) => {
                serde_json::to_string_pretty(payload).unwrap_or_else(|_| payload.to_string())
            }
            Health::Down(err) => format!("Backend unavailable: {err}"),
        }
    }
}
