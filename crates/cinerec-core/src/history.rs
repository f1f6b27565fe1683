//! Transaction and prediction history listings

use serde_json::Value;

use crate::api::display_value;
use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HistoryKind {
    #[default]
    Transactions,
    Predictions,
}

impl HistoryKind {
    pub fn title(&self) -> &'static str {
        match self {
            HistoryKind::Transactions => "Transactions",
            HistoryKind::Predictions => "Predictions",
        }
    }

    pub fn toggle(self) -> Self {
        match self {
            HistoryKind::Transactions => HistoryKind::Predictions,
            HistoryKind::Predictions => HistoryKind::Transactions,
        }
    }
}

/// One line of a history table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryRow {
    pub timestamp: String,
    /// Transaction type or the prompt of a prediction
    pub label: String,
    /// Signed amount; predictions show their cost as a debit
    pub amount: String,
}

/// Parse a history response body. Non-array documents yield no rows.
pub fn parse_history(kind: HistoryKind, body: &str) -> Result<Vec<HistoryRow>> {
    let value: Value = serde_json::from_str(body)?;
    let Value::Array(items) = value else {
        return Ok(Vec::new());
    };

    Ok(items.iter().map(|item| row(kind, item)).collect())
}

fn row(kind: HistoryKind, item: &Value) -> HistoryRow {
    let text = |key: &str| item.get(key).and_then(display_value).unwrap_or_default();

    match kind {
        HistoryKind::Transactions => HistoryRow {
            timestamp: text("timestamp"),
            label: text("type"),
            amount: signed(item.get("amount")),
        },
        HistoryKind::Predictions => HistoryRow {
            timestamp: text("timestamp"),
            label: text("input_text"),
            amount: item
                .get("cost")
                .and_then(Value::as_f64)
                .map(|cost| signed_number(-cost))
                .unwrap_or_default(),
        },
    }
}

fn signed(amount: Option<&Value>) -> String {
    match amount {
        Some(value) => match value.as_f64() {
            Some(number) => signed_number(number),
            None => display_value(value).unwrap_or_default(),
        },
        None => String::new(),
    }
}

fn signed_number(number: f64) -> String {
    if number > 0.0 {
        format!("+{}", number)
    } else if number == 0.0 {
        // no "-0"
        "0".to_string()
    } else {
        number.to_string()
    }
}
