use bigdecimal::BigDecimal;
use serde_json::Value;
use std::str::FromStr;

pub fn error_chain_fmt(
    e: &impl std::error::Error,
    f: &mut std::fmt::Formatter<'_>,
) -> std::fmt::Result {
    writeln!(f, "{}\n", e)?;
    let mut current = e.source();
    while let Some(cause) = current {
        writeln!(f, "Caused by:\n\t{}", cause)?;
        current = cause.source();
    }
    Ok(())
}

/// Lenient money parser for backend JSON: prices arrive as numbers or
/// numeric strings depending on how the document was authored. Anything
/// non-numeric is discarded rather than propagated.
pub fn parse_decimal(value: &Value) -> Option<BigDecimal> {
    match value {
        Value::Number(number) => BigDecimal::from_str(&number.to_string()).ok(),
        Value::String(raw) => {
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                return None;
            }
            BigDecimal::from_str(trimmed).ok()
        }
        _ => None,
    }
}
