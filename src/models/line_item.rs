use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(sqlx::FromRow, Serialize, Debug, Clone, PartialEq)]
pub struct LineItem {
    pub invoice_id: i64,
    pub product_id: i64,
    pub quantity: i64,
}

/// One requested line of an invoice write
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineItemInput {
    pub product_id: i64,
    pub quantity: i64,
}

impl LineItemInput {
    pub fn new(product_id: i64, quantity: i64) -> Self {
        Self {
            product_id,
            quantity,
        }
    }
}

impl fmt::Display for LineItemInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.product_id, self.quantity)
    }
}

/// Parses `PRODUCT_ID:QUANTITY`, as given on the command line.
impl FromStr for LineItemInput {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (product, quantity) = s
            .split_once(':')
            .ok_or_else(|| format!("expected PRODUCT_ID:QUANTITY, got `{s}`"))?;

        let product_id = product
            .trim()
            .parse::<i64>()
            .map_err(|e| format!("invalid product id `{product}`: {e}"))?;
        let quantity = quantity
            .trim()
            .parse::<i64>()
            .map_err(|e| format!("invalid quantity `{quantity}`: {e}"))?;

        Ok(Self::new(product_id, quantity))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_pair() {
        let item: LineItemInput = "3:12".parse().unwrap();
        assert_eq!(item, LineItemInput::new(3, 12));
        assert_eq!(item.to_string(), "3:12");
    }

    #[test]
    fn rejects_malformed_pairs() {
        assert!("3".parse::<LineItemInput>().is_err());
        assert!("a:1".parse::<LineItemInput>().is_err());
        assert!("1:1.5".parse::<LineItemInput>().is_err());
    }
}
