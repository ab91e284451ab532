//! Pricing of requested order lines from the product catalog.
//!
//! Staff only pick a product code and a quantity. Name, id and price are
//! always taken from the catalog at intake time.

use std::fmt;
use std::str::FromStr;

use crate::model::Product;
use crate::order::{OrderError, OrderLine};
use crate::ports::ProductCatalog;

/// A product code and the number of stacks wanted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineRequest {
    pub product_code: String,
    pub quantity: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineRequestParseError(String);

impl fmt::Display for LineRequestParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for LineRequestParseError {}

/// `CODE,QTY`
impl FromStr for LineRequest {
    type Err = LineRequestParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let Some((code, qty)) = s.split_once(',') else {
            return Err(LineRequestParseError(format!("expected CODE,QTY, got {s:?}")));
        };
        let code = code.trim();
        if code.is_empty() {
            return Err(LineRequestParseError(format!("missing product code in {s:?}")));
        }
        let quantity = qty
            .trim()
            .parse()
            .map_err(|_| LineRequestParseError(format!("bad quantity {:?}", qty.trim())))?;
        Ok(Self { product_code: code.to_string(), quantity })
    }
}

/// Order line for `quantity` stacks of `product` at its catalog price.
pub fn line_for(product: &Product, quantity: i64) -> OrderLine {
    OrderLine {
        product_id: product
            .id
            .map(|id| id.to_hex())
            .unwrap_or_else(|| product.code.clone()),
        product_code: product.code.clone(),
        product_name: product.name.clone(),
        quantity,
        price_per_stack_cents: product.price_per_stack_cents,
    }
}

/// Prices every request, in order. Unknown or inactive codes fail the whole
/// order.
pub async fn price_lines<C>(
    catalog: &C,
    requests: &[LineRequest],
) -> Result<Vec<OrderLine>, OrderError>
where
    C: ProductCatalog + ?Sized,
{
    let mut lines = Vec::with_capacity(requests.len());
    for req in requests {
        let product = catalog
            .find_active(&req.product_code)
            .await?
            .ok_or_else(|| OrderError::UnknownProduct { product_code: req.product_code.clone() })?;
        lines.push(line_for(&product, req.quantity));
    }
    Ok(lines)
}
