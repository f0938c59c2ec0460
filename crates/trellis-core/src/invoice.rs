use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LineItem {
    pub description: String,
    pub quantity: f64,
    pub unit_price: f64,
}

impl LineItem {
    pub fn amount(&self) -> f64 {
        self.quantity * self.unit_price
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase", tag = "kind", content = "value")]
pub enum Discount {
    /// Percentage of the subtotal.
    Percent(f64),
    /// Fixed amount off the subtotal.
    Fixed(f64),
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct InvoiceTotals {
    pub subtotal: f64,
    pub discount_amount: f64,
    pub taxable: f64,
    pub tax: f64,
    pub total: f64,
}

/// Tax applies strictly after the discount: the taxable base is the
/// discounted subtotal, never the raw one.
pub fn compute_totals(items: &[LineItem], discount: Option<Discount>, tax_rate: f64) -> InvoiceTotals {
    let subtotal: f64 = items.iter().map(LineItem::amount).sum();

    let discount_amount = match discount {
        Some(Discount::Percent(pct)) => subtotal * pct / 100.0,
        Some(Discount::Fixed(amount)) => amount,
        None => 0.0,
    };

    let taxable = subtotal - discount_amount;
    let tax = taxable * tax_rate / 100.0;

    InvoiceTotals {
        subtotal,
        discount_amount,
        taxable,
        tax,
        total: taxable + tax,
    }
}
