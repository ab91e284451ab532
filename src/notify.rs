//! HTML body and subject of the order notification mail.
//!
//! Rendering only; handing the mail to a transport is up to the caller.
//! Every value taken from an order is HTML-escaped.

use chrono::{NaiveDate, NaiveDateTime};

use crate::model::Order;
use crate::order::format_cents;
use crate::schedule::parse_iso_date;

const DISPLAY_DATE: &str = "%d.%m.%Y";

/// Everything the mail shows about one order.
#[derive(Debug, Clone)]
pub struct OrderEmail<'a> {
    pub restaurant_name: &'a str,
    pub order: &'a Order,
    pub placed_at: NaiveDateTime,
}

pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// `dd.mm.yyyy` for a stored `YYYY-MM-DD` date; anything else is shown as is.
pub fn display_date(stored: &str) -> String {
    parse_iso_date(stored)
        .map(|d: NaiveDate| d.format(DISPLAY_DATE).to_string())
        .unwrap_or_else(|_| stored.to_string())
}

impl OrderEmail<'_> {
    pub fn subject(&self) -> String {
        format!(
            "Delivery order - {} - delivery {}",
            self.restaurant_name,
            display_date(&self.order.delivery_date)
        )
    }

    pub fn html(&self) -> String {
        let order = self.order;
        let mut rows = String::new();
        for item in &order.items {
            rows.push_str(&format!(
                concat!(
                    "<tr>",
                    "<td style=\"font-family: monospace;\">{code}</td>",
                    "<td>{name}</td>",
                    "<td style=\"text-align: center;\">{qty}</td>",
                    "<td style=\"text-align: right;\">{price}</td>",
                    "<td style=\"text-align: right; font-weight: 600;\">{total}</td>",
                    "</tr>\n"
                ),
                code = escape_html(&item.product_code),
                name = escape_html(&item.product_name),
                qty = item.quantity,
                price = format_cents(item.price_per_stack_cents),
                total = format_cents(item.total_price_cents),
            ));
        }

        let notes = match order.notes.as_deref().map(str::trim) {
            Some(n) if !n.is_empty() => {
                format!("<p><strong>Notes:</strong> {}</p>\n", escape_html(n))
            }
            _ => String::new(),
        };

        format!(
            concat!(
                "<div style=\"max-width: 650px; margin: 0 auto; font-family: Arial, sans-serif;\">\n",
                "<h1>New delivery order</h1>\n",
                "<p><strong>Restaurant:</strong> {restaurant}</p>\n",
                "<p><strong>Delivery date:</strong> {delivery}</p>\n",
                "<p><strong>Created by:</strong> {created_by}</p>\n",
                "<p><strong>Placed at:</strong> {placed}</p>\n",
                "{notes}",
                "<table style=\"width: 100%; border-collapse: collapse;\">\n",
                "<thead><tr><th>Code</th><th>Product</th><th>Qty</th><th>Price</th><th>Total</th></tr></thead>\n",
                "<tbody>\n{rows}</tbody>\n",
                "</table>\n",
                "<p style=\"text-align: right;\"><strong>Total incl. VAT:</strong> {total}</p>\n",
                "</div>\n"
            ),
            restaurant = escape_html(self.restaurant_name),
            delivery = escape_html(&display_date(&order.delivery_date)),
            created_by = escape_html(&order.created_by),
            placed = self.placed_at.format("%d.%m.%Y %H:%M"),
            notes = notes,
            rows = rows,
            total = format_cents(order.total_amount_cents),
        )
    }
}
