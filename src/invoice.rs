use crate::cart::Cart;
use chrono::{DateTime, Local};
use rust_xlsxwriter::{Format, Workbook, Worksheet, XlsxError};
use serde::Serialize;
use thiserror::Error;

/// MIME type of the generated invoice download.
pub const INVOICE_MIME: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Errors raised at checkout.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// Checking out an empty cart is a user error: warn and refuse, no file.
    #[error("the cart is empty")]
    EmptyCart,

    /// Serialization failure; the cart itself is left untouched.
    #[error("failed to generate invoice: {0}")]
    Xlsx(#[from] XlsxError),
}

/// One line of the invoice: a read-only snapshot of a cart line.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InvoiceLine {
    pub no: u32,
    pub name: String,
    pub unit_price: Option<f64>,
    pub quantity: u32,
    /// Price x quantity; `None` when the missing-price policy excludes the
    /// line from totals, in which case the cell stays blank.
    pub subtotal: Option<f64>,
}

/// An immutable invoice derived from the cart at checkout time.
///
/// Generation never mutates the cart; the invoice is written once to a byte
/// buffer and offered as a download, never stored server-side.
#[derive(Debug, Clone)]
pub struct Invoice {
    store: String,
    generated_at: DateTime<Local>,
    lines: Vec<InvoiceLine>,
    grand_total: f64,
}

impl Invoice {
    /// Snapshot a non-empty cart into an invoice.
    ///
    /// # Arguments
    /// * `cart` - The cart to snapshot (read-only)
    /// * `store` - Store label used in the suggested filename
    ///
    /// # Returns
    /// * `Result<Invoice, CheckoutError>` - The invoice, or `EmptyCart`
    pub fn from_cart(cart: &Cart, store: &str) -> Result<Invoice, CheckoutError> {
        if cart.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        let policy = cart.policy();
        let lines: Vec<InvoiceLine> = cart
            .items()
            .iter()
            .enumerate()
            .map(|(i, item)| InvoiceLine {
                no: (i + 1) as u32,
                name: item.product.name.clone(),
                unit_price: item.product.price,
                quantity: item.quantity,
                subtotal: item.subtotal(policy),
            })
            .collect();
        let grand_total = lines.iter().filter_map(|l| l.subtotal).sum();

        Ok(Invoice {
            store: store.to_string(),
            generated_at: Local::now(),
            lines,
            grand_total,
        })
    }

    pub fn lines(&self) -> &[InvoiceLine] {
        &self.lines
    }

    pub fn grand_total(&self) -> f64 {
        self.grand_total
    }

    /// Suggested filename: `invoice_<store>_<YYYYMMDD_HHMMSS>.xlsx`.
    ///
    /// The timestamp is sortable and second-resolution, so concurrent
    /// downloads within ordinary use do not collide.
    pub fn filename(&self) -> String {
        format!(
            "invoice_{}_{}.xlsx",
            self.store,
            self.generated_at.format("%Y%m%d_%H%M%S")
        )
    }

    /// Serialize the invoice to XLSX bytes.
    ///
    /// Layout: a bold header row (`No | Nama Produk | Harga (Rp) | Jumlah |
    /// Subtotal (Rp)`), one row per line, then a final row with "Total" in
    /// the name column and the grand total in the subtotal column. Currency
    /// cells use the `Rp #,##0` number format.
    ///
    /// # Returns
    /// * `Result<Vec<u8>, CheckoutError>` - XLSX file content as bytes
    pub fn to_xlsx(&self) -> Result<Vec<u8>, CheckoutError> {
        let mut workbook = Workbook::new();
        let mut worksheet = Worksheet::new();
        worksheet.set_name("Invoice")?;

        let bold = Format::new().set_bold();
        let currency = Format::new().set_num_format("Rp #,##0");

        for (col, header) in ["No", "Nama Produk", "Harga (Rp)", "Jumlah", "Subtotal (Rp)"]
            .iter()
            .enumerate()
        {
            worksheet.write_string_with_format(0, col as u16, *header, &bold)?;
        }

        for line in &self.lines {
            let row = line.no; // header occupies row 0
            worksheet.write_number(row, 0, line.no as f64)?;
            worksheet.write_string(row, 1, &line.name)?;
            if let Some(price) = line.unit_price {
                worksheet.write_number_with_format(row, 2, price, &currency)?;
            }
            worksheet.write_number(row, 3, line.quantity as f64)?;
            if let Some(subtotal) = line.subtotal {
                worksheet.write_number_with_format(row, 4, subtotal, &currency)?;
            }
        }

        let total_row = self.lines.len() as u32 + 1;
        worksheet.write_string_with_format(total_row, 1, "Total", &bold)?;
        worksheet.write_number_with_format(total_row, 4, self.grand_total, &currency)?;

        // Column widths from the storefront's invoice template.
        worksheet.set_column_width(0, 5)?;
        worksheet.set_column_width(1, 30)?;
        worksheet.set_column_width(2, 15)?;
        worksheet.set_column_width(3, 10)?;
        worksheet.set_column_width(4, 20)?;

        workbook.push_worksheet(worksheet);
        let buffer = workbook.save_to_buffer()?;
        Ok(buffer)
    }
}
