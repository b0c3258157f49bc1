use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Sentinel category meaning "no category filtering".
pub const ALL_CATEGORIES: &str = "All";

/// Errors raised while loading the product catalog.
///
/// All of these are recoverable: the caller is expected to report the error
/// and fall back to an empty catalog rather than abort the session.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read catalog file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse catalog file: {0}")]
    Format(String),

    #[error("catalog file is missing required column '{0}'")]
    MissingColumn(&'static str),

    #[error("unsupported catalog file extension: {0}")]
    UnsupportedExtension(String),
}

impl From<calamine::XlsxError> for CatalogError {
    fn from(e: calamine::XlsxError) -> Self {
        CatalogError::Format(e.to_string())
    }
}

/// A single product row from the catalog source.
///
/// Field normalization happens at load time:
/// - `code` is trimmed and stringified; a missing cell becomes `""`, never null,
///   so image lookups and display never hit a type mismatch.
/// - `price` is `None` when the source value is absent or unparsable, which is
///   distinct from a price of 0 ("unknown" vs "free").
/// - `moq` (minimum order quantity) defaults to 1 when missing or unparsable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub no: i64,
    pub code: String,
    pub name: String,
    pub price: Option<f64>,
    pub moq: u32,
    pub category: Option<String>,
    pub description: Option<String>,
}

/// The in-memory product catalog.
///
/// Loaded once at startup and read-only afterwards, so it can be shared
/// across sessions without synchronization.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    products: Vec<Product>,
}

impl Catalog {
    pub fn new(products: Vec<Product>) -> Self {
        Catalog { products }
    }

    /// An empty catalog, used when loading fails and the storefront should
    /// degrade to "no products" instead of crashing.
    pub fn empty() -> Self {
        Catalog::default()
    }

    pub fn products(&self) -> &[Product] {
        &self.products
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    /// Look up a product by its `No` identifier.
    pub fn get(&self, no: i64) -> Option<&Product> {
        self.products.iter().find(|p| p.no == no)
    }

    /// Filter the catalog for display.
    ///
    /// Name matching is a case-insensitive substring match; an empty query
    /// matches everything. The category filter only applies when `category`
    /// is non-empty and differs from [`ALL_CATEGORIES`], and then requires an
    /// exact match. The catalog itself is never mutated.
    ///
    /// # Arguments
    /// * `query` - Free-text search entered by the user
    /// * `category` - Selected category, or [`ALL_CATEGORIES`]
    ///
    /// # Returns
    /// * `Vec<&Product>` - Matching products in catalog order
    pub fn filter(&self, query: &str, category: &str) -> Vec<&Product> {
        let query = query.trim().to_lowercase();
        self.products
            .iter()
            .filter(|p| query.is_empty() || p.name.to_lowercase().contains(&query))
            .filter(|p| {
                category.is_empty()
                    || category == ALL_CATEGORIES
                    || p.category.as_deref() == Some(category)
            })
            .collect()
    }

    /// Distinct categories for the selector, sorted, with the sentinel first.
    pub fn categories(&self) -> Vec<String> {
        let mut seen: Vec<String> = self
            .products
            .iter()
            .filter_map(|p| p.category.clone())
            .collect();
        seen.sort();
        seen.dedup();
        let mut out = vec![ALL_CATEGORIES.to_string()];
        out.extend(seen);
        out
    }
}

/// Resolve the image file for a product: `<folder>/<code>.jpg`.
///
/// Returns `None` when the product has no code or the file does not exist;
/// the caller substitutes the placeholder image.
pub fn image_file(folder: &Path, code: &str) -> Option<PathBuf> {
    if code.is_empty() {
        return None;
    }
    let path = folder.join(format!("{code}.jpg"));
    if path.is_file() { Some(path) } else { None }
}

// Column positions within the source table, resolved from the header row.
struct Columns {
    no: usize,
    code: usize,
    name: usize,
    price: usize,
    moq: usize,
    category: Option<usize>,
    description: Option<usize>,
}

impl Columns {
    fn resolve(headers: &[String]) -> Result<Columns, CatalogError> {
        let find = |label: &str| {
            headers
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(label))
        };
        Ok(Columns {
            no: find("No").ok_or(CatalogError::MissingColumn("No"))?,
            code: find("Kode").ok_or(CatalogError::MissingColumn("Kode"))?,
            name: find("Nama Produk").ok_or(CatalogError::MissingColumn("Nama Produk"))?,
            price: find("Harga").ok_or(CatalogError::MissingColumn("Harga"))?,
            moq: find("MOQ").ok_or(CatalogError::MissingColumn("MOQ"))?,
            category: find("Kategori"),
            description: find("Deskripsi"),
        })
    }
}

/// Parse a price field: numeric and non-negative, else "missing".
fn parse_price(raw: &str) -> Option<f64> {
    let cleaned = raw.trim().replace(',', "");
    match cleaned.parse::<f64>() {
        Ok(v) if v >= 0.0 && v.is_finite() => Some(v),
        _ => None,
    }
}

/// Parse a minimum order quantity; anything unusable defaults to 1.
fn parse_moq(raw: &str) -> u32 {
    match raw.trim().parse::<f64>() {
        Ok(v) if v >= 1.0 => v as u32,
        _ => 1,
    }
}

fn non_empty(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

// Build a product from one row of stringified cells. Rows without a usable
// `No` value (blank trailing rows, stray notes) are skipped.
fn product_from_row(cols: &Columns, cells: &[String]) -> Option<Product> {
    let field = |i: usize| cells.get(i).map(String::as_str).unwrap_or("");
    let no = field(cols.no).trim().parse::<f64>().ok()? as i64;
    Some(Product {
        no,
        code: field(cols.code).trim().to_string(),
        name: field(cols.name).trim().to_string(),
        price: parse_price(field(cols.price)),
        moq: parse_moq(field(cols.moq)),
        category: cols.category.and_then(|i| non_empty(field(i))),
        description: cols.description.and_then(|i| non_empty(field(i))),
    })
}

/// Load the catalog from an Excel file.
///
/// Reads the first worksheet, resolves the column layout from the header row
/// and normalizes each data row into a [`Product`].
///
/// # Arguments
/// * `filepath` - Path to the XLSX file to load
///
/// # Returns
/// * `Result<Catalog, CatalogError>` - The loaded catalog or an error
pub fn from_excel(filepath: impl AsRef<Path>) -> Result<Catalog, CatalogError> {
    use calamine::{Data, Reader, Xlsx, open_workbook};

    let mut workbook: Xlsx<_> = open_workbook(filepath)?;

    let sheet_name = workbook
        .sheet_names()
        .first()
        .ok_or_else(|| CatalogError::Format("no sheets found in Excel file".to_string()))?
        .clone();

    let range = workbook.worksheet_range(&sheet_name)?;

    let mut rows = range.rows();
    let headers: Vec<String> = match rows.next() {
        Some(header_row) => header_row.iter().map(cell_to_string).collect(),
        None => return Err(CatalogError::Format("Excel sheet is empty".to_string())),
    };
    let cols = Columns::resolve(&headers)?;

    let mut products = Vec::new();
    for row in rows {
        let cells: Vec<String> = row.iter().map(cell_to_string).collect();
        if let Some(product) = product_from_row(&cols, &cells) {
            products.push(product);
        }
    }

    // Stringify a calamine cell so every column goes through the same
    // normalization as the CSV path. Integral floats lose the ".0" so codes
    // stored as numbers stay usable as filenames.
    fn cell_to_string(cell: &Data) -> String {
        match cell {
            Data::String(s) => s.trim().to_string(),
            Data::Float(f) if f.fract() == 0.0 => format!("{}", *f as i64),
            Data::Float(f) => f.to_string(),
            Data::Int(i) => i.to_string(),
            Data::Bool(b) => b.to_string(),
            _ => String::new(),
        }
    }

    Ok(Catalog::new(products))
}

/// Load the catalog from a CSV file.
///
/// The first line is the header row; quoted fields and embedded commas are
/// handled by [`parse_csv_row`].
///
/// # Arguments
/// * `filepath` - Path to the CSV file to load
///
/// # Returns
/// * `Result<Catalog, CatalogError>` - The loaded catalog or an error
pub fn from_csv(filepath: impl AsRef<Path>) -> Result<Catalog, CatalogError> {
    let file = File::open(filepath)?;
    let reader = BufReader::new(file);
    let lines: Vec<String> = reader.lines().collect::<Result<_, _>>()?;

    let mut lines = lines.into_iter().filter(|l| !l.trim().is_empty());
    let headers = match lines.next() {
        Some(line) => parse_csv_row(&line),
        None => return Err(CatalogError::Format("CSV file is empty".to_string())),
    };
    let cols = Columns::resolve(&headers)?;

    let mut products = Vec::new();
    for line in lines {
        let cells = parse_csv_row(&line);
        if let Some(product) = product_from_row(&cols, &cells) {
            products.push(product);
        }
    }

    Ok(Catalog::new(products))
}

// Parse a CSV row into a vector of strings, honoring quoted fields and
// doubled quotes inside them.
fn parse_csv_row(line: &str) -> Vec<String> {
    let mut result = Vec::new();
    let mut current_field = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' => {
                if let Some(&next) = chars.peek() {
                    if next == '"' && in_quotes {
                        current_field.push('"');
                        chars.next();
                    } else {
                        in_quotes = !in_quotes;
                    }
                } else {
                    in_quotes = !in_quotes;
                }
            }
            ',' if !in_quotes => {
                result.push(current_field);
                current_field = String::new();
            }
            _ => {
                current_field.push(c);
            }
        }
    }

    result.push(current_field);
    result
}

/// Detect file type and load the appropriate format.
///
/// Dispatches on the file extension: `.xlsx`/`.xls` via calamine, `.csv` via
/// the line parser.
///
/// # Arguments
/// * `filepath` - Path to the catalog file
///
/// # Returns
/// * `Result<Catalog, CatalogError>` - The loaded catalog or an error
pub fn load_catalog(filepath: impl AsRef<Path>) -> Result<Catalog, CatalogError> {
    let path = filepath.as_ref();
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase());

    match extension.as_deref() {
        Some("csv") => from_csv(path),
        Some("xlsx") | Some("xls") => from_excel(path),
        Some(ext) => Err(CatalogError::UnsupportedExtension(ext.to_string())),
        None => Err(CatalogError::UnsupportedExtension("(none)".to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn sample() -> Catalog {
        Catalog::new(vec![
            Product {
                no: 1,
                code: "RS01".to_string(),
                name: "Red Shirt".to_string(),
                price: Some(10000.0),
                moq: 1,
                category: Some("Apparel".to_string()),
                description: None,
            },
            Product {
                no: 2,
                code: "BP01".to_string(),
                name: "Blue Pants".to_string(),
                price: Some(5000.0),
                moq: 2,
                category: Some("Apparel".to_string()),
                description: Some("Comfortable".to_string()),
            },
            Product {
                no: 3,
                code: String::new(),
                name: "Mystery Box".to_string(),
                price: None,
                moq: 1,
                category: None,
                description: None,
            },
        ])
    }

    #[test]
    fn filter_is_case_insensitive_substring_match() {
        let catalog = sample();
        let hits = catalog.filter("shirt", ALL_CATEGORIES);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].name, "Red Shirt");

        let hits = catalog.filter("SHIRT", ALL_CATEGORIES);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].name, "Red Shirt");
    }

    #[test]
    fn empty_query_matches_everything() {
        let catalog = sample();
        assert_eq!(catalog.filter("", ALL_CATEGORIES).len(), 3);
        assert_eq!(catalog.filter("   ", "").len(), 3);
    }

    #[test]
    fn category_filter_is_exact_match() {
        let catalog = sample();
        let hits = catalog.filter("", "Apparel");
        assert_eq!(hits.len(), 2);
        assert!(catalog.filter("", "Appar").is_empty());
    }

    #[test]
    fn filter_does_not_mutate_catalog() {
        let catalog = sample();
        let before = catalog.products().to_vec();
        let _ = catalog.filter("shirt", "Apparel");
        assert_eq!(catalog.products(), &before[..]);
    }

    #[test]
    fn categories_are_sorted_with_sentinel_first() {
        let catalog = sample();
        assert_eq!(catalog.categories(), vec!["All", "Apparel"]);
    }

    #[test]
    fn price_parsing_treats_malformed_as_missing() {
        assert_eq!(parse_price("10000"), Some(10000.0));
        assert_eq!(parse_price("1,500"), Some(1500.0));
        assert_eq!(parse_price("free"), None);
        assert_eq!(parse_price(""), None);
        assert_eq!(parse_price("-5"), None);
    }

    #[test]
    fn moq_defaults_to_one() {
        assert_eq!(parse_moq(""), 1);
        assert_eq!(parse_moq("abc"), 1);
        assert_eq!(parse_moq("0"), 1);
        assert_eq!(parse_moq("12"), 12);
    }

    #[test]
    fn csv_rows_normalize_code_and_moq() {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(file, "No,Kode,Nama Produk,Harga,MOQ,Kategori").unwrap();
        writeln!(file, "1, A01 ,Red Shirt,10000,2,Apparel").unwrap();
        writeln!(file, "2,,\"Pants, Blue\",oops,,").unwrap();
        writeln!(file, ",,,,,").unwrap();

        let catalog = load_catalog(file.path()).unwrap();
        assert_eq!(catalog.len(), 2);

        let first = &catalog.products()[0];
        assert_eq!(first.code, "A01");
        assert_eq!(first.moq, 2);
        assert_eq!(first.price, Some(10000.0));

        // Kode is always a string (never null) and MOQ is always >= 1.
        let second = &catalog.products()[1];
        assert_eq!(second.code, "");
        assert_eq!(second.name, "Pants, Blue");
        assert_eq!(second.price, None);
        assert_eq!(second.moq, 1);
    }

    #[test]
    fn missing_required_column_is_reported() {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(file, "No,Kode,Nama Produk,Harga").unwrap();
        writeln!(file, "1,A,Thing,5").unwrap();

        match load_catalog(file.path()) {
            Err(CatalogError::MissingColumn(col)) => assert_eq!(col, "MOQ"),
            other => panic!("expected MissingColumn error, got {other:?}"),
        }
    }

    #[test]
    fn missing_file_is_a_recoverable_error() {
        assert!(matches!(
            load_catalog("does/not/exist.csv"),
            Err(CatalogError::Io(_))
        ));
    }

    #[test]
    fn unsupported_extension_is_rejected() {
        assert!(matches!(
            load_catalog("catalog.pdf"),
            Err(CatalogError::UnsupportedExtension(_))
        ));
    }

    #[test]
    fn image_file_requires_code_and_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("A01.jpg"), b"jpg").unwrap();

        assert!(image_file(dir.path(), "A01").is_some());
        assert!(image_file(dir.path(), "B02").is_none());
        assert!(image_file(dir.path(), "").is_none());
    }
}
