/*!
# Toko

A small storefront web application: products come from a spreadsheet catalog,
a user browses and filters them, builds a session-scoped cart, and checks out
by downloading a generated XLSX invoice.

## Architecture

The application follows a client-server architecture:

### Frontend Layer
- A single static HTML page (search box, category selector, product cards
  with an add button, cart table with quantity controls, checkout)
- Re-renders by re-reading the API after every mutation

### Backend Layer
- **Technologies**: Rust, axum
- **Core Components**:
  - Catalog Loader - Reads the product spreadsheet into normalized records
  - Product Browser - Case-insensitive substring search plus category filter
  - Cart Manager - Session-scoped add/increment/decrement/remove/clear/total
  - Invoice Generator - Formatted XLSX snapshot of the cart, offered as a
    download
  - Session Store - Per-session carts keyed by an opaque cookie id

## Key Properties

- The catalog is read-only after load and shared across sessions
- A cart line's quantity is always at least 1; decrementing past 1 removes it
- Invoice generation never mutates the cart; an empty cart is refused
- Every failure (bad catalog, missing image, bad row, serialization error)
  degrades one view or action, never the whole session

## Modules

- **catalog**: product records, spreadsheet/CSV loading, filtering
- **cart**: cart state and the missing-price totaling policy
- **invoice**: checkout snapshot and XLSX serialization
- **session**: per-session cart registry with expiry
- **config**: file paths, store name, bind address, totaling policy
- **app**: axum routing and handlers

## REST API Endpoints

- `GET  /api/products?query=&category=` - Filtered product list
- `GET  /api/categories` - Category selector values
- `GET  /api/cart` - Current cart view
- `POST /api/cart/add|increment|decrement|remove|clear` - Cart mutations
- `POST /api/checkout` - Invoice download
- `GET  /images/{kode}.jpg` - Product image or placeholder
*/

pub mod app;
pub mod cart;
pub mod catalog;
pub mod config;
pub mod invoice;
pub mod session;

/// Re-export the core domain types at the crate root.
pub use cart::{Cart, CartItem, MissingPrice};
pub use catalog::{Catalog, CatalogError, Product};
pub use config::Config;
pub use invoice::{CheckoutError, Invoice};
pub use session::SessionStore;
