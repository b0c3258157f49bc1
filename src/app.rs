use axum::{
    Json, Router,
    extract::{Path as AxumPath, Query, State},
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::services::ServeDir;

use crate::cart::Cart;
use crate::catalog::{self, Catalog};
use crate::config::Config;
use crate::invoice::{CheckoutError, INVOICE_MIME, Invoice};
use crate::session::SessionStore;

const SESSION_COOKIE: &str = "toko_session";

pub struct AppState {
    catalog: Catalog,
    sessions: SessionStore,
    config: Config,
    placeholder_png: Vec<u8>,
}

#[derive(Deserialize)]
struct BrowseQuery {
    query: Option<String>,
    category: Option<String>,
}

#[derive(Serialize)]
struct ProductView {
    no: i64,
    code: String,
    name: String,
    price: Option<f64>,
    moq: u32,
    category: Option<String>,
    description: Option<String>,
    image_url: String,
}

#[derive(Serialize)]
struct CartLineView {
    index: usize,
    no: i64,
    name: String,
    price: Option<f64>,
    quantity: u32,
    subtotal: Option<f64>,
}

#[derive(Serialize)]
struct CartView {
    items: Vec<CartLineView>,
    total: f64,
    unit_count: u32,
}

#[derive(Deserialize)]
struct AddRequest {
    no: i64,
}

#[derive(Deserialize)]
struct LineRequest {
    index: usize,
}

#[derive(Serialize)]
struct StatusResponse {
    status: String,
    message: Option<String>,
}

impl StatusResponse {
    fn error(message: impl Into<String>) -> Json<StatusResponse> {
        Json(StatusResponse {
            status: "error".to_string(),
            message: Some(message.into()),
        })
    }
}

/// Start the storefront web server.
///
/// The catalog is loaded once up front; a load failure is reported and the
/// store runs with an empty catalog ("no products") rather than refusing to
/// start.
pub async fn run(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let catalog = match catalog::load_catalog(&config.data_path) {
        Ok(catalog) => {
            log::info!(
                "loaded {} products from {}",
                catalog.len(),
                config.data_path.display()
            );
            catalog
        }
        Err(e) => {
            log::error!("failed to load catalog: {e}; starting with an empty catalog");
            Catalog::empty()
        }
    };

    let sessions = SessionStore::new(config.missing_price);
    let state = Arc::new(AppState {
        catalog,
        sessions,
        placeholder_png: placeholder_png()?,
        config,
    });

    let app = router(state.clone());

    let listener = TcpListener::bind(&state.config.bind_addr).await?;
    log::info!("listening on http://{}", state.config.bind_addr);
    axum::serve(listener, app).await?;

    Ok(())
}

fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(serve_store))
        .route("/api/products", get(list_products))
        .route("/api/categories", get(list_categories))
        .route("/api/cart", get(get_cart))
        .route("/api/cart/add", post(add_to_cart))
        .route("/api/cart/increment", post(increment_item))
        .route("/api/cart/decrement", post(decrement_item))
        .route("/api/cart/remove", post(remove_item))
        .route("/api/cart/clear", post(clear_cart))
        .route("/api/checkout", post(checkout))
        .route("/images/:filename", get(product_image))
        .nest_service("/static", ServeDir::new("static"))
        .with_state(state)
}

async fn serve_store() -> Html<&'static str> {
    Html(include_str!("./static/store.html"))
}

async fn list_products(
    Query(params): Query<BrowseQuery>,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let query = params.query.unwrap_or_default();
    let category = params
        .category
        .unwrap_or_else(|| catalog::ALL_CATEGORIES.to_string());

    let products: Vec<ProductView> = state
        .catalog
        .filter(&query, &category)
        .into_iter()
        .map(|p| ProductView {
            no: p.no,
            code: p.code.clone(),
            name: p.name.clone(),
            price: p.price,
            moq: p.moq,
            category: p.category.clone(),
            description: p.description.clone(),
            image_url: format!("/images/{}.jpg", p.code),
        })
        .collect();

    Json(products)
}

async fn list_categories(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.catalog.categories())
}

// Fetch the session id from the cookie jar, minting one (and setting the
// cookie) on first contact.
fn session_id(jar: CookieJar, state: &AppState) -> (CookieJar, String) {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        let id = cookie.value().to_string();
        return (jar, id);
    }
    let id = state.sessions.new_session_id();
    let mut cookie = Cookie::new(SESSION_COOKIE, id.clone());
    cookie.set_path("/");
    (jar.add(cookie), id)
}

fn cart_view(cart: &Cart) -> CartView {
    let policy = cart.policy();
    CartView {
        items: cart
            .items()
            .iter()
            .enumerate()
            .map(|(index, item)| CartLineView {
                index,
                no: item.product.no,
                name: item.product.name.clone(),
                price: item.product.price,
                quantity: item.quantity,
                subtotal: item.subtotal(policy),
            })
            .collect(),
        total: cart.total(),
        unit_count: cart.unit_count(),
    }
}

async fn get_cart(jar: CookieJar, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let (jar, sid) = session_id(jar, &state);
    let view = cart_view(&state.sessions.cart(&sid));
    (jar, Json(view))
}

async fn add_to_cart(
    jar: CookieJar,
    State(state): State<Arc<AppState>>,
    Json(payload): Json<AddRequest>,
) -> Response {
    let (jar, sid) = session_id(jar, &state);

    let Some(product) = state.catalog.get(payload.no) else {
        return (
            StatusCode::NOT_FOUND,
            jar,
            StatusResponse::error(format!("no product with No {}", payload.no)),
        )
            .into_response();
    };

    let view = state.sessions.with_cart(&sid, |cart| {
        cart.add(product);
        cart_view(cart)
    });
    (jar, Json(view)).into_response()
}

async fn increment_item(
    jar: CookieJar,
    State(state): State<Arc<AppState>>,
    Json(payload): Json<LineRequest>,
) -> Response {
    adjust_line(jar, state, payload.index, Cart::increment)
}

async fn decrement_item(
    jar: CookieJar,
    State(state): State<Arc<AppState>>,
    Json(payload): Json<LineRequest>,
) -> Response {
    adjust_line(jar, state, payload.index, Cart::decrement)
}

async fn remove_item(
    jar: CookieJar,
    State(state): State<Arc<AppState>>,
    Json(payload): Json<LineRequest>,
) -> Response {
    adjust_line(jar, state, payload.index, Cart::remove)
}

// Shared shape of the three index-based mutations: apply, then return the
// new cart view so the client re-renders from current state.
fn adjust_line(
    jar: CookieJar,
    state: Arc<AppState>,
    index: usize,
    op: fn(&mut Cart, usize) -> bool,
) -> Response {
    let (jar, sid) = session_id(jar, &state);

    let (ok, view) = state
        .sessions
        .with_cart(&sid, |cart| (op(cart, index), cart_view(cart)));

    if ok {
        (jar, Json(view)).into_response()
    } else {
        (
            StatusCode::BAD_REQUEST,
            jar,
            StatusResponse::error(format!("no cart line at index {index}")),
        )
            .into_response()
    }
}

async fn clear_cart(jar: CookieJar, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let (jar, sid) = session_id(jar, &state);
    let view = state.sessions.with_cart(&sid, |cart| {
        cart.clear();
        cart_view(cart)
    });
    (jar, Json(view))
}

async fn checkout(jar: CookieJar, State(state): State<Arc<AppState>>) -> Response {
    let (jar, sid) = session_id(jar, &state);
    let cart = state.sessions.cart(&sid);

    let invoice = match Invoice::from_cart(&cart, &state.config.store_name) {
        Ok(invoice) => invoice,
        Err(CheckoutError::EmptyCart) => {
            return (
                StatusCode::BAD_REQUEST,
                jar,
                StatusResponse::error("the cart is empty"),
            )
                .into_response();
        }
        Err(e) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                jar,
                StatusResponse::error(e.to_string()),
            )
                .into_response();
        }
    };

    // The cart here is a snapshot, so a failure below leaves session state
    // intact either way.
    match invoice.to_xlsx() {
        Ok(buffer) => Response::builder()
            .status(StatusCode::OK)
            .header(header::CONTENT_TYPE, INVOICE_MIME)
            .header(
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", invoice.filename()),
            )
            .body(axum::body::Body::from(buffer))
            .unwrap(),
        Err(e) => {
            log::error!("invoice generation failed: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                jar,
                StatusResponse::error(format!("failed to generate invoice: {e}")),
            )
                .into_response()
        }
    }
}

async fn product_image(
    AxumPath(filename): AxumPath<String>,
    State(state): State<Arc<AppState>>,
) -> Response {
    let code = filename.strip_suffix(".jpg").unwrap_or(&filename);

    if let Some(path) = catalog::image_file(&state.config.image_folder, code) {
        if let Ok(bytes) = tokio::fs::read(&path).await {
            // Open-or-fall-back: an unreadable file is treated the same as a
            // missing one.
            if image::guess_format(&bytes).is_ok() {
                return ([(header::CONTENT_TYPE, "image/jpeg")], bytes).into_response();
            }
            log::debug!("unreadable product image {}", path.display());
        }
    }

    (
        [(header::CONTENT_TYPE, "image/png")],
        state.placeholder_png.clone(),
    )
        .into_response()
}

// 100x100 light-gray PNG used whenever a product image is missing.
fn placeholder_png() -> Result<Vec<u8>, image::ImageError> {
    use image::{DynamicImage, ImageBuffer, ImageOutputFormat, Rgba};

    let img = ImageBuffer::from_pixel(100, 100, Rgba([226u8, 232, 240, 255]));
    let mut bytes = Vec::new();
    DynamicImage::ImageRgba8(img).write_to(
        &mut std::io::Cursor::new(&mut bytes),
        ImageOutputFormat::Png,
    )?;
    Ok(bytes)
}
