//! Bundled admin page

use axum::response::Html;

const ADMIN_PAGE: &str = include_str!("../../assets/admin.html");

pub async fn admin_page() -> Html<&'static str> {
    Html(ADMIN_PAGE)
}
