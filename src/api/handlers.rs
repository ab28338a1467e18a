//! Axum request handlers for the HTTP API.
use std::sync::Arc;

use axum::extract::{Multipart, State};
use axum::response::Html;
use axum::Json;
use serde_json::{json, Value};

use crate::api::form::read_form;
use crate::api::pages;
use crate::api::routes::AppState;
use crate::error::AppError;
use crate::workflows::{multicolor, object_change, product_color, product_replace, surface};

type Page = Result<Html<String>, AppError>;

pub async fn index() -> Html<String> {
    Html(pages::index())
}

pub async fn health(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "openai": "ready",
        "gemini": "ready",
        "vision": state.studio.vision_status,
    }))
}

pub async fn background_page() -> Html<String> {
    Html(pages::background(None))
}

pub async fn background_submit(State(state): State<Arc<AppState>>, multipart: Multipart) -> Page {
    let form = read_form(multipart).await?;
    let output = surface::replace_wall(&state.studio, &form).await?;
    Ok(Html(pages::background(Some(&output))))
}

pub async fn flooring_page() -> Html<String> {
    Html(pages::flooring(None))
}

pub async fn flooring_submit(State(state): State<Arc<AppState>>, multipart: Multipart) -> Page {
    let form = read_form(multipart).await?;
    let output = surface::replace_floor(&state.studio, &form).await?;
    Ok(Html(pages::flooring(Some(&output))))
}

pub async fn product_color_page() -> Html<String> {
    Html(pages::product_color(None))
}

pub async fn product_color_submit(State(state): State<Arc<AppState>>, multipart: Multipart) -> Page {
    let form = read_form(multipart).await?;
    let batch = product_color::product_color(&state.studio, &form).await;
    Ok(Html(pages::product_color(batch.as_ref())))
}

pub async fn multi_color_page() -> Html<String> {
    Html(pages::multicolor(None, None))
}

pub async fn multi_color_submit(State(state): State<Arc<AppState>>, multipart: Multipart) -> Page {
    let form = read_form(multipart).await?;
    let detected = multicolor::detect_multicolors(&state.studio, &form).await?;
    Ok(Html(pages::multicolor(Some(&detected), None)))
}

pub async fn modify_detected_color(State(state): State<Arc<AppState>>, multipart: Multipart) -> Page {
    let form = read_form(multipart).await?;
    let recolored = multicolor::modify_detected_color(&state.studio, &form).await?;
    Ok(Html(pages::multicolor(None, Some(&recolored))))
}

pub async fn object_change_page() -> Html<String> {
    Html(pages::object_change(None))
}

pub async fn object_change_submit(State(state): State<Arc<AppState>>, multipart: Multipart) -> Page {
    let form = read_form(multipart).await?;
    let replaced = object_change::replace_accessory(&state.studio, &form).await?;
    Ok(Html(pages::object_change(Some(&replaced))))
}

pub async fn product_replace_page() -> Html<String> {
    Html(pages::product_replace(None, None))
}

pub async fn product_replace_analyze(State(state): State<Arc<AppState>>, multipart: Multipart) -> Page {
    let form = read_form(multipart).await?;
    let analysis = product_replace::analyze_image(&state.studio, &form).await?;
    Ok(Html(pages::product_replace(Some(&analysis), None)))
}

pub async fn product_replace_action(State(state): State<Arc<AppState>>, multipart: Multipart) -> Page {
    let form = read_form(multipart).await?;
    let output = product_replace::replace_product(&state.studio, &form).await?;
    Ok(Html(pages::product_replace(None, Some(&output))))
}
