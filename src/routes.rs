use axum::{
    extract::{Form, Query, State},
    response::{Html, Redirect},
};
use axum_extra::extract::{
    WithRejection,
    cookie::{Cookie, SignedCookieJar},
};

use crate::{
    AppState,
    error::{AppError, AppResult},
    models::{AddRequest, EditRequest, ExternalIdQuery, IdQuery},
    templates,
};

const FLASH_COOKIE: &str = "flash";

/// Listing page. Recomputes and persists rankings on every visit.
pub async fn index(
    State(state): State<AppState>,
    jar: SignedCookieJar,
) -> AppResult<(SignedCookieJar, Html<String>)> {
    let movies = state.catalog.list_ranked().await?;

    let flash = jar.get(FLASH_COOKIE).and_then(|c| decode_flash(c.value()));
    let jar = if jar.get(FLASH_COOKIE).is_some() {
        jar.remove(Cookie::build(FLASH_COOKIE).path("/"))
    } else {
        jar
    };

    Ok((jar, Html(templates::index_page(&movies, flash.as_deref()))))
}

pub async fn edit_form(
    State(state): State<AppState>,
    WithRejection(Query(q), _): WithRejection<Query<IdQuery>, AppError>,
) -> AppResult<Html<String>> {
    let movie = state.catalog.get(q.id).await?;
    Ok(Html(templates::edit_page(&movie)))
}

pub async fn edit(
    State(state): State<AppState>,
    jar: SignedCookieJar,
    WithRejection(Form(req), _): WithRejection<Form<EditRequest>, AppError>,
) -> AppResult<(SignedCookieJar, Redirect)> {
    let movie = state.catalog.edit(req.id, &req.rating, &req.review).await?;
    let jar = with_flash(jar, &format!("Updated your rating for {}.", movie.title));
    Ok((jar, Redirect::to("/")))
}

pub async fn delete(
    State(state): State<AppState>,
    jar: SignedCookieJar,
    WithRejection(Query(q), _): WithRejection<Query<IdQuery>, AppError>,
) -> AppResult<(SignedCookieJar, Redirect)> {
    let movie = state.catalog.delete(q.id).await?;
    let jar = with_flash(jar, &format!("Removed {}.", movie.title));
    Ok((jar, Redirect::to("/")))
}

pub async fn add_form() -> Html<String> {
    Html(templates::add_page())
}

pub async fn add(
    State(state): State<AppState>,
    WithRejection(Form(req), _): WithRejection<Form<AddRequest>, AppError>,
) -> AppResult<Html<String>> {
    let query = req.title.trim();
    let candidates = state.catalog.search_candidates(query).await?;
    Ok(Html(templates::select_page(query, &candidates)))
}

pub async fn find(
    State(state): State<AppState>,
    WithRejection(Query(q), _): WithRejection<Query<ExternalIdQuery>, AppError>,
) -> AppResult<Redirect> {
    let id = state.catalog.create_from_external_id(q.id).await?;
    Ok(Redirect::to(&format!("/edit?id={id}")))
}

fn with_flash(jar: SignedCookieJar, message: &str) -> SignedCookieJar {
    jar.add(
        Cookie::build((FLASH_COOKIE, encode_flash(message)))
            .path("/")
            .http_only(true)
            .max_age(time::Duration::minutes(5)),
    )
}

// titles may carry `;`, quotes or non-ascii text, none of which survive a raw cookie value
fn encode_flash(message: &str) -> String {
    urlencoding::encode(message).into_owned()
}

fn decode_flash(value: &str) -> Option<String> {
    urlencoding::decode(value).ok().map(|s| s.into_owned())
}
