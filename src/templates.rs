use axum::http::StatusCode;
use maud::{DOCTYPE, Markup, html};

use crate::{entities::movie, models::SearchCandidate};

const TAILWIND_CDN: &str = "https://cdn.tailwindcss.com";

const INPUT_CLASS: &str = "mt-2 w-full rounded-md border border-gray-300 px-3 py-2 focus:border-blue-500 focus:outline-none focus:ring-1 focus:ring-blue-500";
const BUTTON_CLASS: &str =
    "w-full rounded-md bg-blue-600 px-4 py-2 font-semibold text-white hover:bg-blue-700";

pub fn index_page(movies: &[movie::Model], flash: Option<&str>) -> String {
    page(
        "My Top Movies",
        html! {
            div class="min-h-screen bg-gray-50" {
                div class="max-w-4xl mx-auto px-6 py-12" {
                    div class="flex items-start justify-between gap-6" {
                        div {
                            h1 class="text-3xl font-bold text-gray-900" { "My Top Movies" }
                            p class="mt-2 text-gray-600" { "Ranked by your own ratings." }
                        }
                        a class="rounded-md bg-blue-600 px-4 py-2 font-semibold text-white hover:bg-blue-700" href="/add" { "Add Movie" }
                    }

                    @if let Some(message) = flash {
                        div class="mt-6 rounded-md border border-green-200 bg-green-50 px-4 py-3 text-sm text-green-800" { (message) }
                    }

                    @if movies.is_empty() {
                        div class="mt-10 bg-white shadow rounded-lg p-8" {
                            p class="text-gray-600" { "No movies yet. Add one to get started." }
                        }
                    } @else {
                        div class="mt-10 space-y-4" {
                            @for m in movies {
                                (movie_card(m))
                            }
                        }
                    }
                }
            }
        },
    )
}

pub fn edit_page(movie: &movie::Model) -> String {
    let rating = movie.rating.map(|r| r.to_string()).unwrap_or_default();
    let review = movie.review.clone().unwrap_or_default();

    card_page(
        "Edit Movie",
        html! {
            h1 class="text-3xl font-bold text-gray-900" { (movie.title) }
            p class="mt-2 text-gray-600" { "Update your rating and review." }

            form class="mt-8 space-y-6" method="post" action=(format!("/edit?id={}", movie.id)) {
                input type="hidden" name="id" value=(movie.id);

                div {
                    label class="block text-sm font-medium text-gray-700" for="rating" { "Your rating out of 10, e.g. 6.0" }
                    input class=(INPUT_CLASS) name="rating" id="rating" value=(rating) inputmode="decimal" required;
                }

                div {
                    label class="block text-sm font-medium text-gray-700" for="review" { "Your review" }
                    input class=(INPUT_CLASS) name="review" id="review" value=(review) maxlength="50" required;
                }

                button class=(BUTTON_CLASS) type="submit" { "Submit" }
            }
        },
    )
}

pub fn add_page() -> String {
    card_page(
        "Add Movie",
        html! {
            h1 class="text-3xl font-bold text-gray-900" { "Add a Movie" }

            form class="mt-8 space-y-6" method="post" action="/add" {
                div {
                    label class="block text-sm font-medium text-gray-700" for="title" { "Movie title" }
                    input class=(INPUT_CLASS) name="title" id="title" required;
                }

                button class=(BUTTON_CLASS) type="submit" { "Add Movie" }
            }
        },
    )
}

pub fn select_page(query: &str, candidates: &[SearchCandidate]) -> String {
    card_page(
        "Select Movie",
        html! {
            h1 class="text-3xl font-bold text-gray-900" { "Select a movie" }
            p class="mt-2 text-gray-600" { "Results for \"" (query) "\"" }

            @if candidates.is_empty() {
                p class="mt-8 text-gray-600" { "Nothing matched that title." }
            } @else {
                ul class="mt-8 divide-y divide-gray-200" {
                    @for c in candidates {
                        li class="py-3" {
                            a class="text-blue-600 hover:text-blue-800" href=(format!("/find?id={}", c.id)) {
                                (c.original_title)
                                @if let Some(date) = c.release_date.as_deref().filter(|d| !d.is_empty()) {
                                    span class="ml-2 text-gray-500" { "- " (date) }
                                }
                            }
                        }
                    }
                }
            }

            a class="mt-6 inline-block text-sm text-blue-600 hover:text-blue-800" href="/add" { "Search again" }
        },
    )
}

pub fn error_page(status: StatusCode, message: &str) -> String {
    card_page(
        "Error",
        html! {
            h1 class="text-2xl font-bold text-gray-900" {
                "Error"
                span class="ml-2 font-normal text-gray-500" { (status.as_u16()) }
            }
            p class="mt-4 text-gray-700" { (message) }
            a class="mt-6 inline-block text-blue-600 hover:text-blue-800" href="/" { "Back" }
        },
    )
}

fn page(title: &str, body: Markup) -> String {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="utf-8";
                meta name="viewport" content="width=device-width, initial-scale=1";
                title { (title) }
                script src=(TAILWIND_CDN) {}
            }
            body { (body) }
        }
    }
    .into_string()
}

fn card_page(title: &str, inner: Markup) -> String {
    page(
        title,
        html! {
            div class="min-h-screen bg-gray-50" {
                div class="max-w-2xl mx-auto px-6 py-12" {
                    div class="bg-white shadow rounded-lg p-8" { (inner) }
                }
            }
        },
    )
}

fn movie_card(m: &movie::Model) -> Markup {
    html! {
        div class="bg-white shadow rounded-lg p-6 flex gap-6" {
            @if !m.img_url.is_empty() {
                img class="w-24 rounded" src=(m.img_url) alt=(m.title);
            }
            div class="flex-1" {
                div class="flex items-start justify-between gap-4" {
                    h2 class="text-xl font-semibold text-gray-900" {
                        @if let Some(rank) = m.ranking {
                            span class="mr-2 text-gray-400" { "#" (rank) }
                        }
                        (m.title)
                        span class="ml-2 font-normal text-gray-500" { "(" (m.year) ")" }
                    }
                    span class="text-lg font-semibold text-gray-700" {
                        @match m.rating {
                            Some(rating) => { (format!("{rating:.1}")) },
                            None => { "Unrated" },
                        }
                    }
                }
                @if m.is_rated() {
                    @if let Some(review) = &m.review {
                        p class="mt-1 text-sm italic text-gray-600" { "\"" (review) "\"" }
                    }
                } @else {
                    a class="mt-1 inline-block text-sm text-blue-600 hover:text-blue-800" href=(format!("/edit?id={}", m.id)) { "Rate this movie" }
                }
                p class="mt-2 text-sm text-gray-700" { (m.description) }
                div class="mt-4 flex gap-4 text-sm" {
                    a class="text-blue-600 hover:text-blue-800" href=(format!("/edit?id={}", m.id)) { "Update" }
                    a class="text-red-600 hover:text-red-800" href=(format!("/delete?id={}", m.id)) { "Delete" }
                }
            }
        }
    }
}
