use serde::Deserialize;

/// One hit from the metadata search endpoint, kept exactly as received.
#[derive(Clone, Debug, Deserialize)]
pub struct SearchCandidate {
    pub id: i64,
    pub original_title: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub overview: Option<String>,
}

/// Full detail record for a single external movie id.
#[derive(Clone, Debug, Deserialize)]
pub struct MovieDetails {
    pub original_title: String,
    #[serde(default)]
    pub overview: String,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub release_date: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct IdQuery {
    pub id: i32,
}

#[derive(Debug, Deserialize)]
pub struct ExternalIdQuery {
    pub id: i64,
}

#[derive(Debug, Deserialize)]
pub struct EditRequest {
    pub id: i32,
    pub rating: String,
    pub review: String,
}

#[derive(Debug, Deserialize)]
pub struct AddRequest {
    pub title: String,
}
