//! Typed operations of the reading application against the backend API.
//!
//! Each method declares the response shape it expects and delegates to [`ApiClient`]. Recovery
//! policy (e.g. sending a user to onboarding on 409) is left to the caller via the predicates
//! on [`crate::ApiError`].

use api_shared::TokenProvider;
use reqwest::Method;
use url::form_urlencoded;

use crate::client::{ensure_success, ApiClient};
use crate::models::{
    ContentItem, CreatedFlavour, FeedPage, Feedback, Flavour, FlavourDetails, FlavourEnvelope,
    FlavourList, NewFlavour, OnboardingPage, OnboardingSelection, UserContentItem,
};
use crate::ApiResult;

/// Parameters of a feed page request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedQuery {
    /// Ids already shown to the user, so the backend does not repeat them.
    pub recommendation_ids: Vec<i64>,
    /// Restrict the feed to one flavour.
    pub flavour_id: Option<i64>,
}

impl FeedQuery {
    pub fn for_flavour(flavour_id: i64) -> Self {
        Self {
            flavour_id: Some(flavour_id),
            ..Self::default()
        }
    }

    /// The backend-relative path for this query, e.g. `/feed?recommendation_ids=1%2C2`.
    pub fn to_path(&self) -> String {
        let mut query = form_urlencoded::Serializer::new(String::new());
        if !self.recommendation_ids.is_empty() {
            query.append_pair("recommendation_ids", &join_ids(&self.recommendation_ids));
        }
        if let Some(flavour_id) = self.flavour_id {
            query.append_pair("flavour_id", &flavour_id.to_string());
        }
        with_query("/feed", query.finish())
    }
}

fn join_ids(ids: &[i64]) -> String {
    ids.iter()
        .map(i64::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

fn with_query(path: &str, query: String) -> String {
    if query.is_empty() {
        path.to_string()
    } else {
        format!("{path}?{query}")
    }
}

/// The reading application's view of the backend.
#[derive(Clone, Debug)]
pub struct ReaderApi {
    client: ApiClient,
}

impl ReaderApi {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    /// Next page of the personalised feed.
    pub async fn feed(
        &self,
        query: &FeedQuery,
        tokens: &dyn TokenProvider,
    ) -> ApiResult<Vec<UserContentItem>> {
        let page: FeedPage = self.client.get(&query.to_path(), tokens).await?;
        Ok(page.content)
    }

    /// Content offered during onboarding, excluding what the user has already picked.
    pub async fn onboarding_candidates(
        &self,
        existing: &[i64],
        tokens: &dyn TokenProvider,
    ) -> ApiResult<Vec<ContentItem>> {
        let mut query = form_urlencoded::Serializer::new(String::new());
        if !existing.is_empty() {
            query.append_pair("existing_content", &join_ids(existing));
        }
        let path = with_query("/onboarding", query.finish());
        let page: OnboardingPage = self.client.get(&path, tokens).await?;
        Ok(page.content)
    }

    pub async fn complete_onboarding(
        &self,
        selected: &[i64],
        tokens: &dyn TokenProvider,
    ) -> ApiResult<()> {
        let body = OnboardingSelection {
            selected_content: selected.to_vec(),
        };
        self.client
            .post_unvalidated("/onboarding", &body, tokens)
            .await?;
        Ok(())
    }

    pub async fn flavours(&self, tokens: &dyn TokenProvider) -> ApiResult<Vec<Flavour>> {
        let list: FlavourList = self.client.get("/flavours", tokens).await?;
        Ok(list.flavours)
    }

    pub async fn flavour(
        &self,
        flavour_id: i64,
        tokens: &dyn TokenProvider,
    ) -> ApiResult<FlavourDetails> {
        let envelope: FlavourEnvelope = self
            .client
            .get(&format!("/flavours/{flavour_id}"), tokens)
            .await?;
        Ok(envelope.flavour)
    }

    /// Create a flavour ("more like this") seeded from a content item; returns its id.
    pub async fn new_flavour_from_content(
        &self,
        content_id: i64,
        tokens: &dyn TokenProvider,
    ) -> ApiResult<i64> {
        let created: CreatedFlavour = self
            .client
            .post("/flavours", &NewFlavour { content_id }, tokens)
            .await?;
        Ok(created.id)
    }

    pub async fn delete_flavour(
        &self,
        flavour_id: i64,
        tokens: &dyn TokenProvider,
    ) -> ApiResult<()> {
        self.client
            .delete_unvalidated(&format!("/flavours/{flavour_id}"), tokens)
            .await?;
        Ok(())
    }

    pub async fn send_feedback(
        &self,
        feedback: Feedback,
        tokens: &dyn TokenProvider,
    ) -> ApiResult<()> {
        self.client
            .post_unvalidated("/feedback", &feedback, tokens)
            .await?;
        Ok(())
    }

    /// The backend's embeddings visualisation page (HTML).
    pub async fn visualization(&self, tokens: &dyn TokenProvider) -> ApiResult<String> {
        let response = self
            .client
            .fetch(Method::GET, "/visualization", tokens)
            .await?;
        Ok(ensure_success(response).await?.text().await?)
    }
}
