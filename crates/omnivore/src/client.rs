//! GraphQL client for the Omnivore API.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::gateway::OmnivoreGateway;
use crate::models::{Article, Highlight, Label, LabelInput, LabelSelection, NewNote};

/// Omnivore API endpoint
pub const OMNIVORE_API_URL: &str = "https://api-prod.omnivore.app/api/graphql";

/// Fields selected for every label
macro_rules! label_fields {
    () => {
        "labels { id name color description }"
    };
}

/// Fields selected for every highlight
macro_rules! highlight_fields {
    () => {
        "highlight { id shortId type annotation }"
    };
}

const ARTICLE_QUERY: &str = concat!(
    "query Article($username: String!, $slug: String!, $format: String) {
        article(username: $username, slug: $slug, format: $format) {
            ... on ArticleSuccess {
                article {
                    id
                    title
                    content
                    ",
    label_fields!(),
    "
                    highlights { id shortId type annotation }
                }
            }
            ... on ArticleError { errorCodes }
        }
    }"
);

const LABELS_QUERY: &str = concat!(
    "query Labels {
        labels {
            ... on LabelsSuccess { ",
    label_fields!(),
    " }
            ... on LabelsError { errorCodes }
        }
    }"
);

const SET_LABELS_MUTATION: &str = concat!(
    "mutation SetLabels($input: SetLabelsInput!) {
        setLabels(input: $input) {
            ... on SetLabelsSuccess { ",
    label_fields!(),
    " }
            ... on SetLabelsError { errorCodes }
        }
    }"
);

const CREATE_HIGHLIGHT_MUTATION: &str = concat!(
    "mutation CreateHighlight($input: CreateHighlightInput!) {
        createHighlight(input: $input) {
            ... on CreateHighlightSuccess { ",
    highlight_fields!(),
    " }
            ... on CreateHighlightError { errorCodes }
        }
    }"
);

const UPDATE_HIGHLIGHT_MUTATION: &str = concat!(
    "mutation UpdateHighlight($input: UpdateHighlightInput!) {
        updateHighlight(input: $input) {
            ... on UpdateHighlightSuccess { ",
    highlight_fields!(),
    " }
            ... on UpdateHighlightError { errorCodes }
        }
    }"
);

/// Omnivore GraphQL client
#[derive(Debug, Clone)]
pub struct OmnivoreClient {
    client: reqwest::Client,
    api_url: String,
}

/// GraphQL request body
#[derive(Debug, Serialize)]
struct GraphQLRequest<V: Serialize> {
    query: &'static str,
    variables: V,
}

/// GraphQL response wrapper
#[derive(Debug, Deserialize)]
struct GraphQLResponse<T> {
    data: Option<T>,
    errors: Option<Vec<GraphQLError>>,
}

/// GraphQL error
#[derive(Debug, Deserialize)]
struct GraphQLError {
    message: String,
}

/// Unwrap one arm of an Omnivore `...Success | ...Error` union.
fn union_result<T>(operation: &str, value: Option<T>, error_codes: Vec<String>) -> Result<T> {
    if !error_codes.is_empty() {
        return Err(anyhow!("{operation} failed: {}", error_codes.join(", ")));
    }
    value.ok_or_else(|| anyhow!("{operation} returned no data"))
}

impl OmnivoreClient {
    /// Create a new Omnivore client.
    ///
    /// The API key is forwarded verbatim in the `Authorization` header.
    ///
    /// # Errors
    /// Returns error if headers cannot be constructed
    pub fn new(api_key: &str) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(api_key).context("Invalid Omnivore API key")?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            api_url: OMNIVORE_API_URL.to_string(),
        })
    }

    /// Create a client against a custom API URL (self-hosted or tests).
    pub fn with_url(api_key: &str, api_url: &str) -> Result<Self> {
        let mut client = Self::new(api_key)?;
        client.api_url = api_url.to_string();
        Ok(client)
    }

    /// Execute a GraphQL query/mutation
    async fn execute<V: Serialize, R: DeserializeOwned>(
        &self,
        query: &'static str,
        variables: V,
    ) -> Result<R> {
        let request = GraphQLRequest { query, variables };

        let response = self
            .client
            .post(&self.api_url)
            .json(&request)
            .send()
            .await
            .context("Failed to send request to Omnivore API")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("Omnivore API returned error status {status}: {body}"));
        }

        let gql_response: GraphQLResponse<R> = response
            .json()
            .await
            .context("Failed to parse Omnivore API response")?;

        if let Some(errors) = gql_response.errors {
            let error_messages: Vec<_> = errors.iter().map(|e| e.message.as_str()).collect();
            return Err(anyhow!("GraphQL errors: {}", error_messages.join(", ")));
        }

        gql_response
            .data
            .ok_or_else(|| anyhow!("No data in GraphQL response"))
    }

    /// Get an article by ID.
    ///
    /// Omnivore resolves `slug` against article IDs as well, and `"."`
    /// stands for the API key's own user.
    #[instrument(skip(self), fields(page_id = %page_id))]
    pub async fn get_article(&self, page_id: &str) -> Result<Article> {
        #[derive(Serialize)]
        struct Variables<'a> {
            username: &'static str,
            slug: &'a str,
            format: &'static str,
        }

        #[derive(Deserialize)]
        struct Response {
            article: ArticleResult,
        }

        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct ArticleResult {
            article: Option<Article>,
            #[serde(default)]
            error_codes: Vec<String>,
        }

        let response: Response = self
            .execute(
                ARTICLE_QUERY,
                Variables {
                    username: ".",
                    slug: page_id,
                    format: "markdown",
                },
            )
            .await?;

        let article = union_result(
            "article",
            response.article.article,
            response.article.error_codes,
        )?;
        debug!(
            labels = article.labels.len(),
            highlights = article.highlights.len(),
            "Retrieved article"
        );
        Ok(article)
    }

    /// Get all labels defined for the user.
    #[instrument(skip(self))]
    pub async fn get_labels(&self) -> Result<Vec<Label>> {
        #[derive(Deserialize)]
        struct Response {
            labels: LabelsResult,
        }

        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct LabelsResult {
            labels: Option<Vec<Label>>,
            #[serde(default)]
            error_codes: Vec<String>,
        }

        let response: Response = self.execute(LABELS_QUERY, serde_json::Map::new()).await?;
        let labels = union_result("labels", response.labels.labels, response.labels.error_codes)?;
        debug!(count = labels.len(), "Retrieved workspace labels");
        Ok(labels)
    }

    /// Replace the labels of an article.
    #[instrument(skip(self, selection), fields(page_id = %page_id))]
    pub async fn set_article_labels(
        &self,
        page_id: &str,
        selection: LabelSelection,
    ) -> Result<Vec<Label>> {
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct SetLabelsInput<'a> {
            page_id: &'a str,
            #[serde(skip_serializing_if = "Option::is_none")]
            labels: Option<Vec<LabelInput>>,
            #[serde(skip_serializing_if = "Option::is_none")]
            label_ids: Option<Vec<String>>,
        }

        #[derive(Serialize)]
        struct Variables<'a> {
            input: SetLabelsInput<'a>,
        }

        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Response {
            set_labels: SetLabelsResult,
        }

        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct SetLabelsResult {
            labels: Option<Vec<Label>>,
            #[serde(default)]
            error_codes: Vec<String>,
        }

        let (labels, label_ids) = match selection {
            LabelSelection::Names(labels) => (Some(labels), None),
            LabelSelection::Ids(ids) => (None, Some(ids)),
        };

        let response: Response = self
            .execute(
                SET_LABELS_MUTATION,
                Variables {
                    input: SetLabelsInput {
                        page_id,
                        labels,
                        label_ids,
                    },
                },
            )
            .await?;

        union_result(
            "setLabels",
            response.set_labels.labels,
            response.set_labels.error_codes,
        )
    }

    /// Create a `NOTE` highlight on an article.
    #[instrument(skip(self, note), fields(page_id = %note.article_id, note_id = %note.id))]
    pub async fn create_note_highlight(&self, note: NewNote) -> Result<Highlight> {
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct CreateHighlightInput {
            #[serde(flatten)]
            note: NewNote,
            #[serde(rename = "type")]
            highlight_type: &'static str,
        }

        #[derive(Serialize)]
        struct Variables {
            input: CreateHighlightInput,
        }

        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Response {
            create_highlight: HighlightResult,
        }

        let response: Response = self
            .execute(
                CREATE_HIGHLIGHT_MUTATION,
                Variables {
                    input: CreateHighlightInput {
                        note,
                        highlight_type: "NOTE",
                    },
                },
            )
            .await?;

        union_result(
            "createHighlight",
            response.create_highlight.highlight,
            response.create_highlight.error_codes,
        )
    }

    /// Overwrite a highlight's annotation.
    #[instrument(skip(self, annotation), fields(highlight_id = %highlight_id))]
    pub async fn update_highlight_annotation(
        &self,
        highlight_id: &str,
        annotation: &str,
    ) -> Result<Highlight> {
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct UpdateHighlightInput<'a> {
            highlight_id: &'a str,
            annotation: &'a str,
        }

        #[derive(Serialize)]
        struct Variables<'a> {
            input: UpdateHighlightInput<'a>,
        }

        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Response {
            update_highlight: HighlightResult,
        }

        let response: Response = self
            .execute(
                UPDATE_HIGHLIGHT_MUTATION,
                Variables {
                    input: UpdateHighlightInput {
                        highlight_id,
                        annotation,
                    },
                },
            )
            .await?;

        union_result(
            "updateHighlight",
            response.update_highlight.highlight,
            response.update_highlight.error_codes,
        )
    }
}

/// Highlight mutation result union
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct HighlightResult {
    highlight: Option<Highlight>,
    #[serde(default)]
    error_codes: Vec<String>,
}

#[async_trait]
impl OmnivoreGateway for OmnivoreClient {
    async fn fetch_article(&self, page_id: &str) -> Result<Article> {
        self.get_article(page_id).await
    }

    async fn fetch_all_labels(&self) -> Result<Vec<Label>> {
        self.get_labels().await
    }

    async fn set_labels(&self, page_id: &str, labels: LabelSelection) -> Result<Vec<Label>> {
        self.set_article_labels(page_id, labels).await
    }

    async fn create_note(&self, note: NewNote) -> Result<Highlight> {
        self.create_note_highlight(note).await
    }

    async fn update_note(&self, highlight_id: &str, annotation: &str) -> Result<Highlight> {
        self.update_highlight_annotation(highlight_id, annotation)
            .await
    }
}
