pub mod dto;

use async_trait::async_trait;
use reqwest::{Client, Method, Response, Url};
use tracing::{debug, error};

use crate::error::AppError;
use crate::models::{Task, TaskDraft};

pub use dto::TaskUpdate;

/// The REST resource the store synchronizes with.
#[async_trait]
pub trait TaskApi: Send + Sync {
    async fn list_tasks(&self) -> Result<Vec<Task>, AppError>;
    async fn create_task(&self, draft: &TaskDraft) -> Result<Task, AppError>;
    async fn delete_task(&self, id: &str) -> Result<(), AppError>;
    async fn update_task(&self, id: &str, update: &TaskUpdate) -> Result<Task, AppError>;
}

pub struct HttpTaskApi {
    client: Client,
    base_url: Url,
}

impl HttpTaskApi {
    pub fn new(base_url: &str) -> Result<Self, AppError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| AppError::Config(format!("invalid API url {:?}: {}", base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(AppError::Config(format!("API url {} cannot be a base", base_url)));
        }
        let client = Client::builder()
            .build()
            .map_err(|e| AppError::Config(format!("Failed to build http client: {}", e)))?;
        Ok(Self { client, base_url })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, AppError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| AppError::Config(format!("API url {} cannot be a base", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn send<B: serde::Serialize + ?Sized>(
        &self,
        method: Method,
        url: Url,
        body: Option<&B>,
    ) -> Result<Response, AppError> {
        let mut request = self.client.request(method.clone(), url.clone());
        if let Some(body) = body {
            request = request.json(body);
        }

        debug!("{} {}", method, url);
        let response = request.send().await.map_err(|e| {
            error!("API error ({} {}): {}", method, url, e);
            AppError::Http(e)
        })?;

        let status = response.status();
        if !status.is_success() {
            error!("API error ({} {}): status {}", method, url, status.as_u16());
            return Err(AppError::Api {
                method: method.to_string(),
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        Ok(response)
    }
}

#[async_trait]
impl TaskApi for HttpTaskApi {
    async fn list_tasks(&self) -> Result<Vec<Task>, AppError> {
        let url = self.endpoint(&["tasks"])?;
        let response = self.send::<()>(Method::GET, url, None).await?;
        Ok(response.json::<Vec<Task>>().await?)
    }

    async fn create_task(&self, draft: &TaskDraft) -> Result<Task, AppError> {
        let url = self.endpoint(&["tasks"])?;
        let response = self.send(Method::POST, url, Some(draft)).await?;
        Ok(response.json::<Task>().await?)
    }

    async fn delete_task(&self, id: &str) -> Result<(), AppError> {
        let url = self.endpoint(&["tasks", id])?;
        // any body is ignored
        self.send::<()>(Method::DELETE, url, None).await?;
        Ok(())
    }

    async fn update_task(&self, id: &str, update: &TaskUpdate) -> Result<Task, AppError> {
        let url = self.endpoint(&["tasks", id])?;
        let response = self.send(Method::PATCH, url, Some(update)).await?;
        Ok(response.json::<Task>().await?)
    }
}
