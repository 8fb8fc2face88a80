use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Response, Url};
use reqwest_middleware::{ClientWithMiddleware, RequestBuilder};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info};
use trainer_config::groups::client::ConfigValueGroup as ClientConfig;
use trainer_types::{
    ChunkUploadResponse, InferenceRequest, Machine, MachineListResponse, MachineSummary, NewMachine,
    NewMachineResponse, StartTrainingResponse, TrainingStatusResponse, parse_machines_data,
};

use crate::error::{Result, TrainerClientError};
use crate::http_client::build_http_client;
use crate::interface::{ChunkUpload, FileUpload, TrainerApi};

#[derive(Debug, Clone)]
pub struct RemoteClient {
    client: ClientWithMiddleware,
    endpoint: Url,
}

impl RemoteClient {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let endpoint = Url::parse(config.endpoint.trim())?;
        if endpoint.cannot_be_a_base() {
            return Err(TrainerClientError::ConfigurationError(format!("endpoint {endpoint} cannot be a base URL")));
        }

        info!(endpoint = %endpoint, "creating trainer API client");
        Ok(Self {
            client: build_http_client(config)?,
            endpoint,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Appends path segments to the endpoint, keeping any path prefix it already carries.
    fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.endpoint.clone();
        url.path_segments_mut()
            .map_err(|_| TrainerClientError::ConfigurationError(format!("endpoint {} cannot be a base URL", self.endpoint)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn send(&self, action: &str, request: RequestBuilder) -> Result<Response> {
        let response = request
            .send()
            .await
            .map_err(|e| TrainerClientError::transport(action, e))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        debug!(action, status = status.as_u16(), body = %body, "request rejected");
        Err(TrainerClientError::from_status(action, status.as_u16(), &body))
    }

    /// Decodes a JSON body, treating an empty body as the type's default.
    async fn json_or_default<T: DeserializeOwned + Default>(response: Response) -> Result<T> {
        let body = response.text().await?;
        if body.trim().is_empty() {
            return Ok(T::default());
        }
        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl TrainerApi for RemoteClient {
    async fn upload_chunk(&self, chunk: ChunkUpload) -> Result<ChunkUploadResponse> {
        let url = self.url(&["api", "model-train", "chunk"])?;
        debug!(
            "Upload: POST chunk {} ({} bytes, last={}) of {} to {url}",
            chunk.chunk_index,
            chunk.data.len(),
            chunk.is_last,
            chunk.filename
        );

        let part = Part::bytes(chunk.data.to_vec())
            .file_name(chunk.filename.clone())
            .mime_str(&chunk.content_type)?;

        let (field, value) = chunk.target.as_pair();
        let mut form = Form::new()
            .text(field, value.to_string())
            .text("filename", chunk.filename)
            .text("chunkIndex", chunk.chunk_index.to_string())
            .text("isLast", chunk.is_last.to_string())
            .part("chunk", part);
        if let Some(upload_id) = chunk.upload_id {
            form = form.text("uploadId", upload_id);
        }

        let response = self.send("Upload", self.client.post(url).multipart(form)).await?;
        Self::json_or_default(response).await
    }

    async fn start_training(&self, upload: FileUpload) -> Result<StartTrainingResponse> {
        let url = self.url(&["api", "model-train", "start"])?;
        debug!("Upload: POST {} ({} bytes) to {url}", upload.filename, upload.data.len());

        let (field, value) = upload.target.as_pair();
        let request = self
            .client
            .post(url)
            .query(&[(field, value), ("filename", upload.filename.as_str())])
            .header(reqwest::header::CONTENT_TYPE, upload.content_type)
            .body(upload.data);

        let response = self.send("Upload", request).await?;
        Self::json_or_default(response).await
    }

    async fn training_status(&self, tracking_id: &str) -> Result<TrainingStatusResponse> {
        let url = self.url(&["api", "model-train", "status", tracking_id])?;
        let response = self.send("Training status", self.client.get(url)).await?;
        Self::json_or_default(response).await
    }

    async fn run_inference(&self, request: &InferenceRequest) -> Result<Value> {
        let url = self.url(&["api", "model-inference"])?;
        let response = self.send("Inference", self.client.post(url).json(request)).await?;
        let body = response.text().await?;
        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&body)?)
    }

    async fn list_machines(&self) -> Result<Vec<Machine>> {
        let url = self.url(&["api", "models"])?;
        let response = self.send("Fetch machines", self.client.get(url)).await?;
        let machines: MachineListResponse = response.json().await?;
        Ok(machines.into_machines())
    }

    async fn create_machine(&self, machine: &NewMachine) -> Result<Machine> {
        let url = self.url(&["api", "models"])?;
        let response = self.send("Add machine", self.client.post(url).json(machine)).await?;
        let created: NewMachineResponse = response
            .json()
            .await
            .map_err(|e| TrainerClientError::InvalidResponse(format!("created machine: {e}")))?;
        Ok(created.into_machine())
    }

    async fn delete_machine(&self, machine_id: &str) -> Result<()> {
        let url = self.url(&["api", "models", machine_id])?;
        self.send("Delete machine", self.client.delete(url)).await?;
        Ok(())
    }

    async fn machines_data(&self) -> Result<Vec<MachineSummary>> {
        let url = self.url(&["api", "machines-data", "all"])?;
        let response = self.send("Fetch machines data", self.client.get(url)).await?;
        let body: Value = response.json().await?;
        Ok(parse_machines_data(&body)?)
    }

    async fn set_inference_gateway(&self, name: &str, enable: bool) -> Result<()> {
        let toggle = if enable { "start" } else { "stop" };
        let url = self.url(&["api", "model-inference", toggle])?;
        let action = if enable { "Start inference" } else { "Stop inference" };
        self.send(action, self.client.post(url).query(&[("name", name)])).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(endpoint: &str) -> RemoteClient {
        let config = ClientConfig {
            endpoint: endpoint.to_string(),
            ..Default::default()
        };
        RemoteClient::new(&config).unwrap()
    }

    #[test]
    fn urls_keep_endpoint_prefix_and_escape_segments() {
        let c = client("http://localhost:8080/gateway/");
        assert_eq!(
            c.url(&["api", "model-train", "status", "job 1/2"]).unwrap().as_str(),
            "http://localhost:8080/gateway/api/model-train/status/job%201%2F2"
        );

        let c = client("http://localhost:8080");
        assert_eq!(c.url(&["api", "models"]).unwrap().as_str(), "http://localhost:8080/api/models");
    }

    #[test]
    fn rejects_non_base_endpoints() {
        let config = ClientConfig {
            endpoint: "mailto:ops@example.com".to_string(),
            ..Default::default()
        };
        assert!(matches!(RemoteClient::new(&config), Err(TrainerClientError::ConfigurationError(_))));

        let config = ClientConfig {
            endpoint: "not a url".to_string(),
            ..Default::default()
        };
        assert!(matches!(RemoteClient::new(&config), Err(TrainerClientError::ParseError(_))));
    }
}
