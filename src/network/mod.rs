use crate::{config::UploadConfig, error::UploadError, models::ResumableQuery};
use async_trait::async_trait;
use reqwest::{
    header::{HeaderMap, HeaderName, HeaderValue, USER_AGENT},
    multipart::{Form, Part},
};

/// Returns the response status; `Err` means the transport failed.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn get(&self, url: &str, query: &ResumableQuery) -> Result<u16, UploadError>;

    async fn post(
        &self,
        url: &str,
        query: &ResumableQuery,
        data: Vec<u8>,
    ) -> Result<u16, UploadError>;
}

pub fn user_agent() -> String {
    format!("resumable-upload/{}", env!("CARGO_PKG_VERSION"))
}

#[derive(Clone)]
pub struct ReqwestClient {
    pub client: reqwest::Client,
}

impl ReqwestClient {
    pub fn new(config: &UploadConfig) -> Result<Self, UploadError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&user_agent())
                .map_err(|e| UploadError::InvalidConfig(e.to_string()))?,
        );
        for (name, value) in &config.headers {
            let header = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| UploadError::InvalidConfig(format!("header {name}: {e}")))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| UploadError::InvalidConfig(format!("header {name}: {e}")))?;
            headers.insert(header, value);
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpClient for ReqwestClient {
    async fn get(&self, url: &str, query: &ResumableQuery) -> Result<u16, UploadError> {
        let resp = self.client.get(url).form(&query.fields()).send().await?;
        Ok(resp.status().as_u16())
    }

    async fn post(
        &self,
        url: &str,
        query: &ResumableQuery,
        data: Vec<u8>,
    ) -> Result<u16, UploadError> {
        let mut form = Form::new();
        for (name, value) in query.fields() {
            form = form.text(name, value);
        }
        let part = Part::bytes(data)
            .file_name(query.filename.clone())
            .mime_str("application/octet-stream")?;
        form = form.part("file", part);

        let resp = self.client.post(url).multipart(form).send().await?;
        Ok(resp.status().as_u16())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_agent_names_crate_version() {
        assert_eq!(
            user_agent(),
            format!("resumable-upload/{}", env!("CARGO_PKG_VERSION"))
        );
    }

    #[test]
    fn rejects_malformed_headers() {
        let config = UploadConfig::new("http://localhost/upload").with_header("bad header", "x");
        assert!(matches!(
            ReqwestClient::new(&config),
            Err(UploadError::InvalidConfig(_))
        ));

        let config = UploadConfig::new("http://localhost/upload").with_header("X-Ok", "fine");
        assert!(ReqwestClient::new(&config).is_ok());
    }
}
