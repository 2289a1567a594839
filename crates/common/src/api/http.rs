use async_trait::async_trait;
use bytes::Bytes;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use url::Url;

use super::{
    ApiError, ChangeSet, Cid, DagLink, DagStore, ErrorResponse, FileAdded, FileStat, KeyInfo,
    ObjectStat,
};

/// Client against an IPFS-like node's HTTP API (`/api/v0/...`).
#[derive(Debug, Clone)]
pub struct HttpDagStore {
    client: Client,
    endpoint: Url,
}

#[derive(Debug, Deserialize)]
struct HasHash {
    #[serde(rename = "Hash")]
    hash: Cid,
}

#[derive(Debug, Deserialize)]
struct LsResponse {
    #[serde(rename = "Objects", default)]
    objects: Vec<LsObject>,
}

#[derive(Debug, Deserialize)]
struct LsObject {
    #[serde(rename = "Links", default)]
    links: Vec<DagLink>,
}

#[derive(Debug, Deserialize)]
struct KeyListResponse {
    #[serde(rename = "Keys", default)]
    keys: Vec<KeyInfo>,
}

#[derive(Debug, Deserialize)]
struct NameResolveResponse {
    #[serde(rename = "Path")]
    path: String,
}

impl HttpDagStore {
    pub fn new(endpoint: &str) -> Result<Self, ApiError> {
        Ok(Self {
            client: Client::new(),
            endpoint: Url::parse(endpoint)?,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    fn url(&self, path: &str, args: &[&str], params: &[(&str, &str)]) -> Result<Url, ApiError> {
        let mut url = self.endpoint.join(path)?;
        {
            let mut query = url.query_pairs_mut();
            for arg in args {
                query.append_pair("arg", arg);
            }
            for (key, value) in params {
                query.append_pair(key, value);
            }
        }
        Ok(url)
    }

    async fn call(
        &self,
        path: &str,
        args: &[&str],
        params: &[(&str, &str)],
    ) -> Result<Response, ApiError> {
        let url = self.url(path, args, params)?;
        tracing::trace!(%url, "dag store call");
        let response = self.client.post(url).send().await?;
        Self::check(response).await
    }

    async fn call_json<T: DeserializeOwned>(
        &self,
        path: &str,
        args: &[&str],
        params: &[(&str, &str)],
    ) -> Result<T, ApiError> {
        let response = self.call(path, args, params).await?;
        Ok(response.json().await?)
    }

    /// Turn a non-2xx response into an error, decoding the store's JSON
    /// error payload when there is one.
    async fn check(response: Response) -> Result<Response, ApiError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status();
        let payload = response.bytes().await.unwrap_or_default();
        let decoded: ErrorResponse =
            serde_json::from_slice(&payload).unwrap_or_else(|_| ErrorResponse {
                message: format!("http status {status}"),
                ..ErrorResponse::default()
            });
        if is_not_found_message(&decoded.message) {
            Err(ApiError::NotFound(decoded.message))
        } else {
            Err(ApiError::Api {
                message: decoded.message,
                code: decoded.code,
            })
        }
    }
}

fn is_not_found_message(message: &str) -> bool {
    let message = message.to_ascii_lowercase();
    message.contains("not exist")
        || message.contains("not found")
        || message.contains("no link named")
        || message.contains("could not resolve")
}

#[async_trait]
impl DagStore for HttpDagStore {
    async fn object_stat(&self, path: &str) -> Result<ObjectStat, ApiError> {
        self.call_json("/api/v0/object/stat", &[path], &[]).await
    }

    async fn ls(&self, path: &str) -> Result<Vec<DagLink>, ApiError> {
        let response: LsResponse = self.call_json("/api/v0/ls", &[path], &[]).await?;
        Ok(response
            .objects
            .into_iter()
            .next()
            .map(|object| object.links)
            .unwrap_or_default())
    }

    async fn add(&self, name: &str, data: Bytes) -> Result<FileAdded, ApiError> {
        let url = self.url("/api/v0/add", &[], &[("pin", "false")])?;
        let part = Part::stream(data).file_name(name.to_string());
        let form = Form::new().part("file", part);
        let response = self.client.post(url).multipart(form).send().await?;
        let response = Self::check(response).await?;
        Ok(response.json().await?)
    }

    async fn cat(&self, path: &str) -> Result<Bytes, ApiError> {
        let response = self.call("/api/v0/cat", &[path], &[]).await?;
        Ok(response.bytes().await?)
    }

    async fn add_link(&self, root: &Cid, path: &str, target: &Cid) -> Result<Cid, ApiError> {
        let response: HasHash = self
            .call_json(
                "/api/v0/object/patch/add-link",
                &[root.as_str(), path, target.as_str()],
                &[("create", "true")],
            )
            .await?;
        Ok(response.hash)
    }

    async fn rm_link(&self, root: &Cid, path: &str) -> Result<Cid, ApiError> {
        let response: HasHash = self
            .call_json("/api/v0/object/patch/rm-link", &[root.as_str(), path], &[])
            .await?;
        Ok(response.hash)
    }

    async fn new_empty_dir(&self) -> Result<Cid, ApiError> {
        let response: HasHash = self
            .call_json("/api/v0/object/new", &["unixfs-dir"], &[])
            .await?;
        Ok(response.hash)
    }

    async fn diff(&self, before: &Cid, after: &Cid) -> Result<ChangeSet, ApiError> {
        self.call_json("/api/v0/object/diff", &[before.as_str(), after.as_str()], &[])
            .await
    }

    async fn files_stat(&self, path: &str) -> Result<FileStat, ApiError> {
        self.call_json("/api/v0/files/stat", &[path], &[]).await
    }

    async fn files_cp(&self, from: &str, to: &str) -> Result<(), ApiError> {
        self.call("/api/v0/files/cp", &[from, to], &[]).await?;
        Ok(())
    }

    async fn files_rm(&self, path: &str) -> Result<(), ApiError> {
        self.call("/api/v0/files/rm", &[path], &[("recursive", "true")])
            .await?;
        Ok(())
    }

    async fn key_list(&self) -> Result<Vec<KeyInfo>, ApiError> {
        let response: KeyListResponse = self.call_json("/api/v0/key/list", &[], &[]).await?;
        Ok(response.keys)
    }

    async fn name_resolve(&self, name: &str) -> Result<Cid, ApiError> {
        let response: NameResolveResponse = self
            .call_json("/api/v0/name/resolve", &[name], &[])
            .await?;
        let hash = response
            .path
            .rsplit('/')
            .next()
            .unwrap_or(response.path.as_str());
        Ok(Cid::new(hash))
    }

    async fn name_publish(&self, hash: &Cid, key: &str) -> Result<(), ApiError> {
        let path = format!("/ipfs/{hash}");
        self.call("/api/v0/name/publish", &[&path], &[("key", key)])
            .await?;
        Ok(())
    }
}
