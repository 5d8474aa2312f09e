//! # Document Loader
//!
//! Entry points that turn raw bytes, or bytes fetched from a URL, into a
//! built [`Scene`].

use crate::config::SceneConfig;
use crate::display::DisplayBackend;
use crate::errors::LoadError;
use crate::node::NodeId;
use crate::scene::Scene;
use async_trait::async_trait;
use psd_data::DocumentDecoder;
use tracing::{info, instrument};

/// Status and payload of a completed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl FetchResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Transport used by [`Document::from_url`].
///
/// Implementations report transport failures as errors and hand back any
/// response they receive, whatever its status. No retries happen here.
#[async_trait]
pub trait ByteFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> anyhow::Result<FetchResponse>;
}

/// [`ByteFetcher`] over a `reqwest` client.
#[derive(Debug, Clone, Default)]
pub struct ReqwestFetcher {
    client: reqwest::Client,
}

impl ReqwestFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ByteFetcher for ReqwestFetcher {
    async fn fetch(&self, url: &str) -> anyhow::Result<FetchResponse> {
        let response = self.client.get(url).send().await?;
        let status = response.status().as_u16();
        let body = response.bytes().await?;
        Ok(FetchResponse {
            status,
            body: body.to_vec(),
        })
    }
}

/// A loaded document: the built scene and its root group.
pub struct Document<B: DisplayBackend> {
    scene: Scene<B>,
    root: NodeId,
}

impl<B: DisplayBackend + 'static> Document<B> {
    /// Decodes `bytes` and builds the tree with the default configuration
    /// plus any environment overrides (see [`SceneConfig::from_env`]).
    pub fn from_buffer(
        bytes: &[u8],
        decoder: &dyn DocumentDecoder,
        backend: B,
    ) -> Result<Self, LoadError> {
        Self::from_buffer_with(bytes, decoder, backend, SceneConfig::from_env())
    }

    /// Decodes `bytes` and builds the tree.
    ///
    /// Decode errors are returned unchanged and nothing is built. The root is
    /// a group even when the document has no layers.
    #[instrument(level = "debug", skip(bytes, decoder, backend, config), fields(len = bytes.len()))]
    pub fn from_buffer_with(
        bytes: &[u8],
        decoder: &dyn DocumentDecoder,
        backend: B,
        config: SceneConfig,
    ) -> Result<Self, LoadError> {
        let doc = decoder.decode(bytes)?;
        let mut scene = Scene::new(backend, config);
        let root = scene.build_root(&doc)?;
        info!(nodes = scene.len(), "document built");
        Ok(Self { scene, root })
    }

    /// Fetches `url` and builds the tree from the response body.
    ///
    /// A transport failure or a non-2xx status gives [`LoadError::Fetch`], an
    /// empty payload gives [`LoadError::EmptyBody`].
    #[instrument(level = "debug", skip(fetcher, decoder, backend))]
    pub async fn from_url<F: ByteFetcher + ?Sized>(
        url: &str,
        fetcher: &F,
        decoder: &dyn DocumentDecoder,
        backend: B,
    ) -> Result<Self, LoadError> {
        let response = fetcher.fetch(url).await.map_err(|err| LoadError::Fetch {
            url: url.to_string(),
            reason: format!("{err:#}"),
        })?;
        if !response.is_success() {
            return Err(LoadError::Fetch {
                url: url.to_string(),
                reason: format!("HTTP status {}", response.status),
            });
        }
        if response.body.is_empty() {
            return Err(LoadError::EmptyBody {
                url: url.to_string(),
            });
        }
        Self::from_buffer(&response.body, decoder, backend)
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn scene(&self) -> &Scene<B> {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut Scene<B> {
        &mut self.scene
    }

    pub fn into_scene(self) -> Scene<B> {
        self.scene
    }
}
