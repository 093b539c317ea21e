//! services/api/src/adapters/image_llm.rs
//!
//! This module contains the adapter for image generation. It implements the
//! `ImageGenerationService` port from the `core` crate.

use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::images::{CreateImageRequestArgs, Image, ImageModel, ImageResponseFormat},
    Client,
};
use async_trait::async_trait;
use linguist_core::ports::{ImageGenerationService, PortError, PortResult};

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements the `ImageGenerationService` port using the
/// OpenAI Images API.
#[derive(Clone)]
pub struct OpenAiImageAdapter {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiImageAdapter {
    /// Creates a new `OpenAiImageAdapter`.
    pub fn new(client: Client<OpenAIConfig>, model: String) -> Self {
        Self { client, model }
    }
}

//=========================================================================================
// `ImageGenerationService` Trait Implementation
//=========================================================================================

#[async_trait]
impl ImageGenerationService for OpenAiImageAdapter {
    /// Generates an illustration for a vocabulary word and returns it as a
    /// data URL ready for an `<img>` tag. A response without image data maps
    /// to `None` rather than an error.
    async fn word_image(&self, word: &str) -> PortResult<Option<String>> {
        let request = CreateImageRequestArgs::default()
            .prompt(format!(
                "High quality educational illustration of the word: {word}."
            ))
            .model(ImageModel::Other(self.model.clone()))
            .response_format(ImageResponseFormat::B64Json)
            .n(1)
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        let response = self
            .client
            .images()
            .generate(request)
            .await
            .map_err(|e: OpenAIError| PortError::Unexpected(e.to_string()))?;

        let data_url = response.data.first().and_then(|image| match image.as_ref() {
            Image::B64Json { b64_json, .. } => {
                Some(format!("data:image/png;base64,{}", b64_json))
            }
            Image::Url { url, .. } => Some(url.to_string()),
        });

        Ok(data_url)
    }
}
