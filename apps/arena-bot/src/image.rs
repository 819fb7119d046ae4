//! Winner image generation: optional GPT-4o look at the profile pictures,
//! then DALL-E 3 or gpt-image-1, then a size check before the image is
//! tweeted. Also backs the standalone `arena-bot image` tool.

use crate::config::BotConfig;
use crate::openai::{
    is_gpt_image_model, ChatMessage, ContentPart, ImageRequest, OpenAiClient,
};
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{imageops, GenericImageView, Rgb, RgbImage};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Largest image we attach to a tweet.
pub const MAX_IMAGE_BYTES: u64 = 5 * 1024 * 1024;

const SUPPORTED_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "webp", "gif"];

#[async_trait]
pub trait ImageMaker: Send + Sync {
    /// Path of the finished image, or `None` when generation failed.
    async fn generate_winner_image(
        &self,
        winner: &str,
        challenger: &str,
        opponent: &str,
        conversation_id: &str,
    ) -> Option<PathBuf>;
}

pub fn challenger_pfp_path(pfp_dir: &Path, handle: &str, conversation_id: &str) -> PathBuf {
    pfp_dir.join(format!("chall_{}_{}.png", handle, conversation_id))
}

pub fn opponent_pfp_path(pfp_dir: &Path, handle: &str, conversation_id: &str) -> PathBuf {
    pfp_dir.join(format!("opp_{}_{}.png", handle, conversation_id))
}

pub fn winner_prompt(
    winner: &str,
    challenger: &str,
    opponent: &str,
    has_challenger_pfp: bool,
    has_opponent_pfp: bool,
) -> String {
    let mut prompt = format!(
        "Create a dramatic colosseum scene featuring @{} as the victorious gladiator champion. ",
        winner
    );

    match (has_challenger_pfp, has_opponent_pfp) {
        (true, true) => {
            prompt.push_str(&format!(
                "The first image shows @{} (the challenger) and the second image shows @{} (the opponent). ",
                challenger, opponent
            ));
            prompt.push_str(
                "Use their facial features and appearance from these profile pictures to create the scene. ",
            );
        }
        (true, false) => prompt.push_str(&format!(
            "The first image shows @{} (the challenger). Use their facial features and appearance from this profile picture. ",
            challenger
        )),
        (false, true) => prompt.push_str(&format!(
            "The first image shows @{} (the opponent). Use their facial features and appearance from this profile picture. ",
            opponent
        )),
        (false, false) => {}
    }

    prompt.push_str(&format!(
        "The scene should show @{} standing triumphantly in the center of an ancient Roman colosseum, \
         with the defeated challengers @{} and @{} visible in the background. \
         The colosseum should be filled with cheering crowds, dramatic lighting, and epic atmosphere. \
         Make it cinematic and heroic, with the winner clearly the focus of the scene. \
         Ensure the facial features and characteristics from the provided profile pictures are accurately represented in the final scene.",
        winner, challenger, opponent
    ));
    prompt
}

pub fn validate_image(path: &Path) -> Result<()> {
    if !path.exists() {
        bail!("Image file not found: {}", path.display());
    }
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    if !SUPPORTED_EXTENSIONS.contains(&ext.as_str()) {
        bail!(
            "Unsupported image format '{}'. Supported: {}",
            ext,
            SUPPORTED_EXTENSIONS.join(", ")
        );
    }
    Ok(())
}

/// MIME type from the file contents, falling back to the extension.
/// Twitter serves avatars as JPEG even when saved under a `.png` name.
fn image_mime(path: &Path, bytes: &[u8]) -> &'static str {
    image::guess_format(bytes)
        .map(|format| format.to_mime_type())
        .unwrap_or_else(|_| mime_for(path))
}

fn mime_for(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase).as_deref() {
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        _ => "image/jpeg",
    }
}

/// `images/winner_x_1.png` + `_original.png` -> `images/winner_x_1_original.png`
fn sibling(output: &Path, suffix: &str) -> PathBuf {
    let stem = output
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    output.with_file_name(format!("{}{}", stem, suffix))
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Copies `input` to `output` when it is small enough, otherwise re-encodes
/// it as a maximally compressed PNG, halving the resolution until it fits.
pub fn compress_image(input: &Path, output: &Path, max_bytes: u64) -> Result<()> {
    let size = std::fs::metadata(input)
        .with_context(|| format!("Cannot stat {}", input.display()))?
        .len();
    if size <= max_bytes {
        std::fs::copy(input, output)?;
        debug!("Image already small enough ({} bytes), copied as-is", size);
        return Ok(());
    }

    let mut img = image::open(input).with_context(|| format!("Cannot decode {}", input.display()))?;
    for _ in 0..4 {
        let mut encoded = Vec::new();
        img.write_with_encoder(PngEncoder::new_with_quality(
            &mut encoded,
            CompressionType::Best,
            FilterType::Adaptive,
        ))?;

        if encoded.len() as u64 <= max_bytes {
            std::fs::write(output, &encoded)?;
            info!(
                "Compressed image {} -> {} bytes ({}x{})",
                size,
                encoded.len(),
                img.width(),
                img.height()
            );
            return Ok(());
        }
        img = img.resize(
            img.width() / 2,
            img.height() / 2,
            image::imageops::FilterType::Lanczos3,
        );
    }
    bail!("Could not get {} under {} bytes", input.display(), max_bytes)
}

/// Height every input is scaled to before combining.
const COMBINED_HEIGHT: u32 = 512;

/// Lays the images out left to right on a white canvas, each scaled to
/// 512 px high and centred vertically, and saves the result as PNG.
pub fn combine_images_side_by_side(paths: &[PathBuf], output: &Path) -> Result<PathBuf> {
    if paths.is_empty() {
        bail!("No images provided for combination");
    }

    let mut scaled = Vec::with_capacity(paths.len());
    for path in paths {
        let img = image::open(path).with_context(|| format!("Cannot decode {}", path.display()))?;
        let (w, h) = img.dimensions();
        let width = ((w as u64 * COMBINED_HEIGHT as u64) / h.max(1) as u64).max(1) as u32;
        scaled.push(img.resize_exact(width, COMBINED_HEIGHT, imageops::FilterType::Lanczos3).to_rgb8());
    }

    let total_width: u32 = scaled.iter().map(|i| i.width()).sum();
    let max_height = scaled.iter().map(|i| i.height()).max().unwrap_or(COMBINED_HEIGHT);
    let mut canvas = RgbImage::from_pixel(total_width, max_height, Rgb([255, 255, 255]));

    let mut left = 0i64;
    for img in &scaled {
        let top = ((max_height - img.height()) / 2) as i64;
        imageops::overlay(&mut canvas, img, left, top);
        left += img.width() as i64;
    }

    if let Some(parent) = output.parent() {
        std::fs::create_dir_all(parent)?;
    }
    canvas
        .save_with_format(output, image::ImageFormat::Png)
        .with_context(|| format!("Failed to write {}", output.display()))?;
    Ok(output.to_path_buf())
}

#[derive(Debug, Clone)]
pub struct ImageSettings {
    pub pfp_dir: PathBuf,
    pub images_dir: PathBuf,
    pub vision_model: String,
    pub image_model: String,
    pub size: String,
    pub quality: String,
    pub use_analysis: bool,
}

impl Default for ImageSettings {
    fn default() -> Self {
        Self {
            pfp_dir: PathBuf::from("pfp"),
            images_dir: PathBuf::from("images"),
            vision_model: "gpt-4o".to_string(),
            image_model: "dall-e-3".to_string(),
            size: "1024x1024".to_string(),
            quality: "standard".to_string(),
            use_analysis: true,
        }
    }
}

impl From<&BotConfig> for ImageSettings {
    fn from(config: &BotConfig) -> Self {
        Self {
            pfp_dir: config.pfp_dir.clone(),
            images_dir: config.images_dir.clone(),
            vision_model: config.vision_model.clone(),
            image_model: config.image_model.clone(),
            size: config.image_size.clone(),
            quality: config.image_quality.clone(),
            use_analysis: config.use_image_analysis,
        }
    }
}

impl ImageSettings {
    /// Prefix for debug log kinds and the label in the notes file.
    fn model_label(&self) -> (&'static str, &'static str) {
        if is_gpt_image_model(&self.image_model) {
            ("gpt_image", "gpt-image-1")
        } else {
            ("dalle", "DALL-E")
        }
    }
}

pub struct ImageGenerator {
    client: OpenAiClient,
    settings: ImageSettings,
}

impl ImageGenerator {
    pub fn new(client: OpenAiClient, settings: ImageSettings) -> Self {
        Self { client, settings }
    }

    pub fn settings(&self) -> &ImageSettings {
        &self.settings
    }

    async fn inline_images(&self, paths: &[PathBuf]) -> Result<Vec<ContentPart>> {
        let mut parts = Vec::with_capacity(paths.len());
        for path in paths {
            let bytes = tokio::fs::read(path)
                .await
                .with_context(|| format!("Failed to read {}", path.display()))?;
            parts.push(ContentPart::image_base64(image_mime(path, &bytes), &STANDARD.encode(bytes)));
        }
        Ok(parts)
    }

    /// Writes `images/{stem}_{kind}.dbg.log`. Failures are only logged.
    async fn save_debug_log(&self, output: &Path, kind: &str, mut data: Value) {
        let stem = output
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image".to_string());
        let path = self.settings.images_dir.join(format!("{}_{}.dbg.log", stem, kind));
        data["timestamp"] = json!(chrono::Utc::now().to_rfc3339());

        let body = match serde_json::to_string_pretty(&data) {
            Ok(body) => body,
            Err(e) => {
                warn!("Could not encode debug log {}: {}", path.display(), e);
                return;
            }
        };
        if let Err(e) = tokio::fs::create_dir_all(&self.settings.images_dir).await {
            warn!("Could not create {}: {}", self.settings.images_dir.display(), e);
            return;
        }
        match tokio::fs::write(&path, body).await {
            Ok(()) => debug!("Debug log saved to {}", path.display()),
            Err(e) => warn!("Could not save debug log {}: {}", path.display(), e),
        }
    }

    /// Describes the input images with the vision model, folded into a
    /// description for `prompt`. Without images the prompt comes back as-is.
    pub async fn analyze_images(&self, paths: &[PathBuf], prompt: &str, output: &Path) -> Result<String> {
        if paths.is_empty() {
            return Ok(prompt.to_string());
        }
        for path in paths {
            validate_image(path)?;
        }

        let analysis_prompt = format!(
            "Analyze these {} image(s) and describe what you see. Focus on:\n\
             1. Physical characteristics (if people: hair color, style, facial features, clothing)\n\
             2. Age and gender (if applicable)\n\
             3. Any distinctive features or expressions\n\
             4. Objects, scenes, or environments present\n\
             5. Overall mood or atmosphere\n\n\
             Then, based on the prompt: \"{}\", create a detailed description for generating a new image.\n\
             The description should be suitable for image generation and incorporate elements from the analyzed images.",
            paths.len(),
            prompt
        );

        let mut parts = vec![ContentPart::text(analysis_prompt.clone())];
        parts.extend(self.inline_images(paths).await?);
        let messages = [ChatMessage::user_parts(parts)];

        info!("Analyzing {} image(s) with {}...", paths.len(), self.settings.vision_model);
        let endpoint = format!("{}/chat/completions", self.client.base_url());
        match self
            .client
            .chat(&self.settings.vision_model, &messages, Some(1000))
            .await
        {
            Ok(analysis) => {
                self.save_debug_log(
                    output,
                    "gpt4o_analysis",
                    json!({
                        "apiEndpoint": endpoint,
                        "model": self.settings.vision_model,
                        "inputImages": paths,
                        "originalPrompt": prompt,
                        "analysisPrompt": analysis_prompt,
                        "extractedAnalysis": analysis,
                    }),
                )
                .await;
                debug!("Image analysis: {}", analysis);
                Ok(analysis)
            }
            Err(e) => {
                self.save_debug_log(
                    output,
                    "gpt4o_analysis_exception",
                    json!({
                        "apiEndpoint": endpoint,
                        "model": self.settings.vision_model,
                        "inputImages": paths,
                        "originalPrompt": prompt,
                        "errorInfo": { "exceptionMessage": format!("{:#}", e) },
                    }),
                )
                .await;
                Err(e.context("GPT-4o analysis failed"))
            }
        }
    }

    /// Full pipeline for one image. Returns `output` once written.
    pub async fn generate(
        &self,
        paths: &[PathBuf],
        prompt: &str,
        output: &Path,
        use_analysis: bool,
    ) -> Result<PathBuf> {
        for path in paths {
            validate_image(path)?;
        }
        let analysed = use_analysis && !paths.is_empty();
        let (kind, label) = self.settings.model_label();
        let (analysis, image_prompt) = if analysed {
            let analysis = self.analyze_images(paths, prompt, output).await?;
            let image_prompt = format!(
                "Create a photorealistic image based on this analysis: {}\n\n\
                 Original request: {}\n\n\
                 Generate a high-quality, detailed image that incorporates the described elements in the requested scene. \
                 Make sure the image is realistic, well-lit, and captures the essence of the original request.",
                analysis, prompt
            );
            (Some(analysis), image_prompt)
        } else {
            (None, prompt.to_string())
        };
        let image_prompt = collapse_whitespace(&image_prompt);

        let request = ImageRequest::new(
            &self.settings.image_model,
            &image_prompt,
            &self.settings.size,
            &self.settings.quality,
        );
        let endpoint = format!("{}/images/generations", self.client.base_url());
        info!("Generating image with {}...", request.model);

        let result = self.render(&request, output).await;
        match &result {
            Ok(source) => {
                self.save_debug_log(
                    output,
                    &format!("{}_generation", kind),
                    json!({
                        "apiEndpoint": endpoint,
                        "model": request.model,
                        "inputImages": paths,
                        "originalPrompt": prompt,
                        "finalPrompt": image_prompt,
                        "useGpt4oAnalysis": use_analysis,
                        "requestPayload": request,
                        "generatedImage": source,
                        "imageSavedTo": output,
                    }),
                )
                .await;
            }
            Err(e) => {
                self.save_debug_log(
                    output,
                    &format!("{}_generation_exception", kind),
                    json!({
                        "apiEndpoint": endpoint,
                        "model": request.model,
                        "inputImages": paths,
                        "originalPrompt": prompt,
                        "finalPrompt": image_prompt,
                        "useGpt4oAnalysis": use_analysis,
                        "errorInfo": { "exceptionMessage": format!("{:#}", e) },
                    }),
                )
                .await;
            }
        }

        let mut notes = format!("Original prompt: {}\n\n", prompt);
        match &analysis {
            Some(a) => notes.push_str(&format!("GPT-4o analysis: {}\n\n", a)),
            None => notes.push_str("No GPT-4o analysis used (direct prompt mode)\n\n"),
        }
        if result.is_ok() {
            notes.push_str(&format!("{} prompt: {}\n", label, image_prompt));
        } else {
            // Keep the enhanced prompt so it can be reused with another tool.
            notes.push_str(&format!(
                "Enhanced prompt for image generation: {}\n\nNote: {} failed.\n",
                image_prompt, label
            ));
        }
        let notes_path = sibling(output, "_analysis.txt");
        if let Err(e) = tokio::fs::write(&notes_path, notes).await {
            warn!("Could not write {}: {}", notes_path.display(), e);
        }
        result?;

        info!("Generated image saved to {}", output.display());
        Ok(output.to_path_buf())
    }

    /// Generates, fetches and size-limits the image. Returns where the image
    /// came from (URL or inline size) for the debug log.
    async fn render(&self, request: &ImageRequest, output: &Path) -> Result<String> {
        let generated = self.client.generate_image(request).await?;
        let source = generated.describe();
        let bytes = self.client.image_bytes(generated).await?;

        let original = sibling(output, "_original.png");
        if let Some(parent) = output.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&original, &bytes)
            .await
            .with_context(|| format!("Failed to write {}", original.display()))?;

        let (src, dst) = (original.clone(), output.to_path_buf());
        let compressed =
            tokio::task::spawn_blocking(move || compress_image(&src, &dst, MAX_IMAGE_BYTES)).await;
        match compressed {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                warn!("Compression failed, using original image: {:#}", e);
                tokio::fs::copy(&original, output).await?;
            }
            Err(e) => {
                warn!("Compression task failed, using original image: {}", e);
                tokio::fs::copy(&original, output).await?;
            }
        }
        Ok(source)
    }

    /// Sends the images and prompt to a chat model and saves its text answer
    /// next to `output` as `.txt`. Chat models describe images, they do not
    /// draw them. Returns the text file path.
    pub async fn describe_images(
        &self,
        paths: &[PathBuf],
        prompt: &str,
        output: &Path,
        model: &str,
    ) -> Result<PathBuf> {
        for path in paths {
            validate_image(path)?;
        }

        let mut parts = vec![ContentPart::text(prompt)];
        parts.extend(self.inline_images(paths).await?);
        let messages = [ChatMessage::user_parts(parts)];
        let endpoint = format!("{}/chat/completions", self.client.base_url());

        info!("Sending {} image(s) to {} with prompt '{}'", paths.len(), model, prompt);
        let text = match self.client.chat(model, &messages, Some(1000)).await {
            Ok(text) => text,
            Err(e) => {
                self.save_debug_log(
                    output,
                    "gpt4o_text_generation_exception",
                    json!({
                        "apiEndpoint": endpoint,
                        "model": model,
                        "inputImages": paths,
                        "prompt": prompt,
                        "errorInfo": { "exceptionMessage": format!("{:#}", e) },
                    }),
                )
                .await;
                return Err(e.context("Text generation failed"));
            }
        };
        self.save_debug_log(
            output,
            "gpt4o_text_generation",
            json!({
                "apiEndpoint": endpoint,
                "model": model,
                "inputImages": paths,
                "prompt": prompt,
                "extractedText": text,
            }),
        )
        .await;

        let inputs = if paths.is_empty() {
            "None".to_string()
        } else {
            paths.iter().map(|p| p.display().to_string()).collect::<Vec<_>>().join(", ")
        };
        let text_path = output.with_extension("txt");
        if let Some(parent) = text_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(
            &text_path,
            format!("Prompt: {}\nInput images: {}\nGenerated response: {}\n", prompt, inputs, text),
        )
        .await
        .with_context(|| format!("Failed to write {}", text_path.display()))?;
        info!("Response saved to {}", text_path.display());
        Ok(text_path)
    }
}

#[async_trait]
impl ImageMaker for ImageGenerator {
    async fn generate_winner_image(
        &self,
        winner: &str,
        challenger: &str,
        opponent: &str,
        conversation_id: &str,
    ) -> Option<PathBuf> {
        let chall_pfp = challenger_pfp_path(&self.settings.pfp_dir, challenger, conversation_id);
        let opp_pfp = opponent_pfp_path(&self.settings.pfp_dir, opponent, conversation_id);

        let mut inputs = Vec::new();
        let has_chall = chall_pfp.exists();
        let has_opp = opp_pfp.exists();
        if has_chall {
            inputs.push(chall_pfp);
        }
        if has_opp {
            inputs.push(opp_pfp);
        }

        let prompt = winner_prompt(winner, challenger, opponent, has_chall, has_opp);
        let output = self
            .settings
            .images_dir
            .join(format!("winner_{}_{}.png", winner, conversation_id));

        match self
            .generate(&inputs, &prompt, &output, self.settings.use_analysis)
            .await
        {
            Ok(path) => match tokio::fs::metadata(&path).await {
                Ok(meta) => {
                    info!("✅ Winner image ready: {} ({} bytes)", path.display(), meta.len());
                    Some(path)
                }
                Err(_) => {
                    warn!("Generated image file not found: {}", path.display());
                    None
                }
            },
            Err(e) => {
                warn!("Winner image generation FAILED: {:#}", e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_winner_prompt_names_inputs() {
        let both = winner_prompt("lucius", "maximus", "lucius", true, true);
        assert!(both.starts_with("Create a dramatic colosseum scene featuring @lucius"));
        assert!(both.contains("the second image shows @lucius (the opponent)"));

        let opp_only = winner_prompt("lucius", "maximus", "lucius", false, true);
        assert!(opp_only.contains("The first image shows @lucius (the opponent)."));
        assert!(!opp_only.contains("(the challenger)"));

        let none = winner_prompt("a", "a", "b", false, false);
        assert!(!none.contains("The first image"));
        assert!(none.contains("defeated challengers @a and @b"));
    }

    #[test]
    fn test_validate_image() {
        let dir = tempfile::tempdir().unwrap();
        let png = dir.path().join("a.PNG");
        std::fs::write(&png, b"x").unwrap();
        let txt = dir.path().join("a.txt");
        std::fs::write(&txt, b"x").unwrap();

        assert!(validate_image(&png).is_ok());
        assert!(validate_image(&txt).is_err());
        assert!(validate_image(&dir.path().join("missing.png")).is_err());
    }

    #[test]
    fn test_paths() {
        let pfp = Path::new("pfp");
        assert_eq!(challenger_pfp_path(pfp, "max", "9"), Path::new("pfp/chall_max_9.png"));
        assert_eq!(opponent_pfp_path(pfp, "luc", "9"), Path::new("pfp/opp_luc_9.png"));
        assert_eq!(
            sibling(Path::new("images/winner_a_1.png"), "_original.png"),
            Path::new("images/winner_a_1_original.png")
        );
    }

    #[test]
    fn test_mime_comes_from_contents_not_name() {
        let dir = tempfile::tempdir().unwrap();
        // Avatars are saved as .png but Twitter serves JPEG.
        let avatar = dir.path().join("chall_max_9.png");
        image::DynamicImage::ImageRgb8(RgbImage::new(4, 4))
            .save_with_format(&avatar, image::ImageFormat::Jpeg)
            .unwrap();
        let bytes = std::fs::read(&avatar).unwrap();
        assert_eq!(image_mime(&avatar, &bytes), "image/jpeg");

        assert_eq!(image_mime(Path::new("x.gif"), b"not an image"), "image/gif");
        assert_eq!(image_mime(Path::new("x.bin"), b"not an image"), "image/jpeg");
    }

    #[test]
    fn test_combine_images_side_by_side() {
        let dir = tempfile::tempdir().unwrap();
        let wide = dir.path().join("wide.png");
        let tall = dir.path().join("tall.png");
        RgbImage::from_pixel(200, 100, Rgb([255, 0, 0])).save(&wide).unwrap();
        RgbImage::from_pixel(100, 200, Rgb([0, 0, 255])).save(&tall).unwrap();

        let out = dir.path().join("combined/out.png");
        let path = combine_images_side_by_side(&[wide, tall], &out).unwrap();
        let combined = image::open(&path).unwrap().to_rgb8();

        assert_eq!(combined.height(), 512);
        assert_eq!(combined.width(), 1024 + 256);
        assert!(combined.get_pixel(10, 256)[0] >= 250);
        assert!(combined.get_pixel(1100, 256)[2] >= 250);

        assert!(combine_images_side_by_side(&[], &out).is_err());
    }

    #[test]
    fn test_model_label() {
        let mut settings = ImageSettings::default();
        assert_eq!(settings.model_label(), ("dalle", "DALL-E"));
        settings.image_model = "gpt-image-1".into();
        assert_eq!(settings.model_label(), ("gpt_image", "gpt-image-1"));
    }

    #[test]
    fn test_collapse_whitespace() {
        assert_eq!(collapse_whitespace("  a\n\n  b\tc "), "a b c");
    }

    #[test]
    fn test_compress_small_image_is_copied() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.png");
        let output = dir.path().join("out.png");
        std::fs::write(&input, b"tiny").unwrap();

        compress_image(&input, &output, MAX_IMAGE_BYTES).unwrap();
        assert_eq!(std::fs::read(&output).unwrap(), b"tiny");
    }

    #[test]
    fn test_compress_reencodes_large_image() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.png");
        let output = dir.path().join("out.png");

        // Noise keeps the encoded size close to the raw size.
        let mut seed: u32 = 7;
        let img = image::RgbaImage::from_fn(64, 64, |_, _| {
            seed = seed.wrapping_mul(1_103_515_245).wrapping_add(12_345);
            let [_, a, b, c] = seed.to_le_bytes();
            image::Rgba([a, b, c, 255])
        });
        image::DynamicImage::ImageRgba8(img)
            .save_with_format(&input, image::ImageFormat::Png)
            .unwrap();
        let original = std::fs::metadata(&input).unwrap().len();

        compress_image(&input, &output, original - 1).unwrap();
        let decoded = image::open(&output).unwrap();
        assert!(std::fs::metadata(&output).unwrap().len() < original);
        assert!(decoded.width() <= 64);
    }
}
