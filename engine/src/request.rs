use base64::{Engine as _, engine::general_purpose::STANDARD};
use log::warn;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

pub const MAX_IMAGE_COUNT: u8 = 10;
pub const MAX_VIDEO_DURATION_SECS: u8 = 15;
/// Image-to-video editing accepts shorter clips than text-to-video
pub const MAX_EDIT_DURATION_SECS: u8 = 8;

pub const DEFAULT_IMAGE_ASPECT_RATIO: &str = "1:1";
pub const DEFAULT_VIDEO_ASPECT_RATIO: &str = "16:9";
pub const DEFAULT_VIDEO_DURATION_SECS: u8 = 5;

#[derive(
    Debug,
    Clone,
    Copy,
    Display,
    EnumString,
    clap::ValueEnum,
    Serialize,
    Deserialize,
    Hash,
    PartialEq,
    Eq,
    Default,
)]
pub enum Resolution {
    #[default]
    #[strum(to_string = "480p")]
    #[serde(rename = "480p")]
    #[value(name = "480p")]
    P480,
    #[strum(to_string = "720p")]
    #[serde(rename = "720p")]
    #[value(name = "720p")]
    P720,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image { count: u8 },
    Video { duration_secs: u8, resolution: Resolution },
}

impl MediaKind {
    /// Extension used when the caller's filename has none
    pub fn default_extension(&self) -> &'static str {
        match self {
            MediaKind::Image { .. } => "png",
            MediaKind::Video { .. } => "mp4",
        }
    }

    pub fn is_video(&self) -> bool {
        matches!(self, MediaKind::Video { .. })
    }
}

/// Image bytes to edit or animate, sent inline as a data URI
#[derive(Clone, PartialEq, Eq)]
pub struct SourceImage(Vec<u8>);

impl SourceImage {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn data_uri(&self) -> String {
        format!("data:image/png;base64,{}", STANDARD.encode(&self.0))
    }
}

impl std::fmt::Debug for SourceImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SourceImage({} bytes)", self.0.len())
    }
}

/// A single image or video creation request.
///
/// Counts and durations are clamped when set, the editing-mode duration cap is
/// applied on read so it holds regardless of builder call order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    kind: MediaKind,
    prompt: String,
    model: String,
    aspect_ratio: String,
    source_image: Option<SourceImage>,
}

impl GenerationRequest {
    pub fn image(prompt: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            kind: MediaKind::Image { count: 1 },
            prompt: prompt.into(),
            model: model.into(),
            aspect_ratio: DEFAULT_IMAGE_ASPECT_RATIO.into(),
            source_image: None,
        }
    }

    pub fn video(prompt: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            kind: MediaKind::Video {
                duration_secs: DEFAULT_VIDEO_DURATION_SECS,
                resolution: Resolution::default(),
            },
            prompt: prompt.into(),
            model: model.into(),
            aspect_ratio: DEFAULT_VIDEO_ASPECT_RATIO.into(),
            source_image: None,
        }
    }

    /// Ignored for video requests
    pub fn with_count(mut self, requested: u32) -> Self {
        if let MediaKind::Image { count } = &mut self.kind {
            *count = requested.clamp(1, MAX_IMAGE_COUNT as u32) as u8;
        }
        self
    }

    /// Ignored for image requests
    pub fn with_duration(mut self, requested_secs: u32) -> Self {
        if let MediaKind::Video { duration_secs, .. } = &mut self.kind {
            *duration_secs = requested_secs.clamp(1, MAX_VIDEO_DURATION_SECS as u32) as u8;
        }
        self
    }

    /// Ignored for image requests
    pub fn with_resolution(mut self, res: Resolution) -> Self {
        if let MediaKind::Video { resolution, .. } = &mut self.kind {
            *resolution = res;
        }
        self
    }

    pub fn with_aspect_ratio(mut self, aspect_ratio: impl Into<String>) -> Self {
        self.aspect_ratio = aspect_ratio.into();
        self
    }

    pub fn with_source_image(mut self, image: SourceImage) -> Self {
        self.source_image = Some(image);
        self
    }

    pub fn kind(&self) -> MediaKind {
        self.kind
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn aspect_ratio(&self) -> &str {
        &self.aspect_ratio
    }

    pub fn source_image(&self) -> Option<&SourceImage> {
        self.source_image.as_ref()
    }

    /// Number of images that will be requested, `None` for videos
    pub fn count(&self) -> Option<u8> {
        match self.kind {
            MediaKind::Image { count } => Some(count),
            MediaKind::Video { .. } => None,
        }
    }

    /// Effective clip length, `None` for images
    pub fn duration_secs(&self) -> Option<u8> {
        match self.kind {
            MediaKind::Video { duration_secs, .. } if self.source_image.is_some() => {
                Some(duration_secs.min(MAX_EDIT_DURATION_SECS))
            }
            MediaKind::Video { duration_secs, .. } => Some(duration_secs),
            MediaKind::Image { .. } => None,
        }
    }

    pub fn resolution(&self) -> Option<Resolution> {
        match self.kind {
            MediaKind::Video { resolution, .. } => Some(resolution),
            MediaKind::Image { .. } => None,
        }
    }

    /// Wire body for the generation endpoint
    pub fn body(&self) -> RequestBody<'_> {
        if let MediaKind::Video { duration_secs, .. } = self.kind {
            if self.duration_secs() != Some(duration_secs) {
                warn!(
                    "Editing duration capped at {MAX_EDIT_DURATION_SECS}s, requested {duration_secs}s"
                );
            }
        }

        RequestBody {
            model: &self.model,
            prompt: &self.prompt,
            n: self.count(),
            response_format: (!self.kind.is_video()).then_some("b64_json"),
            duration: self.duration_secs(),
            resolution: self.resolution(),
            aspect_ratio: Some(self.aspect_ratio.as_str()).filter(|a| !a.is_empty()),
            image_url: self.source_image.as_ref().map(SourceImage::data_uri),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RequestBody<'a> {
    pub model: &'a str,
    pub prompt: &'a str,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub n: Option<u8>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_format: Option<&'static str>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<u8>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolution: Option<Resolution>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub aspect_ratio: Option<&'a str>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use expect_test::expect;

    use super::*;

    #[test]
    fn count_is_clamped() {
        for (requested, expected) in [(0, 1), (1, 1), (4, 4), (10, 10), (11, 10), (500, 10)] {
            let req = GenerationRequest::image("p", "m").with_count(requested);
            assert_eq!(req.count(), Some(expected), "requested {requested}");
        }
    }

    #[test]
    fn duration_is_clamped() {
        for (requested, expected) in [(0, 1), (5, 5), (15, 15), (16, 15), (90, 15)] {
            let req = GenerationRequest::video("p", "m").with_duration(requested);
            assert_eq!(req.duration_secs(), Some(expected), "requested {requested}");
        }
    }

    #[test]
    fn source_image_caps_duration() {
        let png = SourceImage::new(vec![1, 2, 3]);
        for (requested, expected) in [(0, 1), (5, 5), (8, 8), (9, 8), (15, 8), (40, 8)] {
            let req = GenerationRequest::video("p", "m")
                .with_duration(requested)
                .with_source_image(png.clone());
            assert_eq!(req.duration_secs(), Some(expected), "requested {requested}");
        }

        // order of builder calls does not matter
        let req = GenerationRequest::video("p", "m")
            .with_source_image(png)
            .with_duration(12);
        assert_eq!(req.duration_secs(), Some(8));
    }

    #[test]
    fn kind_specific_setters_are_ignored_for_other_kind() {
        let img = GenerationRequest::image("p", "m")
            .with_duration(9)
            .with_resolution(Resolution::P720);
        assert_eq!(img.duration_secs(), None);
        assert_eq!(img.resolution(), None);

        let vid = GenerationRequest::video("p", "m").with_count(3);
        assert_eq!(vid.count(), None);
    }

    #[test]
    fn resolution_string_forms() {
        assert_eq!(Resolution::P720.to_string(), "720p");
        assert_eq!("480p".parse::<Resolution>().unwrap(), Resolution::P480);
    }

    #[test]
    fn image_body_serialization() {
        let req = GenerationRequest::image("a red fox", "grok-imagine-image-pro").with_count(3);
        let expect = expect![[
            r#"{"model":"grok-imagine-image-pro","prompt":"a red fox","n":3,"response_format":"b64_json","aspect_ratio":"1:1"}"#
        ]];
        expect.assert_eq(&serde_json::to_string(&req.body()).unwrap());
    }

    #[test]
    fn video_body_serialization() {
        let req = GenerationRequest::video("waves", "grok-imagine-video")
            .with_duration(12)
            .with_resolution(Resolution::P720)
            .with_source_image(SourceImage::new(b"png".to_vec()));
        let expect = expect![[
            r#"{"model":"grok-imagine-video","prompt":"waves","duration":8,"resolution":"720p","aspect_ratio":"16:9","image_url":"data:image/png;base64,cG5n"}"#
        ]];
        expect.assert_eq(&serde_json::to_string(&req.body()).unwrap());
    }

    #[test]
    fn empty_aspect_ratio_is_omitted() {
        let req = GenerationRequest::image("p", "m").with_aspect_ratio("");
        let body = serde_json::to_value(req.body()).unwrap();
        assert!(body.get("aspect_ratio").is_none());
    }
}
