use async_trait::async_trait;
use sha2::{Digest, Sha256};

use crate::contract::{Artwork, ArtworkGenerator};
use crate::error::ArtworkError;

const SIZE: u32 = 1024;

/// Deterministic gradient cover: the same name always yields the same image.
#[derive(Debug, Clone, Default)]
pub struct SvgArtwork;

impl SvgArtwork {
    pub fn render(name: &str) -> String {
        let digest = Sha256::digest(name.as_bytes());
        let colour = |i: usize| format!("#{:02x}{:02x}{:02x}", digest[i], digest[i + 1], digest[i + 2]);
        let from = colour(0);
        let to = colour(3);
        let accent = colour(6);
        let angle = u32::from(digest[9]) * 360 / 256;
        let cx = 128 + u32::from(digest[10]) * 3;
        let cy = 128 + u32::from(digest[11]) * 3;
        let r = 96 + u32::from(digest[12]);
        let title = escape_xml(name);

        format!(
            r##"<svg xmlns="http://www.w3.org/2000/svg" width="{SIZE}" height="{SIZE}" viewBox="0 0 {SIZE} {SIZE}">
  <defs>
    <linearGradient id="bg" gradientTransform="rotate({angle} 0.5 0.5)">
      <stop offset="0" stop-color="{from}"/>
      <stop offset="1" stop-color="{to}"/>
    </linearGradient>
  </defs>
  <rect width="{SIZE}" height="{SIZE}" fill="url(#bg)"/>
  <circle cx="{cx}" cy="{cy}" r="{r}" fill="{accent}" fill-opacity="0.6"/>
  <text x="64" y="{text_y}" font-family="monospace" font-size="56" fill="#ffffff">{title}</text>
</svg>
"##,
            text_y = SIZE - 64,
        )
    }
}

fn escape_xml(raw: &str) -> String {
    raw.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[async_trait]
impl ArtworkGenerator for SvgArtwork {
    async fn generate(&self, name: &str) -> Result<Artwork, ArtworkError> {
        if name.trim().is_empty() {
            return Err(ArtworkError("cannot draw a cover for an empty name".to_string()));
        }
        Ok(Artwork {
            bytes: Self::render(name).into_bytes(),
            content_type: "image/svg+xml".to_string(),
            extension: "svg".to_string(),
        })
    }
}
