use crate::bot::{Context, Error};
use crate::utils::format::format_error_message;
use anyhow::{anyhow, Result};
use poise::serenity_prelude as serenity;

const GEMINI_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash-preview-image-generation:generateContent";

/// Generates an image from a text prompt
#[poise::command(prefix_command)]
pub async fn kakuli(ctx: Context<'_>, #[rest] prompt: Option<String>) -> Result<(), Error> {
    let Some(prompt) = prompt.filter(|p| !p.trim().is_empty()) else {
        ctx.say(format_error_message(
            "Please provide a description after `!kakuli`.",
        ))
        .await?;
        return Ok(());
    };

    let Some(api_key) = ctx.data().config.gemini_api_key.clone() else {
        ctx.say(format_error_message("Image generation is not configured."))
            .await?;
        return Ok(());
    };

    match generate_image(&ctx.data().http, &api_key, &prompt).await {
        Ok(image) => {
            ctx.send(
                poise::CreateReply::default()
                    .content("Your loving girl Kakuli's AI-crafted image ❤️")
                    .attachment(serenity::CreateAttachment::bytes(image, "kakuli.png")),
            )
            .await?;
        }
        Err(e) => {
            tracing::error!("image generation failed: {e:#}");
            ctx.say(format_error_message(
                "No image could be generated. Try a different prompt.",
            ))
            .await?;
        }
    }

    Ok(())
}

async fn generate_image(http: &reqwest::Client, api_key: &str, prompt: &str) -> Result<Vec<u8>> {
    let body = serde_json::json!({
        "contents": [{ "parts": [{ "text": prompt }] }],
        "generationConfig": { "responseModalities": ["TEXT", "IMAGE"] },
    });

    let response: serde_json::Value = http
        .post(format!("{GEMINI_ENDPOINT}?key={api_key}"))
        .json(&body)
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;

    let parts = response
        .pointer("/candidates/0/content/parts")
        .and_then(|parts| parts.as_array())
        .ok_or_else(|| anyhow!("response contained no content parts"))?;

    let encoded = parts
        .iter()
        .find_map(|part| part.pointer("/inlineData/data").and_then(|data| data.as_str()))
        .ok_or_else(|| anyhow!("response contained no inline image data"))?;

    base64_decode(encoded)
}

/// Standard-alphabet base64 with optional `=` padding.
fn base64_decode(input: &str) -> Result<Vec<u8>> {
    fn val(c: u8) -> Option<u32> {
        match c {
            b'A'..=b'Z' => Some((c - b'A') as u32),
            b'a'..=b'z' => Some((c - b'a' + 26) as u32),
            b'0'..=b'9' => Some((c - b'0' + 52) as u32),
            b'+' => Some(62),
            b'/' => Some(63),
            _ => None,
        }
    }

    let trimmed = input.trim_end_matches('=');
    let mut out = Vec::with_capacity(trimmed.len() * 3 / 4);
    let mut buf = 0u32;
    let mut bits = 0u32;
    for &byte in trimmed.as_bytes() {
        let v = val(byte)
            .ok_or_else(|| anyhow!("invalid base64 character: {}", byte as char))?;
        buf = (buf << 6) | v;
        bits += 6;
        if bits >= 8 {
            bits -= 8;
            out.push((buf >> bits) as u8);
        }
    }
    Ok(out)
}
