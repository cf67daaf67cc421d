// UI layer: interactive menus built with `dialoguer`. A list view picks a
// template, a generator view collects texts/images/options and renders it.
// Service errors are printed and the menu continues; only terminal I/O
// failures end the loop.

use crate::api::ApiClient;
use crate::error::MemeError;
use crate::types::{ImageRef, ImageResponse, MemeInfo, MemeOptions, MemeParams, SortBy};
use anyhow::Result;
use dialoguer::{Confirm, Input, Select};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::Duration;

/// Main interactive menu. Runs until the user chooses "Exit".
pub async fn main_menu(api: ApiClient) -> Result<()> {
    loop {
        let items = vec![
            "Browse templates",
            "Search templates",
            "Open template by key",
            "Backend settings",
            "Service version",
            "Exit",
        ];
        let selection = Select::new()
            .with_prompt(format!("Meme generator @ {}", api.backend().backend_url()))
            .items(&items)
            .default(0)
            .interact()?;
        match selection {
            0 => browse(&api).await?,
            1 => search(&api).await?,
            2 => {
                let key: String = Input::new().with_prompt("Template key").interact_text()?;
                open_template(&api, key.trim()).await?;
            }
            3 => backend_settings(&api)?,
            4 => {
                let pb = spinner("Checking version...");
                let res = api.get_version().await;
                pb.finish_and_clear();
                match res {
                    Ok(version) => println!("Service version: {}", version.trim()),
                    Err(e) => report(&e),
                }
            }
            5 => break,
            _ => {}
        }
    }
    Ok(())
}

/// List view: fetch all template infos in the chosen order and pick one.
async fn browse(api: &ApiClient) -> Result<()> {
    let mut labels = vec!["server default".to_string()];
    labels.extend(SortBy::ALL.iter().map(|s| s.to_string()));
    let choice = Select::new()
        .with_prompt("Sort by")
        .items(&labels)
        .default(0)
        .interact()?;
    let sort_by = choice.checked_sub(1).map(|i| SortBy::ALL[i]);
    let reverse = sort_by.is_some()
        && Confirm::new()
            .with_prompt("Reverse order?")
            .default(false)
            .interact()?;

    let pb = spinner("Loading templates...");
    let res = api.get_meme_infos(sort_by, reverse).await;
    pb.finish_and_clear();
    let infos = match res {
        Ok(infos) => infos,
        Err(e) => {
            report(&e);
            return Ok(());
        }
    };
    if infos.is_empty() {
        println!("No templates available.");
        return Ok(());
    }

    let rows: Vec<String> = infos
        .iter()
        .map(|info| format!("{}  {}", info.key, info.keywords.join(", ")))
        .collect();
    let picked = Select::new()
        .with_prompt("Template")
        .items(&rows)
        .default(0)
        .interact_opt()?;
    if let Some(i) = picked {
        generator_view(api, &infos[i]).await?;
    }
    Ok(())
}

async fn search(api: &ApiClient) -> Result<()> {
    let query: String = Input::new().with_prompt("Search").interact_text()?;
    let include_tags = Confirm::new()
        .with_prompt("Match tags too?")
        .default(false)
        .interact()?;

    let pb = spinner("Searching...");
    let res = api.search_memes(query.trim(), include_tags).await;
    pb.finish_and_clear();
    let keys = match res {
        Ok(keys) => keys,
        Err(e) => {
            report(&e);
            return Ok(());
        }
    };
    if keys.is_empty() {
        println!("Nothing matches \"{}\".", query.trim());
        return Ok(());
    }

    let picked = Select::new()
        .with_prompt(format!("{} result(s)", keys.len()))
        .items(&keys)
        .default(0)
        .interact_opt()?;
    if let Some(i) = picked {
        open_template(api, &keys[i]).await?;
    }
    Ok(())
}

async fn open_template(api: &ApiClient, key: &str) -> Result<()> {
    let pb = spinner("Loading template...");
    let res = api.get_meme_info(key).await;
    pb.finish_and_clear();
    match res {
        Ok(info) => generator_view(api, &info).await,
        Err(e) => {
            report(&e);
            Ok(())
        }
    }
}

/// Generator view: collect inputs for one template, render it and
/// optionally save the result.
async fn generator_view(api: &ApiClient, info: &MemeInfo) -> Result<()> {
    let params = &info.params;
    println!(
        "\n{}  images {}-{}, texts {}-{}",
        info.key, params.min_images, params.max_images, params.min_texts, params.max_texts
    );
    if !info.tags.is_empty() {
        println!("tags: {}", info.tags.join(", "));
    }

    let mut texts = Vec::new();
    for i in 0..params.max_texts as usize {
        let mut input = Input::<String>::new();
        input.with_prompt(format!("Text {}", i + 1)).allow_empty(true);
        if let Some(default) = params.default_texts.get(i) {
            input.default(default.clone());
        }
        let text = input.interact_text()?;
        if text.is_empty() && i >= params.min_texts as usize {
            break;
        }
        texts.push(text);
    }

    let mut images = Vec::new();
    while let Some(required) = next_image_slot(images.len(), params) {
        let path: String = Input::new()
            .with_prompt(format!(
                "Image {} path{}",
                images.len() + 1,
                if required { "" } else { " (blank to finish)" }
            ))
            .allow_empty(true)
            .interact_text()?;
        let path = path.trim();
        if path.is_empty() {
            if required {
                println!("This template needs at least {} image(s).", params.min_images);
                continue;
            }
            break;
        }
        let path = PathBuf::from(path);
        let pb = spinner("Uploading...");
        let res = api.upload_image_file(&path).await;
        pb.finish_and_clear();
        match res {
            Ok(uploaded) => images.push(ImageRef {
                name: path
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .unwrap_or("image")
                    .to_string(),
                id: uploaded.image_id,
            }),
            Err(e) => {
                report(&e);
                return Ok(());
            }
        }
    }

    let options = prompt_options(info)?;

    let actions = vec!["Preview", "Generate", "Cancel"];
    let action = Select::new()
        .with_prompt("Render")
        .items(&actions)
        .default(1)
        .interact()?;
    if action == 2 {
        return Ok(());
    }
    let pb = spinner("Rendering...");
    let res = if action == 0 {
        api.get_meme_preview(&info.key, Some(&options)).await
    } else {
        api.generate_meme(&info.key, &images, &texts, &options).await
    };
    pb.finish_and_clear();
    match res {
        Ok(image) => save_image(api, &info.key, &image).await,
        Err(e) => {
            report(&e);
            Ok(())
        }
    }
}

/// Render options are entered as a JSON object; blank means none.
fn prompt_options(info: &MemeInfo) -> Result<MemeOptions> {
    if info.params.options.is_empty() {
        return Ok(MemeOptions::new());
    }
    println!("Options:");
    for option in &info.params.options {
        println!(
            "  {} ({}, default {}){}",
            option.name,
            option.kind,
            option.default,
            option
                .description
                .as_deref()
                .map(|d| format!(": {d}"))
                .unwrap_or_default()
        );
    }
    loop {
        let raw: String = Input::new()
            .with_prompt("Options as JSON object (blank for defaults)")
            .allow_empty(true)
            .interact_text()?;
        if raw.trim().is_empty() {
            return Ok(MemeOptions::new());
        }
        match serde_json::from_str::<MemeOptions>(&raw) {
            Ok(options) => return Ok(options),
            Err(e) => println!("Not a JSON object: {e}"),
        }
    }
}

async fn save_image(api: &ApiClient, key: &str, image: &ImageResponse) -> Result<()> {
    println!("Image: {}", api.image_url(&image.image_id));
    let save = Confirm::new()
        .with_prompt("Save to file?")
        .default(true)
        .interact()?;
    if !save {
        return Ok(());
    }

    let pb = spinner("Downloading...");
    let res = api.download_image(&image.image_id).await;
    pb.finish_and_clear();
    let bytes = match res {
        Ok(bytes) => bytes,
        Err(e) => {
            report(&e);
            return Ok(());
        }
    };
    let path: String = Input::new()
        .with_prompt("Save as")
        .default(format!("{key}.{}", image_extension(&bytes)))
        .interact_text()?;
    std::fs::write(&path, &bytes)?;
    println!("Saved {path}");
    Ok(())
}

fn backend_settings(api: &ApiClient) -> Result<()> {
    let backend = api.backend();
    if backend.is_custom_backend() {
        println!(
            "Backend: {} (custom, default is {})",
            backend.backend_url(),
            backend.default_url()
        );
    } else {
        println!("Backend: {} (default)", backend.backend_url());
    }
    let items = vec!["Set backend URL", "Reset to default", "Back"];
    let selection = Select::new().items(&items).default(0).interact()?;
    let res = match selection {
        0 => {
            let url: String = Input::new()
                .with_prompt("Backend URL")
                .default(backend.backend_url())
                .allow_empty(true)
                .interact_text()?;
            backend.set_backend_url(&url)
        }
        1 => backend.set_backend_url(""),
        _ => return Ok(()),
    };
    match res {
        Ok(()) => println!("Backend is now {}", backend.backend_url()),
        // The session already switched; only persisting failed.
        Err(e) => report(&e),
    }
    Ok(())
}

fn report(err: &MemeError) {
    match err {
        MemeError::Service { code, message, .. } => {
            println!("Service error {code}: {message}");
            if let Some(data) = err.data() {
                println!("  {data}");
            }
        }
        other => println!("Error: {other}"),
    }
}

fn spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// `None` once every slot is filled, else whether the next image is mandatory.
fn next_image_slot(collected: usize, params: &MemeParams) -> Option<bool> {
    (collected < params.max_images as usize).then(|| collected < params.min_images as usize)
}

fn image_extension(bytes: &[u8]) -> &'static str {
    if bytes.starts_with(b"GIF8") {
        "gif"
    } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        "jpg"
    } else {
        "png"
    }
}

#[cfg(test)]
mod tests {
    use super::{image_extension, next_image_slot};
    use crate::types::MemeParams;

    #[test]
    fn sniffs_rendered_image_format() {
        assert_eq!(image_extension(b"GIF89a..."), "gif");
        assert_eq!(image_extension(&[0xFF, 0xD8, 0xFF, 0xE0]), "jpg");
        assert_eq!(image_extension(b"\x89PNG\r\n"), "png");
    }

    #[test]
    fn required_image_slots_stay_open_until_filled() {
        let params = MemeParams {
            min_images: 2,
            max_images: 3,
            ..MemeParams::default()
        };
        assert_eq!(next_image_slot(0, &params), Some(true));
        assert_eq!(next_image_slot(1, &params), Some(true));
        assert_eq!(next_image_slot(2, &params), Some(false));
        assert_eq!(next_image_slot(3, &params), None);

        assert_eq!(next_image_slot(0, &MemeParams::default()), None);
    }
}
