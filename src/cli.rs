use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use dictlink::placement::DEFAULT_PADDING;
use dictlink::text::{brief_definition, extract_audio_url, extract_phonetic};
use dictlink::{
    AnchorRect, EntryHtml, LinkClassification, LinkRules, PanelSize, StyleRegistry, Viewport,
    extract_word, place_popover, render_entry,
};
use serde_json::json;

#[derive(Parser, Debug)]
#[command(name = "dictlink", about = "Inspect dictionary entry links and previews", version)]
pub struct Cli {
    /// Emit JSON instead of human-readable tables.
    #[arg(long, global = true)]
    json: bool,

    /// Path prefix under which dictionary assets are served.
    #[arg(long, global = true, default_value = "/dict-assets/")]
    asset_prefix: String,

    /// Path prefix of the dictionary API.
    #[arg(long, global = true, default_value = "/api/")]
    api_prefix: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Operations on individual hrefs.
    #[command(subcommand)]
    Link(LinkCommand),
    /// Operations on entry HTML files.
    #[command(subcommand)]
    Content(ContentCommand),
    /// Popover geometry.
    #[command(subcommand)]
    Popover(PopoverCommand),
    /// Serve the HTTP API.
    #[cfg(feature = "web")]
    Serve {
        /// Address to bind.
        #[arg(long, default_value = "127.0.0.1:8080")]
        addr: std::net::SocketAddr,
    },
}

#[derive(Subcommand, Debug)]
enum LinkCommand {
    /// Classify hrefs and extract their target words.
    Classify {
        #[arg(required = true)]
        hrefs: Vec<String>,
    },
}

#[derive(Subcommand, Debug)]
enum ContentCommand {
    /// Print the sanitized, link-annotated HTML.
    Sanitize { file: PathBuf },
    /// List the stylesheets the entry would inject.
    Styles {
        file: PathBuf,
        /// Dictionary the entry belongs to.
        #[arg(long = "dict")]
        dict_id: String,
    },
    /// Show the preview summary for an entry.
    Preview {
        file: PathBuf,
        /// Headword shown in the preview.
        #[arg(long)]
        word: String,
    },
}

#[derive(Subcommand, Debug)]
enum PopoverCommand {
    /// Compute where the preview panel goes for an anchor.
    Place {
        #[arg(long, allow_hyphen_values = true)]
        left: f64,
        #[arg(long, allow_hyphen_values = true)]
        top: f64,
        #[arg(long, default_value_t = 0.0)]
        width: f64,
        #[arg(long, default_value_t = 0.0)]
        height: f64,
        #[arg(long)]
        viewport_width: f64,
        #[arg(long)]
        viewport_height: f64,
    },
}

pub fn run() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    let rules = LinkRules {
        asset_prefix: cli.asset_prefix.clone(),
        api_prefix: cli.api_prefix.clone(),
        ..LinkRules::default()
    };
    match cli.command {
        Command::Link(LinkCommand::Classify { hrefs }) => handle_classify(&rules, hrefs, cli.json),
        Command::Content(ContentCommand::Sanitize { file }) => {
            handle_sanitize(&rules, file, cli.json)
        }
        Command::Content(ContentCommand::Styles { file, dict_id }) => {
            handle_styles(rules, file, dict_id, cli.json)
        }
        Command::Content(ContentCommand::Preview { file, word }) => {
            handle_preview(file, word, cli.json)
        }
        Command::Popover(PopoverCommand::Place {
            left,
            top,
            width,
            height,
            viewport_width,
            viewport_height,
        }) => handle_place(
            AnchorRect::new(left, top, width, height),
            Viewport::new(viewport_width, viewport_height),
            cli.json,
        ),
        #[cfg(feature = "web")]
        Command::Serve { addr } => handle_serve(rules, addr),
    }
}

fn read_entry(file: &Path) -> Result<String, Box<dyn Error>> {
    fs::read_to_string(file)
        .map_err(|err| format!("Failed to read {}: {err}", file.display()).into())
}

fn handle_classify(rules: &LinkRules, hrefs: Vec<String>, as_json: bool) -> Result<(), Box<dyn Error>> {
    let rows: Vec<(String, LinkClassification, Option<String>)> = hrefs
        .into_iter()
        .map(|href| {
            let class = rules.classify(&href);
            let word = if class.is_internal() {
                extract_word(&href)
            } else {
                None
            };
            (href, class, word)
        })
        .collect();

    if as_json {
        println!("{}", serde_json::to_string_pretty(&classify_json(&rows))?);
    } else {
        print_classify_table(&rows);
    }
    Ok(())
}

fn classify_json(rows: &[(String, LinkClassification, Option<String>)]) -> Vec<serde_json::Value> {
    rows.iter()
        .map(|(href, class, word)| {
            json!({ "href": href, "classification": class.to_string(), "word": word })
        })
        .collect()
}

fn handle_sanitize(rules: &LinkRules, file: PathBuf, as_json: bool) -> Result<(), Box<dyn Error>> {
    let html = read_entry(&file)?;
    let rendered = render_entry(&EntryHtml::new(html), rules);
    if as_json {
        let payload = json!({
            "html": rendered.html,
            "links": rendered.links,
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else {
        println!("{}", rendered.html);
    }
    Ok(())
}

fn handle_styles(
    rules: LinkRules,
    file: PathBuf,
    dict_id: String,
    as_json: bool,
) -> Result<(), Box<dyn Error>> {
    if dict_id.trim().is_empty() {
        return Err("Dictionary id cannot be empty".into());
    }
    let html = read_entry(&file)?;
    let mut registry = StyleRegistry::with_rules(rules);
    let added = registry.ensure_dictionary_styles(&html, &dict_id);
    if as_json {
        println!("{}", serde_json::to_string_pretty(&added)?);
    } else if added.is_empty() {
        println!("No dictionary stylesheets referenced.");
    } else {
        println!("{}", registry.head_markup());
    }
    Ok(())
}

fn handle_preview(file: PathBuf, word: String, as_json: bool) -> Result<(), Box<dyn Error>> {
    if word.trim().is_empty() {
        return Err("Preview word cannot be empty".into());
    }
    let html = read_entry(&file)?;
    let phonetic = extract_phonetic(&html);
    let brief = brief_definition(&html);
    let audio = extract_audio_url(&html);

    if as_json {
        let payload = json!({
            "word": word,
            "phonetic": phonetic,
            "brief": brief,
            "audio_url": audio,
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else {
        match &phonetic {
            Some(phonetic) => println!("{word} {phonetic}"),
            None => println!("{word}"),
        }
        println!("{brief}");
        if let Some(audio) = audio {
            println!("Audio: {audio}");
        }
    }
    Ok(())
}

fn handle_place(anchor: AnchorRect, viewport: Viewport, as_json: bool) -> Result<(), Box<dyn Error>> {
    if viewport.width <= 0.0 || viewport.height <= 0.0 {
        return Err("Viewport must have a positive size".into());
    }
    let position = place_popover(&anchor, &viewport, &PanelSize::default(), DEFAULT_PADDING);
    if as_json {
        println!("{}", serde_json::to_string_pretty(&position)?);
    } else {
        println!(
            "left={:.1} top={:.1} side={:?}",
            position.left, position.top, position.side
        );
    }
    Ok(())
}

#[cfg(feature = "web")]
fn handle_serve(rules: LinkRules, addr: std::net::SocketAddr) -> Result<(), Box<dyn Error>> {
    let config = dictlink::web::WebConfig { addr, rules };
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(dictlink::web::serve(config))?;
    Ok(())
}

fn print_classify_table(rows: &[(String, LinkClassification, Option<String>)]) {
    if rows.is_empty() {
        println!("No hrefs provided.");
        return;
    }
    let width = rows
        .iter()
        .map(|(href, _, _)| href.chars().count())
        .max()
        .unwrap_or(4)
        .max("HREF".len());
    println!("{:<width$}  {:<10}  {}", "HREF", "CLASS", "WORD", width = width);
    println!("{:-<width$}  {:-<10}  {}", "", "", "----", width = width);
    for (href, class, word) in rows {
        let word = word.as_deref().unwrap_or("-");
        println!(
            "{:<width$}  {:<10}  {}",
            href,
            class.to_string(),
            word,
            width = width
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_classification_matches_table_token() {
        let rows = vec![(
            "entry://run".to_string(),
            LinkClassification::InternalWordLink,
            Some("run".to_string()),
        )];
        let payload = classify_json(&rows);
        assert_eq!(payload[0]["classification"], "internal");
        assert_eq!(payload[0]["word"], "run");
    }
}
