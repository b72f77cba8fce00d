use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::Parser;
use client_core::{
    compose_poem, default_state_path, suggest_movie, Catalog, DisabledGenerator,
    FileKeyValueStore, Flow, FlowStep, GeminiClient, PhotoWall, SubmitOutcome, TextGenerator,
};
use shared::domain::Genre;
use tokio::io::{stdin, AsyncBufReadExt, BufReader, Lines, Stdin};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

type Input = Lines<BufReader<Stdin>>;

#[derive(Parser, Debug)]
#[command(name = "valentine", about = "Answer the riddles, then pop the question")]
struct Args {
    #[arg(long, env = "VALENTINE_SERVER_URL", default_value = "http://127.0.0.1:3000")]
    server_url: String,
    /// Where the completion flag is kept; defaults to the platform data dir.
    #[arg(long, env = "VALENTINE_STATE_FILE")]
    state_file: Option<PathBuf>,
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    gemini_api_key: Option<String>,
}

#[derive(Debug, PartialEq, Eq)]
enum Command {
    Photos,
    Upload(PathBuf),
    DeleteAll,
    Movie(Option<Genre>),
    Poem,
    Help,
    Quit,
    Unknown(String),
}

impl Command {
    fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };
        let command = match word.to_ascii_lowercase().as_str() {
            "photos" | "refresh" => Command::Photos,
            "upload" if !rest.is_empty() => Command::Upload(PathBuf::from(rest)),
            "delete-all" => Command::DeleteAll,
            "movie" => Command::Movie(Genre::parse(rest)),
            "poem" => Command::Poem,
            "help" | "?" => Command::Help,
            "quit" | "exit" => Command::Quit,
            _ => Command::Unknown(line.to_string()),
        };
        Some(command)
    }
}

/// Content type sent with an upload, from the file extension.
fn content_type_for(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        "heic" => Some("image/heic"),
        "avif" => Some("image/avif"),
        _ => None,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();
    let args = Args::parse();

    let state_path = args.state_file.unwrap_or_else(default_state_path);
    info!(path = %state_path.display(), "using state file");
    let mut flow = Flow::new(Catalog::default(), FileKeyValueStore::new(state_path))?;
    let mut input = BufReader::new(stdin()).lines();

    if !run_riddles(&mut flow, &mut input).await? {
        return Ok(());
    }

    let generator: Box<dyn TextGenerator> = match args.gemini_api_key {
        Some(key) if !key.trim().is_empty() => Box::new(GeminiClient::new(key.trim())),
        _ => {
            info!("no Gemini API key; generated text uses fallbacks");
            Box::new(DisabledGenerator)
        }
    };
    run_celebration(generator.as_ref(), PhotoWall::new(args.server_url), &mut input).await
}

async fn prompt_line(input: &mut Input) -> Result<Option<String>> {
    use std::io::Write;
    print!("> ");
    std::io::stdout().flush()?;
    Ok(input.next_line().await?)
}

/// Drives the flow up to completion. Returns `false` if input ran out first.
async fn run_riddles(flow: &mut Flow<FileKeyValueStore>, input: &mut Input) -> Result<bool> {
    loop {
        match flow.step() {
            FlowStep::Question(_) => {
                if let (Some(number), Some(question)) = (flow.question_number(), flow.active_question()) {
                    println!("\nQuestion {number}: {}", question.prompt);
                }
                if let Some(hint) = flow.hint() {
                    println!("Hint: {hint}");
                }
                let Some(line) = prompt_line(input).await? else {
                    return Ok(false);
                };
                if let SubmitOutcome::InvalidAnswer { .. } = flow.submit_answer(&line) {
                    println!("Not quite. Try again!");
                }
            }
            FlowStep::Proposal => {
                println!("\nYou solved every riddle.\nWill you be my Valentine? [Yes]");
                let Some(line) = prompt_line(input).await? else {
                    return Ok(false);
                };
                if !matches!(line.trim().to_ascii_lowercase().as_str(), "yes" | "y") {
                    println!("There is only one answer to this one.");
                    continue;
                }
                if let Err(error) = flow.accept_proposal() {
                    warn!(%error, "could not record the answer");
                    println!("Something went wrong saving that. Say yes once more?");
                }
            }
            FlowStep::Completion => return Ok(true),
        }
    }
}

fn print_help() {
    println!("Commands:");
    println!("  photos               show the photo wall");
    println!("  upload <path>        add a photo");
    println!("  delete-all           remove every photo");
    println!("  movie <genre>        movie idea ({})", genre_list());
    println!("  poem                 another poem");
    println!("  quit");
}

fn genre_list() -> String {
    Genre::ALL.map(Genre::as_str).join(", ")
}

fn print_wall(wall: &PhotoWall) {
    if wall.photos().is_empty() {
        println!("No photos yet.");
        return;
    }
    for photo in wall.photos() {
        println!("  {}  {}", photo.uploaded_at, photo.url);
    }
}

async fn run_celebration(
    generator: &dyn TextGenerator,
    mut wall: PhotoWall,
    input: &mut Input,
) -> Result<()> {
    println!("\nYay! See you at Carillon Point.\n");
    println!("{}\n", compose_poem(generator).await);

    // storage outages are shown, never fatal
    match wall.refresh().await {
        Ok(_) => print_wall(&wall),
        Err(error) => println!("Could not load photos: {error}"),
    }
    print_help();

    while let Some(line) = prompt_line(input).await? {
        let Some(command) = Command::parse(&line) else {
            continue;
        };
        match command {
            Command::Photos => match wall.refresh().await {
                Ok(_) => print_wall(&wall),
                Err(error) => println!("Could not load photos: {error}"),
            },
            Command::Upload(path) => {
                let bytes = match tokio::fs::read(&path).await {
                    Ok(bytes) => bytes,
                    Err(error) => {
                        println!("Could not read {}: {error}", path.display());
                        continue;
                    }
                };
                match wall.upload(bytes, content_type_for(&path)).await {
                    Ok(photo) => println!("Uploaded {}", photo.url),
                    Err(error) => println!("Upload failed: {error}"),
                }
            }
            Command::DeleteAll => match wall.delete_all().await {
                Ok(count) => println!("Deleted {count} photos"),
                Err(error) => println!("Delete failed: {error}"),
            },
            Command::Movie(None) => println!("Pick a genre: {}", genre_list()),
            Command::Movie(Some(genre)) => {
                let mut rng = rand::thread_rng();
                match suggest_movie(generator, genre, &mut rng).await {
                    Some(movie) => println!("{}\n  {}", movie.title, movie.description),
                    None => println!("No {genre} idea this time. Ask again?"),
                }
            }
            Command::Poem => println!("{}", compose_poem(generator).await),
            Command::Help => print_help(),
            Command::Quit => break,
            Command::Unknown(text) => println!("Unknown command `{text}`. Type `help`."),
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
