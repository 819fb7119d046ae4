use anyhow::{Context, Result};
use arena_bot::image::ImageSettings;
use arena_bot::openai::OpenAiClient;
use arena_bot::recorders::build_recorders;
use arena_bot::{ArenaBot, BotConfig, EmperorAgent, ImageGenerator, TwitterClient};
use clap::{Args as ClapArgs, Parser, Subcommand};
use core_logic::{setup_logger, PollRunner};
use dotenv::dotenv;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Parser, Debug)]
#[command(author, version, about = "Gladiator duel bot", long_about = None)]
struct Args {
    #[arg(short, long, default_value = "config/arena.toml")]
    config: String,
    /// Run a single update and exit
    #[arg(long)]
    once: bool,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate an image from input pictures and a prompt, outside the bot loop
    Image(ImageArgs),
}

#[derive(ClapArgs, Debug)]
struct ImageArgs {
    /// Input image paths (zero or more) followed by the prompt
    #[arg(required = true, num_args = 1..)]
    inputs: Vec<String>,
    #[arg(short, long, default_value = "generated_image.png")]
    output: PathBuf,
    /// OpenAI API key (defaults to OPENAI_API_KEY)
    #[arg(long)]
    api_key: Option<String>,
    /// Render with DALL-E 3
    #[arg(long)]
    use_dalle: bool,
    /// Render with gpt-image-1
    #[arg(long, conflicts_with = "use_dalle")]
    use_gpt_image: bool,
    /// Skip the GPT-4o look at the input images and use the prompt directly
    #[arg(long)]
    no_analysis: bool,
    /// Chat model used when neither renderer is selected
    #[arg(long, default_value = "gpt-4o")]
    model: String,
}

async fn run_image_tool(args: ImageArgs) -> Result<()> {
    let (prompt, images) = args
        .inputs
        .split_last()
        .context("A prompt is required")?;
    let images: Vec<PathBuf> = images.iter().map(PathBuf::from).collect();

    let client = match args.api_key {
        Some(key) => OpenAiClient::new(key)?,
        None => OpenAiClient::from_env()?,
    };

    let mut settings = ImageSettings {
        use_analysis: !args.no_analysis,
        ..ImageSettings::default()
    };
    let output = if args.use_gpt_image || args.use_dalle {
        settings.image_model = if args.use_gpt_image { "gpt-image-1" } else { "dall-e-3" }.to_string();
        info!("Rendering with {}...", settings.image_model);
        let use_analysis = settings.use_analysis;
        ImageGenerator::new(client, settings)
            .generate(&images, prompt, &args.output, use_analysis)
            .await?
    } else {
        info!("Using {} for text analysis...", args.model);
        ImageGenerator::new(client, settings)
            .describe_images(&images, prompt, &args.output, &args.model)
            .await?
    };

    info!("✅ SUCCESS output saved to {}", output.display());
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    let args = Args::parse();

    if let Some(Command::Image(image_args)) = args.command {
        let _log_guard = setup_logger("image-gen");
        return run_image_tool(image_args).await;
    }

    let _log_guard = setup_logger("arena-bot");
    let config = BotConfig::load(&args.config)?;
    info!("Loaded bot config: {:?}", config);

    let openai = OpenAiClient::from_env()?;
    let platform = Arc::new(TwitterClient::from_env()?);
    let judge = Arc::new(EmperorAgent::new(openai.clone(), config.emperor_model.clone()));
    let images = Arc::new(ImageGenerator::new(openai, ImageSettings::from(&config)));
    let recorders = build_recorders(&config.recorders).await?;

    let mut runner = PollRunner::new("arena-bot", config.poll_interval());
    if args.once {
        runner = runner.with_max_updates(1);
    }

    info!("🏛️ Arena open: watching mentions of @{}", config.handle);
    let bot = Arc::new(ArenaBot::new(config, platform, judge, images, recorders));
    runner
        .run(PollRunner::shutdown_on_ctrl_c(), |index| {
            let bot = bot.clone();
            async move {
                let report = bot.poll(index).await?;
                for duel in &report.judged {
                    info!(
                        "Duel {} settled: @{} ({} recorder(s))",
                        duel.conversation_id,
                        duel.winner,
                        duel.receipts.len()
                    );
                }
                Ok(())
            }
        })
        .await;

    Ok(())
}
