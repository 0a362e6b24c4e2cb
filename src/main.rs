use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::NaiveTime;
use clap::{Parser, Subcommand};

use volunteer_match::{
    app::{VolunteerApp, run_interactive},
    backend::{CredentialProvider, EnvCredential, HttpRequestFetcher, StaticCredential},
    categories::{all_categories, main_categories},
    logging::init_logging,
    navigation::BrowserNavigator,
    scheduler::SystemClock,
    settings::Settings,
    theme::DisplayMode,
    ui::paint,
};

#[derive(Parser, Debug)]
#[command(
    name = "volunteer-match",
    about = "Find open help requests matching the categories you can help with",
    version,
    author
)]
struct Cli {
    /// Backend base URL; overrides settings and VOLUNTEER_MATCH_BACKEND_URL.
    #[arg(long, global = true, value_name = "URL")]
    backend_url: Option<String>,

    /// Bearer token; defaults to VOLUNTEER_MATCH_TOKEN.
    #[arg(long, global = true, value_name = "TOKEN")]
    token: Option<String>,

    #[arg(long = "no-color", global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List help categories.
    Categories {
        /// Only the four main categories.
        #[arg(long)]
        main: bool,
        #[arg(long)]
        json: bool,
    },
    /// Select categories, fetch once and print the matching requests.
    Match {
        #[arg(short, long = "category", value_name = "ID", required = true)]
        categories: Vec<String>,
        #[arg(long)]
        json: bool,
    },
    /// Print whether a time of day is shown in night mode.
    Theme {
        /// Local time as HH:MM; defaults to now.
        #[arg(long, value_name = "HH:MM")]
        at: Option<String>,
    },
    /// Print the effective settings as TOML.
    Config {
        /// Also write them to the settings file.
        #[arg(long)]
        save: bool,
    },
    /// Interactive selection loop (default).
    Watch {
        #[arg(short, long = "category", value_name = "ID")]
        categories: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let logging = match init_logging() {
        Ok(guard) => Some(guard),
        Err(err) => {
            eprintln!("warning: logging disabled: {err:#}");
            None
        }
    };

    let result = run(Cli::parse()).await;
    if result.is_err()
        && let Some(guard) = logging.as_ref()
    {
        eprintln!("log file: {}", guard.path().display());
    }
    result
}

async fn run(cli: Cli) -> Result<()> {
    let mut settings = Settings::load();
    if let Some(url) = cli.backend_url.clone() {
        settings.backend_url = url;
        settings.validate();
    }
    let color = !cli.no_color;

    match cli.command.unwrap_or(Command::Watch {
        categories: Vec::new(),
    }) {
        Command::Categories { main, json } => print_categories(main, json),
        Command::Theme { at } => print_theme(at.as_deref()),
        Command::Config { save } => {
            let rendered =
                toml::to_string_pretty(&settings).context("failed to serialize settings")?;
            print!("{rendered}");
            if save {
                settings.save()?;
                if let Some(path) = Settings::config_path() {
                    eprintln!("saved {}", path.display());
                }
            }
            Ok(())
        }
        Command::Match { categories, json } => {
            let mut app = build_app(&settings, cli.token)?;
            for category in &categories {
                app.toggle_category(category);
            }
            app.settle().await;

            if json {
                let payload = serde_json::to_string_pretty(app.results())
                    .context("failed to serialize matching requests")?;
                println!("{payload}");
            } else {
                print!("{}", paint(&app.view(), app.display_mode(), color));
            }
            Ok(())
        }
        Command::Watch { categories } => {
            let mut app = build_app(&settings, cli.token)?;
            for category in &categories {
                app.toggle_category(category);
            }
            run_interactive(&mut app, settings.theme_tick_period(), color).await
        }
    }
}

fn build_app(
    settings: &Settings,
    token: Option<String>,
) -> Result<VolunteerApp<HttpRequestFetcher, BrowserNavigator>> {
    let credentials: Arc<dyn CredentialProvider> = match token {
        Some(token) => Arc::new(StaticCredential::new(token)),
        None => Arc::new(EnvCredential::default()),
    };
    let fetcher = HttpRequestFetcher::new(settings.posts_api_config(), credentials)
        .context("failed to build posts API client")?;

    Ok(VolunteerApp::new(
        Arc::new(fetcher),
        settings.matcher_config(),
        Arc::new(SystemClock),
        BrowserNavigator::new(settings.frontend_url.clone()),
    ))
}

fn print_categories(main_only: bool, json: bool) -> Result<()> {
    let categories = if main_only {
        main_categories()
    } else {
        all_categories()
    };

    if json {
        let payload =
            serde_json::to_string_pretty(categories).context("failed to serialize categories")?;
        println!("{payload}");
        return Ok(());
    }

    for category in categories {
        let marker = if category.is_main { "*" } else { " " };
        println!(
            "{marker} {} {:<10} {}",
            category.glyph, category.id, category.label
        );
    }
    Ok(())
}

fn print_theme(at: Option<&str>) -> Result<()> {
    let mode = match at {
        Some(raw) => {
            let time = NaiveTime::parse_from_str(raw.trim(), "%H:%M")
                .with_context(|| format!("invalid time '{raw}', expected HH:MM"))?;
            DisplayMode::for_time(&time)
        }
        None => DisplayMode::for_time(&chrono::Local::now()),
    };
    println!("{}", mode.as_str());
    Ok(())
}
