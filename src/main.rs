mod analyzer;
mod api;
mod auth;
mod loader;
mod models;
mod report;
mod table;

use analyzer::{CollegeAnalyzer, TOP_LIMIT};
use anyhow::{Context, Result};
use api::ExploreApi;
use auth::{AuthAction, AuthClient};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use loader::{Catalog, DataLoader};
use models::{Config, DataSourceMode, RecommendRequest};
use std::path::Path;
use table::Table;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

fn name_arg() -> Arg {
    Arg::new("name")
        .value_name("INSTITUTE")
        .help("Institute name (case and spacing are ignored, partial names match)")
        .required(true)
}

fn credential_args(cmd: Command) -> Command {
    cmd.arg(
        Arg::new("username")
            .short('u')
            .long("username")
            .value_name("USER")
            .required(true),
    )
    .arg(
        Arg::new("password")
            .short('p')
            .long("password")
            .value_name("PASSWORD")
            .default_value(""),
    )
}

fn cli() -> Command {
    Command::new("college-compare")
        .version("1.0")
        .about("Explores and compares colleges from rank, placement and review data")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file path")
                .default_value("config.toml"),
        )
        .subcommand_required(true)
        .subcommand(Command::new("metadata").about("Lists the values offered by the select menus"))
        .subcommand(Command::new("colleges").about("Lists every known institute"))
        .subcommand(
            Command::new("search")
                .about("Finds colleges by name or district")
                .arg(Arg::new("query").required(true)),
        )
        .subcommand(
            Command::new("details")
                .about("Shows the detail panel for one college")
                .arg(name_arg()),
        )
        .subcommand(
            Command::new("reviews")
                .about("Shows student reviews for one college")
                .arg(name_arg()),
        )
        .subcommand(
            Command::new("placement")
                .about("Shows placement figures, programs and recruiters for one college")
                .arg(name_arg()),
        )
        .subcommand(
            Command::new("top")
                .about("Shows the top ranked colleges")
                .arg(
                    Arg::new("save")
                        .long("save")
                        .action(ArgAction::SetTrue)
                        .help("Also write top_colleges.csv to the output directory"),
                ),
        )
        .subcommand(
            Command::new("compare")
                .about("Compares two or more colleges side by side")
                .arg(
                    Arg::new("names")
                        .value_name("INSTITUTE")
                        .num_args(2..)
                        .required(true),
                )
                .arg(
                    Arg::new("program")
                        .long("program")
                        .value_name("PROGRAM")
                        .help("Chart closing ranks for this program only"),
                )
                .arg(
                    Arg::new("save")
                        .long("save")
                        .action(ArgAction::SetTrue)
                        .help("Also write comparison.csv and comparison.txt to the output directory"),
                ),
        )
        .subcommand(
            Command::new("recommend")
                .about("Asks the recommender for colleges matching a rank")
                .arg(
                    Arg::new("rank")
                        .long("rank")
                        .required(true)
                        .value_parser(value_parser!(u32)),
                )
                .arg(Arg::new("program").long("program").required(true))
                .arg(Arg::new("stream").long("stream").default_value(""))
                .arg(Arg::new("quota").long("quota").default_value(""))
                .arg(Arg::new("category").long("category").default_value(""))
                .arg(Arg::new("location").long("location").default_value(""))
                .arg(
                    Arg::new("min-ctc")
                        .long("min-ctc")
                        .default_value("0")
                        .value_parser(value_parser!(f64)),
                )
                .arg(
                    Arg::new("min-placement-score")
                        .long("min-placement-score")
                        .default_value("0")
                        .value_parser(value_parser!(f64)),
                )
                .arg(
                    Arg::new("target-year")
                        .long("target-year")
                        .default_value("2026")
                        .value_parser(value_parser!(u16)),
                )
                .arg(
                    Arg::new("top-n")
                        .long("top-n")
                        .default_value("10")
                        .value_parser(value_parser!(usize)),
                ),
        )
        .subcommand(credential_args(Command::new("login").about("Logs in to the site")))
        .subcommand(credential_args(Command::new("signup").about("Creates a site account")))
        .subcommand(credential_args(
            Command::new("google-auth").about("Signs in with a Google account e-mail"),
        ))
}

fn string_arg<'m>(matches: &'m ArgMatches, id: &str) -> &'m str {
    matches.get_one::<String>(id).map(String::as_str).unwrap_or("")
}

#[tokio::main]
async fn main() -> Result<()> {
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_writer(std::io::stderr)
        .init();

    let matches = cli().get_matches();
    let config_file = string_arg(&matches, "config");

    // Load or create configuration
    let config = if Path::new(config_file).exists() {
        Config::load_from_file(config_file)
            .with_context(|| format!("Failed to load configuration from {}", config_file))?
    } else {
        println!("📝 Creating default configuration file: {}", config_file);
        Config::default().save_to_file(config_file)?;
        println!("⚠️  Please review {} (data directory, base URL), then run the program again.", config_file);
        return Ok(());
    };

    let loader = DataLoader::new(&config);
    let output_dir = config.output_directory.as_deref().unwrap_or("output");

    match matches.subcommand() {
        Some(("login", sub)) => authenticate(&loader, AuthAction::Login, sub).await,
        Some(("signup", sub)) => authenticate(&loader, AuthAction::Signup, sub).await,
        Some(("google-auth", sub)) => authenticate(&loader, AuthAction::GoogleAuth, sub).await,
        Some(("recommend", sub)) => recommend(&loader, sub).await,
        Some((name, sub)) => {
            let text = explore(loader, config.rank_years.clone(), name, sub, output_dir).await?;
            print!("{}", text);
            Ok(())
        }
        None => Ok(()),
    }
}

async fn authenticate(loader: &DataLoader, action: AuthAction, sub: &ArgMatches) -> Result<()> {
    let banner = AuthClient::new(loader)
        .submit(action, string_arg(sub, "username"), string_arg(sub, "password"))
        .await;
    println!("{}", banner);
    Ok(())
}

async fn recommend(loader: &DataLoader, sub: &ArgMatches) -> Result<()> {
    let request = RecommendRequest {
        rank: sub.get_one::<u32>("rank").copied().unwrap_or_default(),
        program: string_arg(sub, "program").to_string(),
        stream: string_arg(sub, "stream").to_string(),
        quota: string_arg(sub, "quota").to_string(),
        category: string_arg(sub, "category").to_string(),
        location: string_arg(sub, "location").to_string(),
        min_ctc: sub.get_one::<f64>("min-ctc").copied().unwrap_or_default(),
        min_placements_score: sub
            .get_one::<f64>("min-placement-score")
            .copied()
            .unwrap_or_default(),
        target_year: sub.get_one::<u16>("target-year").copied().unwrap_or(2026),
        top_n: sub.get_one::<usize>("top-n").copied().unwrap_or(10),
    };

    let (banner, rows) = ExploreApi::new(loader).recommend(&request).await;
    println!("{}", banner);
    if !rows.is_empty() {
        println!();
        print!("{}", report::render_table(&Table::from_rows(rows)));
    }
    Ok(())
}

/// Answers an explore command, from the JSON endpoints first in `internet`
/// mode and from the CSV datasets otherwise or when an endpoint fails.
async fn explore(
    loader: DataLoader,
    rank_years: Vec<u16>,
    name: &str,
    sub: &ArgMatches,
    output_dir: &str,
) -> Result<String> {
    if loader.mode() == DataSourceMode::Internet {
        if let Some(text) = remote_view(&loader, name, sub).await {
            return Ok(text);
        }
    }

    println!("📂 Loading datasets...");
    let mut catalog = Catalog::load(loader, rank_years).await;
    if catalog.datasets().colleges.is_empty() {
        warn!("college list is empty, retrying once");
        catalog.reload().await;
    }
    info!(
        mode = ?catalog.loader().mode(),
        colleges = catalog.datasets().colleges.len(),
        years = ?catalog.datasets().rank_years().collect::<Vec<_>>(),
        "datasets ready"
    );
    local_view(&catalog, name, sub, output_dir)
}

fn render_names(names: &[String]) -> String {
    let mut content = String::new();
    for name in names {
        content.push_str(&format!("{}\n", name));
    }
    content
}

/// Renders a command from the JSON endpoints; `None` means fall back to the CSV datasets.
async fn remote_view(loader: &DataLoader, name: &str, sub: &ArgMatches) -> Option<String> {
    let api = ExploreApi::new(loader);
    let outcome = match name {
        "metadata" => api.metadata().await.map(|m| report::render_metadata(&m)),
        "colleges" => api.colleges().await.map(|names| render_names(&names)),
        "details" => api
            .college(string_arg(sub, "name"))
            .await
            .map(|details| report::render_details(&details)),
        "reviews" => api
            .reviews(string_arg(sub, "name"))
            .await
            .map(|reviews| report::render_reviews(&reviews)),
        "placement" => {
            let query = string_arg(sub, "name");
            api.placement(query)
                .await
                .map(|placement| report::render_placement(query, &placement))
        }
        "top" if !sub.get_flag("save") => api.top().await.map(|cards| report::render_top_cards(&cards)),
        _ => return None,
    };

    match outcome {
        Ok(text) => Some(text),
        Err(err) => {
            warn!(command = name, error = %err, "endpoint unavailable, using csv datasets");
            None
        }
    }
}

fn local_view(catalog: &Catalog, name: &str, sub: &ArgMatches, output_dir: &str) -> Result<String> {
    let analyzer = CollegeAnalyzer::new(catalog.datasets());
    let mut content = String::new();

    match name {
        "metadata" => content.push_str(&report::render_metadata(&analyzer.metadata())),
        "colleges" => {
            let names = analyzer.college_names();
            if names.is_empty() {
                content.push_str("❌ No colleges loaded\n");
            }
            content.push_str(&render_names(&names));
        }
        "search" => {
            let query = string_arg(sub, "query");
            let results = analyzer.search(query);
            content.push_str(&format!("🔍 {} result(s) for \"{}\"\n\n", results.len(), query));
            content.push_str(&report::render_search_cards(&results));
        }
        "details" => {
            let query = string_arg(sub, "name");
            match analyzer.college_details(query) {
                Some(details) => content.push_str(&report::render_details(&details)),
                None => content.push_str(&format!("❌ Institute not found: {}\n", query)),
            }
        }
        "reviews" => {
            let query = string_arg(sub, "name");
            match analyzer.find_college(query) {
                Some(row) => {
                    let reviews = analyzer.reviews(analyzer::institute_name(row));
                    content.push_str(&report::render_reviews(&reviews));
                }
                None => content.push_str(&format!("❌ Institute not found: {}\n", query)),
            }
        }
        "placement" => {
            let query = string_arg(sub, "name");
            match analyzer.find_college(query) {
                Some(row) => {
                    let institute = analyzer::institute_name(row);
                    let placement = analyzer.placement(institute);
                    content.push_str(&report::render_placement(institute, &placement));
                }
                None => content.push_str(&format!("❌ Institute not found: {}\n", query)),
            }
        }
        "top" => {
            let cards = analyzer.top_colleges(TOP_LIMIT);
            content.push_str(&report::render_top_cards(&cards));
            if sub.get_flag("save") {
                report::generate_top_csv(&cards, output_dir)?;
                content.push_str(&format!("📄 Saved {}/top_colleges.csv\n", output_dir));
            }
        }
        "compare" => {
            let names: Vec<String> = sub
                .get_many::<String>("names")
                .map(|values| values.cloned().collect())
                .unwrap_or_default();
            let program = sub.get_one::<String>("program").map(String::as_str);

            let comparison = analyzer.compare(&names, program);
            let text = report::render_comparison(&comparison);
            content.push_str(&text);

            if sub.get_flag("save") {
                report::write_report(output_dir, "comparison.txt", &text)?;
                report::generate_comparison_csv(&comparison, output_dir)?;
                content.push_str(&format!("📄 Saved comparison.txt and comparison.csv to {}\n", output_dir));
            }
        }
        other => content.push_str(&format!("❌ Unknown command: {}\n", other)),
    }

    Ok(content)
}
