use anyhow::Context;
use clap::{Parser, Subcommand};
use dotenv::dotenv;
use std::path::PathBuf;

use vsaq_rs::vsaq::config::Config;
use vsaq_rs::vsaq::questionnaire::{AnswerMap, DisplayMode, Questionnaire};
use vsaq_rs::vsaq::server;
use vsaq_rs::vsaq::template::TemplateLoader;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Load a template and run one visibility pass
    Check {
        /// Path to the template file
        #[arg(short, long)]
        template: PathBuf,
    },
    /// Evaluate a template against an answer file
    Evaluate {
        /// Path to the template file
        #[arg(short, long)]
        template: PathBuf,

        /// JSON file with an id -> value answer map
        #[arg(short, long)]
        answers: Option<PathBuf>,

        /// Show admin-only items
        #[arg(long)]
        admin: bool,

        /// Make every answer read-only
        #[arg(long)]
        readonly: bool,

        /// Ignore all conditions
        #[arg(long)]
        unrolled: bool,
    },
    /// Serve templates over HTTP
    Serve {
        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,

        /// Directory holding template files
        #[arg(short, long)]
        dir: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    env_logger::init();

    let args = Args::parse();
    let mut config = Config::from_env()?;
    let loader = TemplateLoader::new();

    match args.command {
        Commands::Check { template } => {
            let tree = loader
                .load_template(&template)
                .with_context(|| format!("Failed to load {}", template.display()))?;
            let questionnaire = Questionnaire::from_tree(tree, config.mode)?;
            println!(
                "{}: {} items, {} hidden",
                template.display(),
                questionnaire.tree().len(),
                questionnaire.hidden_ids().len()
            );
        }
        Commands::Evaluate {
            template,
            answers,
            admin,
            readonly,
            unrolled,
        } => {
            let mode = DisplayMode {
                admin: admin || config.mode.admin,
                readonly: readonly || config.mode.readonly,
                unrolled: unrolled || config.mode.unrolled,
            };
            let tree = loader
                .load_template(&template)
                .with_context(|| format!("Failed to load {}", template.display()))?;
            let mut questionnaire = Questionnaire::from_tree(tree, mode)?;

            if let Some(path) = answers {
                let content = std::fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read {}", path.display()))?;
                let answers: AnswerMap = serde_json::from_str(&content)?;
                questionnaire.set_values(&answers)?;
            }

            let report = serde_json::json!({
                "visible": questionnaire.visible_ids(),
                "hidden": questionnaire.hidden_ids(),
                "answers": questionnaire.values(),
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::Serve { port, dir } => {
            if let Some(port) = port {
                config.port = port;
            }
            if let Some(dir) = dir {
                config.template_dir = dir;
            }
            server::serve(&config)
                .await
                .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;
        }
    }

    Ok(())
}
