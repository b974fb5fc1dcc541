#![deny(warnings)]

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use translation_kit_core::capability::{
    CapabilityFactory, DeepLCapabilityFactory, DummyCapabilityFactory,
};
use translation_kit_core::config::{
    resolve_api_key, resolve_language_with_default, resolve_session_timeout, ApiKeys, AppConfig,
    Backend, Env, LanguageTag, StdEnv, DEFAULT_TARGET_LANG, ENV_DEEPL_API_KEY,
    ENV_SESSION_TIMEOUT_MS, ENV_TARGET_LANG,
};
use translation_kit_core::host::HeadlessHost;
use translation_kit_core::recognize::{ClassifierRecognizer, LanguageRecognizer};
use translation_kit_core::util::UiContext;
use translation_kit_core::TranslationService;

#[derive(Parser, Debug)]
#[command(name = "translation-kit")]
#[command(about = "Translate text, detecting the source language when it is not given")]
struct Cli {
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Translate TEXT into the target language.
    Translate(TranslateArgs),
    /// Print the language TEXT is written in.
    Detect {
        text: String,
    },
}

#[derive(Args, Debug)]
struct TranslateArgs {
    text: String,

    /// Source language; detected from the text when omitted.
    #[arg(long)]
    from: Option<String>,

    #[arg(long)]
    to: Option<String>,

    #[arg(long, default_value = "deepl")]
    backend: Backend,

    #[arg(long)]
    deepl_api_key: Option<String>,

    #[arg(long)]
    session_timeout_ms: Option<u64>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level)?;

    match cli.command {
        Command::Translate(args) => {
            let text = args.text.clone();
            let cfg = build_config(args, &StdEnv)?;
            tracing::info!(
                source_lang = ?cfg.source_lang.as_ref().map(LanguageTag::as_str),
                target_lang = %cfg.target_lang,
                backend = ?cfg.backend,
                "config loaded"
            );
            run_translate(cfg, text).await?;
        }
        Command::Detect { text } => {
            let recognizer = ClassifierRecognizer::whatlang();
            let language = recognizer
                .recognize_language(&text)
                .context("could not detect language")?;
            println!("{language}");
        }
    }

    Ok(())
}

async fn run_translate(cfg: AppConfig, text: String) -> anyhow::Result<()> {
    let capabilities: Arc<dyn CapabilityFactory> = match cfg.backend {
        Backend::DeepL => {
            let key = cfg
                .api_keys
                .deepl
                .clone()
                .context("DeepL API key is required for translation")?;
            Arc::new(DeepLCapabilityFactory::new(key))
        }
        Backend::Dummy => Arc::new(DummyCapabilityFactory::new()),
    };

    let (ui, ui_task) = UiContext::spawn();
    let host = Arc::new(HeadlessHost::new(capabilities));
    let service = TranslationService::hosted(ui, host, cfg.session_timeout);

    let response = service
        .translate(text, cfg.source_lang, cfg.target_lang)
        .await
        .context("translation failed")?;
    println!("{}", response.result);
    tracing::info!(target_lang = %response.target_language, "done");

    // drop the last ui handles so the context can drain its queue
    drop(service);
    ui_task.await.context("ui context task failed")?;
    Ok(())
}

fn init_tracing(level: &str) -> anyhow::Result<()> {
    let filter = EnvFilter::builder()
        .with_default_directive(
            level
                .parse()
                .with_context(|| format!("invalid --log-level: {level}"))?,
        )
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}

fn build_config(args: TranslateArgs, env: &impl Env) -> anyhow::Result<AppConfig> {
    let source_lang = args.from.map(LanguageTag::new).transpose()?;
    let target_lang =
        resolve_language_with_default(args.to, ENV_TARGET_LANG, env, DEFAULT_TARGET_LANG)?;
    let deepl = resolve_api_key(args.deepl_api_key, ENV_DEEPL_API_KEY, env)?;
    let session_timeout =
        resolve_session_timeout(args.session_timeout_ms, ENV_SESSION_TIMEOUT_MS, env)?;

    let cfg = AppConfig {
        source_lang,
        target_lang,
        backend: args.backend,
        api_keys: ApiKeys { deepl },
        session_timeout,
    };
    cfg.validate()?;
    Ok(cfg)
}
