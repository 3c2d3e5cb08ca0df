use std::process::exit;
use std::sync::Arc;

use dotenv::dotenv;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info};

use solace_bot::bible::BibleClient;
use solace_bot::completion::CompletionClient;
use solace_bot::config::Config;
use solace_bot::dialogue::{DialogueEngine, Event};
use solace_bot::emotions::EmotionCatalog;
use solace_bot::health;
use solace_bot::lock::PidLock;
use solace_bot::service::BotService;
use solace_bot::verses::VerseSelector;

#[tokio::main]
async fn main() {
    dotenv().ok();
    tracing_subscriber::fmt::init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("configuration error: {}", err);
            exit(1);
        }
    };

    let lock = PidLock::new(&config.lock_path);
    if !lock.acquire() {
        error!("another instance already owns the transport, exiting");
        exit(1);
    }

    let port = config.port;
    tokio::spawn(async move {
        if let Err(err) = health::serve(port).await {
            error!("health endpoint failed: {}", err);
        }
    });

    let bible = Arc::new(BibleClient::new(
        &config.bible_api_url,
        &config.bible_id,
        &config.bible_api_key,
    ));
    let selector = VerseSelector::new(bible);

    let mut engine = DialogueEngine::new(EmotionCatalog::new(), selector)
        .with_follow_up(config.offer_follow_up);
    if let Some(endpoint) = &config.completion_endpoint {
        engine = engine.with_completer(Arc::new(CompletionClient::new(
            endpoint,
            &config.completion_model,
        )));
    }
    let service = BotService::new(engine);

    info!("solace-bot started, type /start to begin");

    // Line-oriented console transport. A messaging transport plugs in at
    // the same BotService::respond boundary.
    let stdin = BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            line = lines.next_line() => match line {
                Ok(Some(line)) => {
                    let event = match line.trim() {
                        "" => continue,
                        "/start" => Event::Start,
                        "/cancel" => Event::Cancel,
                        text => Event::Text(text.to_string()),
                    };

                    let reply = service.respond("console", event).await;
                    for message in reply.messages {
                        println!("{}\n", message);
                    }
                    if let Some(options) = reply.reply_options {
                        println!("[{}]", options.join(" | "));
                    }
                }
                Ok(None) => break,
                Err(err) => {
                    error!("stdin error: {}", err);
                    break;
                }
            }
        }
    }

    lock.release();
    info!("solace-bot stopped");
}
