pub mod commands;
pub mod handlers;
pub mod reporter;

use std::collections::HashSet;
use std::sync::Arc;

use anyhow::Result;
use parking_lot::Mutex;
use poise::serenity_prelude as serenity;

use crate::audio::AudioPlayer;
use crate::config::Config;
use crate::database;
use crate::database::accrual::AccrualStore;
use crate::database::kv::KvStore;
use crate::tracker::PresenceTracker;
use crate::utils::flood::FloodGuard;

pub type Error = Box<dyn std::error::Error + Send + Sync>;
pub type Context<'a> = poise::Context<'a, Data, Error>;

/// Settles every open session and flushes the released time into today's
/// totals, so reports include users who are still connected.
pub async fn flush_open_sessions(data: &Data) {
    let settled = {
        let mut tracker = data.tracker.lock();
        tracker.settle_all(crate::utils::time::now_millis())
    };

    let day = crate::utils::time::current_day_utc();
    for session in settled {
        if let Err(e) = data
            .accrual
            .add_seconds(session.guild_id, session.user_id, &day, session.delta_seconds)
            .await
        {
            tracing::error!("voice time flush failed: {e:#}");
        }
    }
}

#[derive(Clone)]
pub struct Data {
    pub accrual: AccrualStore,
    pub tracker: Arc<Mutex<PresenceTracker>>,
    pub flood: Arc<FloodGuard>,
    pub audio: Arc<AudioPlayer>,
    pub http: reqwest::Client,
    pub config: Config,
}

pub async fn create_bot(config: Config) -> Result<serenity::Client> {
    let pool = database::create_connection(&config.database_url).await?;

    let manager = songbird::Songbird::serenity();
    let http = reqwest::Client::new();

    let data = Data {
        accrual: AccrualStore::new(KvStore::new(pool)),
        tracker: Arc::new(Mutex::new(PresenceTracker::new())),
        flood: Arc::new(FloodGuard::new()),
        audio: Arc::new(AudioPlayer::new(
            Arc::clone(&manager),
            http.clone(),
            config.sounds_dir.clone(),
        )),
        http,
        config: config.clone(),
    };

    let intents =
        serenity::GatewayIntents::non_privileged() | serenity::GatewayIntents::MESSAGE_CONTENT;

    let mut owners = HashSet::new();
    if let Some(owner_id) = config.owner_id {
        owners.insert(owner_id);
    }

    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: vec![
                commands::voicetime::voicetime(),
                commands::snipes::setsnipe(),
                commands::snipes::snips(),
                commands::sounds::upload(),
                commands::kakuli::kakuli(),
                commands::music::play(),
            ],
            prefix_options: poise::PrefixFrameworkOptions {
                prefix: Some("!".to_string()),
                ..Default::default()
            },
            owners,
            event_handler: |ctx, event, framework, data| {
                Box::pin(handlers::event_handler(ctx, event, framework, data))
            },
            ..Default::default()
        })
        .setup(|ctx, _ready, _framework| {
            Box::pin(async move {
                reporter::spawn(ctx.clone(), data.clone());
                Ok(data)
            })
        })
        .build();

    // Deleted messages can only be sniped while they are still cached.
    let mut cache_settings = serenity::Settings::default();
    cache_settings.max_messages = 500;

    let client = serenity::ClientBuilder::new(&config.discord_token, intents)
        .framework(framework)
        .voice_manager_arc(manager)
        .cache_settings(cache_settings)
        .await?;

    Ok(client)
}
