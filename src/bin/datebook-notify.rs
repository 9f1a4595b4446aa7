extern crate datebook as lib;

use chrono::{Duration, Utc};
use flexi_logger::{Duplicate, FileSpec, Logger};
use lib::notify::{self, AlarmQueue};
use lib::scheduler::AlarmScheduler;
use lib::store::MemoryStore;
use std::path::PathBuf;
use structopt::StructOpt;

#[derive(Debug, StructOpt)]
#[structopt(
    name = "datebook-notify",
    about = "Notification daemon of the datebook calendar."
)]
pub struct Args {
    #[structopt(
        name = "CONFIG",
        short = "c",
        long = "config",
        help = "path to config file",
        parse(from_os_str)
    )]
    pub configfile: Option<PathBuf>,

    #[structopt(
        short = "e",
        long = "events",
        help = "events file, overrides the configured one",
        parse(from_os_str)
    )]
    pub events: Option<PathBuf>,

    #[structopt(long = "log-file", help = "path to log file", parse(from_os_str))]
    pub log_file: Option<PathBuf>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::from_args();

    let mut logger = Logger::try_with_env_or_str("info")?.duplicate_to_stderr(Duplicate::Warn);

    if let Some(log_file) = args.log_file {
        logger = logger
            .log_to_file(FileSpec::try_from(log_file)?)
            .print_message();
    }

    let _logger = logger.start()?;

    let config = lib::config::load_suitable_config(args.configfile.as_deref())?;

    let events_file = args
        .events
        .or_else(|| config.events_file.clone())
        .ok_or("No events file given or configured")?;

    let mut scheduler = AlarmScheduler::new(
        AlarmQueue::new(config.grace()),
        config.headsup(),
        config.tz()?,
    );

    // time a notification stays on screen
    let display_time = Duration::minutes(5);

    loop {
        match MemoryStore::from_file(&events_file) {
            Ok(store) => {
                log::debug!(
                    "Loaded {} events from '{}'",
                    store.len(),
                    events_file.display()
                );
                // failures are logged by the scheduler and retried next round
                scheduler.sync_store(&store);
            }
            // keep the alarms of the last good file
            Err(err) => log::warn!("{}", err),
        }

        let now = Utc::now();
        for alarm in scheduler.notifier_mut().pop_due(now) {
            log::info!("Alarm for event {}", alarm.event_id);
            if let Err(err) = notify::deliver(&alarm, display_time) {
                log::warn!("{}", err);
            }
        }

        let reload = config.reload_interval();
        let to_sleep = scheduler
            .notifier()
            .next_fire_time()
            .map(|next| (next - Utc::now()).to_std().unwrap_or(std::time::Duration::ZERO))
            .map_or(reload, |until_next| until_next.min(reload));

        log::debug!("Sleeping {:?}", to_sleep);
        std::thread::sleep(to_sleep);
    }
}
