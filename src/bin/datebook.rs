extern crate datebook as lib;

use chrono::{Datelike, Utc};
use chrono_tz::Tz;
use flexi_logger::{FileSpec, Logger};
use lib::agenda::Agenda;
use lib::month::CalendarMonth;
use lib::store::MemoryStore;
use lib::view::MonthView;
use std::path::PathBuf;
use structopt::StructOpt;

#[derive(Debug, StructOpt)]
#[structopt(name = "datebook", about = "Prints a month calendar with your events.")]
pub struct Args {
    #[structopt(help = "year to show, defaults to the current one")]
    pub year: Option<i32>,

    #[structopt(help = "month (1-12) to show, defaults to the current one")]
    pub month: Option<u32>,

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

    #[structopt(short = "n", long = "next", default_value = "0", help = "page N months forward")]
    pub next: u32,

    #[structopt(short = "p", long = "prev", default_value = "0", help = "page N months backward")]
    pub prev: u32,

    #[structopt(short = "l", long = "list", help = "list the events of the month")]
    pub list: bool,

    #[structopt(long = "log-file", help = "path to log file", parse(from_os_str))]
    pub log_file: Option<PathBuf>,
}

fn list_events(agenda: &Agenda<MemoryStore>, month: &CalendarMonth) -> lib::Result<()> {
    let tz: Tz = *agenda.tz();
    let mut events = agenda.events_of_month(month)?.collect::<Vec<_>>();
    events.sort_by_key(|event| event.begin);

    println!();
    for event in events {
        let begin = event.begin.with_timezone(&tz);
        let end = event.end.with_timezone(&tz);
        println!(
            "{} {}-{} {}",
            begin.format("%a %d"),
            begin.format("%H:%M"),
            end.format("%H:%M"),
            event.title
        );
    }

    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::from_args();

    const DEFAULT_LOG_LEVEL: &str = if cfg!(debug_assertions) {
        "info"
    } else {
        "warn"
    };

    let mut logger = Logger::try_with_env_or_str(DEFAULT_LOG_LEVEL)?;

    if let Some(log_file) = args.log_file {
        logger = logger
            .log_to_file(FileSpec::try_from(log_file)?)
            .print_message();
    }

    let _logger = logger.start()?;

    let config = lib::config::load_suitable_config(args.configfile.as_deref())?;
    let tz = config.tz()?;
    let today = Utc::now().with_timezone(&tz).date_naive();

    let month = match (args.year, args.month) {
        (Some(year), Some(month)) => CalendarMonth::new(year, month)?,
        (Some(year), None) => CalendarMonth::new(year, today.month())?,
        (None, _) => CalendarMonth::from(today),
    };
    let month = month + args.next - args.prev;

    let agenda = args
        .events
        .or_else(|| config.events_file.clone())
        .and_then(|path| match MemoryStore::from_file(&path) {
            Ok(store) => Some(Agenda::new(store, tz)),
            Err(err) => {
                log::warn!("Could not load events: {}", err);
                None
            }
        });

    let busy_days = match &agenda {
        Some(agenda) => agenda.busy_days(&month)?,
        None => Vec::new(),
    };

    let grid = month.grid();
    let mut view = MonthView::new(&grid)
        .marked(busy_days)
        .mark_symbol(config.busy_symbol)
        .today_symbol(config.today_symbol);
    if CalendarMonth::from(today) == month {
        view = view.today(today.day());
    }

    println!("{}", view);

    if args.list {
        if let Some(agenda) = &agenda {
            list_events(agenda, &month)?;
        }
    }

    Ok(())
}
