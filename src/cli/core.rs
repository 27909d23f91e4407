use std::path::Path;
use std::sync::Arc;

use chrono::NaiveDate;
use strsim::levenshtein;
use thiserror::Error;

use crate::ledger::{BalancePosition, EntryStore, MilkEntry, MonthlySummary};
use crate::reminder::{ApplyOutcome, Clock, LogAlarmService, ReminderNotifier, SystemClock};
use crate::service::{MilkService, ServiceError};
use crate::settings::SettingsStore;
use crate::storage::JsonEntryStorage;
use crate::utils;

use super::{io as cli_io, output};

/// Fatal shell failures; everything else is a per-command error that is
/// reported and leaves the loop running.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("readline error: {0}")]
    Readline(#[from] rustyline::error::ReadlineError),
    #[error(transparent)]
    Storage(#[from] crate::errors::StorageError),
    #[error(transparent)]
    Service(#[from] ServiceError),
}

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("{0}")]
    Usage(String),
    #[error("unknown command `{0}`")]
    Unknown(String),
    #[error(transparent)]
    Service(#[from] ServiceError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CliMode {
    Interactive,
    Script,
}

pub enum LoopControl {
    Continue,
    Exit,
}

const COMMANDS: &[(&str, &str)] = &[
    ("add", "add <date|today> <litres> <borrowed|sold> - record one day's milk"),
    ("remove", "remove <date|today> - delete the entry for a date"),
    ("entry", "entry <date|today> - show the entry for a date"),
    ("list", "list - show every recorded entry"),
    ("month", "month [YYYY-MM] - monthly totals and net balance"),
    ("price", "price [value] - show or set the per-litre price"),
    ("reminder", "reminder [on [HH:MM] | off | at HH:MM] - daily reminder"),
    ("fire", "fire - run the reminder handler as the OS timer would"),
    ("theme", "theme [dark|light] - show or set the theme"),
    ("export", "export <path> - write all entries to a JSON file"),
    ("import", "import <path> - load entries from a JSON export"),
    ("setup", "setup - first-run setup (price, reminder)"),
    ("help", "help - this overview"),
    ("exit", "exit - leave the shell"),
];

/// Prints the record-your-entry prompt in place of a system
/// notification.
pub struct TerminalNotifier;

impl ReminderNotifier for TerminalNotifier {
    fn show_reminder(&self) {
        output::prompt("Time to record today's milk entry!");
    }
}

/// Holds the live service and shell state for one CLI session.
pub struct ShellContext {
    pub service: MilkService,
    pub mode: CliMode,
    pub running: bool,
}

impl ShellContext {
    pub fn new(mode: CliMode) -> Result<Self, CliError> {
        let entries = Arc::new(EntryStore::open(Box::new(JsonEntryStorage::new(
            utils::entries_file(),
        )))?);
        let settings = Arc::new(SettingsStore::open(utils::settings_file())?);
        let service = MilkService::new(
            entries,
            settings,
            Arc::new(LogAlarmService::new()),
            Arc::new(SystemClock),
        );
        Ok(Self {
            service,
            mode,
            running: true,
        })
    }

    pub fn prompt(&self) -> String {
        "milk> ".to_string()
    }

    pub fn command_names() -> Vec<&'static str> {
        COMMANDS.iter().map(|(name, _)| *name).collect()
    }

    pub fn report_error(&self, err: CommandError) {
        output::error(&err);
        if let CommandError::Unknown(input) = &err {
            self.suggest(input);
        }
    }

    fn suggest(&self, input: &str) {
        let mut suggestions: Vec<(usize, &str)> = COMMANDS
            .iter()
            .map(|(name, _)| (levenshtein(name, input), *name))
            .collect();
        suggestions.sort_by_key(|(distance, _)| *distance);

        if let Some((distance, best)) = suggestions.first() {
            if *distance <= 3 {
                output::info(format!("Did you mean `{}`?", best));
            }
        }
    }

    pub fn confirm(&self, prompt: &str) -> Result<bool, CommandError> {
        if self.mode == CliMode::Script {
            return Ok(true);
        }
        cli_io::confirm_action(prompt).map_err(|err| match err {
            CliError::Io(io) => CommandError::Io(io),
            other => CommandError::Io(std::io::Error::other(other.to_string())),
        })
    }

    pub fn dispatch(&mut self, command: &str, args: &[&str]) -> Result<LoopControl, CommandError> {
        match command {
            "add" => self.cmd_add(args)?,
            "remove" => self.cmd_remove(args)?,
            "entry" => self.cmd_entry(args)?,
            "list" => self.cmd_list()?,
            "month" => self.cmd_month(args)?,
            "price" => self.cmd_price(args)?,
            "reminder" => self.cmd_reminder(args)?,
            "fire" => self.cmd_fire()?,
            "theme" => self.cmd_theme(args)?,
            "export" => self.cmd_export(args)?,
            "import" => self.cmd_import(args)?,
            "setup" => self.cmd_setup()?,
            "help" => self.cmd_help(),
            "exit" | "quit" => return Ok(LoopControl::Exit),
            other => return Err(CommandError::Unknown(other.to_string())),
        }
        Ok(LoopControl::Continue)
    }

    fn cmd_add(&self, args: &[&str]) -> Result<(), CommandError> {
        let (date_arg, rest) = args
            .split_first()
            .ok_or_else(|| usage("add <date|today> <litres> <borrowed|sold>"))?;
        let (qty_arg, rest) = rest
            .split_first()
            .ok_or_else(|| usage("add <date|today> <litres> <borrowed|sold>"))?;
        let (kind_arg, _) = rest
            .split_first()
            .ok_or_else(|| usage("add <date|today> <litres> <borrowed|sold>"))?;

        let date = self.parse_date(date_arg)?;
        let quantity: f64 = qty_arg
            .parse()
            .map_err(|_| usage("litres must be a number, e.g. 1.5"))?;
        let is_borrowed = match *kind_arg {
            "borrowed" | "b" => true,
            "sold" | "s" => false,
            other => return Err(usage(&format!("expected `borrowed` or `sold`, got `{other}`"))),
        };

        let entry = self.service.upsert_entry(date, quantity, is_borrowed)?;
        output::success(format!(
            "Recorded {} L {} on {}.",
            entry.quantity,
            direction_label(entry.is_borrowed),
            entry.date
        ));
        Ok(())
    }

    fn cmd_remove(&self, args: &[&str]) -> Result<(), CommandError> {
        let date_arg = args.first().ok_or_else(|| usage("remove <date|today>"))?;
        let date = self.parse_date(date_arg)?;
        if self.service.entry(date).is_none() {
            output::info(format!("No entry recorded on {date}."));
            return Ok(());
        }
        if !self.confirm(&format!("Delete the entry for {date}?"))? {
            return Ok(());
        }
        self.service.delete_entry(date)?;
        output::success(format!("Deleted the entry for {date}."));
        Ok(())
    }

    fn cmd_entry(&self, args: &[&str]) -> Result<(), CommandError> {
        let date_arg = args.first().ok_or_else(|| usage("entry <date|today>"))?;
        let date = self.parse_date(date_arg)?;
        match self.service.entry(date) {
            Some(entry) => print_entry(&entry),
            None => output::info(format!("No entry recorded on {date}.")),
        }
        Ok(())
    }

    fn cmd_list(&self) -> Result<(), CommandError> {
        let entries = self.service.entries();
        if entries.is_empty() {
            output::info("The ledger is empty.");
            return Ok(());
        }
        output::section("Entries");
        for entry in &entries {
            print_entry(entry);
        }
        Ok(())
    }

    fn cmd_month(&self, args: &[&str]) -> Result<(), CommandError> {
        let summary = match args.first() {
            Some(raw) => {
                let (year, month) = parse_month(raw)?;
                self.service.month_summary(year, month)
            }
            None => self.service.current_month_summary(),
        };
        print_summary(&summary);
        Ok(())
    }

    fn cmd_price(&self, args: &[&str]) -> Result<(), CommandError> {
        match args.first() {
            None => output::info(format!("Price per litre: ₹{}", self.service.price())),
            Some(raw) => {
                let requested: f64 = raw
                    .parse()
                    .map_err(|_| usage("price must be a number, e.g. 35.0"))?;
                let stored = self.service.set_price(requested)?;
                if (stored - requested).abs() > f64::EPSILON {
                    output::warning(format!(
                        "Price {requested} is not usable; stored the default ₹{stored} instead."
                    ));
                } else {
                    output::success(format!("Price per litre set to ₹{stored}."));
                }
            }
        }
        Ok(())
    }

    fn cmd_reminder(&self, args: &[&str]) -> Result<(), CommandError> {
        let current = self.service.reminder();
        let outcome = match args {
            [] => {
                let state = if current.enabled { "on" } else { "off" };
                output::info(format!(
                    "Reminder is {state}, set for {:02}:{:02}.",
                    current.hour, current.minute
                ));
                return Ok(());
            }
            ["on"] => self
                .service
                .set_reminder(true, current.hour, current.minute),
            ["on", time] => {
                let (hour, minute) = parse_time(time)?;
                self.service.set_reminder(true, hour, minute)
            }
            ["off"] => self
                .service
                .set_reminder(false, current.hour, current.minute),
            ["at", time] => {
                let (hour, minute) = parse_time(time)?;
                self.service.set_reminder(current.enabled, hour, minute)
            }
            _ => return Err(usage("reminder [on [HH:MM] | off | at HH:MM]")),
        };
        report_reminder_outcome(outcome);
        Ok(())
    }

    fn cmd_fire(&self) -> Result<(), CommandError> {
        let outcome = self.service.handle_reminder_fired(&TerminalNotifier);
        report_reminder_outcome(outcome);
        Ok(())
    }

    fn cmd_theme(&self, args: &[&str]) -> Result<(), CommandError> {
        match args.first() {
            None => {
                let theme = if self.service.dark_mode() { "dark" } else { "light" };
                output::info(format!("Theme: {theme}"));
            }
            Some(&"dark") => {
                self.service.set_dark_mode(true)?;
                output::success("Theme set to dark.");
            }
            Some(&"light") => {
                self.service.set_dark_mode(false)?;
                output::success("Theme set to light.");
            }
            Some(other) => return Err(usage(&format!("expected `dark` or `light`, got `{other}`"))),
        }
        Ok(())
    }

    fn cmd_export(&self, args: &[&str]) -> Result<(), CommandError> {
        let path = args.first().ok_or_else(|| usage("export <path>"))?;
        let json = self.service.export_json()?;
        std::fs::write(Path::new(path), json)?;
        output::success(format!(
            "Exported {} entries to {path}.",
            self.service.entries().len()
        ));
        Ok(())
    }

    fn cmd_import(&self, args: &[&str]) -> Result<(), CommandError> {
        let path = args.first().ok_or_else(|| usage("import <path>"))?;
        let json = std::fs::read_to_string(Path::new(path))?;
        if !self.confirm("Importing overwrites entries that share a date. Continue?")? {
            return Ok(());
        }
        let applied = self.service.import_json(&json)?;
        output::success(format!("Imported {applied} entries from {path}."));
        Ok(())
    }

    fn cmd_setup(&self) -> Result<(), CommandError> {
        if self.service.onboarding_done() {
            output::info("Setup has already been completed.");
            return Ok(());
        }
        output::section("First-run setup");
        output::info(format!(
            "Price per litre is ₹{} (change it with `price <value>`).",
            self.service.price()
        ));
        let reminder = self.service.reminder();
        output::info(format!(
            "Daily reminder is set for {:02}:{:02} (change it with `reminder at HH:MM`).",
            reminder.hour, reminder.minute
        ));
        let outcome = self.service.reconcile_reminder();
        report_reminder_outcome(outcome);
        self.service.complete_onboarding()?;
        output::success("Setup complete.");
        Ok(())
    }

    fn cmd_help(&self) {
        output::section("Commands");
        for (_, describe) in COMMANDS {
            output::info(format!("  {describe}"));
        }
    }

    fn parse_date(&self, raw: &str) -> Result<NaiveDate, CommandError> {
        if raw.eq_ignore_ascii_case("today") {
            return Ok(SystemClock.today());
        }
        NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .map_err(|_| usage(&format!("`{raw}` is not a date (expected YYYY-MM-DD or `today`)")))
    }
}

fn usage(message: &str) -> CommandError {
    CommandError::Usage(format!("usage: {message}"))
}

fn direction_label(is_borrowed: bool) -> &'static str {
    if is_borrowed {
        "borrowed"
    } else {
        "sold"
    }
}

fn print_entry(entry: &MilkEntry) {
    output::info(format!(
        "{}  {:>6} L  {}",
        entry.date,
        entry.quantity,
        direction_label(entry.is_borrowed)
    ));
}

fn print_summary(summary: &MonthlySummary) {
    output::section(format!("{}-{:02}", summary.year, summary.month));
    output::info(format!("Borrowed: {} L", summary.total_borrowed));
    output::info(format!("Sold:     {} L", summary.total_sold));
    output::info(format!("To pay:     ₹{}", summary.amount_to_pay));
    output::info(format!("To receive: ₹{}", summary.amount_to_receive));
    match summary.position() {
        BalancePosition::ToReceive(amount) => {
            output::success(format!("Net balance: ₹{amount} to receive"))
        }
        BalancePosition::ToPay(amount) => {
            output::warning(format!("Net balance: ₹{amount} to pay"))
        }
        BalancePosition::Settled => output::info("Net balance: settled"),
    }
}

fn report_reminder_outcome(outcome: Result<ApplyOutcome, ServiceError>) {
    match outcome {
        Ok(ApplyOutcome::Registered(fire_at)) => {
            output::success(format!("Reminder scheduled for {}.", fire_at.format("%Y-%m-%d %H:%M")))
        }
        Ok(ApplyOutcome::Disabled) => output::success("Reminder turned off."),
        Err(ServiceError::Schedule(crate::reminder::ScheduleError::PermissionDenied)) => {
            output::warning(
                "Schedule saved, but exact-timer permission is missing. \
                 Grant it and run `reminder on` again.",
            )
        }
        Err(err) => output::error(err),
    }
}

fn parse_month(raw: &str) -> Result<(i32, u32), CommandError> {
    let parts: Vec<&str> = raw.split('-').collect();
    if parts.len() == 2 {
        if let (Ok(year), Ok(month)) = (parts[0].parse::<i32>(), parts[1].parse::<u32>()) {
            if (1..=12).contains(&month) {
                return Ok((year, month));
            }
        }
    }
    Err(usage(&format!("`{raw}` is not a month (expected YYYY-MM)")))
}

fn parse_time(raw: &str) -> Result<(u32, u32), CommandError> {
    let parts: Vec<&str> = raw.split(':').collect();
    if parts.len() == 2 {
        if let (Ok(hour), Ok(minute)) = (parts[0].parse::<u32>(), parts[1].parse::<u32>()) {
            if hour <= 23 && minute <= 59 {
                return Ok((hour, minute));
            }
        }
    }
    Err(usage(&format!("`{raw}` is not a time (expected HH:MM)")))
}
