use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;

use crate::{
    cli::{
        output,
        registry::{CommandEntry, CommandRegistry},
        shell_context::{CommandError, CommandResult, LoopControl, ShellContext},
    },
    core::services::{NewTemplate, TemplateService},
    schedule::{Frequency, RecordBook, RecurringTransactionRecord},
    storage::RecordStorage,
    utils::build_info,
};

const DEFAULT_UPCOMING_DAYS: u32 = 30;

pub fn registry() -> CommandRegistry {
    let mut registry = CommandRegistry::default();
    for entry in [
        CommandEntry::new("help", "Show available commands", "help", cmd_help),
        CommandEntry::new("open", "Open or create a record book", "open <book>", cmd_open),
        CommandEntry::new(
            "add",
            "Add a recurring template",
            "add <counterparty> <category> <amount> <expense|income> <DAILY|WEEKLY|MONTHLY|YEARLY> <YYYY-MM-DD> [description]",
            cmd_add,
        ),
        CommandEntry::new("list", "List templates by next occurrence", "list", cmd_list),
        CommandEntry::new("due", "List templates that are due now", "due", cmd_due),
        CommandEntry::new(
            "upcoming",
            "List templates due within the next days",
            "upcoming [days]",
            cmd_upcoming,
        ),
        CommandEntry::new("show", "Show one template and its transactions", "show <id>", cmd_show),
        CommandEntry::new("pause", "Stop a template from generating", "pause <id>", cmd_pause),
        CommandEntry::new("resume", "Reactivate a paused template", "resume <id>", cmd_resume),
        CommandEntry::new("delete", "Delete a template and its transactions", "delete <id>", cmd_delete),
        CommandEntry::new(
            "delete-owner",
            "Delete everything owned by a user",
            "delete-owner <owner_id>",
            cmd_delete_owner,
        ),
        CommandEntry::new("process", "Generate transactions for due templates", "process", cmd_process),
        CommandEntry::new("save", "Save the open book", "save", cmd_save),
        CommandEntry::new("backup", "Snapshot the open book", "backup [note]", cmd_backup),
        CommandEntry::new("version", "Show build information", "version", cmd_version),
        CommandEntry::new("exit", "Save pending changes and leave", "exit", cmd_exit),
    ] {
        registry.register(entry);
    }
    registry
}

fn cmd_help(context: &mut ShellContext, _args: &[&str]) -> CommandResult {
    output::section("Commands");
    for entry in context.registry.list() {
        output::line(format!("  {:<13} {}", entry.name, entry.description));
        output::line(format!("  {:<13} usage: {}", "", entry.usage));
    }
    Ok(LoopControl::Continue)
}

fn cmd_open(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let name = expect_arg(args, 0, "open <book>")?;
    if context.dirty {
        context.save()?;
    }
    context.book = if context.storage.exists(name) {
        context.storage.load(name)?
    } else {
        RecordBook::new(name)
    };
    context.book_name = name.to_string();
    context.dirty = false;
    output::success(format!("Opened book `{}`.", name));
    Ok(LoopControl::Continue)
}

fn cmd_add(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    const USAGE: &str = "add <counterparty> <category> <amount> <expense|income> <FREQUENCY> <YYYY-MM-DD> [description]";
    if args.len() < 6 {
        return Err(CommandError::InvalidArguments(format!("usage: {}", USAGE)));
    }
    let amount = Decimal::from_str(args[2]).map_err(|err| {
        CommandError::InvalidArguments(format!("invalid amount `{}`: {}", args[2], err))
    })?;
    let is_expense = match args[3].to_ascii_lowercase().as_str() {
        "expense" | "out" => true,
        "income" | "in" => false,
        other => {
            return Err(CommandError::InvalidArguments(format!(
                "expected `expense` or `income`, got `{}`",
                other
            )))
        }
    };
    let frequency = Frequency::from(args[4].to_ascii_uppercase());
    let start_timestamp = parse_start(args[5])?;
    let description = if args.len() > 6 {
        Some(args[6..].join(" "))
    } else {
        None
    };

    let input = NewTemplate {
        owner_id: context.config.default_owner,
        counterparty: args[0].to_string(),
        category: args[1].to_string(),
        amount,
        is_expense,
        frequency,
        start_timestamp,
        description,
        attachment_path: None,
    };
    let id = TemplateService::create(&mut context.book, input, context.clock.as_ref())?;
    context.mark_dirty();
    output::success(format!("Recurring template created: {}", id));
    Ok(LoopControl::Continue)
}

fn cmd_list(context: &mut ShellContext, _args: &[&str]) -> CommandResult {
    let now = context.now_millis();
    let templates = TemplateService::list(&context.book);
    if templates.is_empty() {
        output::info("No recurring templates.");
        return Ok(LoopControl::Continue);
    }
    output::section(format!("Templates in `{}`", context.book_name));
    for template in templates {
        output::line(summary_line(template, now));
    }
    Ok(LoopControl::Continue)
}

fn cmd_due(context: &mut ShellContext, _args: &[&str]) -> CommandResult {
    let now = context.now_millis();
    let due = context.book.due_templates(now);
    if due.is_empty() {
        output::info("Nothing is due.");
        return Ok(LoopControl::Continue);
    }
    output::section(format!("{} template(s) due", due.len()));
    for template in due {
        output::line(summary_line(template, now));
    }
    Ok(LoopControl::Continue)
}

fn cmd_upcoming(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let days = match args.first() {
        Some(raw) => raw.parse::<u32>().map_err(|_| {
            CommandError::InvalidArguments(format!("invalid day count `{}`", raw))
        })?,
        None => DEFAULT_UPCOMING_DAYS,
    };
    let now = context.now_millis();
    let generator = context.generator();
    let upcoming = generator.upcoming(&context.book, now, days);
    if upcoming.is_empty() {
        output::info(format!("Nothing scheduled in the next {} day(s).", days));
        return Ok(LoopControl::Continue);
    }
    output::section(format!("Next {} day(s)", days));
    for template in upcoming {
        output::line(summary_line(template, now));
    }
    Ok(LoopControl::Continue)
}

fn cmd_show(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let id = context.book.resolve_id(expect_arg(args, 0, "show <id>")?)?;
    let now = context.now_millis();
    let Some(template) = context.book.template(&id) else {
        return Ok(LoopControl::Continue);
    };
    output::section(format!("{} ({})", template.counterparty, template.id));
    output::line(format!("  category:       {}", template.category));
    output::line(format!("  amount:         {}", template.signed_amount()));
    output::line(format!("  frequency:      {}", template.frequency_label()));
    output::line(format!("  starts:         {}", format_time(template.start_time())));
    output::line(format!(
        "  next:           {} ({} day(s))",
        format_time(template.next_occurrence_time()),
        template.days_until_next(now)
    ));
    output::line(format!(
        "  last processed: {}",
        template
            .last_processed_time()
            .map(|t| format_time(Some(t)))
            .unwrap_or_else(|| "never".into())
    ));
    output::line(format!("  active:         {}", template.is_active));
    if let Some(description) = &template.description {
        output::line(format!("  description:    {}", description));
    }
    let transactions = context.book.transactions_for_template(&id);
    output::line(format!("  generated:      {}", transactions.len()));
    for txn in transactions {
        output::line(format!("    {}", txn));
    }
    Ok(LoopControl::Continue)
}

fn cmd_pause(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let id = context.book.resolve_id(expect_arg(args, 0, "pause <id>")?)?;
    TemplateService::pause(&mut context.book, &id)?;
    context.mark_dirty();
    output::success(format!("Paused {}.", id));
    Ok(LoopControl::Continue)
}

fn cmd_resume(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let id = context.book.resolve_id(expect_arg(args, 0, "resume <id>")?)?;
    TemplateService::resume(&mut context.book, &id)?;
    context.mark_dirty();
    output::success(format!("Resumed {}.", id));
    Ok(LoopControl::Continue)
}

fn cmd_delete(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let id = context.book.resolve_id(expect_arg(args, 0, "delete <id>")?)?;
    let removed = TemplateService::delete(&mut context.book, &id)?;
    context.mark_dirty();
    output::success(format!("Deleted {} ({}).", removed.counterparty, removed.id));
    Ok(LoopControl::Continue)
}

fn cmd_delete_owner(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let raw = expect_arg(args, 0, "delete-owner <owner_id>")?;
    let owner_id = raw
        .parse::<i64>()
        .map_err(|_| CommandError::InvalidArguments(format!("invalid owner id `{}`", raw)))?;
    for template in context.book.templates_for_owner(owner_id) {
        output::line(format!("  removing {} ({})", template.counterparty, template.id));
    }
    let summary = TemplateService::delete_owner(&mut context.book, owner_id);
    if summary.templates + summary.transactions > 0 {
        context.mark_dirty();
    }
    output::success(format!(
        "Removed {} template(s) and {} transaction(s) for owner {}.",
        summary.templates, summary.transactions, owner_id
    ));
    Ok(LoopControl::Continue)
}

fn cmd_process(context: &mut ShellContext, _args: &[&str]) -> CommandResult {
    let generator = context.generator();
    let report = generator.run(&mut context.book, context.clock.as_ref());
    for skipped in &report.skipped {
        output::warning(format!("Skipped {}: {}", skipped.template_id, skipped.reason));
    }
    for id in &report.capped {
        output::warning(format!("{} still has a backlog; run `process` again.", id));
    }
    if !report.generated.is_empty() {
        context.mark_dirty();
    }
    output::success(format!(
        "Generated {} transaction(s) from {} template(s).",
        report.generated.len(),
        report.processed_templates
    ));
    Ok(LoopControl::Continue)
}

fn cmd_save(context: &mut ShellContext, _args: &[&str]) -> CommandResult {
    context.save()?;
    output::success(format!("Saved book `{}`.", context.book_name));
    Ok(LoopControl::Continue)
}

fn cmd_backup(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let note = if args.is_empty() {
        None
    } else {
        Some(args.join(" "))
    };
    let name = context
        .storage
        .backup(&context.book, &context.book_name, note.as_deref())?;
    output::success(format!("Backup written: {}", name));
    Ok(LoopControl::Continue)
}

fn cmd_version(_context: &mut ShellContext, _args: &[&str]) -> CommandResult {
    output::line(build_info::current().summary());
    Ok(LoopControl::Continue)
}

fn cmd_exit(context: &mut ShellContext, _args: &[&str]) -> CommandResult {
    if context.dirty {
        context.save()?;
        output::info(format!("Saved book `{}`.", context.book_name));
    }
    Ok(LoopControl::Exit)
}

fn expect_arg<'a>(args: &[&'a str], index: usize, usage: &str) -> Result<&'a str, CommandError> {
    args.get(index)
        .copied()
        .ok_or_else(|| CommandError::InvalidArguments(format!("usage: {}", usage)))
}

/// Accepts `YYYY-MM-DD` (midnight UTC) or a full RFC 3339 timestamp.
fn parse_start(raw: &str) -> Result<i64, CommandError> {
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        if let Some(midnight) = date.and_hms_opt(0, 0, 0) {
            return Ok(midnight.and_utc().timestamp_millis());
        }
    }
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.timestamp_millis())
        .map_err(|_| CommandError::InvalidArguments(format!("invalid start date `{}`", raw)))
}

fn format_time(time: Option<DateTime<Utc>>) -> String {
    time.map(|t| t.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "invalid".into())
}

fn summary_line(template: &RecurringTransactionRecord, now: i64) -> String {
    let status = if !template.is_active {
        "paused".to_string()
    } else if template.is_due(now) {
        "due".to_string()
    } else {
        format!("in {}d", template.days_until_next(now))
    };
    let short_id: String = template.id.chars().take(8).collect();
    format!(
        "  {}  {:<20} {:<14} {:>12}  {:<8} next {}  [{}]",
        short_id,
        template.counterparty,
        template.category,
        template.signed_amount().to_string(),
        template.frequency_label(),
        format_time(template.next_occurrence_time()),
        status
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_start_accepts_date_and_rfc3339() {
        assert_eq!(parse_start("1970-01-02").unwrap(), 86_400_000);
        assert_eq!(parse_start("1970-01-01T00:00:01Z").unwrap(), 1_000);
        assert!(parse_start("yesterday").is_err());
    }

    #[test]
    fn registry_lists_commands_in_order() {
        let registry = registry();
        let names: Vec<_> = registry.names().collect();
        assert_eq!(names.first(), Some(&"help"));
        assert!(names.contains(&"process"));
        assert_eq!(names.last(), Some(&"exit"));
    }
}
