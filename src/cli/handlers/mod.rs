mod init;
mod template;

pub use init::cmd_init;

use std::path::{Path, PathBuf};

use indexmap::IndexMap;

use crate::cli::commands::*;
use crate::cli::output::*;
use crate::error::StoreError;
use crate::io::config_io;
use crate::io::lock::FileLock;
use crate::io::store_io::{self, Store};
use crate::model::record::{Partition, Record};
use crate::model::template::{CHECKED_KEY, Template, check_list_name};
use crate::ops::archive;
use crate::ops::export::{self, ExportOptions};
use crate::ops::loader::{self, LoadOptions, SummarySlot};
use crate::ops::record_store;
use crate::ops::schema_store;
use crate::ops::table::{self, TableSort};
use crate::ops::timestamp::{sort_by_recency, sort_by_recency_lenient};

type CmdResult = Result<(), Box<dyn std::error::Error>>;

/// What every handler needs from the global flags
pub struct Ctx {
    pub json: bool,
    /// Directory to start store discovery from
    pub start: PathBuf,
}

impl Ctx {
    pub fn from_cli(cli: &Cli) -> Result<Ctx, Box<dyn std::error::Error>> {
        let start = match &cli.store_dir {
            Some(dir) => std::fs::canonicalize(dir)
                .map_err(|e| format!("cannot resolve -C path '{}': {}", dir, e))?,
            None => std::env::current_dir()?,
        };
        Ok(Ctx {
            json: cli.json,
            start,
        })
    }

    fn open_store(&self) -> Result<Store, StoreError> {
        let root = store_io::discover_store(&self.start)?;
        store_io::open_store(&root)
    }
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

pub fn dispatch(cli: Cli) -> CmdResult {
    let ctx = Ctx::from_cli(&cli)?;

    match cli.command {
        Commands::Init(args) => cmd_init(args, &ctx.start),
        Commands::Lists => cmd_lists(&ctx),
        Commands::Template(cmd) => template::cmd_template(&ctx, cmd.action),

        // Single records
        Commands::Add(args) => cmd_add(&ctx, args),
        Commands::Show(args) => cmd_show(&ctx, args),
        Commands::Edit(args) => cmd_edit(&ctx, args),
        Commands::Rm(args) => cmd_rm(&ctx, args),
        Commands::Check(args) => cmd_check(&ctx, args),

        // Whole lists
        Commands::Ls(args) => cmd_ls(&ctx, args),
        Commands::Table(args) => cmd_table(&ctx, args),
        Commands::Export(args) => cmd_export(&ctx, args),

        // Partitions
        Commands::Archive(args) => cmd_move(&ctx, args, Move::Archive),
        Commands::Restore(args) => cmd_move(&ctx, args, Move::Restore),
        Commands::Mv(args) => cmd_move(&ctx, args, Move::Infer),
        Commands::Sweep(args) => cmd_sweep(&ctx, args),

        Commands::Config(cmd) => cmd_config(&ctx, cmd.action),
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn print_json<T: serde::Serialize>(value: &T) -> CmdResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn partition_flag(archive: bool) -> Partition {
    if archive {
        Partition::Archive
    } else {
        Partition::Inbox
    }
}

/// Resolve a record reference and work out which list owns it.
fn locate_record(store: &Store, reference: &str) -> Result<(PathBuf, String), Box<dyn std::error::Error>> {
    let path = record_store::resolve_record(&store.layout, reference)?;
    let (list, _) = store
        .layout
        .locate(&path)
        .ok_or_else(|| format!("{} is not inside a list of this store", path.display()))?;
    Ok((path, list))
}

/// Take the write lock for `list`. The name is checked first so a bad name
/// reports `InvalidName` and never reaches the filesystem.
pub(super) fn lock_list(store: &Store, list: &str) -> Result<FileLock, StoreError> {
    check_list_name(list).map_err(|reason| StoreError::InvalidName {
        name: list.to_string(),
        reason,
    })?;
    Ok(FileLock::acquire_default(&store.layout.locks_dir(), list)?)
}

/// Split `FIELD=VALUE` arguments. Without a known field name before `=`,
/// the whole argument is a bare value.
fn split_assignments<'a>(
    args: &'a [String],
    is_field: impl Fn(&str) -> bool,
) -> (Vec<(&'a str, &'a str)>, Vec<&'a str>) {
    let mut assigned = Vec::new();
    let mut bare = Vec::new();
    for arg in args {
        match arg.split_once('=') {
            Some((key, value)) if is_field(key.trim()) => assigned.push((key.trim(), value)),
            _ => bare.push(arg.as_str()),
        }
    }
    (assigned, bare)
}

// ---------------------------------------------------------------------------
// Lists
// ---------------------------------------------------------------------------

fn cmd_lists(ctx: &Ctx) -> CmdResult {
    let store = ctx.open_store()?;
    let mut infos = Vec::new();
    for name in schema_store::list_names(&store.layout)? {
        let inbox = record_store::list_records(&store.layout, &name, Partition::Inbox)?.len();
        let archive = record_store::list_records(&store.layout, &name, Partition::Archive)?.len();
        infos.push(ListInfoJson {
            name,
            inbox,
            archive,
        });
    }

    if ctx.json {
        return print_json(&infos);
    }
    for info in &infos {
        println!("{}  ({} open, {} archived)", info.name, info.inbox, info.archive);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Single records
// ---------------------------------------------------------------------------

fn cmd_add(ctx: &Ctx, args: AddArgs) -> CmdResult {
    let store = ctx.open_store()?;
    let template = schema_store::read_template(&store.layout, &args.list)?;
    let (assigned, bare) = split_assignments(&args.values, |k| template.field(k).is_some());

    let mut values: IndexMap<String, String> = IndexMap::new();
    match bare.as_slice() {
        [] => {}
        [title] => {
            if let Some(primary) = template.primary_field() {
                values.insert(primary.name.clone(), title.to_string());
            }
        }
        _ => {
            return Err(format!(
                "only one bare value is allowed (it fills '{}'); use FIELD=VALUE for the rest",
                template.primary_field().map(|f| f.name.as_str()).unwrap_or_default()
            )
            .into());
        }
    }
    for (key, value) in assigned {
        values.insert(key.to_string(), value.to_string());
    }

    let _lock = lock_list(&store, &args.list)?;
    let path = record_store::create_record(&store.layout, &args.list, values)?;
    if ctx.json {
        let record = record_store::read_record(&path)?;
        return print_json(&record_to_json(&path, store.layout.locate(&path), &record));
    }
    println!("{}", path.display());
    Ok(())
}

fn cmd_show(ctx: &Ctx, args: RecordArg) -> CmdResult {
    let store = ctx.open_store()?;
    let path = record_store::resolve_record(&store.layout, &args.record)?;
    let record = record_store::read_record(&path)?;
    if ctx.json {
        return print_json(&record_to_json(&path, store.layout.locate(&path), &record));
    }
    for line in format_record_detail(&path, &record) {
        println!("{}", line);
    }
    Ok(())
}

fn cmd_edit(ctx: &Ctx, args: EditArgs) -> CmdResult {
    let store = ctx.open_store()?;
    let (path, list) = locate_record(&store, &args.record)?;
    // A template missing or broken by hand edits still lets known fields change
    let template = schema_store::read_template(&store.layout, &list).ok();

    let _lock = lock_list(&store, &list)?;
    let mut record = record_store::read_record(&path)?;
    let (assigned, bare) = split_assignments(&args.values, |k| {
        record.fields.contains_key(k) || template.as_ref().is_some_and(|t| t.field(k).is_some())
    });
    if let Some(&arg) = bare.first() {
        let key = arg.split_once('=').map(|(k, _)| k).unwrap_or(arg);
        let reason = if key.trim() == CHECKED_KEY {
            "use `lister check` to change it".to_string()
        } else {
            format!("not a field of '{}' (expected FIELD=VALUE)", list)
        };
        return Err(StoreError::InvalidFieldValue {
            field: key.trim().to_string(),
            reason,
        }
        .into());
    }

    apply_edits(&mut record, &assigned, template.as_ref())?;
    record_store::update_record(&path, &record)?;
    if ctx.json {
        return print_json(&record_to_json(&path, store.layout.locate(&path), &record));
    }
    println!("Updated {}", path.display());
    Ok(())
}

/// Replace values in place, validating against the template when there is
/// one. The `checked` flag is kept as it was.
fn apply_edits(
    record: &mut Record,
    assigned: &[(&str, &str)],
    template: Option<&Template>,
) -> Result<(), StoreError> {
    for (key, value) in assigned {
        if let Some(field) = template.and_then(|t| t.field(key)) {
            field
                .field_type
                .validate(value)
                .map_err(|reason| StoreError::InvalidFieldValue {
                    field: key.to_string(),
                    reason,
                })?;
        }
        record.fields.insert(key.to_string(), value.to_string());
    }
    let primary = record.fields.first().map(|(k, v)| (k.clone(), v.trim().is_empty()));
    if let Some((name, true)) = primary {
        return Err(StoreError::PrimaryFieldEmpty(name));
    }
    Ok(())
}

fn cmd_rm(ctx: &Ctx, args: RecordArg) -> CmdResult {
    let store = ctx.open_store()?;
    let (path, list) = locate_record(&store, &args.record)?;
    let _lock = lock_list(&store, &list)?;
    record_store::delete_record(&path)?;
    println!("Deleted {}", path.display());
    Ok(())
}

fn cmd_check(ctx: &Ctx, args: RecordArg) -> CmdResult {
    let store = ctx.open_store()?;
    let (path, list) = locate_record(&store, &args.record)?;
    let _lock = lock_list(&store, &list)?;
    let checked = record_store::toggle_checked(&path)?;
    if ctx.json {
        return print_json(&CheckedJson {
            path: path.display().to_string(),
            checked,
        });
    }
    println!("[{}] {}", if checked { 'x' } else { ' ' }, path.display());
    Ok(())
}

// ---------------------------------------------------------------------------
// Whole lists
// ---------------------------------------------------------------------------

fn cmd_ls(ctx: &Ctx, args: LsArgs) -> CmdResult {
    let store = ctx.open_store()?;
    let options = LoadOptions::from_config(&store.config.loader);
    let partition = partition_flag(args.archive);
    let slots = loader::load_partition(&store.layout, &args.list, partition, &options)?;

    if let Some(query) = &args.search {
        let hits = loader::search_summaries(&slots, query);
        if ctx.json {
            return print_json(&hits);
        }
        for summary in hits {
            println!("{}", format_summary_line(summary));
        }
        return Ok(());
    }

    if ctx.json {
        return print_json(&slots);
    }
    if slots.is_empty() {
        println!("{} is empty", if args.archive { "Archive" } else { "Inbox" });
    }
    for slot in &slots {
        println!("{}", format_slot_line(slot));
    }
    Ok(())
}

fn cmd_table(ctx: &Ctx, args: TableArgs) -> CmdResult {
    let store = ctx.open_store()?;
    let partition = partition_flag(args.archive);
    let paths = record_store::list_records(&store.layout, &args.list, partition)?;
    let paths = if store.config.loader.skip_malformed_names {
        sort_by_recency_lenient(paths).0
    } else {
        sort_by_recency(paths)?
    };

    let mut records = Vec::with_capacity(paths.len());
    for path in &paths {
        match record_store::read_record(path) {
            Ok(record) => records.push(record),
            Err(e) => eprintln!("warning: {}", e),
        }
    }

    let sort = TableSort {
        key: args.sort,
        reverse: args.desc,
    };
    let table = table::project(&records, &sort)?;
    if ctx.json {
        return print_json(&table);
    }
    for line in format_table(&table) {
        println!("{}", line);
    }
    Ok(())
}

fn cmd_export(ctx: &Ctx, args: ListArg) -> CmdResult {
    let store = ctx.open_store()?;
    let options = ExportOptions::from_config(&store.config.export)?;
    let report = export::export_list(&store.layout, &args.list, &options)?;
    if ctx.json {
        return print_json(&report);
    }
    for skipped in &report.skipped {
        eprintln!("skipped {}: {}", skipped.path.display(), skipped.reason);
    }
    println!("Exported {} record(s) to {}", report.rows, report.path.display());
    Ok(())
}

// ---------------------------------------------------------------------------
// Partitions
// ---------------------------------------------------------------------------

enum Move {
    Archive,
    Restore,
    Infer,
}

fn cmd_move(ctx: &Ctx, args: RecordArg, direction: Move) -> CmdResult {
    let store = ctx.open_store()?;
    let (path, list) = locate_record(&store, &args.record)?;
    let _lock = lock_list(&store, &list)?;
    let dest = match direction {
        Move::Archive => archive::archive_record(&store.layout, &path)?,
        Move::Restore => archive::restore_record(&store.layout, &path)?,
        Move::Infer => archive::transition_record(&store.layout, &path)?,
    };
    print_moved(ctx, &path, &dest)
}

fn print_moved(ctx: &Ctx, from: &Path, to: &Path) -> CmdResult {
    if ctx.json {
        return print_json(&MovedJson {
            from: from.display().to_string(),
            to: to.display().to_string(),
        });
    }
    println!("{} -> {}", from.display(), to.display());
    Ok(())
}

fn cmd_sweep(ctx: &Ctx, args: SweepArgs) -> CmdResult {
    let store = ctx.open_store()?;
    let partition = partition_flag(args.archive);
    let _lock = lock_list(&store, &args.list)?;

    let options = LoadOptions::from_config(&store.config.loader);
    let batch: Vec<_> = loader::load_partition(&store.layout, &args.list, partition, &options)?
        .iter()
        .filter_map(SummarySlot::summary)
        .cloned()
        .collect();
    let report = archive::bulk_transition(&store.layout, &batch, partition);

    if ctx.json {
        print_json(&report)?;
    } else {
        let verb = if args.archive { "Restored" } else { "Archived" };
        println!("{} {} record(s)", verb, report.moved.len());
        for failure in &report.failed {
            eprintln!("could not move {}: {}", failure.path.display(), failure.reason);
        }
    }
    if !report.failed.is_empty() {
        return Err(format!("{} record(s) could not be moved", report.failed.len()).into());
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

fn cmd_config(ctx: &Ctx, action: ConfigAction) -> CmdResult {
    let store = ctx.open_store()?;
    match action {
        ConfigAction::Get(args) => {
            let (_, doc) = config_io::read_config(&store.layout)?;
            let value = config_io::get_value(&doc, &args.key)
                .ok_or_else(|| format!("{} is not set", args.key))?;
            println!("{}", value);
        }
        ConfigAction::Set(args) => {
            let (_, mut doc) = config_io::read_config(&store.layout)?;
            let config = config_io::set_value(&mut doc, &args.key, &args.value)?;
            // Reject a delimiter the exporter could not use before saving it
            ExportOptions::from_config(&config.export)?;
            config_io::write_config(&store.layout, &doc)?;
            println!("{} = {}", args.key, args.value);
        }
    }
    Ok(())
}
